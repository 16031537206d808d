// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::{EntityKind, Row, TableOptions};

const ADMIN_ROLE: &str = "admin";
const USER_DISPLAY_PREFIX: &str = "user_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Edit,
    Approve,
    Deny,
    Assign,
    ToggleRole,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuAction {
    pub action: Action,
    pub label: String,
}

impl MenuAction {
    fn new(action: Action, label: impl Into<String>) -> Self {
        Self {
            action,
            label: label.into(),
        }
    }
}

/// Per-kind behavior of the table engine: which actions a row offers, how a
/// removal is worded, and where ordering is decided.
pub trait EntityProfile: Sync {
    fn kind(&self) -> EntityKind;

    fn noun(&self) -> &'static str;

    /// Evaluated on every render so row-dependent labels stay current.
    fn actions(&self, row: &Row, options: &TableOptions) -> Vec<MenuAction>;

    fn server_sorted(&self) -> bool {
        false
    }

    /// Decoration the render layer may put in front of raw ids.
    fn display_prefix(&self) -> &'static str {
        ""
    }

    fn confirmation_copy(&self, row: &Row) -> String {
        format!(
            "Remove {} \"{}\"? This cannot be undone.",
            self.noun(),
            row_title(row)
        )
    }
}

impl EntityKind {
    pub fn profile(self) -> &'static dyn EntityProfile {
        match self {
            Self::Organization => &ORGANIZATIONS,
            Self::User => &USERS,
            Self::Insurance => &INSURANCE,
            Self::Pending => &PENDING,
            Self::Request => &REQUESTS,
            Self::ViewOnly => &VIEW_ONLY,
        }
    }
}

/// Human label for a row in dialogs and status messages.
pub fn row_title(row: &Row) -> String {
    ["name", "full_name", "plan_name", "email"]
        .iter()
        .find_map(|key| row.text(key).filter(|value| !value.trim().is_empty()))
        .map(str::to_owned)
        .unwrap_or_else(|| row.id.to_string())
}

pub fn is_admin(row: &Row) -> bool {
    row.text("role")
        .is_some_and(|role| role.trim().eq_ignore_ascii_case(ADMIN_ROLE))
}

fn managed_entity_actions(noun: &str, row: &Row, options: &TableOptions) -> Vec<MenuAction> {
    let mut actions = vec![
        MenuAction::new(Action::View, "View"),
        MenuAction::new(Action::Edit, "Edit"),
    ];
    if options.role_toggle {
        let label = if is_admin(row) {
            "Demote from admin"
        } else {
            "Promote to admin"
        };
        actions.push(MenuAction::new(Action::ToggleRole, label));
    }
    actions.push(MenuAction::new(Action::Remove, format!("Remove {noun}")));
    actions
}

struct OrganizationProfile;

impl EntityProfile for OrganizationProfile {
    fn kind(&self) -> EntityKind {
        EntityKind::Organization
    }

    fn noun(&self) -> &'static str {
        "organization"
    }

    fn actions(&self, row: &Row, options: &TableOptions) -> Vec<MenuAction> {
        managed_entity_actions(self.noun(), row, options)
    }

    fn server_sorted(&self) -> bool {
        true
    }

    fn confirmation_copy(&self, row: &Row) -> String {
        format!(
            "Remove organization \"{}\"? Its members lose access and this cannot be undone.",
            row_title(row)
        )
    }
}

struct UserProfile;

impl EntityProfile for UserProfile {
    fn kind(&self) -> EntityKind {
        EntityKind::User
    }

    fn noun(&self) -> &'static str {
        "user"
    }

    fn actions(&self, row: &Row, options: &TableOptions) -> Vec<MenuAction> {
        managed_entity_actions(self.noun(), row, options)
    }

    fn server_sorted(&self) -> bool {
        true
    }

    fn display_prefix(&self) -> &'static str {
        USER_DISPLAY_PREFIX
    }
}

struct InsuranceProfile;

impl EntityProfile for InsuranceProfile {
    fn kind(&self) -> EntityKind {
        EntityKind::Insurance
    }

    fn noun(&self) -> &'static str {
        "plan"
    }

    fn actions(&self, _row: &Row, _options: &TableOptions) -> Vec<MenuAction> {
        vec![
            MenuAction::new(Action::Edit, "Edit"),
            MenuAction::new(Action::Assign, "Assign"),
            MenuAction::new(Action::Remove, "Remove plan"),
        ]
    }

    fn confirmation_copy(&self, row: &Row) -> String {
        format!(
            "Remove insurance plan \"{}\"? Organizations assigned to it keep their history.",
            row_title(row)
        )
    }
}

struct RequestProfile {
    kind: EntityKind,
}

impl EntityProfile for RequestProfile {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn noun(&self) -> &'static str {
        "request"
    }

    fn actions(&self, _row: &Row, _options: &TableOptions) -> Vec<MenuAction> {
        vec![
            MenuAction::new(Action::View, "View"),
            MenuAction::new(Action::Approve, "Approve"),
            MenuAction::new(Action::Deny, "Deny"),
        ]
    }
}

struct ViewOnlyProfile;

impl EntityProfile for ViewOnlyProfile {
    fn kind(&self) -> EntityKind {
        EntityKind::ViewOnly
    }

    fn noun(&self) -> &'static str {
        "record"
    }

    fn actions(&self, _row: &Row, _options: &TableOptions) -> Vec<MenuAction> {
        Vec::new()
    }
}

static ORGANIZATIONS: OrganizationProfile = OrganizationProfile;
static USERS: UserProfile = UserProfile;
static INSURANCE: InsuranceProfile = InsuranceProfile;
static PENDING: RequestProfile = RequestProfile {
    kind: EntityKind::Pending,
};
static REQUESTS: RequestProfile = RequestProfile {
    kind: EntityKind::Request,
};
static VIEW_ONLY: ViewOnlyProfile = ViewOnlyProfile;
