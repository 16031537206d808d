// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::ids::RowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Organization,
    User,
    Insurance,
    Pending,
    Request,
    ViewOnly,
}

impl EntityKind {
    pub const ALL: [Self; 6] = [
        Self::Organization,
        Self::User,
        Self::Insurance,
        Self::Pending,
        Self::Request,
        Self::ViewOnly,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::User => "user",
            Self::Insurance => "insurance",
            Self::Pending => "pending",
            Self::Request => "request",
            Self::ViewOnly => "view-only",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "organization" => Some(Self::Organization),
            "user" => Some(Self::User),
            "insurance" => Some(Self::Insurance),
            "pending" => Some(Self::Pending),
            "request" => Some(Self::Request),
            "view-only" => Some(Self::ViewOnly),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Organization => "organizations",
            Self::User => "users",
            Self::Insurance => "plans",
            Self::Pending => "pending",
            Self::Request => "requests",
            Self::ViewOnly => "browse",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Approved,
    Denied,
}

impl RequestStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Date(Date),
    Timestamp(OffsetDateTime),
    Bool(bool),
    Null,
}

impl Value {
    pub fn display(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Decimal(value) => format!("{value:.2}"),
            Self::Date(value) => value.to_string(),
            Self::Timestamp(value) => value
                .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
                .unwrap_or_else(|_| value.to_string()),
            Self::Bool(true) => "yes".to_owned(),
            Self::Bool(false) => "no".to_owned(),
            Self::Null => String::new(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Integer(_) | Self::Decimal(_) => 2,
            Self::Date(_) | Self::Timestamp(_) => 3,
            Self::Text(_) => 4,
        }
    }

    fn instant(&self) -> Option<OffsetDateTime> {
        match self {
            Self::Date(value) => Some(value.midnight().assume_utc()),
            Self::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    /// Total order used by client-side sorting. Mixed columns group by kind
    /// of value first: nulls, booleans, numbers, dates, then text.
    pub fn cmp_value(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Integer(left), Self::Integer(right)) => left.cmp(right),
            (Self::Decimal(left), Self::Decimal(right)) => left.total_cmp(right),
            // Equal magnitudes put the decimal first so ties stay transitive.
            (Self::Integer(left), Self::Decimal(right)) => {
                (*left as f64).total_cmp(right).then(Ordering::Greater)
            }
            (Self::Decimal(left), Self::Integer(right)) => {
                left.total_cmp(&(*right as f64)).then(Ordering::Less)
            }
            (Self::Bool(left), Self::Bool(right)) => left.cmp(right),
            (Self::Text(left), Self::Text(right)) => left
                .to_lowercase()
                .cmp(&right.to_lowercase())
                .then_with(|| left.cmp(right)),
            _ => match (self.instant(), other.instant()) {
                (Some(left), Some(right)) => left.cmp(&right),
                _ => self.rank().cmp(&other.rank()),
            },
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Date> for Value {
    fn from(value: Date) -> Self {
        Self::Date(value)
    }
}

/// Collapses a field or column name to the form used for lookups: lowercase
/// with whitespace and underscores removed.
pub fn field_key(name: &str) -> String {
    name.chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    #[serde(default)]
    pub original_id: Option<RowId>,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Row {
    pub fn new(id: RowId) -> Self {
        Self {
            id,
            original_id: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_original_id(mut self, original_id: RowId) -> Self {
        self.original_id = Some(original_id);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Key used for mutations: the underlying entity id when the display id
    /// is decorated.
    pub fn target_id(&self) -> &RowId {
        self.original_id.as_ref().unwrap_or(&self.id)
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        if let Some(value) = self.fields.get(key) {
            return Some(value);
        }
        let wanted = field_key(key);
        if wanted.is_empty() {
            return None;
        }
        self.fields
            .iter()
            .find(|(name, _)| field_key(name) == wanted)
            .map(|(_, value)| value)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_text)
    }

    pub fn matches_id(&self, id: &RowId) -> bool {
        &self.id == id || self.original_id.as_ref() == Some(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOptions {
    pub items_per_page: usize,
    pub menu_gap: i32,
    pub menu_margin: i32,
    pub role_toggle: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            items_per_page: 10,
            menu_gap: 1,
            menu_margin: 1,
            role_toggle: false,
        }
    }
}
