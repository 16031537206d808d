// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use plandesk_app::{
    Directory, EntityKind, PageParams, RemoteSort, RequestStatus, Row, RowId, SortState, Value,
    sorted_indices,
};
use std::collections::HashMap;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

const ORGANIZATION_WORDS: [&str; 12] = [
    "Acme", "Harbor", "Summit", "Northwind", "Bluebird", "Cedar", "Evergreen", "Pioneer",
    "Keystone", "Lakeside", "Meridian", "Granite",
];
const ORGANIZATION_SUFFIXES: [&str; 6] = ["Health", "Clinic", "Care", "Group", "Partners", "Labs"];
const ORGANIZATION_STATUSES: [&str; 3] = ["active", "trial", "suspended"];

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];

const CARRIERS: [&str; 8] = [
    "Northern Mutual",
    "Summit Benefits",
    "Lakeside Insurance",
    "Homestead Mutual",
    "Pioneer Assurance",
    "Harbor Coverage",
    "Evergreen Assurance",
    "Metro Mutual",
];
const PLAN_TIERS: [&str; 4] = ["Bronze", "Silver", "Gold", "Platinum"];

const AUDIT_ACTIONS: [&str; 6] = [
    "signed in",
    "updated plan",
    "invited user",
    "exported report",
    "changed role",
    "removed user",
];

const REFERENCE_NOW: OffsetDateTime = datetime!(2026-01-01 0:00 UTC);

/// Row counts for a seeded demo directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoSizes {
    pub organizations: usize,
    pub users: usize,
    pub plans: usize,
    pub pending: usize,
    pub requests: usize,
    pub audit: usize,
}

impl Default for DemoSizes {
    fn default() -> Self {
        Self {
            organizations: 23,
            users: 37,
            plans: 8,
            pending: 6,
            requests: 14,
            audit: 52,
        }
    }
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator of admin-console rows. The same seed always produces the
/// same rows.
#[derive(Debug, Clone)]
pub struct DirectoryFaker {
    rng: DeterministicRng,
}

impl DirectoryFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn organizations(&mut self, count: usize, plans: &[Row]) -> Vec<Row> {
        (1..=count)
            .map(|index| {
                let name = format!(
                    "{} {}",
                    self.pick(&ORGANIZATION_WORDS),
                    self.pick(&ORGANIZATION_SUFFIXES)
                );
                let domain = name.to_ascii_lowercase().replace(' ', "");
                let plan_name = self
                    .pick_row(plans)
                    .and_then(|plan| plan.text("plan_name"))
                    .unwrap_or("Unassigned")
                    .to_owned();
                Row::new(RowId::from(index as i64))
                    .with_field("name", name)
                    .with_field("contact_email", format!("admin@{domain}.example"))
                    .with_field("status", self.pick(&ORGANIZATION_STATUSES))
                    .with_field("user_count", self.int_range(1, 250))
                    .with_field("plan_name", plan_name)
                    .with_field("created_at", Value::Timestamp(self.past(900)))
            })
            .collect()
    }

    /// Users carry a decorated display id (`user_<n>`) and the raw id as
    /// their original id.
    pub fn users(&mut self, count: usize, organizations: &[Row]) -> Vec<Row> {
        (1..=count)
            .map(|index| {
                let first = self.pick(&FIRST_NAMES);
                let last = self.pick(&LAST_NAMES);
                let organization = self
                    .pick_row(organizations)
                    .and_then(|row| row.text("name"))
                    .unwrap_or("Independent")
                    .to_owned();
                let role = if self.rng.int_n(5) == 0 { "admin" } else { "member" };
                Row::new(decorated_id("user_", index))
                    .with_original_id(RowId::from(index as i64))
                    .with_field("full_name", format!("{first} {last}"))
                    .with_field(
                        "email",
                        format!(
                            "{}.{}{index}@mail.example",
                            first.to_ascii_lowercase(),
                            last.to_ascii_lowercase()
                        ),
                    )
                    .with_field("role", role)
                    .with_field("organization_name", organization)
                    .with_field("last_login_at", Value::Timestamp(self.past(60)))
                    .with_field("created_at", Value::Timestamp(self.past(900)))
            })
            .collect()
    }

    pub fn plans(&mut self, count: usize) -> Vec<Row> {
        (1..=count)
            .map(|index| {
                let carrier = CARRIERS[(index - 1) % CARRIERS.len()];
                let tier = self.pick(&PLAN_TIERS);
                let premium = self.int_range(18_000, 95_000) as f64 / 100.0;
                Row::new(RowId::from(index as i64))
                    .with_field("plan_name", format!("{carrier} {tier}"))
                    .with_field("carrier", carrier)
                    .with_field("tier", tier)
                    .with_field("monthly_premium", Value::Decimal(premium))
                    .with_field("organizations", self.int_range(0, 12))
            })
            .collect()
    }

    pub fn access_requests(&mut self, count: usize, status: Option<RequestStatus>) -> Vec<Row> {
        let (prefix, offset) = match status {
            None => ("p", 0),
            Some(_) => ("r", 1000),
        };
        (1..=count)
            .map(|index| {
                let status = match status {
                    Some(_) if self.rng.int_n(3) == 0 => RequestStatus::Denied.as_str(),
                    Some(_) => RequestStatus::Approved.as_str(),
                    None => "pending",
                };
                let requester = format!(
                    "{} {}",
                    self.pick(&FIRST_NAMES),
                    self.pick(&LAST_NAMES)
                );
                Row::new(decorated_id(prefix, index))
                    .with_original_id(RowId::from((offset + index) as i64))
                    .with_field(
                        "organization",
                        format!(
                            "{} {}",
                            self.pick(&ORGANIZATION_WORDS),
                            self.pick(&ORGANIZATION_SUFFIXES)
                        ),
                    )
                    .with_field("requested_by", requester)
                    .with_field("requested_plan", self.pick(&PLAN_TIERS))
                    .with_field("status", status)
                    .with_field("submitted_at", Value::Timestamp(self.past(45)))
            })
            .collect()
    }

    pub fn audit_entries(&mut self, count: usize) -> Vec<Row> {
        (1..=count)
            .map(|index| {
                Row::new(RowId::from(index as i64))
                    .with_field(
                        "actor",
                        format!("{} {}", self.pick(&FIRST_NAMES), self.pick(&LAST_NAMES)),
                    )
                    .with_field("action", self.pick(&AUDIT_ACTIONS))
                    .with_field("at", Value::Timestamp(self.past(30)))
            })
            .collect()
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn pick_row<'a>(&mut self, rows: &'a [Row]) -> Option<&'a Row> {
        if rows.is_empty() {
            return None;
        }
        rows.get(self.rng.int_n(rows.len()))
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }

    fn past(&mut self, max_days: i64) -> OffsetDateTime {
        let minutes = self.int_range(0, max_days * 24 * 60);
        REFERENCE_NOW - Duration::minutes(minutes)
    }
}

fn decorated_id(prefix: &str, index: usize) -> RowId {
    RowId::new(format!("{prefix}{index}")).unwrap_or_else(|_| RowId::from(index as i64))
}

/// Operations a [`MemoryDirectory`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Delete,
    Transition,
    SetAdmin,
    Assign,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    List {
        kind: EntityKind,
        page: PageParams,
        sort: Option<RemoteSort>,
    },
    Delete {
        kind: EntityKind,
        id: RowId,
    },
    Transition {
        kind: EntityKind,
        id: RowId,
        status: RequestStatus,
    },
    SetAdmin {
        kind: EntityKind,
        id: RowId,
        admin: bool,
    },
    Assign {
        plan_id: RowId,
        organization_ids: Vec<RowId>,
    },
}

/// In-memory stand-in for the remote directory. Records every call and can
/// be told to fail an operation with a given message.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    tables: HashMap<EntityKind, Vec<Row>>,
    failures: HashMap<Operation, String>,
    calls: Vec<DirectoryCall>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_sizes(seed, DemoSizes::default())
    }

    pub fn with_sizes(seed: u64, sizes: DemoSizes) -> Self {
        let mut faker = DirectoryFaker::new(seed);
        let plans = faker.plans(sizes.plans);
        let organizations = faker.organizations(sizes.organizations, &plans);
        let users = faker.users(sizes.users, &organizations);
        let pending = faker.access_requests(sizes.pending, None);
        let requests = faker.access_requests(sizes.requests, Some(RequestStatus::Approved));
        let audit = faker.audit_entries(sizes.audit);

        let mut directory = Self::new();
        directory.insert(EntityKind::Insurance, plans);
        directory.insert(EntityKind::Organization, organizations);
        directory.insert(EntityKind::User, users);
        directory.insert(EntityKind::Pending, pending);
        directory.insert(EntityKind::Request, requests);
        directory.insert(EntityKind::ViewOnly, audit);
        directory
    }

    pub fn insert(&mut self, kind: EntityKind, rows: Vec<Row>) {
        self.tables.insert(kind, rows);
    }

    pub fn rows(&self, kind: EntityKind) -> &[Row] {
        self.tables.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn fail(&mut self, operation: Operation, message: impl Into<String>) {
        self.failures.insert(operation, message.into());
    }

    pub fn recover(&mut self, operation: Operation) {
        self.failures.remove(&operation);
    }

    pub fn calls(&self) -> &[DirectoryCall] {
        &self.calls
    }

    fn check(&self, operation: Operation) -> Result<()> {
        match self.failures.get(&operation) {
            Some(message) => bail!("{message}"),
            None => Ok(()),
        }
    }

    fn table_mut(&mut self, kind: EntityKind) -> &mut Vec<Row> {
        self.tables.entry(kind).or_default()
    }

    fn find_mut(&mut self, kind: EntityKind, id: &RowId) -> Result<&mut Row> {
        self.table_mut(kind)
            .iter_mut()
            .find(|row| row.target_id() == id)
            .ok_or_else(|| anyhow!("{} {id} not found", kind.as_str()))
    }
}

impl Directory for MemoryDirectory {
    fn list(
        &mut self,
        kind: EntityKind,
        page: PageParams,
        sort: Option<&RemoteSort>,
    ) -> Result<Vec<Row>> {
        self.calls.push(DirectoryCall::List {
            kind,
            page,
            sort: sort.cloned(),
        });
        self.check(Operation::List)?;

        let rows = self.rows(kind);
        let order = match sort {
            Some(sort) => sorted_indices(
                rows,
                &SortState {
                    key: sort.order_by.clone(),
                    direction: sort.direction,
                },
            ),
            None => (0..rows.len()).collect(),
        };
        let limit = page.limit.unwrap_or(usize::MAX);
        Ok(order
            .into_iter()
            .skip(page.offset)
            .take(limit)
            .map(|index| rows[index].clone())
            .collect())
    }

    fn delete(&mut self, kind: EntityKind, id: &RowId) -> Result<()> {
        self.calls.push(DirectoryCall::Delete {
            kind,
            id: id.clone(),
        });
        self.check(Operation::Delete)?;

        let table = self.table_mut(kind);
        let before = table.len();
        table.retain(|row| row.target_id() != id);
        if table.len() == before {
            bail!("{} {id} not found", kind.as_str());
        }
        Ok(())
    }

    fn transition_request(
        &mut self,
        kind: EntityKind,
        id: &RowId,
        status: RequestStatus,
    ) -> Result<()> {
        self.calls.push(DirectoryCall::Transition {
            kind,
            id: id.clone(),
            status,
        });
        self.check(Operation::Transition)?;

        let row = self.find_mut(kind, id)?;
        row.fields
            .insert("status".to_owned(), Value::from(status.as_str()));
        if kind == EntityKind::Pending {
            let row = row.clone();
            self.table_mut(kind).retain(|candidate| candidate.target_id() != id);
            self.table_mut(EntityKind::Request).push(row);
        }
        Ok(())
    }

    fn set_admin(&mut self, kind: EntityKind, id: &RowId, admin: bool) -> Result<()> {
        self.calls.push(DirectoryCall::SetAdmin {
            kind,
            id: id.clone(),
            admin,
        });
        self.check(Operation::SetAdmin)?;

        let role = if admin { "admin" } else { "member" };
        self.find_mut(kind, id)?
            .fields
            .insert("role".to_owned(), Value::from(role));
        Ok(())
    }

    fn assign_plan(&mut self, plan_id: &RowId, organization_ids: &[RowId]) -> Result<()> {
        self.calls.push(DirectoryCall::Assign {
            plan_id: plan_id.clone(),
            organization_ids: organization_ids.to_vec(),
        });
        self.check(Operation::Assign)?;

        let plan_name = self
            .find_mut(EntityKind::Insurance, plan_id)?
            .text("plan_name")
            .unwrap_or_default()
            .to_owned();
        for organization_id in organization_ids {
            self.find_mut(EntityKind::Organization, organization_id)?
                .fields
                .insert("plan_name".to_owned(), Value::from(plan_name.as_str()));
        }
        Ok(())
    }
}

/// Numbered rows with a `name` field, for tests that only care about ids.
pub fn numbered_rows(count: usize) -> Vec<Row> {
    (1..=count)
        .map(|index| {
            Row::new(RowId::from(index as i64)).with_field("name", format!("row {index:03}"))
        })
        .collect()
}
