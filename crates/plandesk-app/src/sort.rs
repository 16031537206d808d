// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::model::{EntityKind, Row, SortDirection, Value, field_key};

/// Lowercases a column header and drops its whitespace.
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: String,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            key: String::new(),
            direction: SortDirection::Asc,
        }
    }
}

impl SortState {
    pub fn is_active(&self) -> bool {
        !self.key.is_empty()
    }

    pub fn ascending(&self) -> bool {
        self.direction == SortDirection::Asc
    }

    pub fn is_sorted_by(&self, key: &str) -> bool {
        self.is_active() && self.key == key
    }

    /// Same key flips the direction; a new key starts ascending.
    pub fn toggled(&self, key: &str) -> Self {
        if self.is_sorted_by(key) {
            Self {
                key: self.key.clone(),
                direction: self.direction.flipped(),
            }
        } else {
            Self {
                key: key.to_owned(),
                direction: SortDirection::Asc,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSort {
    pub order_by: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageParams {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl PageParams {
    pub const ALL: Self = Self {
        offset: 0,
        limit: None,
    };
}

/// Backend column for a UI sort key on kinds whose order lives server-side.
pub fn remote_field(kind: EntityKind, key: &str) -> Option<&'static str> {
    let key = field_key(key);
    match kind {
        EntityKind::Organization => match key.as_str() {
            "name" | "organization" => Some("name"),
            "email" | "contactemail" => Some("contact_email"),
            "status" => Some("status"),
            "members" | "users" | "usercount" => Some("user_count"),
            "plan" | "planname" | "insuranceplan" => Some("plan_name"),
            "created" | "createdat" => Some("created_at"),
            _ => None,
        },
        EntityKind::User => match key.as_str() {
            "name" | "fullname" => Some("full_name"),
            "firstname" => Some("first_name"),
            "lastname" => Some("last_name"),
            "email" => Some("email"),
            "role" => Some("role"),
            "organization" | "organizationname" => Some("organization_name"),
            "lastlogin" | "lastloginat" => Some("last_login_at"),
            "created" | "createdat" => Some("created_at"),
            _ => None,
        },
        EntityKind::Insurance
        | EntityKind::Pending
        | EntityKind::Request
        | EntityKind::ViewOnly => None,
    }
}

/// Display order for `rows` under `state`, as indices into `rows`.
///
/// Ascending is a stable sort over the input order and descending is its
/// exact reverse. An inactive sort, or a key no row carries, keeps the input
/// order.
pub fn sorted_indices(rows: &[Row], state: &SortState) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    if !state.is_active() || !rows.iter().any(|row| row.field(&state.key).is_some()) {
        return order;
    }

    order.sort_by(|left, right| compare_rows(&rows[*left], &rows[*right], &state.key));
    if !state.ascending() {
        order.reverse();
    }
    order
}

fn compare_rows(left: &Row, right: &Row, key: &str) -> Ordering {
    let left = left.field(key).unwrap_or(&Value::Null);
    let right = right.field(key).unwrap_or(&Value::Null);
    left.cmp_value(right)
}

#[cfg(test)]
mod tests {
    use super::{SortState, normalize_header, remote_field, sorted_indices};
    use crate::{EntityKind, Row, RowId, SortDirection, Value};
    use anyhow::Result;
    use time::macros::date;

    fn row(id: &str, name: &str, seats: i64) -> Result<Row> {
        Ok(Row::new(RowId::new(id)?)
            .with_field("name", name)
            .with_field("seats", seats))
    }

    fn ids(rows: &[Row], order: &[usize]) -> Vec<String> {
        order.iter().map(|index| rows[*index].id.to_string()).collect()
    }

    #[test]
    fn header_normalization_lowercases_and_strips_whitespace() {
        assert_eq!(normalize_header(" Created At "), "createdat");
        assert_eq!(normalize_header("Plan\tName"), "planname");
    }

    #[test]
    fn toggling_same_key_flips_and_new_key_resets() {
        let state = SortState::default().toggled("name");
        assert_eq!(state.key, "name");
        assert!(state.ascending());

        let flipped = state.toggled("name");
        assert_eq!(flipped.direction, SortDirection::Desc);

        let other = flipped.toggled("seats");
        assert_eq!(other.key, "seats");
        assert!(other.ascending());
    }

    #[test]
    fn inactive_sort_preserves_input_order() -> Result<()> {
        let rows = vec![row("b", "beta", 2)?, row("a", "alpha", 1)?];
        assert_eq!(sorted_indices(&rows, &SortState::default()), vec![0, 1]);
        Ok(())
    }

    #[test]
    fn text_and_numbers_sort_by_their_own_order() -> Result<()> {
        let rows = vec![
            row("1", "Charlie", 10)?,
            row("2", "alpha", 9)?,
            row("3", "Bravo", 100)?,
        ];
        let by_name = SortState::default().toggled("name");
        assert_eq!(ids(&rows, &sorted_indices(&rows, &by_name)), ["2", "3", "1"]);

        let by_seats = SortState::default().toggled("seats");
        assert_eq!(ids(&rows, &sorted_indices(&rows, &by_seats)), ["2", "1", "3"]);
        Ok(())
    }

    #[test]
    fn dates_sort_chronologically() -> Result<()> {
        let rows = vec![
            Row::new(RowId::new("late")?).with_field("renewal", date!(2027 - 01 - 01)),
            Row::new(RowId::new("early")?).with_field("renewal", date!(2026 - 03 - 15)),
        ];
        let state = SortState::default().toggled("renewal");
        assert_eq!(ids(&rows, &sorted_indices(&rows, &state)), ["early", "late"]);
        Ok(())
    }

    #[test]
    fn descending_is_exact_reverse_of_ascending_even_with_ties() -> Result<()> {
        let rows = vec![
            row("1", "same", 1)?,
            row("2", "same", 1)?,
            row("3", "other", 1)?,
        ];
        let asc = SortState::default().toggled("name");
        let desc = asc.toggled("name");
        let mut ascending = sorted_indices(&rows, &asc);
        let descending = sorted_indices(&rows, &desc);
        ascending.reverse();
        assert_eq!(ascending, descending);
        Ok(())
    }

    #[test]
    fn unknown_key_keeps_order() -> Result<()> {
        let rows = vec![row("b", "beta", 2)?, row("a", "alpha", 1)?];
        let state = SortState::default().toggled("nonexistent");
        assert_eq!(sorted_indices(&rows, &state), vec![0, 1]);
        Ok(())
    }

    #[test]
    fn missing_values_sort_with_nulls() -> Result<()> {
        let rows = vec![
            row("1", "beta", 1)?,
            Row::new(RowId::new("2")?).with_field("name", Value::Null),
            Row::new(RowId::new("3")?),
        ];
        let state = SortState::default().toggled("name");
        assert_eq!(ids(&rows, &sorted_indices(&rows, &state)), ["2", "3", "1"]);
        Ok(())
    }

    #[test]
    fn mixed_number_and_text_column_groups_numbers_first() {
        let rows = (0..200_i64)
            .map(|n| {
                let seats = (n * 37) % 101;
                let value = if (n * 7) % 3 == 0 {
                    Value::Text(seats.to_string())
                } else {
                    Value::Integer(seats)
                };
                Row::new(RowId::from(n + 1)).with_field("seats", value)
            })
            .collect::<Vec<_>>();
        let state = SortState::default().toggled("seats");
        let order = sorted_indices(&rows, &state);

        assert_eq!(order.len(), rows.len());
        let values: Vec<&Value> = order
            .iter()
            .filter_map(|index| rows[*index].field("seats"))
            .collect();
        let first_text = values
            .iter()
            .position(|value| matches!(value, Value::Text(_)))
            .unwrap_or(values.len());
        assert!(values[..first_text].iter().all(|value| matches!(value, Value::Integer(_))));
        assert!(values[first_text..].iter().all(|value| matches!(value, Value::Text(_))));
        assert!(
            values
                .windows(2)
                .all(|pair| pair[0].cmp_value(pair[1]) != std::cmp::Ordering::Greater)
        );
    }

    #[test]
    fn remote_fields_only_exist_for_server_sorted_kinds() {
        assert_eq!(remote_field(EntityKind::User, "firstname"), Some("first_name"));
        assert_eq!(remote_field(EntityKind::User, "lastlogin"), Some("last_login_at"));
        assert_eq!(remote_field(EntityKind::Organization, "createdat"), Some("created_at"));
        assert_eq!(remote_field(EntityKind::Organization, "shoe size"), None);
        assert_eq!(remote_field(EntityKind::Insurance, "name"), None);
    }
}
