// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::ids::RowId;
use crate::model::{EntityKind, Row};

/// Raw key a row is selected under. Decorated display ids never reach the
/// selection set.
pub fn selection_key(kind: EntityKind, row: &Row) -> RowId {
    match &row.original_id {
        Some(original) => original.clone(),
        None => row.id.strip_prefix(kind.profile().display_prefix()),
    }
}

/// Maps an identifier of either shape to its raw key, preferring a row of the
/// record set that carries it as display or original id.
pub fn resolve_key(kind: EntityKind, rows: &[Row], id: &RowId) -> RowId {
    if let Some(row) = rows.iter().find(|row| row.matches_id(id)) {
        return selection_key(kind, row);
    }
    let stripped = id.strip_prefix(kind.profile().display_prefix());
    rows.iter()
        .find(|row| row.matches_id(&stripped))
        .map(|row| selection_key(kind, row))
        .unwrap_or(stripped)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllOutcome {
    Selected(usize),
    Deselected(usize),
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    selected: BTreeSet<RowId>,
}

impl Selection {
    pub fn contains(&self, key: &RowId) -> bool {
        self.selected.contains(key)
    }

    /// Flips one key and reports whether it is now selected.
    pub fn toggle(&mut self, key: RowId) -> bool {
        if self.selected.remove(&key) {
            false
        } else {
            self.selected.insert(key);
            true
        }
    }

    pub fn all_selected<'a>(&self, keys: impl IntoIterator<Item = &'a RowId>) -> bool {
        keys.into_iter().all(|key| self.selected.contains(key))
    }

    /// Header-checkbox semantics: when every key is already selected they are
    /// all removed, otherwise the missing ones are added and the rest stay.
    pub fn toggle_all(&mut self, keys: &[RowId]) -> SelectAllOutcome {
        if keys.is_empty() {
            return SelectAllOutcome::Unchanged;
        }
        if self.all_selected(keys) {
            for key in keys {
                self.selected.remove(key);
            }
            return SelectAllOutcome::Deselected(keys.len());
        }

        let added = keys
            .iter()
            .filter(|key| self.selected.insert((*key).clone()))
            .count();
        SelectAllOutcome::Selected(added)
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.selected.is_empty();
        self.selected.clear();
        changed
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn ids(&self) -> Vec<RowId> {
        self.selected.iter().cloned().collect()
    }

    /// Selected keys whose rows are still in `rows`; stale keys are skipped.
    pub fn present_ids(&self, kind: EntityKind, rows: &[Row]) -> Vec<RowId> {
        let mut seen = BTreeSet::new();
        rows.iter()
            .map(|row| selection_key(kind, row))
            .filter(|key| self.selected.contains(key) && seen.insert(key.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{SelectAllOutcome, Selection, resolve_key, selection_key};
    use crate::{EntityKind, Row, RowId};
    use anyhow::Result;

    fn id(value: &str) -> Result<RowId> {
        RowId::new(value)
    }

    #[test]
    fn double_toggle_restores_prior_state() -> Result<()> {
        let mut selection = Selection::default();
        selection.toggle(id("3")?);
        let before = selection.clone();

        assert!(selection.toggle(id("7")?));
        assert!(!selection.toggle(id("7")?));
        assert_eq!(selection, before);
        Ok(())
    }

    #[test]
    fn partial_page_selects_remaining_rows() -> Result<()> {
        let mut selection = Selection::default();
        let page = vec![id("1")?, id("2")?, id("3")?];
        selection.toggle(id("2")?);

        assert_eq!(selection.toggle_all(&page), SelectAllOutcome::Selected(2));
        assert!(selection.all_selected(&page));

        assert_eq!(selection.toggle_all(&page), SelectAllOutcome::Deselected(3));
        assert!(selection.is_empty());
        Ok(())
    }

    #[test]
    fn select_all_keeps_other_pages() -> Result<()> {
        let mut selection = Selection::default();
        selection.toggle(id("99")?);
        let page = vec![id("1")?, id("2")?];
        selection.toggle_all(&page);
        selection.toggle_all(&page);
        assert_eq!(selection.ids(), vec![id("99")?]);
        Ok(())
    }

    #[test]
    fn empty_page_select_all_is_a_no_op() {
        let mut selection = Selection::default();
        assert_eq!(selection.toggle_all(&[]), SelectAllOutcome::Unchanged);
    }

    #[test]
    fn user_prefix_resolves_to_raw_id() -> Result<()> {
        let rows = vec![Row::new(id("user_42")?), Row::new(id("43")?)];
        assert_eq!(selection_key(EntityKind::User, &rows[0]), id("42")?);
        assert_eq!(resolve_key(EntityKind::User, &rows, &id("user_42")?), id("42")?);
        assert_eq!(resolve_key(EntityKind::User, &rows, &id("42")?), id("42")?);
        assert_eq!(resolve_key(EntityKind::User, &rows, &id("user_43")?), id("43")?);
        Ok(())
    }

    #[test]
    fn prefix_is_only_stripped_for_users() -> Result<()> {
        let row = Row::new(id("user_5")?);
        assert_eq!(selection_key(EntityKind::Organization, &row), id("user_5")?);
        Ok(())
    }

    #[test]
    fn original_id_wins_over_display_id() -> Result<()> {
        let rows = vec![Row::new(id("u9")?).with_original_id(id("9")?)];
        assert_eq!(resolve_key(EntityKind::User, &rows, &id("u9")?), id("9")?);
        assert_eq!(resolve_key(EntityKind::User, &rows, &id("9")?), id("9")?);
        Ok(())
    }

    #[test]
    fn stale_ids_are_counted_but_not_present() -> Result<()> {
        let rows = vec![Row::new(id("1")?)];
        let mut selection = Selection::default();
        selection.toggle(id("1")?);
        selection.toggle(id("gone")?);
        assert_eq!(selection.len(), 2);
        assert_eq!(
            selection.present_ids(EntityKind::Insurance, &rows),
            vec![id("1")?]
        );
        Ok(())
    }
}
