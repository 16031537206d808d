// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ids::RequestId;
use crate::model::Row;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DeletionState {
    #[default]
    Idle,
    PendingConfirm(Row),
    Committing {
        request_id: RequestId,
        row: Row,
    },
}

/// Two-step removal: a chosen `Remove…` action waits for confirmation, and a
/// confirmed removal waits for the delete call to finish.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeletionFlow {
    state: DeletionState,
}

impl DeletionFlow {
    pub fn state(&self) -> &DeletionState {
        &self.state
    }

    /// Row awaiting a decision, if the confirmation surface is showing.
    pub fn pending_row(&self) -> Option<&Row> {
        match &self.state {
            DeletionState::PendingConfirm(row) => Some(row),
            _ => None,
        }
    }

    pub fn confirmation_visible(&self) -> bool {
        matches!(self.state, DeletionState::PendingConfirm(_))
    }

    pub fn is_committing(&self) -> bool {
        matches!(self.state, DeletionState::Committing { .. })
    }

    /// Refused while a previous removal is still committing.
    pub fn request(&mut self, row: Row) -> bool {
        if self.is_committing() {
            return false;
        }
        self.state = DeletionState::PendingConfirm(row);
        true
    }

    pub fn cancel(&mut self) -> bool {
        if !self.confirmation_visible() {
            return false;
        }
        self.state = DeletionState::Idle;
        true
    }

    pub fn confirm(&mut self, request_id: RequestId) -> Option<Row> {
        let DeletionState::PendingConfirm(row) = std::mem::take(&mut self.state) else {
            return None;
        };
        self.state = DeletionState::Committing {
            request_id,
            row: row.clone(),
        };
        Some(row)
    }

    /// Finishes the commit answering `request_id`; other ids are ignored.
    pub fn finish(&mut self, request_id: RequestId) -> Option<Row> {
        match &self.state {
            DeletionState::Committing { request_id: pending, .. } if *pending == request_id => {}
            _ => return None,
        }
        match std::mem::take(&mut self.state) {
            DeletionState::Committing { row, .. } => Some(row),
            _ => None,
        }
    }
}
