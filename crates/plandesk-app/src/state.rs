// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::{EntityKind, Row, TableOptions};
use crate::table::{TableCommand, TableController, TableEvent};

/// Console-wide state: which table is in front, the status line, and one
/// table controller per entity kind.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub active_kind: EntityKind,
    pub status_line: Option<String>,
    tables: Vec<TableController>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(EntityKind::Organization, TableOptions::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    NextKind,
    PrevKind,
    SwitchKind(EntityKind),
    SetStatus(String),
    ClearStatus,
    Table(EntityKind, TableCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    KindChanged(EntityKind),
    StatusUpdated(String),
    StatusCleared,
    Table(EntityKind, TableEvent),
}

impl AppState {
    pub fn new(active_kind: EntityKind, options: TableOptions) -> Self {
        Self {
            active_kind,
            status_line: None,
            tables: EntityKind::ALL
                .iter()
                .map(|kind| TableController::new(*kind, Vec::new(), options))
                .collect(),
        }
    }

    pub fn table(&self, kind: EntityKind) -> &TableController {
        &self.tables[kind_index(kind)]
    }

    pub fn table_mut(&mut self, kind: EntityKind) -> &mut TableController {
        &mut self.tables[kind_index(kind)]
    }

    pub fn active_table(&self) -> &TableController {
        self.table(self.active_kind)
    }

    pub fn load_rows(&mut self, kind: EntityKind, rows: Vec<Row>) -> Vec<AppEvent> {
        self.dispatch(AppCommand::Table(kind, TableCommand::ReplaceRows(rows)))
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextKind => self.rotate_kind(1),
            AppCommand::PrevKind => self.rotate_kind(-1),
            AppCommand::SwitchKind(kind) => {
                if kind == self.active_kind {
                    return Vec::new();
                }
                let mut events = self.close_active_menu();
                self.active_kind = kind;
                events.push(AppEvent::KindChanged(kind));
                events
            }
            AppCommand::SetStatus(message) => vec![self.set_status(message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
            AppCommand::Table(kind, command) => self
                .table_mut(kind)
                .dispatch(command)
                .into_iter()
                .map(|event| AppEvent::Table(kind, event))
                .collect(),
        }
    }

    fn rotate_kind(&mut self, delta: isize) -> Vec<AppEvent> {
        let kinds = EntityKind::ALL;
        let current = kind_index(self.active_kind) as isize;
        let len = kinds.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.dispatch(AppCommand::SwitchKind(kinds[next]))
    }

    fn close_active_menu(&mut self) -> Vec<AppEvent> {
        let kind = self.active_kind;
        if self.table(kind).menu().is_none() {
            return Vec::new();
        }
        self.dispatch(AppCommand::Table(kind, TableCommand::CloseMenu))
    }

    fn set_status(&mut self, message: String) -> AppEvent {
        self.status_line = Some(message.clone());
        AppEvent::StatusUpdated(message)
    }
}

fn kind_index(kind: EntityKind) -> usize {
    EntityKind::ALL
        .iter()
        .position(|candidate| *candidate == kind)
        .unwrap_or(0)
}
