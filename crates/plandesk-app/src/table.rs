// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::actions::{Action, MenuAction, is_admin, row_title};
use crate::deletion::DeletionFlow;
use crate::ids::{RequestId, RowId};
use crate::menu::{MenuState, OpenMenu, Rect, Size, Viewport, initial_position};
use crate::model::{EntityKind, Notice, RequestStatus, Row, TableOptions};
use crate::pagination::{PaginationState, paginate, visible_pages};
use crate::selection::{SelectAllOutcome, Selection, resolve_key, selection_key};
use crate::sort::{PageParams, RemoteSort, SortState, normalize_header, remote_field, sorted_indices};

/// Result of an outbound call as reported back by the host.
pub type Outcome<T> = Result<T, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub request_id: RequestId,
    pub kind: EntityKind,
    pub page: PageParams,
    pub sort: RemoteSort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub request_id: RequestId,
    pub kind: EntityKind,
    pub id: RowId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableCommand {
    Sort(String),
    GoToPage(usize),
    NextPage,
    PrevPage,
    SetItemsPerPage(usize),
    ToggleRow(RowId),
    ToggleAllOnPage,
    ClearSelection,
    OpenMenu {
        row_index: usize,
        trigger: Rect,
        viewport: Viewport,
    },
    SettleMenu {
        menu: Size,
        viewport: Viewport,
    },
    CloseMenu,
    ChooseAction(Action),
    ConfirmDeletion,
    CancelDeletion,
    AssignSelected,
    ReplaceRows(Vec<Row>),
    FetchCompleted {
        request_id: RequestId,
        result: Outcome<Vec<Row>>,
    },
    DeleteCompleted {
        request_id: RequestId,
        result: Outcome<()>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent {
    SelectionChanged(Vec<RowId>),
    ViewRequested(RowId),
    EditRequested(RowId),
    AssignRequested(Vec<RowId>),
    StatusTransitionRequested { id: RowId, status: RequestStatus },
    RoleChangeRequested { id: RowId, admin: bool },
    FetchRequested(FetchRequest),
    DeleteRequested(DeleteRequest),
    ConfirmationOpened(String),
    RowsChanged,
    PageChanged(usize),
    SortChanged(SortState),
    MenuOpened(usize),
    MenuClosed,
    Notice(Notice),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView<'a> {
    pub rows: Vec<&'a Row>,
    pub page: usize,
    pub total_pages: usize,
    /// Zero-based position of the first row within the display order.
    pub first_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct PendingFetch {
    request_id: RequestId,
    sort: SortState,
}

/// State behind one rendered table. The renderer forwards every interaction
/// as a [`TableCommand`] and redraws from the derived-state queries.
#[derive(Debug, Clone, PartialEq)]
pub struct TableController {
    kind: EntityKind,
    options: TableOptions,
    rows: Vec<Row>,
    order: Vec<usize>,
    sort: SortState,
    pagination: PaginationState,
    selection: Selection,
    menu: MenuState,
    deletion: DeletionFlow,
    pending_fetch: Option<PendingFetch>,
    last_request_id: RequestId,
}

impl TableController {
    pub fn new(kind: EntityKind, rows: Vec<Row>, options: TableOptions) -> Self {
        let mut controller = Self {
            kind,
            options,
            rows,
            order: Vec::new(),
            sort: SortState::default(),
            pagination: PaginationState::new(options.items_per_page),
            selection: Selection::default(),
            menu: MenuState::default(),
            deletion: DeletionFlow::default(),
            pending_fetch: None,
            last_request_id: RequestId::default(),
        };
        controller.reorder();
        controller
    }

    pub fn dispatch(&mut self, command: TableCommand) -> Vec<TableEvent> {
        match command {
            TableCommand::Sort(header) => self.sort_by_header(&header),
            TableCommand::GoToPage(page) => self.go_to_page(page),
            TableCommand::NextPage => self.go_to_page(self.pagination.current_page() + 1),
            TableCommand::PrevPage => {
                self.go_to_page(self.pagination.current_page().saturating_sub(1))
            }
            TableCommand::SetItemsPerPage(items) => {
                self.pagination.set_items_per_page(items);
                let mut events = self.close_menu();
                events.push(TableEvent::PageChanged(self.pagination.current_page()));
                events
            }
            TableCommand::ToggleRow(id) => {
                let key = resolve_key(self.kind, &self.rows, &id);
                self.selection.toggle(key);
                vec![self.selection_changed()]
            }
            TableCommand::ToggleAllOnPage => self.toggle_all_on_page(),
            TableCommand::ClearSelection => {
                if self.selection.clear() {
                    vec![self.selection_changed()]
                } else {
                    Vec::new()
                }
            }
            TableCommand::OpenMenu {
                row_index,
                trigger,
                viewport,
            } => self.open_menu(row_index, trigger, viewport),
            TableCommand::SettleMenu { menu, viewport } => {
                self.menu.settle(
                    menu,
                    viewport,
                    self.options.menu_gap,
                    self.options.menu_margin,
                );
                Vec::new()
            }
            TableCommand::CloseMenu => self.close_menu(),
            TableCommand::ChooseAction(action) => self.choose_action(action),
            TableCommand::ConfirmDeletion => self.confirm_deletion(),
            TableCommand::CancelDeletion => {
                self.deletion.cancel();
                Vec::new()
            }
            TableCommand::AssignSelected => self.assign_selected(),
            TableCommand::ReplaceRows(rows) => {
                let mut events = self.close_menu();
                self.replace_rows(rows);
                events.push(TableEvent::RowsChanged);
                events
            }
            TableCommand::FetchCompleted { request_id, result } => {
                self.finish_fetch(request_id, result)
            }
            TableCommand::DeleteCompleted { request_id, result } => {
                self.finish_delete(request_id, result)
            }
        }
    }

    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    pub const fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn page(&self) -> PageView<'_> {
        let slice = paginate(
            &self.order,
            self.pagination.current_page(),
            self.pagination.items_per_page(),
        );
        PageView {
            rows: slice.rows.iter().map(|index| &self.rows[*index]).collect(),
            page: slice.page,
            total_pages: slice.total_pages,
            first_index: (slice.page - 1) * self.pagination.items_per_page(),
        }
    }

    pub fn visible_pages(&self) -> Vec<usize> {
        visible_pages(
            self.pagination.current_page(),
            self.pagination.total_pages(self.rows.len()),
        )
    }

    pub const fn pagination(&self) -> &PaginationState {
        &self.pagination
    }

    pub const fn sort_state(&self) -> &SortState {
        &self.sort
    }

    /// Sort waiting on the server, if a re-fetch is outstanding.
    pub fn pending_sort(&self) -> Option<&SortState> {
        self.pending_fetch.as_ref().map(|pending| &pending.sort)
    }

    /// Backend ordering a full reload has to ask for so rows keep matching
    /// the header indicator. `None` when the kind sorts locally.
    pub fn remote_sort(&self) -> Option<RemoteSort> {
        if !self.kind.profile().server_sorted() || !self.sort.is_active() {
            return None;
        }
        let order_by = remote_field(self.kind, &self.sort.key)?;
        Some(RemoteSort {
            order_by: order_by.to_owned(),
            direction: self.sort.direction,
        })
    }

    pub fn is_selected(&self, row: &Row) -> bool {
        self.selection.contains(&selection_key(self.kind, row))
    }

    pub fn page_fully_selected(&self) -> bool {
        let keys = self.page_keys();
        !keys.is_empty() && self.selection.all_selected(&keys)
    }

    pub fn selection_count(&self) -> usize {
        self.selection.len()
    }

    pub fn selected_ids(&self) -> Vec<RowId> {
        self.selection.ids()
    }

    /// Selected ids whose rows are still loaded.
    pub fn present_selected_ids(&self) -> Vec<RowId> {
        self.selection.present_ids(self.kind, &self.rows)
    }

    pub const fn menu(&self) -> Option<OpenMenu> {
        self.menu.current()
    }

    pub fn menu_row(&self) -> Option<&Row> {
        let index = self.menu.active_row_index()?;
        self.page().rows.get(index).copied()
    }

    pub fn menu_actions(&self) -> Vec<MenuAction> {
        self.menu_row()
            .map(|row| self.actions_for(row))
            .unwrap_or_default()
    }

    pub fn actions_for(&self, row: &Row) -> Vec<MenuAction> {
        self.kind.profile().actions(row, &self.options)
    }

    pub const fn deletion(&self) -> &DeletionFlow {
        &self.deletion
    }

    pub fn confirmation_copy(&self) -> Option<String> {
        self.deletion
            .pending_row()
            .map(|row| self.kind.profile().confirmation_copy(row))
    }

    pub fn busy(&self) -> bool {
        self.pending_fetch.is_some() || self.deletion.is_committing()
    }

    fn next_request_id(&mut self) -> RequestId {
        self.last_request_id = self.last_request_id.next();
        self.last_request_id
    }

    fn reorder(&mut self) {
        self.order = if self.kind.profile().server_sorted() {
            (0..self.rows.len()).collect()
        } else {
            sorted_indices(&self.rows, &self.sort)
        };
    }

    fn replace_rows(&mut self, rows: Vec<Row>) {
        self.rows = rows;
        self.reorder();
        self.pagination.clamp(self.rows.len());
    }

    fn page_keys(&self) -> Vec<RowId> {
        self.page()
            .rows
            .into_iter()
            .map(|row| selection_key(self.kind, row))
            .collect()
    }

    fn selection_changed(&self) -> TableEvent {
        TableEvent::SelectionChanged(self.selection.ids())
    }

    fn close_menu(&mut self) -> Vec<TableEvent> {
        if self.menu.close() {
            vec![TableEvent::MenuClosed]
        } else {
            Vec::new()
        }
    }

    fn sort_by_header(&mut self, header: &str) -> Vec<TableEvent> {
        let key = normalize_header(header);
        if key.is_empty() {
            return Vec::new();
        }

        let mut events = self.close_menu();
        let next = self.sort.toggled(&key);

        if !self.kind.profile().server_sorted() {
            self.sort = next;
            self.reorder();
            events.push(TableEvent::SortChanged(self.sort.clone()));
            return events;
        }

        if self.pending_fetch.is_some() {
            events.push(TableEvent::Notice(Notice::info(
                "sort already in progress; wait for it to finish",
            )));
            return events;
        }

        let Some(order_by) = remote_field(self.kind, &key) else {
            log::debug!("no backend field for {} sort key {key:?}", self.kind.as_str());
            self.sort = next;
            events.push(TableEvent::SortChanged(self.sort.clone()));
            return events;
        };

        let request_id = self.next_request_id();
        let request = FetchRequest {
            request_id,
            kind: self.kind,
            page: PageParams::ALL,
            sort: RemoteSort {
                order_by: order_by.to_owned(),
                direction: next.direction,
            },
        };
        self.pending_fetch = Some(PendingFetch {
            request_id,
            sort: next,
        });
        events.push(TableEvent::FetchRequested(request));
        events
    }

    fn finish_fetch(&mut self, request_id: RequestId, result: Outcome<Vec<Row>>) -> Vec<TableEvent> {
        let matches = self
            .pending_fetch
            .as_ref()
            .is_some_and(|pending| pending.request_id == request_id);
        if !matches {
            log::debug!("ignoring stale fetch completion {}", request_id.get());
            return Vec::new();
        }
        let Some(pending) = self.pending_fetch.take() else {
            return Vec::new();
        };

        match result {
            Ok(rows) => {
                let mut events = self.close_menu();
                self.sort = pending.sort;
                self.replace_rows(rows);
                events.push(TableEvent::SortChanged(self.sort.clone()));
                events.push(TableEvent::RowsChanged);
                events
            }
            Err(error) => {
                log::warn!("{} sort fetch failed: {error}", self.kind.as_str());
                vec![TableEvent::Notice(Notice::error(format!(
                    "sort failed: {error}"
                )))]
            }
        }
    }

    fn go_to_page(&mut self, page: usize) -> Vec<TableEvent> {
        if !self.pagination.set_page(page, self.rows.len()) {
            return Vec::new();
        }
        let mut events = self.close_menu();
        events.push(TableEvent::PageChanged(self.pagination.current_page()));
        events
    }

    fn toggle_all_on_page(&mut self) -> Vec<TableEvent> {
        let keys = self.page_keys();
        match self.selection.toggle_all(&keys) {
            SelectAllOutcome::Unchanged => Vec::new(),
            SelectAllOutcome::Selected(_) | SelectAllOutcome::Deselected(_) => {
                vec![self.selection_changed()]
            }
        }
    }

    fn open_menu(&mut self, row_index: usize, trigger: Rect, viewport: Viewport) -> Vec<TableEvent> {
        if self.menu.active_row_index() == Some(row_index) {
            return self.close_menu();
        }

        let has_actions = self
            .page()
            .rows
            .get(row_index)
            .is_some_and(|row| !self.actions_for(row).is_empty());
        if !has_actions {
            return self.close_menu();
        }

        let position = initial_position(trigger, viewport, self.options.menu_gap);
        self.menu.open(row_index, trigger, position);
        vec![TableEvent::MenuOpened(row_index)]
    }

    fn choose_action(&mut self, action: Action) -> Vec<TableEvent> {
        let Some(row) = self.menu_row().cloned() else {
            return Vec::new();
        };
        let offered = self
            .actions_for(&row)
            .iter()
            .any(|candidate| candidate.action == action);
        let mut events = self.close_menu();
        if !offered {
            return events;
        }

        let id = row.target_id().clone();
        match action {
            Action::View => events.push(TableEvent::ViewRequested(id)),
            Action::Edit => events.push(TableEvent::EditRequested(id)),
            Action::Approve => events.push(TableEvent::StatusTransitionRequested {
                id,
                status: RequestStatus::Approved,
            }),
            Action::Deny => events.push(TableEvent::StatusTransitionRequested {
                id,
                status: RequestStatus::Denied,
            }),
            Action::Assign => events.push(TableEvent::AssignRequested(vec![id])),
            Action::ToggleRole => events.push(TableEvent::RoleChangeRequested {
                id,
                admin: !is_admin(&row),
            }),
            Action::Remove => {
                let copy = self.kind.profile().confirmation_copy(&row);
                if self.deletion.request(row) {
                    events.push(TableEvent::ConfirmationOpened(copy));
                } else {
                    events.push(TableEvent::Notice(Notice::info(
                        "a removal is still in progress",
                    )));
                }
            }
        }
        events
    }

    fn confirm_deletion(&mut self) -> Vec<TableEvent> {
        if !self.deletion.confirmation_visible() {
            return Vec::new();
        }
        let request_id = self.next_request_id();
        let Some(row) = self.deletion.confirm(request_id) else {
            return Vec::new();
        };
        vec![TableEvent::DeleteRequested(DeleteRequest {
            request_id,
            kind: self.kind,
            id: row.target_id().clone(),
        })]
    }

    fn finish_delete(&mut self, request_id: RequestId, result: Outcome<()>) -> Vec<TableEvent> {
        let Some(row) = self.deletion.finish(request_id) else {
            log::debug!("ignoring stale delete completion {}", request_id.get());
            return Vec::new();
        };
        let title = row_title(&row);

        match result {
            Ok(()) => {
                let mut events = self.close_menu();
                let mut rows = std::mem::take(&mut self.rows);
                rows.retain(|candidate| candidate.id != row.id);
                self.replace_rows(rows);
                events.push(TableEvent::RowsChanged);
                events.push(TableEvent::Notice(Notice::info(format!(
                    "removed {} {title}",
                    self.kind.profile().noun()
                ))));
                events
            }
            Err(error) => {
                log::warn!("{} delete failed: {error}", self.kind.as_str());
                vec![TableEvent::Notice(Notice::error(format!(
                    "remove {title} failed: {error}"
                )))]
            }
        }
    }

    fn assign_selected(&mut self) -> Vec<TableEvent> {
        if self.kind != EntityKind::Insurance {
            return vec![TableEvent::Notice(Notice::info(
                "assignment is only available for plans",
            ))];
        }
        let ids = self.present_selected_ids();
        if ids.is_empty() {
            return vec![TableEvent::Notice(Notice::info("select at least one plan"))];
        }
        vec![TableEvent::AssignRequested(ids)]
    }
}

#[cfg(test)]
mod tests {
    use super::{TableCommand, TableController, TableEvent};
    use crate::{
        Action, EntityKind, NoticeLevel, Rect, RequestId, Row, RowId, SortDirection,
        TableOptions, Viewport,
    };
    use anyhow::Result;

    const VIEWPORT: Viewport = Viewport {
        width: 100,
        height: 30,
        scroll_offset: 0,
    };

    fn rows(count: usize) -> Result<Vec<Row>> {
        (1..=count)
            .map(|index| {
                Ok(Row::new(RowId::new(index.to_string())?)
                    .with_field("name", format!("plan {index:02}"))
                    .with_field("seats", (count - index) as i64))
            })
            .collect()
    }

    fn page_ids(table: &TableController) -> Vec<String> {
        table
            .page()
            .rows
            .iter()
            .map(|row| row.id.to_string())
            .collect()
    }

    fn open_menu(table: &mut TableController, row_index: usize) -> Vec<TableEvent> {
        table.dispatch(TableCommand::OpenMenu {
            row_index,
            trigger: Rect::new(row_index as i32 + 2, 80, 3, 1),
            viewport: VIEWPORT,
        })
    }

    fn notices(events: &[TableEvent]) -> Vec<NoticeLevel> {
        events
            .iter()
            .filter_map(|event| match event {
                TableEvent::Notice(notice) => Some(notice.level),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn second_page_of_twenty_three_records() -> Result<()> {
        let mut table = TableController::new(EntityKind::Insurance, rows(23)?, TableOptions::default());
        let events = table.dispatch(TableCommand::GoToPage(2));
        assert_eq!(events, vec![TableEvent::PageChanged(2)]);

        let page = table.page();
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.first_index, 10);
        assert_eq!(page_ids(&table).first().map(String::as_str), Some("11"));
        assert_eq!(page_ids(&table).last().map(String::as_str), Some("20"));
        assert_eq!(table.visible_pages(), vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn paging_past_the_end_is_a_no_op() -> Result<()> {
        let mut table = TableController::new(EntityKind::Insurance, rows(5)?, TableOptions::default());
        assert!(table.dispatch(TableCommand::NextPage).is_empty());
        assert!(table.dispatch(TableCommand::PrevPage).is_empty());
        Ok(())
    }

    #[test]
    fn local_sort_toggles_reverse_then_restore() -> Result<()> {
        let mut table = TableController::new(EntityKind::Insurance, rows(6)?, TableOptions::default());
        table.dispatch(TableCommand::Sort("Seats".to_owned()));
        let ascending = page_ids(&table);
        assert_eq!(ascending, ["6", "5", "4", "3", "2", "1"]);

        table.dispatch(TableCommand::Sort("seats".to_owned()));
        let mut descending = page_ids(&table);
        descending.reverse();
        assert_eq!(descending, ascending);
        assert_eq!(table.sort_state().direction, SortDirection::Desc);

        table.dispatch(TableCommand::Sort(" seats ".to_owned()));
        assert_eq!(page_ids(&table), ascending);
        Ok(())
    }

    #[test]
    fn server_sorted_kind_requests_fetch_without_touching_state() -> Result<()> {
        let mut table =
            TableController::new(EntityKind::Organization, rows(3)?, TableOptions::default());
        let events = table.dispatch(TableCommand::Sort("Created At".to_owned()));
        let [TableEvent::FetchRequested(request)] = events.as_slice() else {
            panic!("expected fetch request, got {events:?}");
        };
        assert_eq!(request.sort.order_by, "created_at");
        assert_eq!(request.sort.direction, SortDirection::Asc);
        assert!(!table.sort_state().is_active());
        assert!(table.busy());

        let fetched = vec![Row::new(RowId::new("9")?)];
        let events = table.dispatch(TableCommand::FetchCompleted {
            request_id: request.request_id,
            result: Ok(fetched),
        });
        assert!(events.contains(&TableEvent::RowsChanged));
        assert_eq!(table.sort_state().key, "createdat");
        assert_eq!(page_ids(&table), ["9"]);
        assert!(!table.busy());
        Ok(())
    }

    #[test]
    fn failed_server_sort_keeps_rows_and_sort_and_notifies_once() -> Result<()> {
        let mut table = TableController::new(EntityKind::User, rows(4)?, TableOptions::default());
        let before_rows = page_ids(&table);
        let before_sort = table.sort_state().clone();

        let events = table.dispatch(TableCommand::Sort("Email".to_owned()));
        let Some(TableEvent::FetchRequested(request)) = events.first() else {
            panic!("expected fetch request");
        };
        let events = table.dispatch(TableCommand::FetchCompleted {
            request_id: request.request_id,
            result: Err("backend unavailable".to_owned()),
        });

        assert_eq!(notices(&events), vec![NoticeLevel::Error]);
        assert_eq!(page_ids(&table), before_rows);
        assert_eq!(table.sort_state(), &before_sort);
        assert!(!table.busy());
        Ok(())
    }

    #[test]
    fn overlapping_server_sort_is_refused() -> Result<()> {
        let mut table = TableController::new(EntityKind::User, rows(2)?, TableOptions::default());
        table.dispatch(TableCommand::Sort("email".to_owned()));
        let events = table.dispatch(TableCommand::Sort("role".to_owned()));
        assert_eq!(notices(&events), vec![NoticeLevel::Info]);
        assert_eq!(table.pending_sort().map(|sort| sort.key.as_str()), Some("email"));
        Ok(())
    }

    #[test]
    fn stale_fetch_completion_is_ignored() -> Result<()> {
        let mut table = TableController::new(EntityKind::User, rows(2)?, TableOptions::default());
        table.dispatch(TableCommand::Sort("email".to_owned()));
        let events = table.dispatch(TableCommand::FetchCompleted {
            request_id: RequestId::new(99),
            result: Ok(Vec::new()),
        });
        assert!(events.is_empty());
        assert_eq!(table.rows().len(), 2);
        assert!(table.busy());
        Ok(())
    }

    #[test]
    fn unmapped_server_column_changes_state_only() -> Result<()> {
        let mut table =
            TableController::new(EntityKind::Organization, rows(3)?, TableOptions::default());
        let before = page_ids(&table);
        let events = table.dispatch(TableCommand::Sort("Seats".to_owned()));
        assert!(matches!(events.as_slice(), [TableEvent::SortChanged(_)]));
        assert_eq!(table.sort_state().key, "seats");
        assert_eq!(page_ids(&table), before);
        assert!(!table.busy());
        Ok(())
    }

    #[test]
    fn remote_sort_reflects_applied_server_order_only() -> Result<()> {
        let mut table =
            TableController::new(EntityKind::Organization, rows(3)?, TableOptions::default());
        assert_eq!(table.remote_sort(), None);

        let events = table.dispatch(TableCommand::Sort("Name".to_owned()));
        let [TableEvent::FetchRequested(request)] = events.as_slice() else {
            panic!("expected fetch request, got {events:?}");
        };
        assert_eq!(table.remote_sort(), None);

        table.dispatch(TableCommand::FetchCompleted {
            request_id: request.request_id,
            result: Ok(rows(3)?),
        });
        assert_eq!(table.remote_sort(), Some(request.sort.clone()));

        table.dispatch(TableCommand::Sort("Seats".to_owned()));
        assert_eq!(table.remote_sort(), None);

        let mut local = TableController::new(EntityKind::Insurance, rows(3)?, TableOptions::default());
        local.dispatch(TableCommand::Sort("name".to_owned()));
        assert_eq!(local.remote_sort(), None);
        Ok(())
    }

    #[test]
    fn select_all_recognizes_both_id_shapes() -> Result<()> {
        let rows = vec![
            Row::new(RowId::new("user_42")?),
            Row::new(RowId::new("43")?),
        ];
        let mut table = TableController::new(EntityKind::User, rows, TableOptions::default());
        table.dispatch(TableCommand::ToggleRow(RowId::new("42")?));
        assert!(table.is_selected(&table.rows()[0]));

        let events = table.dispatch(TableCommand::ToggleAllOnPage);
        assert_eq!(
            events,
            vec![TableEvent::SelectionChanged(vec![
                RowId::new("42")?,
                RowId::new("43")?
            ])]
        );
        assert!(table.page_fully_selected());

        table.dispatch(TableCommand::ToggleAllOnPage);
        assert_eq!(table.selection_count(), 0);
        Ok(())
    }

    #[test]
    fn selection_survives_page_changes() -> Result<()> {
        let mut table = TableController::new(EntityKind::Insurance, rows(15)?, TableOptions::default());
        table.dispatch(TableCommand::ToggleRow(RowId::new("3")?));
        table.dispatch(TableCommand::GoToPage(2));
        table.dispatch(TableCommand::ToggleAllOnPage);
        assert_eq!(table.selection_count(), 6);
        table.dispatch(TableCommand::GoToPage(1));
        assert!(table.is_selected(&table.rows()[2]));
        assert!(!table.page_fully_selected());
        Ok(())
    }

    #[test]
    fn opening_second_menu_closes_first() -> Result<()> {
        let mut table = TableController::new(EntityKind::Insurance, rows(5)?, TableOptions::default());
        assert_eq!(open_menu(&mut table, 0), vec![TableEvent::MenuOpened(0)]);
        assert_eq!(open_menu(&mut table, 3), vec![TableEvent::MenuOpened(3)]);
        assert_eq!(table.menu().map(|menu| menu.row_index), Some(3));

        assert_eq!(open_menu(&mut table, 3), vec![TableEvent::MenuClosed]);
        assert!(table.menu().is_none());
        Ok(())
    }

    #[test]
    fn menu_closes_on_page_change_and_outside_click() -> Result<()> {
        let mut table = TableController::new(EntityKind::Insurance, rows(15)?, TableOptions::default());
        open_menu(&mut table, 1);
        assert_eq!(
            table.dispatch(TableCommand::GoToPage(2)),
            vec![TableEvent::MenuClosed, TableEvent::PageChanged(2)]
        );
        open_menu(&mut table, 1);
        assert_eq!(table.dispatch(TableCommand::CloseMenu), vec![TableEvent::MenuClosed]);
        assert!(table.dispatch(TableCommand::CloseMenu).is_empty());
        Ok(())
    }

    #[test]
    fn view_only_rows_never_open_a_menu() -> Result<()> {
        let mut table = TableController::new(EntityKind::ViewOnly, rows(2)?, TableOptions::default());
        assert!(open_menu(&mut table, 0).is_empty());
        assert!(table.menu().is_none());
        Ok(())
    }

    #[test]
    fn settle_flips_menu_near_right_edge() -> Result<()> {
        let mut table = TableController::new(EntityKind::Insurance, rows(2)?, TableOptions::default());
        table.dispatch(TableCommand::OpenMenu {
            row_index: 0,
            trigger: Rect::new(2, 95, 3, 1),
            viewport: VIEWPORT,
        });
        table.dispatch(TableCommand::SettleMenu {
            menu: crate::Size {
                width: 16,
                height: 5,
            },
            viewport: VIEWPORT,
        });
        let position = table.menu().map(|menu| menu.position).expect("menu open");
        assert_eq!(position.left, 95 - 16 - 1);
        assert_eq!(position.top, 2);
        Ok(())
    }

    #[test]
    fn pending_row_actions_emit_status_transitions() -> Result<()> {
        let rows = vec![Row::new(RowId::new("r1")?)];
        let mut table = TableController::new(EntityKind::Pending, rows, TableOptions::default());
        let labels: Vec<String> = table
            .actions_for(&table.rows()[0])
            .into_iter()
            .map(|action| action.label)
            .collect();
        assert_eq!(labels, ["View", "Approve", "Deny"]);

        open_menu(&mut table, 0);
        let events = table.dispatch(TableCommand::ChooseAction(Action::Approve));
        assert_eq!(
            events,
            vec![
                TableEvent::MenuClosed,
                TableEvent::StatusTransitionRequested {
                    id: RowId::new("r1")?,
                    status: crate::RequestStatus::Approved,
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn action_not_offered_for_kind_is_ignored() -> Result<()> {
        let mut table = TableController::new(EntityKind::Pending, rows(1)?, TableOptions::default());
        open_menu(&mut table, 0);
        let events = table.dispatch(TableCommand::ChooseAction(Action::Remove));
        assert_eq!(events, vec![TableEvent::MenuClosed]);
        assert!(!table.deletion().confirmation_visible());
        Ok(())
    }

    #[test]
    fn role_toggle_requests_promotion() -> Result<()> {
        let rows = vec![Row::new(RowId::new("5")?).with_field("role", "member")];
        let options = TableOptions {
            role_toggle: true,
            ..TableOptions::default()
        };
        let mut table = TableController::new(EntityKind::User, rows, options);
        open_menu(&mut table, 0);
        let events = table.dispatch(TableCommand::ChooseAction(Action::ToggleRole));
        assert!(events.contains(&TableEvent::RoleChangeRequested {
            id: RowId::new("5")?,
            admin: true,
        }));
        Ok(())
    }

    #[test]
    fn delete_uses_original_id_and_removes_row() -> Result<()> {
        let rows = vec![
            Row::new(RowId::new("u9")?)
                .with_original_id(RowId::new("9")?)
                .with_field("name", "Nine"),
            Row::new(RowId::new("u10")?).with_original_id(RowId::new("10")?),
        ];
        let mut table = TableController::new(EntityKind::User, rows, TableOptions::default());
        open_menu(&mut table, 0);
        let events = table.dispatch(TableCommand::ChooseAction(Action::Remove));
        assert!(matches!(events.last(), Some(TableEvent::ConfirmationOpened(copy)) if copy.contains("Nine")));
        assert!(table.confirmation_copy().is_some());

        let events = table.dispatch(TableCommand::ConfirmDeletion);
        let [TableEvent::DeleteRequested(request)] = events.as_slice() else {
            panic!("expected delete request, got {events:?}");
        };
        assert_eq!(request.id.as_str(), "9");
        assert_eq!(request.kind, EntityKind::User);

        let events = table.dispatch(TableCommand::DeleteCompleted {
            request_id: request.request_id,
            result: Ok(()),
        });
        assert!(events.contains(&TableEvent::RowsChanged));
        assert_eq!(page_ids(&table), ["u10"]);
        assert!(!table.busy());
        Ok(())
    }

    #[test]
    fn failed_delete_keeps_row_and_notifies() -> Result<()> {
        let mut table = TableController::new(EntityKind::Insurance, rows(2)?, TableOptions::default());
        open_menu(&mut table, 1);
        table.dispatch(TableCommand::ChooseAction(Action::Remove));
        let events = table.dispatch(TableCommand::ConfirmDeletion);
        let Some(TableEvent::DeleteRequested(request)) = events.first() else {
            panic!("expected delete request");
        };

        let events = table.dispatch(TableCommand::DeleteCompleted {
            request_id: request.request_id,
            result: Err("403 forbidden".to_owned()),
        });
        assert_eq!(notices(&events), vec![NoticeLevel::Error]);
        assert_eq!(table.rows().len(), 2);
        assert!(!table.busy());
        assert!(!table.deletion().confirmation_visible());
        Ok(())
    }

    #[test]
    fn cancelled_delete_makes_no_call() -> Result<()> {
        let mut table = TableController::new(EntityKind::Insurance, rows(2)?, TableOptions::default());
        open_menu(&mut table, 0);
        table.dispatch(TableCommand::ChooseAction(Action::Remove));
        assert!(table.dispatch(TableCommand::CancelDeletion).is_empty());
        assert!(table.dispatch(TableCommand::ConfirmDeletion).is_empty());
        assert_eq!(table.rows().len(), 2);
        Ok(())
    }

    #[test]
    fn deleting_last_row_of_last_page_clamps_page() -> Result<()> {
        let mut table = TableController::new(EntityKind::Insurance, rows(11)?, TableOptions::default());
        table.dispatch(TableCommand::GoToPage(2));
        open_menu(&mut table, 0);
        table.dispatch(TableCommand::ChooseAction(Action::Remove));
        let events = table.dispatch(TableCommand::ConfirmDeletion);
        let Some(TableEvent::DeleteRequested(request)) = events.first() else {
            panic!("expected delete request");
        };
        table.dispatch(TableCommand::DeleteCompleted {
            request_id: request.request_id,
            result: Ok(()),
        });
        assert_eq!(table.pagination().current_page(), 1);
        assert_eq!(table.page().total_pages, 1);
        Ok(())
    }

    #[test]
    fn assign_selected_skips_stale_ids() -> Result<()> {
        let mut table = TableController::new(EntityKind::Insurance, rows(3)?, TableOptions::default());
        table.dispatch(TableCommand::ToggleRow(RowId::new("2")?));
        table.dispatch(TableCommand::ToggleRow(RowId::new("gone")?));
        assert_eq!(table.selection_count(), 2);

        let events = table.dispatch(TableCommand::AssignSelected);
        assert_eq!(events, vec![TableEvent::AssignRequested(vec![RowId::new("2")?])]);
        Ok(())
    }

    #[test]
    fn replacing_rows_clamps_page_and_keeps_sort() -> Result<()> {
        let mut table = TableController::new(EntityKind::Insurance, rows(25)?, TableOptions::default());
        table.dispatch(TableCommand::Sort("name".to_owned()));
        table.dispatch(TableCommand::GoToPage(3));
        table.dispatch(TableCommand::ReplaceRows(rows(4)?));
        assert_eq!(table.pagination().current_page(), 1);
        assert_eq!(table.sort_state().key, "name");
        assert_eq!(page_ids(&table), ["1", "2", "3", "4"]);
        Ok(())
    }
}
