// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use plandesk_app::{
    AppCommand, AppEvent, AppState, DeleteRequest, EntityKind, FetchRequest, MenuPosition,
    NoticeLevel, Outcome, Rect as CellRect, RemoteSort, RequestId, RequestStatus, Row, RowId,
    Size, SortDirection, TableCommand, TableController, TableEvent, Viewport, normalize_header,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row as TableRow, Table, Tabs};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const TABS_HEIGHT: u16 = 3;
const PAGER_HEIGHT: u16 = 1;
const STATUS_HEIGHT: u16 = 3;
const CHECKBOX_WIDTH: u16 = 3;
const ID_WIDTH: u16 = 9;
const TRIGGER_WIDTH: u16 = 3;
const COLUMN_SPACING: u16 = 1;
const MIN_COLUMN_WIDTH: u16 = 6;
const PAGE_SIZE_STEP: usize = 5;
const SORT_MARK_ASC: &str = "▲";
const SORT_MARK_DESC: &str = "▼";
const SORT_MARK_PENDING: &str = "…";
const TRIGGER_GLYPH: &str = "⋯";
const ID_HEADER: &str = "ID";

/// Host services the console calls into. Blocking calls are fine for the
/// mutations; sort fetches and delete commits go through the `spawn_*`
/// hooks, which must answer on `tx`.
///
/// `load_rows` receives the backend ordering of an applied server sort. A
/// sorted load must bypass any cached listing.
pub trait AppRuntime {
    fn load_rows(
        &mut self,
        kind: EntityKind,
        force_refresh: bool,
        sort: Option<&RemoteSort>,
    ) -> Result<Vec<Row>>;
    fn fetch_sorted(&mut self, request: &FetchRequest) -> Result<Vec<Row>>;
    fn delete_row(&mut self, request: &DeleteRequest) -> Result<()>;
    fn transition_request(
        &mut self,
        kind: EntityKind,
        id: &RowId,
        status: RequestStatus,
    ) -> Result<()>;
    fn set_admin(&mut self, kind: EntityKind, id: &RowId, admin: bool) -> Result<()>;
    fn assign_plan(&mut self, plan_id: &RowId, organization_ids: &[RowId]) -> Result<()>;
    fn spawn_fetch(&mut self, request: FetchRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self
            .fetch_sorted(&request)
            .map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::FetchCompleted {
            kind: request.kind,
            request_id: request.request_id,
            result,
        })
        .map_err(|_| anyhow::anyhow!("fetch event channel closed"))?;
        Ok(())
    }
    fn spawn_delete(&mut self, request: DeleteRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self
            .delete_row(&request)
            .map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::DeleteCompleted {
            kind: request.kind,
            request_id: request.request_id,
            result,
        })
        .map_err(|_| anyhow::anyhow!("delete event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    FetchCompleted {
        kind: EntityKind,
        request_id: RequestId,
        result: Outcome<Vec<Row>>,
    },
    DeleteCompleted {
        kind: EntityKind,
        request_id: RequestId,
        result: Outcome<()>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Quit,
    NextKind,
    PrevKind,
    CursorDown,
    CursorUp,
    ColumnLeft,
    ColumnRight,
    FirstPage,
    LastPage,
    GrowPage,
    ShrinkPage,
    SortColumn,
    ToggleCursorRow,
    OpenMenu,
    Reload,
    ToggleHelp,
    Table(TableKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableKey {
    NextPage,
    PrevPage,
    ToggleAllOnPage,
    ClearSelection,
    AssignSelected,
}

impl TableKey {
    fn command(self) -> TableCommand {
        match self {
            Self::NextPage => TableCommand::NextPage,
            Self::PrevPage => TableCommand::PrevPage,
            Self::ToggleAllOnPage => TableCommand::ToggleAllOnPage,
            Self::ClearSelection => TableCommand::ClearSelection,
            Self::AssignSelected => TableCommand::AssignSelected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Checkbox,
    Id,
    Field(&'static str),
    Trigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnSlot {
    slot: Slot,
    x: u16,
    width: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PagerTarget {
    Prev,
    Next,
    Page(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ScreenLayout {
    tabs: Rect,
    table: Rect,
    pager: Rect,
    status: Rect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DetailView {
    title: String,
    lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct ViewData {
    screen: Rect,
    cursors: HashMap<EntityKind, usize>,
    column: usize,
    menu_cursor: usize,
    detail: Option<DetailView>,
    help_visible: bool,
    status_token: u64,
}

impl ViewData {
    fn cursor(&self, kind: EntityKind) -> usize {
        self.cursors.get(&kind).copied().unwrap_or(0)
    }

    fn set_cursor(&mut self, kind: EntityKind, cursor: usize) {
        self.cursors.insert(kind, cursor);
    }
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();
    load_all(state, runtime, &mut view_data, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);

        match terminal.size() {
            Ok(size) => view_data.screen = Rect::new(0, 0, size.width, size.height),
            Err(error) => {
                result = Err(error).context("read terminal size");
                break;
            }
        }

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if !has_event {
            continue;
        }
        match event::read().context("read event") {
            Ok(Event::Key(key)) => {
                if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                    break;
                }
            }
            Ok(Event::Mouse(mouse)) => {
                handle_mouse_event(state, runtime, &mut view_data, &internal_tx, mouse);
            }
            Ok(Event::Resize(width, height)) => {
                view_data.screen = Rect::new(0, 0, width, height);
            }
            Ok(_) => {}
            Err(error) => {
                result = Err(error);
                break;
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(
        io::stdout(),
        DisableMouseCapture,
        terminal::LeaveAlternateScreen
    )
    .context("leave alternate screen")?;
    result
}

fn load_all<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    for kind in EntityKind::ALL {
        reload(state, runtime, view_data, tx, kind, false);
    }
}

fn reload<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    kind: EntityKind,
    force_refresh: bool,
) {
    let sort = state.table(kind).remote_sort();
    match runtime.load_rows(kind, force_refresh, sort.as_ref()) {
        Ok(rows) => {
            let events = state.load_rows(kind, rows);
            apply_events(state, runtime, view_data, tx, events);
        }
        Err(error) => {
            log::warn!("load {} failed: {error:#}", kind.as_str());
            emit_status(
                state,
                view_data,
                tx,
                format!("load {} failed: {error}", kind.label()),
            );
        }
    }
}

fn process_internal_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::FetchCompleted {
                kind,
                request_id,
                result,
            } => {
                let events = state.dispatch(AppCommand::Table(
                    kind,
                    TableCommand::FetchCompleted { request_id, result },
                ));
                apply_events(state, runtime, view_data, tx, events);
            }
            InternalEvent::DeleteCompleted {
                kind,
                request_id,
                result,
            } => {
                let events = state.dispatch(AppCommand::Table(
                    kind,
                    TableCommand::DeleteCompleted { request_id, result },
                ));
                apply_events(state, runtime, view_data, tx, events);
            }
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn dispatch_table<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    command: TableCommand,
) {
    let events = state.dispatch(AppCommand::Table(state.active_kind, command));
    apply_events(state, runtime, view_data, tx, events);
}

fn apply_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    events: Vec<AppEvent>,
) {
    let mut queue: VecDeque<AppEvent> = events.into();
    while let Some(event) = queue.pop_front() {
        let follow_up = match event {
            AppEvent::Table(kind, event) => {
                handle_table_event(state, runtime, view_data, tx, kind, event)
            }
            AppEvent::KindChanged(_) => {
                view_data.column = 0;
                view_data.menu_cursor = 0;
                Vec::new()
            }
            AppEvent::StatusUpdated(_) | AppEvent::StatusCleared => Vec::new(),
        };
        queue.extend(follow_up);
    }
}

fn handle_table_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    kind: EntityKind,
    event: TableEvent,
) -> Vec<AppEvent> {
    match event {
        TableEvent::SelectionChanged(ids) => {
            emit_status(state, view_data, tx, format!("{} selected", ids.len()));
            Vec::new()
        }
        TableEvent::ViewRequested(id) => {
            view_data.detail = detail_view(state.table(kind), &id);
            Vec::new()
        }
        TableEvent::EditRequested(id) => {
            log::info!("edit requested for {} {id}", kind.as_str());
            emit_status(
                state,
                view_data,
                tx,
                format!(
                    "edit {} {id}: forms are not available here",
                    kind.profile().noun()
                ),
            );
            Vec::new()
        }
        TableEvent::AssignRequested(plan_ids) => {
            assign_plan(state, runtime, view_data, tx, &plan_ids);
            Vec::new()
        }
        TableEvent::StatusTransitionRequested { id, status } => {
            match runtime.transition_request(kind, &id, status) {
                Ok(()) => {
                    reload(state, runtime, view_data, tx, EntityKind::Pending, true);
                    reload(state, runtime, view_data, tx, EntityKind::Request, true);
                    emit_status(
                        state,
                        view_data,
                        tx,
                        format!("request {id} {}", status.as_str()),
                    );
                }
                Err(error) => {
                    log::warn!("transition {id} failed: {error:#}");
                    emit_status(state, view_data, tx, format!("update failed: {error}"));
                }
            }
            Vec::new()
        }
        TableEvent::RoleChangeRequested { id, admin } => {
            match runtime.set_admin(kind, &id, admin) {
                Ok(()) => {
                    reload(state, runtime, view_data, tx, kind, true);
                    let verb = if admin { "promoted" } else { "demoted" };
                    emit_status(state, view_data, tx, format!("{verb} {id}"));
                }
                Err(error) => {
                    log::warn!("role change for {id} failed: {error:#}");
                    emit_status(state, view_data, tx, format!("role change failed: {error}"));
                }
            }
            Vec::new()
        }
        TableEvent::FetchRequested(request) => {
            emit_status(
                state,
                view_data,
                tx,
                format!("sorting by {}…", request.sort.order_by),
            );
            let request_id = request.request_id;
            if let Err(error) = runtime.spawn_fetch(request, tx.clone()) {
                return state.dispatch(AppCommand::Table(
                    kind,
                    TableCommand::FetchCompleted {
                        request_id,
                        result: Err(format!("{error:#}")),
                    },
                ));
            }
            Vec::new()
        }
        TableEvent::DeleteRequested(request) => {
            emit_status(state, view_data, tx, "removing…");
            let request_id = request.request_id;
            if let Err(error) = runtime.spawn_delete(request, tx.clone()) {
                return state.dispatch(AppCommand::Table(
                    kind,
                    TableCommand::DeleteCompleted {
                        request_id,
                        result: Err(format!("{error:#}")),
                    },
                ));
            }
            Vec::new()
        }
        TableEvent::ConfirmationOpened(_) | TableEvent::SortChanged(_) => Vec::new(),
        TableEvent::RowsChanged => {
            clamp_cursor(state, view_data, kind);
            Vec::new()
        }
        TableEvent::PageChanged(_) => {
            view_data.set_cursor(kind, 0);
            Vec::new()
        }
        TableEvent::MenuOpened(_) => {
            view_data.menu_cursor = 0;
            let menu = menu_size(state.table(kind));
            state.dispatch(AppCommand::Table(
                kind,
                TableCommand::SettleMenu {
                    menu,
                    viewport: viewport(view_data.screen),
                },
            ))
        }
        TableEvent::MenuClosed => {
            view_data.menu_cursor = 0;
            Vec::new()
        }
        TableEvent::Notice(notice) => {
            match notice.level {
                NoticeLevel::Error => log::warn!("{}", notice.message),
                NoticeLevel::Warn | NoticeLevel::Info => log::info!("{}", notice.message),
            }
            emit_status(state, view_data, tx, notice.message);
            Vec::new()
        }
    }
}

fn assign_plan<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    plan_ids: &[RowId],
) {
    let [plan_id] = plan_ids else {
        emit_status(state, view_data, tx, "select exactly one plan to assign");
        return;
    };
    let organization_ids = state
        .table(EntityKind::Organization)
        .present_selected_ids();
    if organization_ids.is_empty() {
        emit_status(
            state,
            view_data,
            tx,
            "select organizations on the organizations tab first",
        );
        return;
    }

    match runtime.assign_plan(plan_id, &organization_ids) {
        Ok(()) => {
            reload(state, runtime, view_data, tx, EntityKind::Organization, true);
            reload(state, runtime, view_data, tx, EntityKind::Insurance, true);
            emit_status(
                state,
                view_data,
                tx,
                format!(
                    "assigned plan {plan_id} to {} organizations",
                    organization_ids.len()
                ),
            );
        }
        Err(error) => {
            log::warn!("assign plan {plan_id} failed: {error:#}");
            emit_status(state, view_data, tx, format!("assign failed: {error}"));
        }
    }
}

fn detail_view(table: &TableController, id: &RowId) -> Option<DetailView> {
    let row = table.rows().iter().find(|row| row.matches_id(id))?;
    let mut lines = vec![format!("id: {}", row.id)];
    if let Some(original) = &row.original_id {
        lines.push(format!("original id: {original}"));
    }
    lines.extend(
        row.fields
            .iter()
            .map(|(name, value)| format!("{}: {}", name.replace('_', " "), value.display())),
    );
    Some(DetailView {
        title: format!("{} {}", table.kind().profile().noun(), row.id),
        lines,
    })
}

fn clamp_cursor(state: &AppState, view_data: &mut ViewData, kind: EntityKind) {
    let rows = state.table(kind).page().rows.len();
    let cursor = view_data.cursor(kind).min(rows.saturating_sub(1));
    view_data.set_cursor(kind, cursor);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c'))
        && key.modifiers.contains(KeyModifiers::CONTROL)
    {
        return true;
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }

    if view_data.detail.is_some() {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
            view_data.detail = None;
        }
        return false;
    }

    if state.active_table().deletion().confirmation_visible() {
        let command = match key.code {
            KeyCode::Char('y') | KeyCode::Enter => Some(TableCommand::ConfirmDeletion),
            KeyCode::Char('n') | KeyCode::Esc => Some(TableCommand::CancelDeletion),
            _ => None,
        };
        if let Some(command) = command {
            dispatch_table(state, runtime, view_data, internal_tx, command);
        }
        return false;
    }

    if state.active_table().menu().is_some() {
        handle_menu_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    let Some(action) = key_action(key) else {
        return false;
    };
    apply_key_action(state, runtime, view_data, internal_tx, action)
}

fn handle_menu_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let actions = state.active_table().menu_actions();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            view_data.menu_cursor = (view_data.menu_cursor + 1).min(actions.len().saturating_sub(1));
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.menu_cursor = view_data.menu_cursor.saturating_sub(1);
        }
        KeyCode::Enter => {
            if let Some(choice) = actions.get(view_data.menu_cursor) {
                dispatch_table(
                    state,
                    runtime,
                    view_data,
                    internal_tx,
                    TableCommand::ChooseAction(choice.action),
                );
            }
        }
        KeyCode::Esc | KeyCode::Char('m') => {
            dispatch_table(state, runtime, view_data, internal_tx, TableCommand::CloseMenu);
        }
        _ => {}
    }
}

fn key_action(key: KeyEvent) -> Option<KeyAction> {
    let action = match key.code {
        KeyCode::Char('q') => KeyAction::Quit,
        KeyCode::Tab => KeyAction::NextKind,
        KeyCode::BackTab => KeyAction::PrevKind,
        KeyCode::Char('j') | KeyCode::Down => KeyAction::CursorDown,
        KeyCode::Char('k') | KeyCode::Up => KeyAction::CursorUp,
        KeyCode::Char('h') | KeyCode::Left => KeyAction::ColumnLeft,
        KeyCode::Char('l') | KeyCode::Right => KeyAction::ColumnRight,
        KeyCode::Char('n') | KeyCode::PageDown => KeyAction::Table(TableKey::NextPage),
        KeyCode::Char('p') | KeyCode::PageUp => KeyAction::Table(TableKey::PrevPage),
        KeyCode::Char('g') | KeyCode::Home => KeyAction::FirstPage,
        KeyCode::Char('G') | KeyCode::End => KeyAction::LastPage,
        KeyCode::Char('+') => KeyAction::GrowPage,
        KeyCode::Char('-') => KeyAction::ShrinkPage,
        KeyCode::Char('s') => KeyAction::SortColumn,
        KeyCode::Char(' ') => KeyAction::ToggleCursorRow,
        KeyCode::Char('a') => KeyAction::Table(TableKey::ToggleAllOnPage),
        KeyCode::Char('x') => KeyAction::Table(TableKey::ClearSelection),
        KeyCode::Char('A') => KeyAction::Table(TableKey::AssignSelected),
        KeyCode::Enter | KeyCode::Char('m') => KeyAction::OpenMenu,
        KeyCode::Char('r') => KeyAction::Reload,
        KeyCode::Char('?') => KeyAction::ToggleHelp,
        _ => return None,
    };
    Some(action)
}

fn apply_key_action<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    action: KeyAction,
) -> bool {
    let kind = state.active_kind;
    match action {
        KeyAction::Quit => return true,
        KeyAction::NextKind => {
            let events = state.dispatch(AppCommand::NextKind);
            apply_events(state, runtime, view_data, tx, events);
        }
        KeyAction::PrevKind => {
            let events = state.dispatch(AppCommand::PrevKind);
            apply_events(state, runtime, view_data, tx, events);
        }
        KeyAction::CursorDown => {
            let rows = state.active_table().page().rows.len();
            let cursor = (view_data.cursor(kind) + 1).min(rows.saturating_sub(1));
            view_data.set_cursor(kind, cursor);
        }
        KeyAction::CursorUp => {
            let cursor = view_data.cursor(kind).saturating_sub(1);
            view_data.set_cursor(kind, cursor);
        }
        KeyAction::ColumnLeft => {
            view_data.column = view_data.column.saturating_sub(1);
        }
        KeyAction::ColumnRight => {
            let last = sortable_headers(kind).len().saturating_sub(1);
            view_data.column = (view_data.column + 1).min(last);
        }
        KeyAction::FirstPage => {
            dispatch_table(state, runtime, view_data, tx, TableCommand::GoToPage(1));
        }
        KeyAction::LastPage => {
            let last = state.active_table().page().total_pages.max(1);
            dispatch_table(state, runtime, view_data, tx, TableCommand::GoToPage(last));
        }
        KeyAction::GrowPage | KeyAction::ShrinkPage => {
            let current = state.active_table().pagination().items_per_page();
            let next = if action == KeyAction::GrowPage {
                current + PAGE_SIZE_STEP
            } else {
                current.saturating_sub(PAGE_SIZE_STEP).max(PAGE_SIZE_STEP)
            };
            if next != current {
                dispatch_table(state, runtime, view_data, tx, TableCommand::SetItemsPerPage(next));
                emit_status(state, view_data, tx, format!("{next} per page"));
            }
        }
        KeyAction::SortColumn => {
            if let Some(header) = sortable_headers(kind).get(view_data.column) {
                dispatch_table(
                    state,
                    runtime,
                    view_data,
                    tx,
                    TableCommand::Sort((*header).to_owned()),
                );
            }
        }
        KeyAction::ToggleCursorRow => {
            let id = state
                .active_table()
                .page()
                .rows
                .get(view_data.cursor(kind))
                .map(|row| row.id.clone());
            if let Some(id) = id {
                dispatch_table(state, runtime, view_data, tx, TableCommand::ToggleRow(id));
            }
        }
        KeyAction::OpenMenu => {
            let row_index = view_data.cursor(kind);
            open_menu_at(state, runtime, view_data, tx, row_index);
        }
        KeyAction::Reload => {
            reload(state, runtime, view_data, tx, kind, true);
            emit_status(state, view_data, tx, format!("reloaded {}", kind.label()));
        }
        KeyAction::ToggleHelp => {
            view_data.help_visible = !view_data.help_visible;
        }
        KeyAction::Table(key) => {
            dispatch_table(state, runtime, view_data, tx, key.command());
        }
    }
    false
}

fn open_menu_at<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    row_index: usize,
) {
    let kind = state.active_kind;
    let table = state.table(kind);
    let Some(actions) = table
        .page()
        .rows
        .get(row_index)
        .map(|row| table.actions_for(row))
    else {
        return;
    };
    if actions.is_empty() {
        emit_status(state, view_data, tx, format!("{} rows are read-only", kind.label()));
        return;
    }
    let layout = screen_layout(view_data.screen);
    let Some(trigger) = trigger_rect(kind, &layout, row_index) else {
        return;
    };
    dispatch_table(
        state,
        runtime,
        view_data,
        tx,
        TableCommand::OpenMenu {
            row_index,
            trigger,
            viewport: viewport(view_data.screen),
        },
    );
}

fn handle_mouse_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    mouse: MouseEvent,
) {
    let kind = state.active_kind;
    match mouse.kind {
        MouseEventKind::ScrollDown => {
            apply_key_action(state, runtime, view_data, tx, KeyAction::CursorDown);
            return;
        }
        MouseEventKind::ScrollUp => {
            apply_key_action(state, runtime, view_data, tx, KeyAction::CursorUp);
            return;
        }
        MouseEventKind::Down(MouseButton::Left) => {}
        _ => return,
    }
    if view_data.help_visible || view_data.detail.is_some() {
        return;
    }
    if state.active_table().deletion().confirmation_visible() {
        return;
    }

    let (column, row) = (mouse.column, mouse.row);
    if let Some(open) = state.active_table().menu() {
        let area = menu_area(open.position, menu_size(state.active_table()), view_data.screen);
        let actions = state.active_table().menu_actions();
        if contains(area, column, row) {
            let index = row.saturating_sub(area.y + 1) as usize;
            if row > area.y
                && let Some(choice) = actions.get(index)
            {
                dispatch_table(
                    state,
                    runtime,
                    view_data,
                    tx,
                    TableCommand::ChooseAction(choice.action),
                );
            }
            return;
        }
        dispatch_table(state, runtime, view_data, tx, TableCommand::CloseMenu);
        return;
    }

    let layout = screen_layout(view_data.screen);
    if contains(layout.tabs, column, row) {
        if let Some(target) = tab_at(state, layout.tabs, column) {
            let events = state.dispatch(AppCommand::SwitchKind(target));
            apply_events(state, runtime, view_data, tx, events);
        }
        return;
    }

    if contains(layout.pager, column, row) {
        let target = pager_target_at(state.active_table(), layout.pager, column);
        let command = match target {
            Some(PagerTarget::Prev) => Some(TableCommand::PrevPage),
            Some(PagerTarget::Next) => Some(TableCommand::NextPage),
            Some(PagerTarget::Page(page)) => Some(TableCommand::GoToPage(page)),
            None => None,
        };
        if let Some(command) = command {
            dispatch_table(state, runtime, view_data, tx, command);
        }
        return;
    }

    let inner = table_inner(layout.table);
    if !contains(inner, column, row) {
        return;
    }
    let Some(slot) = column_slots(kind, inner)
        .into_iter()
        .find(|slot| column >= slot.x && column < slot.x + slot.width)
        .map(|slot| slot.slot)
    else {
        return;
    };

    if row == inner.y {
        let command = match slot {
            Slot::Checkbox => Some(TableCommand::ToggleAllOnPage),
            Slot::Id => Some(TableCommand::Sort(ID_HEADER.to_owned())),
            Slot::Field(header) => Some(TableCommand::Sort(header.to_owned())),
            Slot::Trigger => None,
        };
        if let Some(command) = command {
            dispatch_table(state, runtime, view_data, tx, command);
        }
        return;
    }

    let row_index = (row - inner.y - 1) as usize;
    let Some(id) = state
        .active_table()
        .page()
        .rows
        .get(row_index)
        .map(|row| row.id.clone())
    else {
        return;
    };
    view_data.set_cursor(kind, row_index);
    match slot {
        Slot::Checkbox => {
            dispatch_table(state, runtime, view_data, tx, TableCommand::ToggleRow(id));
        }
        Slot::Trigger => open_menu_at(state, runtime, view_data, tx, row_index),
        Slot::Id | Slot::Field(_) => {}
    }
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x
        && column < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}

fn viewport(screen: Rect) -> Viewport {
    Viewport {
        width: i32::from(screen.width),
        height: i32::from(screen.height),
        scroll_offset: 0,
    }
}

fn screen_layout(area: Rect) -> ScreenLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(TABS_HEIGHT),
            Constraint::Min(3),
            Constraint::Length(PAGER_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(area);
    ScreenLayout {
        tabs: chunks[0],
        table: chunks[1],
        pager: chunks[2],
        status: chunks[3],
    }
}

fn table_inner(table: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(table)
}

/// Column headers for each kind, in display order.
fn columns(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Organization => &[
            "Name",
            "Contact Email",
            "Status",
            "User Count",
            "Plan Name",
            "Created At",
        ],
        EntityKind::User => &[
            "Full Name",
            "Email",
            "Role",
            "Organization Name",
            "Last Login At",
            "Created At",
        ],
        EntityKind::Insurance => &[
            "Plan Name",
            "Carrier",
            "Tier",
            "Monthly Premium",
            "Organizations",
        ],
        EntityKind::Pending => &[
            "Organization",
            "Requested By",
            "Requested Plan",
            "Submitted At",
        ],
        EntityKind::Request => &[
            "Organization",
            "Requested By",
            "Requested Plan",
            "Status",
            "Submitted At",
        ],
        EntityKind::ViewOnly => &["Actor", "Action", "At"],
    }
}

fn sortable_headers(kind: EntityKind) -> Vec<&'static str> {
    std::iter::once(ID_HEADER)
        .chain(columns(kind).iter().copied())
        .collect()
}

fn column_slots(kind: EntityKind, inner: Rect) -> Vec<ColumnSlot> {
    let headers = columns(kind);
    let count = headers.len() as u16 + 3;
    let fixed = CHECKBOX_WIDTH + ID_WIDTH + TRIGGER_WIDTH + COLUMN_SPACING * (count - 1);
    let flexible = inner.width.saturating_sub(fixed);
    let each = (flexible / headers.len().max(1) as u16).max(MIN_COLUMN_WIDTH);

    let mut slots = Vec::with_capacity(count as usize);
    let mut x = inner.x;
    let mut push = |slot: Slot, width: u16| {
        slots.push(ColumnSlot { slot, x, width });
        x = x.saturating_add(width + COLUMN_SPACING);
    };
    push(Slot::Checkbox, CHECKBOX_WIDTH);
    push(Slot::Id, ID_WIDTH);
    for header in headers {
        push(Slot::Field(*header), each);
    }
    push(Slot::Trigger, TRIGGER_WIDTH);
    slots
}

fn trigger_rect(kind: EntityKind, layout: &ScreenLayout, row_index: usize) -> Option<CellRect> {
    let inner = table_inner(layout.table);
    let trigger = column_slots(kind, inner)
        .into_iter()
        .find(|slot| slot.slot == Slot::Trigger)?;
    let top = i32::from(inner.y) + 1 + row_index as i32;
    Some(CellRect::new(
        top,
        i32::from(trigger.x),
        i32::from(trigger.width),
        1,
    ))
}

fn menu_size(table: &TableController) -> Size {
    let actions = table.menu_actions();
    let widest = actions
        .iter()
        .map(|action| action.label.chars().count())
        .max()
        .unwrap_or(0);
    Size {
        width: widest as i32 + 4,
        height: actions.len() as i32 + 2,
    }
}

fn menu_area(position: MenuPosition, size: Size, screen: Rect) -> Rect {
    let clamp = |value: i32| value.clamp(0, i32::from(u16::MAX)) as u16;
    Rect::new(
        clamp(position.left),
        clamp(position.top),
        clamp(size.width),
        clamp(size.height),
    )
    .intersection(screen)
}

fn tab_titles(state: &AppState) -> Vec<String> {
    EntityKind::ALL
        .iter()
        .map(|kind| format!("{} ({})", kind.label(), state.table(*kind).rows().len()))
        .collect()
}

fn tab_at(state: &AppState, tabs: Rect, column: u16) -> Option<EntityKind> {
    let mut x = tabs.x + 1;
    for (kind, title) in EntityKind::ALL.iter().zip(tab_titles(state)) {
        let end = x + title.chars().count() as u16 + 2;
        if column >= x && column < end {
            return Some(*kind);
        }
        x = end + 1;
    }
    None
}

fn pager_spans(table: &TableController) -> Vec<(String, Option<PagerTarget>)> {
    let page = table.page();
    let mut spans = vec![
        ("‹ prev".to_owned(), Some(PagerTarget::Prev)),
        (" ".to_owned(), None),
    ];
    for number in table.visible_pages() {
        let label = if number == page.page {
            format!("[{number}]")
        } else {
            format!(" {number} ")
        };
        spans.push((label, Some(PagerTarget::Page(number))));
    }
    spans.push((" ".to_owned(), None));
    spans.push(("next ›".to_owned(), Some(PagerTarget::Next)));
    spans.push((
        format!(
            "   page {}/{} · {} rows · {} per page · {} selected",
            page.page,
            page.total_pages.max(1),
            table.rows().len(),
            table.pagination().items_per_page(),
            table.selection_count()
        ),
        None,
    ));
    spans
}

fn pager_target_at(table: &TableController, pager: Rect, column: u16) -> Option<PagerTarget> {
    let mut x = pager.x;
    for (text, target) in pager_spans(table) {
        let end = x + text.chars().count() as u16;
        if column >= x && column < end {
            return target;
        }
        x = end;
    }
    None
}

fn header_label(table: &TableController, header: &str) -> String {
    let key = normalize_header(header);
    if table.pending_sort().is_some_and(|sort| sort.key == key) {
        return format!("{header} {SORT_MARK_PENDING}");
    }
    let sort = table.sort_state();
    if !sort.is_sorted_by(&key) {
        return header.to_owned();
    }
    let mark = match sort.direction {
        SortDirection::Asc => SORT_MARK_ASC,
        SortDirection::Desc => SORT_MARK_DESC,
    };
    format!("{header} {mark}")
}

fn cell_text(row: &Row, header: &str) -> String {
    row.field(&normalize_header(header))
        .map(|value| value.display())
        .unwrap_or_default()
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = screen_layout(frame.area());
    let table = state.active_table();

    let selected = EntityKind::ALL
        .iter()
        .position(|kind| *kind == state.active_kind)
        .unwrap_or(0);
    let tabs = Tabs::new(tab_titles(state))
        .block(Block::default().title("plandesk").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout.tabs);

    render_table(frame, layout.table, table, view_data);

    let pager = Line::from(
        pager_spans(table)
            .into_iter()
            .map(|(text, target)| match target {
                Some(_) => Span::styled(text, Style::default().fg(Color::Cyan)),
                None => Span::raw(text),
            })
            .collect::<Vec<_>>(),
    );
    frame.render_widget(Paragraph::new(pager), layout.pager);

    let status_widget = Paragraph::new(status_text(state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout.status);

    if let Some(open) = table.menu() {
        let area = menu_area(open.position, menu_size(table), frame.area());
        let lines = table
            .menu_actions()
            .into_iter()
            .enumerate()
            .map(|(index, action)| {
                let style = if index == view_data.menu_cursor {
                    Style::default().fg(Color::Black).bg(Color::Cyan)
                } else {
                    Style::default()
                };
                Line::styled(format!(" {}", action.label), style)
            })
            .collect::<Vec<_>>();
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL)),
            area,
        );
    }

    if let Some(copy) = table.confirmation_copy() {
        let area = centered_rect(60, 30, frame.area());
        frame.render_widget(Clear, area);
        let dialog = Paragraph::new(format!("{copy}\n\ny confirm · n cancel"))
            .wrap(ratatui::widgets::Wrap { trim: true })
            .block(
                Block::default()
                    .title("confirm removal")
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Red)),
            );
        frame.render_widget(dialog, area);
    }

    if let Some(detail) = &view_data.detail {
        let area = centered_rect(64, 60, frame.area());
        frame.render_widget(Clear, area);
        let body = Paragraph::new(detail.lines.join("\n"))
            .block(Block::default().title(detail.title.as_str()).borders(Borders::ALL));
        frame.render_widget(body, area);
    }

    if view_data.help_visible {
        let area = centered_rect(70, 70, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    table: &TableController,
    view_data: &ViewData,
) {
    let kind = table.kind();
    let inner = table_inner(area);
    let slots = column_slots(kind, inner);
    let widths = slots
        .iter()
        .map(|slot| Constraint::Length(slot.width))
        .collect::<Vec<_>>();
    let sortable = sortable_headers(kind);
    let focused_header = sortable.get(view_data.column).copied();

    let header_cells = slots.iter().map(|slot| {
        let (label, header) = match slot.slot {
            Slot::Checkbox => {
                let mark = if table.page_fully_selected() { "[x]" } else { "[ ]" };
                (mark.to_owned(), None)
            }
            Slot::Id => (header_label(table, ID_HEADER), Some(ID_HEADER)),
            Slot::Field(header) => (header_label(table, header), Some(header)),
            Slot::Trigger => (String::new(), None),
        };
        let mut style = Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);
        if header.is_some() && header == focused_header {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        Cell::from(label).style(style)
    });
    let header = TableRow::new(header_cells);

    let page = table.page();
    let cursor = view_data.cursor(kind);
    let open_row = table.menu().map(|menu| menu.row_index);
    let rows = page.rows.iter().enumerate().map(|(row_index, row)| {
        let selected = table.is_selected(row);
        let cells = slots
            .iter()
            .map(|slot| match slot.slot {
                Slot::Checkbox => {
                    let mark = if selected { "[x]" } else { "[ ]" };
                    Cell::from(mark).style(if selected {
                        Style::default().fg(Color::Green)
                    } else {
                        Style::default()
                    })
                }
                Slot::Id => Cell::from(row.id.to_string()),
                Slot::Field(header) => Cell::from(cell_text(row, header)),
                Slot::Trigger => {
                    let glyph = if table.actions_for(row).is_empty() {
                        ""
                    } else {
                        TRIGGER_GLYPH
                    };
                    let style = if open_row == Some(row_index) {
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    };
                    Cell::from(glyph).style(style)
                }
            })
            .collect::<Vec<_>>();
        let style = if row_index == cursor {
            Style::default().bg(Color::DarkGray)
        } else {
            Style::default()
        };
        TableRow::new(cells).style(style)
    });

    let title = if table.busy() {
        format!("{} (working…)", kind.label())
    } else {
        kind.label().to_owned()
    };
    let widget = Table::new(rows, widths)
        .header(header)
        .column_spacing(COLUMN_SPACING)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(widget, area);
}

fn status_text(state: &AppState) -> String {
    let hints = "tab kinds | j/k rows | h/l s sort | n/p g/G pages | space a x select | enter menu | A assign | r reload | ? help | q quit";
    match &state.status_line {
        Some(status) => format!("{} | {status} | {hints}", state.active_kind.label()),
        None => format!("{} | {hints}", state.active_kind.label()),
    }
}

fn help_overlay_text() -> &'static str {
    "tab / shift+tab  switch table\n\
     j / k            move row cursor\n\
     h / l            move column focus\n\
     s                sort by focused column (again to reverse)\n\
     n / p            next / previous page\n\
     g / G            first / last page\n\
     + / -            more / fewer rows per page\n\
     space            toggle row selection\n\
     a                toggle every row on this page\n\
     x                clear selection\n\
     enter / m        open row actions\n\
     A                assign selected plan to selected organizations\n\
     r                reload from the backend\n\
     mouse            click headers, checkboxes, pages and ⋯\n\
     ?                close help\n\
     q / ctrl+q       quit"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
