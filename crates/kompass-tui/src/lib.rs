// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use kompass_app::{
    CLICK_WINDOW, ClickAction, ClickResolver, ColumnEvent, ColumnId, DEFAULT_SEARCH_LIMIT,
    Debouncer, Item, ItemId, NavError, NavEvent, Navigator, ParentId, RESIZE_DEBOUNCE,
    SUMMARY_DEBOUNCE, SearchHit, build_summary, flatten_summary, search,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const IDLE_POLL: Duration = Duration::from_millis(120);
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const COLLAPSED_COLUMN_CELLS: u16 = 3;
const ROOT_COLUMN_TITLE: &str = "curriculum";
const BREADCRUMB_SEPARATOR: &str = " › ";
const CHILDREN_MARK: &str = " ›";

/// Persistence the explorer needs from its host.
pub trait AppRuntime {
    fn load_selection(&mut self) -> Result<Vec<ItemId>>;
    fn save_selection(&mut self, ids: &[ItemId]) -> Result<()>;
    fn confirm_uncheck_preference(&mut self) -> Result<bool>;
    fn set_confirm_uncheck_preference(&mut self, confirm: bool) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiOptions {
    /// Pixel width assumed for one terminal cell when sizing columns.
    pub cell_width_px: u16,
    pub summary_debounce: Duration,
    pub resize_debounce: Duration,
    pub click_window: Duration,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            cell_width_px: 8,
            summary_debounce: SUMMARY_DEBOUNCE,
            resize_debounce: RESIZE_DEBOUNCE,
            click_window: CLICK_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct SearchUiState {
    visible: bool,
    query: String,
    hits: Vec<SearchHit>,
    cursor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingUncheck {
    item: ItemId,
    column: ColumnId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScreenLayout {
    header: Rect,
    columns: Rect,
    summary: Option<Rect>,
    detail: Rect,
    status: Rect,
}

#[derive(Debug, Clone)]
struct ViewData {
    options: UiOptions,
    focus: Option<ColumnId>,
    cursors: HashMap<ColumnId, usize>,
    search: SearchUiState,
    pending_uncheck: Option<PendingUncheck>,
    confirm_uncheck: bool,
    summary_visible: bool,
    summary_rows: Vec<(usize, String)>,
    summary_debounce: Debouncer,
    resize_debounce: Debouncer,
    pending_width: Option<u32>,
    clicks: ClickResolver<(ColumnId, ItemId)>,
    help_visible: bool,
    status_line: Option<String>,
    status_token: u64,
}

impl ViewData {
    fn new(options: UiOptions, confirm_uncheck: bool) -> Self {
        Self {
            options,
            focus: None,
            cursors: HashMap::new(),
            search: SearchUiState::default(),
            pending_uncheck: None,
            confirm_uncheck,
            summary_visible: true,
            summary_rows: Vec::new(),
            summary_debounce: Debouncer::new(options.summary_debounce),
            resize_debounce: Debouncer::new(options.resize_debounce),
            pending_width: None,
            clicks: ClickResolver::new(options.click_window),
            help_visible: false,
            status_line: None,
            status_token: 0,
        }
    }
}

pub fn run_app<R: AppRuntime>(
    nav: &mut Navigator,
    runtime: &mut R,
    options: UiOptions,
) -> Result<()> {
    let confirm_uncheck = runtime
        .confirm_uncheck_preference()
        .context("load confirmation preference")?;
    let mut view_data = ViewData::new(options, confirm_uncheck);
    prepare_navigator(nav, runtime, &mut view_data)?;

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    let (internal_tx, internal_rx) = mpsc::channel();

    let (cols, _) = terminal::size().context("read terminal size")?;
    schedule_resize(&mut view_data, cols, Instant::now());
    info!(items = nav.store().len(), "explorer started");

    let mut result = Ok(());
    loop {
        process_internal_events(&mut view_data, &internal_rx);
        run_due_timers(nav, &mut view_data, &internal_tx, Instant::now());

        if let Err(error) = terminal.draw(|frame| render(frame, nav, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let timeout = next_poll_timeout(&view_data, Instant::now());
        let has_event = match event::poll(timeout).context("poll event") {
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
                if handle_key_event(nav, runtime, &mut view_data, &internal_tx, key) {
                    break;
                }
            }
            Ok(Event::Mouse(mouse)) => {
                let (width, height) = terminal::size().unwrap_or((0, 0));
                let screen = Rect::new(0, 0, width, height);
                handle_mouse_event(nav, &mut view_data, &internal_tx, mouse, screen);
            }
            Ok(Event::Resize(cols, _)) => schedule_resize(&mut view_data, cols, Instant::now()),
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

    let active = nav.store().active_ids();
    let saved = runtime.save_selection(&active).context("save selection");
    info!(selected = active.len(), "explorer closed");
    result.and(saved)
}

fn prepare_navigator<R: AppRuntime>(
    nav: &mut Navigator,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    if nav.root_column().is_none() {
        nav.create_root_column(true)
            .context("create root column")?;
    }

    let saved = runtime.load_selection().context("load saved selection")?;
    if !saved.is_empty() {
        let events = nav
            .restore_selection(saved)
            .context("restore saved selection")?;
        apply_nav_events(view_data, &events, Instant::now());
    }
    view_data.focus = nav.root_column();
    rebuild_summary(nav, view_data);
    Ok(())
}

fn process_internal_events(view_data: &mut ViewData, rx: &Receiver<InternalEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                view_data.status_line = None;
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    view_data.status_line = Some(message.into());
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn report_nav_error(view_data: &mut ViewData, internal_tx: &Sender<InternalEvent>, error: &NavError) {
    warn!(%error, "navigation request rejected");
    emit_status(view_data, internal_tx, format!("ignored: {error}"));
}

fn schedule_resize(view_data: &mut ViewData, cols: u16, now: Instant) {
    let width = u32::from(cols) * u32::from(view_data.options.cell_width_px);
    view_data.pending_width = Some(width);
    view_data.resize_debounce.poke(now);
}

fn run_due_timers(
    nav: &mut Navigator,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    now: Instant,
) {
    if view_data.resize_debounce.fire_if_due(now)
        && let Some(width) = view_data.pending_width.take()
    {
        match nav.resize(width) {
            Ok(events) => apply_nav_events(view_data, &events, now),
            Err(error) => report_nav_error(view_data, internal_tx, &error),
        }
    }

    if let Some(ClickAction::Single((column, item))) = view_data.clicks.poll(now) {
        select_item(nav, view_data, internal_tx, &item, column, now);
    }

    if view_data.summary_debounce.fire_if_due(now) {
        rebuild_summary(nav, view_data);
    }
}

fn next_poll_timeout(view_data: &ViewData, now: Instant) -> Duration {
    [
        view_data.summary_debounce.deadline(),
        view_data.resize_debounce.deadline(),
        view_data.clicks.deadline(),
    ]
    .into_iter()
    .flatten()
    .map(|deadline| deadline.saturating_duration_since(now))
    .fold(IDLE_POLL, Duration::min)
}

fn apply_nav_events(view_data: &mut ViewData, events: &[NavEvent], now: Instant) {
    for event in events {
        match event {
            NavEvent::Column(ColumnEvent::Removed { column }) => {
                view_data.cursors.remove(column);
                if view_data.focus == Some(*column) {
                    view_data.focus = None;
                }
            }
            NavEvent::BudgetChanged {
                old,
                new,
                column_width,
            } => {
                debug!(old, new, column_width, "column budget changed");
            }
            _ => {}
        }
    }
    if events.iter().any(NavEvent::affects_selection) {
        view_data.summary_debounce.poke(now);
    }
}

fn rebuild_summary(nav: &Navigator, view_data: &mut ViewData) {
    let tree = build_summary(nav.store());
    view_data.summary_rows = flatten_summary(&tree)
        .into_iter()
        .map(|(depth, node)| (depth, node.label.clone()))
        .collect();
}

fn focused_column(nav: &Navigator, view_data: &ViewData) -> Option<ColumnId> {
    view_data
        .focus
        .filter(|column| nav.columns().get(*column).is_some())
        .or_else(|| nav.last_column())
}

fn cursor_for(view_data: &ViewData, column: ColumnId, len: usize) -> usize {
    let cursor = view_data.cursors.get(&column).copied().unwrap_or(0);
    cursor.min(len.saturating_sub(1))
}

fn cursor_item(nav: &Navigator, view_data: &ViewData, column: ColumnId) -> Option<ItemId> {
    let items = nav.column_items(column).ok()?;
    let cursor = cursor_for(view_data, column, items.len());
    items.get(cursor).map(|item| item.id.clone())
}

fn place_cursor(nav: &Navigator, view_data: &mut ViewData, column: ColumnId, item: &ItemId) {
    let position = nav
        .column_items(column)
        .ok()
        .and_then(|items| items.iter().position(|candidate| &candidate.id == item));
    if let Some(position) = position {
        view_data.cursors.insert(column, position);
    }
}

fn handle_key_event<R: AppRuntime>(
    nav: &mut Navigator,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let now = Instant::now();
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
        }
        return false;
    }

    if view_data.pending_uncheck.is_some() {
        handle_confirm_key(nav, runtime, view_data, internal_tx, key, now);
        return false;
    }

    if view_data.search.visible {
        handle_search_key(nav, view_data, internal_tx, key, now);
        return false;
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), KeyModifiers::NONE) => return true,
        (KeyCode::Char('?'), _) => view_data.help_visible = true,
        (KeyCode::Char('/'), KeyModifiers::NONE) => {
            view_data.search = SearchUiState {
                visible: true,
                ..SearchUiState::default()
            };
        }
        (KeyCode::Char('s'), KeyModifiers::NONE) => {
            view_data.summary_visible = !view_data.summary_visible;
            if view_data.summary_visible {
                view_data.summary_debounce.cancel();
                rebuild_summary(nav, view_data);
            }
        }
        (KeyCode::Char('c'), KeyModifiers::NONE) => {
            toggle_confirm_preference(runtime, view_data, internal_tx);
        }
        (KeyCode::Left | KeyCode::Char('h'), _) => move_focus(nav, view_data, internal_tx, -1),
        (KeyCode::Right | KeyCode::Char('l'), _) => move_focus(nav, view_data, internal_tx, 1),
        (KeyCode::Up | KeyCode::Char('k'), _) => move_cursor(nav, view_data, -1),
        (KeyCode::Down | KeyCode::Char('j'), _) => move_cursor(nav, view_data, 1),
        (KeyCode::Enter, _) => {
            if let Some((column, item)) = focused_target(nav, view_data, internal_tx) {
                select_item(nav, view_data, internal_tx, &item, column, now);
            }
        }
        (KeyCode::Char(' '), _) => {
            if let Some((column, item)) = focused_target(nav, view_data, internal_tx) {
                toggle_item(nav, view_data, internal_tx, &item, column, now);
            }
        }
        (KeyCode::Backspace, _) => go_back(nav, view_data, internal_tx, now),
        (KeyCode::Char('g'), KeyModifiers::NONE) | (KeyCode::Home, _) => {
            go_to_root(nav, view_data, internal_tx, now);
        }
        _ => {}
    }
    false
}

fn focused_target(
    nav: &Navigator,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) -> Option<(ColumnId, ItemId)> {
    let column = focused_column(nav, view_data)?;
    match cursor_item(nav, view_data, column) {
        Some(item) => Some((column, item)),
        None => {
            emit_status(view_data, internal_tx, "column is empty");
            None
        }
    }
}

fn move_focus(
    nav: &Navigator,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    delta: isize,
) {
    let Some(current) = focused_column(nav, view_data) else {
        return;
    };
    let visible = nav
        .columns()
        .iter()
        .filter(|column| !column.is_collapsed() || column.id() == current)
        .map(|column| column.id())
        .collect::<Vec<_>>();
    let Some(index) = visible.iter().position(|column| *column == current) else {
        return;
    };
    match index.checked_add_signed(delta).and_then(|next| visible.get(next)) {
        Some(next) => view_data.focus = Some(*next),
        None => emit_status(view_data, internal_tx, "no more columns"),
    }
}

fn move_cursor(nav: &Navigator, view_data: &mut ViewData, delta: isize) {
    let Some(column) = focused_column(nav, view_data) else {
        return;
    };
    let len = nav.column_items(column).map(|items| items.len()).unwrap_or(0);
    if len == 0 {
        return;
    }
    let cursor = cursor_for(view_data, column, len);
    let next = cursor.saturating_add_signed(delta).min(len - 1);
    view_data.cursors.insert(column, next);
}

fn select_item(
    nav: &mut Navigator,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    item: &ItemId,
    column: ColumnId,
    now: Instant,
) {
    match nav.select_item(item, column) {
        Ok(events) => {
            let opened = events
                .iter()
                .any(|event| matches!(event, NavEvent::Column(ColumnEvent::Added { .. })));
            apply_nav_events(view_data, &events, now);
            place_cursor(nav, view_data, column, item);
            view_data.focus = if opened {
                nav.last_column()
            } else {
                Some(column)
            };
        }
        Err(error) => report_nav_error(view_data, internal_tx, &error),
    }
}

fn toggle_item(
    nav: &mut Navigator,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    item: &ItemId,
    column: ColumnId,
    now: Instant,
) {
    let active = nav.store().get(item).is_some_and(|found| found.active);
    if active && view_data.confirm_uncheck && nav.needs_confirmation(item) {
        view_data.pending_uncheck = Some(PendingUncheck {
            item: item.clone(),
            column,
        });
        return;
    }

    match nav.set_active(item, column, !active, view_data.confirm_uncheck, || true) {
        Ok(events) => {
            apply_nav_events(view_data, &events, now);
            let verb = if active { "deselected" } else { "selected" };
            emit_status(
                view_data,
                internal_tx,
                format!("{verb} {}", item_label(nav, item)),
            );
        }
        Err(error) => report_nav_error(view_data, internal_tx, &error),
    }
}

fn handle_confirm_key<R: AppRuntime>(
    nav: &mut Navigator,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
    now: Instant,
) {
    let Some(pending) = view_data.pending_uncheck.clone() else {
        return;
    };
    let confirmed = match key.code {
        KeyCode::Char('y') | KeyCode::Enter => true,
        KeyCode::Char('a') => {
            if let Err(error) = runtime.set_confirm_uncheck_preference(false) {
                warn!(error = %format!("{error:#}"), "could not save confirmation preference");
            }
            view_data.confirm_uncheck = false;
            true
        }
        KeyCode::Char('n') | KeyCode::Esc => false,
        _ => return,
    };
    view_data.pending_uncheck = None;

    match nav.set_active(&pending.item, pending.column, false, true, move || confirmed) {
        Ok(events) => {
            let declined = events
                .iter()
                .any(|event| matches!(event, NavEvent::CascadeDeclined { .. }));
            apply_nav_events(view_data, &events, now);
            let label = item_label(nav, &pending.item);
            let message = if declined {
                format!("kept {label}")
            } else {
                format!("deselected {label} and its children")
            };
            emit_status(view_data, internal_tx, message);
        }
        Err(error) => report_nav_error(view_data, internal_tx, &error),
    }
}

fn toggle_confirm_preference<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let next = !view_data.confirm_uncheck;
    match runtime.set_confirm_uncheck_preference(next) {
        Ok(()) => {
            view_data.confirm_uncheck = next;
            let label = if next { "on" } else { "off" };
            emit_status(view_data, internal_tx, format!("confirm deselect {label}"));
        }
        Err(error) => emit_status(
            view_data,
            internal_tx,
            format!("preference not saved: {error:#}"),
        ),
    }
}

fn handle_search_key(
    nav: &mut Navigator,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
    now: Instant,
) {
    match key.code {
        KeyCode::Esc => view_data.search = SearchUiState::default(),
        KeyCode::Enter => {
            let target = view_data
                .search
                .hits
                .get(view_data.search.cursor)
                .map(|hit| hit.id.clone());
            view_data.search = SearchUiState::default();
            if let Some(item) = target {
                jump_to(nav, view_data, internal_tx, &item, now);
            }
        }
        KeyCode::Up => {
            view_data.search.cursor = view_data.search.cursor.saturating_sub(1);
        }
        KeyCode::Down => {
            let last = view_data.search.hits.len().saturating_sub(1);
            view_data.search.cursor = (view_data.search.cursor + 1).min(last);
        }
        KeyCode::Backspace => {
            view_data.search.query.pop();
            refresh_search(nav, &mut view_data.search);
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            view_data.search.query.push(ch);
            refresh_search(nav, &mut view_data.search);
        }
        _ => {}
    }
}

fn refresh_search(nav: &Navigator, state: &mut SearchUiState) {
    state.hits = search(nav.store(), &state.query, DEFAULT_SEARCH_LIMIT);
    state.cursor = 0;
}

fn jump_to(
    nav: &mut Navigator,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    item: &ItemId,
    now: Instant,
) {
    match nav.jump_to(item) {
        Ok(events) => {
            apply_nav_events(view_data, &events, now);
            view_data.focus = nav.last_column();
            if let Some(column) = view_data.focus {
                place_cursor(nav, view_data, column, item);
            }
        }
        Err(error) => report_nav_error(view_data, internal_tx, &error),
    }
}

fn go_back(
    nav: &mut Navigator,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    now: Instant,
) {
    let ids = nav.columns().ids();
    let [.., previous, _] = ids.as_slice() else {
        emit_status(view_data, internal_tx, "already at the first column");
        return;
    };
    match nav.go_back(*previous) {
        Ok(events) => {
            apply_nav_events(view_data, &events, now);
            view_data.focus = Some(*previous);
        }
        Err(error) => report_nav_error(view_data, internal_tx, &error),
    }
}

fn go_to_root(
    nav: &mut Navigator,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    now: Instant,
) {
    let Some(column) = focused_column(nav, view_data) else {
        return;
    };
    match nav.go_to_root(column) {
        Ok(events) => {
            apply_nav_events(view_data, &events, now);
            view_data.focus = nav.root_column();
        }
        Err(error) => report_nav_error(view_data, internal_tx, &error),
    }
}

fn handle_mouse_event(
    nav: &mut Navigator,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    mouse: MouseEvent,
    screen: Rect,
) {
    if view_data.help_visible || view_data.search.visible || view_data.pending_uncheck.is_some()
    {
        return;
    }
    if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
        return;
    }

    let now = Instant::now();
    let layout = screen_layout(screen, view_data.summary_visible);
    let Some((column, item)) = hit_test(nav, view_data, layout.columns, mouse.column, mouse.row)
    else {
        return;
    };
    view_data.focus = Some(column);
    place_cursor(nav, view_data, column, &item);

    match view_data.clicks.click((column, item), now) {
        Some(ClickAction::Double((column, item))) => {
            toggle_item(nav, view_data, internal_tx, &item, column, now);
        }
        Some(ClickAction::Single((column, item))) => {
            select_item(nav, view_data, internal_tx, &item, column, now);
        }
        None => {}
    }
}

fn column_states(nav: &Navigator) -> Vec<(ColumnId, bool)> {
    nav.columns()
        .iter()
        .map(|column| (column.id(), column.is_collapsed()))
        .collect()
}

/// Collapsed columns shrink to a thin strip; expanded ones share the rest.
fn column_layout(columns: &[(ColumnId, bool)], area: Rect) -> Vec<(ColumnId, Rect)> {
    let constraints = columns
        .iter()
        .map(|(_, collapsed)| {
            if *collapsed {
                Constraint::Length(COLLAPSED_COLUMN_CELLS)
            } else {
                Constraint::Fill(1)
            }
        })
        .collect::<Vec<_>>();
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);
    columns
        .iter()
        .zip(chunks.iter())
        .map(|((column, _), rect)| (*column, *rect))
        .collect()
}

fn scroll_offset(cursor: usize, height: usize) -> usize {
    if height == 0 {
        return 0;
    }
    cursor.saturating_sub(height - 1)
}

fn hit_test(
    nav: &Navigator,
    view_data: &ViewData,
    area: Rect,
    x: u16,
    y: u16,
) -> Option<(ColumnId, ItemId)> {
    let (column, rect) = column_layout(&column_states(nav), area)
        .into_iter()
        .find(|(_, rect)| x >= rect.x && x < rect.right() && y >= rect.y && y < rect.bottom())?;
    if nav.columns().is_collapsed(column).unwrap_or(true) {
        return None;
    }

    let inner_top = rect.y + 1;
    if y < inner_top || y + 1 >= rect.bottom() {
        return None;
    }
    let height = usize::from(rect.height.saturating_sub(2));
    let items = nav.column_items(column).ok()?;
    let offset = scroll_offset(cursor_for(view_data, column, items.len()), height);
    let row = usize::from(y - inner_top) + offset;
    items.get(row).map(|item| (column, item.id.clone()))
}

fn screen_layout(area: Rect, summary_visible: bool) -> ScreenLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(7),
            Constraint::Length(3),
        ])
        .split(area);

    let (columns, summary) = if summary_visible {
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(72), Constraint::Percentage(28)])
            .split(rows[1]);
        (body[0], Some(body[1]))
    } else {
        (rows[1], None)
    };

    ScreenLayout {
        header: rows[0],
        columns,
        summary,
        detail: rows[2],
        status: rows[3],
    }
}

fn render(frame: &mut ratatui::Frame<'_>, nav: &Navigator, view_data: &ViewData) {
    let layout = screen_layout(frame.area(), view_data.summary_visible);

    let header = Paragraph::new(render_breadcrumb_text(nav))
        .block(Block::default().title("kompass").borders(Borders::ALL));
    frame.render_widget(header, layout.header);

    let focus = focused_column(nav, view_data);
    for (column, area) in column_layout(&column_states(nav), layout.columns) {
        render_column(frame, nav, view_data, column, area, focus == Some(column));
    }

    if let Some(area) = layout.summary {
        let summary = Paragraph::new(render_summary_text(&view_data.summary_rows))
            .block(Block::default().title("selection").borders(Borders::ALL));
        frame.render_widget(summary, area);
    }

    let detail = Paragraph::new(render_detail_text(nav.detail_item()))
        .wrap(Wrap { trim: true })
        .block(Block::default().title("detail").borders(Borders::ALL));
    frame.render_widget(detail, layout.detail);

    let status = Paragraph::new(status_text(nav, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout.status);

    if view_data.search.visible {
        let area = centered_rect(60, 50, frame.area());
        frame.render_widget(Clear, area);
        let overlay = Paragraph::new(render_search_overlay_text(&view_data.search))
            .block(Block::default().title("search").borders(Borders::ALL));
        frame.render_widget(overlay, area);
    }

    if let Some(pending) = &view_data.pending_uncheck {
        let area = centered_rect(50, 25, frame.area());
        frame.render_widget(Clear, area);
        let overlay = Paragraph::new(render_confirm_overlay_text(&item_label(nav, &pending.item)))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title("confirm")
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Red)),
            );
        frame.render_widget(overlay, area);
    }

    if view_data.help_visible {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_column(
    frame: &mut ratatui::Frame<'_>,
    nav: &Navigator,
    view_data: &ViewData,
    column: ColumnId,
    area: Rect,
    focused: bool,
) {
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let block = Block::default().borders(Borders::ALL).border_style(border_style);

    if nav.columns().is_collapsed(column).unwrap_or(true) {
        frame.render_widget(block, area);
        return;
    }

    let items = nav.column_items(column).unwrap_or_default();
    let height = usize::from(area.height.saturating_sub(2));
    let cursor = cursor_for(view_data, column, items.len());
    let offset = scroll_offset(cursor, height);

    let lines = items
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(index, item)| {
            let mut style = Style::default();
            if item.expanded {
                style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
            }
            if item.highlighted {
                style = style.fg(Color::Yellow);
            }
            if focused && index == cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Line::styled(column_row_text(item), style)
        })
        .collect::<Vec<_>>();

    let title = column_title(nav, column);
    frame.render_widget(Paragraph::new(lines).block(block.title(title)), area);
}

fn column_title(nav: &Navigator, column: ColumnId) -> String {
    match nav.columns().get(column).map(|found| found.parent()) {
        Some(ParentId::Item(parent)) => item_label(nav, parent),
        _ => ROOT_COLUMN_TITLE.to_owned(),
    }
}

fn item_label(nav: &Navigator, item: &ItemId) -> String {
    nav.store()
        .get(item)
        .map_or_else(|| item.to_string(), Item::label)
}

fn column_row_text(item: &Item) -> String {
    let mark = if item.active { "[x]" } else { "[ ]" };
    let children = if item.has_children { CHILDREN_MARK } else { "" };
    format!("{mark} {}{children}", item.label())
}

fn render_breadcrumb_text(nav: &Navigator) -> String {
    nav.columns()
        .iter()
        .map(|column| match column.parent() {
            ParentId::Root => ROOT_COLUMN_TITLE.to_owned(),
            ParentId::Item(parent) => item_label(nav, parent),
        })
        .collect::<Vec<_>>()
        .join(BREADCRUMB_SEPARATOR)
}

fn render_detail_text(item: Option<&Item>) -> String {
    let Some(item) = item else {
        return "select an item to see its details".to_owned();
    };

    let mut lines = vec![
        item.label(),
        format!("id: {}", item.id),
        format!(
            "selected: {}",
            if item.active { "yes" } else { "no" }
        ),
    ];
    if let Some(kind) = &item.kind {
        lines.push(format!("type: {kind}"));
    }
    for (key, value) in &item.data {
        let rendered = match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        lines.push(format!("{key}: {rendered}"));
    }
    lines.join("\n")
}

fn render_summary_text(rows: &[(usize, String)]) -> String {
    if rows.is_empty() {
        return "nothing selected".to_owned();
    }
    rows.iter()
        .map(|(depth, label)| format!("{}{label}", "  ".repeat(*depth)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_search_overlay_text(state: &SearchUiState) -> String {
    let mut lines = vec![format!("/ {}", state.query), String::new()];
    if state.query.trim().is_empty() {
        lines.push("type to search ids and names".to_owned());
    } else if state.hits.is_empty() {
        lines.push("no matches".to_owned());
    } else {
        lines.extend(state.hits.iter().enumerate().map(|(index, hit)| {
            let marker = if index == state.cursor { ">" } else { " " };
            format!("{marker} {}", hit.label)
        }));
    }
    lines.push(String::new());
    lines.push("up/down choose | enter jump | esc close".to_owned());
    lines.join("\n")
}

fn render_confirm_overlay_text(label: &str) -> String {
    format!(
        "Deselect {label}?\nIts selected children will be deselected too.\n\n\
y/enter yes | a yes, stop asking | n/esc keep"
    )
}

fn help_overlay_text() -> &'static str {
    "columns: h/l or left/right focus | j/k or up/down move\n\
items: enter open | space select/deselect | backspace back | g/home first column\n\
mouse: click open | double click select/deselect\n\
panels: / search | s selection summary | c confirm deselect on/off\n\
global: ? help | q or ctrl+q quit"
}

fn status_text(nav: &Navigator, view_data: &ViewData) -> String {
    if let Some(status) = &view_data.status_line {
        return status.clone();
    }
    let selected = nav.store().active_ids().len();
    let confirm = if view_data.confirm_uncheck { "on" } else { "off" };
    format!(
        "{selected} selected | h/l j/k | enter open | space select | bksp back | g root | / search | s summary | c confirm:{confirm} | ? help | q"
    )
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

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, COLLAPSED_COLUMN_CELLS, IDLE_POLL, InternalEvent, UiOptions, ViewData,
        column_layout, column_row_text, handle_key_event, help_overlay_text, hit_test,
        next_poll_timeout, prepare_navigator, process_internal_events, render_breadcrumb_text,
        render_confirm_overlay_text, render_detail_text, render_search_overlay_text,
        render_summary_text, run_due_timers, schedule_resize, scroll_offset, status_text,
    };
    use anyhow::{Result, anyhow};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use kompass_app::{ColumnId, ItemFlag, ItemId, ItemInput, ItemStore, Navigator};
    use kompass_testkit::CurriculumBuilder;
    use ratatui::layout::Rect;
    use serde_json::json;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    #[derive(Debug, Default)]
    struct TestRuntime {
        selection: Vec<ItemId>,
        confirm_uncheck: Option<bool>,
        saved: Option<Vec<ItemId>>,
        preference_writes: Vec<bool>,
    }

    impl AppRuntime for TestRuntime {
        fn load_selection(&mut self) -> Result<Vec<ItemId>> {
            Ok(self.selection.clone())
        }

        fn save_selection(&mut self, ids: &[ItemId]) -> Result<()> {
            self.saved = Some(ids.to_vec());
            Ok(())
        }

        fn confirm_uncheck_preference(&mut self) -> Result<bool> {
            Ok(self.confirm_uncheck.unwrap_or(true))
        }

        fn set_confirm_uncheck_preference(&mut self, confirm: bool) -> Result<()> {
            self.preference_writes.push(confirm);
            self.confirm_uncheck = Some(confirm);
            Ok(())
        }
    }

    fn id(value: &str) -> ItemId {
        ItemId::new(value)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn internal_tx() -> mpsc::Sender<InternalEvent> {
        let (tx, _rx) = mpsc::channel();
        tx
    }

    /// root: fr, ma / fr: fr-1, fr-2 / fr-1: fr-1-1, fr-1-2
    fn explorer(runtime: &mut TestRuntime) -> Result<(Navigator, ViewData)> {
        let store = CurriculumBuilder::new()
            .group("root", &[("fr", "Français"), ("ma", "Mathématiques")])
            .group("fr", &[("fr-1", "Lire"), ("fr-2", "Écrire")])
            .group("fr-1", &[("fr-1-1", "Cycle 1"), ("fr-1-2", "Cycle 2")])
            .store();
        let mut nav = Navigator::new(store, 1200);
        let mut view_data = ViewData::new(UiOptions::default(), true);
        prepare_navigator(&mut nav, runtime, &mut view_data)?;
        Ok((nav, view_data))
    }

    fn press(
        nav: &mut Navigator,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        codes: &[KeyCode],
    ) -> bool {
        let tx = internal_tx();
        codes
            .iter()
            .map(|code| handle_key_event(nav, runtime, view_data, &tx, key(*code)))
            .last()
            .unwrap_or(false)
    }

    fn active(nav: &Navigator, value: &str) -> bool {
        nav.store().get(&id(value)).is_some_and(|item| item.active)
    }

    #[test]
    fn startup_restores_the_saved_selection() -> Result<()> {
        let mut runtime = TestRuntime {
            selection: vec![id("fr-1-2"), id("missing")],
            ..TestRuntime::default()
        };
        let (nav, view_data) = explorer(&mut runtime)?;

        assert_eq!(nav.store().active_ids(), vec![id("fr"), id("fr-1"), id("fr-1-2")]);
        assert_eq!(view_data.focus, nav.root_column());
        assert_eq!(render_summary_text(&view_data.summary_rows), "Français\n  Lire\n    Cycle 2");
        Ok(())
    }

    #[test]
    fn enter_opens_the_children_and_moves_focus() -> Result<()> {
        let mut runtime = TestRuntime::default();
        let (mut nav, mut view_data) = explorer(&mut runtime)?;

        press(&mut nav, &mut runtime, &mut view_data, &[KeyCode::Enter]);
        assert_eq!(nav.columns().len(), 2);
        assert_eq!(view_data.focus, nav.last_column());
        assert_eq!(render_breadcrumb_text(&nav), "curriculum › Français");

        press(
            &mut nav,
            &mut runtime,
            &mut view_data,
            &[KeyCode::Char('j'), KeyCode::Enter],
        );
        assert_eq!(nav.detail(), Some(&id("fr-2")));
        assert_eq!(nav.columns().len(), 2);
        Ok(())
    }

    #[test]
    fn space_selects_and_schedules_a_summary_refresh() -> Result<()> {
        let mut runtime = TestRuntime::default();
        let (mut nav, mut view_data) = explorer(&mut runtime)?;
        press(
            &mut nav,
            &mut runtime,
            &mut view_data,
            &[KeyCode::Enter, KeyCode::Enter, KeyCode::Char(' ')],
        );

        assert!(active(&nav, "fr-1-1"));
        assert!(active(&nav, "fr-1"));
        assert!(active(&nav, "fr"));
        assert!(view_data.summary_debounce.is_pending());
        assert_eq!(view_data.status_line.as_deref(), Some("selected Cycle 1"));
        Ok(())
    }

    #[test]
    fn deselecting_a_parent_asks_first() -> Result<()> {
        let mut runtime = TestRuntime {
            selection: vec![id("fr-1-1")],
            ..TestRuntime::default()
        };
        let (mut nav, mut view_data) = explorer(&mut runtime)?;

        press(&mut nav, &mut runtime, &mut view_data, &[KeyCode::Char(' ')]);
        assert!(view_data.pending_uncheck.is_some());
        assert!(active(&nav, "fr"));

        press(&mut nav, &mut runtime, &mut view_data, &[KeyCode::Char('n')]);
        assert!(view_data.pending_uncheck.is_none());
        assert!(active(&nav, "fr-1-1"));
        assert_eq!(view_data.status_line.as_deref(), Some("kept Français"));

        press(
            &mut nav,
            &mut runtime,
            &mut view_data,
            &[KeyCode::Char(' '), KeyCode::Char('y')],
        );
        assert!(nav.store().active_ids().is_empty());
        Ok(())
    }

    #[test]
    fn always_answer_turns_the_prompt_off() -> Result<()> {
        let mut runtime = TestRuntime {
            selection: vec![id("fr-2")],
            ..TestRuntime::default()
        };
        let (mut nav, mut view_data) = explorer(&mut runtime)?;

        press(
            &mut nav,
            &mut runtime,
            &mut view_data,
            &[KeyCode::Char(' '), KeyCode::Char('a')],
        );
        assert!(nav.store().active_ids().is_empty());
        assert!(!view_data.confirm_uncheck);
        assert_eq!(runtime.preference_writes, vec![false]);

        press(&mut nav, &mut runtime, &mut view_data, &[KeyCode::Char('c')]);
        assert!(view_data.confirm_uncheck);
        assert_eq!(runtime.preference_writes, vec![false, true]);
        Ok(())
    }

    #[test]
    fn search_overlay_jumps_to_the_chosen_hit() -> Result<()> {
        let mut runtime = TestRuntime::default();
        let (mut nav, mut view_data) = explorer(&mut runtime)?;

        let mut keys = vec![KeyCode::Char('/')];
        keys.extend("cycle".chars().map(KeyCode::Char));
        keys.push(KeyCode::Down);
        press(&mut nav, &mut runtime, &mut view_data, &keys);
        assert_eq!(view_data.search.hits.len(), 2);
        assert!(render_search_overlay_text(&view_data.search).contains("> Cycle 2"));

        press(&mut nav, &mut runtime, &mut view_data, &[KeyCode::Enter]);
        assert!(!view_data.search.visible);
        assert_eq!(nav.columns().len(), 3);
        assert_eq!(view_data.focus, nav.last_column());
        assert!(
            nav.store()
                .get(&id("fr-1-2"))
                .is_some_and(|item| item.flag(ItemFlag::Highlighted))
        );
        let focus = view_data.focus.ok_or_else(|| anyhow!("no focus"))?;
        assert_eq!(view_data.cursors.get(&focus), Some(&1));
        Ok(())
    }

    #[test]
    fn backspace_and_g_walk_back_up() -> Result<()> {
        let mut runtime = TestRuntime::default();
        let (mut nav, mut view_data) = explorer(&mut runtime)?;
        press(&mut nav, &mut runtime, &mut view_data, &[KeyCode::Enter, KeyCode::Enter]);
        assert_eq!(nav.columns().len(), 3);

        press(&mut nav, &mut runtime, &mut view_data, &[KeyCode::Backspace]);
        assert_eq!(nav.columns().len(), 2);
        assert_eq!(view_data.focus, nav.last_column());

        press(&mut nav, &mut runtime, &mut view_data, &[KeyCode::Enter, KeyCode::Char('g')]);
        assert_eq!(nav.columns().len(), 1);
        assert_eq!(view_data.focus, nav.root_column());

        press(&mut nav, &mut runtime, &mut view_data, &[KeyCode::Backspace]);
        assert_eq!(
            view_data.status_line.as_deref(),
            Some("already at the first column")
        );
        Ok(())
    }

    #[test]
    fn quit_keys_end_the_loop() -> Result<()> {
        let mut runtime = TestRuntime::default();
        let (mut nav, mut view_data) = explorer(&mut runtime)?;
        let tx = internal_tx();

        assert!(press(&mut nav, &mut runtime, &mut view_data, &[KeyCode::Char('q')]));
        assert!(handle_key_event(
            &mut nav,
            &mut runtime,
            &mut view_data,
            &tx,
            KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL),
        ));

        press(&mut nav, &mut runtime, &mut view_data, &[KeyCode::Char('/')]);
        assert!(!press(&mut nav, &mut runtime, &mut view_data, &[KeyCode::Char('q')]));
        assert_eq!(view_data.search.query, "q");
        Ok(())
    }

    #[test]
    fn help_overlay_swallows_keys_until_closed() -> Result<()> {
        let mut runtime = TestRuntime::default();
        let (mut nav, mut view_data) = explorer(&mut runtime)?;

        press(&mut nav, &mut runtime, &mut view_data, &[KeyCode::Char('?'), KeyCode::Enter]);
        assert!(view_data.help_visible);
        assert_eq!(nav.columns().len(), 1);
        press(&mut nav, &mut runtime, &mut view_data, &[KeyCode::Esc]);
        assert!(!view_data.help_visible);
        assert!(help_overlay_text().contains("double click"));
        Ok(())
    }

    #[test]
    fn collapsed_columns_get_a_thin_strip() {
        let area = Rect::new(0, 0, 100, 20);
        let columns = [
            (ColumnId::new(1), true),
            (ColumnId::new(2), false),
            (ColumnId::new(3), false),
        ];
        let layout = column_layout(&columns, area);

        assert_eq!(layout.len(), 3);
        assert_eq!(layout[0].1.width, COLLAPSED_COLUMN_CELLS);
        assert_eq!(
            layout[1].1.width + layout[2].1.width,
            100 - COLLAPSED_COLUMN_CELLS
        );
    }

    #[test]
    fn hit_test_maps_rows_to_items() -> Result<()> {
        let mut runtime = TestRuntime::default();
        let (nav, view_data) = explorer(&mut runtime)?;
        let area = Rect::new(0, 0, 40, 10);
        let root = nav.root_column().ok_or_else(|| anyhow!("no root column"))?;

        assert_eq!(hit_test(&nav, &view_data, area, 5, 2), Some((root, id("ma"))));
        assert_eq!(hit_test(&nav, &view_data, area, 5, 0), None);
        assert_eq!(hit_test(&nav, &view_data, area, 5, 5), None);
        Ok(())
    }

    #[test]
    fn scroll_keeps_the_cursor_on_screen() {
        assert_eq!(scroll_offset(3, 10), 0);
        assert_eq!(scroll_offset(12, 10), 3);
        assert_eq!(scroll_offset(5, 0), 0);
    }

    #[test]
    fn detail_text_lists_kind_and_data() {
        let store = CurriculumBuilder::new()
            .item(
                "root",
                ItemInput::new("lv", "Niveau <em>1</em>")
                    .with_kind("level")
                    .with_data("cycle", json!(2))
                    .with_data("code", json!("FR 21")),
            )
            .store();
        let item = store.get(&id("lv"));

        assert_eq!(
            render_detail_text(item),
            "Niveau 1\nid: lv\nselected: no\ntype: level\ncycle: 2\ncode: FR 21"
        );
        assert!(render_detail_text(None).contains("select an item"));
    }

    #[test]
    fn rows_show_selection_and_children() {
        let store = ItemStore::from_groups(
            &CurriculumBuilder::new()
                .group("root", &[("a", "Alpha")])
                .group("a", &[("b", "Beta")])
                .build(),
        );
        let rows = store.iter().map(column_row_text).collect::<Vec<_>>();
        assert_eq!(rows, vec!["[ ] Alpha ›", "[ ] Beta"]);
    }

    #[test]
    fn status_line_replaces_the_hints_until_cleared() -> Result<()> {
        let mut runtime = TestRuntime::default();
        let (nav, mut view_data) = explorer(&mut runtime)?;
        assert!(status_text(&nav, &view_data).starts_with("0 selected"));
        assert!(status_text(&nav, &view_data).contains("confirm:on"));

        view_data.status_line = Some("saved".to_owned());
        view_data.status_token = 2;
        let (tx, rx) = mpsc::channel();
        tx.send(InternalEvent::ClearStatus { token: 1 })?;
        process_internal_events(&mut view_data, &rx);
        assert_eq!(status_text(&nav, &view_data), "saved");

        tx.send(InternalEvent::ClearStatus { token: 2 })?;
        process_internal_events(&mut view_data, &rx);
        assert!(view_data.status_line.is_none());
        Ok(())
    }

    #[test]
    fn resize_is_applied_after_the_debounce_window() -> Result<()> {
        let mut runtime = TestRuntime::default();
        let (mut nav, mut view_data) = explorer(&mut runtime)?;
        let tx = internal_tx();
        let start = Instant::now();

        schedule_resize(&mut view_data, 80, start);
        assert!(next_poll_timeout(&view_data, start) <= view_data.options.resize_debounce);
        run_due_timers(&mut nav, &mut view_data, &tx, start);
        assert_eq!(nav.viewport().width(), 1200);

        let due = start + view_data.options.resize_debounce;
        run_due_timers(&mut nav, &mut view_data, &tx, due);
        assert_eq!(nav.viewport().width(), 640);
        assert_eq!(nav.viewport().budget(), 2);
        assert_eq!(next_poll_timeout(&view_data, start + Duration::from_secs(1)), IDLE_POLL);
        Ok(())
    }

    #[test]
    fn confirm_text_names_the_item() {
        let text = render_confirm_overlay_text("Français");
        assert!(text.starts_with("Deselect Français?"));
        assert!(text.contains("n/esc keep"));
    }
}
