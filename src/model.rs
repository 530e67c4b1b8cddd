use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufWriter;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

use gateview::domain::{CMDMode, GateViewError, HELP_TEXT, Message, ViewConfig, ViewError};
use gateview::feed::ReplayFeed;
use gateview::filter::{FilterClause, parse_range, search_domain};
use gateview::pagination::parse_page_size;
use gateview::record::{StatusClass, Value};
use gateview::view::{TableView, ViewSnapshot};

use crate::inputter::{InputResult, Inputter};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    FILTER,
    COLUMNS,
    POPUP,
    CMDINPUT,
}

/// Excel-style checklist for one column.
struct FilterMenu {
    column: String,
    label: String,
    domain: BTreeSet<Value>,
    checked: BTreeSet<Value>,
    search: String,
    cursor: usize, // Index into the options matching `search`
}

impl FilterMenu {
    fn options(&self) -> Vec<&Value> {
        search_domain(&self.domain, &self.search)
    }

    fn toggle(&mut self) {
        let value = self.options().get(self.cursor).map(|v| (*v).clone());
        if let Some(value) = value {
            if !self.checked.remove(&value) {
                self.checked.insert(value);
            }
        }
    }

    // Only the options matching the search box are affected.
    fn set_all(&mut self, checked: bool) {
        let shown: Vec<Value> = self.options().into_iter().cloned().collect();
        for value in shown {
            if checked {
                self.checked.insert(value);
            } else {
                self.checked.remove(&value);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Popup {
    Help(String),
    Filter {
        title: String,
        search: String,
        options: Vec<(String, bool)>,
        selected: usize,
    },
    Columns {
        items: Vec<(String, bool)>,
        selected: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedState {
    pub paused: bool,
    pub remaining: usize,
}

pub struct UIData {
    pub table: ViewSnapshot,
    pub status_counts: Vec<(StatusClass, usize)>,
    pub selected_row: usize,
    pub selected_column: usize,
    pub selection_count: usize,
    /// Page numbers offered around the current page.
    pub page_window: Vec<usize>,
    pub feed: Option<FeedState>,
    pub popup: Option<Popup>,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_status_message_update: Instant,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            table: ViewSnapshot::default(),
            status_counts: Vec::new(),
            selected_row: 0,
            selected_column: 0,
            selection_count: 0,
            page_window: Vec::new(),
            feed: None,
            popup: None,
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
            last_update: Instant::now(),
        }
    }
}

pub struct Model {
    config: ViewConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    view: TableView,
    feed: Option<ReplayFeed>,
    cursor_row: usize,
    cursor_column: usize,
    column_cursor: usize,
    filter_menu: Option<FilterMenu>,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
    last_status_message_update: Instant,
    ui_size: (usize, usize),
}

impl Model {
    pub fn init(config: &ViewConfig, view: TableView, feed: Option<ReplayFeed>) -> Self {
        let clipboard = match Clipboard::new() {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Clipboard unavailable: {e}");
                None
            }
        };
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            view,
            feed,
            cursor_row: 0,
            cursor_column: 0,
            column_cursor: 0,
            filter_menu: None,
            uidata: UIData::empty(),
            clipboard,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
            ui_size: (0, 0),
        };
        let message = format!(
            "Loaded {} records. Press ? for help",
            model.view.total_count()
        );
        model.set_status_message(message);
        model.update_uidata();
        model
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn view(&self) -> &TableView {
        &self.view
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    /// Timer turn: lets the replay feed deliver at most one record.
    pub fn tick(&mut self, now: Instant) -> bool {
        let record = match self.feed.as_mut() {
            Some(feed) => feed.poll(now),
            None => None,
        };
        match record {
            Some(record) => {
                let id = record.id().to_string();
                if !self.view.append(record) {
                    self.set_status_message(format!("Skipped feed record with known id {id}"));
                }
                self.update_uidata();
                true
            }
            None => false,
        }
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), GateViewError> {
        if let Some(msg) = message {
            trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveUp => self.cursor_row = self.cursor_row.saturating_sub(1),
                    Message::MoveDown => self.cursor_row += 1,
                    Message::MoveLeft => self.cursor_column = self.cursor_column.saturating_sub(1),
                    Message::MoveRight => self.cursor_column += 1,
                    Message::NextPage => self.change_page(|v| v.next_page()),
                    Message::PrevPage => self.change_page(|v| v.prev_page()),
                    Message::FirstPage => self.change_page(|v| {
                        v.first_page();
                        true
                    }),
                    Message::LastPage => self.change_page(|v| {
                        v.last_page();
                        true
                    }),
                    Message::Sort => self.sort_current_column(),
                    Message::ClearSort => {
                        self.view.clear_sort();
                        self.set_status_message("Sort cleared");
                    }
                    Message::Filter => self.open_filter_menu(),
                    Message::ClearFilters => {
                        self.view.clear_filters();
                        self.set_status_message("Filters cleared");
                    }
                    Message::Range => self.enter_range_mode(),
                    Message::Columns => self.open_column_manager(),
                    Message::ToggleSelect => self.toggle_current_row(),
                    Message::SelectAll => self.view.select_page(true),
                    Message::SelectNone => self.view.clear_selection(),
                    Message::MarkSelected => self.mark_selected(),
                    Message::DeleteSelected => self.delete_selected(),
                    Message::CopyRow => self.copy_table_row(),
                    Message::Export => {
                        let default_path = format!("{}.export.csv", self.view.name());
                        self.enter_cmd_mode(CMDMode::Export);
                        self.input.set(&default_path);
                        self.last_input = self.input.get();
                    }
                    Message::ToggleFeed => self.toggle_feed(),
                    Message::GoToPage => self.enter_cmd_mode(CMDMode::GoToPage),
                    Message::PageSize => self.enter_cmd_mode(CMDMode::PageSize),
                    Message::Help => self.show_help(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::FILTER => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveUp => self.move_filter_cursor(-1),
                    Message::MoveDown => self.move_filter_cursor(1),
                    Message::ToggleSelect => {
                        if let Some(menu) = self.filter_menu.as_mut() {
                            menu.toggle();
                        }
                    }
                    Message::SelectAll => {
                        if let Some(menu) = self.filter_menu.as_mut() {
                            menu.set_all(true);
                        }
                    }
                    Message::SelectNone => {
                        if let Some(menu) = self.filter_menu.as_mut() {
                            menu.set_all(false);
                        }
                    }
                    Message::Search => self.enter_cmd_mode(CMDMode::FilterSearch),
                    Message::Enter => self.apply_filter_menu(),
                    Message::Exit | Message::Filter => self.close_filter_menu(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::COLUMNS => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveUp => {
                        self.column_cursor = self.column_cursor.saturating_sub(1);
                    }
                    Message::MoveDown => {
                        if self.column_cursor + 1 < self.view.columns().len() {
                            self.column_cursor += 1;
                        }
                    }
                    Message::ToggleSelect => self.toggle_column_visibility(),
                    Message::MoveLeft => self.move_column(-1),
                    Message::MoveRight => self.move_column(1),
                    Message::ShowAllColumns => self.view.show_all_columns(),
                    Message::ResetColumns => {
                        self.view.reset_columns();
                        self.set_status_message("Columns reset to default");
                    }
                    Message::Exit | Message::Enter | Message::Columns => {
                        self.modus = Modus::TABLE;
                        self.previous_modus = Modus::COLUMNS;
                    }
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Enter | Message::Help => {
                        trace!("Close popup ...");
                        self.modus = self.previous_modus;
                        self.previous_modus = Modus::POPUP;
                    }
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::CMDINPUT => {
                    if let Message::RawKey(key) = msg {
                        self.raw_input(key)
                    }
                }
            }
        }

        self.update_uidata();
        Ok(())
    }

    // -------------------- Table handling ---------------------- //

    fn current_column_key(&self) -> Option<String> {
        self.uidata
            .table
            .headers
            .get(self.cursor_column)
            .map(|h| h.key.clone())
    }

    fn current_row_id(&self) -> Option<String> {
        self.uidata
            .table
            .rows
            .get(self.cursor_row)
            .map(|r| r.id.clone())
    }

    fn change_page(&mut self, step: impl FnOnce(&mut TableView) -> bool) {
        if step(&mut self.view) {
            self.cursor_row = 0;
        }
        let summary = self.view.summary();
        self.set_status_message(format!(
            "Page {}/{}",
            summary.current_page, summary.total_pages
        ));
    }

    fn sort_current_column(&mut self) {
        if let Some(key) = self.current_column_key() {
            self.view.sort_by(&key);
            self.cursor_row = 0;
            let direction = self.view.sort_spec().direction();
            self.set_status_message(format!("Sorted by {key} {}", direction.arrow()));
        }
    }

    fn toggle_current_row(&mut self) {
        if let Some(id) = self.current_row_id() {
            self.view.toggle_selected(&id);
            self.cursor_row += 1;
        }
    }

    fn mark_selected(&mut self) {
        if self.view.selection_count() == 0 {
            self.set_status_message("Select rows to mark first");
            return;
        }
        let field = self.config.mark_field.clone();
        let value = self.config.mark_value.clone();
        let count = self.view.mark_selected(&field, value.as_str());
        self.set_status_message(format!("Marked {count} rows {field}={value}"));
    }

    fn delete_selected(&mut self) {
        if self.view.selection_count() == 0 {
            self.set_status_message("Select rows to delete first");
            return;
        }
        let count = self.view.delete_selected();
        self.set_status_message(format!("Deleted {count} rows"));
    }

    fn toggle_feed(&mut self) {
        match self.feed.as_mut() {
            Some(feed) => {
                let paused = feed.toggle_pause(Instant::now());
                self.set_status_message(if paused { "Feed paused" } else { "Feed resumed" });
            }
            None => self.set_status_message("No live feed"),
        }
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.chars().any(|c| c == '"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping || needs_escaping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn copy_table_row(&mut self) {
        let Some(row) = self.uidata.table.rows.get(self.cursor_row) else {
            return;
        };
        let content = row
            .cells
            .iter()
            .map(|c| Model::wrap_cell_content(c))
            .collect::<Vec<String>>()
            .join(",");

        match self.clipboard.as_mut().map(|c| c.set_text(content)) {
            Some(Ok(_)) => self.set_status_message("Copied row to clipboard"),
            Some(Err(e)) => {
                error!("Error copying to clipboard: {:?}", e);
                self.set_status_message("Copy failed");
            }
            None => self.set_status_message("Clipboard unavailable"),
        }
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.ui_size.0, width, self.ui_size.1, height
        );
        self.ui_size = (width, height);
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
    }

    // -------------------- Filter checklist ---------------------- //

    fn open_filter_menu(&mut self) {
        let Some(key) = self.current_column_key() else {
            return;
        };
        let label = self
            .view
            .columns()
            .get(&key)
            .map(|c| c.label.clone())
            .unwrap_or_else(|| key.clone());
        let domain = self.view.clause_domain(&key);
        let checked = self.view.accepted_values(&key);
        debug!("Filter menu for {key:?} with {} options", domain.len());
        self.filter_menu = Some(FilterMenu {
            column: key,
            label,
            domain,
            checked,
            search: String::new(),
            cursor: 0,
        });
        self.previous_modus = self.modus;
        self.modus = Modus::FILTER;
    }

    fn move_filter_cursor(&mut self, step: isize) {
        if let Some(menu) = self.filter_menu.as_mut() {
            let len = menu.options().len();
            menu.cursor = menu
                .cursor
                .saturating_add_signed(step)
                .min(len.saturating_sub(1));
        }
    }

    fn apply_filter_menu(&mut self) {
        if let Some(menu) = self.filter_menu.take() {
            let count = menu.checked.len();
            self.view.set_clause(&menu.column, menu.checked);
            self.cursor_row = 0;
            self.set_status_message(format!(
                "Filter {}: {count}/{} values, {} rows",
                menu.label,
                menu.domain.len(),
                self.view.filtered_count()
            ));
        }
        self.modus = Modus::TABLE;
        self.previous_modus = Modus::FILTER;
    }

    fn close_filter_menu(&mut self) {
        self.filter_menu = None;
        self.modus = Modus::TABLE;
        self.previous_modus = Modus::FILTER;
    }

    // -------------------- Column manager ---------------------- //

    fn open_column_manager(&mut self) {
        self.column_cursor = 0;
        self.previous_modus = self.modus;
        self.modus = Modus::COLUMNS;
    }

    fn column_key_at(&self, idx: usize) -> Option<String> {
        self.view.columns().ordered().nth(idx).map(|c| c.key.clone())
    }

    fn toggle_column_visibility(&mut self) {
        if let Some(key) = self.column_key_at(self.column_cursor) {
            if let Err(e) = self.view.toggle_visible(&key) {
                self.set_status_message(e.to_string());
            }
        }
    }

    fn move_column(&mut self, step: isize) {
        let from = self.column_cursor;
        let Some(to) = from.checked_add_signed(step) else {
            return;
        };
        let (Some(current), Some(neighbour)) = (self.column_key_at(from), self.column_key_at(to))
        else {
            return;
        };
        // Moving lands a column right before its target
        if step < 0 {
            self.view.reorder(&current, &neighbour);
        } else {
            self.view.reorder(&neighbour, &current);
        }
        self.column_cursor = to;
    }

    // -------------------- Command input ---------------------- //

    fn raw_input(&mut self, key: KeyEvent) {
        if self.active_cmdinput {
            self.last_input = self.input.read(key);
            if self.last_input.finished {
                self.handle_cmd_input();
            }
        }
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {mode:?} ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);

        self.active_cmdinput = true;
        self.input.clear();
        if let (CMDMode::FilterSearch, Some(menu)) = (mode, self.filter_menu.as_ref()) {
            self.input.set(&menu.search);
        }
        self.last_input = self.input.get();
    }

    fn enter_range_mode(&mut self) {
        let Some(key) = self.current_column_key() else {
            return;
        };
        self.enter_cmd_mode(CMDMode::Range);
        if let Some(FilterClause::Range { min, max }) = self.view.filters().clause(&key) {
            let bound = |v: &Option<Value>| v.as_ref().map(|v| v.to_string()).unwrap_or_default();
            self.input.set(&format!("{}..{}", bound(min), bound(max)));
            self.last_input = self.input.get();
        }
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {:?}", self.last_input.input);

        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        let cmd_input = self.last_input.input.trim().to_string();
        let canceled = self.last_input.canceled;
        let mode = self.cmd_mode.take();
        if canceled {
            return;
        }
        match mode {
            Some(CMDMode::GoToPage) => self.go_to_page(&cmd_input),
            Some(CMDMode::PageSize) => self.set_page_size(&cmd_input),
            Some(CMDMode::Export) => self.export(&cmd_input),
            Some(CMDMode::FilterSearch) => {
                if let Some(menu) = self.filter_menu.as_mut() {
                    menu.search = cmd_input;
                    menu.cursor = 0;
                }
            }
            Some(CMDMode::Range) => self.apply_range(&cmd_input),
            None => info!("Cmd mode is none!"),
        }
    }

    fn go_to_page(&mut self, input: &str) {
        let total = self.view.total_pages();
        match input.parse::<usize>() {
            Ok(n) if self.view.go_to(n) => {
                self.cursor_row = 0;
                self.set_status_message(format!("Page {n}/{total}"));
            }
            _ => self.set_status_message(format!("No page {input:?} (1-{total})")),
        }
    }

    fn set_page_size(&mut self, input: &str) {
        let result = parse_page_size(input).and_then(|n| self.view.set_page_size(n));
        match result {
            Ok(()) => {
                self.cursor_row = 0;
                let size = self.view.pages().page_size();
                self.set_status_message(format!("{size} rows per page"));
            }
            Err(e @ ViewError::InvalidPageSize { .. }) => self.set_status_message(e.to_string()),
            Err(e) => {
                warn!("Unexpected page size error: {e}");
                self.set_status_message(e.to_string());
            }
        }
    }

    fn apply_range(&mut self, input: &str) {
        let Some(key) = self.current_column_key() else {
            return;
        };
        let (min, max) = parse_range(input);
        let lifted = min.is_none() && max.is_none();
        self.view.set_range(&key, min, max);
        self.cursor_row = 0;
        if lifted {
            self.set_status_message(format!("Range on {key} removed"));
        } else {
            let shown = self.view.filtered_count();
            self.set_status_message(format!("Range {input} on {key}: {shown} records"));
        }
    }

    fn export(&mut self, input: &str) {
        let path = match shellexpand::full(input) {
            Ok(p) => p.into_owned(),
            Err(e) => {
                self.set_status_message(format!("Bad path: {e}"));
                return;
            }
        };
        let result = File::create(&path).and_then(|f| self.view.export_csv(BufWriter::new(f)));
        match result {
            Ok(n) => {
                info!("Exported {n} rows to {path}");
                self.set_status_message(format!("Exported {n} rows to {path}"));
            }
            Err(e) => {
                error!("Export to {path} failed: {e}");
                self.set_status_message(format!("Export failed: {e}"));
            }
        }
    }

    // -------------------- UI data ---------------------- //

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    fn update_uidata(&mut self) {
        let table = self.view.snapshot();

        // Pages and columns can shrink under the cursor
        self.cursor_row = self.cursor_row.min(table.rows.len().saturating_sub(1));
        self.cursor_column = self
            .cursor_column
            .min(table.headers.len().saturating_sub(1));

        let popup = match self.modus {
            Modus::POPUP => Some(Popup::Help(HELP_TEXT.to_string())),
            Modus::FILTER | Modus::CMDINPUT if self.filter_menu.is_some() => {
                self.filter_menu.as_ref().map(|menu| Popup::Filter {
                    title: menu.label.clone(),
                    search: menu.search.clone(),
                    options: menu
                        .options()
                        .iter()
                        .map(|v| (v.to_string(), menu.checked.contains(*v)))
                        .collect(),
                    selected: menu.cursor,
                })
            }
            Modus::COLUMNS => Some(Popup::Columns {
                items: self
                    .view
                    .columns()
                    .ordered()
                    .map(|c| (c.label.clone(), c.visible))
                    .collect(),
                selected: self.column_cursor,
            }),
            _ => None,
        };

        self.uidata = UIData {
            status_counts: self.view.status_counts().into_iter().collect(),
            selected_row: self.cursor_row,
            selected_column: self.cursor_column,
            selection_count: self.view.selection_count(),
            page_window: self
                .view
                .pages()
                .window(self.view.filtered_count(), 2)
                .collect(),
            feed: self.feed.as_ref().map(|f| FeedState {
                paused: f.is_paused(),
                remaining: f.remaining(),
            }),
            popup,
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
            last_update: Instant::now(),
            table,
        };
    }
}
