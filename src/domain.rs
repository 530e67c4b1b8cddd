use std::io::Error;
use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: usize = 30;
pub const DEFAULT_LIVE_CAP: usize = 500;
pub const DEFAULT_FEED_INTERVAL_MS: u64 = 3000;

/// Rejections raised by the table view engine.
///
/// None of these are fatal. The engine leaves its state untouched when it
/// returns one, so the renderer can report it and keep going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("invalid page size {value:?}, expected a positive integer")]
    InvalidPageSize { value: String },

    #[error("at least one column must be shown")]
    LastColumn,

    #[error("unknown column {key:?}")]
    UnknownColumnKey { key: String },

    #[error("duplicate record id {id:?}")]
    DuplicateId { id: String },
}

/// Errors at the application boundary (loading data, setting up the terminal).
#[derive(Debug, Error)]
pub enum GateViewError {
    #[error("i/o error: {0}")]
    IoError(#[from] Error),

    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),

    #[error("loading failed: {0}")]
    LoadingFailed(String),

    #[error("record {row} has no value for required field {field:?}")]
    MissingField { row: usize, field: String },

    #[error("record {row} repeats id {id:?}")]
    DuplicateId { row: usize, id: String },

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("unknown file type: {0}")]
    UnknownFileType(PathBuf),

    #[error("failed to set up logging: {0}")]
    Logging(String),

    #[error(transparent)]
    View(#[from] ViewError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    GoToPage,
    PageSize,
    Export,
    FilterSearch,
    Range,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    Sort,
    ClearSort,
    Filter,
    ClearFilters,
    Range,
    Columns,
    ResetColumns,
    ShowAllColumns,
    ToggleSelect,
    SelectAll,
    SelectNone,
    MarkSelected,
    DeleteSelected,
    CopyRow,
    Export,
    ToggleFeed,
    GoToPage,
    PageSize,
    Search,
    Help,
    Enter,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct ViewConfig {
    pub event_poll_time: u64,
    pub page_size: usize,
    /// Store cap for views fed by a live source. `None` keeps everything.
    pub live_cap: Option<usize>,
    pub feed_interval_ms: u64,
    pub max_column_width: usize,
    /// Field and value written by the bulk "mark selected" command.
    pub mark_field: String,
    pub mark_value: String,
    /// Columns visible at startup, in order. Empty means all of them.
    pub default_columns: Vec<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            page_size: DEFAULT_PAGE_SIZE,
            live_cap: Some(DEFAULT_LIVE_CAP),
            feed_interval_ms: DEFAULT_FEED_INTERVAL_MS,
            max_column_width: 40,
            mark_field: "sent".to_string(),
            mark_value: "yes".to_string(),
            default_columns: Vec::new(),
        }
    }
}

pub const HELP_TEXT: &str = "Table
  j/k, Up/Down     move row cursor
  h/l, Left/Right  move column cursor
  n/p, PgDn/PgUp   next / previous page
  g/G, Home/End    first / last page
  :                go to page
  z                set page size
  s                sort by column (again to flip)
  S                clear sort
  f                filter column (checklist)
  R                range filter on column (min..max)
  F                clear all filters
  c                column manager
  space            select row
  a / x            select page / clear selection
  m                mark selected rows
  D                delete selected rows
  y                copy row to clipboard
  e                export filtered rows as csv
  P                pause / resume live feed
  q                quit

Filter checklist
  space            toggle value
  a / x            all / none
  /                search values
  Enter            apply
  Esc              cancel

Column manager
  space            show / hide
  h/l              move left / right
  A                show all
  r                reset to default";
