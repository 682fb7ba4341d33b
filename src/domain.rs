use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use std::fmt;
use std::io::Error;
use std::path::PathBuf;

use crate::store::{DEFAULT_ROWS_PER_PAGE, Theme};

#[derive(Debug)]
pub enum TDMError {
    IoError(Error),
    PolarsError(PolarsError),
    JsonError(serde_json::Error),
    ImportFailed(String),
    InvalidConfig(String),
    FileNotFound,
    PermissionDenied,
}

impl fmt::Display for TDMError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TDMError::IoError(e) => write!(f, "I/O error: {e}"),
            TDMError::PolarsError(e) => write!(f, "Invalid CSV: {e}"),
            TDMError::JsonError(e) => write!(f, "JSON error: {e}"),
            TDMError::ImportFailed(msg) => write!(f, "Import failed: {msg}"),
            TDMError::InvalidConfig(msg) => write!(f, "Invalid configuration: {msg}"),
            TDMError::FileNotFound => write!(f, "File not found"),
            TDMError::PermissionDenied => write!(f, "Permission denied"),
        }
    }
}

impl std::error::Error for TDMError {}

impl From<Error> for TDMError {
    fn from(err: Error) -> Self {
        TDMError::IoError(err)
    }
}

impl From<PolarsError> for TDMError {
    fn from(err: PolarsError) -> Self {
        TDMError::PolarsError(err)
    }
}

impl From<serde_json::Error> for TDMError {
    fn from(err: serde_json::Error) -> Self {
        TDMError::JsonError(err)
    }
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct TDMConfig {
    pub event_poll_time: u64,
    pub rows_per_page: usize,
    pub theme: Theme,
    pub export_dir: PathBuf,
    pub seed: bool,
}

impl Default for TDMConfig {
    fn default() -> Self {
        TDMConfig {
            event_poll_time: 100,
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
            theme: Theme::Light,
            export_dir: PathBuf::from("."),
            seed: true,
        }
    }
}

/// Prompt the command line is currently collecting input for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    Search,
    ImportPath,
    AddColumn,
    EditField,
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
    Search,
    ClearSearch,
    Enter,
    Exit,
    Edit,
    Save,
    AddRow,
    Add,
    Delete,
    ManageColumns,
    ToggleVisibility,
    MoveColumnUp,
    MoveColumnDown,
    Import,
    Export,
    ToggleTheme,
    Confirm,
    Decline,
    Help,
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
Table
  j/k ↑/↓      select row
  h/l ←/→      select column
  s            sort by selected column (asc/desc)
  /            search all columns
  c            clear search
  n/p PgDn/PgUp next / previous page
  g/G          first / last page
  e Enter      edit row
  a            add row
  d            delete row
  m            manage columns
  i            import CSV
  x            export CSV
  t            toggle theme
  ?            help
  q            quit

Columns
  Space        toggle visibility
  K/J          move column up / down
  a            add column (label[:string|number|email])
  d            remove column
  Esc          close

Row editor
  Enter        edit field
  s            save
  Esc          cancel";
