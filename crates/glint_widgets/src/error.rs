//! Error types for glint_widgets

use glint_core::CoreError;
use thiserror::Error;

use crate::editor::EditorKind;

/// Errors raised by widget proxies
#[derive(Error, Debug)]
pub enum WidgetError {
    /// Binding, path or sort failure from the core
    #[error(transparent)]
    Core(#[from] CoreError),

    /// No constructor registered for an editor kind
    #[error("No editor registered for {0}")]
    UnknownEditor(EditorKind),

    /// Column index out of range
    #[error("Column {0} out of range")]
    ColumnOutOfRange(usize),

    /// Row index out of range
    #[error("Row {0} out of range")]
    RowOutOfRange(usize),

    /// Editing the selection with no row selected
    #[error("No row selected")]
    NoSelection,

    /// Column has no editor
    #[error("Column {0} is not editable")]
    NotEditable(usize),

    /// The record to edit was disposed
    #[error("Record was disposed")]
    RecordDisposed,

    /// A commit or cancel is still running
    #[error("An edit is being committed or cancelled")]
    EditInProgress,

    /// Malformed table configuration
    #[error("Invalid table config: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration file could not be read
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for widget operations
pub type Result<T> = std::result::Result<T, WidgetError>;
