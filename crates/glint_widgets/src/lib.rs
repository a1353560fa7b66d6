//! Glint Widget Proxies
//!
//! Bindable proxies over interactive widgets, built on `glint_core`.
//!
//! # Architecture
//!
//! 1. **Table Proxy**: publishes bound records to a table view, sorts them by
//!    column with direction toggling and tie-breaker properties, and keeps the
//!    selection bindable.
//!
//! 2. **Edit Sessions**: FSM-driven in-place cell editing through registered
//!    editor widgets, committing or cancelling exactly once per session.
//!
//! 3. **Shape Dragging**: FSM-driven drag-and-move and drag-and-drop of canvas
//!    shapes, with gesture state held in an explicit context.
//!
//! Toolkit adapters implement [`TableView`] and [`EditableWidget`]; the
//! [`headless`] module provides in-memory implementations.
//!
//! # Example
//!
//! ```rust
//! use glint_core::{Model, Value};
//! use glint_widgets::prelude::*;
//!
//! let view = HeadlessTableView::new();
//! let table = TableProxy::builder(view.clone())
//!     .column(TableColumn::new("Name", "name"))
//!     .column(TableColumn::new("Age", "age"))
//!     .build()
//!     .unwrap();
//!
//! let ann = Model::with_attributes("Person", [("name", Value::from("Ann")), ("age", Value::from(31))]);
//! let bob = Model::with_attributes("Person", [("name", Value::from("Bob")), ("age", Value::from(25))]);
//! table.set_items(vec![ann.as_object(), bob.as_object()]);
//!
//! view.click_column(1);
//! assert_eq!(view.column_values("name"), [Value::from("Bob"), Value::from("Ann")]);
//! ```

pub mod config;
pub mod edit;
pub mod editor;
pub mod error;
pub mod headless;
pub mod shape;
pub mod table;

pub use config::{ColumnConfig, InitialSort, TableConfig};
pub use edit::{
    EditController, EditHook, EditHooks, EditOutcome, EditRequest, EditState, EditStats, HookId,
    WriteHook,
};
pub use editor::{
    EditableWidget, EditorArgs, EditorConstructor, EditorKind, EditorRef, EditorRegistry,
};
pub use error::{Result, WidgetError};
pub use headless::{HeadlessEditor, HeadlessEditorFactory, HeadlessTableView};
pub use shape::{
    rectangle, Canvas, DragContext, DragOutcome, DragState, DropEvent, DropHandler,
    ShapeOptions,
};
pub use table::{TableColumn, TableProxy, TableProxyBuilder, TableView};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::TableConfig;
    pub use crate::edit::{EditController, EditHooks, EditOutcome, EditRequest};
    pub use crate::editor::{EditableWidget, EditorKind, EditorRegistry};
    pub use crate::headless::{HeadlessEditorFactory, HeadlessTableView};
    pub use crate::shape::{Canvas, DragContext, ShapeOptions};
    pub use crate::table::{TableColumn, TableProxy, TableView};
}
