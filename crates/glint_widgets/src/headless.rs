//! Headless widget implementations
//!
//! In-memory stand-ins for toolkit widgets, built on [`Model`]. They implement
//! the same facade traits a native adapter would and add helpers that simulate
//! user interaction (typing, key presses, focus loss, header clicks), so tables
//! and edit sessions can be driven without a display.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glint_core::{
    Bindable, CollectionView, Event, EventHandler, EventKind, EventSource, Model, ObjectRef,
    PropertyAccess, SubscriptionId, Value,
};

use crate::editor::{EditableWidget, EditorArgs, EditorConstructor, EditorKind, EditorRef};
use crate::error::Result;
use crate::table::TableView;

// ─────────────────────────────────────────────────────────────────────────────
// Editor
// ─────────────────────────────────────────────────────────────────────────────

/// An in-memory cell editor
pub struct HeadlessEditor {
    kind: EditorKind,
    args: EditorArgs,
    state: Rc<Model>,
}

impl HeadlessEditor {
    pub fn new(args: &EditorArgs) -> Rc<Self> {
        let state = Model::builder(format!("{}_editor", args.kind))
            .attr("value", args.value.clone())
            .attr("focused", false)
            .build();
        Rc::new(Self {
            kind: args.kind,
            args: args.clone(),
            state,
        })
    }

    pub fn kind(&self) -> EditorKind {
        self.kind
    }

    /// The arguments the editor was created with
    pub fn args(&self) -> &EditorArgs {
        &self.args
    }

    pub fn is_focused(&self) -> bool {
        self.state.get("focused").is_truthy()
    }

    /// Replace the editor text as a user would
    pub fn type_text(&self, text: &str) {
        self.set_value(Value::from(text));
    }

    pub fn press_key(&self, key_code: u32) {
        self.state.emit(&Event::key(key_code));
    }

    /// Move focus away from the editor
    pub fn blur(&self) {
        if self.is_focused() {
            self.set_focused(false);
        }
        self.state.emit(&Event::new(EventKind::FocusLost));
    }

    /// Pick a value the way a combo or checkbox selection would
    pub fn select(&self, value: impl Into<Value>) {
        self.set_value(value.into());
        self.state
            .emit(&Event::new(EventKind::Selection).with_data(self.value()));
    }

    /// Live subscriptions on the editor
    pub fn listener_count(&self) -> usize {
        self.state.subscriber_count()
    }

    fn set_focused(&self, focused: bool) {
        if let Err(err) = self.state.set("focused", focused) {
            tracing::trace!("editor focus ignored: {}", err);
        }
    }
}

impl EventSource for HeadlessEditor {
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        self.state.subscribe(kind, handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.state.unsubscribe(id);
    }
}

impl EditableWidget for HeadlessEditor {
    fn value(&self) -> Value {
        self.state.get("value")
    }

    fn set_value(&self, value: Value) {
        if let Err(err) = self.state.set("value", value) {
            tracing::trace!("editor value ignored: {}", err);
        }
    }

    fn set_focus(&self) {
        self.set_focused(true);
    }

    /// Disposing a focused editor loses focus first, as native widgets do
    fn dispose(&self) {
        if self.state.is_disposed() {
            return;
        }
        if self.is_focused() {
            self.set_focused(false);
            self.state.emit(&Event::new(EventKind::FocusLost));
        }
        self.state.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.state.is_disposed()
    }
}

/// Editor constructor that records every editor it creates
#[derive(Default)]
pub struct HeadlessEditorFactory {
    created: RefCell<Vec<Rc<HeadlessEditor>>>,
}

impl HeadlessEditorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> Vec<Rc<HeadlessEditor>> {
        self.created.borrow().clone()
    }

    /// The most recently created editor
    pub fn last(&self) -> Option<Rc<HeadlessEditor>> {
        self.created.borrow().last().cloned()
    }
}

impl EditorConstructor for HeadlessEditorFactory {
    fn create(&self, args: &EditorArgs) -> Result<EditorRef> {
        let editor = HeadlessEditor::new(args);
        self.created.borrow_mut().push(editor.clone());
        Ok(editor as EditorRef)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Table view
// ─────────────────────────────────────────────────────────────────────────────

/// An in-memory table widget
pub struct HeadlessTableView {
    items: RefCell<Vec<ObjectRef>>,
    selected: RefCell<Vec<usize>>,
    events: Rc<Model>,
    replace_count: Cell<usize>,
}

impl HeadlessTableView {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            items: RefCell::new(Vec::new()),
            selected: RefCell::new(Vec::new()),
            events: Model::builder("table").build(),
            replace_count: Cell::new(0),
        })
    }

    /// How many times the displayed collection was replaced
    pub fn replace_count(&self) -> usize {
        self.replace_count.get()
    }

    /// One property of every displayed row
    pub fn column_values(&self, property: &str) -> Vec<Value> {
        self.items
            .borrow()
            .iter()
            .map(|item| item.get_property(property).unwrap_or_default())
            .collect()
    }

    /// Click a column header
    pub fn click_column(&self, column: usize) {
        self.events
            .emit(&Event::new(EventKind::ColumnSelected).with_data(column));
    }

    /// Select rows as a user would
    pub fn select_rows(&self, rows: &[usize]) {
        *self.selected.borrow_mut() = rows.to_vec();
        let data: Vec<Value> = rows.iter().map(|&row| Value::from(row)).collect();
        self.events
            .emit(&Event::new(EventKind::Selection).with_data(data));
    }

    /// Double click (or Enter on) a cell
    pub fn activate(&self, row: usize, column: usize) {
        *self.selected.borrow_mut() = vec![row];
        self.events.emit(
            &Event::new(EventKind::DefaultSelection)
                .with_data(vec![Value::from(row), Value::from(column)]),
        );
    }
}

impl CollectionView for HeadlessTableView {
    fn collection_view(&self) -> Vec<ObjectRef> {
        self.items.borrow().clone()
    }

    fn replace_collection_view(&self, items: Vec<ObjectRef>) {
        *self.items.borrow_mut() = items;
        self.replace_count.set(self.replace_count.get() + 1);
    }
}

impl EventSource for HeadlessTableView {
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        self.events.subscribe(kind, handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.events.unsubscribe(id);
    }
}

impl TableView for HeadlessTableView {
    fn selected_rows(&self) -> Vec<usize> {
        self.selected.borrow().clone()
    }

    /// Programmatic selection does not notify
    fn set_selected_rows(&self, rows: &[usize]) {
        let len = self.items.borrow().len();
        *self.selected.borrow_mut() = rows.iter().copied().filter(|&row| row < len).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_core::{key_codes, EventSourceExt};

    fn args() -> EditorArgs {
        EditorArgs {
            kind: EditorKind::Text,
            value: Value::from("Ann"),
            items: Vec::new(),
            row: 1,
            column: 0,
            property: "name".into(),
        }
    }

    #[test]
    fn test_dispose_loses_focus_first() {
        let editor = HeadlessEditor::new(&args());
        let lost = Rc::new(Cell::new(0));
        let lost_clone = lost.clone();
        editor.on(EventKind::FocusLost, move |_| lost_clone.set(lost_clone.get() + 1));

        editor.set_focus();
        editor.dispose();
        editor.dispose();

        assert_eq!(lost.get(), 1);
        assert!(editor.is_disposed());
        assert_eq!(editor.listener_count(), 0);
    }

    #[test]
    fn test_disposed_editor_ignores_writes() {
        let editor = HeadlessEditor::new(&args());
        editor.dispose();

        editor.set_focus();
        editor.type_text("Bob");
        editor.blur();

        assert!(!editor.is_focused());
        assert_eq!(editor.value(), Value::from("Ann"));
    }

    #[test]
    fn test_key_and_selection_events() {
        let editor = HeadlessEditor::new(&args());
        let keys = Rc::new(RefCell::new(Vec::new()));
        let keys_clone = keys.clone();
        editor.on(EventKind::KeyPressed, move |event| {
            keys_clone.borrow_mut().extend(event.key_code);
        });
        let picked = Rc::new(RefCell::new(Value::Nil));
        let picked_clone = picked.clone();
        editor.on(EventKind::Selection, move |event| {
            *picked_clone.borrow_mut() = event.data.clone();
        });

        editor.press_key(key_codes::ENTER);
        editor.select("Oslo");

        assert_eq!(*keys.borrow(), vec![key_codes::ENTER]);
        assert_eq!(*picked.borrow(), Value::from("Oslo"));
        assert_eq!(editor.value(), Value::from("Oslo"));
    }

    #[test]
    fn test_table_view_selection_is_clamped() {
        let view = HeadlessTableView::new();
        let row = Model::with_attributes("Row", [("name", "a")]).as_object();
        view.replace_collection_view(vec![row]);

        view.set_selected_rows(&[0, 3]);
        assert_eq!(view.selected_rows(), vec![0]);
        assert_eq!(view.replace_count(), 1);
        assert_eq!(view.column_values("name"), vec![Value::from("a")]);
    }

    #[test]
    fn test_factory_records_editors() {
        let factory = HeadlessEditorFactory::new();
        assert!(factory.last().is_none());
        let editor = factory.create(&args()).unwrap();
        assert_eq!(editor.value(), Value::from("Ann"));
        assert_eq!(factory.last().map(|e| e.args().row), Some(1));
    }
}
