//! Table proxy
//!
//! [`TableProxy`] sits between application models and a [`TableView`]. It
//! exposes two bindable properties:
//!
//! - `items`: the records to display. Assigned records are sorted with the
//!   current sort and published to the view.
//! - `selection`: the selected record (or records, in multi-select tables).
//!   Follows the view's selection and can be driven from a model.
//!
//! Column header clicks sort by the clicked column, toggling direction on
//! repeated clicks. Cells are edited in place through an [`EditController`];
//! after a commit the table re-sorts and selects the edited record in its new
//! row.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::rc::{Rc, Weak};

use glint_core::proxy::{objects_in, position_of};
use glint_core::{
    apply_sort, bind, BindOptions, Bindable, Binding, CollectionView, Comparator, CoreError,
    Event, EventHandler, EventKind, EventSource, EventSourceExt, KeyExtractor, Model,
    ObjectRef, PropertyAccess, PropertyPath, SortDirection, SortSpec, SortState,
    SubscriptionId, TypeHint, Value,
};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::config::TableConfig;
use crate::edit::{EditController, EditHooks, EditOutcome, EditRequest};
use crate::editor::{EditorKind, EditorRegistry};
use crate::error::{Result, WidgetError};

/// A tabular widget the proxy can drive
pub trait TableView: CollectionView + EventSource {
    /// Selected row indices in display order
    fn selected_rows(&self) -> Vec<usize>;

    /// Select rows without notifying selection listeners
    fn set_selected_rows(&self, rows: &[usize]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Columns
// ─────────────────────────────────────────────────────────────────────────────

/// One table column
#[derive(Clone)]
pub struct TableColumn {
    title: String,
    property: String,
    editor: Option<EditorKind>,
    editor_items: Vec<Value>,
    sort_properties: Vec<String>,
    sort_type: Option<TypeHint>,
    comparator: Option<Comparator>,
    key_extractor: Option<KeyExtractor>,
}

impl TableColumn {
    /// A text-editable column showing `property`
    pub fn new(title: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            property: property.into(),
            editor: Some(EditorKind::Text),
            editor_items: Vec::new(),
            sort_properties: Vec::new(),
            sort_type: None,
            comparator: None,
            key_extractor: None,
        }
    }

    pub fn editor(mut self, kind: EditorKind) -> Self {
        self.editor = Some(kind);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.editor = None;
        self
    }

    /// Choices offered by a combo editor
    pub fn editor_items<I, V>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.editor_items = items.into_iter().map(Into::into).collect();
        self
    }

    /// Sort by these properties instead of the displayed one
    pub fn sort_by<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort_properties = properties.into_iter().map(Into::into).collect();
        self
    }

    pub fn sort_type(mut self, hint: TypeHint) -> Self {
        self.sort_type = Some(hint);
        self
    }

    pub fn comparator(self, compare: impl Fn(&ObjectRef, &ObjectRef) -> Ordering + 'static) -> Self {
        self.try_comparator(move |a, b| Ok(compare(a, b)))
    }

    pub fn try_comparator(
        mut self,
        compare: impl Fn(&ObjectRef, &ObjectRef) -> glint_core::Result<Ordering> + 'static,
    ) -> Self {
        self.comparator = Some(Rc::new(compare));
        self
    }

    pub fn key_extractor(self, extract: impl Fn(&ObjectRef) -> Value + 'static) -> Self {
        self.try_key_extractor(move |record| Ok(extract(record)))
    }

    pub fn try_key_extractor(
        mut self,
        extract: impl Fn(&ObjectRef) -> glint_core::Result<Value> + 'static,
    ) -> Self {
        self.key_extractor = Some(Rc::new(extract));
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn editor_kind(&self) -> Option<EditorKind> {
        self.editor
    }

    pub fn is_editable(&self) -> bool {
        self.editor.is_some()
    }

    fn sort_keys(&self) -> Vec<&str> {
        if self.sort_properties.is_empty() {
            vec![self.property.as_str()]
        } else {
            self.sort_properties.iter().map(String::as_str).collect()
        }
    }

    fn validate(&self) -> glint_core::Result<()> {
        PropertyPath::parse(&self.property)?;
        for property in &self.sort_properties {
            PropertyPath::parse(property)?;
        }
        Ok(())
    }

    fn sort_request(&self, hints: &FxHashMap<String, TypeHint>) -> glint_core::Result<SortSpec> {
        let keys = self.sort_keys();
        let mut spec = SortSpec::new(&keys)?.with_type_hints(hints);
        if let Some(hint) = self.sort_type {
            for key in &keys {
                spec = spec.with_type_hint(*key, hint);
            }
        }
        if let Some(compare) = &self.comparator {
            spec = spec.with_shared_comparator(compare.clone());
        }
        if let Some(extract) = &self.key_extractor {
            spec = spec.with_shared_key_extractor(extract.clone());
        }
        Ok(spec)
    }
}

impl std::fmt::Debug for TableColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableColumn")
            .field("title", &self.title)
            .field("property", &self.property)
            .field("editor", &self.editor)
            .field("sort_properties", &self.sort_properties)
            .field("sort_type", &self.sort_type)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`TableProxy`]
pub struct TableProxyBuilder {
    view: Rc<dyn TableView>,
    columns: Vec<TableColumn>,
    additional_sort_properties: Vec<String>,
    initial_sort: Option<(Vec<String>, SortDirection)>,
    edit_on_activation: bool,
    multi_select: bool,
    registry: EditorRegistry,
}

impl TableProxyBuilder {
    pub fn column(mut self, column: TableColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn columns(mut self, columns: impl IntoIterator<Item = TableColumn>) -> Self {
        self.columns.extend(columns);
        self
    }

    /// Tie-breakers appended to every column sort
    pub fn additional_sort_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.additional_sort_properties = properties.into_iter().map(Into::into).collect();
        self
    }

    pub fn initial_sort<I, S>(mut self, properties: I, direction: SortDirection) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.initial_sort = Some((properties.into_iter().map(Into::into).collect(), direction));
        self
    }

    /// Start editing on double click / Enter
    pub fn edit_on_activation(mut self, enabled: bool) -> Self {
        self.edit_on_activation = enabled;
        self
    }

    pub fn multi_select(mut self, enabled: bool) -> Self {
        self.multi_select = enabled;
        self
    }

    pub fn editors(mut self, registry: EditorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Take columns, sorting and activation settings from a config
    pub fn config(mut self, config: &TableConfig) -> Self {
        self.columns
            .extend(config.columns.iter().map(|column| column.to_column()));
        self.additional_sort_properties = config.additional_sort_properties.clone();
        if let Some(sort) = &config.sort {
            self.initial_sort = Some((sort.sort_property.clone(), sort.direction));
        }
        self.edit_on_activation = config.edit_on_activation;
        self.multi_select = config.multi_select;
        self
    }

    pub fn build(self) -> Result<Rc<TableProxy>> {
        for column in &self.columns {
            column.validate()?;
        }

        let mut type_hints = FxHashMap::default();
        for column in &self.columns {
            if let Some(hint) = column.sort_type {
                for key in column.sort_keys() {
                    type_hints.insert(key.to_string(), hint);
                }
            }
        }

        let mut sort = SortState::new();
        sort.set_additional_properties(&self.additional_sort_properties)?;
        if let Some((properties, direction)) = &self.initial_sort {
            let request = SortSpec::new(properties)?.with_type_hints(&type_hints);
            let merged = sort.request(request).clone().with_direction(*direction);
            sort.set(merged);
        }

        let view = self.view;
        let editor = EditController::new(self.registry);

        let table = Rc::new_cyclic(|this: &Weak<TableProxy>| {
            let view_subs = subscribe_view(&view, this);
            TableProxy {
                view,
                columns: self.columns,
                type_hints,
                source: RefCell::new(Vec::new()),
                sort: RefCell::new(sort),
                selection: RefCell::new(Vec::new()),
                multi_select: self.multi_select,
                edit_on_activation: Cell::new(self.edit_on_activation),
                editor,
                notifier: Model::builder("table").build(),
                view_subs,
            }
        });

        let this = Rc::downgrade(&table);
        table.editor.set_commit_follow_up(move |record, _| {
            if let Some(table) = this.upgrade() {
                table.after_commit(record);
            }
        });
        let this = Rc::downgrade(&table);
        table.editor.set_record_check(move |record| {
            this.upgrade().is_some_and(|table| table.contains(record))
        });

        tracing::debug!("table with {} columns", table.columns.len());
        Ok(table)
    }
}

fn subscribe_view(view: &Rc<dyn TableView>, this: &Weak<TableProxy>) -> SmallVec<[SubscriptionId; 3]> {
    let mut subs = SmallVec::new();

    let weak = this.clone();
    subs.push(view.on(EventKind::ColumnSelected, move |event| {
        let (Some(table), Some(column)) = (weak.upgrade(), event.data.as_int()) else {
            return;
        };
        if let Err(err) = table.sort_by_column(column as usize) {
            tracing::warn!("column {} sort failed: {}", column, err);
        }
    }));

    let weak = this.clone();
    subs.push(view.on(EventKind::Selection, move |_| {
        if let Some(table) = weak.upgrade() {
            table.sync_selection_from_view();
        }
    }));

    let weak = this.clone();
    subs.push(view.on(EventKind::DefaultSelection, move |event| {
        let Some(table) = weak.upgrade() else {
            return;
        };
        if !table.edit_on_activation.get() {
            return;
        }
        let [row, column] = event.data.as_list().unwrap_or_default() else {
            return;
        };
        let (row, column) = (row.to_int() as usize, column.to_int() as usize);
        if let Err(err) = table.edit_cell(row, column) {
            tracing::warn!("cannot edit cell ({}, {}): {}", row, column, err);
        }
    }));

    subs
}

// ─────────────────────────────────────────────────────────────────────────────
// Table proxy
// ─────────────────────────────────────────────────────────────────────────────

/// Bindable facade over a table widget
pub struct TableProxy {
    view: Rc<dyn TableView>,
    columns: Vec<TableColumn>,
    type_hints: FxHashMap<String, TypeHint>,
    /// Records in assignment order
    source: RefCell<Vec<ObjectRef>>,
    sort: RefCell<SortState>,
    selection: RefCell<Vec<ObjectRef>>,
    multi_select: bool,
    edit_on_activation: Cell<bool>,
    editor: Rc<EditController>,
    notifier: Rc<Model>,
    view_subs: SmallVec<[SubscriptionId; 3]>,
}

impl TableProxy {
    pub fn builder(view: Rc<dyn TableView>) -> TableProxyBuilder {
        TableProxyBuilder {
            view,
            columns: Vec::new(),
            additional_sort_properties: Vec::new(),
            initial_sort: None,
            edit_on_activation: false,
            multi_select: false,
            registry: EditorRegistry::new(),
        }
    }

    /// Build a table from a configuration
    pub fn with_config(
        view: Rc<dyn TableView>,
        config: &TableConfig,
        registry: EditorRegistry,
    ) -> Result<Rc<TableProxy>> {
        Self::builder(view).config(config).editors(registry).build()
    }

    pub fn as_object(self: &Rc<Self>) -> ObjectRef {
        self.clone()
    }

    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    pub fn view(&self) -> &Rc<dyn TableView> {
        &self.view
    }

    pub fn edit_controller(&self) -> &Rc<EditController> {
        &self.editor
    }

    pub fn set_edit_on_activation(&self, enabled: bool) {
        self.edit_on_activation.set(enabled);
    }

    /// Records in display order
    pub fn items(&self) -> Vec<ObjectRef> {
        self.view.collection_view()
    }

    /// Replace the displayed records
    pub fn set_items(&self, items: Vec<ObjectRef>) {
        *self.source.borrow_mut() = items;
        let ordered = match self.sorted_items() {
            Ok(ordered) => ordered,
            Err(err) => {
                tracing::warn!("items shown unsorted: {}", err);
                self.source.borrow().clone()
            }
        };
        self.publish(ordered);
        self.notifier
            .emit(&Event::property_changed("items", self.items_value()));
    }

    pub fn selection(&self) -> Vec<ObjectRef> {
        self.selection.borrow().clone()
    }

    /// Select records; records not displayed are ignored
    pub fn set_selection(&self, records: Vec<ObjectRef>) {
        let displayed = self.view.collection_view();
        let mut records: Vec<ObjectRef> = records
            .into_iter()
            .filter(|record| position_of(&displayed, record).is_some())
            .collect();
        if !self.multi_select {
            records.truncate(1);
        }
        let rows: Vec<usize> = records
            .iter()
            .filter_map(|record| position_of(&displayed, record))
            .collect();
        self.view.set_selected_rows(&rows);
        *self.selection.borrow_mut() = records;
        self.notify_selection();
    }

    /// Display `path` of `model` (a list of records)
    pub fn bind_items(self: &Rc<Self>, model: &ObjectRef, path: &str) -> Result<Binding> {
        Ok(bind(model, path, &self.as_object(), "items", BindOptions::read())?)
    }

    /// Keep `path` of `model` and the table selection in sync
    pub fn bind_selection(self: &Rc<Self>, model: &ObjectRef, path: &str) -> Result<Binding> {
        Ok(bind(model, path, &self.as_object(), "selection", BindOptions::two_way())?)
    }

    pub fn sort_state(&self) -> SortState {
        self.sort.borrow().clone()
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort.borrow().direction()
    }

    /// Sort by a column; clicking the same column again reverses the order
    ///
    /// On failure the previous sort and the displayed order are kept.
    pub fn sort_by_column(&self, index: usize) -> Result<()> {
        let column = self
            .columns
            .get(index)
            .ok_or(WidgetError::ColumnOutOfRange(index))?;
        let request = column.sort_request(&self.type_hints)?;
        self.apply_request(request)
    }

    /// Sort by an explicit spec, merged with the additional sort properties
    pub fn sort_by(&self, request: SortSpec) -> Result<()> {
        self.apply_request(request)
    }

    /// Re-apply the current sort
    pub fn resort(&self) -> Result<()> {
        let ordered = self.sorted_items()?;
        self.publish(ordered);
        Ok(())
    }

    /// Open an editor over a displayed cell
    pub fn edit_cell(&self, row: usize, column: usize) -> Result<()> {
        self.edit_cell_with(row, column, EditHooks::default())
    }

    /// Edit a cell of the first selected row
    pub fn edit_selected(&self, column: usize, hooks: EditHooks) -> Result<()> {
        let row = self
            .view
            .selected_rows()
            .first()
            .copied()
            .ok_or(WidgetError::NoSelection)?;
        self.edit_cell_with(row, column, hooks)
    }

    /// Open an editor over a displayed cell with callbacks for this edit only
    ///
    /// The after-write callback runs once the table has re-sorted, so the
    /// edited record's row is already current.
    pub fn edit_cell_with(&self, row: usize, column: usize, hooks: EditHooks) -> Result<()> {
        let spec = self
            .columns
            .get(column)
            .ok_or(WidgetError::ColumnOutOfRange(column))?;
        let kind = spec.editor_kind().ok_or(WidgetError::NotEditable(column))?;
        let record = self
            .view
            .collection_view()
            .get(row)
            .cloned()
            .ok_or(WidgetError::RowOutOfRange(row))?;
        let request = EditRequest::new(record, PropertyPath::parse(spec.property())?, kind)
            .at(row, column)
            .with_items(spec.editor_items.clone())
            .with_hooks(hooks);
        self.editor.start_edit(request)
    }

    pub fn commit_edit(&self) -> EditOutcome {
        self.editor.commit()
    }

    pub fn cancel_edit(&self) -> EditOutcome {
        self.editor.cancel()
    }

    fn apply_request(&self, request: SortSpec) -> Result<()> {
        let snapshot = self.sort.borrow().clone();
        self.sort.borrow_mut().request(request);
        match self.sorted_items() {
            Ok(ordered) => {
                self.publish(ordered);
                Ok(())
            }
            Err(err) => {
                tracing::warn!("sort failed, keeping previous order: {}", err);
                *self.sort.borrow_mut() = snapshot;
                Err(err)
            }
        }
    }

    fn sorted_items(&self) -> Result<Vec<ObjectRef>> {
        let items = self.source.borrow().clone();
        let spec = self.sort.borrow().current().cloned();
        match spec {
            Some(spec) => Ok(apply_sort(&spec, &items)?),
            None => Ok(items),
        }
    }

    /// Show `ordered`, keeping selected records selected
    fn publish(&self, ordered: Vec<ObjectRef>) {
        let selection = self.selection.borrow().clone();
        let rows: Vec<usize> = selection
            .iter()
            .filter_map(|record| position_of(&ordered, record))
            .collect();
        let pruned = rows.len() != selection.len();

        tracing::trace!("publishing {} rows", ordered.len());
        self.view.replace_collection_view(ordered);
        self.view.set_selected_rows(&rows);

        if pruned {
            let displayed = self.view.collection_view();
            self.selection
                .borrow_mut()
                .retain(|record| position_of(&displayed, record).is_some());
            self.notify_selection();
        }
    }

    fn contains(&self, record: &ObjectRef) -> bool {
        position_of(&self.source.borrow(), record).is_some()
    }

    fn after_commit(&self, record: &ObjectRef) {
        if let Err(err) = self.resort() {
            tracing::warn!("re-sort after edit failed: {}", err);
        }
        let displayed = self.view.collection_view();
        if let Some(row) = position_of(&displayed, record) {
            tracing::debug!("edited record now at row {}", row);
            self.view.set_selected_rows(&[row]);
            *self.selection.borrow_mut() = vec![record.clone()];
            self.notify_selection();
        }
    }

    fn sync_selection_from_view(&self) {
        let displayed = self.view.collection_view();
        let mut records: Vec<ObjectRef> = self
            .view
            .selected_rows()
            .into_iter()
            .filter_map(|row| displayed.get(row).cloned())
            .collect();
        if !self.multi_select {
            records.truncate(1);
        }
        *self.selection.borrow_mut() = records;
        self.notify_selection();
    }

    fn notify_selection(&self) {
        self.notifier
            .emit(&Event::property_changed("selection", self.selection_value()));
    }

    fn items_value(&self) -> Value {
        Value::List(self.source.borrow().iter().cloned().map(Value::Object).collect())
    }

    fn selection_value(&self) -> Value {
        let selection = self.selection.borrow();
        if self.multi_select {
            Value::List(selection.iter().cloned().map(Value::Object).collect())
        } else {
            selection.first().cloned().map(Value::Object).unwrap_or_default()
        }
    }
}

impl PropertyAccess for TableProxy {
    fn type_name(&self) -> &str {
        "table"
    }

    fn has_property(&self, name: &str) -> bool {
        matches!(name, "items" | "selection")
    }

    fn get_property(&self, name: &str) -> glint_core::Result<Value> {
        match name {
            "items" => Ok(self.items_value()),
            "selection" => Ok(self.selection_value()),
            _ => Err(CoreError::UnknownProperty {
                object: "table".into(),
                property: name.into(),
            }),
        }
    }

    fn set_property(&self, name: &str, value: Value) -> glint_core::Result<()> {
        match name {
            "items" => {
                self.set_items(objects_in(&value));
                Ok(())
            }
            "selection" => {
                self.set_selection(objects_in(&value));
                Ok(())
            }
            _ => Err(CoreError::UnknownProperty {
                object: "table".into(),
                property: name.into(),
            }),
        }
    }
}

impl EventSource for TableProxy {
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        self.notifier.subscribe(kind, handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.notifier.unsubscribe(id);
    }
}

impl Bindable for TableProxy {}

impl Drop for TableProxy {
    fn drop(&mut self) {
        for id in self.view_subs.drain(..) {
            self.view.unsubscribe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditableWidget;
    use crate::headless::{HeadlessEditorFactory, HeadlessTableView};
    use glint_core::key_codes;

    fn person(name: &str, age: i64) -> ObjectRef {
        Model::builder("Person")
            .attr("name", name)
            .attr("age", age)
            .build()
            .as_object()
    }

    fn names(view: &HeadlessTableView) -> Vec<String> {
        view.column_values("name")
            .iter()
            .map(Value::to_display_string)
            .collect()
    }

    fn contacts() -> Vec<ObjectRef> {
        vec![person("Cy", 30), person("Ann", 25), person("Bob", 30)]
    }

    fn table(view: &Rc<HeadlessTableView>) -> Rc<TableProxy> {
        let factory = Rc::new(HeadlessEditorFactory::new());
        let mut registry = EditorRegistry::new();
        registry.register_all(factory);
        TableProxy::builder(view.clone())
            .column(TableColumn::new("Name", "name"))
            .column(TableColumn::new("Age", "age").editor(EditorKind::Spinner))
            .additional_sort_properties(["name"])
            .editors(registry)
            .build()
            .unwrap()
    }

    #[test]
    fn test_items_binding_publishes_to_view() {
        let view = HeadlessTableView::new();
        let table = table(&view);
        let book = Model::builder("AddressBook")
            .attr("contacts", Value::List(contacts().into_iter().map(Value::Object).collect()))
            .build();

        let _binding = table.bind_items(&book.as_object(), "contacts").unwrap();
        assert_eq!(names(&view), ["Cy", "Ann", "Bob"]);

        book.set("contacts", Value::List(vec![Value::Object(person("Dee", 40))]))
            .unwrap();
        assert_eq!(names(&view), ["Dee"]);
    }

    #[test]
    fn test_column_click_sorts_and_toggles() {
        let view = HeadlessTableView::new();
        let table = table(&view);
        table.set_items(contacts());

        view.click_column(1);
        assert_eq!(names(&view), ["Ann", "Bob", "Cy"]);
        assert_eq!(table.sort_direction(), SortDirection::Ascending);
        assert_eq!(
            table.sort_state().current().unwrap().property_names(),
            ["age", "name"]
        );

        view.click_column(1);
        assert_eq!(names(&view), ["Cy", "Bob", "Ann"]);
        assert_eq!(table.sort_direction(), SortDirection::Descending);

        view.click_column(0);
        assert_eq!(names(&view), ["Ann", "Bob", "Cy"]);
        assert_eq!(table.sort_direction(), SortDirection::Ascending);
    }

    #[test]
    fn test_new_items_keep_sort() {
        let view = HeadlessTableView::new();
        let table = table(&view);
        table.sort_by_column(0).unwrap();
        table.set_items(contacts());
        assert_eq!(names(&view), ["Ann", "Bob", "Cy"]);
    }

    #[test]
    fn test_selection_survives_resort() {
        let view = HeadlessTableView::new();
        let table = table(&view);
        table.set_items(contacts());

        view.select_rows(&[0]);
        assert_eq!(table.selection().len(), 1);

        table.sort_by_column(0).unwrap();
        assert_eq!(view.selected_rows(), vec![2]);
        assert_eq!(
            table.selection()[0].get_property("name").unwrap(),
            Value::from("Cy")
        );
    }

    #[test]
    fn test_failed_sort_restores_state() {
        let view = HeadlessTableView::new();
        let factory = Rc::new(HeadlessEditorFactory::new());
        let mut registry = EditorRegistry::new();
        registry.register_all(factory);
        let table = TableProxy::builder(view.clone())
            .column(TableColumn::new("Name", "name"))
            .column(
                TableColumn::new("Broken", "name")
                    .try_comparator(|_, _| Err(CoreError::sort("no order"))),
            )
            .editors(registry)
            .build()
            .unwrap();
        table.set_items(contacts());
        table.sort_by_column(0).unwrap();
        let replaced = view.replace_count();

        assert!(table.sort_by_column(1).is_err());
        assert_eq!(view.replace_count(), replaced);
        assert_eq!(names(&view), ["Ann", "Bob", "Cy"]);
        assert!(!table.sort_state().current().unwrap().has_custom_sort());

        // toggling still sees the previous column as current
        table.sort_by_column(0).unwrap();
        assert_eq!(names(&view), ["Cy", "Bob", "Ann"]);
    }

    #[test]
    fn test_selection_two_way_binding() {
        let view = HeadlessTableView::new();
        let table = table(&view);
        let records = contacts();
        table.set_items(records.clone());
        let screen = Model::with_attributes("Screen", [("current", Value::Nil)]);
        let _binding = table
            .bind_selection(&screen.as_object(), "current")
            .unwrap();

        view.select_rows(&[2]);
        assert_eq!(screen.get("current"), Value::Object(records[2].clone()));

        screen.set("current", Value::Object(records[1].clone())).unwrap();
        assert_eq!(view.selected_rows(), vec![1]);
    }

    #[test]
    fn test_commit_resorts_and_reselects() {
        let view = HeadlessTableView::new();
        let table = table(&view);
        table.set_items(contacts());
        table.sort_by_column(1).unwrap();
        assert_eq!(names(&view), ["Ann", "Bob", "Cy"]);

        table.edit_cell(0, 1).unwrap();
        let editor = table.edit_controller().editor().unwrap();
        editor.set_value(Value::from(50));
        assert!(matches!(table.commit_edit(), EditOutcome::Committed { .. }));

        assert_eq!(names(&view), ["Bob", "Cy", "Ann"]);
        assert_eq!(view.selected_rows(), vec![2]);
        assert_eq!(
            table.selection()[0].get_property("name").unwrap(),
            Value::from("Ann")
        );
    }

    #[test]
    fn test_commit_hooks_do_not_replace_resort() {
        let view = HeadlessTableView::new();
        let table = table(&view);
        table.set_items(contacts());
        table.sort_by_column(1).unwrap();

        let rows_seen = Rc::new(RefCell::new(Vec::new()));
        {
            let rows_seen = rows_seen.clone();
            let view = view.clone();
            table
                .edit_controller()
                .on_commit(move |_, _| rows_seen.borrow_mut().push(names(&view)));
        }

        table.edit_cell(0, 1).unwrap();
        let editor = table.edit_controller().editor().unwrap();
        editor.set_value(Value::from(50));
        assert!(matches!(table.commit_edit(), EditOutcome::Committed { .. }));

        assert_eq!(names(&view), ["Bob", "Cy", "Ann"]);
        assert_eq!(*rows_seen.borrow(), [["Bob", "Cy", "Ann"]]);
        assert_eq!(view.selected_rows(), vec![2]);
    }

    #[test]
    fn test_edit_selected_with_session_hooks() {
        let view = HeadlessTableView::new();
        let table = table(&view);
        table.set_items(contacts());
        table.sort_by_column(1).unwrap();

        assert!(matches!(
            table.edit_selected(1, EditHooks::new()),
            Err(WidgetError::NoSelection)
        ));

        view.select_rows(&[0]);
        let written_at = Rc::new(Cell::new(None));
        let hooks = EditHooks::new().after_write({
            let written_at = written_at.clone();
            let view = view.clone();
            move |_, _| written_at.set(view.selected_rows().first().copied())
        });
        table.edit_selected(1, hooks).unwrap();
        assert_eq!(table.edit_controller().active_cell(), Some((0, 1)));

        let editor = table.edit_controller().editor().unwrap();
        editor.set_value(Value::from(50));
        table.commit_edit();

        assert_eq!(written_at.get(), Some(2));
    }

    #[test]
    fn test_activation_starts_edit_when_enabled() {
        let view = HeadlessTableView::new();
        let table = table(&view);
        table.set_items(contacts());

        view.activate(1, 0);
        assert!(!table.edit_controller().is_editing());

        table.set_edit_on_activation(true);
        view.activate(1, 0);
        assert_eq!(table.edit_controller().active_cell(), Some((1, 0)));
    }

    #[test]
    fn test_removed_record_cancels_edit() {
        let view = HeadlessTableView::new();
        let table = table(&view);
        let records = contacts();
        table.set_items(records.clone());

        table.edit_cell(0, 0).unwrap();
        let editor = table.edit_controller().editor().unwrap();
        editor.set_value(Value::from("Cyrus"));
        table.set_items(records[1..].to_vec());

        assert!(matches!(table.commit_edit(), EditOutcome::Cancelled { .. }));
        assert_eq!(records[0].get_property("name").unwrap(), Value::from("Cy"));
    }

    #[test]
    fn test_edit_errors() {
        let view = HeadlessTableView::new();
        let factory = Rc::new(HeadlessEditorFactory::new());
        let mut registry = EditorRegistry::new();
        registry.register_all(factory);
        let table = TableProxy::builder(view.clone())
            .column(TableColumn::new("Name", "name").read_only())
            .editors(registry)
            .build()
            .unwrap();
        table.set_items(contacts());

        assert!(matches!(table.edit_cell(0, 0), Err(WidgetError::NotEditable(0))));
        assert!(matches!(table.edit_cell(0, 4), Err(WidgetError::ColumnOutOfRange(4))));
        assert!(matches!(table.sort_by_column(9), Err(WidgetError::ColumnOutOfRange(9))));
    }

    #[test]
    fn test_enter_in_editor_commits_through_table() {
        let view = HeadlessTableView::new();
        let factory = Rc::new(HeadlessEditorFactory::new());
        let mut registry = EditorRegistry::new();
        registry.register_all(factory.clone());
        let table = TableProxy::builder(view.clone())
            .column(TableColumn::new("Name", "name"))
            .editors(registry)
            .build()
            .unwrap();
        table.set_items(contacts());

        table.edit_cell(2, 0).unwrap();
        let editor = factory.last().unwrap();
        editor.type_text("Bo");
        editor.press_key(key_codes::KEYPAD_ENTER);

        assert_eq!(names(&view), ["Cy", "Ann", "Bo"]);
    }

    #[test]
    fn test_invalid_column_path_rejected() {
        let view = HeadlessTableView::new();
        let result = TableProxy::builder(view)
            .column(TableColumn::new("Broken", "a..b"))
            .build();
        assert!(matches!(result, Err(WidgetError::Core(CoreError::EmptyPath))));
    }

    #[test]
    fn test_dropping_table_unsubscribes_view() {
        let view = HeadlessTableView::new();
        let table = table(&view);
        table.set_items(contacts());
        drop(table);
        view.click_column(0);
        assert_eq!(names(&view), ["Cy", "Ann", "Bob"]);
    }
}
