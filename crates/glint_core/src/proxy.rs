//! Proxy facade
//!
//! The capability traits through which the binding, sort and edit engines talk
//! to widgets, shapes and models. A host toolkit adapter implements these for
//! its native objects; [`crate::model::Model`] implements them in memory.
//!
//! Each trait is a bounded, enumerated method set. Nothing here forwards
//! arbitrary calls to a wrapped object.

use std::rc::Rc;

use crate::error::Result;
use crate::value::Value;

/// Shared handle to any bindable object
pub type ObjectRef = Rc<dyn Bindable>;

/// Event handler registered with [`EventSource::subscribe`]
pub type EventHandler = Rc<dyn Fn(&Event)>;

slotmap::new_key_type! {
    /// Identifies one subscription on one event source
    pub struct SubscriptionId;
}

/// Key codes delivered in [`Event::key_code`]
pub mod key_codes {
    pub const BACKSPACE: u32 = 8;
    pub const TAB: u32 = 9;
    pub const ENTER: u32 = 13;
    pub const ESCAPE: u32 = 27;
    pub const SPACE: u32 = 32;
    pub const KEYPAD_ENTER: u32 = 0x0100_0050;
}

/// The kinds of notification an event source can deliver
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A property changed; `Event::data` carries the new value
    PropertyChanged(String),
    /// Selection changed (rows, combo item, checkbox toggle)
    Selection,
    /// Default selection (double click or Enter on a row)
    DefaultSelection,
    /// A column header was clicked; `Event::data` carries the column index
    ColumnSelected,
    FocusLost,
    KeyPressed,
    MouseDown,
    MouseMove,
    MouseUp,
    Drop,
    /// The object was disposed
    Disposed,
}

/// Payload delivered to event handlers
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub key_code: Option<u32>,
    pub x: f64,
    pub y: f64,
    /// Kind-specific payload (new property value, row index, drag data)
    pub data: Value,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            key_code: None,
            x: 0.0,
            y: 0.0,
            data: Value::Nil,
        }
    }

    pub fn property_changed(property: impl Into<String>, value: Value) -> Self {
        Self::new(EventKind::PropertyChanged(property.into())).with_data(value)
    }

    pub fn key(key_code: u32) -> Self {
        Self {
            key_code: Some(key_code),
            ..Self::new(EventKind::KeyPressed)
        }
    }

    pub fn pointer(kind: EventKind, x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Self::new(kind)
        }
    }

    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = data.into();
        self
    }
}

/// Get/set access to named properties
pub trait PropertyAccess {
    /// Short name used in logs and error messages
    fn type_name(&self) -> &str {
        "object"
    }

    fn has_property(&self, name: &str) -> bool;

    fn get_property(&self, name: &str) -> Result<Value>;

    fn set_property(&self, name: &str, value: Value) -> Result<()>;
}

/// Subscription to interaction and change notifications
pub trait EventSource {
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId;

    /// Remove a subscription; unknown ids are ignored
    fn unsubscribe(&self, id: SubscriptionId);
}

/// An object that bindings can read, write and observe
pub trait Bindable: PropertyAccess + EventSource {
    fn is_disposed(&self) -> bool {
        false
    }
}

/// Ordered collection displayed by a tabular widget
pub trait CollectionView {
    /// The records in display order
    fn collection_view(&self) -> Vec<ObjectRef>;

    /// Publish a new display order
    fn replace_collection_view(&self, items: Vec<ObjectRef>);
}

/// Convenience for subscribing with a closure
pub trait EventSourceExt: EventSource {
    fn on(&self, kind: EventKind, handler: impl Fn(&Event) + 'static) -> SubscriptionId {
        self.subscribe(kind, Rc::new(handler))
    }
}

impl<T: EventSource + ?Sized> EventSourceExt for T {}

/// Index of `object` in `items`, by identity
pub fn position_of(items: &[ObjectRef], object: &ObjectRef) -> Option<usize> {
    items.iter().position(|item| Rc::ptr_eq(item, object))
}

/// Collect the objects held by a list value, skipping non-objects
pub fn objects_in(value: &Value) -> Vec<ObjectRef> {
    match value {
        Value::List(items) => items
            .iter()
            .filter_map(|item| item.as_object().cloned())
            .collect(),
        Value::Object(object) => vec![object.clone()],
        _ => Vec::new(),
    }
}
