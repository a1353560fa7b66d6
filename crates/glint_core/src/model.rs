//! Observable models
//!
//! [`Model`] is the in-memory implementation of the proxy facade: a named bag
//! of attributes that notifies subscribers whenever an attribute is assigned.
//! Application models, headless widgets and canvas shapes are all built from
//! it.
//!
//! # Example
//!
//! ```rust
//! use glint_core::model::Model;
//! use glint_core::proxy::{EventKind, EventSourceExt, PropertyAccess};
//!
//! let person = Model::builder("Person")
//!     .attr("first_name", "Ada")
//!     .attr("last_name", "Lovelace")
//!     .computed("full_name", |m| {
//!         format!("{} {}", m.get("first_name"), m.get("last_name")).into()
//!     })
//!     .build();
//!
//! let _sub = person.on(EventKind::PropertyChanged("first_name".into()), |event| {
//!     println!("first name is now {}", event.data);
//! });
//!
//! person.set("first_name", "Augusta").unwrap();
//! assert_eq!(person.get("full_name").to_display_string(), "Augusta Lovelace");
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::error::{CoreError, Result};
use crate::proxy::{
    Bindable, Event, EventHandler, EventKind, EventSource, ObjectRef, PropertyAccess,
    SubscriptionId,
};
use crate::value::Value;

/// Read-only attribute computed from the model's live state
pub type ComputedFn = Rc<dyn Fn(&Model) -> Value>;

struct Subscriber {
    kind: EventKind,
    handler: EventHandler,
}

/// An observable attribute bag
pub struct Model {
    type_name: String,
    attributes: RefCell<IndexMap<String, Value>>,
    computed: FxHashMap<String, ComputedFn>,
    subscribers: RefCell<SlotMap<SubscriptionId, Subscriber>>,
    disposed: Cell<bool>,
}

impl Model {
    /// Start building a model with the given type name
    pub fn builder(type_name: impl Into<String>) -> ModelBuilder {
        ModelBuilder {
            type_name: type_name.into(),
            attributes: IndexMap::new(),
            computed: FxHashMap::default(),
        }
    }

    /// Create a model from `(name, value)` pairs
    pub fn with_attributes<K, V>(
        type_name: impl Into<String>,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> Rc<Model>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut builder = Model::builder(type_name);
        for (name, value) in attributes {
            builder = builder.attr(name, value);
        }
        builder.build()
    }

    /// Upcast to a shared bindable handle
    pub fn as_object(self: &Rc<Self>) -> ObjectRef {
        self.clone()
    }

    /// Read an attribute, yielding `Nil` when it does not exist
    pub fn get(&self, name: &str) -> Value {
        self.get_property(name).unwrap_or(Value::Nil)
    }

    /// Assign an attribute and notify observers
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.set_property(name, value.into())
    }

    /// Declare a new attribute without notifying
    pub fn define(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes
            .borrow_mut()
            .insert(name.into(), value.into());
    }

    /// Attribute names in declaration order (computed attributes last)
    pub fn attribute_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.attributes.borrow().keys().cloned().collect();
        let mut computed: Vec<String> = self.computed.keys().cloned().collect();
        computed.sort();
        names.extend(computed);
        names
    }

    /// Deliver an event to every subscriber of its kind
    ///
    /// Handlers are collected before any of them runs, so a handler may
    /// subscribe, unsubscribe or emit again without conflict.
    pub fn emit(&self, event: &Event) {
        let handlers: SmallVec<[EventHandler; 4]> = self
            .subscribers
            .borrow()
            .values()
            .filter(|sub| sub.kind == event.kind)
            .map(|sub| sub.handler.clone())
            .collect();
        for handler in handlers {
            handler(event);
        }
    }

    /// Dispose the model: notify `Disposed` subscribers, then drop all of them
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        tracing::trace!("disposing {}", self.type_name);
        self.emit(&Event::new(EventKind::Disposed));
        self.subscribers.borrow_mut().clear();
    }

    /// Number of live subscriptions (all kinds)
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Number of live subscriptions for one event kind
    pub fn subscribers_for(&self, kind: &EventKind) -> usize {
        self.subscribers
            .borrow()
            .values()
            .filter(|sub| &sub.kind == kind)
            .count()
    }

    fn unknown(&self, property: &str) -> CoreError {
        CoreError::UnknownProperty {
            object: self.type_name.clone(),
            property: property.to_string(),
        }
    }
}

impl PropertyAccess for Model {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn has_property(&self, name: &str) -> bool {
        self.attributes.borrow().contains_key(name) || self.computed.contains_key(name)
    }

    fn get_property(&self, name: &str) -> Result<Value> {
        if let Some(compute) = self.computed.get(name) {
            return Ok(compute(self));
        }
        self.attributes
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| self.unknown(name))
    }

    fn set_property(&self, name: &str, value: Value) -> Result<()> {
        if self.disposed.get() {
            return Err(CoreError::Disposed(self.type_name.clone()));
        }
        if self.computed.contains_key(name) {
            return Err(CoreError::InvalidValue {
                property: name.to_string(),
                reason: "computed attributes are read-only".to_string(),
            });
        }
        {
            let mut attributes = self.attributes.borrow_mut();
            let slot = attributes.get_mut(name).ok_or_else(|| self.unknown(name))?;
            *slot = value.clone();
        }
        self.emit(&Event::property_changed(name, value));
        Ok(())
    }
}

impl EventSource for Model {
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        self.subscribers
            .borrow_mut()
            .insert(Subscriber { kind, handler })
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.borrow_mut().remove(id);
    }
}

impl Bindable for Model {
    fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

/// Builder for [`Model`]
pub struct ModelBuilder {
    type_name: String,
    attributes: IndexMap<String, Value>,
    computed: FxHashMap<String, ComputedFn>,
}

impl ModelBuilder {
    /// Add a stored attribute
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Add a read-only attribute computed on every read
    pub fn computed(
        mut self,
        name: impl Into<String>,
        compute: impl Fn(&Model) -> Value + 'static,
    ) -> Self {
        self.computed.insert(name.into(), Rc::new(compute));
        self
    }

    pub fn build(self) -> Rc<Model> {
        Rc::new(Model {
            type_name: self.type_name,
            attributes: RefCell::new(self.attributes),
            computed: self.computed,
            subscribers: RefCell::new(SlotMap::with_key()),
            disposed: Cell::new(false),
        })
    }
}
