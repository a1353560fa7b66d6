//! Glint Core
//!
//! This crate provides the foundational primitives for Glint's declarative
//! widget layer:
//!
//! - **Proxy Facade**: capability traits for property access and event
//!   subscription on widgets, shapes and models
//! - **Observable Models**: in-memory attribute bags that notify observers
//! - **Property Bindings**: one-way and two-way links with transforms,
//!   computed dependencies and nested attribute paths
//! - **Sort Engine**: multi-key sorting with per-column type coercion
//! - **State Machines**: flat FSMs for interaction lifecycles
//!
//! # Example
//!
//! ```rust
//! use glint_core::binding::{bind, BindOptions};
//! use glint_core::model::Model;
//! use glint_core::Value;
//!
//! let person = Model::with_attributes("Person", [("name", "Ann")]);
//! let field = Model::with_attributes("Text", [("text", "")]);
//!
//! let _binding = bind(
//!     &person.as_object(),
//!     "name",
//!     &field.as_object(),
//!     "text",
//!     BindOptions::two_way(),
//! )
//! .unwrap();
//!
//! field.set("text", "Bea").unwrap();
//! assert_eq!(person.get("name"), Value::from("Bea"));
//! ```

pub mod binding;
pub mod error;
pub mod fsm;
pub mod model;
pub mod path;
pub mod proxy;
pub mod sort;
pub mod value;

pub use binding::{bind, BindOptions, Binding, BindingDirection, Transform};
pub use error::{CoreError, Result};
pub use fsm::{EventId, StateId, StateMachine, Transition};
pub use model::{Model, ModelBuilder};
pub use path::PropertyPath;
pub use proxy::{
    key_codes, Bindable, CollectionView, Event, EventHandler, EventKind, EventSource,
    EventSourceExt, ObjectRef, PropertyAccess, SubscriptionId,
};
pub use sort::{
    apply_sort, Comparator, KeyExtractor, SortDirection, SortSpec, SortState, TypeHint,
};
pub use value::{Value, ValueKind};
