//! Property bindings
//!
//! A [`Binding`] keeps a target attribute synchronized with a source
//! attribute. Either side is addressed by an object plus a dotted
//! [`PropertyPath`], so a label's `text` can follow `person.address.street`.
//!
//! ```rust
//! use glint_core::binding::{bind, BindOptions};
//! use glint_core::model::Model;
//!
//! let counter = Model::with_attributes("Counter", [("count", 1)]);
//! let label = Model::with_attributes("Label", [("text", "")]);
//!
//! let _binding = bind(
//!     &counter.as_object(),
//!     "count",
//!     &label.as_object(),
//!     "text",
//!     BindOptions::read().on_read(|v| format!("Count: {v}").into()),
//! )
//! .unwrap();
//!
//! assert_eq!(label.get("text").to_display_string(), "Count: 1");
//! counter.set("count", 2).unwrap();
//! assert_eq!(label.get("text").to_display_string(), "Count: 2");
//! ```
//!
//! # Propagation rules
//!
//! - Binding performs one source → target pass immediately (except for
//!   write-only links).
//! - A link never writes a value equal to the one the receiving side already
//!   holds, and ignores change events it caused itself. Two-way links therefore
//!   settle after one hop instead of echoing.
//! - `computed_by` paths are observed alongside the source; a change to any of
//!   them re-runs the read transform against the live source value.
//! - Every hop of a nested path is observed. Replacing an intermediate object
//!   rewires the observers and re-synchronizes.
//! - Transform failures during live updates are logged and the update is
//!   dropped; unresolvable paths fail at bind time.
//!
//! The link holds its target weakly: a widget may own the bindings that
//! write into it without creating a reference cycle.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::error::Result;
use crate::path::PropertyPath;
use crate::proxy::{Bindable, Event, EventKind, ObjectRef, SubscriptionId};
use crate::value::Value;

/// Value transform applied while propagating
pub type Transform = Rc<dyn Fn(&Value) -> Result<Value>>;

/// Which way values flow through a binding
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BindingDirection {
    /// Source → target only
    #[default]
    Read,
    /// Target → source only
    Write,
    /// Both ways
    TwoWay,
}

impl BindingDirection {
    fn reads(self) -> bool {
        matches!(self, BindingDirection::Read | BindingDirection::TwoWay)
    }

    fn writes(self) -> bool {
        matches!(self, BindingDirection::Write | BindingDirection::TwoWay)
    }
}

/// Options for [`bind`]
#[derive(Clone, Default)]
pub struct BindOptions {
    direction: BindingDirection,
    on_read: Option<Transform>,
    on_write: Option<Transform>,
    computed_by: Vec<String>,
}

impl BindOptions {
    /// One-way source → target binding
    pub fn read() -> Self {
        Self::default()
    }

    /// One-way target → source binding
    pub fn write() -> Self {
        Self {
            direction: BindingDirection::Write,
            ..Self::default()
        }
    }

    /// Two-way binding
    pub fn two_way() -> Self {
        Self {
            direction: BindingDirection::TwoWay,
            ..Self::default()
        }
    }

    /// Transform applied to source values before they reach the target
    pub fn on_read(self, f: impl Fn(&Value) -> Value + 'static) -> Self {
        self.try_on_read(move |v| Ok(f(v)))
    }

    /// Fallible variant of [`BindOptions::on_read`]
    pub fn try_on_read(mut self, f: impl Fn(&Value) -> Result<Value> + 'static) -> Self {
        self.on_read = Some(Rc::new(f));
        self
    }

    /// Transform applied to target values before they reach the source
    pub fn on_write(self, f: impl Fn(&Value) -> Value + 'static) -> Self {
        self.try_on_write(move |v| Ok(f(v)))
    }

    /// Fallible variant of [`BindOptions::on_write`]
    pub fn try_on_write(mut self, f: impl Fn(&Value) -> Result<Value> + 'static) -> Self {
        self.on_write = Some(Rc::new(f));
        self
    }

    /// Extra source-relative paths whose changes re-evaluate the binding
    pub fn computed_by<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.computed_by.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn direction(&self) -> BindingDirection {
        self.direction
    }
}

/// Create a binding between `source.source_path` and `target.target_path`
///
/// Fails when either path (or any `computed_by` path) cannot be resolved.
pub fn bind(
    source: &ObjectRef,
    source_path: &str,
    target: &ObjectRef,
    target_path: &str,
    options: BindOptions,
) -> Result<Binding> {
    let source_path = PropertyPath::parse(source_path)?;
    let target_path = PropertyPath::parse(target_path)?;
    source_path.validate(source)?;
    target_path.validate(target)?;

    let mut computed_by = Vec::with_capacity(options.computed_by.len());
    for raw in &options.computed_by {
        let path = PropertyPath::parse(raw)?;
        path.validate(source)?;
        computed_by.push(path);
    }

    let link = Rc::new(Link {
        source: source.clone(),
        source_path,
        target: Rc::downgrade(target),
        target_path,
        computed_by,
        direction: options.direction,
        on_read: options.on_read,
        on_write: options.on_write,
        syncing: Cell::new(false),
        detached: Cell::new(false),
        source_watch: RefCell::new(Vec::new()),
        target_watch: RefCell::new(Vec::new()),
        dependency_watch: RefCell::new(Vec::new()),
    });

    link.watch(Side::Source);
    if link.direction.writes() {
        link.watch(Side::Target);
    }
    link.watch(Side::Dependencies);

    tracing::debug!(
        "bound {}.{} -> {}.{} ({:?})",
        source.type_name(),
        link.source_path,
        target.type_name(),
        link.target_path,
        link.direction
    );

    if link.direction.reads() {
        link.sync_to_target();
    }

    Ok(Binding { link })
}

/// A live binding; dropping it disconnects both directions
pub struct Binding {
    link: Rc<Link>,
}

impl Binding {
    pub fn direction(&self) -> BindingDirection {
        self.link.direction
    }

    pub fn source_path(&self) -> &PropertyPath {
        &self.link.source_path
    }

    pub fn target_path(&self) -> &PropertyPath {
        &self.link.target_path
    }

    /// Re-run the read transform against the live source and push it to the target
    pub fn refresh(&self) {
        self.link.sync_to_target();
    }

    /// Whether the target object is still alive
    pub fn is_active(&self) -> bool {
        !self.link.detached.get() && self.link.target.upgrade().is_some()
    }

    /// Disconnect explicitly (same as dropping)
    pub fn unbind(self) {}
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.link.detach();
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("source", &self.link.source_path)
            .field("target", &self.link.target_path)
            .field("direction", &self.link.direction)
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Source,
    Target,
    Dependencies,
}

type WatchList = RefCell<Vec<(Weak<dyn Bindable>, SubscriptionId)>>;

struct Link {
    source: ObjectRef,
    source_path: PropertyPath,
    target: Weak<dyn Bindable>,
    target_path: PropertyPath,
    computed_by: Vec<PropertyPath>,
    direction: BindingDirection,
    on_read: Option<Transform>,
    on_write: Option<Transform>,
    /// Set while this link writes, so the echo of its own write is ignored
    syncing: Cell<bool>,
    detached: Cell<bool>,
    source_watch: WatchList,
    target_watch: WatchList,
    dependency_watch: WatchList,
}

impl Link {
    fn watch_list(&self, side: Side) -> &WatchList {
        match side {
            Side::Source => &self.source_watch,
            Side::Target => &self.target_watch,
            Side::Dependencies => &self.dependency_watch,
        }
    }

    /// Subscribe to every hop of the paths belonging to `side`
    fn watch(self: &Rc<Self>, side: Side) {
        let chains: SmallVec<[Vec<(ObjectRef, String)>; 2]> = match side {
            Side::Source => SmallVec::from_elem(self.source_path.chain(&self.source), 1),
            Side::Target => match self.target.upgrade() {
                Some(target) => SmallVec::from_elem(self.target_path.chain(&target), 1),
                None => SmallVec::new(),
            },
            Side::Dependencies => self
                .computed_by
                .iter()
                .map(|path| path.chain(&self.source))
                .collect(),
        };
        let depths: SmallVec<[usize; 2]> = match side {
            Side::Source => SmallVec::from_elem(self.source_path.segments().len(), 1),
            Side::Target => SmallVec::from_elem(self.target_path.segments().len(), 1),
            Side::Dependencies => self
                .computed_by
                .iter()
                .map(|path| path.segments().len())
                .collect(),
        };

        let mut subscriptions = Vec::new();
        for (chain, depth) in chains.into_iter().zip(depths) {
            for (index, (object, segment)) in chain.into_iter().enumerate() {
                let is_leaf = index + 1 == depth;
                let weak = Rc::downgrade(self);
                let id = object.subscribe(
                    EventKind::PropertyChanged(segment),
                    Rc::new(move |_event: &Event| {
                        if let Some(link) = weak.upgrade() {
                            link.changed(side, is_leaf);
                        }
                    }),
                );
                subscriptions.push((Rc::downgrade(&object), id));
            }
        }
        *self.watch_list(side).borrow_mut() = subscriptions;
    }

    fn unwatch(&self, side: Side) {
        let subscriptions = std::mem::take(&mut *self.watch_list(side).borrow_mut());
        for (object, id) in subscriptions {
            if let Some(object) = object.upgrade() {
                object.unsubscribe(id);
            }
        }
    }

    fn detach(&self) {
        if self.detached.replace(true) {
            return;
        }
        self.unwatch(Side::Source);
        self.unwatch(Side::Target);
        self.unwatch(Side::Dependencies);
        tracing::trace!("unbound {} -> {}", self.source_path, self.target_path);
    }

    /// Single entry point for every observed change
    fn changed(self: &Rc<Self>, side: Side, is_leaf: bool) {
        if self.detached.get() {
            return;
        }
        if !is_leaf {
            // an intermediate object was replaced: follow the new chain
            self.unwatch(side);
            self.watch(side);
        }
        match side {
            Side::Source | Side::Dependencies => {
                if !self.syncing.get() {
                    self.sync_to_target();
                }
            }
            Side::Target => {
                if !is_leaf && self.direction.reads() {
                    self.sync_to_target();
                } else if !self.syncing.get() {
                    self.sync_to_source();
                }
            }
        }
    }

    fn sync_to_target(&self) {
        if !self.direction.reads() || self.detached.get() {
            return;
        }
        let Some(target) = self.target.upgrade() else {
            return;
        };
        let raw = match self.source_path.read(&self.source) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("binding {}: cannot read source: {}", self.source_path, err);
                return;
            }
        };
        let value = match &self.on_read {
            Some(transform) => match transform(&raw) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(
                        "binding {} -> {}: read transform failed, update dropped: {}",
                        self.source_path,
                        self.target_path,
                        err
                    );
                    return;
                }
            },
            None => raw,
        };
        if matches!(self.target_path.read(&target), Ok(ref current) if *current == value) {
            return;
        }
        tracing::trace!(
            "binding {} -> {}: {:?}",
            self.source_path,
            self.target_path,
            value
        );
        self.syncing.set(true);
        let result = self.target_path.write(&target, value);
        self.syncing.set(false);
        if let Err(err) = result {
            tracing::warn!("binding {}: cannot write target: {}", self.target_path, err);
        }
    }

    fn sync_to_source(&self) {
        if !self.direction.writes() || self.detached.get() {
            return;
        }
        let Some(target) = self.target.upgrade() else {
            return;
        };
        let raw = match self.target_path.read(&target) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("binding {}: cannot read target: {}", self.target_path, err);
                return;
            }
        };
        let value = match &self.on_write {
            Some(transform) => match transform(&raw) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(
                        "binding {} <- {}: write transform failed, update dropped: {}",
                        self.source_path,
                        self.target_path,
                        err
                    );
                    return;
                }
            },
            None => raw,
        };
        if matches!(self.source_path.read(&self.source), Ok(ref current) if *current == value) {
            return;
        }
        tracing::trace!(
            "binding {} <- {}: {:?}",
            self.source_path,
            self.target_path,
            value
        );
        self.syncing.set(true);
        let result = self.source_path.write(&self.source, value);
        self.syncing.set(false);
        if let Err(err) = result {
            tracing::warn!("binding {}: cannot write source: {}", self.source_path, err);
        }
    }
}
