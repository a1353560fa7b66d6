//! Canvas shape dragging
//!
//! A [`Canvas`] tracks shapes (any bindable object with `x`, `y`, `width` and
//! `height`) and turns pointer events into drag gestures:
//!
//! - `drag_and_move` shapes follow the pointer.
//! - `drag_source` shapes follow the pointer and, on release, are offered to
//!   the drop target under the pointer. A rejected or missed drop puts the shape
//!   back where the drag started.
//!
//! Positions are written through the facade, so models bound to a shape's
//! coordinates follow it while it moves.
//!
//! Gesture state lives in a [`DragContext`] owned by the caller (or by the
//! closures installed with [`Canvas::attach`]), never in the canvas or shapes.

use std::cell::RefCell;
use std::rc::Rc;

use glint_core::{
    Bindable, CoreError, Event, EventKind, EventSource, EventSourceExt, Model, ObjectRef,
    PropertyAccess, StateMachine, SubscriptionId, Value,
};
use smallvec::SmallVec;

use crate::error::Result;

/// Drag gesture states
pub mod states {
    pub const IDLE: u32 = 0;
    pub const PRESSED: u32 = 1;
    pub const DRAGGING: u32 = 2;
}

/// Drag gesture events
pub mod events {
    pub const PRESS: u32 = 0;
    pub const MOVE: u32 = 1;
    pub const RELEASE: u32 = 2;
}

fn drag_fsm() -> StateMachine {
    use events::*;
    use states::*;

    StateMachine::builder(IDLE)
        .on(IDLE, PRESS, PRESSED)
        .on_each(&[PRESSED, DRAGGING], MOVE, DRAGGING)
        .on_each(&[PRESSED, DRAGGING], RELEASE, IDLE)
        .build()
}

const GEOMETRY: [&str; 4] = ["x", "y", "width", "height"];

/// A rectangle model with integer geometry
pub fn rectangle(x: i64, y: i64, width: i64, height: i64) -> Rc<Model> {
    Model::builder("rectangle")
        .attr("x", x)
        .attr("y", y)
        .attr("width", width)
        .attr("height", height)
        .build()
}

/// Delivered to a drop target's handler
#[derive(Clone)]
pub struct DropEvent {
    pub dragged: ObjectRef,
    pub target: ObjectRef,
    pub x: f64,
    pub y: f64,
    /// The dragged shape's drag data
    pub data: Value,
}

/// Decides whether a drop is accepted
pub type DropHandler = Rc<dyn Fn(&DropEvent) -> bool>;

/// Drag behaviour of one shape
#[derive(Clone, Default)]
pub struct ShapeOptions {
    pub drag_and_move: bool,
    pub drag_source: bool,
    pub drop_handler: Option<DropHandler>,
    pub drag_data: Value,
}

impl ShapeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drag_and_move(mut self) -> Self {
        self.drag_and_move = true;
        self
    }

    /// Make the shape droppable onto drop targets, carrying `data`
    pub fn drag_source(mut self, data: impl Into<Value>) -> Self {
        self.drag_source = true;
        self.drag_data = data.into();
        self
    }

    pub fn drop_target(mut self, handler: impl Fn(&DropEvent) -> bool + 'static) -> Self {
        self.drop_handler = Some(Rc::new(handler));
        self
    }

    fn is_draggable(&self) -> bool {
        self.drag_and_move || self.drag_source
    }
}

struct CanvasShape {
    shape: ObjectRef,
    options: ShapeOptions,
}

/// Where the gesture currently is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Pressed,
    Dragging,
}

/// What a pointer event did
#[derive(Clone, Debug, PartialEq)]
pub enum DragOutcome {
    Ignored,
    Pressed,
    Dragged { x: Value, y: Value },
    /// Released without a drop (click or plain move)
    Released,
    Dropped { accepted: bool },
}

struct DragSession {
    shape: ObjectRef,
    origin: (Value, Value),
    offset: (f64, f64),
    drag_source: bool,
    data: Value,
}

/// State of the drag gesture in progress
pub struct DragContext {
    fsm: StateMachine,
    session: Option<DragSession>,
}

impl Default for DragContext {
    fn default() -> Self {
        Self {
            fsm: drag_fsm(),
            session: None,
        }
    }
}

impl DragContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        match self.fsm.current() {
            states::PRESSED => DragState::Pressed,
            states::DRAGGING => DragState::Dragging,
            _ => DragState::Idle,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.state() == DragState::Dragging
    }

    /// The shape being dragged
    pub fn dragged(&self) -> Option<&ObjectRef> {
        self.session.as_ref().map(|s| &s.shape)
    }

    /// Abandon the gesture without touching the shape
    pub fn reset(&mut self) {
        self.fsm.reset();
        self.session = None;
    }
}

/// Shapes that can be dragged and dropped
#[derive(Default)]
pub struct Canvas {
    shapes: RefCell<Vec<CanvasShape>>,
}

impl Canvas {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Add a shape; later shapes are on top
    pub fn add_shape(&self, shape: ObjectRef, options: ShapeOptions) -> Result<()> {
        if let Some(missing) = GEOMETRY.iter().find(|name| !shape.has_property(name)) {
            return Err(CoreError::UnknownProperty {
                object: shape.type_name().to_string(),
                property: missing.to_string(),
            }
            .into());
        }
        self.shapes
            .borrow_mut()
            .push(CanvasShape { shape, options });
        Ok(())
    }

    pub fn remove_shape(&self, shape: &ObjectRef) {
        self.shapes
            .borrow_mut()
            .retain(|entry| !Rc::ptr_eq(&entry.shape, shape));
    }

    pub fn len(&self) -> usize {
        self.shapes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.borrow().is_empty()
    }

    /// Topmost live shape under the point
    pub fn shape_at(&self, x: f64, y: f64) -> Option<ObjectRef> {
        self.topmost(x, y, |_| true).map(|(shape, _)| shape)
    }

    /// Feed one pointer event through the gesture
    pub fn handle_event(&self, ctx: &mut DragContext, event: &Event) -> DragOutcome {
        match event.kind {
            EventKind::MouseDown => self.press(ctx, event),
            EventKind::MouseMove => self.drag(ctx, event),
            EventKind::MouseUp => self.release(ctx, event),
            _ => DragOutcome::Ignored,
        }
    }

    /// Drive the canvas from a surface's pointer events
    ///
    /// The returned subscriptions belong to `surface`.
    pub fn attach(self: &Rc<Self>, surface: &dyn EventSource) -> SmallVec<[SubscriptionId; 3]> {
        let context = Rc::new(RefCell::new(DragContext::new()));
        [EventKind::MouseDown, EventKind::MouseMove, EventKind::MouseUp]
            .into_iter()
            .map(|kind| {
                let canvas = Rc::downgrade(self);
                let context = context.clone();
                surface.on(kind, move |event| {
                    let Some(canvas) = canvas.upgrade() else {
                        return;
                    };
                    let Ok(mut ctx) = context.try_borrow_mut() else {
                        tracing::trace!("nested pointer event {:?} ignored", event.kind);
                        return;
                    };
                    canvas.handle_event(&mut ctx, event);
                })
            })
            .collect()
    }

    fn press(&self, ctx: &mut DragContext, event: &Event) -> DragOutcome {
        if ctx.state() != DragState::Idle {
            return DragOutcome::Ignored;
        }
        let Some((shape, options)) = self.topmost(event.x, event.y, ShapeOptions::is_draggable)
        else {
            return DragOutcome::Ignored;
        };
        let origin = (read(&shape, "x"), read(&shape, "y"));
        let offset = (event.x - origin.0.to_float(), event.y - origin.1.to_float());

        tracing::debug!("drag pressed on {} at ({}, {})", shape.type_name(), event.x, event.y);
        ctx.fsm.send(events::PRESS);
        ctx.session = Some(DragSession {
            shape,
            origin,
            offset,
            drag_source: options.drag_source,
            data: options.drag_data,
        });
        DragOutcome::Pressed
    }

    fn drag(&self, ctx: &mut DragContext, event: &Event) -> DragOutcome {
        let Some(session) = &ctx.session else {
            return DragOutcome::Ignored;
        };
        let x = coordinate(&session.origin.0, event.x - session.offset.0);
        let y = coordinate(&session.origin.1, event.y - session.offset.1);
        let shape = session.shape.clone();
        ctx.fsm.send(events::MOVE);

        write(&shape, "x", x.clone());
        write(&shape, "y", y.clone());
        tracing::trace!("dragged to ({}, {})", x, y);
        DragOutcome::Dragged { x, y }
    }

    fn release(&self, ctx: &mut DragContext, event: &Event) -> DragOutcome {
        let was_dragging = ctx.is_dragging();
        let Some(session) = ctx.session.take() else {
            return DragOutcome::Ignored;
        };
        ctx.fsm.send(events::RELEASE);

        if !was_dragging || !session.drag_source {
            return DragOutcome::Released;
        }

        let target = self.topmost(event.x, event.y, |options| options.drop_handler.is_some());
        let accepted = match target {
            Some((target, options)) if !Rc::ptr_eq(&target, &session.shape) => {
                let drop_event = DropEvent {
                    dragged: session.shape.clone(),
                    target,
                    x: event.x,
                    y: event.y,
                    data: session.data.clone(),
                };
                options.drop_handler.is_some_and(|handler| handler(&drop_event))
            }
            _ => false,
        };

        if !accepted {
            tracing::debug!("drop not accepted, restoring origin");
            write(&session.shape, "x", session.origin.0);
            write(&session.shape, "y", session.origin.1);
        }
        DragOutcome::Dropped { accepted }
    }

    /// Topmost live shape under the point whose options pass `filter`
    ///
    /// Returns clones so no borrow is held while callers reach into shapes.
    fn topmost(
        &self,
        x: f64,
        y: f64,
        filter: impl Fn(&ShapeOptions) -> bool,
    ) -> Option<(ObjectRef, ShapeOptions)> {
        let candidates: Vec<(ObjectRef, ShapeOptions)> = self
            .shapes
            .borrow()
            .iter()
            .rev()
            .filter(|entry| filter(&entry.options))
            .map(|entry| (entry.shape.clone(), entry.options.clone()))
            .collect();
        candidates
            .into_iter()
            .find(|(shape, _)| !shape.is_disposed() && contains(shape, x, y))
    }
}

fn read(shape: &ObjectRef, property: &str) -> Value {
    shape.get_property(property).unwrap_or_default()
}

fn write(shape: &ObjectRef, property: &str, value: Value) {
    if let Err(err) = shape.set_property(property, value) {
        tracing::warn!("cannot move {}: {}", shape.type_name(), err);
    }
}

fn contains(shape: &ObjectRef, x: f64, y: f64) -> bool {
    let [left, top, width, height] = GEOMETRY.map(|name| read(shape, name).to_float());
    x >= left && x < left + width && y >= top && y < top + height
}

/// Keep integer coordinates integral
fn coordinate(like: &Value, value: f64) -> Value {
    match like {
        Value::Int(_) => Value::Int(value.round() as i64),
        _ => Value::Float(value),
    }
}
