//! In-place cell editing
//!
//! An [`EditController`] owns at most one edit session at a time. A session
//! opens an editor widget over a record's property, listens for the editor's
//! commit and cancel triggers, and closes with exactly one commit or cancel.
//!
//! ```text
//!            start              commit               done
//!   Idle ──────────▶ Editing ──────────▶ Committing ──────────▶ Idle
//!                       │                    │
//!                       │ cancel             │ cancel (value unchanged,
//!                       ▼                    ▼  record gone, write failed)
//!                   Cancelling ─────────────────────────────────▶ Idle
//!                                            done
//! ```
//!
//! Commit triggers are Enter, focus loss and, for combo and checkbox editors,
//! a selection. Escape, [`EditController::cancel`] and disposal of the record
//! cancel. Starting a new session force-cancels the active one.
//!
//! Disposing the editor at the end of a session may itself fire focus loss;
//! such late triggers are recognised and ignored.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use glint_core::{
    key_codes, Bindable, Event, EventKind, EventSource, EventSourceExt, ObjectRef,
    PropertyAccess, PropertyPath, StateId, StateMachine, SubscriptionId, Value,
};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::editor::{EditorArgs, EditorKind, EditorRef, EditorRegistry};
use crate::error::{Result, WidgetError};

/// Edit session states
pub mod states {
    pub const IDLE: u32 = 0;
    pub const EDITING: u32 = 1;
    pub const COMMITTING: u32 = 2;
    pub const CANCELLING: u32 = 3;
}

/// Edit session events
pub mod events {
    pub const START: u32 = 0;
    pub const COMMIT: u32 = 1;
    pub const CANCEL: u32 = 2;
    pub const DONE: u32 = 3;
}

fn edit_fsm() -> StateMachine {
    use events::*;
    use states::*;

    StateMachine::builder(IDLE)
        .on(IDLE, START, EDITING)
        .on(EDITING, COMMIT, COMMITTING)
        .on_each(&[EDITING, COMMITTING], CANCEL, CANCELLING)
        .on_each(&[COMMITTING, CANCELLING], DONE, IDLE)
        .build()
}

/// Where the edit lifecycle currently is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditState {
    Idle,
    Editing,
    Committing,
    Cancelling,
}

impl EditState {
    fn from_id(id: StateId) -> Self {
        match id {
            states::EDITING => EditState::Editing,
            states::COMMITTING => EditState::Committing,
            states::CANCELLING => EditState::Cancelling,
            _ => EditState::Idle,
        }
    }
}

/// What to edit
#[derive(Clone)]
pub struct EditRequest {
    pub record: ObjectRef,
    pub property: PropertyPath,
    /// Display position, reported back in outcomes
    pub row: usize,
    pub column: usize,
    pub kind: EditorKind,
    /// Choices for combo editors
    pub items: Vec<Value>,
    pub hooks: EditHooks,
}

impl EditRequest {
    pub fn new(record: ObjectRef, property: PropertyPath, kind: EditorKind) -> Self {
        Self {
            record,
            property,
            row: 0,
            column: 0,
            kind,
            items: Vec::new(),
            hooks: EditHooks::default(),
        }
    }

    pub fn at(mut self, row: usize, column: usize) -> Self {
        self.row = row;
        self.column = column;
        self
    }

    pub fn with_items(mut self, items: Vec<Value>) -> Self {
        self.items = items;
        self
    }

    pub fn with_hooks(mut self, hooks: EditHooks) -> Self {
        self.hooks = hooks;
        self
    }
}

/// Callbacks for a single edit session
///
/// They run before the controller-wide hooks of the same phase.
#[derive(Clone, Default)]
pub struct EditHooks {
    before_write: Option<WriteHook>,
    after_write: Option<EditHook>,
    after_cancel: Option<EditHook>,
}

impl EditHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the new value just before it is written
    pub fn before_write(mut self, hook: impl Fn(&ObjectRef, &Value) + 'static) -> Self {
        self.before_write = Some(Rc::new(hook));
        self
    }

    pub fn after_write(mut self, hook: impl Fn(&ObjectRef, &EditOutcome) + 'static) -> Self {
        self.after_write = Some(Rc::new(hook));
        self
    }

    pub fn after_cancel(mut self, hook: impl Fn(&ObjectRef, &EditOutcome) + 'static) -> Self {
        self.after_cancel = Some(Rc::new(hook));
        self
    }
}

/// How a session ended
#[derive(Clone, Debug, PartialEq)]
pub enum EditOutcome {
    Committed {
        row: usize,
        column: usize,
        value: Value,
    },
    Cancelled {
        row: usize,
        column: usize,
    },
    /// No session to act on, or one already acting
    Ignored,
}

/// Counters over the controller's lifetime
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EditStats {
    pub started: usize,
    pub committed: usize,
    pub cancelled: usize,
}

/// Called after a session closes, with the edited record
pub type EditHook = Rc<dyn Fn(&ObjectRef, &EditOutcome)>;

/// Called before a commit writes, with the record and the new value
pub type WriteHook = Rc<dyn Fn(&ObjectRef, &Value)>;

new_key_type! {
    /// Handle for removing a controller hook
    pub struct HookId;
}

enum Hook {
    BeforeWrite(WriteHook),
    Commit(EditHook),
    Cancel(EditHook),
}

/// Decides whether a record is still part of the edited collection
pub type RecordCheck = Rc<dyn Fn(&ObjectRef) -> bool>;

struct EditSession {
    request: EditRequest,
    editor: EditorRef,
    generation: u64,
    editor_subs: SmallVec<[SubscriptionId; 3]>,
    record_sub: SubscriptionId,
    action_taken: bool,
}

/// Coordinates in-place edit sessions
pub struct EditController {
    this: Weak<EditController>,
    registry: EditorRegistry,
    fsm: RefCell<StateMachine>,
    session: RefCell<Option<EditSession>>,
    in_progress: Cell<bool>,
    generation: Cell<u64>,
    hooks: RefCell<SlotMap<HookId, Hook>>,
    follow_up: RefCell<Option<EditHook>>,
    record_check: RefCell<Option<RecordCheck>>,
    stats: Cell<EditStats>,
}

impl EditController {
    pub fn new(registry: EditorRegistry) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            registry,
            fsm: RefCell::new(edit_fsm()),
            session: RefCell::new(None),
            in_progress: Cell::new(false),
            generation: Cell::new(0),
            hooks: RefCell::new(SlotMap::with_key()),
            follow_up: RefCell::new(None),
            record_check: RefCell::new(None),
            stats: Cell::new(EditStats::default()),
        })
    }

    pub fn registry(&self) -> &EditorRegistry {
        &self.registry
    }

    pub fn state(&self) -> EditState {
        EditState::from_id(self.fsm.borrow().current())
    }

    pub fn is_editing(&self) -> bool {
        self.state() == EditState::Editing
    }

    /// `(row, column)` of the open session
    pub fn active_cell(&self) -> Option<(usize, usize)> {
        self.session
            .borrow()
            .as_ref()
            .map(|s| (s.request.row, s.request.column))
    }

    pub fn active_record(&self) -> Option<ObjectRef> {
        self.session.borrow().as_ref().map(|s| s.request.record.clone())
    }

    pub fn editor(&self) -> Option<EditorRef> {
        self.session.borrow().as_ref().map(|s| s.editor.clone())
    }

    pub fn stats(&self) -> EditStats {
        self.stats.get()
    }

    /// Run `hook` after every successful commit
    pub fn on_commit(&self, hook: impl Fn(&ObjectRef, &EditOutcome) + 'static) -> HookId {
        self.hooks.borrow_mut().insert(Hook::Commit(Rc::new(hook)))
    }

    /// Run `hook` after every cancelled session
    pub fn on_cancel(&self, hook: impl Fn(&ObjectRef, &EditOutcome) + 'static) -> HookId {
        self.hooks.borrow_mut().insert(Hook::Cancel(Rc::new(hook)))
    }

    /// Run `hook` before every commit writes its value
    pub fn on_before_write(&self, hook: impl Fn(&ObjectRef, &Value) + 'static) -> HookId {
        self.hooks.borrow_mut().insert(Hook::BeforeWrite(Rc::new(hook)))
    }

    pub fn remove_hook(&self, id: HookId) -> bool {
        self.hooks.borrow_mut().remove(id).is_some()
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.borrow().len()
    }

    /// Owner step run after a write and before any commit hook
    pub(crate) fn set_commit_follow_up(&self, hook: impl Fn(&ObjectRef, &EditOutcome) + 'static) {
        *self.follow_up.borrow_mut() = Some(Rc::new(hook));
    }

    /// Records failing the check are treated as removed and cannot be committed
    pub fn set_record_check(&self, check: impl Fn(&ObjectRef) -> bool + 'static) {
        *self.record_check.borrow_mut() = Some(Rc::new(check));
    }

    /// Open an editor over `request.property` of `request.record`
    ///
    /// An open session is cancelled first.
    pub fn start_edit(&self, request: EditRequest) -> Result<()> {
        if self.in_progress.get() {
            return Err(WidgetError::EditInProgress);
        }
        if request.record.is_disposed() {
            return Err(WidgetError::RecordDisposed);
        }
        if self.session.borrow().is_some() {
            self.cancel();
        }

        let current = request.property.read(&request.record)?;
        let args = EditorArgs {
            kind: request.kind,
            value: request.kind.to_editor_value(&current),
            items: request.items.clone(),
            row: request.row,
            column: request.column,
            property: request.property.to_string(),
        };
        let editor = self.registry.create(&args)?;

        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let editor_subs = request
            .kind
            .trigger_events()
            .into_iter()
            .map(|kind| {
                let this = self.this.clone();
                editor.on(kind, move |event| {
                    if let Some(controller) = this.upgrade() {
                        controller.editor_event(generation, event);
                    }
                })
            })
            .collect();

        let this = self.this.clone();
        let record_sub = request.record.on(EventKind::Disposed, move |_| {
            if let Some(controller) = this.upgrade() {
                controller.record_disposed(generation);
            }
        });

        tracing::debug!(
            "edit {}.{} at ({}, {}) with {} editor",
            request.record.type_name(),
            request.property,
            request.row,
            request.column,
            request.kind
        );

        *self.session.borrow_mut() = Some(EditSession {
            request,
            editor: editor.clone(),
            generation,
            editor_subs,
            record_sub,
            action_taken: false,
        });
        self.transition(events::START);
        self.bump(|s| s.started += 1);

        editor.set_focus();
        Ok(())
    }

    /// Write the editor's value back to the record and close the session
    ///
    /// Falls back to a cancel when the value is unchanged, the record is gone,
    /// or the write fails.
    pub fn commit(&self) -> EditOutcome {
        let Some((request, editor)) = self.begin_action() else {
            return EditOutcome::Ignored;
        };
        self.transition(events::COMMIT);

        let Some(value) = self.value_to_commit(&request, &editor) else {
            return self.finish_cancel(request);
        };

        if let Some(hook) = &request.hooks.before_write {
            hook(&request.record, &value);
        }
        for hook in self.write_hooks() {
            hook(&request.record, &value);
        }

        match request.property.write(&request.record, value.clone()) {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!("edit of {} dropped: path unresolved", request.property);
                return self.finish_cancel(request);
            }
            Err(err) => {
                tracing::warn!("edit of {} dropped: {}", request.property, err);
                return self.finish_cancel(request);
            }
        }

        self.close_session();
        self.transition(events::DONE);
        self.in_progress.set(false);
        self.bump(|s| s.committed += 1);

        let outcome = EditOutcome::Committed {
            row: request.row,
            column: request.column,
            value,
        };
        tracing::debug!("edit committed: {:?}", outcome);
        let follow_up = self.follow_up.borrow().clone();
        if let Some(follow_up) = follow_up {
            follow_up(&request.record, &outcome);
        }
        if let Some(hook) = &request.hooks.after_write {
            hook(&request.record, &outcome);
        }
        for hook in self.outcome_hooks(true) {
            hook(&request.record, &outcome);
        }
        outcome
    }

    /// Close the session without writing; repeated calls are ignored
    pub fn cancel(&self) -> EditOutcome {
        let Some((request, _editor)) = self.begin_action() else {
            return EditOutcome::Ignored;
        };
        self.finish_cancel(request)
    }

    /// Claim the session for a commit or cancel
    fn begin_action(&self) -> Option<(EditRequest, EditorRef)> {
        if self.in_progress.get() {
            tracing::trace!("edit action ignored: another is running");
            return None;
        }
        let mut session = self.session.borrow_mut();
        let session = session.as_mut()?;
        if session.action_taken {
            return None;
        }
        session.action_taken = true;
        self.in_progress.set(true);
        Some((session.request.clone(), session.editor.clone()))
    }

    /// The model value to write, or `None` when the session should cancel
    fn value_to_commit(&self, request: &EditRequest, editor: &EditorRef) -> Option<Value> {
        if !self.record_alive(&request.record) {
            tracing::debug!("edit record is gone, cancelling");
            return None;
        }
        let current = match request.property.read(&request.record) {
            Ok(current) => current,
            Err(err) => {
                tracing::warn!("edit of {} dropped: {}", request.property, err);
                return None;
            }
        };
        let value = request.kind.to_model_value(&editor.value(), &current);
        if value == current {
            tracing::trace!("edit of {} unchanged", request.property);
            return None;
        }
        Some(value)
    }

    fn finish_cancel(&self, request: EditRequest) -> EditOutcome {
        self.transition(events::CANCEL);
        self.close_session();
        self.transition(events::DONE);
        self.in_progress.set(false);
        self.bump(|s| s.cancelled += 1);

        let outcome = EditOutcome::Cancelled {
            row: request.row,
            column: request.column,
        };
        tracing::debug!("edit cancelled: {:?}", outcome);
        if let Some(hook) = &request.hooks.after_cancel {
            hook(&request.record, &outcome);
        }
        for hook in self.outcome_hooks(false) {
            hook(&request.record, &outcome);
        }
        outcome
    }

    // Hooks are collected before running so they may add or remove hooks.

    fn write_hooks(&self) -> SmallVec<[WriteHook; 2]> {
        self.hooks
            .borrow()
            .values()
            .filter_map(|hook| match hook {
                Hook::BeforeWrite(hook) => Some(hook.clone()),
                _ => None,
            })
            .collect()
    }

    fn outcome_hooks(&self, committed: bool) -> SmallVec<[EditHook; 2]> {
        self.hooks
            .borrow()
            .values()
            .filter_map(|hook| match (hook, committed) {
                (Hook::Commit(hook), true) | (Hook::Cancel(hook), false) => Some(hook.clone()),
                _ => None,
            })
            .collect()
    }

    /// Detach and dispose the editor
    fn close_session(&self) {
        let Some(session) = self.session.borrow_mut().take() else {
            return;
        };
        session.editor.dispose();
        for id in session.editor_subs {
            session.editor.unsubscribe(id);
        }
        session.request.record.unsubscribe(session.record_sub);
    }

    fn record_alive(&self, record: &ObjectRef) -> bool {
        if record.is_disposed() {
            return false;
        }
        let check = self.record_check.borrow().clone();
        check.map_or(true, |check| check(record))
    }

    fn is_current(&self, generation: u64) -> bool {
        self.session
            .borrow()
            .as_ref()
            .is_some_and(|s| s.generation == generation)
    }

    fn editor_event(&self, generation: u64, event: &Event) {
        if !self.is_current(generation) {
            tracing::trace!("stale editor event {:?} ignored", event.kind);
            return;
        }
        match event.kind {
            EventKind::KeyPressed => match event.key_code {
                Some(key_codes::ENTER | key_codes::KEYPAD_ENTER) => {
                    self.commit();
                }
                Some(key_codes::ESCAPE) => {
                    self.cancel();
                }
                _ => {}
            },
            EventKind::FocusLost | EventKind::Selection => {
                self.commit();
            }
            _ => {}
        }
    }

    fn record_disposed(&self, generation: u64) {
        if self.is_current(generation) {
            self.cancel();
        }
    }

    fn transition(&self, event: u32) {
        let mut fsm = self.fsm.borrow_mut();
        let from = fsm.current();
        match fsm.send(event) {
            Some(t) => tracing::trace!("edit state {} -> {}", from, t.to),
            None => tracing::warn!("edit event {} rejected in state {}", event, from),
        }
    }

    fn bump(&self, update: impl FnOnce(&mut EditStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }
}

impl Drop for EditController {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            for id in session.editor_subs {
                session.editor.unsubscribe(id);
            }
            session.request.record.unsubscribe(session.record_sub);
            session.editor.dispose();
        }
    }
}
