//! Finite state machines for widget interaction states
//!
//! Interaction lifecycles (cell editing, shape dragging) are modelled as flat
//! state machines with numeric state and event ids, declared with a builder:
//!
//! ```rust
//! use glint_core::fsm::StateMachine;
//!
//! const IDLE: u32 = 0;
//! const ACTIVE: u32 = 1;
//! const TOGGLE: u32 = 1;
//!
//! let mut fsm = StateMachine::builder(IDLE)
//!     .on(IDLE, TOGGLE, ACTIVE)
//!     .on(ACTIVE, TOGGLE, IDLE)
//!     .build();
//!
//! assert!(fsm.send(TOGGLE).is_some());
//! assert_eq!(fsm.current(), ACTIVE);
//! ```
//!
//! Events without a transition from the current state are rejected and leave
//! the machine where it is.

use smallvec::SmallVec;

/// State identifier
pub type StateId = u32;

/// Event identifier
pub type EventId = u32;

/// A single `from --event--> to` edge
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: StateId,
    pub event: EventId,
    pub to: StateId,
}

/// A flat state machine
#[derive(Clone, Debug)]
pub struct StateMachine {
    initial: StateId,
    current: StateId,
    transitions: SmallVec<[Transition; 8]>,
}

impl StateMachine {
    pub fn builder(initial: StateId) -> StateMachineBuilder {
        StateMachineBuilder {
            initial,
            transitions: SmallVec::new(),
        }
    }

    pub fn current(&self) -> StateId {
        self.current
    }

    pub fn is_in(&self, state: StateId) -> bool {
        self.current == state
    }

    /// The transition `event` would take from the current state
    pub fn transition_for(&self, event: EventId) -> Option<Transition> {
        self.transitions
            .iter()
            .find(|t| t.from == self.current && t.event == event)
            .copied()
    }

    pub fn can_send(&self, event: EventId) -> bool {
        self.transition_for(event).is_some()
    }

    /// Deliver an event; returns the transition taken, if any
    pub fn send(&mut self, event: EventId) -> Option<Transition> {
        let transition = self.transition_for(event)?;
        self.current = transition.to;
        Some(transition)
    }

    /// Return to the initial state
    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }
}

/// Builder for [`StateMachine`]
pub struct StateMachineBuilder {
    initial: StateId,
    transitions: SmallVec<[Transition; 8]>,
}

impl StateMachineBuilder {
    /// Add a transition; a later edge for the same `(from, event)` replaces it
    pub fn on(mut self, from: StateId, event: EventId, to: StateId) -> Self {
        self.transitions
            .retain(|t| !(t.from == from && t.event == event));
        self.transitions.push(Transition { from, event, to });
        self
    }

    /// Add the same transition from each of `froms`
    pub fn on_each(mut self, froms: &[StateId], event: EventId, to: StateId) -> Self {
        for &from in froms {
            self = self.on(from, event, to);
        }
        self
    }

    pub fn build(self) -> StateMachine {
        StateMachine {
            initial: self.initial,
            current: self.initial,
            transitions: self.transitions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: StateId = 0;
    const PRESSED: StateId = 1;
    const DRAGGING: StateId = 2;

    const DOWN: EventId = 10;
    const MOVE: EventId = 11;
    const UP: EventId = 12;

    fn drag_fsm() -> StateMachine {
        StateMachine::builder(IDLE)
            .on(IDLE, DOWN, PRESSED)
            .on(PRESSED, MOVE, DRAGGING)
            .on(DRAGGING, MOVE, DRAGGING)
            .on_each(&[PRESSED, DRAGGING], UP, IDLE)
            .build()
    }

    #[test]
    fn test_transitions() {
        let mut fsm = drag_fsm();
        assert_eq!(fsm.current(), IDLE);

        assert_eq!(
            fsm.send(DOWN),
            Some(Transition {
                from: IDLE,
                event: DOWN,
                to: PRESSED
            })
        );
        fsm.send(MOVE);
        fsm.send(MOVE);
        assert!(fsm.is_in(DRAGGING));
        fsm.send(UP);
        assert!(fsm.is_in(IDLE));
    }

    #[test]
    fn test_rejected_event_keeps_state() {
        let mut fsm = drag_fsm();
        assert!(!fsm.can_send(MOVE));
        assert_eq!(fsm.send(MOVE), None);
        assert_eq!(fsm.current(), IDLE);
    }

    #[test]
    fn test_later_edge_replaces_earlier() {
        let fsm = StateMachine::builder(IDLE)
            .on(IDLE, DOWN, PRESSED)
            .on(IDLE, DOWN, DRAGGING)
            .build();
        assert_eq!(fsm.transitions().len(), 1);
        assert_eq!(fsm.transition_for(DOWN).map(|t| t.to), Some(DRAGGING));
    }

    #[test]
    fn test_reset() {
        let mut fsm = drag_fsm();
        fsm.send(DOWN);
        fsm.reset();
        assert_eq!(fsm.current(), IDLE);
    }
}
