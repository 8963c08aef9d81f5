//! Pose selection as an explicit state machine.
//!
//! Pose changes update the visible index optimistically: a request for an
//! unresolved pose shows the target slot at once and either confirms it when
//! the image arrives or snaps back to the previous index when generation
//! fails. [`reduce`] is pure so the protocol can be tested without any I/O.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum PoseState {
    /// Nothing has happened since the last reset.
    Idle { index: usize },
    /// Waiting for `target`; `previous` is restored on failure.
    Pending { target: usize, previous: usize },
    Committed { index: usize },
    RolledBack { index: usize, attempted: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseEvent {
    /// The user asked for `target`; `cached` if its image already exists.
    Requested { target: usize, cached: bool },
    Resolved,
    Failed,
    Reset,
}

impl Default for PoseState {
    fn default() -> Self {
        PoseState::Idle { index: 0 }
    }
}

impl PoseState {
    /// The pose index the user sees.
    pub fn visible_index(&self) -> usize {
        match *self {
            PoseState::Idle { index }
            | PoseState::Committed { index }
            | PoseState::RolledBack { index, .. } => index,
            PoseState::Pending { target, .. } => target,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, PoseState::Pending { .. })
    }

    /// The slot showing a loading affordance, if any.
    pub fn pending_target(&self) -> Option<usize> {
        match *self {
            PoseState::Pending { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// Next state for `event`. Events that make no sense in `state` leave it alone.
pub fn reduce(state: PoseState, event: PoseEvent) -> PoseState {
    match (state, event) {
        (_, PoseEvent::Reset) => PoseState::default(),

        (PoseState::Pending { .. }, PoseEvent::Requested { .. }) => state,
        (_, PoseEvent::Requested { target, .. }) if target == state.visible_index() => state,
        (_, PoseEvent::Requested { target, cached: true }) => PoseState::Committed { index: target },
        (_, PoseEvent::Requested {
            target,
            cached: false,
        }) => PoseState::Pending {
            target,
            previous: state.visible_index(),
        },

        (PoseState::Pending { target, .. }, PoseEvent::Resolved) => {
            PoseState::Committed { index: target }
        }
        (PoseState::Pending { target, previous }, PoseEvent::Failed) => PoseState::RolledBack {
            index: previous,
            attempted: target,
        },
        (_, PoseEvent::Resolved | PoseEvent::Failed) => state,
    }
}
