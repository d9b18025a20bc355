//! Camera resource state machine.
//!
//! # States
//!
//! - `Closed`: no camera held
//! - `Opening`: acquisition in progress
//! - `Idle`: camera open, no preview running
//! - `Previewing`: preview stream running
//!
//! # Valid Transitions
//!
//! - Closed → Opening → Idle ⇄ Previewing
//! - Opening → Closed (acquisition failed)
//! - Idle/Previewing → Closed (release)
//!
//! # Examples
//!
//! ```
//! use scancam_scanner::state::{CoordinatorState, StateMachine};
//!
//! let mut machine = StateMachine::new();
//! machine.transition_to(CoordinatorState::Opening).unwrap();
//! machine.transition_to(CoordinatorState::Idle).unwrap();
//!
//! assert!(machine.transition_to(CoordinatorState::Opening).is_err());
//! assert_eq!(machine.history().len(), 2);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use scancam_core::{Error, Result};

/// Maximum number of state transitions to keep in history.
///
/// A scan session typically walks Closed → Opening → Idle → Previewing → Idle
/// → Closed, so 100 entries cover many foreground/background cycles.
const MAX_HISTORY_SIZE: usize = 100;

/// Lifecycle state of the camera resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    /// No camera held.
    #[default]
    Closed,

    /// Camera acquisition in progress.
    Opening,

    /// Camera open, preview stopped.
    Idle,

    /// Preview stream running.
    Previewing,
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            CoordinatorState::Closed => "Closed",
            CoordinatorState::Opening => "Opening",
            CoordinatorState::Idle => "Idle",
            CoordinatorState::Previewing => "Previewing",
        };
        write!(f, "{}", state_str)
    }
}

impl CoordinatorState {
    /// Check if transition to target state is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use scancam_scanner::state::CoordinatorState;
    ///
    /// assert!(CoordinatorState::Idle.can_transition_to(&CoordinatorState::Previewing));
    /// assert!(!CoordinatorState::Closed.can_transition_to(&CoordinatorState::Previewing));
    /// ```
    pub fn can_transition_to(&self, target: &CoordinatorState) -> bool {
        matches!(
            (self, target),
            (CoordinatorState::Closed, CoordinatorState::Opening)
                | (CoordinatorState::Opening, CoordinatorState::Idle | CoordinatorState::Closed)
                | (CoordinatorState::Idle, CoordinatorState::Previewing | CoordinatorState::Closed)
                | (CoordinatorState::Previewing, CoordinatorState::Idle | CoordinatorState::Closed)
        )
    }

    /// Whether a camera is held in this state.
    pub fn is_open(&self) -> bool {
        matches!(self, CoordinatorState::Idle | CoordinatorState::Previewing)
    }
}

/// A single state transition with timestamp.
///
/// The `timestamp` field is not serialized as `Instant` is process-specific.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: CoordinatorState,
    pub to: CoordinatorState,

    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl StateTransition {
    pub fn new(from: CoordinatorState, to: CoordinatorState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }
}

/// State machine for the camera resource.
///
/// Not synchronized; the coordinator keeps it behind its resource lock.
#[derive(Debug)]
pub struct StateMachine {
    current_state: CoordinatorState,
    history: VecDeque<StateTransition>,
}

impl StateMachine {
    /// Create a new state machine in the `Closed` state.
    pub fn new() -> Self {
        Self {
            current_state: CoordinatorState::Closed,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn current_state(&self) -> &CoordinatorState {
        &self.current_state
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Transition to a new state, validating the transition.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` if the transition is not
    /// allowed from the current state. The machine is left unchanged.
    pub fn transition_to(&mut self, new_state: CoordinatorState) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = StateTransition::new(self.current_state, new_state);
        self.perform_state_change(new_state, transition.clone());
        Ok(transition)
    }

    /// Force the machine to `Closed` from any state.
    ///
    /// Returns `None` when it already was closed.
    pub fn close(&mut self) -> Option<StateTransition> {
        if self.current_state == CoordinatorState::Closed {
            return None;
        }
        let transition = StateTransition::new(self.current_state, CoordinatorState::Closed);
        self.perform_state_change(CoordinatorState::Closed, transition.clone());
        Some(transition)
    }

    fn perform_state_change(&mut self, new_state: CoordinatorState, transition: StateTransition) {
        self.current_state = new_state;

        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
