//! Handshake state machine using rust-fsm.
//!
//! Every sign-in attempt moves through an explicit finite state machine;
//! the controller never derives its phase from storage checks or timer
//! bookkeeping.
//!
//! ## State Diagram
//!
//! ```text
//! ┌────────────┐
//! │    Idle    │ (initial)
//! └─────┬──────┘
//!       │ Begin
//!       ▼
//! ┌────────────┐  LaunchFailed
//! │  Launched  │ ──────────────► Idle
//! └─────┬──────┘ ─── Cancel ───► Cancelled
//!       │ Opened
//!       ▼
//! ┌──────────────────┐  Begin (replace pending attempt)
//! │ AwaitingCallback │ ───────────────────────────────► Launched
//! └─────┬────────────┘
//!       │ CallbackAccepted / CallbackRejected / Cancel / Deadline
//!       ▼
//! ┌───────────────────────────────────────────────┐
//! │ Completed / Rejected / Cancelled / TimedOut   │
//! └─────┬─────────────────────────────────────────┘
//!       │ Reset
//!       ▼
//!      Idle
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

// Define the FSM using rust-fsm's declarative macro
// This generates a module `handshake_machine` with:
// - handshake_machine::State (enum)
// - handshake_machine::Input (enum)
// - handshake_machine::StateMachine (type alias)
// - handshake_machine::Impl (trait impl)
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub handshake_machine(Idle)

    Idle => {
        Begin => Launched
    },
    Launched => {
        // Browser (or in-app tab) is open, waiting on the deep link
        Opened => AwaitingCallback,
        // The user agent could not be opened at all
        LaunchFailed => Idle,
        // The user backed out before the page finished opening
        Cancel => Cancelled
    },
    AwaitingCallback => {
        // A new begin() replaces the pending attempt in place
        Begin => Launched,
        CallbackAccepted => Completed,
        CallbackRejected => Rejected,
        Cancel => Cancelled,
        Deadline => TimedOut
    },
    Completed => {
        Reset => Idle
    },
    Cancelled => {
        Reset => Idle
    },
    Rejected => {
        Reset => Idle
    },
    TimedOut => {
        Reset => Idle
    }
}

// Re-export the generated types with clearer names
pub use handshake_machine::Input as HandshakeMachineInput;
pub use handshake_machine::State as HandshakeMachineState;
pub use handshake_machine::StateMachine as HandshakeMachine;

/// Handshake phase for status surfaces and UI consumption.
///
/// This is a plain mirror of the FSM state. The terminal states are
/// transient: the controller resets to `Idle` in the same critical
/// section that records the attempt's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HandshakePhase {
    /// No attempt in flight.
    Idle,
    /// Keypair minted, opening the authorization page.
    Launched,
    /// Authorization page is open, waiting for the deep link callback.
    AwaitingCallback,
    /// Callback accepted and credentials stored.
    Completed,
    /// The attempt was cancelled.
    Cancelled,
    /// A callback arrived but its payload was refused.
    Rejected,
    /// No callback arrived before the deadline.
    TimedOut,
}

impl HandshakePhase {
    /// Returns true while an attempt is in flight and can still resolve.
    pub fn is_pending(&self) -> bool {
        matches!(self, HandshakePhase::Launched | HandshakePhase::AwaitingCallback)
    }

    /// Returns true for a resolved attempt that has not yet reset.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HandshakePhase::Completed
                | HandshakePhase::Cancelled
                | HandshakePhase::Rejected
                | HandshakePhase::TimedOut
        )
    }
}

impl From<&HandshakeMachineState> for HandshakePhase {
    fn from(state: &HandshakeMachineState) -> Self {
        match state {
            HandshakeMachineState::Idle => HandshakePhase::Idle,
            HandshakeMachineState::Launched => HandshakePhase::Launched,
            HandshakeMachineState::AwaitingCallback => HandshakePhase::AwaitingCallback,
            HandshakeMachineState::Completed => HandshakePhase::Completed,
            HandshakeMachineState::Cancelled => HandshakePhase::Cancelled,
            HandshakeMachineState::Rejected => HandshakePhase::Rejected,
            HandshakeMachineState::TimedOut => HandshakePhase::TimedOut,
        }
    }
}

/// How the most recent attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HandshakeOutcome {
    /// Credentials were stored and `signed-in` was published.
    Completed,
    /// Cancelled before a callback was accepted.
    Cancelled,
    /// A callback arrived but its payload was refused.
    Rejected,
    /// The deadline passed with no callback.
    TimedOut,
    /// The authorization page could not be opened.
    LaunchFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_idle() {
        let machine = HandshakeMachine::new();
        assert_eq!(*machine.state(), HandshakeMachineState::Idle);
    }

    #[test]
    fn test_successful_handshake_flow() {
        let mut machine = HandshakeMachine::new();

        // Start an attempt
        machine.consume(&HandshakeMachineInput::Begin).unwrap();
        assert_eq!(*machine.state(), HandshakeMachineState::Launched);

        // Browser opened, now waiting on the callback
        machine.consume(&HandshakeMachineInput::Opened).unwrap();
        assert_eq!(*machine.state(), HandshakeMachineState::AwaitingCallback);

        // Callback decrypts and validates
        machine
            .consume(&HandshakeMachineInput::CallbackAccepted)
            .unwrap();
        assert_eq!(*machine.state(), HandshakeMachineState::Completed);

        // Teardown back to idle
        machine.consume(&HandshakeMachineInput::Reset).unwrap();
        assert_eq!(*machine.state(), HandshakeMachineState::Idle);
    }

    #[test]
    fn test_begin_replaces_pending_attempt() {
        let mut machine = HandshakeMachine::new();

        machine.consume(&HandshakeMachineInput::Begin).unwrap();
        machine.consume(&HandshakeMachineInput::Opened).unwrap();
        assert_eq!(*machine.state(), HandshakeMachineState::AwaitingCallback);

        // A second begin() restarts the launch with a fresh attempt
        machine.consume(&HandshakeMachineInput::Begin).unwrap();
        assert_eq!(*machine.state(), HandshakeMachineState::Launched);

        machine.consume(&HandshakeMachineInput::Opened).unwrap();
        assert_eq!(*machine.state(), HandshakeMachineState::AwaitingCallback);
    }

    #[test]
    fn test_rejected_callback_flow() {
        let mut machine = HandshakeMachine::new();

        machine.consume(&HandshakeMachineInput::Begin).unwrap();
        machine.consume(&HandshakeMachineInput::Opened).unwrap();

        machine
            .consume(&HandshakeMachineInput::CallbackRejected)
            .unwrap();
        assert_eq!(*machine.state(), HandshakeMachineState::Rejected);

        machine.consume(&HandshakeMachineInput::Reset).unwrap();
        assert_eq!(*machine.state(), HandshakeMachineState::Idle);
    }

    #[test]
    fn test_cancel_flow() {
        let mut machine = HandshakeMachine::new();

        machine.consume(&HandshakeMachineInput::Begin).unwrap();
        machine.consume(&HandshakeMachineInput::Opened).unwrap();

        machine.consume(&HandshakeMachineInput::Cancel).unwrap();
        assert_eq!(*machine.state(), HandshakeMachineState::Cancelled);

        machine.consume(&HandshakeMachineInput::Reset).unwrap();
        assert_eq!(*machine.state(), HandshakeMachineState::Idle);
    }

    #[test]
    fn test_cancel_before_page_opens() {
        let mut machine = HandshakeMachine::new();

        machine.consume(&HandshakeMachineInput::Begin).unwrap();
        machine.consume(&HandshakeMachineInput::Cancel).unwrap();
        assert_eq!(*machine.state(), HandshakeMachineState::Cancelled);
    }

    #[test]
    fn test_deadline_flow() {
        let mut machine = HandshakeMachine::new();

        machine.consume(&HandshakeMachineInput::Begin).unwrap();
        machine.consume(&HandshakeMachineInput::Opened).unwrap();

        machine.consume(&HandshakeMachineInput::Deadline).unwrap();
        assert_eq!(*machine.state(), HandshakeMachineState::TimedOut);

        machine.consume(&HandshakeMachineInput::Reset).unwrap();
        assert_eq!(*machine.state(), HandshakeMachineState::Idle);
    }

    #[test]
    fn test_launch_failure_returns_to_idle() {
        let mut machine = HandshakeMachine::new();

        machine.consume(&HandshakeMachineInput::Begin).unwrap();
        assert_eq!(*machine.state(), HandshakeMachineState::Launched);

        machine
            .consume(&HandshakeMachineInput::LaunchFailed)
            .unwrap();
        assert_eq!(*machine.state(), HandshakeMachineState::Idle);
    }

    #[test]
    fn test_callback_is_not_accepted_while_idle() {
        let mut machine = HandshakeMachine::new();

        let result = machine.consume(&HandshakeMachineInput::CallbackAccepted);
        assert!(result.is_err());
        assert_eq!(*machine.state(), HandshakeMachineState::Idle);
    }

    #[test]
    fn test_terminal_states_only_accept_reset() {
        let mut machine = HandshakeMachine::new();

        machine.consume(&HandshakeMachineInput::Begin).unwrap();
        machine.consume(&HandshakeMachineInput::Opened).unwrap();
        machine.consume(&HandshakeMachineInput::Deadline).unwrap();
        assert_eq!(*machine.state(), HandshakeMachineState::TimedOut);

        // A late callback must not resurrect a timed-out attempt
        assert!(machine
            .consume(&HandshakeMachineInput::CallbackAccepted)
            .is_err());
        assert!(machine.consume(&HandshakeMachineInput::Begin).is_err());

        machine.consume(&HandshakeMachineInput::Reset).unwrap();
        assert_eq!(*machine.state(), HandshakeMachineState::Idle);
    }

    #[test]
    fn test_phase_mirrors_machine_state() {
        let mut machine = HandshakeMachine::new();
        assert_eq!(HandshakePhase::from(machine.state()), HandshakePhase::Idle);

        machine.consume(&HandshakeMachineInput::Begin).unwrap();
        let phase = HandshakePhase::from(machine.state());
        assert_eq!(phase, HandshakePhase::Launched);
        assert!(phase.is_pending());

        machine.consume(&HandshakeMachineInput::Opened).unwrap();
        machine.consume(&HandshakeMachineInput::Cancel).unwrap();
        let phase = HandshakePhase::from(machine.state());
        assert_eq!(phase, HandshakePhase::Cancelled);
        assert!(phase.is_terminal());
        assert!(!phase.is_pending());
    }

    #[test]
    fn test_phase_wire_names_are_camel_case() {
        let json = serde_json::to_string(&HandshakePhase::AwaitingCallback).unwrap();
        assert_eq!(json, "\"awaitingCallback\"");

        let json = serde_json::to_string(&HandshakeOutcome::TimedOut).unwrap();
        assert_eq!(json, "\"timedOut\"");
    }
}
