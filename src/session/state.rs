//! Session state machine
//!
//! Tracks a conferencing session from `join` to teardown.

use std::fmt;
use std::time::Instant;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing requested yet
    Idle,
    /// Join requested; waiting for the local stream and the router
    Joining,
    /// Loading router capabilities
    NegotiatingCapabilities,
    /// Creating the send and recv transports
    CreatingTransports,
    /// Both transports exist; remote producers are consumed on arrival
    Ready,
    /// Left, torn down or failed
    Terminated,
}

impl SessionPhase {
    /// Whether `next` may follow this phase
    pub fn can_transition(self, next: SessionPhase) -> bool {
        use SessionPhase::*;

        match (self, next) {
            (Terminated, _) => false,
            (_, Terminated) => true,
            (Idle, Joining)
            | (Joining, NegotiatingCapabilities)
            | (NegotiatingCapabilities, CreatingTransports)
            | (CreatingTransports, Ready) => true,
            _ => false,
        }
    }

    /// Joined and not yet terminated
    pub fn is_active(self) -> bool {
        !matches!(self, SessionPhase::Idle | SessionPhase::Terminated)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Joining => "joining",
            SessionPhase::NegotiatingCapabilities => "negotiating-capabilities",
            SessionPhase::CreatingTransports => "creating-transports",
            SessionPhase::Ready => "ready",
            SessionPhase::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Phase plus timing
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Current phase
    pub phase: SessionPhase,

    /// Time `join` was called
    pub joined_at: Option<Instant>,

    /// Time the session became ready
    pub ready_at: Option<Instant>,

    /// Whether `join-room` has been sent
    pub join_sent: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            joined_at: None,
            ready_at: None,
            join_sent: false,
        }
    }

    /// Move to `next`
    ///
    /// Returns false and leaves the phase unchanged when the move is not
    /// allowed.
    pub fn transition(&mut self, next: SessionPhase) -> bool {
        if !self.phase.can_transition(next) {
            tracing::debug!(from = %self.phase, to = %next, "Ignored phase transition");
            return false;
        }

        tracing::debug!(from = %self.phase, to = %next, "Session phase");
        self.phase = next;
        match next {
            SessionPhase::Joining => self.joined_at = Some(Instant::now()),
            SessionPhase::Ready => self.ready_at = Some(Instant::now()),
            _ => {}
        }
        true
    }

    pub fn is_ready(&self) -> bool {
        self.phase == SessionPhase::Ready
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == SessionPhase::Terminated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut state = SessionState::new();

        assert!(state.transition(SessionPhase::Joining));
        assert!(state.transition(SessionPhase::NegotiatingCapabilities));
        assert!(state.transition(SessionPhase::CreatingTransports));
        assert!(state.transition(SessionPhase::Ready));
        assert!(state.is_ready());
        assert!(state.joined_at.is_some());
        assert!(state.ready_at.is_some());
    }

    #[test]
    fn test_no_skipping_phases() {
        let mut state = SessionState::new();

        assert!(!state.transition(SessionPhase::Ready));
        assert_eq!(state.phase, SessionPhase::Idle);
    }

    #[test]
    fn test_terminated_is_final() {
        let mut state = SessionState::new();
        state.transition(SessionPhase::Joining);

        assert!(state.transition(SessionPhase::Terminated));
        assert!(!state.transition(SessionPhase::Joining));
        assert!(!state.transition(SessionPhase::Terminated));
        assert!(!state.phase.is_active());
    }
}
