/// Entry-point fallback cascade states
///
/// Each domain's entry-point leg walks the configured candidate paths in
/// order. A 404 moves on to the next candidate; success, exhaustion or a
/// transport failure ends the leg.
use crate::SurveyError;
use std::fmt;

/// Current state of a domain's entry-point leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    // ===== Active States =====
    /// Nothing has been requested yet
    Start,

    /// The candidate at this index has been requested
    Pending { candidate: usize },

    // ===== Terminal States =====
    /// A candidate was fetched; its listed pages are being dispatched
    Resolved { candidate: usize },

    /// Every candidate returned 404
    Exhausted,

    /// The leg ended on a transport failure or a non-404 HTTP error
    Aborted,
}

/// Events that drive an [`EntryState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryEvent {
    /// A fetch was issued for the candidate at this index
    Issued(usize),

    /// The pending fetch succeeded
    Fetched,

    /// The pending fetch returned HTTP 404
    NotFound,

    /// The connection was refused (or failed equivalently)
    ConnectionRefused,

    /// Any other HTTP or transport error
    Failed,
}

impl EntryState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Start | Self::Pending { .. })
    }

    /// Returns the candidate index that should be fetched in this state
    pub fn pending_candidate(&self) -> Option<usize> {
        match self {
            Self::Pending { candidate } => Some(*candidate),
            _ => None,
        }
    }

    /// Applies an event
    ///
    /// # Arguments
    ///
    /// * `event` - What happened to the leg
    /// * `candidate_count` - Number of configured candidate paths
    ///
    /// # Returns
    ///
    /// * `Ok(EntryState)` - The next state
    /// * `Err(SurveyError::InvalidTransition)` - The event is not legal here
    pub fn next(self, event: EntryEvent, candidate_count: usize) -> Result<Self, SurveyError> {
        let next = match (self, event) {
            (Self::Start, EntryEvent::Issued(candidate)) if candidate < candidate_count => {
                Self::Pending { candidate }
            }
            (Self::Pending { candidate }, EntryEvent::Fetched) => Self::Resolved { candidate },
            (Self::Pending { candidate }, EntryEvent::NotFound) => {
                if candidate + 1 < candidate_count {
                    Self::Pending {
                        candidate: candidate + 1,
                    }
                } else {
                    Self::Exhausted
                }
            }
            (Self::Pending { .. }, EntryEvent::ConnectionRefused | EntryEvent::Failed) => {
                Self::Aborted
            }
            (state, event) => return Err(SurveyError::InvalidTransition { state, event }),
        };
        Ok(next)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pending { .. } => "pending",
            Self::Resolved { .. } => "resolved",
            Self::Exhausted => "exhausted",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending { candidate } | Self::Resolved { candidate } => {
                write!(f, "{}({})", self.as_str(), candidate)
            }
            _ => write!(f, "{}", self.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!EntryState::Start.is_terminal());
        assert!(!EntryState::Pending { candidate: 0 }.is_terminal());

        assert!(EntryState::Resolved { candidate: 0 }.is_terminal());
        assert!(EntryState::Exhausted.is_terminal());
        assert!(EntryState::Aborted.is_terminal());
    }

    #[test]
    fn test_issue_first_candidate() {
        let state = EntryState::Start.next(EntryEvent::Issued(0), 2).unwrap();
        assert_eq!(state, EntryState::Pending { candidate: 0 });
        assert_eq!(state.pending_candidate(), Some(0));
    }

    #[test]
    fn test_issue_cached_candidate() {
        let state = EntryState::Start.next(EntryEvent::Issued(1), 2).unwrap();
        assert_eq!(state, EntryState::Pending { candidate: 1 });
    }

    #[test]
    fn test_issue_out_of_range_candidate() {
        assert!(EntryState::Start.next(EntryEvent::Issued(2), 2).is_err());
    }

    #[test]
    fn test_not_found_cascades_then_exhausts() {
        let state = EntryState::Pending { candidate: 0 };
        let state = state.next(EntryEvent::NotFound, 2).unwrap();
        assert_eq!(state, EntryState::Pending { candidate: 1 });

        let state = state.next(EntryEvent::NotFound, 2).unwrap();
        assert_eq!(state, EntryState::Exhausted);
    }

    #[test]
    fn test_success_resolves() {
        let state = EntryState::Pending { candidate: 1 }
            .next(EntryEvent::Fetched, 2)
            .unwrap();
        assert_eq!(state, EntryState::Resolved { candidate: 1 });
    }

    #[test]
    fn test_connection_refused_aborts() {
        let state = EntryState::Pending { candidate: 0 }
            .next(EntryEvent::ConnectionRefused, 2)
            .unwrap();
        assert_eq!(state, EntryState::Aborted);

        let state = EntryState::Pending { candidate: 0 }
            .next(EntryEvent::Failed, 2)
            .unwrap();
        assert_eq!(state, EntryState::Aborted);
    }

    #[test]
    fn test_terminal_states_reject_events() {
        for state in [
            EntryState::Resolved { candidate: 0 },
            EntryState::Exhausted,
            EntryState::Aborted,
        ] {
            assert!(matches!(
                state.next(EntryEvent::NotFound, 2),
                Err(SurveyError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn test_start_rejects_results() {
        assert!(EntryState::Start.next(EntryEvent::Fetched, 2).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(EntryState::Pending { candidate: 1 }.to_string(), "pending(1)");
        assert_eq!(EntryState::Exhausted.to_string(), "exhausted");
    }
}
