use editorial_core::types::EntryStatus;
use editorial_core::{EditorialError, EditorialResult};
use serde::{Deserialize, Serialize};

use crate::types::ScheduleEntry;

/// Describes a single valid state transition for a schedule entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: EntryStatus,
    pub to: EntryStatus,
    pub trigger: String,
}

/// Guards the entry lifecycle
/// `planned → validated → scheduled → published → measured`, with `rejected`
/// reachable (and terminal) from the three pre-publication states.
#[derive(Debug, Clone)]
pub struct EntryLifecycle {
    pub state: EntryStatus,
    pub transitions: Vec<StateTransition>,
}

impl EntryLifecycle {
    pub fn new(state: EntryStatus) -> Self {
        let transition = |from, to, trigger: &str| StateTransition {
            from,
            to,
            trigger: trigger.to_string(),
        };
        let transitions = vec![
            transition(EntryStatus::Planned, EntryStatus::Validated, "editor_validated"),
            transition(EntryStatus::Validated, EntryStatus::Scheduled, "handed_to_publisher"),
            transition(EntryStatus::Scheduled, EntryStatus::Published, "published"),
            transition(EntryStatus::Published, EntryStatus::Measured, "metrics_collected"),
            transition(EntryStatus::Planned, EntryStatus::Rejected, "rejected_in_review"),
            transition(EntryStatus::Validated, EntryStatus::Rejected, "rejected_after_validation"),
            transition(EntryStatus::Scheduled, EntryStatus::Rejected, "pulled_before_publication"),
        ];

        Self { state, transitions }
    }

    /// Returns `true` if the given transition is allowed.
    pub fn can_transition(&self, from: EntryStatus, to: EntryStatus) -> bool {
        self.transitions.iter().any(|t| t.from == from && t.to == to)
    }

    /// Moves to `to`, or fails with `InvalidTransition`.
    pub fn transition(&mut self, to: EntryStatus) -> EditorialResult<()> {
        if self.can_transition(self.state, to) {
            self.state = to;
            Ok(())
        } else {
            Err(EditorialError::InvalidTransition {
                from: self.state,
                to,
            })
        }
    }

    pub fn is_terminal(&self) -> bool {
        !self.transitions.iter().any(|t| t.from == self.state)
    }
}

impl Default for EntryLifecycle {
    fn default() -> Self {
        Self::new(EntryStatus::Planned)
    }
}

impl ScheduleEntry {
    /// Advance the entry's status through the lifecycle.
    pub fn advance(&mut self, to: EntryStatus) -> EditorialResult<()> {
        let mut lifecycle = EntryLifecycle::new(self.status);
        lifecycle.transition(to)?;
        self.status = lifecycle.state;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut lifecycle = EntryLifecycle::default();
        for next in [
            EntryStatus::Validated,
            EntryStatus::Scheduled,
            EntryStatus::Published,
            EntryStatus::Measured,
        ] {
            lifecycle.transition(next).unwrap();
        }
        assert_eq!(lifecycle.state, EntryStatus::Measured);
        assert!(lifecycle.is_terminal());
    }

    #[test]
    fn test_rejection_only_before_publication() {
        for from in [EntryStatus::Planned, EntryStatus::Validated, EntryStatus::Scheduled] {
            let mut lifecycle = EntryLifecycle::new(from);
            assert!(lifecycle.transition(EntryStatus::Rejected).is_ok());
            assert!(lifecycle.is_terminal());
        }

        let mut published = EntryLifecycle::new(EntryStatus::Published);
        assert!(matches!(
            published.transition(EntryStatus::Rejected),
            Err(EditorialError::InvalidTransition {
                from: EntryStatus::Published,
                to: EntryStatus::Rejected
            })
        ));
    }

    #[test]
    fn test_no_skipping_steps() {
        let mut lifecycle = EntryLifecycle::default();
        assert!(lifecycle.transition(EntryStatus::Published).is_err());
        assert_eq!(lifecycle.state, EntryStatus::Planned);

        let mut rejected = EntryLifecycle::new(EntryStatus::Rejected);
        assert!(rejected.transition(EntryStatus::Planned).is_err());
    }
}
