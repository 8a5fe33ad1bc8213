//! Lifecycle of a harvest run
use crate::HarvestError;
use std::fmt;

/// Phase of the harvest coordinator
///
/// A run moves `Idle → Running → Draining → Done`. `Draining` is entered
/// once nothing is in flight and no new item will be started (the frontier
/// is empty or the run was cancelled); the accumulated records are then
/// handed to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HarvestPhase {
    /// Created, nothing started
    #[default]
    Idle,

    /// Popping items and running pipelines
    Running,

    /// No new items are started; writing the final record list
    Draining,

    /// Final sink write done
    Done,
}

impl HarvestPhase {
    /// Returns true if `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: HarvestPhase) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running) | (Self::Running, Self::Draining) | (Self::Draining, Self::Done)
        )
    }

    /// Moves to `next`, or fails if the transition is not allowed
    pub fn advance(&mut self, next: HarvestPhase) -> Result<(), HarvestError> {
        if !self.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition { from: *self, to: next });
        }
        tracing::debug!("Harvest phase {} -> {}", self, next);
        *self = next;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for HarvestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
