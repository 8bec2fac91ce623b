//! Read-only projections over a user's cards.
//!
//! Every operation reads the current card collection (and, for analytics,
//! the review log) and computes a report; nothing is written. Reads may lag
//! concurrent reviews. Users without cards get zero-valued reports.

mod analytics;
mod dashboard;
mod planner;
mod upcoming;

pub use analytics::*;
pub use dashboard::*;
pub use planner::*;
pub use upcoming::*;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::scheduler::SpacedRepetitionScheduler;
use crate::types::LearningState;

/// Dashboard, forecasting, analytics and study-plan queries.
pub struct ReviewScheduleManager {
    scheduler: Arc<SpacedRepetitionScheduler>,
}

impl ReviewScheduleManager {
    pub fn new(scheduler: Arc<SpacedRepetitionScheduler>) -> Self {
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &Arc<SpacedRepetitionScheduler> {
        &self.scheduler
    }
}

/// Card counts per learning state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateBreakdown {
    pub new: usize,
    pub learning: usize,
    pub review: usize,
    pub relearning: usize,
}

impl StateBreakdown {
    pub fn add(&mut self, state: LearningState) {
        match state {
            LearningState::New => self.new += 1,
            LearningState::Learning => self.learning += 1,
            LearningState::Review => self.review += 1,
            LearningState::Relearning => self.relearning += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.new + self.learning + self.review + self.relearning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_breakdown() {
        let mut breakdown = StateBreakdown::default();
        breakdown.add(LearningState::New);
        breakdown.add(LearningState::Review);
        breakdown.add(LearningState::Review);

        assert_eq!(breakdown.new, 1);
        assert_eq!(breakdown.review, 2);
        assert_eq!(breakdown.total(), 3);
    }
}
