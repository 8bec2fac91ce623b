//! Leitner box system.
//!
//! A pass moves the card up one box (capped at 5); a lapse sends it back to
//! box 1. The box indexes a fixed interval table.

use super::{ReviewAlgorithm, Transition};
use crate::config::LeitnerConfig;
use crate::types::{Algorithm, Card, LearningState, Quality, MAX_LEITNER_BOX, MIN_LEITNER_BOX};

/// Leitner strategy.
#[derive(Debug, Clone, Default)]
pub struct Leitner {
    config: LeitnerConfig,
}

impl Leitner {
    pub fn new(config: LeitnerConfig) -> Self {
        Self { config }
    }
}

impl ReviewAlgorithm for Leitner {
    fn kind(&self) -> Algorithm {
        Algorithm::Leitner
    }

    fn transition(&self, card: &Card, quality: Quality) -> Transition {
        if quality.is_lapse() {
            return Transition {
                learning_state: LearningState::Relearning,
                interval: self.config.interval_for(MIN_LEITNER_BOX),
                repetitions: 0,
                ease_factor: None,
                leitner_box: Some(MIN_LEITNER_BOX),
            };
        }

        let current = card.leitner_box.clamp(MIN_LEITNER_BOX, MAX_LEITNER_BOX);
        let next_box = (current + 1).min(MAX_LEITNER_BOX);

        Transition {
            learning_state: if next_box >= 2 {
                LearningState::Review
            } else {
                LearningState::Learning
            },
            interval: self.config.interval_for(next_box),
            repetitions: card.repetitions.saturating_add(1),
            ease_factor: None,
            leitner_box: Some(next_box),
        }
    }
}
