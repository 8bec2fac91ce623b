//! Filters for due-card queries.

use serde::{Deserialize, Serialize};

use super::card::{Algorithm, Card, LearningState};

/// Optional narrowing of a card query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFilter {
    /// Only cards bound to this algorithm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<Algorithm>,
    /// Only cards in this learning state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_state: Option<LearningState>,
}

impl CardFilter {
    /// A filter that matches every card.
    pub fn any() -> Self {
        Self::default()
    }

    /// Restrict to an algorithm.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Restrict to a learning state.
    pub fn with_learning_state(mut self, state: LearningState) -> Self {
        self.learning_state = Some(state);
        self
    }

    /// Whether the filter places no restriction.
    pub fn is_empty(&self) -> bool {
        self.algorithm.is_none() && self.learning_state.is_none()
    }

    /// Check a card against the filter.
    pub fn matches(&self, card: &Card) -> bool {
        self.algorithm.map_or(true, |a| card.algorithm == a)
            && self.learning_state.map_or(true, |s| card.learning_state == s)
    }
}
