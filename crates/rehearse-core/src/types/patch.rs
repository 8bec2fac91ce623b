//! Typed partial update of a card's scheduling fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::card::{Card, LearningState};

/// The scheduling fields a review changed.
///
/// Only `Some` fields are written. `expected_version` is the version of the
/// snapshot the patch was computed from; repositories reject the patch with
/// `StaleCard` when the stored version differs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardPatch {
    pub expected_version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_state: Option<LearningState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetitions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ease_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leitner_box: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_strength: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_review: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_reviews: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_reviews: Option<u32>,
}

impl CardPatch {
    /// Empty patch against a given version.
    pub fn against(expected_version: u64) -> Self {
        Self {
            expected_version,
            ..Default::default()
        }
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.learning_state.is_none()
            && self.interval.is_none()
            && self.repetitions.is_none()
            && self.ease_factor.is_none()
            && self.leitner_box.is_none()
            && self.memory_strength.is_none()
            && self.next_review.is_none()
            && self.last_reviewed.is_none()
            && self.total_reviews.is_none()
            && self.correct_reviews.is_none()
    }

    /// Names of the fields the patch writes, in storage column order.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.learning_state.is_some() {
            fields.push("learning_state");
        }
        if self.interval.is_some() {
            fields.push("interval");
        }
        if self.repetitions.is_some() {
            fields.push("repetitions");
        }
        if self.ease_factor.is_some() {
            fields.push("ease_factor");
        }
        if self.leitner_box.is_some() {
            fields.push("leitner_box");
        }
        if self.memory_strength.is_some() {
            fields.push("memory_strength");
        }
        if self.next_review.is_some() {
            fields.push("next_review");
        }
        if self.last_reviewed.is_some() {
            fields.push("last_reviewed");
        }
        if self.total_reviews.is_some() {
            fields.push("total_reviews");
        }
        if self.correct_reviews.is_some() {
            fields.push("correct_reviews");
        }
        fields
    }

    /// Write the `Some` fields onto a card. The version is left to the
    /// repository.
    pub fn apply(&self, card: &mut Card) {
        if let Some(state) = self.learning_state {
            card.learning_state = state;
        }
        if let Some(interval) = self.interval {
            card.interval = interval;
        }
        if let Some(repetitions) = self.repetitions {
            card.repetitions = repetitions;
        }
        if let Some(ease_factor) = self.ease_factor {
            card.ease_factor = ease_factor;
        }
        if let Some(leitner_box) = self.leitner_box {
            card.leitner_box = leitner_box;
        }
        if let Some(strength) = self.memory_strength {
            card.memory_strength = strength;
        }
        if let Some(next_review) = self.next_review {
            card.next_review = next_review;
        }
        if let Some(last_reviewed) = self.last_reviewed {
            card.last_reviewed = Some(last_reviewed);
        }
        if let Some(total) = self.total_reviews {
            card.total_reviews = total;
        }
        if let Some(correct) = self.correct_reviews {
            card.correct_reviews = correct;
        }
    }

    /// Apply to a copy of `card`.
    pub fn applied_to(&self, card: &Card) -> Card {
        let mut updated = card.clone();
        self.apply(&mut updated);
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Algorithm;

    #[test]
    fn test_apply_only_touches_some_fields() {
        let now = Utc::now();
        let card = Card::new("u", Algorithm::Sm2, now);

        let mut patch = CardPatch::against(card.version);
        patch.repetitions = Some(2);
        patch.interval = Some(6.0);

        let updated = patch.applied_to(&card);
        assert_eq!(updated.repetitions, 2);
        assert_eq!(updated.interval, 6.0);
        assert_eq!(updated.ease_factor, card.ease_factor);
        assert_eq!(updated.next_review, card.next_review);
        assert_eq!(patch.changed_fields(), vec!["interval", "repetitions"]);
    }

    #[test]
    fn test_empty_patch() {
        let patch = CardPatch::against(3);
        assert!(patch.is_empty());
        assert!(patch.changed_fields().is_empty());
    }
}
