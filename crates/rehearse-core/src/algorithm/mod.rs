//! Review algorithms.
//!
//! Each algorithm maps a card snapshot and a quality grade to the
//! algorithm-specific part of the next schedule (a [`Transition`]).
//! [`review`] then adds the fields common to every algorithm (counters,
//! memory strength, timestamps) and returns the result as a [`CardPatch`].
//!
//! Everything here is pure: no I/O, no clock reads, no shared state.

mod leitner;
mod sm2;

pub use leitner::Leitner;
pub use sm2::Sm2;

use chrono::{DateTime, Duration, Utc};

use crate::config::MemoryConfig;
use crate::types::{Algorithm, Card, CardPatch, LearningState, Quality, MAX_INTERVAL_DAYS};

/// Algorithm-specific outcome of one review.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub learning_state: LearningState,
    /// Days until the next review.
    pub interval: f64,
    pub repetitions: u32,
    /// New ease factor, when the algorithm changes it.
    pub ease_factor: Option<f64>,
    /// New Leitner box, when the algorithm changes it.
    pub leitner_box: Option<u8>,
}

/// A spaced-repetition strategy.
pub trait ReviewAlgorithm: Send + Sync {
    /// Which [`Algorithm`] this strategy implements.
    fn kind(&self) -> Algorithm;

    /// Compute the algorithm-specific transition for a graded review.
    fn transition(&self, card: &Card, quality: Quality) -> Transition;
}

/// Run a full review through `algorithm` and describe the result as a patch.
///
/// The patch carries `card.version` as its expected version.
pub fn review(
    algorithm: &dyn ReviewAlgorithm,
    memory: &MemoryConfig,
    card: &Card,
    quality: Quality,
    now: DateTime<Utc>,
) -> CardPatch {
    let transition = algorithm.transition(card, quality);

    let mut patch = CardPatch::against(card.version);
    patch.learning_state = Some(transition.learning_state);
    patch.interval = Some(transition.interval);
    patch.repetitions = Some(transition.repetitions);
    patch.ease_factor = transition.ease_factor;
    patch.leitner_box = transition.leitner_box;
    patch.memory_strength = Some(next_memory_strength(memory, card.memory_strength, quality));
    patch.total_reviews = Some(card.total_reviews.saturating_add(1));
    patch.correct_reviews = Some(if quality.is_pass() {
        card.correct_reviews.saturating_add(1)
    } else {
        card.correct_reviews
    });
    patch.last_reviewed = Some(now);
    patch.next_review = Some(add_days(now, transition.interval));

    patch
}

/// Memory strength after a review.
///
/// A pass multiplies by `1 + gain × (q − 2)`; a lapse multiplies by the
/// penalty and floors at `min_strength`.
pub fn next_memory_strength(memory: &MemoryConfig, strength: f64, quality: Quality) -> f64 {
    if quality.is_pass() {
        let q = quality.value() as f64;
        strength * (1.0 + memory.strength_gain * (q - 2.0))
    } else {
        (strength * memory.lapse_penalty).max(memory.min_strength)
    }
}

/// `at + days`, with fractional days resolved to the second.
///
/// `days` is clamped into `0..=MAX_INTERVAL_DAYS`; a sum past chrono's range
/// saturates at the latest representable instant.
pub fn add_days(at: DateTime<Utc>, days: f64) -> DateTime<Utc> {
    let days = if days.is_nan() {
        0.0
    } else {
        days.clamp(0.0, MAX_INTERVAL_DAYS)
    };
    at.checked_add_signed(Duration::seconds((days * 86_400.0).round() as i64))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LeitnerConfig, Sm2Config};

    fn sm2() -> Sm2 {
        Sm2::new(Sm2Config::default())
    }

    #[test]
    fn test_review_updates_common_fields() {
        let now = Utc::now();
        let card = Card::new("u", Algorithm::Sm2, now - Duration::days(1));

        let patch = review(&sm2(), &MemoryConfig::default(), &card, Quality::PERFECT, now);

        assert_eq!(patch.expected_version, card.version);
        assert_eq!(patch.total_reviews, Some(1));
        assert_eq!(patch.correct_reviews, Some(1));
        assert_eq!(patch.last_reviewed, Some(now));
        assert_eq!(patch.next_review, Some(now + Duration::days(1)));
    }

    #[test]
    fn test_lapse_does_not_count_as_correct() {
        let now = Utc::now();
        let mut card = Card::new("u", Algorithm::Leitner, now);
        card.total_reviews = 4;
        card.correct_reviews = 3;

        let leitner = Leitner::new(LeitnerConfig::default());
        let patch = review(&leitner, &MemoryConfig::default(), &card, Quality::BLACKOUT, now);

        assert_eq!(patch.total_reviews, Some(5));
        assert_eq!(patch.correct_reviews, Some(3));
    }

    #[test]
    fn test_memory_strength_pass_strengthens() {
        let memory = MemoryConfig::default();
        assert!((next_memory_strength(&memory, 2.0, Quality::PERFECT) - 2.6).abs() < 1e-9);
        assert!((next_memory_strength(&memory, 2.0, Quality::CORRECT_DIFFICULT) - 2.2).abs() < 1e-9);
    }

    #[test]
    fn test_memory_strength_lapse_halves_with_floor() {
        let memory = MemoryConfig::default();
        assert!((next_memory_strength(&memory, 4.0, Quality::BLACKOUT) - 2.0).abs() < 1e-9);
        assert_eq!(next_memory_strength(&memory, 1.5, Quality::INCORRECT_FAMILIAR), 1.0);
    }

    #[test]
    fn test_add_days_fractional() {
        let now = Utc::now();
        assert_eq!(add_days(now, 0.5), now + Duration::hours(12));
        assert_eq!(add_days(now, 0.0), now);
    }

    #[test]
    fn test_add_days_clamps_out_of_range_input() {
        let now = Utc::now();
        let ceiling = now + Duration::days(MAX_INTERVAL_DAYS as i64);
        assert_eq!(add_days(now, 30_216_170.0), ceiling);
        assert_eq!(add_days(now, f64::INFINITY), ceiling);
        assert_eq!(add_days(now, f64::NAN), now);
        assert_eq!(add_days(now, -3.0), now);
        assert_eq!(add_days(DateTime::<Utc>::MAX_UTC, 1.0), DateTime::<Utc>::MAX_UTC);
    }
}
