//! Card entity and its scheduling enums.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::error::{RehearseError, RehearseResult};

/// Default SM-2 ease factor for a fresh card.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Lower bound of the SM-2 ease factor.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Longest interval any algorithm schedules, in days.
pub const MAX_INTERVAL_DAYS: f64 = 36_500.0;

/// Leitner boxes are numbered 1 through 5.
pub const MIN_LEITNER_BOX: u8 = 1;
pub const MAX_LEITNER_BOX: u8 = 5;

/// Scheduling algorithm bound to a card.
///
/// Chosen at creation; switching requires an explicit reset.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Algorithm {
    /// SuperMemo 2: ease factor and growing intervals.
    #[default]
    Sm2,
    /// Leitner boxes with a fixed interval per box.
    Leitner,
}

impl Algorithm {
    /// Parse an algorithm name, reporting unknown names as
    /// [`RehearseError::UnsupportedAlgorithm`].
    pub fn parse(name: &str) -> RehearseResult<Self> {
        name.trim()
            .parse()
            .map_err(|_| RehearseError::unsupported_algorithm(name))
    }

    /// Stable string form used in storage and configuration.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Coarse progress label of a card.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LearningState {
    /// Never reviewed.
    #[default]
    New,
    /// Passed at least once but not yet graduated.
    Learning,
    /// Graduated into regular review.
    Review,
    /// Lapsed and being relearned.
    Relearning,
}

impl LearningState {
    /// Parse a learning state name.
    pub fn parse(name: &str) -> RehearseResult<Self> {
        name.trim()
            .parse()
            .map_err(|_| RehearseError::validation(format!("Unknown learning state: {}", name)))
    }

    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// A learnable item and its scheduling state.
///
/// The engine only reads and mutates the scheduling fields; content lives
/// with whoever owns the card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Opaque identifier.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Scheduling algorithm.
    pub algorithm: Algorithm,
    /// Current learning state.
    pub learning_state: LearningState,
    /// Days until the next review.
    pub interval: f64,
    /// Consecutive passes since the last lapse.
    pub repetitions: u32,
    /// SM-2 ease factor, never below [`MIN_EASE_FACTOR`].
    pub ease_factor: f64,
    /// Leitner box in `1..=5`.
    pub leitner_box: u8,
    /// Forgetting-curve decay modulator.
    pub memory_strength: f64,
    /// When the card is next due.
    pub next_review: DateTime<Utc>,
    /// Last review time, `None` only for new cards.
    pub last_reviewed: Option<DateTime<Utc>>,
    /// Total reviews.
    pub total_reviews: u32,
    /// Passing reviews.
    pub correct_reviews: u32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Optimistic-concurrency token, bumped by the repository on each write.
    #[serde(default)]
    pub version: u64,
}

impl Card {
    /// Create a new, immediately due card.
    pub fn new(user_id: impl Into<String>, algorithm: Algorithm, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            algorithm,
            learning_state: LearningState::New,
            interval: 0.0,
            repetitions: 0,
            ease_factor: DEFAULT_EASE_FACTOR,
            leitner_box: MIN_LEITNER_BOX,
            memory_strength: 1.0,
            next_review: now,
            last_reviewed: None,
            total_reviews: 0,
            correct_reviews: 0,
            created_at: now,
            version: 0,
        }
    }

    /// Set a specific ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the next review time.
    pub fn with_next_review(mut self, next_review: DateTime<Utc>) -> Self {
        self.next_review = next_review;
        self
    }

    /// Set the initial ease factor (clamped to the SM-2 floor).
    pub fn with_ease_factor(mut self, ease_factor: f64) -> Self {
        self.ease_factor = ease_factor.max(MIN_EASE_FACTOR);
        self
    }

    /// Set the initial memory strength.
    pub fn with_memory_strength(mut self, memory_strength: f64) -> Self {
        self.memory_strength = memory_strength;
        self
    }

    /// Whether the card is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review <= now
    }

    /// Whether the card has never been reviewed.
    pub fn is_new(&self) -> bool {
        self.last_reviewed.is_none()
    }

    /// Share of passing reviews in `[0, 1]`; 0 when never reviewed.
    pub fn accuracy_rate(&self) -> f64 {
        if self.total_reviews == 0 {
            0.0
        } else {
            self.correct_reviews as f64 / self.total_reviews as f64
        }
    }

    /// Fractional days the card is past due; 0 when not yet due.
    pub fn days_overdue(&self, now: DateTime<Utc>) -> f64 {
        let overdue = now.signed_duration_since(self.next_review);
        if overdue <= Duration::zero() {
            0.0
        } else {
            overdue.num_seconds() as f64 / 86_400.0
        }
    }

    /// Check the invariants a stored card must hold.
    ///
    /// Fails with a `Validation` error naming the first offending field.
    pub fn validate(&self) -> RehearseResult<()> {
        if self.id.trim().is_empty() {
            return Err(RehearseError::missing_field("id"));
        }
        if self.user_id.trim().is_empty() {
            return Err(RehearseError::missing_field("user_id"));
        }
        if self.ease_factor.is_nan() || self.ease_factor < MIN_EASE_FACTOR {
            return Err(RehearseError::invalid_card(
                &self.id,
                "ease_factor",
                format!("must be at least {}", MIN_EASE_FACTOR),
            ));
        }
        if !(MIN_LEITNER_BOX..=MAX_LEITNER_BOX).contains(&self.leitner_box) {
            return Err(RehearseError::invalid_card(
                &self.id,
                "leitner_box",
                format!("must be between {} and {}", MIN_LEITNER_BOX, MAX_LEITNER_BOX),
            ));
        }
        if !(0.0..=MAX_INTERVAL_DAYS).contains(&self.interval) {
            return Err(RehearseError::invalid_card(
                &self.id,
                "interval",
                format!("must be between 0 and {} days", MAX_INTERVAL_DAYS),
            ));
        }
        if !self.memory_strength.is_finite() || self.memory_strength <= 0.0 {
            return Err(RehearseError::invalid_card(&self.id, "memory_strength", "must be positive"));
        }
        if self.correct_reviews > self.total_reviews {
            return Err(RehearseError::invalid_card(
                &self.id,
                "correct_reviews",
                "must not exceed total_reviews",
            ));
        }
        match (self.learning_state, self.last_reviewed) {
            (LearningState::New, Some(_)) => Err(RehearseError::invalid_card(
                &self.id,
                "last_reviewed",
                "must be empty for a new card",
            )),
            (state, None) if state != LearningState::New => Err(RehearseError::invalid_card(
                &self.id,
                "last_reviewed",
                format!("is required for a {} card", state),
            )),
            _ => Ok(()),
        }
    }

    /// Reset scheduling state and bind the card to a different algorithm.
    ///
    /// History counters are kept; the card becomes new and immediately due.
    pub fn reset_to(&mut self, algorithm: Algorithm, now: DateTime<Utc>) {
        self.algorithm = algorithm;
        self.learning_state = LearningState::New;
        self.interval = 0.0;
        self.repetitions = 0;
        self.ease_factor = DEFAULT_EASE_FACTOR;
        self.leitner_box = MIN_LEITNER_BOX;
        self.memory_strength = 1.0;
        self.next_review = now;
        self.last_reviewed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_card_defaults() {
        let now = Utc::now();
        let card = Card::new("alice", Algorithm::Sm2, now);

        assert_eq!(card.learning_state, LearningState::New);
        assert_eq!(card.repetitions, 0);
        assert_eq!(card.ease_factor, DEFAULT_EASE_FACTOR);
        assert_eq!(card.leitner_box, MIN_LEITNER_BOX);
        assert_eq!(card.next_review, now);
        assert!(card.last_reviewed.is_none());
        assert!(card.is_due(now));
        assert_eq!(card.version, 0);
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!(Algorithm::parse("sm2").unwrap(), Algorithm::Sm2);
        assert_eq!(Algorithm::parse("LEITNER").unwrap(), Algorithm::Leitner);
        assert_eq!(Algorithm::Leitner.as_str(), "leitner");

        let err = Algorithm::parse("fsrs").unwrap_err();
        assert!(matches!(err, RehearseError::UnsupportedAlgorithm { ref algorithm } if algorithm == "fsrs"));
    }

    #[test]
    fn test_learning_state_round_trip_strings() {
        assert_eq!(LearningState::Relearning.to_string(), "relearning");
        assert_eq!(LearningState::parse("review").unwrap(), LearningState::Review);
        assert!(LearningState::parse("graduated").is_err());
    }

    #[test]
    fn test_days_overdue() {
        let now = Utc::now();
        let card = Card::new("alice", Algorithm::Sm2, now).with_next_review(now - Duration::days(3));
        assert!((card.days_overdue(now) - 3.0).abs() < 1e-9);

        let future = card.with_next_review(now + Duration::days(1));
        assert_eq!(future.days_overdue(now), 0.0);
    }

    #[test]
    fn test_reset_to_switches_algorithm() {
        let now = Utc::now();
        let mut card = Card::new("alice", Algorithm::Sm2, now);
        card.repetitions = 4;
        card.interval = 20.0;
        card.learning_state = LearningState::Review;
        card.total_reviews = 6;
        card.correct_reviews = 5;

        card.reset_to(Algorithm::Leitner, now);

        assert_eq!(card.algorithm, Algorithm::Leitner);
        assert_eq!(card.learning_state, LearningState::New);
        assert_eq!(card.repetitions, 0);
        assert_eq!(card.total_reviews, 6);
        assert_eq!(card.correct_reviews, 5);
    }

    fn field_of(err: RehearseError) -> String {
        match err {
            RehearseError::Validation { details, .. } => details.get("field").cloned().unwrap_or_default(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_accepts_fresh_and_reviewed_cards() {
        let now = Utc::now();
        let card = Card::new("alice", Algorithm::Sm2, now);
        assert!(card.validate().is_ok());

        let mut reviewed = card.clone();
        reviewed.learning_state = LearningState::Review;
        reviewed.last_reviewed = Some(now);
        reviewed.interval = 6.0;
        reviewed.total_reviews = 2;
        reviewed.correct_reviews = 2;
        assert!(reviewed.validate().is_ok());
    }

    #[test]
    fn test_validate_names_offending_field() {
        let now = Utc::now();
        let base = Card::new("alice", Algorithm::Leitner, now).with_id("c1");

        let mut c = base.clone();
        c.ease_factor = 1.1;
        assert_eq!(field_of(c.validate().unwrap_err()), "ease_factor");

        let mut c = base.clone();
        c.leitner_box = 6;
        assert_eq!(field_of(c.validate().unwrap_err()), "leitner_box");

        let mut c = base.clone();
        c.interval = -1.0;
        assert_eq!(field_of(c.validate().unwrap_err()), "interval");

        let mut c = base.clone();
        c.memory_strength = 0.0;
        assert_eq!(field_of(c.validate().unwrap_err()), "memory_strength");

        let mut c = base.clone();
        c.total_reviews = 2;
        c.correct_reviews = 3;
        assert_eq!(field_of(c.validate().unwrap_err()), "correct_reviews");

        let mut c = base.clone();
        c.last_reviewed = Some(now);
        assert_eq!(field_of(c.validate().unwrap_err()), "last_reviewed");

        let mut c = base.clone();
        c.learning_state = LearningState::Relearning;
        assert_eq!(field_of(c.validate().unwrap_err()), "last_reviewed");

        let c = Card::new(" ", Algorithm::Sm2, now);
        let err = c.validate().unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::ValMissingField);
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let card = Card::new("alice", Algorithm::Leitner, Utc::now());
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["algorithm"], "leitner");
        assert_eq!(json["learning_state"], "new");
    }
}
