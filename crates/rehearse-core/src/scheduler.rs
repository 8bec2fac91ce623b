//! Spaced-repetition scheduler.
//!
//! Ties the review algorithms to the card repository and the clock. Review
//! computation stays pure: [`SpacedRepetitionScheduler::process_review`]
//! returns a [`CardPatch`] and persisting it is the caller's job.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::algorithm::{self, Leitner, ReviewAlgorithm, Sm2};
use crate::config::RehearseConfig;
use crate::error::RehearseResult;
use crate::traits::{CardRepository, Clock};
use crate::types::{Algorithm, Card, CardFilter, CardPatch, Quality};

/// Computes reviews, selects due cards and estimates retention.
pub struct SpacedRepetitionScheduler {
    repository: Arc<dyn CardRepository>,
    clock: Arc<dyn Clock>,
    config: RehearseConfig,
    sm2: Sm2,
    leitner: Leitner,
}

impl SpacedRepetitionScheduler {
    /// Create a scheduler over a repository and clock.
    pub fn new(
        repository: Arc<dyn CardRepository>,
        clock: Arc<dyn Clock>,
        config: RehearseConfig,
    ) -> Self {
        Self {
            repository,
            clock,
            sm2: Sm2::new(config.sm2.clone()),
            leitner: Leitner::new(config.leitner.clone()),
            config,
        }
    }

    pub fn repository(&self) -> &Arc<dyn CardRepository> {
        &self.repository
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn config(&self) -> &RehearseConfig {
        &self.config
    }

    /// Current time according to the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Strategy for an algorithm.
    pub fn algorithm(&self, kind: Algorithm) -> &dyn ReviewAlgorithm {
        match kind {
            Algorithm::Sm2 => &self.sm2,
            Algorithm::Leitner => &self.leitner,
        }
    }

    /// Compute the effect of grading `card` with a raw `quality` now.
    ///
    /// Fails with `InvalidQuality` before anything is computed when the grade
    /// is outside 0-5.
    pub fn process_review(&self, card: &Card, quality: i64) -> RehearseResult<CardPatch> {
        let quality = Quality::new(quality)?;
        Ok(self.review_at(card, quality, self.now()))
    }

    /// Compute the effect of grading `card` at a given instant.
    pub fn review_at(&self, card: &Card, quality: Quality, now: DateTime<Utc>) -> CardPatch {
        let patch = algorithm::review(
            self.algorithm(card.algorithm),
            &self.config.memory,
            card,
            quality,
            now,
        );

        debug!(
            card_id = %card.id,
            algorithm = %card.algorithm,
            quality = quality.value(),
            interval = ?patch.interval,
            next_review = ?patch.next_review,
            "Computed review"
        );

        patch
    }

    /// Next interval for every possible grade, lowest grade first.
    pub fn preview_intervals(&self, card: &Card) -> Vec<(Quality, f64)> {
        let algorithm = self.algorithm(card.algorithm);
        Quality::all()
            .map(|quality| (quality, algorithm.transition(card, quality).interval))
            .collect()
    }

    /// A new card for `user_id` using the configured defaults.
    pub fn new_card(&self, user_id: &str, algorithm: Option<Algorithm>) -> Card {
        Card::new(
            user_id,
            algorithm.unwrap_or(self.config.default_algorithm),
            self.now(),
        )
        .with_ease_factor(self.config.sm2.initial_ease_factor)
        .with_memory_strength(self.config.memory.initial_strength)
    }

    /// Create and store a new card.
    pub async fn create_card(&self, user_id: &str, algorithm: Option<Algorithm>) -> RehearseResult<Card> {
        self.repository.insert(self.new_card(user_id, algorithm)).await
    }

    /// Cards due now for `user_id`, most overdue first, at most `limit`.
    ///
    /// Every call queries the repository afresh.
    pub async fn get_due_cards(
        &self,
        user_id: &str,
        limit: usize,
        filter: Option<&CardFilter>,
    ) -> RehearseResult<Vec<Card>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let any = CardFilter::any();
        let filter = filter.unwrap_or(&any);
        let now = self.now();

        let mut cards = self.repository.query_due(user_id, filter, now, limit).await?;

        // Repositories are external; hold them to the contract.
        cards.retain(|card| card.is_due(now) && filter.matches(card));
        cards.sort_by(|a, b| a.next_review.cmp(&b.next_review));
        cards.truncate(limit);

        debug!(user_id, limit, count = cards.len(), "Selected due cards");
        Ok(cards)
    }

    /// Probability that `card` is still remembered at `at`.
    pub fn estimate_retention(&self, card: &Card, at: DateTime<Utc>) -> f64 {
        estimate_retention(card, at)
    }
}

/// Forgetting curve `R = 2^(-elapsed / (interval × memory_strength))`.
///
/// Never-reviewed cards and instants at or before the last review give 1.0.
/// A non-positive decay constant gives 0.0 once any time has elapsed.
pub fn estimate_retention(card: &Card, at: DateTime<Utc>) -> f64 {
    let Some(last_reviewed) = card.last_reviewed else {
        return 1.0;
    };

    let elapsed_days = at.signed_duration_since(last_reviewed).num_seconds() as f64 / 86_400.0;
    if elapsed_days <= 0.0 {
        return 1.0;
    }

    let decay = card.interval * card.memory_strength;
    if decay <= 0.0 {
        return 0.0;
    }

    2f64.powf(-elapsed_days / decay).clamp(0.0, 1.0)
}
