//! Review sessions.
//!
//! A [`ReviewSession`] is a short-lived, single-owner object that walks one
//! user through due cards up to a limit. It is never persisted; only the
//! cards it grades and their review log entries are.
//!
//! Sessions do not lease cards. Two sessions for the same user may pick the
//! same due card; the second commit then meets a version conflict, which is
//! resolved by re-reading the card and recomputing the review.

mod types;

pub use types::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{RehearseError, RehearseResult};
use crate::math::{mean, percentage, round2};
use crate::scheduler::SpacedRepetitionScheduler;
use crate::types::{Card, Quality, ReviewLogEntry};

/// A single user's review run.
pub struct ReviewSession {
    id: SessionId,
    user_id: String,
    session_limit: usize,
    scheduler: Arc<SpacedRepetitionScheduler>,
    state: SessionState,
    stats: SessionStats,
    cards_reviewed: Vec<ReviewRecord>,
    summary: Option<SessionSummary>,
}

impl ReviewSession {
    /// Start a session for `user_id` that reviews at most `session_limit` cards.
    pub fn new(
        scheduler: Arc<SpacedRepetitionScheduler>,
        user_id: impl Into<String>,
        session_limit: usize,
    ) -> Self {
        let user_id = user_id.into();
        let id = Uuid::new_v4();
        let stats = SessionStats::started_at(scheduler.now());

        info!(session_id = %id, user_id = %user_id, session_limit, "Review session started");

        Self {
            id,
            user_id,
            session_limit,
            scheduler,
            state: SessionState::Active,
            stats,
            cards_reviewed: Vec::new(),
            summary: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_limit(&self) -> usize {
        self.session_limit
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == SessionState::Finished
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn cards_reviewed(&self) -> &[ReviewRecord] {
        &self.cards_reviewed
    }

    /// Cards left before the limit is reached.
    pub fn remaining(&self) -> usize {
        self.session_limit.saturating_sub(self.stats.total_cards)
    }

    /// The most overdue card, or `None` once the session is exhausted,
    /// finished, or nothing is due.
    pub async fn get_next_card(&self) -> RehearseResult<Option<Card>> {
        if self.is_finished() || self.stats.total_cards >= self.session_limit {
            return Ok(None);
        }

        let mut due = self.scheduler.get_due_cards(&self.user_id, 1, None).await?;
        Ok(due.pop())
    }

    /// Grade `card` and commit the result.
    ///
    /// The grade is validated before anything is written. A version
    /// conflict on commit is retried against a fresh read of the card.
    pub async fn review_card(
        &mut self,
        card: &Card,
        quality: i64,
        response_time_secs: Option<f64>,
    ) -> RehearseResult<ReviewRecord> {
        if self.is_finished() {
            return Err(RehearseError::session_finished(self.id));
        }

        let quality = Quality::new(quality)?;

        if let Some(secs) = response_time_secs {
            if !secs.is_finite() || secs < 0.0 {
                return Err(RehearseError::validation(format!(
                    "Response time must be a non-negative number of seconds, got {}",
                    secs
                )));
            }
        }

        if card.user_id != self.user_id {
            return Err(RehearseError::validation(format!(
                "Card {} belongs to user {}, not {}",
                card.id, card.user_id, self.user_id
            )));
        }

        let (saved, reviewed_at) = self.commit(card, quality).await?;

        let record = ReviewRecord {
            card_id: saved.id.clone(),
            algorithm: saved.algorithm,
            quality,
            response_time_secs,
            interval_after: saved.interval,
            next_review: saved.next_review,
            reviewed_at,
        };

        self.stats.total_cards += 1;
        if quality.is_pass() {
            self.stats.correct_cards += 1;
        }
        self.cards_reviewed.push(record.clone());

        let entry = ReviewLogEntry {
            card_id: saved.id.clone(),
            user_id: saved.user_id.clone(),
            algorithm: saved.algorithm,
            quality,
            response_time_secs,
            interval_after: saved.interval,
            reviewed_at,
        };
        // The card is already committed; a lost log entry only thins analytics.
        if let Err(e) = self.scheduler.repository().append_review_log(&entry).await {
            warn!(session_id = %self.id, card_id = %saved.id, error = %e, "Failed to append review log entry");
        }

        debug!(
            session_id = %self.id,
            card_id = %saved.id,
            quality = quality.value(),
            total_cards = self.stats.total_cards,
            "Card reviewed"
        );

        Ok(record)
    }

    async fn commit(&self, card: &Card, quality: Quality) -> RehearseResult<(Card, DateTime<Utc>)> {
        let settings = &self.scheduler.config().session;
        let scheduler: &SpacedRepetitionScheduler = &self.scheduler;
        let tries = AtomicUsize::new(0);
        let tries = &tries;

        let attempt = move || async move {
            let current = if tries.fetch_add(1, Ordering::Relaxed) == 0 {
                card.clone()
            } else {
                scheduler.repository().load(&card.id).await?
            };

            let reviewed_at = scheduler.now();
            let patch = scheduler.review_at(&current, quality, reviewed_at);
            let saved = scheduler.repository().apply_patch(&current.id, &patch).await?;
            Ok::<_, RehearseError>((saved, reviewed_at))
        };

        attempt
            .retry(
                ExponentialBuilder::default()
                    .with_max_times(settings.stale_retry_attempts)
                    .with_min_delay(Duration::from_millis(settings.stale_retry_delay_ms)),
            )
            .when(|e| e.is_retryable())
            .notify(|err, dur| {
                warn!(
                    session_id = %self.id,
                    card_id = %card.id,
                    "Stale card on commit, retrying in {:?}: {}",
                    dur,
                    err
                );
            })
            .await
    }

    /// Close the session and summarise it.
    ///
    /// Idempotent: later calls return the first summary unchanged.
    pub fn finish_session(&mut self) -> SessionSummary {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }

        let session_end = self.scheduler.now();
        self.stats.session_end = Some(session_end);
        self.state = SessionState::Finished;

        let elapsed = session_end.signed_duration_since(self.stats.session_start);
        let summary = SessionSummary {
            session_id: self.id,
            user_id: self.user_id.clone(),
            session_limit: self.session_limit,
            total_cards: self.stats.total_cards,
            correct_cards: self.stats.correct_cards,
            accuracy_percentage: percentage(
                self.stats.correct_cards as u64,
                self.stats.total_cards as u64,
            ),
            average_response_time: mean(
                self.cards_reviewed
                    .iter()
                    .filter_map(|record| record.response_time_secs),
            ),
            session_duration_minutes: round2(elapsed.num_milliseconds() as f64 / 60_000.0),
            session_start: self.stats.session_start,
            session_end,
            cards_reviewed: self.cards_reviewed.clone(),
        };

        info!(
            session_id = %self.id,
            user_id = %self.user_id,
            total_cards = summary.total_cards,
            accuracy = summary.accuracy_percentage,
            "Review session finished"
        );

        self.summary = Some(summary.clone());
        summary
    }
}
