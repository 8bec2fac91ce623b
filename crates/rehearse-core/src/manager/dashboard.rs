//! Review dashboard.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::debug;

use super::{ReviewScheduleManager, StateBreakdown};
use crate::config::AnalyticsConfig;
use crate::error::RehearseResult;
use crate::math::{mean, percentage, round2};
use crate::scheduler::estimate_retention;
use crate::types::{Algorithm, Card};

/// Snapshot of a user's review workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDashboard {
    pub user_id: String,
    pub status_counts: StatusCounts,
    pub due_timeframes: DueTimeframes,
    pub algorithm_stats: BTreeMap<Algorithm, AlgorithmStats>,
    pub retention_data: RetentionData,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub due_now: usize,
    #[serde(flatten)]
    pub by_state: StateBreakdown,
}

/// Due counts by calendar day (UTC).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueTimeframes {
    /// Due before the start of today.
    pub overdue: usize,
    pub due_today: usize,
    pub due_tomorrow: usize,
    /// Due today through six days from now.
    pub due_this_week: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmStats {
    pub card_count: usize,
    pub total_reviews: u64,
    pub correct_reviews: u64,
    /// Percentage, two decimals.
    pub accuracy: f64,
    pub average_interval: f64,
    pub average_ease_factor: f64,
}

/// Forgetting-curve estimates over reviewed cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetentionData {
    pub reviewed_cards: usize,
    pub average_retention: f64,
    /// Cards below the at-risk threshold.
    pub at_risk_count: usize,
    /// Retention of at least 0.9.
    pub strong: usize,
    /// Between the at-risk threshold and 0.9.
    pub moderate: usize,
    /// Below the at-risk threshold.
    pub weak: usize,
}

const STRONG_RETENTION: f64 = 0.9;

impl ReviewScheduleManager {
    /// Workload, per-algorithm and retention overview for a user.
    pub async fn get_review_dashboard(&self, user_id: &str) -> RehearseResult<ReviewDashboard> {
        let cards = self.scheduler.repository().query_all(user_id).await?;
        let now = self.scheduler.now();

        debug!(user_id, cards = cards.len(), "Building review dashboard");
        Ok(build_dashboard(
            user_id,
            &cards,
            now,
            &self.scheduler.config().analytics,
        ))
    }
}

pub fn build_dashboard(
    user_id: &str,
    cards: &[Card],
    now: DateTime<Utc>,
    config: &AnalyticsConfig,
) -> ReviewDashboard {
    ReviewDashboard {
        user_id: user_id.to_string(),
        status_counts: status_counts(cards, now),
        due_timeframes: due_timeframes(cards, now),
        algorithm_stats: algorithm_stats(cards),
        retention_data: retention_data(cards, now, config.at_risk_retention),
        last_updated: now,
    }
}

fn status_counts(cards: &[Card], now: DateTime<Utc>) -> StatusCounts {
    let mut counts = StatusCounts {
        total: cards.len(),
        ..StatusCounts::default()
    };
    for card in cards {
        counts.by_state.add(card.learning_state);
        if card.is_due(now) {
            counts.due_now += 1;
        }
    }
    counts
}

fn due_timeframes(cards: &[Card], now: DateTime<Utc>) -> DueTimeframes {
    let today = now.date_naive();
    let tomorrow = today + Duration::days(1);
    let week_end = today + Duration::days(6);

    let mut frames = DueTimeframes::default();
    for card in cards {
        let due = card.next_review.date_naive();
        if due < today {
            frames.overdue += 1;
            continue;
        }
        if due == today {
            frames.due_today += 1;
        }
        if due == tomorrow {
            frames.due_tomorrow += 1;
        }
        if due <= week_end {
            frames.due_this_week += 1;
        }
    }
    frames
}

fn algorithm_stats(cards: &[Card]) -> BTreeMap<Algorithm, AlgorithmStats> {
    Algorithm::iter()
        .map(|algorithm| {
            let group: Vec<&Card> = cards.iter().filter(|c| c.algorithm == algorithm).collect();
            let total_reviews: u64 = group.iter().map(|c| c.total_reviews as u64).sum();
            let correct_reviews: u64 = group.iter().map(|c| c.correct_reviews as u64).sum();

            let stats = AlgorithmStats {
                card_count: group.len(),
                total_reviews,
                correct_reviews,
                accuracy: percentage(correct_reviews, total_reviews),
                average_interval: round2(mean(group.iter().map(|c| c.interval))),
                average_ease_factor: round2(mean(group.iter().map(|c| c.ease_factor))),
            };
            (algorithm, stats)
        })
        .collect()
}

fn retention_data(cards: &[Card], now: DateTime<Utc>, at_risk: f64) -> RetentionData {
    let estimates: Vec<f64> = cards
        .iter()
        .filter(|c| c.last_reviewed.is_some())
        .map(|c| estimate_retention(c, now))
        .collect();

    let mut data = RetentionData {
        reviewed_cards: estimates.len(),
        average_retention: mean(estimates.iter().copied()),
        ..RetentionData::default()
    };
    for r in estimates {
        if r >= STRONG_RETENTION {
            data.strong += 1;
        } else if r >= at_risk {
            data.moderate += 1;
        } else {
            data.weak += 1;
            data.at_risk_count += 1;
        }
    }
    data
}
