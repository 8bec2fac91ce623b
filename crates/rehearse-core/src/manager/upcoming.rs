//! Forward-looking workload: upcoming reviews and schedule balance.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, warn};

use super::{ReviewScheduleManager, StateBreakdown};
use crate::config::OptimizerConfig;
use crate::error::{RehearseError, RehearseResult};
use crate::math::{mean, round2, std_dev};
use crate::types::Card;

/// Reviews falling on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyReviewBucket {
    pub date: NaiveDate,
    pub total_due: usize,
    pub breakdown: StateBreakdown,
    pub is_today: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScheduleHealth {
    Good,
    NeedsOptimization,
}

/// Balance of the upcoming daily workload against a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOptimization {
    pub target_daily_reviews: u32,
    pub window_days: u32,
    pub daily_counts: Vec<usize>,
    pub current_avg_daily: f64,
    pub peak_day_count: usize,
    pub overloaded_days: usize,
    pub underloaded_days: usize,
    pub std_dev: f64,
    pub schedule_health: ScheduleHealth,
    pub suggestions: Vec<String>,
}

impl ReviewScheduleManager {
    /// One bucket per day starting today. Overdue cards land in today's bucket.
    ///
    /// `days_ahead` is clamped to `[1, analytics.max_days_ahead]`.
    pub async fn get_upcoming_reviews(
        &self,
        user_id: &str,
        days_ahead: u32,
    ) -> RehearseResult<Vec<DailyReviewBucket>> {
        let max_days = self.scheduler.config().analytics.max_days_ahead;
        let days = days_ahead.clamp(1, max_days.max(1));
        if days != days_ahead {
            warn!(user_id, requested = days_ahead, days, "Clamped upcoming review window");
        }

        let cards = self.scheduler.repository().query_all(user_id).await?;
        Ok(daily_buckets(&cards, self.scheduler.now(), days))
    }

    /// Compare the upcoming daily workload with `target_daily_reviews`.
    pub async fn optimize_daily_schedule(
        &self,
        user_id: &str,
        target_daily_reviews: u32,
    ) -> RehearseResult<ScheduleOptimization> {
        if target_daily_reviews == 0 {
            return Err(RehearseError::validation_with_suggestion(
                "Target daily reviews must be positive",
                "Pass a target of at least 1 review per day",
            ));
        }

        let cards = self.scheduler.repository().query_all(user_id).await?;
        let config = &self.scheduler.config().optimizer;
        let buckets = daily_buckets(&cards, self.scheduler.now(), config.window_days.max(1));

        let optimization = analyze_schedule(&buckets, target_daily_reviews, config);
        debug!(
            user_id,
            health = %optimization.schedule_health,
            peak = optimization.peak_day_count,
            "Analyzed daily schedule"
        );
        Ok(optimization)
    }
}

pub fn daily_buckets(cards: &[Card], now: DateTime<Utc>, days: u32) -> Vec<DailyReviewBucket> {
    let today = now.date_naive();
    let mut buckets: Vec<DailyReviewBucket> = (0..days)
        .map(|offset| DailyReviewBucket {
            date: today + Duration::days(offset as i64),
            total_due: 0,
            breakdown: StateBreakdown::default(),
            is_today: offset == 0,
        })
        .collect();

    for card in cards {
        let offset = (card.next_review.date_naive() - today).num_days().max(0) as usize;
        if let Some(bucket) = buckets.get_mut(offset) {
            bucket.total_due += 1;
            bucket.breakdown.add(card.learning_state);
        }
    }

    buckets
}

pub fn analyze_schedule(
    buckets: &[DailyReviewBucket],
    target: u32,
    config: &OptimizerConfig,
) -> ScheduleOptimization {
    let counts: Vec<usize> = buckets.iter().map(|b| b.total_due).collect();
    let as_f64: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    let target_f = target as f64;

    let avg = mean(as_f64.iter().copied());
    let deviation = std_dev(&as_f64);
    let peak = counts.iter().copied().max().unwrap_or(0);
    let overloaded = counts.iter().filter(|&&c| c > target as usize).count();
    let underloaded = counts.iter().filter(|&&c| c < target as usize).count();

    let health = if deviation <= target_f * config.balance_tolerance {
        ScheduleHealth::Good
    } else {
        ScheduleHealth::NeedsOptimization
    };

    let mut suggestions = Vec::new();
    if overloaded > 0 {
        suggestions.push(format!(
            "{} day(s) exceed the target of {} reviews; review some of those cards a day early",
            overloaded, target
        ));
    }
    if peak as f64 > target_f * 2.0 {
        suggestions.push(format!(
            "Peak day has {} reviews, more than twice the target; split that backlog across the week",
            peak
        ));
    }
    if overloaded > 0 && underloaded > 0 {
        suggestions.push(format!(
            "{} lighter day(s) can absorb reviews moved from busy days",
            underloaded
        ));
    }
    if avg < target_f * 0.5 {
        suggestions.push("Workload is well under target; there is room to add new cards".to_string());
    }
    if suggestions.is_empty() {
        suggestions.push("Schedule is balanced; keep reviewing daily".to_string());
    }

    ScheduleOptimization {
        target_daily_reviews: target,
        window_days: buckets.len() as u32,
        daily_counts: counts,
        current_avg_daily: round2(avg),
        peak_day_count: peak,
        overloaded_days: overloaded,
        underloaded_days: underloaded,
        std_dev: round2(deviation),
        schedule_health: health,
        suggestions,
    }
}
