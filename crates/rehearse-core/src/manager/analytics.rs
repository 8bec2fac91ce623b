//! Learning analytics over a trailing window of the review log.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::debug;

use super::ReviewScheduleManager;
use crate::error::{RehearseError, RehearseResult};
use crate::math::{mean, percentage, round2};
use crate::types::{Algorithm, Card, ReviewLogEntry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningAnalytics {
    pub user_id: String,
    pub timeframe_days: u32,
    pub total_reviews: usize,
    pub correct_reviews: usize,
    /// Percentage over the window, two decimals.
    pub overall_accuracy: f64,
    pub cards_studied: usize,
    pub average_response_time: f64,
    pub algorithm_performance: BTreeMap<Algorithm, AlgorithmPerformance>,
    /// Oldest day first, ending today.
    pub learning_curve: Vec<LearningCurvePoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmPerformance {
    pub card_count: usize,
    pub review_count: usize,
    pub correct_count: usize,
    pub accuracy: f64,
    pub average_interval: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningCurvePoint {
    pub date: NaiveDate,
    pub reviews: usize,
    pub correct: usize,
    pub accuracy: f64,
}

impl ReviewScheduleManager {
    /// Accuracy, per-algorithm performance and a daily learning curve over
    /// the last `timeframe_days` days.
    pub async fn get_learning_analytics(
        &self,
        user_id: &str,
        timeframe_days: u32,
    ) -> RehearseResult<LearningAnalytics> {
        if timeframe_days == 0 {
            return Err(RehearseError::validation("Timeframe must cover at least one day"));
        }

        let now = self.scheduler.now();
        let since = now - Duration::days(timeframe_days as i64);

        let repository = self.scheduler.repository();
        let cards = repository.query_all(user_id).await?;
        let log = repository.query_review_log(user_id, since).await?;

        debug!(user_id, timeframe_days, reviews = log.len(), "Computing learning analytics");
        Ok(build_analytics(user_id, timeframe_days, &cards, &log, now))
    }
}

pub fn build_analytics(
    user_id: &str,
    timeframe_days: u32,
    cards: &[Card],
    log: &[ReviewLogEntry],
    now: DateTime<Utc>,
) -> LearningAnalytics {
    let since = now - Duration::days(timeframe_days as i64);
    let window: Vec<&ReviewLogEntry> = log
        .iter()
        .filter(|e| e.reviewed_at >= since && e.reviewed_at <= now)
        .collect();

    let correct = window.iter().filter(|e| e.is_pass()).count();

    let mut studied: Vec<&str> = window.iter().map(|e| e.card_id.as_str()).collect();
    studied.sort_unstable();
    studied.dedup();

    let algorithm_performance = Algorithm::iter()
        .map(|algorithm| {
            let group: Vec<&Card> = cards.iter().filter(|c| c.algorithm == algorithm).collect();
            let reviews: Vec<&&ReviewLogEntry> =
                window.iter().filter(|e| e.algorithm == algorithm).collect();
            let review_correct = reviews.iter().filter(|e| e.is_pass()).count();

            let performance = AlgorithmPerformance {
                card_count: group.len(),
                review_count: reviews.len(),
                correct_count: review_correct,
                accuracy: percentage(review_correct as u64, reviews.len() as u64),
                average_interval: round2(mean(group.iter().map(|c| c.interval))),
            };
            (algorithm, performance)
        })
        .collect();

    LearningAnalytics {
        user_id: user_id.to_string(),
        timeframe_days,
        total_reviews: window.len(),
        correct_reviews: correct,
        overall_accuracy: percentage(correct as u64, window.len() as u64),
        cards_studied: studied.len(),
        average_response_time: round2(mean(window.iter().filter_map(|e| e.response_time_secs))),
        algorithm_performance,
        learning_curve: learning_curve(&window, since.date_naive(), now.date_naive()),
    }
}

fn learning_curve(window: &[&ReviewLogEntry], first: NaiveDate, last: NaiveDate) -> Vec<LearningCurvePoint> {
    first
        .iter_days()
        .take_while(|date| *date <= last)
        .map(|date| {
            let day: Vec<_> = window
                .iter()
                .filter(|e| e.reviewed_at.date_naive() == date)
                .collect();
            let correct = day.iter().filter(|e| e.is_pass()).count();
            LearningCurvePoint {
                date,
                reviews: day.len(),
                correct,
                accuracy: percentage(correct as u64, day.len() as u64),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Quality;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 15, 18, 0, 0).unwrap()
    }

    fn entry(card_id: &str, algorithm: Algorithm, quality: u8, days_ago: i64) -> ReviewLogEntry {
        ReviewLogEntry {
            card_id: card_id.to_string(),
            user_id: "u".to_string(),
            algorithm,
            quality: Quality::try_from(quality).unwrap(),
            response_time_secs: Some(quality as f64),
            interval_after: 1.0,
            reviewed_at: now() - Duration::days(days_ago),
        }
    }

    #[test]
    fn test_empty_analytics_is_zeroed() {
        let analytics = build_analytics("u", 7, &[], &[], now());

        assert_eq!(analytics.total_reviews, 0);
        assert_eq!(analytics.overall_accuracy, 0.0);
        assert_eq!(analytics.average_response_time, 0.0);
        assert_eq!(analytics.timeframe_days, 7);
        assert_eq!(analytics.learning_curve.len(), 8);
        assert!(analytics.learning_curve.iter().all(|p| p.reviews == 0));
        assert_eq!(analytics.learning_curve.last().unwrap().date, now().date_naive());
    }

    #[test]
    fn test_window_excludes_old_reviews() {
        let log = vec![
            entry("a", Algorithm::Sm2, 5, 1),
            entry("a", Algorithm::Sm2, 1, 2),
            entry("b", Algorithm::Leitner, 4, 2),
            entry("c", Algorithm::Sm2, 5, 30),
        ];
        let analytics = build_analytics("u", 7, &[], &log, now());

        assert_eq!(analytics.total_reviews, 3);
        assert_eq!(analytics.correct_reviews, 2);
        assert_eq!(analytics.overall_accuracy, 66.67);
        assert_eq!(analytics.cards_studied, 2);
    }

    #[test]
    fn test_algorithm_performance() {
        let mut card = Card::new("u", Algorithm::Leitner, now());
        card.interval = 7.0;
        let log = vec![
            entry("a", Algorithm::Sm2, 5, 0),
            entry("b", Algorithm::Leitner, 2, 0),
            entry("b", Algorithm::Leitner, 3, 1),
        ];
        let analytics = build_analytics("u", 7, &[card], &log, now());

        let leitner = &analytics.algorithm_performance[&Algorithm::Leitner];
        assert_eq!(leitner.card_count, 1);
        assert_eq!(leitner.review_count, 2);
        assert_eq!(leitner.accuracy, 50.0);
        assert_eq!(leitner.average_interval, 7.0);

        let sm2 = &analytics.algorithm_performance[&Algorithm::Sm2];
        assert_eq!(sm2.card_count, 0);
        assert_eq!(sm2.accuracy, 100.0);
    }

    #[test]
    fn test_learning_curve_by_day() {
        let log = vec![
            entry("a", Algorithm::Sm2, 5, 0),
            entry("b", Algorithm::Sm2, 0, 0),
            entry("c", Algorithm::Sm2, 4, 2),
        ];
        let analytics = build_analytics("u", 3, &[], &log, now());
        let curve = &analytics.learning_curve;

        assert_eq!(curve.len(), 4);
        assert!(curve.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(curve[3].reviews, 2);
        assert_eq!(curve[3].accuracy, 50.0);
        assert_eq!(curve[1].reviews, 1);
        assert_eq!(curve[1].accuracy, 100.0);
    }
}
