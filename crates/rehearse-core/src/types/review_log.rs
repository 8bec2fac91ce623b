//! Persisted record of a committed review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::card::Algorithm;
use super::quality::Quality;

/// One committed review, appended by the session after the card is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLogEntry {
    pub card_id: String,
    pub user_id: String,
    pub algorithm: Algorithm,
    pub quality: Quality,
    /// Seconds the learner took to answer, when measured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_secs: Option<f64>,
    /// Interval in days the review produced.
    pub interval_after: f64,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewLogEntry {
    /// Whether the logged review passed.
    pub fn is_pass(&self) -> bool {
        self.quality.is_pass()
    }
}
