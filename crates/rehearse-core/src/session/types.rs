//! Session bookkeeping types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::types::{Algorithm, Quality};

/// Identifier of a live review session.
pub type SessionId = Uuid;

/// Lifecycle of a review session. `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    #[default]
    Active,
    Finished,
}

/// Running counters for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_cards: usize,
    pub correct_cards: usize,
    pub session_start: DateTime<Utc>,
    /// Set once, when the session finishes.
    pub session_end: Option<DateTime<Utc>>,
}

impl SessionStats {
    pub fn started_at(session_start: DateTime<Utc>) -> Self {
        Self {
            total_cards: 0,
            correct_cards: 0,
            session_start,
            session_end: None,
        }
    }
}

/// One committed review within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub card_id: String,
    /// Algorithm that scheduled the review.
    pub algorithm: Algorithm,
    pub quality: Quality,
    pub response_time_secs: Option<f64>,
    /// Interval in days the card was scheduled with.
    pub interval_after: f64,
    pub next_review: DateTime<Utc>,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewRecord {
    pub fn is_correct(&self) -> bool {
        self.quality.is_pass()
    }
}

/// Result of finishing a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub user_id: String,
    pub session_limit: usize,
    pub total_cards: usize,
    pub correct_cards: usize,
    /// `correct / total × 100`, two decimals; 0 for an empty session.
    pub accuracy_percentage: f64,
    /// Mean of the reported response times in seconds; 0 if none reported.
    pub average_response_time: f64,
    pub session_duration_minutes: f64,
    pub session_start: DateTime<Utc>,
    pub session_end: DateTime<Utc>,
    pub cards_reviewed: Vec<ReviewRecord>,
}
