//! rehearse-core - Core library for rehearse.
//!
//! This crate provides the card model, the SM-2 and Leitner review
//! algorithms, review sessions, and the read-only analytics layer of the
//! rehearse spaced-repetition engine. Storage is pluggable through the
//! [`CardRepository`] trait; time through [`Clock`].
//!
//! # Example
//!
//! ```ignore
//! use rehearse_core::{RehearseConfig, ReviewService, SpacedRepetitionScheduler, SystemClock};
//!
//! let scheduler = Arc::new(SpacedRepetitionScheduler::new(repository, Arc::new(SystemClock), RehearseConfig::default()));
//! let service = ReviewService::new(scheduler);
//!
//! let session = service.start_session("user1", Some(20)).await?;
//! while let Some(card) = service.next_card(session).await? {
//!     service.grade_card(session, &card.id, 4, Some(3.2)).await?;
//! }
//! let summary = service.end_session(session).await?;
//! ```

pub mod algorithm;
pub mod config;
pub mod error;
pub mod manager;
pub mod math;
pub mod scheduler;
pub mod service;
pub mod session;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use algorithm::{Leitner, ReviewAlgorithm, Sm2};
pub use config::{RehearseConfig, StoreConfig, StoreProvider};
pub use error::{ErrorCode, RehearseError, RehearseResult};
pub use manager::{
    DailyReviewBucket, LearningAnalytics, ReviewDashboard, ReviewScheduleManager,
    ScheduleHealth, ScheduleOptimization, StudyFocus, StudyPlan,
};
pub use scheduler::{estimate_retention, SpacedRepetitionScheduler};
pub use service::ReviewService;
pub use session::{ReviewRecord, ReviewSession, SessionId, SessionState, SessionSummary};
pub use traits::{CardRepository, Clock, FixedClock, SystemClock};
pub use types::{
    Algorithm, Card, CardFilter, CardPatch, LearningState, Quality, ReviewLogEntry,
};
