//! Card repository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::RehearseResult;
use crate::types::{Card, CardFilter, CardPatch, ReviewLogEntry};

/// Storage for cards and their review log.
///
/// Writes use optimistic concurrency: `save` and `apply_patch` compare the
/// caller's version with the stored one and fail with `StaleCard` on a
/// mismatch. Successful writes bump the stored version by one.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CardRepository: Send + Sync {
    /// Load a card by ID (`CardNotFound` on a miss).
    async fn load(&self, card_id: &str) -> RehearseResult<Card>;

    /// Store a new card. The stored card starts at version 0.
    async fn insert(&self, card: Card) -> RehearseResult<Card>;

    /// Overwrite a card after checking its version.
    async fn save(&self, card: &Card) -> RehearseResult<Card>;

    /// Atomically apply a patch after checking `patch.expected_version`.
    async fn apply_patch(&self, card_id: &str, patch: &CardPatch) -> RehearseResult<Card>;

    /// Cards with `next_review <= now`, oldest due first, at most `limit`.
    async fn query_due(
        &self,
        user_id: &str,
        filter: &CardFilter,
        now: DateTime<Utc>,
        limit: usize,
    ) -> RehearseResult<Vec<Card>>;

    /// Every card owned by a user.
    async fn query_all(&self, user_id: &str) -> RehearseResult<Vec<Card>>;

    /// Append a committed review to the log.
    async fn append_review_log(&self, entry: &ReviewLogEntry) -> RehearseResult<()>;

    /// Review log entries for a user at or after `since`, oldest first.
    async fn query_review_log(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> RehearseResult<Vec<ReviewLogEntry>>;
}
