//! In-memory card repository.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use rehearse_core::error::{RehearseError, RehearseResult};
use rehearse_core::traits::CardRepository;
use rehearse_core::types::{Card, CardFilter, CardPatch, ReviewLogEntry};

/// Process-local repository backed by hash maps.
///
/// Version checks happen under the write lock, so concurrent writers of the
/// same card see `StaleCard` exactly as with a database.
#[derive(Default)]
pub struct InMemoryCardRepository {
    cards: RwLock<HashMap<String, Card>>,
    review_log: RwLock<Vec<ReviewLogEntry>>,
}

impl InMemoryCardRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored cards.
    pub async fn len(&self) -> usize {
        self.cards.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cards.read().await.is_empty()
    }
}

fn check_version(stored: &Card, expected: u64) -> RehearseResult<()> {
    if stored.version == expected {
        Ok(())
    } else {
        Err(RehearseError::stale_card(&stored.id, expected, stored.version))
    }
}

#[async_trait]
impl CardRepository for InMemoryCardRepository {
    async fn load(&self, card_id: &str) -> RehearseResult<Card> {
        self.cards
            .read()
            .await
            .get(card_id)
            .cloned()
            .ok_or_else(|| RehearseError::card_not_found(card_id))
    }

    async fn insert(&self, mut card: Card) -> RehearseResult<Card> {
        card.validate()?;
        let mut cards = self.cards.write().await;
        if cards.contains_key(&card.id) {
            return Err(RehearseError::validation(format!("Card {} already exists", card.id)));
        }

        card.version = 0;
        cards.insert(card.id.clone(), card.clone());
        debug!(card_id = %card.id, user_id = %card.user_id, "Inserted card");
        Ok(card)
    }

    async fn save(&self, card: &Card) -> RehearseResult<Card> {
        card.validate()?;
        let mut cards = self.cards.write().await;
        let stored = cards
            .get_mut(&card.id)
            .ok_or_else(|| RehearseError::card_not_found(&card.id))?;
        check_version(stored, card.version)?;

        *stored = card.clone();
        stored.version += 1;
        Ok(stored.clone())
    }

    async fn apply_patch(&self, card_id: &str, patch: &CardPatch) -> RehearseResult<Card> {
        let mut cards = self.cards.write().await;
        let stored = cards
            .get_mut(card_id)
            .ok_or_else(|| RehearseError::card_not_found(card_id))?;
        check_version(stored, patch.expected_version)?;

        patch.apply(stored);
        stored.version += 1;
        debug!(card_id, fields = ?patch.changed_fields(), version = stored.version, "Applied card patch");
        Ok(stored.clone())
    }

    async fn query_due(
        &self,
        user_id: &str,
        filter: &CardFilter,
        now: DateTime<Utc>,
        limit: usize,
    ) -> RehearseResult<Vec<Card>> {
        let cards = self.cards.read().await;
        let mut due: Vec<Card> = cards
            .values()
            .filter(|c| c.user_id == user_id && c.is_due(now) && filter.matches(c))
            .cloned()
            .collect();

        due.sort_by(|a, b| a.next_review.cmp(&b.next_review).then_with(|| a.id.cmp(&b.id)));
        due.truncate(limit);
        Ok(due)
    }

    async fn query_all(&self, user_id: &str) -> RehearseResult<Vec<Card>> {
        let cards = self.cards.read().await;
        let mut owned: Vec<Card> = cards.values().filter(|c| c.user_id == user_id).cloned().collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(owned)
    }

    async fn append_review_log(&self, entry: &ReviewLogEntry) -> RehearseResult<()> {
        self.review_log.write().await.push(entry.clone());
        Ok(())
    }

    async fn query_review_log(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> RehearseResult<Vec<ReviewLogEntry>> {
        let log = self.review_log.read().await;
        let mut entries: Vec<ReviewLogEntry> = log
            .iter()
            .filter(|e| e.user_id == user_id && e.reviewed_at >= since)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.reviewed_at.cmp(&b.reviewed_at));
        Ok(entries)
    }
}
