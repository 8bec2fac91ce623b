//! Session API surface.
//!
//! [`ReviewService`] keeps live sessions in an explicit map keyed by
//! [`SessionId`]. Each session sits behind its own mutex, so different
//! sessions progress concurrently while a single session is driven by one
//! caller at a time.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::{RehearseError, RehearseResult};
use crate::scheduler::SpacedRepetitionScheduler;
use crate::session::{ReviewRecord, ReviewSession, SessionId, SessionSummary};
use crate::types::Card;

/// Owner of live review sessions.
pub struct ReviewService {
    scheduler: Arc<SpacedRepetitionScheduler>,
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<ReviewSession>>>>,
}

impl ReviewService {
    pub fn new(scheduler: Arc<SpacedRepetitionScheduler>) -> Self {
        Self {
            scheduler,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn scheduler(&self) -> &Arc<SpacedRepetitionScheduler> {
        &self.scheduler
    }

    /// Open a session. `limit` falls back to `session.default_limit`.
    pub async fn start_session(&self, user_id: &str, limit: Option<usize>) -> RehearseResult<SessionId> {
        if user_id.trim().is_empty() {
            return Err(RehearseError::validation("User id must not be empty"));
        }

        let limit = limit.unwrap_or(self.scheduler.config().session.default_limit);
        let session = ReviewSession::new(Arc::clone(&self.scheduler), user_id, limit);
        let id = session.id();

        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));

        Ok(id)
    }

    async fn session(&self, id: SessionId) -> RehearseResult<Arc<Mutex<ReviewSession>>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| RehearseError::session_not_found(id))
    }

    /// Next card for the session, if any.
    pub async fn next_card(&self, id: SessionId) -> RehearseResult<Option<Card>> {
        let session = self.session(id).await?;
        let session = session.lock().await;
        session.get_next_card().await
    }

    /// Grade a card by id within a session.
    ///
    /// Fails with `SessionFinished` for a finished session and `CardNotFound`
    /// when the card is not stored.
    pub async fn grade_card(
        &self,
        id: SessionId,
        card_id: &str,
        quality: i64,
        response_time_secs: Option<f64>,
    ) -> RehearseResult<ReviewRecord> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;

        if session.is_finished() {
            return Err(RehearseError::session_finished(id));
        }

        let card = self.scheduler.repository().load(card_id).await?;
        session.review_card(&card, quality, response_time_secs).await
    }

    /// Finish a session and return its summary. Repeat calls return the same summary.
    ///
    /// The finished session stays registered so the summary can be fetched
    /// again; it is only released by [`discard_session`](Self::discard_session)
    /// or [`end_and_discard`](Self::end_and_discard).
    pub async fn end_session(&self, id: SessionId) -> RehearseResult<SessionSummary> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;
        Ok(session.finish_session())
    }

    /// Finish a session and release it in one step.
    pub async fn end_and_discard(&self, id: SessionId) -> RehearseResult<SessionSummary> {
        let session = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| RehearseError::session_not_found(id))?;

        let summary = session.lock().await.finish_session();
        debug!(session_id = %id, "Review session ended and discarded");
        Ok(summary)
    }

    /// Drop a session from the service, finished or not.
    pub async fn discard_session(&self, id: SessionId) -> RehearseResult<()> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                debug!(session_id = %id, "Review session discarded");
                Ok(())
            }
            None => Err(RehearseError::session_not_found(id)),
        }
    }

    /// Number of sessions currently held.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RehearseConfig;
    use crate::traits::{FixedClock, MockCardRepository};
    use crate::types::Algorithm;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn service(repository: MockCardRepository) -> ReviewService {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap());
        let scheduler =
            SpacedRepetitionScheduler::new(Arc::new(repository), Arc::new(clock), RehearseConfig::default());
        ReviewService::new(Arc::new(scheduler))
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let service = service(MockCardRepository::new());
        let id = Uuid::new_v4();

        assert!(matches!(
            service.next_card(id).await,
            Err(RehearseError::SessionNotFound { .. })
        ));
        assert!(matches!(
            service.end_session(id).await,
            Err(RehearseError::SessionNotFound { .. })
        ));
        assert!(matches!(
            service.discard_session(id).await,
            Err(RehearseError::SessionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_start_session_default_limit() {
        let service = service(MockCardRepository::new());
        let id = service.start_session("alice", None).await.unwrap();

        let summary = service.end_session(id).await.unwrap();
        assert_eq!(summary.session_limit, 20);
        assert_eq!(summary.user_id, "alice");
    }

    #[tokio::test]
    async fn test_end_and_discard_releases_session() {
        let service = service(MockCardRepository::new());
        let kept = service.start_session("alice", Some(5)).await.unwrap();
        let released = service.start_session("alice", Some(5)).await.unwrap();

        service.end_session(kept).await.unwrap();
        let summary = service.end_and_discard(released).await.unwrap();
        assert_eq!(summary.session_id, released);
        assert_eq!(summary.total_cards, 0);

        assert_eq!(service.session_count().await, 1);
        assert!(matches!(
            service.end_and_discard(released).await,
            Err(RehearseError::SessionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_start_session_rejects_blank_user() {
        let service = service(MockCardRepository::new());
        assert!(service.start_session("  ", Some(5)).await.is_err());
        assert_eq!(service.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_grade_missing_card() {
        let mut repository = MockCardRepository::new();
        repository
            .expect_load()
            .returning(|id| Err(RehearseError::card_not_found(id)));

        let service = service(repository);
        let id = service.start_session("alice", Some(5)).await.unwrap();

        let err = service.grade_card(id, "nope", 4, None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_grade_after_end_is_rejected() {
        let mut repository = MockCardRepository::new();
        repository.expect_load().never();

        let service = service(repository);
        let id = service.start_session("alice", Some(5)).await.unwrap();
        service.end_session(id).await.unwrap();

        let err = service.grade_card(id, "c1", 4, None).await.unwrap_err();
        assert!(matches!(err, RehearseError::SessionFinished { .. }));
    }

    #[tokio::test]
    async fn test_grade_card_loads_and_commits() {
        let mut repository = MockCardRepository::new();
        repository.expect_load().returning(|id| {
            Ok(Card::new("alice", Algorithm::Leitner, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()).with_id(id))
        });
        repository.expect_apply_patch().returning(|id, patch| {
            let base = Card::new("alice", Algorithm::Leitner, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
                .with_id(id);
            Ok(patch.applied_to(&base))
        });
        repository.expect_append_review_log().returning(|_| Ok(()));

        let service = service(repository);
        let id = service.start_session("alice", Some(5)).await.unwrap();

        let record = service.grade_card(id, "c1", 5, Some(2.5)).await.unwrap();
        assert_eq!(record.card_id, "c1");
        assert_eq!(record.interval_after, 3.0);

        let summary = service.end_session(id).await.unwrap();
        assert_eq!(summary.total_cards, 1);
        assert_eq!(summary.accuracy_percentage, 100.0);

        let again = service.end_session(id).await.unwrap();
        assert_eq!(summary, again);

        service.discard_session(id).await.unwrap();
        assert_eq!(service.session_count().await, 0);
    }
}
