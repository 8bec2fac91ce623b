//! SQLite card repository.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed nanosecond width
//! so that text ordering matches time ordering.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use rehearse_core::error::{RehearseError, RehearseResult};
use rehearse_core::traits::CardRepository;
use rehearse_core::types::{
    Algorithm, Card, CardFilter, CardPatch, LearningState, Quality, ReviewLogEntry,
};

const CARD_COLUMNS: &str = "id, user_id, algorithm, learning_state, interval, repetitions, \
     ease_factor, leitner_box, memory_strength, next_review, last_reviewed, total_reviews, \
     correct_reviews, created_at, version";

/// SQLite-backed card repository.
pub struct SqliteCardRepository {
    conn: Mutex<Connection>,
}

impl SqliteCardRepository {
    /// Open (or create) a database file.
    pub fn new(path: impl AsRef<Path>) -> RehearseResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            RehearseError::connection_failed(format!("Failed to open {}", path.display()), e)
        })?;
        Self::with_connection(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> RehearseResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| RehearseError::connection_failed("Failed to open in-memory database", e))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> RehearseResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> RehearseResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cards (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                algorithm TEXT NOT NULL,
                learning_state TEXT NOT NULL,
                interval REAL NOT NULL,
                repetitions INTEGER NOT NULL,
                ease_factor REAL NOT NULL,
                leitner_box INTEGER NOT NULL,
                memory_strength REAL NOT NULL,
                next_review TEXT NOT NULL,
                last_reviewed TEXT,
                total_reviews INTEGER NOT NULL DEFAULT 0,
                correct_reviews INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_cards_user_due ON cards(user_id, next_review);

            CREATE TABLE IF NOT EXISTS review_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                card_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                algorithm TEXT NOT NULL,
                quality INTEGER NOT NULL,
                response_time_secs REAL,
                interval_after REAL NOT NULL,
                reviewed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_review_log_user_time ON review_log(user_id, reviewed_at);
        "#,
        )
        .map_err(db)?;
        Ok(())
    }

    fn lock(&self) -> RehearseResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RehearseError::Internal("SQLite connection lock poisoned".to_string()))
    }

    fn row_to_card(row: &Row<'_>) -> RehearseResult<Card> {
        let algorithm: String = row.get(2).map_err(db)?;
        let learning_state: String = row.get(3).map_err(db)?;
        let next_review: String = row.get(9).map_err(db)?;
        let last_reviewed: Option<String> = row.get(10).map_err(db)?;
        let created_at: String = row.get(13).map_err(db)?;
        let version: i64 = row.get(14).map_err(db)?;

        Ok(Card {
            id: row.get(0).map_err(db)?,
            user_id: row.get(1).map_err(db)?,
            algorithm: Algorithm::parse(&algorithm)?,
            learning_state: LearningState::parse(&learning_state)
                .map_err(|e| RehearseError::corrupt_row(e.to_string()))?,
            interval: row.get(4).map_err(db)?,
            repetitions: row.get(5).map_err(db)?,
            ease_factor: row.get(6).map_err(db)?,
            leitner_box: row.get(7).map_err(db)?,
            memory_strength: row.get(8).map_err(db)?,
            next_review: parse_time(&next_review)?,
            last_reviewed: last_reviewed.as_deref().map(parse_time).transpose()?,
            total_reviews: row.get(11).map_err(db)?,
            correct_reviews: row.get(12).map_err(db)?,
            created_at: parse_time(&created_at)?,
            version: version as u64,
        })
    }

    fn row_to_entry(row: &Row<'_>) -> RehearseResult<ReviewLogEntry> {
        let algorithm: String = row.get(2).map_err(db)?;
        let quality: i64 = row.get(3).map_err(db)?;
        let reviewed_at: String = row.get(6).map_err(db)?;

        Ok(ReviewLogEntry {
            card_id: row.get(0).map_err(db)?,
            user_id: row.get(1).map_err(db)?,
            algorithm: Algorithm::parse(&algorithm)?,
            quality: Quality::new(quality)
                .map_err(|e| RehearseError::corrupt_row(e.to_string()))?,
            response_time_secs: row.get(4).map_err(db)?,
            interval_after: row.get(5).map_err(db)?,
            reviewed_at: parse_time(&reviewed_at)?,
        })
    }

    fn load_in(conn: &Connection, card_id: &str) -> RehearseResult<Option<Card>> {
        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLUMNS))
            .map_err(db)?;

        stmt.query_row(params![card_id], |row| Ok(Self::row_to_card(row)))
            .optional()
            .map_err(db)?
            .transpose()
    }

    /// Overwrite every mutable column of `card` if the stored version is
    /// `expected`, bumping it. Returns the stored card.
    fn write_versioned(conn: &Connection, card: &Card, expected: u64) -> RehearseResult<Card> {
        let updated = conn
            .execute(
                r#"UPDATE cards SET
                   user_id = ?3, algorithm = ?4, learning_state = ?5, interval = ?6,
                   repetitions = ?7, ease_factor = ?8, leitner_box = ?9, memory_strength = ?10,
                   next_review = ?11, last_reviewed = ?12, total_reviews = ?13,
                   correct_reviews = ?14, version = version + 1
                   WHERE id = ?1 AND version = ?2"#,
                params![
                    card.id,
                    expected as i64,
                    card.user_id,
                    card.algorithm.as_str(),
                    card.learning_state.as_str(),
                    card.interval,
                    card.repetitions,
                    card.ease_factor,
                    card.leitner_box,
                    card.memory_strength,
                    format_time(card.next_review),
                    card.last_reviewed.map(format_time),
                    card.total_reviews,
                    card.correct_reviews,
                ],
            )
            .map_err(db)?;

        match Self::load_in(conn, &card.id)? {
            Some(stored) if updated == 1 => Ok(stored),
            Some(stored) => Err(RehearseError::stale_card(&card.id, expected, stored.version)),
            None => Err(RehearseError::card_not_found(&card.id)),
        }
    }
}

#[async_trait]
impl CardRepository for SqliteCardRepository {
    async fn load(&self, card_id: &str) -> RehearseResult<Card> {
        let conn = self.lock()?;
        Self::load_in(&conn, card_id)?.ok_or_else(|| RehearseError::card_not_found(card_id))
    }

    async fn insert(&self, card: Card) -> RehearseResult<Card> {
        card.validate()?;
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO cards ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, 0)",
                CARD_COLUMNS
            ),
            params![
                card.id,
                card.user_id,
                card.algorithm.as_str(),
                card.learning_state.as_str(),
                card.interval,
                card.repetitions,
                card.ease_factor,
                card.leitner_box,
                card.memory_strength,
                format_time(card.next_review),
                card.last_reviewed.map(format_time),
                card.total_reviews,
                card.correct_reviews,
                format_time(card.created_at),
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                RehearseError::validation(format!("Card {} already exists", card.id))
            }
            other => db(other),
        })?;

        debug!(card_id = %card.id, user_id = %card.user_id, "Inserted card");
        Self::load_in(&conn, &card.id)?.ok_or_else(|| RehearseError::card_not_found(&card.id))
    }

    async fn save(&self, card: &Card) -> RehearseResult<Card> {
        card.validate()?;
        let conn = self.lock()?;
        Self::write_versioned(&conn, card, card.version)
    }

    async fn apply_patch(&self, card_id: &str, patch: &CardPatch) -> RehearseResult<Card> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db)?;

        let current =
            Self::load_in(&tx, card_id)?.ok_or_else(|| RehearseError::card_not_found(card_id))?;
        if current.version != patch.expected_version {
            return Err(RehearseError::stale_card(
                card_id,
                patch.expected_version,
                current.version,
            ));
        }

        let stored = Self::write_versioned(&tx, &patch.applied_to(&current), patch.expected_version)?;
        tx.commit().map_err(db)?;

        debug!(card_id, fields = ?patch.changed_fields(), version = stored.version, "Applied card patch");
        Ok(stored)
    }

    async fn query_due(
        &self,
        user_id: &str,
        filter: &CardFilter,
        now: DateTime<Utc>,
        limit: usize,
    ) -> RehearseResult<Vec<Card>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                r#"SELECT {} FROM cards
                   WHERE user_id = ?1 AND next_review <= ?2
                     AND (?3 IS NULL OR algorithm = ?3)
                     AND (?4 IS NULL OR learning_state = ?4)
                   ORDER BY next_review ASC, id ASC
                   LIMIT ?5"#,
                CARD_COLUMNS
            ))
            .map_err(db)?;

        let rows = stmt
            .query_map(
                params![
                    user_id,
                    format_time(now),
                    filter.algorithm.map(|a| a.as_str()),
                    filter.learning_state.map(|s| s.as_str()),
                    limit.min(i64::MAX as usize) as i64,
                ],
                |row| Ok(Self::row_to_card(row)),
            )
            .map_err(db)?;

        rows.map(|r| r.map_err(db).and_then(|inner| inner)).collect()
    }

    async fn query_all(&self, user_id: &str) -> RehearseResult<Vec<Card>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM cards WHERE user_id = ?1 ORDER BY created_at ASC, id ASC",
                CARD_COLUMNS
            ))
            .map_err(db)?;

        let rows = stmt
            .query_map(params![user_id], |row| Ok(Self::row_to_card(row)))
            .map_err(db)?;

        rows.map(|r| r.map_err(db).and_then(|inner| inner)).collect()
    }

    async fn append_review_log(&self, entry: &ReviewLogEntry) -> RehearseResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"INSERT INTO review_log
               (card_id, user_id, algorithm, quality, response_time_secs, interval_after, reviewed_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                entry.card_id,
                entry.user_id,
                entry.algorithm.as_str(),
                entry.quality.value(),
                entry.response_time_secs,
                entry.interval_after,
                format_time(entry.reviewed_at),
            ],
        )
        .map_err(db)?;
        Ok(())
    }

    async fn query_review_log(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> RehearseResult<Vec<ReviewLogEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                r#"SELECT card_id, user_id, algorithm, quality, response_time_secs, interval_after, reviewed_at
                   FROM review_log
                   WHERE user_id = ?1 AND reviewed_at >= ?2
                   ORDER BY reviewed_at ASC, id ASC"#,
            )
            .map_err(db)?;

        let rows = stmt
            .query_map(params![user_id, format_time(since)], |row| Ok(Self::row_to_entry(row)))
            .map_err(db)?;

        rows.map(|r| r.map_err(db).and_then(|inner| inner)).collect()
    }
}

fn db(e: rusqlite::Error) -> RehearseError {
    RehearseError::database_with_source(e.to_string(), e)
}

fn format_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(s: &str) -> RehearseResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RehearseError::corrupt_row(format!("Invalid timestamp {:?}: {}", s, e)))
}
