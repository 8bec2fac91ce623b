//! Error types for rehearse operations.
//!
//! Every failure carries a structured [`ErrorCode`] for programmatic handling
//! and, where useful, a suggestion for resolving it. Quality and algorithm
//! errors always include the offending value.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for rehearse operations.
pub type RehearseResult<T> = Result<T, RehearseError>;

/// Main error type for all rehearse operations.
#[derive(Error, Debug)]
pub enum RehearseError {
    /// Review quality outside the 0-5 grading scale.
    #[error("Invalid review quality {value}: must be an integer between 0 and 5")]
    InvalidQuality { value: i64 },

    /// Unknown or unsupported scheduling algorithm.
    #[error("Unsupported scheduling algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// Card missing from the repository.
    #[error("Card not found: {card_id}")]
    CardNotFound { card_id: String },

    /// Optimistic-concurrency conflict on save.
    #[error(
        "Stale card {card_id}: expected version {expected_version}, stored version is {actual_version}"
    )]
    StaleCard {
        card_id: String,
        expected_version: u64,
        actual_version: u64,
    },

    /// Review session id not registered with the service.
    #[error("Review session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// Review submitted to a session that has already finished.
    #[error("Review session {session_id} is finished")]
    SessionFinished { session_id: String },

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// Repository/database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Quality (QUAL_xxx)
    QualOutOfRange,

    // Algorithm (ALG_xxx)
    AlgUnsupported,

    // Card (CARD_xxx)
    CardNotFound,
    CardStale,

    // Session (SES_xxx)
    SesNotFound,
    SesFinished,

    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,
    ValInvalidConfig,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,
    DbCorruptRow,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::QualOutOfRange => "QUAL_001",
            ErrorCode::AlgUnsupported => "ALG_001",
            ErrorCode::CardNotFound => "CARD_001",
            ErrorCode::CardStale => "CARD_002",
            ErrorCode::SesNotFound => "SES_001",
            ErrorCode::SesFinished => "SES_002",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::ValInvalidConfig => "VAL_003",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::DbCorruptRow => "DB_003",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl RehearseError {
    /// Create an invalid quality error.
    pub fn invalid_quality(value: impl Into<i64>) -> Self {
        Self::InvalidQuality {
            value: value.into(),
        }
    }

    /// Create an unsupported algorithm error.
    pub fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }

    /// Create a card not found error.
    pub fn card_not_found(card_id: impl Into<String>) -> Self {
        Self::CardNotFound {
            card_id: card_id.into(),
        }
    }

    /// Create a stale card error.
    pub fn stale_card(card_id: impl Into<String>, expected_version: u64, actual_version: u64) -> Self {
        Self::StaleCard {
            card_id: card_id.into(),
            expected_version,
            actual_version,
        }
    }

    /// Create a session not found error.
    pub fn session_not_found(session_id: impl ToString) -> Self {
        Self::SessionNotFound {
            session_id: session_id.to_string(),
        }
    }

    /// Create a session finished error.
    pub fn session_finished(session_id: impl ToString) -> Self {
        Self::SessionFinished {
            session_id: session_id.to_string(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create a validation error for a required field left empty.
    pub fn missing_field(field: impl Into<String>) -> Self {
        let field = field.into();
        let mut details = HashMap::new();
        details.insert("field".to_string(), field.clone());
        Self::Validation {
            message: format!("{} must not be empty", field),
            code: ErrorCode::ValMissingField,
            details,
            suggestion: None,
        }
    }

    /// Create a validation error naming the card field that breaks an invariant.
    pub fn invalid_card(card_id: &str, field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let mut details = HashMap::new();
        details.insert("card_id".to_string(), card_id.to_string());
        details.insert("field".to_string(), field.clone());
        Self::Validation {
            message: format!("Card {}: {} {}", card_id, field, message.into()),
            code: ErrorCode::ValInvalidInput,
            details,
            suggestion: None,
        }
    }

    /// Create a configuration validation error naming the offending field.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let mut details = HashMap::new();
        details.insert("field".to_string(), field.clone());
        Self::Validation {
            message: format!("{}: {}", field, message.into()),
            code: ErrorCode::ValInvalidConfig,
            details,
            suggestion: Some("Check the configuration file or environment overrides".to_string()),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create an error for a database that cannot be opened.
    pub fn connection_failed(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbConnectionFailed,
            source: Some(Box::new(source)),
        }
    }

    /// Create a database error wrapping its source.
    pub fn database_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(source)),
        }
    }

    /// Create a database error for a row that cannot be decoded.
    pub fn corrupt_row(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbCorruptRow,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidQuality { .. } => ErrorCode::QualOutOfRange,
            Self::UnsupportedAlgorithm { .. } => ErrorCode::AlgUnsupported,
            Self::CardNotFound { .. } => ErrorCode::CardNotFound,
            Self::StaleCard { .. } => ErrorCode::CardStale,
            Self::SessionNotFound { .. } => ErrorCode::SesNotFound,
            Self::SessionFinished { .. } => ErrorCode::SesFinished,
            Self::Validation { code, .. } => *code,
            Self::Database { code, .. } => *code,
            Self::Configuration(_) => ErrorCode::ValInvalidConfig,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether the caller may recover by re-reading and retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StaleCard { .. })
    }

    /// Whether this error maps to a "not found" response at an API boundary.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CardNotFound { .. } | Self::SessionNotFound { .. }
        )
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::InvalidQuality { .. } => {
                Some("Grade recall from 0 (complete blackout) to 5 (perfect recall)")
            }
            Self::UnsupportedAlgorithm { .. } => Some("Use one of: sm2, leitner"),
            Self::CardNotFound { .. } => Some("Please check the card ID and ensure it exists"),
            Self::Database {
                code: ErrorCode::DbConnectionFailed,
                ..
            } => Some("Check that the database path exists and is writable"),
            Self::StaleCard { .. } => {
                Some("Re-read the card and recompute the review before saving again")
            }
            Self::SessionNotFound { .. } => Some("Start a new review session"),
            Self::SessionFinished { .. } => Some("Start a new review session to keep reviewing"),
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }
}
