//! Configuration system for rehearse.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{RehearseError, RehearseResult};
use crate::types::{Algorithm, MAX_INTERVAL_DAYS, MAX_LEITNER_BOX, MIN_EASE_FACTOR};

/// SM-2 parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sm2Config {
    /// Ease factor assigned to new cards.
    pub initial_ease_factor: f64,
    /// Floor for the ease factor.
    pub min_ease_factor: f64,
    /// Interval after the first pass, in days.
    pub first_interval: f64,
    /// Interval after the second consecutive pass, in days.
    pub second_interval: f64,
    /// Ceiling for the ease-driven interval, in days.
    pub max_interval: f64,
}

impl Default for Sm2Config {
    fn default() -> Self {
        Self {
            initial_ease_factor: 2.5,
            min_ease_factor: MIN_EASE_FACTOR,
            first_interval: 1.0,
            second_interval: 6.0,
            max_interval: MAX_INTERVAL_DAYS,
        }
    }
}

/// Leitner parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeitnerConfig {
    /// Interval in days for boxes 1 through 5.
    pub box_intervals: Vec<f64>,
}

impl Default for LeitnerConfig {
    fn default() -> Self {
        Self {
            box_intervals: vec![1.0, 3.0, 7.0, 14.0, 30.0],
        }
    }
}

impl LeitnerConfig {
    /// Interval for a box, clamping the box into `1..=5`.
    pub fn interval_for(&self, leitner_box: u8) -> f64 {
        let idx = leitner_box.clamp(1, MAX_LEITNER_BOX) as usize - 1;
        self.box_intervals
            .get(idx)
            .copied()
            .unwrap_or(1.0)
            .min(MAX_INTERVAL_DAYS)
    }
}

/// Memory-strength dynamics shared by both algorithms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Strength of a fresh card.
    pub initial_strength: f64,
    /// Per-grade gain on a pass: `strength × (1 + gain × (q − 2))`.
    pub strength_gain: f64,
    /// Multiplier applied on a lapse.
    pub lapse_penalty: f64,
    /// Floor applied after a lapse.
    pub min_strength: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            initial_strength: 1.0,
            strength_gain: 0.1,
            lapse_penalty: 0.5,
            min_strength: 1.0,
        }
    }
}

/// Review session parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Card limit used when a caller does not give one.
    pub default_limit: usize,
    /// Retries after a `StaleCard` conflict.
    pub stale_retry_attempts: usize,
    /// First backoff delay between stale retries, in milliseconds.
    pub stale_retry_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            stale_retry_attempts: 3,
            stale_retry_delay_ms: 10,
        }
    }
}

/// Study-plan heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Estimated seconds to review one card.
    pub seconds_per_card: u32,
    /// Weight of `1 − retention` in the priority score.
    pub retention_weight: f64,
    /// Weight of urgency in the priority score.
    pub urgency_weight: f64,
    /// Days overdue at which urgency saturates at 1.
    pub urgency_horizon_days: f64,
    /// Mean urgency above which the focus is catching up.
    pub urgency_threshold: f64,
    /// Mean retention below which the focus is difficult cards.
    pub difficult_retention: f64,
    /// Priority at or above which a card is high priority.
    pub high_priority: f64,
    /// Priority at or above which a card is medium priority.
    pub medium_priority: f64,
    /// Due cards considered per plan.
    pub max_candidates: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            seconds_per_card: 30,
            retention_weight: 0.6,
            urgency_weight: 0.4,
            urgency_horizon_days: 7.0,
            urgency_threshold: 0.5,
            difficult_retention: 0.5,
            high_priority: 0.7,
            medium_priority: 0.4,
            max_candidates: 500,
        }
    }
}

/// Daily load optimizer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Days of look-ahead in the load histogram.
    pub window_days: u32,
    /// Standard deviation, as a fraction of the target, still considered balanced.
    pub balance_tolerance: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            balance_tolerance: 0.25,
        }
    }
}

/// Dashboard and analytics parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Retention below which a card counts as at risk.
    pub at_risk_retention: f64,
    /// Upper bound for look-ahead schedules.
    pub max_days_ahead: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            at_risk_retention: 0.7,
            max_days_ahead: 365,
        }
    }
}

/// Card store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreProvider {
    /// Process-local, non-persistent.
    Memory,
    /// SQLite database file.
    #[default]
    Sqlite,
}

/// Card store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub provider: StoreProvider,
    /// Database path for file-backed stores.
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: StoreProvider::Sqlite,
            db_path: default_data_dir().join("cards.db"),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".rehearse"))
        .unwrap_or_else(|| PathBuf::from(".rehearse"))
}

/// Main rehearse configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RehearseConfig {
    /// Algorithm for newly created cards.
    pub default_algorithm: Algorithm,
    pub sm2: Sm2Config,
    pub leitner: LeitnerConfig,
    pub memory: MemoryConfig,
    pub session: SessionConfig,
    pub planner: PlannerConfig,
    pub optimizer: OptimizerConfig,
    pub analytics: AnalyticsConfig,
    pub store: StoreConfig,
}

impl RehearseConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> RehearseResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| RehearseError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| RehearseError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| RehearseError::Configuration(e.to_string()))?,
            _ => {
                return Err(RehearseError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables over the defaults.
    pub fn from_env() -> RehearseResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay `REHEARSE_*` environment variables.
    pub fn apply_env(&mut self) -> RehearseResult<()> {
        if let Ok(path) = std::env::var("REHEARSE_DB_PATH") {
            self.store.db_path = PathBuf::from(path);
        }

        if let Ok(provider) = std::env::var("REHEARSE_STORE") {
            self.store.provider = match provider.to_lowercase().as_str() {
                "memory" => StoreProvider::Memory,
                "sqlite" => StoreProvider::Sqlite,
                other => {
                    return Err(RehearseError::Configuration(format!(
                        "Unknown store provider: {}",
                        other
                    )))
                }
            };
        }

        if let Ok(algorithm) = std::env::var("REHEARSE_DEFAULT_ALGORITHM") {
            self.default_algorithm = Algorithm::parse(&algorithm)?;
        }

        if let Ok(limit) = std::env::var("REHEARSE_SESSION_LIMIT") {
            self.session.default_limit = limit.parse().map_err(|_| {
                RehearseError::Configuration(format!("Invalid REHEARSE_SESSION_LIMIT: {}", limit))
            })?;
        }

        self.validate()
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> RehearseResult<()> {
        if self.sm2.min_ease_factor < MIN_EASE_FACTOR {
            return Err(RehearseError::invalid_config(
                "sm2.min_ease_factor",
                format!("must be at least {}", MIN_EASE_FACTOR),
            ));
        }
        if self.sm2.initial_ease_factor < self.sm2.min_ease_factor {
            return Err(RehearseError::invalid_config(
                "sm2.initial_ease_factor",
                "must not be below sm2.min_ease_factor",
            ));
        }

        if !(self.sm2.second_interval..=MAX_INTERVAL_DAYS).contains(&self.sm2.max_interval) {
            return Err(RehearseError::invalid_config(
                "sm2.max_interval",
                format!(
                    "must be between sm2.second_interval and {} days",
                    MAX_INTERVAL_DAYS
                ),
            ));
        }

        let boxes = &self.leitner.box_intervals;
        if boxes.len() != MAX_LEITNER_BOX as usize {
            return Err(RehearseError::invalid_config(
                "leitner.box_intervals",
                format!("must have exactly {} entries", MAX_LEITNER_BOX),
            ));
        }
        if boxes[0] <= 0.0 || boxes.windows(2).any(|w| w[1] <= w[0]) {
            return Err(RehearseError::invalid_config(
                "leitner.box_intervals",
                "must be positive and strictly increasing",
            ));
        }
        if boxes.iter().any(|&days| days > MAX_INTERVAL_DAYS) {
            return Err(RehearseError::invalid_config(
                "leitner.box_intervals",
                format!("must not exceed {} days", MAX_INTERVAL_DAYS),
            ));
        }

        if self.memory.initial_strength <= 0.0
            || self.memory.lapse_penalty <= 0.0
            || self.memory.min_strength <= 0.0
        {
            return Err(RehearseError::invalid_config(
                "memory",
                "initial_strength, lapse_penalty and min_strength must be positive",
            ));
        }

        if self.planner.seconds_per_card == 0 {
            return Err(RehearseError::invalid_config(
                "planner.seconds_per_card",
                "must be positive",
            ));
        }
        if self.planner.retention_weight < 0.0 || self.planner.urgency_weight < 0.0 {
            return Err(RehearseError::invalid_config(
                "planner",
                "weights must not be negative",
            ));
        }
        if self.planner.urgency_horizon_days <= 0.0 {
            return Err(RehearseError::invalid_config(
                "planner.urgency_horizon_days",
                "must be positive",
            ));
        }

        if self.optimizer.window_days == 0 {
            return Err(RehearseError::invalid_config(
                "optimizer.window_days",
                "must be positive",
            ));
        }

        Ok(())
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> RehearseConfigBuilder {
        RehearseConfigBuilder::default()
    }
}

/// Builder for RehearseConfig.
#[derive(Default)]
pub struct RehearseConfigBuilder {
    config: RehearseConfig,
}

impl RehearseConfigBuilder {
    /// Set the algorithm for new cards.
    pub fn default_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.config.default_algorithm = algorithm;
        self
    }

    /// Set SM-2 parameters.
    pub fn sm2(mut self, config: Sm2Config) -> Self {
        self.config.sm2 = config;
        self
    }

    /// Set the Leitner interval table.
    pub fn leitner_intervals(mut self, intervals: Vec<f64>) -> Self {
        self.config.leitner.box_intervals = intervals;
        self
    }

    /// Set memory-strength parameters.
    pub fn memory(mut self, config: MemoryConfig) -> Self {
        self.config.memory = config;
        self
    }

    /// Set session parameters.
    pub fn session(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Set study-plan parameters.
    pub fn planner(mut self, config: PlannerConfig) -> Self {
        self.config.planner = config;
        self
    }

    /// Set load optimizer parameters.
    pub fn optimizer(mut self, config: OptimizerConfig) -> Self {
        self.config.optimizer = config;
        self
    }

    /// Set analytics parameters.
    pub fn analytics(mut self, config: AnalyticsConfig) -> Self {
        self.config.analytics = config;
        self
    }

    /// Set the card store.
    pub fn store(mut self, config: StoreConfig) -> Self {
        self.config.store = config;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> RehearseResult<RehearseConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
