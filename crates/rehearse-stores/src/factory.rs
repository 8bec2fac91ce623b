//! Factory for creating card repositories.

use std::sync::Arc;

use tracing::debug;

use rehearse_core::config::{StoreConfig, StoreProvider};
use rehearse_core::error::RehearseResult;
use rehearse_core::traits::CardRepository;

use crate::memory::InMemoryCardRepository;

/// Factory for creating card repositories.
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create the repository selected by `config.provider`.
    pub fn create(config: &StoreConfig) -> RehearseResult<Arc<dyn CardRepository>> {
        match config.provider {
            StoreProvider::Memory => {
                debug!("Creating in-memory card repository");
                Ok(Arc::new(InMemoryCardRepository::new()))
            }

            #[cfg(feature = "sqlite")]
            StoreProvider::Sqlite => {
                if let Some(parent) = config.db_path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                debug!(path = %config.db_path.display(), "Creating SQLite card repository");
                let store = crate::sqlite::SqliteCardRepository::new(&config.db_path)?;
                Ok(Arc::new(store))
            }

            #[cfg(not(feature = "sqlite"))]
            StoreProvider::Sqlite => Err(rehearse_core::error::RehearseError::Configuration(
                "SQLite store requested but rehearse-stores was built without the `sqlite` feature"
                    .to_string(),
            )),
        }
    }
}
