//! rehearse-stores - Card repository implementations for rehearse.
//!
//! # Backends
//!
//! - **In-memory** - always available; hash maps behind a tokio `RwLock`
//! - **SQLite** (feature: `sqlite`, default) - single-file database via `rusqlite`
//!
//! Use [`RepositoryFactory`] to pick one from a [`StoreConfig`](rehearse_core::StoreConfig).

mod factory;
mod memory;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use factory::RepositoryFactory;
pub use memory::InMemoryCardRepository;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCardRepository;
