//! Chat message persistence.
//!
//! - `MemoryMessageStore`: in-process storage using DashMap (default)
//! - `PostgresMessageStore`: the marketplace `message` table via sqlx
//!
//! Use `create_message_store()` to pick a backend from configuration.

mod backend;
mod memory_backend;
mod postgres_backend;

use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::postgres::PostgresPool;

pub use backend::{ChatSummary, MessageStore, NewMessage, StoreError, StoredMessage};
pub use memory_backend::MemoryMessageStore;
pub use postgres_backend::PostgresMessageStore;

/// Create a message store based on configuration.
///
/// - `"postgres"`: a `PostgresMessageStore` if a pool is provided
/// - `"memory"` (default): a `MemoryMessageStore`
pub fn create_message_store(
    settings: &DatabaseConfig,
    postgres_pool: Option<&PostgresPool>,
) -> Arc<dyn MessageStore> {
    match settings.backend.as_str() {
        "postgres" => {
            if let Some(pool) = postgres_pool {
                tracing::info!(backend = "postgres", "Creating PostgreSQL message store");
                Arc::new(PostgresMessageStore::new(pool.pool().clone()))
            } else {
                tracing::warn!(
                    "PostgreSQL message store requested but no pool provided, falling back to memory"
                );
                Arc::new(MemoryMessageStore::new())
            }
        }
        _ => {
            tracing::info!(backend = "memory", "Creating memory message store");
            Arc::new(MemoryMessageStore::new())
        }
    }
}
