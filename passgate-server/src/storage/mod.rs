//! Credential storage module
//!
//! Credentials are persisted in PostgreSQL so they survive server restarts.
//! If `DATABASE_URL` is not set, falls back to the in-memory store (useful
//! for development and tests, but credentials will be lost on restart).
//! Challenges never touch storage: they ride in signed tokens on the client.

mod postgres;

pub use postgres::PostgresCredentialStore;

use std::sync::Arc;

use passgate_core::{CredentialStore, MemoryCredentialStore, StoreError};

/// Build the credential store from environment.
///
/// Uses PostgreSQL if `DATABASE_URL` is set, otherwise falls back to memory.
pub async fn from_env() -> Result<Arc<dyn CredentialStore>, StoreError> {
    match std::env::var("DATABASE_URL") {
        Ok(url) if !url.is_empty() => {
            tracing::info!("Using PostgreSQL credential storage");
            let store = PostgresCredentialStore::connect(&url).await?;
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        _ => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage - credentials will be lost on restart!");
            Ok(Arc::new(MemoryCredentialStore::new()))
        }
    }
}
