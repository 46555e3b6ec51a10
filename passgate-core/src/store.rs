//! Credential store gateway.
//!
//! Thin interface over the persistence layer. The core only needs three
//! operations, but `advance_counter` carries a hard requirement: it must be
//! a single conditional write so two authentications racing on the same
//! credential cannot both pass the clone check with stale data. The loser
//! of the race gets [`StoreError::Conflict`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::counter::{CounterAdvance, StoredCounters};
use crate::error::StoreError;

/// Authenticator attachment recorded at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Platform,
    CrossPlatform,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Platform => "platform",
            DeviceType::CrossPlatform => "cross_platform",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "cross_platform" => DeviceType::CrossPlatform,
            _ => DeviceType::Platform,
        }
    }
}

/// Durable credential record.
///
/// `credential_id` is globally unique and immutable once created. After
/// creation the only mutations are the counter/timestamp updates performed
/// through [`CredentialStore::advance_counter`]; deletion is an external
/// administrative operation.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Raw credential id bytes as reported by the authenticator.
    pub credential_id: Vec<u8>,
    pub owner_user_id: String,
    /// COSE-encoded public key.
    pub public_key: Vec<u8>,
    pub counters: StoredCounters,
    pub device_type: DeviceType,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

/// Abstract gateway to wherever credentials persist.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_credential_id(&self, id: &[u8]) -> Result<Option<Credential>, StoreError>;

    /// Report backend liveness. Stores without an external dependency are
    /// always healthy.
    async fn check_health(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Persist a newly registered credential. Duplicate ids are
    /// [`StoreError::Conflict`].
    async fn create(&self, credential: Credential) -> Result<(), StoreError>;

    /// Atomically advance the credential's counter and last-used timestamp.
    ///
    /// Implementations must apply the write conditionally ("set counter to N
    /// where current counter < N") so a stale concurrent advance fails with
    /// [`StoreError::Conflict`] instead of silently rewinding.
    async fn advance_counter(
        &self,
        id: &[u8],
        advance: CounterAdvance,
        used_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// In-memory store for tests and single-process development.
///
/// Per-entry mutation runs under the map's shard lock, which gives the
/// conditional-update semantics `advance_counter` requires.
#[derive(Default)]
pub struct MemoryCredentialStore {
    credentials: DashMap<Vec<u8>, Credential>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_credential_id(&self, id: &[u8]) -> Result<Option<Credential>, StoreError> {
        Ok(self.credentials.get(id).map(|entry| entry.value().clone()))
    }

    async fn create(&self, credential: Credential) -> Result<(), StoreError> {
        use dashmap::mapref::entry::Entry;
        match self.credentials.entry(credential.credential_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                slot.insert(credential);
                Ok(())
            }
        }
    }

    async fn advance_counter(
        &self,
        id: &[u8],
        advance: CounterAdvance,
        used_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut entry = self.credentials.get_mut(id).ok_or(StoreError::NotFound)?;
        let credential = entry.value_mut();
        match advance {
            CounterAdvance::Hardware(n) => {
                if credential.counters.sign_counter >= n {
                    return Err(StoreError::Conflict);
                }
                credential.counters.sign_counter = n;
            }
            CounterAdvance::Fallback(n) => {
                if credential.counters.fallback_counter >= n {
                    return Err(StoreError::Conflict);
                }
                credential.counters.fallback_counter = n;
            }
        }
        credential.last_used_at = used_at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(id: &[u8]) -> Credential {
        let now = Utc::now();
        Credential {
            credential_id: id.to_vec(),
            owner_user_id: "user-1".into(),
            public_key: vec![0xA5],
            counters: StoredCounters::default(),
            device_type: DeviceType::Platform,
            created_at: now,
            last_used_at: now,
        }
    }

    #[tokio::test]
    async fn create_then_find() {
        let store = MemoryCredentialStore::new();
        store.create(credential(b"cred-1")).await.unwrap();
        let found = store.find_by_credential_id(b"cred-1").await.unwrap();
        assert_eq!(found.unwrap().owner_user_id, "user-1");
        assert!(store
            .find_by_credential_id(b"cred-2")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let store = MemoryCredentialStore::new();
        store.create(credential(b"cred-1")).await.unwrap();
        assert_eq!(
            store.create(credential(b"cred-1")).await.unwrap_err(),
            StoreError::Conflict
        );
    }

    #[tokio::test]
    async fn advance_is_conditional() {
        let store = MemoryCredentialStore::new();
        store.create(credential(b"cred-1")).await.unwrap();

        store
            .advance_counter(b"cred-1", CounterAdvance::Hardware(6), Utc::now())
            .await
            .unwrap();

        // A second advance with the same value must lose.
        assert_eq!(
            store
                .advance_counter(b"cred-1", CounterAdvance::Hardware(6), Utc::now())
                .await
                .unwrap_err(),
            StoreError::Conflict
        );

        let found = store
            .find_by_credential_id(b"cred-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.counters.sign_counter, 6);
    }

    #[tokio::test]
    async fn advance_missing_credential_is_not_found() {
        let store = MemoryCredentialStore::new();
        assert_eq!(
            store
                .advance_counter(b"nope", CounterAdvance::Fallback(1), Utc::now())
                .await
                .unwrap_err(),
            StoreError::NotFound
        );
    }

    #[tokio::test]
    async fn fallback_advance_updates_only_fallback() {
        let store = MemoryCredentialStore::new();
        store.create(credential(b"cred-1")).await.unwrap();
        store
            .advance_counter(b"cred-1", CounterAdvance::Fallback(1), Utc::now())
            .await
            .unwrap();
        let found = store
            .find_by_credential_id(b"cred-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.counters.fallback_counter, 1);
        assert_eq!(found.counters.sign_counter, 0);
    }
}
