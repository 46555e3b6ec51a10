//! PostgreSQL-backed credential store.
//!
//! Credential ids are raw bytes in the core; the database keys them as
//! base64url TEXT for readable rows and index-friendly equality. The
//! counter advance is a single conditional UPDATE, which is what makes the
//! clone check race-free across concurrent authentications.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use async_trait::async_trait;
use passgate_core::{
    CounterAdvance, Credential, CredentialStore, DeviceType, StoreError, StoredCounters,
};

/// PostgreSQL-backed credential storage
pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    /// Connect to the database.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        tracing::info!("Connected to PostgreSQL database");
        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        tracing::info!("Database migrations completed");
        Ok(())
    }

    async fn exists(&self, encoded_id: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM credentials WHERE credential_id = $1)",
        )
        .bind(encoded_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn check_health(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn find_by_credential_id(&self, id: &[u8]) -> Result<Option<Credential>, StoreError> {
        let encoded_id = URL_SAFE_NO_PAD.encode(id);
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT credential_id, owner_user_id, public_key, sign_counter,
                   fallback_counter, device_type, created_at, last_used_at
            FROM credentials
            WHERE credential_id = $1
            "#,
        )
        .bind(&encoded_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        row.map(CredentialRow::into_credential).transpose()
    }

    async fn create(&self, credential: Credential) -> Result<(), StoreError> {
        let encoded_id = URL_SAFE_NO_PAD.encode(&credential.credential_id);
        let result = sqlx::query(
            r#"
            INSERT INTO credentials
                (credential_id, owner_user_id, public_key, sign_counter,
                 fallback_counter, device_type, created_at, last_used_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&encoded_id)
        .bind(&credential.owner_user_id)
        .bind(&credential.public_key)
        .bind(credential.counters.sign_counter as i64)
        .bind(credential.counters.fallback_counter as i64)
        .bind(credential.device_type.as_str())
        .bind(credential.created_at)
        .bind(credential.last_used_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                tracing::info!(credential_id = %encoded_id, "credential stored in database");
                Ok(())
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::Conflict),
            Err(e) => Err(StoreError::Unavailable(e.to_string())),
        }
    }

    async fn advance_counter(
        &self,
        id: &[u8],
        advance: CounterAdvance,
        used_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let encoded_id = URL_SAFE_NO_PAD.encode(id);

        // The WHERE clause carries the strict-increase condition into the
        // database, so a concurrent advance with stale state affects zero
        // rows instead of rewinding the counter.
        let query = match advance {
            CounterAdvance::Hardware(_) => {
                r#"
                UPDATE credentials
                SET sign_counter = $2, last_used_at = $3
                WHERE credential_id = $1 AND sign_counter < $2
                "#
            }
            CounterAdvance::Fallback(_) => {
                r#"
                UPDATE credentials
                SET fallback_counter = $2, last_used_at = $3
                WHERE credential_id = $1 AND fallback_counter < $2
                "#
            }
        };

        let result = sqlx::query(query)
            .bind(&encoded_id)
            .bind(advance.value() as i64)
            .bind(used_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Zero rows: either the credential is gone or the condition failed.
        if self.exists(&encoded_id).await? {
            Err(StoreError::Conflict)
        } else {
            Err(StoreError::NotFound)
        }
    }
}

/// Database row for credentials
#[derive(sqlx::FromRow)]
struct CredentialRow {
    credential_id: String,
    owner_user_id: String,
    public_key: Vec<u8>,
    sign_counter: i64,
    fallback_counter: i64,
    device_type: String,
    created_at: DateTime<Utc>,
    last_used_at: DateTime<Utc>,
}

impl CredentialRow {
    fn into_credential(self) -> Result<Credential, StoreError> {
        let credential_id = URL_SAFE_NO_PAD
            .decode(&self.credential_id)
            .map_err(|e| StoreError::Unavailable(format!("corrupt credential id: {e}")))?;

        Ok(Credential {
            credential_id,
            owner_user_id: self.owner_user_id,
            public_key: self.public_key,
            counters: StoredCounters {
                sign_counter: self.sign_counter as u32,
                fallback_counter: self.fallback_counter as u32,
            },
            device_type: DeviceType::from_str_lossy(&self.device_type),
            created_at: self.created_at,
            last_used_at: self.last_used_at,
        })
    }
}

impl std::fmt::Debug for PostgresCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresCredentialStore")
            .field("pool", &"<PgPool>")
            .finish()
    }
}
