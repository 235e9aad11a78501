use super::SqliteStore;
use crate::error::StorageError;
use chrono::{DateTime, Duration, Utc};

/// One row per tenant/integration pair. Created (token-less) when a tenant
/// first saves vendor credentials; the token triple arrives later via the
/// authorization callback and is rotated by refresh exchanges.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TokenRecord {
    pub tenant_id: i64,
    pub client_id: String,
    pub client_secret: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    /// Stamp of the last successful token write; basis for expiry.
    pub updated_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Whether the stored access token is past `updated_at + expires_in`
    /// minus the safety margin.
    pub fn is_stale(&self, now: DateTime<Utc>, margin_secs: i64) -> bool {
        let expiry = self.updated_at + Duration::seconds(self.expires_in);
        now > expiry - Duration::seconds(margin_secs)
    }
}

impl SqliteStore {
    pub async fn find_token_record(
        &self,
        tenant_id: i64,
    ) -> Result<Option<TokenRecord>, StorageError> {
        let record = sqlx::query_as::<_, TokenRecord>(
            "SELECT tenant_id, client_id, client_secret, access_token, refresh_token,
                    expires_in, updated_at
             FROM integration_tokens WHERE tenant_id = ?1",
        )
        .bind(tenant_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(record)
    }

    /// Save (or replace) the tenant's vendor credentials. An existing token
    /// pair is left untouched so saving credentials never de-authorizes.
    pub async fn upsert_credentials(
        &self,
        tenant_id: i64,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenRecord, StorageError> {
        sqlx::query(
            "INSERT INTO integration_tokens (tenant_id, client_id, client_secret, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(tenant_id) DO UPDATE SET
                 client_id = excluded.client_id,
                 client_secret = excluded.client_secret",
        )
        .bind(tenant_id)
        .bind(client_id)
        .bind(client_secret)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;

        self.find_token_record(tenant_id)
            .await?
            .ok_or(StorageError::Sqlx(sqlx::Error::RowNotFound))
    }

    /// Persist a freshly issued token pair in a single atomic update.
    /// The rotated refresh token replaces the prior one; `updated_at` is
    /// stamped now so expiry math restarts from this write.
    pub async fn store_token_pair(
        &self,
        tenant_id: i64,
        access_token: &str,
        refresh_token: &str,
        expires_in: i64,
    ) -> Result<(), StorageError> {
        let outcome = sqlx::query(
            "UPDATE integration_tokens
             SET access_token = ?1, refresh_token = ?2, expires_in = ?3, updated_at = ?4
             WHERE tenant_id = ?5",
        )
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_in)
        .bind(Utc::now())
        .bind(tenant_id)
        .execute(self.pool())
        .await?;

        if outcome.rows_affected() == 0 {
            return Err(StorageError::Sqlx(sqlx::Error::RowNotFound));
        }
        Ok(())
    }
}
