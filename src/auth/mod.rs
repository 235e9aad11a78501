//! OAuth2 token lifecycle against the vendor: credential storage,
//! authorization-code exchange, and access-token refresh with per-tenant
//! single-flight.

mod locks;

pub use locks::TenantLocks;

use crate::contaazul::ApiClient;
use crate::error::TokenError;
use crate::storage::{SqliteStore, TokenRecord};
use chrono::Utc;
use tracing::{debug, info};
use url::Url;

/// Tokens within this many seconds of expiry are refreshed eagerly, so a
/// token handed to a caller cannot expire mid-request.
pub const EXPIRY_SAFETY_MARGIN_SECS: i64 = 300;

/// Hands out vendor access tokens, refreshing them when stale. One refresh
/// at a time per tenant; concurrent callers wait and reuse the result.
#[derive(Clone)]
pub struct TokenManager {
    store: SqliteStore,
    client: ApiClient,
    locks: TenantLocks,
    redirect_uri: String,
}

impl TokenManager {
    pub fn new(store: SqliteStore, client: ApiClient, redirect_uri: String) -> Self {
        Self {
            store,
            client,
            locks: TenantLocks::new(),
            redirect_uri,
        }
    }

    /// A usable access token for the tenant. Returns the stored token when
    /// it is comfortably inside its lifetime, otherwise performs a refresh
    /// exchange and persists the rotated pair before returning.
    pub async fn valid_token(&self, tenant_id: i64) -> Result<String, TokenError> {
        if tenant_id <= 0 {
            return Err(TokenError::InvalidTenant);
        }

        let _guard = self.locks.acquire(tenant_id).await;

        // Re-read under the lock: a waiter may find the token another
        // caller just refreshed.
        let record = self.require_record(tenant_id).await?;
        let refresh_token = record.refresh_token.clone().ok_or(TokenError::NotConfigured {
            tenant_id,
            reason: "authorization not completed",
        })?;

        if let Some(access_token) = &record.access_token {
            if !record.is_stale(Utc::now(), EXPIRY_SAFETY_MARGIN_SECS) {
                debug!(tenant_id, "reusing stored access token");
                return Ok(access_token.clone());
            }
        }

        info!(tenant_id, "access token stale, refreshing");
        let refreshed = self
            .client
            .refresh_token(&record.client_id, &record.client_secret, &refresh_token)
            .await?;
        self.store
            .store_token_pair(
                tenant_id,
                &refreshed.access_token,
                &refreshed.refresh_token,
                refreshed.expires_in,
            )
            .await?;
        info!(tenant_id, expires_in = refreshed.expires_in, "token refreshed");
        Ok(refreshed.access_token)
    }

    /// Trade the authorization code from the vendor callback for a token
    /// pair and persist it.
    pub async fn exchange_authorization_code(
        &self,
        tenant_id: i64,
        code: &str,
    ) -> Result<(), TokenError> {
        if tenant_id <= 0 {
            return Err(TokenError::InvalidTenant);
        }

        let _guard = self.locks.acquire(tenant_id).await;

        let record = self.require_record(tenant_id).await?;
        let exchanged = self
            .client
            .exchange_code(
                &record.client_id,
                &record.client_secret,
                code,
                &self.redirect_uri,
            )
            .await?;
        self.store
            .store_token_pair(
                tenant_id,
                &exchanged.access_token,
                &exchanged.refresh_token,
                exchanged.expires_in,
            )
            .await?;
        info!(tenant_id, "authorization code exchanged");
        Ok(())
    }

    /// Vendor login URL for the tenant, using its stored client id.
    pub async fn authorize_url(&self, tenant_id: i64) -> Result<Url, TokenError> {
        if tenant_id <= 0 {
            return Err(TokenError::InvalidTenant);
        }
        let record = self.require_record(tenant_id).await?;
        self.client
            .authorize_url(&record.client_id, &self.redirect_uri, tenant_id)
            .map_err(|_| TokenError::NotConfigured {
                tenant_id,
                reason: "authorize URL could not be built",
            })
    }

    async fn require_record(&self, tenant_id: i64) -> Result<TokenRecord, TokenError> {
        self.store
            .find_token_record(tenant_id)
            .await?
            .ok_or(TokenError::NotConfigured {
                tenant_id,
                reason: "no credentials saved",
            })
    }
}
