use super::types::{ContractPage, CustomerPage, TokenResponse};
use crate::error::{SyncError, TokenError};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// HTTP client for the vendor's OAuth2 and collection endpoints.
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    auth_base: String,
    api_base: String,
}

/// Outcome of an authenticated passthrough GET: the upstream status plus
/// the body, as JSON when the vendor says so and as text otherwise.
#[derive(Debug, serde::Serialize)]
pub struct ProxyOutcome {
    pub status: u16,
    pub data: Value,
}

fn build_vendor_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Basic-auth payload for the token endpoint. The vendor's console tends to
/// hand out credentials with stray whitespace from copy/paste, so both
/// halves are trimmed before encoding.
pub(crate) fn basic_auth_value(client_id: &str, client_secret: &str) -> String {
    let encoded = BASE64.encode(format!("{}:{}", client_id.trim(), client_secret.trim()));
    format!("Basic {encoded}")
}

impl ApiClient {
    pub fn new(auth_base: &str, api_base: &str) -> Self {
        Self {
            http: build_vendor_client(),
            auth_base: auth_base.trim_end_matches('/').to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    // ── OAuth2 token endpoint ─────────────────────────────────────

    pub async fn refresh_token(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse, TokenError> {
        let response = self
            .http
            .post(format!("{}/oauth2/token", self.auth_base))
            .header(reqwest::header::AUTHORIZATION, basic_auth_value(client_id, client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TokenError::RefreshFailed { detail });
        }
        Ok(response.json().await?)
    }

    pub async fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, TokenError> {
        let response = self
            .http
            .post(format!("{}/oauth2/token", self.auth_base))
            .header(reqwest::header::AUTHORIZATION, basic_auth_value(client_id, client_secret))
            .form(&[
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
                ("code", code),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TokenError::ExchangeFailed { detail });
        }
        Ok(response.json().await?)
    }

    /// Vendor login URL for the authorization-code redirect.
    pub fn authorize_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        tenant_id: i64,
    ) -> anyhow::Result<Url> {
        let state = tenant_id.to_string();
        let url = Url::parse_with_params(
            &format!("{}/login", self.auth_base),
            &[
                ("response_type", "code"),
                ("client_id", client_id.trim()),
                ("redirect_uri", redirect_uri),
                ("state", state.as_str()),
                ("scope", "openid profile aws.cognito.signin.user.admin"),
            ],
        )?;
        Ok(url)
    }

    // ── Collection endpoints ──────────────────────────────────────

    pub async fn fetch_customers_page(
        &self,
        access_token: &str,
        page: u32,
        page_size: u32,
    ) -> Result<CustomerPage, SyncError> {
        let response = self
            .http
            .get(format!("{}/v1/pessoas", self.api_base))
            .query(&[
                ("pagina", page.to_string()),
                ("tamanho_pagina", page_size.to_string()),
            ])
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = Self::reject_failed_page(page, response).await?;
        Ok(response.json().await?)
    }

    pub async fn fetch_contracts_page(
        &self,
        access_token: &str,
        page: u32,
        page_size: u32,
        date_from: &str,
        date_to: &str,
    ) -> Result<ContractPage, SyncError> {
        let response = self
            .http
            .get(format!("{}/v1/contratos", self.api_base))
            .query(&[
                ("pagina", page.to_string()),
                ("tamanho_pagina", page_size.to_string()),
                ("data_inicio", date_from.to_string()),
                ("data_fim", date_to.to_string()),
            ])
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = Self::reject_failed_page(page, response).await?;
        Ok(response.json().await?)
    }

    async fn reject_failed_page(page: u32, response: Response) -> Result<Response, SyncError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::Upstream { status, page, body })
    }

    // ── Passthrough ───────────────────────────────────────────────

    /// GET an arbitrary vendor endpoint with a Bearer token. Upstream status
    /// is reported, never treated as a failure here; only transport errors
    /// surface.
    pub async fn proxy_get(
        &self,
        access_token: &str,
        endpoint: &str,
    ) -> Result<ProxyOutcome, SyncError> {
        let path = if endpoint.starts_with('/') {
            endpoint.to_string()
        } else {
            format!("/{endpoint}")
        };

        let response = self
            .http
            .get(format!("{}{}", self.api_base, path))
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"));

        let data = if is_json {
            response.json::<Value>().await.unwrap_or(Value::Null)
        } else {
            Value::String(response.text().await.unwrap_or_default())
        };

        Ok(ProxyOutcome { status, data })
    }
}
