//! Axum-based HTTP gateway exposing the integration surface: credential
//! management, the OAuth2 authorize/callback pair, sync triggers, and the
//! authenticated passthrough.

mod handlers;

use handlers::{
    handle_authorize, handle_callback, handle_get_config, handle_health, handle_proxy,
    handle_save_config, handle_sync_contracts, handle_sync_customers,
};

use crate::auth::TokenManager;
use crate::config::Config;
use crate::contaazul::ApiClient;
use crate::storage::SqliteStore;
use crate::sync::SyncEngine;
use anyhow::Result;
use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

/// Maximum request body size (64KB)
pub const MAX_BODY_SIZE: usize = 65_536;
/// Wall-clock ceiling for any request, sync runs included. The engine has
/// no internal timeout; this layer is the bound.
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub store: SqliteStore,
    pub tokens: TokenManager,
    pub engine: SyncEngine,
    pub client: ApiClient,
    /// Where the browser lands after the vendor callback completes.
    pub app_return_url: String,
}

impl AppState {
    pub fn from_parts(store: SqliteStore, config: &Config) -> Self {
        let client = ApiClient::new(&config.vendor.auth_base, &config.vendor.api_base);
        let tokens = TokenManager::new(store.clone(), client.clone(), config.oauth_redirect_uri());
        let engine = SyncEngine::new(
            store.clone(),
            tokens.clone(),
            client.clone(),
            config.vendor.page_size,
        );
        Self {
            store,
            tokens,
            engine,
            client,
            app_return_url: format!(
                "{}/integrations/contaazul",
                config.public_app_url.trim_end_matches('/')
            ),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/integrations/contaazul/config", get(handle_get_config))
        .route("/integrations/contaazul/config", post(handle_save_config))
        .route("/integrations/contaazul/authorize", get(handle_authorize))
        .route("/integrations/contaazul/callback", get(handle_callback))
        .route(
            "/integrations/contaazul/sync/customers",
            post(handle_sync_customers),
        )
        .route(
            "/integrations/contaazul/sync/contracts",
            post(handle_sync_contracts),
        )
        .route("/integrations/contaazul/proxy", post(handle_proxy))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

/// Run the HTTP gateway.
pub async fn run_gateway(host: &str, port: u16, config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    run_gateway_with_listener(listener, config).await
}

/// Run the HTTP gateway from a pre-bound listener.
pub async fn run_gateway_with_listener(
    listener: tokio::net::TcpListener,
    config: Config,
) -> Result<()> {
    let addr = listener.local_addr()?;
    let store = SqliteStore::open(&config.database_path).await?;
    let state = AppState::from_parts(store, &config);

    info!(%addr, "gateway listening");
    info!("  GET  /health");
    info!("  GET  /integrations/contaazul/config");
    info!("  POST /integrations/contaazul/config");
    info!("  GET  /integrations/contaazul/authorize");
    info!("  GET  /integrations/contaazul/callback");
    info!("  POST /integrations/contaazul/sync/customers");
    info!("  POST /integrations/contaazul/sync/contracts");
    info!("  POST /integrations/contaazul/proxy");

    let app = build_router(state);
    axum::serve(listener, app).await?;
    Ok(())
}
