use super::AppState;
use crate::error::{SyncError, TokenError};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

#[derive(Deserialize)]
pub(super) struct TenantQuery {
    pub tenant_id: i64,
}

#[derive(Deserialize)]
pub(super) struct SaveConfigBody {
    pub tenant_id: i64,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Deserialize)]
pub(super) struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct ProxyBody {
    pub tenant_id: i64,
    pub endpoint: String,
}

// ── Error mapping ─────────────────────────────────────────────────

fn token_error_status(err: &TokenError) -> StatusCode {
    match err {
        TokenError::InvalidTenant => StatusCode::BAD_REQUEST,
        TokenError::NotConfigured { .. } => StatusCode::CONFLICT,
        TokenError::ExchangeFailed { .. } => StatusCode::BAD_REQUEST,
        TokenError::RefreshFailed { .. } | TokenError::Request(_) => StatusCode::BAD_GATEWAY,
        TokenError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn sync_error_status(err: &SyncError) -> StatusCode {
    match err {
        SyncError::Token(inner) => token_error_status(inner),
        SyncError::Upstream { .. } | SyncError::Request(_) => StatusCode::BAD_GATEWAY,
        SyncError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn token_error_response(err: &TokenError) -> Response {
    let status = token_error_status(err);
    if status.is_server_error() {
        error!(error = %err, "token operation failed");
    } else {
        warn!(error = %err, "token operation rejected");
    }
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn sync_error_response(err: &SyncError) -> Response {
    let status = sync_error_status(err);
    if status.is_server_error() {
        error!(error = %err, "sync run failed");
    } else {
        warn!(error = %err, "sync run rejected");
    }
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

// ── Handlers ──────────────────────────────────────────────────────

/// GET /health
pub(super) async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.store.ping().await {
        Ok(()) => "ok",
        Err(err) => {
            error!(error = %err, "database ping failed");
            "unreachable"
        }
    };
    let status = if database == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(json!({ "status": "ok", "database": database })))
}

/// GET /integrations/contaazul/config — never echoes the client secret.
pub(super) async fn handle_get_config(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
) -> Response {
    if query.tenant_id <= 0 {
        return token_error_response(&TokenError::InvalidTenant);
    }
    match state.store.find_token_record(query.tenant_id).await {
        Ok(Some(record)) => Json(json!({
            "tenant_id": record.tenant_id,
            "client_id": record.client_id,
            "client_secret_set": !record.client_secret.is_empty(),
            "authorized": record.refresh_token.is_some(),
        }))
        .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no credentials saved for this tenant" })),
        )
            .into_response(),
        Err(err) => token_error_response(&TokenError::Storage(err)),
    }
}

/// POST /integrations/contaazul/config
pub(super) async fn handle_save_config(
    State(state): State<AppState>,
    body: Result<Json<SaveConfigBody>, axum::extract::rejection::JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("invalid JSON body: {rejection}") })),
            )
                .into_response();
        }
    };
    if body.tenant_id <= 0 {
        return token_error_response(&TokenError::InvalidTenant);
    }
    if body.client_id.trim().is_empty() || body.client_secret.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "client_id and client_secret are required" })),
        )
            .into_response();
    }

    match state
        .store
        .upsert_credentials(body.tenant_id, body.client_id.trim(), body.client_secret.trim())
        .await
    {
        Ok(record) => {
            info!(tenant_id = body.tenant_id, "vendor credentials saved");
            Json(json!({
                "saved": true,
                "authorized": record.refresh_token.is_some(),
            }))
            .into_response()
        }
        Err(err) => token_error_response(&TokenError::Storage(err)),
    }
}

/// GET /integrations/contaazul/authorize — sends the browser to the vendor
/// login page.
pub(super) async fn handle_authorize(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
) -> Response {
    match state.tokens.authorize_url(query.tenant_id).await {
        Ok(url) => Redirect::temporary(url.as_str()).into_response(),
        Err(err) => token_error_response(&err),
    }
}

/// GET /integrations/contaazul/callback — the vendor redirects here after
/// login; trades the code for tokens, then sends the browser back to the app.
pub(super) async fn handle_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(code) = query.code else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "missing code parameter" })),
        )
            .into_response();
    };
    let Some(tenant_id) = query.state.as_deref().and_then(|s| s.parse::<i64>().ok()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "state parameter is not a tenant id" })),
        )
            .into_response();
    };

    match state.tokens.exchange_authorization_code(tenant_id, &code).await {
        Ok(()) => {
            Redirect::temporary(&format!("{}?status=connected", state.app_return_url))
                .into_response()
        }
        Err(err) => {
            warn!(tenant_id, error = %err, "authorization code exchange failed");
            token_error_response(&err)
        }
    }
}

/// POST /integrations/contaazul/sync/customers
pub(super) async fn handle_sync_customers(
    State(state): State<AppState>,
    body: Result<Json<TenantQuery>, axum::extract::rejection::JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("invalid JSON body: {rejection}") })),
            )
                .into_response();
        }
    };
    match state.engine.sync_customers(body.tenant_id).await {
        Ok(report) => Json(json!({ "collection": "customers", "report": report })).into_response(),
        Err(err) => sync_error_response(&err),
    }
}

/// POST /integrations/contaazul/sync/contracts
pub(super) async fn handle_sync_contracts(
    State(state): State<AppState>,
    body: Result<Json<TenantQuery>, axum::extract::rejection::JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("invalid JSON body: {rejection}") })),
            )
                .into_response();
        }
    };
    match state.engine.sync_contracts(body.tenant_id).await {
        Ok(report) => Json(json!({ "collection": "contracts", "report": report })).into_response(),
        Err(err) => sync_error_response(&err),
    }
}

/// POST /integrations/contaazul/proxy — authenticated passthrough GET
/// against the vendor. The upstream status rides inside the JSON body;
/// only gateway-side failures change the response status.
pub(super) async fn handle_proxy(
    State(state): State<AppState>,
    body: Result<Json<ProxyBody>, axum::extract::rejection::JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("invalid JSON body: {rejection}") })),
            )
                .into_response();
        }
    };
    if body.endpoint.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "endpoint is required" })),
        )
            .into_response();
    }
    let access_token = match state.tokens.valid_token(body.tenant_id).await {
        Ok(token) => token,
        Err(err) => return token_error_response(&err),
    };
    match state.client.proxy_get(&access_token, &body.endpoint).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => sync_error_response(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::SqliteStore;
    use axum::body::to_bytes;
    use serde_json::Value;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn state_with(server: &MockServer) -> AppState {
        let config = Config {
            public_app_url: "https://painel.example.com".into(),
            vendor: crate::config::VendorConfig {
                auth_base: server.uri(),
                api_base: server.uri(),
                page_size: 20,
            },
            ..Config::default()
        };
        let store = SqliteStore::in_memory().await.unwrap();
        AppState::from_parts(store, &config)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn get_config_hides_the_secret() {
        let server = MockServer::start().await;
        let state = state_with(&server).await;
        state
            .store
            .upsert_credentials(4, "client-4", "super-secret")
            .await
            .unwrap();

        let response = handle_get_config(State(state), Query(TenantQuery { tenant_id: 4 }))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["client_id"], "client-4");
        assert_eq!(body["client_secret_set"], true);
        assert_eq!(body["authorized"], false);
        assert!(!body.to_string().contains("super-secret"));
    }

    #[tokio::test]
    async fn get_config_for_unknown_tenant_is_404() {
        let server = MockServer::start().await;
        let state = state_with(&server).await;
        let response = handle_get_config(State(state), Query(TenantQuery { tenant_id: 4 }))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn save_config_rejects_blank_credentials() {
        let server = MockServer::start().await;
        let state = state_with(&server).await;
        let response = handle_save_config(
            State(state),
            Ok(Json(SaveConfigBody {
                tenant_id: 4,
                client_id: "  ".into(),
                client_secret: "x".into(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn save_config_rejects_non_positive_tenant() {
        let server = MockServer::start().await;
        let state = state_with(&server).await;
        let response = handle_save_config(
            State(state),
            Ok(Json(SaveConfigBody {
                tenant_id: 0,
                client_id: "id".into(),
                client_secret: "secret".into(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn sync_without_credentials_is_conflict() {
        let server = MockServer::start().await;
        let state = state_with(&server).await;
        let response = handle_sync_customers(State(state), Ok(Json(TenantQuery { tenant_id: 4 })))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn authorize_redirects_to_vendor_login() {
        let server = MockServer::start().await;
        let state = state_with(&server).await;
        state
            .store
            .upsert_credentials(4, "client-4", "secret")
            .await
            .unwrap();

        let response = handle_authorize(State(state), Query(TenantQuery { tenant_id: 4 }))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let location = response
            .headers()
            .get(axum::http::header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(location.contains("/login"));
        assert!(location.contains("state=4"));
    }

    #[tokio::test]
    async fn callback_with_bad_state_is_rejected() {
        let server = MockServer::start().await;
        let state = state_with(&server).await;
        let response = handle_callback(
            State(state),
            Query(CallbackQuery {
                code: Some("abc".into()),
                state: Some("not-a-number".into()),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn callback_surfaces_vendor_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_client"}"#),
            )
            .mount(&server)
            .await;

        let state = state_with(&server).await;
        state
            .store
            .upsert_credentials(4, "client-4", "secret")
            .await
            .unwrap();

        let response = handle_callback(
            State(state),
            Query(CallbackQuery {
                code: Some("bad-code".into()),
                state: Some("4".into()),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("invalid_client"));
    }

    #[tokio::test]
    async fn callback_exchanges_code_and_redirects_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "acc",
                "refresh_token": "ref",
                "expires_in": 3600,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let state = state_with(&server).await;
        state
            .store
            .upsert_credentials(4, "client-4", "secret")
            .await
            .unwrap();

        let response = handle_callback(
            State(state.clone()),
            Query(CallbackQuery {
                code: Some("the-code".into()),
                state: Some("4".into()),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let location = response
            .headers()
            .get(axum::http::header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(location.ends_with("status=connected"));

        let record = state.store.find_token_record(4).await.unwrap().unwrap();
        assert_eq!(record.refresh_token.as_deref(), Some("ref"));
    }

    #[tokio::test]
    async fn proxy_reports_upstream_status_in_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/servicos"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({ "message": "not here" })),
            )
            .mount(&server)
            .await;

        let state = state_with(&server).await;
        state
            .store
            .upsert_credentials(4, "client-4", "secret")
            .await
            .unwrap();
        state
            .store
            .store_token_pair(4, "acc", "ref", 3600)
            .await
            .unwrap();

        let response = handle_proxy(
            State(state),
            Ok(Json(ProxyBody {
                tenant_id: 4,
                endpoint: "v1/servicos".into(),
            })),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], 404);
        assert_eq!(body["data"]["message"], "not here");
    }
}
