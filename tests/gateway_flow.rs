use contabridge::config::{Config, VendorConfig};
use contabridge::gateway::{build_router, AppState};
use contabridge::storage::SqliteStore;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn spawn_gateway(vendor: &MockServer, page_size: u32) -> (String, SqliteStore) {
    let config = Config {
        public_app_url: "https://painel.example.com".into(),
        vendor: VendorConfig {
            auth_base: vendor.uri(),
            api_base: vendor.uri(),
            page_size,
        },
        ..Config::default()
    };
    let store = SqliteStore::in_memory().await.expect("in-memory store");
    let app = build_router(AppState::from_parts(store.clone(), &config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (format!("http://{addr}"), store)
}

fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("client")
}

#[tokio::test]
async fn configure_authorize_sync_journey() {
    let vendor = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "acc-1",
            "refresh_token": "ref-1",
            "expires_in": 3600,
        })))
        .mount(&vendor)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/pessoas"))
        .and(query_param("pagina", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "id": "ca-1", "nome": "Primeiro" },
                { "id": "ca-2", "nome": "Segundo" }
            ]
        })))
        .mount(&vendor)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/pessoas"))
        .and(query_param("pagina", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": "ca-3", "nome": "Terceiro" }]
        })))
        .mount(&vendor)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/contratos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "itens": [
                {
                    "id": "ct-1",
                    "cliente": { "id": "ca-2" },
                    "status": "ATIVO",
                    "numero": "A-7",
                    "data_inicio": "2023-05-01",
                    "proximo_vencimento": "2026-11-01"
                }
            ]
        })))
        .mount(&vendor)
        .await;

    let (base, store) = spawn_gateway(&vendor, 2).await;
    let http = no_redirect_client();

    // Save credentials.
    let saved: Value = http
        .post(format!("{base}/integrations/contaazul/config"))
        .json(&json!({
            "tenant_id": 1,
            "client_id": "client-1",
            "client_secret": "secret-1",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(saved["saved"], true);
    assert_eq!(saved["authorized"], false);

    // The authorize redirect points at the vendor login page.
    let authorize = http
        .get(format!("{base}/integrations/contaazul/authorize?tenant_id=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(authorize.status(), 307);
    let location = authorize.headers()["location"].to_str().unwrap();
    assert!(location.contains("/login"));
    assert!(location.contains("state=1"));

    // Vendor calls back; the gateway trades the code and bounces the
    // browser back to the app.
    let callback = http
        .get(format!(
            "{base}/integrations/contaazul/callback?code=the-code&state=1"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(callback.status(), 307);
    assert!(
        callback.headers()["location"]
            .to_str()
            .unwrap()
            .ends_with("status=connected")
    );

    let config: Value = http
        .get(format!("{base}/integrations/contaazul/config?tenant_id=1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(config["authorized"], true);
    assert!(!config.to_string().contains("secret-1"));

    // Customers pass walks both pages.
    let customers: Value = http
        .post(format!("{base}/integrations/contaazul/sync/customers"))
        .json(&json!({ "tenant_id": 1 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(customers["report"]["processed"], 3);
    assert_eq!(store.count_customers(1).await.unwrap(), 3);

    // Contracts pass decorates the matched customer.
    let contracts: Value = http
        .post(format!("{base}/integrations/contaazul/sync/contracts"))
        .json(&json!({ "tenant_id": 1 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(contracts["report"]["processed"], 1);
    assert_eq!(contracts["report"]["updated"], 1);

    let record = store.find_customer("ca-2").await.unwrap().unwrap();
    assert_eq!(record.contract_id.as_deref(), Some("ct-1"));
    assert_eq!(record.contract_number.as_deref(), Some("A-7"));
}

#[tokio::test]
async fn sync_for_unconfigured_tenant_is_conflict() {
    let vendor = MockServer::start().await;
    let (base, _store) = spawn_gateway(&vendor, 20).await;

    let response = no_redirect_client()
        .post(format!("{base}/integrations/contaazul/sync/customers"))
        .json(&json!({ "tenant_id": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn upstream_collection_failure_maps_to_bad_gateway() {
    let vendor = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/pessoas"))
        .respond_with(ResponseTemplate::new(500).set_body_string("vendor exploded"))
        .mount(&vendor)
        .await;

    let (base, store) = spawn_gateway(&vendor, 20).await;
    store.upsert_credentials(1, "id", "secret").await.unwrap();
    store.store_token_pair(1, "acc", "ref", 3600).await.unwrap();

    let response = no_redirect_client()
        .post(format!("{base}/integrations/contaazul/sync/customers"))
        .json(&json!({ "tenant_id": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("500"));
}

#[tokio::test]
async fn proxy_passes_through_with_valid_token() {
    let vendor = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/servicos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "total": 3 })))
        .mount(&vendor)
        .await;

    let (base, store) = spawn_gateway(&vendor, 20).await;
    store.upsert_credentials(1, "id", "secret").await.unwrap();
    store.store_token_pair(1, "acc", "ref", 3600).await.unwrap();

    let body: Value = no_redirect_client()
        .post(format!("{base}/integrations/contaazul/proxy"))
        .json(&json!({ "tenant_id": 1, "endpoint": "/v1/servicos" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], 200);
    assert_eq!(body["data"]["total"], 3);
}

#[tokio::test]
async fn health_reports_database_state() {
    let vendor = MockServer::start().await;
    let (base, _store) = spawn_gateway(&vendor, 20).await;

    let response = no_redirect_client()
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}
