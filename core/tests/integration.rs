//! End-to-end tests against the live mock server.
//!
//! Starts the mock server on a random port, then drives `OrcaFetcher` over
//! real HTTP through `ReqwestTransport`. Validates request shaping, cookie
//! handling and envelope decoding against an actual server.

use std::sync::Arc;

use orca_shared::types::{LoginForm, SessionUser, StateResponse, Wallet};
use orca_shared::{
    Credentials, FetchError, FetchOptions, HttpMethod, HttpRequest, Network, OrcaFetcher,
    ReqwestTransport, RequestOptions, SharedConfig, Transport, TransportError,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

async fn start_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { mock_server::run(listener).await });
    format!("http://{addr}")
}

fn client(base_url: &str) -> OrcaFetcher {
    OrcaFetcher::new(base_url).unwrap()
}

async fn login(client: &OrcaFetcher) -> SessionUser {
    let form = LoginForm {
        email_or_username: mock_server::DEMO_USERNAME.to_string(),
        password: mock_server::DEMO_PASSWORD.to_string(),
        remember_me: Some(true),
    };
    let body = client
        .post::<SessionUser, _>(&client.endpoint("auth/login"), Some(&form), RequestOptions::new())
        .await
        .unwrap();
    assert!(body.success, "login failed: {}", body.message);
    body.into_data().unwrap()
}

#[tokio::test]
async fn post_sends_one_shaped_request() {
    let base = start_server().await;
    let client = client(&base);

    let echoed: Value = client
        .fetch_raw(
            "/echo",
            FetchOptions::new(HttpMethod::Post).with_body(json!({"a": 1})),
        )
        .await
        .unwrap();

    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["body"], r#"{"a":1}"#);
    assert_eq!(echoed["headers"]["content-type"], "application/json");
}

#[tokio::test]
async fn get_and_delete_carry_no_body() {
    let base = start_server().await;
    let client = client(&base);

    for method in [HttpMethod::Get, HttpMethod::Delete] {
        let echoed: Value = client
            .fetch_raw("/echo", FetchOptions::new(method))
            .await
            .unwrap();
        assert_eq!(echoed["method"], method.as_str());
        assert!(echoed["body"].is_null(), "{method} sent a body");
    }
}

#[tokio::test]
async fn null_body_is_sent() {
    let base = start_server().await;
    let client = client(&base);

    let echoed: Value = client
        .fetch_raw(
            "/echo",
            FetchOptions::new(HttpMethod::Put).with_body(Value::Null),
        )
        .await
        .unwrap();
    assert_eq!(echoed["body"], "null");
}

#[tokio::test]
async fn caller_content_type_wins() {
    let base = start_server().await;
    let client = client(&base);

    let echoed: Value = client
        .fetch_raw(
            "/echo",
            FetchOptions::new(HttpMethod::Get).with_header("content-type", "text/plain"),
        )
        .await
        .unwrap();
    assert_eq!(echoed["headers"]["content-type"], "text/plain");
}

#[tokio::test]
async fn session_cookie_is_sent_after_login() {
    let base = start_server().await;
    let client = client(&base);

    let guest = client
        .get::<StateResponse>(&client.endpoint("auth/state"), RequestOptions::new())
        .await
        .unwrap();
    assert!(!guest.data.unwrap().state.is_authorized());

    let session = login(&client).await;
    assert_eq!(session.email, mock_server::DEMO_EMAIL);

    let echoed: Value = client
        .fetch_raw("/echo", FetchOptions::default())
        .await
        .unwrap();
    let cookie = echoed["headers"]["cookie"].as_str().unwrap();
    assert!(cookie.contains("token="), "cookie header was {cookie}");

    let state = client
        .get::<StateResponse>(&client.endpoint("auth/state"), RequestOptions::new())
        .await
        .unwrap();
    assert!(state.data.unwrap().state.is_authorized());

    // A second transport sharing the jar rides the same session.
    let jar = Arc::clone(client.transport().cookie_jar());
    let sibling = OrcaFetcher::with_transport(
        &base,
        ReqwestTransport::with_cookie_jar(jar).unwrap(),
        Arc::new(SharedConfig::default()),
    );
    let state = sibling
        .get::<StateResponse>(&sibling.endpoint("auth/state"), RequestOptions::new())
        .await
        .unwrap();
    assert!(state.data.unwrap().state.is_authorized());
}

#[tokio::test]
async fn caller_cookie_header_does_not_replace_session() {
    let base = start_server().await;
    let client = client(&base);
    login(&client).await;

    let echoed: Value = client
        .fetch_raw(
            "/echo",
            FetchOptions::default().with_header("Cookie", "theme=dark"),
        )
        .await
        .unwrap();
    let cookie = echoed["headers"]["cookie"].as_str().unwrap();
    assert!(cookie.contains("token="), "cookie header was {cookie}");
    assert!(!cookie.contains("theme=dark"), "cookie header was {cookie}");

    let state = client
        .get::<StateResponse>(
            &client.endpoint("auth/state"),
            RequestOptions::new().with_header("cookie", "token=forged"),
        )
        .await
        .unwrap();
    assert!(state.data.unwrap().state.is_authorized());
}

#[tokio::test]
async fn transport_keeps_jar_cookies_on_hand_built_requests() {
    let base = start_server().await;
    let client = client(&base);
    login(&client).await;

    let request = HttpRequest {
        method: HttpMethod::Get,
        url: format!("{base}/echo"),
        headers: vec![("Cookie".to_string(), "theme=dark".to_string())],
        body: None,
        credentials: Credentials::Include,
    };
    let response = client.transport().execute(request).await.unwrap();
    let echoed: Value = serde_json::from_str(&response.body).unwrap();
    let cookie = echoed["headers"]["cookie"].as_str().unwrap();
    assert!(cookie.contains("token="), "cookie header was {cookie}");
}

#[tokio::test]
async fn redirects_are_followed() {
    let base = start_server().await;
    let client = client(&base);

    // 307 keeps the method and the body.
    let echoed: Value = client
        .fetch_raw(
            "/moved",
            FetchOptions::new(HttpMethod::Post).with_body(json!({"a": 1})),
        )
        .await
        .unwrap();
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["body"], r#"{"a":1}"#);
}

#[tokio::test]
async fn business_failure_is_returned_as_data() {
    let base = start_server().await;
    let client = client(&base);

    // No session: the server answers HTTP 401 with a failure envelope.
    let body = client
        .get::<Vec<Wallet>>(&client.endpoint("wallets"), RequestOptions::new())
        .await
        .unwrap();
    assert!(!body.success);
    assert_eq!(body.status, 401);
    assert!(body.data.is_none());
}

#[tokio::test]
async fn compatibility_header_is_forwarded() {
    let base = start_server().await;
    let config = Arc::new(SharedConfig {
        compatibility_version: 0,
        ..SharedConfig::default()
    });
    let client = OrcaFetcher::with_transport(&base, ReqwestTransport::new().unwrap(), config);

    let (name, value) = client.config().compatibility_header();
    let body = client
        .get::<Value>(
            &client.endpoint("auth/state"),
            RequestOptions::new().with_header(name, value),
        )
        .await
        .unwrap();
    assert!(!body.success);
    assert_eq!(body.status, 426);
}

#[tokio::test]
async fn raw_fetch_decodes_bare_payload() {
    let base = start_server().await;
    let client = client(&base);

    let networks: Vec<Network> = client
        .fetch_raw(&client.endpoint("networks"), FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(networks.len(), 2);
    assert_eq!(
        client.config().network_by_chain_id(networks[1].chain_id),
        Some(&networks[1])
    );
}

#[tokio::test]
async fn non_json_body_is_a_decode_error() {
    let base = start_server().await;
    let client = client(&base);

    let err = client
        .get::<Value>("/not-json", RequestOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    // Bind then drop to get a port nobody is listening on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{addr}"));
    let err = client
        .get::<Value>("/echo", RequestOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Transport(TransportError::Connect(_))));
}

#[tokio::test]
async fn pre_cancelled_signal_never_reaches_the_server() {
    let base = start_server().await;
    let client = client(&base);
    let token = CancellationToken::new();
    token.cancel();

    let err = client
        .post::<Value, _>(
            "/echo",
            Some(&json!({})),
            RequestOptions::new().with_signal(token),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Transport(TransportError::Aborted)));
}

#[tokio::test]
async fn wallet_lifecycle() {
    let base = start_server().await;
    let client = client(&base);
    login(&client).await;
    let config = client.config().clone();
    let polygon = config.network_by_chain_id(137).unwrap();

    // create
    let created = client
        .post::<Wallet, _>(
            &client.endpoint("wallets"),
            Some(&json!({"label": "Main", "network": polygon})),
            RequestOptions::new(),
        )
        .await
        .unwrap();
    assert!(created.success);
    assert_eq!(created.status, 201);
    let wallet = created.data.unwrap();
    assert_eq!(wallet.blockchain, "polygon");
    assert!(wallet.is_default);
    let url = client.endpoint(&format!("wallets/{}", wallet.id));

    // get
    let fetched = client
        .get::<Wallet>(&url, RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(fetched.data.as_ref(), Some(&wallet));

    // patch
    let patched = client
        .patch::<Wallet, _>(&url, Some(&json!({"label": "Savings"})), RequestOptions::new())
        .await
        .unwrap();
    let patched = patched.data.unwrap();
    assert_eq!(patched.label.as_deref(), Some("Savings"));
    assert!(patched.is_default);

    // put
    let replaced = client
        .put::<Wallet, _>(
            &url,
            Some(&json!({"label": null, "isDefault": false})),
            RequestOptions::new(),
        )
        .await
        .unwrap();
    let replaced = replaced.data.unwrap();
    assert!(replaced.label.is_none());
    assert!(!replaced.is_default);

    // list
    let listed = client
        .get::<Vec<Wallet>>(&client.endpoint("wallets"), RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(listed.data.unwrap().len(), 1);

    // delete
    let deleted = client
        .delete::<Value>(&url, RequestOptions::new())
        .await
        .unwrap();
    assert!(deleted.success);
    assert!(deleted.data.is_none());

    // get after delete: 404 envelope, not an error
    let missing = client
        .get::<Wallet>(&url, RequestOptions::new())
        .await
        .unwrap();
    assert!(!missing.success);
    assert_eq!(missing.status, 404);
}
