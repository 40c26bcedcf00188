//! In-memory stand-in for the wallet API.
//!
//! Speaks the same envelope protocol as the real service under `/api/v1`,
//! keeps sessions in the `token` cookie, and exposes `/echo`, which reflects
//! the request it received so clients can check their request shaping.
//! `/moved` answers with a 307 to `/echo`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{any, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const AUTH_COOKIE: &str = "token";
pub const COMPATIBILITY_HEADER: &str = "x-compatibility-check";
pub const COMPATIBILITY_VERSION: u32 = 1;

pub const DEMO_USER_ID: &str = "u_demo";
pub const DEMO_USERNAME: &str = "alice";
pub const DEMO_EMAIL: &str = "alice@example.com";
pub const DEMO_PASSWORD: &str = "correct-horse";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: u16,
    pub message: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: String,
    pub user_id: String,
    pub chain_id: u64,
    pub blockchain: String,
    pub label: Option<String>,
    pub address: String,
    pub is_default: bool,
    pub balance: String,
    pub encrypted_mnemonic: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInput {
    pub chain_id: u64,
    pub blockchain: String,
}

#[derive(Deserialize)]
pub struct CreateWallet {
    pub label: Option<String>,
    pub network: NetworkInput,
}

/// `PUT` body: every field is replaced.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceWallet {
    pub label: Option<String>,
    pub is_default: bool,
}

/// `PATCH` body: only the fields present are applied.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWallet {
    pub label: Option<String>,
    pub is_default: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm {
    #[serde(rename = "emailOrusername")]
    pub email_or_username: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: Option<bool>,
}

#[derive(Default)]
pub struct Store {
    pub sessions: HashSet<String>,
    pub wallets: HashMap<String, Wallet>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/state", get(auth_state))
        .route("/wallets", get(list_wallets).post(create_wallet))
        .route(
            "/wallets/{id}",
            get(get_wallet)
                .put(replace_wallet)
                .patch(update_wallet)
                .delete(delete_wallet),
        )
        .route("/networks", get(networks))
        .layer(middleware::from_fn(compatibility));

    Router::new()
        .nest("/api/v1", api)
        .route("/echo", any(echo))
        .route("/not-json", get(not_json))
        .route("/moved", any(moved))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn envelope<T: Serialize>(status: StatusCode, message: &str, data: Option<T>) -> Response {
    let body = Envelope {
        status: status.as_u16(),
        message: message.to_string(),
        success: status.is_success(),
        data,
    };
    (status, Json(body)).into_response()
}

fn failure(status: StatusCode, message: &str) -> Response {
    envelope::<Value>(status, message, None)
}

/// Rejects peers that advertise an older compatibility version. Requests
/// without the header pass through.
async fn compatibility(request: Request, next: Next) -> Response {
    let advertised = request
        .headers()
        .get(COMPATIBILITY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().parse::<u32>());

    match advertised {
        Some(Ok(version)) if version < COMPATIBILITY_VERSION => {
            failure(StatusCode::UPGRADE_REQUIRED, "Client update required")
        }
        Some(Err(_)) => failure(StatusCode::BAD_REQUEST, "Invalid compatibility header"),
        _ => next.run(request).await,
    }
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == AUTH_COOKIE)
        .map(|(_, value)| value.to_string())
}

async fn authorized(db: &Db, headers: &HeaderMap) -> bool {
    match session_token(headers) {
        Some(token) => db.read().await.sessions.contains(&token),
        None => false,
    }
}

fn with_cookie(mut response: Response, cookie: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

async fn login(State(db): State<Db>, Json(form): Json<LoginForm>) -> Response {
    let known = form.email_or_username == DEMO_USERNAME || form.email_or_username == DEMO_EMAIL;
    if !known || form.password != DEMO_PASSWORD {
        return failure(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }

    let token = Uuid::new_v4().simple().to_string();
    db.write().await.sessions.insert(token.clone());
    tracing::info!(user = DEMO_USERNAME, "session opened");

    let user = json!({
        "state": "AUTHORIZED",
        "email": DEMO_EMAIL,
        "role": "USER",
        "rememberMe": form.remember_me.unwrap_or(false),
        "purpose": "NONE",
    });
    with_cookie(
        envelope(StatusCode::OK, "Logged in", Some(user)),
        &format!("{AUTH_COOKIE}={token}; Path=/; HttpOnly"),
    )
}

async fn logout(State(db): State<Db>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        db.write().await.sessions.remove(&token);
    }
    with_cookie(
        envelope::<Value>(StatusCode::OK, "Logged out", None),
        &format!("{AUTH_COOKIE}=; Path=/; Max-Age=0"),
    )
}

async fn auth_state(State(db): State<Db>, headers: HeaderMap) -> Response {
    let state = if authorized(&db, &headers).await {
        "AUTHORIZED"
    } else {
        "GUEST"
    };
    envelope(
        StatusCode::OK,
        "ok",
        Some(json!({"state": state, "purpose": "NONE"})),
    )
}

async fn list_wallets(State(db): State<Db>, headers: HeaderMap) -> Response {
    if !authorized(&db, &headers).await {
        return failure(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let store = db.read().await;
    let mut wallets: Vec<Wallet> = store.wallets.values().cloned().collect();
    wallets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    envelope(StatusCode::OK, "ok", Some(wallets))
}

async fn create_wallet(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateWallet>,
) -> Response {
    if !authorized(&db, &headers).await {
        return failure(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let now = Utc::now();
    let mut store = db.write().await;
    let wallet = Wallet {
        id: Uuid::new_v4().to_string(),
        user_id: DEMO_USER_ID.to_string(),
        chain_id: input.network.chain_id,
        blockchain: input.network.blockchain,
        label: input.label,
        address: format!("0x{:0>40}", Uuid::new_v4().simple().to_string()),
        is_default: store.wallets.is_empty(),
        balance: "0".to_string(),
        encrypted_mnemonic: "mock-ciphertext".to_string(),
        created_at: now,
        updated_at: now,
    };
    store.wallets.insert(wallet.id.clone(), wallet.clone());
    envelope(StatusCode::CREATED, "Wallet created", Some(wallet))
}

async fn get_wallet(State(db): State<Db>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&db, &headers).await {
        return failure(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    match db.read().await.wallets.get(&id) {
        Some(wallet) => envelope(StatusCode::OK, "ok", Some(wallet.clone())),
        None => failure(StatusCode::NOT_FOUND, "Wallet not found"),
    }
}

async fn replace_wallet(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<ReplaceWallet>,
) -> Response {
    if !authorized(&db, &headers).await {
        return failure(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let mut store = db.write().await;
    let Some(wallet) = store.wallets.get_mut(&id) else {
        return failure(StatusCode::NOT_FOUND, "Wallet not found");
    };
    wallet.label = input.label;
    wallet.is_default = input.is_default;
    wallet.updated_at = Utc::now();
    envelope(StatusCode::OK, "Wallet updated", Some(wallet.clone()))
}

async fn update_wallet(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<UpdateWallet>,
) -> Response {
    if !authorized(&db, &headers).await {
        return failure(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let mut store = db.write().await;
    let Some(wallet) = store.wallets.get_mut(&id) else {
        return failure(StatusCode::NOT_FOUND, "Wallet not found");
    };
    if let Some(label) = input.label {
        wallet.label = Some(label);
    }
    if let Some(is_default) = input.is_default {
        wallet.is_default = is_default;
    }
    wallet.updated_at = Utc::now();
    envelope(StatusCode::OK, "Wallet updated", Some(wallet.clone()))
}

async fn delete_wallet(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&db, &headers).await {
        return failure(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    match db.write().await.wallets.remove(&id) {
        Some(_) => envelope::<Value>(StatusCode::OK, "Wallet deleted", None),
        None => failure(StatusCode::NOT_FOUND, "Wallet not found"),
    }
}

/// Bare JSON array, no envelope.
async fn networks() -> Json<Value> {
    Json(json!([
        {"name": "Ethereum", "chainId": 1, "blockchain": "ethereum", "tokenStandard": "ERC20"},
        {"name": "Polygon", "chainId": 137, "blockchain": "polygon", "tokenStandard": null},
    ]))
}

/// Reflects method, headers and body back as bare JSON. `body` is `null`
/// when the request carried none.
async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in &headers {
        if let Ok(value) = value.to_str() {
            seen.entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }
    }
    let body = if body.is_empty() {
        Value::Null
    } else {
        Value::String(String::from_utf8_lossy(&body).into_owned())
    };
    Json(json!({
        "method": method.as_str(),
        "headers": seen,
        "body": body,
    }))
}

async fn moved() -> Redirect {
    Redirect::temporary("/echo")
}

async fn not_json() -> &'static str {
    "service unavailable"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_omits_missing_data() {
        let body: Envelope<Value> = Envelope {
            status: 404,
            message: "Wallet not found".to_string(),
            success: false,
            data: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["success"], false);
    }

    #[test]
    fn wallet_serializes_camel_case() {
        let now = Utc::now();
        let wallet = Wallet {
            id: "w_1".to_string(),
            user_id: DEMO_USER_ID.to_string(),
            chain_id: 1,
            blockchain: "ethereum".to_string(),
            label: None,
            address: "0x0".to_string(),
            is_default: true,
            balance: "0".to_string(),
            encrypted_mnemonic: "x".to_string(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&wallet).unwrap();
        assert_eq!(json["userId"], DEMO_USER_ID);
        assert_eq!(json["isDefault"], true);
        assert!(json["label"].is_null());
    }

    #[test]
    fn session_token_is_read_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; token=abc123"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn session_token_absent_without_cookie() {
        assert!(session_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn login_form_reads_legacy_key() {
        let form: LoginForm =
            serde_json::from_str(r#"{"emailOrusername":"alice","password":"p"}"#).unwrap();
        assert_eq!(form.email_or_username, "alice");
        assert!(form.remember_me.is_none());
    }

    #[test]
    fn update_wallet_all_fields_optional() {
        let input: UpdateWallet = serde_json::from_str("{}").unwrap();
        assert!(input.label.is_none());
        assert!(input.is_default.is_none());
    }
}
