//! Mock blogging API for the integration tests.
//!
//! Issues signed JWT access tokens and an HTTP-only refresh cookie, the same
//! way the real server does. Every access token carries the generation it was
//! minted in; `expire_access_tokens()` bumps the generation so all tokens
//! issued so far answer `InvalidAccessToken`.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use scrivo::{Config, SessionClient};

const JWT_SECRET: &str = "integration-test-secret";
pub const USER_ID: &str = "u1";
pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "correct horse";
pub const OTP: &str = "424242";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    kind: String,
    generation: u64,
    exp: i64,
}

#[derive(Default)]
pub struct MockState {
    generation: AtomicU64,
    refreshes: AtomicUsize,
    refresh_revoked: AtomicBool,
    refresh_delay_ms: AtomicU64,
    suspended: AtomicBool,
    fail_likes: AtomicBool,
    password: Mutex<String>,
    articles: Mutex<Vec<Value>>,
    bearers: Mutex<HashMap<String, Vec<Option<String>>>>,
}

impl MockState {
    pub fn expire_access_tokens(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn revoke_refresh(&self) {
        self.refresh_revoked.store(true, Ordering::SeqCst);
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.refresh_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn suspend(&self) {
        self.suspended.store(true, Ordering::SeqCst);
    }

    pub fn fail_likes(&self, fail: bool) {
        self.fail_likes.store(fail, Ordering::SeqCst);
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn article(&self, id: &str) -> Option<Value> {
        self.articles.lock().unwrap().iter().find(|a| a["_id"] == id).cloned()
    }

    /// Bearer tokens seen on `path`, in arrival order.
    pub fn bearers(&self, path: &str) -> Vec<Option<String>> {
        self.bearers.lock().unwrap().get(path).cloned().unwrap_or_default()
    }

    fn record(&self, path: &str, headers: &HeaderMap) {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        self.bearers.lock().unwrap().entry(path.to_string()).or_default().push(bearer);
    }

    fn sign(&self, kind: &str) -> String {
        let claims = Claims {
            sub: USER_ID.to_string(),
            kind: kind.to_string(),
            generation: self.generation.load(Ordering::SeqCst),
            exp: Utc::now().timestamp() + 3600,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes())).unwrap()
    }

    fn verify(&self, token: &str, kind: &str) -> Option<Claims> {
        let data = decode::<Claims>(token, &DecodingKey::from_secret(JWT_SECRET.as_bytes()), &Validation::default()).ok()?;
        (data.claims.kind == kind).then_some(data.claims)
    }
}

type Shared = Arc<MockState>;

fn fail(status: StatusCode, message: &str, code: Option<&str>) -> Response {
    let mut body = json!({ "status": "fail", "message": message, "timestamp": Utc::now().to_rfc3339() });
    if let Some(code) = code {
        body["errorCode"] = json!(code);
    }
    (status, Json(body)).into_response()
}

fn user_json() -> Value {
    json!({ "_id": USER_ID, "name": "Ada", "email": EMAIL, "profilePicture": "" })
}

fn refresh_cookie(token: &str) -> String {
    format!("refreshToken={}; Path=/; HttpOnly", token)
}

/// Request carrying a currently valid access token.
pub struct AuthUser;

impl FromRequestParts<Shared> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &Shared) -> Result<Self, Self::Rejection> {
        state.record(parts.uri.path(), &parts.headers);

        if state.suspended.load(Ordering::SeqCst) {
            return Err(fail(StatusCode::UNAUTHORIZED, "Your account is suspended", Some("AccountSuspended")));
        }

        let expired = || fail(StatusCode::UNAUTHORIZED, "Access token expired", Some("InvalidAccessToken"));
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(expired)?;
        let claims = state.verify(token, "access").ok_or_else(expired)?;
        if claims.generation < state.generation.load(Ordering::SeqCst) {
            return Err(expired());
        }
        Ok(AuthUser)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Registration {
    name: String,
    email: String,
    password: String,
    confirm_password: String,
}

async fn registration(Json(body): Json<Registration>) -> Response {
    if body.password != body.confirm_password {
        return fail(StatusCode::BAD_REQUEST, "Passwords do not match", None);
    }
    let user = json!({ "_id": USER_ID, "name": body.name, "email": body.email, "profilePicture": "" });
    Json(json!({ "message": "OTP sent to your email", "response": { "user": user } })).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtpBody {
    code: String,
    user_id: String,
}

async fn otp_verification(State(state): State<Shared>, Json(body): Json<OtpBody>) -> Response {
    if body.code != OTP || body.user_id != USER_ID {
        return fail(StatusCode::BAD_REQUEST, "Invalid or expired OTP", None);
    }
    let refresh = state.sign("refresh");
    (
        [(header::SET_COOKIE, refresh_cookie(&refresh))],
        Json(json!({ "message": "Email verified" })),
    )
        .into_response()
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(State(state): State<Shared>, Json(body): Json<LoginBody>) -> Response {
    if body.email != EMAIL || body.password != *state.password.lock().unwrap() {
        return fail(StatusCode::UNAUTHORIZED, "Invalid email or password", None);
    }
    let access = state.sign("access");
    let refresh = state.sign("refresh");
    (
        [(header::SET_COOKIE, refresh_cookie(&refresh))],
        Json(json!({
            "message": "Login successful",
            "response": { "accessToken": access, "user": user_json() }
        })),
    )
        .into_response()
}

async fn refresh(State(state): State<Shared>, headers: HeaderMap) -> Response {
    state.refreshes.fetch_add(1, Ordering::SeqCst);
    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').map(str::trim).find_map(|c| c.strip_prefix("refreshToken=")));
    let valid = cookie.and_then(|token| state.verify(token, "refresh")).is_some();
    if !valid || state.refresh_revoked.load(Ordering::SeqCst) {
        return fail(StatusCode::UNAUTHORIZED, "Refresh token expired", Some("InvalidRefreshToken"));
    }
    Json(json!({ "accessToken": state.sign("access") })).into_response()
}

async fn logout(_: AuthUser) -> Response {
    (
        [(header::SET_COOKIE, "refreshToken=; Path=/; HttpOnly; Max-Age=0".to_string())],
        Json(json!({ "message": "Logged out successfully" })),
    )
        .into_response()
}

async fn all_articles(State(state): State<Shared>) -> Json<Value> {
    let articles = state.articles.lock().unwrap().clone();
    Json(json!({ "data": articles }))
}

async fn user_articles(
    _: AuthUser,
    State(state): State<Shared>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let search = params.get("search").cloned().unwrap_or_default().to_lowercase();
    let category = params.get("category").cloned().unwrap_or_default();
    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: usize = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(10);

    let data: Vec<Value> = state
        .articles
        .lock()
        .unwrap()
        .iter()
        .filter(|a| a["author"]["_id"] == id.as_str())
        .filter(|a| search.is_empty() || a["title"].as_str().unwrap_or_default().to_lowercase().contains(&search))
        .filter(|a| category.is_empty() || a["category"] == category.as_str())
        .skip((page.max(1) - 1) * limit)
        .take(limit)
        .cloned()
        .collect();
    Json(json!({ "data": data }))
}

async fn create_article(_: AuthUser, State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let title = body["title"].as_str().unwrap_or_default();
    if title.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Title is required", None);
    }
    let mut articles = state.articles.lock().unwrap();
    let id = format!("a{}", articles.len() + 1);
    articles.push(article_json(&id, title, body["category"].as_str().unwrap_or_default(), 0));
    Json(json!({ "message": "Article created successfully" })).into_response()
}

async fn edit_article(_: AuthUser, State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let id = body["id"].as_str().unwrap_or_default();
    let mut articles = state.articles.lock().unwrap();
    let Some(article) = articles.iter_mut().find(|a| a["_id"] == id) else {
        return fail(StatusCode::NOT_FOUND, "Article not found", None);
    };
    if let Some(fields) = body["articleData"].as_object() {
        for (key, value) in fields {
            article[key] = value.clone();
        }
    }
    Json(json!({ "message": "Article updated successfully" })).into_response()
}

async fn delete_article(_: AuthUser, State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut articles = state.articles.lock().unwrap();
    let before = articles.len();
    articles.retain(|a| a["_id"] != id.as_str());
    if articles.len() == before {
        return fail(StatusCode::NOT_FOUND, "Article not found", None);
    }
    Json(json!({ "message": "Article deleted successfully" })).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LikeBody {
    article_id: String,
}

fn set_like(state: &MockState, article_id: &str, liked: bool) -> Response {
    if state.fail_likes.load(Ordering::SeqCst) {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "Could not update like", None);
    }
    let mut articles = state.articles.lock().unwrap();
    let Some(article) = articles.iter_mut().find(|a| a["_id"] == article_id) else {
        return fail(StatusCode::NOT_FOUND, "Article not found", None);
    };
    let mut liked_by: Vec<String> = serde_json::from_value(article["likedBy"].clone()).unwrap_or_default();
    liked_by.retain(|id| id != USER_ID);
    if liked {
        liked_by.push(USER_ID.to_string());
    }
    article["likes"] = json!(liked_by.len());
    article["likedBy"] = json!(liked_by);
    StatusCode::OK.into_response()
}

async fn like_article(_: AuthUser, State(state): State<Shared>, Json(body): Json<LikeBody>) -> Response {
    set_like(&state, &body.article_id, true)
}

async fn dislike_article(_: AuthUser, State(state): State<Shared>, Json(body): Json<LikeBody>) -> Response {
    set_like(&state, &body.article_id, false)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordBody {
    old_password: String,
    new_password: String,
}

async fn change_password(_: AuthUser, State(state): State<Shared>, Json(body): Json<PasswordBody>) -> Response {
    let mut password = state.password.lock().unwrap();
    if *password != body.old_password {
        return fail(StatusCode::BAD_REQUEST, "Old password is incorrect", None);
    }
    *password = body.new_password;
    Json(json!({ "message": "Password changed successfully" })).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileBody {
    profile_pic: String,
}

async fn update_profile(_: AuthUser, Json(body): Json<ProfileBody>) -> Response {
    if !body.profile_pic.starts_with("data:image/") {
        return fail(StatusCode::BAD_REQUEST, "Unsupported image format", None);
    }
    Json(json!({ "profilePicture": "https://cdn.example.com/u1.png" })).into_response()
}

pub fn article_json(id: &str, title: &str, category: &str, likes: usize) -> Value {
    let liked_by: Vec<String> = (0..likes).map(|n| format!("reader{}", n)).collect();
    json!({
        "_id": id,
        "title": title,
        "description": "",
        "content": "Lorem ipsum",
        "category": category,
        "tags": [],
        "status": "published",
        "author": { "_id": USER_ID, "name": "Ada", "profilePicture": "" },
        "likes": likes,
        "likedBy": liked_by,
        "createdAt": "2025-03-01T09:00:00.000Z"
    })
}

pub struct TestServer {
    pub base_url: String,
    pub state: Arc<MockState>,
    pub dir: tempfile::TempDir,
}

impl TestServer {
    pub fn config(&self) -> Config {
        Config::new(&self.base_url).with_session_dir(self.dir.path())
    }

    /// New client restored from this server's session directory.
    pub async fn client(&self) -> SessionClient {
        SessionClient::from_config(&self.config()).await.unwrap()
    }
}

pub async fn start_test_server() -> TestServer {
    let state = Arc::new(MockState::default());
    *state.password.lock().unwrap() = PASSWORD.to_string();
    *state.articles.lock().unwrap() = vec![
        article_json("a1", "Ownership in practice", "Tech", 5),
        article_json("a2", "Borrowing without tears", "Tech", 0),
        article_json("a3", "Sourdough notes", "Food", 2),
    ];

    let app = Router::new()
        .route("/registration", post(registration))
        .route("/otp-verification", post(otp_verification))
        .route("/login", post(login))
        .route("/refresh", get(refresh).post(refresh))
        .route("/logout", get(logout))
        .route("/get-all-articles", get(all_articles))
        .route("/get-articles/{id}", get(user_articles))
        .route("/create-article", post(create_article))
        .route("/edit-article", patch(edit_article))
        .route("/delete-article/{id}", delete(delete_article))
        .route("/like-article", post(like_article))
        .route("/disLike-article", post(dislike_article))
        .route("/change-password", post(change_password))
        .route("/update-profile", post(update_profile))
        .with_state(state.clone());

    // Bind to random port.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        state,
        dir: tempfile::tempdir().unwrap(),
    }
}
