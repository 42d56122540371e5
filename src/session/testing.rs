//! In-memory stand-in for the remote API used by unit tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    error::ApiError,
    models::UserSummary,
    transport::{ApiRequest, Method, RawResponse, Transport},
};

pub(crate) fn user(id: &str) -> UserSummary {
    UserSummary {
        id: id.to_string(),
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        profile_picture: String::new(),
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

/// Accepts exactly one access token; `/refresh` hands it out.
pub(crate) struct FakeApi {
    valid_token: Mutex<String>,
    refresh_ok: AtomicBool,
    refresh_offline: AtomicBool,
    refresh_delay: Mutex<Duration>,
    refreshes: AtomicUsize,
    fail_likes: AtomicBool,
    like_delay: Mutex<Duration>,
    scripted: Mutex<HashMap<String, (u16, Value)>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    pub fn with_valid_token(token: &str) -> Arc<Self> {
        Arc::new(Self {
            valid_token: Mutex::new(token.to_string()),
            refresh_ok: AtomicBool::new(true),
            refresh_offline: AtomicBool::new(false),
            refresh_delay: Mutex::new(Duration::ZERO),
            refreshes: AtomicUsize::new(0),
            fail_likes: AtomicBool::new(false),
            like_delay: Mutex::new(Duration::ZERO),
            scripted: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn reject_refresh(&self) {
        self.refresh_ok.store(false, Ordering::SeqCst);
    }

    /// `/refresh` fails without a response.
    pub fn set_refresh_offline(&self, offline: bool) {
        self.refresh_offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = delay;
    }

    pub fn fail_likes(&self, fail: bool) {
        self.fail_likes.store(fail, Ordering::SeqCst);
    }

    pub fn set_like_delay(&self, delay: Duration) {
        *self.like_delay.lock().unwrap() = delay;
    }

    /// Fixed answer for `path` once the request passed the token check.
    /// For `/refresh` it replaces the token hand-out.
    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.scripted.lock().unwrap().insert(path.to_string(), (status, body));
    }

    pub fn clear_response(&self, path: &str) {
        self.scripted.lock().unwrap().remove(path);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn bearers_for(&self, path: &str) -> Vec<Option<String>> {
        self.calls()
            .into_iter()
            .filter(|c| c.path == path)
            .map(|c| c.bearer)
            .collect()
    }

    pub fn refresh_methods(&self) -> Vec<Method> {
        self.calls()
            .into_iter()
            .filter(|c| c.path == "/refresh")
            .map(|c| c.method)
            .collect()
    }

    fn expired() -> RawResponse {
        RawResponse::new(
            401,
            json!({ "status": "fail", "message": "jwt expired", "errorCode": "InvalidAccessToken" }),
        )
    }
}

#[async_trait]
impl Transport for FakeApi {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<RawResponse, ApiError> {
        self.calls.lock().unwrap().push(Call {
            method: request.method,
            path: request.path.clone(),
            bearer: bearer.map(str::to_string),
            body: request.body.clone(),
        });

        match request.path.as_str() {
            "/refresh" => {
                self.refreshes.fetch_add(1, Ordering::SeqCst);
                let delay = *self.refresh_delay.lock().unwrap();
                tokio::time::sleep(delay).await;
                if self.refresh_offline.load(Ordering::SeqCst) {
                    return Err(ApiError::NetworkFailure("connection reset".into()));
                }
                let scripted = self.scripted.lock().unwrap().get("/refresh").cloned();
                if let Some((status, body)) = scripted {
                    return Ok(RawResponse::new(status, body));
                }
                if self.refresh_ok.load(Ordering::SeqCst) {
                    let token = self.valid_token.lock().unwrap().clone();
                    return Ok(RawResponse::new(200, json!({ "accessToken": token })));
                }
                return Ok(RawResponse::new(
                    401,
                    json!({ "message": "Refresh token expired", "errorCode": "InvalidRefreshToken" }),
                ));
            }
            "/offline" => return Err(ApiError::NetworkFailure("connection refused".into())),
            "/suspended" => {
                return Ok(RawResponse::new(
                    401,
                    json!({ "message": "Your account is suspended", "errorCode": "AccountSuspended" }),
                ))
            }
            "/always-expired" => return Ok(Self::expired()),
            _ => {}
        }

        if request.auth {
            let valid = self.valid_token.lock().unwrap().clone();
            if bearer != Some(valid.as_str()) {
                return Ok(Self::expired());
            }
        }

        let scripted = self.scripted.lock().unwrap().get(&request.path).cloned();
        if let Some((status, body)) = scripted {
            return Ok(RawResponse::new(status, body));
        }

        match request.path.as_str() {
            "/slow" => {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Ok(RawResponse::new(200, json!({ "message": "late" })))
            }
            "/like-article" | "/disLike-article" => {
                let delay = *self.like_delay.lock().unwrap();
                tokio::time::sleep(delay).await;
                if self.fail_likes.load(Ordering::SeqCst) {
                    Ok(RawResponse::new(500, json!({ "message": "Could not update like" })))
                } else {
                    Ok(RawResponse::new(200, Value::Null))
                }
            }
            _ => Ok(RawResponse::new(200, json!({ "token": bearer }))),
        }
    }
}
