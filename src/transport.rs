//! # 저수준 HTTP 전송 계층
//!
//! 요청 설명서(`ApiRequest`)를 실제 HTTP 호출로 바꾸고, 응답을
//! `(상태 코드, JSON 본문)`으로 돌려줍니다. 인증 토큰을 언제 붙일지,
//! 401을 어떻게 처리할지는 이 계층이 아니라 `SessionClient`가 결정합니다.
//!
//! `Transport` 트레이트로 분리해 두었기 때문에 테스트에서는 네트워크 없이
//! 응답을 흉내 내는 구현으로 바꿔 끼울 수 있습니다.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{config::Config, error::ApiError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// 요청 설명서: 엔드포인트, 메서드, 본문, 인증 필요 여부
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// 기본 주소 뒤에 붙는 경로 (예: "/like-article")
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// true면 현재 access 토큰을 Authorization 헤더에 붙입니다.
    pub auth: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            auth: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// 인증이 필요한 요청으로 표시합니다.
    pub fn authenticated(mut self) -> Self {
        self.auth = true;
        self
    }

    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::validation(format!("could not encode request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// 분류하기 전의 응답
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

impl RawResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

/// 요청 하나를 보내고 응답을 받는 역할
///
/// 연결 실패나 타임아웃처럼 응답 자체가 없을 때만 `Err`를 반환합니다.
/// 4xx/5xx는 `Ok(RawResponse)`로 돌려주고 분류는 호출자가 합니다.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<RawResponse, ApiError>;
}

/// reqwest 기반 실제 HTTP 전송
///
/// 쿠키 저장소를 켜 두어 서버가 내려준 refresh 쿠키를 이후 `/refresh`
/// 호출에 자동으로 실어 보냅니다.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::NetworkFailure(format!("could not build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<RawResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        let request_id = Uuid::now_v7();

        let mut builder = self
            .http
            .request(request.method.into(), &url)
            .header("x-request-id", request_id.to_string());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        tracing::debug!(
            %request_id,
            method = request.method.as_str(),
            path = %request.path,
            authenticated = bearer.is_some(),
            "dispatching request"
        );

        let resp = builder.send().await.map_err(network_error)?;
        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(network_error)?;

        tracing::debug!(%request_id, status, "response received");

        Ok(RawResponse::new(status, parse_body(&text)))
    }
}

fn network_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::NetworkFailure("request timed out".to_string())
    } else if e.is_connect() {
        ApiError::NetworkFailure(format!("could not connect: {}", e))
    } else {
        ApiError::NetworkFailure(e.to_string())
    }
}

/// 빈 본문은 `Null`, JSON이 아니면 문자열 그대로 담습니다.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
