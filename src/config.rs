//! # 클라이언트 설정(Configuration) 모듈
//!
//! 환경변수에서 API 클라이언트 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `API_BASE_URL`: 원격 API의 기본 주소 (예: "https://api.example.com/auth")
//! - `REQUEST_TIMEOUT_SECS`: 요청 하나에 허용하는 최대 시간(초)
//! - `SESSION_DIR`: 세션 정보(access 토큰, 로그인 사용자)를 저장할 디렉토리
//! - `REFRESH_METHOD`: 토큰 갱신 요청에 사용할 HTTP 메서드 (GET 또는 POST)

use std::{env, path::PathBuf, time::Duration};

use crate::transport::Method;

/// 요청 타임아웃 기본값(초)
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// 설정 로딩 중 발생할 수 있는 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 필수 환경변수가 없음
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    /// 값은 있지만 해석할 수 없음
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// 클라이언트 전체 설정을 담는 구조체
///
/// 프로그램 시작 시 한 번 읽어온 후 `HttpTransport`와 `SessionStore`를
/// 만들 때 사용됩니다.
#[derive(Debug, Clone)]
pub struct Config {
    /// API 기본 주소. 끝의 `/`는 제거된 상태로 보관합니다.
    pub base_url: String,
    /// 요청 타임아웃. 초과하면 `NetworkFailure`로 보고됩니다.
    pub request_timeout: Duration,
    /// 세션 저장 디렉토리. None이면 메모리에만 보관합니다.
    pub session_dir: Option<PathBuf>,
    /// 토큰 갱신(`/refresh`) 요청의 HTTP 메서드
    pub refresh_method: Method,
}

impl Config {
    /// 기본값으로 채운 설정을 만듭니다. 세션은 디스크에 저장하지 않습니다.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            session_dir: None,
            refresh_method: Method::Get,
        }
    }

    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `API_BASE_URL`은 필수이며, 없으면 에러가 발생합니다.
    /// 나머지 설정은 기본값이 있어 환경변수가 없어도 동작합니다.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("API_BASE_URL").map_err(|_| ConfigError::Missing("API_BASE_URL"))?;

        // 숫자가 아니면 조용히 기본값을 쓰지 않고 에러로 알립니다.
        let request_timeout = match env::var("REQUEST_TIMEOUT_SECS") {
            Ok(raw) => parse_timeout(&raw)?,
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let session_dir = env::var("SESSION_DIR").unwrap_or_else(|_| "data/session".to_string());

        let refresh_method = match env::var("REFRESH_METHOD") {
            Ok(raw) => parse_refresh_method(&raw)?,
            Err(_) => Method::Get,
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
            session_dir: Some(PathBuf::from(session_dir)),
            refresh_method,
        })
    }

    pub fn with_session_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_refresh_method(mut self, method: Method) -> Self {
        self.refresh_method = method;
        self
    }
}

/// 0초 타임아웃은 모든 요청을 즉시 실패시키므로 받지 않습니다.
fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::Invalid {
            name: "REQUEST_TIMEOUT_SECS",
            value: raw.to_string(),
        }),
    }
}

fn parse_refresh_method(raw: &str) -> Result<Method, ConfigError> {
    match raw.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::Get),
        "POST" => Ok(Method::Post),
        _ => Err(ConfigError::Invalid {
            name: "REFRESH_METHOD",
            value: raw.to_string(),
        }),
    }
}
