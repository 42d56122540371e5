//! # 에러 처리 모듈
//!
//! API 호출에서 발생할 수 있는 모든 에러 타입을 정의합니다.
//!
//! 이 모듈의 핵심:
//! - `ApiError` 열거형(enum): 호출자가 보는 유일한 에러 타입
//! - `ErrorBody`: 서버가 보내는 에러 JSON (`{ status, message, errorCode }`)
//! - `classify()`: HTTP 상태 코드 + errorCode를 `ApiError`로 변환
//!
//! 호출하는 쪽(CLI, 좋아요 컨트롤러)은 응답 본문의 모양을 직접 검사하지 않고
//! `Result<T, ApiError>`만 다룹니다.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// 서버 메시지가 없을 때 사용자에게 보여줄 기본 문구
pub const FALLBACK_MESSAGE: &str = "Something unexpected error happened. Please try it again.";

/// access 토큰이 만료/무효일 때 서버가 보내는 errorCode.
/// 이 코드만 토큰 갱신(refresh)을 일으킵니다.
pub const INVALID_ACCESS_TOKEN: &str = "InvalidAccessToken";

/// 계정 정지 errorCode. 401이지만 갱신하지 않고 세션을 정리합니다.
pub const ACCOUNT_SUSPENDED: &str = "AccountSuspended";

const MALFORMED_PREFIX: &str = "malformed response: ";

/// API 호출 결과로 호출자에게 전달되는 에러 종류
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// 유효한 세션이 없음 (토큰 갱신까지 실패한 경우 포함)
    #[error("Unauthenticated: {message}")]
    Unauthenticated { message: String },

    /// 인증은 되었지만 거부됨 (예: 계정 정지)
    #[error("Forbidden ({code}): {message}")]
    Forbidden { code: String, message: String },

    /// 사용자에게 보여줄 메시지가 담긴 4xx 응답
    #[error("Validation failed ({status}): {message}")]
    ValidationFailure { status: u16, message: String },

    /// 응답을 받지 못함 (연결 실패, 타임아웃 등)
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// 5xx 응답 또는 해석할 수 없는 응답 본문
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// 호출한 쪽이 취소하여 결과를 버림
    #[error("Request cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated { message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailure { status: 400, message: message.into() }
    }

    pub fn malformed(status: u16, detail: impl std::fmt::Display) -> Self {
        Self::ServerError {
            status,
            message: format!("{}{}", MALFORMED_PREFIX, detail),
        }
    }

    /// 알림(toast)에 보여줄 문구.
    ///
    /// 서버가 보낸 메시지가 있으면 그것을, 없으면 기본 문구를 반환합니다.
    pub fn user_message(&self) -> String {
        let message = match self {
            ApiError::Unauthenticated { message }
            | ApiError::Forbidden { message, .. }
            | ApiError::ValidationFailure { message, .. } => message.as_str(),
            // 응답 본문을 해석하지 못한 경우는 내부 사정이므로 노출하지 않습니다.
            ApiError::ServerError { message, .. } if !message.starts_with(MALFORMED_PREFIX) => message.as_str(),
            ApiError::ServerError { .. } | ApiError::NetworkFailure(_) | ApiError::Cancelled => "",
        };

        if message.trim().is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            message.to_string()
        }
    }

    /// 세션이 더 이상 유효하지 않음을 뜻하는 에러인지 여부
    pub fn ends_session(&self) -> bool {
        match self {
            ApiError::Unauthenticated { .. } => true,
            ApiError::Forbidden { code, .. } => code == ACCOUNT_SUSPENDED,
            _ => false,
        }
    }
}

/// 서버 에러 응답 본문
///
/// 예: `{ "status": "fail", "message": "Invalid token", "errorCode": "InvalidAccessToken" }`
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Value>,
}

impl ErrorBody {
    /// 응답 본문에서 에러 정보를 꺼냅니다. 모양이 달라도 실패하지 않습니다.
    pub fn from_value(body: &Value) -> Self {
        match body {
            Value::Object(_) => serde_json::from_value(body.clone()).unwrap_or_default(),
            // JSON이 아닌 텍스트 본문은 메시지로 취급합니다.
            Value::String(text) => Self {
                message: Some(text.clone()),
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    fn message_or(&self, fallback: &str) -> String {
        self.message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// 응답 하나를 분류한 결과
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 2xx: 본문 그대로 호출자에게
    Success(Value),
    /// 401 + InvalidAccessToken: 토큰 갱신 후 재시도 대상
    TokenExpired,
    /// 그 외 실패
    Failed(ApiError),
}

/// HTTP 상태 코드와 본문을 `Outcome`으로 분류합니다.
///
/// 401은 상태 코드만으로 판단하지 않고 반드시 `errorCode`를 봅니다.
pub fn classify(status: u16, body: Value) -> Outcome {
    if (200..300).contains(&status) {
        return Outcome::Success(body);
    }

    let error = ErrorBody::from_value(&body);
    let code = error.error_code.as_deref().unwrap_or_default();

    match status {
        401 if code == INVALID_ACCESS_TOKEN => Outcome::TokenExpired,
        401 if code == ACCOUNT_SUSPENDED => Outcome::Failed(ApiError::Forbidden {
            code: code.to_string(),
            message: error.message_or("Your account has been suspended"),
        }),
        401 => Outcome::Failed(ApiError::Unauthenticated {
            message: error.message_or("Authentication required"),
        }),
        403 => Outcome::Failed(ApiError::Forbidden {
            code: if code.is_empty() { "Forbidden".to_string() } else { code.to_string() },
            message: error.message_or("You are not allowed to do this"),
        }),
        400..=499 => Outcome::Failed(ApiError::ValidationFailure {
            status,
            message: error.message_or(FALLBACK_MESSAGE),
        }),
        _ => Outcome::Failed(ApiError::ServerError {
            status,
            message: error.message_or(FALLBACK_MESSAGE),
        }),
    }
}
