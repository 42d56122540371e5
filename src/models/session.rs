//! # 세션 모델 정의
//!
//! 클라이언트 쪽에 저장되는 세션 정보를 담는 구조체들입니다.
//! 성격이 다른 두 파일로 나누어 보관합니다.
//!
//! ## 저장소 구분
//! 1. `TokenStorage` (`storage.json`): access 토큰 + 회원가입 후 OTP 인증을 기다리는 사용자
//! 2. `AuthState` (`auth.json`): 로그인한 사용자 요약 + 로그인 여부
//!
//! refresh 토큰은 HTTP-only 쿠키로만 존재하며 이 구조체들에는 들어가지 않습니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserSummary;

/// 토큰 저장소: 새로고침(재시작) 후에도 유지되고 로그아웃 시 비워집니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStorage {
    /// 현재 access 토큰 (없으면 비로그인 요청)
    #[serde(default)]
    pub access_token: Option<String>,
    /// 회원가입 응답으로 받은 사용자: OTP 인증에 `_id`가 필요합니다.
    #[serde(default, rename = "user")]
    pub pending_registration: Option<UserSummary>,
    /// 마지막으로 저장한 시각
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

/// 인증 상태 저장소
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    #[serde(default)]
    pub current_user: Option<UserSummary>,
    #[serde(default)]
    pub is_logged_in: bool,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

/// UI가 구독하는 읽기 전용 세션 뷰
///
/// 토큰은 포함하지 않습니다. 토큰은 `SessionClient`만 다룹니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    pub is_logged_in: bool,
    pub user: Option<UserSummary>,
}

impl SessionView {
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}
