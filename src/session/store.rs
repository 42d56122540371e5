//! # 세션 저장소
//!
//! access 토큰과 로그인 사용자 정보를 디스크(JSON 파일)에 보관합니다.
//! 프로그램을 다시 시작해도 로그인 상태가 유지되도록 하는 역할이며,
//! 브라우저의 localStorage와 같은 위치에 있습니다.
//!
//! ## 파일 구성
//! ```text
//! {SESSION_DIR}/storage.json  → TokenStorage (accessToken, user)
//! {SESSION_DIR}/auth.json     → AuthState (currentUser, isLoggedIn)
//! ```
//!
//! 디렉토리가 지정되지 않은 저장소는 아무것도 쓰지 않습니다 (메모리 전용).

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::fs;

use crate::models::{AuthState, TokenStorage};

const TOKEN_FILE: &str = "storage.json";
const AUTH_FILE: &str = "auth.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    dir: Option<PathBuf>,
}

impl SessionStore {
    /// 디스크에 쓰지 않는 저장소
    pub fn memory() -> Self {
        Self { dir: None }
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: Some(dir.into()) }
    }

    /// 저장된 세션을 읽습니다.
    ///
    /// 파일이 없으면 빈 상태를 돌려주고, 깨진 파일은 경고만 남기고 무시합니다.
    pub async fn load(&self) -> (TokenStorage, AuthState) {
        let Some(dir) = &self.dir else {
            return (TokenStorage::default(), AuthState::default());
        };

        let tokens = read_json(&dir.join(TOKEN_FILE)).await;
        let auth = read_json(&dir.join(AUTH_FILE)).await;
        (tokens, auth)
    }

    pub async fn save_tokens(&self, tokens: &TokenStorage) -> Result<(), StoreError> {
        let Some(dir) = &self.dir else { return Ok(()) };
        let mut stamped = tokens.clone();
        stamped.saved_at = Some(Utc::now());
        write_json(dir, TOKEN_FILE, &stamped).await
    }

    pub async fn save_auth(&self, auth: &AuthState) -> Result<(), StoreError> {
        let Some(dir) = &self.dir else { return Ok(()) };
        let mut stamped = auth.clone();
        stamped.saved_at = Some(Utc::now());
        write_json(dir, AUTH_FILE, &stamped).await
    }

    /// 로그아웃: 두 파일을 모두 지웁니다.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let Some(dir) = &self.dir else { return Ok(()) };
        for name in [TOKEN_FILE, AUTH_FILE] {
            match fs::remove_file(dir.join(name)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned + Default>(path: &Path) -> T {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), "could not read session file: {}", e);
            return T::default();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), "ignoring corrupt session file: {}", e);
        T::default()
    })
}

async fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<(), StoreError> {
    fs::create_dir_all(dir).await?;
    let content = serde_json::to_string_pretty(value)?;

    // 임시 파일에 쓴 뒤 rename하여 반쯤 쓰인 파일이 남지 않게 합니다.
    let tmp = dir.join(format!("{}.tmp", name));
    fs::write(&tmp, content).await?;
    fs::rename(&tmp, dir.join(name)).await?;
    Ok(())
}
