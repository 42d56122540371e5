//! # Scrivo 클라이언트 라이브러리
//!
//! 블로그 API를 호출하는 클라이언트입니다.
//!
//! 구성:
//! - `session`: access 토큰 관리, 만료 시 단일 비행 갱신, 1회 재시도
//! - `api`: 엔드포인트별 호출 함수 (회원가입, 로그인, 게시글, 프로필)
//! - `likes`: 좋아요/좋아요 취소의 낙관적 업데이트와 롤백
//! - `notify`: 사용자에게 보여줄 알림
//!
//! CLI(`main.rs`)는 이 라이브러리 위에 얇게 올라가 있습니다.

pub mod api;
pub mod config;
pub mod error;
pub mod likes;
pub mod models;
pub mod notify;
pub mod session;
pub mod transport;

pub use config::Config;
pub use error::ApiError;
pub use likes::{LikeController, LikeOutcome, LikeState};
pub use session::SessionClient;
