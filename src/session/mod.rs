//! # 세션 계층
//!
//! 인증이 필요한 모든 요청은 이 모듈의 `SessionClient`를 거칩니다.
//!
//! 각 하위 모듈:
//! - `client`: access 토큰 부착, 만료 감지, 단일 비행(single-flight) 갱신, 1회 재시도
//! - `store`: 세션 정보를 디스크에 보관하는 저장소
//!
//! ## 요청 하나의 상태 흐름
//! ```text
//! Unsent → AuthAttached → InFlight → Success
//!                                  → NeedsRefresh → Refreshing → Retried → Success | Failed
//!                                  → Failed
//! ```

pub mod client;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{RequestState, SessionClient};
pub use store::{SessionStore, StoreError};
