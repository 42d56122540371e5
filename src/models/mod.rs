//! # 데이터 모델 모듈
//!
//! API와 주고받는 데이터 구조체(struct)들을 정의합니다.
//! 각 하위 모듈은 특정 도메인의 데이터 타입을 담당합니다:
//! - `article`: 게시글(Article), 작성자, 목록 조회 조건, 좋아요 요청
//! - `session`: 디스크에 저장되는 세션 스냅샷과 UI가 보는 읽기 전용 뷰
//! - `user`: 회원가입, 로그인, OTP 인증, 프로필 관련 구조체
//!
//! 서버는 camelCase 필드(`accessToken`, `likedBy`)와 MongoDB식 `_id`를 쓰므로
//! 대부분의 구조체에 `#[serde(rename_all = "camelCase")]`가 붙어 있습니다.

pub mod article;
pub mod session;
pub mod user;

// `models::Article`처럼 짧게 쓸 수 있도록 재공개합니다.
pub use article::*;
pub use session::*;
pub use user::*;
