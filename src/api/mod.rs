//! # API 호출 모듈
//!
//! 원격 API의 엔드포인트 하나하나를 타입이 있는 async 함수로 감쌉니다.
//! 모든 함수는 `SessionClient`를 통해 요청하므로 토큰 부착과 갱신은
//! 여기서 신경 쓰지 않습니다.
//!
//! 각 하위 모듈:
//! - `auth`: 회원가입, OTP 인증, 로그인, 로그아웃
//! - `articles`: 게시글 목록/작성/수정/삭제, 좋아요
//! - `profile`: 비밀번호 변경, 프로필 사진 업로드

pub mod articles;
pub mod auth;
pub mod profile;
