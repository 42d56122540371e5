//! # 좋아요(Like) 낙관적 업데이트
//!
//! 사용자가 좋아요를 누르면 서버 응답을 기다리지 않고 화면 상태부터 바꿉니다.
//! 서버가 실패를 돌려주면 바꾸기 전 상태로 정확히 되돌리고 알림을 띄웁니다.
//!
//! ## 상태 전이
//! ```text
//! (liked=false, count=c) --like-->   (liked=true,  count=c+1)
//! (liked=true,  count=c) --unlike--> (liked=false, count=c-1)
//! ```
//!
//! 글마다 진행 중인 요청은 하나뿐입니다. 앞의 요청이 끝나기 전에 들어온
//! 토글은 무시되고 `LikeOutcome::Ignored`로 보고됩니다.
//!
//! `forget()`으로 버린 글의 진행 중인 토글은 취소됩니다. 같은 글을 다시
//! 추적하면 새 세대(generation)의 상태가 만들어지고, 이전 토글의 결과는
//! 새 상태에 쓰이지 않습니다.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    api::articles::{dislike_request, like_request, parse_ack},
    error::ApiError,
    models::Article,
    notify::{Notice, Notifier},
    session::SessionClient,
};

const LOGIN_REQUIRED: &str = "Please login to like the article";

/// 글 하나의 좋아요 표시 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub count: u64,
}

impl LikeState {
    pub fn new(liked: bool, count: u64) -> Self {
        Self { liked, count }
    }

    /// 서버가 보낸 게시글 데이터로 초기 상태를 만듭니다.
    pub fn from_article(article: &Article, viewer: Option<&str>) -> Self {
        Self {
            liked: viewer.is_some_and(|id| article.is_liked_by(id)),
            count: article.likes,
        }
    }

    /// 토글 후의 예상 상태
    pub fn toggled(self) -> Self {
        if self.liked {
            Self {
                liked: false,
                count: self.count.saturating_sub(1),
            }
        } else {
            Self {
                liked: true,
                count: self.count + 1,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    /// 서버가 확인한 최종 상태
    Confirmed(LikeState),
    /// 앞선 토글이 아직 진행 중이라 무시됨 (현재 표시 상태)
    Ignored(LikeState),
}

struct Entry {
    state: watch::Sender<LikeState>,
    in_flight: bool,
    generation: u64,
    /// 컨트롤러 토큰의 자식. `forget()` 하면 이 글의 요청만 취소됩니다.
    cancel: CancellationToken,
}

/// 좋아요/좋아요 취소를 낙관적으로 처리하는 컨트롤러
///
/// 화면(컴포넌트)마다 하나씩 만들고, 화면이 닫히면 `shutdown()`을 호출합니다.
/// 그러면 진행 중인 요청의 결과는 버려지고 상태는 원래대로 돌아갑니다.
pub struct LikeController {
    session: SessionClient,
    notifier: Arc<dyn Notifier>,
    entries: Mutex<HashMap<String, Entry>>,
    generations: AtomicU64,
    cancel: CancellationToken,
}

impl LikeController {
    pub fn new(session: SessionClient, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            session,
            notifier,
            entries: Mutex::new(HashMap::new()),
            generations: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        }
    }

    fn new_entry(&self, state: LikeState) -> Entry {
        let (tx, _) = watch::channel(state);
        Entry {
            state: tx,
            in_flight: false,
            generation: self.generations.fetch_add(1, Ordering::Relaxed),
            cancel: self.cancel.child_token(),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // 잠금을 쥔 채 패닉이 나도 맵 자체는 항상 일관된 상태입니다.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 게시글을 화면에 올릴 때 호출합니다. 현재 로그인 사용자를 기준으로
    /// 초기 상태를 정하고, 상태 변화를 받을 수신기를 돌려줍니다.
    pub fn track(&self, article: &Article) -> watch::Receiver<LikeState> {
        let view = self.session.view();
        self.track_state(&article.id, LikeState::from_article(article, view.user_id()))
    }

    pub fn track_state(&self, article_id: &str, state: LikeState) -> watch::Receiver<LikeState> {
        let mut entries = self.entries();
        let entry = entries
            .entry(article_id.to_string())
            .or_insert_with(|| self.new_entry(state));
        // 진행 중인 토글의 예상 상태를 서버 데이터로 덮어쓰지 않습니다.
        if !entry.in_flight {
            entry.state.send_replace(state);
        }
        entry.state.subscribe()
    }

    pub fn state(&self, article_id: &str) -> Option<LikeState> {
        self.entries().get(article_id).map(|e| *e.state.borrow())
    }

    pub fn is_in_flight(&self, article_id: &str) -> bool {
        self.entries().get(article_id).is_some_and(|e| e.in_flight)
    }

    /// 화면에서 사라진 글의 상태를 버리고 진행 중인 토글을 취소합니다.
    pub fn forget(&self, article_id: &str) {
        if let Some(entry) = self.entries().remove(article_id) {
            entry.cancel.cancel();
        }
    }

    /// 진행 중인 모든 토글을 취소합니다.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// 추적 중인 상태를 기준으로 토글합니다.
    pub async fn toggle(&self, article_id: &str) -> Result<LikeOutcome, ApiError> {
        let current = self
            .state(article_id)
            .ok_or_else(|| ApiError::validation(format!("article {} is not tracked", article_id)))?;
        self.toggle_like(article_id, current).await
    }

    /// 좋아요 상태를 뒤집습니다.
    ///
    /// 1. 예상 상태를 즉시 반영합니다.
    /// 2. `like` 또는 `dislike`를 호출합니다.
    /// 3. 성공하면 그대로 두고(서버가 좋아요 수를 주면 그 값을 씁니다),
    ///    실패하면 `current`로 되돌리고 알림을 보냅니다.
    pub async fn toggle_like(&self, article_id: &str, current: LikeState) -> Result<LikeOutcome, ApiError> {
        if article_id.trim().is_empty() {
            return Err(ApiError::validation("article id is required"));
        }
        if !self.session.is_authenticated() {
            let err = ApiError::unauthenticated(LOGIN_REQUIRED);
            self.notifier.notify(Notice::error(err.user_message()));
            return Err(err);
        }

        let predicted = current.toggled();
        let (generation, cancel) = {
            let mut entries = self.entries();
            let entry = entries
                .entry(article_id.to_string())
                .or_insert_with(|| self.new_entry(current));
            if entry.in_flight {
                tracing::debug!(article = article_id, "like toggle already in flight, ignoring");
                return Ok(LikeOutcome::Ignored(*entry.state.borrow()));
            }
            entry.in_flight = true;
            entry.state.send_replace(predicted);
            (entry.generation, entry.cancel.clone())
        };

        let mut settle = Settle {
            controller: self,
            article_id,
            generation,
            previous: current,
            done: false,
        };

        let request = if current.liked {
            dislike_request(article_id)
        } else {
            like_request(article_id)
        };
        let result = match request {
            Ok(request) => self.session.execute_until(request, &cancel).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(body) => {
                let confirmed = match parse_ack(body).likes {
                    Some(count) => LikeState::new(predicted.liked, count),
                    None => predicted,
                };
                settle.finish(confirmed);
                Ok(LikeOutcome::Confirmed(confirmed))
            }
            Err(err) => {
                settle.finish(current);
                tracing::warn!(article = article_id, "like toggle rolled back: {}", err);
                if err != ApiError::Cancelled {
                    self.notifier.notify(Notice::error(err.user_message()));
                }
                Err(err)
            }
        }
    }

    /// 토글을 시작한 세대의 상태에만 결과를 씁니다.
    fn settle(&self, article_id: &str, generation: u64, state: LikeState) {
        if let Some(entry) = self.entries().get_mut(article_id) {
            if entry.generation != generation {
                tracing::debug!(article = article_id, "article re-tracked, dropping stale like result");
                return;
            }
            entry.in_flight = false;
            entry.state.send_replace(state);
        }
    }
}

/// 토글 future가 끝나기 전에 버려져도 상태가 되돌아가도록 합니다.
struct Settle<'a> {
    controller: &'a LikeController,
    article_id: &'a str,
    generation: u64,
    previous: LikeState,
    done: bool,
}

impl Settle<'_> {
    fn finish(&mut self, state: LikeState) {
        self.controller.settle(self.article_id, self.generation, state);
        self.done = true;
    }
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.controller.settle(self.article_id, self.generation, self.previous);
        }
    }
}
