//! # 세션 클라이언트
//!
//! access 토큰의 수명 주기를 소유하는 유일한 컴포넌트입니다.
//!
//! ## 토큰 갱신 규칙
//! - 401 + `errorCode: "InvalidAccessToken"`일 때만 갱신합니다.
//!   같은 401이라도 `AccountSuspended`는 갱신하지 않고 세션을 정리합니다.
//! - 갱신은 한 번에 하나만 진행됩니다. 여러 요청이 동시에 만료를 만나면
//!   먼저 온 요청이 갱신하고 나머지는 그 결과를 기다렸다가 새 토큰으로 재시도합니다.
//! - 토큰이 바뀔 때마다 epoch가 1씩 증가합니다. 대기하던 요청은 자신이 토큰을
//!   읽은 시점의 epoch와 현재 epoch를 비교해서 "이미 누군가 갱신했다"는 것을 압니다.
//! - 갱신이 5xx나 네트워크 오류로 실패하면 세션은 유지하고, 그 갱신을 기다리던
//!   요청들은 다시 갱신하지 않고 같은 에러를 받습니다.
//! - 원래 요청은 최대 한 번만 재시도합니다. 재시도에서도 거부되면 세션을 끝냅니다.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    error::{classify, ApiError, Outcome, ACCOUNT_SUSPENDED},
    models::{AuthState, RefreshResponse, SessionView, TokenStorage, UserSummary},
    session::store::SessionStore,
    transport::{ApiRequest, HttpTransport, Method, Transport},
};

/// 세션이 끝났을 때 호출자에게 보여줄 문구
const SESSION_EXPIRED: &str = "Your session has expired. Please login again.";

/// 요청 하나가 거치는 상태: `debug` 로그에만 쓰입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Unsent,
    AuthAttached,
    InFlight,
    NeedsRefresh,
    Refreshing,
    Retried,
    Success,
    Failed,
}

/// 요청이 토큰을 읽은 시점의 세션 상태
#[derive(Debug, Clone, Copy)]
struct Seen {
    epoch: u64,
    refresh_round: u64,
}

/// 갱신 실패의 두 종류
enum RefreshFailure {
    /// 서버가 refresh 쿠키를 거부함 (4xx)
    Rejected { status: u16 },
    /// 응답을 못 받았거나 서버 오류 (세션 유지)
    Unavailable(ApiError),
}

/// 처리 중인 요청과 재시도 여부
struct PendingRequest {
    request: ApiRequest,
    retried: bool,
    state: RequestState,
}

impl PendingRequest {
    fn new(request: ApiRequest) -> Self {
        Self {
            request,
            retried: false,
            state: RequestState::Unsent,
        }
    }

    fn advance(&mut self, next: RequestState) {
        tracing::debug!(
            method = self.request.method.as_str(),
            path = %self.request.path,
            from = ?self.state,
            to = ?next,
            "request state"
        );
        self.state = next;
    }
}

/// 세션 클라이언트가 내부에 보관하는 상태
#[derive(Debug, Clone, Default)]
struct SessionState {
    access_token: Option<String>,
    /// 토큰이 바뀔 때마다 증가
    epoch: u64,
    /// 끝난 갱신 시도의 수
    refresh_round: u64,
    /// 마지막 갱신이 세션을 유지한 채 실패했을 때의 에러
    last_refresh_error: Option<ApiError>,
    user: Option<UserSummary>,
    logged_in: bool,
    pending_registration: Option<UserSummary>,
}

impl SessionState {
    fn view(&self) -> SessionView {
        SessionView {
            is_logged_in: self.logged_in,
            user: self.user.clone(),
        }
    }

    fn token_storage(&self) -> TokenStorage {
        TokenStorage {
            access_token: self.access_token.clone(),
            pending_registration: self.pending_registration.clone(),
            saved_at: None,
        }
    }

    fn auth_state(&self) -> AuthState {
        AuthState {
            current_user: self.user.clone(),
            is_logged_in: self.logged_in,
            saved_at: None,
        }
    }
}

struct Inner {
    transport: Arc<dyn Transport>,
    store: SessionStore,
    state: RwLock<SessionState>,
    /// 갱신은 이 뮤텍스를 잡은 쪽만 수행합니다.
    refresh_gate: Mutex<()>,
    /// 상태 변경과 디스크 저장의 순서를 맞춥니다.
    persist_gate: Mutex<()>,
    refresh_request: ApiRequest,
    refreshes: AtomicU64,
    view: watch::Sender<SessionView>,
}

/// 인증 요청 파이프라인
///
/// `Clone`은 같은 세션을 공유하는 핸들을 하나 더 만듭니다.
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<Inner>,
}

impl SessionClient {
    /// 빈 세션으로 시작합니다.
    pub fn new(transport: Arc<dyn Transport>, store: SessionStore, refresh_method: Method) -> Self {
        Self::with_state(transport, store, refresh_method, SessionState::default())
    }

    /// 저장소에 남아 있는 세션을 불러와서 시작합니다.
    pub async fn restore(transport: Arc<dyn Transport>, store: SessionStore, refresh_method: Method) -> Self {
        let (tokens, auth) = store.load().await;
        let state = SessionState {
            access_token: tokens.access_token,
            epoch: 0,
            refresh_round: 0,
            last_refresh_error: None,
            user: auth.current_user,
            logged_in: auth.is_logged_in,
            pending_registration: tokens.pending_registration,
        };
        if state.logged_in {
            tracing::info!(user = ?state.user.as_ref().map(|u| &u.id), "restored session");
        }
        Self::with_state(transport, store, refresh_method, state)
    }

    /// 설정으로부터 HTTP 전송과 저장소를 만들어 세션을 복원합니다.
    pub async fn from_config(config: &Config) -> Result<Self, ApiError> {
        let transport = Arc::new(HttpTransport::new(config)?);
        let store = match &config.session_dir {
            Some(dir) => SessionStore::at(dir),
            None => SessionStore::memory(),
        };
        Ok(Self::restore(transport, store, config.refresh_method).await)
    }

    fn with_state(
        transport: Arc<dyn Transport>,
        store: SessionStore,
        refresh_method: Method,
        state: SessionState,
    ) -> Self {
        let (view, _) = watch::channel(state.view());
        Self {
            inner: Arc::new(Inner {
                transport,
                store,
                state: RwLock::new(state),
                refresh_gate: Mutex::new(()),
                persist_gate: Mutex::new(()),
                refresh_request: ApiRequest::new(refresh_method, "/refresh"),
                refreshes: AtomicU64::new(0),
                view,
            }),
        }
    }

    /// 요청을 보내고 최종 결과를 돌려줍니다.
    ///
    /// 토큰 만료로 인한 401은 호출자에게 보이지 않습니다. 갱신과 재시도가
    /// 모두 실패했을 때만 `Unauthenticated`가 나옵니다.
    pub async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let mut pending = PendingRequest::new(request);

        loop {
            let (token, seen) = self.credentials_for(&pending.request).await;
            if !pending.retried {
                if token.is_some() {
                    pending.advance(RequestState::AuthAttached);
                }
                pending.advance(RequestState::InFlight);
            }

            let response = match self.inner.transport.send(&pending.request, token.as_deref()).await {
                Ok(response) => response,
                Err(e) => {
                    pending.advance(RequestState::Failed);
                    return Err(e);
                }
            };

            match classify(response.status, response.body) {
                Outcome::Success(body) => {
                    pending.advance(RequestState::Success);
                    return Ok(body);
                }
                Outcome::TokenExpired if !pending.request.auth => {
                    pending.advance(RequestState::Failed);
                    return Err(ApiError::unauthenticated(SESSION_EXPIRED));
                }
                Outcome::TokenExpired if pending.retried => {
                    pending.advance(RequestState::Failed);
                    tracing::warn!(path = %pending.request.path, "refreshed token was rejected");
                    self.end_session().await;
                    return Err(ApiError::unauthenticated(SESSION_EXPIRED));
                }
                Outcome::TokenExpired => {
                    pending.advance(RequestState::NeedsRefresh);
                    pending.advance(RequestState::Refreshing);
                    if let Err(e) = self.refresh_after(seen).await {
                        pending.advance(RequestState::Failed);
                        return Err(e);
                    }
                    pending.retried = true;
                    pending.advance(RequestState::Retried);
                }
                Outcome::Failed(err) => {
                    pending.advance(RequestState::Failed);
                    if matches!(&err, ApiError::Forbidden { code, .. } if code == ACCOUNT_SUSPENDED) {
                        tracing::warn!("account suspended, ending session");
                        self.end_session().await;
                    }
                    return Err(err);
                }
            }
        }
    }

    /// `execute`와 같지만 `cancel`이 먼저 취소되면 결과를 버리고 `Cancelled`를 반환합니다.
    pub async fn execute_until(&self, request: ApiRequest, cancel: &CancellationToken) -> Result<Value, ApiError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            result = self.execute(request) => result,
        }
    }

    /// 요청을 보내고 응답 본문을 `T`로 해석합니다.
    pub async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let body = self.execute(request).await?;
        decode(body)
    }

    async fn credentials_for(&self, request: &ApiRequest) -> (Option<String>, Seen) {
        let state = self.inner.state.read().await;
        let token = if request.auth { state.access_token.clone() } else { None };
        let seen = Seen {
            epoch: state.epoch,
            refresh_round: state.refresh_round,
        };
        (token, seen)
    }

    /// `seen` 시점의 토큰이 거부되었을 때 호출됩니다.
    ///
    /// 기다리는 동안 다른 요청의 갱신이 끝났다면 그 결과를 그대로 따릅니다.
    async fn refresh_after(&self, seen: Seen) -> Result<(), ApiError> {
        let _gate = self.inner.refresh_gate.lock().await;

        {
            let state = self.inner.state.read().await;
            if state.epoch != seen.epoch {
                // 기다리는 동안 다른 요청이 갱신했거나 세션이 끝났습니다.
                if state.access_token.is_some() {
                    return Ok(());
                }
                if !state.logged_in {
                    return Err(ApiError::unauthenticated(SESSION_EXPIRED));
                }
            }
            if state.refresh_round != seen.refresh_round {
                if let Some(err) = &state.last_refresh_error {
                    return Err(err.clone());
                }
            }
        }

        self.inner.refreshes.fetch_add(1, Ordering::SeqCst);
        tracing::info!("access token rejected, refreshing");

        match self.request_refresh().await {
            Ok(access_token) => {
                self.commit(|state| {
                    state.access_token = Some(access_token);
                    state.epoch += 1;
                    state.refresh_round += 1;
                    state.last_refresh_error = None;
                })
                .await;
                tracing::info!("access token refreshed");
                Ok(())
            }
            // 서버가 갱신을 거부하면 세션은 복구할 수 없습니다.
            Err(RefreshFailure::Rejected { status }) => {
                tracing::warn!(status, "refresh rejected, ending session");
                self.end_session().await;
                Err(ApiError::unauthenticated(SESSION_EXPIRED))
            }
            // 세션은 그대로 두고, 기다리던 요청들도 같은 에러를 받습니다.
            Err(RefreshFailure::Unavailable(err)) => {
                tracing::warn!("refresh failed: {}", err);
                let mut state = self.inner.state.write().await;
                state.refresh_round += 1;
                state.last_refresh_error = Some(err.clone());
                Err(err)
            }
        }
    }

    async fn request_refresh(&self) -> Result<String, RefreshFailure> {
        let response = self
            .inner
            .transport
            .send(&self.inner.refresh_request, None)
            .await
            .map_err(RefreshFailure::Unavailable)?;

        let status = response.status;
        match classify(status, response.body) {
            Outcome::Success(body) => serde_json::from_value::<RefreshResponse>(body)
                .map(|r| r.access_token)
                .map_err(|e| RefreshFailure::Unavailable(ApiError::malformed(status, e))),
            Outcome::TokenExpired => Err(RefreshFailure::Rejected { status }),
            Outcome::Failed(_) if (400..500).contains(&status) => Err(RefreshFailure::Rejected { status }),
            Outcome::Failed(err) => Err(RefreshFailure::Unavailable(err)),
        }
    }

    /// 상태를 바꾸고, 뷰를 알리고, 저장소에 기록합니다.
    async fn commit(&self, mutate: impl FnOnce(&mut SessionState)) {
        let _persist = self.inner.persist_gate.lock().await;
        let snapshot = {
            let mut state = self.inner.state.write().await;
            mutate(&mut state);
            state.clone()
        };
        self.inner.view.send_replace(snapshot.view());

        if let Err(e) = self.inner.store.save_tokens(&snapshot.token_storage()).await {
            tracing::warn!("could not persist token storage: {}", e);
        }
        if let Err(e) = self.inner.store.save_auth(&snapshot.auth_state()).await {
            tracing::warn!("could not persist auth state: {}", e);
        }
    }

    /// 로그인 성공: 토큰과 사용자를 현재 세션으로 만듭니다.
    pub async fn establish(&self, access_token: String, user: UserSummary) {
        tracing::info!(user = %user.id, "session established");
        self.commit(|state| {
            state.access_token = Some(access_token);
            state.epoch += 1;
            state.user = Some(user);
            state.logged_in = true;
        })
        .await;
    }

    /// OTP 인증 성공: 대기 중이던 사용자를 로그인 상태로 만듭니다.
    ///
    /// 서버가 토큰을 주지 않으면 첫 인증 요청에서 refresh 쿠키로 토큰을 받아옵니다.
    pub async fn complete_registration(&self, user: UserSummary, access_token: Option<String>) {
        tracing::info!(user = %user.id, "registration confirmed");
        self.commit(|state| {
            if let Some(token) = access_token {
                state.access_token = Some(token);
                state.epoch += 1;
            }
            state.user = Some(user);
            state.logged_in = true;
            state.pending_registration = None;
        })
        .await;
    }

    /// 회원가입 응답의 사용자를 OTP 인증 때까지 보관합니다.
    pub async fn remember_registration(&self, user: UserSummary) {
        self.commit(|state| state.pending_registration = Some(user)).await;
    }

    pub async fn pending_registration(&self) -> Option<UserSummary> {
        self.inner.state.read().await.pending_registration.clone()
    }

    /// 로그인 상태는 그대로 두고 사용자 정보만 바꿉니다.
    pub async fn set_user(&self, user: UserSummary) {
        self.commit(|state| state.user = Some(user)).await;
    }

    pub async fn update_profile_picture(&self, url: String) {
        self.commit(|state| {
            if let Some(user) = state.user.as_mut() {
                user.profile_picture = url;
            }
        })
        .await;
    }

    /// 세션을 끝냅니다 (로그아웃, 복구 불가능한 인증 실패).
    ///
    /// 메모리 상태와 저장소를 모두 비웁니다.
    pub async fn end_session(&self) {
        let _persist = self.inner.persist_gate.lock().await;
        {
            let mut state = self.inner.state.write().await;
            *state = SessionState {
                epoch: state.epoch + 1,
                refresh_round: state.refresh_round,
                ..SessionState::default()
            };
        }
        self.inner.view.send_replace(SessionView::default());

        if let Err(e) = self.inner.store.clear().await {
            tracing::warn!("could not clear session storage: {}", e);
        }
        tracing::info!("session ended");
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.view.borrow().is_logged_in
    }

    pub fn view(&self) -> SessionView {
        self.inner.view.borrow().clone()
    }

    /// 세션 뷰가 바뀔 때마다 알림을 받는 수신기
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.inner.view.subscribe()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.inner.state.read().await.access_token.clone()
    }

    /// 지금까지 수행한 토큰 갱신 횟수
    pub fn refresh_count(&self) -> u64 {
        self.inner.refreshes.load(Ordering::SeqCst)
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::malformed(200, e))
}
