//! Mock implementations of the auth traits
//!
//! Scriptable doubles: queue the outcome each call should produce, run the
//! code under test, then assert on recorded calls and navigations.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use crate::client::AuthApiError;
use crate::storage::StorageError;
use crate::traits::{AuthApi, Navigator, SessionStore};
use crate::types::{
    AuthErrorCode, LogoutResponse, SessionInfo, TokenExchangeRequest, TokenExchangeResponse, TokenRefreshResponse,
    User,
};

/// Build a structured API error like the BFF would return.
#[must_use]
pub fn api_error(status: u16, code: AuthErrorCode, message: &str) -> AuthApiError {
    AuthApiError::Api { status, code, message: message.to_string(), details: None }
}

fn no_session() -> AuthApiError {
    api_error(401, AuthErrorCode::Unauthorized, "no active session")
}

/// Scriptable [`AuthApi`] double.
///
/// Each endpoint pops from its own outcome queue; an empty queue answers 401
/// (no session). Call counts are recorded for verification.
#[derive(Default)]
pub struct MockAuthApi {
    exchange_delay: Mutex<Option<std::time::Duration>>,
    exchange_outcomes: Mutex<VecDeque<Result<TokenExchangeResponse, AuthApiError>>>,
    user_outcomes: Mutex<VecDeque<Result<User, AuthApiError>>>,
    session_outcomes: Mutex<VecDeque<Result<SessionInfo, AuthApiError>>>,
    refresh_outcomes: Mutex<VecDeque<Result<TokenRefreshResponse, AuthApiError>>>,
    logout_outcomes: Mutex<VecDeque<Result<LogoutResponse, AuthApiError>>>,
    exchange_requests: Mutex<Vec<TokenExchangeRequest>>,
    exchange_calls: AtomicUsize,
    user_calls: AtomicUsize,
    session_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    logout_calls: AtomicUsize,
}

impl MockAuthApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_exchange(&self, outcome: Result<TokenExchangeResponse, AuthApiError>) {
        self.exchange_outcomes.lock().push_back(outcome);
    }

    /// Make `exchange_token` sleep before answering, so tests can observe a
    /// call in flight.
    pub fn set_exchange_delay(&self, delay: std::time::Duration) {
        *self.exchange_delay.lock() = Some(delay);
    }

    pub fn push_user(&self, outcome: Result<User, AuthApiError>) {
        self.user_outcomes.lock().push_back(outcome);
    }

    pub fn push_session(&self, outcome: Result<SessionInfo, AuthApiError>) {
        self.session_outcomes.lock().push_back(outcome);
    }

    pub fn push_refresh(&self, outcome: Result<TokenRefreshResponse, AuthApiError>) {
        self.refresh_outcomes.lock().push_back(outcome);
    }

    pub fn push_logout(&self, outcome: Result<LogoutResponse, AuthApiError>) {
        self.logout_outcomes.lock().push_back(outcome);
    }

    /// Exchange requests received, in order.
    #[must_use]
    pub fn exchange_requests(&self) -> Vec<TokenExchangeRequest> {
        self.exchange_requests.lock().clone()
    }

    #[must_use]
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn user_calls(&self) -> usize {
        self.user_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn session_calls(&self) -> usize {
        self.session_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthApi for MockAuthApi {
    async fn exchange_token(&self, request: &TokenExchangeRequest) -> Result<TokenExchangeResponse, AuthApiError> {
        let delay = *self.exchange_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.exchange_requests.lock().push(request.clone());
        self.exchange_outcomes.lock().pop_front().unwrap_or_else(|| Err(no_session()))
    }

    async fn current_user(&self) -> Result<User, AuthApiError> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        self.user_outcomes.lock().pop_front().unwrap_or_else(|| Err(no_session()))
    }

    async fn session(&self) -> Result<SessionInfo, AuthApiError> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        self.session_outcomes.lock().pop_front().unwrap_or_else(|| Err(no_session()))
    }

    async fn refresh_session(&self) -> Result<TokenRefreshResponse, AuthApiError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_outcomes.lock().pop_front().unwrap_or_else(|| Err(no_session()))
    }

    async fn logout(&self) -> Result<LogoutResponse, AuthApiError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.logout_outcomes.lock().pop_front().unwrap_or(Ok(LogoutResponse { logout_url: None }))
    }
}

/// Recording [`Navigator`] double.
///
/// `assign` and `replace` update the current URL the way a real navigation
/// surface would, and log every navigation for assertions.
pub struct MockNavigator {
    current: Mutex<Url>,
    assigned: Mutex<Vec<Url>>,
    replaced: Mutex<Vec<Url>>,
}

impl MockNavigator {
    #[must_use]
    pub fn new(initial: Url) -> Self {
        Self { current: Mutex::new(initial), assigned: Mutex::new(Vec::new()), replaced: Mutex::new(Vec::new()) }
    }

    /// URLs passed to `assign`, in order.
    #[must_use]
    pub fn assigned(&self) -> Vec<Url> {
        self.assigned.lock().clone()
    }

    /// URLs passed to `replace`, in order.
    #[must_use]
    pub fn replaced(&self) -> Vec<Url> {
        self.replaced.lock().clone()
    }
}

impl Navigator for MockNavigator {
    fn current_url(&self) -> Url {
        self.current.lock().clone()
    }

    fn assign(&self, url: &Url) {
        *self.current.lock() = url.clone();
        self.assigned.lock().push(url.clone());
    }

    fn replace(&self, url: &Url) {
        *self.current.lock() = url.clone();
        self.replaced.lock().push(url.clone());
    }
}

/// [`SessionStore`] double that fails every operation, simulating a
/// restricted environment with storage disabled.
#[derive(Default)]
pub struct FailingSessionStore {
    failures: AtomicUsize,
}

impl FailingSessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of operations that have failed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

impl SessionStore for FailingSessionStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        self.failures.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::new("storage disabled"))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        self.failures.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::new("storage disabled"))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        self.failures.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::new("storage disabled"))
    }
}

/// Convenience: wrap a store in an `Arc` trait object.
#[must_use]
pub fn shared_store<S: SessionStore + 'static>(store: S) -> Arc<dyn SessionStore> {
    Arc::new(store)
}
