//! Session lifecycle controller
//!
//! Owns the authentication state machine: startup restoration, callback
//! completion, login initiation, proactive refresh scheduling, logout, and
//! synchronous role/permission queries. One controller instance per
//! application shell; all collaborators are injected.
//!
//! State transitions always install a complete [`AuthState`] value, so `user`
//! and `is_authenticated` can never be observed out of step. Consumers get
//! snapshots via [`SessionController::state`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use crate::callback::{self, CallbackParams};
use crate::config::AuthConfig;
use crate::pkce::PkceParams;
use crate::storage::AuthStorage;
use crate::timer::{schedule_once, TimerHandle};
use crate::traits::{AuthApi, Navigator};
use crate::types::{AuthError, AuthErrorCode, AuthState, TokenExchangeRequest};

type AuthErrorHook = Arc<dyn Fn(&AuthError) + Send + Sync>;
type SessionExpiredHook = Arc<dyn Fn() + Send + Sync>;

/// Orchestrates the authorization-code flow and the session it produces.
pub struct SessionController<A: AuthApi + 'static, N: Navigator + 'static> {
    api: Arc<A>,
    navigator: Arc<N>,
    storage: AuthStorage,
    config: AuthConfig,
    state: RwLock<AuthState>,
    refresh_timer: Mutex<Option<TimerHandle>>,
    callback_in_flight: AtomicBool,
    on_auth_error: Option<AuthErrorHook>,
    on_session_expired: Option<SessionExpiredHook>,
}

impl<A: AuthApi + 'static, N: Navigator + 'static> SessionController<A, N> {
    #[must_use]
    pub fn new(api: Arc<A>, navigator: Arc<N>, storage: AuthStorage, config: AuthConfig) -> Self {
        Self {
            api,
            navigator,
            storage,
            config,
            state: RwLock::new(AuthState::loading()),
            refresh_timer: Mutex::new(None),
            callback_in_flight: AtomicBool::new(false),
            on_auth_error: None,
            on_session_expired: None,
        }
    }

    /// Install a hook fired on recoverable auth errors.
    #[must_use]
    pub fn with_auth_error_hook(mut self, hook: impl Fn(&AuthError) + Send + Sync + 'static) -> Self {
        self.on_auth_error = Some(Arc::new(hook));
        self
    }

    /// Install a hook fired when the session is irrecoverably gone.
    #[must_use]
    pub fn with_session_expired_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_session_expired = Some(Arc::new(hook));
        self
    }

    /// Snapshot of the current authentication state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.read().clone()
    }

    /// Startup protocol: consume an authorization callback if the current URL
    /// is one, otherwise probe the BFF for an existing session.
    ///
    /// Leaves the state in exactly one of authenticated, unauthenticated, or
    /// unauthenticated-with-error.
    pub async fn initialize(self: &Arc<Self>) {
        let params = callback::parse_callback_url(&self.navigator.current_url());

        if params.is_callback() {
            if let Some(provider_error) = params.error.as_deref() {
                let message = params.error_description.clone().unwrap_or_else(|| provider_error.to_string());
                warn!(error = provider_error, "identity provider denied authorization");
                self.abandon_callback(AuthError::new(AuthErrorCode::IdpError, message));
                return;
            }
            let _ = self.complete_callback(&params).await;
            return;
        }

        self.restore_session().await;
    }

    /// Probe the BFF for a session created in an earlier page load.
    ///
    /// The session probe subsumes a separate user fetch: its payload carries
    /// the BFF-confirmed user. Every failure lands unauthenticated with no
    /// error recorded; a quiet startup must not surface probe noise, and the
    /// next explicit action reports its own outcome.
    async fn restore_session(self: &Arc<Self>) {
        match self.api.session().await {
            Ok(session) => {
                info!(user = %session.user.id, "restored existing session");
                self.set_state(AuthState::authenticated(session.user, session.expires_at));
                self.storage.touch_last_activity();
                self.arm_refresh_timer(session.expires_at);
            }
            Err(error) => {
                if error.is_unauthorized() {
                    debug!("no existing session");
                } else {
                    warn!(%error, "session restore failed");
                }
                self.set_state(AuthState::unauthenticated(None));
            }
        }
    }

    /// Begin a login: persist the return path and PKCE material, then send
    /// the browser to the identity provider.
    ///
    /// `redirect_path` defaults to the current path and query. Failure to
    /// construct the authorization URL surfaces through the error hook and
    /// the state error; the success path navigates away and never observably
    /// returns.
    pub fn login(&self, redirect_path: Option<&str>) {
        let current = self.navigator.current_url();
        let return_to = redirect_path.map_or_else(
            || match current.query() {
                Some(query) => format!("{}?{query}", current.path()),
                None => current.path().to_string(),
            },
            ToString::to_string,
        );
        self.storage.set_redirect_path(&return_to);

        let pkce = PkceParams::generate();
        self.storage.set_code_verifier(&pkce.code_verifier);
        self.storage.set_state(&pkce.state);

        match callback::build_authorization_url(&self.config, &pkce.state, &pkce.code_challenge, None) {
            Ok(url) => {
                info!("redirecting to identity provider");
                self.navigator.assign(&url);
            }
            Err(error) => {
                warn!(%error, "failed to build authorization url");
                let auth_error =
                    AuthError::new(AuthErrorCode::UnknownError, format!("invalid authority configuration: {error}"));
                self.fire_auth_error(&auth_error);
                self.set_error(Some(auth_error));
            }
        }
    }

    /// Complete an authorization callback: validate CSRF state, exchange the
    /// code, install the session, clean up, and restore the pre-login path.
    ///
    /// Re-entrant calls while an exchange is in flight are ignored (the
    /// authorization code is single-use).
    pub async fn complete_callback(self: &Arc<Self>, params: &CallbackParams) -> Result<(), AuthError> {
        if self.callback_in_flight.swap(true, Ordering::SeqCst) {
            debug!("callback already in progress, ignoring duplicate");
            return Ok(());
        }
        let result = self.complete_callback_inner(params).await;
        self.callback_in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn complete_callback_inner(self: &Arc<Self>, params: &CallbackParams) -> Result<(), AuthError> {
        let (Some(code), Some(state)) = (params.code.as_deref(), params.state.as_deref()) else {
            let error = AuthError::new(AuthErrorCode::InvalidState, "callback missing code or state");
            self.abandon_callback(error.clone());
            return Err(error);
        };

        if !callback::validate_callback_state(&self.storage, state) {
            let error = AuthError::new(AuthErrorCode::InvalidState, "state validation failed");
            self.abandon_callback(error.clone());
            return Err(error);
        }

        let Some(code_verifier) = self.storage.code_verifier() else {
            let error = AuthError::new(AuthErrorCode::InvalidState, "code verifier missing from storage");
            self.abandon_callback(error.clone());
            return Err(error);
        };

        let request = TokenExchangeRequest {
            code: code.to_string(),
            code_verifier,
            redirect_uri: self.config.redirect_uri.clone(),
        };

        match self.api.exchange_token(&request).await {
            Ok(response) => {
                info!(user = %response.user.id, "token exchange complete");
                self.set_state(AuthState::authenticated(response.user, response.expires_at));

                let redirect_path = self.storage.redirect_path();
                self.storage.clear_all();
                self.storage.touch_last_activity();
                callback::clear_callback_params(self.navigator.as_ref());
                self.arm_refresh_timer(response.expires_at);
                self.restore_path(redirect_path.as_deref().unwrap_or("/"));
                Ok(())
            }
            Err(error) => {
                warn!(%error, "token exchange failed");
                let auth_error = error.to_auth_error();
                self.abandon_callback(auth_error.clone());
                Err(auth_error)
            }
        }
    }

    /// Refresh the session now.
    ///
    /// Success re-arms the timer from the new expiry. Failure splits on the
    /// error class: a terminal code tears the session down and fires the
    /// session-expired hook; anything else keeps the session, records the
    /// error, and leaves rescheduling to the next successful arm source.
    pub async fn refresh_token(self: &Arc<Self>) {
        match self.api.refresh_session().await {
            Ok(response) => {
                {
                    // A logout may have landed while the refresh was in
                    // flight; its cleared state must stay cleared.
                    let mut state = self.state.write();
                    if !state.is_authenticated {
                        debug!("refresh completed after logout, discarding");
                        return;
                    }
                    state.session_expires_at = Some(response.expires_at);
                    state.error = None;
                }
                debug!("session refreshed");
                self.storage.touch_last_activity();
                self.arm_refresh_timer(response.expires_at);
            }
            Err(error) if error.code().is_session_terminal() => {
                info!(code = %error.code(), "session no longer refreshable, logging out locally");
                self.cancel_refresh_timer();
                self.storage.clear_all();
                self.set_state(AuthState::unauthenticated(None));
                if let Some(hook) = &self.on_session_expired {
                    hook();
                }
            }
            Err(error) => {
                warn!(%error, "session refresh failed, keeping session");
                let auth_error = error.to_auth_error();
                self.fire_auth_error(&auth_error);
                self.set_error(Some(auth_error));
            }
        }
    }

    /// End the session.
    ///
    /// Local state and storage are cleared even when the BFF call fails; a
    /// successful response carrying an identity provider logout URL is
    /// followed.
    pub async fn logout(self: &Arc<Self>) {
        self.cancel_refresh_timer();

        let result = self.api.logout().await;

        self.storage.clear_all();
        self.set_state(AuthState::unauthenticated(None));

        match result {
            Ok(response) => {
                info!("logged out");
                if let Some(logout_url) = response.logout_url.as_deref() {
                    match Url::parse(logout_url) {
                        Ok(url) => self.navigator.assign(&url),
                        Err(error) => warn!(%error, "ignoring malformed logout url"),
                    }
                }
            }
            Err(error) => {
                warn!(%error, "logout call failed, local session cleared anyway");
                self.fire_auth_error(&error.to_auth_error());
            }
        }
    }

    /// Whether the current user holds `role`. False when unauthenticated.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.state.read().user.as_ref().is_some_and(|user| user.roles.iter().any(|r| r == role))
    }

    /// Whether the current user holds any of `roles`.
    #[must_use]
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    /// Whether the current user holds all of `roles`.
    #[must_use]
    pub fn has_all_roles(&self, roles: &[&str]) -> bool {
        roles.iter().all(|role| self.has_role(role))
    }

    /// Whether the current user holds `permission`. False when the BFF sent
    /// no permission set.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.state
            .read()
            .user
            .as_ref()
            .and_then(|user| user.permissions.as_ref())
            .is_some_and(|permissions| permissions.iter().any(|p| p == permission))
    }

    /// Cancel any pending refresh.
    pub fn cancel_refresh_timer(&self) {
        if let Some(handle) = self.refresh_timer.lock().take() {
            handle.cancel();
            debug!("cancelled pending refresh");
        }
    }

    /// Arm the one-shot refresh for `expires_at`, replacing any pending one.
    ///
    /// The refresh fires `refresh_threshold_seconds` before expiry, or
    /// immediately (still cancellable) when already inside that window. The
    /// task holds only a weak reference, so a dropped controller ends the
    /// chain.
    fn arm_refresh_timer(self: &Arc<Self>, expires_at: DateTime<Utc>) {
        let threshold = Duration::seconds(self.config.refresh_threshold_seconds);
        let until_refresh = expires_at - Utc::now() - threshold;
        let delay = until_refresh.to_std().unwrap_or(StdDuration::ZERO);

        let weak = Arc::downgrade(self);
        let handle = schedule_once(delay, move || async move {
            if let Some(controller) = weak.upgrade() {
                controller.refresh_token().await;
            }
        });

        let mut slot = self.refresh_timer.lock();
        if let Some(previous) = slot.take() {
            previous.cancel();
        }
        *slot = Some(handle);
        debug!(delay_secs = delay.as_secs(), "refresh scheduled");
    }

    /// Abort a callback attempt: report `error` through the hook, wipe
    /// transient state so a later attempt starts clean, scrub the URL, and
    /// land unauthenticated with `error`.
    fn abandon_callback(&self, error: AuthError) {
        self.fire_auth_error(&error);
        self.storage.clear_all();
        callback::clear_callback_params(self.navigator.as_ref());
        self.set_state(AuthState::unauthenticated(Some(error)));
    }

    /// Replace the current history entry with the pre-login path.
    fn restore_path(&self, path: &str) {
        let current = self.navigator.current_url();
        match current.join(path) {
            Ok(url) => self.navigator.replace(&url),
            Err(error) => warn!(%error, path, "ignoring malformed stored redirect path"),
        }
    }

    fn set_state(&self, next: AuthState) {
        *self.state.write() = next;
    }

    fn set_error(&self, error: Option<AuthError>) {
        self.state.write().error = error;
    }

    fn fire_auth_error(&self, error: &AuthError) {
        if let Some(hook) = &self.on_auth_error {
            hook(error);
        }
    }
}

#[cfg(test)]
impl<A: AuthApi + 'static, N: Navigator + 'static> SessionController<A, N> {
    pub(crate) fn replace_state_for_test(&self, state: AuthState) {
        self.set_state(state);
    }

    pub(crate) fn navigator_for_test(&self) -> &Arc<N> {
        &self.navigator
    }
}

impl<A: AuthApi + 'static, N: Navigator + 'static> Drop for SessionController<A, N> {
    fn drop(&mut self) {
        if let Some(handle) = self.refresh_timer.lock().take() {
            handle.cancel();
        }
    }
}
