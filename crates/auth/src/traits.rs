//! Traits for the BFF API, navigation, and ephemeral storage
//!
//! These traits are the dependency-injection seams of the crate: the session
//! controller only ever talks to the backend-for-frontend, the host's
//! navigation surface, and the host's per-tab storage through them. Hosts
//! supply real implementations; tests use the mocks in [`crate::testing`].

use async_trait::async_trait;
use url::Url;

use crate::client::AuthApiError;
use crate::storage::StorageError;
use crate::types::{LogoutResponse, SessionInfo, TokenExchangeRequest, TokenExchangeResponse, TokenRefreshResponse, User};

/// Backend-for-frontend auth API.
///
/// All calls are credentialed; the transport carries the session cookie.
/// The browser side never holds tokens and never talks to the identity
/// provider's token endpoint directly.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange an authorization code plus PKCE verifier for a session.
    async fn exchange_token(&self, request: &TokenExchangeRequest) -> Result<TokenExchangeResponse, AuthApiError>;

    /// Fetch the current user for the active session.
    async fn current_user(&self) -> Result<User, AuthApiError>;

    /// Fetch session metadata for the active session.
    async fn session(&self) -> Result<SessionInfo, AuthApiError>;

    /// Extend the active session's lifetime.
    async fn refresh_session(&self) -> Result<TokenRefreshResponse, AuthApiError>;

    /// Terminate the active session.
    async fn logout(&self) -> Result<LogoutResponse, AuthApiError>;
}

/// Host navigation surface.
///
/// Stands in for the browser's location and history. `assign` pushes a new
/// entry (full navigation, e.g. off to the identity provider); `replace`
/// rewrites the current entry without adding history (e.g. scrubbing callback
/// parameters).
pub trait Navigator: Send + Sync {
    /// The URL currently displayed by the host.
    fn current_url(&self) -> Url;

    /// Navigate to `url`, adding a history entry.
    fn assign(&self, url: &Url);

    /// Navigate to `url`, replacing the current history entry.
    fn replace(&self, url: &Url);
}

/// Ephemeral per-tab key/value storage.
///
/// Values survive the redirect round trip to the identity provider and
/// nothing longer. Implementations may fail (private browsing, quota); the
/// [`crate::storage::AuthStorage`] wrapper absorbs those failures.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
