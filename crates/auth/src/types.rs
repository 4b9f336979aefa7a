//! Authentication types and wire structures
//!
//! Defines the data shapes shared between the session controller, the BFF
//! client, and consumers: user identity, authentication state, session
//! metadata, and the auth error taxonomy.
//!
//! Timestamps cross the wire as epoch milliseconds (the BFF contract) and are
//! held in memory as `chrono::DateTime<Utc>`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated user as confirmed by the BFF.
///
/// This is the only trustworthy identity source for authorization decisions.
/// Locally decoded ID-token claims (see [`crate::token`]) are advisory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable subject identifier
    pub id: String,

    /// Primary email address
    pub email: String,

    /// Display name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// Roles granted by the identity provider
    pub roles: Vec<String>,

    /// Fine-grained permissions; some deployments omit them entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

/// Authentication state exposed to consumers.
///
/// Owned exclusively by the session controller; consumers receive snapshots.
/// `is_authenticated` and `user` are always updated together; a state where
/// one is set without the other cannot be constructed through the transitions
/// below.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<AuthError>,
    pub session_expires_at: Option<DateTime<Utc>>,
}

impl AuthState {
    /// Initial state while the startup protocol runs.
    #[must_use]
    pub fn loading() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            is_loading: true,
            error: None,
            session_expires_at: None,
        }
    }

    /// Fully authenticated state with a known session expiry.
    #[must_use]
    pub fn authenticated(user: User, expires_at: DateTime<Utc>) -> Self {
        Self {
            user: Some(user),
            is_authenticated: true,
            is_loading: false,
            error: None,
            session_expires_at: Some(expires_at),
        }
    }

    /// Unauthenticated state, optionally carrying the error that caused it.
    ///
    /// Absence of a session is not an error; pass `None` in that case.
    #[must_use]
    pub fn unauthenticated(error: Option<AuthError>) -> Self {
        Self { user: None, is_authenticated: false, is_loading: false, error, session_expires_at: None }
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::loading()
    }
}

/// Request body for the BFF token exchange.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenExchangeRequest {
    pub code: String,
    pub code_verifier: String,
    pub redirect_uri: String,
}

/// Response from `POST /api/auth/token`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenExchangeResponse {
    pub session_id: String,
    pub user: User,
    /// Session lifetime in seconds
    pub expires_in: i64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

/// Response from `POST /api/auth/refresh`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRefreshResponse {
    pub expires_in: i64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

/// Session metadata from `GET /api/auth/session`.
///
/// Ephemeral: refetched on demand, never cached beyond the in-memory
/// [`AuthState`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub user: User,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_activity: DateTime<Utc>,
}

/// Response from `POST /api/auth/logout`.
///
/// The BFF may return a URL to complete logout at the identity provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    #[serde(default)]
    pub logout_url: Option<String>,
}

/// Auth error taxonomy shared with the BFF.
///
/// Codes arrive from the BFF as SCREAMING_SNAKE_CASE strings; anything
/// unrecognized collapses to [`AuthErrorCode::UnknownError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthErrorCode {
    Unauthorized,
    SessionExpired,
    TokenExpired,
    InvalidToken,
    InvalidState,
    NetworkError,
    IdpError,
    InsufficientPermissions,
    #[serde(other)]
    UnknownError,
}

impl AuthErrorCode {
    /// Wire representation of the code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::InvalidState => "INVALID_STATE",
            Self::NetworkError => "NETWORK_ERROR",
            Self::IdpError => "IDP_ERROR",
            Self::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// Whether this code means the session is gone for good.
    ///
    /// Refresh failures with these codes force a transition to
    /// unauthenticated; anything else is treated as recoverable.
    #[must_use]
    pub fn is_session_terminal(self) -> bool {
        matches!(self, Self::SessionExpired | Self::Unauthorized)
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error surfaced into [`AuthState::error`] and the external error hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthError {
    pub code: AuthErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AuthError {
    /// Create an error with no structured details.
    #[must_use]
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), details: None }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for AuthError {}
