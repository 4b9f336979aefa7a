//! Backend-for-frontend auth client
//!
//! Thin typed wrapper over the five BFF auth endpoints. Every call is
//! credentialed (the reqwest cookie store carries the session cookie) and
//! JSON on both sides. Error bodies are parsed into the shared auth error
//! taxonomy; transport and decode failures collapse to `NETWORK_ERROR`.

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::traits::AuthApi;
use crate::types::{
    AuthError, AuthErrorCode, LogoutResponse, SessionInfo, TokenExchangeRequest, TokenExchangeResponse,
    TokenRefreshResponse, User,
};

const TOKEN_PATH: &str = "/api/auth/token";
const USER_PATH: &str = "/api/auth/user";
const SESSION_PATH: &str = "/api/auth/session";
const REFRESH_PATH: &str = "/api/auth/refresh";
const LOGOUT_PATH: &str = "/api/auth/logout";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Error from a BFF call.
#[derive(Debug, Error)]
pub enum AuthApiError {
    /// The BFF answered with a non-success status and (usually) a structured
    /// error body.
    #[error("auth api error ({status}): {code}: {message}")]
    Api {
        status: u16,
        code: AuthErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// The request never completed.
    #[error("auth api transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("auth api response parse error: {0}")]
    Parse(String),
}

impl AuthApiError {
    /// Whether the BFF rejected the call as unauthenticated.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }

    /// Taxonomy code for this error. Transport and parse failures are
    /// network-class.
    #[must_use]
    pub fn code(&self) -> AuthErrorCode {
        match self {
            Self::Api { code, .. } => *code,
            Self::Transport(_) | Self::Parse(_) => AuthErrorCode::NetworkError,
        }
    }

    /// Convert into the consumer-facing error shape.
    #[must_use]
    pub fn to_auth_error(&self) -> AuthError {
        match self {
            Self::Api { code, message, details, .. } => {
                AuthError { code: *code, message: message.clone(), details: details.clone() }
            }
            Self::Transport(error) => AuthError::new(AuthErrorCode::NetworkError, error.to_string()),
            Self::Parse(message) => AuthError::new(AuthErrorCode::NetworkError, message.clone()),
        }
    }
}

/// Error body shape the BFF uses for non-success responses.
#[derive(Debug, Deserialize)]
struct WireError {
    code: AuthErrorCode,
    message: String,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

/// HTTP client for the BFF auth endpoints.
pub struct AuthApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl AuthApiClient {
    /// Create a client against `base_url`.
    ///
    /// The cookie store is enabled so the BFF session cookie set during token
    /// exchange rides on every subsequent call.
    pub fn new(base_url: impl Into<String>) -> Result<Self, AuthApiError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_string() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Quick probe: does the BFF consider this browser authenticated?
    ///
    /// 401 means "no session" rather than a failure; other errors propagate.
    pub async fn is_authenticated(&self) -> Result<bool, AuthApiError> {
        match self.session().await {
            Ok(_) => Ok(true),
            Err(error) if error.is_unauthorized() => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Send a request and decode a success body of type `T`.
    ///
    /// Non-success statuses are parsed as a structured error body; if the
    /// body is not the BFF's error shape, the status's canonical reason
    /// becomes a `NETWORK_ERROR`. 204 responses decode as an empty object.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AuthApiError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<WireError>(&body) {
                Ok(wire) => {
                    warn!(status = status.as_u16(), code = %wire.code, "auth api call failed");
                    AuthApiError::Api {
                        status: status.as_u16(),
                        code: wire.code,
                        message: wire.message,
                        details: wire.details,
                    }
                }
                Err(_) => {
                    warn!(status = status.as_u16(), "auth api call failed without structured body");
                    AuthApiError::Api {
                        status: status.as_u16(),
                        code: AuthErrorCode::NetworkError,
                        message: status.canonical_reason().unwrap_or("request failed").to_string(),
                        details: None,
                    }
                }
            });
        }

        let body = if status == StatusCode::NO_CONTENT {
            "{}".to_string()
        } else {
            response.text().await?
        };
        serde_json::from_str(&body).map_err(|error| AuthApiError::Parse(error.to_string()))
    }
}

#[async_trait]
impl AuthApi for AuthApiClient {
    async fn exchange_token(&self, request: &TokenExchangeRequest) -> Result<TokenExchangeResponse, AuthApiError> {
        debug!("exchanging authorization code for session");
        self.execute(self.http.post(self.url(TOKEN_PATH)).json(request)).await
    }

    async fn current_user(&self) -> Result<User, AuthApiError> {
        self.execute(self.http.get(self.url(USER_PATH))).await
    }

    async fn session(&self) -> Result<SessionInfo, AuthApiError> {
        self.execute(self.http.get(self.url(SESSION_PATH))).await
    }

    async fn refresh_session(&self) -> Result<TokenRefreshResponse, AuthApiError> {
        debug!("refreshing session");
        self.execute(self.http.post(self.url(REFRESH_PATH))).await
    }

    async fn logout(&self) -> Result<LogoutResponse, AuthApiError> {
        debug!("terminating session");
        self.execute(self.http.post(self.url(LOGOUT_PATH))).await
    }
}
