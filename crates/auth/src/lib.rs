//! Browser-side OIDC authorization-code + PKCE session orchestration.
//!
//! This crate drives the authenticated session of a portal shell against a
//! backend-for-frontend (BFF): it generates PKCE material, sends the user to
//! the identity provider, validates and completes the callback, keeps the
//! session alive with proactively scheduled refreshes, and answers
//! role/permission queries from the BFF-confirmed user.
//!
//! Tokens never reach this crate. The BFF holds them server-side and the
//! session credential is an HTTP-only cookie carried by the HTTP client.
//!
//! # Architecture
//!
//! - [`pkce`] / [`callback`]: the redirect round trip to the identity provider
//! - [`storage`]: fail-soft ephemeral storage surviving that round trip
//! - [`client`]: typed BFF API client
//! - [`session`]: the [`session::SessionController`] state machine
//! - [`guard`]: access decisions for protected surfaces
//! - [`traits`]: the injection seams hosts implement
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use portal_auth::client::AuthApiClient;
//! use portal_auth::config::AuthConfig;
//! use portal_auth::session::SessionController;
//! use portal_auth::storage::{AuthStorage, MemorySessionStore};
//! # use portal_auth::traits::Navigator;
//! # use url::Url;
//! # struct ShellNavigator;
//! # impl Navigator for ShellNavigator {
//! #     fn current_url(&self) -> Url { Url::parse("https://app.example.com/").unwrap() }
//! #     fn assign(&self, _url: &Url) {}
//! #     fn replace(&self, _url: &Url) {}
//! # }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::from_env();
//! let api = Arc::new(AuthApiClient::new(config.api_base_url.clone())?);
//! let storage = AuthStorage::new(Arc::new(MemorySessionStore::new()));
//! let navigator = Arc::new(ShellNavigator);
//!
//! let controller = Arc::new(
//!     SessionController::new(api, navigator, storage, config)
//!         .with_session_expired_hook(|| println!("please sign in again")),
//! );
//! controller.initialize().await;
//! # Ok(())
//! # }
//! ```

pub mod callback;
pub mod client;
pub mod config;
pub mod guard;
pub mod pkce;
pub mod session;
pub mod storage;
pub mod testing;
pub mod timer;
pub mod token;
pub mod traits;
pub mod types;

pub use callback::CallbackParams;
pub use client::{AuthApiClient, AuthApiError};
pub use config::AuthConfig;
pub use guard::{AccessDecision, AccessGuard, AccessRequirements};
pub use pkce::PkceParams;
pub use session::SessionController;
pub use storage::{AuthStorage, MemorySessionStore, StorageError};
pub use traits::{AuthApi, Navigator, SessionStore};
pub use types::{AuthError, AuthErrorCode, AuthState, SessionInfo, User};
