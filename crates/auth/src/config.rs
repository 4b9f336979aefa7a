//! Auth flow configuration
//!
//! Static, host-provided settings: identity provider coordinates, client
//! identity, redirect URIs, scopes, the refresh lead time, and the BFF base
//! URL. Loadable from `PORTAL_*` environment variables with development
//! defaults.

use tracing::warn;

/// Seconds before session expiry at which a refresh is attempted.
pub const DEFAULT_REFRESH_THRESHOLD_SECONDS: i64 = 300;

/// Configuration for the authorization-code flow and the BFF client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Identity provider base URL, e.g. `https://idp.example.com`
    pub authority: String,

    /// OAuth client identifier registered with the provider
    pub client_id: String,

    /// Callback URL the provider redirects back to
    pub redirect_uri: String,

    /// Where the provider sends the browser after IDP-side logout
    pub post_logout_redirect_uri: String,

    /// Space-separated OAuth scopes
    pub scope: String,

    /// Refresh lead time before expiry, in seconds
    pub refresh_threshold_seconds: i64,

    /// Base URL of the backend-for-frontend
    pub api_base_url: String,
}

impl AuthConfig {
    /// Load configuration from `PORTAL_*` environment variables, falling back
    /// to development defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let authority = env_or("PORTAL_AUTH_AUTHORITY", "https://idp.example.com");
        let redirect_uri = env_or("PORTAL_AUTH_REDIRECT_URI", "http://localhost:3000/callback");
        let post_logout_redirect_uri =
            env_or("PORTAL_AUTH_POST_LOGOUT_REDIRECT_URI", "http://localhost:3000/");

        Self {
            authority,
            client_id: env_or("PORTAL_AUTH_CLIENT_ID", "portal-web-client"),
            redirect_uri,
            post_logout_redirect_uri,
            scope: env_or("PORTAL_AUTH_SCOPE", "openid profile email"),
            refresh_threshold_seconds: std::env::var("PORTAL_AUTH_REFRESH_THRESHOLD_SECONDS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(DEFAULT_REFRESH_THRESHOLD_SECONDS),
            api_base_url: env_or("PORTAL_API_BASE_URL", "http://localhost:8080"),
        }
    }

    /// Report configuration values that look like unreplaced defaults.
    ///
    /// Returns human-readable warnings; also logs each one. Intended for a
    /// startup check in development builds.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.authority.contains("idp.example.com") {
            warnings.push("authority is the placeholder default".to_string());
        }
        if self.client_id == "portal-web-client" {
            warnings.push("client_id is the placeholder default".to_string());
        }
        if self.api_base_url.contains("localhost") {
            warnings.push("api_base_url points at localhost".to_string());
        }
        if self.refresh_threshold_seconds <= 0 {
            warnings.push("refresh_threshold_seconds must be positive".to_string());
        }

        for warning in &warnings {
            warn!(%warning, "auth configuration check");
        }
        warnings
    }

    /// Identity provider authorization endpoint.
    #[must_use]
    pub fn authorize_endpoint(&self) -> String {
        format!("{}/oauth2/authorize", self.authority.trim_end_matches('/'))
    }

    /// Identity provider logout endpoint.
    #[must_use]
    pub fn logout_endpoint(&self) -> String {
        format!("{}/oauth2/logout", self.authority.trim_end_matches('/'))
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    //! Unit tests for configuration.
    use super::*;

    fn sample() -> AuthConfig {
        AuthConfig {
            authority: "https://login.megacorp.example".to_string(),
            client_id: "megacorp-portal".to_string(),
            redirect_uri: "https://portal.megacorp.example/callback".to_string(),
            post_logout_redirect_uri: "https://portal.megacorp.example/".to_string(),
            scope: "openid profile email".to_string(),
            refresh_threshold_seconds: 300,
            api_base_url: "https://portal.megacorp.example".to_string(),
        }
    }

    /// Validates endpoint helpers for the trailing-slash scenario.
    ///
    /// Assertions:
    /// - Ensures authorize/logout endpoints never double the slash.
    #[test]
    fn test_endpoint_helpers() {
        let mut config = sample();
        assert_eq!(config.authorize_endpoint(), "https://login.megacorp.example/oauth2/authorize");
        assert_eq!(config.logout_endpoint(), "https://login.megacorp.example/oauth2/logout");

        config.authority = "https://login.megacorp.example/".to_string();
        assert_eq!(config.authorize_endpoint(), "https://login.megacorp.example/oauth2/authorize");
    }

    /// Validates `validate` for the production-ready scenario.
    ///
    /// Assertions:
    /// - Ensures a fully configured setup produces no warnings.
    #[test]
    fn test_validate_clean_config() {
        assert!(sample().validate().is_empty());
    }

    /// Validates `validate` for the placeholder-value scenario.
    ///
    /// Assertions:
    /// - Flags placeholder authority, client id, localhost base URL, and a
    ///   non-positive threshold.
    #[test]
    fn test_validate_flags_placeholders() {
        let config = AuthConfig {
            authority: "https://idp.example.com".to_string(),
            client_id: "portal-web-client".to_string(),
            redirect_uri: "http://localhost:3000/callback".to_string(),
            post_logout_redirect_uri: "http://localhost:3000/".to_string(),
            scope: "openid".to_string(),
            refresh_threshold_seconds: 0,
            api_base_url: "http://localhost:8080".to_string(),
        };
        assert_eq!(config.validate().len(), 4);
    }
}
