//! Advisory JWT inspection
//!
//! Decodes token payloads without signature verification, for debugging and
//! display only. Nothing here is an authorization input: role and permission
//! checks go through the BFF-confirmed [`crate::types::User`] on the session
//! controller, never through locally decoded claims.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;

use crate::types::User;

/// Standard and commonly seen claims from a decoded JWT payload.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtClaims {
    pub sub: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    /// `aud` may be a string or an array; kept raw.
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
    #[serde(default)]
    pub iss: Option<String>,
}

/// Structural check: three non-empty dot-separated segments.
#[must_use]
pub fn is_valid_token_format(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3 && segments.iter().all(|s| !s.is_empty())
}

/// Decode the payload segment of a JWT without verifying the signature.
#[must_use]
pub fn decode_jwt(token: &str) -> Option<JwtClaims> {
    if !is_valid_token_format(token) {
        return None;
    }
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Whether the token's `exp` claim is within `buffer` of now, or past.
///
/// Tokens without an `exp` claim and undecodable tokens are treated as
/// expired.
#[must_use]
pub fn is_token_expired(token: &str, buffer: Duration) -> bool {
    match token_expiry(token) {
        Some(expiry) => Utc::now() + buffer >= expiry,
        None => true,
    }
}

/// Remaining lifetime of the token, if it decodes and has not expired.
#[must_use]
pub fn token_expires_in(token: &str) -> Option<Duration> {
    let expiry = token_expiry(token)?;
    let remaining = expiry - Utc::now();
    (remaining > Duration::zero()).then_some(remaining)
}

/// Build a display-only [`User`] from an ID token's claims.
///
/// Roles and permissions are intentionally left empty; they only ever come
/// from the BFF.
#[must_use]
pub fn user_from_id_token(token: &str) -> Option<User> {
    let claims = decode_jwt(token)?;
    let id = claims.sub?;
    Some(User {
        id,
        email: claims.email.unwrap_or_default(),
        name: claims.name.unwrap_or_default(),
        first_name: claims.given_name,
        last_name: claims.family_name,
        avatar: claims.picture,
        roles: Vec::new(),
        permissions: None,
    })
}

fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let exp = decode_jwt(token)?.exp?;
    Utc.timestamp_opt(exp, 0).single()
}

#[cfg(test)]
mod tests {
    //! Unit tests for advisory JWT decoding.
    use super::*;

    fn forge_token(payload: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("{header}.{body}.signature")
    }

    /// Validates `is_valid_token_format` for structural scenarios.
    ///
    /// Assertions:
    /// - Accepts three segments; rejects fewer, more, and empty segments.
    #[test]
    fn test_token_format_check() {
        assert!(is_valid_token_format("a.b.c"));
        assert!(!is_valid_token_format("a.b"));
        assert!(!is_valid_token_format("a.b.c.d"));
        assert!(!is_valid_token_format("a..c"));
        assert!(!is_valid_token_format(""));
    }

    /// Validates `decode_jwt` for the well-formed payload scenario.
    ///
    /// Assertions:
    /// - Ensures standard claims decode from the payload segment.
    #[test]
    fn test_decode_claims() {
        let token = forge_token(serde_json::json!({
            "sub": "user-1",
            "email": "ada@example.com",
            "name": "Ada",
            "exp": 4_102_444_800_i64,
        }));

        let claims = decode_jwt(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("user-1"));
        assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
        assert_eq!(claims.exp, Some(4_102_444_800));
    }

    /// Validates `decode_jwt` for malformed input scenarios.
    ///
    /// Assertions:
    /// - Returns `None` for bad structure, bad base64, and non-JSON payloads.
    #[test]
    fn test_decode_rejects_malformed() {
        assert!(decode_jwt("not-a-jwt").is_none());
        assert!(decode_jwt("a.!!!.c").is_none());
        let bad_json = format!("h.{}.s", URL_SAFE_NO_PAD.encode(b"plain text"));
        assert!(decode_jwt(&bad_json).is_none());
    }

    /// Validates `is_token_expired` for past, future, and buffered scenarios.
    ///
    /// Assertions:
    /// - Expired and missing-exp tokens report expired.
    /// - A healthy token reports live, then expired once the buffer covers it.
    #[test]
    fn test_expiry_checks() {
        let past = forge_token(serde_json::json!({"sub": "u", "exp": 1_000_000_000_i64}));
        assert!(is_token_expired(&past, Duration::zero()));

        let no_exp = forge_token(serde_json::json!({"sub": "u"}));
        assert!(is_token_expired(&no_exp, Duration::zero()));

        let soon = (Utc::now() + Duration::seconds(120)).timestamp();
        let live = forge_token(serde_json::json!({"sub": "u", "exp": soon}));
        assert!(!is_token_expired(&live, Duration::zero()));
        assert!(is_token_expired(&live, Duration::seconds(300)));
        assert!(token_expires_in(&live).is_some());
    }

    /// Validates `user_from_id_token` for the display-identity scenario.
    ///
    /// Assertions:
    /// - Maps profile claims onto `User` with empty roles and permissions.
    #[test]
    fn test_user_from_id_token_has_no_authority() {
        let token = forge_token(serde_json::json!({
            "sub": "user-1",
            "email": "ada@example.com",
            "name": "Ada Lovelace",
            "given_name": "Ada",
            "family_name": "Lovelace",
        }));

        let user = user_from_id_token(&token).unwrap();
        assert_eq!(user.id, "user-1");
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert!(user.roles.is_empty());
        assert!(user.permissions.is_none());

        let no_sub = forge_token(serde_json::json!({"email": "x@example.com"}));
        assert!(user_from_id_token(&no_sub).is_none());
    }
}
