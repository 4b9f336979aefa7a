//! Authorization redirect codec
//!
//! Builds the URL that sends the browser to the identity provider and decodes
//! the URL the provider sends back. Also owns CSRF state validation and the
//! scrubbing of callback parameters from the address bar once they have been
//! consumed.

use tracing::{debug, warn};
use url::Url;

use crate::config::AuthConfig;
use crate::storage::AuthStorage;
use crate::traits::Navigator;

/// Query parameters the identity provider appends to the callback URL.
const CALLBACK_PARAMS: [&str; 4] = ["code", "state", "error", "error_description"];

/// Parameters decoded from a callback URL.
///
/// `error`/`error_description` are the provider's denial signal; `code` and
/// `state` are present on success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Whether this URL is an authorization callback at all.
    #[must_use]
    pub fn is_callback(&self) -> bool {
        self.code.is_some() || self.error.is_some()
    }
}

/// Build the identity provider authorization URL.
///
/// Appends exactly the parameters the flow needs: `client_id`,
/// `redirect_uri`, `response_type=code`, `scope`, `state`, `code_challenge`,
/// `code_challenge_method=S256`, and `prompt` when requested. Fails only if
/// the configured authority is not a valid URL base.
pub fn build_authorization_url(
    config: &AuthConfig,
    state: &str,
    code_challenge: &str,
    prompt: Option<&str>,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&config.authorize_endpoint())?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", &config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &config.scope)
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256");
        if let Some(prompt) = prompt {
            query.append_pair("prompt", prompt);
        }
    }
    debug!(authority = %config.authority, "built authorization url");
    Ok(url)
}

/// Extract callback parameters from a URL.
///
/// Unrelated query parameters are ignored; on duplicates the first occurrence
/// wins.
#[must_use]
pub fn parse_callback_url(url: &Url) -> CallbackParams {
    let mut params = CallbackParams::default();
    for (key, value) in url.query_pairs() {
        let slot = match key.as_ref() {
            "code" => &mut params.code,
            "state" => &mut params.state,
            "error" => &mut params.error,
            "error_description" => &mut params.error_description,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }
    params
}

/// Compare the state returned by the provider against the stored one.
///
/// Fails closed: a missing stored state (lost storage, replayed callback,
/// cross-site forgery) rejects the callback. Mismatches are logged as a
/// security signal; state values themselves never appear in logs.
#[must_use]
pub fn validate_callback_state(storage: &AuthStorage, returned_state: &str) -> bool {
    match storage.state() {
        Some(stored) if stored == returned_state => true,
        Some(_) => {
            warn!("callback state mismatch, possible CSRF attempt");
            false
        }
        None => {
            warn!("no stored state for callback, possible CSRF attempt or lost storage");
            false
        }
    }
}

/// Remove consumed callback parameters from the address bar.
///
/// Uses `replace` so the callback URL never lands in history. Other query
/// parameters, the path, and the fragment are preserved. Idempotent.
pub fn clear_callback_params(navigator: &dyn Navigator) {
    let current = navigator.current_url();
    let has_callback_params = current.query_pairs().any(|(key, _)| CALLBACK_PARAMS.contains(&key.as_ref()));
    if !has_callback_params {
        return;
    }

    let retained: Vec<(String, String)> = current
        .query_pairs()
        .filter(|(key, _)| !CALLBACK_PARAMS.contains(&key.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut scrubbed = current.clone();
    scrubbed.set_query(None);
    if !retained.is_empty() {
        let mut query = scrubbed.query_pairs_mut();
        for (key, value) in &retained {
            query.append_pair(key, value);
        }
    }

    navigator.replace(&scrubbed);
}
