//! PKCE (Proof Key for Code Exchange) utilities for the authorization-code
//! flow (RFC 7636).
//!
//! Generates the code verifier, its S256 challenge, and the CSRF state value
//! used to bind an authorization redirect to the browser session that started
//! it. Randomness comes from the OS CSPRNG via `rand::thread_rng`; entropy
//! failure aborts rather than degrading to a predictable value.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Unreserved characters permitted in a code verifier (RFC 7636 §4.1).
const VERIFIER_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Default verifier length. The RFC allows 43 to 128; the maximum is used for
/// maximum entropy.
pub const DEFAULT_VERIFIER_LENGTH: usize = 128;

/// Minimum verifier length per RFC 7636.
pub const MIN_VERIFIER_LENGTH: usize = 43;

/// Maximum verifier length per RFC 7636.
pub const MAX_VERIFIER_LENGTH: usize = 128;

/// Number of random bytes behind the CSRF state value.
const STATE_ENTROPY_BYTES: usize = 32;

/// One authorization attempt's PKCE material.
#[derive(Debug, Clone)]
pub struct PkceParams {
    pub code_verifier: String,
    pub code_challenge: String,
    pub state: String,
}

impl PkceParams {
    /// Generate fresh parameters for a new authorization attempt.
    #[must_use]
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier(DEFAULT_VERIFIER_LENGTH);
        let code_challenge = generate_code_challenge(&code_verifier);
        let state = generate_state();
        Self { code_verifier, code_challenge, state }
    }

    /// Challenge method sent to the identity provider. Always S256; the
    /// `plain` method is never used.
    #[must_use]
    pub fn challenge_method() -> &'static str {
        "S256"
    }
}

/// Generate a code verifier of `length` characters from the RFC 7636
/// unreserved charset.
///
/// Lengths outside 43..=128 are clamped into range. Each output character maps
/// one random byte through the charset by modulo.
#[must_use]
pub fn generate_code_verifier(length: usize) -> String {
    let length = length.clamp(MIN_VERIFIER_LENGTH, MAX_VERIFIER_LENGTH);
    let mut bytes = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| VERIFIER_CHARSET[(*b as usize) % VERIFIER_CHARSET.len()] as char)
        .collect()
}

/// Derive the S256 code challenge: base64url(SHA-256(verifier)), no padding.
#[must_use]
pub fn generate_code_challenge(code_verifier: &str) -> String {
    let digest = Sha256::digest(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Generate a CSRF state value: 32 random bytes, base64url without padding.
#[must_use]
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_ENTROPY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Check that a string is a syntactically valid code verifier.
#[must_use]
pub fn is_valid_code_verifier(value: &str) -> bool {
    (MIN_VERIFIER_LENGTH..=MAX_VERIFIER_LENGTH).contains(&value.len())
        && value.bytes().all(|b| VERIFIER_CHARSET.contains(&b))
}

/// Check that a string looks like a state value this module generated.
#[must_use]
pub fn is_valid_state(value: &str) -> bool {
    !value.is_empty() && URL_SAFE_NO_PAD.decode(value).is_ok_and(|bytes| bytes.len() == STATE_ENTROPY_BYTES)
}

#[cfg(test)]
mod tests {
    //! Unit tests for PKCE generation and validation.
    use std::collections::HashSet;

    use super::*;

    /// Validates `generate_code_verifier` output for the default length
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures the verifier is 128 characters of the unreserved charset.
    #[test]
    fn test_verifier_default_length_and_charset() {
        let verifier = generate_code_verifier(DEFAULT_VERIFIER_LENGTH);
        assert_eq!(verifier.len(), 128);
        assert!(is_valid_code_verifier(&verifier));
    }

    /// Validates `generate_code_verifier` clamping for out-of-range length
    /// scenarios.
    ///
    /// Assertions:
    /// - Confirms short requests are raised to 43 and long ones capped at 128.
    #[test]
    fn test_verifier_length_clamped() {
        assert_eq!(generate_code_verifier(10).len(), MIN_VERIFIER_LENGTH);
        assert_eq!(generate_code_verifier(4096).len(), MAX_VERIFIER_LENGTH);
        assert_eq!(generate_code_verifier(64).len(), 64);
    }

    /// Validates `generate_code_challenge` against the RFC 7636 appendix B
    /// test vector.
    ///
    /// Assertions:
    /// - Confirms the known verifier hashes to the known challenge.
    #[test]
    fn test_challenge_rfc7636_vector() {
        let challenge = generate_code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    /// Validates `generate_code_challenge` output shape for a generated
    /// verifier.
    ///
    /// Assertions:
    /// - Ensures base64url without padding (43 chars for a 32-byte digest).
    #[test]
    fn test_challenge_is_unpadded_base64url() {
        let challenge = generate_code_challenge(&generate_code_verifier(DEFAULT_VERIFIER_LENGTH));
        assert_eq!(challenge.len(), 43);
        assert!(!challenge.contains('='));
        assert!(!challenge.contains('+'));
        assert!(!challenge.contains('/'));
    }

    /// Validates `generate_state` output for the uniqueness scenario.
    ///
    /// Assertions:
    /// - Ensures states validate and do not repeat across generations.
    #[test]
    fn test_state_unique_and_valid() {
        let states: HashSet<String> = (0..64).map(|_| generate_state()).collect();
        assert_eq!(states.len(), 64);
        for state in &states {
            assert!(is_valid_state(state));
        }
    }

    /// Validates `is_valid_state` rejection for malformed input scenarios.
    ///
    /// Assertions:
    /// - Rejects empty, non-base64url, and wrong-length values.
    #[test]
    fn test_state_validation_rejects_malformed() {
        assert!(!is_valid_state(""));
        assert!(!is_valid_state("not base64!"));
        assert!(!is_valid_state("c2hvcnQ"));
    }

    /// Validates `PkceParams::generate` for the combined generation scenario.
    ///
    /// Assertions:
    /// - Ensures the challenge matches the verifier and the method is S256.
    #[test]
    fn test_params_internally_consistent() {
        let params = PkceParams::generate();
        assert!(is_valid_code_verifier(&params.code_verifier));
        assert_eq!(params.code_challenge, generate_code_challenge(&params.code_verifier));
        assert!(is_valid_state(&params.state));
        assert_eq!(PkceParams::challenge_method(), "S256");
    }
}
