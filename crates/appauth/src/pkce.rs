//! PKCE (Proof Key for Code Exchange) code verifier generation.
//!
//! Implements the client side of RFC 7636: generating a high-entropy code
//! verifier and deriving the `S256` code challenge sent with the
//! authorization request.
//!
//! # Example
//!
//! ```
//! use appauth::pkce::{
//!     code_verifier_challenge_method, derive_code_verifier_challenge,
//!     generate_random_code_verifier,
//! };
//!
//! let verifier = generate_random_code_verifier();
//! let challenge = derive_code_verifier_challenge(&verifier);
//! assert_eq!(code_verifier_challenge_method().as_str(), "S256");
//! assert_ne!(verifier, challenge);
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Minimum number of random bytes used for a code verifier.
pub const MIN_CODE_VERIFIER_ENTROPY: usize = 32;

/// Maximum number of random bytes used for a code verifier.
pub const MAX_CODE_VERIFIER_ENTROPY: usize = 96;

/// Default number of random bytes used for a code verifier.
pub const DEFAULT_CODE_VERIFIER_ENTROPY: usize = 64;

/// Minimum code verifier length in characters.
pub const MIN_CODE_VERIFIER_LENGTH: usize = 43;

/// Maximum code verifier length in characters.
pub const MAX_CODE_VERIFIER_LENGTH: usize = 128;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during PKCE operations.
#[derive(Debug, thiserror::Error)]
pub enum PkceError {
    /// Verifier length is outside the valid range (43-128 characters).
    #[error("Invalid verifier length: must be 43-128 characters, got {0}")]
    InvalidVerifierLength(usize),

    /// Verifier contains invalid characters.
    #[error("Invalid verifier characters: must be URL-safe base64 ([A-Za-z0-9-._~])")]
    InvalidVerifierCharacters,

    /// Requested entropy is outside 32-96 bytes.
    #[error("Invalid entropy: must be 32-96 bytes, got {0}")]
    InvalidEntropy(usize),

    /// Unknown challenge method.
    #[error("Unsupported challenge method: {0}")]
    UnsupportedMethod(String),
}

impl PkceError {
    /// Returns `true` if this is a verifier validation error.
    #[must_use]
    pub fn is_verifier_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidVerifierLength(_) | Self::InvalidVerifierCharacters
        )
    }
}

// =============================================================================
// Challenge Method
// =============================================================================

/// PKCE challenge method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CodeChallengeMethod {
    /// `BASE64URL(SHA256(ASCII(code_verifier)))`
    #[default]
    S256,
    /// The challenge is the verifier itself.
    Plain,
}

impl CodeChallengeMethod {
    /// Parse challenge method from string.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::UnsupportedMethod` for anything but `S256` and `plain`.
    pub fn parse(method: &str) -> Result<Self, PkceError> {
        match method {
            "S256" => Ok(Self::S256),
            "plain" => Ok(Self::Plain),
            other => Err(PkceError::UnsupportedMethod(other.to_string())),
        }
    }

    /// Get the method as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }
}

impl std::fmt::Display for CodeChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Verifier and Challenge
// =============================================================================

/// Generates a code verifier from [`DEFAULT_CODE_VERIFIER_ENTROPY`] random bytes.
#[must_use]
pub fn generate_random_code_verifier() -> String {
    random_url_safe_string(DEFAULT_CODE_VERIFIER_ENTROPY)
}

/// Generates a code verifier from `entropy` random bytes.
///
/// # Errors
///
/// Returns `PkceError::InvalidEntropy` if `entropy` is outside 32-96.
pub fn generate_random_code_verifier_with_entropy(entropy: usize) -> Result<String, PkceError> {
    if !(MIN_CODE_VERIFIER_ENTROPY..=MAX_CODE_VERIFIER_ENTROPY).contains(&entropy) {
        return Err(PkceError::InvalidEntropy(entropy));
    }
    Ok(random_url_safe_string(entropy))
}

/// Validates an externally supplied code verifier.
///
/// # Errors
///
/// Returns an error if:
/// - Length is not between 43 and 128 characters
/// - Contains characters other than `[A-Za-z0-9-._~]`
pub fn check_code_verifier(verifier: &str) -> Result<(), PkceError> {
    let len = verifier.len();
    if !(MIN_CODE_VERIFIER_LENGTH..=MAX_CODE_VERIFIER_LENGTH).contains(&len) {
        return Err(PkceError::InvalidVerifierLength(len));
    }

    if !verifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '~')
    {
        return Err(PkceError::InvalidVerifierCharacters);
    }

    Ok(())
}

/// Derives the challenge for `verifier` using [`code_verifier_challenge_method`].
///
/// Each character is hashed as a single byte. Verifiers are ASCII, so this is
/// the same as hashing the UTF-8 bytes.
#[must_use]
pub fn derive_code_verifier_challenge(verifier: &str) -> String {
    let bytes: Vec<u8> = verifier.chars().map(|c| c as u32 as u8).collect();
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// The challenge method used by [`derive_code_verifier_challenge`].
///
/// SHA-256 is always available, so this is always `S256`. Callers that pair
/// an external verifier with a `plain` challenge do so explicitly through
/// the request builder.
#[must_use]
pub fn code_verifier_challenge_method() -> CodeChallengeMethod {
    CodeChallengeMethod::S256
}

/// Encodes `len` bytes from the OS random source as unpadded base64url.
pub(crate) fn random_url_safe_string(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_length_for_entropy_range() {
        for entropy in MIN_CODE_VERIFIER_ENTROPY..=MAX_CODE_VERIFIER_ENTROPY {
            let verifier = generate_random_code_verifier_with_entropy(entropy).unwrap();
            assert!(
                (MIN_CODE_VERIFIER_LENGTH..=MAX_CODE_VERIFIER_LENGTH).contains(&verifier.len()),
                "entropy {} produced length {}",
                entropy,
                verifier.len()
            );
            assert!(check_code_verifier(&verifier).is_ok());
        }
    }

    #[test]
    fn test_default_verifier() {
        let verifier = generate_random_code_verifier();
        // 64 bytes -> 86 base64url characters
        assert_eq!(verifier.len(), 86);
        assert!(check_code_verifier(&verifier).is_ok());
    }

    #[test]
    fn test_verifier_uniqueness() {
        let v1 = generate_random_code_verifier();
        let v2 = generate_random_code_verifier();
        assert_ne!(v1, v2);
    }

    #[test]
    fn test_entropy_out_of_range() {
        assert!(matches!(
            generate_random_code_verifier_with_entropy(31),
            Err(PkceError::InvalidEntropy(31))
        ));
        assert!(matches!(
            generate_random_code_verifier_with_entropy(97),
            Err(PkceError::InvalidEntropy(97))
        ));
    }

    #[test]
    fn test_check_verifier_length() {
        assert!(matches!(
            check_code_verifier(&"a".repeat(42)),
            Err(PkceError::InvalidVerifierLength(42))
        ));
        assert!(check_code_verifier(&"a".repeat(43)).is_ok());
        assert!(check_code_verifier(&"a".repeat(128)).is_ok());
        assert!(matches!(
            check_code_verifier(&"a".repeat(129)),
            Err(PkceError::InvalidVerifierLength(129))
        ));
    }

    #[test]
    fn test_check_verifier_characters() {
        let valid = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-._~";
        assert!(check_code_verifier(valid).is_ok());

        let invalid = format!("{}+", "a".repeat(43));
        let err = check_code_verifier(&invalid).unwrap_err();
        assert!(err.is_verifier_error());
        assert!(matches!(err, PkceError::InvalidVerifierCharacters));
    }

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            derive_code_verifier_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_challenge_is_deterministic() {
        let verifier = generate_random_code_verifier();
        assert_eq!(
            derive_code_verifier_challenge(&verifier),
            derive_code_verifier_challenge(&verifier)
        );
    }

    #[test]
    fn test_challenge_method() {
        assert_eq!(code_verifier_challenge_method(), CodeChallengeMethod::S256);
        assert_eq!(
            CodeChallengeMethod::parse("plain").unwrap(),
            CodeChallengeMethod::Plain
        );
        assert!(CodeChallengeMethod::parse("S512").is_err());
    }
}
