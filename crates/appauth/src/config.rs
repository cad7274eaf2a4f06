//! Library configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! skip_issuer_https_check = false
//! request_timeout = "10s"
//! max_response_size = 1048576
//! pkce_entropy_bytes = 64
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pkce::{DEFAULT_CODE_VERIFIER_ENTROPY, MAX_CODE_VERIFIER_ENTROPY, MIN_CODE_VERIFIER_ENTROPY};

/// How long before expiry an access token is considered due for refresh.
pub const TOKEN_REFRESH_TOLERANCE: Duration = Duration::from_secs(60);

/// Settings shared by the authorization service and its transport.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppAuthConfig {
    /// Accept ID tokens whose issuer is not an `https` URL.
    /// Only for testing against local providers.
    pub skip_issuer_https_check: bool,

    /// Timeout for each HTTP exchange.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Largest response body accepted, in bytes.
    pub max_response_size: usize,

    /// Random bytes used for generated PKCE code verifiers.
    pub pkce_entropy_bytes: usize,
}

impl Default for AppAuthConfig {
    fn default() -> Self {
        Self {
            skip_issuer_https_check: false,
            request_timeout: Duration::from_secs(10),
            max_response_size: 1024 * 1024,
            pkce_entropy_bytes: DEFAULT_CODE_VERIFIER_ENTROPY,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration file could not be read.
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML.
    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AppAuthConfig {
    /// Sets whether the issuer HTTPS check is skipped.
    #[must_use]
    pub fn with_skip_issuer_https_check(mut self, skip: bool) -> Self {
        self.skip_issuer_https_check = skip;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the maximum response size.
    #[must_use]
    pub fn with_max_response_size(mut self, bytes: usize) -> Self {
        self.max_response_size = bytes;
        self
    }

    /// Sets the PKCE entropy.
    #[must_use]
    pub fn with_pkce_entropy_bytes(mut self, bytes: usize) -> Self {
        self.pkce_entropy_bytes = bytes;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - the request timeout is zero
    /// - the maximum response size is zero
    /// - the PKCE entropy is outside 32..=96 bytes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "request_timeout must be > 0".to_string(),
            ));
        }

        if self.max_response_size == 0 {
            return Err(ConfigError::InvalidValue(
                "max_response_size must be > 0".to_string(),
            ));
        }

        if !(MIN_CODE_VERIFIER_ENTROPY..=MAX_CODE_VERIFIER_ENTROPY)
            .contains(&self.pkce_entropy_bytes)
        {
            return Err(ConfigError::InvalidValue(format!(
                "pkce_entropy_bytes must be between {MIN_CODE_VERIFIER_ENTROPY} and \
                 {MAX_CODE_VERIFIER_ENTROPY}, got {}",
                self.pkce_entropy_bytes
            )));
        }

        Ok(())
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Toml` for malformed input, otherwise as
    /// [`Self::validate`].
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`Self::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loaded appauth configuration");
        Self::from_toml_str(&contents)
    }
}
