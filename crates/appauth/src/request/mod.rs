//! Request models.
//!
//! Requests are immutable values produced by validating builders. Each one
//! serializes to the wire form its endpoint expects and to a self-contained
//! JSON form (including the [`ServiceConfiguration`](crate::ServiceConfiguration))
//! for persistence.
//!
//! - [`AuthorizationRequest`] - front-channel authorization request
//! - [`TokenRequest`] - code exchange and refresh
//! - [`RegistrationRequest`] - dynamic client registration
//! - [`EndSessionRequest`] - RP-initiated logout

pub mod authorization;
pub mod end_session;
pub mod registration;
pub mod token;

pub use authorization::{AuthorizationRequest, AuthorizationRequestBuilder};
pub use end_session::{EndSessionRequest, EndSessionRequestBuilder};
pub use registration::{RegistrationRequest, RegistrationRequestBuilder};
pub use token::{TokenRequest, TokenRequestBuilder};

use url::Url;

use crate::error::ParseError;
use crate::pkce::random_url_safe_string;

/// Number of random bytes in generated `state` and `nonce` values.
const STATE_ENTROPY: usize = 16;

/// Standard `grant_type` values.
pub mod grant_types {
    /// RFC 6749 Section 4.1
    pub const AUTHORIZATION_CODE: &str = "authorization_code";
    /// RFC 6749 Section 4.2
    pub const IMPLICIT: &str = "implicit";
    /// RFC 6749 Section 4.3
    pub const PASSWORD: &str = "password";
    /// RFC 6749 Section 4.4
    pub const CLIENT_CREDENTIALS: &str = "client_credentials";
    /// RFC 6749 Section 6
    pub const REFRESH_TOKEN: &str = "refresh_token";
}

/// Standard `response_type` values.
pub mod response_types {
    /// Authorization code flow.
    pub const CODE: &str = "code";
    /// Implicit flow access token.
    pub const TOKEN: &str = "token";
    /// OpenID Connect ID token.
    pub const ID_TOKEN: &str = "id_token";
}

/// A request completed by sending the user through a browser.
pub trait AuthorizationManagementRequest {
    /// The `state` value the redirect must echo back.
    fn state(&self) -> Option<&str>;

    /// The URI to open in the user agent.
    fn to_uri(&self) -> Url;

    /// The persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if serialization fails.
    fn to_json_string(&self) -> Result<String, ParseError>;
}

/// Generates an opaque value suitable for `state` or `nonce`.
#[must_use]
pub fn generate_random_state() -> String {
    random_url_safe_string(STATE_ENTROPY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_state() {
        let a = generate_random_state();
        let b = generate_random_state();
        // 16 bytes -> 22 base64url characters
        assert_eq!(a.len(), 22);
        assert_ne!(a, b);
    }
}
