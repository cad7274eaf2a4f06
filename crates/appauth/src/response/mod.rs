//! Response models.
//!
//! Each response keeps the request that produced it, typed standard fields,
//! and any non-standard parameters the server returned.

pub mod authorization;
pub mod end_session;
pub mod registration;
pub mod token;

pub use authorization::{AuthorizationResponse, AuthorizationResponseBuilder};
pub use end_session::EndSessionResponse;
pub use registration::{RegistrationResponse, RegistrationResponseBuilder};
pub use token::{TokenResponse, TokenResponseBuilder};

use url::Url;

use crate::error::{AuthorizationError, AuthorizationRequestError, GeneralError};

/// Query parameters of a redirect, in order.
pub(crate) fn redirect_params(uri: &Url) -> Vec<(String, String)> {
    uri.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

pub(crate) fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Converts an `error` redirect into an authorization error, if present.
pub(crate) fn redirect_error(params: &[(String, String)]) -> Option<AuthorizationError> {
    let error = param(params, "error")?;
    Some(AuthorizationError::from_oauth_error(
        AuthorizationRequestError::from_error_string(error),
        Some(error),
        param(params, "error_description"),
        param(params, "error_uri"),
    ))
}

/// Strict `state` comparison, `None` matching only `None`.
pub(crate) fn verify_state(
    expected: Option<&str>,
    actual: Option<&str>,
) -> Result<(), AuthorizationError> {
    if expected == actual {
        Ok(())
    } else {
        tracing::warn!("State returned in redirect does not match the request");
        Err(GeneralError::StateMismatch.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_state() {
        assert!(verify_state(Some("a"), Some("a")).is_ok());
        assert!(verify_state(None, None).is_ok());
        assert_eq!(
            verify_state(Some("a"), Some("b")).unwrap_err(),
            AuthorizationError::from(GeneralError::StateMismatch)
        );
        assert!(verify_state(None, Some("a")).is_err());
        assert!(verify_state(Some("a"), None).is_err());
    }

    #[test]
    fn test_redirect_error() {
        let uri = Url::parse(
            "app:/cb?error=access_denied&error_description=nope&error_uri=https%3A%2F%2Fhelp",
        )
        .unwrap();
        let err = redirect_error(&redirect_params(&uri)).unwrap();
        assert_eq!(err, AuthorizationError::from(AuthorizationRequestError::AccessDenied));
        assert_eq!(err.error_description(), Some("nope"));
        assert_eq!(err.error_uri(), Some("https://help"));
    }
}
