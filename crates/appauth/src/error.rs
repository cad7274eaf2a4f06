//! Error taxonomy for authorization flows.
//!
//! Protocol failures are modeled as [`AuthorizationError`] values: a numeric
//! domain plus a numeric code, optionally carrying the server-provided
//! `error`, `error_description` and `error_uri`, and an underlying cause.
//!
//! # Overview
//!
//! Each domain has a fixed catalog of named errors:
//!
//! | Domain | Catalog | Codes |
//! |---|---|---|
//! | [`ErrorDomain::General`] | [`GeneralError`] | 0-999 |
//! | [`ErrorDomain::OAuthAuthorization`] | [`AuthorizationRequestError`] | 1000-1999 |
//! | [`ErrorDomain::OAuthToken`] | [`TokenRequestError`] | 2000-2999 |
//! | [`ErrorDomain::ResourceServer`] | [`ResourceServerError`] | 3000-3999 |
//! | [`ErrorDomain::OAuthRegistration`] | [`RegistrationRequestError`] | 4000-4999 |
//! | [`ErrorDomain::Http`] | status code | 100-599 |
//!
//! Two errors are equal when their domain and code are equal, regardless of
//! the descriptive fields.
//!
//! # Example
//!
//! ```ignore
//! use appauth::error::{AuthorizationError, AuthorizationRequestError};
//!
//! let err = AuthorizationError::from_oauth_error(
//!     AuthorizationRequestError::from_error_string("access_denied"),
//!     Some("access_denied"),
//!     Some("The user said no"),
//!     None,
//! );
//! assert_eq!(err, AuthorizationError::from(AuthorizationRequestError::AccessDenied));
//! ```
//!
//! # References
//!
//! - [RFC 6749 Section 4.1.2.1](https://tools.ietf.org/html/rfc6749#section-4.1.2.1)
//! - [RFC 6749 Section 5.2](https://tools.ietf.org/html/rfc6749#section-5.2)
//! - [RFC 6750 Section 3.1](https://tools.ietf.org/html/rfc6750#section-3.1)
//! - [RFC 7591 Section 3.2.2](https://tools.ietf.org/html/rfc7591#section-3.2.2)

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::pkce::PkceError;

// =============================================================================
// Error Domains
// =============================================================================

/// The numeric domain an [`AuthorizationError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorDomain {
    /// Library and transport errors.
    General,
    /// Errors returned in an authorization redirect.
    OAuthAuthorization,
    /// Errors returned by the token endpoint.
    OAuthToken,
    /// Errors returned by a protected resource.
    ResourceServer,
    /// Errors returned by the registration endpoint.
    OAuthRegistration,
    /// Unsuccessful HTTP responses without an OAuth error body.
    Http,
}

impl ErrorDomain {
    /// Returns the numeric value used in the JSON representation.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::General => 0,
            Self::OAuthAuthorization => 1,
            Self::OAuthToken => 2,
            Self::ResourceServer => 3,
            Self::OAuthRegistration => 4,
            Self::Http => 5,
        }
    }

    /// Parses the numeric domain value.
    #[must_use]
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::General),
            1 => Some(Self::OAuthAuthorization),
            2 => Some(Self::OAuthToken),
            3 => Some(Self::ResourceServer),
            4 => Some(Self::OAuthRegistration),
            5 => Some(Self::Http),
            _ => None,
        }
    }

    /// Returns `true` for the domains that carry OAuth protocol errors.
    #[must_use]
    pub const fn is_oauth(self) -> bool {
        matches!(
            self,
            Self::OAuthAuthorization | Self::OAuthToken | Self::OAuthRegistration
        )
    }
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::General => "general",
            Self::OAuthAuthorization => "authorization",
            Self::OAuthToken => "token",
            Self::ResourceServer => "resource_server",
            Self::OAuthRegistration => "registration",
            Self::Http => "http",
        };
        write!(f, "{name}")
    }
}

// =============================================================================
// Authorization Error
// =============================================================================

/// A structured authorization flow error.
///
/// Equality and hashing consider only [`domain`](Self::domain) and
/// [`code`](Self::code).
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "AuthorizationErrorJson", into = "AuthorizationErrorJson")]
pub struct AuthorizationError {
    domain: ErrorDomain,
    code: i32,
    error: Option<String>,
    error_description: Option<String>,
    error_uri: Option<String>,
    cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl AuthorizationError {
    /// Creates an error from its raw parts.
    #[must_use]
    pub fn new(
        domain: ErrorDomain,
        code: i32,
        error: Option<String>,
        error_description: Option<String>,
        error_uri: Option<String>,
    ) -> Self {
        Self {
            domain,
            code,
            error,
            error_description,
            error_uri,
            cause: None,
        }
    }

    /// Creates an error from a catalog entry, keeping the template's
    /// description and attaching `cause`.
    #[must_use]
    pub fn from_template<T, E>(template: T, cause: E) -> Self
    where
        T: Into<Self>,
        E: std::error::Error + Send + Sync + 'static,
    {
        template.into().with_cause(cause)
    }

    /// Creates an error from a catalog entry and the fields of an OAuth error
    /// response. Each provided field overrides the template's value.
    #[must_use]
    pub fn from_oauth_error<T: Into<Self>>(
        template: T,
        error: Option<&str>,
        error_description: Option<&str>,
        error_uri: Option<&str>,
    ) -> Self {
        let mut base = template.into();
        if let Some(error) = error {
            base.error = Some(error.to_string());
        }
        if let Some(description) = error_description {
            base.error_description = Some(description.to_string());
        }
        if let Some(uri) = error_uri {
            base.error_uri = Some(uri.to_string());
        }
        base
    }

    /// Creates an [`ErrorDomain::Http`] error for an unsuccessful response.
    /// The code is the HTTP status and the description is the raw body.
    #[must_use]
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::new(
            ErrorDomain::Http,
            i32::from(status),
            None,
            Some(body.into()),
            None,
        )
    }

    /// Attaches an underlying cause.
    #[must_use]
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Replaces the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.error_description = Some(description.into());
        self
    }

    /// The error domain.
    #[must_use]
    pub fn domain(&self) -> ErrorDomain {
        self.domain
    }

    /// The numeric code within the domain.
    #[must_use]
    pub fn code(&self) -> i32 {
        self.code
    }

    /// The OAuth `error` string, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Human readable description.
    #[must_use]
    pub fn error_description(&self) -> Option<&str> {
        self.error_description.as_deref()
    }

    /// URI of a page describing the error.
    #[must_use]
    pub fn error_uri(&self) -> Option<&str> {
        self.error_uri.as_deref()
    }

    /// Underlying cause, if any. Never serialized.
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Returns `true` if this error belongs to `domain`.
    #[must_use]
    pub fn is_domain(&self, domain: ErrorDomain) -> bool {
        self.domain == domain
    }

    /// Serializes to the persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<serde_json::Value, ParseError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Serializes to a JSON string.
    ///
    /// # Errors
    ///
    /// As [`Self::to_json`].
    pub fn to_json_string(&self) -> Result<String, ParseError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses the persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the JSON is malformed or the domain is unknown.
    pub fn from_json_str(json: &str) -> Result<Self, ParseError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl PartialEq for AuthorizationError {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain && self.code == other.code
    }
}

impl Eq for AuthorizationError {}

impl Hash for AuthorizationError {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.domain.hash(state);
        self.code.hash(state);
    }
}

impl fmt::Debug for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationError")
            .field("domain", &self.domain)
            .field("code", &self.code)
            .field("error", &self.error)
            .field("error_description", &self.error_description)
            .field("error_uri", &self.error_uri)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .finish()
    }
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error {}", self.domain, self.code)?;
        if let Some(error) = &self.error {
            write!(f, " ({error})")?;
        }
        if let Some(description) = &self.error_description {
            write!(f, ": {description}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AuthorizationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

#[derive(Serialize, Deserialize)]
struct AuthorizationErrorJson {
    #[serde(rename = "type")]
    domain: i32,
    code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(
        rename = "errorDescription",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    error_description: Option<String>,
    #[serde(rename = "errorUri", default, skip_serializing_if = "Option::is_none")]
    error_uri: Option<String>,
}

impl From<AuthorizationError> for AuthorizationErrorJson {
    fn from(err: AuthorizationError) -> Self {
        Self {
            domain: err.domain.as_i32(),
            code: err.code,
            error: err.error,
            error_description: err.error_description,
            error_uri: err.error_uri,
        }
    }
}

impl TryFrom<AuthorizationErrorJson> for AuthorizationError {
    type Error = String;

    fn try_from(json: AuthorizationErrorJson) -> Result<Self, Self::Error> {
        let domain = ErrorDomain::from_i32(json.domain)
            .ok_or_else(|| format!("unknown error type {}", json.domain))?;
        Ok(Self::new(
            domain,
            json.code,
            json.error,
            json.error_description,
            json.error_uri,
        ))
    }
}

// =============================================================================
// Catalogs
// =============================================================================

/// General library errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneralError {
    /// The discovery document is missing a mandatory field or is malformed.
    InvalidDiscoveryDocument,
    /// The user cancelled the authorization flow.
    UserCanceledAuthFlow,
    /// The flow was cancelled by the application.
    ProgramCanceledAuthFlow,
    /// The HTTP exchange failed before a response was received.
    NetworkError,
    /// The server returned an unusable response.
    ServerError,
    /// A response body was not valid JSON.
    JsonDeserializationError,
    /// A token response could not be assembled.
    TokenResponseConstructionError,
    /// A registration response is missing required fields.
    InvalidRegistrationResponse,
    /// The ID token could not be decoded.
    IdTokenParsingError,
    /// The ID token failed validation.
    IdTokenValidationError,
    /// The redirect's `state` does not match the request.
    StateMismatch,
}

impl GeneralError {
    /// Numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::InvalidDiscoveryDocument => 0,
            Self::UserCanceledAuthFlow => 1,
            Self::ProgramCanceledAuthFlow => 2,
            Self::NetworkError => 3,
            Self::ServerError => 4,
            Self::JsonDeserializationError => 5,
            Self::TokenResponseConstructionError => 6,
            Self::InvalidRegistrationResponse => 7,
            Self::IdTokenParsingError => 8,
            Self::IdTokenValidationError => 9,
            Self::StateMismatch => 10,
        }
    }

    /// Default description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::InvalidDiscoveryDocument => "Invalid discovery document",
            Self::UserCanceledAuthFlow => "User cancelled flow",
            Self::ProgramCanceledAuthFlow => "Flow cancelled programmatically",
            Self::NetworkError => "Network error",
            Self::ServerError => "Server error",
            Self::JsonDeserializationError => "JSON deserialization error",
            Self::TokenResponseConstructionError => "Token response construction error",
            Self::InvalidRegistrationResponse => "Invalid registration response",
            Self::IdTokenParsingError => "Unable to parse ID Token",
            Self::IdTokenValidationError => "Invalid ID Token",
            Self::StateMismatch => "Response state param did not match request state",
        }
    }
}

impl From<GeneralError> for AuthorizationError {
    fn from(err: GeneralError) -> Self {
        Self::new(
            ErrorDomain::General,
            err.code(),
            None,
            Some(err.description().to_string()),
            None,
        )
    }
}

/// Errors returned in an authorization redirect (RFC 6749 Section 4.1.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorizationRequestError {
    /// `invalid_request`
    InvalidRequest,
    /// `unauthorized_client`
    UnauthorizedClient,
    /// `access_denied`
    AccessDenied,
    /// `unsupported_response_type`
    UnsupportedResponseType,
    /// `invalid_scope`
    InvalidScope,
    /// `server_error`
    ServerError,
    /// `temporarily_unavailable`
    TemporarilyUnavailable,
    /// A client-side failure while handling the authorization flow.
    ClientError,
    /// An unrecognized error string.
    Other,
}

impl AuthorizationRequestError {
    /// Numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::InvalidRequest => 1000,
            Self::UnauthorizedClient => 1001,
            Self::AccessDenied => 1002,
            Self::UnsupportedResponseType => 1003,
            Self::InvalidScope => 1004,
            Self::ServerError => 1005,
            Self::TemporarilyUnavailable => 1006,
            Self::ClientError => 1007,
            Self::Other => 1008,
        }
    }

    /// The OAuth `error` string, if this entry has one.
    #[must_use]
    pub const fn error(self) -> Option<&'static str> {
        match self {
            Self::InvalidRequest => Some("invalid_request"),
            Self::UnauthorizedClient => Some("unauthorized_client"),
            Self::AccessDenied => Some("access_denied"),
            Self::UnsupportedResponseType => Some("unsupported_response_type"),
            Self::InvalidScope => Some("invalid_scope"),
            Self::ServerError => Some("server_error"),
            Self::TemporarilyUnavailable => Some("temporarily_unavailable"),
            Self::ClientError | Self::Other => None,
        }
    }

    /// Looks up an OAuth `error` string, falling back to [`Self::Other`].
    #[must_use]
    pub fn from_error_string(error: &str) -> Self {
        [
            Self::InvalidRequest,
            Self::UnauthorizedClient,
            Self::AccessDenied,
            Self::UnsupportedResponseType,
            Self::InvalidScope,
            Self::ServerError,
            Self::TemporarilyUnavailable,
        ]
        .into_iter()
        .find(|e| e.error() == Some(error))
        .unwrap_or(Self::Other)
    }
}

impl From<AuthorizationRequestError> for AuthorizationError {
    fn from(err: AuthorizationRequestError) -> Self {
        Self::new(
            ErrorDomain::OAuthAuthorization,
            err.code(),
            err.error().map(String::from),
            None,
            None,
        )
    }
}

/// Errors returned by the token endpoint (RFC 6749 Section 5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenRequestError {
    /// `invalid_request`
    InvalidRequest,
    /// `invalid_client`
    InvalidClient,
    /// `invalid_grant`
    InvalidGrant,
    /// `unauthorized_client`
    UnauthorizedClient,
    /// `unsupported_grant_type`
    UnsupportedGrantType,
    /// `invalid_scope`
    InvalidScope,
    /// A client-side failure while handling the token exchange.
    ClientError,
    /// An unrecognized error string.
    Other,
}

impl TokenRequestError {
    /// Numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::InvalidRequest => 2000,
            Self::InvalidClient => 2001,
            Self::InvalidGrant => 2002,
            Self::UnauthorizedClient => 2003,
            Self::UnsupportedGrantType => 2004,
            Self::InvalidScope => 2005,
            Self::ClientError => 2006,
            Self::Other => 2007,
        }
    }

    /// The OAuth `error` string, if this entry has one.
    #[must_use]
    pub const fn error(self) -> Option<&'static str> {
        match self {
            Self::InvalidRequest => Some("invalid_request"),
            Self::InvalidClient => Some("invalid_client"),
            Self::InvalidGrant => Some("invalid_grant"),
            Self::UnauthorizedClient => Some("unauthorized_client"),
            Self::UnsupportedGrantType => Some("unsupported_grant_type"),
            Self::InvalidScope => Some("invalid_scope"),
            Self::ClientError | Self::Other => None,
        }
    }

    /// Looks up an OAuth `error` string, falling back to [`Self::Other`].
    #[must_use]
    pub fn from_error_string(error: &str) -> Self {
        [
            Self::InvalidRequest,
            Self::InvalidClient,
            Self::InvalidGrant,
            Self::UnauthorizedClient,
            Self::UnsupportedGrantType,
            Self::InvalidScope,
        ]
        .into_iter()
        .find(|e| e.error() == Some(error))
        .unwrap_or(Self::Other)
    }
}

impl From<TokenRequestError> for AuthorizationError {
    fn from(err: TokenRequestError) -> Self {
        Self::new(
            ErrorDomain::OAuthToken,
            err.code(),
            err.error().map(String::from),
            None,
            None,
        )
    }
}

/// Errors returned by a protected resource (RFC 6750 Section 3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceServerError {
    /// `invalid_request`
    InvalidRequest,
    /// `invalid_token`
    InvalidToken,
    /// `insufficient_scope`
    InsufficientScope,
    /// An unrecognized error string.
    Other,
}

impl ResourceServerError {
    /// Numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::InvalidRequest => 3000,
            Self::InvalidToken => 3001,
            Self::InsufficientScope => 3002,
            Self::Other => 3003,
        }
    }

    /// The OAuth `error` string, if this entry has one.
    #[must_use]
    pub const fn error(self) -> Option<&'static str> {
        match self {
            Self::InvalidRequest => Some("invalid_request"),
            Self::InvalidToken => Some("invalid_token"),
            Self::InsufficientScope => Some("insufficient_scope"),
            Self::Other => None,
        }
    }

    /// Looks up an OAuth `error` string, falling back to [`Self::Other`].
    #[must_use]
    pub fn from_error_string(error: &str) -> Self {
        [Self::InvalidRequest, Self::InvalidToken, Self::InsufficientScope]
            .into_iter()
            .find(|e| e.error() == Some(error))
            .unwrap_or(Self::Other)
    }
}

impl From<ResourceServerError> for AuthorizationError {
    fn from(err: ResourceServerError) -> Self {
        Self::new(
            ErrorDomain::ResourceServer,
            err.code(),
            err.error().map(String::from),
            None,
            None,
        )
    }
}

/// Errors returned by the registration endpoint (RFC 7591 Section 3.2.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationRequestError {
    /// `invalid_request`
    InvalidRequest,
    /// `invalid_redirect_uri`
    InvalidRedirectUri,
    /// `invalid_client_metadata`
    InvalidClientMetadata,
    /// A client-side failure while handling the registration.
    ClientError,
    /// An unrecognized error string.
    Other,
}

impl RegistrationRequestError {
    /// Numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::InvalidRequest => 4000,
            Self::InvalidRedirectUri => 4001,
            Self::InvalidClientMetadata => 4002,
            Self::ClientError => 4003,
            Self::Other => 4004,
        }
    }

    /// The OAuth `error` string, if this entry has one.
    #[must_use]
    pub const fn error(self) -> Option<&'static str> {
        match self {
            Self::InvalidRequest => Some("invalid_request"),
            Self::InvalidRedirectUri => Some("invalid_redirect_uri"),
            Self::InvalidClientMetadata => Some("invalid_client_metadata"),
            Self::ClientError | Self::Other => None,
        }
    }

    /// Looks up an OAuth `error` string, falling back to [`Self::Other`].
    #[must_use]
    pub fn from_error_string(error: &str) -> Self {
        [
            Self::InvalidRequest,
            Self::InvalidRedirectUri,
            Self::InvalidClientMetadata,
        ]
        .into_iter()
        .find(|e| e.error() == Some(error))
        .unwrap_or(Self::Other)
    }
}

impl From<RegistrationRequestError> for AuthorizationError {
    fn from(err: RegistrationRequestError) -> Self {
        Self::new(
            ErrorDomain::OAuthRegistration,
            err.code(),
            err.error().map(String::from),
            None,
            None,
        )
    }
}

// =============================================================================
// Model Errors
// =============================================================================

/// Errors raised while parsing protocol documents and persisted JSON.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// A mandatory field is missing or null.
    #[error("Missing mandatory field: {0}")]
    MissingArgument(String),

    /// A field is present but has the wrong shape.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Name of the offending field.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// The input is not valid JSON, or does not match the expected layout.
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A URI field could not be parsed.
    #[error("Invalid URI: {0}")]
    Uri(#[from] url::ParseError),
}

impl ParseError {
    /// Create a `MissingArgument` error.
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingArgument(field.into())
    }

    /// Create an `InvalidValue` error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if a mandatory field was missing.
    #[must_use]
    pub fn is_missing_argument(&self) -> bool {
        matches!(self, Self::MissingArgument(_))
    }

    /// Name of the missing field, for `MissingArgument` errors.
    #[must_use]
    pub fn missing_field(&self) -> Option<&str> {
        match self {
            Self::MissingArgument(field) => Some(field),
            _ => None,
        }
    }
}

/// Errors raised when a request builder is given an inconsistent set of
/// fields.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A mandatory field was not provided.
    #[error("{0} must be specified")]
    Missing(&'static str),

    /// A mandatory field was provided but empty.
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// An additional parameter collides with a built-in parameter.
    #[error("Parameter {0} is directly supported via the builder, use the dedicated method")]
    ReservedParameter(String),

    /// Two mutually exclusive fields were both set.
    #[error("{0} and {1} are mutually exclusive")]
    MutuallyExclusive(&'static str, &'static str),

    /// The PKCE code verifier is malformed.
    #[error(transparent)]
    Pkce(#[from] PkceError),
}

impl BuildError {
    /// Returns `true` if an additional parameter used a reserved name.
    #[must_use]
    pub fn is_reserved_parameter(&self) -> bool {
        matches!(self, Self::ReservedParameter(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_description() {
        let a = AuthorizationError::from(TokenRequestError::InvalidGrant)
            .with_description("first");
        let b = AuthorizationError::from(TokenRequestError::InvalidGrant)
            .with_description("second");
        assert_eq!(a, b);
    }

    #[test]
    fn test_inequality_on_code() {
        let a = AuthorizationError::from(TokenRequestError::InvalidGrant);
        let b = AuthorizationError::from(TokenRequestError::InvalidClient);
        assert_ne!(a, b);
    }

    #[test]
    fn test_inequality_across_domains() {
        // Both catalogs name this "invalid_request" but live in different domains.
        let a = AuthorizationError::from(TokenRequestError::InvalidRequest);
        let b = AuthorizationError::from(AuthorizationRequestError::InvalidRequest);
        assert_ne!(a, b);
    }

    #[test]
    fn test_access_denied_code() {
        let err: AuthorizationError = AuthorizationRequestError::AccessDenied.into();
        assert_eq!(err.domain().as_i32(), 1);
        assert_eq!(err.code(), 1002);
        assert_eq!(err.error(), Some("access_denied"));
    }

    #[test]
    fn test_from_error_string_fallback() {
        assert_eq!(
            AuthorizationRequestError::from_error_string("access_denied"),
            AuthorizationRequestError::AccessDenied
        );
        assert_eq!(
            AuthorizationRequestError::from_error_string("login_required"),
            AuthorizationRequestError::Other
        );
        assert_eq!(
            TokenRequestError::from_error_string("invalid_grant"),
            TokenRequestError::InvalidGrant
        );
        assert_eq!(
            RegistrationRequestError::from_error_string("invalid_redirect_uri"),
            RegistrationRequestError::InvalidRedirectUri
        );
        assert_eq!(
            ResourceServerError::from_error_string("insufficient_scope"),
            ResourceServerError::InsufficientScope
        );
    }

    #[test]
    fn test_oauth_error_overrides() {
        let err = AuthorizationError::from_oauth_error(
            AuthorizationRequestError::Other,
            Some("login_required"),
            Some("User must log in"),
            Some("https://example.com/help"),
        );
        assert_eq!(err, AuthorizationError::from(AuthorizationRequestError::Other));
        assert_eq!(err.error(), Some("login_required"));
        assert_eq!(err.error_description(), Some("User must log in"));
        assert_eq!(err.error_uri(), Some("https://example.com/help"));
    }

    #[test]
    fn test_general_codes_are_unique() {
        let all = [
            GeneralError::InvalidDiscoveryDocument,
            GeneralError::UserCanceledAuthFlow,
            GeneralError::ProgramCanceledAuthFlow,
            GeneralError::NetworkError,
            GeneralError::ServerError,
            GeneralError::JsonDeserializationError,
            GeneralError::TokenResponseConstructionError,
            GeneralError::InvalidRegistrationResponse,
            GeneralError::IdTokenParsingError,
            GeneralError::IdTokenValidationError,
            GeneralError::StateMismatch,
        ];
        let codes: std::collections::HashSet<i32> = all.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn test_http_error() {
        let err = AuthorizationError::http(503, "unavailable");
        assert_eq!(err.domain(), ErrorDomain::Http);
        assert_eq!(err.code(), 503);
        assert_eq!(err.error_description(), Some("unavailable"));
    }

    #[test]
    fn test_json_round_trip_drops_cause() {
        let err = AuthorizationError::from_template(
            GeneralError::NetworkError,
            std::io::Error::other("connection reset"),
        );
        assert!(std::error::Error::source(&err).is_some());

        let json = err.to_json_string().unwrap();
        assert!(!json.contains("connection reset"));

        let parsed = AuthorizationError::from_json_str(&json).unwrap();
        assert_eq!(parsed, err);
        assert_eq!(parsed.error_description(), Some("Network error"));
        assert!(parsed.cause().is_none());
    }

    #[test]
    fn test_json_field_names() {
        let err = AuthorizationError::from_oauth_error(
            TokenRequestError::InvalidGrant,
            None,
            Some("expired"),
            Some("https://example.com"),
        );
        let json = err.to_json().unwrap();
        assert_eq!(json["type"], 2);
        assert_eq!(json["code"], 2002);
        assert_eq!(json["error"], "invalid_grant");
        assert_eq!(json["errorDescription"], "expired");
        assert_eq!(json["errorUri"], "https://example.com");
    }

    #[test]
    fn test_json_omits_absent_fields() {
        let err = AuthorizationError::from_oauth_error(
            TokenRequestError::InvalidGrant,
            None,
            Some("expired"),
            None,
        );
        let json = err.to_json().unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["code", "error", "errorDescription", "type"]);
        assert_eq!(AuthorizationError::from_json_str(&json.to_string()).unwrap(), err);
    }

    #[test]
    fn test_json_unknown_domain_rejected() {
        let result = AuthorizationError::from_json_str(r#"{"type":42,"code":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        let err = AuthorizationError::from_oauth_error(
            TokenRequestError::InvalidGrant,
            None,
            Some("expired"),
            None,
        );
        assert_eq!(err.to_string(), "token error 2002 (invalid_grant): expired");
    }

    #[test]
    fn test_parse_error_missing_field() {
        let err = ParseError::missing("jwks_uri");
        assert!(err.is_missing_argument());
        assert_eq!(err.missing_field(), Some("jwks_uri"));
        assert_eq!(err.to_string(), "Missing mandatory field: jwks_uri");
    }
}
