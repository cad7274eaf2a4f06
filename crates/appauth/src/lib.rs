//! # appauth
//!
//! OAuth 2.0 and OpenID Connect client core for native applications.
//!
//! This crate provides:
//! - Authorization Code flow with PKCE (RFC 7636)
//! - OpenID Connect discovery and dynamic client registration (RFC 7591)
//! - ID token decoding and claim validation
//! - RP-initiated logout
//! - Persistent authorization state with coalesced token refresh
//!
//! ## Overview
//!
//! A flow starts from a [`ServiceConfiguration`], either built by hand or
//! fetched with [`AuthorizationService::fetch_from_issuer`]. The application
//! builds an [`AuthorizationRequest`], opens its URI in a browser, and hands
//! the redirect back to [`AuthorizationService::complete_authorization`]. The
//! resulting code is exchanged with
//! [`AuthorizationService::perform_token_request`], and everything is
//! accumulated in an [`AuthState`] that can be persisted as JSON and later
//! asked for fresh tokens.
//!
//! ## Modules
//!
//! - [`auth_state`] - Accumulated authorization state and token refresh
//! - [`client_auth`] - Token endpoint client authentication
//! - [`clock`] - Time source used for expiry checks
//! - [`config`] - Library configuration
//! - [`configuration`] - Provider endpoints
//! - [`discovery`] - OpenID Connect discovery documents
//! - [`error`] - Error taxonomy
//! - [`id_token`] - ID token decoding and validation
//! - [`params`] - Parameter helpers shared by requests and responses
//! - [`pkce`] - Proof Key for Code Exchange
//! - [`request`] - Request models and builders
//! - [`response`] - Response models
//! - [`service`] - Endpoint calls
//! - [`transport`] - HTTP transport

pub mod auth_state;
pub mod client_auth;
pub mod clock;
pub mod config;
pub mod configuration;
pub mod discovery;
pub mod error;
pub mod id_token;
pub mod params;
pub mod pkce;
pub mod request;
pub mod response;
pub mod service;
pub mod transport;

pub use auth_state::{AuthState, FreshTokens, SharedAuthState};
pub use client_auth::{ClientAuthentication, TokenEndpointAuthMethod, UnsupportedAuthenticationMethod};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppAuthConfig, ConfigError, TOKEN_REFRESH_TOLERANCE};
pub use configuration::ServiceConfiguration;
pub use discovery::DiscoveryDocument;
pub use error::{
    AuthorizationError, AuthorizationRequestError, BuildError, ErrorDomain, GeneralError,
    ParseError, RegistrationRequestError, ResourceServerError, TokenRequestError,
};
pub use id_token::{IdToken, IdTokenError};
pub use params::AdditionalParameters;
pub use pkce::{CodeChallengeMethod, PkceError};
pub use request::{
    AuthorizationManagementRequest, AuthorizationRequest, AuthorizationRequestBuilder,
    EndSessionRequest, EndSessionRequestBuilder, RegistrationRequest, RegistrationRequestBuilder,
    TokenRequest, TokenRequestBuilder, grant_types, response_types,
};
pub use response::{
    AuthorizationResponse, AuthorizationResponseBuilder, EndSessionResponse,
    RegistrationResponse, RegistrationResponseBuilder, TokenResponse, TokenResponseBuilder,
};
pub use service::{AuthorizationService, UserAgent, UserAgentOutcome};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};

/// Type alias for results of authorization flow operations.
pub type AuthResult<T> = Result<T, AuthorizationError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use appauth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::auth_state::{AuthState, FreshTokens, SharedAuthState};
    pub use crate::client_auth::{ClientAuthentication, TokenEndpointAuthMethod};
    pub use crate::config::AppAuthConfig;
    pub use crate::configuration::ServiceConfiguration;
    pub use crate::error::{AuthorizationError, ErrorDomain};
    pub use crate::request::{
        AuthorizationManagementRequest, AuthorizationRequest, EndSessionRequest,
        RegistrationRequest, TokenRequest,
    };
    pub use crate::response::{
        AuthorizationResponse, EndSessionResponse, RegistrationResponse, TokenResponse,
    };
    pub use crate::service::AuthorizationService;
}
