//! Authorization service.
//!
//! [`AuthorizationService`] performs the network side of the flows: fetching
//! discovery documents, exchanging codes and refresh tokens, and registering
//! clients. It also drives the browser leg through a [`UserAgent`].
//!
//! # Example
//!
//! ```ignore
//! use appauth::{AppAuthConfig, AuthorizationService};
//!
//! let service = AuthorizationService::from_config(AppAuthConfig::default())?;
//! let configuration = service
//!     .fetch_from_issuer(&"https://accounts.example.com".parse()?)
//!     .await?;
//!
//! let request = service
//!     .authorization_request_builder(configuration, "client-id", "code", redirect_uri)?
//!     .scopes(["openid", "email"])
//!     .build()?;
//! let response = service.perform_authorization_request(request, &browser).await?;
//!
//! let token_request = response.create_token_exchange_request(Default::default())?;
//! let tokens = service
//!     .perform_token_request(&token_request, &ClientAuthentication::None)
//!     .await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use url::{Url, form_urlencoded};

use crate::client_auth::ClientAuthentication;
use crate::clock::{Clock, SystemClock};
use crate::config::AppAuthConfig;
use crate::configuration::ServiceConfiguration;
use crate::discovery::DiscoveryDocument;
use crate::error::{
    AuthorizationError, BuildError, GeneralError, ParseError, RegistrationRequestError,
    TokenRequestError,
};
use crate::id_token::IdToken;
use crate::params::{get_string, parse_json_object};
use crate::pkce::generate_random_code_verifier_with_entropy;
use crate::request::{
    AuthorizationManagementRequest, AuthorizationRequest, AuthorizationRequestBuilder,
    EndSessionRequest, RegistrationRequest, TokenRequest,
};
use crate::response::{AuthorizationResponse, EndSessionResponse, RegistrationResponse, TokenResponse};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

// =============================================================================
// User Agent
// =============================================================================

/// How the browser leg of a flow ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAgentOutcome {
    /// The provider redirected back to the application.
    Redirected(Url),
    /// The user closed the browser or otherwise abandoned the flow.
    Cancelled,
}

/// Opens authorization and logout URIs for the user.
#[async_trait]
pub trait UserAgent: Send + Sync {
    /// Presents `uri` and waits for the redirect back to the application.
    async fn launch(&self, uri: Url) -> UserAgentOutcome;
}

// =============================================================================
// Service
// =============================================================================

/// Performs authorization flows against a provider.
///
/// Cloning is cheap; clones share the transport, clock and configuration.
pub struct AuthorizationService<T> {
    transport: Arc<T>,
    clock: Arc<dyn Clock>,
    config: Arc<AppAuthConfig>,
}

impl<T> Clone for AuthorizationService<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            clock: Arc::clone(&self.clock),
            config: Arc::clone(&self.config),
        }
    }
}

impl<T> std::fmt::Debug for AuthorizationService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AuthorizationService<ReqwestTransport> {
    /// Creates a service using a `reqwest` transport built from `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the HTTP client cannot be created.
    pub fn from_config(config: AppAuthConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::new(transport, config))
    }
}

impl<T: HttpTransport> AuthorizationService<T> {
    /// Creates a service using the system clock.
    #[must_use]
    pub fn new(transport: T, config: AppAuthConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            clock: Arc::new(SystemClock),
            config: Arc::new(config),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &AppAuthConfig {
        &self.config
    }

    /// The clock used for expiry calculations.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// The transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Starts an authorization request whose PKCE code verifier uses the
    /// configured entropy.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Pkce` if the configured entropy is out of range.
    pub fn authorization_request_builder(
        &self,
        configuration: ServiceConfiguration,
        client_id: impl Into<String>,
        response_type: impl Into<String>,
        redirect_uri: Url,
    ) -> Result<AuthorizationRequestBuilder, BuildError> {
        let verifier = generate_random_code_verifier_with_entropy(self.config.pkce_entropy_bytes)?;
        Ok(
            AuthorizationRequest::builder(configuration, client_id, response_type, redirect_uri)
                .code_verifier(Some(verifier)),
        )
    }

    // -------------------------------------------------------------------------
    // Discovery
    // -------------------------------------------------------------------------

    /// Fetches the configuration of an OpenID Connect issuer from
    /// `<issuer>/.well-known/openid-configuration`.
    ///
    /// # Errors
    ///
    /// As [`Self::fetch_from_url`], plus `INVALID_DISCOVERY_DOCUMENT` if the
    /// issuer cannot carry a path.
    pub async fn fetch_from_issuer(
        &self,
        issuer: &Url,
    ) -> Result<ServiceConfiguration, AuthorizationError> {
        let discovery_uri = ServiceConfiguration::build_discovery_uri(issuer)
            .map_err(|e| AuthorizationError::from_template(GeneralError::InvalidDiscoveryDocument, e))?;
        self.fetch_from_url(&discovery_uri).await
    }

    /// Fetches and parses a discovery document.
    ///
    /// # Errors
    ///
    /// - `NETWORK_ERROR` if the exchange fails
    /// - `HTTP_ERROR` for a non-2xx status
    /// - `JSON_DESERIALIZATION_ERROR` if the body is not a JSON object
    /// - `INVALID_DISCOVERY_DOCUMENT` if a mandatory field is missing
    pub async fn fetch_from_url(
        &self,
        discovery_uri: &Url,
    ) -> Result<ServiceConfiguration, AuthorizationError> {
        tracing::debug!("Fetching discovery document from {}", discovery_uri);
        let response = self.execute(HttpRequest::get(discovery_uri.clone())).await?;
        if !response.is_success() {
            return Err(AuthorizationError::http(response.status, response.body));
        }

        let json = parse_json_object(&response.body).map_err(json_error)?;
        let document = DiscoveryDocument::new(json).map_err(|e| {
            tracing::warn!("Invalid discovery document from {}: {}", discovery_uri, e);
            let description = e.to_string();
            AuthorizationError::from_template(GeneralError::InvalidDiscoveryDocument, e)
                .with_description(description)
        })?;

        ServiceConfiguration::from_discovery(document).map_err(|e| {
            let description = e.to_string();
            AuthorizationError::from_template(GeneralError::InvalidDiscoveryDocument, e)
                .with_description(description)
        })
    }

    // -------------------------------------------------------------------------
    // Token endpoint
    // -------------------------------------------------------------------------

    /// Sends `request` to the token endpoint.
    ///
    /// The body carries the request's parameters plus any contributed by
    /// `client_auth`. `client_id` is added when the client authentication
    /// provides neither an `Authorization` header nor a `client_id`
    /// parameter. A returned ID token is decoded and validated.
    ///
    /// # Errors
    ///
    /// - `NETWORK_ERROR` if the exchange fails
    /// - an OAuth token error if the body carries an `error` member
    /// - `HTTP_ERROR` for any other non-2xx status
    /// - `JSON_DESERIALIZATION_ERROR` if a 2xx body is not a JSON object
    /// - `TOKEN_RESPONSE_CONSTRUCTION_ERROR` if a member has the wrong type
    /// - `ID_TOKEN_PARSING_ERROR` or `ID_TOKEN_VALIDATION_ERROR`
    pub async fn perform_token_request(
        &self,
        request: &TokenRequest,
        client_auth: &ClientAuthentication,
    ) -> Result<TokenResponse, AuthorizationError> {
        let client_id = request.client_id();
        let headers = client_auth.request_headers(client_id);
        let mut params = request.request_parameters();
        let auth_params = client_auth.request_parameters(client_id);
        if headers.is_empty() && !auth_params.contains_key("client_id") {
            params.insert("client_id".to_string(), client_id.to_string());
        }
        params.extend(auth_params);

        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter())
            .finish();
        let mut http_request = HttpRequest::post(
            request.configuration().token_endpoint().clone(),
            FORM_CONTENT_TYPE,
            body,
        );
        for (name, value) in headers {
            http_request = http_request.with_header(name, value);
        }

        tracing::debug!(
            grant_type = request.grant_type(),
            method = %client_auth.method(),
            "Performing token request to {}",
            request.configuration().token_endpoint()
        );
        let response = self.execute(http_request).await?;
        let json = oauth_response_json(response, TokenRequestError::from_error_string)?;

        let token_response = TokenResponse::from_server_json(request.clone(), &json, self.clock())
            .map_err(|e| {
                let description = e.to_string();
                AuthorizationError::from_template(GeneralError::TokenResponseConstructionError, e)
                    .with_description(description)
            })?;

        if let Some(id_token) = token_response.id_token() {
            let id_token = IdToken::from_jwt(id_token)?;
            id_token.validate(request, self.clock(), self.config.skip_issuer_https_check)?;
        }

        tracing::debug!("Token request succeeded");
        Ok(token_response)
    }

    // -------------------------------------------------------------------------
    // Registration endpoint
    // -------------------------------------------------------------------------

    /// Registers a client with the provider.
    ///
    /// # Errors
    ///
    /// - `CLIENT_ERROR` (registration) if the configuration has no
    ///   registration endpoint
    /// - `NETWORK_ERROR` if the exchange fails
    /// - an OAuth registration error if the body carries an `error` member
    /// - `HTTP_ERROR` for any other non-2xx status
    /// - `JSON_DESERIALIZATION_ERROR` if a 2xx body is not a JSON object
    /// - `INVALID_REGISTRATION_RESPONSE` if a required field is missing
    pub async fn perform_registration_request(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationResponse, AuthorizationError> {
        let Some(endpoint) = request.configuration().registration_endpoint() else {
            return Err(AuthorizationError::from(RegistrationRequestError::ClientError)
                .with_description("Service configuration has no registration endpoint"));
        };

        tracing::debug!("Performing registration request to {}", endpoint);
        let http_request = HttpRequest::post(
            endpoint.clone(),
            JSON_CONTENT_TYPE,
            request.to_wire_json().to_string(),
        );
        let response = self.execute(http_request).await?;
        let json = oauth_response_json(response, RegistrationRequestError::from_error_string)?;

        RegistrationResponse::from_server_json(request.clone(), &json).map_err(|e| {
            tracing::warn!("Invalid registration response: {}", e);
            let description = e.to_string();
            AuthorizationError::from_template(GeneralError::InvalidRegistrationResponse, e)
                .with_description(description)
        })
    }

    // -------------------------------------------------------------------------
    // Browser leg
    // -------------------------------------------------------------------------

    /// Parses the redirect that completed `request`, verifying `state`.
    ///
    /// # Errors
    ///
    /// See [`AuthorizationResponse::from_redirect_uri`].
    pub fn complete_authorization(
        &self,
        request: AuthorizationRequest,
        redirect_uri: &Url,
    ) -> Result<AuthorizationResponse, AuthorizationError> {
        AuthorizationResponse::from_redirect_uri(request, redirect_uri, self.clock())
    }

    /// Parses the post-logout redirect, verifying `state`.
    ///
    /// # Errors
    ///
    /// See [`EndSessionResponse::from_redirect_uri`].
    pub fn complete_end_session(
        &self,
        request: EndSessionRequest,
        redirect_uri: &Url,
    ) -> Result<EndSessionResponse, AuthorizationError> {
        EndSessionResponse::from_redirect_uri(request, redirect_uri)
    }

    /// Opens the authorization URI in `user_agent` and completes the flow
    /// with the resulting redirect.
    ///
    /// # Errors
    ///
    /// Returns `USER_CANCELED_AUTH_FLOW` if the user agent reports
    /// cancellation, otherwise as [`Self::complete_authorization`].
    pub async fn perform_authorization_request<U: UserAgent + ?Sized>(
        &self,
        request: AuthorizationRequest,
        user_agent: &U,
    ) -> Result<AuthorizationResponse, AuthorizationError> {
        match user_agent.launch(request.to_uri()).await {
            UserAgentOutcome::Redirected(uri) => self.complete_authorization(request, &uri),
            UserAgentOutcome::Cancelled => {
                tracing::debug!("Authorization flow cancelled by the user");
                Err(GeneralError::UserCanceledAuthFlow.into())
            }
        }
    }

    /// Opens the logout URI in `user_agent` and completes the flow with the
    /// resulting redirect.
    ///
    /// # Errors
    ///
    /// Returns `USER_CANCELED_AUTH_FLOW` if the user agent reports
    /// cancellation, otherwise as [`Self::complete_end_session`].
    pub async fn perform_end_session_request<U: UserAgent + ?Sized>(
        &self,
        request: EndSessionRequest,
        user_agent: &U,
    ) -> Result<EndSessionResponse, AuthorizationError> {
        match user_agent.launch(request.to_uri()).await {
            UserAgentOutcome::Redirected(uri) => self.complete_end_session(request, &uri),
            UserAgentOutcome::Cancelled => Err(GeneralError::UserCanceledAuthFlow.into()),
        }
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, AuthorizationError> {
        self.transport.execute(request).await.map_err(|e| {
            tracing::warn!("HTTP exchange failed: {}", e);
            let description = e.to_string();
            AuthorizationError::from_template(GeneralError::NetworkError, e)
                .with_description(description)
        })
    }
}

/// Interprets a token or registration endpoint response. An `error` member
/// wins over the status; other non-2xx responses become `HTTP_ERROR`.
fn oauth_response_json<C, F>(
    response: HttpResponse,
    lookup: F,
) -> Result<Map<String, Value>, AuthorizationError>
where
    C: Into<AuthorizationError>,
    F: FnOnce(&str) -> C,
{
    let parsed = parse_json_object(&response.body);

    if let Ok(json) = &parsed
        && let Ok(Some(error)) = get_string(json, "error")
    {
        let description = get_string(json, "error_description").ok().flatten();
        let uri = get_string(json, "error_uri").ok().flatten();
        tracing::debug!(status = response.status, error = %error, "Server returned an OAuth error");
        return Err(AuthorizationError::from_oauth_error(
            lookup(&error),
            Some(&error),
            description.as_deref(),
            uri.as_deref(),
        ));
    }

    if !response.is_success() {
        return Err(AuthorizationError::http(response.status, response.body));
    }

    parsed.map_err(json_error)
}

fn json_error(err: ParseError) -> AuthorizationError {
    let description = err.to_string();
    AuthorizationError::from_template(GeneralError::JsonDeserializationError, err)
        .with_description(description)
}
