//! Authorization state.
//!
//! [`AuthState`] collects the outcome of every step of a flow: the last
//! authorization, token and registration responses, the current refresh token
//! and scope, and the last OAuth error. It answers whether the tokens are
//! usable and builds the refresh request when they are not.
//!
//! [`SharedAuthState`] wraps an `AuthState` for concurrent use and coalesces
//! refreshes: however many callers ask for fresh tokens at once, at most one
//! token request is in flight and every caller observes its outcome.
//!
//! # Persistence
//!
//! The JSON form uses the keys `config`, `refreshToken`, `scope`,
//! `lastAuthorizationResponse`, `mLastTokenResponse`,
//! `mAuthorizationException` and `lastRegistrationResponse`. Absent values are
//! omitted.

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client_auth::{ClientAuthentication, TokenEndpointAuthMethod, UnsupportedAuthenticationMethod};
use crate::clock::Clock;
use crate::config::TOKEN_REFRESH_TOLERANCE;
use crate::configuration::ServiceConfiguration;
use crate::error::{
    AuthorizationError, AuthorizationRequestError, BuildError, ErrorDomain, GeneralError,
    ParseError, TokenRequestError,
};
use crate::params::{AdditionalParameters, string_to_set};
use crate::request::{TokenRequest, grant_types};
use crate::response::{AuthorizationResponse, RegistrationResponse, TokenResponse};
use crate::service::AuthorizationService;
use crate::transport::HttpTransport;

/// The tokens handed to an action once they are known to be fresh.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FreshTokens {
    /// Current access token.
    pub access_token: Option<String>,
    /// Current ID token.
    pub id_token: Option<String>,
}

// =============================================================================
// AuthState
// =============================================================================

/// Accumulated authorization state for one user and provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthState {
    #[serde(rename = "config", default, skip_serializing_if = "Option::is_none")]
    config: Option<ServiceConfiguration>,

    #[serde(rename = "refreshToken", default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,

    #[serde(
        rename = "lastAuthorizationResponse",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    last_authorization_response: Option<AuthorizationResponse>,

    #[serde(
        rename = "mLastTokenResponse",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    last_token_response: Option<TokenResponse>,

    #[serde(
        rename = "mAuthorizationException",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    authorization_exception: Option<AuthorizationError>,

    #[serde(
        rename = "lastRegistrationResponse",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    last_registration_response: Option<RegistrationResponse>,

    #[serde(skip)]
    needs_token_refresh_override: bool,
}

impl AuthState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state for a provider before any flow has run.
    #[must_use]
    pub fn from_configuration(config: ServiceConfiguration) -> Self {
        Self {
            config: Some(config),
            ..Self::default()
        }
    }

    /// Creates a state from the outcome of an authorization request.
    #[must_use]
    pub fn from_authorization(result: Result<AuthorizationResponse, AuthorizationError>) -> Self {
        let mut state = Self::default();
        state.update_from_authorization(result);
        state
    }

    /// Creates a state from a client registration.
    #[must_use]
    pub fn from_registration(response: RegistrationResponse) -> Self {
        let mut state = Self::default();
        state.update_from_registration(response);
        state
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Current refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Space-delimited scope of the current tokens.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Scope values of the current tokens.
    #[must_use]
    pub fn scope_set(&self) -> Option<Vec<String>> {
        string_to_set(self.scope.as_deref())
    }

    /// Last authorization response.
    #[must_use]
    pub fn last_authorization_response(&self) -> Option<&AuthorizationResponse> {
        self.last_authorization_response.as_ref()
    }

    /// Last token response.
    #[must_use]
    pub fn last_token_response(&self) -> Option<&TokenResponse> {
        self.last_token_response.as_ref()
    }

    /// Last registration response.
    #[must_use]
    pub fn last_registration_response(&self) -> Option<&RegistrationResponse> {
        self.last_registration_response.as_ref()
    }

    /// The unresolved OAuth error, if any.
    #[must_use]
    pub fn authorization_exception(&self) -> Option<&AuthorizationError> {
        self.authorization_exception.as_ref()
    }

    /// Service configuration, taken from the last authorization request when
    /// there is one.
    #[must_use]
    pub fn authorization_service_configuration(&self) -> Option<&ServiceConfiguration> {
        match &self.last_authorization_response {
            Some(response) => Some(response.request().configuration()),
            None => self.config.as_ref(),
        }
    }

    /// Current access token. `None` while an error is unresolved.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        if self.authorization_exception.is_some() {
            return None;
        }
        if let Some(token) = self
            .last_token_response
            .as_ref()
            .and_then(TokenResponse::access_token)
        {
            return Some(token);
        }
        self.last_authorization_response
            .as_ref()
            .and_then(AuthorizationResponse::access_token)
    }

    /// Expiry of the current access token in epoch milliseconds.
    #[must_use]
    pub fn access_token_expiration_time(&self) -> Option<i64> {
        if self.authorization_exception.is_some() {
            return None;
        }
        if let Some(response) = &self.last_token_response
            && response.access_token().is_some()
        {
            return response.access_token_expiration_time();
        }
        if let Some(response) = &self.last_authorization_response
            && response.access_token().is_some()
        {
            return response.access_token_expiration_time();
        }
        None
    }

    /// Current ID token. `None` while an error is unresolved.
    #[must_use]
    pub fn id_token(&self) -> Option<&str> {
        if self.authorization_exception.is_some() {
            return None;
        }
        if let Some(token) = self.last_token_response.as_ref().and_then(TokenResponse::id_token) {
            return Some(token);
        }
        self.last_authorization_response
            .as_ref()
            .and_then(AuthorizationResponse::id_token)
    }

    /// Client secret from the last registration.
    #[must_use]
    pub fn client_secret(&self) -> Option<&str> {
        self.last_registration_response
            .as_ref()
            .and_then(RegistrationResponse::client_secret)
    }

    /// Returns `true` if the registered client secret has expired.
    #[must_use]
    pub fn has_client_secret_expired(&self, clock: &dyn Clock) -> bool {
        self.last_registration_response
            .as_ref()
            .is_some_and(|r| r.has_client_secret_expired(clock))
    }

    /// Returns `true` if there is no unresolved error and an access or ID
    /// token is available.
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        self.authorization_exception.is_none()
            && (self.access_token().is_some() || self.id_token().is_some())
    }

    /// Returns `true` if the tokens should be refreshed before use.
    ///
    /// Without a known expiry a refresh is needed only when there is no
    /// access token. Otherwise the token is due once it is within
    /// [`TOKEN_REFRESH_TOLERANCE`] of expiring.
    #[must_use]
    pub fn needs_token_refresh(&self, clock: &dyn Clock) -> bool {
        if self.needs_token_refresh_override {
            return true;
        }
        match self.access_token_expiration_time() {
            None => self.access_token().is_none(),
            Some(expiry) => {
                let tolerance = TOKEN_REFRESH_TOLERANCE.as_millis() as i64;
                expiry <= clock.current_time_millis() + tolerance
            }
        }
    }

    /// Forces (or stops forcing) a refresh on the next fresh-token request.
    pub fn set_needs_token_refresh(&mut self, needs_refresh: bool) {
        self.needs_token_refresh_override = needs_refresh;
    }

    fn fresh_tokens(&self) -> FreshTokens {
        FreshTokens {
            access_token: self.access_token().map(String::from),
            id_token: self.id_token().map(String::from),
        }
    }

    // -------------------------------------------------------------------------
    // Updates
    // -------------------------------------------------------------------------

    /// Records the outcome of an authorization request.
    ///
    /// Only errors in the OAuth authorization domain are recorded; other
    /// errors leave the state unchanged. A response starts a new session:
    /// previous tokens are dropped and the scope is taken from the response,
    /// falling back to the request.
    pub fn update_from_authorization(
        &mut self,
        result: Result<AuthorizationResponse, AuthorizationError>,
    ) {
        match result {
            Err(err) => {
                if err.is_domain(ErrorDomain::OAuthAuthorization) {
                    self.authorization_exception = Some(err);
                }
            }
            Ok(response) => {
                self.config = None;
                self.refresh_token = None;
                self.last_token_response = None;
                self.authorization_exception = None;
                self.scope = response
                    .scope()
                    .or_else(|| response.request().scope())
                    .map(String::from);
                self.last_authorization_response = Some(response);
            }
        }
    }

    /// Records the outcome of a token request.
    ///
    /// Only errors in the OAuth token domain are recorded. A response
    /// replaces the refresh token and scope only when it carries them.
    pub fn update_from_token(&mut self, result: Result<TokenResponse, AuthorizationError>) {
        if self.authorization_exception.take().is_some() {
            tracing::warn!(
                "AuthState updated with a token response while in an error state; \
                 the previous error has been discarded"
            );
        }

        match result {
            Err(err) => {
                if err.is_domain(ErrorDomain::OAuthToken) {
                    self.authorization_exception = Some(err);
                }
            }
            Ok(response) => {
                if let Some(scope) = response.scope() {
                    self.scope = Some(scope.to_string());
                }
                if let Some(refresh_token) = response.refresh_token() {
                    self.refresh_token = Some(refresh_token.to_string());
                }
                self.last_token_response = Some(response);
            }
        }
    }

    /// Records a client registration. Previous tokens are dropped; the
    /// service configuration is kept.
    pub fn update_from_registration(&mut self, response: RegistrationResponse) {
        self.config = self.authorization_service_configuration().cloned();
        self.last_registration_response = Some(response);
        self.refresh_token = None;
        self.scope = None;
        self.last_authorization_response = None;
        self.last_token_response = None;
        self.authorization_exception = None;
    }

    // -------------------------------------------------------------------------
    // Requests
    // -------------------------------------------------------------------------

    /// Builds a refresh-token grant request from the stored refresh token,
    /// the configuration and client ID of the last authorization request, and
    /// the current scope.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if an additional parameter shadows a built-in
    /// one.
    ///
    /// # Panics
    ///
    /// Panics if there is no refresh token or no authorization response.
    pub fn create_token_refresh_request(
        &self,
        additional_parameters: AdditionalParameters,
    ) -> Result<TokenRequest, BuildError> {
        let Some(refresh_token) = &self.refresh_token else {
            panic!("No refresh token available for refresh request");
        };
        let Some(authorization) = &self.last_authorization_response else {
            panic!("No authorization configuration available for refresh request");
        };

        TokenRequest::builder(
            authorization.request().configuration().clone(),
            authorization.request().client_id(),
        )
        .grant_type(Some(grant_types::REFRESH_TOKEN.to_string()))
        .scope(self.scope.clone())
        .refresh_token(Some(refresh_token.clone()))
        .additional_parameters(additional_parameters)
        .build()
    }

    /// Client authentication for the registered client.
    ///
    /// Without a registration or client secret the client is public. An
    /// unset method means `client_secret_basic`.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedAuthenticationMethod`] for any method other than
    /// `none`, `client_secret_basic` or `client_secret_post`.
    pub fn client_authentication(
        &self,
    ) -> Result<ClientAuthentication, UnsupportedAuthenticationMethod> {
        let Some(registration) = &self.last_registration_response else {
            return Ok(ClientAuthentication::None);
        };
        let Some(secret) = registration.client_secret() else {
            return Ok(ClientAuthentication::None);
        };

        let method = match registration.token_endpoint_auth_method() {
            None => TokenEndpointAuthMethod::default(),
            Some(method) => method.parse()?,
        };
        Ok(ClientAuthentication::for_method(method, secret))
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Serializes to the persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<Value, ParseError> {
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

    /// Restores a state from its persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if any member is malformed.
    pub fn from_json(json: &Value) -> Result<Self, ParseError> {
        Ok(Self::deserialize(json)?)
    }

    /// Restores a state from a JSON string.
    ///
    /// # Errors
    ///
    /// As [`Self::from_json`].
    pub fn from_json_str(json: &str) -> Result<Self, ParseError> {
        Ok(serde_json::from_str(json)?)
    }
}

// =============================================================================
// SharedAuthState
// =============================================================================

type RefreshFuture = Shared<BoxFuture<'static, Result<FreshTokens, AuthorizationError>>>;

#[derive(Default)]
struct SharedInner {
    state: AuthState,
    in_flight: Option<RefreshFuture>,
}

/// An [`AuthState`] shared between tasks, with coalesced token refresh.
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct SharedAuthState {
    inner: Arc<Mutex<SharedInner>>,
}

impl std::fmt::Debug for SharedAuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SharedAuthState")
            .field("state", &inner.state)
            .field("refresh_in_flight", &inner.in_flight.is_some())
            .finish()
    }
}

impl SharedAuthState {
    /// Wraps `state`.
    #[must_use]
    pub fn new(state: AuthState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SharedInner {
                state,
                in_flight: None,
            })),
        }
    }

    /// A copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.inner.lock().state.clone()
    }

    /// Runs `f` with the current state.
    pub fn read<R>(&self, f: impl FnOnce(&AuthState) -> R) -> R {
        f(&self.inner.lock().state)
    }

    /// Runs `f` with mutable access to the state.
    pub fn update<R>(&self, f: impl FnOnce(&mut AuthState) -> R) -> R {
        f(&mut self.inner.lock().state)
    }

    /// Returns `true` while a refresh is running.
    #[must_use]
    pub fn is_refresh_in_flight(&self) -> bool {
        self.inner.lock().in_flight.is_some()
    }

    /// Runs `action` with fresh tokens, refreshing first if needed.
    ///
    /// The client authentication is derived from the last registration.
    /// `action` receives the error instead when the tokens cannot be
    /// refreshed.
    pub async fn perform_action_with_fresh_tokens<T, F, R>(
        &self,
        service: &AuthorizationService<T>,
        action: F,
    ) -> R
    where
        T: HttpTransport + 'static,
        F: FnOnce(Result<FreshTokens, AuthorizationError>) -> R,
    {
        action(self.fresh_tokens(service).await)
    }

    /// Returns fresh tokens, refreshing first if needed.
    ///
    /// # Errors
    ///
    /// - `CLIENT_ERROR` (token) if the registered authentication method is
    ///   unsupported
    /// - see [`Self::fresh_tokens_with`]
    pub async fn fresh_tokens<T>(
        &self,
        service: &AuthorizationService<T>,
    ) -> Result<FreshTokens, AuthorizationError>
    where
        T: HttpTransport + 'static,
    {
        let client_auth = self.read(AuthState::client_authentication).map_err(|e| {
            let description = e.to_string();
            AuthorizationError::from_template(TokenRequestError::ClientError, e)
                .with_description(description)
        })?;
        self.fresh_tokens_with(service, client_auth, AdditionalParameters::new())
            .await
    }

    /// Returns fresh tokens, refreshing with `client_auth` and
    /// `refresh_parameters` if needed.
    ///
    /// Concurrent callers share a single refresh. The refresh runs on its own
    /// task, so dropping every caller does not cancel it; its outcome is
    /// applied to the state exactly once.
    ///
    /// # Errors
    ///
    /// - `CLIENT_ERROR` (authorization) if a refresh is needed and there is
    ///   no refresh token
    /// - any error from [`AuthorizationService::perform_token_request`]
    /// - `PROGRAM_CANCELED_AUTH_FLOW` if the refresh task was aborted
    pub async fn fresh_tokens_with<T>(
        &self,
        service: &AuthorizationService<T>,
        client_auth: ClientAuthentication,
        refresh_parameters: AdditionalParameters,
    ) -> Result<FreshTokens, AuthorizationError>
    where
        T: HttpTransport + 'static,
    {
        let refresh = {
            let mut inner = self.inner.lock();
            match &inner.in_flight {
                Some(in_flight) => {
                    tracing::trace!("Joining in-flight token refresh");
                    in_flight.clone()
                }
                None => {
                    if !inner.state.needs_token_refresh(service.clock()) {
                        return Ok(inner.state.fresh_tokens());
                    }
                    if inner.state.refresh_token().is_none() {
                        return Err(AuthorizationError::from(
                            AuthorizationRequestError::ClientError,
                        )
                        .with_description("No refresh token available and token have expired"));
                    }

                    let request = inner
                        .state
                        .create_token_refresh_request(refresh_parameters)
                        .map_err(|e| {
                            let description = e.to_string();
                            AuthorizationError::from_template(TokenRequestError::ClientError, e)
                                .with_description(description)
                        })?;
                    let refresh = self.spawn_refresh(service.clone(), request, client_auth);
                    inner.in_flight = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await
    }

    fn spawn_refresh<T>(
        &self,
        service: AuthorizationService<T>,
        request: TokenRequest,
        client_auth: ClientAuthentication,
    ) -> RefreshFuture
    where
        T: HttpTransport + 'static,
    {
        tracing::debug!("Refreshing access token");

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let result = service.perform_token_request(&request, &client_auth).await;

            let mut guard = inner.lock();
            guard.in_flight = None;
            guard.state.update_from_token(result.clone());
            match result {
                Ok(_) => {
                    guard.state.set_needs_token_refresh(false);
                    Ok(guard.state.fresh_tokens())
                }
                Err(err) => {
                    tracing::debug!(error = %err, "Token refresh failed");
                    Err(err)
                }
            }
        });

        let inner = Arc::clone(&self.inner);
        async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => {
                    inner.lock().in_flight = None;
                    Err(AuthorizationError::from_template(
                        GeneralError::ProgramCanceledAuthFlow,
                        join_error,
                    ))
                }
            }
        }
        .boxed()
        .shared()
    }
}
