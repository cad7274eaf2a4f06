//! Authorization response (RFC 6749 Sections 4.1.2 and 4.2.2).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::{param, redirect_error, redirect_params, verify_state};
use crate::clock::Clock;
use crate::error::{AuthorizationError, BuildError, GeneralError, ParseError};
use crate::params::{
    AdditionalParameters, extract_additional_params, iterable_to_string, string_to_set,
};
use crate::request::{AuthorizationRequest, TokenRequest, grant_types};

/// Redirect parameters with a dedicated field.
pub const BUILT_IN_PARAMS: [&str; 7] = [
    "token_type",
    "state",
    "code",
    "access_token",
    "expires_in",
    "id_token",
    "scope",
];

/// The successful result of an authorization request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    request: AuthorizationRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
    #[serde(rename = "code", default, skip_serializing_if = "Option::is_none")]
    authorization_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(rename = "expires_at", default, skip_serializing_if = "Option::is_none")]
    access_token_expiration_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    #[serde(rename = "additionalParameters", default)]
    additional_parameters: AdditionalParameters,
}

impl AuthorizationResponse {
    /// Starts building a response to `request`.
    #[must_use]
    pub fn builder(request: AuthorizationRequest) -> AuthorizationResponseBuilder {
        AuthorizationResponseBuilder {
            response: Self {
                request,
                state: None,
                token_type: None,
                authorization_code: None,
                access_token: None,
                access_token_expiration_time: None,
                id_token: None,
                scope: None,
                additional_parameters: AdditionalParameters::new(),
            },
        }
    }

    /// Parses the redirect that completed `request`.
    ///
    /// An `error` parameter takes precedence and becomes an
    /// [`ErrorDomain::OAuthAuthorization`](crate::ErrorDomain::OAuthAuthorization)
    /// error. Otherwise the returned `state` must equal the request's.
    ///
    /// # Errors
    ///
    /// Returns the server's OAuth error, `STATE_MISMATCH`, or `SERVER_ERROR`
    /// when `expires_in` is not an integer.
    pub fn from_redirect_uri(
        request: AuthorizationRequest,
        uri: &Url,
        clock: &dyn Clock,
    ) -> Result<Self, AuthorizationError> {
        let params = redirect_params(uri);
        if let Some(err) = redirect_error(&params) {
            return Err(err);
        }

        verify_state(request.state(), param(&params, "state"))?;

        let expires_in = param(&params, "expires_in")
            .map(|v| {
                v.trim().parse::<i64>().map_err(|e| {
                    AuthorizationError::from_template(GeneralError::ServerError, e)
                        .with_description("expires_in is not an integer")
                })
            })
            .transpose()?;

        let mut builder = Self::builder(request)
            .state(param(&params, "state").map(String::from))
            .token_type(param(&params, "token_type").map(String::from))
            .authorization_code(param(&params, "code").map(String::from))
            .access_token(param(&params, "access_token").map(String::from))
            .id_token(param(&params, "id_token").map(String::from))
            .scope(param(&params, "scope").map(String::from))
            .additional_parameters(extract_additional_params(
                params.iter().map(|(k, v)| (k.as_str(), v.clone())),
                &BUILT_IN_PARAMS,
            ));
        if let Some(expires_in) = expires_in {
            builder = builder.access_token_expires_in(expires_in, clock);
        }
        Ok(builder.build())
    }

    /// The request this responds to.
    #[must_use]
    pub fn request(&self) -> &AuthorizationRequest {
        &self.request
    }

    /// Returned `state`.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Access token type (implicit flow).
    #[must_use]
    pub fn token_type(&self) -> Option<&str> {
        self.token_type.as_deref()
    }

    /// Authorization code.
    #[must_use]
    pub fn authorization_code(&self) -> Option<&str> {
        self.authorization_code.as_deref()
    }

    /// Access token (implicit flow).
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Access token expiry in epoch milliseconds.
    #[must_use]
    pub fn access_token_expiration_time(&self) -> Option<i64> {
        self.access_token_expiration_time
    }

    /// ID token (hybrid or implicit flow).
    #[must_use]
    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }

    /// Granted scope.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Granted scope values.
    #[must_use]
    pub fn scope_set(&self) -> Option<Vec<String>> {
        string_to_set(self.scope.as_deref())
    }

    /// Additional parameters.
    #[must_use]
    pub fn additional_parameters(&self) -> &AdditionalParameters {
        &self.additional_parameters
    }

    /// Returns `true` if an access token was issued and has expired.
    #[must_use]
    pub fn has_access_token_expired(&self, clock: &dyn Clock) -> bool {
        self.access_token_expiration_time
            .is_some_and(|expiry| clock.current_time_millis() > expiry)
    }

    /// Creates the code exchange request for this response.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Missing("authorization code")` if the response
    /// carries no code, or any error raised by [`TokenRequest::builder`].
    pub fn create_token_exchange_request(
        &self,
        additional_parameters: AdditionalParameters,
    ) -> Result<TokenRequest, BuildError> {
        let code = self
            .authorization_code
            .clone()
            .ok_or(BuildError::Missing("authorization code"))?;

        TokenRequest::builder(
            self.request.configuration().clone(),
            self.request.client_id(),
        )
        .grant_type(Some(grant_types::AUTHORIZATION_CODE.to_string()))
        .redirect_uri(Some(self.request.redirect_uri().clone()))
        .code_verifier(self.request.code_verifier().map(String::from))
        .authorization_code(Some(code))
        .nonce(self.request.nonce().map(String::from))
        .additional_parameters(additional_parameters)
        .build()
    }

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

    /// Restores a response from its persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if a required member is missing or malformed.
    pub fn from_json(json: &Value) -> Result<Self, ParseError> {
        Ok(Self::deserialize(json)?)
    }

    /// Restores a response from a JSON string.
    ///
    /// # Errors
    ///
    /// As [`Self::from_json`].
    pub fn from_json_str(json: &str) -> Result<Self, ParseError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Builder for [`AuthorizationResponse`].
#[derive(Debug, Clone)]
pub struct AuthorizationResponseBuilder {
    response: AuthorizationResponse,
}

impl AuthorizationResponseBuilder {
    /// Sets the returned `state`.
    #[must_use]
    pub fn state(mut self, state: Option<String>) -> Self {
        self.response.state = state;
        self
    }

    /// Sets the token type.
    #[must_use]
    pub fn token_type(mut self, token_type: Option<String>) -> Self {
        self.response.token_type = token_type;
        self
    }

    /// Sets the authorization code.
    #[must_use]
    pub fn authorization_code(mut self, code: Option<String>) -> Self {
        self.response.authorization_code = code;
        self
    }

    /// Sets the access token.
    #[must_use]
    pub fn access_token(mut self, access_token: Option<String>) -> Self {
        self.response.access_token = access_token;
        self
    }

    /// Sets the absolute access token expiry in epoch milliseconds.
    #[must_use]
    pub fn access_token_expiration_time(mut self, expiry: Option<i64>) -> Self {
        self.response.access_token_expiration_time = expiry;
        self
    }

    /// Sets the expiry relative to `clock`'s current time. Out-of-range
    /// values saturate.
    #[must_use]
    pub fn access_token_expires_in(mut self, seconds: i64, clock: &dyn Clock) -> Self {
        self.response.access_token_expiration_time = Some(
            clock
                .current_time_millis()
                .saturating_add(seconds.saturating_mul(1000)),
        );
        self
    }

    /// Sets the ID token.
    #[must_use]
    pub fn id_token(mut self, id_token: Option<String>) -> Self {
        self.response.id_token = id_token;
        self
    }

    /// Sets the space-delimited scope.
    #[must_use]
    pub fn scope(mut self, scope: Option<String>) -> Self {
        self.response.scope = scope.and_then(|s| iterable_to_string(s.split_whitespace()));
        self
    }

    /// Sets the scope values.
    #[must_use]
    pub fn scopes<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.response.scope = iterable_to_string(values);
        self
    }

    /// Replaces the additional parameters.
    #[must_use]
    pub fn additional_parameters(mut self, params: AdditionalParameters) -> Self {
        self.response.additional_parameters = params;
        self
    }

    /// Freezes the response.
    #[must_use]
    pub fn build(self) -> AuthorizationResponse {
        self.response
    }
}
