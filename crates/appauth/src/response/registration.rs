//! Client registration response (RFC 7591 Section 3.2.1).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::clock::Clock;
use crate::error::ParseError;
use crate::params::{
    AdditionalParameters, extract_additional_json_params, get_i64, get_string,
    parse_json_object, require_string,
};
use crate::request::RegistrationRequest;

/// Members with a dedicated field.
pub const BUILT_IN_PARAMS: [&str; 7] = [
    "client_id",
    "client_id_issued_at",
    "client_secret",
    "client_secret_expires_at",
    "registration_access_token",
    "registration_client_uri",
    "token_endpoint_auth_method",
];

/// Credentials issued for a newly registered client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    request: RegistrationRequest,
    client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_id_issued_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_secret_expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    registration_access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    registration_client_uri: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_endpoint_auth_method: Option<String>,
    #[serde(rename = "additionalParameters", default)]
    additional_parameters: AdditionalParameters,
}

impl RegistrationResponse {
    /// Starts building a response to `request`.
    #[must_use]
    pub fn builder(
        request: RegistrationRequest,
        client_id: impl Into<String>,
    ) -> RegistrationResponseBuilder {
        RegistrationResponseBuilder {
            response: Self {
                request,
                client_id: client_id.into(),
                client_id_issued_at: None,
                client_secret: None,
                client_secret_expires_at: None,
                registration_access_token: None,
                registration_client_uri: None,
                token_endpoint_auth_method: None,
                additional_parameters: AdditionalParameters::new(),
            },
        }
    }

    /// Parses a successful registration endpoint body.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MissingArgument` naming the absent field if
    /// `client_id` is missing or only one half of a co-required pair is
    /// present, and `InvalidValue` for wrongly typed members.
    pub fn from_server_json(
        request: RegistrationRequest,
        json: &Map<String, Value>,
    ) -> Result<Self, ParseError> {
        let registration_client_uri = get_string(json, "registration_client_uri")?
            .map(|uri| Url::parse(&uri))
            .transpose()?;

        Self::builder(request, require_string(json, "client_id")?)
            .client_id_issued_at(get_i64(json, "client_id_issued_at")?)
            .client_secret(get_string(json, "client_secret")?)
            .client_secret_expires_at(get_i64(json, "client_secret_expires_at")?)
            .registration_access_token(get_string(json, "registration_access_token")?)
            .registration_client_uri(registration_client_uri)
            .token_endpoint_auth_method(get_string(json, "token_endpoint_auth_method")?)
            .additional_parameters(extract_additional_json_params(json, &BUILT_IN_PARAMS))
            .build()
    }

    /// Parses a successful registration endpoint body from text.
    ///
    /// # Errors
    ///
    /// As [`Self::from_server_json`], plus `ParseError::Json` for malformed
    /// input.
    pub fn from_server_json_str(
        request: RegistrationRequest,
        json: &str,
    ) -> Result<Self, ParseError> {
        Self::from_server_json(request, &parse_json_object(json)?)
    }

    /// The request this responds to.
    #[must_use]
    pub fn request(&self) -> &RegistrationRequest {
        &self.request
    }

    /// Issued client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// When the client ID was issued, in epoch seconds.
    #[must_use]
    pub fn client_id_issued_at(&self) -> Option<i64> {
        self.client_id_issued_at
    }

    /// Issued client secret.
    #[must_use]
    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    /// Client secret expiry in epoch seconds. `0` means it never expires.
    #[must_use]
    pub fn client_secret_expires_at(&self) -> Option<i64> {
        self.client_secret_expires_at
    }

    /// Token for the client configuration endpoint.
    #[must_use]
    pub fn registration_access_token(&self) -> Option<&str> {
        self.registration_access_token.as_deref()
    }

    /// Location of the client configuration endpoint.
    #[must_use]
    pub fn registration_client_uri(&self) -> Option<&Url> {
        self.registration_client_uri.as_ref()
    }

    /// Authentication method the server assigned for the token endpoint.
    #[must_use]
    pub fn token_endpoint_auth_method(&self) -> Option<&str> {
        self.token_endpoint_auth_method.as_deref()
    }

    /// Additional parameters.
    #[must_use]
    pub fn additional_parameters(&self) -> &AdditionalParameters {
        &self.additional_parameters
    }

    /// Returns `true` if a client secret was issued with an expiry that has
    /// passed.
    #[must_use]
    pub fn has_client_secret_expired(&self, clock: &dyn Clock) -> bool {
        match self.client_secret_expires_at {
            None | Some(0) => false,
            Some(expires_at) => clock.current_time_millis() / 1000 > expires_at,
        }
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
    /// Returns `ParseError::Json` if a required member is missing or
    /// malformed, or `MissingArgument` for a broken co-required pair.
    pub fn from_json(json: &Value) -> Result<Self, ParseError> {
        let response = Self::deserialize(json)?;
        response.check_pairs()?;
        Ok(response)
    }

    /// Restores a response from a JSON string.
    ///
    /// # Errors
    ///
    /// As [`Self::from_json`].
    pub fn from_json_str(json: &str) -> Result<Self, ParseError> {
        Self::from_json(&serde_json::from_str(json)?)
    }

    fn check_pairs(&self) -> Result<(), ParseError> {
        if self.client_secret.is_some() && self.client_secret_expires_at.is_none() {
            return Err(ParseError::missing("client_secret_expires_at"));
        }
        if self.client_secret_expires_at.is_some() && self.client_secret.is_none() {
            return Err(ParseError::missing("client_secret"));
        }
        if self.registration_access_token.is_some() && self.registration_client_uri.is_none() {
            return Err(ParseError::missing("registration_client_uri"));
        }
        if self.registration_client_uri.is_some() && self.registration_access_token.is_none() {
            return Err(ParseError::missing("registration_access_token"));
        }
        Ok(())
    }
}

/// Builder for [`RegistrationResponse`].
#[derive(Debug, Clone)]
pub struct RegistrationResponseBuilder {
    response: RegistrationResponse,
}

impl RegistrationResponseBuilder {
    /// Sets when the client ID was issued.
    #[must_use]
    pub fn client_id_issued_at(mut self, issued_at: Option<i64>) -> Self {
        self.response.client_id_issued_at = issued_at;
        self
    }

    /// Sets the client secret.
    #[must_use]
    pub fn client_secret(mut self, secret: Option<String>) -> Self {
        self.response.client_secret = secret;
        self
    }

    /// Sets the client secret expiry in epoch seconds.
    #[must_use]
    pub fn client_secret_expires_at(mut self, expires_at: Option<i64>) -> Self {
        self.response.client_secret_expires_at = expires_at;
        self
    }

    /// Sets the registration access token.
    #[must_use]
    pub fn registration_access_token(mut self, token: Option<String>) -> Self {
        self.response.registration_access_token = token;
        self
    }

    /// Sets the client configuration endpoint.
    #[must_use]
    pub fn registration_client_uri(mut self, uri: Option<Url>) -> Self {
        self.response.registration_client_uri = uri;
        self
    }

    /// Sets the token endpoint authentication method.
    #[must_use]
    pub fn token_endpoint_auth_method(mut self, method: Option<String>) -> Self {
        self.response.token_endpoint_auth_method = method;
        self
    }

    /// Replaces the additional parameters.
    #[must_use]
    pub fn additional_parameters(mut self, params: AdditionalParameters) -> Self {
        self.response.additional_parameters = params;
        self
    }

    /// Validates and freezes the response.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MissingArgument` if `client_id` is empty or one
    /// half of a co-required pair is missing.
    pub fn build(self) -> Result<RegistrationResponse, ParseError> {
        if self.response.client_id.is_empty() {
            return Err(ParseError::missing("client_id"));
        }
        self.response.check_pairs()?;
        Ok(self.response)
    }
}
