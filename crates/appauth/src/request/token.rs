//! Token request (RFC 6749 Sections 4.1.3 and 6).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::grant_types;
use crate::configuration::ServiceConfiguration;
use crate::error::{BuildError, ParseError};
use crate::params::{
    AdditionalParameters, check_additional_params, iterable_to_string, normalize_space_delimited,
    string_to_set,
};
use crate::pkce::check_code_verifier;

/// Parameters that cannot be passed as additional parameters.
pub const BUILT_IN_PARAMS: [&str; 7] = [
    "client_id",
    "code",
    "code_verifier",
    "grant_type",
    "redirect_uri",
    "refresh_token",
    "scope",
];

/// A request to the token endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    configuration: ServiceConfiguration,
    client_id: String,
    grant_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    authorization_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code_verifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nonce: Option<String>,
    #[serde(default)]
    additional_parameters: AdditionalParameters,
}

impl TokenRequest {
    /// Starts building a request.
    #[must_use]
    pub fn builder(
        configuration: ServiceConfiguration,
        client_id: impl Into<String>,
    ) -> TokenRequestBuilder {
        TokenRequestBuilder {
            configuration,
            client_id: client_id.into(),
            grant_type: None,
            redirect_uri: None,
            scope: None,
            authorization_code: None,
            refresh_token: None,
            code_verifier: None,
            nonce: None,
            additional_parameters: AdditionalParameters::new(),
        }
    }

    /// Service configuration.
    #[must_use]
    pub fn configuration(&self) -> &ServiceConfiguration {
        &self.configuration
    }

    /// Client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// `grant_type` value.
    #[must_use]
    pub fn grant_type(&self) -> &str {
        &self.grant_type
    }

    /// Redirect URI used in the authorization request.
    #[must_use]
    pub fn redirect_uri(&self) -> Option<&Url> {
        self.redirect_uri.as_ref()
    }

    /// Space-delimited scope.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Individual scope values.
    #[must_use]
    pub fn scope_set(&self) -> Option<Vec<String>> {
        string_to_set(self.scope.as_deref())
    }

    /// Authorization code being exchanged.
    #[must_use]
    pub fn authorization_code(&self) -> Option<&str> {
        self.authorization_code.as_deref()
    }

    /// Refresh token being redeemed.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// PKCE code verifier.
    #[must_use]
    pub fn code_verifier(&self) -> Option<&str> {
        self.code_verifier.as_deref()
    }

    /// Nonce sent in the authorization request, checked against the ID token.
    #[must_use]
    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    /// Additional parameters.
    #[must_use]
    pub fn additional_parameters(&self) -> &AdditionalParameters {
        &self.additional_parameters
    }

    /// Form parameters for the token endpoint, excluding client credentials.
    #[must_use]
    pub fn request_parameters(&self) -> AdditionalParameters {
        let mut params = AdditionalParameters::new();
        params.insert("grant_type".into(), self.grant_type.clone());

        let optional = [
            ("redirect_uri", self.redirect_uri.as_ref().map(Url::as_str)),
            ("code", self.authorization_code.as_deref()),
            ("refresh_token", self.refresh_token.as_deref()),
            ("code_verifier", self.code_verifier.as_deref()),
            ("scope", self.scope.as_deref()),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                params.insert(key.into(), value.to_string());
            }
        }

        for (key, value) in &self.additional_parameters {
            params.insert(key.clone(), value.clone());
        }
        params
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

    /// Restores a request from its persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if a required member is missing or malformed.
    pub fn from_json(json: &Value) -> Result<Self, ParseError> {
        Ok(Self::deserialize(json)?)
    }

    /// Restores a request from a JSON string.
    ///
    /// # Errors
    ///
    /// As [`Self::from_json`].
    pub fn from_json_str(json: &str) -> Result<Self, ParseError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Builder for [`TokenRequest`].
#[derive(Debug, Clone)]
pub struct TokenRequestBuilder {
    configuration: ServiceConfiguration,
    client_id: String,
    grant_type: Option<String>,
    redirect_uri: Option<Url>,
    scope: Option<String>,
    authorization_code: Option<String>,
    refresh_token: Option<String>,
    code_verifier: Option<String>,
    nonce: Option<String>,
    additional_parameters: AdditionalParameters,
}

impl TokenRequestBuilder {
    /// Sets the grant type. When unset it is inferred from the code or
    /// refresh token.
    #[must_use]
    pub fn grant_type(mut self, grant_type: Option<String>) -> Self {
        self.grant_type = grant_type;
        self
    }

    /// Sets the redirect URI.
    #[must_use]
    pub fn redirect_uri(mut self, redirect_uri: Option<Url>) -> Self {
        self.redirect_uri = redirect_uri;
        self
    }

    /// Sets the space-delimited scope.
    #[must_use]
    pub fn scope(mut self, scope: Option<String>) -> Self {
        self.scope = normalize_space_delimited(scope.as_deref());
        self
    }

    /// Sets the scope values.
    #[must_use]
    pub fn scopes<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.scope = iterable_to_string(values);
        self
    }

    /// Sets the authorization code.
    #[must_use]
    pub fn authorization_code(mut self, code: Option<String>) -> Self {
        self.authorization_code = code;
        self
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn refresh_token(mut self, refresh_token: Option<String>) -> Self {
        self.refresh_token = refresh_token;
        self
    }

    /// Sets the PKCE code verifier.
    #[must_use]
    pub fn code_verifier(mut self, code_verifier: Option<String>) -> Self {
        self.code_verifier = code_verifier;
        self
    }

    /// Sets the expected ID token nonce.
    #[must_use]
    pub fn nonce(mut self, nonce: Option<String>) -> Self {
        self.nonce = nonce;
        self
    }

    /// Replaces the additional parameters.
    #[must_use]
    pub fn additional_parameters(mut self, params: AdditionalParameters) -> Self {
        self.additional_parameters = params;
        self
    }

    fn inferred_grant_type(&self) -> Option<String> {
        if let Some(grant_type) = &self.grant_type {
            return Some(grant_type.clone());
        }
        if self.authorization_code.is_some() {
            Some(grant_types::AUTHORIZATION_CODE.to_string())
        } else if self.refresh_token.is_some() {
            Some(grant_types::REFRESH_TOKEN.to_string())
        } else {
            None
        }
    }

    /// Validates and freezes the request.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if:
    /// - `client_id` is empty
    /// - no grant type is given or inferable
    /// - an `authorization_code` grant lacks the code or redirect URI
    /// - a `refresh_token` grant lacks the refresh token
    /// - the code verifier is malformed
    /// - an additional parameter shadows a built-in parameter
    pub fn build(self) -> Result<TokenRequest, BuildError> {
        if self.client_id.is_empty() {
            return Err(BuildError::Empty("client ID"));
        }
        let grant_type = self
            .inferred_grant_type()
            .ok_or(BuildError::Missing("grant type"))?;
        if grant_type.is_empty() {
            return Err(BuildError::Empty("grant type"));
        }

        if grant_type == grant_types::AUTHORIZATION_CODE {
            if self.authorization_code.as_deref().is_none_or(str::is_empty) {
                return Err(BuildError::Missing("authorization code"));
            }
            if self.redirect_uri.is_none() {
                return Err(BuildError::Missing("redirect URI"));
            }
        }
        if grant_type == grant_types::REFRESH_TOKEN
            && self.refresh_token.as_deref().is_none_or(str::is_empty)
        {
            return Err(BuildError::Missing("refresh token"));
        }

        if let Some(verifier) = &self.code_verifier {
            check_code_verifier(verifier)?;
        }
        check_additional_params(&self.additional_parameters, &BUILT_IN_PARAMS)?;

        Ok(TokenRequest {
            configuration: self.configuration,
            client_id: self.client_id,
            grant_type,
            redirect_uri: self.redirect_uri,
            scope: self.scope,
            authorization_code: self.authorization_code,
            refresh_token: self.refresh_token,
            code_verifier: self.code_verifier,
            nonce: self.nonce,
            additional_parameters: self.additional_parameters,
        })
    }
}
