//! RP-initiated logout request (OpenID Connect RP-Initiated Logout 1.0).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::{AuthorizationManagementRequest, generate_random_state};
use crate::configuration::ServiceConfiguration;
use crate::error::{BuildError, ParseError};
use crate::params::{
    AdditionalParameters, check_additional_params, iterable_to_string, normalize_space_delimited,
};

/// Parameters that cannot be passed as additional parameters.
pub const BUILT_IN_PARAMS: [&str; 4] = [
    "id_token_hint",
    "post_logout_redirect_uri",
    "state",
    "ui_locales",
];

/// A logout request sent through the user agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndSessionRequest {
    configuration: ServiceConfiguration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id_token_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    post_logout_redirect_uri: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ui_locales: Option<String>,
    #[serde(rename = "additionalParameters", default)]
    additional_parameters: AdditionalParameters,
}

impl EndSessionRequest {
    /// Starts building a request. A `state` value is generated unless
    /// overridden.
    #[must_use]
    pub fn builder(configuration: ServiceConfiguration) -> EndSessionRequestBuilder {
        EndSessionRequestBuilder {
            configuration,
            id_token_hint: None,
            post_logout_redirect_uri: None,
            state: Some(generate_random_state()),
            ui_locales: None,
            additional_parameters: AdditionalParameters::new(),
        }
    }

    /// Service configuration.
    #[must_use]
    pub fn configuration(&self) -> &ServiceConfiguration {
        &self.configuration
    }

    /// Previously issued ID token.
    #[must_use]
    pub fn id_token_hint(&self) -> Option<&str> {
        self.id_token_hint.as_deref()
    }

    /// Where the provider sends the user after logout.
    #[must_use]
    pub fn post_logout_redirect_uri(&self) -> Option<&Url> {
        self.post_logout_redirect_uri.as_ref()
    }

    /// Opaque value echoed back in the redirect.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Space-delimited `ui_locales` values.
    #[must_use]
    pub fn ui_locales(&self) -> Option<&str> {
        self.ui_locales.as_deref()
    }

    /// Additional parameters.
    #[must_use]
    pub fn additional_parameters(&self) -> &AdditionalParameters {
        &self.additional_parameters
    }

    /// Serializes to the persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<Value, ParseError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Restores a request from its persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if a required member is missing or malformed,
    /// or `MissingArgument` if the configuration has no end session endpoint.
    pub fn from_json(json: &Value) -> Result<Self, ParseError> {
        let request = Self::deserialize(json)?;
        if request.configuration.end_session_endpoint().is_none() {
            return Err(ParseError::missing("endSessionEndpoint"));
        }
        Ok(request)
    }

    /// Restores a request from a JSON string.
    ///
    /// # Errors
    ///
    /// As [`Self::from_json`].
    pub fn from_json_str(json: &str) -> Result<Self, ParseError> {
        Self::from_json(&serde_json::from_str(json)?)
    }
}

impl AuthorizationManagementRequest for EndSessionRequest {
    fn state(&self) -> Option<&str> {
        EndSessionRequest::state(self)
    }

    fn to_uri(&self) -> Url {
        // Checked by the builder and by `from_json`.
        let mut uri = self
            .configuration
            .end_session_endpoint()
            .cloned()
            .unwrap_or_else(|| self.configuration.authorization_endpoint().clone());
        let optional = [
            ("id_token_hint", self.id_token_hint.as_deref()),
            (
                "post_logout_redirect_uri",
                self.post_logout_redirect_uri.as_ref().map(Url::as_str),
            ),
            ("state", self.state.as_deref()),
            ("ui_locales", self.ui_locales.as_deref()),
        ];
        let pairs: Vec<(&str, &str)> = optional
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key, value)))
            .chain(
                self.additional_parameters
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            )
            .collect();
        if !pairs.is_empty() {
            uri.query_pairs_mut().extend_pairs(pairs);
        }
        uri
    }

    fn to_json_string(&self) -> Result<String, ParseError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Builder for [`EndSessionRequest`].
#[derive(Debug, Clone)]
pub struct EndSessionRequestBuilder {
    configuration: ServiceConfiguration,
    id_token_hint: Option<String>,
    post_logout_redirect_uri: Option<Url>,
    state: Option<String>,
    ui_locales: Option<String>,
    additional_parameters: AdditionalParameters,
}

impl EndSessionRequestBuilder {
    /// Sets the ID token hint.
    #[must_use]
    pub fn id_token_hint(mut self, id_token_hint: Option<String>) -> Self {
        self.id_token_hint = id_token_hint;
        self
    }

    /// Sets the post-logout redirect URI.
    #[must_use]
    pub fn post_logout_redirect_uri(mut self, uri: Option<Url>) -> Self {
        self.post_logout_redirect_uri = uri;
        self
    }

    /// Overrides the generated `state`. `None` omits the parameter.
    #[must_use]
    pub fn state(mut self, state: Option<String>) -> Self {
        self.state = state;
        self
    }

    /// Sets the space-delimited `ui_locales` value.
    #[must_use]
    pub fn ui_locales(mut self, ui_locales: Option<String>) -> Self {
        self.ui_locales = normalize_space_delimited(ui_locales.as_deref());
        self
    }

    /// Sets the `ui_locales` values.
    #[must_use]
    pub fn ui_locales_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ui_locales = iterable_to_string(values);
        self
    }

    /// Replaces the additional parameters.
    #[must_use]
    pub fn additional_parameters(mut self, params: AdditionalParameters) -> Self {
        self.additional_parameters = params;
        self
    }

    /// Validates and freezes the request.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if the configuration has no end session
    /// endpoint or an additional parameter shadows a built-in one.
    pub fn build(self) -> Result<EndSessionRequest, BuildError> {
        if self.configuration.end_session_endpoint().is_none() {
            return Err(BuildError::Missing("end session endpoint"));
        }
        check_additional_params(&self.additional_parameters, &BUILT_IN_PARAMS)?;

        Ok(EndSessionRequest {
            configuration: self.configuration,
            id_token_hint: self.id_token_hint,
            post_logout_redirect_uri: self.post_logout_redirect_uri,
            state: self.state,
            ui_locales: self.ui_locales,
            additional_parameters: self.additional_parameters,
        })
    }
}
