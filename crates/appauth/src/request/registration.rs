//! Dynamic client registration request (RFC 7591 Section 2, OpenID Connect
//! Dynamic Client Registration 1.0 Section 3.1).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::configuration::ServiceConfiguration;
use crate::error::{BuildError, ParseError};
use crate::params::{AdditionalParameters, check_additional_params};

/// The only application type registered by this library.
pub const APPLICATION_TYPE_NATIVE: &str = "native";

/// Parameters that cannot be passed as additional parameters.
pub const BUILT_IN_PARAMS: [&str; 8] = [
    "redirect_uris",
    "response_types",
    "grant_types",
    "application_type",
    "subject_type",
    "jwks_uri",
    "jwks",
    "token_endpoint_auth_method",
];

/// Standard `subject_type` values.
pub mod subject_types {
    /// Same `sub` for every client.
    pub const PUBLIC: &str = "public";
    /// Client-specific `sub`.
    pub const PAIRWISE: &str = "pairwise";
}

fn default_application_type() -> String {
    APPLICATION_TYPE_NATIVE.to_string()
}

/// A client registration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    configuration: ServiceConfiguration,
    redirect_uris: Vec<Url>,
    #[serde(default = "default_application_type")]
    application_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    response_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    grant_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jwks_uri: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jwks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_endpoint_auth_method: Option<String>,
    #[serde(rename = "additionalParameters", default)]
    additional_parameters: AdditionalParameters,
}

impl RegistrationRequest {
    /// Starts building a request.
    #[must_use]
    pub fn builder(
        configuration: ServiceConfiguration,
        redirect_uris: Vec<Url>,
    ) -> RegistrationRequestBuilder {
        RegistrationRequestBuilder {
            configuration,
            redirect_uris,
            response_types: None,
            grant_types: None,
            subject_type: None,
            jwks_uri: None,
            jwks: None,
            token_endpoint_auth_method: None,
            additional_parameters: AdditionalParameters::new(),
        }
    }

    /// Service configuration.
    #[must_use]
    pub fn configuration(&self) -> &ServiceConfiguration {
        &self.configuration
    }

    /// Redirect URIs to register.
    #[must_use]
    pub fn redirect_uris(&self) -> &[Url] {
        &self.redirect_uris
    }

    /// Always `native`.
    #[must_use]
    pub fn application_type(&self) -> &str {
        &self.application_type
    }

    /// Response types the client will use.
    #[must_use]
    pub fn response_types(&self) -> Option<&[String]> {
        self.response_types.as_deref()
    }

    /// Grant types the client will use.
    #[must_use]
    pub fn grant_types(&self) -> Option<&[String]> {
        self.grant_types.as_deref()
    }

    /// Requested subject type.
    #[must_use]
    pub fn subject_type(&self) -> Option<&str> {
        self.subject_type.as_deref()
    }

    /// Location of the client's JWK set.
    #[must_use]
    pub fn jwks_uri(&self) -> Option<&Url> {
        self.jwks_uri.as_ref()
    }

    /// Inline JWK set.
    #[must_use]
    pub fn jwks(&self) -> Option<&Value> {
        self.jwks.as_ref()
    }

    /// Requested token endpoint authentication method.
    #[must_use]
    pub fn token_endpoint_auth_method(&self) -> Option<&str> {
        self.token_endpoint_auth_method.as_deref()
    }

    /// Additional parameters.
    #[must_use]
    pub fn additional_parameters(&self) -> &AdditionalParameters {
        &self.additional_parameters
    }

    /// The JSON body sent to the registration endpoint. Additional
    /// parameters are merged into the top level.
    #[must_use]
    pub fn to_wire_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            "redirect_uris".into(),
            Value::Array(
                self.redirect_uris
                    .iter()
                    .map(|u| Value::String(u.to_string()))
                    .collect(),
            ),
        );
        map.insert(
            "application_type".into(),
            Value::String(self.application_type.clone()),
        );
        if let Some(types) = &self.response_types {
            map.insert("response_types".into(), types.clone().into());
        }
        if let Some(types) = &self.grant_types {
            map.insert("grant_types".into(), types.clone().into());
        }
        if let Some(subject_type) = &self.subject_type {
            map.insert("subject_type".into(), subject_type.clone().into());
        }
        if let Some(uri) = &self.jwks_uri {
            map.insert("jwks_uri".into(), uri.to_string().into());
        }
        if let Some(jwks) = &self.jwks {
            map.insert("jwks".into(), jwks.clone());
        }
        if let Some(method) = &self.token_endpoint_auth_method {
            map.insert("token_endpoint_auth_method".into(), method.clone().into());
        }
        for (key, value) in &self.additional_parameters {
            map.insert(key.clone(), value.clone().into());
        }
        Value::Object(map)
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

/// Builder for [`RegistrationRequest`].
#[derive(Debug, Clone)]
pub struct RegistrationRequestBuilder {
    configuration: ServiceConfiguration,
    redirect_uris: Vec<Url>,
    response_types: Option<Vec<String>>,
    grant_types: Option<Vec<String>>,
    subject_type: Option<String>,
    jwks_uri: Option<Url>,
    jwks: Option<Value>,
    token_endpoint_auth_method: Option<String>,
    additional_parameters: AdditionalParameters,
}

impl RegistrationRequestBuilder {
    /// Sets the response types.
    #[must_use]
    pub fn response_types(mut self, types: Option<Vec<String>>) -> Self {
        self.response_types = types;
        self
    }

    /// Sets the grant types.
    #[must_use]
    pub fn grant_types(mut self, types: Option<Vec<String>>) -> Self {
        self.grant_types = types;
        self
    }

    /// Sets the subject type.
    #[must_use]
    pub fn subject_type(mut self, subject_type: Option<String>) -> Self {
        self.subject_type = subject_type;
        self
    }

    /// Sets the JWK set location. Mutually exclusive with [`Self::jwks`].
    #[must_use]
    pub fn jwks_uri(mut self, jwks_uri: Option<Url>) -> Self {
        self.jwks_uri = jwks_uri;
        self
    }

    /// Sets an inline JWK set. Mutually exclusive with [`Self::jwks_uri`].
    #[must_use]
    pub fn jwks(mut self, jwks: Option<Value>) -> Self {
        self.jwks = jwks;
        self
    }

    /// Sets the token endpoint authentication method.
    #[must_use]
    pub fn token_endpoint_auth_method(mut self, method: Option<String>) -> Self {
        self.token_endpoint_auth_method = method;
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
    /// Returns a [`BuildError`] if no redirect URI is given, both `jwks_uri`
    /// and `jwks` are set, or an additional parameter shadows a built-in one.
    pub fn build(self) -> Result<RegistrationRequest, BuildError> {
        if self.redirect_uris.is_empty() {
            return Err(BuildError::Empty("redirect URIs"));
        }
        if self.jwks_uri.is_some() && self.jwks.is_some() {
            return Err(BuildError::MutuallyExclusive("jwks_uri", "jwks"));
        }
        check_additional_params(&self.additional_parameters, &BUILT_IN_PARAMS)?;

        Ok(RegistrationRequest {
            configuration: self.configuration,
            redirect_uris: self.redirect_uris,
            application_type: default_application_type(),
            response_types: self.response_types,
            grant_types: self.grant_types,
            subject_type: self.subject_type,
            jwks_uri: self.jwks_uri,
            jwks: self.jwks,
            token_endpoint_auth_method: self.token_endpoint_auth_method,
            additional_parameters: self.additional_parameters,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::configuration::tests::test_configuration;
    use serde_json::json;

    pub(crate) fn test_registration_request() -> RegistrationRequest {
        RegistrationRequest::builder(
            test_configuration(),
            vec![Url::parse("com.example.app:/oauth2redirect").unwrap()],
        )
        .build()
        .unwrap()
    }

    #[test]
    fn test_wire_json() {
        let mut extra = AdditionalParameters::new();
        extra.insert("client_name".into(), "Example".into());
        let request = RegistrationRequest::builder(
            test_configuration(),
            vec![Url::parse("com.example.app:/oauth2redirect").unwrap()],
        )
        .response_types(Some(vec!["code".into()]))
        .grant_types(Some(vec!["authorization_code".into(), "refresh_token".into()]))
        .subject_type(Some(subject_types::PUBLIC.into()))
        .token_endpoint_auth_method(Some("client_secret_post".into()))
        .additional_parameters(extra)
        .build()
        .unwrap();

        assert_eq!(
            request.to_wire_json(),
            json!({
                "redirect_uris": ["com.example.app:/oauth2redirect"],
                "application_type": "native",
                "response_types": ["code"],
                "grant_types": ["authorization_code", "refresh_token"],
                "subject_type": "public",
                "token_endpoint_auth_method": "client_secret_post",
                "client_name": "Example"
            })
        );
    }

    #[test]
    fn test_empty_redirect_uris_rejected() {
        let err = RegistrationRequest::builder(test_configuration(), vec![])
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Empty("redirect URIs")));
    }

    #[test]
    fn test_jwks_and_jwks_uri_exclusive() {
        let err = RegistrationRequest::builder(
            test_configuration(),
            vec![Url::parse("app:/cb").unwrap()],
        )
        .jwks_uri(Some(Url::parse("https://client.example.com/jwks").unwrap()))
        .jwks(Some(json!({"keys": []})))
        .build()
        .unwrap_err();
        assert!(matches!(err, BuildError::MutuallyExclusive(_, _)));
    }

    #[test]
    fn test_reserved_additional_parameter_rejected() {
        let mut extra = AdditionalParameters::new();
        extra.insert("application_type".into(), "web".into());
        let err = RegistrationRequest::builder(
            test_configuration(),
            vec![Url::parse("app:/cb").unwrap()],
        )
        .additional_parameters(extra)
        .build()
        .unwrap_err();
        assert!(err.is_reserved_parameter());
    }

    #[test]
    fn test_json_round_trip() {
        let request = RegistrationRequest::builder(
            test_configuration(),
            vec![Url::parse("app:/cb").unwrap()],
        )
        .jwks(Some(json!({"keys": [{"kty": "EC"}]})))
        .build()
        .unwrap();
        let json = request.to_json().unwrap();
        assert_eq!(json["application_type"], "native");
        assert!(json.get("configuration").is_some());
        assert!(json.get("additionalParameters").is_some());

        let restored = RegistrationRequest::from_json_str(&request.to_json_string().unwrap()).unwrap();
        assert_eq!(restored, request);
    }
}
