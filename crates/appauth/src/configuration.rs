//! Authorization service endpoints.
//!
//! A [`ServiceConfiguration`] is created once per provider, either from
//! explicit endpoint URIs or from a [`DiscoveryDocument`], and is embedded in
//! every request that targets that provider.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use url::Url;

use crate::discovery::DiscoveryDocument;
use crate::error::ParseError;

/// Path appended to an issuer to locate its discovery document.
pub const OPENID_CONFIGURATION_PATH: [&str; 2] = [".well-known", "openid-configuration"];

/// Endpoints of an authorization service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfiguration {
    authorization_endpoint: Url,
    token_endpoint: Url,
    registration_endpoint: Option<Url>,
    end_session_endpoint: Option<Url>,
    discovery_document: Option<Arc<DiscoveryDocument>>,
}

impl ServiceConfiguration {
    /// Creates a configuration from explicit endpoints.
    #[must_use]
    pub fn new(authorization_endpoint: Url, token_endpoint: Url) -> Self {
        Self {
            authorization_endpoint,
            token_endpoint,
            registration_endpoint: None,
            end_session_endpoint: None,
            discovery_document: None,
        }
    }

    /// Sets the registration endpoint.
    #[must_use]
    pub fn with_registration_endpoint(mut self, endpoint: Url) -> Self {
        self.registration_endpoint = Some(endpoint);
        self
    }

    /// Sets the end session endpoint.
    #[must_use]
    pub fn with_end_session_endpoint(mut self, endpoint: Url) -> Self {
        self.end_session_endpoint = Some(endpoint);
        self
    }

    /// Derives the endpoints from a discovery document.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MissingArgument("token_endpoint")` if the document
    /// does not declare a token endpoint, or `Uri` if an optional endpoint is
    /// malformed.
    pub fn from_discovery(document: DiscoveryDocument) -> Result<Self, ParseError> {
        let token_endpoint = document
            .uri_field("token_endpoint")?
            .ok_or_else(|| ParseError::missing("token_endpoint"))?;
        let registration_endpoint = document.uri_field("registration_endpoint")?;
        let end_session_endpoint = document.uri_field("end_session_endpoint")?;

        Ok(Self {
            authorization_endpoint: document.authorization_endpoint().clone(),
            token_endpoint,
            registration_endpoint,
            end_session_endpoint,
            discovery_document: Some(Arc::new(document)),
        })
    }

    /// Builds the discovery URI for an OpenID Connect issuer by appending
    /// `/.well-known/openid-configuration` to its path.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidValue` if `issuer` cannot carry a path.
    pub fn build_discovery_uri(issuer: &Url) -> Result<Url, ParseError> {
        let mut uri = issuer.clone();
        uri.set_query(None);
        uri.set_fragment(None);
        uri.path_segments_mut()
            .map_err(|()| ParseError::invalid("issuer", "cannot be a base URI"))?
            .pop_if_empty()
            .extend(OPENID_CONFIGURATION_PATH);
        Ok(uri)
    }

    /// Authorization endpoint.
    #[must_use]
    pub fn authorization_endpoint(&self) -> &Url {
        &self.authorization_endpoint
    }

    /// Token endpoint.
    #[must_use]
    pub fn token_endpoint(&self) -> &Url {
        &self.token_endpoint
    }

    /// Registration endpoint, if known.
    #[must_use]
    pub fn registration_endpoint(&self) -> Option<&Url> {
        self.registration_endpoint.as_ref()
    }

    /// End session endpoint, if known.
    #[must_use]
    pub fn end_session_endpoint(&self) -> Option<&Url> {
        self.end_session_endpoint.as_ref()
    }

    /// The discovery document this configuration was derived from.
    #[must_use]
    pub fn discovery_document(&self) -> Option<&DiscoveryDocument> {
        self.discovery_document.as_deref()
    }

    /// Serializes to the persisted JSON form.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert(
            "authorizationEndpoint".into(),
            self.authorization_endpoint.as_str().into(),
        );
        map.insert("tokenEndpoint".into(), self.token_endpoint.as_str().into());
        if let Some(endpoint) = &self.registration_endpoint {
            map.insert("registrationEndpoint".into(), endpoint.as_str().into());
        }
        if let Some(endpoint) = &self.end_session_endpoint {
            map.insert("endSessionEndpoint".into(), endpoint.as_str().into());
        }
        if let Some(doc) = &self.discovery_document {
            map.insert("discoveryDoc".into(), doc.to_json());
        }
        Value::Object(map)
    }

    /// Serializes to a JSON string.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Restores a configuration from its persisted JSON form. When a
    /// `discoveryDoc` member is present the endpoints are derived from it.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if a required member is missing or malformed.
    pub fn from_json(json: &Value) -> Result<Self, ParseError> {
        let map = json
            .as_object()
            .ok_or_else(|| ParseError::invalid("configuration", "expected a JSON object"))?;

        if let Some(doc) = map.get("discoveryDoc").filter(|v| !v.is_null()) {
            return Self::from_discovery(DiscoveryDocument::from_value(doc.clone())?);
        }

        let uri = |key: &str| -> Result<Option<Url>, ParseError> {
            match map.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(Url::parse(s)?)),
                Some(_) => Err(ParseError::invalid(key, "expected a URI string")),
            }
        };

        Ok(Self {
            authorization_endpoint: uri("authorizationEndpoint")?
                .ok_or_else(|| ParseError::missing("authorizationEndpoint"))?,
            token_endpoint: uri("tokenEndpoint")?
                .ok_or_else(|| ParseError::missing("tokenEndpoint"))?,
            registration_endpoint: uri("registrationEndpoint")?,
            end_session_endpoint: uri("endSessionEndpoint")?,
            discovery_document: None,
        })
    }

    /// Restores a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// As [`Self::from_json`], plus `ParseError::Json` for malformed text.
    pub fn from_json_str(json: &str) -> Result<Self, ParseError> {
        Self::from_json(&serde_json::from_str(json)?)
    }
}

impl Serialize for ServiceConfiguration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ServiceConfiguration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::discovery::tests::{sample_document, sample_json};

    pub(crate) fn test_configuration() -> ServiceConfiguration {
        ServiceConfiguration::new(
            Url::parse("https://auth.example.com/authorize").unwrap(),
            Url::parse("https://auth.example.com/token").unwrap(),
        )
        .with_registration_endpoint(Url::parse("https://auth.example.com/register").unwrap())
        .with_end_session_endpoint(Url::parse("https://auth.example.com/logout").unwrap())
    }

    #[test]
    fn test_from_discovery() {
        let config = ServiceConfiguration::from_discovery(sample_document()).unwrap();
        assert_eq!(
            config.authorization_endpoint().as_str(),
            "https://accounts.example.com/o/oauth2/auth"
        );
        assert_eq!(
            config.token_endpoint().as_str(),
            "https://accounts.example.com/o/oauth2/token"
        );
        assert_eq!(
            config.registration_endpoint().unwrap().as_str(),
            "https://accounts.example.com/register"
        );
        assert!(config.discovery_document().is_some());
    }

    #[test]
    fn test_from_discovery_without_token_endpoint() {
        let mut json = sample_json();
        json.as_object_mut().unwrap().remove("token_endpoint");
        let doc = DiscoveryDocument::from_value(json).unwrap();
        let err = ServiceConfiguration::from_discovery(doc).unwrap_err();
        assert_eq!(err.missing_field(), Some("token_endpoint"));
    }

    #[test]
    fn test_build_discovery_uri() {
        let cases = [
            (
                "https://accounts.example.com",
                "https://accounts.example.com/.well-known/openid-configuration",
            ),
            (
                "https://accounts.example.com/",
                "https://accounts.example.com/.well-known/openid-configuration",
            ),
            (
                "https://example.com/realms/demo",
                "https://example.com/realms/demo/.well-known/openid-configuration",
            ),
        ];
        for (issuer, expected) in cases {
            let uri = ServiceConfiguration::build_discovery_uri(&Url::parse(issuer).unwrap())
                .unwrap();
            assert_eq!(uri.as_str(), expected);
        }
    }

    #[test]
    fn test_json_round_trip_explicit() {
        let config = test_configuration();
        let json = config.to_json_string();
        let restored = ServiceConfiguration::from_json_str(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_json_round_trip_discovery() {
        let config = ServiceConfiguration::from_discovery(sample_document()).unwrap();
        let json = config.to_json();
        assert_eq!(json["discoveryDoc"], sample_json());
        let restored = ServiceConfiguration::from_json(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_json_missing_token_endpoint() {
        let err = ServiceConfiguration::from_json_str(
            r#"{"authorizationEndpoint":"https://auth.example.com/authorize"}"#,
        )
        .unwrap_err();
        assert_eq!(err.missing_field(), Some("tokenEndpoint"));
    }
}
