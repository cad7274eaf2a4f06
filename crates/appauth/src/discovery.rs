//! OpenID Provider metadata.
//!
//! [`DiscoveryDocument`] wraps the raw JSON returned from
//! `.well-known/openid-configuration` and exposes typed accessors for the
//! standard fields, applying the OpenID Connect Discovery 1.0 defaults when
//! a field is absent.
//!
//! The raw JSON is kept verbatim so that it can be persisted and restored
//! without losing provider-specific members.
//!
//! # Example
//!
//! ```ignore
//! use appauth::discovery::DiscoveryDocument;
//!
//! let doc = DiscoveryDocument::from_json_str(&body)?;
//! println!("Token endpoint: {:?}", doc.token_endpoint());
//! ```
//!
//! # References
//!
//! - [OpenID Connect Discovery 1.0](https://openid.net/specs/openid-connect-discovery-1_0.html)

use serde_json::{Map, Value};
use url::Url;

use crate::error::ParseError;
use crate::params::parse_json_object;

/// Fields that must be present and non-null.
pub const MANDATORY_FIELDS: [&str; 6] = [
    "issuer",
    "authorization_endpoint",
    "jwks_uri",
    "response_types_supported",
    "subject_types_supported",
    "id_token_signing_alg_values_supported",
];

/// OpenID Provider metadata document.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryDocument {
    json: Map<String, Value>,
    issuer: String,
    authorization_endpoint: Url,
    jwks_uri: Url,
    response_types_supported: Vec<String>,
    subject_types_supported: Vec<String>,
    id_token_signing_alg_values_supported: Vec<String>,
}

impl DiscoveryDocument {
    /// Wraps a metadata object.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MissingArgument` naming the first mandatory field
    /// that is absent or null, or `InvalidValue` if a mandatory field has the
    /// wrong type.
    pub fn new(json: Map<String, Value>) -> Result<Self, ParseError> {
        for field in MANDATORY_FIELDS {
            if matches!(json.get(field), None | Some(Value::Null)) {
                return Err(ParseError::missing(field));
            }
        }

        let issuer = match json.get("issuer") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(ParseError::invalid("issuer", "expected a string")),
        };
        let authorization_endpoint = required_uri(&json, "authorization_endpoint")?;
        let jwks_uri = required_uri(&json, "jwks_uri")?;
        let response_types_supported = required_list(&json, "response_types_supported")?;
        let subject_types_supported = required_list(&json, "subject_types_supported")?;
        let id_token_signing_alg_values_supported =
            required_list(&json, "id_token_signing_alg_values_supported")?;

        Ok(Self {
            json,
            issuer,
            authorization_endpoint,
            jwks_uri,
            response_types_supported,
            subject_types_supported,
            id_token_signing_alg_values_supported,
        })
    }

    /// Parses a metadata document from text.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` for malformed JSON, otherwise as [`Self::new`].
    pub fn from_json_str(json: &str) -> Result<Self, ParseError> {
        Self::new(parse_json_object(json)?)
    }

    /// Wraps a JSON value, which must be an object.
    ///
    /// # Errors
    ///
    /// As [`Self::new`].
    pub fn from_value(value: Value) -> Result<Self, ParseError> {
        match value {
            Value::Object(map) => Self::new(map),
            _ => Err(ParseError::invalid("discoveryDoc", "expected a JSON object")),
        }
    }

    /// The raw metadata object.
    #[must_use]
    pub fn as_json(&self) -> &Map<String, Value> {
        &self.json
    }

    /// The raw metadata as a JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.json.clone())
    }

    // -------------------------------------------------------------------------
    // Mandatory fields
    // -------------------------------------------------------------------------

    /// Issuer identifier.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Authorization endpoint.
    #[must_use]
    pub fn authorization_endpoint(&self) -> &Url {
        &self.authorization_endpoint
    }

    /// JSON Web Key Set document.
    #[must_use]
    pub fn jwks_uri(&self) -> &Url {
        &self.jwks_uri
    }

    /// Supported `response_type` values.
    #[must_use]
    pub fn response_types_supported(&self) -> &[String] {
        &self.response_types_supported
    }

    /// Supported subject identifier types.
    #[must_use]
    pub fn subject_types_supported(&self) -> &[String] {
        &self.subject_types_supported
    }

    /// Supported ID token signing algorithms.
    #[must_use]
    pub fn id_token_signing_alg_values_supported(&self) -> &[String] {
        &self.id_token_signing_alg_values_supported
    }

    // -------------------------------------------------------------------------
    // Optional endpoints
    // -------------------------------------------------------------------------

    /// Token endpoint.
    #[must_use]
    pub fn token_endpoint(&self) -> Option<Url> {
        self.uri("token_endpoint")
    }

    /// UserInfo endpoint.
    #[must_use]
    pub fn userinfo_endpoint(&self) -> Option<Url> {
        self.uri("userinfo_endpoint")
    }

    /// Dynamic client registration endpoint.
    #[must_use]
    pub fn registration_endpoint(&self) -> Option<Url> {
        self.uri("registration_endpoint")
    }

    /// RP-initiated logout endpoint.
    #[must_use]
    pub fn end_session_endpoint(&self) -> Option<Url> {
        self.uri("end_session_endpoint")
    }

    /// Human-readable developer documentation.
    #[must_use]
    pub fn service_documentation(&self) -> Option<Url> {
        self.uri("service_documentation")
    }

    /// Provider policy page.
    #[must_use]
    pub fn op_policy_uri(&self) -> Option<Url> {
        self.uri("op_policy_uri")
    }

    /// Provider terms of service.
    #[must_use]
    pub fn op_tos_uri(&self) -> Option<Url> {
        self.uri("op_tos_uri")
    }

    // -------------------------------------------------------------------------
    // Optional lists
    // -------------------------------------------------------------------------

    /// Supported scopes.
    #[must_use]
    pub fn scopes_supported(&self) -> Option<Vec<String>> {
        self.list("scopes_supported")
    }

    /// Supported `response_mode` values.
    #[must_use]
    pub fn response_modes_supported(&self) -> Option<Vec<String>> {
        self.list("response_modes_supported")
    }

    /// Supported grant types. Defaults to `authorization_code` and `implicit`.
    #[must_use]
    pub fn grant_types_supported(&self) -> Vec<String> {
        self.list_or("grant_types_supported", &["authorization_code", "implicit"])
    }

    /// Supported authentication context class references.
    #[must_use]
    pub fn acr_values_supported(&self) -> Option<Vec<String>> {
        self.list("acr_values_supported")
    }

    /// Supported ID token encryption `alg` values.
    #[must_use]
    pub fn id_token_encryption_alg_values_supported(&self) -> Option<Vec<String>> {
        self.list("id_token_encryption_alg_values_supported")
    }

    /// Supported ID token encryption `enc` values.
    #[must_use]
    pub fn id_token_encryption_enc_values_supported(&self) -> Option<Vec<String>> {
        self.list("id_token_encryption_enc_values_supported")
    }

    /// Supported UserInfo signing algorithms.
    #[must_use]
    pub fn userinfo_signing_alg_values_supported(&self) -> Option<Vec<String>> {
        self.list("userinfo_signing_alg_values_supported")
    }

    /// Supported UserInfo encryption `alg` values.
    #[must_use]
    pub fn userinfo_encryption_alg_values_supported(&self) -> Option<Vec<String>> {
        self.list("userinfo_encryption_alg_values_supported")
    }

    /// Supported UserInfo encryption `enc` values.
    #[must_use]
    pub fn userinfo_encryption_enc_values_supported(&self) -> Option<Vec<String>> {
        self.list("userinfo_encryption_enc_values_supported")
    }

    /// Supported request object signing algorithms.
    #[must_use]
    pub fn request_object_signing_alg_values_supported(&self) -> Option<Vec<String>> {
        self.list("request_object_signing_alg_values_supported")
    }

    /// Supported request object encryption `alg` values.
    #[must_use]
    pub fn request_object_encryption_alg_values_supported(&self) -> Option<Vec<String>> {
        self.list("request_object_encryption_alg_values_supported")
    }

    /// Supported request object encryption `enc` values.
    #[must_use]
    pub fn request_object_encryption_enc_values_supported(&self) -> Option<Vec<String>> {
        self.list("request_object_encryption_enc_values_supported")
    }

    /// Supported token endpoint client authentication methods.
    /// Defaults to `client_secret_basic`.
    #[must_use]
    pub fn token_endpoint_auth_methods_supported(&self) -> Vec<String> {
        self.list_or(
            "token_endpoint_auth_methods_supported",
            &["client_secret_basic"],
        )
    }

    /// Supported token endpoint JWT signing algorithms.
    #[must_use]
    pub fn token_endpoint_auth_signing_alg_values_supported(&self) -> Option<Vec<String>> {
        self.list("token_endpoint_auth_signing_alg_values_supported")
    }

    /// Supported `display` values.
    #[must_use]
    pub fn display_values_supported(&self) -> Option<Vec<String>> {
        self.list("display_values_supported")
    }

    /// Supported claim types. Defaults to `normal`.
    #[must_use]
    pub fn claim_types_supported(&self) -> Vec<String> {
        self.list_or("claim_types_supported", &["normal"])
    }

    /// Claims the provider may supply values for.
    #[must_use]
    pub fn claims_supported(&self) -> Option<Vec<String>> {
        self.list("claims_supported")
    }

    /// Supported claim languages.
    #[must_use]
    pub fn claims_locales_supported(&self) -> Option<Vec<String>> {
        self.list("claims_locales_supported")
    }

    /// Supported UI languages.
    #[must_use]
    pub fn ui_locales_supported(&self) -> Option<Vec<String>> {
        self.list("ui_locales_supported")
    }

    /// Supported PKCE challenge methods (RFC 8414).
    #[must_use]
    pub fn code_challenge_methods_supported(&self) -> Option<Vec<String>> {
        self.list("code_challenge_methods_supported")
    }

    // -------------------------------------------------------------------------
    // Optional flags
    // -------------------------------------------------------------------------

    /// Whether the `claims` parameter is supported. Defaults to `false`.
    #[must_use]
    pub fn is_claims_parameter_supported(&self) -> bool {
        self.flag("claims_parameter_supported", false)
    }

    /// Whether the `request` parameter is supported. Defaults to `false`.
    #[must_use]
    pub fn is_request_parameter_supported(&self) -> bool {
        self.flag("request_parameter_supported", false)
    }

    /// Whether the `request_uri` parameter is supported. Defaults to `true`.
    #[must_use]
    pub fn is_request_uri_parameter_supported(&self) -> bool {
        self.flag("request_uri_parameter_supported", true)
    }

    /// Whether `request_uri` values must be pre-registered. Defaults to `false`.
    #[must_use]
    pub fn requires_request_uri_registration(&self) -> bool {
        self.flag("require_request_uri_registration", false)
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Returns `true` if `method` is among the supported client authentication methods.
    #[must_use]
    pub fn supports_token_endpoint_auth_method(&self, method: &str) -> bool {
        self.token_endpoint_auth_methods_supported()
            .iter()
            .any(|m| m == method)
    }

    /// Reads an optional URI member, reporting malformed values.
    pub(crate) fn uri_field(&self, key: &str) -> Result<Option<Url>, ParseError> {
        match self.json.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(Url::parse(s)?)),
            Some(_) => Err(ParseError::invalid(key, "expected a URI string")),
        }
    }

    fn uri(&self, key: &str) -> Option<Url> {
        self.uri_field(key).ok().flatten()
    }

    fn list(&self, key: &str) -> Option<Vec<String>> {
        match self.json.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| v.as_str().map(String::from))
                .collect(),
            _ => None,
        }
    }

    fn list_or(&self, key: &str, default: &[&str]) -> Vec<String> {
        self.list(key)
            .unwrap_or_else(|| default.iter().map(|s| (*s).to_string()).collect())
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        self.json
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }
}

fn required_uri(json: &Map<String, Value>, key: &str) -> Result<Url, ParseError> {
    match json.get(key) {
        Some(Value::String(s)) => Ok(Url::parse(s)?),
        _ => Err(ParseError::invalid(key, "expected a URI string")),
    }
}

fn required_list(json: &Map<String, Value>, key: &str) -> Result<Vec<String>, ParseError> {
    let items = match json.get(key) {
        Some(Value::Array(items)) => items,
        _ => return Err(ParseError::invalid(key, "expected an array of strings")),
    };
    items
        .iter()
        .map(|v| {
            v.as_str()
                .map(String::from)
                .ok_or_else(|| ParseError::invalid(key, "expected an array of strings"))
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn sample_json() -> Value {
        json!({
            "issuer": "https://accounts.example.com",
            "authorization_endpoint": "https://accounts.example.com/o/oauth2/auth",
            "token_endpoint": "https://accounts.example.com/o/oauth2/token",
            "userinfo_endpoint": "https://accounts.example.com/userinfo",
            "registration_endpoint": "https://accounts.example.com/register",
            "end_session_endpoint": "https://accounts.example.com/logout",
            "jwks_uri": "https://accounts.example.com/oauth2/v3/certs",
            "response_types_supported": ["code", "token", "id_token", "code token"],
            "subject_types_supported": ["public"],
            "id_token_signing_alg_values_supported": ["RS256"],
            "scopes_supported": ["openid", "email", "profile"],
            "token_endpoint_auth_methods_supported": ["client_secret_post", "client_secret_basic"],
            "claims_supported": ["aud", "email", "exp", "iat", "iss", "sub"],
            "code_challenge_methods_supported": ["plain", "S256"],
            "x_vendor_extension": {"enabled": true}
        })
    }

    pub(crate) fn sample_document() -> DiscoveryDocument {
        DiscoveryDocument::from_value(sample_json()).unwrap()
    }

    #[test]
    fn test_parse_full_document() {
        let doc = sample_document();
        assert_eq!(doc.issuer(), "https://accounts.example.com");
        assert_eq!(
            doc.authorization_endpoint().as_str(),
            "https://accounts.example.com/o/oauth2/auth"
        );
        assert_eq!(
            doc.token_endpoint().unwrap().as_str(),
            "https://accounts.example.com/o/oauth2/token"
        );
        assert_eq!(doc.response_types_supported().len(), 4);
        assert_eq!(doc.subject_types_supported(), ["public"]);
        assert!(doc.supports_token_endpoint_auth_method("client_secret_post"));
        assert_eq!(
            doc.code_challenge_methods_supported().unwrap(),
            vec!["plain".to_string(), "S256".to_string()]
        );
    }

    #[test]
    fn test_each_mandatory_field_is_enforced() {
        for field in MANDATORY_FIELDS {
            let mut json = sample_json();
            json.as_object_mut().unwrap().remove(field);
            let err = DiscoveryDocument::from_value(json).unwrap_err();
            assert_eq!(err.missing_field(), Some(field), "field {}", field);
        }
    }

    #[test]
    fn test_missing_jwks_uri() {
        let mut json = sample_json();
        json.as_object_mut().unwrap().remove("jwks_uri");
        let err = DiscoveryDocument::from_value(json).unwrap_err();
        assert!(matches!(err, ParseError::MissingArgument(ref f) if f == "jwks_uri"));
    }

    #[test]
    fn test_null_mandatory_field_is_missing() {
        let mut json = sample_json();
        json["issuer"] = Value::Null;
        let err = DiscoveryDocument::from_value(json).unwrap_err();
        assert_eq!(err.missing_field(), Some("issuer"));
    }

    #[test]
    fn test_defaults_when_absent() {
        let json = json!({
            "issuer": "https://idp.example.com",
            "authorization_endpoint": "https://idp.example.com/authorize",
            "jwks_uri": "https://idp.example.com/jwks",
            "response_types_supported": ["code"],
            "subject_types_supported": ["public"],
            "id_token_signing_alg_values_supported": ["RS256"]
        });
        let doc = DiscoveryDocument::from_value(json).unwrap();
        assert_eq!(
            doc.grant_types_supported(),
            vec!["authorization_code".to_string(), "implicit".to_string()]
        );
        assert_eq!(
            doc.token_endpoint_auth_methods_supported(),
            vec!["client_secret_basic".to_string()]
        );
        assert_eq!(doc.claim_types_supported(), vec!["normal".to_string()]);
        assert!(!doc.is_claims_parameter_supported());
        assert!(!doc.is_request_parameter_supported());
        assert!(doc.is_request_uri_parameter_supported());
        assert!(!doc.requires_request_uri_registration());
        assert!(doc.token_endpoint().is_none());
        assert!(doc.scopes_supported().is_none());
    }

    #[test]
    fn test_invalid_mandatory_uri() {
        let mut json = sample_json();
        json["authorization_endpoint"] = json!("not a uri");
        assert!(matches!(
            DiscoveryDocument::from_value(json),
            Err(ParseError::Uri(_))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            DiscoveryDocument::from_json_str("{\"issuer\":"),
            Err(ParseError::Json(_))
        ));
    }

    #[test]
    fn test_raw_json_preserved() {
        let doc = sample_document();
        assert_eq!(doc.to_json(), sample_json());
        assert_eq!(doc.as_json()["x_vendor_extension"]["enabled"], true);
    }
}
