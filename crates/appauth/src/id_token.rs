//! OpenID Connect ID token decoding and claim validation.
//!
//! The token's signature is not verified. ID tokens are only accepted from
//! the token endpoint over TLS, so the claims are checked for consistency
//! with the request that produced them:
//!
//! 1. `iss` equals the discovery document's issuer
//! 2. the issuer is an `https` URL with a host and no query or fragment
//! 3. `aud` contains the client ID, or `azp` equals it
//! 4. the token has not expired
//! 5. `iat` is within ten minutes of the current time
//! 6. for code exchanges, `nonce` equals the request's nonce
//!
//! Rules 1 and 2 apply only when the configuration came from discovery.
//!
//! # References
//!
//! - [OpenID Connect Core 1.0 Section 3.1.3.7](https://openid.net/specs/openid-connect-core-1_0.html#IDTokenValidation)

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, NO_PAD};
use base64::engine::DecodePaddingMode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::clock::Clock;
use crate::error::{AuthorizationError, GeneralError};
use crate::request::{TokenRequest, grant_types};

/// Maximum distance between `iat` and the current time, in seconds.
pub const MAX_ISSUED_AT_SKEW_SECS: i64 = 600;

/// Base64url decoding that accepts padded and unpadded sections.
const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    NO_PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// =============================================================================
// Errors
// =============================================================================

/// Reasons an ID token could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum IdTokenError {
    /// The token does not have a header and a claims section.
    #[error("ID token must have both header and claims section")]
    MissingSections,

    /// A section is not valid base64url.
    #[error("Invalid base64url section: {0}")]
    Base64(#[from] base64::DecodeError),

    /// A section is not a JSON object, or a mandatory claim is missing.
    #[error("Invalid ID token JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<IdTokenError> for AuthorizationError {
    fn from(err: IdTokenError) -> Self {
        let description = err.to_string();
        AuthorizationError::from_template(GeneralError::IdTokenParsingError, err)
            .with_description(description)
    }
}

// =============================================================================
// ID Token
// =============================================================================

/// Decoded ID token claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdToken {
    /// Issuer identifier.
    #[serde(rename = "iss")]
    pub issuer: String,

    /// Subject identifier.
    #[serde(rename = "sub")]
    pub subject: String,

    /// Audience. A single string is accepted as a one-element list.
    #[serde(rename = "aud", deserialize_with = "deserialize_audience")]
    pub audience: Vec<String>,

    /// Expiration time in epoch seconds.
    #[serde(rename = "exp")]
    pub expiration: i64,

    /// Issue time in epoch seconds.
    #[serde(rename = "iat")]
    pub issued_at: i64,

    /// Nonce echoed from the authorization request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Authorized party.
    #[serde(rename = "azp", default, skip_serializing_if = "Option::is_none")]
    pub authorized_party: Option<String>,

    /// Every other claim.
    #[serde(flatten)]
    pub additional_claims: Map<String, Value>,
}

fn deserialize_audience<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => Ok(vec![s]),
        OneOrMany::Many(v) => Ok(v),
    }
}

impl IdToken {
    /// Decodes the header and claims of a compact JWT. The header must be a
    /// JSON object but is otherwise ignored; the signature is not read.
    ///
    /// # Errors
    ///
    /// Returns an [`IdTokenError`] if the token has fewer than two sections,
    /// a section is not base64url-encoded JSON, or a mandatory claim is
    /// missing.
    pub fn from_jwt(token: &str) -> Result<Self, IdTokenError> {
        let mut sections = token.split('.');
        let (Some(header), Some(claims)) = (sections.next(), sections.next()) else {
            return Err(IdTokenError::MissingSections);
        };

        let _header: Map<String, Value> = serde_json::from_slice(&BASE64_URL.decode(header)?)?;
        Ok(serde_json::from_slice(&BASE64_URL.decode(claims)?)?)
    }

    /// Checks the claims against the request that obtained this token.
    ///
    /// # Errors
    ///
    /// Returns `ID_TOKEN_VALIDATION_ERROR` describing the first failed rule.
    pub fn validate(
        &self,
        request: &TokenRequest,
        clock: &dyn Clock,
        skip_issuer_https_check: bool,
    ) -> Result<(), AuthorizationError> {
        if let Some(discovery) = request.configuration().discovery_document() {
            if discovery.issuer() != self.issuer {
                return Err(invalid("Issuer mismatch"));
            }

            if !skip_issuer_https_check {
                let issuer =
                    Url::parse(&self.issuer).map_err(|_| invalid("Issuer is not a valid URL"))?;
                if issuer.scheme() != "https" {
                    return Err(invalid("Issuer must be an https URL"));
                }
                if issuer.host_str().is_none_or(str::is_empty) {
                    return Err(invalid("Issuer host can not be empty"));
                }
                if issuer.query().is_some() || issuer.fragment().is_some() {
                    return Err(invalid(
                        "Issuer URL should not contain query parameters or fragment components",
                    ));
                }
            }
        }

        let client_id = request.client_id();
        if !self.audience.iter().any(|aud| aud == client_id)
            && self.authorized_party.as_deref() != Some(client_id)
        {
            return Err(invalid("Audience mismatch"));
        }

        let now_secs = clock.current_time_millis().div_euclid(1000);
        if now_secs > self.expiration {
            return Err(invalid("ID Token expired"));
        }
        if now_secs.abs_diff(self.issued_at) > MAX_ISSUED_AT_SKEW_SECS.unsigned_abs() {
            return Err(invalid(
                "Issued at time is more than 10 minutes before or after the current time",
            ));
        }

        if request.grant_type() == grant_types::AUTHORIZATION_CODE
            && self.nonce.as_deref() != request.nonce()
        {
            return Err(invalid("Nonce mismatch"));
        }

        Ok(())
    }
}

fn invalid(description: &str) -> AuthorizationError {
    tracing::debug!(reason = description, "ID token rejected");
    AuthorizationError::from(GeneralError::IdTokenValidationError).with_description(description)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::configuration::ServiceConfiguration;
    use crate::discovery::DiscoveryDocument;
    use crate::discovery::tests::sample_json;
    use crate::request::token::tests::code_exchange_request;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    pub(crate) const NOW_MILLIS: i64 = 1_700_000_000_000;
    pub(crate) const NOW_SECS: i64 = NOW_MILLIS / 1000;

    pub(crate) fn encode_jwt(claims: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(json!({"alg": "RS256", "typ": "JWT"}).to_string());
        let claims = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{claims}.signature")
    }

    pub(crate) fn valid_claims() -> Value {
        json!({
            "iss": "https://accounts.example.com",
            "sub": "user-1",
            "aud": "test_client_id",
            "exp": NOW_SECS + 3600,
            "iat": NOW_SECS,
            "nonce": "expected_nonce",
        })
    }

    fn with(mut claims: Value, key: &str, value: Value) -> Value {
        claims[key] = value;
        claims
    }

    fn discovery_request(issuer: &str) -> TokenRequest {
        let mut doc = sample_json();
        doc["issuer"] = json!(issuer);
        let config = ServiceConfiguration::from_discovery(DiscoveryDocument::from_value(doc).unwrap())
            .unwrap();
        TokenRequest::builder(config, "test_client_id")
            .authorization_code(Some("code".into()))
            .redirect_uri(Some(Url::parse("com.example.app:/oauth2redirect").unwrap()))
            .nonce(Some("expected_nonce".into()))
            .build()
            .unwrap()
    }

    fn validate(claims: Value, request: &TokenRequest) -> Result<(), AuthorizationError> {
        IdToken::from_jwt(&encode_jwt(&claims))
            .unwrap()
            .validate(request, &FixedClock::new(NOW_MILLIS), false)
    }

    fn description(result: Result<(), AuthorizationError>) -> String {
        let err = result.unwrap_err();
        assert_eq!(err, AuthorizationError::from(GeneralError::IdTokenValidationError));
        err.error_description().unwrap_or_default().to_string()
    }

    #[test]
    fn test_decode_claims() {
        let token = IdToken::from_jwt(&encode_jwt(&json!({
            "iss": "https://accounts.example.com",
            "sub": "user-1",
            "aud": ["a", "b"],
            "exp": 10,
            "iat": 5,
            "azp": "a",
            "email": "user@example.com",
        })))
        .unwrap();

        assert_eq!(token.audience, vec!["a", "b"]);
        assert_eq!(token.authorized_party.as_deref(), Some("a"));
        assert_eq!(token.nonce, None);
        assert_eq!(token.additional_claims["email"], "user@example.com");
        assert!(!token.additional_claims.contains_key("iss"));
    }

    #[test]
    fn test_decode_without_signature_section() {
        let jwt = encode_jwt(&valid_claims());
        let unsigned = jwt.rsplit_once('.').unwrap().0;
        assert!(IdToken::from_jwt(unsigned).is_ok());
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            IdToken::from_jwt("onlyone"),
            Err(IdTokenError::MissingSections)
        ));
        assert!(matches!(
            IdToken::from_jwt("!!!.???"),
            Err(IdTokenError::Base64(_))
        ));

        let missing_iss = encode_jwt(&json!({"sub": "s", "aud": "a", "exp": 1, "iat": 1}));
        let err = IdToken::from_jwt(&missing_iss).unwrap_err();
        assert!(matches!(err, IdTokenError::Json(_)));
        assert_eq!(
            AuthorizationError::from(err),
            AuthorizationError::from(GeneralError::IdTokenParsingError)
        );
    }

    #[test]
    fn test_valid_token() {
        assert!(validate(valid_claims(), &code_exchange_request()).is_ok());
        assert!(validate(valid_claims(), &discovery_request("https://accounts.example.com")).is_ok());
    }

    #[test]
    fn test_issuer_mismatch() {
        let request = discovery_request("https://accounts.example.com");
        let claims = with(valid_claims(), "iss", json!("https://evil.example.com"));
        assert_eq!(description(validate(claims, &request)), "Issuer mismatch");
    }

    #[test]
    fn test_issuer_must_be_https() {
        let request = discovery_request("http://accounts.example.com");
        let claims = with(valid_claims(), "iss", json!("http://accounts.example.com"));
        let token = IdToken::from_jwt(&encode_jwt(&claims)).unwrap();
        let clock = FixedClock::new(NOW_MILLIS);

        assert_eq!(
            description(token.validate(&request, &clock, false)),
            "Issuer must be an https URL"
        );
        assert!(token.validate(&request, &clock, true).is_ok());
    }

    #[test]
    fn test_issuer_with_query() {
        let request = discovery_request("https://accounts.example.com?tenant=1");
        let claims = with(valid_claims(), "iss", json!("https://accounts.example.com?tenant=1"));
        assert!(description(validate(claims, &request)).contains("query"));
    }

    #[test]
    fn test_issuer_ignored_without_discovery() {
        let claims = with(valid_claims(), "iss", json!("http://anything"));
        assert!(validate(claims, &code_exchange_request()).is_ok());
    }

    #[test]
    fn test_audience_mismatch() {
        let claims = with(valid_claims(), "aud", json!(["other-client"]));
        assert_eq!(
            description(validate(claims, &code_exchange_request())),
            "Audience mismatch"
        );
    }

    #[test]
    fn test_authorized_party_accepted() {
        let claims = with(valid_claims(), "aud", json!(["other-client"]));
        let claims = with(claims, "azp", json!("test_client_id"));
        assert!(validate(claims, &code_exchange_request()).is_ok());
    }

    #[test]
    fn test_expired() {
        let claims = with(valid_claims(), "exp", json!(NOW_SECS - 1));
        assert_eq!(
            description(validate(claims, &code_exchange_request())),
            "ID Token expired"
        );
        let claims = with(valid_claims(), "exp", json!(NOW_SECS));
        assert!(validate(claims, &code_exchange_request()).is_ok());
    }

    #[test]
    fn test_issued_at_skew() {
        let request = code_exchange_request();
        assert!(validate(with(valid_claims(), "iat", json!(NOW_SECS - 600)), &request).is_ok());
        assert!(validate(with(valid_claims(), "iat", json!(NOW_SECS + 600)), &request).is_ok());
        assert!(validate(with(valid_claims(), "iat", json!(NOW_SECS - 601)), &request).is_err());
        assert!(validate(with(valid_claims(), "iat", json!(NOW_SECS + 601)), &request).is_err());
    }

    #[test]
    fn test_extreme_time_claims_rejected() {
        let request = code_exchange_request();
        for iat in [i64::MIN, i64::MAX, NOW_SECS - i64::MAX] {
            assert_eq!(
                description(validate(with(valid_claims(), "iat", json!(iat)), &request)),
                "Issued at time is more than 10 minutes before or after the current time"
            );
        }
        assert_eq!(
            description(validate(with(valid_claims(), "exp", json!(i64::MIN)), &request)),
            "ID Token expired"
        );
    }

    #[test]
    fn test_nonce_checked_for_code_exchange_only() {
        let claims = with(valid_claims(), "nonce", json!("xyz"));
        assert_eq!(
            description(validate(claims.clone(), &code_exchange_request())),
            "Nonce mismatch"
        );

        let refresh = TokenRequest::builder(
            crate::configuration::tests::test_configuration(),
            "test_client_id",
        )
        .refresh_token(Some("rt".into()))
        .build()
        .unwrap();
        assert!(validate(claims, &refresh).is_ok());
    }

    #[test]
    fn test_missing_nonce_rejected_when_requested() {
        let mut claims = valid_claims();
        claims.as_object_mut().unwrap().remove("nonce");
        assert!(validate(claims, &code_exchange_request()).is_err());
    }
}
