//! Token endpoint response (RFC 6749 Section 5.1).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clock::Clock;
use crate::error::ParseError;
use crate::params::{
    AdditionalParameters, extract_additional_json_params, get_i64, get_string,
    iterable_to_string, parse_json_object, string_to_set,
};
use crate::request::TokenRequest;

/// Members with a dedicated field.
pub const BUILT_IN_PARAMS: [&str; 7] = [
    "token_type",
    "access_token",
    "expires_in",
    "expires_at",
    "refresh_token",
    "id_token",
    "scope",
];

/// Tokens issued by the token endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    request: TokenRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(rename = "expires_at", default, skip_serializing_if = "Option::is_none")]
    access_token_expiration_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    #[serde(rename = "additionalParameters", default)]
    additional_parameters: AdditionalParameters,
}

impl TokenResponse {
    /// Starts building a response to `request`.
    #[must_use]
    pub fn builder(request: TokenRequest) -> TokenResponseBuilder {
        TokenResponseBuilder {
            response: Self {
                request,
                token_type: None,
                access_token: None,
                access_token_expiration_time: None,
                id_token: None,
                refresh_token: None,
                scope: None,
                additional_parameters: AdditionalParameters::new(),
            },
        }
    }

    /// Parses a successful token endpoint body.
    ///
    /// `expires_at` wins over `expires_in`; the latter is converted to an
    /// absolute time using `clock`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidValue` if a member has the wrong type.
    pub fn from_server_json(
        request: TokenRequest,
        json: &Map<String, Value>,
        clock: &dyn Clock,
    ) -> Result<Self, ParseError> {
        let mut builder = Self::builder(request)
            .token_type(get_string(json, "token_type")?)
            .access_token(get_string(json, "access_token")?)
            .refresh_token(get_string(json, "refresh_token")?)
            .id_token(get_string(json, "id_token")?)
            .scope(get_string(json, "scope")?)
            .additional_parameters(extract_additional_json_params(json, &BUILT_IN_PARAMS));

        match (get_i64(json, "expires_at")?, get_i64(json, "expires_in")?) {
            (Some(expires_at), _) => {
                builder = builder.access_token_expiration_time(Some(expires_at));
            }
            (None, Some(expires_in)) => {
                builder = builder.access_token_expires_in(expires_in, clock);
            }
            (None, None) => {}
        }

        Ok(builder.build())
    }

    /// Parses a successful token endpoint body from text.
    ///
    /// # Errors
    ///
    /// As [`Self::from_server_json`], plus `ParseError::Json` for malformed
    /// input.
    pub fn from_server_json_str(
        request: TokenRequest,
        json: &str,
        clock: &dyn Clock,
    ) -> Result<Self, ParseError> {
        Self::from_server_json(request, &parse_json_object(json)?, clock)
    }

    /// The request this responds to.
    #[must_use]
    pub fn request(&self) -> &TokenRequest {
        &self.request
    }

    /// Access token type, usually `Bearer`.
    #[must_use]
    pub fn token_type(&self) -> Option<&str> {
        self.token_type.as_deref()
    }

    /// Access token.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Access token expiry in epoch milliseconds.
    #[must_use]
    pub fn access_token_expiration_time(&self) -> Option<i64> {
        self.access_token_expiration_time
    }

    /// ID token.
    #[must_use]
    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }

    /// Refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
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

/// Builder for [`TokenResponse`].
#[derive(Debug, Clone)]
pub struct TokenResponseBuilder {
    response: TokenResponse,
}

impl TokenResponseBuilder {
    /// Sets the token type.
    #[must_use]
    pub fn token_type(mut self, token_type: Option<String>) -> Self {
        self.response.token_type = token_type;
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

    /// Sets the refresh token.
    #[must_use]
    pub fn refresh_token(mut self, refresh_token: Option<String>) -> Self {
        self.response.refresh_token = refresh_token;
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
    pub fn build(self) -> TokenResponse {
        self.response
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::request::token::tests::code_exchange_request;
    use assert_json_diff::assert_json_include;
    use serde_json::json;

    pub(crate) fn test_token_response() -> TokenResponse {
        TokenResponse::builder(code_exchange_request())
            .token_type(Some("Bearer".to_string()))
            .access_token(Some("access".to_string()))
            .access_token_expiration_time(Some(2_000_000))
            .refresh_token(Some("refresh".to_string()))
            .scopes(["openid", "email"])
            .build()
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_expires_in_converted_at_parse_time() {
        let clock = FixedClock::new(1_000_000);
        let json = object(json!({
            "access_token": "at",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "rt",
        }));
        let response = TokenResponse::from_server_json(code_exchange_request(), &json, &clock).unwrap();

        assert_eq!(response.access_token(), Some("at"));
        assert_eq!(response.refresh_token(), Some("rt"));
        assert_eq!(response.access_token_expiration_time(), Some(4_600_000));
        assert!(response.additional_parameters().is_empty());
    }

    #[test]
    fn test_expires_at_takes_precedence() {
        let clock = FixedClock::new(1_000_000);
        let json = object(json!({
            "access_token": "at",
            "expires_in": 3600,
            "expires_at": 42,
        }));
        let response = TokenResponse::from_server_json(code_exchange_request(), &json, &clock).unwrap();
        assert_eq!(response.access_token_expiration_time(), Some(42));
    }

    #[test]
    fn test_huge_expires_in_saturates() {
        let clock = FixedClock::new(1_700_000_000_000);
        let json = object(json!({"access_token": "at", "expires_in": 9_223_372_036_854_776_i64}));
        let response = TokenResponse::from_server_json(code_exchange_request(), &json, &clock).unwrap();
        assert_eq!(response.access_token_expiration_time(), Some(i64::MAX));

        let json = object(json!({"access_token": "at", "expires_in": i64::MIN}));
        let response = TokenResponse::from_server_json(code_exchange_request(), &json, &clock).unwrap();
        assert_eq!(
            response.access_token_expiration_time(),
            Some(i64::MIN + 1_700_000_000_000)
        );
    }

    #[test]
    fn test_string_expires_in_accepted() {
        let clock = FixedClock::new(0);
        let json = object(json!({"access_token": "at", "expires_in": "60"}));
        let response = TokenResponse::from_server_json(code_exchange_request(), &json, &clock).unwrap();
        assert_eq!(response.access_token_expiration_time(), Some(60_000));
    }

    #[test]
    fn test_unknown_members_kept() {
        let clock = FixedClock::new(0);
        let json = object(json!({
            "access_token": "at",
            "patient": "123",
            "need_patient_banner": true,
        }));
        let response = TokenResponse::from_server_json(code_exchange_request(), &json, &clock).unwrap();
        assert_eq!(response.additional_parameters()["patient"], "123");
        assert_eq!(response.additional_parameters()["need_patient_banner"], "true");
    }

    #[test]
    fn test_wrong_member_type() {
        let clock = FixedClock::new(0);
        let json = object(json!({"access_token": 12}));
        let err = TokenResponse::from_server_json(code_exchange_request(), &json, &clock).unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { .. }));
    }

    #[test]
    fn test_malformed_body() {
        let err = TokenResponse::from_server_json_str(
            code_exchange_request(),
            "not json",
            &FixedClock::new(0),
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn test_json_layout() {
        let response = test_token_response();
        assert_json_include!(
            actual: response.to_json().unwrap(),
            expected: json!({
                "token_type": "Bearer",
                "access_token": "access",
                "expires_at": 2_000_000,
                "refresh_token": "refresh",
                "scope": "openid email",
                "additionalParameters": {},
            })
        );

        let restored = TokenResponse::from_json_str(&response.to_json_string().unwrap()).unwrap();
        assert_eq!(restored, response);
    }
}
