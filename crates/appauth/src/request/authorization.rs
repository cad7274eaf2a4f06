//! Authorization request (RFC 6749 Section 4.1.1, OpenID Connect Core 3.1.2.1).
//!
//! # Example
//!
//! ```ignore
//! use appauth::request::{AuthorizationRequest, response_types};
//!
//! let request = AuthorizationRequest::builder(
//!     configuration,
//!     "my-client",
//!     response_types::CODE,
//!     Url::parse("com.example.app:/oauth2redirect")?,
//! )
//! .scopes(["openid", "email"])
//! .build()?;
//!
//! user_agent.launch(&request.to_uri()).await?;
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::{AuthorizationManagementRequest, generate_random_state};
use crate::configuration::ServiceConfiguration;
use crate::error::{BuildError, ParseError};
use crate::params::{
    AdditionalParameters, check_additional_params, iterable_to_string, normalize_space_delimited,
    string_to_set,
};
use crate::pkce::{
    check_code_verifier, code_verifier_challenge_method, derive_code_verifier_challenge,
    generate_random_code_verifier,
};

/// Parameters that cannot be passed as additional parameters.
pub const BUILT_IN_PARAMS: [&str; 15] = [
    "client_id",
    "code_challenge",
    "code_challenge_method",
    "display",
    "login_hint",
    "prompt",
    "ui_locales",
    "redirect_uri",
    "response_mode",
    "response_type",
    "scope",
    "state",
    "nonce",
    "claims",
    "claims_locales",
];

/// Standard `scope` values (OpenID Connect Core Section 5.4 and 11).
pub mod scopes {
    /// Requests an ID token.
    pub const OPENID: &str = "openid";
    /// Default profile claims.
    pub const PROFILE: &str = "profile";
    /// `email` and `email_verified` claims.
    pub const EMAIL: &str = "email";
    /// `address` claim.
    pub const ADDRESS: &str = "address";
    /// `phone_number` and `phone_number_verified` claims.
    pub const PHONE: &str = "phone";
    /// Requests a refresh token.
    pub const OFFLINE_ACCESS: &str = "offline_access";
}

/// Standard `prompt` values.
pub mod prompts {
    /// No user interaction.
    pub const NONE: &str = "none";
    /// Force re-authentication.
    pub const LOGIN: &str = "login";
    /// Force a consent screen.
    pub const CONSENT: &str = "consent";
    /// Force account selection.
    pub const SELECT_ACCOUNT: &str = "select_account";
}

/// Standard `display` values.
pub mod displays {
    /// Full user agent page.
    pub const PAGE: &str = "page";
    /// Popup window.
    pub const POPUP: &str = "popup";
    /// Touch interface.
    pub const TOUCH: &str = "touch";
    /// Feature phone.
    pub const WAP: &str = "wap";
}

/// Standard `response_mode` values.
pub mod response_modes {
    /// Parameters in the query string.
    pub const QUERY: &str = "query";
    /// Parameters in the fragment.
    pub const FRAGMENT: &str = "fragment";
}

/// An authorization request sent through the user agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRequest {
    configuration: ServiceConfiguration,
    client_id: String,
    response_type: String,
    redirect_uri: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display: Option<String>,
    #[serde(rename = "login_hint", default, skip_serializing_if = "Option::is_none")]
    login_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prompt: Option<String>,
    #[serde(rename = "ui_locales", default, skip_serializing_if = "Option::is_none")]
    ui_locales: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code_verifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code_verifier_challenge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code_verifier_challenge_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    response_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    claims: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    claims_locales: Option<String>,
    #[serde(default)]
    additional_parameters: AdditionalParameters,
}

impl AuthorizationRequest {
    /// Starts building a request. `state`, `nonce` and a PKCE code verifier
    /// are generated unless overridden.
    #[must_use]
    pub fn builder(
        configuration: ServiceConfiguration,
        client_id: impl Into<String>,
        response_type: impl Into<String>,
        redirect_uri: Url,
    ) -> AuthorizationRequestBuilder {
        AuthorizationRequestBuilder::new(configuration, client_id, response_type, redirect_uri)
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

    /// `response_type` value.
    #[must_use]
    pub fn response_type(&self) -> &str {
        &self.response_type
    }

    /// Redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// `display` value.
    #[must_use]
    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }

    /// `login_hint` value.
    #[must_use]
    pub fn login_hint(&self) -> Option<&str> {
        self.login_hint.as_deref()
    }

    /// Space-delimited `prompt` values.
    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    /// Individual `prompt` values.
    #[must_use]
    pub fn prompt_values(&self) -> Option<Vec<String>> {
        string_to_set(self.prompt.as_deref())
    }

    /// Space-delimited `ui_locales` values.
    #[must_use]
    pub fn ui_locales(&self) -> Option<&str> {
        self.ui_locales.as_deref()
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

    /// Opaque value echoed back in the redirect.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Nonce bound to the ID token.
    #[must_use]
    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    /// PKCE code verifier.
    #[must_use]
    pub fn code_verifier(&self) -> Option<&str> {
        self.code_verifier.as_deref()
    }

    /// PKCE code challenge.
    #[must_use]
    pub fn code_verifier_challenge(&self) -> Option<&str> {
        self.code_verifier_challenge.as_deref()
    }

    /// PKCE code challenge method.
    #[must_use]
    pub fn code_verifier_challenge_method(&self) -> Option<&str> {
        self.code_verifier_challenge_method.as_deref()
    }

    /// `response_mode` value.
    #[must_use]
    pub fn response_mode(&self) -> Option<&str> {
        self.response_mode.as_deref()
    }

    /// `claims` request object.
    #[must_use]
    pub fn claims(&self) -> Option<&Value> {
        self.claims.as_ref()
    }

    /// Space-delimited `claims_locales` values.
    #[must_use]
    pub fn claims_locales(&self) -> Option<&str> {
        self.claims_locales.as_deref()
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

impl AuthorizationManagementRequest for AuthorizationRequest {
    fn state(&self) -> Option<&str> {
        AuthorizationRequest::state(self)
    }

    fn to_uri(&self) -> Url {
        let mut uri = self.configuration.authorization_endpoint().clone();
        {
            let mut query = uri.query_pairs_mut();
            query
                .append_pair("redirect_uri", self.redirect_uri.as_str())
                .append_pair("client_id", &self.client_id)
                .append_pair("response_type", &self.response_type);

            let optional = [
                ("display", self.display.as_deref()),
                ("login_hint", self.login_hint.as_deref()),
                ("prompt", self.prompt.as_deref()),
                ("ui_locales", self.ui_locales.as_deref()),
                ("state", self.state.as_deref()),
                ("nonce", self.nonce.as_deref()),
                ("scope", self.scope.as_deref()),
                ("response_mode", self.response_mode.as_deref()),
            ];
            for (key, value) in optional {
                if let Some(value) = value {
                    query.append_pair(key, value);
                }
            }

            if let Some(claims) = &self.claims {
                query.append_pair("claims", &claims.to_string());
            }
            if let Some(locales) = &self.claims_locales {
                query.append_pair("claims_locales", locales);
            }

            if let (Some(challenge), Some(method)) = (
                &self.code_verifier_challenge,
                &self.code_verifier_challenge_method,
            ) {
                query
                    .append_pair("code_challenge", challenge)
                    .append_pair("code_challenge_method", method);
            }

            for (key, value) in &self.additional_parameters {
                query.append_pair(key, value);
            }
        }
        uri
    }

    fn to_json_string(&self) -> Result<String, ParseError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Builder for [`AuthorizationRequest`].
#[derive(Debug, Clone)]
pub struct AuthorizationRequestBuilder {
    configuration: ServiceConfiguration,
    client_id: String,
    response_type: String,
    redirect_uri: Url,
    display: Option<String>,
    login_hint: Option<String>,
    prompt: Option<String>,
    ui_locales: Option<String>,
    scope: Option<String>,
    state: Option<String>,
    nonce: Option<String>,
    code_verifier: Option<String>,
    code_verifier_challenge: Option<String>,
    code_verifier_challenge_method: Option<String>,
    response_mode: Option<String>,
    claims: Option<Value>,
    claims_locales: Option<String>,
    additional_parameters: AdditionalParameters,
}

impl AuthorizationRequestBuilder {
    fn new(
        configuration: ServiceConfiguration,
        client_id: impl Into<String>,
        response_type: impl Into<String>,
        redirect_uri: Url,
    ) -> Self {
        let verifier = generate_random_code_verifier();
        Self {
            configuration,
            client_id: client_id.into(),
            response_type: response_type.into(),
            redirect_uri,
            display: None,
            login_hint: None,
            prompt: None,
            ui_locales: None,
            scope: None,
            state: Some(generate_random_state()),
            nonce: Some(generate_random_state()),
            code_verifier_challenge: Some(derive_code_verifier_challenge(&verifier)),
            code_verifier_challenge_method: Some(
                code_verifier_challenge_method().as_str().to_string(),
            ),
            code_verifier: Some(verifier),
            response_mode: None,
            claims: None,
            claims_locales: None,
            additional_parameters: AdditionalParameters::new(),
        }
    }

    /// Sets the `display` value.
    #[must_use]
    pub fn display(mut self, display: Option<String>) -> Self {
        self.display = display;
        self
    }

    /// Sets the `login_hint` value.
    #[must_use]
    pub fn login_hint(mut self, login_hint: Option<String>) -> Self {
        self.login_hint = login_hint;
        self
    }

    /// Sets the space-delimited `prompt` value.
    #[must_use]
    pub fn prompt(mut self, prompt: Option<String>) -> Self {
        self.prompt = normalize_space_delimited(prompt.as_deref());
        self
    }

    /// Sets the `prompt` values.
    #[must_use]
    pub fn prompt_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.prompt = iterable_to_string(values);
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

    /// Overrides the generated `state`. `None` omits the parameter.
    #[must_use]
    pub fn state(mut self, state: Option<String>) -> Self {
        self.state = state;
        self
    }

    /// Overrides the generated `nonce`. `None` omits the parameter.
    #[must_use]
    pub fn nonce(mut self, nonce: Option<String>) -> Self {
        self.nonce = nonce;
        self
    }

    /// Overrides the generated code verifier. The challenge is derived from
    /// it; `None` disables PKCE.
    #[must_use]
    pub fn code_verifier(mut self, code_verifier: Option<String>) -> Self {
        self.code_verifier_challenge = code_verifier
            .as_deref()
            .map(derive_code_verifier_challenge);
        self.code_verifier_challenge_method = code_verifier
            .as_ref()
            .map(|_| code_verifier_challenge_method().as_str().to_string());
        self.code_verifier = code_verifier;
        self
    }

    /// Sets the code verifier together with a precomputed challenge. The
    /// three values must be all present or all absent.
    #[must_use]
    pub fn code_verifier_with_challenge(
        mut self,
        code_verifier: Option<String>,
        challenge: Option<String>,
        challenge_method: Option<String>,
    ) -> Self {
        self.code_verifier = code_verifier;
        self.code_verifier_challenge = challenge;
        self.code_verifier_challenge_method = challenge_method;
        self
    }

    /// Sets the `response_mode` value.
    #[must_use]
    pub fn response_mode(mut self, response_mode: Option<String>) -> Self {
        self.response_mode = response_mode;
        self
    }

    /// Sets the `claims` request object.
    #[must_use]
    pub fn claims(mut self, claims: Option<Value>) -> Self {
        self.claims = claims;
        self
    }

    /// Sets the space-delimited `claims_locales` value.
    #[must_use]
    pub fn claims_locales(mut self, claims_locales: Option<String>) -> Self {
        self.claims_locales = normalize_space_delimited(claims_locales.as_deref());
        self
    }

    /// Sets the `claims_locales` values.
    #[must_use]
    pub fn claims_locales_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.claims_locales = iterable_to_string(values);
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
    /// Returns a [`BuildError`] if:
    /// - `client_id` or `response_type` is empty
    /// - the code verifier is malformed
    /// - the PKCE values are only partially set
    /// - an additional parameter shadows a built-in parameter
    pub fn build(self) -> Result<AuthorizationRequest, BuildError> {
        if self.client_id.is_empty() {
            return Err(BuildError::Empty("client ID"));
        }
        if self.response_type.is_empty() {
            return Err(BuildError::Empty("response type"));
        }

        match (
            &self.code_verifier,
            &self.code_verifier_challenge,
            &self.code_verifier_challenge_method,
        ) {
            (Some(verifier), Some(_), Some(_)) => check_code_verifier(verifier)?,
            (None, None, None) => {}
            (None, _, _) => return Err(BuildError::Missing("code verifier")),
            (Some(_), None, _) => return Err(BuildError::Missing("code verifier challenge")),
            (Some(_), Some(_), None) => {
                return Err(BuildError::Missing("code verifier challenge method"));
            }
        }

        check_additional_params(&self.additional_parameters, &BUILT_IN_PARAMS)?;

        Ok(AuthorizationRequest {
            configuration: self.configuration,
            client_id: self.client_id,
            response_type: self.response_type,
            redirect_uri: self.redirect_uri,
            display: self.display,
            login_hint: self.login_hint,
            prompt: self.prompt,
            ui_locales: self.ui_locales,
            scope: self.scope,
            state: self.state,
            nonce: self.nonce,
            code_verifier: self.code_verifier,
            code_verifier_challenge: self.code_verifier_challenge,
            code_verifier_challenge_method: self.code_verifier_challenge_method,
            response_mode: self.response_mode,
            claims: self.claims,
            claims_locales: self.claims_locales,
            additional_parameters: self.additional_parameters,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::configuration::tests::test_configuration;
    use crate::request::response_types;
    use serde_json::json;

    pub(crate) const TEST_CLIENT_ID: &str = "test_client_id";
    pub(crate) const TEST_REDIRECT_URI: &str = "com.example.app:/oauth2redirect";

    pub(crate) fn test_builder() -> AuthorizationRequestBuilder {
        AuthorizationRequest::builder(
            test_configuration(),
            TEST_CLIENT_ID,
            response_types::CODE,
            Url::parse(TEST_REDIRECT_URI).unwrap(),
        )
    }

    pub(crate) fn test_request() -> AuthorizationRequest {
        test_builder()
            .scopes(["openid", "email"])
            .build()
            .unwrap()
    }

    fn query(uri: &Url) -> Vec<(String, String)> {
        uri.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_defaults_generate_state_nonce_and_pkce() {
        let request = test_builder().build().unwrap();
        assert!(request.state().is_some());
        assert!(request.nonce().is_some());
        assert_ne!(request.state(), request.nonce());
        let verifier = request.code_verifier().unwrap();
        assert_eq!(
            request.code_verifier_challenge(),
            Some(derive_code_verifier_challenge(verifier).as_str())
        );
        assert_eq!(request.code_verifier_challenge_method(), Some("S256"));
    }

    #[test]
    fn test_explicit_none_disables_generated_values() {
        let request = test_builder()
            .state(None)
            .nonce(None)
            .code_verifier(None)
            .build()
            .unwrap();
        assert!(request.state().is_none());
        assert!(request.nonce().is_none());
        assert!(request.code_verifier().is_none());
        assert!(request.code_verifier_challenge().is_none());

        let uri = request.to_uri();
        let keys: Vec<String> = query(&uri).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["redirect_uri", "client_id", "response_type"]);
    }

    #[test]
    fn test_scope_normalization() {
        let request = test_builder()
            .scope(Some("openid  email openid".to_string()))
            .build()
            .unwrap();
        assert_eq!(request.scope(), Some("openid email"));
        assert_eq!(
            request.scope_set().unwrap(),
            vec!["openid".to_string(), "email".to_string()]
        );

        let empty = test_builder().scopes(Vec::<String>::new()).build().unwrap();
        assert!(empty.scope().is_none());
    }

    #[test]
    fn test_prompt_and_locales_normalization() {
        let request = test_builder()
            .prompt_values([prompts::LOGIN, prompts::CONSENT, prompts::LOGIN])
            .ui_locales(Some("fr-CA fr en".to_string()))
            .claims_locales_values(["de", "de"])
            .build()
            .unwrap();
        assert_eq!(request.prompt(), Some("login consent"));
        assert_eq!(request.ui_locales(), Some("fr-CA fr en"));
        assert_eq!(request.claims_locales(), Some("de"));
        assert_eq!(request.prompt_values().unwrap().len(), 2);
    }

    #[test]
    fn test_to_uri_parameter_order() {
        let mut extra = AdditionalParameters::new();
        extra.insert("zeta".into(), "1".into());
        extra.insert("alpha".into(), "2".into());

        let request = test_builder()
            .display(Some(displays::PAGE.to_string()))
            .login_hint(Some("user@example.com".to_string()))
            .prompt(Some("login".to_string()))
            .ui_locales(Some("en".to_string()))
            .state(Some("state123".to_string()))
            .nonce(Some("nonce123".to_string()))
            .scopes(["openid"])
            .response_mode(Some(response_modes::QUERY.to_string()))
            .claims(Some(json!({"id_token": {"email": null}})))
            .claims_locales(Some("en".to_string()))
            .additional_parameters(extra)
            .build()
            .unwrap();

        let uri = request.to_uri();
        assert!(uri.as_str().starts_with("https://auth.example.com/authorize?"));
        let keys: Vec<String> = query(&uri).into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                "redirect_uri",
                "client_id",
                "response_type",
                "display",
                "login_hint",
                "prompt",
                "ui_locales",
                "state",
                "nonce",
                "scope",
                "response_mode",
                "claims",
                "claims_locales",
                "code_challenge",
                "code_challenge_method",
                "zeta",
                "alpha",
            ]
        );

        let pairs = query(&uri);
        assert_eq!(pairs[0].1, TEST_REDIRECT_URI);
        assert_eq!(pairs[11].1, r#"{"id_token":{"email":null}}"#);
    }

    #[test]
    fn test_reserved_additional_parameter_rejected() {
        let mut extra = AdditionalParameters::new();
        extra.insert("state".into(), "x".into());
        let err = test_builder().additional_parameters(extra).build().unwrap_err();
        assert!(matches!(err, BuildError::ReservedParameter(ref k) if k == "state"));
    }

    #[test]
    fn test_empty_client_id_rejected() {
        let err = AuthorizationRequest::builder(
            test_configuration(),
            "",
            response_types::CODE,
            Url::parse(TEST_REDIRECT_URI).unwrap(),
        )
        .build()
        .unwrap_err();
        assert!(matches!(err, BuildError::Empty("client ID")));
    }

    #[test]
    fn test_invalid_code_verifier_rejected() {
        let err = test_builder()
            .code_verifier(Some("too-short".to_string()))
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Pkce(_)));
    }

    #[test]
    fn test_partial_pkce_rejected() {
        let verifier = "a".repeat(43);
        let err = test_builder()
            .code_verifier_with_challenge(Some(verifier.clone()), None, None)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Missing("code verifier challenge")));

        let err = test_builder()
            .code_verifier_with_challenge(None, Some("challenge".to_string()), None)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Missing("code verifier")));

        let ok = test_builder()
            .code_verifier_with_challenge(
                Some(verifier.clone()),
                Some(verifier.clone()),
                Some("plain".to_string()),
            )
            .build()
            .unwrap();
        assert_eq!(ok.code_verifier_challenge_method(), Some("plain"));
    }

    #[test]
    fn test_json_round_trip() {
        let mut extra = AdditionalParameters::new();
        extra.insert("audience".into(), "api".into());
        let request = test_builder()
            .login_hint(Some("user@example.com".to_string()))
            .scopes(["openid", "profile"])
            .claims(Some(json!({"userinfo": {"name": {"essential": true}}})))
            .additional_parameters(extra)
            .build()
            .unwrap();

        let json = request.to_json_string().unwrap();
        let restored = AuthorizationRequest::from_json_str(&json).unwrap();
        assert_eq!(restored, request);
    }

    #[test]
    fn test_json_field_names() {
        let request = test_request();
        let json = request.to_json().unwrap();
        for key in [
            "configuration",
            "clientId",
            "responseType",
            "redirectUri",
            "scope",
            "state",
            "nonce",
            "codeVerifier",
            "codeVerifierChallenge",
            "codeVerifierChallengeMethod",
            "additionalParameters",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(
            json["configuration"]["tokenEndpoint"],
            "https://auth.example.com/token"
        );
    }

    #[test]
    fn test_json_missing_client_id() {
        let mut json = test_request().to_json().unwrap();
        json.as_object_mut().unwrap().remove("clientId");
        assert!(AuthorizationRequest::from_json(&json).is_err());
    }
}
