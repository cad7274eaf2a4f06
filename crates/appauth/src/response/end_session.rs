//! Post-logout redirect.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::{param, redirect_error, redirect_params, verify_state};
use crate::error::{AuthorizationError, ParseError};
use crate::request::EndSessionRequest;

/// The result of an RP-initiated logout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndSessionResponse {
    request: EndSessionRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<String>,
}

impl EndSessionResponse {
    /// Creates a response carrying `state`.
    #[must_use]
    pub fn new(request: EndSessionRequest, state: Option<String>) -> Self {
        Self { request, state }
    }

    /// Parses the post-logout redirect and checks its `state`.
    ///
    /// # Errors
    ///
    /// Returns the server's OAuth error if the redirect carries one, or
    /// `STATE_MISMATCH`.
    pub fn from_redirect_uri(
        request: EndSessionRequest,
        uri: &Url,
    ) -> Result<Self, AuthorizationError> {
        let params = redirect_params(uri);
        if let Some(err) = redirect_error(&params) {
            return Err(err);
        }
        let state = param(&params, "state").map(String::from);
        verify_state(request.state(), state.as_deref())?;
        Ok(Self::new(request, state))
    }

    /// The request this responds to.
    #[must_use]
    pub fn request(&self) -> &EndSessionRequest {
        &self.request
    }

    /// Returned `state`.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
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
    /// Returns a [`ParseError`] if the embedded request is invalid.
    pub fn from_json(json: &Value) -> Result<Self, ParseError> {
        let request = json
            .get("request")
            .ok_or_else(|| ParseError::missing("request"))?;
        let request = EndSessionRequest::from_json(request)?;
        let state = crate::params::get_string(
            json.as_object()
                .ok_or_else(|| ParseError::invalid("document", "expected a JSON object"))?,
            "state",
        )?;
        Ok(Self::new(request, state))
    }

    /// Restores a response from a JSON string.
    ///
    /// # Errors
    ///
    /// As [`Self::from_json`].
    pub fn from_json_str(json: &str) -> Result<Self, ParseError> {
        Self::from_json(&serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeneralError;
    use crate::request::end_session::tests::test_end_session_request;

    #[test]
    fn test_matching_state() {
        let request = test_end_session_request();
        let state = request.state().unwrap().to_string();
        let uri = Url::parse(&format!("com.example.app:/logout?state={state}")).unwrap();
        let response = EndSessionResponse::from_redirect_uri(request, &uri).unwrap();
        assert_eq!(response.state(), Some(state.as_str()));
    }

    #[test]
    fn test_mismatched_state() {
        let request = test_end_session_request();
        let uri = Url::parse("com.example.app:/logout?state=other").unwrap();
        let err = EndSessionResponse::from_redirect_uri(request, &uri).unwrap_err();
        assert_eq!(err, AuthorizationError::from(GeneralError::StateMismatch));
    }

    #[test]
    fn test_json_round_trip() {
        let request = test_end_session_request();
        let state = request.state().map(String::from);
        let response = EndSessionResponse::new(request, state);
        let restored = EndSessionResponse::from_json_str(&response.to_json_string().unwrap()).unwrap();
        assert_eq!(restored, response);
    }

    #[test]
    fn test_json_requires_end_session_endpoint() {
        let response = EndSessionResponse::new(test_end_session_request(), None);
        let mut json = response.to_json().unwrap();
        json["request"]["configuration"]
            .as_object_mut()
            .unwrap()
            .remove("endSessionEndpoint");
        let err = EndSessionResponse::from_json(&json).unwrap_err();
        assert_eq!(err.missing_field(), Some("endSessionEndpoint"));
    }
}
