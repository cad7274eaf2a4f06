//! HTTP transport used by [`AuthorizationService`](crate::AuthorizationService).
//!
//! The service only needs to send a request and read a status and a text
//! body, so the transport is a small trait. [`ReqwestTransport`] is the
//! default implementation; tests substitute their own.

use std::fmt;

use async_trait::async_trait;
use url::Url;

use crate::config::AppAuthConfig;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method.
    pub method: HttpMethod,
    /// Target URL.
    pub url: Url,
    /// Headers in insertion order.
    pub headers: Vec<(String, String)>,
    /// Body, if any.
    pub body: Option<String>,
}

impl HttpRequest {
    /// A `GET` request accepting JSON.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            body: None,
        }
    }

    /// A `POST` request with `body` of the given content type, accepting JSON.
    #[must_use]
    pub fn post(url: Url, content_type: &str, body: String) -> Self {
        Self {
            method: HttpMethod::Post,
            url,
            headers: vec![
                ("Content-Type".to_string(), content_type.to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ],
            body: Some(body),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Looks up a header by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Body decoded as UTF-8.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport failures. Any of these becomes a `NETWORK_ERROR`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The exchange failed before a complete response was received.
    #[error("Network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The response body exceeded the configured limit.
    #[error("Response too large (max {max_size} bytes)")]
    ResponseTooLarge {
        /// The configured limit in bytes.
        max_size: usize,
    },
}

impl TransportError {
    /// Wraps any error as a network failure.
    #[must_use]
    pub fn network<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Network(err.into())
    }
}

/// Sends HTTP requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Executes `request` and returns the response, whatever its status.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for std::sync::Arc<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request).await
    }
}

// =============================================================================
// reqwest
// =============================================================================

/// [`HttpTransport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    max_response_size: usize,
}

impl ReqwestTransport {
    /// Creates a transport honouring the timeout and size limit in `config`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Network` if the TLS backend cannot be
    /// initialized.
    pub fn new(config: &AppAuthConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(TransportError::network)?;
        Ok(Self::with_client(client, config.max_response_size))
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, max_response_size: usize) -> Self {
        Self {
            client,
            max_response_size,
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        tracing::debug!(method = %request.method, url = %request.url, "Sending request");

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(request.url.clone()),
            HttpMethod::Post => self.client.post(request.url.clone()),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let mut response = builder.send().await.map_err(|e| {
            tracing::warn!("Request to {} failed: {}", request.url, e);
            TransportError::network(e)
        })?;

        if let Some(len) = response.content_length()
            && len > self.max_response_size as u64
        {
            return Err(TransportError::ResponseTooLarge {
                max_size: self.max_response_size,
            });
        }

        let status = response.status().as_u16();
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(TransportError::network)? {
            if body.len() + chunk.len() > self.max_response_size {
                return Err(TransportError::ResponseTooLarge {
                    max_size: self.max_response_size,
                });
            }
            body.extend_from_slice(&chunk);
        }

        let body = String::from_utf8(body).map_err(TransportError::network)?;
        tracing::debug!(status, url = %request.url, "Received response");
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_headers() {
        let request = HttpRequest::post(
            Url::parse("https://auth.example.com/token").unwrap(),
            "application/x-www-form-urlencoded",
            "a=b".to_string(),
        )
        .with_header("Authorization", "Basic abc");

        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(
            request.header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(request.header("Accept"), Some("application/json"));
        assert_eq!(request.header("authorization"), Some("Basic abc"));
    }

    #[test]
    fn test_success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(302, "").is_success());
        assert!(!HttpResponse::new(400, "").is_success());
    }

    #[test]
    fn test_reqwest_transport_from_config() {
        let config = AppAuthConfig::default().with_max_response_size(10);
        let transport = ReqwestTransport::new(&config).unwrap();
        assert_eq!(transport.max_response_size, 10);
    }
}
