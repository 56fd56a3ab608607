//! The transport seam: the collaborator that actually moves bytes.
//!
//! Requests never talk to the network directly. They hand a
//! [`TransportRequest`] to a [`Transport`] and get back either a
//! [`TransportResponse`] (any status code) or a [`TransportError`].
//! [`ReqwestTransport`] is the default implementation.
//!
//! Cancellation is expressed by dropping the future returned from
//! [`Transport::send`]; implementations must not assume they run to
//! completion.

use crate::multipart::MultipartForm;
use async_trait::async_trait;
use http::{header, HeaderMap, Method, StatusCode};
use std::time::Duration;
use url::Url;

/// A fully built request, ready to be sent.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: Method,

    /// The absolute URL, including query parameters.
    pub url: Url,

    /// The final header set.
    pub headers: HeaderMap,

    /// The request body, if any.
    pub body: Option<RequestBody>,

    /// Per-request timeout, if any.
    pub timeout: Option<Duration>,
}

/// The body of a [`TransportRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Serialized bytes, sent as-is with the request's `Content-Type`.
    Bytes(Vec<u8>),

    /// A `multipart/form-data` upload. The transport chooses the boundary
    /// and sets `Content-Type` itself.
    Multipart(MultipartForm),
}

/// What came back from the server, whatever the status code.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// The HTTP status code.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The response body as text.
    pub body: String,
}

/// A failure inside the transport, before a complete response was read.
///
/// Carried to the caller unchanged. [`TransportError::Body`] also keeps the
/// status line and headers that arrived before the failure.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request timed out before a response arrived.
    #[error("Request timed out")]
    Timeout,

    /// The response head arrived but its body could not be read.
    #[error("Failed to read body of {status} response: {source}")]
    Body {
        /// The status code of the partial response.
        status: StatusCode,
        /// The headers of the partial response.
        headers: HeaderMap,
        /// Why reading the body failed.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A failure from a custom transport.
    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Wraps any error from a custom transport.
    pub fn other(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        TransportError::Other(err.into())
    }

    /// The status code, if a response head arrived before the failure.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::Body { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The response headers, if a response head arrived before the failure.
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            TransportError::Body { headers, .. } => Some(headers),
            _ => None,
        }
    }
}

/// Sends requests on behalf of an [`Endpoint`](crate::Endpoint).
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use outcall::transport::{Transport, TransportError, TransportRequest, TransportResponse};
/// use http::{HeaderMap, StatusCode};
///
/// /// Answers every request with `204 No Content`.
/// struct NoContent;
///
/// #[async_trait]
/// impl Transport for NoContent {
///     async fn send(&self, _request: TransportRequest) -> Result<TransportResponse, TransportError> {
///         Ok(TransportResponse {
///             status: StatusCode::NO_CONTENT,
///             headers: HeaderMap::new(),
///             body: String::new(),
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and waits for the complete response.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// The default transport, backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a default `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> crate::Result<Self> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            crate::Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(Self { client })
    }

    /// Wraps an existing `reqwest::Client`.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let TransportRequest {
            method,
            url,
            mut headers,
            body,
            timeout,
        } = request;

        if matches!(body, Some(RequestBody::Multipart(_))) {
            headers.remove(header::CONTENT_TYPE);
        }

        let mut builder = self.client.request(method, url).headers(headers);

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        match body {
            Some(RequestBody::Bytes(bytes)) => builder = builder.body(bytes),
            Some(RequestBody::Multipart(form)) => builder = builder.multipart(form.into_reqwest()?),
            None => {}
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                return Err(TransportError::Body {
                    status,
                    headers,
                    source: Box::new(err),
                })
            }
        };

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_failure_keeps_response_head() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", "r-1".parse().unwrap());
        let err = TransportError::Body {
            status: StatusCode::OK,
            headers,
            source: "connection reset".into(),
        };

        assert_eq!(err.status(), Some(StatusCode::OK));
        assert_eq!(err.headers().unwrap()["x-request-id"], "r-1");
        assert!(err.to_string().contains("connection reset"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_failures_before_response_have_no_head() {
        assert_eq!(TransportError::Timeout.status(), None);
        assert!(TransportError::other("refused").headers().is_none());
    }
}
