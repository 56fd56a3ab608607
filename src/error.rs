//! Error types for endpoint requests.
//!
//! [`Error`] is the crate-wide cause taxonomy. [`ApiError`] is what a failed
//! request delivers to its caller: an optional error model decoded from the
//! response body, plus the underlying cause, which is never dropped.

use crate::transport::TransportError;
use http::{HeaderMap, StatusCode};
use std::fmt;

/// The cause of a failed request, or of a configuration step that was rejected.
///
/// # Examples
///
/// ```
/// use outcall::Error;
/// use http::StatusCode;
///
/// let err = Error::HttpStatus { status: StatusCode::NOT_FOUND };
/// assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
/// assert!(!err.is_transport());
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The transport collaborator failed before a response was received.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status code.
    #[error("HTTP error {status}")]
    HttpStatus {
        /// The HTTP status code
        status: StatusCode,
    },

    /// A 2xx response body could not be turned into the success model.
    ///
    /// # Fields
    ///
    /// * `raw_response` - The raw response body as a string
    /// * `parse_error` - What the model parser rejected
    /// * `status` - The HTTP status code of the response
    #[error("Failed to parse response (status {status}): {parse_error}")]
    Parse {
        /// The raw response body that failed to parse
        raw_response: String,
        /// The parser's error
        parse_error: ParseError,
        /// The HTTP status code
        status: StatusCode,
    },

    /// Invalid configuration was provided.
    ///
    /// Raised while building an endpoint or configuring a request, never
    /// while a request is in flight.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Stubbing is enabled on a request that was given nothing to return.
    #[error("Stub configuration error: {0}")]
    StubConfiguration(String),

    /// A stub fixture was found but its content did not produce a model.
    #[error("Fixture {name} did not produce a model: {parse_error}")]
    MalformedFixture {
        /// The fixture name
        name: String,
        /// Why decoding failed
        parse_error: ParseError,
    },

    /// A stub fixture does not exist at the given location.
    #[error("Fixture {name} not found in {location}")]
    FixtureNotFound {
        /// The fixture name
        name: String,
        /// Where the loader looked
        location: String,
    },

    /// Reading a fixture failed for a reason other than absence.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `perform` or `send` was called on a request that already ran.
    #[error("Request has already been performed")]
    AlreadyPerformed,

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// The error was supplied literally by a stub.
    #[error("Stubbed error response")]
    Stubbed,
}

impl Error {
    /// Returns `true` if the transport collaborator produced this error.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Returns `true` for errors caused by how a request was set up rather
    /// than by anything the server did.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::ConfigurationError(_)
                | Error::InvalidUrl(_)
                | Error::StubConfiguration(_)
                | Error::FixtureNotFound { .. }
                | Error::AlreadyPerformed
                | Error::SerializationFailed(_)
        )
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpStatus { status } => Some(*status),
            Error::Parse { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A model parser rejected a payload.
///
/// Returned by [`ModelParser::parse`](crate::ModelParser::parse) when the
/// payload's shape does not match the model: a missing field, a wrong type,
/// or a body that is not JSON at all.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    message: String,
}

impl ParseError {
    /// Creates a parse error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The parser's message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// The failure envelope delivered for a request.
///
/// `error_model` holds the error payload decoded with the request's error
/// parser, when there was a payload and it decoded. `cause` always holds
/// the underlying reason, so a transport failure is still visible when the
/// error body could not be parsed.
///
/// # Examples
///
/// ```
/// use outcall::{ApiError, Error};
///
/// let err = ApiError::from_model(5);
/// assert_eq!(err.error_model, Some(5));
/// assert!(matches!(err.cause, Error::Stubbed));
/// ```
#[derive(Debug)]
pub struct ApiError<E> {
    /// The decoded error model, if any.
    pub error_model: Option<E>,

    /// The HTTP status code, when a response was received.
    pub status: Option<StatusCode>,

    /// The response headers. Empty when no response was received.
    pub headers: HeaderMap,

    /// The raw response body, when a response was received.
    pub raw_body: Option<String>,

    /// The underlying cause.
    pub cause: Error,
}

impl<E> ApiError<E> {
    /// Creates an error envelope around a cause, with no response attached.
    pub fn new(cause: Error) -> Self {
        Self {
            error_model: None,
            status: cause.status(),
            headers: HeaderMap::new(),
            raw_body: None,
            cause,
        }
    }

    /// Creates a literal error carrying the given model, as a stub would
    /// return it.
    pub fn from_model(model: E) -> Self {
        Self {
            error_model: Some(model),
            ..Self::new(Error::Stubbed)
        }
    }

    /// Attaches the status, headers, and body of the response that failed.
    pub fn with_response(
        mut self,
        status: StatusCode,
        headers: HeaderMap,
        raw_body: impl Into<String>,
    ) -> Self {
        self.status = Some(status);
        self.headers = headers;
        self.raw_body = Some(raw_body.into());
        self
    }

    /// Returns the HTTP status code if a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns the raw response body if a response was received.
    pub fn raw_response(&self) -> Option<&str> {
        self.raw_body.as_deref()
    }

    /// Returns `true` if the transport failed before any response arrived.
    pub fn is_transport(&self) -> bool {
        self.cause.is_transport()
    }

    /// Maps the error model to a different type, keeping everything else.
    pub fn map_model<U, F>(self, f: F) -> ApiError<U>
    where
        F: FnOnce(E) -> U,
    {
        ApiError {
            error_model: self.error_model.map(f),
            status: self.status,
            headers: self.headers,
            raw_body: self.raw_body,
            cause: self.cause,
        }
    }
}

impl<E> From<Error> for ApiError<E> {
    fn from(cause: Error) -> Self {
        Self::new(cause)
    }
}

impl<E: fmt::Debug> fmt::Display for ApiError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_model {
            Some(model) => write!(f, "API error ({}): {:?}", self.cause, model),
            None => write!(f, "API error ({})", self.cause),
        }
    }
}

impl<E: fmt::Debug> std::error::Error for ApiError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// A specialized `Result` type for configuration and setup steps.
///
/// This is a convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
