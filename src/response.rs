//! The success envelope handed to `on_success`.
//!
//! A [`Response`] carries the parsed model and whatever the exchange left
//! behind: the raw body, status, headers and latency. Stubbed responses fill
//! these with neutral values and set the `stubbed` flag.

use http::header::AsHeaderName;
use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A successful outcome of a request.
///
/// ```no_run
/// use outcall::Endpoint;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let endpoint = Endpoint::new("https://api.example.com")?;
/// let response = endpoint.request::<User, serde_json::Value>("users/123")?.send().await?;
///
/// println!("User: {}", response.data.name);
/// println!("Request took {:?}", response.latency);
/// println!("Status: {}", response.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<M> {
    /// The parsed success model.
    pub data: M,

    /// The body the model was parsed from. Empty for stubs.
    pub raw_body: String,

    /// A 2xx status. Stubs report `200 OK`.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from dispatch until the response arrived. Zero for stubs.
    pub latency: Duration,

    /// Whether a stub produced this response.
    pub stubbed: bool,
}

impl<M> Response<M> {
    /// Wraps a model parsed from a network response.
    pub fn new(
        data: M,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
            stubbed: false,
        }
    }

    /// Wraps a model supplied by a stub.
    ///
    /// ```
    /// # use outcall::Response;
    /// let response = Response::stubbed(5);
    /// assert_eq!(*response, 5);
    /// assert!(response.stubbed);
    /// assert_eq!(response.status.as_u16(), 200);
    /// ```
    pub fn stubbed(data: M) -> Self {
        Self {
            data,
            raw_body: String::new(),
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            latency: Duration::ZERO,
            stubbed: true,
        }
    }

    /// Converts the model, keeping the exchange details.
    ///
    /// ```
    /// # use outcall::Response;
    /// let ids = Response::stubbed(vec![3, 1, 2]).map(|mut ids| {
    ///     ids.sort();
    ///     ids
    /// });
    /// assert_eq!(ids.data, [1, 2, 3]);
    /// assert!(ids.stubbed);
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(M) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            stubbed: self.stubbed,
        }
    }

    /// Consumes the response and returns the model.
    pub fn into_data(self) -> M {
        self.data
    }

    /// The value of header `name`, if present and valid UTF-8.
    ///
    /// Stubbed responses have no headers.
    ///
    /// ```
    /// # use outcall::Response;
    /// # use http::{header, HeaderMap, HeaderValue, StatusCode};
    /// # use std::time::Duration;
    /// let mut headers = HeaderMap::new();
    /// headers.insert(header::ETAG, HeaderValue::from_static("\"v7\""));
    /// let response = Response::new((), String::new(), StatusCode::OK, headers, Duration::ZERO);
    ///
    /// assert_eq!(response.header(header::ETAG), Some("\"v7\""));
    /// assert_eq!(response.header("etag"), Some("\"v7\""));
    /// assert_eq!(Response::stubbed(()).header("etag"), None);
    /// ```
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl<M> AsRef<M> for Response<M> {
    fn as_ref(&self) -> &M {
        &self.data
    }
}

impl<M> std::ops::Deref for Response<M> {
    type Target = M;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
