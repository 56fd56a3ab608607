//! Header and URL builders.
//!
//! An [`Endpoint`](crate::Endpoint) owns one [`HeaderBuilder`] and one
//! [`UrlBuilder`]; every request it creates uses them unless the request
//! replaces one with [`Request::header_builder`](crate::Request::header_builder)
//! or [`Request::url_builder`](crate::Request::url_builder).

use crate::{Error, Result};
use http::{header, HeaderMap, HeaderName, HeaderValue};
use url::Url;

/// Produces the headers sent with a request.
pub trait HeaderBuilder: Send + Sync {
    /// Builds the final header set, given the request's own headers.
    ///
    /// Request headers win over any default with the same name.
    fn build_headers(&self, overrides: &HeaderMap) -> HeaderMap;
}

/// Produces absolute request URLs from a path.
pub trait UrlBuilder: Send + Sync {
    /// Builds the absolute URL for `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` cannot form a valid URL.
    fn build_url(&self, path: &str) -> Result<Url>;
}

/// Merges a fixed set of default headers with per-request overrides.
///
/// # Examples
///
/// ```
/// use outcall::builders::{DefaultHeaderBuilder, HeaderBuilder};
/// use http::HeaderMap;
///
/// let builder = DefaultHeaderBuilder::new();
/// let headers = builder.build_headers(&HeaderMap::new());
/// assert_eq!(headers["accept"], "application/json");
/// ```
#[derive(Debug, Clone)]
pub struct DefaultHeaderBuilder {
    defaults: HeaderMap,
}

impl DefaultHeaderBuilder {
    /// Creates a builder whose only default is `Accept: application/json`.
    pub fn new() -> Self {
        let mut defaults = HeaderMap::new();
        defaults.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );
        Self { defaults }
    }

    /// Creates a builder with exactly the given defaults.
    pub fn with_defaults(defaults: HeaderMap) -> Self {
        Self { defaults }
    }

    /// Adds a default header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.defaults.insert(name, value);
        Ok(self)
    }

    /// The default headers.
    pub fn defaults(&self) -> &HeaderMap {
        &self.defaults
    }
}

impl Default for DefaultHeaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderBuilder for DefaultHeaderBuilder {
    fn build_headers(&self, overrides: &HeaderMap) -> HeaderMap {
        let mut headers = self.defaults.clone();
        // Overrides replace every default value under the same name.
        for name in overrides.keys() {
            headers.remove(name);
        }
        for (name, value) in overrides {
            headers.append(name, value.clone());
        }
        headers
    }
}

/// Appends request paths to a base URL.
///
/// The base URL's own path is kept as a prefix, so a base of
/// `https://api.example.com/v2` and a path of `users/1` give
/// `https://api.example.com/v2/users/1`.
///
/// The path is always treated as a sequence of segments below that prefix.
/// Colons, schemes and hosts inside it are plain text, `.` and `..`
/// segments are dropped, and characters such as `?` and `#` are
/// percent-encoded. Use [`Request::query_param`](crate::Request::query_param)
/// for query strings.
///
/// # Examples
///
/// ```
/// use outcall::builders::{BaseUrlBuilder, UrlBuilder};
///
/// let builder = BaseUrlBuilder::parse("https://example.test").unwrap();
/// let url = builder.build_url("f00").unwrap();
/// assert_eq!(url.as_str(), "https://example.test/f00");
/// ```
#[derive(Debug, Clone)]
pub struct BaseUrlBuilder {
    base_url: Url,
}

impl BaseUrlBuilder {
    /// Creates a builder for an already-parsed base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot carry a path (for example `mailto:`).
    pub fn new(base_url: Url) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            return Err(Error::ConfigurationError(format!(
                "Base URL cannot have paths appended: {}",
                base_url
            )));
        }
        Ok(Self { base_url })
    }

    /// Parses and validates a base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or cannot carry a path.
    pub fn parse(base_url: impl AsRef<str>) -> Result<Self> {
        Self::new(Url::parse(base_url.as_ref())?)
    }

    /// The base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl UrlBuilder for BaseUrlBuilder {
    fn build_url(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::ConfigurationError(format!(
                    "Base URL cannot have paths appended: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(
                path.split('/')
                    .filter(|segment| !matches!(*segment, "" | "." | "..")),
            );
        Ok(url)
    }
}

pub(crate) fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::try_from(name)
        .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
    let value = HeaderValue::try_from(value)
        .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
    Ok((name, value))
}
