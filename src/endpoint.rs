//! The root object for one API.
//!
//! An [`Endpoint`] binds a base URL, default builders, endpoint-wide plugins,
//! and a transport. Use [`EndpointBuilder`] to configure one, then create a
//! [`Request`] per call site with [`Endpoint::request`].

use crate::builders::{BaseUrlBuilder, DefaultHeaderBuilder, HeaderBuilder, UrlBuilder};
use crate::multipart::MultipartForm;
use crate::parser::{JsonParser, ModelParser};
use crate::plugin::Plugin;
use crate::request::Request;
use crate::transport::{ReqwestTransport, Transport};
use crate::{Error, Result};
use http::Method;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// A provider of requests for a single API.
///
/// Cloning is cheap; clones share configuration. Requests keep what they need
/// from the endpoint, so an endpoint may be dropped while its requests are
/// still in flight.
///
/// # Examples
///
/// ```no_run
/// use outcall::{Endpoint, NetworkActivity, NetworkActivityPlugin};
/// use serde::Deserialize;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// #[derive(Debug, Deserialize)]
/// struct ServiceError {
///     message: String,
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let activity = NetworkActivity::new();
/// let endpoint = Endpoint::builder()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(30))
///     .plugin(Arc::new(NetworkActivityPlugin::new(activity.clone())))
///     .build()?;
///
/// let user = endpoint.request::<User, ServiceError>("users/123")?.send().await?;
/// println!("User: {}", user.data.name);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Endpoint {
    inner: Arc<EndpointInner>,
}

pub(crate) struct EndpointInner {
    pub(crate) url_builder: Arc<dyn UrlBuilder>,
    pub(crate) header_builder: Arc<dyn HeaderBuilder>,
    pub(crate) plugins: Arc<[Arc<dyn Plugin>]>,
    pub(crate) stubbing_enabled: bool,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) timeout: Option<Duration>,
}

impl Endpoint {
    /// Creates a new `EndpointBuilder` for configuring an endpoint.
    pub fn builder() -> EndpointBuilder {
        EndpointBuilder::new()
    }

    /// Creates an endpoint for `base_url` with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::builder().base_url(base_url)?.build()
    }

    /// Creates a request for `path`, parsing both payloads with `serde`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` does not form a valid URL with the base URL.
    pub fn request<M, E>(&self, path: impl Into<String>) -> Result<Request<M, E>>
    where
        M: DeserializeOwned + Send + 'static,
        E: DeserializeOwned + Send + 'static,
    {
        self.request_with_parsers(path, JsonParser::<M>::new(), JsonParser::<E>::new())
    }

    /// Creates a request for `path` with explicit model parsers.
    ///
    /// Use this for models that do not implement `Deserialize`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` does not form a valid URL with the base URL.
    pub fn request_with_parsers<M, E>(
        &self,
        path: impl Into<String>,
        success_parser: impl ModelParser<M> + 'static,
        error_parser: impl ModelParser<E> + 'static,
    ) -> Result<Request<M, E>>
    where
        M: Send + 'static,
        E: Send + 'static,
    {
        Request::new(
            self,
            path.into(),
            Arc::new(success_parser),
            Arc::new(error_parser),
        )
    }

    /// Creates a `POST` request for `path` with an empty multipart body.
    ///
    /// Add fields with [`Request::text_part`] and [`Request::file_part`].
    /// Stubbing works exactly as for any other request.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` does not form a valid URL with the base URL.
    pub fn multipart_request<M, E>(&self, path: impl Into<String>) -> Result<Request<M, E>>
    where
        M: DeserializeOwned + Send + 'static,
        E: DeserializeOwned + Send + 'static,
    {
        Ok(self
            .request(path)?
            .method(Method::POST)
            .multipart(MultipartForm::new()))
    }

    /// Whether new requests start with stubbing enabled.
    pub fn is_stubbing_enabled(&self) -> bool {
        self.inner.stubbing_enabled
    }

    /// The number of endpoint-wide plugins.
    pub fn plugin_count(&self) -> usize {
        self.inner.plugins.len()
    }

    pub(crate) fn inner(&self) -> &EndpointInner {
        &self.inner
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("plugins", &self.inner.plugins.len())
            .field("stubbing_enabled", &self.inner.stubbing_enabled)
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for configuring and creating an [`Endpoint`].
///
/// # Examples
///
/// ```
/// use outcall::EndpointBuilder;
/// use std::time::Duration;
///
/// let endpoint = EndpointBuilder::new()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(30))
///     .default_header("User-Agent", "my-app/1.0")?
///     .build()?;
/// assert!(!endpoint.is_stubbing_enabled());
/// # Ok::<(), outcall::Error>(())
/// ```
pub struct EndpointBuilder {
    base_url: Option<Url>,
    url_builder: Option<Arc<dyn UrlBuilder>>,
    default_headers: DefaultHeaderBuilder,
    header_builder: Option<Arc<dyn HeaderBuilder>>,
    plugins: Vec<Arc<dyn Plugin>>,
    stubbing_enabled: bool,
    transport: Option<Arc<dyn Transport>>,
    timeout: Option<Duration>,
}

impl EndpointBuilder {
    /// Creates a new `EndpointBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            url_builder: None,
            default_headers: DefaultHeaderBuilder::new(),
            header_builder: None,
            plugins: Vec::new(),
            stubbing_enabled: false,
            transport: None,
            timeout: None,
        }
    }

    /// Sets the base URL that request paths are appended to.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Replaces the default URL builder. A base URL is then optional.
    pub fn url_builder(mut self, builder: Arc<dyn UrlBuilder>) -> Self {
        self.url_builder = Some(builder);
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// Ignored if a custom header builder is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        self.default_headers = self.default_headers.default_header(name, value)?;
        Ok(self)
    }

    /// Replaces the default header builder.
    pub fn header_builder(mut self, builder: Arc<dyn HeaderBuilder>) -> Self {
        self.header_builder = Some(builder);
        self
    }

    /// Adds an endpoint-wide plugin. Plugins run in the order they are added.
    pub fn plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Adds several endpoint-wide plugins.
    pub fn plugins(mut self, plugins: impl IntoIterator<Item = Arc<dyn Plugin>>) -> Self {
        self.plugins.extend(plugins);
        self
    }

    /// Sets whether new requests start with stubbing enabled.
    pub fn stubbing_enabled(mut self, enabled: bool) -> Self {
        self.stubbing_enabled = enabled;
        self
    }

    /// Replaces the default `reqwest` transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the default request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the configured `Endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if neither a base URL nor a URL builder was provided,
    /// if the base URL cannot have paths appended, or if the default
    /// transport cannot be created.
    pub fn build(self) -> Result<Endpoint> {
        let url_builder: Arc<dyn UrlBuilder> = match (self.url_builder, self.base_url) {
            (Some(builder), _) => builder,
            (None, Some(base_url)) => Arc::new(BaseUrlBuilder::new(base_url)?),
            (None, None) => {
                return Err(Error::ConfigurationError(
                    "Base URL is required".to_string(),
                ))
            }
        };

        let header_builder = self
            .header_builder
            .unwrap_or_else(|| Arc::new(self.default_headers));

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        tracing::debug!(
            plugins = self.plugins.len(),
            stubbing_enabled = self.stubbing_enabled,
            "Endpoint configured"
        );

        Ok(Endpoint {
            inner: Arc::new(EndpointInner {
                url_builder,
                header_builder,
                plugins: self.plugins.into(),
                stubbing_enabled: self.stubbing_enabled,
                transport,
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for EndpointBuilder {
    fn default() -> Self {
        Self::new()
    }
}
