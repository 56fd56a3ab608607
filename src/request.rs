//! Single-use, typed requests.
//!
//! A [`Request`] is created by an [`Endpoint`](crate::Endpoint), configured by
//! the caller, and then run exactly once with [`Request::perform`] or
//! [`Request::send`]. It is generic over two unrelated model types: `M` for
//! the success payload and `E` for the error payload.
//!
//! # Stubbed and real requests complete differently
//!
//! A stubbed request is answered on the caller's thread: its callback has
//! already run when `perform` returns. A real request runs on the Tokio
//! runtime and its callback runs later, on a worker thread. Code that mixes
//! the two must not assume any completion order.

use crate::builders::{parse_header, HeaderBuilder, UrlBuilder};
use crate::endpoint::Endpoint;
use crate::error::{ApiError, Error, Result};
use crate::fixture::FixtureLoader;
use crate::multipart::MultipartForm;
use crate::parser::{decode_body, ModelParser};
use crate::plugin::{Plugin, PluginChain, RawOutcome, RequestDescriptor};
use crate::stub::Stub;
use crate::transport::{
    RequestBody, Transport, TransportError, TransportRequest, TransportResponse,
};
use crate::Response;
use http::{header, HeaderMap, HeaderValue, Method};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::AbortHandle;
use url::Url;

const IDLE: u8 = 0;
const IN_FLIGHT: u8 = 1;
const COMPLETED: u8 = 2;

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Configured but not yet performed.
    Idle,
    /// Performed; the outcome has not been delivered yet.
    InFlight,
    /// The outcome was delivered, or the operation was cancelled.
    Completed,
}

/// A configured call to one path of an endpoint.
///
/// # Type Parameters
///
/// * `M` - The model parsed from a 2xx response
/// * `E` - The model parsed from an error response
///
/// # Examples
///
/// ```
/// use outcall::Endpoint;
///
/// let endpoint = Endpoint::new("https://example.test").unwrap();
/// let request = endpoint
///     .request::<u32, u32>("f00")
///     .unwrap()
///     .stubbing_enabled(true)
///     .stub_model(5);
///
/// request.perform(
///     |response| assert_eq!(response.data, 5),
///     |error| panic!("unexpected failure: {}", error),
/// );
/// ```
pub struct Request<M, E> {
    path: String,
    url: Url,
    method: Method,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<RequestBody>,
    timeout: Option<Duration>,
    header_builder: Arc<dyn HeaderBuilder>,
    transport: Arc<dyn Transport>,
    plugins: PluginChain,
    stubbing_enabled: bool,
    stub: Mutex<Stub<M, E>>,
    success_parser: Arc<dyn ModelParser<M>>,
    error_parser: Arc<dyn ModelParser<E>>,
    state: Arc<AtomicU8>,
}

impl<M, E> Request<M, E>
where
    M: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn new(
        endpoint: &Endpoint,
        path: String,
        success_parser: Arc<dyn ModelParser<M>>,
        error_parser: Arc<dyn ModelParser<E>>,
    ) -> Result<Self> {
        let inner = endpoint.inner();
        let url = inner.url_builder.build_url(&path)?;

        Ok(Self {
            path,
            url,
            method: Method::GET,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            timeout: inner.timeout,
            header_builder: inner.header_builder.clone(),
            transport: inner.transport.clone(),
            plugins: PluginChain::new(inner.plugins.clone()),
            stubbing_enabled: inner.stubbing_enabled,
            stub: Mutex::new(Stub::Unset),
            success_parser,
            error_parser,
            state: Arc::new(AtomicU8::new(IDLE)),
        })
    }

    /// Sets the HTTP method. Defaults to `GET`.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Adds a header to this request. It replaces any default with the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds a query parameter.
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Serializes `body` as the JSON request body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized.
    pub fn json_body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let bytes =
            serde_json::to_vec(body).map_err(|e| Error::SerializationFailed(e.to_string()))?;
        self.headers
            .entry(header::CONTENT_TYPE)
            .or_insert(HeaderValue::from_static("application/json"));
        self.body = Some(RequestBody::Bytes(bytes));
        Ok(self)
    }

    /// Sends `form` as a `multipart/form-data` body, replacing any other body.
    ///
    /// The transport sets `Content-Type`, including the boundary.
    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.headers.remove(header::CONTENT_TYPE);
        self.body = Some(RequestBody::Multipart(form));
        self
    }

    /// Adds a text field to the multipart body, starting one if needed.
    pub fn text_part(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let form = self.multipart_form().text(name, value);
        self.multipart(form)
    }

    /// Adds a file field to the multipart body, starting one if needed.
    pub fn file_part(
        self,
        name: impl Into<String>,
        data: impl Into<Vec<u8>>,
        file_name: impl Into<String>,
        mime: Option<&str>,
    ) -> Self {
        let form = self
            .multipart_form()
            .file_bytes(name, data, file_name, mime);
        self.multipart(form)
    }

    /// The multipart body, if this request has one.
    pub fn multipart_body(&self) -> Option<&MultipartForm> {
        match &self.body {
            Some(RequestBody::Multipart(form)) => Some(form),
            _ => None,
        }
    }

    fn multipart_form(&self) -> MultipartForm {
        self.multipart_body().cloned().unwrap_or_default()
    }

    /// Sets the timeout for this request, replacing the endpoint's.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Adds a plugin that observes only this request.
    ///
    /// Request plugins run after the endpoint's plugins.
    pub fn plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push_local(plugin);
        self
    }

    /// Replaces the endpoint's header builder for this request.
    pub fn header_builder(mut self, builder: Arc<dyn HeaderBuilder>) -> Self {
        self.header_builder = builder;
        self
    }

    /// Rebuilds this request's URL with `builder` instead of the endpoint's.
    ///
    /// # Errors
    ///
    /// Returns an error if `builder` cannot form a URL for this request's path.
    pub fn url_builder(mut self, builder: Arc<dyn UrlBuilder>) -> Result<Self> {
        self.url = builder.build_url(&self.path)?;
        Ok(self)
    }

    /// Replaces the parser used for 2xx payloads.
    pub fn success_parser(mut self, parser: impl ModelParser<M> + 'static) -> Self {
        self.success_parser = Arc::new(parser);
        self
    }

    /// Replaces the parser used for error payloads.
    pub fn error_parser(mut self, parser: impl ModelParser<E> + 'static) -> Self {
        self.error_parser = Arc::new(parser);
        self
    }

    /// Turns stubbing on or off. Defaults to the endpoint's setting.
    pub fn stubbing_enabled(mut self, enabled: bool) -> Self {
        self.stubbing_enabled = enabled;
        self
    }

    /// Sets what a stubbed perform returns.
    pub fn stub(self, stub: Stub<M, E>) -> Self {
        *self.stub.lock().unwrap_or_else(PoisonError::into_inner) = stub;
        self
    }

    /// Stubs a successful outcome with `model`.
    pub fn stub_model(self, model: M) -> Self {
        self.stub(Stub::Model(model))
    }

    /// Stubs a failed outcome with `error`.
    pub fn stub_error(self, error: ApiError<E>) -> Self {
        self.stub(Stub::Error(error))
    }

    /// Stubs a successful outcome with the model in the fixture `name`.
    ///
    /// The fixture is loaded and decoded when the request is performed.
    pub fn stub_fixture(self, name: impl Into<String>, loader: Arc<dyn FixtureLoader>) -> Self {
        self.stub(Stub::fixture(name, loader))
    }

    /// The model the current stub would succeed with.
    ///
    /// Fixtures are decoded now, with this request's success parser; a
    /// fixture whose content does not produce a model gives `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if a fixture cannot be found or read.
    pub fn stubbed_model(&self) -> Result<Option<M>>
    where
        M: Clone,
    {
        self.stub
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .model(self.success_parser.as_ref())
    }

    /// The path this request was created with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The absolute URL, without query parameters.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Whether performing this request uses its stub.
    pub fn is_stubbing_enabled(&self) -> bool {
        self.stubbing_enabled
    }

    /// Where this request is in its lifecycle.
    pub fn state(&self) -> RequestState {
        match self.state.load(Ordering::Acquire) {
            IDLE => RequestState::Idle,
            IN_FLIGHT => RequestState::InFlight,
            _ => RequestState::Completed,
        }
    }

    /// Describes the request as plugins will see it.
    pub fn descriptor(&self) -> RequestDescriptor {
        let mut url = self.url.clone();
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
        }

        RequestDescriptor {
            method: self.method.clone(),
            path: self.path.clone(),
            url,
            headers: self.header_builder.build_headers(&self.headers),
            stubbed: self.stubbing_enabled,
        }
    }

    /// Runs the request and delivers its outcome to exactly one callback.
    ///
    /// With stubbing enabled the callback runs before this method returns and
    /// the returned token has nothing left to cancel. Otherwise the request is
    /// spawned on the current Tokio runtime; calling this outside a runtime
    /// fails through `on_failure`.
    ///
    /// A request can be performed once. Later calls invoke `on_failure`
    /// immediately with [`Error::AlreadyPerformed`] and fire no plugins.
    pub fn perform<S, F>(&self, on_success: S, on_failure: F) -> RequestToken
    where
        S: FnOnce(Response<M>) + Send + 'static,
        F: FnOnce(ApiError<E>) + Send + 'static,
    {
        if let Err(err) = self.begin() {
            on_failure(ApiError::new(err));
            return RequestToken::finished();
        }

        if self.stubbing_enabled {
            deliver(self.run_stub(), on_success, on_failure);
            return RequestToken::finished();
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                self.state.store(COMPLETED, Ordering::Release);
                on_failure(ApiError::new(Error::ConfigurationError(format!(
                    "Performing a request requires a Tokio runtime: {}",
                    e
                ))));
                return RequestToken::finished();
            }
        };

        let exchange = self.exchange();
        let task = runtime.spawn(async move {
            deliver(exchange.run().await, on_success, on_failure);
        });
        RequestToken::in_flight(task.abort_handle())
    }

    /// Runs the request and returns its outcome.
    ///
    /// Dropping the returned future cancels the request; plugins are still
    /// told it finished.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for every failed outcome, including
    /// [`Error::AlreadyPerformed`] on a second call.
    pub async fn send(&self) -> std::result::Result<Response<M>, ApiError<E>> {
        self.begin().map_err(ApiError::new)?;

        if self.stubbing_enabled {
            return self.run_stub();
        }

        self.exchange().run().await
    }

    fn begin(&self) -> Result<()> {
        self.state
            .compare_exchange(IDLE, IN_FLIGHT, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| {
                tracing::warn!(path = %self.path, "Request performed more than once");
                Error::AlreadyPerformed
            })
    }

    fn run_stub(&self) -> std::result::Result<Response<M>, ApiError<E>> {
        let _state = StateGuard(self.state.clone());
        let mut hooks = self.plugins.begin(self.descriptor());

        let stub = std::mem::take(&mut *self.stub.lock().unwrap_or_else(PoisonError::into_inner));
        let result = stub.resolve(self.success_parser.as_ref());

        hooks.received(&RawOutcome::Stubbed {
            success: result.is_ok(),
        });
        tracing::debug!(
            method = %self.method,
            path = %self.path,
            stubbed = true,
            success = result.is_ok(),
            "Stubbed request completed"
        );

        result.map(Response::stubbed)
    }

    fn exchange(&self) -> Exchange<M, E> {
        let descriptor = self.descriptor();
        let request = TransportRequest {
            method: descriptor.method.clone(),
            url: descriptor.url.clone(),
            headers: descriptor.headers.clone(),
            body: self.body.clone(),
            timeout: self.timeout,
        };

        Exchange {
            request,
            descriptor,
            transport: self.transport.clone(),
            plugins: self.plugins.clone(),
            success_parser: self.success_parser.clone(),
            error_parser: self.error_parser.clone(),
            state: StateGuard(self.state.clone()),
        }
    }
}

impl<M, E> fmt::Debug for Request<M, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("url", &self.url.as_str())
            .field("plugins", &self.plugins.len())
            .field("stubbing_enabled", &self.stubbing_enabled)
            .finish_non_exhaustive()
    }
}

/// Handle to a performed request.
///
/// Cancelling is best effort. It stops a real request that is still in
/// flight, in which case neither callback runs. If the outcome is being
/// delivered at the same moment the callback may still run. Cancelling a
/// finished or stubbed request does nothing.
pub struct RequestToken {
    task: Option<AbortHandle>,
}

impl RequestToken {
    fn in_flight(task: AbortHandle) -> Self {
        Self { task: Some(task) }
    }

    fn finished() -> Self {
        Self { task: None }
    }

    /// Cancels the request if it is still in flight.
    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    /// Returns `true` once the request has completed or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, AbortHandle::is_finished)
    }
}

impl fmt::Debug for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestToken")
            .field("stubbed_or_finished", &self.task.is_none())
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Marks the request completed when dropped, whether it finished or was
/// cancelled.
struct StateGuard(Arc<AtomicU8>);

impl Drop for StateGuard {
    fn drop(&mut self) {
        self.0.store(COMPLETED, Ordering::Release);
    }
}

/// Everything one network round trip needs, detached from the `Request`.
struct Exchange<M, E> {
    request: TransportRequest,
    descriptor: RequestDescriptor,
    transport: Arc<dyn Transport>,
    plugins: PluginChain,
    success_parser: Arc<dyn ModelParser<M>>,
    error_parser: Arc<dyn ModelParser<E>>,
    state: StateGuard,
}

impl<M, E> Exchange<M, E> {
    async fn run(self) -> std::result::Result<Response<M>, ApiError<E>> {
        let Exchange {
            request,
            descriptor,
            transport,
            plugins,
            success_parser,
            error_parser,
            state,
        } = self;

        tracing::debug!(
            method = %descriptor.method,
            url = %descriptor.url,
            "Executing HTTP request"
        );

        let mut hooks = plugins.begin(descriptor);
        let start_time = Instant::now();
        let outcome = transport.send(request).await;
        let latency = start_time.elapsed();

        match &outcome {
            Ok(response) => hooks.received(&RawOutcome::Response(response)),
            Err(err) => hooks.received(&RawOutcome::TransportFailure(err)),
        }
        let path = hooks.descriptor().path.clone();
        drop(hooks);

        let result = classify(
            outcome,
            &path,
            latency,
            success_parser.as_ref(),
            error_parser.as_ref(),
        );
        drop(state);
        result
    }
}

/// Turns a raw transport outcome into the caller-facing result.
fn classify<M, E>(
    outcome: std::result::Result<TransportResponse, TransportError>,
    path: &str,
    latency: Duration,
    success_parser: &dyn ModelParser<M>,
    error_parser: &dyn ModelParser<E>,
) -> std::result::Result<Response<M>, ApiError<E>> {
    let TransportResponse {
        status,
        headers,
        body,
    } = match outcome {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(error = %err, path = path, "Transport failed");
            let status = err.status();
            let headers = err.headers().cloned().unwrap_or_default();
            let mut failure = ApiError::new(Error::Transport(err));
            failure.status = status;
            failure.headers = headers;
            return Err(failure);
        }
    };

    tracing::info!(
        status = status.as_u16(),
        latency_ms = latency.as_millis(),
        path = path,
        "Received HTTP response"
    );

    if !status.is_success() {
        if status.is_client_error() {
            tracing::error!(status = status.as_u16(), response = %body, "Client error (4xx)");
        } else if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), response = %body, "Server error (5xx)");
        }

        let error_model = parse_error_model(&body, error_parser);
        let mut err = ApiError::new(Error::HttpStatus { status }).with_response(status, headers, body);
        err.error_model = error_model;
        return Err(err);
    }

    match decode_body(&body).and_then(|raw| success_parser.parse(&raw)) {
        Ok(data) => Ok(Response::new(data, body, status, headers, latency)),
        Err(parse_error) => {
            tracing::error!(
                error = %parse_error,
                raw_response = %body,
                "Failed to parse response"
            );
            let cause = Error::Parse {
                raw_response: body.clone(),
                parse_error,
                status,
            };
            Err(ApiError::new(cause).with_response(status, headers, body))
        }
    }
}

/// Parses an error body. Anything that does not produce a model is logged
/// and dropped; the caller still gets the status and raw body.
fn parse_error_model<E>(body: &str, parser: &dyn ModelParser<E>) -> Option<E> {
    if body.trim().is_empty() {
        return None;
    }
    match decode_body(body).and_then(|raw| parser.parse(&raw)) {
        Ok(model) => Some(model),
        Err(e) => {
            tracing::debug!(error = %e, "Error response did not match the error model");
            None
        }
    }
}

fn deliver<M, E, S, F>(
    result: std::result::Result<Response<M>, ApiError<E>>,
    on_success: S,
    on_failure: F,
) where
    S: FnOnce(Response<M>),
    F: FnOnce(ApiError<E>),
{
    match result {
        Ok(response) => on_success(response),
        Err(error) => on_failure(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::BaseUrlBuilder;
    use crate::parser::JsonParser;
    use http::StatusCode;

    fn response(status: u16, body: &str) -> TransportResponse {
        TransportResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: body.to_string(),
        }
    }

    fn run(
        outcome: std::result::Result<TransportResponse, TransportError>,
    ) -> std::result::Result<Response<u32>, ApiError<String>> {
        classify(
            outcome,
            "f00",
            Duration::ZERO,
            &JsonParser::<u32>::new(),
            &JsonParser::<String>::new(),
        )
    }

    #[test]
    fn test_2xx_parses_success_model() {
        let response = run(Ok(response(200, "5"))).unwrap();
        assert_eq!(response.data, 5);
        assert!(!response.stubbed);
    }

    #[test]
    fn test_2xx_parse_failure_escalates() {
        let err = run(Ok(response(200, "\"five\""))).unwrap_err();
        assert!(matches!(err.cause, Error::Parse { .. }));
        assert_eq!(err.raw_response(), Some("\"five\""));
        assert!(err.error_model.is_none());
    }

    #[test]
    fn test_non_2xx_parses_error_model() {
        let err = run(Ok(response(404, "\"missing\""))).unwrap_err();
        assert_eq!(err.error_model.as_deref(), Some("missing"));
        assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
        assert!(matches!(err.cause, Error::HttpStatus { .. }));
    }

    #[test]
    fn test_unparseable_error_body_keeps_cause() {
        let err = run(Ok(response(500, "<html>oops</html>"))).unwrap_err();
        assert!(err.error_model.is_none());
        assert_eq!(err.raw_response(), Some("<html>oops</html>"));
        assert!(matches!(err.cause, Error::HttpStatus { status } if status.as_u16() == 500));
    }

    #[test]
    fn test_transport_failure_is_preserved() {
        let err = run(Err(TransportError::Timeout)).unwrap_err();
        assert!(err.is_transport());
        assert!(err.status().is_none());
    }

    #[test]
    fn test_body_read_failure_keeps_status_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("r-1"));
        let err = run(Err(TransportError::Body {
            status: StatusCode::BAD_GATEWAY,
            headers,
            source: "connection reset".into(),
        }))
        .unwrap_err();

        assert!(err.is_transport());
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
        assert_eq!(err.headers["x-request-id"], "r-1");
        assert!(err.raw_response().is_none());
        assert!(err.error_model.is_none());
    }

    #[test]
    fn test_second_perform_fails_fast() {
        let endpoint = Endpoint::new("https://example.test").unwrap();
        let request = endpoint
            .request::<u32, u32>("f00")
            .unwrap()
            .stubbing_enabled(true)
            .stub_model(1);

        request.perform(|_| {}, |e| panic!("first perform failed: {}", e));
        assert_eq!(request.state(), RequestState::Completed);

        let failure = Arc::new(Mutex::new(None));
        let slot = failure.clone();
        request.perform(
            |_| panic!("second perform succeeded"),
            move |e| *slot.lock().unwrap() = Some(e),
        );

        let failure = failure.lock().unwrap().take().unwrap();
        assert!(matches!(failure.cause, Error::AlreadyPerformed));
    }

    #[test]
    fn test_perform_outside_runtime_fails() {
        let endpoint = Endpoint::new("https://example.test").unwrap();
        let request = endpoint.request::<u32, u32>("f00").unwrap();

        let failure = Arc::new(Mutex::new(None));
        let slot = failure.clone();
        let token = request.perform(
            |_| panic!("request without runtime succeeded"),
            move |e| *slot.lock().unwrap() = Some(e),
        );

        assert!(token.is_finished());
        let failure = failure.lock().unwrap().take().unwrap();
        assert!(matches!(failure.cause, Error::ConfigurationError(_)));
        assert_eq!(request.state(), RequestState::Completed);
    }

    #[test]
    fn test_url_builder_override() {
        let endpoint = Endpoint::new("https://example.test/api").unwrap();
        let mirror = BaseUrlBuilder::parse("https://mirror.test/v2").unwrap();

        let request = endpoint
            .request::<u32, u32>("users/1")
            .unwrap()
            .url_builder(Arc::new(mirror))
            .unwrap();

        assert_eq!(request.url().as_str(), "https://mirror.test/v2/users/1");
        assert_eq!(request.descriptor().url.host_str(), Some("mirror.test"));

        let other = endpoint.request::<u32, u32>("users/1").unwrap();
        assert_eq!(other.url().as_str(), "https://example.test/api/users/1");
    }

    #[test]
    fn test_url_builder_override_failure() {
        struct Refuse;

        impl UrlBuilder for Refuse {
            fn build_url(&self, path: &str) -> Result<Url> {
                Err(Error::ConfigurationError(format!("no route for {}", path)))
            }
        }

        let endpoint = Endpoint::new("https://example.test").unwrap();
        let result = endpoint
            .request::<u32, u32>("f00")
            .unwrap()
            .url_builder(Arc::new(Refuse));
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_parts_accumulate_into_one_form() {
        let endpoint = Endpoint::new("https://example.test").unwrap();
        let request = endpoint
            .request::<u32, u32>("upload")
            .unwrap()
            .json_body(&[1, 2])
            .unwrap()
            .text_part("title", "Holiday")
            .file_part("photo", vec![1, 2, 3], "beach.jpg", Some("image/jpeg"));

        let form = request.multipart_body().unwrap();
        assert_eq!(form.len(), 2);
        assert_eq!(form.parts()[1].mime.as_deref(), Some("image/jpeg"));
        assert!(request.descriptor().headers.get("content-type").is_none());
    }

    #[test]
    fn test_descriptor_includes_query_and_headers() {
        let endpoint = Endpoint::new("https://example.test/api").unwrap();
        let request = endpoint
            .request::<u32, u32>("users")
            .unwrap()
            .query_param("page", "2")
            .header("X-Trace", "abc")
            .unwrap();

        let descriptor = request.descriptor();
        assert_eq!(
            descriptor.url.as_str(),
            "https://example.test/api/users?page=2"
        );
        assert_eq!(descriptor.headers["x-trace"], "abc");
        assert_eq!(descriptor.headers["accept"], "application/json");
        assert!(!descriptor.stubbed);
    }
}
