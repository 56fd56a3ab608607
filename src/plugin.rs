//! Plugins observe every request an endpoint sends.
//!
//! A [`Plugin`] has two hooks. [`Plugin::will_send`] fires immediately before
//! a request is dispatched, real or stubbed. [`Plugin::did_receive`] fires once
//! the raw outcome is known, before it is parsed and delivered. Plugins see
//! but never change what happens.
//!
//! Endpoint-wide plugins run before request-scoped ones, each set in the
//! order it was added, at both hook points.

use crate::transport::{TransportError, TransportResponse};
use http::{HeaderMap, Method, StatusCode};
use std::sync::Arc;
use url::Url;

/// Observes the lifecycle of requests.
///
/// Both hooks default to doing nothing. Hooks may be called from any thread
/// and must not block.
///
/// # Examples
///
/// ```
/// use outcall::plugin::{Plugin, RawOutcome, RequestDescriptor};
///
/// struct LogStatus;
///
/// impl Plugin for LogStatus {
///     fn did_receive(&self, request: &RequestDescriptor, outcome: &RawOutcome<'_>) {
///         if let Some(status) = outcome.status() {
///             println!("{} {} -> {}", request.method, request.url, status);
///         }
///     }
/// }
/// ```
pub trait Plugin: Send + Sync {
    /// Called right before the request is dispatched.
    fn will_send(&self, _request: &RequestDescriptor) {}

    /// Called once the raw outcome of the request is known.
    fn did_receive(&self, _request: &RequestDescriptor, _outcome: &RawOutcome<'_>) {}
}

/// What plugins are told about the request being sent.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// The HTTP method.
    pub method: Method,

    /// The request path, relative to the endpoint.
    pub path: String,

    /// The absolute URL.
    pub url: Url,

    /// The final header set.
    pub headers: HeaderMap,

    /// Whether the request is answered by a stub instead of the network.
    pub stubbed: bool,
}

/// The unparsed outcome of a request, as seen by [`Plugin::did_receive`].
#[derive(Debug)]
pub enum RawOutcome<'a> {
    /// The transport returned a response, with any status code.
    Response(&'a TransportResponse),

    /// The transport failed before a response was read.
    TransportFailure(&'a TransportError),

    /// A stub answered the request.
    Stubbed {
        /// `true` if the stub produced a success outcome.
        success: bool,
    },

    /// The request was cancelled or dropped before an outcome was known.
    Cancelled,
}

impl RawOutcome<'_> {
    /// Returns the HTTP status code, if a response head was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RawOutcome::Response(response) => Some(response.status),
            RawOutcome::TransportFailure(err) => err.status(),
            _ => None,
        }
    }

    /// Returns `true` for a 2xx response or a successful stub.
    pub fn is_success(&self) -> bool {
        match self {
            RawOutcome::Response(response) => response.status.is_success(),
            RawOutcome::Stubbed { success } => *success,
            RawOutcome::TransportFailure(_) | RawOutcome::Cancelled => false,
        }
    }
}

/// Endpoint-wide plugins followed by request-scoped ones.
#[derive(Clone)]
pub(crate) struct PluginChain {
    global: Arc<[Arc<dyn Plugin>]>,
    local: Vec<Arc<dyn Plugin>>,
}

impl PluginChain {
    pub(crate) fn new(global: Arc<[Arc<dyn Plugin>]>) -> Self {
        Self {
            global,
            local: Vec::new(),
        }
    }

    pub(crate) fn push_local(&mut self, plugin: Arc<dyn Plugin>) {
        self.local.push(plugin);
    }

    pub(crate) fn len(&self) -> usize {
        self.global.len() + self.local.len()
    }

    fn iter(&self) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.global.iter().chain(self.local.iter())
    }

    /// Fires `will_send` on every plugin and returns a scope that guarantees
    /// the matching `did_receive`.
    pub(crate) fn begin(&self, descriptor: RequestDescriptor) -> HookScope {
        for plugin in self.iter() {
            plugin.will_send(&descriptor);
        }
        HookScope {
            chain: self.clone(),
            descriptor,
            received: false,
        }
    }
}

/// Pairs each `will_send` with exactly one `did_receive`.
///
/// If the scope is dropped before [`HookScope::received`] is called, for
/// example because the task running the request was aborted, the plugins
/// are told the request was cancelled.
pub(crate) struct HookScope {
    chain: PluginChain,
    descriptor: RequestDescriptor,
    received: bool,
}

impl HookScope {
    pub(crate) fn received(&mut self, outcome: &RawOutcome<'_>) {
        if self.received {
            return;
        }
        self.received = true;
        for plugin in self.chain.iter() {
            plugin.did_receive(&self.descriptor, outcome);
        }
    }

    pub(crate) fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }
}

impl Drop for HookScope {
    fn drop(&mut self) {
        if !self.received {
            tracing::debug!(
                method = %self.descriptor.method,
                url = %self.descriptor.url,
                "Request dropped before completion"
            );
            self.received(&RawOutcome::Cancelled);
        }
    }
}
