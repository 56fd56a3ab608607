//! # Outcall - typed API requests with hooks and stubs
//!
//! Outcall is a thin layer over an HTTP transport (`reqwest` by default). An
//! [`Endpoint`] binds a base URL, default headers, and plugins; each call site
//! gets a single-use [`Request`] that is generic over its success model and
//! its error model, which are parsed independently. Any request can be
//! answered by a [`Stub`] instead of the network for deterministic tests.
//!
//! ## Quick Start
//!
//! ```no_run
//! use outcall::Endpoint;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[derive(Debug, Deserialize)]
//! struct ServiceError {
//!     code: u16,
//!     message: String,
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let endpoint = Endpoint::new("https://api.example.com").unwrap();
//!     let request = endpoint.request::<User, ServiceError>("users/123").unwrap();
//!
//!     match request.send().await {
//!         Ok(user) => println!("User {}: {}", user.data.id, user.data.name),
//!         Err(error) => match error.error_model {
//!             Some(service_error) => eprintln!("{}: {}", service_error.code, service_error.message),
//!             None => eprintln!("Request failed: {}", error.cause),
//!         },
//!     }
//! }
//! ```
//!
//! ## Callbacks
//!
//! [`Request::perform`] delivers the outcome to exactly one of two callbacks
//! and returns a [`RequestToken`] that can cancel a request still in flight:
//!
//! ```no_run
//! # use outcall::Endpoint;
//! # async fn example() -> Result<(), outcall::Error> {
//! # let endpoint = Endpoint::new("https://api.example.com")?;
//! let token = endpoint.request::<serde_json::Value, serde_json::Value>("status/200")?.perform(
//!     |response| println!("Got {}", response.data),
//!     |error| eprintln!("Failed: {}", error),
//! );
//! token.cancel();
//! # Ok(())
//! # }
//! ```
//!
//! ## Stubbing
//!
//! A stubbed request never touches the network, and its callback has run by
//! the time `perform` returns:
//!
//! ```
//! use outcall::{ApiError, Endpoint};
//!
//! let endpoint = Endpoint::new("https://example.test").unwrap();
//! let request = endpoint
//!     .request::<u32, u32>("f00")
//!     .unwrap()
//!     .stubbing_enabled(true)
//!     .stub_error(ApiError::from_model(5));
//!
//! request.perform(
//!     |_| panic!("expected a failure"),
//!     |error| assert_eq!(error.error_model, Some(5)),
//! );
//! ```
//!
//! ## Features
//!
//! - **Two model types per request** - Success and error payloads are parsed by separate [`ModelParser`]s
//! - **Plugins** - Endpoint-wide and per-request hooks around every request, stubbed or not
//! - **Stubs** - Literal models, literal errors, or JSON fixture files
//! - **Multipart uploads** - [`Endpoint::multipart_request`] with text and file parts
//! - **Activity accounting** - [`NetworkActivity`] counts in-flight requests for busy indicators
//! - **Pluggable transport** - Swap `reqwest` for any [`transport::Transport`]
//! - **Automatic logging** - Structured logging with `tracing`

mod activity;
pub mod builders;
mod endpoint;
mod error;
pub mod fixture;
mod multipart;
mod parser;
pub mod plugin;
mod request;
mod response;
mod stub;
pub mod transport;

pub use activity::{ActivityGuard, NetworkActivity, NetworkActivityPlugin};
pub use endpoint::{Endpoint, EndpointBuilder};
pub use error::{ApiError, Error, ParseError, Result};
pub use fixture::{FixtureDir, FixtureLoader};
pub use multipart::{MultipartForm, MultipartPart};
pub use parser::{JsonParser, ModelParser};
pub use plugin::{Plugin, RawOutcome, RequestDescriptor};
pub use request::{Request, RequestState, RequestToken};
pub use response::Response;
pub use stub::Stub;
