//! Canned outcomes that replace the network for deterministic tests.
//!
//! A stubbed request never reaches its transport. Its plugins still fire, and
//! its outcome is delivered before `perform` returns.

use crate::error::{ApiError, Error, ParseError, Result};
use crate::fixture::FixtureLoader;
use crate::parser::{decode_body, ModelParser};
use std::fmt;
use std::sync::Arc;

/// What a stubbed request returns.
///
/// # Examples
///
/// ```
/// use outcall::{ApiError, Stub};
///
/// let success: Stub<u32, String> = Stub::Model(5);
/// let failure: Stub<u32, String> = Stub::Error(ApiError::from_model("nope".to_string()));
/// assert!(success.is_set() && failure.is_set());
/// assert!(!Stub::<u32, String>::Unset.is_set());
/// ```
pub enum Stub<M, E> {
    /// Nothing configured. Performing a stubbed request in this state fails
    /// with [`Error::StubConfiguration`].
    Unset,

    /// Succeed with this model.
    Model(M),

    /// Fail with this error.
    Error(ApiError<E>),

    /// Succeed with the model decoded from a fixture file.
    ///
    /// The fixture is read and decoded when the request is performed, with
    /// the request's success parser.
    ///
    /// A fixture whose content does not produce a model has no success
    /// outcome to give: performing the request calls `on_failure` with
    /// [`Error::MalformedFixture`] instead of succeeding without a model.
    /// [`Stub::model`] reports the same fixture as `Ok(None)`.
    Fixture {
        /// The fixture name.
        name: String,
        /// Where to load it from.
        loader: Arc<dyn FixtureLoader>,
    },
}

impl<M, E> Stub<M, E> {
    /// Creates a fixture stub.
    pub fn fixture(name: impl Into<String>, loader: Arc<dyn FixtureLoader>) -> Self {
        Stub::Fixture {
            name: name.into(),
            loader,
        }
    }

    /// Returns `true` unless this is [`Stub::Unset`].
    pub fn is_set(&self) -> bool {
        !matches!(self, Stub::Unset)
    }

    /// Returns the model this stub would succeed with, without consuming it.
    ///
    /// A fixture is read and decoded on every call; if its content does not
    /// produce a model the result is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if a fixture cannot be found or read.
    pub fn model(&self, parser: &dyn ModelParser<M>) -> Result<Option<M>>
    where
        M: Clone,
    {
        match self {
            Stub::Model(model) => Ok(Some(model.clone())),
            Stub::Fixture { name, loader } => match decode_fixture(name, loader.as_ref(), parser)? {
                Ok(model) => Ok(Some(model)),
                Err(_) => Ok(None),
            },
            Stub::Unset | Stub::Error(_) => Ok(None),
        }
    }

    /// Turns the stub into the outcome it stands for.
    pub(crate) fn resolve(self, parser: &dyn ModelParser<M>) -> std::result::Result<M, ApiError<E>> {
        match self {
            Stub::Model(model) => Ok(model),
            Stub::Error(error) => Err(error),
            Stub::Fixture { name, loader } => match decode_fixture(&name, loader.as_ref(), parser) {
                Ok(Ok(model)) => Ok(model),
                Ok(Err(parse_error)) => {
                    tracing::error!(
                        fixture = %name,
                        error = %parse_error,
                        "Fixture did not produce a model"
                    );
                    Err(ApiError::new(Error::MalformedFixture { name, parse_error }))
                }
                Err(err) => Err(ApiError::new(err)),
            },
            Stub::Unset => Err(ApiError::new(Error::StubConfiguration(
                "stubbing is enabled but no model, error, or fixture was provided".to_string(),
            ))),
        }
    }
}

impl<M, E> Default for Stub<M, E> {
    fn default() -> Self {
        Stub::Unset
    }
}

impl<M: fmt::Debug, E: fmt::Debug> fmt::Debug for Stub<M, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stub::Unset => f.write_str("Unset"),
            Stub::Model(model) => f.debug_tuple("Model").field(model).finish(),
            Stub::Error(error) => f.debug_tuple("Error").field(error).finish(),
            Stub::Fixture { name, loader } => f
                .debug_struct("Fixture")
                .field("name", name)
                .field("location", &loader.location())
                .finish(),
        }
    }
}

/// Loads and decodes a fixture. The outer error is a setup failure, the
/// inner one means the content did not produce a model.
fn decode_fixture<M>(
    name: &str,
    loader: &dyn FixtureLoader,
    parser: &dyn ModelParser<M>,
) -> Result<std::result::Result<M, ParseError>> {
    let bytes = loader.load(name)?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => return Ok(Err(ParseError::new(e.to_string()))),
    };
    Ok(decode_body(&text).and_then(|raw| parser.parse(&raw)))
}
