//! Model parsers that turn decoded JSON payloads into typed models.
//!
//! A request decodes its success payload and its error payload with two
//! independent parsers. Both default to [`JsonParser`], which goes through
//! `serde`; supply your own [`ModelParser`] when a model's wire shape does not
//! match its `Deserialize` impl, or when the model does not implement it.

use crate::error::ParseError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;

/// Converts a raw decoded payload into a model of type `T`.
///
/// # Examples
///
/// ```
/// use outcall::{ModelParser, ParseError};
/// use serde_json::Value;
///
/// /// Reads only the `"count"` field of an envelope.
/// struct CountParser;
///
/// impl ModelParser<u64> for CountParser {
///     fn parse(&self, raw: &Value) -> Result<u64, ParseError> {
///         raw.get("count")
///             .and_then(Value::as_u64)
///             .ok_or_else(|| ParseError::new("missing count"))
///     }
/// }
///
/// let count = CountParser.parse(&serde_json::json!({ "count": 3 })).unwrap();
/// assert_eq!(count, 3);
/// ```
pub trait ModelParser<T>: Send + Sync {
    /// Parses `raw` into a model, or explains why its shape does not fit.
    fn parse(&self, raw: &Value) -> Result<T, ParseError>;
}

/// The default parser: deserializes the payload with `serde`.
pub struct JsonParser<T> {
    _model: PhantomData<fn() -> T>,
}

impl<T> JsonParser<T> {
    /// Creates a new `JsonParser`.
    pub fn new() -> Self {
        Self {
            _model: PhantomData,
        }
    }
}

impl<T> Default for JsonParser<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ModelParser<T> for JsonParser<T>
where
    T: DeserializeOwned,
{
    fn parse(&self, raw: &Value) -> Result<T, ParseError> {
        T::deserialize(raw).map_err(ParseError::from)
    }
}

/// Any `Fn(&Value) -> Result<T, ParseError>` closure is a parser.
impl<T, F> ModelParser<T> for F
where
    F: Fn(&Value) -> Result<T, ParseError> + Send + Sync,
{
    fn parse(&self, raw: &Value) -> Result<T, ParseError> {
        self(raw)
    }
}

/// Decodes a response body into a JSON value. An empty body reads as `null`.
pub(crate) fn decode_body(body: &str) -> Result<Value, ParseError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(ParseError::from)
}
