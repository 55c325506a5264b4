//! Wire envelope parsing.

use serde_json::Value;

use super::SinglendError;

/// The `{type, query}` payload identifying an operation and its input.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub type_name: String,
    pub query: Value,
}

impl Envelope {
    /// Parse raw body bytes.
    ///
    /// Non-JSON text is `InvalidJson`. Anything that is not an object with a
    /// string `type` and a `query` key (any value, `null` included) is
    /// `InvalidQuery`.
    pub fn parse(body: &[u8]) -> Result<Self, SinglendError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| SinglendError::InvalidJson)?;

        let Value::Object(mut object) = value else {
            return Err(SinglendError::InvalidQuery);
        };

        let query = object.remove("query").ok_or(SinglendError::InvalidQuery)?;
        match object.remove("type") {
            Some(Value::String(type_name)) => Ok(Self { type_name, query }),
            _ => Err(SinglendError::InvalidQuery),
        }
    }
}
