use crate::errors::{EgpError, Result};

/// Serializes a value to compact JSON bytes, the form handed to content-addressed stores.
pub fn to_json_bytes<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|err| EgpError::SerializationError(err.to_string()))
}

/// Deserializes JSON bytes.
pub fn from_json_bytes<T: serde::de::DeserializeOwned>(input: &[u8]) -> Result<T> {
    serde_json::from_slice(input).map_err(|err| EgpError::DeserializationError(err.to_string()))
}

/// Decodes bytes fetched from a store: JSON when it parses, the raw text otherwise.
pub fn json_or_text(input: &[u8]) -> serde_json::Value {
    match serde_json::from_slice(input) {
        Ok(value) => value,
        Err(_) => serde_json::Value::String(String::from_utf8_lossy(input).into_owned()),
    }
}
