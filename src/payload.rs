//! Payloads shared by the cache, producer and invoker surfaces.

use bytes::Bytes;
use serde::Serialize;

use crate::core::command::ToArgs;
use crate::Result;

/// Data handed to a producer, an invoker or the cache.
///
/// Bytes and text go over the wire untouched; structured values are
/// encoded as JSON.
///
/// ```
/// use dataplane::Payload;
/// use serde_json::json;
///
/// let raw = Payload::from("plain");
/// assert_eq!(raw.into_bytes().unwrap().as_ref(), b"plain");
///
/// let structured = Payload::json(&json!({"id": 7})).unwrap();
/// assert_eq!(structured.into_bytes().unwrap().as_ref(), br#"{"id":7}"#);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Opaque bytes.
    RawBytes(Bytes),
    /// UTF-8 text.
    Text(String),
    /// A structured value, encoded as JSON on the wire.
    Serializable(serde_json::Value),
}

impl Payload {
    /// Captures any serializable value.
    ///
    /// # Errors
    ///
    /// [`Error::Serialization`](crate::Error::Serialization) if `value` cannot
    /// be represented as JSON, such as a map with non-string keys.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Payload::Serializable(serde_json::to_value(value)?))
    }

    /// Wire form of the payload.
    pub fn into_bytes(self) -> Result<Bytes> {
        Ok(match self {
            Payload::RawBytes(b) => b,
            Payload::Text(s) => Bytes::from(s),
            Payload::Serializable(v) => Bytes::from(serde_json::to_vec(&v)?),
        })
    }

    /// Returns true if this payload will be JSON-encoded.
    pub fn is_structured(&self) -> bool {
        matches!(self, Payload::Serializable(_))
    }
}

impl From<Bytes> for Payload {
    fn from(b: Bytes) -> Self {
        Payload::RawBytes(b)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(v: Vec<u8>) -> Self {
        Payload::RawBytes(Bytes::from(v))
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_owned())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(v: serde_json::Value) -> Self {
        Payload::Serializable(v)
    }
}

impl ToArgs for Payload {
    fn write_args(&self, out: &mut Vec<Bytes>) -> Result<()> {
        out.push(self.clone().into_bytes()?);
        Ok(())
    }
}
