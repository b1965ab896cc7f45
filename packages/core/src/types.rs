use serde::{Deserialize, Serialize};

/// Opaque value carried by every backend.
///
/// Backends never inspect or validate values; any JSON document is accepted
/// and handed back unchanged.
pub type Value = serde_json::Value;

/// A key and its value, the unit of data interchange for batch operations.
///
/// Serializes with capitalized field names (`Key`, `Value`) to match the
/// HTTP wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    /// Key naming the entry. Unique within a store instance.
    #[serde(rename = "Key")]
    pub key: String,
    /// Opaque value.
    #[serde(rename = "Value")]
    pub value: Value,
}

impl Pair {
    /// Creates a pair from anything convertible into a key and a value.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
