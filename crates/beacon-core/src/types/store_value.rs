//! Typed values held by the expiring key-value store.
//!
//! Every value kind the store supports is a variant of [`StoreValue`]. Call
//! sites pick the Rust type they expect through [`FromStoreValue`], so the
//! whole coercion matrix lives in this module instead of being re-derived
//! by each backend.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::result::AppResult;

use super::id::PrincipalId;

/// Namespaced key inside the store.
///
/// Providers prepend their configured workspace, so the physical key is
/// `workspace:namespace:key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    /// Logical table name (e.g. `user_session`).
    pub namespace: String,
    /// Key inside the namespace.
    pub key: String,
}

impl StoreKey {
    /// Create a new key.
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    /// Physical key inside the given workspace.
    pub fn qualified(&self, workspace: &str) -> String {
        format!("{workspace}:{}:{}", self.namespace, self.key)
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.key)
    }
}

/// A value as stored, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StoreValue {
    /// Signed integer.
    Int(i64),
    /// Boolean flag.
    Bool(bool),
    /// UTF-8 text.
    Text(String),
}

impl StoreValue {
    /// Name of the kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
            Self::Text(_) => "text",
        }
    }

    /// Encodes the value for string-only backends.
    ///
    /// The one-letter tag keeps the kind across the round trip, so `"1"` the
    /// string and `1` the integer never collapse into each other.
    pub fn encode(&self) -> String {
        match self {
            Self::Int(v) => format!("i:{v}"),
            Self::Bool(v) => format!("b:{}", u8::from(*v)),
            Self::Text(v) => format!("s:{v}"),
        }
    }

    /// Decodes a value written by [`StoreValue::encode`].
    pub fn decode(raw: &str) -> AppResult<Self> {
        let (tag, payload) = raw
            .split_once(':')
            .ok_or_else(|| AppError::serialization(format!("Untagged store value: {raw:?}")))?;

        match tag {
            "i" => payload.parse::<i64>().map(Self::Int).map_err(|e| {
                AppError::serialization(format!("Invalid integer store value {payload:?}: {e}"))
            }),
            "b" => match payload {
                "1" => Ok(Self::Bool(true)),
                "0" => Ok(Self::Bool(false)),
                other => Err(AppError::serialization(format!(
                    "Invalid boolean store value {other:?}"
                ))),
            },
            "s" => Ok(Self::Text(payload.to_string())),
            other => Err(AppError::serialization(format!(
                "Unknown store value tag {other:?}"
            ))),
        }
    }
}

impl From<i64> for StoreValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for StoreValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for StoreValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for StoreValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<PrincipalId> for StoreValue {
    fn from(id: PrincipalId) -> Self {
        // Ids above i64::MAX are stored as text so nothing is truncated.
        match i64::try_from(id.get()) {
            Ok(v) => Self::Int(v),
            Err(_) => Self::Text(id.to_string()),
        }
    }
}

/// Conversion from a stored value into the type a call site expects.
pub trait FromStoreValue: Sized {
    /// Performs the conversion, failing with a serialization error when the
    /// stored kind cannot represent `Self`.
    fn from_store_value(value: StoreValue) -> AppResult<Self>;
}

fn mismatch<T>(expected: &str, value: &StoreValue) -> AppResult<T> {
    Err(AppError::serialization(format!(
        "Expected {expected} store value, found {}",
        value.kind_name()
    )))
}

impl FromStoreValue for StoreValue {
    fn from_store_value(value: StoreValue) -> AppResult<Self> {
        Ok(value)
    }
}

impl FromStoreValue for i64 {
    fn from_store_value(value: StoreValue) -> AppResult<Self> {
        match value {
            StoreValue::Int(v) => Ok(v),
            other => mismatch("int", &other),
        }
    }
}

impl FromStoreValue for u64 {
    fn from_store_value(value: StoreValue) -> AppResult<Self> {
        match value {
            StoreValue::Int(v) => u64::try_from(v).map_err(|_| {
                AppError::serialization(format!("Negative store value {v} for unsigned type"))
            }),
            other => mismatch("int", &other),
        }
    }
}

impl FromStoreValue for bool {
    fn from_store_value(value: StoreValue) -> AppResult<Self> {
        match value {
            StoreValue::Bool(v) => Ok(v),
            StoreValue::Int(v) => Ok(v != 0),
            other => mismatch("bool", &other),
        }
    }
}

impl FromStoreValue for String {
    fn from_store_value(value: StoreValue) -> AppResult<Self> {
        match value {
            StoreValue::Text(v) => Ok(v),
            other => mismatch("text", &other),
        }
    }
}

impl FromStoreValue for PrincipalId {
    fn from_store_value(value: StoreValue) -> AppResult<Self> {
        match value {
            StoreValue::Int(v) => u64::try_from(v).map(PrincipalId::new).map_err(|_| {
                AppError::serialization(format!("Negative principal id {v} in store"))
            }),
            StoreValue::Text(v) => v.parse().map_err(|e| {
                AppError::serialization(format!("Invalid principal id {v:?} in store: {e}"))
            }),
            other => mismatch("principal id", &other),
        }
    }
}
