//! Managed-side values and the managed runtime contract.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque reference to a managed-runtime object (a global reference on the
/// managed side). Equality is managed identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManagedRef(pub u64);

impl fmt::Display for ManagedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Key/value structure handed across as event data.
pub type ManagedMap = BTreeMap<String, ManagedValue>;

/// A managed-side value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagedValue {
    /// The undefined sentinel returned instead of a failure
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<ManagedValue>),
    Map(ManagedMap),
    Object(ManagedRef),
}

impl From<bool> for ManagedValue {
    fn from(b: bool) -> Self {
        ManagedValue::Bool(b)
    }
}

impl From<i64> for ManagedValue {
    fn from(n: i64) -> Self {
        ManagedValue::Int(n)
    }
}

impl From<f64> for ManagedValue {
    fn from(n: f64) -> Self {
        ManagedValue::Double(n)
    }
}

impl From<&str> for ManagedValue {
    fn from(s: &str) -> Self {
        ManagedValue::String(s.to_string())
    }
}

impl From<String> for ManagedValue {
    fn from(s: String) -> Self {
        ManagedValue::String(s)
    }
}

impl From<ManagedRef> for ManagedValue {
    fn from(r: ManagedRef) -> Self {
        ManagedValue::Object(r)
    }
}

/// Describes the managed class a proxy is created for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassDescriptor {
    pub name: String,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Calls the bridge makes back into the managed runtime.
pub trait ManagedRuntime {
    /// A bridged property was written from script code.
    fn on_property_changed(&self, peer: ManagedRef, name: &str, value: ManagedValue);
}
