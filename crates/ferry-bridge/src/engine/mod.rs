//! The script engine contract.
//!
//! The bridge never talks to a concrete engine. Everything it needs from the
//! script side goes through [`ScriptEngine`], which an embedding implements
//! over its engine's handles. [`heap::HeapEngine`] is the in-process
//! reference implementation used by the tests and the `ferry` CLI.

pub mod heap;

use crate::value::{ObjectId, ScriptValue};
use ferry_diagnostics::ScriptException;
use std::rc::Rc;

/// How a script operation finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Normal completion with a value
    Return(ScriptValue),
    /// The engine produced no value (e.g. execution was terminated)
    Empty,
    /// A script exception was thrown and caught at the call site
    Throw(ScriptException),
}

impl Completion {
    pub fn undefined() -> Self {
        Completion::Return(ScriptValue::Undefined)
    }

    pub fn throw(name: &str, message: impl Into<String>) -> Self {
        Completion::Throw(ScriptException::new(name, message))
    }
}

impl From<ScriptValue> for Completion {
    fn from(value: ScriptValue) -> Self {
        Completion::Return(value)
    }
}

/// Token for a scoped local-handle region. Returned by
/// [`ScriptEngine::open_scope`] and handed back to `close_scope`.
#[derive(Debug, PartialEq, Eq)]
pub struct ScopeToken {
    pub depth: usize,
}

/// Native getter/setter pair installed on a named script property.
pub trait Accessor {
    fn get(&self, engine: &dyn ScriptEngine, holder: ObjectId, key: &str) -> Completion;

    fn set(
        &self,
        engine: &dyn ScriptEngine,
        holder: ObjectId,
        key: &str,
        value: ScriptValue,
    ) -> Result<(), ScriptException>;
}

/// Object model operations the bridge performs on the script side.
///
/// All methods take `&self`: implementations use interior mutability and
/// must not hold internal borrows while running script code, since script
/// code may re-enter the bridge.
pub trait ScriptEngine {
    /// Open a local-handle region.
    fn open_scope(&self) -> ScopeToken;

    /// Close the region opened by `token`, releasing its transient handles.
    fn close_scope(&self, token: ScopeToken);

    /// Allocate a fresh object, optionally tagged with a class name.
    fn new_object(&self, class_name: Option<&str>) -> ObjectId;

    /// `object[key]`, running accessors.
    fn get(&self, object: ObjectId, key: &str) -> Completion;

    /// `object[key] = value`, running accessors.
    fn set(&self, object: ObjectId, key: &str, value: ScriptValue) -> Result<(), ScriptException>;

    /// Replace `key` on `object` with an accessor property.
    fn install_accessor(&self, object: ObjectId, key: &str, accessor: Rc<dyn Accessor>);

    fn has_accessor(&self, object: ObjectId, key: &str) -> bool;

    fn is_callable(&self, value: &ScriptValue) -> bool;

    /// Call `function` with `receiver` as `this`.
    fn call(&self, function: &ScriptValue, receiver: &ScriptValue, args: &[ScriptValue]) -> Completion;

    /// Take a persistent reference that survives scope exit.
    fn persist(&self, object: ObjectId);

    /// Drop a persistent reference taken with `persist`.
    fn dispose(&self, object: ObjectId);

    /// Own enumerable property names, in insertion order.
    fn own_keys(&self, object: ObjectId) -> Vec<String>;

    fn class_name(&self, object: ObjectId) -> Option<String>;
}
