//! Invocation helpers.
//!
//! Every path that runs script code goes through here. A thrown exception is
//! handed to the reporter exactly once and comes back as
//! [`Invocation::Diagnosed`]; nothing is re-raised toward the managed side.

use crate::engine::{Completion, ScriptEngine};
use crate::value::{ObjectId, ScriptValue};
use ferry_diagnostics::{DiagnosticCode, ExceptionReporter};

/// Result of running script code at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation<T> {
    Completed(T),
    /// An exception was thrown and has already been reported
    Diagnosed,
}

fn settle(
    completion: Completion,
    reporter: &dyn ExceptionReporter,
    code: DiagnosticCode,
) -> Invocation<Option<ScriptValue>> {
    match completion {
        Completion::Return(value) => Invocation::Completed(Some(value)),
        Completion::Empty => Invocation::Completed(None),
        Completion::Throw(exception) => {
            reporter.diagnose(code, &exception);
            Invocation::Diagnosed
        }
    }
}

/// Look up `key` on `object` and keep it only if it is callable.
pub fn lookup_function(
    engine: &dyn ScriptEngine,
    reporter: &dyn ExceptionReporter,
    code: DiagnosticCode,
    object: ObjectId,
    key: &str,
) -> Invocation<Option<ScriptValue>> {
    match settle(engine.get(object, key), reporter, code) {
        Invocation::Completed(Some(value)) if engine.is_callable(&value) => {
            Invocation::Completed(Some(value))
        }
        Invocation::Completed(_) => Invocation::Completed(None),
        Invocation::Diagnosed => Invocation::Diagnosed,
    }
}

/// Call `function` with `receiver` as `this`. `Completed(None)` means the
/// call produced no value.
pub fn invoke(
    engine: &dyn ScriptEngine,
    reporter: &dyn ExceptionReporter,
    code: DiagnosticCode,
    function: &ScriptValue,
    receiver: &ScriptValue,
    args: &[ScriptValue],
) -> Invocation<Option<ScriptValue>> {
    settle(engine.call(function, receiver, args), reporter, code)
}
