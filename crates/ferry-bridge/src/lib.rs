//! Proxy bridge between a managed runtime and an embedded script engine.
//!
//! Every managed object that is visible to script code has a native proxy
//! binding it to a script object. The managed side refers to proxies by an
//! opaque [`RawHandle`]; the bridge keeps the proxies alive until the managed
//! side detaches and releases them, forwards property writes in both
//! directions, and dispatches calls and events into script code.
//!
//! Script exceptions never cross back to the managed caller. They are handed
//! to an [`ExceptionReporter`](ferry_diagnostics::ExceptionReporter) and the
//! operation returns its failure value (`false` or
//! [`ManagedValue::Undefined`]).
//!
//! All operations run on the thread that owns the engine. Use [`host`] to
//! make a bridge reachable from entry points on that thread.

mod bridge;
pub mod config;
mod context;
mod dispatch;
pub mod engine;
mod error;
mod events;
mod handle;
pub mod host;
mod invoke;
mod lifecycle;
mod managed;
mod marshal;
mod properties;
mod proxy;
mod value;
mod window;

#[cfg(test)]
mod tests;

pub use bridge::{Bridge, Target};
pub use config::{BridgeConfig, DiagnosticsConfig, PresentationFormat};
pub use context::{ExecutionContext, HandleScope};
pub use engine::heap::HeapEngine;
pub use engine::{Accessor, Completion, ScopeToken, ScriptEngine};
pub use error::{BridgeError, ConversionError};
pub use events::FireEvent;
pub use handle::{ProxyHandle, ProxyTable, RawHandle};
pub use invoke::{invoke, lookup_function, Invocation};
pub use managed::{ClassDescriptor, ManagedMap, ManagedRef, ManagedRuntime, ManagedValue};
pub use marshal::{Marshaler, StandardMarshaler};
pub use properties::PropertyStore;
pub use proxy::Proxy;
pub use value::{ObjectId, ScriptValue};
