//! Call dispatcher.

use crate::bridge::Bridge;
use crate::error::BridgeError;
use crate::handle::RawHandle;
use crate::invoke::{invoke, lookup_function, Invocation};
use crate::managed::ManagedValue;
use crate::value::ScriptValue;
use ferry_diagnostics::DiagnosticCode;

impl Bridge {
    /// Call the function stored in property `name` of the proxy's script
    /// object, with that object as receiver.
    ///
    /// A missing or non-callable property, a thrown exception, and an empty
    /// completion all yield [`ManagedValue::Undefined`]. Exceptions are
    /// reported once through the diagnostic channel.
    pub fn call_property(
        &self,
        handle: RawHandle,
        name: &str,
        args: Option<&[ManagedValue]>,
    ) -> Result<ManagedValue, BridgeError> {
        let _scope = self.cx.scope("call_property");
        let engine = self.engine();
        let code = DiagnosticCode::CallPropertyThrew;

        let object = self.resolve(handle)?;
        let function = match lookup_function(engine, self.reporter.as_ref(), code, object, name) {
            Invocation::Completed(Some(function)) => function,
            Invocation::Completed(None) | Invocation::Diagnosed => {
                return Ok(ManagedValue::Undefined)
            }
        };

        let argv = match args {
            Some(args) => self.marshaler.arguments(engine, args)?,
            None => Vec::new(),
        };

        let receiver = ScriptValue::Object(object);
        match invoke(engine, self.reporter.as_ref(), code, &function, &receiver, &argv) {
            Invocation::Completed(Some(value)) => Ok(self.marshaler.to_managed(engine, &value)?),
            Invocation::Completed(None) | Invocation::Diagnosed => Ok(ManagedValue::Undefined),
        }
    }
}
