//! Window/context propagation.

use crate::bridge::{Bridge, Target};
use crate::error::BridgeError;
use crate::invoke::{invoke, lookup_function, Invocation};
use crate::managed::ManagedValue;
use crate::value::ScriptValue;
use ferry_diagnostics::DiagnosticCode;

impl Bridge {
    /// Hand `context` to the target's window method.
    ///
    /// A target without the method is left alone. A context that converts to
    /// `null` is not passed on at all: the method is only called with a
    /// usable context, never to clear one.
    pub fn propagate_context(&self, target: Target, context: &ManagedValue) -> Result<(), BridgeError> {
        let _scope = self.cx.scope("propagate_context");
        let engine = self.engine();
        let code = DiagnosticCode::ContextMethodThrew;

        let (object, _) = self.resolve_target(target)?;
        let method = match lookup_function(
            engine,
            self.reporter.as_ref(),
            code,
            object,
            &self.config.window_method,
        ) {
            Invocation::Completed(Some(method)) => method,
            Invocation::Completed(None) | Invocation::Diagnosed => return Ok(()),
        };

        let context = self.marshaler.to_script(engine, context)?;
        if context.is_null() {
            log::trace!("null context for {}, not propagated", object);
            return Ok(());
        }

        invoke(
            engine,
            self.reporter.as_ref(),
            code,
            &method,
            &ScriptValue::Object(object),
            &[context],
        );
        Ok(())
    }
}
