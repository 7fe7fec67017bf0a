//! Event dispatcher.

use crate::bridge::{Bridge, Target};
use crate::engine::ScriptEngine;
use crate::error::BridgeError;
use crate::invoke::{invoke, lookup_function, Invocation};
use crate::managed::ManagedMap;
use crate::marshal::Marshaler;
use crate::value::{ObjectId, ScriptValue};
use ferry_diagnostics::DiagnosticCode;

/// Payload keys set by the bridge on top of the caller's data.
pub const KEY_BUBBLES: &str = "bubbles";
pub const KEY_SOURCE: &str = "source";
pub const KEY_SUCCESS: &str = "success";
pub const KEY_CODE: &str = "code";
pub const KEY_ERROR: &str = "error";

/// One event to fire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FireEvent {
    pub name: String,
    /// Caller-supplied payload fields
    pub data: Option<ManagedMap>,
    pub bubble: bool,
    /// Always attach `success`/`code`, even when `code` is zero
    pub report_success: bool,
    pub code: i32,
    pub error_message: Option<String>,
}

impl FireEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_data(mut self, data: ManagedMap) -> Self {
        self.data = Some(data);
        self
    }

    pub fn bubbles(mut self, bubble: bool) -> Self {
        self.bubble = bubble;
        self
    }

    pub fn report_success(mut self) -> Self {
        self.report_success = true;
        self
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Whether `success` and `code` go into the payload.
    pub fn carries_status(&self) -> bool {
        self.report_success || self.code != 0
    }
}

/// Build the payload object for one dispatch.
pub(crate) fn build_payload(
    engine: &dyn ScriptEngine,
    marshaler: &dyn Marshaler,
    event: &FireEvent,
    source: ObjectId,
) -> Result<ObjectId, BridgeError> {
    let payload = match &event.data {
        Some(data) => marshaler.map_to_object(engine, data)?,
        None => marshaler.map_to_object(engine, &ManagedMap::new())?,
    };

    let mut fields = vec![
        (KEY_BUBBLES, ScriptValue::Boolean(event.bubble)),
        (KEY_SOURCE, ScriptValue::Object(source)),
    ];
    if event.carries_status() {
        fields.push((KEY_SUCCESS, ScriptValue::Boolean(event.code == 0)));
        fields.push((KEY_CODE, ScriptValue::Number(event.code as f64)));
    }
    if let Some(message) = &event.error_message {
        fields.push((KEY_ERROR, ScriptValue::String(message.clone())));
    }

    for (key, value) in fields {
        engine
            .set(payload, key, value)
            .map_err(crate::error::ConversionError::Script)?;
    }
    Ok(payload)
}

/// Only a literal `true` from the handler counts as handled.
pub(crate) fn handled(outcome: &Invocation<Option<ScriptValue>>) -> bool {
    matches!(outcome, Invocation::Completed(Some(value)) if value.is_true())
}

impl Bridge {
    /// Fire `event` on `emitter` through its `emit` function.
    ///
    /// Returns true only when the handler returned the boolean `true`. An
    /// emitter without a callable `emit`, a thrown exception, an empty
    /// completion, and any other return value all give false.
    pub fn fire_event(
        &self,
        emitter: Target,
        source: Option<Target>,
        event: &FireEvent,
    ) -> Result<bool, BridgeError> {
        let _scope = self.cx.scope("fire_event");
        let engine = self.engine();
        let code = DiagnosticCode::EmitThrew;

        log::debug!("firing event \"{}\"", event.name);

        let (emitter_object, _) = self.resolve_target(emitter)?;
        let emit = match lookup_function(
            engine,
            self.reporter.as_ref(),
            code,
            emitter_object,
            &self.config.emit_function,
        ) {
            Invocation::Completed(Some(emit)) => emit,
            Invocation::Completed(None) | Invocation::Diagnosed => return Ok(false),
        };

        let source_object = match source {
            None => emitter_object,
            Some(source) if source.peer == emitter.peer => emitter_object,
            Some(source) => self.resolve_target(source)?.0,
        };

        let payload = build_payload(engine, self.marshaler.as_ref(), event, source_object)?;
        let args = [
            ScriptValue::String(event.name.clone()),
            ScriptValue::Object(payload),
        ];

        let outcome = invoke(
            engine,
            self.reporter.as_ref(),
            code,
            &emit,
            &ScriptValue::Object(emitter_object),
            &args,
        );
        Ok(handled(&outcome))
    }
}
