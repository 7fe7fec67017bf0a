//! Property bridge.
//!
//! Bridged properties are accessor properties on the script object. Their
//! logical values live in [`PropertyStore`], a side table keyed by script
//! object identity, so script reads see the last value set from either side
//! and every script-side write is forwarded to the managed peer.

use crate::bridge::{Bridge, Target};
use crate::engine::{Accessor, Completion, ScriptEngine};
use crate::error::BridgeError;
use crate::managed::{ManagedRef, ManagedRuntime, ManagedValue};
use crate::marshal::Marshaler;
use crate::value::{ObjectId, ScriptValue};
use ferry_diagnostics::{Diagnostic, DiagnosticCode, ExceptionReporter, ScriptException};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Companion maps for every object that has bridged properties.
#[derive(Debug, Default)]
pub struct PropertyStore {
    companions: HashMap<ObjectId, BTreeMap<String, ScriptValue>>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, object: ObjectId, name: &str) -> Option<&ScriptValue> {
        self.companions.get(&object)?.get(name)
    }

    pub fn contains(&self, object: ObjectId, name: &str) -> bool {
        self.get(object, name).is_some()
    }

    /// Store a value, creating the companion map on first use. Returns true
    /// if `name` was not bridged on `object` before.
    pub fn store(&mut self, object: ObjectId, name: &str, value: ScriptValue) -> bool {
        self.companions
            .entry(object)
            .or_default()
            .insert(name.to_string(), value)
            .is_none()
    }

    /// Bridged property names of `object`.
    pub fn names(&self, object: ObjectId) -> Vec<String> {
        self.companions
            .get(&object)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop the companion map of a destroyed object.
    pub fn remove_object(&mut self, object: ObjectId) -> usize {
        self.companions.remove(&object).map(|c| c.len()).unwrap_or(0)
    }

    /// Number of objects with a companion map.
    pub fn object_count(&self) -> usize {
        self.companions.len()
    }
}

/// Getter/setter pair installed for a bridged property.
pub(crate) struct PropertyAccessor {
    store: Rc<RefCell<PropertyStore>>,
    peer: ManagedRef,
    runtime: Rc<dyn ManagedRuntime>,
    marshaler: Rc<dyn Marshaler>,
    reporter: Rc<dyn ExceptionReporter>,
}

impl Accessor for PropertyAccessor {
    fn get(&self, _engine: &dyn ScriptEngine, holder: ObjectId, key: &str) -> Completion {
        let value = self.store.borrow().get(holder, key).cloned();
        Completion::Return(value.unwrap_or(ScriptValue::Undefined))
    }

    fn set(
        &self,
        engine: &dyn ScriptEngine,
        holder: ObjectId,
        key: &str,
        value: ScriptValue,
    ) -> Result<(), ScriptException> {
        let managed = self.marshaler.to_managed(engine, &value);
        self.store.borrow_mut().store(holder, key, value);

        match managed {
            Ok(managed) => self.runtime.on_property_changed(self.peer, key, managed),
            Err(e) => self.reporter.notice(
                Diagnostic::new(
                    DiagnosticCode::AccessorHookFailed,
                    format!("property '{}' of {} changed but could not be forwarded: {}", key, self.peer, e),
                )
                .build(),
            ),
        }
        Ok(())
    }
}

impl Bridge {
    /// Bridge property `name` on the target and set its logical value.
    ///
    /// The accessor is installed once per object and name; later calls only
    /// update the stored value. The managed peer is not notified for writes
    /// made through this call, only for writes made by script code.
    pub fn set_property(&self, target: Target, name: &str, value: &ManagedValue) -> Result<(), BridgeError> {
        let _scope = self.cx.scope("set_property");
        let engine = self.engine();

        let (object, peer) = self.resolve_target(target)?;
        let value = self.marshaler.to_script(engine, value)?;

        let bridged = self.properties.borrow().contains(object, name);
        if !bridged {
            let accessor = PropertyAccessor {
                store: self.properties.clone(),
                peer,
                runtime: self.runtime.clone(),
                marshaler: self.marshaler.clone(),
                reporter: self.reporter.clone(),
            };
            engine.install_accessor(object, name, Rc::new(accessor));
            log::trace!("bridged property '{}' on {}", name, object);
        }
        self.properties.borrow_mut().store(object, name, value);
        Ok(())
    }

    /// Read `name` from the target through the script engine, so bridged
    /// properties go through their accessor. A throwing getter is diagnosed
    /// and reads as the undefined sentinel.
    pub fn get_property(&self, target: Target, name: &str) -> Result<ManagedValue, BridgeError> {
        let _scope = self.cx.scope("get_property");
        let engine = self.engine();

        let (object, _) = self.resolve_target(target)?;
        match engine.get(object, name) {
            Completion::Return(value) => Ok(self.marshaler.to_managed(engine, &value)?),
            Completion::Empty => Ok(ManagedValue::Undefined),
            Completion::Throw(exception) => {
                self.reporter
                    .diagnose(DiagnosticCode::AccessorHookFailed, &exception);
                Ok(ManagedValue::Undefined)
            }
        }
    }

    /// Names bridged on the target so far.
    pub fn bridged_properties(&self, target: Target) -> Result<Vec<String>, BridgeError> {
        let _scope = self.cx.scope("bridged_properties");
        let (object, _) = self.resolve_target(target)?;
        Ok(self.properties.borrow().names(object))
    }
}
