//! The bridge: shared state behind every boundary operation.
//!
//! The boundary operations themselves live next to the component they drive:
//! - [`lifecycle`](crate::lifecycle): `init_object`, `detach`, `release`, `forget`
//! - [`properties`](crate::properties): `set_property`, `get_property`
//! - [`dispatch`](crate::dispatch): `call_property`
//! - [`events`](crate::events): `fire_event`
//! - [`window`](crate::window): `propagate_context`

use crate::config::BridgeConfig;
use crate::context::ExecutionContext;
use crate::engine::ScriptEngine;
use crate::error::BridgeError;
use crate::handle::{ProxyHandle, ProxyTable, RawHandle};
use crate::managed::{ManagedRef, ManagedRuntime, ManagedValue};
use crate::marshal::{Marshaler, StandardMarshaler};
use crate::properties::PropertyStore;
use crate::value::{ObjectId, ScriptValue};
use ferry_diagnostics::{Diagnostic, DiagnosticCode, ExceptionReporter};
use std::cell::RefCell;
use std::rc::Rc;

/// A boundary target: the managed object plus its native handle, which is
/// zero when no proxy exists yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub peer: ManagedRef,
    pub handle: RawHandle,
}

impl Target {
    pub fn new(peer: ManagedRef, handle: RawHandle) -> Self {
        Self { peer, handle }
    }

    /// Target with a live proxy.
    pub fn proxy(peer: ManagedRef, handle: ProxyHandle) -> Self {
        Self::new(peer, handle.to_raw())
    }

    /// Target with no native peer; resolved by converting `peer`.
    pub fn unbound(peer: ManagedRef) -> Self {
        Self::new(peer, 0)
    }
}

/// Bidirectional proxy bridge between a managed runtime and a script engine.
///
/// Not `Send`: a bridge lives on the thread that owns its engine. Internal
/// borrows are never held across calls into script code, so handlers may
/// re-enter any boundary operation.
pub struct Bridge {
    pub(crate) cx: ExecutionContext,
    pub(crate) proxies: RefCell<ProxyTable>,
    pub(crate) properties: Rc<RefCell<PropertyStore>>,
    pub(crate) marshaler: Rc<dyn Marshaler>,
    pub(crate) runtime: Rc<dyn ManagedRuntime>,
    pub(crate) reporter: Rc<dyn ExceptionReporter>,
    pub(crate) config: BridgeConfig,
}

impl Bridge {
    pub fn new(
        engine: Rc<dyn ScriptEngine>,
        runtime: Rc<dyn ManagedRuntime>,
        reporter: Rc<dyn ExceptionReporter>,
    ) -> Self {
        let config = BridgeConfig::default();
        Self {
            cx: ExecutionContext::new(engine).with_thread_check(config.check_thread),
            proxies: RefCell::new(ProxyTable::new()),
            properties: Rc::new(RefCell::new(PropertyStore::new())),
            marshaler: Rc::new(StandardMarshaler::new()),
            runtime,
            reporter,
            config,
        }
    }

    pub fn with_marshaler(mut self, marshaler: Rc<dyn Marshaler>) -> Self {
        self.marshaler = marshaler;
        self
    }

    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.cx = self.cx.with_thread_check(config.check_thread);
        self.config = config;
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn engine(&self) -> &dyn ScriptEngine {
        self.cx.engine()
    }

    /// Number of live proxies.
    pub fn live_proxies(&self) -> usize {
        self.proxies.borrow().len()
    }

    /// Detached state of a live proxy; `None` for zero or stale handles.
    pub fn is_detached(&self, handle: RawHandle) -> Option<bool> {
        self.proxies
            .borrow()
            .resolve(handle)
            .ok()
            .map(|p| p.is_detached())
    }

    /// Script object owned by the proxy behind `handle`.
    pub fn resolve(&self, handle: RawHandle) -> Result<ObjectId, BridgeError> {
        let resolved = self.proxies.borrow().resolve(handle).map(|p| p.object());
        match resolved {
            Ok(object) => Ok(object),
            Err(BridgeError::StaleHandle(raw)) => {
                self.reporter.notice(
                    Diagnostic::new(
                        DiagnosticCode::StaleHandle,
                        format!("handle {:#x} does not refer to a live proxy", raw),
                    )
                    .with_note("released handles are never reissued")
                    .with_help("clear the stored handle when its proxy is released")
                    .build(),
                );
                Err(BridgeError::StaleHandle(raw))
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve a target to its script object and the managed peer that owns
    /// it. Non-zero handles go through the table; zero handles fall back to
    /// converting the managed reference.
    pub(crate) fn resolve_target(&self, target: Target) -> Result<(ObjectId, ManagedRef), BridgeError> {
        if target.handle != 0 {
            let object = self.resolve(target.handle)?;
            let peer = self
                .proxies
                .borrow()
                .resolve(target.handle)
                .map(|p| p.peer())
                .unwrap_or(target.peer);
            return Ok((object, peer));
        }

        let converted = self
            .marshaler
            .to_script(self.engine(), &ManagedValue::Object(target.peer))?;
        match converted {
            ScriptValue::Object(object) => Ok((object, target.peer)),
            _ => Err(BridgeError::NotAnObject(target.peer)),
        }
    }
}
