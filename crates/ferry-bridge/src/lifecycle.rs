//! Proxy lifecycle: creation, detach, release, and teardown of the wrappers
//! that stand in for managed objects without a proxy.

use crate::bridge::Bridge;
use crate::error::BridgeError;
use crate::handle::{ProxyHandle, RawHandle};
use crate::managed::{ClassDescriptor, ManagedRef};
use crate::proxy::Proxy;
use ferry_diagnostics::{Diagnostic, DiagnosticCode};

/// Why a release did not destroy anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refusal {
    NullHandle,
    Unknown,
    Attached,
}

impl Bridge {
    /// Bind `peer` to a script object and register a proxy for it. The
    /// returned handle is what the managed side passes back on later
    /// boundary calls.
    ///
    /// If script code already saw `peer` before it had a proxy, the wrapper
    /// it saw becomes the proxy's object, so properties bridged through the
    /// unbound fallback stay visible.
    pub fn init_object(&self, class: &ClassDescriptor, peer: ManagedRef) -> Result<ProxyHandle, BridgeError> {
        let _scope = self.cx.scope("init_object");
        let engine = self.engine();

        if let Some(existing) = self.proxies.borrow().find_by_peer(peer) {
            return Err(BridgeError::AlreadyBound(peer, existing));
        }

        let object = match self.marshaler.take_wrapper(peer) {
            Some(wrapper) => {
                log::debug!("adopting script wrapper {} for {}", wrapper, peer);
                wrapper
            }
            None => {
                let object = engine.new_object(Some(&class.name));
                engine.persist(object);
                object
            }
        };
        let handle = self
            .proxies
            .borrow_mut()
            .insert(Proxy::new(object, peer, class.clone()));
        self.marshaler.bind_peer(peer, object);

        log::debug!("created {} proxy {} for {} -> {}", class.name, handle, peer, object);
        Ok(handle)
    }

    /// Mark the proxy as no longer needed by the managed side. Returns false
    /// for zero or stale handles.
    pub fn detach(&self, handle: RawHandle) -> bool {
        let _scope = self.cx.scope("detach");

        let Some(handle) = ProxyHandle::from_raw(handle) else {
            return false;
        };
        match self.proxies.borrow_mut().get_mut(handle) {
            Some(proxy) => {
                proxy.detach();
                log::debug!("detached proxy {} ({})", handle, proxy.peer());
                true
            }
            None => false,
        }
    }

    /// Destroy the proxy behind `handle` if it is detached.
    ///
    /// Zero, stale and still-attached handles are left alone and return
    /// false; double releases during teardown are expected.
    pub fn release(&self, handle: RawHandle) -> bool {
        let _scope = self.cx.scope("release");

        let outcome = match ProxyHandle::from_raw(handle) {
            None if handle == 0 => Err(Refusal::NullHandle),
            None => Err(Refusal::Unknown),
            Some(h) => {
                let mut proxies = self.proxies.borrow_mut();
                match proxies.get(h).map(|p| p.may_destroy()) {
                    None => Err(Refusal::Unknown),
                    Some(false) => Err(Refusal::Attached),
                    Some(true) => proxies.remove(h).ok_or(Refusal::Unknown),
                }
            }
        };

        match outcome {
            Ok(proxy) => {
                self.destroy(proxy);
                true
            }
            Err(Refusal::Attached) => {
                self.reporter.notice(
                    Diagnostic::new(
                        DiagnosticCode::ReleaseWhileAttached,
                        format!("release of proxy {:#x} ignored: still attached", handle),
                    )
                    .with_note("operation: release")
                    .with_help("detach the proxy before releasing it")
                    .build(),
                );
                false
            }
            Err(Refusal::Unknown) => {
                log::debug!("release of unknown handle {:#x} ignored", handle);
                false
            }
            Err(Refusal::NullHandle) => false,
        }
    }

    /// The managed object `peer` is gone. Drops the script wrapper created
    /// for it while it had no proxy, with its bridged properties.
    ///
    /// Returns false when there was no wrapper. A peer with a live proxy is
    /// left alone: proxies go through `detach` and `release`.
    pub fn forget(&self, peer: ManagedRef) -> bool {
        let _scope = self.cx.scope("forget");

        if self.proxies.borrow().find_by_peer(peer).is_some() {
            log::debug!("not forgetting {}: it has a live proxy", peer);
            return false;
        }
        let Some(object) = self.marshaler.take_wrapper(peer) else {
            return false;
        };
        let dropped = self.properties.borrow_mut().remove_object(object);
        self.engine().dispose(object);
        log::debug!("forgot {} -> {} ({} bridged properties dropped)", peer, object, dropped);
        true
    }

    fn destroy(&self, proxy: Proxy) {
        let object = proxy.object();
        self.marshaler.unbind_peer(proxy.peer());
        let dropped = self.properties.borrow_mut().remove_object(object);
        self.engine().dispose(object);
        log::debug!(
            "released {} proxy for {} -> {} ({} bridged properties dropped)",
            proxy.class().name,
            proxy.peer(),
            object,
            dropped
        );
    }
}
