//! Execution context and handle scopes.

use crate::engine::{ScopeToken, ScriptEngine};
use std::rc::Rc;
use std::thread::{self, ThreadId};

/// The single execution context every bridge operation runs in.
///
/// Holds the engine and the thread that owns it. Boundary calls are expected
/// to already be on that thread; with `check_thread` on, debug builds assert it.
pub struct ExecutionContext {
    engine: Rc<dyn ScriptEngine>,
    owner: ThreadId,
    check_thread: bool,
}

impl ExecutionContext {
    /// Bind a context to `engine` on the current thread.
    pub fn new(engine: Rc<dyn ScriptEngine>) -> Self {
        Self {
            engine,
            owner: thread::current().id(),
            check_thread: cfg!(debug_assertions),
        }
    }

    pub fn with_thread_check(mut self, enabled: bool) -> Self {
        self.check_thread = enabled;
        self
    }

    pub fn engine(&self) -> &dyn ScriptEngine {
        self.engine.as_ref()
    }

    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Enter `operation`: assert thread ownership and open a handle scope
    /// that closes when the guard drops.
    pub fn scope(&self, operation: &'static str) -> HandleScope<'_> {
        if self.check_thread {
            debug_assert!(
                self.is_owner_thread(),
                "{} called off the execution context's owning thread",
                operation
            );
        }
        log::trace!("enter {}", operation);
        HandleScope {
            engine: self.engine.as_ref(),
            token: Some(self.engine.open_scope()),
        }
    }
}

/// Scoped local-handle region. Closes on every exit path.
pub struct HandleScope<'a> {
    engine: &'a dyn ScriptEngine,
    token: Option<ScopeToken>,
}

impl Drop for HandleScope<'_> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            self.engine.close_scope(token);
        }
    }
}
