//! Thread-local install point for the host's bridge.
//!
//! Boundary entry points coming from the managed runtime carry no bridge
//! reference, so the host installs one bridge per engine thread and entry
//! points reach it through [`with_bridge`].

use crate::bridge::Bridge;
use std::cell::RefCell;
use std::rc::Rc;

thread_local! {
    /// Bridge is not Send, so it must be thread-local
    static BRIDGE: RefCell<Option<Rc<Bridge>>> = const { RefCell::new(None) };
}

/// Install `bridge` for the current thread, replacing any previous one.
pub fn install(bridge: Bridge) -> Rc<Bridge> {
    let bridge = Rc::new(bridge);
    BRIDGE.with(|cell| {
        if cell.borrow_mut().replace(bridge.clone()).is_some() {
            log::debug!("replaced installed bridge");
        }
    });
    bridge
}

/// Remove the current thread's bridge, returning it.
pub fn uninstall() -> Option<Rc<Bridge>> {
    BRIDGE.with(|cell| cell.borrow_mut().take())
}

pub fn is_installed() -> bool {
    BRIDGE.with(|cell| cell.borrow().is_some())
}

/// Run `f` against the installed bridge. Returns `None` when no bridge is
/// installed on this thread.
///
/// The slot is not borrowed while `f` runs, so script handlers invoked by
/// `f` may call back into `with_bridge`.
pub fn with_bridge<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&Bridge) -> R,
{
    let bridge = BRIDGE.with(|cell| cell.borrow().clone())?;
    Some(f(&bridge))
}
