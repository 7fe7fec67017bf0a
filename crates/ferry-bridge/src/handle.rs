//! Handle table mapping boundary handles to proxy records.
//!
//! ## Handle layout
//!
//! A handle crosses the boundary as a plain `u64`:
//!
//! ```text
//!  63            32 31             0
//! +----------------+----------------+
//! |   generation   |   slot index   |
//! +----------------+----------------+
//! ```
//!
//! Generations start at 1 and are bumped whenever a slot is vacated, so a
//! raw value is never zero and a destroyed proxy's handle never resolves
//! again, even after its slot is reused.

use crate::error::BridgeError;
use crate::managed::ManagedRef;
use crate::proxy::Proxy;
use std::collections::HashMap;
use std::fmt;

/// A handle as it crosses the boundary. Zero means "no native peer".
pub type RawHandle = u64;

/// Generation-checked index into the [`ProxyTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyHandle {
    index: u32,
    generation: u32,
}

impl ProxyHandle {
    /// Decode a boundary value. Zero and zero-generation values are never
    /// issued and decode to `None`.
    pub fn from_raw(raw: RawHandle) -> Option<Self> {
        let generation = (raw >> 32) as u32;
        if generation == 0 {
            return None;
        }
        Some(Self {
            index: raw as u32,
            generation,
        })
    }

    pub fn to_raw(self) -> RawHandle {
        ((self.generation as u64) << 32) | self.index as u64
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ProxyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.to_raw())
    }
}

struct Slot {
    generation: u32,
    proxy: Option<Proxy>,
}

/// Arena of live proxies.
pub struct ProxyTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_peer: HashMap<ManagedRef, ProxyHandle>,
}

impl ProxyTable {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            by_peer: HashMap::new(),
        }
    }

    /// Store a proxy and return its new handle.
    pub fn insert(&mut self, proxy: Proxy) -> ProxyHandle {
        let peer = proxy.peer();
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.proxy = Some(proxy);
                ProxyHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 1,
                    proxy: Some(proxy),
                });
                ProxyHandle {
                    index,
                    generation: 1,
                }
            }
        };
        self.by_peer.insert(peer, handle);
        handle
    }

    fn slot(&self, handle: ProxyHandle) -> Option<&Slot> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
    }

    pub fn get(&self, handle: ProxyHandle) -> Option<&Proxy> {
        self.slot(handle)?.proxy.as_ref()
    }

    pub fn get_mut(&mut self, handle: ProxyHandle) -> Option<&mut Proxy> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)?
            .proxy
            .as_mut()
    }

    pub fn contains(&self, handle: ProxyHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Remove a proxy, invalidating its handle.
    pub fn remove(&mut self, handle: ProxyHandle) -> Option<Proxy> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)?;
        let proxy = slot.proxy.take()?;
        slot.generation = match slot.generation.wrapping_add(1) {
            0 => 1,
            g => g,
        };
        self.free.push(handle.index);
        self.by_peer.remove(&proxy.peer());
        Some(proxy)
    }

    /// Resolve a boundary value to a live proxy.
    pub fn resolve(&self, raw: RawHandle) -> Result<&Proxy, BridgeError> {
        if raw == 0 {
            return Err(BridgeError::NullHandle);
        }
        ProxyHandle::from_raw(raw)
            .and_then(|h| self.get(h))
            .ok_or(BridgeError::StaleHandle(raw))
    }

    /// Handle of the proxy bound to `peer`, if any.
    pub fn find_by_peer(&self, peer: ManagedRef) -> Option<ProxyHandle> {
        self.by_peer.get(&peer).copied()
    }

    /// Number of live proxies.
    pub fn len(&self) -> usize {
        self.by_peer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_peer.is_empty()
    }
}

impl Default for ProxyTable {
    fn default() -> Self {
        Self::new()
    }
}
