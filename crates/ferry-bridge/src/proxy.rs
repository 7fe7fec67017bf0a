//! Proxy records.

use crate::managed::{ClassDescriptor, ManagedRef};
use crate::value::ObjectId;

/// Native-side record binding a managed object to a script object.
///
/// The proxy owns the only persistent reference to `object`; whoever
/// removes it from the table must dispose that reference.
#[derive(Debug)]
pub struct Proxy {
    object: ObjectId,
    peer: ManagedRef,
    class: ClassDescriptor,
    detached: bool,
}

impl Proxy {
    pub fn new(object: ObjectId, peer: ManagedRef, class: ClassDescriptor) -> Self {
        Self {
            object,
            peer,
            class,
            detached: false,
        }
    }

    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn peer(&self) -> ManagedRef {
        self.peer
    }

    pub fn class(&self) -> &ClassDescriptor {
        &self.class
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// The managed side no longer needs this native peer.
    pub fn detach(&mut self) {
        self.detached = true;
    }

    /// A proxy may only be destroyed once detached.
    pub fn may_destroy(&self) -> bool {
        self.detached
    }
}
