//! Value marshaling between the managed and script representations.

use crate::engine::{Completion, ScriptEngine};
use crate::error::ConversionError;
use crate::managed::{ManagedMap, ManagedRef, ManagedValue};
use crate::value::{ObjectId, ScriptValue};
use std::cell::RefCell;
use std::collections::HashMap;

/// Nesting limit for object graphs converted in either direction.
pub const MAX_DEPTH: usize = 64;

/// Largest array length or own-key count converted back to a managed value.
pub const MAX_LENGTH: usize = 1 << 20;

/// Class name given to script wrappers for managed objects without a proxy.
pub const WRAPPER_CLASS: &str = "ManagedObject";

/// Converts values across the boundary.
pub trait Marshaler {
    fn to_script(&self, engine: &dyn ScriptEngine, value: &ManagedValue) -> Result<ScriptValue, ConversionError>;

    fn to_managed(&self, engine: &dyn ScriptEngine, value: &ScriptValue) -> Result<ManagedValue, ConversionError>;

    /// Convert a managed key/value structure into a fresh script object.
    fn map_to_object(&self, engine: &dyn ScriptEngine, map: &ManagedMap) -> Result<ObjectId, ConversionError>;

    /// Convert a managed argument list into script call arguments.
    fn arguments(&self, engine: &dyn ScriptEngine, args: &[ManagedValue]) -> Result<Vec<ScriptValue>, ConversionError> {
        args.iter().map(|a| self.to_script(engine, a)).collect()
    }

    /// A proxy now represents `peer` with `object`.
    fn bind_peer(&self, _peer: ManagedRef, _object: ObjectId) {}

    /// The proxy for `peer` was destroyed.
    fn unbind_peer(&self, _peer: ManagedRef) {}

    /// Stop tracking the wrapper created for an unbound `peer` and hand it
    /// over. The caller takes over the wrapper's persistent reference.
    fn take_wrapper(&self, _peer: ManagedRef) -> Option<ObjectId> {
        None
    }
}

/// Default marshaler.
///
/// Managed object references convert to their proxy's script object when
/// one is bound, otherwise to a cached wrapper object so identity is stable
/// across calls. Script objects convert back to the managed reference they
/// stand for, or structurally to a map/array.
#[derive(Default)]
pub struct StandardMarshaler {
    peers: RefCell<HashMap<ManagedRef, ObjectId>>,
    wrappers: RefCell<HashMap<ManagedRef, ObjectId>>,
    owners: RefCell<HashMap<ObjectId, ManagedRef>>,
}

impl StandardMarshaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script object currently standing for `peer`, if any.
    pub fn object_for(&self, peer: ManagedRef) -> Option<ObjectId> {
        let bound = self.peers.borrow().get(&peer).copied();
        bound.or_else(|| self.wrappers.borrow().get(&peer).copied())
    }

    fn wrapper_for(&self, engine: &dyn ScriptEngine, peer: ManagedRef) -> ObjectId {
        if let Some(object) = self.object_for(peer) {
            return object;
        }
        let object = engine.new_object(Some(WRAPPER_CLASS));
        engine.persist(object);
        self.wrappers.borrow_mut().insert(peer, object);
        self.owners.borrow_mut().insert(object, peer);
        log::trace!("created script wrapper {} for {}", object, peer);
        object
    }

    fn to_script_at(
        &self,
        engine: &dyn ScriptEngine,
        value: &ManagedValue,
        depth: usize,
    ) -> Result<ScriptValue, ConversionError> {
        if depth > MAX_DEPTH {
            return Err(ConversionError::TooDeep(MAX_DEPTH));
        }
        Ok(match value {
            ManagedValue::Undefined => ScriptValue::Undefined,
            ManagedValue::Null => ScriptValue::Null,
            ManagedValue::Bool(b) => ScriptValue::Boolean(*b),
            ManagedValue::Int(i) => ScriptValue::Number(*i as f64),
            ManagedValue::Double(d) => ScriptValue::Number(*d),
            ManagedValue::String(s) => ScriptValue::String(s.clone()),
            ManagedValue::Array(items) => {
                let array = engine.new_object(Some("Array"));
                for (i, item) in items.iter().enumerate() {
                    let item = self.to_script_at(engine, item, depth + 1)?;
                    engine
                        .set(array, &i.to_string(), item)
                        .map_err(ConversionError::Script)?;
                }
                engine
                    .set(array, "length", ScriptValue::Number(items.len() as f64))
                    .map_err(ConversionError::Script)?;
                ScriptValue::Object(array)
            }
            ManagedValue::Map(map) => ScriptValue::Object(self.map_at(engine, map, depth + 1)?),
            ManagedValue::Object(peer) => ScriptValue::Object(self.wrapper_for(engine, *peer)),
        })
    }

    fn map_at(
        &self,
        engine: &dyn ScriptEngine,
        map: &ManagedMap,
        depth: usize,
    ) -> Result<ObjectId, ConversionError> {
        let object = engine.new_object(None);
        for (key, value) in map {
            let value = self.to_script_at(engine, value, depth)?;
            engine.set(object, key, value).map_err(ConversionError::Script)?;
        }
        Ok(object)
    }

    fn read(engine: &dyn ScriptEngine, object: ObjectId, key: &str) -> Result<ScriptValue, ConversionError> {
        match engine.get(object, key) {
            Completion::Return(v) => Ok(v),
            Completion::Empty => Ok(ScriptValue::Undefined),
            Completion::Throw(e) => Err(ConversionError::Script(e)),
        }
    }

    fn to_managed_at(
        &self,
        engine: &dyn ScriptEngine,
        value: &ScriptValue,
        depth: usize,
    ) -> Result<ManagedValue, ConversionError> {
        if depth > MAX_DEPTH {
            return Err(ConversionError::TooDeep(MAX_DEPTH));
        }
        let object = match value {
            ScriptValue::Undefined => return Ok(ManagedValue::Undefined),
            ScriptValue::Null => return Ok(ManagedValue::Null),
            ScriptValue::Boolean(b) => return Ok(ManagedValue::Bool(*b)),
            ScriptValue::Number(n) => return Ok(number_to_managed(*n)),
            ScriptValue::String(s) => return Ok(ManagedValue::String(s.clone())),
            ScriptValue::Object(object) => *object,
        };

        if let Some(peer) = self.owners.borrow().get(&object) {
            return Ok(ManagedValue::Object(*peer));
        }
        if engine.is_callable(value) {
            return Ok(ManagedValue::Undefined);
        }

        if engine.class_name(object).as_deref() == Some("Array") {
            let len = match Self::read(engine, object, "length")? {
                ScriptValue::Number(n) if n > MAX_LENGTH as f64 => {
                    return Err(ConversionError::TooLarge(MAX_LENGTH))
                }
                ScriptValue::Number(n) if n >= 0.0 => n as usize,
                _ => 0,
            };
            let mut items = Vec::with_capacity(len);
            for i in 0..len {
                let item = Self::read(engine, object, &i.to_string())?;
                items.push(self.to_managed_at(engine, &item, depth + 1)?);
            }
            return Ok(ManagedValue::Array(items));
        }

        let keys = engine.own_keys(object);
        if keys.len() > MAX_LENGTH {
            return Err(ConversionError::TooLarge(MAX_LENGTH));
        }
        let mut map = ManagedMap::new();
        for key in keys {
            let item = Self::read(engine, object, &key)?;
            if engine.is_callable(&item) {
                continue;
            }
            map.insert(key, self.to_managed_at(engine, &item, depth + 1)?);
        }
        Ok(ManagedValue::Map(map))
    }
}

/// Integral numbers in `i64` range come back as `Int`, the rest as `Double`.
fn number_to_managed(n: f64) -> ManagedValue {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        ManagedValue::Int(n as i64)
    } else {
        ManagedValue::Double(n)
    }
}

impl Marshaler for StandardMarshaler {
    fn to_script(&self, engine: &dyn ScriptEngine, value: &ManagedValue) -> Result<ScriptValue, ConversionError> {
        self.to_script_at(engine, value, 0)
    }

    fn to_managed(&self, engine: &dyn ScriptEngine, value: &ScriptValue) -> Result<ManagedValue, ConversionError> {
        self.to_managed_at(engine, value, 0)
    }

    fn map_to_object(&self, engine: &dyn ScriptEngine, map: &ManagedMap) -> Result<ObjectId, ConversionError> {
        self.map_at(engine, map, 1)
    }

    fn bind_peer(&self, peer: ManagedRef, object: ObjectId) {
        self.peers.borrow_mut().insert(peer, object);
        self.owners.borrow_mut().insert(object, peer);
    }

    fn unbind_peer(&self, peer: ManagedRef) {
        if let Some(object) = self.peers.borrow_mut().remove(&peer) {
            self.owners.borrow_mut().remove(&object);
        }
    }

    fn take_wrapper(&self, peer: ManagedRef) -> Option<ObjectId> {
        let object = self.wrappers.borrow_mut().remove(&peer)?;
        self.owners.borrow_mut().remove(&object);
        Some(object)
    }
}
