//! In-process reference engine.
//!
//! `HeapEngine` keeps objects in a growable table and never collects them.
//! Functions are native Rust closures. That is enough object model to drive
//! every bridge operation end to end: accessors, calls with a receiver,
//! thrown exceptions, empty completions, persistent references and scope
//! balancing are all observable.

use super::{Accessor, Completion, ScopeToken, ScriptEngine};
use crate::value::{ObjectId, ScriptValue};
use ferry_diagnostics::ScriptException;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Native function body: `(engine, this, args)`.
pub type NativeFunction = Rc<dyn Fn(&HeapEngine, &ScriptValue, &[ScriptValue]) -> Completion>;

enum Slot {
    Data(ScriptValue),
    Accessor(Rc<dyn Accessor>),
}

struct HeapObject {
    class_name: Option<String>,
    /// Insertion-ordered properties
    properties: Vec<(String, Slot)>,
    function: Option<NativeFunction>,
    persistent: u32,
}

impl HeapObject {
    fn new(class_name: Option<&str>) -> Self {
        Self {
            class_name: class_name.map(str::to_string),
            properties: Vec::new(),
            function: None,
            persistent: 0,
        }
    }

    fn find(&self, key: &str) -> Option<&Slot> {
        self.properties.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    fn find_mut(&mut self, key: &str) -> Option<&mut Slot> {
        self.properties
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, s)| s)
    }

    fn put(&mut self, key: &str, slot: Slot) {
        match self.find_mut(key) {
            Some(existing) => *existing = slot,
            None => self.properties.push((key.to_string(), slot)),
        }
    }
}

/// Reference [`ScriptEngine`] implementation.
#[derive(Default)]
pub struct HeapEngine {
    objects: RefCell<Vec<HeapObject>>,
    scope_depth: Cell<usize>,
    scopes_opened: Cell<usize>,
}

impl HeapEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&self, object: HeapObject) -> ObjectId {
        let mut objects = self.objects.borrow_mut();
        objects.push(object);
        ObjectId((objects.len() - 1) as u32)
    }

    fn no_such_object(object: ObjectId) -> ScriptException {
        ScriptException::new("TypeError", format!("object {} does not exist", object))
    }

    /// Create a callable object.
    pub fn new_function<F>(&self, name: &str, body: F) -> ObjectId
    where
        F: Fn(&HeapEngine, &ScriptValue, &[ScriptValue]) -> Completion + 'static,
    {
        let mut object = HeapObject::new(Some("Function"));
        object.function = Some(Rc::new(body));
        object.put("name", Slot::Data(ScriptValue::string(name)));
        self.alloc(object)
    }

    /// Create a function and store it as a data property of `object`.
    pub fn define_method<F>(&self, object: ObjectId, name: &str, body: F) -> ObjectId
    where
        F: Fn(&HeapEngine, &ScriptValue, &[ScriptValue]) -> Completion + 'static,
    {
        let function = self.new_function(name, body);
        self.define(object, name, ScriptValue::Object(function));
        function
    }

    /// Define (or overwrite) a plain data property, bypassing accessors.
    pub fn define(&self, object: ObjectId, key: &str, value: ScriptValue) {
        if let Some(obj) = self.objects.borrow_mut().get_mut(object.0 as usize) {
            obj.put(key, Slot::Data(value));
        }
    }

    /// Create an array-like object (`length` plus indexed keys).
    pub fn new_array(&self, items: Vec<ScriptValue>) -> ObjectId {
        let array = self.alloc(HeapObject::new(Some("Array")));
        let len = items.len();
        for (i, item) in items.into_iter().enumerate() {
            self.define(array, &i.to_string(), item);
        }
        self.define(array, "length", ScriptValue::Number(len as f64));
        array
    }

    pub fn persistent_count(&self, object: ObjectId) -> u32 {
        self.objects
            .borrow()
            .get(object.0 as usize)
            .map(|o| o.persistent)
            .unwrap_or(0)
    }

    /// Current nesting of open handle scopes.
    pub fn scope_depth(&self) -> usize {
        self.scope_depth.get()
    }

    /// Total scopes ever opened.
    pub fn scopes_opened(&self) -> usize {
        self.scopes_opened.get()
    }

    pub fn object_count(&self) -> usize {
        self.objects.borrow().len()
    }
}

impl ScriptEngine for HeapEngine {
    fn open_scope(&self) -> ScopeToken {
        let depth = self.scope_depth.get() + 1;
        self.scope_depth.set(depth);
        self.scopes_opened.set(self.scopes_opened.get() + 1);
        ScopeToken { depth }
    }

    fn close_scope(&self, token: ScopeToken) {
        debug_assert_eq!(
            token.depth,
            self.scope_depth.get(),
            "handle scopes closed out of order"
        );
        self.scope_depth.set(token.depth.saturating_sub(1));
    }

    fn new_object(&self, class_name: Option<&str>) -> ObjectId {
        self.alloc(HeapObject::new(class_name))
    }

    fn get(&self, object: ObjectId, key: &str) -> Completion {
        let accessor = {
            let objects = self.objects.borrow();
            let Some(obj) = objects.get(object.0 as usize) else {
                return Completion::Throw(Self::no_such_object(object));
            };
            match obj.find(key) {
                Some(Slot::Data(value)) => return Completion::Return(value.clone()),
                Some(Slot::Accessor(accessor)) => accessor.clone(),
                None => return Completion::undefined(),
            }
        };
        accessor.get(self, object, key)
    }

    fn set(&self, object: ObjectId, key: &str, value: ScriptValue) -> Result<(), ScriptException> {
        let accessor = {
            let mut objects = self.objects.borrow_mut();
            let obj = objects
                .get_mut(object.0 as usize)
                .ok_or_else(|| Self::no_such_object(object))?;
            match obj.find_mut(key) {
                Some(Slot::Accessor(accessor)) => accessor.clone(),
                Some(slot) => {
                    *slot = Slot::Data(value);
                    return Ok(());
                }
                None => {
                    obj.properties.push((key.to_string(), Slot::Data(value)));
                    return Ok(());
                }
            }
        };
        accessor.set(self, object, key, value)
    }

    fn install_accessor(&self, object: ObjectId, key: &str, accessor: Rc<dyn Accessor>) {
        if let Some(obj) = self.objects.borrow_mut().get_mut(object.0 as usize) {
            obj.put(key, Slot::Accessor(accessor));
        }
    }

    fn has_accessor(&self, object: ObjectId, key: &str) -> bool {
        self.objects
            .borrow()
            .get(object.0 as usize)
            .and_then(|o| o.find(key))
            .map(|s| matches!(s, Slot::Accessor(_)))
            .unwrap_or(false)
    }

    fn is_callable(&self, value: &ScriptValue) -> bool {
        match value {
            ScriptValue::Object(id) => self
                .objects
                .borrow()
                .get(id.0 as usize)
                .map(|o| o.function.is_some())
                .unwrap_or(false),
            _ => false,
        }
    }

    fn call(&self, function: &ScriptValue, receiver: &ScriptValue, args: &[ScriptValue]) -> Completion {
        let native = match function {
            ScriptValue::Object(id) => self
                .objects
                .borrow()
                .get(id.0 as usize)
                .and_then(|o| o.function.clone()),
            _ => None,
        };
        match native {
            Some(body) => body(self, receiver, args),
            None => Completion::throw("TypeError", "value is not a function"),
        }
    }

    fn persist(&self, object: ObjectId) {
        if let Some(obj) = self.objects.borrow_mut().get_mut(object.0 as usize) {
            obj.persistent += 1;
        }
    }

    fn dispose(&self, object: ObjectId) {
        if let Some(obj) = self.objects.borrow_mut().get_mut(object.0 as usize) {
            obj.persistent = obj.persistent.saturating_sub(1);
        }
    }

    fn own_keys(&self, object: ObjectId) -> Vec<String> {
        self.objects
            .borrow()
            .get(object.0 as usize)
            .map(|o| o.properties.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    }

    fn class_name(&self, object: ObjectId) -> Option<String> {
        self.objects
            .borrow()
            .get(object.0 as usize)
            .and_then(|o| o.class_name.clone())
    }
}
