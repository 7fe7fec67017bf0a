//! Trace files for `ferry replay`.
//!
//! A trace declares the managed objects that get proxies, the script
//! functions installed on their script objects, and the boundary calls to
//! run in order:
//!
//! ```json
//! {
//!   "scripts": { "app.js": "button.emit = function () { ... }" },
//!   "objects": [
//!     { "peer": 1, "class": "Button",
//!       "functions": { "emit": { "return": { "bool": true } }, "getX": { "read": "x" } } }
//!   ],
//!   "steps": [
//!     { "op": "set_property", "target": 1, "name": "x", "value": { "int": 5 } },
//!     { "op": "call_property", "target": 1, "name": "getX" }
//!   ]
//! }
//! ```

use ferry_bridge::{
    Completion, HeapEngine, ManagedMap, ManagedValue, Marshaler, ObjectId, ScriptEngine, ScriptValue,
};
use ferry_diagnostics::ScriptException;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Trace {
    /// Script sources, by name, for exception presentation
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
    #[serde(default)]
    pub objects: Vec<ObjectFixture>,
    pub steps: Vec<Step>,
}

impl Trace {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// A managed object that gets a proxy before the steps run.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectFixture {
    pub peer: u64,
    #[serde(default = "default_class")]
    pub class: String,
    /// Script functions defined on the proxy's script object
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionFixture>,
    /// Plain data properties defined on the script object
    #[serde(default)]
    pub data: ManagedMap,
}

fn default_class() -> String {
    "Object".to_string()
}

/// What a fixture function does when called.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionFixture {
    /// Return a constant
    Return(ManagedValue),
    /// Return `this[name]`, going through bridged accessors
    Read(String),
    Throw(ThrowFixture),
    /// Complete without a value
    Empty,
    /// Return the received arguments as an array
    EchoArgs,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThrowFixture {
    #[serde(default = "default_error_name")]
    pub name: String,
    pub message: String,
    pub source: Option<String>,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

fn default_error_name() -> String {
    "Error".to_string()
}

impl ThrowFixture {
    pub fn exception(&self) -> ScriptException {
        let exception = ScriptException::new(&self.name, &self.message);
        match &self.source {
            Some(source) => exception.at(source, self.line.max(1), self.column.max(1)),
            None => exception,
        }
    }
}

impl FunctionFixture {
    /// Install this fixture as method `name` of `object`.
    pub fn install(
        &self,
        engine: &HeapEngine,
        marshaler: Rc<dyn Marshaler>,
        object: ObjectId,
        name: &str,
    ) {
        let fixture = self.clone();
        engine.define_method(object, name, move |engine, this, args| {
            fixture.call(engine, marshaler.as_ref(), this, args)
        });
    }

    fn call(
        &self,
        engine: &HeapEngine,
        marshaler: &dyn Marshaler,
        this: &ScriptValue,
        args: &[ScriptValue],
    ) -> Completion {
        match self {
            FunctionFixture::Return(value) => match marshaler.to_script(engine, value) {
                Ok(value) => Completion::Return(value),
                Err(e) => Completion::throw("RangeError", e.to_string()),
            },
            FunctionFixture::Read(key) => match this.as_object() {
                Some(object) => engine.get(object, key),
                None => Completion::throw("TypeError", "receiver is not an object"),
            },
            FunctionFixture::Throw(thrown) => Completion::Throw(thrown.exception()),
            FunctionFixture::Empty => Completion::Empty,
            FunctionFixture::EchoArgs => Completion::Return(ScriptValue::Object(engine.new_array(args.to_vec()))),
        }
    }
}

/// One boundary call. Targets are managed peers declared under `objects`;
/// a peer without a proxy is addressed as an unbound managed object.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    InitObject {
        target: u64,
        #[serde(default = "default_class")]
        class: String,
    },
    SetProperty {
        target: u64,
        name: String,
        value: ManagedValue,
    },
    GetProperty {
        target: u64,
        name: String,
    },
    /// A write made by script code
    ScriptSet {
        target: u64,
        name: String,
        value: ManagedValue,
    },
    CallProperty {
        target: u64,
        name: String,
        args: Option<Vec<ManagedValue>>,
    },
    FireEvent {
        emitter: u64,
        source: Option<u64>,
        name: String,
        data: Option<ManagedMap>,
        #[serde(default)]
        bubble: bool,
        #[serde(default)]
        report_success: bool,
        #[serde(default)]
        code: i32,
        error: Option<String>,
    },
    PropagateContext {
        target: u64,
        context: ManagedValue,
    },
    Detach {
        target: u64,
    },
    Release {
        target: u64,
    },
    /// The managed object was collected
    Forget {
        target: u64,
    },
}

impl Step {
    pub fn op(&self) -> &'static str {
        match self {
            Step::InitObject { .. } => "init_object",
            Step::SetProperty { .. } => "set_property",
            Step::GetProperty { .. } => "get_property",
            Step::ScriptSet { .. } => "script_set",
            Step::CallProperty { .. } => "call_property",
            Step::FireEvent { .. } => "fire_event",
            Step::PropagateContext { .. } => "propagate_context",
            Step::Detach { .. } => "detach",
            Step::Release { .. } => "release",
            Step::Forget { .. } => "forget",
        }
    }
}
