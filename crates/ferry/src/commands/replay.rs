//! Replay command - run a trace of boundary calls against the reference engine

use anyhow::{bail, Context, Result};
use clap::Args;
use ferry_bridge::{
    Bridge, BridgeConfig, BridgeError, ClassDescriptor, FireEvent, HeapEngine, ManagedRef,
    ManagedRuntime, ManagedValue, Marshaler, PresentationFormat, RawHandle, ScriptEngine,
    StandardMarshaler, Target,
};
use ferry_diagnostics::DiagnosticChannel;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use super::trace::{ObjectFixture, Step, Trace};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Trace file (JSON)
    pub trace: PathBuf,

    /// Bridge configuration (ferry.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Fail if any script exception was reported
    #[arg(long)]
    pub strict: bool,
}

/// A bridged property written by script code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyChange {
    pub peer: ManagedRef,
    pub name: String,
    pub value: ManagedValue,
}

/// Managed side of a replay: records what script code wrote.
#[derive(Default)]
struct TraceRuntime {
    changes: RefCell<Vec<PropertyChange>>,
}

impl ManagedRuntime for TraceRuntime {
    fn on_property_changed(&self, peer: ManagedRef, name: &str, value: ManagedValue) {
        log::info!("{}.{} changed from script", peer, name);
        self.changes.borrow_mut().push(PropertyChange {
            peer,
            name: name.to_string(),
            value,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepResult {
    Done,
    Handle(String),
    Flag(bool),
    Value(ManagedValue),
    /// The bridge refused the call
    Error(String),
}

#[derive(Debug, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    pub result: StepResult,
}

/// A bridge over the reference engine, plus the peer -> handle bookkeeping
/// the managed side would normally keep on its objects.
pub struct Replay {
    engine: Rc<HeapEngine>,
    marshaler: Rc<StandardMarshaler>,
    runtime: Rc<TraceRuntime>,
    channel: Rc<DiagnosticChannel>,
    bridge: Bridge,
    handles: HashMap<u64, RawHandle>,
}

impl Replay {
    pub fn new(config: BridgeConfig, channel: DiagnosticChannel) -> Self {
        let engine = Rc::new(HeapEngine::new());
        let marshaler = Rc::new(StandardMarshaler::new());
        let runtime = Rc::new(TraceRuntime::default());
        let channel = Rc::new(channel);
        let bridge = Bridge::new(engine.clone(), runtime.clone(), channel.clone())
            .with_marshaler(marshaler.clone())
            .with_config(config);
        Self {
            engine,
            marshaler,
            runtime,
            channel,
            bridge,
            handles: HashMap::new(),
        }
    }

    fn target(&self, peer: u64) -> Target {
        Target::new(ManagedRef(peer), self.handle(peer))
    }

    fn handle(&self, peer: u64) -> RawHandle {
        self.handles.get(&peer).copied().unwrap_or(0)
    }

    /// Create the proxy for a fixture object and populate its script object.
    fn declare(&mut self, fixture: &ObjectFixture) -> Result<(), BridgeError> {
        let handle = self
            .bridge
            .init_object(&ClassDescriptor::new(&fixture.class), ManagedRef(fixture.peer))?;
        self.handles.insert(fixture.peer, handle.to_raw());

        let object = self.bridge.resolve(handle.to_raw())?;
        for (key, value) in &fixture.data {
            let value = self.marshaler.to_script(self.engine.as_ref(), value)?;
            self.engine.define(object, key, value);
        }
        for (name, function) in &fixture.functions {
            function.install(&self.engine, self.marshaler.clone(), object, name);
        }
        Ok(())
    }

    fn step(&mut self, step: &Step) -> Result<StepResult, BridgeError> {
        let bridge = &self.bridge;
        let result = match step {
            Step::InitObject { target, class } => {
                let handle = bridge.init_object(&ClassDescriptor::new(class), ManagedRef(*target))?;
                self.handles.insert(*target, handle.to_raw());
                StepResult::Handle(handle.to_string())
            }
            Step::SetProperty { target, name, value } => {
                bridge.set_property(self.target(*target), name, value)?;
                StepResult::Done
            }
            Step::GetProperty { target, name } => {
                StepResult::Value(bridge.get_property(self.target(*target), name)?)
            }
            Step::ScriptSet { target, name, value } => {
                let object = bridge.resolve(self.handle(*target))?;
                let value = self.marshaler.to_script(self.engine.as_ref(), value)?;
                match self.engine.set(object, name, value) {
                    Ok(()) => StepResult::Done,
                    Err(exception) => StepResult::Error(exception.to_string()),
                }
            }
            Step::CallProperty { target, name, args } => {
                StepResult::Value(bridge.call_property(self.handle(*target), name, args.as_deref())?)
            }
            Step::FireEvent {
                emitter,
                source,
                name,
                data,
                bubble,
                report_success,
                code,
                error,
            } => {
                let event = FireEvent {
                    name: name.clone(),
                    data: data.clone(),
                    bubble: *bubble,
                    report_success: *report_success,
                    code: *code,
                    error_message: error.clone(),
                };
                let source = source.map(|peer| self.target(peer));
                StepResult::Flag(bridge.fire_event(self.target(*emitter), source, &event)?)
            }
            Step::PropagateContext { target, context } => {
                bridge.propagate_context(self.target(*target), context)?;
                StepResult::Done
            }
            Step::Detach { target } => StepResult::Flag(bridge.detach(self.handle(*target))),
            Step::Release { target } => StepResult::Flag(bridge.release(self.handle(*target))),
            Step::Forget { target } => StepResult::Flag(bridge.forget(ManagedRef(*target))),
        };
        Ok(result)
    }

    /// Declare the fixtures, then run every step. Bridge errors are recorded
    /// as step results; the replay keeps going.
    pub fn run(&mut self, trace: &Trace) -> Result<Vec<StepOutcome>> {
        for (name, source) in &trace.scripts {
            self.channel.add_script(name, source);
        }
        for fixture in &trace.objects {
            self.declare(fixture)
                .with_context(|| format!("Failed to declare object {}", ManagedRef(fixture.peer)))?;
        }

        let mut outcomes = Vec::with_capacity(trace.steps.len());
        for (index, step) in trace.steps.iter().enumerate() {
            let result = self.step(step).unwrap_or_else(|e| {
                log::warn!("step {} ({}) failed: {}", index, step.op(), e);
                StepResult::Error(e.to_string())
            });
            outcomes.push(StepOutcome {
                index,
                op: step.op(),
                result,
            });
        }
        Ok(outcomes)
    }

    pub fn changes(&self) -> Vec<PropertyChange> {
        self.runtime.changes.borrow().clone()
    }

    pub fn report_count(&self) -> usize {
        self.channel.report_count()
    }

    pub fn live_proxies(&self) -> usize {
        self.bridge.live_proxies()
    }
}

fn render(value: &ManagedValue) -> String {
    match value {
        ManagedValue::Undefined => "undefined".to_string(),
        ManagedValue::Null => "null".to_string(),
        ManagedValue::Bool(b) => b.to_string(),
        ManagedValue::Int(n) => n.to_string(),
        ManagedValue::Double(n) => n.to_string(),
        ManagedValue::String(s) => format!("{:?}", s),
        ManagedValue::Array(items) => {
            let items: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", items.join(", "))
        }
        ManagedValue::Map(map) => {
            let entries: Vec<String> = map.iter().map(|(k, v)| format!("{}: {}", k, render(v))).collect();
            format!("{{{}}}", entries.join(", "))
        }
        ManagedValue::Object(peer) => peer.to_string(),
    }
}

fn print_text(outcomes: &[StepOutcome], changes: &[PropertyChange], use_color: bool) {
    for outcome in outcomes {
        let result = match &outcome.result {
            StepResult::Done => "ok".to_string(),
            StepResult::Handle(handle) => format!("handle {}", handle),
            StepResult::Flag(flag) => flag.to_string(),
            StepResult::Value(value) => render(value),
            StepResult::Error(message) if use_color => {
                console::style(format!("error: {}", message)).red().to_string()
            }
            StepResult::Error(message) => format!("error: {}", message),
        };
        println!("{:>3}  {:<18} {}", outcome.index, outcome.op, result);
    }

    if !changes.is_empty() {
        println!();
        for change in changes {
            println!("  {}.{} = {} (from script)", change.peer, change.name, render(&change.value));
        }
    }
}

pub fn run(args: ReplayArgs, format: OutputFormat, use_color: bool, quiet: bool) -> Result<()> {
    let text = fs::read_to_string(&args.trace)
        .with_context(|| format!("Failed to read trace {}", args.trace.display()))?;
    let trace = Trace::from_json(&text)
        .with_context(|| format!("Invalid trace {}", args.trace.display()))?;

    let mut config = match &args.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };
    if !use_color {
        config.diagnostics.color = false;
    }
    if quiet {
        config.diagnostics.format = PresentationFormat::Silent;
    }

    let channel = config.channel();
    let mut replay = Replay::new(config, channel);
    let outcomes = replay.run(&trace)?;
    let changes = replay.changes();
    let reports = replay.report_count();

    match format {
        OutputFormat::Text => {
            if !quiet {
                print_text(&outcomes, &changes, use_color);
                replay.channel.emit_summary()?;
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "steps": outcomes,
                "changes": changes,
                "reports": reports,
                "live_proxies": replay.live_proxies(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    if args.strict && reports > 0 {
        bail!("{} script exception(s) reported", reports);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay(trace: &str) -> (Replay, Vec<StepResult>) {
        let trace = Trace::from_json(trace).unwrap();
        let mut replay = Replay::new(BridgeConfig::default(), DiagnosticChannel::silent());
        let results = replay
            .run(&trace)
            .unwrap()
            .into_iter()
            .map(|o| o.result)
            .collect();
        (replay, results)
    }

    #[test]
    fn test_property_and_call_interplay() {
        let (_, results) = replay(
            r#"{
                "objects": [ { "peer": 1, "functions": { "getX": { "read": "x" } } } ],
                "steps": [
                    { "op": "set_property", "target": 1, "name": "x", "value": { "int": 5 } },
                    { "op": "call_property", "target": 1, "name": "getX", "args": [] },
                    { "op": "get_property", "target": 1, "name": "x" }
                ]
            }"#,
        );
        assert_eq!(
            results,
            vec![
                StepResult::Done,
                StepResult::Value(ManagedValue::Int(5)),
                StepResult::Value(ManagedValue::Int(5)),
            ]
        );
    }

    #[test]
    fn test_events_and_reports() {
        let (replay, results) = replay(
            r#"{
                "objects": [
                    { "peer": 1, "functions": { "emit": { "return": { "bool": true } } } },
                    { "peer": 2, "functions": { "emit": { "throw": { "message": "boom" } } } },
                    { "peer": 3 }
                ],
                "steps": [
                    { "op": "fire_event", "emitter": 1, "name": "click", "data": { "foo": { "int": 1 } } },
                    { "op": "fire_event", "emitter": 2, "source": 1, "name": "click" },
                    { "op": "fire_event", "emitter": 3, "name": "click", "bubble": true }
                ]
            }"#,
        );
        assert_eq!(
            results,
            vec![StepResult::Flag(true), StepResult::Flag(false), StepResult::Flag(false)]
        );
        assert_eq!(replay.report_count(), 1);
    }

    #[test]
    fn test_lifecycle_steps() {
        let (replay, results) = replay(
            r#"{
                "objects": [ { "peer": 1 } ],
                "steps": [
                    { "op": "release", "target": 1 },
                    { "op": "detach", "target": 1 },
                    { "op": "release", "target": 1 },
                    { "op": "release", "target": 1 },
                    { "op": "call_property", "target": 1, "name": "f" }
                ]
            }"#,
        );
        assert_eq!(
            &results[..4],
            &[
                StepResult::Flag(false),
                StepResult::Flag(true),
                StepResult::Flag(true),
                StepResult::Flag(false),
            ]
        );
        assert!(matches!(results[4], StepResult::Error(_)));
        assert_eq!(replay.live_proxies(), 0);
    }

    #[test]
    fn test_unbound_peer_then_proxy() {
        let (replay, results) = replay(
            r#"{
                "steps": [
                    { "op": "set_property", "target": 7, "name": "x", "value": { "int": 5 } },
                    { "op": "init_object", "target": 7, "class": "View" },
                    { "op": "get_property", "target": 7, "name": "x" },
                    { "op": "forget", "target": 7 },
                    { "op": "set_property", "target": 8, "name": "y", "value": { "int": 1 } },
                    { "op": "forget", "target": 8 },
                    { "op": "forget", "target": 8 }
                ]
            }"#,
        );
        assert!(matches!(results[1], StepResult::Handle(_)));
        assert_eq!(
            &results[2..],
            &[
                StepResult::Value(ManagedValue::Int(5)),
                StepResult::Flag(false),
                StepResult::Done,
                StepResult::Flag(true),
                StepResult::Flag(false),
            ]
        );
        assert_eq!(replay.live_proxies(), 1);
    }

    #[test]
    fn test_script_writes_are_recorded() {
        let (replay, results) = replay(
            r#"{
                "objects": [ { "peer": 4 } ],
                "steps": [
                    { "op": "set_property", "target": 4, "name": "title", "value": { "string": "a" } },
                    { "op": "script_set", "target": 4, "name": "title", "value": { "string": "b" } }
                ]
            }"#,
        );
        assert_eq!(results, vec![StepResult::Done, StepResult::Done]);
        assert_eq!(
            replay.changes(),
            vec![PropertyChange {
                peer: ManagedRef(4),
                name: "title".to_string(),
                value: ManagedValue::String("b".to_string()),
            }]
        );
    }

    #[test]
    fn test_render() {
        let mut map = ferry_bridge::ManagedMap::new();
        map.insert("a".to_string(), ManagedValue::Array(vec![1i64.into(), "x".into()]));
        assert_eq!(render(&ManagedValue::Map(map)), r#"{a: [1, "x"]}"#);
        assert_eq!(render(&ManagedValue::Object(ManagedRef(9))), "@9");
    }
}
