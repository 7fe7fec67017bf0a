//! End-to-end tests driving the bridge over the reference engine.

use crate::bridge::{Bridge, Target};
use crate::engine::heap::HeapEngine;
use crate::engine::{Completion, ScriptEngine};
use crate::error::{BridgeError, ConversionError};
use crate::events::FireEvent;
use crate::host;
use crate::managed::{ClassDescriptor, ManagedMap, ManagedRef, ManagedRuntime, ManagedValue};
use crate::value::{ObjectId, ScriptValue};
use ferry_diagnostics::{DiagnosticChannel, DiagnosticCode};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
struct RecordingRuntime {
    changes: RefCell<Vec<(ManagedRef, String, ManagedValue)>>,
}

impl ManagedRuntime for RecordingRuntime {
    fn on_property_changed(&self, peer: ManagedRef, name: &str, value: ManagedValue) {
        self.changes.borrow_mut().push((peer, name.to_string(), value));
    }
}

struct Harness {
    engine: Rc<HeapEngine>,
    runtime: Rc<RecordingRuntime>,
    channel: Rc<DiagnosticChannel>,
    bridge: Bridge,
}

impl Harness {
    fn new() -> Self {
        let engine = Rc::new(HeapEngine::new());
        let runtime = Rc::new(RecordingRuntime::default());
        let channel = Rc::new(DiagnosticChannel::silent());
        let bridge = Bridge::new(engine.clone(), runtime.clone(), channel.clone());
        Self {
            engine,
            runtime,
            channel,
            bridge,
        }
    }

    /// Create a proxy for managed object `@id`.
    fn proxy(&self, id: u64) -> (Target, ObjectId) {
        let peer = ManagedRef(id);
        let handle = self
            .bridge
            .init_object(&ClassDescriptor::new("View"), peer)
            .unwrap();
        let target = Target::proxy(peer, handle);
        (target, self.bridge.resolve(handle.to_raw()).unwrap())
    }

    fn reports(&self) -> usize {
        self.channel.report_count()
    }

    fn count_of(&self, code: DiagnosticCode) -> usize {
        self.channel.diagnostics().count_of(code)
    }
}

fn click() -> FireEvent {
    let mut data = ManagedMap::new();
    data.insert("foo".to_string(), ManagedValue::Int(1));
    FireEvent::new("click").with_data(data).bubbles(true)
}

#[test]
fn test_release_detached_proxy() {
    let h = Harness::new();
    let (target, object) = h.proxy(1);
    assert_eq!(h.engine.persistent_count(object), 1);

    assert!(h.bridge.detach(target.handle));
    assert!(h.bridge.release(target.handle));

    assert_eq!(h.bridge.live_proxies(), 0);
    assert_eq!(h.engine.persistent_count(object), 0);
    assert!(matches!(
        h.bridge.resolve(target.handle),
        Err(BridgeError::StaleHandle(_))
    ));
}

#[test]
fn test_release_attached_proxy_is_refused() {
    let h = Harness::new();
    let (target, object) = h.proxy(1);

    assert!(!h.bridge.release(target.handle));
    assert_eq!(h.bridge.resolve(target.handle).unwrap(), object);
    assert_eq!(h.bridge.is_detached(target.handle), Some(false));
    assert_eq!(h.count_of(DiagnosticCode::ReleaseWhileAttached), 1);
    assert_eq!(h.reports(), 0);

    let notice = h
        .channel
        .diagnostics()
        .into_iter()
        .find(|d| d.code == DiagnosticCode::ReleaseWhileAttached)
        .unwrap();
    assert_eq!(notice.notes, vec!["operation: release".to_string()]);
    assert!(notice.help.is_some());
}

#[test]
fn test_double_release() {
    let h = Harness::new();
    let (target, _) = h.proxy(1);
    h.bridge.detach(target.handle);

    assert!(h.bridge.release(target.handle));
    assert!(!h.bridge.release(target.handle));
    assert!(!h.bridge.detach(target.handle));
    assert!(!h.bridge.release(0));
}

#[test]
fn test_freed_handle_does_not_resolve_after_slot_reuse() {
    let h = Harness::new();
    let (first, _) = h.proxy(1);
    h.bridge.detach(first.handle);
    h.bridge.release(first.handle);

    let (second, object) = h.proxy(2);
    assert_ne!(first.handle, second.handle);
    assert!(h.bridge.resolve(first.handle).is_err());
    assert_eq!(h.bridge.resolve(second.handle).unwrap(), object);
}

#[test]
fn test_init_object_twice_is_rejected() {
    let h = Harness::new();
    let (target, _) = h.proxy(1);

    let again = h.bridge.init_object(&ClassDescriptor::new("View"), target.peer);
    assert!(matches!(again, Err(BridgeError::AlreadyBound(ManagedRef(1), _))));
    assert_eq!(h.bridge.live_proxies(), 1);
}

#[test]
fn test_property_round_trip() {
    let h = Harness::new();
    let (target, object) = h.proxy(1);

    for n in 0..3 {
        h.bridge.set_property(target, "x", &ManagedValue::Int(n)).unwrap();
        assert_eq!(h.bridge.get_property(target, "x").unwrap(), ManagedValue::Int(n));
    }
    assert!(h.engine.has_accessor(object, "x"));
    assert_eq!(h.bridge.bridged_properties(target).unwrap(), vec!["x".to_string()]);
    // Writes from the managed side are not echoed back to it
    assert!(h.runtime.changes.borrow().is_empty());
}

#[test]
fn test_set_property_then_call_getter() {
    let h = Harness::new();
    let (target, object) = h.proxy(1);
    h.engine.define_method(object, "getX", |engine, this, _| match this {
        ScriptValue::Object(o) => engine.get(*o, "x"),
        _ => Completion::undefined(),
    });

    h.bridge.set_property(target, "x", &ManagedValue::Int(5)).unwrap();
    let result = h.bridge.call_property(target.handle, "getX", Some(&[])).unwrap();
    assert_eq!(result, ManagedValue::Int(5));
}

#[test]
fn test_script_write_reaches_managed_peer() {
    let h = Harness::new();
    let (target, object) = h.proxy(7);
    h.bridge.set_property(target, "title", &"a".into()).unwrap();

    h.engine.set(object, "title", ScriptValue::string("b")).unwrap();

    assert_eq!(
        h.runtime.changes.borrow().as_slice(),
        &[(ManagedRef(7), "title".to_string(), ManagedValue::String("b".into()))]
    );
    assert_eq!(
        h.bridge.get_property(target, "title").unwrap(),
        ManagedValue::String("b".into())
    );
}

#[test]
fn test_unbound_target_properties() {
    let h = Harness::new();
    let target = Target::unbound(ManagedRef(3));

    h.bridge.set_property(target, "x", &ManagedValue::Bool(true)).unwrap();
    assert_eq!(h.bridge.get_property(target, "x").unwrap(), ManagedValue::Bool(true));
}

#[test]
fn test_unbound_properties_survive_proxy_creation() {
    let h = Harness::new();
    let peer = ManagedRef(42);
    h.bridge
        .set_property(Target::unbound(peer), "x", &ManagedValue::Int(5))
        .unwrap();

    let handle = h.bridge.init_object(&ClassDescriptor::new("View"), peer).unwrap();
    let target = Target::proxy(peer, handle);
    assert_eq!(h.bridge.get_property(target, "x").unwrap(), ManagedValue::Int(5));
    assert_eq!(
        h.bridge.get_property(Target::unbound(peer), "x").unwrap(),
        ManagedValue::Int(5)
    );

    // The proxy took over the wrapper's persistent reference
    let object = h.bridge.resolve(handle.to_raw()).unwrap();
    assert_eq!(h.engine.persistent_count(object), 1);

    h.engine.set(object, "x", ScriptValue::Number(6.0)).unwrap();
    assert_eq!(
        h.runtime.changes.borrow().as_slice(),
        &[(peer, "x".to_string(), ManagedValue::Int(6))]
    );

    h.bridge.detach(handle.to_raw());
    assert!(h.bridge.release(handle.to_raw()));
    assert_eq!(h.engine.persistent_count(object), 0);
    assert_eq!(h.bridge.properties.borrow().object_count(), 0);
}

#[test]
fn test_forget_frees_unbound_wrappers() {
    let h = Harness::new();
    let mut wrappers = Vec::new();
    for id in 0..1000 {
        let target = Target::unbound(ManagedRef(id));
        h.bridge.set_property(target, "x", &ManagedValue::Int(1)).unwrap();
        wrappers.push(h.bridge.resolve_target(target).unwrap().0);
    }
    assert_eq!(h.bridge.properties.borrow().object_count(), 1000);

    for id in 0..1000 {
        assert!(h.bridge.forget(ManagedRef(id)));
    }
    assert_eq!(h.bridge.properties.borrow().object_count(), 0);
    assert!(wrappers.iter().all(|w| h.engine.persistent_count(*w) == 0));
    assert!(!h.bridge.forget(ManagedRef(0)));

    // Proxies are torn down through release, not forget
    let (target, object) = h.proxy(5000);
    assert!(!h.bridge.forget(target.peer));
    assert_eq!(h.engine.persistent_count(object), 1);
    assert_eq!(h.engine.scope_depth(), 0);
}

#[test]
fn test_release_drops_companion_entries() {
    let h = Harness::new();
    let (target, _) = h.proxy(1);
    h.bridge.set_property(target, "x", &ManagedValue::Int(1)).unwrap();
    assert_eq!(h.bridge.properties.borrow().object_count(), 1);

    h.bridge.detach(target.handle);
    h.bridge.release(target.handle);
    assert_eq!(h.bridge.properties.borrow().object_count(), 0);
}

#[test]
fn test_fire_event_handled_only_on_true() {
    let cases = [
        (Completion::Return(ScriptValue::Boolean(true)), true),
        (Completion::Return(ScriptValue::Boolean(false)), false),
        (Completion::Return(ScriptValue::Undefined), false),
        (Completion::Return(ScriptValue::Number(1.0)), false),
        (Completion::Return(ScriptValue::string("true")), false),
        (Completion::Empty, false),
    ];

    for (completion, expected) in cases {
        let h = Harness::new();
        let (target, object) = h.proxy(1);
        h.engine
            .define_method(object, "emit", move |_, _, _| completion.clone());

        assert_eq!(h.bridge.fire_event(target, None, &click()).unwrap(), expected);
        assert_eq!(h.reports(), 0);
    }
}

#[test]
fn test_fire_event_without_emit() {
    let h = Harness::new();
    let (target, _) = h.proxy(1);
    let objects = h.engine.object_count();

    assert!(!h.bridge.fire_event(target, None, &click()).unwrap());
    // No payload was built
    assert_eq!(h.engine.object_count(), objects);
    assert_eq!(h.reports(), 0);
}

#[test]
fn test_fire_event_emit_not_callable() {
    let h = Harness::new();
    let (target, object) = h.proxy(1);
    h.engine.define(object, "emit", ScriptValue::string("not a function"));
    let objects = h.engine.object_count();

    assert!(!h.bridge.fire_event(target, None, &click()).unwrap());
    assert_eq!(h.engine.object_count(), objects);
    assert_eq!(h.reports(), 0);
}

#[test]
fn test_fire_event_unbound_source() {
    let h = Harness::new();
    let (emitter, object) = h.proxy(1);
    let seen: Rc<RefCell<Option<ScriptValue>>> = Rc::default();
    let sink = seen.clone();
    h.engine.define_method(object, "emit", move |engine, _, args| {
        let payload = args.get(1).and_then(ScriptValue::as_object);
        *sink.borrow_mut() = match payload.map(|p| engine.get(p, "source")) {
            Some(Completion::Return(source)) => Some(source),
            _ => None,
        };
        ScriptValue::Boolean(true).into()
    });

    let source = Target::unbound(ManagedRef(9));
    assert!(h.bridge.fire_event(emitter, Some(source), &click()).unwrap());
    let wrapper = h.bridge.resolve_target(source).unwrap().0;
    assert_eq!(*seen.borrow(), Some(ScriptValue::Object(wrapper)));

    // A later proxy for the source keeps the identity script code saw
    let handle = h
        .bridge
        .init_object(&ClassDescriptor::new("Button"), ManagedRef(9))
        .unwrap();
    assert_eq!(h.bridge.resolve(handle.to_raw()).unwrap(), wrapper);
}

#[test]
fn test_fire_event_handler_throws() {
    let h = Harness::new();
    let (target, object) = h.proxy(1);
    h.engine
        .define_method(object, "emit", |_, _, _| Completion::throw("Error", "boom"));

    assert!(!h.bridge.fire_event(target, None, &click()).unwrap());
    assert_eq!(h.reports(), 1);
    assert_eq!(h.count_of(DiagnosticCode::EmitThrew), 1);
}

#[test]
fn test_fire_event_payload() {
    let h = Harness::new();
    let (emitter, object) = h.proxy(1);
    let (source, source_object) = h.proxy(2);

    let seen: Rc<RefCell<Vec<Vec<ScriptValue>>>> = Rc::default();
    let sink = seen.clone();
    h.engine.define_method(object, "emit", move |_, _, args| {
        sink.borrow_mut().push(args.to_vec());
        ScriptValue::Boolean(true).into()
    });

    assert!(h.bridge.fire_event(emitter, Some(source), &click()).unwrap());
    assert!(h.bridge.fire_event(emitter, Some(emitter), &click()).unwrap());

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0][0], ScriptValue::string("click"));

    let payload = seen[0][1].as_object().unwrap();
    let keys = h.engine.own_keys(payload);
    assert_eq!(keys, vec!["foo", "bubbles", "source"]);
    assert_eq!(h.engine.get(payload, "source"), Completion::Return(ScriptValue::Object(source_object)));

    let payload = seen[1][1].as_object().unwrap();
    assert_eq!(h.engine.get(payload, "source"), Completion::Return(ScriptValue::Object(object)));
}

#[test]
fn test_fire_event_status_fields() {
    let h = Harness::new();
    let (target, object) = h.proxy(1);
    let seen: Rc<RefCell<Option<ScriptValue>>> = Rc::default();
    let sink = seen.clone();
    h.engine.define_method(object, "emit", move |_, _, args| {
        *sink.borrow_mut() = args.get(1).cloned();
        Completion::Empty
    });

    let event = FireEvent::new("load").with_code(404).with_error("not found");
    h.bridge.fire_event(target, None, &event).unwrap();

    let payload = seen.borrow().as_ref().and_then(ScriptValue::as_object).unwrap();
    assert_eq!(
        h.engine.own_keys(payload),
        vec!["bubbles", "source", "success", "code", "error"]
    );
    assert_eq!(h.engine.get(payload, "success"), Completion::Return(ScriptValue::Boolean(false)));
    assert_eq!(h.engine.get(payload, "code"), Completion::Return(ScriptValue::Number(404.0)));
}

#[test]
fn test_call_property_missing_or_not_callable() {
    let h = Harness::new();
    let (target, object) = h.proxy(1);
    h.engine.define(object, "count", ScriptValue::Number(3.0));

    assert_eq!(
        h.bridge.call_property(target.handle, "absent", None).unwrap(),
        ManagedValue::Undefined
    );
    assert_eq!(
        h.bridge.call_property(target.handle, "count", None).unwrap(),
        ManagedValue::Undefined
    );
    assert_eq!(h.reports(), 0);
}

#[test]
fn test_call_property_throw_is_reported_once() {
    let h = Harness::new();
    let (target, object) = h.proxy(1);
    h.engine
        .define_method(object, "explode", |_, _, _| Completion::throw("TypeError", "bad"));

    let result = h.bridge.call_property(target.handle, "explode", None).unwrap();
    assert_eq!(result, ManagedValue::Undefined);
    assert_eq!(h.reports(), 1);
    assert_eq!(h.count_of(DiagnosticCode::CallPropertyThrew), 1);
}

#[test]
fn test_call_property_refuses_huge_array() {
    let h = Harness::new();
    let (target, object) = h.proxy(1);
    h.engine.define_method(object, "huge", |engine, _, _| {
        let array = engine.new_object(Some("Array"));
        engine.define(array, "length", ScriptValue::Number(3e7));
        ScriptValue::Object(array).into()
    });

    assert!(matches!(
        h.bridge.call_property(target.handle, "huge", None),
        Err(BridgeError::Conversion(ConversionError::TooLarge(_)))
    ));
    assert_eq!(h.engine.scope_depth(), 0);
}

#[test]
fn test_call_property_passes_arguments_and_receiver() {
    let h = Harness::new();
    let (target, object) = h.proxy(1);
    h.engine.define_method(object, "echo", move |_, this, args| {
        let mut items = vec![this.clone()];
        items.extend_from_slice(args);
        ScriptValue::Number(items.len() as f64).into()
    });

    let args = [ManagedValue::Int(1), ManagedValue::String("two".into())];
    let result = h.bridge.call_property(target.handle, "echo", Some(&args)).unwrap();
    assert_eq!(result, ManagedValue::Int(3));
}

#[test]
fn test_call_property_on_bad_handles() {
    let h = Harness::new();
    let (target, _) = h.proxy(1);
    h.bridge.detach(target.handle);
    h.bridge.release(target.handle);

    assert!(matches!(
        h.bridge.call_property(0, "f", None),
        Err(BridgeError::NullHandle)
    ));
    assert!(matches!(
        h.bridge.call_property(target.handle, "f", None),
        Err(BridgeError::StaleHandle(_))
    ));
    assert_eq!(h.count_of(DiagnosticCode::StaleHandle), 1);
}

#[test]
fn test_propagate_context() {
    let h = Harness::new();
    let (target, object) = h.proxy(1);
    let (window, window_object) = h.proxy(2);

    let seen: Rc<RefCell<Vec<ScriptValue>>> = Rc::default();
    let sink = seen.clone();
    h.engine.define_method(object, "setWindow", move |_, _, args| {
        sink.borrow_mut().extend_from_slice(args);
        Completion::Empty
    });

    h.bridge.propagate_context(target, &ManagedValue::Null).unwrap();
    assert!(seen.borrow().is_empty());

    h.bridge
        .propagate_context(target, &ManagedValue::Object(window.peer))
        .unwrap();
    assert_eq!(seen.borrow().as_slice(), &[ScriptValue::Object(window_object)]);
}

#[test]
fn test_propagate_context_without_method_or_with_throw() {
    let h = Harness::new();
    let (target, object) = h.proxy(1);

    h.bridge
        .propagate_context(target, &ManagedValue::String("ctx".into()))
        .unwrap();
    assert_eq!(h.reports(), 0);

    h.engine
        .define_method(object, "setWindow", |_, _, _| Completion::throw("Error", "no"));
    h.bridge
        .propagate_context(target, &ManagedValue::String("ctx".into()))
        .unwrap();
    assert_eq!(h.count_of(DiagnosticCode::ContextMethodThrew), 1);
}

#[test]
fn test_scopes_are_balanced() {
    let h = Harness::new();
    let (target, object) = h.proxy(1);
    h.engine
        .define_method(object, "emit", |_, _, _| Completion::throw("Error", "x"));

    h.bridge.set_property(target, "x", &ManagedValue::Int(1)).unwrap();
    h.bridge.fire_event(target, None, &click()).unwrap();
    h.bridge.call_property(target.handle, "emit", None).unwrap();
    let _ = h.bridge.call_property(0xdead_0000_0001, "x", None);
    h.bridge.release(target.handle);

    assert_eq!(h.engine.scope_depth(), 0);
    assert!(h.engine.scopes_opened() >= 6);
}

#[test]
fn test_handlers_reenter_through_host() {
    let h = Harness::new();
    let (target, object) = h.proxy(1);
    let engine = h.engine.clone();
    let runtime = h.runtime.clone();

    engine.define_method(object, "emit", move |_, _, args| {
        if args.first() != Some(&ScriptValue::string("click")) {
            return ScriptValue::Boolean(true).into();
        }
        let nested = host::with_bridge(|bridge| {
            bridge.set_property(target, "clicked", &ManagedValue::Bool(true))?;
            bridge.fire_event(target, None, &FireEvent::new("inner"))
        });
        ScriptValue::Boolean(matches!(nested, Some(Ok(true)))).into()
    });

    let bridge = host::install(h.bridge);
    assert!(host::is_installed());
    assert!(bridge.fire_event(target, None, &click()).unwrap());
    assert_eq!(
        bridge.get_property(target, "clicked").unwrap(),
        ManagedValue::Bool(true)
    );

    host::uninstall();
    assert!(!host::is_installed());
    assert!(host::with_bridge(|b| b.live_proxies()).is_none());
    assert_eq!(engine.scope_depth(), 0);
    assert!(runtime.changes.borrow().is_empty());
}
