//! Integration tests for the structural operations of datum classes.
//!
//! Covers construction, representation, equality, iteration, indexing and
//! length across inheritance, plus user overrides and custom generated
//! operations.

use datum_core::{
    generator, native, Args, ClassBuilder, ClassRegistry, Comparison, DatumError, Output, Value,
};
use std::sync::Arc;

/// Route the crate's debug events to the test harness's captured output
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("datum_core=debug"))
        .with_test_writer()
        .try_init();
}

fn point(registry: &ClassRegistry) -> Arc<datum_core::Class> {
    registry
        .define(
            ClassBuilder::new("Point")
                .extends(registry.datum())
                .field("x", "int")
                .field("y", "int"),
        )
        .expect("define Point")
}

// ────────────────────────────────────────────────────────────────────────────
// Basic contract
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_point_example() {
    let registry = ClassRegistry::new();
    let point = point(&registry);

    let p = point.call([2, 3]).expect("construct");
    assert_eq!(p.repr().unwrap(), "Point(x=2, y=3)");
    assert_eq!(p.len().unwrap(), 2);
    assert_eq!(p.index(0).unwrap(), Value::Int(2));
    assert_eq!(p.values().unwrap(), vec![Value::Int(2), Value::Int(3)]);

    let q = point.call([2, 3]).unwrap();
    assert_eq!(p.equals(&q).unwrap(), Comparison::Equal);
    let r = point.call([3, 2]).unwrap();
    assert_eq!(p.equals(&r).unwrap(), Comparison::NotEqual);
}

#[test]
fn test_keyword_construction() {
    let registry = ClassRegistry::new();
    let point = point(&registry);

    let p = point
        .construct(&Args::new().kwarg("y", 3).kwarg("x", 2))
        .unwrap();
    assert_eq!(p.repr().unwrap(), "Point(x=2, y=3)");

    let q = point.construct(&Args::new().arg(2).kwarg("y", 3)).unwrap();
    assert_eq!(p, q);
}

#[test]
fn test_missing_field_value() {
    let registry = ClassRegistry::new();
    let point = point(&registry);

    let err = point.call([1]).unwrap_err();
    match err {
        DatumError::MissingFieldValue { type_name, field } => {
            assert_eq!(type_name, "Point");
            assert_eq!(field, "y");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_empty_class() {
    let registry = ClassRegistry::new();
    let empty = registry
        .define(ClassBuilder::new("Empty").extends(registry.datum()))
        .unwrap();

    let e = empty.call(Vec::<Value>::new()).unwrap();
    assert_eq!(e.repr().unwrap(), "Empty()");
    assert_eq!(e.len().unwrap(), 0);
    assert!(e.is_empty().unwrap());
    assert_eq!(e.iter().unwrap().count(), 0);
    assert!(matches!(
        e.index(0).unwrap_err(),
        DatumError::IndexOutOfRange { .. }
    ));
    assert_eq!(e, empty.call(Vec::<Value>::new()).unwrap());
}

#[test]
fn test_iteration_restarts() {
    let registry = ClassRegistry::new();
    let p = point(&registry).call([1, 2]).unwrap();

    let first: Vec<Value> = p.iter().unwrap().map(Result::unwrap).collect();
    let second: Vec<Value> = p.iter().unwrap().map(Result::unwrap).collect();
    assert_eq!(first, second);
}

#[test]
fn test_repr_detail() {
    let registry = ClassRegistry::new();
    let record = registry
        .define(
            ClassBuilder::new("Record")
                .extends(registry.datum())
                .field("name", "str")
                .field("score", "float")
                .field("tags", "tuple")
                .field("inner", "Point"),
        )
        .unwrap();
    let inner = point(&registry).call([1, 2]).unwrap();

    let r = record
        .call([
            Value::str("a \"quoted\" name"),
            Value::Float(1.0),
            Value::tuple(vec![Value::str("x")]),
            Value::Instance(inner),
        ])
        .unwrap();
    assert_eq!(
        r.repr().unwrap(),
        r#"Record(name="a \"quoted\" name", score=1.0, tags=("x",), inner=Point(x=1, y=2))"#
    );
}

// ────────────────────────────────────────────────────────────────────────────
// Inheritance
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_subclass_extends_fields() {
    let registry = ClassRegistry::new();
    let point = point(&registry);
    let point3 = registry
        .define(ClassBuilder::new("Point3").extends(&point).field("z", "int"))
        .unwrap();

    let p = point3.call([1, 2, 3]).unwrap();
    assert_eq!(p.repr().unwrap(), "Point3(x=1, y=2, z=3)");
    assert_eq!(p.len().unwrap(), 3);

    // The parent keeps its own specialization
    let q = point.call([1, 2]).unwrap();
    assert_eq!(q.repr().unwrap(), "Point(x=1, y=2)");
    assert_eq!(q.len().unwrap(), 2);
}

#[test]
fn test_subclass_without_fields_reports_own_name() {
    let registry = ClassRegistry::new();
    let point = point(&registry);
    let alias = registry
        .define(ClassBuilder::new("Alias").extends(&point))
        .unwrap();

    let a = alias.call([1, 2]).unwrap();
    assert_eq!(a.repr().unwrap(), "Alias(x=1, y=2)");
    // Shares the parent's registration list
    assert!(Arc::ptr_eq(alias.registrations(), point.registrations()));
}

#[test]
fn test_cross_class_equality() {
    let registry = ClassRegistry::new();
    let point = point(&registry);
    let alias = registry
        .define(ClassBuilder::new("Alias").extends(&point))
        .unwrap();

    let p = point.call([1, 2]).unwrap();
    let a = alias.call([1, 2]).unwrap();
    assert_eq!(p.equals(&a).unwrap(), Comparison::NotComparable);
    // Falls back to identity
    assert_ne!(p, a);
    assert_eq!(Value::Instance(p.clone()), Value::Instance(p.clone()));
    assert_ne!(Value::Instance(p), Value::Int(1));
}

#[test]
fn test_inherited_defaults() {
    let registry = ClassRegistry::new();
    let base = registry
        .define(
            ClassBuilder::new("Base")
                .extends(registry.datum())
                .field("a", "int")
                .field_with_default("b", "int", 2),
        )
        .unwrap();
    let child = registry
        .define(
            ClassBuilder::new("Child")
                .extends(&base)
                .field_with_default("c", "int", 3),
        )
        .unwrap();

    let c = child.call([1]).unwrap();
    assert_eq!(c.repr().unwrap(), "Child(a=1, b=2, c=3)");
}

#[test]
fn test_mutable_default_instance_not_shared() {
    let registry = ClassRegistry::new();
    let counter = registry
        .define(
            ClassBuilder::new("Counter")
                .extends(registry.datum())
                .field_with_default("n", "int", 0),
        )
        .unwrap();
    let seed = counter.call(Vec::<Value>::new()).unwrap();
    let holder = registry
        .define(
            ClassBuilder::new("Holder")
                .extends(registry.datum())
                .field_with_default("counter", "Counter", seed),
        )
        .unwrap();

    let a = holder.call(Vec::<Value>::new()).unwrap();
    let b = holder.call(Vec::<Value>::new()).unwrap();
    let ca = a.get("counter").unwrap();
    let cb = b.get("counter").unwrap();
    ca.as_instance().unwrap().set("n", 5).unwrap();
    assert_eq!(cb.as_instance().unwrap().get("n").unwrap(), Value::Int(0));
}

// ────────────────────────────────────────────────────────────────────────────
// Overrides and custom operations
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_user_override_wins_and_propagates() {
    let registry = ClassRegistry::new();
    let point = point(&registry);
    let quiet = registry
        .define(
            ClassBuilder::new("Quiet")
                .extends(&point)
                .method_fn("repr", |_| Ok(Output::Text("<quiet>".into()))),
        )
        .unwrap();
    let quieter = registry
        .define(ClassBuilder::new("Quieter").extends(&quiet).field("z", "int"))
        .unwrap();

    assert_eq!(quiet.call([1, 2]).unwrap().repr().unwrap(), "<quiet>");
    assert_eq!(quieter.call([1, 2, 3]).unwrap().repr().unwrap(), "<quiet>");
    assert!(quieter
        .registrations()
        .iter()
        .all(|r| r.operation() != "repr"));

    // Other operations still generated for the subclass
    assert_eq!(quieter.call([1, 2, 3]).unwrap().len().unwrap(), 3);
}

#[test]
fn test_regenerate_below_override() {
    let registry = ClassRegistry::new();
    let point = point(&registry);
    let quiet = registry
        .define(
            ClassBuilder::new("Quiet")
                .extends(&point)
                .method_fn("repr", |_| Ok(Output::Text("<quiet>".into()))),
        )
        .unwrap();
    let loud = registry
        .define(
            ClassBuilder::new("Loud")
                .extends(&quiet)
                .generate("repr", datum_core::synth::builtin(datum_core::Operation::Represent).clone()),
        )
        .unwrap();

    assert_eq!(loud.call([1, 2]).unwrap().repr().unwrap(), "Loud(x=1, y=2)");
}

#[test]
fn test_custom_generated_operation() {
    let registry = ClassRegistry::new();
    let describe = generator(|cx| {
        let names: Vec<String> = cx.fields.names().map(str::to_string).collect();
        let class_name = cx.class.name().to_string();
        native(move |_| Ok(Output::Text(format!("{}: {}", class_name, names.join(" ")))))
    });
    let shape = registry
        .define(
            ClassBuilder::new("Shape")
                .extends(registry.datum())
                .field("kind", "str")
                .generate("describe", describe),
        )
        .unwrap();
    let circle = registry
        .define(ClassBuilder::new("Circle").extends(&shape).field("r", "float"))
        .unwrap();

    let s = shape.call(["square"]).unwrap();
    let c = circle.call([Value::str("circle"), Value::Float(1.5)]).unwrap();

    let text = |output: Output| match output {
        Output::Text(t) => t,
        other => panic!("unexpected output: {other:?}"),
    };
    assert_eq!(text(s.invoke("describe", &Args::new()).unwrap()), "Shape: kind");
    assert_eq!(text(c.invoke("describe", &Args::new()).unwrap()), "Circle: kind r");
}

// ────────────────────────────────────────────────────────────────────────────
// Reflection
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_synthesis_is_lazy_and_per_class() {
    init_tracing();
    let registry = ClassRegistry::new();
    let point = point(&registry);
    let point3 = registry
        .define(ClassBuilder::new("Point3").extends(&point).field("z", "int"))
        .unwrap();

    assert!(point.synthesized_operations().is_empty());
    let p = point.call([1, 2]).unwrap();
    p.repr().unwrap();
    assert_eq!(point.synthesized_operations(), vec!["construct", "repr"]);
    assert!(point3.synthesized_operations().is_empty());
    assert!(!point3.is_synthesized("construct"));
}

#[test]
fn test_resolve_method() {
    let registry = ClassRegistry::new();
    let point = point(&registry);
    assert!(matches!(
        point.resolve_method("repr"),
        Some(datum_core::MethodRef::Generated { .. })
    ));
    assert!(point.resolve_method("nope").is_none());
    assert!(matches!(
        point.invoke_static("nope", &Args::new()).unwrap_err(),
        DatumError::UnsupportedOperation { .. }
    ));
}

// ────────────────────────────────────────────────────────────────────────────
// Self-referencing values
// ────────────────────────────────────────────────────────────────────────────

fn node(registry: &ClassRegistry) -> Arc<datum_core::Class> {
    registry
        .define(
            ClassBuilder::new("Node")
                .extends(registry.datum())
                .field_with_default("next", "Node", Value::None),
        )
        .expect("define Node")
}

#[test]
fn test_self_reference_repr() {
    init_tracing();
    let registry = ClassRegistry::new();
    let n = node(&registry).call(Vec::<Value>::new()).unwrap();
    n.set("next", n.clone()).unwrap();

    assert_eq!(n.repr().unwrap(), "Node(next=...)");
    assert_eq!(format!("{:?}", n), "Node(next=...)");
    assert_eq!(
        Value::tuple([Value::Instance(n.clone())]).repr().unwrap(),
        "(Node(next=...),)"
    );
    // The guard is released once rendering finishes
    assert_eq!(n.repr().unwrap(), "Node(next=...)");
}

#[test]
fn test_mutual_reference_repr() {
    let registry = ClassRegistry::new();
    let node = node(&registry);
    let a = node.call(Vec::<Value>::new()).unwrap();
    let b = node.call([a.clone()]).unwrap();
    a.set("next", b.clone()).unwrap();

    assert_eq!(a.repr().unwrap(), "Node(next=Node(next=...))");
    assert_eq!(b.repr().unwrap(), "Node(next=Node(next=...))");
}

#[test]
fn test_cyclic_equality_terminates() {
    let registry = ClassRegistry::new();
    let node = node(&registry);
    let a = node.call(Vec::<Value>::new()).unwrap();
    let b = node.call(Vec::<Value>::new()).unwrap();
    a.set("next", a.clone()).unwrap();
    b.set("next", b.clone()).unwrap();

    assert_eq!(a.equals(&b).unwrap(), Comparison::Equal);
    assert_eq!(a, b);

    let end = node.call(Vec::<Value>::new()).unwrap();
    let c = node.call([end]).unwrap();
    assert_eq!(a.equals(&c).unwrap(), Comparison::NotEqual);
    assert_ne!(a, c);
}

#[test]
fn test_equality_errors_surface() {
    let registry = ClassRegistry::new();
    let point = point(&registry);
    let p = point.call([1, 2]).unwrap();
    let q = point.call([1, 2]).unwrap();
    p.delete("x").unwrap();

    assert!(matches!(
        p.equals(&q).unwrap_err(),
        DatumError::MissingAttribute { .. }
    ));
    assert!(matches!(
        p.try_eq(&q).unwrap_err(),
        DatumError::MissingAttribute { .. }
    ));
    assert!(Value::Instance(q.clone())
        .try_eq(&Value::Instance(p.clone()))
        .is_err());
    // `==` is the lossy form
    assert_ne!(p, q);
    assert!(p.try_eq(&p).unwrap());
}
