use scripthost::{Script, ScriptError, TypeRegistry, Value, Variadic};
use std::sync::{Arc, Mutex};

fn run(source: &str, registry: TypeRegistry) -> Result<Script, ScriptError> {
    Script::with_registry("dummy", source, Arc::new(registry))
}

fn expect_runtime(result: Result<Script, ScriptError>, needle: &str) {
    match result {
        Err(ScriptError::Runtime(message)) => assert!(
            message.contains(needle),
            "message `{message}` does not mention `{needle}`"
        ),
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

#[test]
fn arguments_signed_integers() {
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let mut registry = TypeRegistry::new();
    registry.add_free_function("foo", move |a: i8, b: i16, c: i32, d: i64, e: isize| {
        *sink.lock().unwrap() = Some((a, b, c, d, e));
    });
    run("foo(1,2,3,4,5)", registry).unwrap();
    assert_eq!(*seen.lock().unwrap(), Some((1, 2, 3, 4, 5)));
}

#[test]
fn arguments_unsigned_integers() {
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let mut registry = TypeRegistry::new();
    registry.add_free_function("foo", move |a: u8, b: u16, c: u32, d: u64, e: usize| {
        *sink.lock().unwrap() = Some((a, b, c, d, e));
    });
    run("foo(1,2,3,4,5)", registry).unwrap();
    assert_eq!(*seen.lock().unwrap(), Some((1, 2, 3, 4, 5)));
}

#[test]
fn arguments_floats() {
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let mut registry = TypeRegistry::new();
    registry.add_free_function("foo", move |a: f32, b: f64| {
        *sink.lock().unwrap() = Some((a, b));
    });
    run("foo(1.5,2.5)", registry).unwrap();
    assert_eq!(*seen.lock().unwrap(), Some((1.5f32, 2.5f64)));
}

#[test]
fn arguments_string() {
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let mut registry = TypeRegistry::new();
    registry.add_free_function("foo", move |s: String| {
        *sink.lock().unwrap() = Some(s);
    });
    run("foo(\"Hello World\")", registry).unwrap();
    assert_eq!(seen.lock().unwrap().as_deref(), Some("Hello World"));
}

#[test]
fn arguments_boolean() {
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let mut registry = TypeRegistry::new();
    registry.add_free_function("foo", move |b: bool| {
        *sink.lock().unwrap() = Some(b);
    });
    run("foo(true)", registry).unwrap();
    assert_eq!(*seen.lock().unwrap(), Some(true));
}

#[test]
fn too_few_arguments() {
    let mut registry = TypeRegistry::new();
    registry.add_free_function("foo", |_: String| {});
    expect_runtime(run("foo()", registry), "insufficient arguments to function");
}

#[test]
fn too_many_arguments() {
    let mut registry = TypeRegistry::new();
    registry.add_free_function("foo", |_: String| {});
    expect_runtime(
        run("foo(\"Hello World\", \"Hi\")", registry),
        "wrong arguments to function",
    );
}

#[test]
fn invalid_argument_types() {
    let mut registry = TypeRegistry::new();
    registry.add_free_function("foo", |_: String| {});
    expect_runtime(run("foo(2)", registry), "wrong arguments to function");
}

#[test]
fn no_implicit_conversion_from_string_to_number() {
    let mut registry = TypeRegistry::new();
    registry.add_free_function("foo", |_: i32| {});
    expect_runtime(run("foo(\"2\")", registry), "wrong arguments to function");
}

#[test]
fn no_implicit_conversion_from_number_to_string() {
    let mut registry = TypeRegistry::new();
    registry.add_free_function("foo", |_: String| {});
    expect_runtime(run("foo(2)", registry), "wrong arguments to function");
}

#[test]
fn variable_arguments() {
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let mut registry = TypeRegistry::new();
    registry.add_free_function("foo", move |first: i64, rest: Variadic| {
        *sink.lock().unwrap() = Some((first, rest.0.clone()));
    });
    run("foo(42, \"Hi\", 2, 4.51)", registry).unwrap();
    let (first, rest) = seen.lock().unwrap().clone().unwrap();
    assert_eq!(first, 42);
    assert_eq!(
        rest,
        vec![
            Value::String("Hi".into()),
            Value::Integer(2),
            Value::Float(4.51)
        ]
    );
}

#[test]
fn empty_variable_arguments() {
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let mut registry = TypeRegistry::new();
    registry.add_free_function("foo", move |first: i64, rest: Variadic| {
        *sink.lock().unwrap() = Some((first, rest.0.clone()));
    });
    run("foo(42)", registry).unwrap();
    let (first, rest) = seen.lock().unwrap().clone().unwrap();
    assert_eq!(first, 42);
    assert!(rest.is_empty());
}

#[test]
#[should_panic(expected = "variadic arguments must be declared last")]
fn variadic_must_be_last() {
    let mut registry = TypeRegistry::new();
    registry.add_free_function("foo", |_rest: Variadic, _after: i64| {});
}

#[test]
fn native_failure_becomes_a_script_error() {
    let mut registry = TypeRegistry::new();
    registry.add_free_function("foo", || -> anyhow::Result<()> {
        Err(anyhow::anyhow!("board not connected"))
    });
    expect_runtime(run("foo()", registry), "board not connected");
}
