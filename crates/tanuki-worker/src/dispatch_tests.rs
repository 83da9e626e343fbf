use tanuki_core::{Cmd, ErrorCode, Request, Response, Scalar, Target, WireValue};

use crate::dispatch::Worker;

const SESSION: &str = "s-test";

fn call_function(worker: &mut Worker, target: &str, args: Vec<WireValue>) -> Response {
    let mut request = Request::new(Cmd::CallFunction, SESSION, Target::name(target));
    request.args = Some(args);
    worker.dispatch(request)
}

fn expect_handle(response: Response) -> tanuki_core::Handle {
    match response {
        Response::Ok {
            value: Some(WireValue::Handle(h)),
            ..
        } => h,
        other => panic!("expected a handle, got {other:?}"),
    }
}

fn expect_int(response: Response) -> i64 {
    match response {
        Response::Ok {
            value: Some(WireValue::Value { value: Scalar::Int(n) }),
            ..
        } => n,
        other => panic!("expected an int, got {other:?}"),
    }
}

fn expect_error(response: Response) -> tanuki_core::WireError {
    match response {
        Response::Error { error, .. } => error,
        other => panic!("expected an error, got {other:?}"),
    }
}

/// A worker-side sequence handle over `[0..n)`.
fn make_series(worker: &mut Worker, n: i64) -> tanuki_core::Handle {
    expect_handle(call_function(
        worker,
        "series.range",
        vec![WireValue::int(n)],
    ))
}

#[test]
fn primitives_round_trip_inline() {
    let mut worker = Worker::new();
    // builtins.len of an inline list comes back inline, no handle.
    let response = call_function(
        &mut worker,
        "len",
        vec![WireValue::List {
            items: vec![WireValue::int(1), WireValue::int(2)],
        }],
    );
    assert_eq!(expect_int(response), 2);
    assert_eq!(worker.live_handles(SESSION), 0);
}

#[test]
fn opaque_objects_become_handles_with_repr_and_str() {
    let mut worker = Worker::new();
    let handle = make_series(&mut worker, 3);
    assert_eq!(handle.type_name, "Series");
    assert!(handle.repr.contains("Series"));
    assert!(handle.display.is_some());
    assert_eq!(handle.session_id, SESSION);
    assert_eq!(worker.live_handles(SESSION), 1);
}

#[test]
fn forbidden_calls_are_security_violations() {
    let mut worker = Worker::new();
    for target in ["eval", "exec", "globals", "locals", "builtins.eval"] {
        let err = expect_error(call_function(&mut worker, target, vec![]));
        assert_eq!(err.code, ErrorCode::SecurityViolation, "{target}");
        assert!(err.op.is_some(), "error echoes the operation");
    }
}

#[test]
fn private_attribute_access_is_refused() {
    let mut worker = Worker::new();
    let handle = make_series(&mut worker, 1);
    let mut request = Request::new(Cmd::GetAttribute, SESSION, Target::name(&handle.id));
    request.name = Some("__class__".to_string());
    let err = expect_error(worker.dispatch(request));
    assert_eq!(err.code, ErrorCode::SecurityViolation);

    let mut request = Request::new(Cmd::GetAttribute, SESSION, Target::name(&handle.id));
    request.name = Some("_private".to_string());
    let err = expect_error(worker.dispatch(request));
    assert_eq!(err.code, ErrorCode::SecurityViolation);
}

#[test]
fn forbidden_method_call_is_refused_before_resolution() {
    let mut worker = Worker::new();
    // The target does not even exist; policy wins first.
    let mut request = Request::new(Cmd::CallMethod, SESSION, Target::name("h_missing"));
    request.method = Some("exec".to_string());
    let err = expect_error(worker.dispatch(request));
    assert_eq!(err.code, ErrorCode::SecurityViolation);
}

#[test]
fn cross_session_handles_are_stale() {
    let mut worker = Worker::new();
    let handle = make_series(&mut worker, 5);

    // Same id, different session.
    let mut request = Request::new(Cmd::GetItem, "other-session", Target::name(&handle.id));
    request.key = Some(WireValue::int(0));
    let err = expect_error(worker.dispatch(request));
    assert_eq!(err.code, ErrorCode::StaleHandle);

    // Same session still works.
    let mut request = Request::new(Cmd::GetItem, SESSION, Target::name(&handle.id));
    request.key = Some(WireValue::int(0));
    assert_eq!(expect_int(worker.dispatch(request)), 0);
}

#[test]
fn inner_handle_arguments_resolve_in_the_same_session_only() {
    let mut worker = Worker::new();
    let handle = make_series(&mut worker, 2);
    let as_arg = WireValue::Handle(handle.clone());

    // Using the handle as an argument from another session is stale.
    let mut request = Request::new(Cmd::CallFunction, "other-session", Target::name("len"));
    request.args = Some(vec![as_arg.clone()]);
    let err = expect_error(worker.dispatch(request));
    assert_eq!(err.code, ErrorCode::StaleHandle);

    let mut request = Request::new(Cmd::CallFunction, SESSION, Target::name("len"));
    request.args = Some(vec![as_arg]);
    assert_eq!(expect_int(worker.dispatch(request)), 2);
}

#[test]
fn delete_frees_the_handle_and_later_access_is_stale() {
    let mut worker = Worker::new();
    let handle = make_series(&mut worker, 2);
    assert_eq!(worker.live_handles(SESSION), 1);

    let request = Request::new(Cmd::Delete, SESSION, Target::name(&handle.id));
    worker.dispatch(request);
    assert_eq!(worker.live_handles(SESSION), 0);

    let mut request = Request::new(Cmd::GetItem, SESSION, Target::name(&handle.id));
    request.key = Some(WireValue::int(0));
    let err = expect_error(worker.dispatch(request));
    assert_eq!(err.code, ErrorCode::StaleHandle);
}

#[test]
fn slice_step_zero_is_a_value_error() {
    let mut worker = Worker::new();
    let handle = make_series(&mut worker, 5);

    let mut request = Request::new(Cmd::Slice, SESSION, Target::name(&handle.id));
    request.start = Some(WireValue::null());
    request.stop = Some(WireValue::null());
    request.step = Some(WireValue::int(0));
    let err = expect_error(worker.dispatch(request));
    assert_eq!(err.code, ErrorCode::PythonException);
    assert_eq!(err.py_type.as_deref(), Some("ValueError"));
    assert!(err.message.contains("step cannot be zero"));
}

#[test]
fn slice_with_negative_step_reverses() {
    let mut worker = Worker::new();
    let handle = make_series(&mut worker, 4);

    let mut request = Request::new(Cmd::Slice, SESSION, Target::name(&handle.id));
    request.start = Some(WireValue::null());
    request.stop = Some(WireValue::null());
    request.step = Some(WireValue::int(-1));
    let sliced = expect_handle(worker.dispatch(request));

    // Sum it to observe the order-independent content survived.
    let mut request = Request::new(Cmd::CallMethod, SESSION, Target::name(&sliced.id));
    request.method = Some("sum".to_string());
    assert_eq!(expect_int(worker.dispatch(request)), 6);
}

#[test]
fn iterator_batches_sum_to_sequence_length_and_done_fires_once() {
    let mut worker = Worker::new();
    let handle = make_series(&mut worker, 1234);

    let iterator = expect_handle(worker.dispatch(Request::new(
        Cmd::Iter,
        SESSION,
        Target::name(&handle.id),
    )));

    let mut total = 0i64;
    let mut count = 0usize;
    let mut done_signals = 0;
    loop {
        let mut request =
            Request::new(Cmd::IterNextBatch, SESSION, Target::name(&iterator.id));
        request.batch_size = Some(100);
        let response = worker.dispatch(request);
        let Response::Ok { value, meta, .. } = response else {
            panic!("iteration failed");
        };
        if let Some(WireValue::List { items }) = value {
            count += items.len();
            for item in items {
                if let WireValue::Value { value: Scalar::Int(n) } = item {
                    total += n;
                }
            }
        }
        if meta.map(|m| m.done).unwrap_or(false) {
            done_signals += 1;
            break;
        }
    }
    assert_eq!(count, 1234);
    assert_eq!(total, 1233 * 1234 / 2);
    assert_eq!(done_signals, 1);
}

#[test]
fn empty_sequence_iteration_is_done_immediately() {
    let mut worker = Worker::new();
    let handle = make_series(&mut worker, 0);
    let iterator = expect_handle(worker.dispatch(Request::new(
        Cmd::Iter,
        SESSION,
        Target::name(&handle.id),
    )));

    let mut request = Request::new(Cmd::IterNextBatch, SESSION, Target::name(&iterator.id));
    request.batch_size = Some(10);
    let response = worker.dispatch(request);
    let Response::Ok { value, meta, .. } = response else {
        panic!("iteration failed");
    };
    assert_eq!(value, Some(WireValue::List { items: vec![] }));
    assert!(meta.map(|m| m.done).unwrap_or(false));
}

#[test]
fn no_op_method_round_trip_preserves_handle_identity() {
    let mut worker = Worker::new();
    let handle = make_series(&mut worker, 3);

    let mut request = Request::new(Cmd::CallMethod, SESSION, Target::name(&handle.id));
    request.method = Some("copy".to_string());
    let copy = expect_handle(worker.dispatch(request));

    assert_eq!(copy.type_name, handle.type_name);
    assert_eq!(copy.repr, handle.repr);
    assert_ne!(copy.id, handle.id);
}

#[test]
fn scalar_like_wrappers_unwrap_on_encode() {
    let mut worker = Worker::new();
    let a = make_series(&mut worker, 3);
    let b = make_series(&mut worker, 3);

    // Dot product returns a scalar wrapper; it crosses as a number.
    let mut request = Request::new(Cmd::CallMethod, SESSION, Target::name(&a.id));
    request.method = Some("__matmul__".to_string());
    request.args = Some(vec![WireValue::Handle(b)]);
    let response = worker.dispatch(request);
    match response {
        Response::Ok {
            value: Some(WireValue::Value { value: Scalar::Float(f) }),
            ..
        } => assert_eq!(f, 5.0), // 0*0 + 1*1 + 2*2
        other => panic!("expected inline float, got {other:?}"),
    }
}

#[test]
fn module_attribute_access_returns_constants() {
    let mut worker = Worker::new();
    let mut request = Request::new(Cmd::GetAttribute, SESSION, Target::module("math"));
    request.name = Some("pi".to_string());
    let response = worker.dispatch(request);
    match response {
        Response::Ok {
            value: Some(WireValue::Value { value: Scalar::Float(f) }),
            ..
        } => assert!((f - std::f64::consts::PI).abs() < 1e-12),
        other => panic!("expected pi, got {other:?}"),
    }
}

#[test]
fn unknown_module_is_an_import_error() {
    let mut worker = Worker::new();
    let err = expect_error(call_function(&mut worker, "nonexistent.thing", vec![]));
    assert_eq!(err.code, ErrorCode::PythonException);
    assert_eq!(err.py_type.as_deref(), Some("ImportError"));
}

#[test]
fn math_functions_are_not_served_over_the_bridge() {
    // The compiler lowers every `math.*` call natively; the worker only
    // exposes the constants, so a function call is refused.
    let mut worker = Worker::new();
    let err = expect_error(call_function(
        &mut worker,
        "math.sqrt",
        vec![WireValue::float(2.0)],
    ));
    assert_eq!(err.code, ErrorCode::PythonException);
    assert_eq!(err.py_type.as_deref(), Some("ImportError"));
}

#[test]
fn malformed_lines_are_protocol_errors_and_do_not_kill_the_worker() {
    let mut worker = Worker::new();
    let response = worker.handle_line("{not json");
    assert!(response.contains("ProtocolError"));

    // Still serving afterwards.
    let n = expect_int(call_function(&mut worker, "len", vec![WireValue::str("abc")]));
    assert_eq!(n, 3);
}

#[test]
fn errors_echo_the_operation() {
    let mut worker = Worker::new();
    let handle = make_series(&mut worker, 1);
    let mut request = Request::new(Cmd::CallMethod, SESSION, Target::name(&handle.id));
    request.method = Some("no_such_method".to_string());
    let err = expect_error(worker.dispatch(request));
    assert_eq!(err.py_type.as_deref(), Some("AttributeError"));
    let op = err.op.expect("op echo");
    assert_eq!(op["cmd"], "call_method");
    assert_eq!(op["method"], "no_such_method");
}
