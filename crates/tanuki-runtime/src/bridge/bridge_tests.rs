//! Client-side protocol tests against an in-process fake worker speaking
//! NDJSON over a loopback socket.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};

use tanuki_core::{Cmd, ErrorCode, Handle, Meta, Request, Response, WireError, WireValue};

use super::client::Client;
use crate::error::ErrorKind;
use crate::value::Value;

/// Spawns a fake worker thread; each received request goes through
/// `handler` until the connection closes.
fn fake_worker(
    mut handler: impl FnMut(Request) -> Response + Send + 'static,
) -> Client {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");

    std::thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut writer = stream.try_clone().expect("clone stream");
        let reader = BufReader::new(stream);
        for line in reader.lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            let request: Request = match serde_json::from_str(&line) {
                Ok(r) => r,
                Err(_) => break,
            };
            // Deletes from dropped proxies in other tests may flush into
            // any client; answer them here so handlers see only their own
            // traffic.
            let response = if request.cmd == Cmd::Delete {
                Response::ok(request.req_id, WireValue::null())
            } else {
                handler(request)
            };
            let mut out = serde_json::to_string(&response).expect("encode response");
            out.push('\n');
            if writer.write_all(out.as_bytes()).is_err() {
                break;
            }
            let _ = writer.flush();
        }
    });

    let stream = TcpStream::connect(addr).expect("connect");
    let writer = stream.try_clone().expect("clone stream");
    Client::from_streams(Box::new(writer), stream)
}

fn echo_ok(value: WireValue) -> impl FnMut(Request) -> Response {
    move |req: Request| Response::ok(req.req_id, value.clone())
}

#[test]
fn call_function_round_trips_primitives() {
    let mut client = fake_worker(|req| {
        assert_eq!(req.cmd, Cmd::CallFunction);
        assert!(!req.session_id.is_empty());
        // Echo the first argument back.
        let first = req.args.unwrap_or_default().into_iter().next();
        Response::ok(req.req_id, first.unwrap_or_else(WireValue::null))
    });

    let result = client
        .call_function("math.identity", vec![Value::Int(42)], vec![])
        .unwrap();
    assert_eq!(result.as_int(), 42);
}

#[test]
fn responses_echo_request_ids() {
    let mut client = fake_worker(|req| {
        assert!(req.req_id.is_some());
        Response::ok(req.req_id, WireValue::int(1))
    });
    for _ in 0..3 {
        client.call_function("m.f", vec![], vec![]).unwrap();
    }
}

#[test]
fn mismatched_request_id_kills_the_session() {
    let mut client = fake_worker(|_req| Response::ok(Some(999), WireValue::int(1)));
    let err = client.call_function("m.f", vec![], vec![]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::WorkerCrash);

    // The client refuses further traffic once the state is undefined.
    let err = client.call_function("m.f", vec![], vec![]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::WorkerCrash);
}

#[test]
fn forbidden_calls_are_refused_before_sending() {
    // The handler would panic if anything arrived.
    let mut client = fake_worker(|_req| panic!("request must not reach the worker"));

    for target in ["eval", "builtins.eval", "exec", "globals", "locals"] {
        let err = client.call_function(target, vec![], vec![]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SecurityViolation, "{target}");
    }
    let err = client
        .call_method("h_1", "exec", vec![], vec![])
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::SecurityViolation);

    let err = client.get_attribute("h_1", "__class__").unwrap_err();
    assert_eq!(err.kind, ErrorKind::SecurityViolation);
}

#[test]
fn worker_errors_surface_with_their_kind() {
    let mut client = fake_worker(|req| {
        Response::error(
            req.req_id,
            WireError::new(ErrorCode::StaleHandle, "h_9 not found"),
        )
    });
    let err = client.get_item("h_9", Value::Int(0)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::StaleHandle);
}

#[test]
fn python_exception_kind_comes_from_py_type() {
    let mut client = fake_worker(|req| {
        Response::error(
            req.req_id,
            WireError::exception("ValueError", "slice step cannot be zero"),
        )
    });
    let err = client
        .slice("h_1", None, None, Some(Value::Int(0)))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ValueError);
    assert!(err.message.contains("step cannot be zero"));
}

#[test]
fn closed_worker_is_a_crash() {
    let mut client = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            // Accept and immediately drop the connection.
            let _ = listener.accept();
        });
        let stream = TcpStream::connect(addr).unwrap();
        let writer = stream.try_clone().unwrap();
        Client::from_streams(Box::new(writer), stream)
    };
    let err = client.call_function("m.f", vec![], vec![]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::WorkerCrash);
}

#[test]
fn iterator_batches_until_done() {
    // Serve a 5-element sequence in batches of 2 via the raw client API.
    let mut served = 0i64;
    let mut client = fake_worker(move |req| match req.cmd {
        Cmd::Iter => Response::ok(
            req.req_id,
            WireValue::Handle(Handle {
                id: "it_1".into(),
                type_name: "list_iterator".into(),
                repr: "<list_iterator>".into(),
                display: None,
                session_id: req.session_id.clone(),
            }),
        ),
        Cmd::IterNextBatch => {
            let batch = req.batch_size.unwrap_or(1000).min(2);
            let mut items = Vec::new();
            while served < 5 && items.len() < batch {
                items.push(WireValue::int(served));
                served += 1;
            }
            let done = served >= 5 && items.is_empty();
            Response::ok_with_meta(req.req_id, WireValue::List { items }, Meta { done })
        }
        Cmd::Delete => Response::ok(req.req_id, WireValue::null()),
        other => panic!("unexpected command {:?}", other),
    });

    let iterator = client.iter("h_seq").unwrap();
    let id = iterator.id().to_string();
    let mut collected = Vec::new();
    loop {
        let (items, done) = client.iter_next_batch(&id, 2).unwrap();
        collected.extend(items.iter().map(|v| v.as_int()));
        if done {
            break;
        }
    }
    assert_eq!(collected, vec![0, 1, 2, 3, 4]);
}

#[test]
fn empty_sequence_is_done_immediately() {
    let mut client = fake_worker(move |req| match req.cmd {
        Cmd::Iter => Response::ok(
            req.req_id,
            WireValue::Handle(Handle {
                id: "it_2".into(),
                type_name: "list_iterator".into(),
                repr: "<list_iterator>".into(),
                display: None,
                session_id: req.session_id.clone(),
            }),
        ),
        Cmd::IterNextBatch => Response::ok_with_meta(
            req.req_id,
            WireValue::List { items: vec![] },
            Meta { done: true },
        ),
        Cmd::Delete => Response::ok(req.req_id, WireValue::null()),
        other => panic!("unexpected command {:?}", other),
    });

    let iterator = client.iter("h_empty").unwrap();
    let id = iterator.id().to_string();
    let (items, done) = client.iter_next_batch(&id, 1000).unwrap();
    assert!(items.is_empty());
    assert!(done);
}

#[test]
fn scalar_round_trip_is_identity() {
    let mut client = fake_worker(|req| {
        let first = req.args.unwrap_or_default().into_iter().next();
        Response::ok(req.req_id, first.unwrap_or_else(WireValue::null))
    });

    for value in [
        Value::None,
        Value::Bool(true),
        Value::Int(-7),
        Value::Float(2.5),
        Value::Str("hello".into()),
        Value::List(vec![Value::Int(1), Value::Int(2)]),
    ] {
        let back = client
            .call_function("echo.fn", vec![value.clone()], vec![])
            .unwrap();
        assert!(
            crate::value::values_eq(&back, &value),
            "{value:?} did not round-trip"
        );
    }
}

#[test]
fn handle_without_str_field_still_displays() {
    let mut client = fake_worker(|req| {
        Response::ok(
            req.req_id,
            WireValue::Handle(Handle {
                id: "h_df".into(),
                type_name: "DataFrame".into(),
                repr: "<DataFrame 3x2>".into(),
                display: None,
                session_id: req.session_id.clone(),
            }),
        )
    });
    let value = client.call_function("pandas.DataFrame", vec![], vec![]).unwrap();
    assert_eq!(value.to_string(), "<DataFrame 3x2>");

    // A raw line with no `str` field decodes the same way through serde.
    let line = r#"{"kind":"handle","id":"h","type":"T","repr":"<T>","session_id":"s"}"#;
    let wire: WireValue = serde_json::from_str(line).unwrap();
    assert!(matches!(wire, WireValue::Handle(_)));
}
