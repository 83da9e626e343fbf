use crate::protocol::{
    Cmd, ErrorCode, Handle, Meta, Request, Response, Scalar, Target, WireError, WireValue,
};

fn round_trip_value(v: &WireValue) -> WireValue {
    let line = serde_json::to_string(v).unwrap();
    serde_json::from_str(&line).unwrap()
}

#[test]
fn scalar_encoding_is_identity() {
    for v in [
        WireValue::null(),
        WireValue::bool(true),
        WireValue::int(-42),
        WireValue::float(2.5),
        WireValue::str("hello"),
    ] {
        assert_eq!(round_trip_value(&v), v);
    }
}

#[test]
fn container_encoding_is_identity() {
    let v = WireValue::List {
        items: vec![WireValue::int(1), WireValue::int(2), WireValue::int(3)],
    };
    assert_eq!(round_trip_value(&v), v);

    let v = WireValue::Tuple {
        items: vec![WireValue::str("a"), WireValue::bool(false)],
    };
    assert_eq!(round_trip_value(&v), v);
}

#[test]
fn scalar_wire_shape() {
    let line = serde_json::to_string(&WireValue::int(7)).unwrap();
    assert_eq!(line, r#"{"kind":"value","value":7}"#);

    let line = serde_json::to_string(&WireValue::null()).unwrap();
    assert_eq!(line, r#"{"kind":"value","value":null}"#);
}

#[test]
fn handle_without_str_field_decodes() {
    // Older worker revisions never sent `str`; decoding must tolerate that.
    let line = r#"{"kind":"handle","id":"h_1","type":"DataFrame","repr":"<df>","session_id":"s1"}"#;
    let v: WireValue = serde_json::from_str(line).unwrap();
    let h = v.as_handle().unwrap();
    assert_eq!(h.display, None);
    assert_eq!(h.display_text(), "<df>");
}

#[test]
fn handle_with_str_field_prefers_it() {
    let h = Handle {
        id: "h_2".into(),
        type_name: "Series".into(),
        repr: "<series repr>".into(),
        display: Some("0 1 2".into()),
        session_id: "s1".into(),
    };
    assert_eq!(h.display_text(), "0 1 2");
}

#[test]
fn request_wire_shape_omits_unset_fields() {
    let req = Request::new(Cmd::Iter, "s1", Target::name("h_9"));
    let line = serde_json::to_string(&req).unwrap();
    assert_eq!(line, r#"{"cmd":"iter","session_id":"s1","target":"h_9"}"#);
}

#[test]
fn module_target_round_trips() {
    let req = Request::new(Cmd::CallMethod, "s1", Target::module("math"));
    let line = serde_json::to_string(&req).unwrap();
    assert!(line.contains(r#""target":{"kind":"module","module":"math"}"#));
    let back: Request = serde_json::from_str(&line).unwrap();
    assert_eq!(back.target, Target::module("math"));
}

#[test]
fn response_ok_round_trips() {
    let resp = Response::ok_with_meta(Some(3), WireValue::List { items: vec![] }, Meta { done: true });
    let line = serde_json::to_string(&resp).unwrap();
    let back: Response = serde_json::from_str(&line).unwrap();
    assert_eq!(back, resp);
    assert_eq!(back.req_id(), Some(3));
}

#[test]
fn response_error_carries_code_verbatim() {
    let resp = Response::error(None, WireError::new(ErrorCode::StaleHandle, "h_1 not found"));
    let line = serde_json::to_string(&resp).unwrap();
    assert!(line.contains(r#""code":"StaleHandle""#));
}

#[test]
fn python_exception_preserves_py_type() {
    let err = WireError::exception("ValueError", "slice step cannot be zero");
    let line = serde_json::to_string(&err).unwrap();
    let back: WireError = serde_json::from_str(&line).unwrap();
    assert_eq!(back.py_type.as_deref(), Some("ValueError"));
    assert_eq!(back.code, ErrorCode::PythonException);
}

#[test]
fn scalar_int_is_not_float() {
    let v: WireValue = serde_json::from_str(r#"{"kind":"value","value":5}"#).unwrap();
    match v {
        WireValue::Value { value: Scalar::Int(5) } => {}
        other => panic!("expected Int(5), got {other:?}"),
    }
}

#[test]
fn meta_done_defaults_false() {
    let resp: Response = serde_json::from_str(r#"{"kind":"ok","value":null,"meta":{}}"#).unwrap();
    match resp {
        Response::Ok { meta: Some(m), .. } => assert!(!m.done),
        other => panic!("unexpected: {other:?}"),
    }
}
