use tanuki_core::{ErrorCode, WireError};

use crate::error::{ErrorKind, TnkError};

#[test]
fn display_shows_line_kind_message() {
    let err = TnkError::new(ErrorKind::ValueError, "neg").with_line(3);
    assert_eq!(err.to_string(), "[line 3] ValueError: neg");

    let err = TnkError::new(ErrorKind::RuntimeError, "bad");
    assert_eq!(err.to_string(), "RuntimeError: bad");
}

#[test]
fn render_walks_the_cause_chain() {
    let cause = TnkError::new(ErrorKind::ValueError, "neg").with_line(3);
    let err = TnkError::new(ErrorKind::RuntimeError, "bad")
        .with_line(7)
        .with_cause(cause);

    let rendered = err.render();
    assert_eq!(
        rendered,
        "[line 7] RuntimeError: bad\n  Caused by: [line 3] ValueError: neg"
    );
}

#[test]
fn nested_causes_indent_further() {
    let inner = TnkError::new(ErrorKind::ValueError, "a");
    let middle = TnkError::new(ErrorKind::TypeError, "b").with_cause(inner);
    let outer = TnkError::new(ErrorKind::RuntimeError, "c").with_cause(middle);

    let rendered = outer.render();
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("  Caused by: "));
    assert!(lines[2].starts_with("    Caused by: "));
}

#[test]
fn bridge_python_exception_lifts_py_type_to_kind() {
    let wire = WireError::exception("ValueError", "slice step cannot be zero");
    let err: TnkError = wire.into();
    assert_eq!(err.kind, ErrorKind::ValueError);
    assert_eq!(err.py_type.as_deref(), Some("ValueError"));
    assert_eq!(err.message, "slice step cannot be zero");
}

#[test]
fn unknown_py_type_stays_python_exception() {
    let wire = WireError::exception("WeirdCustomError", "boom");
    let err: TnkError = wire.into();
    assert_eq!(err.kind, ErrorKind::PythonException);
}

#[test]
fn bridge_codes_map_to_kinds() {
    for (code, kind) in [
        (ErrorCode::SecurityViolation, ErrorKind::SecurityViolation),
        (ErrorCode::StaleHandle, ErrorKind::StaleHandle),
        (ErrorCode::ProtocolError, ErrorKind::ProtocolError),
        (ErrorCode::WorkerCrash, ErrorKind::WorkerCrash),
    ] {
        let err: TnkError = WireError::new(code, "x").into();
        assert_eq!(err.kind, kind);
    }
}
