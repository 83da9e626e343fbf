use crate::value::{IntoValue, Value};
use crate::ErrorKind;

#[test]
fn truthiness_follows_source_rules() {
    assert!(!Value::None.truthy());
    assert!(!Value::Int(0).truthy());
    assert!(Value::Int(-1).truthy());
    assert!(!Value::Str(String::new()).truthy());
    assert!(Value::Str("x".into()).truthy());
    assert!(!Value::List(vec![]).truthy());
    assert!(Value::List(vec![Value::None]).truthy());
}

#[test]
fn display_renders_python_style() {
    assert_eq!(Value::None.to_string(), "None");
    assert_eq!(Value::Bool(true).to_string(), "True");
    assert_eq!(Value::Float(1.0).to_string(), "1.0");
    assert_eq!(
        Value::List(vec![Value::Int(1), Value::Int(2)]).to_string(),
        "[1, 2]"
    );
}

#[test]
fn arithmetic_promotes_to_float() {
    let r = Value::Int(1).add_value(&Value::Float(0.5)).unwrap();
    assert_eq!(r.as_float(), 1.5);

    let r = Value::Int(7).div_value(&Value::Int(2)).unwrap();
    assert_eq!(r.as_float(), 3.5);

    let r = Value::Int(7).floordiv_value(&Value::Int(2)).unwrap();
    assert_eq!(r.as_int(), 3);
}

#[test]
fn division_by_zero_is_a_kinded_error() {
    let err = Value::Int(1).div_value(&Value::Int(0)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ZeroDivisionError);
}

#[test]
fn string_concat_and_repeat() {
    let r = Value::Str("ab".into())
        .add_value(&Value::Str("cd".into()))
        .unwrap();
    assert_eq!(r.as_str_lossy(), "abcd");

    let r = Value::Str("ab".into()).mul_value(&Value::Int(3)).unwrap();
    assert_eq!(r.as_str_lossy(), "ababab");
}

#[test]
fn conversions_fail_with_value_error() {
    assert_eq!(Value::Str(" 42 ".into()).to_int().unwrap(), 42);
    let err = Value::Str("abc".into()).to_int().unwrap_err();
    assert_eq!(err.kind, ErrorKind::ValueError);
}

#[test]
fn matmul_requires_a_bridge_value() {
    let err = Value::Int(1).matmul_value(&Value::Int(2)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeError);
}

#[test]
fn native_indexing_and_membership() {
    let xs = Value::List(vec![Value::Int(10), Value::Int(20)]);
    assert_eq!(xs.get_item(Value::Int(-1)).unwrap().as_int(), 20);
    assert!(Value::Int(10).in_value(&xs).unwrap());
    assert!(!Value::Int(99).in_value(&xs).unwrap());

    let err = xs.get_item(Value::Int(5)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::IndexError);
}

#[test]
fn native_slice_with_zero_step_is_value_error() {
    let xs = Value::List(vec![Value::Int(1), Value::Int(2)]);
    let err = xs
        .slice(None, None, Some(Value::Int(0)))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ValueError);
    assert!(err.message.contains("step cannot be zero"));
}

#[test]
fn isinstance_checks_runtime_type() {
    assert!(Value::Int(3).isinstance("int"));
    assert!(Value::Bool(true).isinstance("int"));
    assert!(Value::Str("x".into()).isinstance("str"));
    assert!(!Value::Float(1.0).isinstance("int"));
}

#[test]
fn into_value_covers_primitives_and_containers() {
    assert_eq!(5i64.into_value().as_int(), 5);
    assert_eq!("hi".into_value().as_str_lossy(), "hi");
    let v = vec![1i64, 2].into_value();
    assert_eq!(v.len_bridge().unwrap(), 2);
    assert!(matches!(None::<i64>.into_value(), Value::None));
}

#[test]
fn attribute_access_on_primitives_is_attribute_error() {
    let err = Value::Int(1).get_attr("shape").unwrap_err();
    assert_eq!(err.kind, ErrorKind::AttributeError);
}
