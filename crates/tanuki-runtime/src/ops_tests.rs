use std::collections::{HashMap, HashSet};

use crate::ops::*;
use crate::ErrorKind;

#[test]
fn negative_indices_count_from_the_end() {
    let xs = vec![10, 20, 30];
    assert_eq!(list_get(&xs, -1).unwrap(), 30);
    assert_eq!(list_get(&xs, 0).unwrap(), 10);
    assert_eq!(str_get("abc", -2).unwrap(), "b");
}

#[test]
fn out_of_range_index_is_an_index_error() {
    let xs = vec![1, 2];
    let err = list_get(&xs, 5).unwrap_err();
    assert_eq!(err.kind, ErrorKind::IndexError);
    let err = str_get("ab", -3).unwrap_err();
    assert_eq!(err.kind, ErrorKind::IndexError);
}

#[test]
fn slices_follow_source_semantics() {
    let xs: Vec<i64> = (0..10).collect();
    assert_eq!(slice_list(&xs, Some(2), Some(5), None).unwrap(), vec![2, 3, 4]);
    assert_eq!(slice_list(&xs, None, None, Some(3)).unwrap(), vec![0, 3, 6, 9]);
    assert_eq!(
        slice_list(&xs, None, None, Some(-1)).unwrap(),
        vec![9, 8, 7, 6, 5, 4, 3, 2, 1, 0]
    );
    assert_eq!(slice_list(&xs, Some(-3), None, None).unwrap(), vec![7, 8, 9]);
    assert_eq!(
        slice_list(&xs, Some(5), Some(2), Some(-1)).unwrap(),
        vec![5, 4, 3]
    );
    // Out-of-range bounds clamp instead of failing.
    assert_eq!(slice_list(&xs, Some(7), Some(100), None).unwrap(), vec![7, 8, 9]);
}

#[test]
fn slice_step_zero_is_a_value_error() {
    let xs = vec![1, 2, 3];
    let err = slice_list(&xs, None, None, Some(0)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ValueError);
    assert!(err.message.contains("step cannot be zero"));
}

#[test]
fn string_slicing_is_char_based() {
    assert_eq!(slice_str("hello", Some(1), Some(4), None).unwrap(), "ell");
    assert_eq!(slice_str("hello", None, None, Some(-1)).unwrap(), "olleh");
}

#[test]
fn str_search_helpers() {
    assert_eq!(str_find("hello world", "wor"), 6);
    assert_eq!(str_find("hello", "xyz"), -1);
    assert_eq!(str_rfind("hello hello", "hello"), 6);
    assert_eq!(str_count("banana", "a"), 3);
}

#[test]
fn padding_helpers() {
    assert_eq!(zfill("42", 5), "00042");
    assert_eq!(zfill("-42", 5), "-0042");
    assert_eq!(ljust("hi", 5), "hi   ");
    assert_eq!(rjust("hi", 5), "   hi");
    assert_eq!(center("hi", 6), "  hi  ");
}

#[test]
fn numeric_helpers() {
    assert_eq!(ipow(2, 10), 1024);
    assert_eq!(round_to(3.14159, 2), 3.14);
    assert_eq!(chr(65), "A");
    assert_eq!(ord("A"), 65);
    assert_eq!(bin(10), "0b1010");
    assert_eq!(bin(-5), "-0b101");
    assert_eq!(hex(255), "0xff");
    assert_eq!(oct(64), "0o100");
}

#[test]
fn parse_helpers_carry_value_error() {
    assert_eq!(parse_int(" 42 ").unwrap(), 42);
    assert!(parse_int("abc").is_err());
    assert_eq!(parse_float("2.5").unwrap(), 2.5);
    assert!(parse_float("x").is_err());
}

#[test]
fn float_formatting_keeps_trailing_zero() {
    assert_eq!(fmt_float(1.0), "1.0");
    assert_eq!(fmt_float(3.14), "3.14");
    assert_eq!(fmt_float(-2.0), "-2.0");
}

#[test]
fn dict_iteration_is_key_ordered() {
    let d: HashMap<i64, String> =
        HashMap::from([(5, "B".to_string()), (3, "A".to_string())]);
    assert_eq!(dict_keys(&d), vec![3, 5]);
    assert_eq!(dict_values(&d), vec!["A".to_string(), "B".to_string()]);
    assert_eq!(
        dict_items(&d),
        vec![(3, "A".to_string()), (5, "B".to_string())]
    );
}

#[test]
fn set_iteration_is_ordered() {
    let s: HashSet<i64> = HashSet::from([3, 1, 2]);
    assert_eq!(set_items(&s), vec![1, 2, 3]);
}

#[test]
fn missing_dict_key_is_a_key_error() {
    let d: HashMap<i64, i64> = HashMap::new();
    let err = dict_get(&d, &1).unwrap_err();
    assert_eq!(err.kind, ErrorKind::KeyError);
}

#[test]
fn missing_set_element_is_a_key_error() {
    let mut s: HashSet<i64> = HashSet::from([1]);
    set_remove(&mut s, &1).unwrap();
    let err = set_remove(&mut s, &1).unwrap_err();
    assert_eq!(err.kind, ErrorKind::KeyError);
}

#[test]
fn list_mutation_helpers() {
    let mut xs = vec![1, 2, 3, 2];
    assert_eq!(list_pop_at(&mut xs, -1).unwrap(), 2);
    list_remove(&mut xs, &2).unwrap();
    assert_eq!(xs, vec![1, 3]);
    assert_eq!(list_index(&xs, &3).unwrap(), 1);
    assert_eq!(list_count(&[1, 1, 2], &1), 2);
    assert_eq!(repeat_list(&[1, 2], 2), vec![1, 2, 1, 2]);

    assert_eq!(list_pop(&mut xs).unwrap(), 3);
    assert_eq!(list_pop(&mut xs).unwrap(), 1);
    let err = list_pop(&mut xs).unwrap_err();
    assert_eq!(err.kind, ErrorKind::IndexError);

    let err = list_remove(&mut xs, &9).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ValueError);
    let err = list_index(&xs, &9).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ValueError);
}
