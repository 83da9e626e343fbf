//! Native helpers the generator calls instead of open-coding.
//!
//! Indexing and slicing follow the source language: negative indices
//! count from the end, slice bounds clamp, and a step may be negative.
//! Accesses that raise in the source (`IndexError`, `KeyError`,
//! `ValueError`) return result-carrying values here too, so a generated
//! `try/except` observes them like any other raised error. Container
//! iteration helpers return key-ordered vectors so emission and output
//! stay deterministic.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::io::{BufRead, Write};

use crate::error::{ErrorKind, TnkError};
use crate::TnkResult;

// ----------------------------------------------------------------------
// Indexing
// ----------------------------------------------------------------------

/// Normalizes a possibly negative index; out of range is an
/// `IndexError`.
pub fn norm_index(i: i64, len: usize) -> TnkResult<usize> {
    let len_i = len as i64;
    let idx = if i < 0 { len_i + i } else { i };
    if idx < 0 || idx >= len_i {
        return Err(TnkError::new(
            ErrorKind::IndexError,
            format!("index {} out of range for length {}", i, len),
        ));
    }
    Ok(idx as usize)
}

pub fn list_get<T: Clone>(xs: &[T], i: i64) -> TnkResult<T> {
    Ok(xs[norm_index(i, xs.len())?].clone())
}

pub fn list_set<T>(xs: &mut [T], i: i64, value: T) -> TnkResult<()> {
    let idx = norm_index(i, xs.len())?;
    xs[idx] = value;
    Ok(())
}

pub fn list_pop<T>(xs: &mut Vec<T>) -> TnkResult<T> {
    xs.pop()
        .ok_or_else(|| TnkError::new(ErrorKind::IndexError, "pop from empty list"))
}

pub fn list_pop_at<T>(xs: &mut Vec<T>, i: i64) -> TnkResult<T> {
    let idx = norm_index(i, xs.len())?;
    Ok(xs.remove(idx))
}

pub fn list_remove<T: PartialEq>(xs: &mut Vec<T>, value: &T) -> TnkResult<()> {
    match xs.iter().position(|x| x == value) {
        Some(pos) => {
            xs.remove(pos);
            Ok(())
        }
        None => Err(TnkError::new(
            ErrorKind::ValueError,
            "list.remove(x): x not in list",
        )),
    }
}

pub fn list_index<T: PartialEq>(xs: &[T], value: &T) -> TnkResult<i64> {
    match xs.iter().position(|x| x == value) {
        Some(pos) => Ok(pos as i64),
        None => Err(TnkError::new(
            ErrorKind::ValueError,
            "value is not in list",
        )),
    }
}

pub fn list_count<T: PartialEq>(xs: &[T], value: &T) -> i64 {
    xs.iter().filter(|x| *x == value).count() as i64
}

pub fn repeat_list<T: Clone>(xs: &[T], n: i64) -> Vec<T> {
    let mut out = Vec::with_capacity(xs.len() * n.max(0) as usize);
    for _ in 0..n.max(0) {
        out.extend(xs.iter().cloned());
    }
    out
}

pub fn str_get(s: &str, i: i64) -> TnkResult<String> {
    let chars: Vec<char> = s.chars().collect();
    Ok(chars[norm_index(i, chars.len())?].to_string())
}

// ----------------------------------------------------------------------
// Slicing
// ----------------------------------------------------------------------

/// Source-language slice over any clonable sequence; a zero step is a
/// `ValueError`.
pub fn slice_list<T: Clone>(
    xs: &[T],
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> TnkResult<Vec<T>> {
    if step == Some(0) {
        return Err(TnkError::new(
            ErrorKind::ValueError,
            "slice step cannot be zero",
        ));
    }
    Ok(slice_values(xs, start, stop, step))
}

/// Slice core; callers have already rejected a zero step.
pub(crate) fn slice_values<T: Clone>(
    xs: &[T],
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> Vec<T> {
    let step = step.unwrap_or(1);
    debug_assert!(step != 0, "zero step rejected before slicing");
    let len = xs.len() as i64;

    let clamp = |v: i64, low: i64, high: i64| v.max(low).min(high);
    let resolve = |v: i64| if v < 0 { len + v } else { v };

    let mut out = Vec::new();
    if step > 0 {
        let start = clamp(start.map(resolve).unwrap_or(0), 0, len);
        let stop = clamp(stop.map(resolve).unwrap_or(len), 0, len);
        let mut i = start;
        while i < stop {
            out.push(xs[i as usize].clone());
            i += step;
        }
    } else {
        let start = clamp(start.map(resolve).unwrap_or(len - 1), -1, len - 1);
        let stop = clamp(stop.map(resolve).unwrap_or(-1), -1, len - 1);
        let mut i = start;
        while i > stop {
            out.push(xs[i as usize].clone());
            i += step;
        }
    }
    out
}

pub fn slice_str(
    s: &str,
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> TnkResult<String> {
    let chars: Vec<char> = s.chars().collect();
    Ok(slice_list(&chars, start, stop, step)?.into_iter().collect())
}

// ----------------------------------------------------------------------
// Strings
// ----------------------------------------------------------------------

pub fn str_find(s: &str, sub: &str) -> i64 {
    match s.find(sub) {
        Some(byte_pos) => s[..byte_pos].chars().count() as i64,
        None => -1,
    }
}

pub fn str_rfind(s: &str, sub: &str) -> i64 {
    match s.rfind(sub) {
        Some(byte_pos) => s[..byte_pos].chars().count() as i64,
        None => -1,
    }
}

pub fn str_count(s: &str, sub: &str) -> i64 {
    if sub.is_empty() {
        return s.chars().count() as i64 + 1;
    }
    s.matches(sub).count() as i64
}

pub fn zfill(s: &str, width: i64) -> String {
    let width = width.max(0) as usize;
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let pad = "0".repeat(width - len);
    if let Some(rest) = s.strip_prefix('-') {
        format!("-{}{}", "0".repeat(width - len), rest)
    } else {
        format!("{}{}", pad, s)
    }
}

pub fn ljust(s: &str, width: i64) -> String {
    let width = width.max(0) as usize;
    let len = s.chars().count();
    if len >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - len))
    }
}

pub fn rjust(s: &str, width: i64) -> String {
    let width = width.max(0) as usize;
    let len = s.chars().count();
    if len >= width {
        s.to_string()
    } else {
        format!("{}{}", " ".repeat(width - len), s)
    }
}

pub fn center(s: &str, width: i64) -> String {
    let width = width.max(0) as usize;
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let total = width - len;
    let left = total / 2;
    format!("{}{}{}", " ".repeat(left), s, " ".repeat(total - left))
}

// ----------------------------------------------------------------------
// Numbers
// ----------------------------------------------------------------------

pub fn ipow(base: i64, exp: i64) -> i64 {
    if exp < 0 {
        panic!("ValueError: negative integer exponent in native lowering");
    }
    base.pow(exp.min(u32::MAX as i64) as u32)
}

pub fn round_to(value: f64, digits: i64) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

pub fn parse_int(s: &str) -> TnkResult<i64> {
    s.trim().parse::<i64>().map_err(|_| {
        TnkError::new(
            ErrorKind::ValueError,
            format!("invalid literal for int(): {:?}", s),
        )
    })
}

pub fn parse_float(s: &str) -> TnkResult<f64> {
    s.trim().parse::<f64>().map_err(|_| {
        TnkError::new(
            ErrorKind::ValueError,
            format!("could not convert string to float: {:?}", s),
        )
    })
}

pub fn chr(code: i64) -> String {
    char::from_u32(code.max(0) as u32)
        .map(|c| c.to_string())
        .unwrap_or_default()
}

pub fn ord(s: &str) -> i64 {
    s.chars().next().map(|c| c as i64).unwrap_or(0)
}

pub fn bin(n: i64) -> String {
    if n < 0 {
        format!("-0b{:b}", -n)
    } else {
        format!("0b{:b}", n)
    }
}

pub fn hex(n: i64) -> String {
    if n < 0 {
        format!("-0x{:x}", -n)
    } else {
        format!("0x{:x}", n)
    }
}

pub fn oct(n: i64) -> String {
    if n < 0 {
        format!("-0o{:o}", -n)
    } else {
        format!("0o{:o}", n)
    }
}

/// Source-style float rendering: whole floats keep their `.0`.
pub fn fmt_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

pub fn fmin_list(xs: &[f64]) -> f64 {
    xs.iter().copied().fold(f64::INFINITY, f64::min)
}

pub fn fmax_list(xs: &[f64]) -> f64 {
    xs.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

// ----------------------------------------------------------------------
// Containers
// ----------------------------------------------------------------------

/// Keys in sorted order, for deterministic iteration.
pub fn dict_keys<K: Clone + PartialOrd, V>(d: &HashMap<K, V>) -> Vec<K>
where
    K: Hash + Eq,
{
    let mut keys: Vec<K> = d.keys().cloned().collect();
    keys.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    keys
}

pub fn dict_values<K, V>(d: &HashMap<K, V>) -> Vec<V>
where
    K: Clone + PartialOrd + Hash + Eq,
    V: Clone,
{
    dict_keys(d).into_iter().map(|k| d[&k].clone()).collect()
}

pub fn dict_items<K, V>(d: &HashMap<K, V>) -> Vec<(K, V)>
where
    K: Clone + PartialOrd + Hash + Eq,
    V: Clone,
{
    dict_keys(d)
        .into_iter()
        .map(|k| {
            let v = d[&k].clone();
            (k, v)
        })
        .collect()
}

pub fn dict_get<K, V>(d: &HashMap<K, V>, k: &K) -> TnkResult<V>
where
    K: Hash + Eq + std::fmt::Debug,
    V: Clone,
{
    match d.get(k) {
        Some(v) => Ok(v.clone()),
        None => Err(TnkError::new(ErrorKind::KeyError, format!("{:?}", k))),
    }
}

pub fn set_items<T>(s: &HashSet<T>) -> Vec<T>
where
    T: Clone + PartialOrd + Hash + Eq,
{
    let mut items: Vec<T> = s.iter().cloned().collect();
    items.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    items
}

pub fn set_remove<T>(s: &mut HashSet<T>, value: &T) -> TnkResult<()>
where
    T: Hash + Eq + std::fmt::Debug,
{
    if !s.remove(value) {
        return Err(TnkError::new(ErrorKind::KeyError, format!("{:?}", value)));
    }
    Ok(())
}

pub fn set_union<T: Clone + Hash + Eq>(a: &HashSet<T>, b: &HashSet<T>) -> HashSet<T> {
    a.union(b).cloned().collect()
}

pub fn set_intersection<T: Clone + Hash + Eq>(a: &HashSet<T>, b: &HashSet<T>) -> HashSet<T> {
    a.intersection(b).cloned().collect()
}

pub fn set_difference_sym<T: Clone + Hash + Eq>(a: &HashSet<T>, b: &HashSet<T>) -> HashSet<T> {
    a.symmetric_difference(b).cloned().collect()
}

// ----------------------------------------------------------------------
// Console
// ----------------------------------------------------------------------

/// `input([prompt])`: prompt without newline, then one trimmed line.
pub fn input(prompt: Option<&str>) -> String {
    if let Some(p) = prompt {
        print!("{}", p);
        let _ = std::io::stdout().flush();
    }
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
    line.trim_end_matches(['\n', '\r']).to_string()
}
