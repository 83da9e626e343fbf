//! Value encoding and decoding at the worker boundary.
//!
//! Outward: primitives and their containers go inline; scalar-like
//! wrappers are unwrapped; everything else becomes a fresh handle with a
//! populated (truncated) `repr` and `str`. Inward: handles resolve in the
//! requesting session only.

use tanuki_core::{DictEntry, Handle, Scalar, WireValue};

use crate::object::Object;
use crate::store::Store;

/// `repr`/`str` fields are cut to this many characters.
pub const REPR_LIMIT: usize = 200;

pub fn truncate(text: String) -> String {
    if text.chars().count() <= REPR_LIMIT {
        return text;
    }
    let cut: String = text.chars().take(REPR_LIMIT - 3).collect();
    format!("{}...", cut)
}

/// Is the object representable without a handle?
fn inline_encodable(object: &Object) -> bool {
    match object {
        Object::None | Object::Bool(_) | Object::Int(_) | Object::Float(_) | Object::Str(_) => {
            true
        }
        Object::List(items) | Object::Tuple(items) => items.iter().all(inline_encodable),
        Object::Dict(pairs) => pairs
            .iter()
            .all(|(k, v)| inline_encodable(k) && inline_encodable(v)),
        _ => false,
    }
}

pub fn encode(object: Object, session_id: &str, store: &mut Store) -> WireValue {
    match object {
        Object::None => WireValue::null(),
        Object::Bool(b) => WireValue::bool(b),
        Object::Int(n) => WireValue::int(n),
        Object::Float(f) => WireValue::float(f),
        Object::Str(s) => WireValue::str(s),
        // Scalar-like wrappers unwrap to their unit value.
        Object::Scalar(inner) => encode(*inner, session_id, store),
        Object::List(items) if items.iter().all(inline_encodable) => WireValue::List {
            items: items
                .into_iter()
                .map(|o| encode(o, session_id, store))
                .collect(),
        },
        Object::Tuple(items) if items.iter().all(inline_encodable) => WireValue::Tuple {
            items: items
                .into_iter()
                .map(|o| encode(o, session_id, store))
                .collect(),
        },
        Object::Dict(pairs) if pairs.iter().all(|(k, v)| inline_encodable(k) && inline_encodable(v)) => {
            WireValue::Dict {
                items: pairs
                    .into_iter()
                    .map(|(k, v)| DictEntry {
                        key: encode(k, session_id, store),
                        value: encode(v, session_id, store),
                    })
                    .collect(),
            }
        }
        other => {
            let type_name = other.type_name().to_string();
            let repr = truncate(other.repr());
            let display = truncate(other.str_text());
            let id = store.session(session_id).insert("h", other);
            WireValue::Handle(Handle {
                id,
                type_name,
                repr,
                display: Some(display),
                session_id: session_id.to_string(),
            })
        }
    }
}

/// Decode failure reasons the dispatcher maps onto wire errors.
#[derive(Debug, PartialEq)]
pub enum DecodeError {
    /// Handle unknown in this session (or born in another one).
    Stale(String),
}

pub fn decode(wire: WireValue, session_id: &str, store: &Store) -> Result<Object, DecodeError> {
    match wire {
        WireValue::Value { value } => Ok(match value {
            Scalar::Null => Object::None,
            Scalar::Bool(b) => Object::Bool(b),
            Scalar::Int(n) => Object::Int(n),
            Scalar::Float(f) => Object::Float(f),
            Scalar::Str(s) => Object::Str(s),
        }),
        WireValue::List { items } => Ok(Object::List(
            items
                .into_iter()
                .map(|w| decode(w, session_id, store))
                .collect::<Result<_, _>>()?,
        )),
        WireValue::Tuple { items } => Ok(Object::Tuple(
            items
                .into_iter()
                .map(|w| decode(w, session_id, store))
                .collect::<Result<_, _>>()?,
        )),
        WireValue::Dict { items } => Ok(Object::Dict(
            items
                .into_iter()
                .map(|e| {
                    Ok((
                        decode(e.key, session_id, store)?,
                        decode(e.value, session_id, store)?,
                    ))
                })
                .collect::<Result<_, _>>()?,
        )),
        WireValue::Handle(handle) => {
            // Inner handles resolve in the requesting session; a handle
            // minted for another session is stale here by definition.
            if handle.session_id != session_id {
                return Err(DecodeError::Stale(handle.id));
            }
            store
                .get(session_id, &handle.id)
                .cloned()
                .ok_or(DecodeError::Stale(handle.id))
        }
    }
}
