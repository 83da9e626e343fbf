//! Request dispatch: validate, resolve, enforce policy, decode, invoke,
//! encode, reply.
//!
//! Every request walks the same steps; on failure the response's
//! `error.op` echoes the command, target, and arguments for debugging.
//! Caller-induced errors never terminate the process.

use serde_json::json;
use tanuki_core::{
    policy, Cmd, ErrorCode, Meta, Request, Response, Target, WireError, WireValue,
    DEFAULT_BATCH_SIZE,
};

use crate::codec::{self, DecodeError};
use crate::modules;
use crate::object::Object;
use crate::store::Store;

pub struct Worker {
    store: Store,
}

impl Worker {
    pub fn new() -> Worker {
        Worker {
            store: Store::new(),
        }
    }

    /// One request line in, one response line out.
    pub fn handle_line(&mut self, line: &str) -> String {
        let response = match serde_json::from_str::<Request>(line) {
            Ok(request) => self.dispatch(request),
            Err(e) => Response::error(
                None,
                WireError::new(ErrorCode::ProtocolError, format!("malformed request: {}", e)),
            ),
        };
        serde_json::to_string(&response)
            .unwrap_or_else(|_| r#"{"kind":"error","error":{"code":"ProtocolError","message":"encode failure"}}"#.to_string())
    }

    pub fn dispatch(&mut self, request: Request) -> Response {
        match request.cmd {
            Cmd::CallFunction => self.call_function(request),
            Cmd::CallMethod => self.call_method(request),
            Cmd::GetAttribute => self.get_attribute(request),
            Cmd::GetItem => self.get_item(request),
            Cmd::Slice => self.slice(request),
            Cmd::Iter => self.iter(request),
            Cmd::IterNextBatch => self.iter_next_batch(request),
            Cmd::Delete => self.delete(request),
        }
    }

    #[cfg(test)]
    pub fn live_handles(&self, session_id: &str) -> usize {
        self.store.live_handles(session_id)
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    fn call_function(&mut self, request: Request) -> Response {
        let req_id = request.req_id;
        let Target::Name(target) = request.target.clone() else {
            return protocol_error(req_id, "call_function target must be a dotted path");
        };
        let op = json!({
            "cmd": "call_function",
            "target": target,
            "args": request.args,
            "kwargs": request.kwargs,
        });

        if policy::forbidden_target(&target) {
            return Response::error(
                req_id,
                WireError::new(
                    ErrorCode::SecurityViolation,
                    format!("Forbidden function call: {}", target),
                )
                .with_op(op),
            );
        }

        let args = match self.decode_args(&request) {
            Ok(args) => args,
            Err(e) => return stale(req_id, e, op),
        };

        match modules::call_function(&target, &args) {
            Ok(result) => {
                let value = codec::encode(result, &request.session_id, &mut self.store);
                Response::ok(req_id, value)
            }
            Err(resolve) => Response::error(
                req_id,
                WireError::exception(resolve.py_type, resolve.message).with_op(op),
            ),
        }
    }

    fn call_method(&mut self, request: Request) -> Response {
        let req_id = request.req_id;
        let method = request.method.clone().unwrap_or_default();
        let op = json!({
            "cmd": "call_method",
            "target": target_text(&request.target),
            "method": method,
            "args": request.args,
            "kwargs": request.kwargs,
        });

        if policy::forbidden_name(&method) {
            return Response::error(
                req_id,
                WireError::new(
                    ErrorCode::SecurityViolation,
                    format!("Forbidden method call: {}", method),
                )
                .with_op(op),
            );
        }

        // A method on a module object is a function call on its path.
        if let Target::Module { module, .. } = &request.target {
            let path = format!("{}.{}", module, method);
            let args = match self.decode_args(&request) {
                Ok(args) => args,
                Err(e) => return stale(req_id, e, op),
            };
            return match modules::call_function(&path, &args) {
                Ok(result) => {
                    let value = codec::encode(result, &request.session_id, &mut self.store);
                    Response::ok(req_id, value)
                }
                Err(resolve) => Response::error(
                    req_id,
                    WireError::exception(resolve.py_type, resolve.message).with_op(op),
                ),
            };
        }

        let args = match self.decode_args(&request) {
            Ok(args) => args,
            Err(e) => return stale(req_id, e, op),
        };
        let Target::Name(handle_id) = &request.target else {
            return protocol_error(req_id, "invalid target");
        };
        let session = request.session_id.clone();
        let Some(object) = self.store.get_mut(&session, handle_id) else {
            return Response::error(
                req_id,
                WireError::new(
                    ErrorCode::StaleHandle,
                    format!("StaleHandle: {} (Session: {})", handle_id, session),
                )
                .with_op(op),
            );
        };

        let type_name = object.type_name().to_string();
        match modules::call_method(object, &method, &args) {
            Ok(Some(result)) => {
                let value = codec::encode(result, &session, &mut self.store);
                Response::ok(req_id, value)
            }
            Ok(None) => Response::error(
                req_id,
                WireError::exception(
                    "AttributeError",
                    format!("{} has no attribute {}", type_name, method),
                )
                .with_op(op),
            ),
            Err(resolve) => Response::error(
                req_id,
                WireError::exception(resolve.py_type, resolve.message).with_op(op),
            ),
        }
    }

    fn get_attribute(&mut self, request: Request) -> Response {
        let req_id = request.req_id;
        let name = request.name.clone().unwrap_or_default();
        let op = json!({
            "cmd": "get_attribute",
            "target": target_text(&request.target),
            "name": name,
        });

        // Step 4: policy before any resolution.
        if policy::private_attribute(&name) {
            return Response::error(
                req_id,
                WireError::new(
                    ErrorCode::SecurityViolation,
                    "Access to private attributes is forbidden",
                )
                .with_op(op),
            );
        }
        if policy::forbidden_name(&name) {
            return Response::error(
                req_id,
                WireError::new(
                    ErrorCode::SecurityViolation,
                    format!("Forbidden attribute access: {}", name),
                )
                .with_op(op),
            );
        }

        if let Target::Module { module, .. } = &request.target {
            let path = format!("{}.{}", module, name);
            return match modules::constant(&path) {
                Some(object) => {
                    let value = codec::encode(object, &request.session_id, &mut self.store);
                    Response::ok(req_id, value)
                }
                None => Response::error(
                    req_id,
                    WireError::exception(
                        "AttributeError",
                        format!("Attribute not found: {}", path),
                    )
                    .with_op(op),
                ),
            };
        }

        let Target::Name(handle_id) = &request.target else {
            return protocol_error(req_id, "invalid target");
        };
        let session = request.session_id.clone();
        let Some(object) = self.store.get(&session, handle_id) else {
            return Response::error(
                req_id,
                WireError::new(
                    ErrorCode::StaleHandle,
                    format!("StaleHandle: {} (Session: {})", handle_id, session),
                )
                .with_op(op),
            );
        };

        match modules::get_attribute(object, &name) {
            Some(result) => {
                let value = codec::encode(result, &session, &mut self.store);
                Response::ok(req_id, value)
            }
            None => Response::error(
                req_id,
                WireError::exception(
                    "AttributeError",
                    format!("{} object has no attribute {}", object.type_name(), name),
                )
                .with_op(op),
            ),
        }
    }

    fn get_item(&mut self, request: Request) -> Response {
        let req_id = request.req_id;
        let op = json!({
            "cmd": "get_item",
            "target": target_text(&request.target),
            "key": request.key,
        });
        let key = match request.key.clone() {
            Some(wire) => match codec::decode(wire, &request.session_id, &self.store) {
                Ok(k) => k,
                Err(e) => return stale(req_id, e, op),
            },
            None => return protocol_error(req_id, "get_item requires a key"),
        };
        let (session, object) = match self.resolve_handle(&request) {
            Ok(pair) => pair,
            Err(response) => return *response,
        };

        let result = match item_of(&object, &key) {
            Ok(r) => r,
            Err((py_type, message)) => {
                return Response::error(
                    req_id,
                    WireError::exception(py_type, message).with_op(op),
                )
            }
        };
        let value = codec::encode(result, &session, &mut self.store);
        Response::ok(req_id, value)
    }

    fn slice(&mut self, request: Request) -> Response {
        let req_id = request.req_id;
        let op = json!({
            "cmd": "slice",
            "target": target_text(&request.target),
            "start": request.start,
            "stop": request.stop,
            "step": request.step,
        });

        let mut bound = |wire: &Option<WireValue>| -> Result<Option<i64>, Response> {
            match wire {
                None => Ok(None),
                Some(w) => match codec::decode(w.clone(), &request.session_id, &self.store) {
                    Ok(Object::None) => Ok(None),
                    Ok(object) => match object.as_index() {
                        Some(i) => Ok(Some(i)),
                        None => Err(Response::error(
                            req_id,
                            WireError::new(
                                ErrorCode::TypeMismatch,
                                format!(
                                    "Slice argument must resolve to int, got {}",
                                    object.type_name()
                                ),
                            )
                            .with_op(op.clone()),
                        )),
                    },
                    Err(e) => Err(stale(req_id, e, op.clone())),
                },
            }
        };

        let start = match bound(&request.start) {
            Ok(v) => v,
            Err(r) => return r,
        };
        let stop = match bound(&request.stop) {
            Ok(v) => v,
            Err(r) => return r,
        };
        let step = match bound(&request.step) {
            Ok(v) => v,
            Err(r) => return r,
        };

        if step == Some(0) {
            return Response::error(
                req_id,
                WireError::exception("ValueError", "slice step cannot be zero").with_op(op),
            );
        }

        let (session, object) = match self.resolve_handle(&request) {
            Ok(pair) => pair,
            Err(response) => return *response,
        };

        let result = match &object {
            Object::Sequence { type_name, items } => Object::Sequence {
                type_name: type_name.clone(),
                items: slice_items(items, start, stop, step),
            },
            Object::List(items) => Object::List(slice_items(items, start, stop, step)),
            Object::Tuple(items) => Object::Tuple(slice_items(items, start, stop, step)),
            Object::Str(s) => {
                let chars: Vec<Object> =
                    s.chars().map(|c| Object::Str(c.to_string())).collect();
                let sliced = slice_items(&chars, start, stop, step);
                Object::Str(sliced.iter().map(|o| o.str_text()).collect())
            }
            other => {
                return Response::error(
                    req_id,
                    WireError::exception(
                        "TypeError",
                        format!("{} object is not sliceable", other.type_name()),
                    )
                    .with_op(op),
                )
            }
        };
        let value = codec::encode(result, &session, &mut self.store);
        Response::ok(req_id, value)
    }

    fn iter(&mut self, request: Request) -> Response {
        let req_id = request.req_id;
        let op = json!({ "cmd": "iter", "target": target_text(&request.target) });
        let (session, object) = match self.resolve_handle(&request) {
            Ok(pair) => pair,
            Err(response) => return *response,
        };

        let items = match &object {
            Object::Sequence { items, .. } => items.clone(),
            Object::List(items) | Object::Tuple(items) => items.clone(),
            Object::Dict(pairs) => pairs.iter().map(|(k, _)| k.clone()).collect(),
            Object::Str(s) => s.chars().map(|c| Object::Str(c.to_string())).collect(),
            other => {
                return Response::error(
                    req_id,
                    WireError::exception(
                        "TypeError",
                        format!("{} object is not iterable", other.type_name()),
                    )
                    .with_op(op),
                )
            }
        };

        let iterator = Object::Iterator { items, pos: 0 };
        let type_name = iterator.type_name().to_string();
        let repr = codec::truncate(iterator.repr());
        let id = self.store.session(&session).insert("it", iterator);
        Response::ok(
            req_id,
            WireValue::Handle(tanuki_core::Handle {
                id,
                type_name,
                display: Some(repr.clone()),
                repr,
                session_id: session,
            }),
        )
    }

    fn iter_next_batch(&mut self, request: Request) -> Response {
        let req_id = request.req_id;
        let op = json!({
            "cmd": "iter_next_batch",
            "target": target_text(&request.target),
            "batch_size": request.batch_size,
        });
        let batch_size = request.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1);
        let Target::Name(handle_id) = &request.target else {
            return protocol_error(req_id, "invalid target");
        };
        let session = request.session_id.clone();
        let Some(object) = self.store.get_mut(&session, handle_id) else {
            return Response::error(
                req_id,
                WireError::new(
                    ErrorCode::StaleHandle,
                    format!("StaleHandle: {} (Session: {})", handle_id, session),
                )
                .with_op(op),
            );
        };
        let Object::Iterator { items, pos } = object else {
            return Response::error(
                req_id,
                WireError::exception("TypeError", "handle is not an iterator").with_op(op),
            );
        };

        // Exhaustion is reported exactly once, on the request that runs
        // past the last element.
        let mut batch = Vec::new();
        let mut done = false;
        for _ in 0..batch_size {
            if *pos < items.len() {
                batch.push(items[*pos].clone());
                *pos += 1;
            } else {
                done = true;
                break;
            }
        }

        let encoded: Vec<WireValue> = batch
            .into_iter()
            .map(|o| codec::encode(o, &session, &mut self.store))
            .collect();
        Response::ok_with_meta(
            req_id,
            WireValue::List { items: encoded },
            Meta { done },
        )
    }

    fn delete(&mut self, request: Request) -> Response {
        let req_id = request.req_id;
        if let Target::Name(handle_id) = &request.target {
            self.store.remove(&request.session_id, handle_id);
        }
        Response::ok(req_id, WireValue::null())
    }

    // ------------------------------------------------------------------
    // Shared steps
    // ------------------------------------------------------------------

    fn decode_args(&self, request: &Request) -> Result<Vec<Object>, DecodeError> {
        request
            .args
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|w| codec::decode(w, &request.session_id, &self.store))
            .collect()
    }

    /// Resolves the request's target as a handle in the requesting
    /// session, cloning the object out so encoding can borrow the store.
    fn resolve_handle(&mut self, request: &Request) -> Result<(String, Object), Box<Response>> {
        let Target::Name(handle_id) = &request.target else {
            return Err(Box::new(protocol_error(
                request.req_id,
                "invalid target",
            )));
        };
        let session = request.session_id.clone();
        match self.store.get(&session, handle_id) {
            Some(object) => Ok((session, object.clone())),
            None => Err(Box::new(Response::error(
                request.req_id,
                WireError::new(
                    ErrorCode::StaleHandle,
                    format!("StaleHandle: {} (Session: {})", handle_id, session),
                ),
            ))),
        }
    }
}

fn protocol_error(req_id: Option<u64>, message: &str) -> Response {
    Response::error(req_id, WireError::new(ErrorCode::ProtocolError, message))
}

fn stale(req_id: Option<u64>, e: DecodeError, op: serde_json::Value) -> Response {
    let DecodeError::Stale(id) = e;
    Response::error(
        req_id,
        WireError::new(ErrorCode::StaleHandle, format!("StaleHandle: {}", id)).with_op(op),
    )
}

fn target_text(target: &Target) -> String {
    match target {
        Target::Name(s) => s.clone(),
        Target::Module { module, .. } => format!("<module {}>", module),
    }
}

fn item_of(object: &Object, key: &Object) -> Result<Object, (&'static str, String)> {
    match object {
        Object::Sequence { items, .. } | Object::List(items) | Object::Tuple(items) => {
            let i = key
                .as_index()
                .ok_or(("TypeError", "indices must be integers".to_string()))?;
            let len = items.len() as i64;
            let idx = if i < 0 { len + i } else { i };
            if idx < 0 || idx >= len {
                return Err(("IndexError", "index out of range".to_string()));
            }
            Ok(items[idx as usize].clone())
        }
        Object::Dict(pairs) => pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .ok_or(("KeyError", key.repr())),
        Object::Str(s) => {
            let i = key
                .as_index()
                .ok_or(("TypeError", "string indices must be integers".to_string()))?;
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as i64;
            let idx = if i < 0 { len + i } else { i };
            chars
                .get(idx as usize)
                .map(|c| Object::Str(c.to_string()))
                .ok_or(("IndexError", "string index out of range".to_string()))
        }
        other => Err((
            "TypeError",
            format!("{} object is not subscriptable", other.type_name()),
        )),
    }
}

/// Source-language slicing with clamping and negative steps.
fn slice_items(items: &[Object], start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Vec<Object> {
    let step = step.unwrap_or(1);
    debug_assert!(step != 0, "step zero rejected before slicing");
    let len = items.len() as i64;
    let clamp = |v: i64, low: i64, high: i64| v.max(low).min(high);
    let resolve = |v: i64| if v < 0 { len + v } else { v };

    let mut out = Vec::new();
    if step > 0 {
        let start = clamp(start.map(resolve).unwrap_or(0), 0, len);
        let stop = clamp(stop.map(resolve).unwrap_or(len), 0, len);
        let mut i = start;
        while i < stop {
            out.push(items[i as usize].clone());
            i += step;
        }
    } else {
        let start = clamp(start.map(resolve).unwrap_or(len - 1), -1, len - 1);
        let stop = clamp(stop.map(resolve).unwrap_or(-1), -1, len - 1);
        let mut i = start;
        while i > stop {
            out.push(items[i as usize].clone());
            i += step;
        }
    }
    out
}
