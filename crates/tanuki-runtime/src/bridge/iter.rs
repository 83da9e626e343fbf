//! Batched iteration over bridge-backed sequences.
//!
//! `iter` creates a worker-side iterator handle; elements then arrive in
//! batches of up to the default batch size per round trip, surfaced to
//! generated code one at a time.

use std::collections::VecDeque;

use tanuki_core::DEFAULT_BATCH_SIZE;

use super::{proxy::Proxy, with_client};
use crate::value::Value;
use crate::TnkResult;

pub struct BridgeIter {
    inner: Inner,
}

enum Inner {
    /// The value was a native container after all; no round trips.
    Native(std::vec::IntoIter<Value>),
    Bridge {
        iterator: Proxy,
        buffer: VecDeque<Value>,
        done: bool,
        batch_size: usize,
    },
}

impl BridgeIter {
    pub(crate) fn open(value: &Value) -> TnkResult<BridgeIter> {
        match value {
            Value::Proxy(p) => {
                let id = p.id().to_string();
                let iterator = with_client(|c| c.iter(&id))?;
                Ok(BridgeIter {
                    inner: Inner::Bridge {
                        iterator,
                        buffer: VecDeque::new(),
                        done: false,
                        batch_size: DEFAULT_BATCH_SIZE,
                    },
                })
            }
            other => {
                let items = other.to_list()?;
                Ok(BridgeIter {
                    inner: Inner::Native(items.into_iter()),
                })
            }
        }
    }

    /// Overrides the elements fetched per round trip.
    pub fn with_batch_size(mut self, size: usize) -> BridgeIter {
        if let Inner::Bridge { batch_size, .. } = &mut self.inner {
            *batch_size = size.max(1);
        }
        self
    }
}

impl Iterator for BridgeIter {
    type Item = TnkResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            Inner::Native(items) => items.next().map(Ok),
            Inner::Bridge {
                iterator,
                buffer,
                done,
                batch_size,
            } => {
                if buffer.is_empty() && !*done {
                    let id = iterator.id().to_string();
                    let size = *batch_size;
                    match with_client(|c| c.iter_next_batch(&id, size)) {
                        Ok((items, finished)) => {
                            buffer.extend(items);
                            *done = finished;
                        }
                        Err(e) => {
                            *done = true;
                            return Some(Err(e));
                        }
                    }
                }
                buffer.pop_front().map(Ok)
            }
        }
    }
}
