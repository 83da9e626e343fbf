//! Worker process supervision and the serial NDJSON RPC loop.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use tanuki_core::{policy, Cmd, Request, Response, Target, WireValue, DEFAULT_BATCH_SIZE};

use super::codec;
use super::proxy::{self, Proxy};
use crate::error::{ErrorKind, TnkError};
use crate::value::Value;
use crate::TnkResult;

/// Environment variable naming the worker executable.
pub const WORKER_PATH_VAR: &str = "TANUKI_WORKER";

const DEFAULT_WORKER: &str = "tanuki-worker";

pub struct Client {
    writer: Box<dyn Write + Send>,
    /// Lines from the worker's stdout, fed by a dedicated reader thread so
    /// a timeout can give up on a read.
    lines: mpsc::Receiver<std::io::Result<String>>,
    child: Option<Child>,
    session_id: String,
    next_req: u64,
    timeout: Option<Duration>,
    dead: bool,
}

impl Client {
    /// Spawns the companion process with piped stdin/stdout; stderr is
    /// inherited so its diagnostics reach the terminal.
    pub fn spawn() -> TnkResult<Client> {
        let path = std::env::var(WORKER_PATH_VAR).unwrap_or_else(|_| DEFAULT_WORKER.to_string());
        let mut child = Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                TnkError::new(
                    ErrorKind::WorkerCrash,
                    format!("failed to launch worker {:?}: {}", path, e),
                )
            })?;
        let stdin = child.stdin.take().ok_or_else(|| {
            TnkError::new(ErrorKind::WorkerCrash, "worker stdin unavailable")
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            TnkError::new(ErrorKind::WorkerCrash, "worker stdout unavailable")
        })?;
        let mut client = Client::from_streams(Box::new(stdin), stdout);
        client.child = Some(child);
        Ok(client)
    }

    /// Builds a client over arbitrary duplex streams. Used by `spawn` and
    /// by tests that play the worker themselves.
    pub fn from_streams(writer: Box<dyn Write + Send>, reader: impl Read + Send + 'static) -> Client {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next() {
                    Some(result) => {
                        let failed = result.is_err();
                        if tx.send(result).is_err() || failed {
                            break;
                        }
                    }
                    None => break,
                }
            }
        });
        Client {
            writer,
            lines: rx,
            child: None,
            session_id: uuid::Uuid::new_v4().to_string(),
            next_req: 0,
            timeout: None,
            dead: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    fn crash(&mut self, message: impl Into<String>) -> TnkError {
        self.dead = true;
        if let Some(child) = &mut self.child {
            let _ = child.kill();
            let _ = child.wait();
        }
        TnkError::new(ErrorKind::WorkerCrash, message)
    }

    /// One request, one response, strictly serial. Pending proxy deletes
    /// are flushed first so worker-side objects do not pile up.
    fn rpc(&mut self, mut request: Request) -> TnkResult<Response> {
        if self.dead {
            return Err(TnkError::new(
                ErrorKind::WorkerCrash,
                "worker process is no longer running",
            ));
        }
        self.flush_deletes()?;

        self.next_req += 1;
        let req_id = self.next_req;
        request.req_id = Some(req_id);

        self.send(&request)?;
        let response = self.receive()?;

        // FIFO is assumed; the echoed id is a cross-check.
        if let Some(echoed) = response.req_id() {
            if echoed != req_id {
                return Err(self.crash(format!(
                    "response id {} does not match request id {}",
                    echoed, req_id
                )));
            }
        }
        Ok(response)
    }

    fn send(&mut self, request: &Request) -> TnkResult<()> {
        let mut line = serde_json::to_string(request).map_err(|e| {
            TnkError::new(ErrorKind::ProtocolError, format!("encode failed: {}", e))
        })?;
        line.push('\n');
        if let Err(e) = self.writer.write_all(line.as_bytes()).and_then(|_| self.writer.flush()) {
            return Err(self.crash(format!("write to worker failed: {}", e)));
        }
        Ok(())
    }

    fn receive(&mut self) -> TnkResult<Response> {
        let line = match self.timeout {
            Some(timeout) => match self.lines.recv_timeout(timeout) {
                Ok(result) => result,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    return Err(self.crash("worker did not answer within the RPC timeout"));
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(self.crash("worker closed its output"));
                }
            },
            None => match self.lines.recv() {
                Ok(result) => result,
                Err(_) => return Err(self.crash("worker closed its output")),
            },
        };
        let line = line.map_err(|e| self.crash(format!("read from worker failed: {}", e)))?;
        serde_json::from_str(&line).map_err(|e| {
            TnkError::new(
                ErrorKind::ProtocolError,
                format!("malformed response line: {}", e),
            )
        })
    }

    fn flush_deletes(&mut self) -> TnkResult<()> {
        for id in proxy::take_pending_deletes() {
            let request = Request::new(Cmd::Delete, self.session_id.clone(), Target::name(id));
            // Best effort: a failed delete must not break the caller's
            // request.
            self.next_req += 1;
            let mut request = request;
            request.req_id = Some(self.next_req);
            if self.send(&request).is_err() {
                break;
            }
            if self.receive().is_err() {
                break;
            }
        }
        Ok(())
    }

    fn unwrap_value(&mut self, response: Response) -> TnkResult<Value> {
        match response {
            Response::Ok { value, .. } => Ok(codec::decode(value.unwrap_or_else(
                || WireValue::null(),
            ))),
            Response::Error { error, .. } => Err(error.into()),
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    pub fn call_function(
        &mut self,
        target: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> TnkResult<Value> {
        if policy::forbidden_target(target) {
            return Err(TnkError::new(
                ErrorKind::SecurityViolation,
                format!("Forbidden function call: {}", target),
            ));
        }
        let mut request = Request::new(
            Cmd::CallFunction,
            self.session_id.clone(),
            Target::name(target),
        );
        request.args = Some(args.into_iter().map(codec::encode).collect());
        request.kwargs = Some(
            kwargs
                .into_iter()
                .map(|(k, v)| (k, codec::encode(v)))
                .collect(),
        );
        let response = self.rpc(request)?;
        self.unwrap_value(response)
    }

    pub fn call_method(
        &mut self,
        target: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> TnkResult<Value> {
        if policy::forbidden_name(method) {
            return Err(TnkError::new(
                ErrorKind::SecurityViolation,
                format!("Forbidden method call: {}", method),
            ));
        }
        let mut request = Request::new(
            Cmd::CallMethod,
            self.session_id.clone(),
            Target::name(target),
        );
        request.method = Some(method.to_string());
        request.args = Some(args.into_iter().map(codec::encode).collect());
        request.kwargs = Some(
            kwargs
                .into_iter()
                .map(|(k, v)| (k, codec::encode(v)))
                .collect(),
        );
        let response = self.rpc(request)?;
        self.unwrap_value(response)
    }

    pub fn get_attribute(&mut self, target: &str, name: &str) -> TnkResult<Value> {
        if policy::private_attribute(name) || policy::forbidden_name(name) {
            return Err(TnkError::new(
                ErrorKind::SecurityViolation,
                format!("Forbidden attribute access: {}", name),
            ));
        }
        let mut request = Request::new(
            Cmd::GetAttribute,
            self.session_id.clone(),
            Target::name(target),
        );
        request.name = Some(name.to_string());
        let response = self.rpc(request)?;
        self.unwrap_value(response)
    }

    pub fn get_item(&mut self, target: &str, key: Value) -> TnkResult<Value> {
        let mut request = Request::new(
            Cmd::GetItem,
            self.session_id.clone(),
            Target::name(target),
        );
        request.key = Some(codec::encode(key));
        let response = self.rpc(request)?;
        self.unwrap_value(response)
    }

    pub fn slice(
        &mut self,
        target: &str,
        start: Option<Value>,
        stop: Option<Value>,
        step: Option<Value>,
    ) -> TnkResult<Value> {
        let mut request =
            Request::new(Cmd::Slice, self.session_id.clone(), Target::name(target));
        let enc = |v: Option<Value>| codec::encode(v.unwrap_or(Value::None));
        request.start = Some(enc(start));
        request.stop = Some(enc(stop));
        request.step = Some(enc(step));
        let response = self.rpc(request)?;
        self.unwrap_value(response)
    }

    /// Creates a worker-side iterator; the result is its handle.
    pub fn iter(&mut self, target: &str) -> TnkResult<Proxy> {
        let request = Request::new(Cmd::Iter, self.session_id.clone(), Target::name(target));
        let response = self.rpc(request)?;
        match self.unwrap_value(response)? {
            Value::Proxy(p) => Ok(p),
            other => Err(TnkError::new(
                ErrorKind::ProtocolError,
                format!("iter returned a non-handle {}", other.type_name()),
            )),
        }
    }

    /// Fetches up to `batch_size` elements; `done` marks exhaustion.
    pub fn iter_next_batch(
        &mut self,
        target: &str,
        batch_size: usize,
    ) -> TnkResult<(Vec<Value>, bool)> {
        let mut request = Request::new(
            Cmd::IterNextBatch,
            self.session_id.clone(),
            Target::name(target),
        );
        request.batch_size = Some(batch_size);
        let response = self.rpc(request)?;
        match response {
            Response::Ok { value, meta, .. } => {
                let done = meta.map(|m| m.done).unwrap_or(false);
                let items = match value {
                    Some(WireValue::List { items }) => {
                        items.into_iter().map(codec::decode).collect()
                    }
                    Some(other) => vec![codec::decode(other)],
                    None => Vec::new(),
                };
                Ok((items, done))
            }
            Response::Error { error, .. } => Err(error.into()),
        }
    }

    pub fn default_batch_size(&self) -> usize {
        DEFAULT_BATCH_SIZE
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(child) = &mut self.child {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
