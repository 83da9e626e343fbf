//! Companion worker: a single-threaded NDJSON dispatcher.
//!
//! One JSON request per stdin line, one JSON response per stdout line,
//! flushed immediately. Caller-induced failures are reported in-band; the
//! process exits only on unrecoverable host-side I/O failures.
//! Diagnostics go to stderr.

mod codec;
mod dispatch;
mod modules;
mod object;
mod store;

#[cfg(test)]
mod dispatch_tests;

use std::io::{BufRead, Write};

use dispatch::Worker;

fn main() {
    eprintln!("[worker] tanuki-worker {} ready", env!("CARGO_PKG_VERSION"));

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut worker = Worker::new();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("[worker] stdin failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let response = worker.handle_line(&line);
        if writeln!(out, "{}", response).and_then(|_| out.flush()).is_err() {
            // Unrecoverable: the host side is gone.
            eprintln!("[worker] stdout failed, exiting");
            std::process::exit(1);
        }
    }
}
