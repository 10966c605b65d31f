//! Where calls report what happened to them.
//!
//! Calls never log directly; they hold an `Arc<dyn Diagnostics>` so a
//! session can route reports to `tracing` in production and to memory in
//! tests.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{trace, warn};

use crate::reply::ErrorCode;

/// A call the server rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallFailure {
    /// Call id.
    pub id: u32,
    /// Operation number.
    pub op: u32,
    /// First reply parameter, when it is an integer.
    pub error_code: Option<i64>,
}

impl fmt::Display for CallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RPC call #{} ({}) failed", self.id, self.op)?;
        match self.error_code {
            Some(code) => {
                let name = ErrorCode::from_code(code).description();
                write!(f, " with error #{code} ({name})")
            }
            None => f.write_str(" without an error code"),
        }
    }
}

/// Sink for call-level reports.
///
/// Implementations must accept concurrent calls; each report is delivered
/// whole.
pub trait Diagnostics: Send + Sync {
    /// A reply with `success == false` was attached.
    fn call_failed(&self, failure: &CallFailure);

    /// A frame was handed to a writer.
    fn frame_written(&self, _id: u32, _op: u32, _frame: &[u8]) {}
}

/// Reports through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn call_failed(&self, failure: &CallFailure) {
        warn!(
            call_id = failure.id,
            op = failure.op,
            error_code = failure.error_code,
            "{failure}"
        );
    }

    fn frame_written(&self, id: u32, op: u32, frame: &[u8]) {
        trace!(
            call_id = id,
            op,
            frame = %String::from_utf8_lossy(frame).trim_end(),
            "wrote frame"
        );
    }
}

/// Keeps every failure in memory.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    failures: Mutex<Vec<CallFailure>>,
    frames: Mutex<Vec<Vec<u8>>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Failures recorded so far, oldest first.
    pub fn failures(&self) -> Vec<CallFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Frames recorded so far, oldest first.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn call_failed(&self, failure: &CallFailure) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*failure);
    }

    fn frame_written(&self, _id: u32, _op: u32, frame: &[u8]) {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame.to_vec());
    }
}

/// Process default, shared by calls that were not given a sink.
pub(crate) fn default_diagnostics() -> Arc<dyn Diagnostics> {
    Arc::new(TracingDiagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_names_call_and_code() {
        let failure = CallFailure {
            id: 12,
            op: 86,
            error_code: Some(14),
        };
        assert_eq!(
            failure.to_string(),
            "RPC call #12 (86) failed with error #14 (no-such-text)"
        );
    }

    #[test]
    fn failure_message_without_code() {
        let failure = CallFailure {
            id: 1,
            op: 2,
            error_code: None,
        };
        assert_eq!(
            failure.to_string(),
            "RPC call #1 (2) failed without an error code"
        );
    }

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemoryDiagnostics::new();
        for id in 0..3 {
            sink.call_failed(&CallFailure {
                id,
                op: 1,
                error_code: Some(0),
            });
        }
        let ids: Vec<u32> = sink.failures().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn memory_sink_survives_concurrent_reports() {
        let sink = MemoryDiagnostics::new();
        let handles: Vec<_> = (0..8)
            .map(|id| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    sink.call_failed(&CallFailure {
                        id,
                        op: 7,
                        error_code: Some(i64::from(id)),
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let failures = sink.failures();
        assert_eq!(failures.len(), 8);
        assert!(failures.iter().all(|f| f.error_code == Some(i64::from(f.id))));
    }
}
