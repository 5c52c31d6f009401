use std::{
    fmt,
    sync::{Arc, Mutex},
};

use serde::Serialize;
use tracing::warn;

/// Kind of condition a codec reports when it degrades a read to `None`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Stored ciphertext could not be decrypted (wrong key, corruption, tampering).
    DecryptionFailed,
    /// Decryption succeeded but the plaintext is not a valid value of the target type.
    ParseFailed,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::DecryptionFailed => f.write_str("decryption_failed"),
            DiagnosticKind::ParseFailed => f.write_str("parse_failed"),
        }
    }
}

/// Reportable codec condition. Carries only safe context: never the
/// plaintext or the ciphertext itself.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CodecDiagnostic {
    pub kind: DiagnosticKind,
    /// Logical attribute name, e.g. `student.email`.
    pub attribute: String,
    /// Target value type, e.g. `integer` or `text`.
    pub value_type: &'static str,
    /// Length in bytes of the stored value that failed.
    pub stored_len: usize,
    /// Content-free reason from the cipher or parser.
    pub reason: String,
}

/// Observability interface that records reportable conditions without
/// altering control flow.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, event: &CodecDiagnostic);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for Arc<S> {
    fn report(&self, event: &CodecDiagnostic) {
        (**self).report(event)
    }
}

/// Sink that emits each diagnostic as a structured `tracing` warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, event: &CodecDiagnostic) {
        warn!(
            kind = %event.kind,
            attribute = %event.attribute,
            value_type = event.value_type,
            stored_len = event.stored_len,
            reason = %event.reason,
            "stored attribute degraded to null"
        );
    }
}

/// In-memory sink that keeps every diagnostic; used by tests and the health check.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<CodecDiagnostic>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the diagnostics reported so far.
    pub fn events(&self) -> Vec<CodecDiagnostic> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, event: &CodecDiagnostic) {
        // A poisoned lock still holds valid data; keep recording.
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
    }
}
