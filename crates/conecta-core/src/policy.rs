//! Uniform failure handling for attribute codecs.
//!
//! * `None` never reaches the cipher, in either direction.
//! * A read that cannot recover a value degrades to `None` and reports exactly
//!   one [`CodecDiagnostic`] to the injected sink.
//! * A write whose encryption fails is a hard error; nothing is stored in its place.

use thiserror::Error;

use crate::{
    cipher::CipherError,
    diagnostics::{CodecDiagnostic, DiagnosticKind, DiagnosticSink},
};

/// Read-path outcome when stored ciphertext cannot yield a valid value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecFailure {
    #[error("cannot decrypt {attribute}: {source}")]
    Decryption {
        attribute: String,
        value_type: &'static str,
        stored_len: usize,
        source: CipherError,
    },
    /// Numeric codecs only: the plaintext did not parse.
    #[error("stored {attribute} is not a valid {value_type}: {reason}")]
    Parse {
        attribute: String,
        value_type: &'static str,
        stored_len: usize,
        reason: String,
    },
}

impl CodecFailure {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            CodecFailure::Decryption { .. } => DiagnosticKind::DecryptionFailed,
            CodecFailure::Parse { .. } => DiagnosticKind::ParseFailed,
        }
    }

    /// Safe diagnostic describing this failure.
    pub fn diagnostic(&self) -> CodecDiagnostic {
        match self {
            CodecFailure::Decryption {
                attribute,
                value_type,
                stored_len,
                source,
            } => CodecDiagnostic {
                kind: self.kind(),
                attribute: attribute.clone(),
                value_type: *value_type,
                stored_len: *stored_len,
                reason: source.to_string(),
            },
            CodecFailure::Parse {
                attribute,
                value_type,
                stored_len,
                reason,
            } => CodecDiagnostic {
                kind: self.kind(),
                attribute: attribute.clone(),
                value_type: *value_type,
                stored_len: *stored_len,
                reason: reason.clone(),
            },
        }
    }
}

/// Write-path failure. Always propagated to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("cannot encrypt {attribute}: {source}")]
    Encryption {
        attribute: String,
        source: CipherError,
    },
}

/// Apply the read policy: failures become `None` after one report to `sink`.
pub fn degrade_on_read<T>(
    outcome: Result<Option<T>, CodecFailure>,
    sink: &dyn DiagnosticSink,
) -> Option<T> {
    match outcome {
        Ok(value) => value,
        Err(failure) => {
            sink.report(&failure.diagnostic());
            None
        }
    }
}

/// Apply the write policy: an encryption failure aborts the write.
pub fn enforce_on_write(
    attribute: &str,
    encrypted: Result<String, CipherError>,
) -> Result<String, CodecError> {
    encrypted.map_err(|source| CodecError::Encryption {
        attribute: attribute.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingSink;

    #[test]
    fn success_passes_through_without_reporting() {
        let sink = RecordingSink::new();
        assert_eq!(degrade_on_read(Ok(Some(7)), &sink), Some(7));
        assert_eq!(degrade_on_read::<i32>(Ok(None), &sink), None);
        assert!(sink.is_empty());
    }

    #[test]
    fn failure_degrades_to_none_and_reports_once() {
        let sink = RecordingSink::new();
        let failure = CodecFailure::Decryption {
            attribute: "student.name".into(),
            value_type: "text",
            stored_len: 40,
            source: CipherError::decryption("authentication failed"),
        };

        assert_eq!(degrade_on_read::<String>(Err(failure), &sink), None);
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, DiagnosticKind::DecryptionFailed);
        assert_eq!(events[0].attribute, "student.name");
        assert_eq!(events[0].stored_len, 40);
    }

    #[test]
    fn write_failure_is_propagated() {
        let err = enforce_on_write("student.email", Err(CipherError::encryption("no key")))
            .expect_err("must propagate");
        assert!(matches!(err, CodecError::Encryption { ref attribute, .. } if attribute == "student.email"));
    }
}
