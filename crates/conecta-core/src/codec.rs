use std::{marker::PhantomData, sync::Arc};

use crate::{
    cipher::Cipher,
    diagnostics::DiagnosticSink,
    policy::{self, CodecError, CodecFailure},
};

/// A value type that can be persisted through an encrypting codec.
pub trait StoredValue: Sized {
    /// Short type label used in diagnostics.
    const TYPE_NAME: &'static str;

    /// Canonical text form that gets encrypted.
    fn to_text(&self) -> String;

    /// Rebuild the value from decrypted text. The error is a content-free reason.
    fn from_text(text: String) -> Result<Self, String>;
}

impl StoredValue for String {
    const TYPE_NAME: &'static str = "text";

    fn to_text(&self) -> String {
        self.clone()
    }

    fn from_text(text: String) -> Result<Self, String> {
        Ok(text)
    }
}

impl StoredValue for i32 {
    const TYPE_NAME: &'static str = "integer";

    fn to_text(&self) -> String {
        self.to_string()
    }

    fn from_text(text: String) -> Result<Self, String> {
        text.parse().map_err(|err: std::num::ParseIntError| err.to_string())
    }
}

impl StoredValue for i64 {
    const TYPE_NAME: &'static str = "bigint";

    fn to_text(&self) -> String {
        self.to_string()
    }

    fn from_text(text: String) -> Result<Self, String> {
        text.parse().map_err(|err: std::num::ParseIntError| err.to_string())
    }
}

/// Bidirectional mapping between a typed attribute and its stored,
/// encrypted textual form. Invoked explicitly by the mapping layer.
pub trait AttributeCodec: Send + Sync {
    type Value;

    /// Encode for storage. `None` stays `None` and the cipher is not called.
    fn to_storage(&self, value: Option<&Self::Value>) -> Result<Option<String>, CodecError>;

    /// Strict decode that surfaces the failure instead of applying the read policy.
    fn decode(&self, stored: Option<&str>) -> Result<Option<Self::Value>, CodecFailure>;

    /// Decode under the read policy: failures yield `None` plus one diagnostic.
    fn from_storage(&self, stored: Option<&str>) -> Option<Self::Value>;
}

/// Codec that encrypts the canonical text form of `T` with cipher `C`.
pub struct EncryptedCodec<T, C> {
    attribute: String,
    cipher: Arc<C>,
    sink: Arc<dyn DiagnosticSink>,
    _value: PhantomData<fn() -> T>,
}

/// Codec for 32-bit integer attributes.
pub type IntegerCodec<C> = EncryptedCodec<i32, C>;
/// Codec for text attributes.
pub type TextCodec<C> = EncryptedCodec<String, C>;

impl<T: StoredValue, C: Cipher> EncryptedCodec<T, C> {
    pub fn new(
        attribute: impl Into<String>,
        cipher: Arc<C>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            cipher,
            sink,
            _value: PhantomData,
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl<T: StoredValue, C: Cipher> AttributeCodec for EncryptedCodec<T, C> {
    type Value = T;

    fn to_storage(&self, value: Option<&T>) -> Result<Option<String>, CodecError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let encrypted = self.cipher.encrypt(&value.to_text());
        policy::enforce_on_write(&self.attribute, encrypted).map(Some)
    }

    fn decode(&self, stored: Option<&str>) -> Result<Option<T>, CodecFailure> {
        let Some(stored) = stored else {
            return Ok(None);
        };
        let plaintext = self
            .cipher
            .decrypt(stored)
            .map_err(|source| CodecFailure::Decryption {
                attribute: self.attribute.clone(),
                value_type: T::TYPE_NAME,
                stored_len: stored.len(),
                source,
            })?;
        T::from_text(plaintext)
            .map(Some)
            .map_err(|reason| CodecFailure::Parse {
                attribute: self.attribute.clone(),
                value_type: T::TYPE_NAME,
                stored_len: stored.len(),
                reason,
            })
    }

    fn from_storage(&self, stored: Option<&str>) -> Option<T> {
        policy::degrade_on_read(self.decode(stored), self.sink.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        cipher::{CipherError, MaskingCipher},
        diagnostics::{DiagnosticKind, RecordingSink},
    };

    /// Wraps the masking cipher and counts every call.
    #[derive(Default)]
    struct CountingCipher {
        encrypts: AtomicUsize,
        decrypts: AtomicUsize,
    }

    impl Cipher for CountingCipher {
        fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
            self.encrypts.fetch_add(1, Ordering::SeqCst);
            MaskingCipher.encrypt(plaintext)
        }

        fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
            self.decrypts.fetch_add(1, Ordering::SeqCst);
            MaskingCipher.decrypt(ciphertext)
        }
    }

    struct FailingCipher;

    impl Cipher for FailingCipher {
        fn encrypt(&self, _plaintext: &str) -> Result<String, CipherError> {
            Err(CipherError::encryption("key unavailable"))
        }

        fn decrypt(&self, _ciphertext: &str) -> Result<String, CipherError> {
            Err(CipherError::decryption("key unavailable"))
        }
    }

    fn codecs() -> (
        IntegerCodec<CountingCipher>,
        TextCodec<CountingCipher>,
        Arc<CountingCipher>,
        RecordingSink,
    ) {
        let cipher = Arc::new(CountingCipher::default());
        let sink = RecordingSink::new();
        let int = IntegerCodec::new("student.enrollment", cipher.clone(), Arc::new(sink.clone()));
        let text = TextCodec::new("student.name", cipher.clone(), Arc::new(sink.clone()));
        (int, text, cipher, sink)
    }

    #[test]
    fn integers_round_trip() {
        let (int, _, _, sink) = codecs();
        for n in [0, 42, -17, i32::MAX, i32::MIN] {
            let stored = int.to_storage(Some(&n)).expect("encode").expect("non-null");
            assert_ne!(stored, n.to_string());
            assert_eq!(int.from_storage(Some(stored.as_str())), Some(n));
        }
        assert!(sink.is_empty());
    }

    #[test]
    fn text_round_trips_including_empty_and_unicode() {
        let (_, text, _, sink) = codecs();
        for s in ["", "Ana Lucía", "correo@itson.edu.mx", "123"] {
            let value = s.to_string();
            let stored = text.to_storage(Some(&value)).expect("encode").expect("non-null");
            assert_eq!(text.from_storage(Some(stored.as_str())), Some(value));
        }
        assert!(sink.is_empty());
    }

    #[test]
    fn null_is_a_fixed_point_and_never_reaches_cipher() {
        let (int, text, cipher, sink) = codecs();

        assert_eq!(int.to_storage(None).expect("encode"), None);
        assert_eq!(int.from_storage(None), None);
        assert_eq!(text.to_storage(None).expect("encode"), None);
        assert_eq!(text.from_storage(None), None);

        assert_eq!(cipher.encrypts.load(Ordering::SeqCst), 0);
        assert_eq!(cipher.decrypts.load(Ordering::SeqCst), 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn undecryptable_value_degrades_with_one_diagnostic() {
        let (int, _, _, sink) = codecs();

        assert_eq!(int.from_storage(Some("not-a-ciphertext")), None);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, DiagnosticKind::DecryptionFailed);
        assert_eq!(events[0].attribute, "student.enrollment");
        assert!(!events[0].reason.contains("not-a-ciphertext"));
    }

    #[test]
    fn non_numeric_plaintext_fails_integer_codec_only() {
        let (int, text, cipher, sink) = codecs();
        let stored = cipher.encrypt("doce").expect("encrypt");

        assert_eq!(int.from_storage(Some(stored.as_str())), None);
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, DiagnosticKind::ParseFailed);
        assert_eq!(events[0].value_type, "integer");
        assert!(!events[0].reason.contains("doce"));

        assert_eq!(text.from_storage(Some(stored.as_str())), Some("doce".to_string()));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn strict_decode_surfaces_the_failure() {
        let (int, _, cipher, sink) = codecs();
        let stored = cipher.encrypt("4x2").expect("encrypt");

        let err = int.decode(Some(stored.as_str())).expect_err("parse should fail");
        assert!(matches!(err, CodecFailure::Parse { .. }));
        assert!(sink.is_empty(), "strict decode must not report");
    }

    #[test]
    fn encryption_failure_propagates_on_write() {
        let codec: TextCodec<FailingCipher> = TextCodec::new(
            "student.email",
            Arc::new(FailingCipher),
            Arc::new(RecordingSink::new()),
        );
        let err = codec
            .to_storage(Some(&"a@b.c".to_string()))
            .expect_err("write must fail");
        assert!(matches!(err, CodecError::Encryption { .. }));
    }

    #[test]
    fn bigint_codec_uses_the_same_contract() {
        let sink = RecordingSink::new();
        let codec: EncryptedCodec<i64, MaskingCipher> =
            EncryptedCodec::new("student.phone", Arc::new(MaskingCipher), Arc::new(sink.clone()));
        let stored = codec
            .to_storage(Some(&6_441_234_567))
            .expect("encode")
            .expect("non-null");
        assert_eq!(codec.from_storage(Some(stored.as_str())), Some(6_441_234_567));
        assert_eq!(codec.attribute(), "student.phone");
    }
}
