use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

/// Errors produced by cipher implementations.
///
/// Reasons are short and content-free: they never echo plaintext or ciphertext.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// Plaintext could not be encrypted.
    #[error("encryption failed: {reason}")]
    Encryption { reason: String },
    /// Ciphertext was malformed, tampered, or produced under another key.
    #[error("decryption failed: {reason}")]
    Decryption { reason: String },
}

impl CipherError {
    pub fn encryption(reason: impl Into<String>) -> Self {
        Self::Encryption {
            reason: reason.into(),
        }
    }

    pub fn decryption(reason: impl Into<String>) -> Self {
        Self::Decryption {
            reason: reason.into(),
        }
    }
}

/// Symmetric text cipher used to protect persisted attributes.
///
/// Implementations must never return the plaintext unchanged from `encrypt`, and
/// must report a failed `decrypt` as [`CipherError::Decryption`] rather than an
/// empty or zero plaintext.
pub trait Cipher: Send + Sync {
    /// Encrypt `plaintext` into its stored textual form.
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;

    /// Recover the plaintext from a value previously produced by `encrypt`.
    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError>;
}

impl<C: Cipher + ?Sized> Cipher for std::sync::Arc<C> {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        (**self).encrypt(plaintext)
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        (**self).decrypt(ciphertext)
    }
}

const MASK_TAG: &str = "m1.";
const MASK_BYTE: u8 = 0xA5;

/// Reversible masking cipher for tests and smoke runs.
/// This is not cryptographically secure; production code must use the
/// AES-GCM cipher from `conecta-storage`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaskingCipher;

impl Cipher for MaskingCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let masked: Vec<u8> = plaintext.bytes().map(|b| b ^ MASK_BYTE).collect();
        Ok(format!("{MASK_TAG}{}", STANDARD.encode(masked)))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let body = ciphertext
            .strip_prefix(MASK_TAG)
            .ok_or_else(|| CipherError::decryption("unknown format tag"))?;
        let masked = STANDARD
            .decode(body)
            .map_err(|_| CipherError::decryption("invalid base64 payload"))?;
        let bytes: Vec<u8> = masked.into_iter().map(|b| b ^ MASK_BYTE).collect();
        String::from_utf8(bytes).map_err(|_| CipherError::decryption("plaintext is not utf-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masking_round_trips_and_hides_plaintext() {
        let cipher = MaskingCipher;
        let stored = cipher.encrypt("matricula").expect("encrypt");
        assert!(!stored.contains("matricula"));
        assert_eq!(cipher.decrypt(&stored).expect("decrypt"), "matricula");
    }

    #[test]
    fn empty_plaintext_is_still_tagged() {
        let stored = MaskingCipher.encrypt("").expect("encrypt");
        assert_eq!(stored, MASK_TAG);
        assert_eq!(MaskingCipher.decrypt(&stored).expect("decrypt"), "");
    }

    #[test]
    fn rejects_untagged_and_garbled_input() {
        let err = MaskingCipher.decrypt("plain").expect_err("missing tag");
        assert!(matches!(err, CipherError::Decryption { .. }));

        let err = MaskingCipher.decrypt("m1.***").expect_err("bad base64");
        assert!(matches!(err, CipherError::Decryption { .. }));
    }

    #[test]
    fn error_messages_do_not_echo_input() {
        let err = MaskingCipher.decrypt("secret-value").expect_err("fails");
        assert!(!err.to_string().contains("secret-value"));
    }
}
