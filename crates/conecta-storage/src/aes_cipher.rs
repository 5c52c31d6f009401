use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use conecta_core::cipher::{Cipher, CipherError};

use crate::key_provider::KeyMaterial;

/// Format tag prefixed to every stored value.
pub const FORMAT_TAG: &str = "v1.";

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// AES-256-GCM attribute cipher.
///
/// Stored form: `v1.` followed by URL-safe unpadded base64 of
/// `nonce || ciphertext || tag`. A fresh random nonce is drawn per call, so
/// equal plaintexts encrypt to different strings.
pub struct AesGcmCipher {
    key_id: String,
    cipher: Aes256Gcm,
}

impl AesGcmCipher {
    pub fn new(material: &KeyMaterial) -> Result<Self, CipherError> {
        let cipher = Aes256Gcm::new_from_slice(&material.bytes)
            .map_err(|_| CipherError::encryption("cipher init failed"))?;
        Ok(Self {
            key_id: material.id.clone(),
            cipher,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

impl Cipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::encryption("aead seal failed"))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + sealed.len());
        payload.extend_from_slice(nonce.as_slice());
        payload.extend_from_slice(&sealed);
        Ok(format!("{FORMAT_TAG}{}", URL_SAFE_NO_PAD.encode(payload)))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let body = ciphertext
            .strip_prefix(FORMAT_TAG)
            .ok_or_else(|| CipherError::decryption("unknown format tag"))?;
        let payload = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|_| CipherError::decryption("invalid base64 payload"))?;
        if payload.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::decryption("payload too short"));
        }

        let (nonce, sealed) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CipherError::decryption("authentication failed"))?;
        String::from_utf8(plaintext).map_err(|_| CipherError::decryption("plaintext is not utf-8"))
    }
}
