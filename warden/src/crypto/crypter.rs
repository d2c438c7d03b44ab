use aes_gcm::aead::Aead;
use aes_gcm::aead::KeyInit;
use aes_gcm::Aes256Gcm;
use aes_gcm::Nonce;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Deserialize;
use sha2::Digest;
use sha2::Sha256;

use super::errors::CrypterError;
use crate::settings::require_secret;
use crate::settings::ConfigError;

const VERSION: &str = "1";
const NONCE_LENGTH: usize = 12;

/// Settings for the [`Crypter`].
#[derive(Debug, Clone, Deserialize)]
pub struct CrypterSettings {
    /// Secret the AES key is derived from
    pub key: String,
}

impl CrypterSettings {
    pub const MIN_KEY_LENGTH: usize = 16;

    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_secret("crypter.key", &self.key, Self::MIN_KEY_LENGTH)
    }
}

/// AES-256-GCM encryption for values that travel through the client.
///
/// The AES key is the SHA-256 digest of the configured secret. Every call to
/// [`Crypter::encrypt`] uses a fresh random nonce, so encrypting the same
/// value twice yields different output. Encrypted values have the form
/// `1-<base64(nonce || ciphertext)>`.
#[derive(Clone)]
pub struct Crypter {
    cipher: Aes256Gcm,
}

impl Crypter {
    /// Create a crypter from validated settings.
    ///
    /// # Errors
    /// * `SecretTooShort` - The key is shorter than 16 bytes
    pub fn new(settings: CrypterSettings) -> Result<Self, ConfigError> {
        settings.validate()?;

        let key = Sha256::digest(settings.key.as_bytes());
        Ok(Self {
            cipher: Aes256Gcm::new(&key),
        })
    }

    /// Encrypt a value.
    ///
    /// # Errors
    /// * `EncryptionFailed` - The cipher rejected the input
    pub fn encrypt(&self, value: &str) -> Result<String, CrypterError> {
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng
            .try_fill_bytes(&mut nonce_bytes)
            .map_err(|e| CrypterError::EncryptionFailed(e.to_string()))?;

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), value.as_bytes())
            .map_err(|e| CrypterError::EncryptionFailed(e.to_string()))?;

        let mut payload = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);

        Ok(format!("{}-{}", VERSION, STANDARD.encode(payload)))
    }

    /// Decrypt a value produced by [`Crypter::encrypt`].
    ///
    /// # Errors
    /// * `InvalidFormat` - Value is not `version-payload` or the payload is truncated
    /// * `UnknownVersion` - Value was produced by an unknown crypter version
    /// * `DecryptionFailed` - Authentication tag mismatch or non UTF-8 plaintext
    pub fn decrypt(&self, value: &str) -> Result<String, CrypterError> {
        let (version, payload) = value.split_once('-').ok_or(CrypterError::InvalidFormat)?;
        if version != VERSION {
            return Err(CrypterError::UnknownVersion(version.to_string()));
        }

        let payload = STANDARD
            .decode(payload)
            .map_err(|_| CrypterError::InvalidFormat)?;
        if payload.len() <= NONCE_LENGTH {
            return Err(CrypterError::InvalidFormat);
        }

        let (nonce, ciphertext) = payload.split_at(NONCE_LENGTH);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| CrypterError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext).map_err(|e| CrypterError::DecryptionFailed(e.to_string()))
    }
}

impl std::fmt::Debug for Crypter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crypter").finish_non_exhaustive()
    }
}
