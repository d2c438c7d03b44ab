use hmac::Hmac;
use hmac::Mac;
use serde::Deserialize;
use sha2::Sha256;

use super::errors::SignerError;
use crate::settings::require_secret;
use crate::settings::ConfigError;

type HmacSha256 = Hmac<Sha256>;

const VERSION: &str = "1";

/// Settings for the [`Signer`].
#[derive(Debug, Clone, Deserialize)]
pub struct SignerSettings {
    /// Secret HMAC key
    pub key: String,

    /// Constant mixed into every signed message
    #[serde(default = "SignerSettings::default_pepper")]
    pub pepper: String,
}

impl SignerSettings {
    pub const MIN_KEY_LENGTH: usize = 16;

    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            pepper: Self::default_pepper(),
        }
    }

    fn default_pepper() -> String {
        "-warden-signer-".to_string()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_secret("signer.key", &self.key, Self::MIN_KEY_LENGTH)
    }
}

/// HMAC-SHA256 signer for values that travel through the client.
///
/// Signed values have the form `1-<hex mac>-<data>`, where the MAC covers
/// `pepper + data`.
#[derive(Clone)]
pub struct Signer {
    mac: HmacSha256,
    pepper: String,
}

impl Signer {
    /// Create a signer from validated settings.
    ///
    /// # Errors
    /// * `SecretTooShort` - The key is shorter than 16 bytes
    pub fn new(settings: SignerSettings) -> Result<Self, ConfigError> {
        settings.validate()?;

        let mac = HmacSha256::new_from_slice(settings.key.as_bytes()).map_err(|_| {
            ConfigError::SecretTooShort {
                field: "signer.key",
                minimum: SignerSettings::MIN_KEY_LENGTH,
                actual: settings.key.len(),
            }
        })?;

        Ok(Self {
            mac,
            pepper: settings.pepper,
        })
    }

    /// Sign `data` and prepend the signature.
    pub fn sign(&self, data: &str) -> String {
        let signature = hex::encode(self.compute(data).finalize().into_bytes());
        format!("{}-{}-{}", VERSION, signature, data)
    }

    /// Verify a signed value and return the embedded data.
    ///
    /// # Errors
    /// * `InvalidFormat` - Value is not `version-signature-data`
    /// * `UnknownVersion` - Value was produced by an unknown signer version
    /// * `InvalidSignature` - Signature does not match the data
    pub fn extract(&self, signed: &str) -> Result<String, SignerError> {
        let mut parts = signed.splitn(3, '-');
        let (version, signature, data) = match (parts.next(), parts.next(), parts.next()) {
            (Some(version), Some(signature), Some(data)) => (version, signature, data),
            _ => return Err(SignerError::InvalidFormat),
        };

        if version != VERSION {
            return Err(SignerError::UnknownVersion(version.to_string()));
        }

        let signature = hex::decode(signature).map_err(|_| SignerError::InvalidFormat)?;

        self.compute(data)
            .verify_slice(&signature)
            .map_err(|_| SignerError::InvalidSignature)?;

        Ok(data.to_string())
    }

    fn compute(&self, data: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(self.pepper.as_bytes());
        mac.update(data.as_bytes());
        mac
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}
