use rand::rngs::OsRng;
use rand::RngCore;

use super::errors::IdGeneratorError;

/// Generator for opaque authenticator and state identifiers.
#[cfg_attr(test, mockall::automock)]
pub trait IdGenerator: Send + Sync + 'static {
    /// Generate a new identifier.
    ///
    /// # Errors
    /// * `RandomSource` - The underlying random source failed
    fn generate(&self) -> Result<String, IdGeneratorError>;
}

/// Hex-encoded identifiers drawn from the operating system CSPRNG.
///
/// `OsRng` holds no state of its own, so a single generator can be shared
/// across threads and requests without locking.
#[derive(Debug, Clone, Copy)]
pub struct SecureRandomIdGenerator {
    size_in_bytes: usize,
}

impl SecureRandomIdGenerator {
    pub const DEFAULT_SIZE_IN_BYTES: usize = 128;

    pub fn new(size_in_bytes: usize) -> Self {
        Self { size_in_bytes }
    }
}

impl Default for SecureRandomIdGenerator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE_IN_BYTES)
    }
}

impl IdGenerator for SecureRandomIdGenerator {
    fn generate(&self) -> Result<String, IdGeneratorError> {
        let mut bytes = vec![0u8; self.size_in_bytes];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| IdGeneratorError::RandomSource(e.to_string()))?;

        Ok(hex::encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_length() {
        let generator = SecureRandomIdGenerator::new(16);
        let id = generator.generate().unwrap();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_ids_differ() {
        let generator = SecureRandomIdGenerator::default();
        assert_ne!(generator.generate().unwrap(), generator.generate().unwrap());
    }
}
