use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Digest;
use sha2::Sha256;

use super::errors::PasswordError;
use super::hasher::PasswordHasher;
use crate::auth_info::PasswordInfo;

const SALT_LENGTH: usize = 16;

/// Salted SHA-256 password hashing.
///
/// Kept so that accounts created before the switch to Argon2 can still sign
/// in; the credentials provider re-hashes them on their next successful login.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256PasswordHasher;

impl Sha256PasswordHasher {
    pub const ID: &'static str = "sha256";

    fn digest(salt: &str, plain_password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(plain_password.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl PasswordHasher for Sha256PasswordHasher {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn hash(&self, plain_password: &str) -> Result<PasswordInfo, PasswordError> {
        let mut salt = [0u8; SALT_LENGTH];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;
        let salt = hex::encode(salt);

        Ok(PasswordInfo::new(Self::ID, Self::digest(&salt, plain_password)).with_salt(salt))
    }

    fn matches(&self, info: &PasswordInfo, plain_password: &str) -> Result<bool, PasswordError> {
        let salt = info.salt.as_deref().ok_or_else(|| {
            PasswordError::VerificationFailed("Missing salt for sha256 hash".to_string())
        })?;

        let expected = Self::digest(salt, plain_password);
        Ok(constant_time_eq(expected.as_bytes(), info.password.as_bytes()))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = Sha256PasswordHasher;
        let info = hasher.hash("password").unwrap();

        assert_eq!(info.hasher, "sha256");
        assert!(info.salt.is_some());
        assert!(hasher.matches(&info, "password").unwrap());
        assert!(!hasher.matches(&info, "Password").unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let hasher = Sha256PasswordHasher;
        let a = hasher.hash("password").unwrap();
        let b = hasher.hash("password").unwrap();

        assert_ne!(a.password, b.password);
    }

    #[test]
    fn test_missing_salt() {
        let info = PasswordInfo::new("sha256", "abcd");
        assert!(matches!(
            Sha256PasswordHasher.matches(&info, "password"),
            Err(PasswordError::VerificationFailed(_))
        ));
    }
}
