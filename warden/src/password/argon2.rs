use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::PasswordHash;
use argon2::password_hash::PasswordHasher as Argon2PasswordHasherTrait;
use argon2::password_hash::PasswordVerifier;
use argon2::password_hash::SaltString;
use argon2::Algorithm;
use argon2::Argon2;
use argon2::Params;
use argon2::Version;

use super::errors::PasswordError;
use super::hasher::PasswordHasher;
use crate::auth_info::PasswordInfo;

/// Argon2id password hashing.
///
/// Hashes are stored in PHC string format, which embeds the algorithm,
/// parameters and salt, so [`PasswordInfo::salt`] stays empty.
#[derive(Debug, Clone)]
pub struct Argon2PasswordHasher {
    params: Params,
}

impl Argon2PasswordHasher {
    pub const ID: &'static str = "argon2";

    /// Create a hasher with the library's recommended parameters.
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    /// Create a hasher with explicit cost parameters.
    pub fn with_params(params: Params) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn hash(&self, plain_password: &str) -> Result<PasswordInfo, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(plain_password.as_bytes(), &salt)
            .map(|hash| PasswordInfo::new(Self::ID, hash.to_string()))
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    fn matches(&self, info: &PasswordInfo, plain_password: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(&info.password).map_err(|e| {
            PasswordError::VerificationFailed(format!("Invalid password hash: {}", e))
        })?;

        Ok(self
            .argon2()
            .verify_password(plain_password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    fn needs_rehash(&self, info: &PasswordInfo) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&info.password) else {
            return false;
        };

        match Params::try_from(&parsed_hash) {
            Ok(params) => {
                params.m_cost() != self.params.m_cost()
                    || params.t_cost() != self.params.t_cost()
                    || params.p_cost() != self.params.p_cost()
            }
            Err(_) => false,
        }
    }
}
