pub mod argon2;
pub mod errors;
pub mod hasher;
pub mod registry;
pub mod sha256;

pub use self::argon2::Argon2PasswordHasher;
pub use errors::PasswordError;
pub use hasher::PasswordHasher;
pub use registry::PasswordHasherRegistry;
pub use sha256::Sha256PasswordHasher;
