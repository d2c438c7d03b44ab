pub mod crypter;
pub mod errors;
pub mod fingerprint;
pub mod id_generator;
pub mod signer;

pub use crypter::Crypter;
pub use crypter::CrypterSettings;
pub use errors::CrypterError;
pub use errors::IdGeneratorError;
pub use errors::SignerError;
pub use fingerprint::DefaultFingerprintGenerator;
pub use fingerprint::FingerprintGenerator;
pub use id_generator::IdGenerator;
#[cfg(test)]
pub use id_generator::MockIdGenerator;
pub use id_generator::SecureRandomIdGenerator;
pub use signer::Signer;
pub use signer::SignerSettings;
