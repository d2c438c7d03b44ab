use super::errors::PasswordError;
use crate::auth_info::PasswordInfo;

/// A password hashing algorithm identified by a stable tag.
///
/// The tag is stored alongside every hash in [`PasswordInfo::hasher`] so the
/// matching hasher can be found again after the default algorithm changes.
pub trait PasswordHasher: Send + Sync + 'static {
    /// Tag written into [`PasswordInfo::hasher`].
    fn id(&self) -> &'static str;

    /// Hash a plaintext password.
    ///
    /// # Errors
    /// * `HashingFailed` - Hashing operation failed
    fn hash(&self, plain_password: &str) -> Result<PasswordInfo, PasswordError>;

    /// Check a plaintext password against stored password info.
    ///
    /// # Errors
    /// * `VerificationFailed` - Stored hash cannot be parsed
    fn matches(&self, info: &PasswordInfo, plain_password: &str) -> Result<bool, PasswordError>;

    /// True if this hasher produced `info`.
    fn is_suitable(&self, info: &PasswordInfo) -> bool {
        info.hasher == self.id()
    }

    /// True if `info` was produced by this hasher with outdated parameters.
    fn needs_rehash(&self, _info: &PasswordInfo) -> bool {
        false
    }
}
