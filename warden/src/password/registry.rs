use std::sync::Arc;

use super::hasher::PasswordHasher;
use crate::auth_info::PasswordInfo;

/// The current password hasher plus hashers kept for older hashes.
#[derive(Clone)]
pub struct PasswordHasherRegistry {
    current: Arc<dyn PasswordHasher>,
    deprecated: Vec<Arc<dyn PasswordHasher>>,
}

impl PasswordHasherRegistry {
    /// Create a registry.
    ///
    /// # Arguments
    /// * `current` - Hasher for every new hash
    /// * `deprecated` - Hashers that can still verify older hashes
    pub fn new(current: Arc<dyn PasswordHasher>, deprecated: Vec<Arc<dyn PasswordHasher>>) -> Self {
        Self {
            current,
            deprecated,
        }
    }

    /// Hasher used for every new hash.
    pub fn current(&self) -> &Arc<dyn PasswordHasher> {
        &self.current
    }

    /// Hasher able to verify `info`, if one is registered.
    ///
    /// # Arguments
    /// * `info` - Stored hash whose algorithm tag is looked up
    ///
    /// # Returns
    /// The current hasher when it is suitable, otherwise the first suitable
    /// deprecated one, or `None` when no hasher recognises the tag
    pub fn find(&self, info: &PasswordInfo) -> Option<&Arc<dyn PasswordHasher>> {
        std::iter::once(&self.current)
            .chain(self.deprecated.iter())
            .find(|hasher| hasher.is_suitable(info))
    }

    /// Tags of every registered hasher, current first.
    pub fn supported(&self) -> Vec<&'static str> {
        std::iter::once(&self.current)
            .chain(self.deprecated.iter())
            .map(|hasher| hasher.id())
            .collect()
    }
}

impl std::fmt::Debug for PasswordHasherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasherRegistry")
            .field("supported", &self.supported())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::Argon2PasswordHasher;
    use crate::password::Sha256PasswordHasher;

    fn registry() -> PasswordHasherRegistry {
        PasswordHasherRegistry::new(
            Arc::new(Argon2PasswordHasher::new()),
            vec![Arc::new(Sha256PasswordHasher)],
        )
    }

    #[test]
    fn test_find_by_tag() {
        let registry = registry();

        let legacy = registry.find(&PasswordInfo::new("sha256", "x")).unwrap();
        assert_eq!(legacy.id(), "sha256");

        let current = registry.find(&PasswordInfo::new("argon2", "x")).unwrap();
        assert_eq!(current.id(), "argon2");

        assert!(registry.find(&PasswordInfo::new("bcrypt", "x")).is_none());
    }

    #[test]
    fn test_supported() {
        assert_eq!(registry().supported(), vec!["argon2", "sha256"]);
    }
}
