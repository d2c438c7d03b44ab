use serde::Deserialize;

use super::errors::CredentialsError;
use crate::auth_info::AuthInfoRegistry;
use crate::login_info::LoginInfo;
use crate::password::PasswordHasherRegistry;

/// Identifier and plaintext password submitted by a user.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub identifier: String,
    pub password: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            password: password.into(),
        }
    }
}

/// Authenticates identifier/password pairs against stored password info.
///
/// A password stored with a deprecated hasher, or with outdated parameters,
/// is re-hashed with the current hasher after it has been verified.
#[derive(Debug, Clone)]
pub struct CredentialsProvider {
    auth_info: AuthInfoRegistry,
    hashers: PasswordHasherRegistry,
}

impl CredentialsProvider {
    pub const ID: &'static str = "credentials";

    pub fn new(auth_info: AuthInfoRegistry, hashers: PasswordHasherRegistry) -> Self {
        Self { auth_info, hashers }
    }

    pub fn id(&self) -> &'static str {
        Self::ID
    }

    /// Login info under which an identifier's password is stored.
    pub fn login_info(identifier: &str) -> LoginInfo {
        LoginInfo::new(Self::ID, identifier)
    }

    /// Verify credentials and return the matching login.
    ///
    /// # Errors
    /// * `IdentityNotFound` - No password is stored for the identifier
    /// * `UnsupportedHasher` - The stored password uses an unregistered hasher
    /// * `InvalidPassword` - The password does not match
    /// * `AuthInfo` - Password store failed
    /// * `Password` - Verification or re-hashing failed
    pub async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<LoginInfo, CredentialsError> {
        let login_info = Self::login_info(&credentials.identifier);

        let stored = self
            .auth_info
            .find_password(&login_info)
            .await?
            .ok_or_else(|| CredentialsError::IdentityNotFound {
                provider_id: Self::ID,
                identifier: credentials.identifier.clone(),
            })?;

        let hasher = self
            .hashers
            .find(&stored)
            .ok_or_else(|| CredentialsError::UnsupportedHasher {
                provider_id: Self::ID,
                hasher: stored.hasher.clone(),
                supported: self.hashers.supported(),
            })?;

        if !hasher.matches(&stored, &credentials.password)? {
            return Err(CredentialsError::InvalidPassword {
                provider_id: Self::ID,
            });
        }

        let current = self.hashers.current();
        if hasher.id() != current.id() || current.needs_rehash(&stored) {
            let rehashed = current.hash(&credentials.password)?;
            self.auth_info
                .update(&login_info, rehashed.into())
                .await?;
            tracing::info!(
                login = %login_info,
                from = %stored.hasher,
                to = current.id(),
                "Re-hashed password with current hasher"
            );
        }

        Ok(login_info)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use argon2::Params;

    use super::*;
    use crate::auth_info::AuthInfoError;
    use crate::auth_info::AuthInfoKind;
    use crate::auth_info::InMemoryAuthInfoDao;
    use crate::auth_info::PasswordInfo;
    use crate::password::Argon2PasswordHasher;
    use crate::password::PasswordHasher;
    use crate::password::Sha256PasswordHasher;

    fn argon2() -> Argon2PasswordHasher {
        Argon2PasswordHasher::with_params(Params::new(8 * 1024, 1, 1, None).unwrap())
    }

    fn provider() -> (CredentialsProvider, AuthInfoRegistry) {
        let registry = AuthInfoRegistry::builder()
            .register(AuthInfoKind::Password, Arc::new(InMemoryAuthInfoDao::new()))
            .build();
        let hashers =
            PasswordHasherRegistry::new(Arc::new(argon2()), vec![Arc::new(Sha256PasswordHasher)]);
        (CredentialsProvider::new(registry.clone(), hashers), registry)
    }

    async fn store(registry: &AuthInfoRegistry, identifier: &str, info: PasswordInfo) {
        registry
            .add(&CredentialsProvider::login_info(identifier), info.into())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_current_hasher_success_leaves_store_unchanged() {
        let (provider, registry) = provider();
        let info = argon2().hash("s3cret").unwrap();
        store(&registry, "alice@example.com", info.clone()).await;

        let login_info = provider
            .authenticate(&Credentials::new("alice@example.com", "s3cret"))
            .await
            .unwrap();

        assert_eq!(login_info, LoginInfo::new("credentials", "alice@example.com"));
        assert_eq!(registry.find_password(&login_info).await.unwrap(), Some(info));
    }

    #[tokio::test]
    async fn test_legacy_hash_is_migrated() {
        let (provider, registry) = provider();
        let legacy = Sha256PasswordHasher.hash("s3cret").unwrap();
        store(&registry, "bob@example.com", legacy).await;

        let login_info = provider
            .authenticate(&Credentials::new("bob@example.com", "s3cret"))
            .await
            .unwrap();

        let migrated = registry.find_password(&login_info).await.unwrap().unwrap();
        assert_eq!(migrated.hasher, "argon2");
        assert!(argon2().matches(&migrated, "s3cret").unwrap());

        provider
            .authenticate(&Credentials::new("bob@example.com", "s3cret"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wrong_password_leaves_store_unchanged() {
        let (provider, registry) = provider();
        let legacy = Sha256PasswordHasher.hash("s3cret").unwrap();
        store(&registry, "bob@example.com", legacy.clone()).await;

        let result = provider
            .authenticate(&Credentials::new("bob@example.com", "guess"))
            .await;

        assert!(matches!(
            result,
            Err(CredentialsError::InvalidPassword { provider_id: "credentials" })
        ));
        let login_info = CredentialsProvider::login_info("bob@example.com");
        assert_eq!(registry.find_password(&login_info).await.unwrap(), Some(legacy));
    }

    #[tokio::test]
    async fn test_unknown_identity() {
        let (provider, _) = provider();

        let result = provider
            .authenticate(&Credentials::new("nobody@example.com", "s3cret"))
            .await;

        assert!(matches!(
            result,
            Err(CredentialsError::IdentityNotFound { identifier, .. }) if identifier == "nobody@example.com"
        ));
    }

    #[tokio::test]
    async fn test_unsupported_hasher() {
        let (provider, registry) = provider();
        store(&registry, "carol@example.com", PasswordInfo::new("bcrypt", "$2a$10$abc")).await;

        let result = provider
            .authenticate(&Credentials::new("carol@example.com", "s3cret"))
            .await;

        match result {
            Err(CredentialsError::UnsupportedHasher {
                hasher, supported, ..
            }) => {
                assert_eq!(hasher, "bcrypt");
                assert_eq!(supported, vec!["argon2", "sha256"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_password_store() {
        let provider = CredentialsProvider::new(
            AuthInfoRegistry::builder().build(),
            PasswordHasherRegistry::new(Arc::new(argon2()), Vec::new()),
        );

        let result = provider
            .authenticate(&Credentials::new("alice@example.com", "s3cret"))
            .await;

        assert!(matches!(
            result,
            Err(CredentialsError::AuthInfo(AuthInfoError::NoStore(AuthInfoKind::Password)))
        ));
    }
}
