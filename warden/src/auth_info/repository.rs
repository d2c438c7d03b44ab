use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::errors::AuthInfoError;
use super::AuthInfo;
use super::AuthInfoKind;
use super::PasswordInfo;
use crate::login_info::LoginInfo;

/// Persistence for one kind of auth info.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthInfoDao: Send + Sync + 'static {
    /// Retrieve auth info for a login.
    ///
    /// # Errors
    /// * `Storage` - Backing store failed
    async fn find(&self, login_info: &LoginInfo) -> Result<Option<AuthInfo>, AuthInfoError>;

    /// Store auth info for a new login.
    ///
    /// # Errors
    /// * `Storage` - Backing store failed
    async fn add(&self, login_info: &LoginInfo, info: AuthInfo)
        -> Result<AuthInfo, AuthInfoError>;

    /// Replace auth info for an existing login.
    ///
    /// # Errors
    /// * `NotFound` - No auth info exists for the login
    /// * `Storage` - Backing store failed
    async fn update(
        &self,
        login_info: &LoginInfo,
        info: AuthInfo,
    ) -> Result<AuthInfo, AuthInfoError>;

    /// Add or replace auth info.
    ///
    /// # Errors
    /// * `Storage` - Backing store failed
    async fn save(&self, login_info: &LoginInfo, info: AuthInfo)
        -> Result<AuthInfo, AuthInfoError>;

    /// Delete auth info for a login. Removing a missing entry succeeds.
    ///
    /// # Errors
    /// * `Storage` - Backing store failed
    async fn remove(&self, login_info: &LoginInfo) -> Result<(), AuthInfoError>;
}

/// Process-local auth-info store.
#[derive(Debug, Default)]
pub struct InMemoryAuthInfoDao {
    entries: RwLock<HashMap<LoginInfo, AuthInfo>>,
}

impl InMemoryAuthInfoDao {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthInfoDao for InMemoryAuthInfoDao {
    async fn find(&self, login_info: &LoginInfo) -> Result<Option<AuthInfo>, AuthInfoError> {
        Ok(self.entries.read().await.get(login_info).cloned())
    }

    async fn add(
        &self,
        login_info: &LoginInfo,
        info: AuthInfo,
    ) -> Result<AuthInfo, AuthInfoError> {
        self.entries
            .write()
            .await
            .insert(login_info.clone(), info.clone());
        Ok(info)
    }

    async fn update(
        &self,
        login_info: &LoginInfo,
        info: AuthInfo,
    ) -> Result<AuthInfo, AuthInfoError> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(login_info) {
            Some(entry) => {
                *entry = info.clone();
                Ok(info)
            }
            None => Err(AuthInfoError::NotFound {
                kind: info.kind(),
                login_info: login_info.to_string(),
            }),
        }
    }

    async fn save(
        &self,
        login_info: &LoginInfo,
        info: AuthInfo,
    ) -> Result<AuthInfo, AuthInfoError> {
        self.add(login_info, info).await
    }

    async fn remove(&self, login_info: &LoginInfo) -> Result<(), AuthInfoError> {
        self.entries.write().await.remove(login_info);
        Ok(())
    }
}

/// Routes each [`AuthInfoKind`] to the store registered for it.
#[derive(Clone, Default)]
pub struct AuthInfoRegistry {
    daos: HashMap<AuthInfoKind, Arc<dyn AuthInfoDao>>,
}

impl AuthInfoRegistry {
    pub fn builder() -> AuthInfoRegistryBuilder {
        AuthInfoRegistryBuilder::default()
    }

    /// Kinds that have a registered store.
    pub fn kinds(&self) -> Vec<AuthInfoKind> {
        let mut kinds: Vec<_> = self.daos.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Retrieve auth info of `kind` for a login.
    ///
    /// # Errors
    /// * `NoStore` - No store is registered for `kind`
    /// * `UnexpectedKind` - The store returned auth info of another kind
    /// * `Storage` - Backing store failed
    pub async fn find(
        &self,
        kind: AuthInfoKind,
        login_info: &LoginInfo,
    ) -> Result<Option<AuthInfo>, AuthInfoError> {
        let found = self.dao(kind)?.find(login_info).await?;
        match found {
            Some(info) if info.kind() != kind => Err(AuthInfoError::UnexpectedKind {
                expected: kind,
                actual: info.kind(),
            }),
            other => Ok(other),
        }
    }

    /// Retrieve the password info for a login.
    ///
    /// # Errors
    /// Same as [`AuthInfoRegistry::find`].
    pub async fn find_password(
        &self,
        login_info: &LoginInfo,
    ) -> Result<Option<PasswordInfo>, AuthInfoError> {
        match self.find(AuthInfoKind::Password, login_info).await? {
            Some(AuthInfo::Password(info)) => Ok(Some(info)),
            Some(other) => Err(AuthInfoError::UnexpectedKind {
                expected: AuthInfoKind::Password,
                actual: other.kind(),
            }),
            None => Ok(None),
        }
    }

    pub async fn add(
        &self,
        login_info: &LoginInfo,
        info: AuthInfo,
    ) -> Result<AuthInfo, AuthInfoError> {
        self.dao(info.kind())?.add(login_info, info).await
    }

    pub async fn update(
        &self,
        login_info: &LoginInfo,
        info: AuthInfo,
    ) -> Result<AuthInfo, AuthInfoError> {
        self.dao(info.kind())?.update(login_info, info).await
    }

    pub async fn save(
        &self,
        login_info: &LoginInfo,
        info: AuthInfo,
    ) -> Result<AuthInfo, AuthInfoError> {
        self.dao(info.kind())?.save(login_info, info).await
    }

    pub async fn remove(
        &self,
        kind: AuthInfoKind,
        login_info: &LoginInfo,
    ) -> Result<(), AuthInfoError> {
        self.dao(kind)?.remove(login_info).await
    }

    fn dao(&self, kind: AuthInfoKind) -> Result<&Arc<dyn AuthInfoDao>, AuthInfoError> {
        self.daos.get(&kind).ok_or(AuthInfoError::NoStore(kind))
    }
}

impl std::fmt::Debug for AuthInfoRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthInfoRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Builder for [`AuthInfoRegistry`].
#[derive(Default)]
pub struct AuthInfoRegistryBuilder {
    daos: HashMap<AuthInfoKind, Arc<dyn AuthInfoDao>>,
}

impl AuthInfoRegistryBuilder {
    /// Register the store for `kind`, replacing any earlier registration.
    pub fn register(mut self, kind: AuthInfoKind, dao: Arc<dyn AuthInfoDao>) -> Self {
        self.daos.insert(kind, dao);
        self
    }

    pub fn build(self) -> AuthInfoRegistry {
        AuthInfoRegistry { daos: self.daos }
    }
}
