use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::errors::RepositoryError;
use super::Authenticator;
use crate::clock::Clock;

/// Server-side store for stateful authenticators.
///
/// Correctness across several nodes is the store's responsibility: the
/// services issue plain get/set/remove calls and coordinate nothing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthenticatorRepository: Send + Sync + 'static {
    async fn find(&self, id: &str) -> Result<Option<Authenticator>, RepositoryError>;

    async fn add(&self, authenticator: Authenticator) -> Result<Authenticator, RepositoryError>;

    async fn update(&self, authenticator: Authenticator)
        -> Result<Authenticator, RepositoryError>;

    async fn remove(&self, id: &str) -> Result<(), RepositoryError>;
}

/// Key-value cache with per-entry time to live.
#[async_trait]
pub trait CacheLayer: Send + Sync + 'static {
    async fn save(&self, key: &str, value: String, ttl: Duration) -> Result<(), RepositoryError>;

    async fn find(&self, key: &str) -> Result<Option<String>, RepositoryError>;

    async fn remove(&self, key: &str) -> Result<(), RepositoryError>;
}

/// Process-local [`CacheLayer`].
///
/// Expired entries are dropped when they are next read and swept on every
/// save. Suitable for single node deployments and tests only.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheLayer for InMemoryCache {
    async fn save(&self, key: &str, value: String, ttl: Duration) -> Result<(), RepositoryError> {
        let now = Instant::now();
        let deadline = now
            .checked_add(ttl)
            .ok_or_else(|| RepositoryError::Storage(format!("TTL out of range: {:?}", ttl)))?;

        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, deadline)| *deadline > now);
        entries.insert(key.to_string(), (value, deadline));
        Ok(())
    }

    async fn find(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((value, deadline)) if Instant::now() < *deadline => {
                    return Ok(Some(value.clone()))
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Another writer may have refreshed the entry since the read lock was released
        let mut entries = self.entries.write().await;
        if matches!(entries.get(key), Some((_, deadline)) if *deadline <= Instant::now()) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// [`AuthenticatorRepository`] that keeps authenticators as JSON in a cache.
///
/// Entries live until the authenticator expires.
pub struct CacheAuthenticatorRepository<C: CacheLayer> {
    cache: Arc<C>,
    clock: Arc<dyn Clock>,
}

impl<C: CacheLayer> CacheAuthenticatorRepository<C> {
    const KEY_PREFIX: &'static str = "authenticator:";

    pub fn new(cache: Arc<C>, clock: Arc<dyn Clock>) -> Self {
        Self { cache, clock }
    }

    fn key(id: &str) -> String {
        format!("{}{}", Self::KEY_PREFIX, id)
    }

    async fn save(&self, authenticator: Authenticator) -> Result<Authenticator, RepositoryError> {
        let value = serde_json::to_string(&authenticator)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let ttl = authenticator
            .remaining(self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        self.cache
            .save(&Self::key(&authenticator.id), value, ttl)
            .await?;
        Ok(authenticator)
    }
}

#[async_trait]
impl<C: CacheLayer> AuthenticatorRepository for CacheAuthenticatorRepository<C> {
    async fn find(&self, id: &str) -> Result<Option<Authenticator>, RepositoryError> {
        match self.cache.find(&Self::key(id)).await? {
            Some(value) => serde_json::from_str(&value)
                .map(Some)
                .map_err(|e| RepositoryError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    async fn add(&self, authenticator: Authenticator) -> Result<Authenticator, RepositoryError> {
        self.save(authenticator).await
    }

    async fn update(
        &self,
        authenticator: Authenticator,
    ) -> Result<Authenticator, RepositoryError> {
        self.save(authenticator).await
    }

    async fn remove(&self, id: &str) -> Result<(), RepositoryError> {
        self.cache.remove(&Self::key(id)).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::authenticator::tests::authenticator;
    use crate::clock::FixedClock;

    fn repository() -> CacheAuthenticatorRepository<InMemoryCache> {
        CacheAuthenticatorRepository::new(
            Arc::new(InMemoryCache::new()),
            Arc::new(FixedClock::new(Utc::now())),
        )
    }

    #[tokio::test]
    async fn test_add_find_remove() {
        let repository = repository();
        let a = authenticator(Utc::now(), Some(chrono::Duration::minutes(30)));

        repository.add(a.clone()).await.unwrap();
        assert_eq!(repository.find("id").await.unwrap(), Some(a));

        repository.remove("id").await.unwrap();
        assert_eq!(repository.find("id").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_replaces() {
        let repository = repository();
        let a = authenticator(Utc::now(), Some(chrono::Duration::minutes(30)));
        repository.add(a.clone()).await.unwrap();

        let mut touched = a.clone();
        touched.last_used = a.last_used + chrono::Duration::minutes(5);
        repository.update(touched.clone()).await.unwrap();

        assert_eq!(repository.find("id").await.unwrap(), Some(touched));
    }

    #[tokio::test]
    async fn test_cache_entry_expires() {
        let cache = InMemoryCache::new();
        cache
            .save("key", "value".to_string(), Duration::ZERO)
            .await
            .unwrap();
        cache
            .save("other", "value".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.find("key").await.unwrap(), None);
        assert_eq!(cache.find("other").await.unwrap(), Some("value".to_string()));
    }

    #[tokio::test]
    async fn test_save_sweeps_expired_entries() {
        let cache = InMemoryCache::new();
        for i in 0..1000 {
            cache
                .save(&format!("key-{}", i), "value".to_string(), Duration::from_millis(1))
                .await
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        cache
            .save("fresh", "value".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        let entries = cache.entries.read().await;
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("fresh"));
    }

    #[tokio::test]
    async fn test_find_keeps_refreshed_entry() {
        let cache = InMemoryCache::new();
        cache
            .save("key", "old".to_string(), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(cache.find("key").await.unwrap(), None);

        cache
            .save("key", "new".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.find("key").await.unwrap(), Some("new".to_string()));
    }

    #[tokio::test]
    async fn test_unreadable_entry() {
        let cache = Arc::new(InMemoryCache::new());
        cache
            .save("authenticator:id", "{".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        let repository =
            CacheAuthenticatorRepository::new(cache, Arc::new(FixedClock::new(Utc::now())));

        assert!(matches!(
            repository.find("id").await,
            Err(RepositoryError::Serialization(_))
        ));
    }
}
