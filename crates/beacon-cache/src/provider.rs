//! Store manager that dispatches to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use beacon_core::config::StoreConfig;
use beacon_core::error::AppError;
use beacon_core::result::AppResult;
use beacon_core::traits::store::KeyValueStore;
use beacon_core::types::store_value::{StoreKey, StoreValue};

/// Store manager that wraps the configured key-value provider.
///
/// The provider is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct StoreManager {
    /// The inner store provider.
    inner: Arc<dyn KeyValueStore>,
}

impl StoreManager {
    /// Create a new store manager from configuration.
    pub async fn new(config: &StoreConfig) -> AppResult<Self> {
        config.validate()?;

        let inner: Arc<dyn KeyValueStore> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!(workspace = %config.workspace, "Initializing Redis store provider");
                let client =
                    crate::redis::RedisClient::connect(&config.redis, config.workspace.clone())
                        .await?;
                Arc::new(crate::redis::RedisStore::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!(workspace = %config.workspace, "Initializing in-memory store provider");
                Arc::new(crate::memory::MemoryStore::new(
                    &config.memory,
                    config.workspace.clone(),
                ))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown store provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a store manager from an existing provider (for testing).
    pub fn from_provider(provider: Arc<dyn KeyValueStore>) -> Self {
        Self { inner: provider }
    }

    /// Get a reference to the inner provider.
    pub fn provider(&self) -> &dyn KeyValueStore {
        self.inner.as_ref()
    }
}

#[async_trait]
impl KeyValueStore for StoreManager {
    async fn put(&self, key: &StoreKey, value: StoreValue) -> AppResult<()> {
        self.inner.put(key, value).await
    }

    async fn put_with_ttl(&self, key: &StoreKey, value: StoreValue, ttl: Duration) -> AppResult<()> {
        self.inner.put_with_ttl(key, value, ttl).await
    }

    async fn get_value(&self, key: &StoreKey) -> AppResult<StoreValue> {
        self.inner.get_value(key).await
    }

    async fn delete(&self, key: &StoreKey) -> AppResult<StoreValue> {
        self.inner.delete(key).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use beacon_core::traits::store::StoreExt;

    use super::*;

    #[tokio::test]
    async fn test_memory_provider_selected() {
        let manager = StoreManager::new(&StoreConfig::default()).await.unwrap();
        let key = StoreKey::new("user_session", "x");
        manager.put_typed(&key, "hello").await.unwrap();
        assert_eq!(manager.get::<String>(&key).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_unknown_provider_rejected() {
        let config = StoreConfig {
            provider: "etcd".to_string(),
            ..StoreConfig::default()
        };
        let err = StoreManager::new(&config).await.unwrap_err();
        assert_eq!(err.kind, beacon_core::error::ErrorKind::Configuration);
    }
}
