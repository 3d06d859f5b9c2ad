//! Redis store provider implementation.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use beacon_core::error::{AppError, ErrorKind};
use beacon_core::result::AppResult;
use beacon_core::traits::store::KeyValueStore;
use beacon_core::types::store_value::{StoreKey, StoreValue};

use super::client::RedisClient;

/// Redis-backed store provider.
///
/// Values are written in their tagged string form so integers, booleans and
/// text survive the round trip with their kind intact.
#[derive(Debug, Clone)]
pub struct RedisStore {
    /// Redis client.
    client: RedisClient,
}

impl RedisStore {
    /// Create a new Redis store provider.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Store, format!("Redis error: {e}"), e)
    }

    fn not_found(key: &StoreKey) -> AppError {
        AppError::not_found(format!("Store key '{key}' not found"))
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn put(&self, key: &StoreKey, value: StoreValue) -> AppResult<()> {
        let full_key = self.client.physical_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn
            .set(&full_key, value.encode())
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn put_with_ttl(&self, key: &StoreKey, value: StoreValue, ttl: Duration) -> AppResult<()> {
        if ttl.is_zero() {
            return Err(AppError::validation(format!(
                "TTL for '{key}' must be greater than zero"
            )));
        }
        let full_key = self.client.physical_key(key);
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.client.conn_mut();
        let _: () = redis::cmd("SET")
            .arg(&full_key)
            .arg(value.encode())
            .arg("PX")
            .arg(millis)
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        debug!(key = %full_key, ttl_ms = millis, "Stored value with TTL");
        Ok(())
    }

    async fn get_value(&self, key: &StoreKey) -> AppResult<StoreValue> {
        let full_key = self.client.physical_key(key);
        let mut conn = self.client.conn_mut();
        let raw: Option<String> = conn.get(&full_key).await.map_err(Self::map_err)?;
        match raw {
            Some(raw) => StoreValue::decode(&raw),
            None => Err(Self::not_found(key)),
        }
    }

    async fn delete(&self, key: &StoreKey) -> AppResult<StoreValue> {
        let full_key = self.client.physical_key(key);
        let mut conn = self.client.conn_mut();
        // GETDEL reads and removes in one step, so concurrent deleters
        // cannot both observe the value.
        let raw: Option<String> = redis::cmd("GETDEL")
            .arg(&full_key)
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        match raw {
            Some(raw) => StoreValue::decode(&raw),
            None => Err(Self::not_found(key)),
        }
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
