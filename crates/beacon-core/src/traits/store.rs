//! Expiring key-value store contract.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::store_value::{FromStoreValue, StoreKey, StoreValue};

/// Trait for expiring key-value backends (in-memory or Redis).
///
/// Providers are responsible for workspace prefixing and TTL enforcement.
/// A key whose TTL has elapsed must behave exactly like an absent key.
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug + 'static {
    /// Store a value without expiry, replacing any previous value.
    async fn put(&self, key: &StoreKey, value: StoreValue) -> AppResult<()>;

    /// Store a value that disappears once `ttl` has elapsed.
    async fn put_with_ttl(&self, key: &StoreKey, value: StoreValue, ttl: Duration)
    -> AppResult<()>;

    /// Fetch a value. Missing or expired keys are a `NotFound` error.
    async fn get_value(&self, key: &StoreKey) -> AppResult<StoreValue>;

    /// Remove a key and return the value it held.
    ///
    /// Removal is atomic: when two callers delete the same key concurrently,
    /// exactly one receives the value and the other gets `NotFound`.
    async fn delete(&self, key: &StoreKey) -> AppResult<StoreValue>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}

/// Typed helpers layered over any [`KeyValueStore`].
#[async_trait]
pub trait StoreExt: KeyValueStore {
    /// Fetch a value and convert it to `T`.
    async fn get<T>(&self, key: &StoreKey) -> AppResult<T>
    where
        T: FromStoreValue + Send,
    {
        let value = self.get_value(key).await?;
        T::from_store_value(value)
    }

    /// Store any value convertible into a [`StoreValue`].
    async fn put_typed<V>(&self, key: &StoreKey, value: V) -> AppResult<()>
    where
        V: Into<StoreValue> + Send,
    {
        self.put(key, value.into()).await
    }

    /// Store any value convertible into a [`StoreValue`] with a TTL.
    async fn put_typed_with_ttl<V>(&self, key: &StoreKey, value: V, ttl: Duration) -> AppResult<()>
    where
        V: Into<StoreValue> + Send,
    {
        self.put_with_ttl(key, value.into(), ttl).await
    }
}

impl<S: KeyValueStore + ?Sized> StoreExt for S {}
