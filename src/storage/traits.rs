use crate::error::StorageError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send + 'a>>;

/// Best-effort key-value persistence.
///
/// Values are JSON documents. Callers treat failures as recoverable: log them
/// and keep going with in-memory state.
pub trait KeyValueStore: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<serde_json::Value>>;

    fn set<'a>(&'a self, key: &'a str, value: serde_json::Value) -> StoreFuture<'a, ()>;
}

/// Read and decode `key`; a missing key is `Ok(None)`.
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

pub async fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let value = serde_json::to_value(value)?;
    store.set(key, value).await
}

pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey {
            key: key.to_string(),
        })
    }
}
