use super::traits::{KeyValueStore, StoreFuture, validate_key};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<serde_json::Value>> {
        Box::pin(async move {
            validate_key(key)?;
            Ok(self.entries.read().await.get(key).cloned())
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: serde_json::Value) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            validate_key(key)?;
            self.entries.write().await.insert(key.to_string(), value);
            Ok(())
        })
    }
}
