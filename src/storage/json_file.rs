use super::traits::{KeyValueStore, StoreFuture, validate_key};
use crate::error::StorageError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// One pretty-printed `<key>.json` file per key under `root`.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl KeyValueStore for JsonFileStore {
    fn name(&self) -> &str {
        "json-file"
    }

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<serde_json::Value>> {
        Box::pin(async move {
            validate_key(key)?;
            let raw = match fs::read_to_string(self.path_for(key)).await {
                Ok(raw) => raw,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            Ok(Some(serde_json::from_str(&raw)?))
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: serde_json::Value) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            validate_key(key)?;
            let content = serde_json::to_string_pretty(&value)?;
            write_atomic(&self.path_for(key), &content).await
        })
    }
}

async fn write_atomic(path: &Path, content: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content).await?;

    if let Err(rename_error) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(rename_error.into());
    }

    Ok(())
}
