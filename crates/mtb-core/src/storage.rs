//! Key-value durability contract and its implementations.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::Mutex,
};

use async_trait::async_trait;

use crate::Result;

/// Named blob storage. The core only ever loads and saves whole stores.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// `Ok(None)` means the store has never been written (cold start).
    async fn load(&self, name: &str) -> Result<Option<String>>;
    async fn save(&self, name: &str, data: &str) -> Result<()>;
}

/// One pretty-printed JSON file per store under a directory.
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl KvStore for JsonDirStore {
    async fn load(&self, name: &str) -> Result<Option<String>> {
        let path = self.path_for(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(txt) if txt.trim().is_empty() => Ok(None),
            Ok(txt) => Ok(Some(txt)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, name: &str, data: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        // Write to a sibling temp file first so a crash never leaves a truncated store.
        let path = self.path_for(name);
        let tmp = self.dir.join(format!(".{name}.json.tmp"));
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// In-memory store, used by tests and dry runs.
#[derive(Default)]
pub struct MemoryKv {
    blobs: Mutex<HashMap<String, String>>,
    fail_saves: std::sync::atomic::AtomicBool,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(name: &str, data: &str) -> Self {
        let kv = Self::default();
        kv.put(name, data);
        kv
    }

    pub fn put(&self, name: &str, data: &str) {
        self.lock().insert(name.to_string(), data.to_string());
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.lock().get(name).cloned()
    }

    /// Make every subsequent `save` fail with an I/O error.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn load(&self, name: &str) -> Result<Option<String>> {
        Ok(self.get(name))
    }

    async fn save(&self, name: &str, data: &str) -> Result<()> {
        if self.fail_saves.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
        }
        self.put(name, data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}"))
    }

    #[tokio::test]
    async fn json_dir_store_missing_file_is_cold_start() {
        let store = JsonDirStore::new(tmp("mtb-kv-missing"));
        assert_eq!(store.load("listings").await.unwrap(), None);
    }

    #[tokio::test]
    async fn json_dir_store_save_then_load() {
        let dir = tmp("mtb-kv");
        let store = JsonDirStore::new(&dir);
        store.save("users", "{\"1\":{}}").await.unwrap();
        assert_eq!(
            store.load("users").await.unwrap().as_deref(),
            Some("{\"1\":{}}")
        );
        assert!(store.path_for("users").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn memory_kv_can_fail_saves() {
        let kv = MemoryKv::new();
        kv.fail_saves(true);
        assert!(kv.save("x", "y").await.is_err());
        kv.fail_saves(false);
        kv.save("x", "y").await.unwrap();
        assert_eq!(kv.load("x").await.unwrap().as_deref(), Some("y"));
    }
}
