use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::RwLock;

/// Bucketed blob storage holding the production model.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// True when at least one key in `bucket` starts with `prefix`.
    async fn key_exists(&self, bucket: &str, prefix: &str) -> Result<bool>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Write `bytes` to `key`, replacing any existing object.
    async fn put_object(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Upload a local file to `key`.
    async fn upload_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        self.put_object(bucket, key, bytes).await
    }
}

/// Buckets as directories under `root`; keys map to relative paths.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(PipelineError::ObjectStore(format!("invalid object key: {key}")));
        }
        Ok(self.root.join(bucket).join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn key_exists(&self, bucket: &str, prefix: &str) -> Result<bool> {
        let bucket_dir = self.root.join(bucket);
        if !bucket_dir.is_dir() {
            return Ok(false);
        }
        let keys = tokio::task::spawn_blocking(move || list_keys(&bucket_dir))
            .await
            .map_err(|e| PipelineError::ObjectStore(e.to_string()))??;
        Ok(keys.iter().any(|key| key.starts_with(prefix)))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PipelineError::NotFound(format!("{bucket}/{key}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put_object(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }
}

/// Every file under `dir` as a `/`-joined key relative to `dir`.
fn list_keys(dir: &Path) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if let Ok(relative) = path.strip_prefix(dir) {
                let parts: Vec<_> = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect();
                keys.push(parts.join("/"));
            }
        }
    }
    Ok(keys)
}

/// Objects held in memory. Records every write so tests can assert on publishing.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<(String, String), Vec<u8>>>,
    writes: Mutex<Vec<String>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `bucket/key` of every write, oldest first.
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn key_exists(&self, bucket: &str, prefix: &str) -> Result<bool> {
        Ok(self
            .objects
            .read()
            .await
            .keys()
            .any(|(b, k)| b == bucket && k.starts_with(prefix)))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| PipelineError::NotFound(format!("{bucket}/{key}")))
    }

    async fn put_object(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.objects
            .write()
            .await
            .insert((bucket.to_string(), key.to_string()), bytes);
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(format!("{bucket}/{key}"));
        }
        Ok(())
    }
}
