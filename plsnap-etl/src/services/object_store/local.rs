//! Filesystem-backed object store
//!
//! Each key is a relative path under the bucket root. Writes go to a temporary file
//! under `<root>/.tmp/` and are renamed into place, so readers never see a partial
//! object. That directory is reserved and never part of the key space.

use super::ObjectStore;
use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;
use walkdir::{DirEntry, WalkDir};

/// Root-level directory holding in-flight writes
const TEMP_DIR: &str = ".tmp";

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key to a path, rejecting keys that escape the root
    fn path_for(&self, key: &str) -> PipelineResult<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && !key.ends_with('/')
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
            && relative.components().next() != Some(Component::Normal(TEMP_DIR.as_ref()));
        if !valid {
            return Err(PipelineError::Storage(format!("invalid object key: {:?}", key)));
        }
        Ok(self.root.join(relative))
    }

    async fn temp_path(&self) -> PipelineResult<PathBuf> {
        let dir = self.root.join(TEMP_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir.join(format!("{}.tmp", Uuid::new_v4())))
    }

    async fn ensure_parent(path: &Path) -> PipelineResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Move a finished temp file to its destination, removing it on failure
    async fn commit(temp: &Path, path: &Path) -> PipelineResult<()> {
        if let Err(e) = tokio::fs::rename(temp, path).await {
            let _ = tokio::fs::remove_file(temp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

fn map_not_found(err: std::io::Error, key: &str) -> PipelineError {
    if err.kind() == ErrorKind::NotFound {
        PipelineError::NotFound(key.to_string())
    } else {
        PipelineError::Io(err)
    }
}

/// Slash-joined key of `path` relative to `root`
fn key_for(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Whether the walk should descend into (or yield) `entry`
///
/// Skips the temp directory and any directory whose subtree cannot hold a key
/// starting with `prefix`.
fn should_visit(root: &Path, prefix: &str, entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    if entry.depth() == 1 && entry.file_type().is_dir() && entry.file_name() == TEMP_DIR {
        return false;
    }
    if !entry.file_type().is_dir() {
        return true;
    }
    match key_for(root, entry.path()) {
        Some(key) => {
            let dir_key = format!("{}/", key);
            dir_key.starts_with(prefix) || prefix.starts_with(&dir_key)
        }
        None => false,
    }
}

/// Blocking recursive listing; runs on the blocking pool
fn walk_keys(root: &Path, prefix: &str) -> PipelineResult<Vec<String>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut keys = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| should_visit(root, prefix, e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let vanished = e.io_error().map_or(false, |io| io.kind() == ErrorKind::NotFound);
                if vanished {
                    // removed while walking
                    continue;
                }
                return Err(PipelineError::Io(e.into()));
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(key) = key_for(root, entry.path()) {
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
    }

    keys.sort();
    Ok(keys)
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> PipelineResult<()> {
        let path = self.path_for(key)?;
        Self::ensure_parent(&path).await?;

        let temp = self.temp_path().await?;
        tokio::fs::write(&temp, &bytes).await?;
        Self::commit(&temp, &path).await?;

        tracing::trace!(key, bytes = bytes.len(), "Object written");
        Ok(())
    }

    async fn get(&self, key: &str) -> PipelineResult<Vec<u8>> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| map_not_found(e, key))
    }

    async fn list(&self, prefix: &str) -> PipelineResult<Vec<String>> {
        let root = self.root.clone();
        let prefix = prefix.to_string();
        tokio::task::spawn_blocking(move || walk_keys(&root, &prefix)).await?
    }

    async fn copy(&self, src: &str, dst: &str) -> PipelineResult<()> {
        let src_path = self.path_for(src)?;
        let dst_path = self.path_for(dst)?;
        Self::ensure_parent(&dst_path).await?;

        let temp = self.temp_path().await?;
        if let Err(e) = tokio::fs::copy(&src_path, &temp).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(map_not_found(e, src));
        }
        Self::commit(&temp, &dst_path).await
    }

    async fn delete(&self, key: &str) -> PipelineResult<()> {
        let path = self.path_for(key)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| map_not_found(e, key))
    }
}
