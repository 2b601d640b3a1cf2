use crate::error::StorageError;
use crate::services::storage::ObjectStore;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Scratch directory owned by a single pipeline invocation. Every
/// invocation gets its own uuid-named directory under the scratch root, so
/// concurrent invocations can never collide on same-named source objects.
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub async fn create(root: &Path) -> Result<Self, StorageError> {
        let dir = root.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fetch the source object into this staging area under `local_name`
    /// (the base name without extension, so renditions can append their own
    /// suffix and extension). On failure nothing is left behind.
    pub async fn stage(
        &self,
        store: &dyn ObjectStore,
        bucket: &str,
        key: &str,
        local_name: &str,
    ) -> Result<StagedSource, StorageError> {
        let path = self.dir.join(local_name);
        if let Err(e) = store.download_to_file(bucket, key, &path).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }
        debug!(bucket = %bucket, key = %key, path = %path.display(), "source staged");
        Ok(StagedSource {
            path,
            released: false,
        })
    }

    /// Remove the directory once the invocation is done. When failed
    /// uploads left renditions behind the directory is not empty and stays
    /// in place, so an operator can inspect the files.
    pub async fn finish(self) {
        if let Err(e) = tokio::fs::remove_dir(&self.dir).await {
            debug!(dir = %self.dir.display(), error = %e, "staging directory kept");
        }
    }
}

/// The fetched source object on local disk. Deleted exactly once per
/// invocation: explicitly via `release`, or by the Drop fallback on early
/// exits.
pub struct StagedSource {
    path: PathBuf,
    released: bool,
}

impl StagedSource {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn release(mut self) {
        self.released = true;
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!(path = %self.path.display(), error = %e, "failed to remove staged source");
        }
    }
}

impl Drop for StagedSource {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
