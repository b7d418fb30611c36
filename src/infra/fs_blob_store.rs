use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::app::ports::BlobStorePort;
use crate::error::{PipelineError, Result};

/// Directory-backed blob store: `<root>/<bucket>/<key>`
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a bucket/key pair to a path, refusing anything that could
    /// escape the root (absolute keys, `..` segments, empty names)
    pub fn path_for(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let mut path = self.root.clone();
        for part in [bucket, key] {
            let relative = Path::new(part);
            let safe = !part.is_empty()
                && relative
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)));
            if !safe {
                return Err(PipelineError::Storage(format!("invalid blob address '{}/{}'", bucket, key)));
            }
            path.push(relative);
        }
        Ok(path)
    }
}

#[async_trait]
impl BlobStorePort for FsBlobStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(bucket, key)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let digest = hex::encode(Sha256::digest(&bytes));
        tokio::fs::write(&path, &bytes).await?;
        debug!(sha256 = %digest, bytes = bytes.len(), "Wrote {}", path.display());
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PipelineError::BlobNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
