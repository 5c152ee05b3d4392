use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

/// Destination for uploaded files (profile photos, CVs).
///
/// Filenames are generated by the handlers (`photo_<id>.<ext>`,
/// `cv_<id>_<uuid>.<ext>`); implementations treat them as opaque keys.
#[async_trait]
pub trait UploadStore: Send + Sync + 'static {
    async fn put_file(&self, name: &str, bytes: Vec<u8>) -> Result<()>;

    async fn delete_file(&self, name: &str) -> Result<()>;
}

/// Stores uploads as flat files under the configured upload root.
pub struct LocalUploadStore {
    root: PathBuf,
}

impl LocalUploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            bail!("invalid upload file name: {name}");
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl UploadStore for LocalUploadStore {
    async fn put_file(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write upload {}", path.display()))?;
        Ok(())
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.resolve(name)?;
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("failed to remove upload {}", path.display()))?;
        Ok(())
    }
}
