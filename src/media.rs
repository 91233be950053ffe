//! File-backed product images served read-only under `/media`.

use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{MarketplaceError, Result};

pub const PUBLIC_PREFIX: &str = "/media/";

const ALLOWED_TYPES: &[(&str, &str)] = &[("image/jpeg", "jpg"), ("image/png", "png"), ("image/gif", "gif")];

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    max_bytes: usize,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self { Self { root: root.into(), max_bytes } }

    pub fn root(&self) -> &Path { &self.root }
    pub fn max_bytes(&self) -> usize { self.max_bytes }

    /// Writes the image under a fresh name and returns its public path.
    pub async fn save(&self, content_type: Option<&str>, bytes: &[u8]) -> Result<String> {
        let ext = content_type
            .and_then(|ct| ALLOWED_TYPES.iter().find(|(mime, _)| ct.eq_ignore_ascii_case(mime)))
            .map(|(_, ext)| *ext)
            .ok_or_else(|| MarketplaceError::InvalidInput("Invalid file type: only JPEG, PNG and GIF images are allowed".to_string()))?;
        if bytes.is_empty() {
            return Err(MarketplaceError::InvalidInput("image file is empty".to_string()));
        }
        if bytes.len() > self.max_bytes {
            return Err(MarketplaceError::InvalidInput(format!("image exceeds the {} byte limit", self.max_bytes)));
        }
        tokio::fs::create_dir_all(&self.root).await?;
        let file_name = format!("{}.{}", Uuid::new_v4(), ext);
        tokio::fs::write(self.root.join(&file_name), bytes).await?;
        tracing::debug!(file = %file_name, size = bytes.len(), "stored image");
        Ok(format!("{}{}", PUBLIC_PREFIX, file_name))
    }

    /// Best-effort removal: failures are logged, never returned.
    pub async fn remove(&self, public_path: &str) {
        let Some(path) = self.resolve(public_path) else {
            tracing::warn!(path = %public_path, "refusing to remove path outside media root");
            return;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "removed image"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove image"),
        }
    }

    fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        let name = public_path.strip_prefix(PUBLIC_PREFIX)?;
        let is_bare = !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\']);
        is_bare.then(|| self.root.join(name))
    }
}
