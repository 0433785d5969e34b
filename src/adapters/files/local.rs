//! Local disk file repository

use super::FileRepository;
use crate::domain::{CloneError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;
use uuid::Uuid;

/// Stores files under a root directory with generated names
#[derive(Debug, Clone)]
pub struct LocalFileRepository {
    root: PathBuf,
}

impl LocalFileRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, uri: &str) -> Result<PathBuf> {
        let path = PathBuf::from(uri);
        if !path.starts_with(&self.root) {
            return Err(CloneError::Storage(format!(
                "{uri} is outside {}",
                self.root.display()
            )));
        }
        Ok(path)
    }
}

#[async_trait]
impl FileRepository for LocalFileRepository {
    async fn save(
        &self,
        stream: &mut (dyn AsyncRead + Unpin + Send),
        extension: &str,
    ) -> Result<String> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            CloneError::Storage(format!("Failed to create {}: {e}", self.root.display()))
        })?;

        let name = match extension.trim_start_matches('.') {
            "" => Uuid::new_v4().to_string(),
            ext => format!("{}.{ext}", Uuid::new_v4()),
        };
        let path = self.root.join(name);

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| CloneError::Storage(format!("Failed to create {}: {e}", path.display())))?;
        let written = tokio::io::copy(stream, &mut file)
            .await
            .map_err(|e| CloneError::Storage(format!("Failed to write {}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), bytes = written, "Stored file");
        Ok(path.to_string_lossy().into_owned())
    }

    async fn get(&self, uri: &str) -> Result<Vec<u8>> {
        let path = self.resolve(uri)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| CloneError::Storage(format!("Failed to read {uri}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_then_get() {
        let dir = TempDir::new().unwrap();
        let repo = LocalFileRepository::new(dir.path());

        let mut content: &[u8] = b"{\"name\":\"project\"}";
        let uri = repo.save(&mut content, "json").await.unwrap();

        assert!(uri.ends_with(".json"));
        assert_eq!(repo.get(&uri).await.unwrap(), b"{\"name\":\"project\"}");
    }

    #[tokio::test]
    async fn test_get_outside_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        let repo = LocalFileRepository::new(dir.path());
        let result = repo.get("/etc/hosts").await;
        assert!(matches!(result, Err(CloneError::Storage(_))));
    }
}
