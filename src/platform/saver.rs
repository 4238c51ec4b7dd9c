use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::application::ports::FileSaver;
use crate::domain::SaveError;
use crate::utils::sanitize_filename;

const FALLBACK_NAME: &str = "download";

/// Saves downloads into a directory the user can change at runtime.
pub struct DirectorySaver {
    dir: RwLock<PathBuf>,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: RwLock::new(dir.into()),
        }
    }

    pub fn dir(&self) -> PathBuf {
        self.dir
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_dir(&self, dir: impl Into<PathBuf>) {
        *self.dir.write().unwrap_or_else(PoisonError::into_inner) = dir.into();
    }

    fn target_path(dir: &Path, file_name: &str) -> PathBuf {
        let name = sanitize_filename(file_name);
        let name = name.trim_matches(|c| c == '.' || c == ' ');
        dir.join(if name.is_empty() { FALLBACK_NAME } else { name })
    }
}

#[async_trait]
impl FileSaver for DirectorySaver {
    async fn save(&self, file_name: &str, bytes: Bytes) -> Result<PathBuf, SaveError> {
        let dir = self.dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| SaveError::CreateDir {
                path: dir.display().to_string(),
                source,
            })?;

        let path = Self::target_path(&dir, file_name);
        let write_err = |source| SaveError::Write {
            path: path.display().to_string(),
            source,
        };

        let mut file = tokio::fs::File::create(&path).await.map_err(write_err)?;
        file.write_all(&bytes).await.map_err(write_err)?;
        // Flush remaining data to disk
        file.sync_all().await.map_err(write_err)?;

        info!(path = %path.display(), bytes = bytes.len(), "File saved");
        Ok(path)
    }
}
