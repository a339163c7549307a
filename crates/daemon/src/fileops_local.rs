//! `tokio::fs`-backed [`FileOps`] implementation, rooted at a vault directory on disk.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use vaultsync_core::fileops::{FileOps, FileOpsError};
use vaultsync_core::path::RelativePath;

/// Real filesystem binding for the sync engine. All [`RelativePath`]s are resolved
/// under `root`; directories are created on demand for creates, writes, and moves.
#[derive(Debug, Clone)]
pub struct LocalFileOps {
    root: PathBuf,
}

impl LocalFileOps {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &RelativePath) -> PathBuf {
        self.root.join(path.as_str())
    }

    fn io_err(path: &RelativePath, source: std::io::Error) -> FileOpsError {
        if source.kind() == std::io::ErrorKind::NotFound {
            FileOpsError::NotFound(path.clone())
        } else {
            FileOpsError::Io { path: path.clone(), source }
        }
    }

    async fn ensure_parent(&self, full_path: &Path) -> std::io::Result<()> {
        if let Some(parent) = full_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    async fn walk(&self, dir: &Path, out: &mut Vec<RelativePath>) -> std::io::Result<()> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                Box::pin(self.walk(&entry.path(), out)).await?;
            } else if file_type.is_file() {
                let relative = entry.path().strip_prefix(&self.root).expect("walked path is under root").to_path_buf();
                if let Some(s) = relative.to_str() {
                    let normalized = s.replace(std::path::MAIN_SEPARATOR, "/");
                    if let Ok(rel) = RelativePath::new(normalized) {
                        out.push(rel);
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FileOps for LocalFileOps {
    async fn list_all(&self) -> Result<Vec<RelativePath>, FileOpsError> {
        let mut out = Vec::new();
        if !self.root.exists() {
            return Ok(out);
        }
        self.walk(&self.root, &mut out)
            .await
            .map_err(|e| FileOpsError::Io { path: RelativePath::new("<vault-root>").unwrap(), source: e })?;
        Ok(out)
    }

    async fn read(&self, path: &RelativePath) -> Result<Vec<u8>, FileOpsError> {
        let full = self.resolve(path);
        let bytes = tokio::fs::read(&full).await.map_err(|e| Self::io_err(path, e))?;
        if vaultsync_core::binary::is_text(&bytes) {
            Ok(normalize_crlf(&bytes))
        } else {
            Ok(bytes)
        }
    }

    async fn exists(&self, path: &RelativePath) -> Result<bool, FileOpsError> {
        Ok(tokio::fs::try_exists(self.resolve(path)).await.unwrap_or(false))
    }

    async fn get_file_size(&self, path: &RelativePath) -> Result<u64, FileOpsError> {
        let meta = tokio::fs::metadata(self.resolve(path)).await.map_err(|e| Self::io_err(path, e))?;
        Ok(meta.len())
    }

    async fn get_modification_time(&self, path: &RelativePath) -> Result<SystemTime, FileOpsError> {
        let meta = tokio::fs::metadata(self.resolve(path)).await.map_err(|e| Self::io_err(path, e))?;
        meta.modified().map_err(|e| Self::io_err(path, e))
    }

    async fn create_new(&self, path: &RelativePath, bytes: &[u8]) -> Result<(), FileOpsError> {
        let full = self.resolve(path);
        self.ensure_parent(&full).await.map_err(|e| Self::io_err(path, e))?;
        match tokio::fs::OpenOptions::new().write(true).create_new(true).open(&full).await {
            Ok(mut file) => {
                use tokio::io::AsyncWriteExt;
                file.write_all(bytes).await.map_err(|e| Self::io_err(path, e))?;
                Ok(())
            }
            // Lost a create race: fall through to a normal write of the same content.
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => self.write_raw(path, bytes).await,
            Err(e) => Err(Self::io_err(path, e)),
        }
    }

    async fn write_raw(&self, path: &RelativePath, bytes: &[u8]) -> Result<(), FileOpsError> {
        let full = self.resolve(path);
        self.ensure_parent(&full).await.map_err(|e| Self::io_err(path, e))?;
        tokio::fs::write(&full, bytes).await.map_err(|e| Self::io_err(path, e))
    }

    async fn remove(&self, path: &RelativePath) -> Result<(), FileOpsError> {
        match tokio::fs::remove_file(self.resolve(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_err(path, e)),
        }
    }

    async fn move_path(&self, old: &RelativePath, new: &RelativePath) -> Result<(), FileOpsError> {
        if old == new {
            return Ok(());
        }
        let old_full = self.resolve(old);
        let new_full = self.resolve(new);
        self.ensure_parent(&new_full).await.map_err(|e| Self::io_err(new, e))?;
        tokio::fs::rename(&old_full, &new_full).await.map_err(|e| Self::io_err(old, e))
    }
}

fn normalize_crlf(bytes: &[u8]) -> Vec<u8> {
    let text = String::from_utf8_lossy(bytes);
    if text.contains('\r') {
        text.replace("\r\n", "\n").into_bytes()
    } else {
        bytes.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> RelativePath {
        RelativePath::new(s).unwrap()
    }

    #[tokio::test]
    async fn create_new_then_read_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = LocalFileOps::new(tmp.path());
        fs.create_new(&path("notes/a.md"), b"hello").await.unwrap();
        assert_eq!(fs.read(&path("notes/a.md")).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn read_normalizes_crlf() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = LocalFileOps::new(tmp.path());
        fs.create_new(&path("a.md"), b"a\r\nb\r\n").await.unwrap();
        assert_eq!(fs.read(&path("a.md")).await.unwrap(), b"a\nb\n");
    }

    #[tokio::test]
    async fn list_all_walks_nested_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = LocalFileOps::new(tmp.path());
        fs.create_new(&path("a.md"), b"1").await.unwrap();
        fs.create_new(&path("notes/b.md"), b"2").await.unwrap();

        let mut all = fs.list_all().await.unwrap();
        all.sort();
        assert_eq!(all, vec![path("a.md"), path("notes/b.md")]);
    }

    #[tokio::test]
    async fn move_path_relocates_file_and_creates_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = LocalFileOps::new(tmp.path());
        fs.create_new(&path("a.md"), b"hi").await.unwrap();
        fs.move_path(&path("a.md"), &path("archive/a.md")).await.unwrap();

        assert!(!fs.exists(&path("a.md")).await.unwrap());
        assert_eq!(fs.read(&path("archive/a.md")).await.unwrap(), b"hi");
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = LocalFileOps::new(tmp.path());
        fs.remove(&path("missing.md")).await.unwrap();
    }
}
