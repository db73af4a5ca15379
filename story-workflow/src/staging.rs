//! Image staging on local disk under `<base>/<chat_id>/<uuid>.<ext>`.
//!
//! Files are written to a temporary name and renamed into place, so a staged path is either
//! complete or absent.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ArtifactStager {
    base: PathBuf,
}

/// File extension by magic bytes; PNG and JPEG are recognized, anything else is stored as `.img`.
pub fn image_extension(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "jpg"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "webp"
    } else {
        "img"
    }
}

impl ArtifactStager {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub async fn stage(&self, chat_id: i64, bytes: &[u8]) -> io::Result<PathBuf> {
        if bytes.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "empty image"));
        }
        let dir = self.base.join(chat_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let name = Uuid::new_v4().to_string();
        let path = dir.join(format!("{}.{}", name, image_extension(bytes)));
        let tmp = dir.join(format!(".{}.part", name));

        if let Err(e) = tokio::fs::write(&tmp, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        tokio::fs::rename(&tmp, &path).await?;

        debug!(chat_id, path = %path.display(), size = bytes.len(), "Staged image");
        Ok(path)
    }

    /// Best-effort removal of a staged file.
    pub async fn discard(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            debug!(path = %path.display(), error = %e, "Could not remove staged image");
        }
    }
}

/// Bytes of a staged image; None when the file is missing, unreadable or empty.
pub async fn read_staged(path: &Path) -> Option<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) if !bytes.is_empty() => Some(bytes),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];

    #[tokio::test]
    async fn test_stage_writes_chat_scoped_file() {
        let dir = tempfile::tempdir().unwrap();
        let stager = ArtifactStager::new(dir.path());

        let path = stager.stage(42, PNG).await.unwrap();

        assert!(path.starts_with(dir.path().join("42")));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));
        assert_eq!(read_staged(&path).await.as_deref(), Some(PNG));
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("42"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_stage_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        let stager = ArtifactStager::new(dir.path());
        assert!(stager.stage(1, &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        assert!(read_staged(Path::new("/definitely/not/here.png")).await.is_none());
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension(PNG), "png");
        assert_eq!(image_extension(&[0xFF, 0xD8, 0xFF, 0xE0]), "jpg");
        assert_eq!(image_extension(b"hello"), "img");
    }
}
