//! Downloads - background handler for `saveFile` messages.
//!
//! Resolves the object URL carried by the message, hands the bytes to a
//! `DownloadManager` and then drops the envelope, which revokes the URL.

use crate::error::{ExportError, Result};
use crate::runtime::{Blob, BlobStore, Envelope, Listener, RuntimeMessage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Something that stores downloaded documents.
pub trait DownloadManager: Send + Sync {
    /// Persist `blob` under `filename` and return where it ended up.
    fn download(&self, filename: &str, blob: &Blob) -> Result<PathBuf>;
}

/// Writes downloads into a directory. Existing files are never overwritten:
/// `name.html` becomes `name (1).html`, `name (2).html`, ...
#[derive(Debug, Clone)]
pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn unique_path(&self, filename: &str) -> PathBuf {
        let candidate = self.dir.join(filename);
        if !candidate.exists() {
            return candidate;
        }

        let path = Path::new(filename);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        (1..)
            .map(|n| self.dir.join(format!("{} ({}){}", stem, n, ext)))
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }
}

impl DownloadManager for DirectoryDownloads {
    fn download(&self, filename: &str, blob: &Blob) -> Result<PathBuf> {
        // Only the final component is honored; never write outside `dir`
        let name = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ExportError::Render(format!("Invalid download filename: {}", filename)))?;

        std::fs::create_dir_all(&self.dir)?;
        let path = self.unique_path(&name);
        std::fs::write(&path, blob.bytes.as_slice())?;
        Ok(path)
    }
}

/// Background-side consumer of content -> background envelopes.
#[derive(Clone)]
pub struct DownloadHandler {
    blobs: BlobStore,
    manager: Arc<dyn DownloadManager>,
}

impl DownloadHandler {
    pub fn new(blobs: BlobStore, manager: Arc<dyn DownloadManager>) -> Self {
        Self { blobs, manager }
    }

    /// Handle one envelope. Returns the saved path for `saveFile` messages.
    ///
    /// The envelope is consumed: its object URL is revoked when this returns,
    /// on success and on failure alike.
    pub fn handle(&self, envelope: Envelope) -> Result<Option<PathBuf>> {
        let RuntimeMessage::SaveFile { url, filename } = &envelope.message else {
            return Ok(None);
        };

        let blob = self
            .blobs
            .resolve(url)
            .ok_or_else(|| ExportError::UnknownObjectUrl(url.clone()))?;
        let path = self.manager.download(filename, &blob)?;
        info!(path = %path.display(), "Saved export");

        Ok(Some(path))
    }

    /// Process envelopes until every sender is gone. Returns saved paths.
    pub async fn run(self, mut listener: Listener<Envelope>) -> Vec<PathBuf> {
        let mut saved = Vec::new();
        while let Some(envelope) = listener.recv().await {
            match self.handle(envelope) {
                Ok(Some(path)) => saved.push(path),
                Ok(None) => {}
                Err(e) => error!(error = %e, "Download failed"),
            }
        }
        saved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn handler(dir: &Path, blobs: &BlobStore) -> DownloadHandler {
        DownloadHandler::new(blobs.clone(), Arc::new(DirectoryDownloads::new(dir)))
    }

    #[test]
    fn test_save_file_writes_and_revokes() {
        let temp = TempDir::new().unwrap();
        let blobs = BlobStore::new();
        let url = blobs.create_object_url(b"# Chat".to_vec(), "text/markdown");

        let path = handler(temp.path(), &blobs)
            .handle(Envelope::save_file(url, "Chat.md"))
            .unwrap()
            .unwrap();

        assert_eq!(path, temp.path().join("Chat.md"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Chat");
        assert_eq!(blobs.live_count(), 0);
    }

    #[test]
    fn test_existing_files_are_not_overwritten() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("Chat.html"), "old").unwrap();
        let blobs = BlobStore::new();
        let h = handler(temp.path(), &blobs);

        let first = h
            .handle(Envelope::save_file(
                blobs.create_object_url(b"new".to_vec(), "text/html"),
                "Chat.html",
            ))
            .unwrap()
            .unwrap();
        let second = h
            .handle(Envelope::save_file(
                blobs.create_object_url(b"newer".to_vec(), "text/html"),
                "Chat.html",
            ))
            .unwrap()
            .unwrap();

        assert_eq!(first, temp.path().join("Chat (1).html"));
        assert_eq!(second, temp.path().join("Chat (2).html"));
        assert_eq!(std::fs::read_to_string(temp.path().join("Chat.html")).unwrap(), "old");
    }

    #[test]
    fn test_path_components_are_dropped() {
        let temp = TempDir::new().unwrap();
        let blobs = BlobStore::new();

        let path = handler(temp.path(), &blobs)
            .handle(Envelope::save_file(
                blobs.create_object_url(b"x".to_vec(), "text/html"),
                "../../escape.html",
            ))
            .unwrap()
            .unwrap();

        assert_eq!(path, temp.path().join("escape.html"));
    }

    #[test]
    fn test_unknown_url_fails_cleanly() {
        let temp = TempDir::new().unwrap();
        let blobs = BlobStore::new();
        let envelope = Envelope::new(RuntimeMessage::SaveFile {
            url: "blob:chat-printer/gone".to_string(),
            filename: "x.html".to_string(),
        });

        let err = handler(temp.path(), &blobs).handle(envelope).unwrap_err();
        assert!(matches!(err, ExportError::UnknownObjectUrl(_)));
    }

    #[test]
    fn test_failed_download_still_revokes() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let blobs = BlobStore::new();

        let result = handler(&blocker, &blobs).handle(Envelope::save_file(
            blobs.create_object_url(b"x".to_vec(), "text/html"),
            "x.html",
        ));

        assert!(result.is_err());
        assert_eq!(blobs.live_count(), 0);
    }

    #[test]
    fn test_other_messages_are_ignored() {
        let temp = TempDir::new().unwrap();
        let blobs = BlobStore::new();
        let result = handler(temp.path(), &blobs)
            .handle(Envelope::new(RuntimeMessage::PrintChat { format: None }))
            .unwrap();
        assert!(result.is_none());
    }
}
