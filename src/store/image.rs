//! Disk-backed image persistence.
//!
//! Each upload owns an independent write target: bytes are appended to a
//! hidden temp file and only renamed to the final, discoverable path when the
//! upload completes. An aborted or failed upload leaves no visible artifact.

use std::path::PathBuf;

use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

/// Persists uploaded image bytes under a base directory.
#[derive(Clone, Debug)]
pub struct DiskImageStore {
    dir: PathBuf,
}

impl DiskImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Allocates a write target for a new upload stream.
    ///
    /// The caller is responsible for validating that `laptop_id` refers to an
    /// existing record before beginning the upload.
    pub async fn begin(&self, laptop_id: &str, image_type: &str) -> Result<ImageUpload> {
        fs::create_dir_all(&self.dir).await?;

        let id = Uuid::new_v4();
        let temp_path = self.dir.join(format!(".{id}.partial"));
        let file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await?;

        debug!(laptop_id, image_id = %id, "began image upload");

        Ok(ImageUpload {
            id,
            final_path: self.dir.join(format!("{id}{image_type}")),
            temp_path,
            file,
            size: 0,
        })
    }
}

/// One in-progress upload stream.
pub struct ImageUpload {
    id: Uuid,
    final_path: PathBuf,
    temp_path: PathBuf,
    file: File,
    size: u64,
}

impl ImageUpload {
    /// Appends one chunk and returns the running byte total.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<u64> {
        self.file.write_all(chunk).await?;
        self.size += chunk.len() as u64;
        Ok(self.size)
    }

    /// Finalizes the upload, making the image visible at its final path.
    ///
    /// Returns the generated image identifier and total byte count. The
    /// rename is the only step that publishes the artifact, so a failure
    /// anywhere leaves nothing discoverable.
    pub async fn complete(mut self) -> Result<(String, u64)> {
        if let Err(e) = self.finalize().await {
            let _ = fs::remove_file(&self.temp_path).await;
            return Err(e);
        }
        Ok((self.id.to_string(), self.size))
    }

    async fn finalize(&mut self) -> Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        fs::rename(&self.temp_path, &self.final_path).await?;
        Ok(())
    }

    /// Discards the upload, removing the temp file.
    pub async fn abort(self) {
        drop(self.file);
        let _ = fs::remove_file(&self.temp_path).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chunked_upload_persists_exact_byte_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskImageStore::new(dir.path());

        let chunks: [&[u8]; 3] = [b"abc", b"defgh", b"ij"];
        let mut upload = store.begin("laptop-1", ".jpg").await.unwrap();
        let mut expected = 0u64;
        for chunk in chunks {
            expected += chunk.len() as u64;
            assert_eq!(upload.write_chunk(chunk).await.unwrap(), expected);
        }

        let (id, size) = upload.complete().await.unwrap();
        assert_eq!(size, 10);

        let persisted = std::fs::read(dir.path().join(format!("{id}.jpg"))).unwrap();
        assert_eq!(persisted, b"abcdefghij");
    }

    #[tokio::test]
    async fn aborted_upload_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskImageStore::new(dir.path());

        let mut upload = store.begin("laptop-1", ".png").await.unwrap();
        upload.write_chunk(b"partial bytes").await.unwrap();
        upload.abort().await;

        let remaining: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn concurrent_uploads_do_not_interfere() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskImageStore::new(dir.path());

        let mut first = store.begin("laptop-1", ".jpg").await.unwrap();
        let mut second = store.begin("laptop-1", ".jpg").await.unwrap();

        first.write_chunk(&[0u8; 100]).await.unwrap();
        second.write_chunk(&[1u8; 7]).await.unwrap();
        first.write_chunk(&[0u8; 50]).await.unwrap();

        let (first_id, first_size) = first.complete().await.unwrap();
        let (second_id, second_size) = second.complete().await.unwrap();

        assert_ne!(first_id, second_id);
        assert_eq!(first_size, 150);
        assert_eq!(second_size, 7);
    }

    #[tokio::test]
    async fn empty_upload_completes_with_zero_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskImageStore::new(dir.path());

        let upload = store.begin("laptop-1", ".gif").await.unwrap();
        let (id, size) = upload.complete().await.unwrap();

        assert_eq!(size, 0);
        assert!(dir.path().join(format!("{id}.gif")).exists());
    }
}
