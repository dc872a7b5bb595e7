//! Product image storage under `<data_dir>/uploads`.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::utils::secure_filename;

/// Image extensions accepted for product photos
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Unsupported image type for '{0}'. Allowed: png, jpg, jpeg, gif, webp")]
    UnsupportedType(String),

    #[error("Image file name is empty")]
    EmptyName,

    #[error("Failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

/// A file part received from a multipart form
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Whether the file name carries an allowed image extension
pub fn allowed_file(name: &str) -> bool {
    let ext = match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => return false,
    };
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return false;
    }

    mime_guess::from_ext(&ext)
        .first()
        .map(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reject images the store would refuse, before anything is written
    pub fn check(&self, image: &UploadedImage) -> Result<(), UploadError> {
        if image.file_name.trim().is_empty() {
            return Err(UploadError::EmptyName);
        }
        if !allowed_file(&image.file_name) {
            return Err(UploadError::UnsupportedType(image.file_name.clone()));
        }
        Ok(())
    }

    /// Store the image as `<code>_<sanitized name>` and return the
    /// path relative to the data directory, e.g. `uploads/LH-01_front.jpg`.
    pub async fn save(&self, product_code: &str, image: &UploadedImage) -> Result<String, UploadError> {
        self.check(image)?;

        let name = format!(
            "{}_{}",
            secure_filename(product_code),
            secure_filename(&image.file_name)
        );

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&name), &image.bytes).await?;

        tracing::debug!(file = %name, bytes = image.bytes.len(), "Stored product image");
        Ok(format!("uploads/{}", name))
    }

    /// Best-effort removal of a stored image by its relative path
    pub async fn remove(&self, relative_path: &str) {
        let name = relative_path.trim_start_matches("uploads/");
        if let Err(e) = tokio::fs::remove_file(self.dir.join(name)).await {
            tracing::warn!(path = %relative_path, error = %e, "Failed to remove product image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str) -> UploadedImage {
        UploadedImage {
            file_name: name.to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[test]
    fn test_allowed_file() {
        assert!(allowed_file("front.png"));
        assert!(allowed_file("FRONT.JPG"));
        assert!(allowed_file("a.b.jpeg"));
        assert!(allowed_file("twirl.gif"));
        assert!(allowed_file("pleats.webp"));

        assert!(!allowed_file("notes.txt"));
        assert!(!allowed_file("archive.png.exe"));
        assert!(!allowed_file("noextension"));
    }

    #[tokio::test]
    async fn test_save_uses_code_prefix_and_sanitized_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("uploads"));

        let path = store.save("LH-01", &image("../My Front.png")).await.unwrap();
        assert_eq!(path, "uploads/LH-01_My_Front.png");
        assert!(dir.path().join("uploads/LH-01_My_Front.png").is_file());

        store.remove(&path).await;
        assert!(!dir.path().join("uploads/LH-01_My_Front.png").exists());
    }

    #[tokio::test]
    async fn test_save_rejects_unsupported_types() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let err = store.save("LH-01", &image("invoice.pdf")).await.unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType(_)));
        assert!(matches!(store.check(&image(" ")), Err(UploadError::EmptyName)));
    }
}
