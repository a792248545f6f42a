//! Uploaded media storage.
//!
//! Product images are written below `<media_root>/store/images/` and served
//! back from `/media/`. Stored names keep the uploaded stem and get a random
//! seven-character suffix so repeated uploads of `mug.png` never collide.
//!
//! An upload must carry an accepted extension and start with the signature
//! of a JPEG, PNG, GIF or WebP file.

use std::path::{Path, PathBuf};

use rand::distr::{Alphanumeric, SampleString};
use thiserror::Error;
use url::Url;

/// Largest accepted upload, in bytes.
pub const MAX_IMAGE_BYTES: usize = 50 * 1024;

/// Accepted file extensions, lowercase.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Directory below the media root that holds product images.
const PRODUCT_IMAGE_DIR: &str = "store/images";

/// Length of the random suffix appended to stored names.
const SUFFIX_LEN: usize = 7;

/// Longest stem kept from the uploaded name; stored paths fit `VARCHAR(100)`.
const MAX_STEM_LEN: usize = 60;

/// Errors from image handling.
#[derive(Debug, Error)]
pub enum MediaError {
    /// No `image` part was submitted.
    #[error("No file was submitted.")]
    Missing,

    /// The upload is larger than [`MAX_IMAGE_BYTES`].
    #[error("File size must be less than 50 KB")]
    TooLarge,

    /// The extension is not an accepted image type.
    #[error(
        "File extension \u{201c}{0}\u{201d} is not allowed. Allowed extensions are: jpg, jpeg, png, gif, webp."
    )]
    UnsupportedExtension(String),

    /// The content does not start with a known image signature.
    #[error(
        "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
    )]
    NotAnImage,

    /// Reading or writing the media directory failed.
    #[error("media storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Filesystem-backed media storage.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    base_url: Url,
}

impl MediaStore {
    /// Create a store rooted at `root`, publishing files under `<base_url>media/`.
    #[must_use]
    pub const fn new(root: PathBuf, base_url: Url) -> Self {
        Self { root, base_url }
    }

    /// The directory files are stored in.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate and store a product image.
    ///
    /// Returns the stored path relative to the media root.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::TooLarge`, `MediaError::UnsupportedExtension` or
    /// `MediaError::NotAnImage` for rejected uploads, `MediaError::Io` if the
    /// file cannot be written.
    pub async fn save_product_image(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        let (stem, extension) = validate_image(file_name, bytes)?;
        let relative = format!("{PRODUCT_IMAGE_DIR}/{}", stored_name(&stem, &extension));

        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "Stored product image");

        Ok(relative)
    }

    /// Remove a stored file. Missing files are ignored.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Io` for failures other than not-found.
    pub async fn delete(&self, relative: &str) -> Result<(), MediaError> {
        match tokio::fs::remove_file(self.root.join(relative)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Absolute URL of a stored file.
    #[must_use]
    pub fn url(&self, relative: &str) -> String {
        self.base_url
            .join("media/")
            .and_then(|media| media.join(relative))
            .map_or_else(|_| format!("/media/{relative}"), String::from)
    }
}

/// Check an upload's size, extension and content.
///
/// Returns the sanitized stem and the lowercase extension.
///
/// # Errors
///
/// Returns `MediaError::TooLarge`, `MediaError::UnsupportedExtension` or
/// `MediaError::NotAnImage`.
pub fn validate_image(file_name: &str, bytes: &[u8]) -> Result<(String, String), MediaError> {
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(MediaError::TooLarge);
    }

    // Browsers may send a full client-side path.
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    let (stem, extension) = base.rsplit_once('.').unwrap_or((base, ""));
    let extension = extension.to_ascii_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(MediaError::UnsupportedExtension(extension));
    }
    if !has_image_signature(bytes) {
        return Err(MediaError::NotAnImage);
    }

    Ok((sanitize_stem(stem), extension))
}

/// Whether `bytes` starts like a JPEG, PNG, GIF or WebP file.
fn has_image_signature(bytes: &[u8]) -> bool {
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

    bytes.starts_with(JPEG)
        || bytes.starts_with(PNG)
        || bytes.starts_with(b"GIF87a")
        || bytes.starts_with(b"GIF89a")
        || (bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP".as_slice()))
}

/// Keep letters, digits, `-` and `_`; map whitespace to `_`; drop the rest.
fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .take(MAX_STEM_LEN)
        .collect();

    if cleaned.is_empty() {
        "image".to_owned()
    } else {
        cleaned
    }
}

fn stored_name(stem: &str, extension: &str) -> String {
    let suffix = Alphanumeric.sample_string(&mut rand::rng(), SUFFIX_LEN);
    format!("{stem}_{suffix}.{extension}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn store(root: PathBuf) -> MediaStore {
        MediaStore::new(root, Url::parse("http://shop.test/").unwrap())
    }

    #[test]
    fn test_validate_accepts_known_extensions() {
        for name in ["a.jpg", "b.JPEG", "c.png", "d.gif", "e.webp"] {
            assert!(validate_image(name, PNG_BYTES).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_signatures() {
        assert!(has_image_signature(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]));
        assert!(has_image_signature(PNG_BYTES));
        assert!(has_image_signature(b"GIF89a\x01\0\x01\0"));
        assert!(has_image_signature(b"RIFF\x24\0\0\0WEBPVP8 "));
        assert!(!has_image_signature(b"RIFF\x24\0\0\0WAVEfmt "));
        assert!(!has_image_signature(b""));
    }

    #[test]
    fn test_text_with_image_extension_is_rejected() {
        let err = validate_image("notes.png", b"just some notes\n").unwrap_err();
        assert!(matches!(err, MediaError::NotAnImage));
        assert!(err.to_string().starts_with("Upload a valid image."));
    }

    #[test]
    fn test_validate_rejects_other_extensions() {
        assert!(matches!(
            validate_image("notes.txt", PNG_BYTES),
            Err(MediaError::UnsupportedExtension(ext)) if ext == "txt"
        ));
        assert!(matches!(
            validate_image("noextension", PNG_BYTES),
            Err(MediaError::UnsupportedExtension(ext)) if ext.is_empty()
        ));
    }

    #[test]
    fn test_validate_size_limit() {
        let mut bytes = PNG_BYTES.to_vec();
        bytes.resize(MAX_IMAGE_BYTES, 0);
        assert!(validate_image("a.png", &bytes).is_ok());
        bytes.push(0);
        let err = validate_image("a.png", &bytes).unwrap_err();
        assert_eq!(err.to_string(), "File size must be less than 50 KB");
    }

    #[test]
    fn test_validate_strips_client_path() {
        let (stem, ext) = validate_image("C:\\Users\\me\\My Dog!.PNG", PNG_BYTES).unwrap();
        assert_eq!(stem, "My_Dog");
        assert_eq!(ext, "png");
        let (stem, _) = validate_image("../../etc/.png", PNG_BYTES).unwrap();
        assert_eq!(stem, "image");
    }

    #[test]
    fn test_long_stem_is_truncated() {
        let (stem, _) = validate_image(&format!("{}.jpg", "a".repeat(300)), PNG_BYTES).unwrap();
        assert_eq!(stem.len(), MAX_STEM_LEN);
    }

    #[test]
    fn test_stored_name_has_random_suffix() {
        let name = stored_name("dog", "jpg");
        let (stem, rest) = name.split_once('_').unwrap();
        assert_eq!(stem, "dog");
        let (suffix, ext) = rest.split_once('.').unwrap();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(ext, "jpg");
    }

    #[test]
    fn test_url() {
        let store = store(PathBuf::from("media"));
        assert_eq!(
            store.url("store/images/dog_abc1234.jpg"),
            "http://shop.test/media/store/images/dog_abc1234.jpg"
        );
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let root = std::env::temp_dir().join(format!("storefront-media-{}", uuid::Uuid::new_v4()));
        let store = store(root.clone());

        let relative = store.save_product_image("dog.png", PNG_BYTES).await.unwrap();
        assert!(relative.starts_with("store/images/dog_"));
        assert_eq!(tokio::fs::read(root.join(&relative)).await.unwrap(), PNG_BYTES);

        store.delete(&relative).await.unwrap();
        assert!(!root.join(&relative).exists());
        // Deleting twice is fine.
        store.delete(&relative).await.unwrap();

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
