/// Media handling for uploaded recipe images
///
/// Uploaded files never keep their client-supplied name. Each one is stored
/// under a fresh UUID with the extension of the format detected from its
/// bytes, relative to the media root:
///
/// ```text
/// uploads/recipe/5f0c5b1e-....jpg
/// ```
///
/// The relative path is what the `recipes.image` column holds. The API turns
/// it into a URL by prefixing the configured media URL.

pub mod storage;

use std::fmt::Display;
use uuid::Uuid;

pub use storage::{LocalMediaStorage, MediaStorage, StorageError};

/// Directory, relative to the media root, holding recipe images
pub const RECIPE_IMAGE_DIR: &str = "uploads/recipe";

/// Image formats accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Extension used when the client supplied none
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
        }
    }
}

/// Detects an image format from the leading magic bytes
///
/// Returns `None` for anything that is not a recognized image, regardless of
/// what the file name or declared content type claims.
pub fn detect_image_format(bytes: &[u8]) -> Option<ImageFormat> {
    // JPEG: FF D8 FF
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(ImageFormat::Jpeg);
    }

    // PNG: 89 'P' 'N' 'G' CR LF SUB LF
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(ImageFormat::Png);
    }

    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some(ImageFormat::Gif);
    }

    // WebP: RIFF <size> WEBP
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some(ImageFormat::WebP);
    }

    None
}

/// Builds a storage path for a recipe image, keeping only the extension
pub fn recipe_image_file_path(filename: &str) -> String {
    image_file_path_with(Uuid::new_v4(), filename)
}

/// Storage path for an upload whose format was detected from its content
///
/// The extension comes from `format`, never from the client's file name, so
/// the file is always served with an image content type.
pub fn recipe_image_path_for(format: ImageFormat) -> String {
    format!("{}/{}.{}", RECIPE_IMAGE_DIR, Uuid::new_v4(), format.extension())
}

/// Same as [`recipe_image_file_path`] with a caller-chosen identifier
///
/// The extension is taken from the last path component only and keeps its
/// case. A name with no extension yields a path with none.
pub fn image_file_path_with(identifier: impl Display, filename: &str) -> String {
    let basename = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let extension = match basename.rfind('.') {
        Some(index) if index > 0 => &basename[index..],
        _ => "",
    };

    format!("{}/{}{}", RECIPE_IMAGE_DIR, identifier, extension)
}

/// Joins a media URL prefix and a stored relative path
pub fn media_url(prefix: &str, relative_path: &str) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        relative_path.trim_start_matches('/')
    )
}
