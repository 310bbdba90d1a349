//! Filenames for downloaded images

use image::ImageFormat;
use md5::{Digest, Md5};

/// Lowercase hex MD5 of raw bytes
#[must_use]
pub fn md5_hex(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Lowercase codec name used as the extension of content-addressed files
#[must_use]
pub fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        other => other
            .extensions_str()
            .first()
            .map_or_else(|| format!("{other:?}").to_lowercase(), |ext| (*ext).to_string()),
    }
}

/// `<md5-hex>.<format>` for bytes whose codec can be sniffed, `None` otherwise
#[must_use]
pub fn content_hash_name(bytes: &[u8]) -> Option<String> {
    let format = image::guess_format(bytes).ok()?;
    Some(format!("{}.{}", md5_hex(bytes), format_name(format)))
}
