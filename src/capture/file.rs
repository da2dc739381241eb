//! File acceptance, the alternative to the camera path.

use std::path::Path;

use image::ImageFormat;

use super::types::{CapturedMedia, FileError, MediaSource};

/// Video containers recognised by extension
const VIDEO_EXTENSIONS: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("webm", "video/webm"),
    ("mov", "video/quicktime"),
    ("mkv", "video/x-matroska"),
    ("avi", "video/x-msvideo"),
    ("3gp", "video/3gpp"),
];

/// Whether a MIME type can be analyzed
pub fn is_supported_mime(mime_type: &str) -> bool {
    mime_type.starts_with("image/") || mime_type.starts_with("video/")
}

/// Accept file contents with a declared MIME type.
pub fn accept_file(data: Vec<u8>, mime_type: &str) -> Result<CapturedMedia, FileError> {
    if !is_supported_mime(mime_type) {
        return Err(FileError::Format(mime_type.to_string()));
    }
    tracing::debug!(mime_type, bytes = data.len(), "file accepted");
    Ok(CapturedMedia::new(data, mime_type, MediaSource::File))
}

/// Read a file from disk and accept it, inferring the MIME type.
pub fn accept_path(path: &Path) -> Result<CapturedMedia, FileError> {
    let data = std::fs::read(path)?;
    let mime_type = mime_from_path(path)
        .or_else(|| sniff_image_mime(&data))
        .unwrap_or("application/octet-stream");
    accept_file(data, mime_type)
}

/// Infer a MIME type from the file extension
pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();

    if let Some((_, mime)) = VIDEO_EXTENSIONS.iter().find(|(e, _)| *e == ext) {
        return Some(*mime);
    }
    ImageFormat::from_extension(&ext).and_then(image_mime)
}

/// Detect an image MIME type from magic bytes
pub fn sniff_image_mime(data: &[u8]) -> Option<&'static str> {
    image::guess_format(data).ok().and_then(image_mime)
}

fn image_mime(format: ImageFormat) -> Option<&'static str> {
    let mime = match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::Ico => "image/x-icon",
        ImageFormat::Avif => "image/avif",
        _ => return None,
    };
    Some(mime)
}
