// Core types for media capture

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Which acquisition path the session is using
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Still images chosen from files
    #[default]
    Image,
    /// Live camera with recording
    Video,
}

/// Where a piece of media came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaSource {
    /// A user-supplied file
    File,
    /// A camera recording
    Recording,
}

/// Broad media class, used to pick the preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Media waiting to be analyzed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedMedia {
    /// Encoded bytes (image file, or concatenated recording fragments)
    #[serde(skip)]
    pub data: Vec<u8>,

    /// MIME type of `data`
    pub mime_type: String,

    /// Where the media came from
    pub source: MediaSource,

    /// When the media was captured or accepted
    #[serde(with = "chrono::serde::ts_seconds")]
    pub captured_at: DateTime<Utc>,
}

impl std::fmt::Debug for CapturedMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedMedia")
            .field("bytes", &self.data.len())
            .field("mime_type", &self.mime_type)
            .field("source", &self.source)
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

impl CapturedMedia {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>, source: MediaSource) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            source,
            captured_at: Utc::now(),
        }
    }

    /// Parse a `data:<mime>;base64,<payload>` URI.
    pub fn from_data_uri(uri: &str, source: MediaSource) -> Option<Self> {
        let rest = uri.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        let mime_type = header.strip_suffix(";base64")?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .ok()?;
        Some(Self::new(data, mime_type, source))
    }

    /// Base64 payload without any data-URI prefix
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Render as a `data:` URI for previews
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    pub fn kind(&self) -> MediaKind {
        if self.mime_type.starts_with("video") {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Errors raised while acquiring camera media
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    /// Permission refused by the user or the platform
    #[error("camera access denied: {0}")]
    Denied(String),

    /// No capture device present
    #[error("no camera found: {0}")]
    NotFound(String),

    /// The runtime cannot capture media at all
    #[error("media capture unsupported: {0}")]
    Unsupported(String),

    /// A live constraint was rejected by the hardware
    #[error("constraint rejected: {0}")]
    Constraint(String),

    /// Any other platform failure
    #[error("camera failure: {0}")]
    Platform(String),
}

impl CameraError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CameraError::Denied(_) => ErrorKind::CameraDenied,
            CameraError::NotFound(_) => ErrorKind::CameraNotFound,
            CameraError::Unsupported(_) => ErrorKind::CameraUnsupported,
            CameraError::Constraint(_) | CameraError::Platform(_) => ErrorKind::Unknown,
        }
    }
}

/// Errors raised while accepting a user-supplied file
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// Not an image or video
    #[error("unsupported file type: {0}")]
    Format(String),

    /// The file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FileError::Format(_) => ErrorKind::FileFormat,
            FileError::Io(_) => ErrorKind::Unknown,
        }
    }
}

/// Result type for camera operations
pub type CameraResult<T> = Result<T, CameraError>;
