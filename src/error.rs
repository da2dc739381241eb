//! User-facing error taxonomy shared by the capture, analysis and session layers.

use serde::{Deserialize, Serialize};

/// Classification of every failure a session can display.
///
/// The kind decides which retry action the error banner offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Camera permission was refused
    CameraDenied,
    /// No camera device exists
    CameraNotFound,
    /// The runtime has no media-capture support
    CameraUnsupported,
    /// A selected file is neither an image nor a video
    FileFormat,
    /// The analysis call failed or returned an unusable body
    AiFailed,
    /// The provider rejected the credential or project (billing issue)
    EntityNotFound,
    /// Anything else
    Unknown,
}

impl ErrorKind {
    /// Whether retrying should restart the camera rather than the analysis.
    pub fn is_camera_related(self) -> bool {
        matches!(
            self,
            ErrorKind::CameraDenied | ErrorKind::CameraNotFound | ErrorKind::CameraUnsupported
        )
    }

    /// Default banner text, in Arabic like the rest of the interface.
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::CameraDenied => {
                "تم رفض الوصول للكاميرا. يرجى تفعيل الصلاحية من إعدادات المتصفح."
            }
            ErrorKind::CameraNotFound => "لم يتم العثور على كاميرا في هذا الجهاز.",
            ErrorKind::CameraUnsupported => {
                "المتصفح لا يدعم الوصول للكاميرا. يرجى التأكد من استخدام متصفح حديث واتصال آمن HTTPS."
            }
            ErrorKind::FileFormat => "يرجى اختيار صور أو فيديو فقط.",
            ErrorKind::AiFailed => "فشل في تحليل المخاطر. يرجى المحاولة مرة أخرى.",
            ErrorKind::EntityNotFound => {
                "المشروع أو مفتاح API غير صالح. يرجى اختيار مفتاح من مشروع مدفوع مفعل به نظام الفوترة."
            }
            ErrorKind::Unknown => "فشل تشغيل الكاميرا. يرجى منح الصلاحيات واستخدام رابط HTTPS.",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::CameraDenied => "CAMERA_DENIED",
            ErrorKind::CameraNotFound => "CAMERA_NOT_FOUND",
            ErrorKind::CameraUnsupported => "CAMERA_UNSUPPORTED",
            ErrorKind::FileFormat => "FILE_FORMAT",
            ErrorKind::AiFailed => "AI_FAILED",
            ErrorKind::EntityNotFound => "ENTITY_NOT_FOUND",
            ErrorKind::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// An error as shown in the session's dismissible banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct SessionError {
    /// Classification used to pick the retry action
    pub kind: ErrorKind,
    /// Text shown to the user
    pub message: String,
    /// Underlying cause, kept for logs and `--json` output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl SessionError {
    /// Create an error with the kind's default message.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: kind.user_message().to_string(),
            detail: None,
        }
    }

    /// Attach the technical cause.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_camera_related(&self) -> bool {
        self.kind.is_camera_related()
    }
}

impl From<ErrorKind> for SessionError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_related_kinds() {
        assert!(ErrorKind::CameraDenied.is_camera_related());
        assert!(ErrorKind::CameraNotFound.is_camera_related());
        assert!(ErrorKind::CameraUnsupported.is_camera_related());
        assert!(!ErrorKind::AiFailed.is_camera_related());
        assert!(!ErrorKind::EntityNotFound.is_camera_related());
        assert!(!ErrorKind::FileFormat.is_camera_related());
    }

    #[test]
    fn test_session_error_detail() {
        let err = SessionError::new(ErrorKind::AiFailed).with_detail("HTTP 500");
        assert_eq!(err.message, ErrorKind::AiFailed.user_message());
        assert_eq!(err.detail.as_deref(), Some("HTTP 500"));
        assert!(err.to_string().starts_with("AI_FAILED"));
    }

    #[test]
    fn test_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::EntityNotFound).unwrap();
        assert_eq!(json, "\"ENTITY_NOT_FOUND\"");
    }
}
