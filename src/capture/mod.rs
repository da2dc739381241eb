pub mod acquirer;
pub mod camera;
pub mod file;
pub mod mock;
pub mod recording;
pub mod types;

pub use acquirer::{AcquirerPhase, MediaAcquirer};
pub use camera::{
    CameraCapabilities, CameraHints, CameraPlatform, Facing, MediaRecorder, MediaStream,
    TrackConstraint, ZoomRange,
};
pub use file::{accept_file, accept_path, is_supported_mime, mime_from_path};
pub use mock::{MockCamera, MockCameraConfig};
pub use recording::{RecordingSession, RecordingTimer, format_elapsed};
pub use types::{CameraError, CameraResult, CaptureMode, CapturedMedia, FileError, MediaKind, MediaSource};
