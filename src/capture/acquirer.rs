//! Camera lifecycle: acquisition, live constraints and recording.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::camera::{CameraCapabilities, CameraHints, CameraPlatform, MediaStream, TrackConstraint};
use super::file;
use super::recording::{RecordingSession, RecordingTimer};
use super::types::{CameraResult, CapturedMedia, FileError};

/// Where the acquirer is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquirerPhase {
    /// Nothing requested yet, or the last request failed
    Idle,
    /// Waiting on the permission prompt
    Requesting,
    /// Live feed available
    Streaming,
    /// Live feed being recorded
    Recording,
    /// Hardware released
    Stopped,
}

/// The single open camera and its negotiated state
struct CameraSession {
    stream: Box<dyn MediaStream>,
    capabilities: Option<CameraCapabilities>,
    zoom_value: Option<f64>,
    torch_on: bool,
}

/// Owns the camera hardware. At most one stream is open at a time and it is
/// released when the acquirer is dropped.
pub struct MediaAcquirer {
    platform: Arc<dyn CameraPlatform>,
    phase: watch::Sender<AcquirerPhase>,
    camera: Option<CameraSession>,
    recording: Option<RecordingSession>,
    last_elapsed: u64,
}

impl std::fmt::Debug for MediaAcquirer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaAcquirer")
            .field("platform", &self.platform.name())
            .field("phase", &self.phase())
            .field("capabilities", &self.capabilities())
            .field("zoom_value", &self.zoom_value())
            .field("torch_on", &self.torch_on())
            .field("recording", &self.recording)
            .finish()
    }
}

impl MediaAcquirer {
    pub fn new(platform: Arc<dyn CameraPlatform>) -> Self {
        Self {
            platform,
            phase: watch::channel(AcquirerPhase::Idle).0,
            camera: None,
            recording: None,
            last_elapsed: 0,
        }
    }

    pub fn phase(&self) -> AcquirerPhase {
        *self.phase.borrow()
    }

    /// Follow phase changes from another task, e.g. to show a loading
    /// indicator while the permission prompt is pending.
    pub fn watch_phase(&self) -> watch::Receiver<AcquirerPhase> {
        self.phase.subscribe()
    }

    fn set_phase(&self, phase: AcquirerPhase) {
        self.phase.send_replace(phase);
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.phase(), AcquirerPhase::Streaming | AcquirerPhase::Recording)
    }

    pub fn is_recording(&self) -> bool {
        self.phase() == AcquirerPhase::Recording
    }

    pub fn capabilities(&self) -> Option<&CameraCapabilities> {
        self.camera.as_ref().and_then(|c| c.capabilities.as_ref())
    }

    pub fn zoom_value(&self) -> Option<f64> {
        self.camera.as_ref().and_then(|c| c.zoom_value)
    }

    pub fn torch_on(&self) -> bool {
        self.camera.as_ref().is_some_and(|c| c.torch_on)
    }

    /// Seconds recorded so far, or the length of the last recording
    pub fn elapsed_seconds(&self) -> u64 {
        self.recording
            .as_ref()
            .map(RecordingSession::elapsed_seconds)
            .unwrap_or(self.last_elapsed)
    }

    /// Open the camera, releasing any stream that is already open.
    pub async fn start_camera(&mut self, hints: &CameraHints) -> CameraResult<()> {
        self.stop_camera();
        self.set_phase(AcquirerPhase::Requesting);
        tracing::debug!(platform = self.platform.name(), ?hints, "requesting camera");

        let stream = match self.platform.open_stream(hints).await {
            Ok(stream) => stream,
            Err(e) => {
                self.set_phase(AcquirerPhase::Idle);
                return Err(e);
            }
        };

        let capabilities = stream.capabilities();
        let zoom_value = capabilities.as_ref().and_then(|c| c.zoom).map(|z| z.min);
        tracing::debug!(?capabilities, "camera streaming");

        self.camera = Some(CameraSession {
            stream,
            capabilities,
            zoom_value,
            torch_on: false,
        });
        self.set_phase(AcquirerPhase::Streaming);
        Ok(())
    }

    /// Clamp and apply a zoom level. Returns the stored value, or `None` when
    /// the camera is not open or has no zoom.
    ///
    /// Hardware rejection is logged and otherwise ignored.
    pub async fn apply_zoom(&mut self, value: f64) -> Option<f64> {
        let camera = self.camera.as_mut()?;
        let range = camera.capabilities.as_ref()?.zoom?;
        let clamped = range.clamp(value);
        camera.zoom_value = Some(clamped);

        if let Err(e) = camera.stream.apply_constraint(TrackConstraint::Zoom(clamped)).await {
            tracing::warn!("Zoom error: {}", e);
        }
        Some(clamped)
    }

    /// Flip the torch. Returns the torch state after the attempt.
    ///
    /// The state only changes when the hardware accepts the constraint.
    pub async fn toggle_torch(&mut self) -> bool {
        let Some(camera) = self.camera.as_mut() else {
            return false;
        };
        if !camera.capabilities.as_ref().is_some_and(|c| c.supports_torch()) {
            return camera.torch_on;
        }

        let next = !camera.torch_on;
        match camera.stream.apply_constraint(TrackConstraint::Torch(next)).await {
            Ok(()) => camera.torch_on = next,
            Err(e) => tracing::warn!("Torch error: {}", e),
        }
        camera.torch_on
    }

    /// Begin recording the live stream. Outside `Streaming` this is a no-op
    /// returning `Ok(false)`.
    pub fn start_recording(&mut self) -> CameraResult<bool> {
        if self.phase() != AcquirerPhase::Streaming {
            tracing::debug!(phase = ?self.phase(), "start_recording ignored");
            return Ok(false);
        }
        let Some(camera) = self.camera.as_mut() else {
            return Ok(false);
        };

        // The timer needs a runtime; check that before the recorder exists.
        let timer = RecordingTimer::start()?;
        let recorder = camera.stream.start_recorder()?;
        self.recording = Some(RecordingSession::begin(timer, recorder));
        self.last_elapsed = 0;
        self.set_phase(AcquirerPhase::Recording);
        tracing::debug!("recording started");
        Ok(true)
    }

    /// Gather fragments produced since the last poll
    pub fn poll_recording(&mut self) {
        if let Some(recording) = self.recording.as_mut() {
            recording.collect();
        }
    }

    /// Fragments gathered so far by the running recording
    pub fn recorded_fragments(&self) -> usize {
        self.recording.as_ref().map_or(0, RecordingSession::chunk_count)
    }

    /// Stop recording and assemble the clip. `None` when not recording.
    pub fn stop_recording(&mut self) -> Option<CapturedMedia> {
        let recording = self.recording.take()?;
        self.last_elapsed = recording.elapsed_seconds();
        let media = recording.finish();
        self.set_phase(AcquirerPhase::Streaming);
        Some(media)
    }

    /// Release all hardware. Safe to call at any time, any number of times.
    pub fn stop_camera(&mut self) {
        if let Some(recording) = self.recording.take() {
            self.last_elapsed = recording.elapsed_seconds();
            recording.discard();
        }
        if let Some(mut camera) = self.camera.take() {
            camera.stream.stop();
            tracing::debug!("camera stopped");
        }
        if self.phase() != AcquirerPhase::Idle {
            self.set_phase(AcquirerPhase::Stopped);
        }
    }

    /// Accept a user-supplied file, bypassing the camera entirely.
    pub fn accept_file(&self, data: Vec<u8>, mime_type: &str) -> Result<CapturedMedia, FileError> {
        file::accept_file(data, mime_type)
    }

    /// Read and accept a file from disk.
    pub fn accept_path(&self, path: &Path) -> Result<CapturedMedia, FileError> {
        file::accept_path(path)
    }
}

impl Drop for MediaAcquirer {
    fn drop(&mut self) {
        self.stop_camera();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::camera::CameraCapabilities;
    use crate::capture::mock::{MockCamera, MockCameraConfig};
    use crate::capture::types::CameraError;
    use std::time::Duration;

    fn acquirer(camera: &MockCamera) -> MediaAcquirer {
        MediaAcquirer::new(Arc::new(camera.clone()))
    }

    #[tokio::test]
    async fn test_start_discovers_capabilities() {
        let camera = MockCamera::with_zoom_and_torch(1.0, 5.0);
        let mut acq = acquirer(&camera);
        acq.start_camera(&CameraHints::default()).await.unwrap();

        assert_eq!(acq.phase(), AcquirerPhase::Streaming);
        assert_eq!(acq.zoom_value(), Some(1.0));
        assert!(!acq.torch_on());
        assert!(acq.capabilities().is_some_and(|c| c.supports_torch()));
    }

    #[tokio::test]
    async fn test_start_failure_maps_error() {
        let camera = MockCamera::failing(CameraError::NotFound("NotFoundError".into()));
        let mut acq = acquirer(&camera);
        let err = acq.start_camera(&CameraHints::default()).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::CameraNotFound);
        assert_eq!(acq.phase(), AcquirerPhase::Idle);
        assert_eq!(camera.open_tracks(), 0);
    }

    #[tokio::test]
    async fn test_restart_releases_previous_track() {
        let camera = MockCamera::default();
        let mut acq = acquirer(&camera);
        for _ in 0..4 {
            acq.start_camera(&CameraHints::default()).await.unwrap();
            assert_eq!(camera.open_tracks(), 1);
        }
        assert_eq!(camera.max_open_tracks(), 1);
        assert_eq!(camera.streams_opened(), 4);

        acq.stop_camera();
        acq.stop_camera();
        assert_eq!(camera.open_tracks(), 0);
        assert_eq!(acq.phase(), AcquirerPhase::Stopped);
    }

    #[tokio::test]
    async fn test_drop_releases_track() {
        let camera = MockCamera::default();
        {
            let mut acq = acquirer(&camera);
            acq.start_camera(&CameraHints::default()).await.unwrap();
        }
        assert_eq!(camera.open_tracks(), 0);
    }

    #[tokio::test]
    async fn test_zoom_is_clamped() {
        let camera = MockCamera::with_zoom_and_torch(1.0, 4.0);
        let mut acq = acquirer(&camera);
        acq.start_camera(&CameraHints::default()).await.unwrap();

        assert_eq!(acq.apply_zoom(9.0).await, Some(4.0));
        assert_eq!(acq.apply_zoom(-3.0).await, Some(1.0));
        assert_eq!(acq.apply_zoom(2.5).await, Some(2.5));
        assert_eq!(acq.zoom_value(), Some(2.5));
        assert_eq!(
            camera.applied_constraints(),
            vec![
                TrackConstraint::Zoom(4.0),
                TrackConstraint::Zoom(1.0),
                TrackConstraint::Zoom(2.5)
            ]
        );
    }

    #[tokio::test]
    async fn test_zoom_without_capability_is_noop() {
        let camera = MockCamera::default();
        let mut acq = acquirer(&camera);
        assert_eq!(acq.apply_zoom(2.0).await, None);

        acq.start_camera(&CameraHints::default()).await.unwrap();
        assert_eq!(acq.apply_zoom(2.0).await, None);
        assert!(camera.applied_constraints().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_constraints_are_silent() {
        let camera = MockCamera::new(MockCameraConfig {
            capabilities: Some(CameraCapabilities::default().with_zoom(1.0, 3.0).with_torch(true)),
            reject_constraints: true,
            ..Default::default()
        });
        let mut acq = acquirer(&camera);
        acq.start_camera(&CameraHints::default()).await.unwrap();

        assert_eq!(acq.apply_zoom(2.0).await, Some(2.0));
        assert!(!acq.toggle_torch().await);
        assert_eq!(acq.phase(), AcquirerPhase::Streaming);
    }

    #[tokio::test]
    async fn test_toggle_torch() {
        let camera = MockCamera::with_zoom_and_torch(1.0, 2.0);
        let mut acq = acquirer(&camera);
        acq.start_camera(&CameraHints::default()).await.unwrap();

        assert!(acq.toggle_torch().await);
        assert!(!acq.toggle_torch().await);

        acq.toggle_torch().await;
        acq.stop_camera();
        assert!(!acq.torch_on());
    }

    #[tokio::test]
    async fn test_recording_requires_stream() {
        let camera = MockCamera::default();
        let mut acq = acquirer(&camera);
        assert!(!acq.start_recording().unwrap());
        assert!(acq.stop_recording().is_none());
        assert_eq!(acq.phase(), AcquirerPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recording_produces_webm() {
        let camera = MockCamera::default();
        let mut acq = acquirer(&camera);
        acq.start_camera(&CameraHints::default()).await.unwrap();

        assert!(acq.start_recording().unwrap());
        assert!(acq.is_recording());
        // Second start while recording is ignored.
        assert!(!acq.start_recording().unwrap());

        tokio::time::sleep(Duration::from_millis(2100)).await;
        acq.poll_recording();
        assert_eq!(acq.elapsed_seconds(), 2);

        let media = acq.stop_recording().unwrap();
        assert_eq!(media.mime_type, "video/webm");
        assert!(!media.is_empty());
        assert_eq!(acq.phase(), AcquirerPhase::Streaming);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(acq.elapsed_seconds(), 2);

        acq.start_recording().unwrap();
        assert_eq!(acq.elapsed_seconds(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_camera_cancels_recording() {
        let camera = MockCamera::default();
        let mut acq = acquirer(&camera);
        acq.start_camera(&CameraHints::default()).await.unwrap();
        acq.start_recording().unwrap();

        acq.stop_camera();
        assert!(!acq.is_recording());
        assert!(acq.stop_recording().is_none());
        assert_eq!(camera.open_tracks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_gathers_fragments_while_recording() {
        let camera = MockCamera::default();
        let mut acq = acquirer(&camera);
        acq.start_camera(&CameraHints::default()).await.unwrap();
        acq.start_recording().unwrap();

        for second in 1..=3 {
            tokio::time::sleep(Duration::from_secs(1)).await;
            acq.poll_recording();
            assert_eq!(acq.recorded_fragments(), second);
        }
        let short = acq.stop_recording().unwrap();
        assert_eq!(acq.recorded_fragments(), 0);

        acq.start_recording().unwrap();
        tokio::time::sleep(Duration::from_secs(9)).await;
        acq.poll_recording();
        let long = acq.stop_recording().unwrap();
        assert!(long.len() > short.len());
    }

    #[tokio::test]
    async fn test_requesting_is_observable_during_prompt() {
        let camera = MockCamera::new(MockCameraConfig {
            hold_permission: true,
            ..Default::default()
        });
        let mut acq = acquirer(&camera);
        let mut phases = acq.watch_phase();
        assert_eq!(*phases.borrow(), AcquirerPhase::Idle);

        let observer = async {
            phases
                .wait_for(|phase| *phase == AcquirerPhase::Requesting)
                .await
                .unwrap();
            camera.grant_permission();
        };
        let hints = CameraHints::default();
        let (started, ()) = tokio::join!(acq.start_camera(&hints), observer);
        started.unwrap();

        assert_eq!(acq.phase(), AcquirerPhase::Streaming);
        assert_eq!(*acq.watch_phase().borrow(), AcquirerPhase::Streaming);
    }

    #[test]
    fn test_recording_without_runtime_starts_no_recorder() {
        let camera = MockCamera::default();
        let mut acq = acquirer(&camera);
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(acq.start_camera(&CameraHints::default())).unwrap();

        let err = acq.start_recording().unwrap_err();
        assert!(matches!(err, CameraError::Platform(_)));
        assert_eq!(camera.active_recorders(), 0);
        assert_eq!(acq.phase(), AcquirerPhase::Streaming);
        assert!(!acq.is_recording());
    }

    #[test]
    fn test_accept_file_bypasses_camera() {
        let camera = MockCamera::default();
        let acq = acquirer(&camera);
        let media = acq.accept_file(vec![1, 2], "image/png").unwrap();
        assert_eq!(media.mime_type, "image/png");
        assert_eq!(camera.streams_opened(), 0);
        assert!(acq.accept_file(vec![1], "application/pdf").is_err());
    }
}
