//! A virtual camera for testing and demos.
//!
//! [`MockCamera`] behaves like a real platform: it can refuse permission,
//! report optional capabilities, reject constraints, and record frames.
//! Frames are solid-colour PNG images drawn with the `image` crate.
//! Every clone shares the same bookkeeping so tests can observe how many
//! tracks are open at any moment.

use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageBuffer, Rgb, RgbImage};
use tokio::sync::Notify;
use tokio::time::Instant;

use super::camera::{
    CameraCapabilities, CameraHints, CameraPlatform, MediaRecorder, MediaStream, TrackConstraint,
};
use super::types::{CameraError, CameraResult};

/// Behaviour of a [`MockCamera`]
#[derive(Debug, Clone)]
pub struct MockCameraConfig {
    /// Capabilities reported by the video track
    pub capabilities: Option<CameraCapabilities>,
    /// Error returned by `open_stream` instead of a stream
    pub failure: Option<CameraError>,
    /// Reject every live constraint
    pub reject_constraints: bool,
    /// Keep `open_stream` pending until [`MockCamera::grant_permission`]
    pub hold_permission: bool,
    /// Frame size in pixels
    pub frame_width: u32,
    pub frame_height: u32,
    /// Frame fill colour
    pub color: [u8; 3],
}

impl Default for MockCameraConfig {
    fn default() -> Self {
        Self {
            capabilities: None,
            failure: None,
            reject_constraints: false,
            hold_permission: false,
            frame_width: 64,
            frame_height: 36,
            color: [50, 50, 50],
        }
    }
}

#[derive(Debug, Default)]
struct MockCameraState {
    open_tracks: usize,
    max_open_tracks: usize,
    streams_opened: usize,
    active_recorders: usize,
    constraints: Vec<TrackConstraint>,
    last_hints: Option<CameraHints>,
}

/// Virtual camera platform
#[derive(Debug, Clone, Default)]
pub struct MockCamera {
    config: MockCameraConfig,
    state: Arc<Mutex<MockCameraState>>,
    prompt: Arc<Notify>,
}

impl MockCamera {
    pub fn new(config: MockCameraConfig) -> Self {
        Self {
            config,
            state: Arc::default(),
            prompt: Arc::default(),
        }
    }

    /// Camera exposing zoom in `[min, max]` and a torch
    pub fn with_zoom_and_torch(min: f64, max: f64) -> Self {
        Self::new(MockCameraConfig {
            capabilities: Some(CameraCapabilities::default().with_zoom(min, max).with_torch(true)),
            ..Default::default()
        })
    }

    /// Camera whose permission request always fails
    pub fn failing(error: CameraError) -> Self {
        Self::new(MockCameraConfig {
            failure: Some(error),
            ..Default::default()
        })
    }

    /// Tracks currently open
    pub fn open_tracks(&self) -> usize {
        self.lock().open_tracks
    }

    /// Highest number of simultaneously open tracks ever observed
    pub fn max_open_tracks(&self) -> usize {
        self.lock().max_open_tracks
    }

    /// Streams successfully opened so far
    pub fn streams_opened(&self) -> usize {
        self.lock().streams_opened
    }

    /// Recorders started and not yet stopped
    pub fn active_recorders(&self) -> usize {
        self.lock().active_recorders
    }

    /// Answer the pending permission prompt of a camera built with
    /// `hold_permission`. A grant given before the prompt opens is kept.
    pub fn grant_permission(&self) {
        self.prompt.notify_one();
    }

    /// Constraints the hardware accepted, in order
    pub fn applied_constraints(&self) -> Vec<TrackConstraint> {
        self.lock().constraints.clone()
    }

    /// Hints passed to the most recent `open_stream`
    pub fn last_hints(&self) -> Option<CameraHints> {
        self.lock().last_hints.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockCameraState> {
        lock_state(&self.state)
    }

    fn render_frame(&self) -> CameraResult<Vec<u8>> {
        let img: RgbImage = ImageBuffer::from_pixel(
            self.config.frame_width.max(1),
            self.config.frame_height.max(1),
            Rgb(self.config.color),
        );
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| CameraError::Platform(format!("Failed to encode frame: {}", e)))?;
        Ok(bytes)
    }
}

fn lock_state(state: &Mutex<MockCameraState>) -> MutexGuard<'_, MockCameraState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl CameraPlatform for MockCamera {
    async fn open_stream(&self, hints: &CameraHints) -> CameraResult<Box<dyn MediaStream>> {
        self.lock().last_hints = Some(hints.clone());
        if self.config.hold_permission {
            self.prompt.notified().await;
        }
        if let Some(err) = &self.config.failure {
            return Err(err.clone());
        }

        let frame = self.render_frame()?;
        {
            let mut state = self.lock();
            state.open_tracks += 1;
            state.streams_opened += 1;
            state.max_open_tracks = state.max_open_tracks.max(state.open_tracks);
        }

        Ok(Box::new(MockStream {
            state: Arc::clone(&self.state),
            capabilities: self.config.capabilities.clone(),
            reject_constraints: self.config.reject_constraints,
            frame,
            live: true,
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct MockStream {
    state: Arc<Mutex<MockCameraState>>,
    capabilities: Option<CameraCapabilities>,
    reject_constraints: bool,
    frame: Vec<u8>,
    live: bool,
}

#[async_trait]
impl MediaStream for MockStream {
    fn capabilities(&self) -> Option<CameraCapabilities> {
        self.capabilities.clone()
    }

    async fn apply_constraint(&mut self, constraint: TrackConstraint) -> CameraResult<()> {
        if !self.live {
            return Err(CameraError::Constraint("track ended".into()));
        }
        if self.reject_constraints {
            return Err(CameraError::Constraint(format!("{:?} not supported", constraint)));
        }
        lock_state(&self.state).constraints.push(constraint);
        Ok(())
    }

    fn start_recorder(&mut self) -> CameraResult<Box<dyn MediaRecorder>> {
        if !self.live {
            return Err(CameraError::Platform("stream is not live".into()));
        }
        lock_state(&self.state).active_recorders += 1;
        Ok(Box::new(MockRecorder {
            state: Arc::clone(&self.state),
            frame: self.frame.clone(),
            started: Instant::now(),
            emitted: 0,
            stopped: false,
        }))
    }

    fn stop(&mut self) {
        if self.live {
            self.live = false;
            let mut state = lock_state(&self.state);
            state.open_tracks = state.open_tracks.saturating_sub(1);
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fragment length, like a recorder started with a one-second timeslice
const TIMESLICE: Duration = Duration::from_secs(1);

/// Emits one frame per elapsed timeslice, plus a final partial one on stop.
///
/// Dropping without `stop` leaves the recorder counted as active.
struct MockRecorder {
    state: Arc<Mutex<MockCameraState>>,
    frame: Vec<u8>,
    started: Instant,
    emitted: u64,
    stopped: bool,
}

impl MockRecorder {
    fn due_frames(&mut self) -> Vec<Vec<u8>> {
        let due = (self.started.elapsed().as_millis() / TIMESLICE.as_millis()) as u64;
        let fresh = due.saturating_sub(self.emitted);
        self.emitted = self.emitted.max(due);
        (0..fresh).map(|_| self.frame.clone()).collect()
    }
}

impl MediaRecorder for MockRecorder {
    fn take_chunks(&mut self) -> Vec<Vec<u8>> {
        if self.stopped {
            return Vec::new();
        }
        self.due_frames()
    }

    fn stop(&mut self) -> Vec<Vec<u8>> {
        if self.stopped {
            return Vec::new();
        }
        self.stopped = true;
        {
            let mut state = lock_state(&self.state);
            state.active_recorders = state.active_recorders.saturating_sub(1);
        }
        let mut frames = self.due_frames();
        frames.push(self.frame.clone());
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_and_stop_tracks() {
        let camera = MockCamera::default();
        let mut stream = camera.open_stream(&CameraHints::default()).await.unwrap();
        assert_eq!(camera.open_tracks(), 1);
        assert!(stream.is_live());

        stream.stop();
        stream.stop();
        assert_eq!(camera.open_tracks(), 0);
        assert!(!stream.is_live());
    }

    #[tokio::test]
    async fn test_dropping_stream_releases_track() {
        let camera = MockCamera::default();
        let stream = camera.open_stream(&CameraHints::default()).await.unwrap();
        drop(stream);
        assert_eq!(camera.open_tracks(), 0);
    }

    #[tokio::test]
    async fn test_failing_camera() {
        let camera = MockCamera::failing(CameraError::Denied("NotAllowedError".into()));
        let result = camera.open_stream(&CameraHints::default()).await;
        assert!(matches!(result, Err(CameraError::Denied(_))));
        assert_eq!(camera.open_tracks(), 0);
        assert!(camera.last_hints().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recorder_emits_frame_per_timeslice() {
        let camera = MockCamera::default();
        let mut stream = camera.open_stream(&CameraHints::default()).await.unwrap();
        let mut recorder = stream.start_recorder().unwrap();
        assert_eq!(camera.active_recorders(), 1);
        assert!(recorder.take_chunks().is_empty());

        tokio::time::advance(Duration::from_millis(2500)).await;
        let chunks = recorder.take_chunks();
        assert_eq!(chunks.len(), 2);
        assert_eq!(&chunks[0][0..4], &[0x89, 0x50, 0x4E, 0x47]);
        assert!(recorder.take_chunks().is_empty());

        tokio::time::advance(Duration::from_secs(1)).await;
        // One due timeslice plus the final partial fragment.
        assert_eq!(recorder.stop().len(), 2);
        assert_eq!(camera.active_recorders(), 0);
        assert!(recorder.stop().is_empty());
        assert!(recorder.take_chunks().is_empty());
    }

    #[tokio::test]
    async fn test_held_permission_waits_for_grant() {
        let camera = MockCamera::new(MockCameraConfig {
            hold_permission: true,
            ..Default::default()
        });
        camera.grant_permission();
        let stream = camera.open_stream(&CameraHints::default()).await.unwrap();
        assert!(stream.is_live());
        assert_eq!(camera.streams_opened(), 1);
    }

    #[tokio::test]
    async fn test_rejected_constraints_are_not_recorded() {
        let camera = MockCamera::new(MockCameraConfig {
            reject_constraints: true,
            ..Default::default()
        });
        let mut stream = camera.open_stream(&CameraHints::default()).await.unwrap();
        assert!(stream.apply_constraint(TrackConstraint::Torch(true)).await.is_err());
        assert!(camera.applied_constraints().is_empty());
    }
}
