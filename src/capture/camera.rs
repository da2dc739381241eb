//! Camera platform abstraction.
//!
//! Capture hardware is reached through three traits:
//! - [`CameraPlatform`] opens a combined video+audio stream
//! - [`MediaStream`] exposes capabilities, live constraints and recording
//! - [`MediaRecorder`] accumulates encoded fragments until stopped
//!
//! Zoom and torch are non-standard capabilities. They are modelled as
//! optional fields and every caller checks for presence.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::CameraResult;
use crate::config;

/// Preferred camera direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Rear camera, pointed at the site
    #[default]
    Environment,
    /// Front camera
    User,
}

/// Ideal stream parameters. The platform may pick something else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraHints {
    pub facing: Facing,
    pub width: u32,
    pub height: u32,
    /// Record audio alongside video
    pub audio: bool,
}

impl Default for CameraHints {
    fn default() -> Self {
        let cfg = config::get();
        Self {
            facing: Facing::Environment,
            width: cfg.camera.width,
            height: cfg.camera.height,
            audio: true,
        }
    }
}

impl CameraHints {
    pub fn facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }

    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Supported zoom interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
    /// Slider granularity, when the track reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

impl ZoomRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            step: None,
        }
    }

    /// Clamp `value` into `[min, max]`. NaN maps to `min`.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.max(self.min).min(self.max)
    }
}

/// Optional track capabilities discovered after the stream opens
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<ZoomRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torch: Option<bool>,
}

impl CameraCapabilities {
    pub fn with_zoom(mut self, min: f64, max: f64) -> Self {
        self.zoom = Some(ZoomRange::new(min, max));
        self
    }

    pub fn with_torch(mut self, torch: bool) -> Self {
        self.torch = Some(torch);
        self
    }

    pub fn supports_torch(&self) -> bool {
        self.torch.unwrap_or(false)
    }
}

/// A single advanced constraint applied to a live track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackConstraint {
    Zoom(f64),
    Torch(bool),
}

/// Opens capture streams
#[async_trait]
pub trait CameraPlatform: Send + Sync {
    /// Request a video+audio stream. Suspends while the permission prompt is shown.
    async fn open_stream(&self, hints: &CameraHints) -> CameraResult<Box<dyn MediaStream>>;

    /// Platform identifier (e.g., "mock", "v4l2")
    fn name(&self) -> &str;
}

/// An open hardware stream. Holds the video track exclusively.
#[async_trait]
pub trait MediaStream: Send {
    /// Capabilities of the video track, if the platform exposes any
    fn capabilities(&self) -> Option<CameraCapabilities>;

    /// Apply a live constraint to the video track
    async fn apply_constraint(&mut self, constraint: TrackConstraint) -> CameraResult<()>;

    /// Begin encoding the stream
    fn start_recorder(&mut self) -> CameraResult<Box<dyn MediaRecorder>>;

    /// Release every track of the stream. Must be idempotent.
    fn stop(&mut self);

    /// Whether the tracks are still open
    fn is_live(&self) -> bool;
}

/// Encodes a live stream into fragments
pub trait MediaRecorder: Send {
    /// Fragments produced since the last call
    fn take_chunks(&mut self) -> Vec<Vec<u8>>;

    /// Stop encoding and flush the remaining fragments
    fn stop(&mut self) -> Vec<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_clamp() {
        let range = ZoomRange::new(1.0, 4.0);
        assert_eq!(range.clamp(0.2), 1.0);
        assert_eq!(range.clamp(2.5), 2.5);
        assert_eq!(range.clamp(10.0), 4.0);
        assert_eq!(range.clamp(f64::NAN), 1.0);
        assert_eq!(range.clamp(f64::INFINITY), 4.0);
    }

    #[test]
    fn test_capabilities_absent_by_default() {
        let caps = CameraCapabilities::default();
        assert!(caps.zoom.is_none());
        assert!(!caps.supports_torch());
        assert!(CameraCapabilities::default().with_torch(true).supports_torch());
    }

    #[test]
    fn test_capabilities_parse_partial_json() {
        let caps: CameraCapabilities =
            serde_json::from_str(r#"{"zoom":{"min":1.0,"max":8.0,"step":0.1}}"#).unwrap();
        assert_eq!(caps.zoom.map(|z| z.max), Some(8.0));
        assert!(caps.torch.is_none());
    }

    #[test]
    fn test_hints_builder() {
        let hints = CameraHints::default().facing(Facing::User).resolution(640, 480);
        assert_eq!(hints.facing, Facing::User);
        assert_eq!((hints.width, hints.height), (640, 480));
        assert!(hints.audio);
    }
}
