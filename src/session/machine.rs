//! The inspection session: one capture, one analysis, one result at a time.
//!
//! Transitions:
//! - `NoMedia → MediaCaptured` on a finished recording or an accepted file
//! - `MediaCaptured → Analyzing` on [`InspectionSession::analyze`]
//! - `Analyzing → Result | Error` when the provider answers
//! - any phase `→ NoMedia` on [`InspectionSession::reset`] or a mode switch
//!
//! Every action that captures or analyzes first passes the credential gate.
//! While the gate is unsatisfied the action returns [`CredentialRequired`]
//! and the session does not change.

use std::path::Path;
use std::sync::Arc;

use super::state::{AnalysisState, SessionPhase};
use crate::analysis::HazardAnalyzer;
use crate::capture::{
    CameraHints, CaptureMode, CapturedMedia, MediaAcquirer, format_elapsed,
};
use crate::credential::{CredentialGate, CredentialRequired};
use crate::error::{ErrorKind, SessionError};

type Gated<T = ()> = Result<T, CredentialRequired>;

/// Owns the capture hardware, the captured media and the analysis state.
pub struct InspectionSession {
    gate: CredentialGate,
    acquirer: MediaAcquirer,
    analyzer: Arc<dyn HazardAnalyzer>,
    hints: CameraHints,
    mode: CaptureMode,
    media: Option<CapturedMedia>,
    analysis: AnalysisState,
    started: bool,
}

impl std::fmt::Debug for InspectionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InspectionSession")
            .field("gate", &self.gate)
            .field("acquirer", &self.acquirer)
            .field("mode", &self.mode)
            .field("media", &self.media)
            .field("analysis", &self.analysis)
            .field("started", &self.started)
            .finish()
    }
}

impl InspectionSession {
    pub fn new(
        gate: CredentialGate,
        acquirer: MediaAcquirer,
        analyzer: Arc<dyn HazardAnalyzer>,
    ) -> Self {
        Self {
            gate,
            acquirer,
            analyzer,
            hints: CameraHints::default(),
            mode: CaptureMode::default(),
            media: None,
            analysis: AnalysisState::Idle,
            started: false,
        }
    }

    /// Override the camera hints used by [`start_camera`](Self::start_camera)
    pub fn with_hints(mut self, hints: CameraHints) -> Self {
        self.hints = hints;
        self
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::derive(self.media.is_some(), &self.analysis)
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn media(&self) -> Option<&CapturedMedia> {
        self.media.as_ref()
    }

    pub fn analysis(&self) -> &AnalysisState {
        &self.analysis
    }

    pub fn acquirer(&self) -> &MediaAcquirer {
        &self.acquirer
    }

    pub fn gate(&self) -> &CredentialGate {
        &self.gate
    }

    /// False on the landing screen
    pub fn started(&self) -> bool {
        self.started
    }

    /// Analysis is offered only with media and nothing loading or shown
    pub fn can_analyze(&self) -> bool {
        self.media.is_some() && !self.analysis.loading() && self.analysis.result().is_none()
    }

    /// Recording badge text, e.g. `00:07`
    pub fn recording_badge(&self) -> Option<String> {
        self.acquirer
            .is_recording()
            .then(|| format_elapsed(self.acquirer.elapsed_seconds()))
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Return to `NoMedia` from any phase and go back to the landing state.
    pub fn reset(&mut self) {
        self.acquirer.stop_camera();
        self.media = None;
        self.analysis = AnalysisState::Idle;
        self.started = false;
        tracing::debug!("session reset");
    }

    /// Switch between image and video capture.
    ///
    /// Always resets first, so no media survives a mode change. Entering
    /// video mode opens the live camera.
    pub async fn switch_mode(&mut self, mode: CaptureMode) -> Gated {
        self.gate.ensure_satisfied()?;
        self.reset();
        self.mode = mode;
        self.started = true;
        tracing::debug!(?mode, "mode switched");
        if mode == CaptureMode::Video {
            self.start_camera().await?;
        }
        Ok(())
    }

    /// Open the live camera. Ignored while media is held, since captured
    /// media takes precedence over the live feed.
    pub async fn start_camera(&mut self) -> Gated {
        self.gate.ensure_satisfied()?;
        if self.media.is_some() {
            return Ok(());
        }
        if self.analysis.error().is_some() {
            self.analysis = AnalysisState::Idle;
        }
        if let Err(e) = self.acquirer.start_camera(&self.hints).await {
            tracing::warn!("camera start failed: {}", e);
            self.analysis = AnalysisState::Failed(SessionError::new(e.kind()).with_detail(e.to_string()));
        }
        Ok(())
    }

    pub fn stop_camera(&mut self) {
        self.acquirer.stop_camera();
    }

    pub async fn apply_zoom(&mut self, value: f64) -> Gated<Option<f64>> {
        self.gate.ensure_satisfied()?;
        Ok(self.acquirer.apply_zoom(value).await)
    }

    pub async fn toggle_torch(&mut self) -> Gated<bool> {
        self.gate.ensure_satisfied()?;
        Ok(self.acquirer.toggle_torch().await)
    }

    /// Start recording the live feed. Returns whether recording began.
    pub fn start_recording(&mut self) -> Gated<bool> {
        self.gate.ensure_satisfied()?;
        match self.acquirer.start_recording() {
            Ok(started) => Ok(started),
            Err(e) => {
                self.analysis = AnalysisState::Failed(
                    SessionError::new(e.kind()).with_detail(e.to_string()),
                );
                Ok(false)
            }
        }
    }

    /// Gather the fragments recorded since the last call. Call it
    /// periodically while recording.
    pub fn poll_recording(&mut self) {
        self.acquirer.poll_recording();
    }

    /// Stop recording and keep the clip as the session's media.
    pub fn stop_recording(&mut self) -> Gated<bool> {
        self.gate.ensure_satisfied()?;
        match self.acquirer.stop_recording() {
            Some(media) => {
                self.set_media(media);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Accept file contents. On a format error the current media is kept.
    pub fn accept_file(&mut self, data: Vec<u8>, mime_type: &str) -> Gated {
        self.gate.ensure_satisfied()?;
        let accepted = self.acquirer.accept_file(data, mime_type);
        self.apply_file_outcome(accepted);
        Ok(())
    }

    /// Read a file from disk and accept it.
    pub fn accept_path(&mut self, path: &Path) -> Gated {
        self.gate.ensure_satisfied()?;
        let accepted = self.acquirer.accept_path(path);
        self.apply_file_outcome(accepted);
        Ok(())
    }

    fn apply_file_outcome(&mut self, accepted: Result<CapturedMedia, crate::capture::FileError>) {
        match accepted {
            Ok(media) => self.set_media(media),
            Err(e) => {
                tracing::warn!("file rejected: {}", e);
                self.analysis =
                    AnalysisState::Failed(SessionError::new(e.kind()).with_detail(e.to_string()));
            }
        }
    }

    fn set_media(&mut self, media: CapturedMedia) {
        self.acquirer.stop_camera();
        tracing::debug!(?media, "media captured");
        self.media = Some(media);
        self.analysis = AnalysisState::Idle;
        self.started = true;
    }

    /// Send the captured media for analysis and wait for the answer.
    ///
    /// Without media, or while a request is already in flight, this does
    /// nothing. The media is kept whatever the outcome.
    pub async fn analyze(&mut self) -> Gated {
        self.gate.ensure_satisfied()?;
        if self.analysis.loading() {
            return Ok(());
        }
        let Some(media) = self.media.as_ref() else {
            tracing::debug!("analyze ignored: no media");
            return Ok(());
        };

        self.analysis = AnalysisState::Loading;
        self.analysis = match self.analyzer.analyze(media).await {
            Ok(result) => {
                tracing::debug!(hazards = result.hazards.len(), "analysis complete");
                AnalysisState::Ready(result)
            }
            Err(e) => {
                let kind = e.kind();
                if kind == ErrorKind::EntityNotFound {
                    self.gate.revoke();
                }
                AnalysisState::Failed(SessionError::new(kind).with_detail(e.to_string()))
            }
        };
        Ok(())
    }

    /// Retry after an error: restart the camera for camera errors, otherwise
    /// re-run the analysis.
    pub async fn retry(&mut self) -> Gated {
        let Some(camera_related) = self.analysis.error().map(SessionError::is_camera_related) else {
            return Ok(());
        };
        if camera_related {
            self.start_camera().await
        } else {
            self.analyze().await
        }
    }

    /// Hide the error banner, keeping the media.
    pub fn dismiss_error(&mut self) {
        if self.analysis.error().is_some() {
            self.analysis = AnalysisState::Idle;
        }
    }
}
