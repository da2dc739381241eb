//! Recording sessions and the duration counter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

use super::camera::MediaRecorder;
use super::types::{CameraError, CameraResult, CapturedMedia, MediaSource};
use crate::config::RECORDING_MIME_TYPE;

const TICK: Duration = Duration::from_secs(1);

/// Counts whole seconds on a background interval task.
///
/// The task is aborted by [`cancel`](Self::cancel) or when the timer is dropped.
#[derive(Debug)]
pub struct RecordingTimer {
    elapsed: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl RecordingTimer {
    /// Start counting from zero. Requires a tokio runtime.
    pub fn start() -> CameraResult<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CameraError::Platform(format!("recording timer needs a runtime: {}", e)))?;

        let elapsed = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&elapsed);
        let handle = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            loop {
                ticker.tick().await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        Ok(Self {
            elapsed,
            handle: Some(handle),
        })
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop counting. The elapsed value is kept. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for RecordingTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// State that exists only between start-recording and stop-recording
pub struct RecordingSession {
    recorder: Box<dyn MediaRecorder>,
    chunks: Vec<Vec<u8>>,
    timer: RecordingTimer,
}

impl std::fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSession")
            .field("chunks", &self.chunks.len())
            .field("elapsed_seconds", &self.timer.elapsed_seconds())
            .finish()
    }
}

impl RecordingSession {
    /// Pair a started recorder with its duration counter.
    pub fn begin(timer: RecordingTimer, recorder: Box<dyn MediaRecorder>) -> Self {
        Self {
            recorder,
            chunks: Vec::new(),
            timer,
        }
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.timer.elapsed_seconds()
    }

    /// Pull any fragments the recorder has produced so far
    pub fn collect(&mut self) {
        let fresh = self.recorder.take_chunks();
        self.chunks.extend(fresh);
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Stop the recorder and the timer, concatenating every fragment in order.
    pub fn finish(mut self) -> CapturedMedia {
        self.timer.cancel();
        self.collect();
        let tail = self.recorder.stop();
        self.chunks.extend(tail);

        let data = self.chunks.concat();
        tracing::debug!(
            bytes = data.len(),
            fragments = self.chunks.len(),
            seconds = self.timer.elapsed_seconds(),
            "recording finished"
        );
        CapturedMedia::new(data, RECORDING_MIME_TYPE, MediaSource::Recording)
    }

    /// Stop without producing media
    pub fn discard(mut self) {
        self.timer.cancel();
        let _ = self.recorder.stop();
    }
}

/// Format a duration as `MM:SS` for the recording badge
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
