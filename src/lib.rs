//! SafeVision - workplace hazard inspection with a hosted vision model.
//!
//! This crate provides:
//! - Media acquisition from files or a live camera with zoom, torch and recording
//! - MockCamera for testing without hardware
//! - A credential gate that blocks analysis until an API key is selected
//! - Gemini integration returning a structured HSE hazard report
//! - An inspection session tying capture, analysis and errors together
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use safevision::analysis::{GeminiClient, GeminiConfig};
//! use safevision::capture::{MediaAcquirer, MockCamera};
//! use safevision::credential::{CredentialGate, EnvKeyChooser};
//! use safevision::session::InspectionSession;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let gate = CredentialGate::init(Arc::new(EnvKeyChooser)).await;
//! let client = GeminiClient::new(GeminiConfig::default())?;
//! let acquirer = MediaAcquirer::new(Arc::new(MockCamera::default()));
//! let mut session = InspectionSession::new(gate, acquirer, Arc::new(client));
//!
//! session.accept_path(std::path::Path::new("site.jpg"))?;
//! session.analyze().await?;
//! if let Some(result) = session.analysis().result() {
//!     println!("{}", safevision::report::render_text(result));
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod capture;
pub mod config;
pub mod credential;
pub mod error;
pub mod report;
pub mod session;

// Re-export analysis types
pub use analysis::{
    AnalysisError, AnalysisOutcome, AnalysisResult, GeminiClient, GeminiConfig, Hazard,
    HazardAnalyzer, HazardCategory, RiskLevel,
};

// Re-export capture types and platforms
pub use capture::{
    CameraError, CameraHints, CameraPlatform, CaptureMode, CapturedMedia, FileError,
    MediaAcquirer, MockCamera,
};

// Re-export the credential gate
pub use credential::{CredentialGate, CredentialRequired, EnvKeyChooser, KeyChooser};

pub use error::{ErrorKind, SessionError};
pub use report::{InspectionReport, render_text};
pub use session::{AnalysisState, InspectionSession, SessionPhase};
