//! Inspection session lifecycle.
//!
//! - [`state`]: What the analysis area shows and the derived phase
//! - [`machine`]: The session itself, driving capture and analysis

pub mod machine;
pub mod state;

pub use machine::InspectionSession;
pub use state::{AnalysisState, SessionPhase};
