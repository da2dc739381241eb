//! Display state of an inspection session.

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;
use crate::error::SessionError;

/// What the analysis area shows. Loading, error and result are mutually
/// exclusive by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum AnalysisState {
    /// Nothing to show
    #[default]
    Idle,
    /// A request is in flight
    Loading,
    /// The last action failed
    Failed(SessionError),
    /// The last analysis succeeded
    Ready(AnalysisResult),
}

impl AnalysisState {
    pub fn loading(&self) -> bool {
        matches!(self, AnalysisState::Loading)
    }

    pub fn error(&self) -> Option<&SessionError> {
        match self {
            AnalysisState::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            AnalysisState::Ready(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, AnalysisState::Idle)
    }
}

/// Lifecycle phase derived from media presence and analysis state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    NoMedia,
    MediaCaptured,
    Analyzing,
    Result,
    Error,
}

impl SessionPhase {
    pub fn derive(has_media: bool, analysis: &AnalysisState) -> Self {
        match analysis {
            AnalysisState::Loading => SessionPhase::Analyzing,
            AnalysisState::Ready(_) => SessionPhase::Result,
            AnalysisState::Failed(_) => SessionPhase::Error,
            AnalysisState::Idle if has_media => SessionPhase::MediaCaptured,
            AnalysisState::Idle => SessionPhase::NoMedia,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn set_count(state: &AnalysisState) -> usize {
        usize::from(state.loading())
            + usize::from(state.error().is_some())
            + usize::from(state.result().is_some())
    }

    #[test]
    fn test_at_most_one_display_state() {
        let states = [
            AnalysisState::Idle,
            AnalysisState::Loading,
            AnalysisState::Failed(SessionError::new(ErrorKind::AiFailed)),
            AnalysisState::Ready(AnalysisResult {
                overall_summary: "ok".into(),
                hazards: vec![],
            }),
        ];
        for state in &states {
            assert!(set_count(state) <= 1, "{:?}", state);
        }
        assert_eq!(set_count(&AnalysisState::Idle), 0);
    }

    #[test]
    fn test_phase_derivation() {
        assert_eq!(SessionPhase::derive(false, &AnalysisState::Idle), SessionPhase::NoMedia);
        assert_eq!(SessionPhase::derive(true, &AnalysisState::Idle), SessionPhase::MediaCaptured);
        assert_eq!(SessionPhase::derive(true, &AnalysisState::Loading), SessionPhase::Analyzing);
        assert_eq!(
            SessionPhase::derive(false, &AnalysisState::Failed(ErrorKind::CameraDenied.into())),
            SessionPhase::Error
        );
    }

    #[test]
    fn test_state_serializes_tagged() {
        let json = serde_json::to_value(AnalysisState::Loading).unwrap();
        assert_eq!(json["state"], "loading");
    }
}
