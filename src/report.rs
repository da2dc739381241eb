//! Types for inspection run results and their text rendering.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisResult, RiskLevel};
use crate::capture::{CapturedMedia, MediaKind};
use crate::error::SessionError;
use crate::session::AnalysisState;

/// What was analyzed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSummary {
    pub mime_type: String,
    pub kind: MediaKind,
    pub bytes: usize,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub captured_at: DateTime<Utc>,
}

impl From<&CapturedMedia> for MediaSummary {
    fn from(media: &CapturedMedia) -> Self {
        Self {
            mime_type: media.mime_type.clone(),
            kind: media.kind(),
            bytes: media.len(),
            captured_at: media.captured_at,
        }
    }
}

/// Result of a complete inspection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionReport {
    /// Whether the analysis produced a report
    pub success: bool,

    /// Media sent for analysis (None if nothing was captured)
    pub media: Option<MediaSummary>,

    /// Structured report on success
    pub result: Option<AnalysisResult>,

    /// Error shown to the user on failure
    pub error: Option<SessionError>,

    #[serde(with = "chrono::serde::ts_seconds")]
    pub generated_at: DateTime<Utc>,
}

impl InspectionReport {
    /// Snapshot a session's media and analysis state.
    pub fn from_state(media: Option<&CapturedMedia>, analysis: &AnalysisState) -> Self {
        Self {
            success: analysis.result().is_some(),
            media: media.map(MediaSummary::from),
            result: analysis.result().cloned(),
            error: analysis.error().cloned(),
            generated_at: Utc::now(),
        }
    }
}

fn risk_marker(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => "[!!!]",
        RiskLevel::Medium => "[!! ]",
        RiskLevel::Low => "[!  ]",
    }
}

/// Render a report as plain text: summary, severity counts, then one card
/// per hazard in provider order.
pub fn render_text(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "الملخص العام:");
    let _ = writeln!(out, "  {}", result.overall_summary);
    let _ = writeln!(out);

    if result.hazards.is_empty() {
        let _ = writeln!(out, "لم يتم رصد أي مخاطر.");
        return out;
    }

    let _ = writeln!(
        out,
        "المخاطر: {} (عالي: {}, متوسط: {}, منخفض: {})",
        result.hazards.len(),
        result.count_at(RiskLevel::High),
        result.count_at(RiskLevel::Medium),
        result.count_at(RiskLevel::Low),
    );

    for (i, hazard) in result.hazards.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} {}. {}",
            risk_marker(hazard.risk_level),
            i + 1,
            hazard.title
        );
        let _ = writeln!(
            out,
            "    الخطورة: {} | التصنيف: {}",
            hazard.risk_level.label(),
            hazard.category.label()
        );
        let _ = writeln!(out, "    {}", hazard.description);
        if !hazard.mitigation.is_empty() {
            let _ = writeln!(out, "    خطوات المعالجة:");
            for step in &hazard.mitigation {
                let _ = writeln!(out, "      - {}", step);
            }
        }
    }
    out
}

/// Render an error banner with its technical cause, if any.
pub fn render_error(error: &SessionError) -> String {
    match &error.detail {
        Some(detail) => format!("{} ({})\n  {}", error.message, error.kind, detail),
        None => format!("{} ({})", error.message, error.kind),
    }
}
