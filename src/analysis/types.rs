//! Hazard report types and analysis errors.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::error::ErrorKind;

/// Severity of a hazard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    /// Label used by the provider and the Arabic interface
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::High => "عالي",
            RiskLevel::Medium => "متوسط",
            RiskLevel::Low => "منخفض",
        }
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "عالي" | "عالية" | "high" => Ok(RiskLevel::High),
            "متوسط" | "متوسطة" | "medium" => Ok(RiskLevel::Medium),
            "منخفض" | "منخفضة" | "low" => Ok(RiskLevel::Low),
            other => Err(format!("unknown risk level '{}'", other)),
        }
    }
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Hazard classification. Unrecognized labels fall into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardCategory {
    /// Personal protective equipment
    Ppe,
    Environmental,
    Structural,
    Electrical,
    Other,
}

impl HazardCategory {
    pub fn label(self) -> &'static str {
        match self {
            HazardCategory::Ppe => "معدات وقاية",
            HazardCategory::Environmental => "مخاطر بيئية",
            HazardCategory::Structural => "سلامة إنشائية",
            HazardCategory::Electrical => "مخاطر كهربائية",
            HazardCategory::Other => "أخرى",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "معدات وقاية" | "ppe" => HazardCategory::Ppe,
            "مخاطر بيئية" | "environmental" => HazardCategory::Environmental,
            "سلامة إنشائية" | "structural" => HazardCategory::Structural,
            "مخاطر كهربائية" | "electrical" => HazardCategory::Electrical,
            _ => HazardCategory::Other,
        }
    }
}

impl<'de> Deserialize<'de> for HazardCategory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(HazardCategory::from_label(&raw))
    }
}

/// One identified unsafe condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hazard {
    pub title: String,
    pub description: String,
    pub risk_level: RiskLevel,
    pub category: HazardCategory,
    /// Ordered remediation steps
    pub mitigation: Vec<String>,
}

/// Structured inspection report returned by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub overall_summary: String,
    pub hazards: Vec<Hazard>,
}

impl AnalysisResult {
    /// Hazards at the given level
    pub fn count_at(&self, level: RiskLevel) -> usize {
        self.hazards.iter().filter(|h| h.risk_level == level).count()
    }

    /// Most severe level present, if any hazard was found
    pub fn highest_risk(&self) -> Option<RiskLevel> {
        self.hazards.iter().map(|h| h.risk_level).min()
    }
}

/// Result type for analysis operations
pub type AnalysisOutcome<T> = Result<T, AnalysisError>;

/// Errors raised by the analysis adapter
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The provider reported the credential or project as invalid
    #[error("credential rejected by provider: {0}")]
    EntityNotFound(String),

    /// No API key is configured
    #[error("no API key configured")]
    MissingApiKey,

    /// The provider returned no text
    #[error("Empty response from AI")]
    EmptyResponse,

    /// The text did not parse into the hazard schema
    #[error("response does not match the hazard schema: {0}")]
    InvalidSchema(String),

    /// The provider answered with a non-success status
    #[error("provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// The request never completed
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::EntityNotFound(_) | AnalysisError::MissingApiKey => {
                ErrorKind::EntityNotFound
            }
            _ => ErrorKind::AiFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_labels() {
        assert_eq!("عالي".parse::<RiskLevel>(), Ok(RiskLevel::High));
        assert_eq!(" متوسط ".parse::<RiskLevel>(), Ok(RiskLevel::Medium));
        assert_eq!("LOW".parse::<RiskLevel>(), Ok(RiskLevel::Low));
        assert!("critical".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(HazardCategory::from_label("مخاطر كهربائية"), HazardCategory::Electrical);
        assert_eq!(HazardCategory::from_label("PPE"), HazardCategory::Ppe);
        assert_eq!(HazardCategory::from_label("ergonomics"), HazardCategory::Other);
        for category in [
            HazardCategory::Ppe,
            HazardCategory::Environmental,
            HazardCategory::Structural,
            HazardCategory::Electrical,
            HazardCategory::Other,
        ] {
            assert_eq!(HazardCategory::from_label(category.label()), category);
        }
    }

    #[test]
    fn test_result_deserializes_camel_case() {
        let json = r#"{"overallSummary":"s","hazards":[{"title":"t","description":"d","riskLevel":"high","category":"structural","mitigation":[]}]}"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.hazards[0].category, HazardCategory::Structural);
        assert_eq!(result.highest_risk(), Some(RiskLevel::High));
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let json = r#"{"overallSummary":"s","hazards":[{"title":"t","riskLevel":"high","category":"x","mitigation":[]}]}"#;
        assert!(serde_json::from_str::<AnalysisResult>(json).is_err());
    }

    #[test]
    fn test_highest_risk_and_counts() {
        let hazard = |level| Hazard {
            title: "t".into(),
            description: "d".into(),
            risk_level: level,
            category: HazardCategory::Other,
            mitigation: vec![],
        };
        let result = AnalysisResult {
            overall_summary: String::new(),
            hazards: vec![hazard(RiskLevel::Low), hazard(RiskLevel::Medium), hazard(RiskLevel::Low)],
        };
        assert_eq!(result.highest_risk(), Some(RiskLevel::Medium));
        assert_eq!(result.count_at(RiskLevel::Low), 2);
        assert_eq!(result.count_at(RiskLevel::High), 0);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(AnalysisError::EntityNotFound("x".into()).kind(), ErrorKind::EntityNotFound);
        assert_eq!(AnalysisError::EmptyResponse.kind(), ErrorKind::AiFailed);
        assert_eq!(AnalysisError::InvalidSchema("x".into()).kind(), ErrorKind::AiFailed);
    }
}
