pub mod client;
pub mod prompt;
pub mod types;

pub use client::{
    ENTITY_NOT_FOUND_MARKER, GeminiClient, GeminiConfig, HazardAnalyzer, build_request,
    classify_provider_message, parse_analysis_result,
};
pub use prompt::{HSE_EXPERT_PROMPT, build_analysis_prompt, response_schema};
pub use types::{AnalysisError, AnalysisOutcome, AnalysisResult, Hazard, HazardCategory, RiskLevel};
