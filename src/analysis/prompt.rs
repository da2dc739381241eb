//! Fixed prompt and response schema for hazard analysis.

use once_cell::sync::Lazy;
use serde_json::{Value, json};

/// Domain-expert framing sent with every capture (Arabic, like the report)
pub const HSE_EXPERT_PROMPT: &str = "\
بصفتك خبير سلامة مهنية (HSE Expert)، قم بتحليل الصورة/الفيديو المرفق لاستخراج كافة المخاطر الأمنية والصحية الملاحظة.

المطلوب منك:
1. قائمة بكافة المخاطر (hazards): لكل خطر حدد العنوان، الوصف الدقيق، مستوى الخطورة (عالي، متوسط، منخفض)، التصنيف (معدات وقاية، مخاطر بيئية، سلامة إنشائية، مخاطر كهربائية، أخرى)، وخطوات المعالجة المقترحة.
2. ملخص عام للحالة (overallSummary): تقييم سريع للوضع العام في الموقع.

يجب أن يكون الرد باللغة العربية الفصحى وبأسلوب تقني واحترافي، وفي تنسيق JSON حصراً.";

static RESPONSE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "OBJECT",
        "properties": {
            "overallSummary": { "type": "STRING" },
            "hazards": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "riskLevel": { "type": "STRING" },
                        "category": { "type": "STRING" },
                        "mitigation": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" }
                        }
                    },
                    "required": ["title", "description", "riskLevel", "category", "mitigation"]
                }
            }
        },
        "required": ["hazards", "overallSummary"]
    })
});

/// Schema the provider must conform to
pub fn response_schema() -> &'static Value {
    &RESPONSE_SCHEMA
}

/// Build the analysis prompt, appending optional site context.
pub fn build_analysis_prompt(site_context: Option<&str>) -> String {
    match site_context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => format!("{}\n\nمعلومات إضافية عن الموقع: {}", HSE_EXPERT_PROMPT, context),
        None => HSE_EXPERT_PROMPT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_analysis_prompt_default() {
        let prompt = build_analysis_prompt(None);
        assert!(prompt.contains("HSE Expert"));
        assert!(prompt.contains("overallSummary"));
        assert_eq!(build_analysis_prompt(Some("   ")), prompt);
    }

    #[test]
    fn test_build_analysis_prompt_with_context() {
        let prompt = build_analysis_prompt(Some("رصيف تحميل"));
        assert!(prompt.starts_with(HSE_EXPERT_PROMPT));
        assert!(prompt.ends_with("رصيف تحميل"));
    }

    #[test]
    fn test_schema_requires_every_hazard_field() {
        let required = &response_schema()["properties"]["hazards"]["items"]["required"];
        assert_eq!(required.as_array().map(Vec::len), Some(5));
        assert_eq!(response_schema()["required"], json!(["hazards", "overallSummary"]));
    }
}
