//! Prompts and schemas for skin analysis, chat and the API check.

pub const ANALYSIS_SYSTEM_INSTRUCTION: &str = "You are a supportive AI assistant providing general, non-medical, informational responses based on visual analysis. You MUST include a strong disclaimer that you are not a doctor.";

pub const TEXT_ANALYSIS_PROMPT: &str = "Analyze the image for potential skin conditions or eye issues. Provide a non-diagnostic, informational description of the visible condition, its common name, and list three general, non-medical advice points for care (e.g., 'keep clean', 'avoid touching'). IMPORTANT: Start your response with the condition name in bold.";

pub const STRUCTURED_ANALYSIS_PROMPT: &str = "Analyze the image for visible skin conditions. Identify the most likely common name of the condition, estimate your confidence from 0 to 100, give a short non-diagnostic description of what is visible, and include a disclaimer that this is not medical advice and a doctor should be consulted. If the skin looks healthy, say so as the condition.";

pub const CHAT_SYSTEM_INSTRUCTION: &str = "You are a friendly assistant answering general questions about skin care and common skin conditions. Keep answers short and informational. You are not a doctor: never diagnose, and recommend seeing a healthcare professional for anything persistent, painful or spreading.";

/// Response schema for the structured assessment.
///
/// Uses the OpenAPI subset the endpoint understands (upper-case type names).
pub fn skin_assessment_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "condition": {
                "type": "STRING",
                "description": "Common name of the most likely visible condition, or 'Healthy Skin'"
            },
            "confidence": {
                "type": "NUMBER",
                "description": "Confidence in the identification, 0-100"
            },
            "description": {
                "type": "STRING",
                "description": "Short, non-diagnostic description of what is visible"
            },
            "disclaimer": {
                "type": "STRING",
                "description": "Statement that this is not medical advice"
            }
        },
        "required": ["condition", "confidence", "description", "disclaimer"],
        "propertyOrdering": ["condition", "confidence", "description", "disclaimer"]
    })
}

/// Text-only probe used by the API check.
pub fn api_check_prompt(model: &str) -> String {
    format!(
        "Briefly describe the purpose of the {} model in two sentences.",
        model
    )
}
