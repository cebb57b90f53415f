use serde::Deserialize;
use tracing::warn;

use crate::llm::CompletionClient;
use crate::types::PerceptionResult;

#[derive(Debug, Deserialize)]
struct ExtractedFields {
    intent: String,
    #[serde(default)]
    entities: Vec<String>,
    #[serde(default)]
    tool_hint: Option<String>,
}

/// Classify raw user input into a structured intent record. This never
/// fails: provider or parse trouble degrades to an "unknown" intent so the
/// loop always has a perception to plan from.
pub async fn extract_perception(llm: &dyn CompletionClient, user_input: &str) -> PerceptionResult {
    let fallback = PerceptionResult {
        user_input: user_input.to_string(),
        intent: "unknown".to_string(),
        entities: Vec::new(),
        tool_hint: None,
    };

    let prompt = format!(
        r#"You are an AI that extracts structured facts from user input.

Input: "{user_input}"

Return ONLY a JSON object with these fields:
- intent: (brief phrase about what the user wants)
- entities: a list of strings from the user input (numbers, names, keywords)
- tool_hint: (name of a tool that might help, if any, else null)

Output only the JSON object, no extra text."#
    );

    let raw = match llm.complete(&prompt).await {
        Ok(raw) => raw,
        Err(err) => {
            warn!("perception extraction failed: {err}");
            return fallback;
        }
    };

    match serde_json::from_str::<ExtractedFields>(strip_code_fences(&raw)) {
        Ok(fields) => PerceptionResult {
            user_input: user_input.to_string(),
            intent: fields.intent,
            entities: fields.entities,
            tool_hint: fields.tool_hint,
        },
        Err(err) => {
            warn!("unparseable perception output: {err}");
            fallback
        }
    }
}

/// Completion models like to wrap JSON in markdown fences.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}
