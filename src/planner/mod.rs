use tracing::{debug, error};

use crate::llm::CompletionClient;
use crate::types::{MemoryItem, PerceptionResult};

/// The deterministic terminal plan emitted when the completion provider is
/// unreachable. Planning failure must never crash the loop.
pub const FALLBACK_PLAN: &str = "FINAL_ANSWER: [unknown]";

/// Generate the next plan line: a tool call or a final answer. Takes the
/// first line of the completion that starts with a recognized prefix; with
/// no such line the raw trimmed completion is returned and the caller treats
/// it as a planning failure. On provider error this returns `FALLBACK_PLAN`
/// instead of raising.
pub async fn generate_plan(
    llm: &dyn CompletionClient,
    perception: &PerceptionResult,
    memory_items: &[MemoryItem],
    tool_descriptions: &str,
    max_steps: usize,
) -> String {
    let prompt = build_prompt(perception, memory_items, tool_descriptions, max_steps);

    match llm.complete(&prompt).await {
        Ok(raw) => {
            let raw = raw.trim();
            debug!("planner output: {raw}");
            for line in raw.lines() {
                let line = line.trim();
                if line.starts_with("FUNCTION_CALL:") || line.starts_with("FINAL_ANSWER:") {
                    return line.to_string();
                }
            }
            raw.to_string()
        }
        Err(err) => {
            error!("plan generation failed: {err}");
            FALLBACK_PLAN.to_string()
        }
    }
}

fn build_prompt(
    perception: &PerceptionResult,
    memory_items: &[MemoryItem],
    tool_descriptions: &str,
    max_steps: usize,
) -> String {
    let memory_texts = if memory_items.is_empty() {
        "None".to_string()
    } else {
        memory_items
            .iter()
            .map(|m| format!("- {}", m.text))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let tool_context = if tool_descriptions.is_empty() {
        String::new()
    } else {
        format!("\nYou have access to the following tools:\n{tool_descriptions}")
    };

    let entities = perception.entities.join(", ");
    let tool_hint = perception.tool_hint.as_deref().unwrap_or("None");

    format!(
        r#"You are a reasoning-driven AI agent with access to tools. Your job is to solve the user's request step-by-step by reasoning through the problem, selecting a tool if needed, and continuing until the FINAL_ANSWER is produced.
{tool_context}

Always follow this loop:

1. Think step-by-step about the problem.
2. If a tool is needed, respond using the format:
   FUNCTION_CALL: tool_name|param1=value1|param2=value2
3. When the final answer is known, respond using:
   FINAL_ANSWER: [your final result]

Guidelines:
- Respond using EXACTLY ONE of the formats above per step.
- Do NOT include extra text, explanation, or formatting.
- Use nested keys (e.g., input.string) and square brackets for lists.
- You can reference these relevant memories:
{memory_texts}

Input Summary:
- User input: "{user_input}"
- Intent: {intent}
- Entities: {entities}
- Tool hint: {tool_hint}

Examples:
- FUNCTION_CALL: search_browser_history|query="Shopping ladies bags"|top_k=1
- FUNCTION_CALL: strings_to_chars_to_int|input.string=INDIA
- FUNCTION_CALL: int_list_to_exponential_sum|input.numbers=[73,78,68,73,65]
- FINAL_ANSWER: [42]
- FINAL_ANSWER: [{{"url": "https://example.com/page", "title": "Example page", "timestamp": "2025-12-27T01:01:18.381Z"}}]

IMPORTANT:
- Do NOT invent tools. Use only the tools listed above.
- If the question may relate to searching browsing history, use the 'search_browser_history' tool to look for the answer.
- If the question is mathematical or needs calculation, use the appropriate math tool.
- If the previous tool output already contained the result, do not search again. Return the same tool result as is: FINAL_ANSWER: last tool result in list format
- Do NOT repeat function calls with the same parameters.
- Do NOT output unstructured responses.
- Think before each step. Verify intermediate results mentally before proceeding.
- If unsure or no tool fits, skip to FINAL_ANSWER: [unknown]
- You have only {max_steps} attempts. The final attempt must be FINAL_ANSWER."#,
        user_input = perception.user_input,
        intent = perception.intent,
    )
}
