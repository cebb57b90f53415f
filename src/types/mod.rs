use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tools::ToolOutput;

/// Category of a stored memory item. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    Preference,
    ToolOutput,
    Fact,
    Query,
    System,
}

/// An embedded text record. Immutable once stored; the store keeps items
/// and their vectors in lock-step, addressed by the same ordinal index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    pub text: String,
    pub kind: MemoryKind,
    pub timestamp: DateTime<Utc>,
    pub tool_name: Option<String>,
    pub user_query: Option<String>,
    pub tags: Vec<String>,
    pub session_id: Option<String>,
}

impl MemoryItem {
    pub fn new(text: impl Into<String>, kind: MemoryKind) -> Self {
        Self {
            text: text.into(),
            kind,
            timestamp: Utc::now(),
            tool_name: None,
            user_query: None,
            tags: Vec::new(),
            session_id: None,
        }
    }

    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    pub fn with_user_query(mut self, user_query: impl Into<String>) -> Self {
        self.user_query = Some(user_query.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Post-retrieval filters, applied in order after the nearest-neighbor
/// search: kind (exact), tags (any-of), session (exact).
#[derive(Debug, Clone, Default)]
pub struct MemoryFilter {
    pub kind: Option<MemoryKind>,
    pub tags: Option<Vec<String>>,
    pub session_id: Option<String>,
}

/// Structured view of one round of user input. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerceptionResult {
    pub user_input: String,
    pub intent: String,
    pub entities: Vec<String>,
    pub tool_hint: Option<String>,
}

/// The planner's single decision per step.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanAction {
    /// Invoke one tool with a (possibly nested) argument mapping.
    ToolCall {
        name: String,
        arguments: Map<String, Value>,
    },
    /// Stop and answer with the given payload.
    FinalAnswer(String),
}

/// Outcome of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCallResult {
    pub tool_name: String,
    pub arguments: Map<String, Value>,
    /// Normalized result: string, list, or mapping.
    pub result: Value,
    /// Unprocessed tool output, kept for diagnostics and never reparsed.
    pub raw_response: ToolOutput,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Hard cap on perceive/plan/act iterations per run. The planner is told
    /// about the cap, but the loop enforces it regardless.
    pub max_steps: usize,
    /// How many memories to retrieve per step.
    pub memory_top_k: usize,
    /// The tool whose list results replace (rather than extend) the running
    /// result set.
    pub search_tool: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 3,
            memory_top_k: 3,
            search_tool: "search_browser_history".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_memory_item_serialization() {
        let item = MemoryItem::new("visited the checkout page", MemoryKind::ToolOutput)
            .with_tool_name("search_browser_history")
            .with_tags(vec!["search_browser_history".to_string()])
            .with_session_id("session-1");

        let serialized = serde_json::to_string(&item).unwrap();
        let deserialized: MemoryItem = serde_json::from_str(&serialized).unwrap();

        assert_eq!(item, deserialized);
    }

    #[test]
    fn test_memory_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&MemoryKind::ToolOutput).unwrap(),
            "\"tool_output\""
        );
        assert_eq!(
            serde_json::from_str::<MemoryKind>("\"preference\"").unwrap(),
            MemoryKind::Preference
        );
    }
}
