use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt::Debug;

pub mod history;
pub mod math;

/// One unit of tool content, coercible to text.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentPart {
    pub text: String,
}

impl ContentPart {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// The closed set of shapes a tool may return.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// A plain textual value.
    Text(String),
    /// A list of primitives or mappings.
    List(Vec<Value>),
    /// A single mapping.
    Map(Map<String, Value>),
    /// Content parts, coerced to text during normalization.
    Content(Vec<ContentPart>),
}

impl ToolOutput {
    /// Collapse the raw shape into a plain value: string, list, or mapping.
    /// A single content part becomes its text, several become a list of
    /// texts.
    pub fn normalize(&self) -> Value {
        match self {
            ToolOutput::Text(text) => Value::String(text.clone()),
            ToolOutput::List(values) => Value::Array(values.clone()),
            ToolOutput::Map(map) => Value::Object(map.clone()),
            ToolOutput::Content(parts) => match parts.as_slice() {
                [part] => Value::String(part.text.clone()),
                parts => Value::Array(
                    parts
                        .iter()
                        .map(|part| Value::String(part.text.clone()))
                        .collect(),
                ),
            },
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync + Debug {
    /// The tool's unique name.
    fn name(&self) -> String;

    /// Human-readable purpose, rendered into the planner's tool catalog.
    fn description(&self) -> Option<String>;

    /// JSON Schema of the tool's arguments.
    fn args_schema(&self) -> Option<Value>;

    /// Execute the tool against a (possibly nested) argument mapping.
    async fn execute(&self, args: Value) -> Result<ToolOutput>;
}
