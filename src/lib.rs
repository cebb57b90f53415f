pub mod action;
pub mod agent;
pub mod error;
pub mod llm;
pub mod memory;
pub mod perception;
pub mod planner;
pub mod tools;
pub mod types;

pub use agent::Agent;
pub use error::{AgentError, EmbeddingError};
pub use llm::{CompletionClient, EmbeddingClient};
pub use memory::MemoryStore;
pub use tools::{Tool, ToolOutput};
pub use types::{AgentConfig, MemoryItem, MemoryKind, PerceptionResult, PlanAction};
