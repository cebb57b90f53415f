use thiserror::Error;

/// Failures of the embedding provider. The three kinds are kept apart so
/// callers can tell a dead service from a slow one from a misbehaving one.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("could not connect to embedding service at {url}: {detail}")]
    Connection { url: String, detail: String },

    #[error("timed out waiting for embedding service at {url}")]
    Timeout { url: String },

    #[error("embedding service returned {status}: {detail}")]
    Remote { status: u16, detail: String },
}

#[derive(Debug, Error)]
pub enum AgentError {
    /// Planner output matched neither of the two allowed line formats.
    #[error("malformed action: {0}")]
    MalformedAction(String),

    /// Planner named a tool that is not in the catalog.
    #[error("tool '{0}' not found in registered tools")]
    UnknownTool(String),

    /// A tool invocation raised.
    #[error("tool '{name}' execution failed: {message}")]
    ToolExecutionFailure { name: String, message: String },

    /// The embedding path is broken; a run cannot do anything useful
    /// without it, so this one propagates out of `Agent::run`.
    #[error(transparent)]
    EmbeddingUnavailable(#[from] EmbeddingError),
}
