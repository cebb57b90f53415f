use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::info;

use super::{Tool, ToolOutput};

/// Nearest-neighbor index over embedded page-content chunks. Index
/// persistence and chunking live outside this crate; the agent only needs
/// ranked hits for a free-text query.
#[async_trait]
pub trait PageIndex: Send + Sync + Debug {
    /// Top `top_k` page hits for the query, closest first. Each hit is a
    /// record with at least `url`, `title` and `timestamp` fields.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Value>>;
}

/// The designated search tool: looks up browsing-history hits for a query.
/// Its list results replace the agent's running result set.
#[derive(Debug, Clone)]
pub struct SearchBrowserHistory {
    index: Arc<dyn PageIndex>,
}

impl SearchBrowserHistory {
    pub fn new(index: Arc<dyn PageIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Tool for SearchBrowserHistory {
    fn name(&self) -> String {
        "search_browser_history".to_string()
    }

    fn description(&self) -> Option<String> {
        Some("Search the page index for matching browser history".to_string())
    }

    fn args_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "free-text search query"
                },
                "top_k": {
                    "type": "integer",
                    "description": "number of hits to return",
                    "default": 5
                }
            },
            "required": ["query"]
        }))
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing 'query' argument"))?;
        let top_k = args.get("top_k").and_then(|v| v.as_u64()).unwrap_or(5) as usize;

        info!("search request - query: '{query}', top k: {top_k}");
        let hits = self.index.search(query, top_k).await?;
        info!("search completed - found {} results", hits.len());

        Ok(ToolOutput::List(hits))
    }
}
