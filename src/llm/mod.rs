use anyhow::Result;
use async_trait::async_trait;

use crate::error::EmbeddingError;

pub mod gemini;
pub mod ollama;

/// Text-completion provider: one prompt in, one free-text completion out.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Embedding provider: text in, fixed-length vector out. Failure kinds are
/// classified so the memory store can surface them unchanged.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Completion client that replays a fixed script of responses, repeating
    /// the last one once the script runs out.
    pub(crate) struct ScriptedCompletionClient {
        responses: Vec<String>,
        cursor: AtomicUsize,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedCompletionClient {
        pub fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: responses.into_iter().map(String::from).collect(),
                cursor: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.cursor.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedCompletionClient {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let i = self.cursor.fetch_add(1, Ordering::SeqCst);
            let i = i.min(self.responses.len().saturating_sub(1));
            Ok(self.responses[i].clone())
        }
    }

    /// Completion client whose provider is always down.
    pub(crate) struct FailingCompletionClient;

    #[async_trait]
    impl CompletionClient for FailingCompletionClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(anyhow::anyhow!("completion provider unreachable"))
        }
    }

    /// Embedding client with a fixed per-text vector table. Unknown texts
    /// get the fallback vector, so queries always embed.
    pub(crate) struct StaticEmbeddingClient {
        table: HashMap<String, Vec<f32>>,
        fallback: Vec<f32>,
    }

    impl StaticEmbeddingClient {
        pub fn new(fallback: Vec<f32>) -> Self {
            Self {
                table: HashMap::new(),
                fallback,
            }
        }

        pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
            self.table.insert(text.to_string(), vector);
            self
        }
    }

    #[async_trait]
    impl EmbeddingClient for StaticEmbeddingClient {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(self
                .table
                .get(text)
                .cloned()
                .unwrap_or_else(|| self.fallback.clone()))
        }
    }

    /// Embedding client that succeeds for the first `ok_calls` calls, then
    /// times out forever.
    pub(crate) struct FlakyEmbeddingClient {
        ok_calls: usize,
        calls: AtomicUsize,
        vector: Vec<f32>,
    }

    impl FlakyEmbeddingClient {
        pub fn new(ok_calls: usize, vector: Vec<f32>) -> Self {
            Self {
                ok_calls,
                calls: AtomicUsize::new(0),
                vector,
            }
        }
    }

    #[async_trait]
    impl EmbeddingClient for FlakyEmbeddingClient {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.ok_calls {
                Ok(self.vector.clone())
            } else {
                Err(EmbeddingError::Timeout {
                    url: "http://localhost:11434/api/embeddings".to_string(),
                })
            }
        }
    }

    #[test]
    fn test_scripted_client_replays_and_repeats() {
        tokio_test::block_on(async {
            let client = ScriptedCompletionClient::new(vec!["first", "second"]);

            assert_eq!(client.complete("a").await.unwrap(), "first");
            assert_eq!(client.complete("b").await.unwrap(), "second");
            assert_eq!(client.complete("c").await.unwrap(), "second");
            assert_eq!(client.calls(), 3);
        });
    }
}
