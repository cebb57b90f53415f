use tracing::debug;

use crate::error::EmbeddingError;
use crate::llm::EmbeddingClient;
use crate::types::{MemoryFilter, MemoryItem};

/// Exact nearest-neighbor search over fixed-dimensionality vectors,
/// squared-L2 distance. Stands in for the external similarity engine.
#[derive(Debug)]
struct FlatIndex {
    dim: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: Vec::new(),
        }
    }

    fn add(&mut self, vector: Vec<f32>) {
        debug_assert_eq!(vector.len(), self.dim);
        self.vectors.push(vector);
    }

    /// Ordinal indices of the `k` closest vectors, closest first. The sort
    /// is stable, so equal distances keep insertion order.
    fn search(&self, query: &[f32], k: usize) -> Vec<usize> {
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, squared_l2(query, v)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored.into_iter().map(|(i, _)| i).collect()
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Embedding-backed memory. Items and vectors are parallel collections
/// addressed by the same ordinal index; the index dimensionality is fixed
/// lazily from the first inserted vector.
pub struct MemoryStore<'a> {
    embedder: &'a dyn EmbeddingClient,
    index: Option<FlatIndex>,
    items: Vec<MemoryItem>,
}

impl<'a> MemoryStore<'a> {
    pub fn new(embedder: &'a dyn EmbeddingClient) -> Self {
        Self {
            embedder,
            index: None,
            items: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Embed and append one item. On embedding failure nothing is inserted,
    /// keeping items and vectors in lock-step.
    pub async fn add(&mut self, item: MemoryItem) -> Result<(), EmbeddingError> {
        let vector = self.embedder.embed(&item.text).await?;

        let index = self
            .index
            .get_or_insert_with(|| FlatIndex::new(vector.len()));
        index.add(vector);
        self.items.push(item);
        Ok(())
    }

    pub async fn bulk_add(&mut self, items: Vec<MemoryItem>) -> Result<(), EmbeddingError> {
        for item in items {
            self.add(item).await?;
        }
        Ok(())
    }

    /// The up-to-`top_k` most similar items that pass the filters, closest
    /// first. Overfetches `2 * top_k` neighbors so post-filtering can still
    /// fill the quota. An empty store yields an empty list, never an error.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        filter: &MemoryFilter,
    ) -> Result<Vec<MemoryItem>, EmbeddingError> {
        let Some(index) = &self.index else {
            return Ok(Vec::new());
        };
        if self.items.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed(query).await?;
        let candidates = index.search(&query_vec, top_k * 2);
        debug!("retrieval considered {} candidates", candidates.len());

        let mut results = Vec::new();
        for idx in candidates {
            let item = &self.items[idx];

            if let Some(kind) = filter.kind {
                if item.kind != kind {
                    continue;
                }
            }
            if let Some(tags) = &filter.tags {
                if !tags.iter().any(|tag| item.tags.contains(tag)) {
                    continue;
                }
            }
            if let Some(session_id) = &filter.session_id {
                if item.session_id.as_deref() != Some(session_id.as_str()) {
                    continue;
                }
            }

            results.push(item.clone());
            if results.len() >= top_k {
                break;
            }
        }

        Ok(results)
    }
}
