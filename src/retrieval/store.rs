use crate::domain::ports::EmbeddingProvider;
use crate::retrieval::splitter::TextSplitter;
use crate::utils::error::{FlowError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// A retrieval unit returned to callers. Children of a parent are what get
/// embedded and searched; the parent text is what gets returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentChunk {
    pub id: String,
    pub text: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChildEntry {
    parent_id: String,
    vector: Vec<f32>,
}

/// In-memory child-vector index with cosine scoring and JSON persistence.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct VectorStore {
    children: Vec<ChildEntry>,
    parents: HashMap<String, ParentChunk>,
    doc_count: usize,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }

    /// Split `content` into parents and children, embed the children, and
    /// index them. Returns the number of child vectors added.
    pub async fn add_document(
        &mut self,
        content: &str,
        metadata: HashMap<String, String>,
        embedder: &dyn EmbeddingProvider,
        parent_splitter: &TextSplitter,
        child_splitter: &TextSplitter,
    ) -> Result<usize> {
        let doc_id = self.doc_count;
        self.doc_count += 1;

        let mut added = 0;
        for (pi, parent_text) in parent_splitter.split(content).iter().enumerate() {
            let children = child_splitter.split(parent_text);
            if children.is_empty() {
                continue;
            }
            let parent_id = format!("doc{}-p{}", doc_id, pi);
            let vectors = embedder.embed(&children).await?;
            for vector in vectors {
                self.children.push(ChildEntry {
                    parent_id: parent_id.clone(),
                    vector: l2_normalize(vector),
                });
                added += 1;
            }
            self.parents.insert(
                parent_id.clone(),
                ParentChunk {
                    id: parent_id,
                    text: parent_text.clone(),
                    metadata: metadata.clone(),
                },
            );
        }
        Ok(added)
    }

    /// Embed the query, score all children, collect the top unique parents
    /// and return their texts reordered for long-context consumption.
    pub async fn query(
        &self,
        query: &str,
        num_results: usize,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Vec<String>> {
        if self.children.is_empty() || num_results == 0 {
            return Ok(Vec::new());
        }
        let mut vectors = embedder.embed(&[query.to_string()]).await?;
        let query_vector = vectors.pop().ok_or_else(|| FlowError::ProcessingError {
            message: "embedding provider returned no vector for query".to_string(),
        })?;
        let query_vector = l2_normalize(query_vector);

        let mut scored: Vec<(&ChildEntry, f32)> = self
            .children
            .iter()
            .map(|c| (c, cosine_similarity(&query_vector, &c.vector)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut seen: HashSet<&str> = HashSet::new();
        let mut hits = Vec::new();
        for (child, _) in scored {
            if seen.insert(child.parent_id.as_str()) {
                if let Some(parent) = self.parents.get(&child.parent_id) {
                    hits.push(parent.text.clone());
                }
                if hits.len() == num_results {
                    break;
                }
            }
        }
        Ok(reorder_for_long_context(hits))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for i in 0..n {
        dot += a[i] * b[i];
        na += a[i] * a[i];
        nb += b[i] * b[i];
    }
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}

pub fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let n2: f32 = v.iter().map(|x| x * x).sum();
    if n2 > 0.0 {
        let norm = n2.sqrt();
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// "Lost in the middle" mitigation: given documents in descending relevance,
/// place the most relevant at the edges of the list and the least relevant
/// in the middle.
pub fn reorder_for_long_context(docs: Vec<String>) -> Vec<String> {
    let mut out: VecDeque<String> = VecDeque::with_capacity(docs.len());
    for (i, doc) in docs.into_iter().rev().enumerate() {
        if i % 2 == 0 {
            out.push_front(doc);
        } else {
            out.push_back(doc);
        }
    }
    out.into()
}
