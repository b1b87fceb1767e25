use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Document metadata as reported by the DMS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub page_count: Option<u32>,
}

/// Denormalized passthrough shape returned by the document listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub id: i64,
    pub title: String,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    pub tags: Vec<String>,
}

impl From<Document> for DocumentInfo {
    fn from(d: Document) -> Self {
        DocumentInfo {
            id: d.id,
            title: d.title,
            created: d.created,
            modified: d.modified,
            file_type: d.file_type,
            page_count: d.page_count,
            tags: d.tags,
        }
    }
}

/// Deterministic identity of a stored chunk: (doc_id, page or 0, chunk_index).
///
/// Stable across runs and reindexes; the point id handed to the vector
/// store is derived from this triple, never from an in-memory ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkId {
    pub doc_id: i64,
    pub page: u32,
    pub chunk_index: usize,
}

impl ChunkId {
    pub fn new(doc_id: i64, page: Option<u32>, chunk_index: usize) -> Self {
        ChunkId {
            doc_id,
            page: page.unwrap_or(0),
            chunk_index,
        }
    }

    /// Stable point id string for the vector store, e.g. "42_3_0".
    pub fn as_point_id(&self) -> String {
        format!("{}_{}_{}", self.doc_id, self.page, self.chunk_index)
    }
}

/// The unit of retrieval, stored as a vector-store point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub doc_id: i64,
    pub title: String,
    pub page: Option<u32>,
    pub file_type: Option<String>,
    pub tags: Vec<String>,
    pub ingested_at: DateTime<Utc>,
    pub token_count: usize,
    pub chunk_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

impl Chunk {
    pub fn id(&self) -> ChunkId {
        ChunkId::new(self.doc_id, self.page, self.chunk_index)
    }

    pub fn word_set(&self) -> HashSet<String> {
        self.text
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

/// A chunk returned from a search/rerank with the score(s) that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
    pub vector_score: f32,
    pub keyword_score: f32,
}

/// A single turn of chat history supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub query: String,
    #[serde(default)]
    pub filter_tags: Option<Vec<String>>,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub history: Option<Vec<HistoryTurn>>,
    #[serde(default = "default_true")]
    pub allow_general_chat: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub doc_id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub score: f32,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub query: String,
    pub model_used: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub doc_id: Option<i64>,
    #[serde(default)]
    pub force_reindex: bool,
    #[serde(default)]
    pub updated_after: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub message: String,
    pub documents_processed: usize,
    pub chunks_created: usize,
}

/// Machine-readable per-document ingest outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResult {
    pub doc_id: i64,
    pub title: Option<String>,
    pub status: IngestStatus,
    pub chunks_created: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_processed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Success,
    Skipped,
    Failed,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub components: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
    pub collection_name: String,
    pub points_count: u64,
    pub vectors_count: u64,
    pub segments_count: u64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub collection: CollectionStats,
    pub documents_count: String,
    pub embedding_model: String,
    pub llm_model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_round_trips_through_point_id_string() {
        let id = ChunkId::new(42, Some(3), 0);
        assert_eq!(id.as_point_id(), "42_3_0");

        let id0 = ChunkId::new(42, None, 5);
        assert_eq!(id0.as_point_id(), "42_0_5");
    }

    #[test]
    fn chunk_id_is_deterministic_for_equal_inputs() {
        let a = ChunkId::new(7, Some(1), 2);
        let b = ChunkId::new(7, Some(1), 2);
        assert_eq!(a, b);
        assert_eq!(a.as_point_id(), b.as_point_id());
    }
}
