use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::error::{RagError, Result};
use crate::models::{Chunk, CollectionStats, ScoredChunk};

pub const COLLECTION_NAME: &str = "paperless_chunks";

/// Filter predicate over stored point payloads. The only two shapes the
/// core needs: exact match on `doc_id`, and set-membership on `tags`.
pub enum Filter {
    DocId(i64),
    TagsAny(Vec<String>),
}

impl Filter {
    fn to_qdrant_json(&self) -> serde_json::Value {
        match self {
            Filter::DocId(id) => json!({
                "must": [{ "key": "doc_id", "match": { "value": id } }]
            }),
            Filter::TagsAny(tags) => json!({
                "must": [{ "key": "tags", "match": { "any": tags } }]
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CollectionsList {
    result: CollectionsListResult,
}

#[derive(Debug, Deserialize)]
struct CollectionsListResult {
    collections: Vec<CollectionEntry>,
}

#[derive(Debug, Deserialize)]
struct CollectionEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    result: CollectionInfoResult,
}

#[derive(Debug, Deserialize)]
struct CollectionInfoResult {
    config: CollectionConfig,
    points_count: Option<u64>,
    vectors_count: Option<u64>,
    segments_count: Option<u64>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Debug, Deserialize)]
struct CollectionParams {
    vectors: VectorParamsInfo,
}

#[derive(Debug, Deserialize)]
struct VectorParamsInfo {
    size: usize,
}

#[derive(Debug, Serialize)]
struct Point {
    id: String,
    vector: Vec<f32>,
    payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    score: f32,
    payload: ChunkPayload,
}

#[derive(Debug, Deserialize, Serialize)]
struct ChunkPayload {
    text: String,
    doc_id: i64,
    title: String,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    file_type: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    ingested_at: chrono::DateTime<chrono::Utc>,
    token_count: usize,
    chunk_index: usize,
}

#[derive(Debug, Deserialize)]
struct ScrollResponse {
    result: ScrollResult,
}

#[derive(Debug, Deserialize)]
struct ScrollResult {
    points: Vec<ScrollPoint>,
    #[serde(default)]
    next_page_offset: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ScrollPoint {
    #[allow(dead_code)]
    id: serde_json::Value,
    #[serde(default)]
    payload: Option<ChunkPayload>,
}

/// Thin façade over the external vector index's REST API. Hides the
/// transport but preserves ordering and filter semantics exactly as the
/// rest of the pipeline expects them.
pub struct VectorStore {
    client: Client,
    base_url: String,
}

impl VectorStore {
    pub fn new(base_url: String) -> Self {
        VectorStore {
            client: Client::new(),
            base_url,
        }
    }

    fn err(&self, operation: &str, status: Option<u16>, cause: String) -> RagError {
        RagError::UpstreamVector {
            operation: operation.to_string(),
            status,
            cause,
        }
    }

    pub async fn ensure_collection(&self, dim: usize) -> Result<()> {
        let list: CollectionsList = self
            .client
            .get(format!("{}/collections", self.base_url))
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| self.err("ensure_collection", None, e.to_string()))?
            .json()
            .await
            .map_err(|e| self.err("ensure_collection", None, e.to_string()))?;

        let exists = list
            .result
            .collections
            .iter()
            .any(|c| c.name == COLLECTION_NAME);

        if exists {
            let info: CollectionInfo = self
                .client
                .get(format!("{}/collections/{}", self.base_url, COLLECTION_NAME))
                .timeout(Duration::from_secs(30))
                .send()
                .await
                .map_err(|e| self.err("ensure_collection", None, e.to_string()))?
                .json()
                .await
                .map_err(|e| self.err("ensure_collection", None, e.to_string()))?;

            let stored_dim = info.result.config.params.vectors.size;
            if stored_dim != dim {
                return Err(RagError::Config(format!(
                    "collection '{COLLECTION_NAME}' has vector size {stored_dim}, expected {dim}"
                )));
            }
            return Ok(());
        }

        let response = self
            .client
            .put(format!("{}/collections/{}", self.base_url, COLLECTION_NAME))
            .timeout(Duration::from_secs(30))
            .json(&json!({ "vectors": { "size": dim, "distance": "Cosine" } }))
            .send()
            .await
            .map_err(|e| self.err("ensure_collection", None, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(self.err("ensure_collection", Some(status), response.text().await.unwrap_or_default()));
        }
        Ok(())
    }

    pub async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let points: Vec<Point> = chunks
            .iter()
            .map(|c| Point {
                id: c.id().as_point_id(),
                vector: c.vector.clone().unwrap_or_default(),
                payload: serde_json::to_value(ChunkPayload {
                    text: c.text.clone(),
                    doc_id: c.doc_id,
                    title: c.title.clone(),
                    page: c.page,
                    file_type: c.file_type.clone(),
                    tags: c.tags.clone(),
                    ingested_at: c.ingested_at,
                    token_count: c.token_count,
                    chunk_index: c.chunk_index,
                })
                .unwrap_or(serde_json::Value::Null),
            })
            .collect();

        let response = self
            .client
            .put(format!(
                "{}/collections/{}/points?wait=true",
                self.base_url, COLLECTION_NAME
            ))
            .timeout(Duration::from_secs(60))
            .json(&json!({ "points": points }))
            .send()
            .await
            .map_err(|e| self.err("upsert", None, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(self.err("upsert", Some(status), response.text().await.unwrap_or_default()));
        }
        Ok(())
    }

    pub async fn delete_by_filter(&self, filter: Filter) -> Result<()> {
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/delete?wait=true",
                self.base_url, COLLECTION_NAME
            ))
            .timeout(Duration::from_secs(60))
            .json(&json!({ "filter": filter.to_qdrant_json() }))
            .send()
            .await
            .map_err(|e| self.err("delete_by_filter", None, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(self.err("delete_by_filter", Some(status), response.text().await.unwrap_or_default()));
        }
        Ok(())
    }

    pub async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<Filter>,
        score_threshold: f32,
    ) -> Result<Vec<ScoredChunk>> {
        let mut body = json!({
            "vector": query_vector,
            "limit": top_k,
            "score_threshold": score_threshold,
            "with_payload": true,
        });
        if let Some(f) = filter {
            body["filter"] = f.to_qdrant_json();
        }

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/search",
                self.base_url, COLLECTION_NAME
            ))
            .timeout(Duration::from_secs(30))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.err("search", None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.err("search", Some(status.as_u16()), response.text().await.unwrap_or_default()));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| self.err("search", Some(status.as_u16()), e.to_string()))?;

        Ok(parsed
            .result
            .into_iter()
            .map(|hit| ScoredChunk {
                chunk: Chunk {
                    text: hit.payload.text,
                    doc_id: hit.payload.doc_id,
                    title: hit.payload.title,
                    page: hit.payload.page,
                    file_type: hit.payload.file_type,
                    tags: hit.payload.tags,
                    ingested_at: hit.payload.ingested_at,
                    token_count: hit.payload.token_count,
                    chunk_index: hit.payload.chunk_index,
                    vector: None,
                },
                score: hit.score,
                vector_score: hit.score,
                keyword_score: 0.0,
            })
            .collect())
    }

    /// Returns true if at least one point matches the filter (used to test
    /// whether a document has already been ingested).
    pub async fn exists(&self, filter: Filter) -> Result<bool> {
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/scroll",
                self.base_url, COLLECTION_NAME
            ))
            .timeout(Duration::from_secs(30))
            .json(&json!({ "filter": filter.to_qdrant_json(), "limit": 1 }))
            .send()
            .await
            .map_err(|e| self.err("exists", None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.err("exists", Some(status.as_u16()), response.text().await.unwrap_or_default()));
        }

        let parsed: ScrollResponse = response
            .json()
            .await
            .map_err(|e| self.err("exists", Some(status.as_u16()), e.to_string()))?;

        Ok(!parsed.result.points.is_empty())
    }

    /// Pages through points matching `filter`, `limit` at a time. Pass the
    /// `next_offset` from a prior call back in as `offset` to fetch the
    /// following page; `None` starts from the beginning and is also
    /// returned once there is no further page.
    pub async fn scroll(
        &self,
        filter: Filter,
        limit: usize,
        offset: Option<serde_json::Value>,
    ) -> Result<(Vec<Chunk>, Option<serde_json::Value>)> {
        let mut body = json!({
            "filter": filter.to_qdrant_json(),
            "limit": limit,
            "with_payload": true,
        });
        if let Some(offset) = offset {
            body["offset"] = offset;
        }

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/scroll",
                self.base_url, COLLECTION_NAME
            ))
            .timeout(Duration::from_secs(30))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.err("scroll", None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.err("scroll", Some(status.as_u16()), response.text().await.unwrap_or_default()));
        }

        let parsed: ScrollResponse = response
            .json()
            .await
            .map_err(|e| self.err("scroll", Some(status.as_u16()), e.to_string()))?;

        let chunks = parsed
            .result
            .points
            .into_iter()
            .filter_map(|p| p.payload)
            .map(|payload| Chunk {
                text: payload.text,
                doc_id: payload.doc_id,
                title: payload.title,
                page: payload.page,
                file_type: payload.file_type,
                tags: payload.tags,
                ingested_at: payload.ingested_at,
                token_count: payload.token_count,
                chunk_index: payload.chunk_index,
                vector: None,
            })
            .collect();

        Ok((chunks, parsed.result.next_page_offset))
    }

    pub async fn get_collection_stats(&self) -> Result<CollectionStats> {
        let response = self
            .client
            .get(format!("{}/collections/{}", self.base_url, COLLECTION_NAME))
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| self.err("get_collection_stats", None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.err("get_collection_stats", Some(status.as_u16()), response.text().await.unwrap_or_default()));
        }

        let info: CollectionInfo = response
            .json()
            .await
            .map_err(|e| self.err("get_collection_stats", Some(status.as_u16()), e.to_string()))?;

        Ok(CollectionStats {
            collection_name: COLLECTION_NAME.to_string(),
            points_count: info.result.points_count.unwrap_or(0),
            vectors_count: info.result.vectors_count.unwrap_or(0),
            segments_count: info.result.segments_count.unwrap_or(0),
            status: info.result.status.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_id_filter_serializes_to_qdrant_shape() {
        let f = Filter::DocId(42);
        let json = f.to_qdrant_json();
        assert_eq!(json["must"][0]["key"], "doc_id");
        assert_eq!(json["must"][0]["match"]["value"], 42);
    }

    #[test]
    fn tags_filter_serializes_to_any_match() {
        let f = Filter::TagsAny(vec!["a".to_string(), "b".to_string()]);
        let json = f.to_qdrant_json();
        assert_eq!(json["must"][0]["key"], "tags");
        assert_eq!(json["must"][0]["match"]["any"][0], "a");
    }
}
