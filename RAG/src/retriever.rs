use std::sync::Arc;

use crate::embedder::Embedder;
use crate::error::Result;
use crate::models::ScoredChunk;
use crate::vector_store::{Filter, VectorStore};

const DEFAULT_SCORE_THRESHOLD: f32 = 0.1;

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<VectorStore>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, vector_store: Arc<VectorStore>) -> Self {
        Retriever { embedder, vector_store }
    }

    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter_tags: Option<Vec<String>>,
        score_threshold: f32,
    ) -> Result<Vec<ScoredChunk>> {
        let query_vector = self
            .embedder
            .encode(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let filter = filter_tags.map(Filter::TagsAny);
        self.vector_store
            .search(&query_vector, top_k, filter, score_threshold)
            .await
    }

    pub async fn hybrid_search(
        &self,
        query: &str,
        top_k: usize,
        filter_tags: Option<Vec<String>>,
        keyword_boost: f32,
    ) -> Result<Vec<ScoredChunk>> {
        let mut candidates = self
            .search(query, top_k * 2, filter_tags, DEFAULT_SCORE_THRESHOLD)
            .await?;

        let query_words: std::collections::HashSet<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        for candidate in &mut candidates {
            let keyword_score = if query_words.is_empty() {
                0.0
            } else {
                let text_words = candidate.chunk.word_set();
                let overlap = query_words.intersection(&text_words).count();
                overlap as f32 / query_words.len() as f32
            };
            candidate.keyword_score = keyword_score;
            candidate.score = (1.0 - keyword_boost) * candidate.vector_score + keyword_boost * keyword_score;
        }

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(top_k);
        Ok(candidates)
    }

    /// Stable near-duplicate suppression: keeps a candidate only if its
    /// Jaccard word-set overlap with every already-accepted candidate is
    /// at or below `threshold`.
    pub fn deduplicate(chunks: Vec<ScoredChunk>, threshold: f32) -> Vec<ScoredChunk> {
        let mut kept: Vec<ScoredChunk> = Vec::new();
        let mut kept_words: Vec<std::collections::HashSet<String>> = Vec::new();

        for candidate in chunks {
            let words = candidate.chunk.word_set();
            let is_duplicate = kept_words.iter().any(|accepted| {
                let overlap = accepted.intersection(&words).count();
                let total = accepted.union(&words).count();
                total > 0 && (overlap as f32 / total as f32) > threshold
            });
            if !is_duplicate {
                kept_words.push(words);
                kept.push(candidate);
            }
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;
    use chrono::Utc;

    fn make_chunk(text: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                text: text.to_string(),
                doc_id: 1,
                title: "t".to_string(),
                page: None,
                file_type: None,
                tags: vec![],
                ingested_at: Utc::now(),
                token_count: text.split_whitespace().count(),
                chunk_index: 0,
                vector: None,
            },
            score: 1.0,
            vector_score: 1.0,
            keyword_score: 0.0,
        }
    }

    #[test]
    fn dedup_keeps_first_of_near_identical_pair_and_drops_duplicate() {
        let a = make_chunk("the quick brown fox jumps over the lazy dog");
        let b = make_chunk("the quick brown fox jumps over the lazy dog today");
        let result = Retriever::deduplicate(vec![a, b], 0.8);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].chunk.text, "the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn dedup_keeps_both_when_dissimilar() {
        let a = make_chunk("weather forecast for tomorrow");
        let b = make_chunk("quarterly earnings report summary");
        let result = Retriever::deduplicate(vec![a, b], 0.95);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn dedup_is_a_fixed_point() {
        let a = make_chunk("alpha beta gamma");
        let b = make_chunk("delta epsilon zeta");
        let once = Retriever::deduplicate(vec![a.clone_for_test(), b.clone_for_test()], 0.95);
        let twice = Retriever::deduplicate(once.clone(), 0.95);
        assert_eq!(once.len(), twice.len());
    }

    impl ScoredChunk {
        fn clone_for_test(&self) -> Self {
            ScoredChunk {
                chunk: self.chunk.clone(),
                score: self.score,
                vector_score: self.vector_score,
                keyword_score: self.keyword_score,
            }
        }
    }
}
