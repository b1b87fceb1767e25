use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::chunker::Chunker;
use crate::config::Config;
use crate::dms_client::DmsClient;
use crate::embedder::Embedder;
use crate::error::Result;
use crate::models::{Chunk, IngestResult, IngestStatus};
use crate::vector_store::{Filter, VectorStore};

/// Drives document ingestion: one document at a time through
/// fetch -> extract -> chunk -> embed -> upsert, with idempotency against
/// the `(doc_id, page, chunk_index)` identity scheme.
pub struct Ingestor {
    dms: Arc<DmsClient>,
    vector_store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    extractor: crate::extractor::Extractor,
    chunker: Chunker,
    chunk_tokens: usize,
    chunk_overlap: usize,
    concurrency: usize,
}

impl Ingestor {
    pub fn new(
        dms: Arc<DmsClient>,
        vector_store: Arc<VectorStore>,
        embedder: Arc<dyn Embedder>,
        config: &Config,
    ) -> Self {
        Ingestor {
            dms,
            vector_store,
            embedder,
            extractor: crate::extractor::Extractor::new(),
            chunker: Chunker::new(),
            chunk_tokens: config.chunk_tokens,
            chunk_overlap: config.chunk_overlap,
            concurrency: config.ingest_concurrency.max(1),
        }
    }

    pub async fn ingest_one(&self, doc_id: i64, force_reindex: bool) -> IngestResult {
        match self.ingest_one_inner(doc_id, force_reindex).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("ingest failed for document {doc_id}: {e}");
                IngestResult {
                    doc_id,
                    title: None,
                    status: IngestStatus::Error,
                    chunks_created: 0,
                    pages_processed: None,
                    reason: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn ingest_one_inner(&self, doc_id: i64, force_reindex: bool) -> Result<IngestResult> {
        let doc = self.dms.get_document(doc_id).await?;
        log::info!("ingesting document {doc_id} ('{}')", doc.title);

        if !force_reindex && self.vector_store.exists(Filter::DocId(doc_id)).await? {
            return Ok(IngestResult {
                doc_id,
                title: Some(doc.title),
                status: IngestStatus::Skipped,
                chunks_created: 0,
                pages_processed: None,
                reason: Some("already_exists".to_string()),
                error: None,
            });
        }

        let filename = doc
            .original_filename
            .clone()
            .unwrap_or_else(|| format!("document-{doc_id}"));
        let content = self.dms.download_document(doc_id).await?;
        let pages = self.extractor.extract(&filename, &content)?;

        if pages.is_empty() {
            return Ok(IngestResult {
                doc_id,
                title: Some(doc.title),
                status: IngestStatus::Failed,
                chunks_created: 0,
                pages_processed: Some(0),
                reason: Some("no_text_extracted".to_string()),
                error: None,
            });
        }

        let now = Utc::now();
        let mut all_chunks: Vec<Chunk> = Vec::new();
        let mut chunk_index = 0usize;

        for page in &pages {
            if page.text.trim().is_empty() {
                continue;
            }
            let texts = self.chunker.chunk(&page.text, self.chunk_tokens, self.chunk_overlap);
            for text in texts {
                if text.is_empty() {
                    continue;
                }
                let token_count = self.chunker.count_tokens(&text);
                all_chunks.push(Chunk {
                    text,
                    doc_id,
                    title: doc.title.clone(),
                    page: page.page,
                    file_type: doc.file_type.clone(),
                    tags: doc.tags.clone(),
                    ingested_at: now,
                    token_count,
                    chunk_index,
                    vector: None,
                });
                chunk_index += 1;
            }
        }

        if all_chunks.is_empty() {
            return Ok(IngestResult {
                doc_id,
                title: Some(doc.title),
                status: IngestStatus::Failed,
                chunks_created: 0,
                pages_processed: Some(pages.len()),
                reason: Some("no_chunks_created".to_string()),
                error: None,
            });
        }

        let texts: Vec<String> = all_chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.encode(&texts).await?;
        for (chunk, vector) in all_chunks.iter_mut().zip(vectors.into_iter()) {
            chunk.vector = Some(vector);
        }

        if force_reindex {
            self.vector_store.delete_by_filter(Filter::DocId(doc_id)).await?;
        }

        self.vector_store.upsert(&all_chunks).await?;

        Ok(IngestResult {
            doc_id,
            title: Some(doc.title),
            status: IngestStatus::Success,
            chunks_created: all_chunks.len(),
            pages_processed: Some(pages.len()),
            reason: None,
            error: None,
        })
    }

    /// Pages through the DMS listing and ingests every document found,
    /// continuing past individual document failures. Concurrency is
    /// bounded by `INGEST_CONCURRENCY`; within that bound, delete+upsert
    /// for a single `doc_id` is always serialized by `ingest_one_inner`.
    pub async fn ingest_all(
        &self,
        updated_after: Option<DateTime<Utc>>,
        force_reindex: bool,
    ) -> (usize, usize) {
        let mut documents_processed = 0usize;
        let mut total_chunks = 0usize;
        let mut page = 1usize;

        loop {
            let listed = match self.dms.list_documents(updated_after, 100, page, "-created").await {
                Ok(listed) => listed,
                Err(e) => {
                    log::error!("failed to list documents for batch ingestion: {e}");
                    break;
                }
            };
            if listed.documents.is_empty() {
                break;
            }

            for chunk_of_docs in listed.documents.chunks(self.concurrency) {
                let batch_futures: Vec<_> = chunk_of_docs
                    .iter()
                    .map(|doc| self.ingest_one(doc.id, force_reindex))
                    .collect();
                for result in futures::future::join_all(batch_futures).await {
                    documents_processed += 1;
                    total_chunks += result.chunks_created;
                    log::info!(
                        "batch ingest: doc {} -> {:?} ({} chunks)",
                        result.doc_id,
                        result.status,
                        result.chunks_created
                    );
                }
            }

            page += 1;
        }

        log::info!(
            "batch ingestion complete: {documents_processed} documents processed, {total_chunks} chunks created"
        );
        (documents_processed, total_chunks)
    }
}
