use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use rag_core::{AskRequest, AskResponse, DocumentInfo, HealthResponse, IngestRequest, IngestResponse, IngestStatus};

use crate::error::ApiError;
use crate::AppState;

pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "service": "document rag api",
        "endpoints": ["/health", "/ask", "/ingest", "/documents", "/stats"],
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let mut components = BTreeMap::new();

    components.insert(
        "vector_store".to_string(),
        match state.rag.vector_store.get_collection_stats().await {
            Ok(_) => "healthy".to_string(),
            Err(e) => format!("error: {}", truncate_error(&e.to_string())),
        },
    );

    components.insert(
        "embedding_model".to_string(),
        match state.rag.embedder.encode(&["test".to_string()]).await {
            Ok(_) => "healthy".to_string(),
            Err(e) => format!("error: {}", truncate_error(&e.to_string())),
        },
    );

    components.insert(
        "dms".to_string(),
        match state.rag.dms.test_connection().await {
            Ok(_) => "healthy".to_string(),
            Err(e) => format!("error: {}", truncate_error(&e.to_string())),
        },
    );

    components.insert(
        "llm".to_string(),
        match state.rag.llm.test_connection().await {
            Ok(_) => "healthy".to_string(),
            Err(e) => format!("error: {}", truncate_error(&e.to_string())),
        },
    );

    let overall = if components.values().all(|v| v == "healthy") {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: overall.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        components,
    })
}

fn truncate_error(s: &str) -> String {
    if s.chars().count() > 100 {
        s.chars().take(100).collect()
    } else {
        s.to_string()
    }
}

pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let response = state.rag.answer_service.ask(request).await?;
    Ok(Json(response))
}

pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    log::info!(
        "ingest request: doc_id={:?}, force_reindex={}",
        request.doc_id,
        request.force_reindex
    );

    if let Some(doc_id) = request.doc_id {
        let result = state.rag.ingestor.ingest_one(doc_id, request.force_reindex).await;
        return match result.status {
            IngestStatus::Success => Ok(Json(IngestResponse {
                message: format!("Successfully ingested document {doc_id}"),
                documents_processed: 1,
                chunks_created: result.chunks_created,
            })),
            IngestStatus::Skipped => Ok(Json(IngestResponse {
                message: format!(
                    "Document {doc_id} skipped: {}",
                    result.reason.unwrap_or_default()
                ),
                documents_processed: 0,
                chunks_created: 0,
            })),
            IngestStatus::Failed | IngestStatus::Error => Err(rag_core::RagError::BadRequest(format!(
                "failed to ingest document {doc_id}: {}",
                result.error.or(result.reason).unwrap_or_else(|| "unknown error".to_string())
            ))
            .into()),
        };
    }

    let ingestor = state.rag.ingestor.clone();
    let updated_after = request.updated_after;
    let force_reindex = request.force_reindex;
    tokio::spawn(async move {
        ingestor.ingest_all(updated_after, force_reindex).await;
    });

    Ok(Json(IngestResponse {
        message: "Started background ingestion of documents".to_string(),
        documents_processed: 0,
        chunks_created: 0,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DocumentsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DocumentsQuery>,
) -> Result<Json<Vec<DocumentInfo>>, ApiError> {
    let page_size = query.limit;
    let page = (query.offset / page_size.max(1)) + 1;
    let listed = state
        .rag
        .dms
        .list_documents(None, page_size, page, "-created")
        .await?;

    Ok(Json(listed.documents.into_iter().map(DocumentInfo::from).collect()))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(doc_id): Path<i64>,
) -> Result<Json<DocumentInfo>, ApiError> {
    let doc = state.rag.dms.get_document(doc_id).await?;
    Ok(Json(DocumentInfo::from(doc)))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    10
}

#[derive(Debug, serde::Serialize)]
pub struct SearchResult {
    pub id: i64,
    pub title: String,
    pub url: String,
}

pub async fn search_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let listed = state.rag.dms.list_documents(None, 100, 1, "-created").await?;
    let query_lower = query.q.to_lowercase();

    let mut matches: Vec<SearchResult> = listed
        .documents
        .into_iter()
        .filter(|d| d.title.to_lowercase().contains(&query_lower))
        .map(|d| SearchResult {
            url: state.rag.dms.build_document_url(d.id),
            id: d.id,
            title: d.title,
        })
        .collect();

    matches.sort_by_key(|d| (!d.title.to_lowercase().starts_with(&query_lower), d.title.to_lowercase()));
    matches.truncate(query.limit);

    Ok(Json(matches))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<rag_core::StatsResponse>, ApiError> {
    let collection = state.rag.vector_store.get_collection_stats().await?;

    let documents_count = match state.rag.dms.list_documents(None, 1, 1, "-created").await {
        Ok(listed) => listed.count.to_string(),
        Err(_) => "unknown".to_string(),
    };

    Ok(Json(rag_core::StatsResponse {
        collection,
        documents_count,
        embedding_model: state.rag.config.embedding_model.clone(),
        llm_model: state.rag.config.openrouter_model.clone(),
    }))
}
