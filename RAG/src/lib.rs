pub mod answer_service;
pub mod chunker;
pub mod config;
pub mod dms_client;
pub mod embedder;
pub mod error;
pub mod extractor;
pub mod ingestor;
pub mod llm_client;
pub mod models;
pub mod retriever;
pub mod vector_store;

pub use answer_service::{AnswerService, GatingPredicate, KeywordGate};
pub use chunker::Chunker;
pub use config::Config;
pub use dms_client::DmsClient;
pub use embedder::{Embedder, HttpEmbedder};
pub use error::{RagError, Result};
pub use extractor::Extractor;
pub use ingestor::Ingestor;
pub use llm_client::LlmClient;
pub use models::*;
pub use retriever::Retriever;
pub use vector_store::VectorStore;

use std::sync::Arc;

/// Wires every component together from a loaded `Config`, performing the
/// startup probe sequence: config -> vector store -> embedder ->
/// ensure_collection are fatal; DMS/LLM probes are soft warnings.
pub struct RagLibrary {
    pub config: Config,
    pub dms: Arc<DmsClient>,
    pub vector_store: Arc<VectorStore>,
    pub embedder: Arc<dyn Embedder>,
    pub llm: Arc<LlmClient>,
    pub ingestor: Arc<Ingestor>,
    pub answer_service: Arc<AnswerService>,
}

impl RagLibrary {
    pub async fn new() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

        let vector_store = Arc::new(VectorStore::new(config.qdrant_url.clone()));
        let embedder: Arc<dyn Embedder> = Arc::new(
            HttpEmbedder::connect(config.embedding_service_url.clone(), config.embedding_model.clone())
                .await
                .map_err(|e| anyhow::anyhow!(e))?,
        );
        vector_store
            .ensure_collection(embedder.dimension())
            .await
            .map_err(|e| anyhow::anyhow!(e))?;

        let dms = Arc::new(DmsClient::new(
            config.paperless_base_url.clone(),
            config.paperless_api_token.clone(),
        ));
        let llm = Arc::new(LlmClient::new(config.openrouter_api_key.clone(), config.openrouter_model.clone()));

        if let Err(e) = dms.test_connection().await {
            log::warn!("DMS connectivity probe failed at startup: {e}");
        }
        if let Err(e) = llm.test_connection().await {
            log::warn!("LLM connectivity probe failed at startup: {e}");
        }

        let ingestor = Arc::new(Ingestor::new(dms.clone(), vector_store.clone(), embedder.clone(), &config));

        let retriever = Retriever::new(embedder.clone(), vector_store.clone());
        let answer_service = Arc::new(AnswerService::new(
            retriever,
            llm.clone(),
            dms.clone(),
            config.rag_top_k,
            config.max_snippets_tokens,
        ));

        Ok(RagLibrary {
            config,
            dms,
            vector_store,
            embedder,
            llm,
            ingestor,
            answer_service,
        })
    }
}
