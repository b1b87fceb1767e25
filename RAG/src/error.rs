use thiserror::Error;

/// Structured error taxonomy shared by every component of the pipeline.
///
/// Upstream-facing variants carry enough context (component, operation,
/// status) for the API layer to map them to HTTP responses in one place
/// instead of re-deriving the mapping per handler.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("config error: {0}")]
    Config(String),

    #[error("DMS error during {operation} (status {status:?}): {cause}")]
    UpstreamDms {
        operation: String,
        status: Option<u16>,
        cause: String,
    },

    #[error("vector store error during {operation} (status {status:?}): {cause}")]
    UpstreamVector {
        operation: String,
        status: Option<u16>,
        cause: String,
    },

    #[error("LLM error during {operation} (status {status:?}): {cause}")]
    UpstreamLlm {
        operation: String,
        status: Option<u16>,
        cause: String,
    },

    #[error("embedding service error during {operation} (status {status:?}): {cause}")]
    UpstreamEmbedding {
        operation: String,
        status: Option<u16>,
        cause: String,
    },

    #[error("extraction error for {filename}: {cause}")]
    Extraction { filename: String, cause: String },

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub fn component(&self) -> &'static str {
        match self {
            RagError::Config(_) => "config",
            RagError::UpstreamDms { .. } => "dms",
            RagError::UpstreamVector { .. } => "vector_store",
            RagError::UpstreamLlm { .. } => "llm",
            RagError::UpstreamEmbedding { .. } => "embedder",
            RagError::Extraction { .. } => "extractor",
            RagError::Embedding(_) => "embedder",
            RagError::NotFound(_) => "not_found",
            RagError::BadRequest(_) => "bad_request",
            RagError::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
