use crate::error::{RagError, Result};

/// Process-wide settings, loaded once from the environment at startup.
///
/// Loading is fail-fast: a missing required variable or a malformed
/// numeric one aborts before any network connection is attempted.
#[derive(Debug, Clone)]
pub struct Config {
    pub paperless_base_url: String,
    pub paperless_api_token: String,

    pub openrouter_api_key: String,
    pub openrouter_model: String,

    pub qdrant_url: String,

    pub embedding_model: String,
    pub embedding_service_url: String,

    pub rag_top_k: usize,
    pub chunk_tokens: usize,
    pub chunk_overlap: usize,
    pub max_snippets_tokens: usize,
    pub ingest_concurrency: usize,

    pub server_host: String,
    pub server_port: u16,
    pub allowed_origins: Vec<String>,

    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            paperless_base_url: trim_trailing_slash(&required("PAPERLESS_BASE_URL")?),
            paperless_api_token: required("PAPERLESS_API_TOKEN")?,

            openrouter_api_key: required("OPENROUTER_API_KEY")?,
            openrouter_model: optional("OPENROUTER_MODEL", "openai/gpt-4o-mini"),

            qdrant_url: optional("QDRANT_URL", "http://qdrant:6333"),

            embedding_model: optional("EMBEDDING_MODEL", "BAAI/bge-m3"),
            embedding_service_url: optional("EMBEDDING_SERVICE_URL", "http://embedder:8080"),

            rag_top_k: optional_parsed("RAG_TOP_K", 6)?,
            chunk_tokens: optional_parsed("CHUNK_TOKENS", 800)?,
            chunk_overlap: optional_parsed("CHUNK_OVERLAP", 120)?,
            max_snippets_tokens: optional_parsed("MAX_SNIPPETS_TOKENS", 2500)?,
            ingest_concurrency: optional_parsed("INGEST_CONCURRENCY", 1)?,

            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional_parsed("SERVER_PORT", 8088)?,
            allowed_origins: parse_origins(&optional("ALLOWED_ORIGINS", "")),

            log_level: optional("LOG_LEVEL", "INFO"),
        })
    }
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| RagError::Config(format!("missing required env var {key}")))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| RagError::Config(format!("invalid value for {key}: {raw}"))),
        Err(_) => Ok(default),
    }
}

fn trim_trailing_slash(s: &str) -> String {
    s.trim_end_matches('/').to_string()
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        assert_eq!(trim_trailing_slash("http://x/"), "http://x");
        assert_eq!(trim_trailing_slash("http://x"), "http://x");
    }

    #[test]
    fn parses_comma_separated_origins() {
        assert_eq!(
            parse_origins("http://a, http://b ,,http://c"),
            vec!["http://a", "http://b", "http://c"]
        );
        assert!(parse_origins("").is_empty());
    }
}
