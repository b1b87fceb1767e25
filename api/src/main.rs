mod error;
mod handlers;

use axum::routing::{get, post};
use axum::Router;
use rag_core::RagLibrary;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Shared application state handed to every handler via axum's `State` extractor.
pub struct AppState {
    pub rag: RagLibrary,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let rag = RagLibrary::new().await?;
    let host = rag.config.server_host.clone();
    let port = rag.config.server_port;
    let allowed_origins = rag.config.allowed_origins.clone();

    let state = Arc::new(AppState { rag });

    let cors = build_cors_layer(&allowed_origins);

    let app = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/ask", post(handlers::ask))
        .route("/ingest", post(handlers::ingest))
        .route("/documents", get(handlers::list_documents))
        .route("/documents/search", get(handlers::search_documents))
        .route("/documents/:doc_id", get(handlers::get_document))
        .route("/stats", get(handlers::stats))
        .layer(cors)
        .with_state(state);

    let addr = format!("{host}:{port}");
    log::info!("starting document rag api on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Mirrors the original gateway's permissive-but-credential-less CORS policy:
/// any origin is echoed back, cookies are never sent cross-origin.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<axum::http::HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(false)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
            axum::http::Method::HEAD,
        ])
        .allow_headers(tower_http::cors::Any)
}
