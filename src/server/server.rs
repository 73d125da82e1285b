use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing::info;

use super::routes;
use crate::nllb::TranslationEngine;

/// Builds the application router around the shared engine handle.
pub fn router(engine: Arc<TranslationEngine>) -> Router {
    Router::new()
        .route("/", get(routes::health_check))
        .route("/languages", get(routes::list_languages))
        .route("/translate", post(routes::translate))
        .with_state(engine)
}

/// API Server for handling translation requests
pub struct ApiServer {
    engine: Arc<TranslationEngine>,
    host: String,
    port: u16,
}

impl ApiServer {
    pub fn new(engine: TranslationEngine, host: String, port: u16) -> Self {
        info!("Creating new API server on {}:{}", host, port);
        Self {
            engine: Arc::new(engine),
            host,
            port,
        }
    }

    pub async fn start(&self) -> anyhow::Result<()> {
        let app = router(Arc::clone(&self.engine));

        info!("Starting server on {}:{}", self.host, self.port);
        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;

        info!("Server started successfully");
        axum::serve(listener, app).await?;
        Ok(())
    }
}
