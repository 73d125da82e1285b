use std::path::Path;

use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use nllb_serve::config::Settings;
use nllb_serve::nllb::TranslationEngine;
use nllb_serve::server::ApiServer;

/// Main entry point for the nllb-serve application
///
/// Loads settings, initializes logging, loads the pretrained translation
/// model exactly once, then starts the HTTP server. A model or tokenizer
/// load failure is fatal: the process exits before the listener is bound.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load settings first
    let settings = Settings::new()?;

    // Initialize the subscriber before any file operations
    let log_dir = settings
        .logging
        .file
        .as_deref()
        .unwrap_or_else(|| Path::new("logs"));
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::RollingFileAppender::new(
        tracing_appender::rolling::Rotation::DAILY,
        log_dir,
        "nllb-serve",
    );
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.clone()));

    tracing_subscriber::registry()
        .with(filter)
        // Console output plus a daily rolling log file
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                // Disable ANSI colors for cleaner log files
                .with_ansi(false)
                .with_target(false),
        )
        .init();

    info!("nllb-serve starting up...");
    info!("Log directory: {}", log_dir.display());

    // One-time, blocking model load; fatal on failure.
    let engine = TranslationEngine::load(&settings)?;

    // Create and start server
    let server = ApiServer::new(engine, settings.server.host.clone(), settings.server.port);
    server.start().await
}
