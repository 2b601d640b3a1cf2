use dotenvy::dotenv;
use rendition_worker::config::WorkerConfig;
use rendition_worker::infrastructure::{queue, storage};
use rendition_worker::services::processor::RenditionProcessor;
use rendition_worker::services::renditions::{RenditionGenerator, default_policy};
use rendition_worker::services::transform::Watermark;
use rendition_worker::services::worker::QueueWorker;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rendition_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting rendition worker...");

    let config = Arc::new(WorkerConfig::from_env());
    info!(
        "🪣  Output bucket: {} (scratch: {}, delay: {:?})",
        config.output_bucket,
        config.scratch_dir.display(),
        config.processing_delay
    );

    let store = storage::setup_storage().await;
    let sqs = queue::setup_queue().await;

    let watermark = Watermark::from_config(&config)?;
    info!("🖋️  Watermark text: {}", watermark.text());

    let generator = RenditionGenerator::new(default_policy(), config.encode_quality, Some(watermark));
    let processor = Arc::new(RenditionProcessor::new(store, config.clone(), generator));

    // Setup Shutdown Channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let worker = QueueWorker::new(sqs, config.queue_url.clone(), processor, shutdown_rx);
    let handle = tokio::spawn(worker.run());

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);
    handle.await?;

    info!("🛑 Worker shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
