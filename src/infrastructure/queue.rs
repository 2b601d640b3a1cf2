use std::env;
use tracing::info;

/// Build the SQS client from the ambient AWS environment. `SQS_ENDPOINT`
/// points the client at a local queue emulator.
pub async fn setup_queue() -> aws_sdk_sqs::Client {
    let mut loader = aws_config::from_env();
    if let Ok(endpoint) = env::var("SQS_ENDPOINT") {
        info!("📬 SQS endpoint override: {}", endpoint);
        loader = loader.endpoint_url(endpoint);
    }
    let aws_config = loader.load().await;

    aws_sdk_sqs::Client::new(&aws_config)
}
