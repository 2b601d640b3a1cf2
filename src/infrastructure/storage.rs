use crate::services::storage::S3ObjectStore;
use aws_sdk_s3::config::Region;
use std::env;
use std::sync::Arc;
use tracing::info;

/// Build the S3-backed object store from the ambient AWS environment.
/// `S3_ENDPOINT` switches to a custom endpoint with path-style addressing,
/// for MinIO-style local stacks.
pub async fn setup_storage() -> Arc<S3ObjectStore> {
    let endpoint = env::var("S3_ENDPOINT").ok();

    let mut loader = aws_config::from_env();
    if let Some(endpoint) = &endpoint {
        info!("☁️  S3 endpoint override: {}", endpoint);
        loader = loader.endpoint_url(endpoint);
    }
    if env::var("AWS_REGION").is_err() && env::var("AWS_DEFAULT_REGION").is_err() {
        loader = loader.region(Region::new("us-east-1"));
    }
    let aws_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(endpoint.is_some())
        .build();

    Arc::new(S3ObjectStore::new(aws_sdk_s3::Client::from_conf(s3_config)))
}
