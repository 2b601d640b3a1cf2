use crate::config::WorkerConfig;
use crate::error::{PipelineError, StorageError};
use crate::models::S3EventNotification;
use crate::services::renditions::{Rendition, RenditionGenerator};
use crate::services::staging::StagingArea;
use crate::services::storage::ObjectStore;
use crate::utils::object_key::decompose;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Per-upload result collected by the fan-out, so outcomes are enumerable
/// instead of only visible in the logs.
#[derive(Debug)]
pub struct UploadOutcome {
    pub file_name: String,
    pub key: String,
    pub result: Result<(), StorageError>,
}

/// Result of one pipeline invocation that reached the upload stage. Upload
/// failures are recorded here; they never abort the invocation.
#[derive(Debug)]
pub struct InvocationOutcome {
    pub uploads: Vec<UploadOutcome>,
}

impl InvocationOutcome {
    pub fn uploaded(&self) -> usize {
        self.uploads.iter().filter(|u| u.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.uploads.len() - self.uploaded()
    }
}

/// Top-level entry for one notification payload, and the per-record
/// pipeline behind it: fetch → generate → upload fan-out → cleanup.
pub struct RenditionProcessor {
    store: Arc<dyn ObjectStore>,
    config: Arc<WorkerConfig>,
    generator: RenditionGenerator,
}

impl RenditionProcessor {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        config: Arc<WorkerConfig>,
        generator: RenditionGenerator,
    ) -> Self {
        Self {
            store,
            config,
            generator,
        }
    }

    /// Parse one notification payload and run the pipeline for each record
    /// in turn. A record's failure is logged and contained so the remaining
    /// records still run; only an unparseable payload fails the whole call.
    pub async fn dispatch(&self, payload: &str) -> Result<(), PipelineError> {
        let notification: S3EventNotification = serde_json::from_str(payload)?;

        for record in &notification.records {
            let bucket = &record.s3.bucket.name;
            let key = &record.s3.object.key;
            match self.process_record(bucket, key).await {
                Ok(outcome) => info!(
                    bucket = %bucket,
                    key = %key,
                    uploaded = outcome.uploaded(),
                    failed = outcome.failed(),
                    "record processed"
                ),
                Err(e) => error!(bucket = %bucket, key = %key, error = %e, "record processing failed"),
            }
        }

        Ok(())
    }

    /// Run the full pipeline for one source object. Aborts on fetch or
    /// transform failure; upload failures are isolated per rendition and
    /// the invocation still completes.
    pub async fn process_record(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<InvocationOutcome, PipelineError> {
        if !self.config.processing_delay.is_zero() {
            // Intentional throttling: lets a backlog build up on the queue.
            tokio::time::sleep(self.config.processing_delay).await;
        }

        let descriptor = decompose(key);
        let extension = descriptor
            .extension
            .clone()
            .unwrap_or_else(|| self.config.default_extension.clone());

        let staging = StagingArea::create(&self.config.scratch_dir)
            .await
            .map_err(|source| PipelineError::Fetch {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source,
            })?;

        let staged = match staging
            .stage(self.store.as_ref(), bucket, key, &descriptor.base_name)
            .await
        {
            Ok(staged) => staged,
            Err(source) => {
                staging.finish().await;
                return Err(PipelineError::Fetch {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    source,
                });
            }
        };

        let renditions = match self
            .generator
            .generate(staged.path(), &descriptor.base_name, &extension, staging.dir())
            .await
        {
            Ok(renditions) => renditions,
            Err(source) => {
                staged.release().await;
                staging.finish().await;
                return Err(PipelineError::Transform {
                    name: descriptor.base_name,
                    source,
                });
            }
        };

        let uploads = self
            .upload_renditions(renditions, descriptor.directory_path.as_deref())
            .await;

        staged.release().await;
        staging.finish().await;

        Ok(InvocationOutcome { uploads })
    }

    /// Push every rendition concurrently and join them all; the staged
    /// source may only be deleted after this returns. A failed upload keeps
    /// its local file for inspection and never stops the siblings.
    async fn upload_renditions(
        &self,
        renditions: Vec<Rendition>,
        directory_path: Option<&str>,
    ) -> Vec<UploadOutcome> {
        let uploads = renditions.into_iter().map(|rendition| {
            let key = match directory_path {
                Some(dir) => format!("{}/{}", dir, rendition.file_name),
                None => rendition.file_name.clone(),
            };
            async move {
                let result = self.upload_one(&rendition, &key).await;
                match &result {
                    Ok(()) => info!(key = %key, "rendition uploaded"),
                    Err(e) => error!(
                        key = %key,
                        path = %rendition.path.display(),
                        error = %e,
                        "rendition upload failed, local copy kept"
                    ),
                }
                UploadOutcome {
                    file_name: rendition.file_name,
                    key,
                    result,
                }
            }
        });

        futures::future::join_all(uploads).await
    }

    async fn upload_one(&self, rendition: &Rendition, key: &str) -> Result<(), StorageError> {
        let data = tokio::fs::read(&rendition.path).await?;
        self.store
            .put_object(&self.config.output_bucket, key, data)
            .await?;
        if let Err(e) = tokio::fs::remove_file(&rendition.path).await {
            warn!(path = %rendition.path.display(), error = %e, "failed to remove uploaded rendition");
        }
        Ok(())
    }
}
