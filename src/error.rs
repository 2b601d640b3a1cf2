use thiserror::Error;

/// Failure kinds surfaced by the object-store capability.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found")]
    NotFound,

    #[error("access denied")]
    AccessDenied,

    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("transient storage failure: {0}")]
    Transient(String),

    #[error("local i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while decoding, transforming or writing an image.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("watermark font unavailable: {0}")]
    Font(String),
}

/// Errors that abort processing. `Deserialization` fails the whole dispatch
/// call; `Fetch` and `Transform` abort a single invocation. Upload failures
/// are not in here: they are isolated per rendition and reported through
/// `UploadOutcome` instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed notification payload: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("failed to fetch s3://{bucket}/{key}: {source}")]
    Fetch {
        bucket: String,
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("failed to generate renditions for {name}: {source}")]
    Transform {
        name: String,
        #[source]
        source: TransformError,
    },
}
