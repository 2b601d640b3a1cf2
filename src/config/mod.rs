use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Destination bucket for generated renditions (required).
    pub output_bucket: String,

    /// URL of the queue carrying storage notifications (required).
    pub queue_url: String,

    /// Root of the local scratch area (default: /tmp). Each invocation
    /// works inside its own subdirectory of this root.
    pub scratch_dir: PathBuf,

    /// Extension assumed when the object key carries none (default: png).
    pub default_extension: String,

    /// Encode quality for lossy rendition formats, 0-100 (default: 90).
    pub encode_quality: u8,

    /// Pause at the start of each invocation so a backlog can build up on
    /// the queue for observation. Intentional throttling, not a correctness
    /// requirement; 0 disables it.
    pub processing_delay: Duration,

    /// Text drawn into the watermarked rendition.
    pub watermark_text: String,

    /// Explicit watermark font path. When unset, a list of common system
    /// font locations is probed at startup.
    pub watermark_font: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            output_bucket: String::new(),
            queue_url: String::new(),
            scratch_dir: PathBuf::from("/tmp"),
            default_extension: "png".to_string(),
            encode_quality: 90,
            processing_delay: Duration::from_secs(5),
            watermark_text: "NewTextSigned".to_string(),
            watermark_font: None,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables. The two required
    /// values have no sensible fallback; their absence is a startup error.
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            output_bucket: env::var("OUTPUT_BUCKET").expect("OUTPUT_BUCKET must be set"),

            queue_url: env::var("QUEUE_URL").expect("QUEUE_URL must be set"),

            scratch_dir: env::var("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.scratch_dir),

            default_extension: env::var("DEFAULT_EXTENSION").unwrap_or(default.default_extension),

            encode_quality: env::var("ENCODE_QUALITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.encode_quality),

            processing_delay: env::var("PROCESSING_DELAY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.processing_delay),

            watermark_text: env::var("WATERMARK_TEXT").unwrap_or(default.watermark_text),

            watermark_font: env::var("WATERMARK_FONT").ok().map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkerConfig::default();
        assert_eq!(config.scratch_dir, PathBuf::from("/tmp"));
        assert_eq!(config.default_extension, "png");
        assert_eq!(config.encode_quality, 90);
        assert_eq!(config.processing_delay, Duration::from_secs(5));
        assert_eq!(config.watermark_text, "NewTextSigned");
        assert!(config.watermark_font.is_none());
    }
}
