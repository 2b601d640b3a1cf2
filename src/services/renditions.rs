use crate::error::TransformError;
use crate::services::transform::{self, Watermark};
use image::{DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How one rendition is derived from the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenditionKind {
    /// Proportional fit within a bounding box.
    Fit { width: u32, height: u32 },
    /// Source-sized copy with the watermark drawn in.
    Watermark,
}

#[derive(Debug, Clone, Copy)]
pub struct RenditionSpec {
    pub kind: RenditionKind,
    pub suffix: &'static str,
}

/// The fixed rendition set produced for every source image. Entries are
/// independent of each other; order carries no meaning.
pub fn default_policy() -> Vec<RenditionSpec> {
    vec![
        RenditionSpec {
            kind: RenditionKind::Fit {
                width: 100,
                height: 200,
            },
            suffix: "_small",
        },
        RenditionSpec {
            kind: RenditionKind::Fit {
                width: 300,
                height: 500,
            },
            suffix: "_medium",
        },
        RenditionSpec {
            kind: RenditionKind::Fit {
                width: 720,
                height: 1024,
            },
            suffix: "_large",
        },
        RenditionSpec {
            kind: RenditionKind::Watermark,
            suffix: "_text",
        },
    ]
}

/// One generated artifact, sitting in the invocation's staging directory
/// until its upload completes.
#[derive(Debug)]
pub struct Rendition {
    pub file_name: String,
    pub path: PathBuf,
}

pub struct RenditionGenerator {
    policy: Vec<RenditionSpec>,
    quality: u8,
    watermark: Option<Watermark>,
}

impl RenditionGenerator {
    pub fn new(policy: Vec<RenditionSpec>, quality: u8, watermark: Option<Watermark>) -> Self {
        Self {
            policy,
            quality,
            watermark,
        }
    }

    /// Decode the staged source once and derive every rendition in the
    /// policy from that shared buffer. Fails fast: the first failure wins,
    /// and files already written are removed so a partial rendition set
    /// never reaches the uploader.
    pub async fn generate(
        &self,
        source_path: &Path,
        base_name: &str,
        extension: &str,
        out_dir: &Path,
    ) -> Result<Vec<Rendition>, TransformError> {
        let data = tokio::fs::read(source_path).await?;
        // The staged file carries no extension, so decode by content.
        let source = image::load_from_memory(&data)?;
        let format = ImageFormat::from_extension(extension).unwrap_or(ImageFormat::Png);

        let mut renditions: Vec<Rendition> = Vec::with_capacity(self.policy.len());
        for spec in &self.policy {
            let file_name = format!("{}{}.{}", base_name, spec.suffix, extension);
            let path = out_dir.join(&file_name);

            let written = match self.render(&source, spec, format) {
                Ok(bytes) => tokio::fs::write(&path, bytes)
                    .await
                    .map_err(TransformError::from),
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                let _ = tokio::fs::remove_file(&path).await;
                discard(&renditions).await;
                return Err(e);
            }

            debug!(file = %file_name, "rendition written");
            renditions.push(Rendition { file_name, path });
        }

        Ok(renditions)
    }

    fn render(
        &self,
        source: &DynamicImage,
        spec: &RenditionSpec,
        format: ImageFormat,
    ) -> Result<Vec<u8>, TransformError> {
        match spec.kind {
            RenditionKind::Fit { width, height } => {
                let resized =
                    transform::resize_to_bounds(source, width, height, format, self.quality)?;
                transform::encode(&resized, format, self.quality)
            }
            RenditionKind::Watermark => {
                let watermark = self
                    .watermark
                    .as_ref()
                    .ok_or_else(|| TransformError::Font("no watermark configured".to_string()))?;
                // The shared source buffer stays untouched: the text lands
                // on this rendition's own copy.
                let mut canvas = source.to_rgba8();
                transform::annotate_bottom_right(&mut canvas, watermark);
                transform::encode(&DynamicImage::ImageRgba8(canvas), format, self.quality)
            }
        }
    }
}

async fn discard(renditions: &[Rendition]) {
    for rendition in renditions {
        if let Err(e) = tokio::fs::remove_file(&rendition.path).await {
            warn!(path = %rendition.path.display(), error = %e, "failed to remove partial rendition");
        }
    }
}
