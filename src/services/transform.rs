use crate::config::WorkerConfig;
use crate::error::TransformError;
use anyhow::Context;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use rusttype::{Font, Scale};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Probed in order when no explicit font path is configured.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Bold.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSansBold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
];

const WATERMARK_SCALE: f32 = 18.0;
const WATERMARK_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);

/// Text stamp drawn into the watermarked rendition. Owns the loaded font;
/// built once at startup and reused across invocations.
pub struct Watermark {
    font: Font<'static>,
    text: String,
    scale: Scale,
    color: Rgba<u8>,
}

impl Watermark {
    pub fn new(font_data: Vec<u8>, text: impl Into<String>) -> Result<Self, TransformError> {
        let font = Font::try_from_vec(font_data)
            .ok_or_else(|| TransformError::Font("font data is not a usable TTF".to_string()))?;
        Ok(Self {
            font,
            text: text.into(),
            scale: Scale::uniform(WATERMARK_SCALE),
            color: WATERMARK_COLOR,
        })
    }

    /// Resolve and load the watermark font. A missing font is a startup
    /// configuration error, not a per-message one.
    pub fn from_config(config: &WorkerConfig) -> anyhow::Result<Self> {
        let path = resolve_font_path(config.watermark_font.as_deref())
            .context("no watermark font found; set WATERMARK_FONT to a .ttf path")?;
        let data = std::fs::read(&path)
            .with_context(|| format!("failed to read watermark font {}", path.display()))?;
        Ok(Self::new(data, config.watermark_text.clone())?)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Measured pixel size of the rendered text.
    pub fn text_extent(&self) -> (i32, i32) {
        text_size(self.scale, &self.font, &self.text)
    }
}

/// First existing font path: the explicit override if given, otherwise the
/// candidate list.
pub fn resolve_font_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => FONT_CANDIDATES.iter().map(PathBuf::from).find(|p| p.exists()),
    }
}

/// Proportionally fit `source` within the bounding box, re-encode at the
/// requested format and quality, and decode the result back so callers work
/// with exactly what the encoder produced. The box is always applied as-is;
/// sources smaller than it are scaled up.
pub fn resize_to_bounds(
    source: &DynamicImage,
    max_width: u32,
    max_height: u32,
    format: ImageFormat,
    quality: u8,
) -> Result<DynamicImage, TransformError> {
    let resized = source.resize(max_width, max_height, FilterType::Lanczos3);
    let encoded = encode(&resized, format, quality)?;
    Ok(image::load_from_memory(&encoded)?)
}

/// Encode an image, applying `quality` for lossy formats. JPEG cannot carry
/// an alpha channel, so sources are flattened to RGB first.
pub fn encode(
    image: &DynamicImage,
    format: ImageFormat,
    quality: u8,
) -> Result<Vec<u8>, TransformError> {
    let mut buffer = Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg => {
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
            encoder.encode_image(&image.to_rgb8())?;
        }
        _ => image.write_to(&mut buffer, format)?,
    }
    Ok(buffer.into_inner())
}

/// Draw the watermark text so its rendered box sits flush with the image's
/// bottom-right corner. The anchor comes from the measured text dimensions
/// in the loaded font, not a fixed offset, so it holds for any text length.
pub fn annotate_bottom_right(image: &mut RgbaImage, watermark: &Watermark) {
    let (text_width, text_height) = watermark.text_extent();
    let x = image.width() as i32 - text_width;
    let y = image.height() as i32 - text_height;
    draw_text_mut(
        image,
        watermark.color,
        x,
        y,
        watermark.scale,
        &watermark.font,
        &watermark.text,
    );
}
