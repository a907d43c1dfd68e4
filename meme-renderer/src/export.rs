//! Rasterization and encoding.
//!
//! The composed SVG is parsed by `usvg`, drawn into a `tiny-skia` pixmap by
//! `resvg`, then encoded as PNG or JPEG.

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use image::ImageEncoder;

use crate::error::{RenderError, RenderResult};

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// PNG image.
    #[default]
    Png,
    /// JPEG image, flattened onto white.
    Jpeg,
}

impl ExportFormat {
    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    /// MIME type.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            other => Err(format!("unsupported export format: {other}")),
        }
    }
}

/// An encoded image ready for download or sharing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Encoding used.
    pub format: ExportFormat,
}

impl ExportArtifact {
    /// `meme-<unix-millis>.<ext>` for the given timestamp.
    #[must_use]
    pub fn file_name_at(&self, unix_millis: u128) -> String {
        format!("meme-{unix_millis}.{}", self.format.extension())
    }

    /// `meme-<unix-millis>.<ext>` for the current time.
    #[must_use]
    pub fn default_file_name(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        self.file_name_at(millis)
    }

    /// Write the bytes to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> RenderResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.bytes)?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "Wrote export");
        Ok(())
    }
}

/// Rasterize an SVG string to a tiny-skia Pixmap.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn rasterize_svg(
    svg: &str,
    fontdb: &Arc<usvg::fontdb::Database>,
) -> RenderResult<tiny_skia::Pixmap> {
    let options = usvg::Options {
        fontdb: Arc::clone(fontdb),
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_str(svg, &options).map_err(|e| RenderError::Svg(e.to_string()))?;

    let width = (tree.size().width().round() as u32).max(1);
    let height = (tree.size().height().round() as u32).max(1);
    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(RenderError::Pixmap { width, height })?;

    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());
    Ok(pixmap)
}

/// Encode a pixmap in the requested format.
pub(crate) fn encode(
    pixmap: &tiny_skia::Pixmap,
    format: ExportFormat,
    jpeg_quality: u8,
) -> RenderResult<ExportArtifact> {
    let bytes = match format {
        ExportFormat::Png => pixmap.encode_png().map_err(|e| RenderError::Encode {
            format: format.name(),
            message: e.to_string(),
        })?,
        ExportFormat::Jpeg => encode_jpeg(pixmap, jpeg_quality)?,
    };
    Ok(ExportArtifact {
        bytes,
        width: pixmap.width(),
        height: pixmap.height(),
        format,
    })
}

/// Flatten the (premultiplied) pixmap onto white and encode as JPEG.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn encode_jpeg(pixmap: &tiny_skia::Pixmap, quality: u8) -> RenderResult<Vec<u8>> {
    let (width, height) = (pixmap.width(), pixmap.height());
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for pixel in pixmap.data().chunks_exact(4) {
        let uncovered = 1.0 - f32::from(pixel[3]) / 255.0;
        for channel in &pixel[..3] {
            rgb.push(255.0_f32.mul_add(uncovered, f32::from(*channel)).round().min(255.0) as u8);
        }
    }

    let mut buf = std::io::Cursor::new(Vec::new());
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .write_image(&rgb, width, height, image::ColorType::Rgb8.into())
        .map_err(|e| RenderError::Encode {
            format: ExportFormat::Jpeg.name(),
            message: e.to_string(),
        })?;
    Ok(buf.into_inner())
}
