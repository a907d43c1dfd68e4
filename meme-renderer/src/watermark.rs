//! Branding overlay composited into every rendered board.
//!
//! The watermark is not part of the element store and cannot be selected or
//! edited. It is either a text label or an image embedded as a data URI.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use base64::Engine;

use crate::compose::escape_xml;
use crate::error::{RenderError, RenderResult};

/// Default label text.
pub const DEFAULT_LABEL: &str = "MEME VIBER";

/// Label inset from the left and bottom edges.
const LABEL_INSET: f32 = 10.0;
/// Label font size.
const LABEL_FONT_SIZE: f32 = 12.0;
/// Label fill opacity.
const LABEL_OPACITY: f32 = 0.6;

/// Image watermark box.
const IMAGE_WIDTH: f32 = 140.0;
const IMAGE_HEIGHT: f32 = 40.0;
const IMAGE_LEFT: f32 = 12.0;
/// Distance from the bottom edge to the image's top edge.
const IMAGE_BOTTOM_OFFSET: f32 = 50.0;
const IMAGE_OPACITY: f32 = 0.8;

/// Watermark configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Watermark {
    /// Bold white text at the bottom-left corner.
    Label(String),
    /// A PNG or JPEG file drawn near the bottom-left corner.
    Image(PathBuf),
}

impl Default for Watermark {
    fn default() -> Self {
        Self::Label(DEFAULT_LABEL.to_string())
    }
}

/// A watermark ready to be written into SVG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ResolvedWatermark {
    Label(String),
    Image { data_uri: String },
}

impl ResolvedWatermark {
    /// Load the configured watermark. An unreadable image falls back to the
    /// default label.
    pub(crate) fn resolve(watermark: &Watermark) -> Self {
        match watermark {
            Watermark::Label(text) => Self::Label(text.clone()),
            Watermark::Image(path) => match load_data_uri(path) {
                Ok(data_uri) => {
                    tracing::debug!(path = %path.display(), "Loaded watermark image");
                    Self::Image { data_uri }
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Watermark image unavailable, using label"
                    );
                    Self::Label(DEFAULT_LABEL.to_string())
                }
            },
        }
    }

    /// Append the watermark for a board `board_height` units tall.
    pub(crate) fn write_svg(&self, svg: &mut String, board_height: f32) {
        match self {
            Self::Label(text) => {
                let y = board_height - LABEL_INSET;
                let _ = write!(
                    svg,
                    "<text x=\"{LABEL_INSET}\" y=\"{y}\" font-family=\"Arial, sans-serif\" font-size=\"{LABEL_FONT_SIZE}\" font-weight=\"bold\" fill=\"#ffffff\" fill-opacity=\"{LABEL_OPACITY}\">{}</text>",
                    escape_xml(text),
                );
            }
            Self::Image { data_uri } => {
                let y = board_height - IMAGE_BOTTOM_OFFSET;
                let _ = write!(
                    svg,
                    "<image x=\"{IMAGE_LEFT}\" y=\"{y}\" width=\"{IMAGE_WIDTH}\" height=\"{IMAGE_HEIGHT}\" opacity=\"{IMAGE_OPACITY}\" preserveAspectRatio=\"xMidYMid meet\" xlink:href=\"{data_uri}\"/>",
                );
            }
        }
    }
}

/// Read an image file and encode it as a base64 data URI.
fn load_data_uri(path: &Path) -> RenderResult<String> {
    let bytes = std::fs::read(path).map_err(|e| RenderError::Watermark(e.to_string()))?;
    let mime = match image::guess_format(&bytes) {
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        Ok(other) => {
            return Err(RenderError::Watermark(format!(
                "unsupported image format {other:?}"
            )))
        }
        Err(e) => return Err(RenderError::Watermark(e.to_string())),
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(format!("data:{mime};base64,{encoded}"))
}
