//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while composing, rasterizing or encoding a board.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The composed SVG could not be parsed.
    #[error("SVG parsing failed: {0}")]
    Svg(String),

    /// The target pixmap could not be allocated.
    #[error("Failed to create {width}x{height} pixmap")]
    Pixmap {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },

    /// PNG or JPEG encoding failed.
    #[error("{format} encoding failed: {message}")]
    Encode {
        /// Name of the output format.
        format: &'static str,
        /// Encoder message.
        message: String,
    },

    /// A watermark image could not be loaded.
    #[error("Failed to load watermark: {0}")]
    Watermark(String),

    /// Writing an artifact to disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
