//! Host error types.

use meme_core::CoreError;
use meme_renderer::RenderError;
use thiserror::Error;

/// Result type for host operations.
pub type AppResult<T> = Result<T, AppError>;

/// Errors surfaced by the host commands.
#[derive(Debug, Error)]
pub enum AppError {
    /// Export refused because no caption has any text.
    #[error("nothing to share yet: add some text first (or pass --force)")]
    NothingToShare,

    /// An event script could not be parsed.
    #[error("invalid event script: {0}")]
    Script(#[from] serde_json::Error),

    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Editor persistence failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Rendering or encoding failed.
    #[error(transparent)]
    Render(#[from] RenderError),
}
