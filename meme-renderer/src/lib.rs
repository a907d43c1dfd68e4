//! # Meme Viber Renderer
//!
//! Composites a board (background, elements in paint order, watermark) into
//! a raster image. Live preview and final export share one composition
//! routine so that what is seen is what is exported.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//! │ RenderScene │──▶│ compose (SVG)│──▶│ usvg + resvg │──▶│ PNG / JPEG│
//! └─────────────┘   └──────────────┘   └──────────────┘   └───────────┘
//!                     + overlay (preview only)
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod compose;
pub mod error;
pub mod export;
pub mod watermark;

use std::sync::Arc;

pub use compose::{output_dimensions, RenderPass, RenderScene};
pub use error::{RenderError, RenderResult};
pub use export::{ExportArtifact, ExportFormat, DEFAULT_JPEG_QUALITY};
pub use tiny_skia::Pixmap;
pub use watermark::{Watermark, DEFAULT_LABEL};

use watermark::ResolvedWatermark;

/// Configuration for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Output pixels per board unit.
    pub device_pixel_ratio: f32,
    /// Branding overlay.
    pub watermark: Watermark,
    /// Load the host's installed fonts for text and emoji.
    pub load_system_fonts: bool,
    /// JPEG quality 1-100.
    pub jpeg_quality: u8,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            device_pixel_ratio: 1.0,
            watermark: Watermark::default(),
            load_system_fonts: true,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Renders boards for preview and export.
pub struct Renderer {
    config: RendererConfig,
    watermark: ResolvedWatermark,
    fontdb: Arc<usvg::fontdb::Database>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("config", &self.config)
            .field("watermark", &self.watermark)
            .field("font_faces", &self.fontdb.len())
            .finish()
    }
}

impl Renderer {
    /// Create a renderer. Loads the watermark image and, if configured, the
    /// system font database once.
    #[must_use]
    pub fn new(mut config: RendererConfig) -> Self {
        if !(config.device_pixel_ratio.is_finite() && config.device_pixel_ratio > 0.0) {
            tracing::warn!(
                dpr = config.device_pixel_ratio,
                "Invalid device pixel ratio, using 1.0"
            );
            config.device_pixel_ratio = 1.0;
        }

        let mut fontdb = usvg::fontdb::Database::new();
        if config.load_system_fonts {
            fontdb.load_system_fonts();
        }
        tracing::debug!(faces = fontdb.len(), "Font database ready");

        Self {
            watermark: ResolvedWatermark::resolve(&config.watermark),
            fontdb: Arc::new(fontdb),
            config,
        }
    }

    /// Get the renderer configuration.
    #[must_use]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Output size for a scene, in pixels.
    #[must_use]
    pub fn output_size(&self, scene: &RenderScene<'_>) -> (u32, u32) {
        output_dimensions(scene.board, self.config.device_pixel_ratio)
    }

    /// Compose the scene as SVG for the given pass.
    #[must_use]
    pub fn compose_svg(&self, scene: &RenderScene<'_>, pass: RenderPass) -> String {
        compose::compose(
            scene,
            pass,
            self.config.device_pixel_ratio,
            &self.watermark,
        )
    }

    /// Render the live preview, including the selection overlay.
    ///
    /// # Errors
    ///
    /// Returns an error if the composed SVG cannot be rasterized.
    pub fn preview(&self, scene: &RenderScene<'_>) -> RenderResult<Pixmap> {
        let svg = self.compose_svg(scene, RenderPass::Preview);
        export::rasterize_svg(&svg, &self.fontdb)
    }

    /// Render and encode the final image. The selection overlay is never
    /// included.
    ///
    /// # Errors
    ///
    /// Returns an error if rasterization or encoding fails.
    pub fn export(
        &self,
        scene: &RenderScene<'_>,
        format: ExportFormat,
    ) -> RenderResult<ExportArtifact> {
        let svg = self.compose_svg(scene, RenderPass::Export);
        let pixmap = export::rasterize_svg(&svg, &self.fontdb)?;
        let artifact = export::encode(&pixmap, format, self.config.jpeg_quality)?;
        tracing::info!(
            width = artifact.width,
            height = artifact.height,
            format = format.extension(),
            bytes = artifact.bytes.len(),
            elements = scene.elements.len(),
            "Exported board"
        );
        Ok(artifact)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

/// Renderer library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
