//! # Meme Viber Host
//!
//! Headless host for the Meme Viber editor: restores the board from a
//! file-backed slot, replays editing sessions with autosave, exports the
//! board to PNG/JPEG, and submits donations to the payment relay.
//!
//! ## Usage
//!
//! ```bash
//! meme-viber replay session.json --out meme.png
//! meme-viber render --format jpeg
//! meme-viber donate --phone 0712345678 --amount 1000 --name Amina
//! ```
//!
//! ## Configuration
//!
//! Flags override environment variables, which override defaults. See
//! [`CliArgs`] for the full list.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

pub mod error;
pub mod payment;
pub mod session;

pub use error::{AppError, AppResult};
pub use payment::{
    DonateError, DonationFlow, DonationForm, DonationRequest, PaymentClient, PaymentError,
    PaymentResponse, ValidationError,
};
pub use session::{export_board, load_script, parse_script, AutosaveTask, Session};

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use meme_core::store::BoardSize;
use meme_core::{EditorConfig, FileStorage, Persistence};
use meme_renderer::{ExportFormat, RendererConfig, Watermark};

/// Command-line arguments for meme-viber.
#[derive(Debug, Clone, Parser)]
#[command(name = "meme-viber")]
#[command(about = "Meme Viber editor host: replay, export and donate")]
#[command(version)]
pub struct CliArgs {
    /// Directory holding the saved board
    #[arg(long, global = true, env = "MEME_STORAGE_DIR", default_value = ".meme-viber")]
    pub storage_dir: PathBuf,

    /// Storage slot name
    #[arg(
        long,
        global = true,
        env = "MEME_STORAGE_KEY",
        default_value = meme_core::DEFAULT_STORAGE_KEY
    )]
    pub storage_key: String,

    /// Board width in CSS pixels
    #[arg(long, global = true, default_value = "400")]
    pub board_width: f32,

    /// Board height in CSS pixels
    #[arg(long, global = true, default_value = "600")]
    pub board_height: f32,

    /// Output pixels per board pixel
    #[arg(long, global = true, env = "MEME_DPR", default_value = "1.0")]
    pub device_pixel_ratio: f32,

    /// Seconds between autosaves
    #[arg(long, global = true, env = "MEME_AUTOSAVE_SECS", default_value = "10")]
    pub autosave_secs: u64,

    /// Donation relay endpoint
    #[arg(
        long,
        global = true,
        env = "MEME_PAYMENT_ENDPOINT",
        default_value = "http://localhost:3000/api/payment"
    )]
    pub payment_endpoint: String,

    /// Donation request timeout in seconds
    #[arg(long, global = true, default_value = "15")]
    pub payment_timeout_secs: u64,

    /// Watermark label
    #[arg(long, global = true, default_value = meme_renderer::DEFAULT_LABEL)]
    pub watermark_text: String,

    /// Watermark image (PNG or JPEG); replaces the label
    #[arg(long, global = true)]
    pub watermark_image: Option<PathBuf>,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Host subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Export the saved board to an image file
    Render {
        /// Output path (default: meme-<millis>.<ext>)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Image format: png or jpeg
        #[arg(long, default_value = "png")]
        format: ExportFormat,
        /// Export even when no caption has text
        #[arg(long)]
        force: bool,
    },
    /// Apply a JSON array of editor events to the saved board
    Replay {
        /// Event script
        script: PathBuf,
        /// Also export the result to this path
        #[arg(long)]
        out: Option<PathBuf>,
        /// Image format for --out
        #[arg(long, default_value = "png")]
        format: ExportFormat,
    },
    /// Clear the saved board
    Reset,
    /// Send a donation through the payment relay
    Donate {
        /// Mobile-money phone number
        #[arg(long)]
        phone: String,
        /// Whole amount
        #[arg(long)]
        amount: String,
        /// Donor name (default: Donor)
        #[arg(long)]
        name: Option<String>,
    },
}

/// Resolved host configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Directory holding the saved board.
    pub storage_dir: PathBuf,
    /// Storage slot name.
    pub storage_key: String,
    /// Board size.
    pub board: BoardSize,
    /// Output pixels per board pixel.
    pub device_pixel_ratio: f32,
    /// Autosave period.
    pub autosave_every: Duration,
    /// Donation relay endpoint.
    pub payment_endpoint: String,
    /// Donation request timeout.
    pub payment_timeout: Duration,
    /// Watermark.
    pub watermark: Watermark,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(".meme-viber"),
            storage_key: meme_core::DEFAULT_STORAGE_KEY.to_string(),
            board: BoardSize::default(),
            device_pixel_ratio: 1.0,
            autosave_every: Duration::from_secs(10),
            payment_endpoint: "http://localhost:3000/api/payment".to_string(),
            payment_timeout: payment::DEFAULT_PAYMENT_TIMEOUT,
            watermark: Watermark::default(),
        }
    }
}

impl From<&CliArgs> for AppConfig {
    fn from(args: &CliArgs) -> Self {
        Self {
            storage_dir: args.storage_dir.clone(),
            storage_key: args.storage_key.clone(),
            board: BoardSize::new(args.board_width, args.board_height),
            device_pixel_ratio: args.device_pixel_ratio,
            autosave_every: Duration::from_secs(args.autosave_secs.max(1)),
            payment_endpoint: args.payment_endpoint.clone(),
            payment_timeout: Duration::from_secs(args.payment_timeout_secs.max(1)),
            watermark: args.watermark_image.clone().map_or_else(
                || Watermark::Label(args.watermark_text.clone()),
                Watermark::Image,
            ),
        }
    }
}

impl AppConfig {
    /// Editor settings for this board.
    #[must_use]
    pub fn editor_config(&self) -> EditorConfig {
        EditorConfig {
            board: self.board,
            ..EditorConfig::default()
        }
    }

    /// Renderer settings.
    #[must_use]
    pub fn renderer_config(&self) -> RendererConfig {
        RendererConfig {
            device_pixel_ratio: self.device_pixel_ratio,
            watermark: self.watermark.clone(),
            ..RendererConfig::default()
        }
    }

    /// The file-backed storage slot.
    #[must_use]
    pub fn persistence(&self) -> Persistence {
        Persistence::new(FileStorage::new(&self.storage_dir), self.storage_key.clone())
    }
}
