//! # Meme Viber Core
//!
//! Editing engine for the Meme Viber meme maker: the element model, transform
//! geometry, pointer gestures, selection, undo history and persistence.
//! Has no rendering surface of its own; compiles to WASM for the browser
//! editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                      Editor                      │
//! ├──────────────────────────────────────────────────┤
//! │  Interaction      │  Selection     │  History    │
//! │  - drag/resize/   │  - handles     │  - undo     │
//! │    rotate         │  - toolbar     │  - redo     │
//! ├──────────────────────────────────────────────────┤
//! │  Element Store (paint order)  │  Background      │
//! ├──────────────────────────────────────────────────┤
//! │  Geometry (boxes, transforms) │  Persistence     │
//! └──────────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod background;
pub mod editor;
pub mod element;
pub mod error;
pub mod event;
pub mod geometry;
pub mod history;
pub mod interaction;
pub mod persistence;
pub mod selection;
pub mod shared;
pub mod store;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use background::{Background, DEFAULT_BACKGROUND};
pub use editor::{Editor, EditorConfig, DEFAULT_CAPTION, NEW_TEXT_CAPTION};
pub use element::{
    Element, ElementId, ElementKind, ElementPatch, Point, TextAlign, TextStyle, MAX_FONT_SIZE,
    MIN_FONT_SIZE, MIN_SCALE,
};
pub use error::{CoreError, CoreResult, StorageError};
pub use event::{EditorEvent, KeyModifiers, PointerEvent, PointerPhase};
pub use geometry::{BoundingBox, GlyphEstimate, RenderTransform, TextMeasure};
pub use history::{History, Snapshot};
pub use interaction::{Gesture, GestureKind, HitTarget, InteractionController};
pub use persistence::{
    FileStorage, KeyValueStore, MemoryStorage, Persistence, SavedLayer, SavedState,
    DEFAULT_STORAGE_KEY,
};
pub use selection::{has_shareable_content, Selection, ToolbarState};
pub use shared::SharedEditor;
pub use store::{BoardSize, ElementStore};

#[cfg(feature = "wasm")]
pub use wasm::{LocalStorage, WasmEditor};

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
