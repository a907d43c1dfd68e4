//! Saving and restoring the board through a single key-value slot.
//!
//! The slot holds one JSON document:
//!
//! ```json
//! {
//!   "backgroundColor": "#3498db",
//!   "layers": [
//!     { "type": "text", "text": "Hi", "emoji": null, "x": 150.0, "y": 275.0,
//!       "color": "white", "fontSize": 32, "fontFamily": "Arial, sans-serif",
//!       "textAlign": "center", "scale": 1.0, "rotation": 0.0 }
//!   ]
//! }
//! ```
//!
//! Loading is tolerant: missing or null fields get defaults, unknown layer
//! types are skipped, and an unreadable document is treated as absent.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Deserializer, Serialize};

use crate::background::Background;
use crate::element::{clamp_font_size, Element, ElementKind, Point, TextAlign, TextStyle};
use crate::error::{CoreResult, StorageError};

/// Default storage slot name.
pub const DEFAULT_STORAGE_KEY: &str = "memeState";

/// The persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedState {
    /// Background descriptor.
    #[serde(default)]
    pub background_color: Option<String>,
    /// Layers in paint order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub layers: Vec<SavedLayer>,
}

/// One persisted layer. Fields that do not apply to the layer's type are
/// written as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedLayer {
    /// `"text"` or `"sticker"`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Text content.
    #[serde(default)]
    pub text: Option<String>,
    /// Sticker glyph.
    #[serde(default)]
    pub emoji: Option<String>,
    /// Left edge.
    #[serde(default)]
    pub x: Option<f32>,
    /// Top edge.
    #[serde(default)]
    pub y: Option<f32>,
    /// Text color.
    #[serde(default)]
    pub color: Option<String>,
    /// Font size in pixels.
    #[serde(default, deserialize_with = "lenient_font_size")]
    pub font_size: Option<u32>,
    /// Font family.
    #[serde(default)]
    pub font_family: Option<String>,
    /// Alignment keyword.
    #[serde(default)]
    pub text_align: Option<String>,
    /// Uniform scale.
    #[serde(default)]
    pub scale: Option<f32>,
    /// Rotation in degrees.
    #[serde(default)]
    pub rotation: Option<f32>,
}

/// A layer decoded back into element form. `position` is `None` when the
/// document did not record one; the element is then centred.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredLayer {
    /// Element content.
    pub kind: ElementKind,
    /// Recorded top-left anchor.
    pub position: Option<Point>,
    /// Scale (floored on apply).
    pub scale: f32,
    /// Rotation in degrees.
    pub rotation: f32,
}

impl SavedLayer {
    /// Encode an element.
    #[must_use]
    pub fn from_element(element: &Element) -> Self {
        let mut layer = Self {
            kind: Some(element.kind.type_name().to_string()),
            x: Some(element.position.x),
            y: Some(element.position.y),
            scale: Some(element.scale()),
            rotation: Some(element.rotation),
            ..Self::default()
        };
        match &element.kind {
            ElementKind::Text { content, style } => {
                layer.text = Some(content.clone());
                layer.color = Some(style.color.clone());
                layer.font_size = Some(style.font_size);
                layer.font_family = Some(style.font_family.clone());
                layer.text_align = Some(style.text_align.as_str().to_string());
            }
            ElementKind::Sticker { glyph } => {
                layer.emoji = Some(glyph.clone());
            }
        }
        layer
    }

    /// Decode into element form. Returns `None` for unknown types and for
    /// stickers without a glyph.
    #[must_use]
    pub fn restore(&self) -> Option<RestoredLayer> {
        let kind = match self.kind.as_deref() {
            Some("text") => {
                let defaults = TextStyle::default();
                let text_align = match self.text_align.as_deref() {
                    Some(keyword) => keyword.parse().unwrap_or_else(|err| {
                        tracing::warn!("{err}; using center");
                        TextAlign::Center
                    }),
                    None => defaults.text_align,
                };
                ElementKind::Text {
                    content: self.text.clone().unwrap_or_default(),
                    style: TextStyle {
                        font_size: self.font_size.map_or(defaults.font_size, clamp_font_size),
                        font_family: self.font_family.clone().unwrap_or(defaults.font_family),
                        color: self.color.clone().unwrap_or(defaults.color),
                        text_align,
                    },
                }
            }
            Some("sticker") => match self.emoji.as_deref() {
                Some(glyph) if !glyph.is_empty() => ElementKind::sticker(glyph),
                _ => {
                    tracing::warn!("Skipping sticker layer without a glyph");
                    return None;
                }
            },
            other => {
                tracing::warn!("Skipping layer of unknown type {other:?}");
                return None;
            }
        };

        Some(RestoredLayer {
            kind,
            position: self.x.zip(self.y).map(|(x, y)| Point::new(x, y)),
            scale: self.scale.unwrap_or(1.0),
            rotation: self.rotation.unwrap_or(0.0),
        })
    }
}

impl SavedState {
    /// Encode a board.
    #[must_use]
    pub fn capture<'a>(
        elements: impl IntoIterator<Item = &'a Element>,
        background: &Background,
    ) -> Self {
        Self {
            background_color: Some(background.descriptor()),
            layers: elements.into_iter().map(SavedLayer::from_element).collect(),
        }
    }

    /// The decoded background, defaulting when absent.
    #[must_use]
    pub fn background(&self) -> Background {
        self.background_color
            .as_deref()
            .map_or_else(Background::default, Background::parse)
    }

    /// Decode every usable layer, in order.
    #[must_use]
    pub fn restored_layers(&self) -> Vec<RestoredLayer> {
        self.layers.iter().filter_map(SavedLayer::restore).collect()
    }

    /// Serialize to the slot format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the slot format.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a valid document.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept any JSON number for the font size; fractional sizes round.
fn lenient_font_size<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let size = raw
        .filter(|size| size.is_finite())
        .map(|size| size.round().clamp(0.0, f64::from(u32::MAX)) as u32);
    Ok(size)
}

// ============================================================================
// Storage backends
// ============================================================================

/// A string-valued key-value slot, like a browser's `localStorage`.
pub trait KeyValueStore: Debug + Send {
    /// Read a slot. Missing slots are `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a slot, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a slot. Removing a missing slot succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be modified.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory slots. Clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key);
        Ok(())
    }
}

/// One JSON file per slot inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` for slot files. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The storage directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file backing a slot.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_filename(key)))
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Sanitize a slot key for use as a filename.
///
/// Replaces any character that is not alphanumeric, `-`, or `_` with `_`.
fn sanitize_filename(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// ============================================================================
// Persistence adapter
// ============================================================================

/// Reads and writes [`SavedState`] documents in one slot.
#[derive(Debug)]
pub struct Persistence {
    storage: Box<dyn KeyValueStore>,
    key: String,
}

impl Persistence {
    /// Persist into `key` of `storage`.
    #[must_use]
    pub fn new(storage: impl KeyValueStore + 'static, key: impl Into<String>) -> Self {
        Self {
            storage: Box::new(storage),
            key: key.into(),
        }
    }

    /// Throwaway in-memory persistence under the default key.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new(), DEFAULT_STORAGE_KEY)
    }

    /// The slot name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Write a document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the backend rejects it.
    pub fn save(&self, state: &SavedState) -> CoreResult<()> {
        let json = state.to_json()?;
        self.storage.set(&self.key, &json)?;
        tracing::info!(
            "Saved {} layer(s) to slot {:?}",
            state.layers.len(),
            self.key
        );
        Ok(())
    }

    /// Read the document strictly.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the document is corrupt.
    pub fn try_load(&self) -> CoreResult<Option<SavedState>> {
        let Some(json) = self.storage.get(&self.key)? else {
            return Ok(None);
        };
        SavedState::from_json(&json).map(Some)
    }

    /// Read the document, treating failures as an empty slot.
    #[must_use]
    pub fn load(&self) -> Option<SavedState> {
        match self.try_load() {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("Failed to load slot {:?}: {e}; starting fresh", self.key);
                None
            }
        }
    }

    /// Delete the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be modified.
    pub fn clear(&self) -> CoreResult<()> {
        self.storage.remove(&self.key)?;
        Ok(())
    }

    /// Raw access to the slot contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn raw(&self) -> CoreResult<Option<String>> {
        Ok(self.storage.get(&self.key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_fields_for_sticker_are_null() {
        let sticker = Element::new(ElementKind::sticker("🐸")).with_position(Point::new(5.0, 6.0));
        let json = serde_json::to_value(SavedLayer::from_element(&sticker)).expect("encode");
        assert_eq!(json["type"], "sticker");
        assert_eq!(json["emoji"], "🐸");
        assert!(json["text"].is_null());
        assert!(json["fontSize"].is_null());
        assert_eq!(json["scale"], 1.0);
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let state = SavedState::from_json(r#"{"layers":[{"type":"text","text":"yo"}]}"#)
            .expect("parse");
        let layers = state.restored_layers();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].position, None);
        assert!((layers[0].scale - 1.0).abs() < f32::EPSILON);
        assert_eq!(layers[0].kind, ElementKind::text("yo"));
        assert_eq!(state.background(), Background::default());
    }

    #[test]
    fn test_null_layers_and_unknown_types() {
        let state = SavedState::from_json(r#"{"backgroundColor":"red","layers":null}"#)
            .expect("parse");
        assert!(state.layers.is_empty());

        let state = SavedState::from_json(
            r#"{"layers":[{"type":"gif"},{"type":"sticker","emoji":null},{"type":"sticker","emoji":"🔥"}]}"#,
        )
        .expect("parse");
        assert_eq!(state.restored_layers().len(), 1);
    }

    #[test]
    fn test_font_size_clamped_and_rounded_on_load() {
        let state = SavedState::from_json(
            r#"{"layers":[{"type":"text","text":"a","fontSize":400},{"type":"text","text":"b","fontSize":20.6}]}"#,
        )
        .expect("parse");
        let sizes: Vec<u32> = state
            .restored_layers()
            .iter()
            .filter_map(|l| match &l.kind {
                ElementKind::Text { style, .. } => Some(style.font_size),
                ElementKind::Sticker { .. } => None,
            })
            .collect();
        assert_eq!(sizes, vec![120, 21]);
    }

    #[test]
    fn test_corrupt_slot_loads_as_absent() {
        let storage = MemoryStorage::new();
        storage.set(DEFAULT_STORAGE_KEY, "not json").expect("set");
        let persistence = Persistence::new(storage, DEFAULT_STORAGE_KEY);
        assert!(persistence.try_load().is_err());
        assert!(persistence.load().is_none());
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().join("nested"));
        assert_eq!(storage.get("memeState").expect("get"), None);

        storage.set("memeState", "{}").expect("set");
        assert_eq!(storage.get("memeState").expect("get").as_deref(), Some("{}"));

        storage.remove("memeState").expect("remove");
        storage.remove("memeState").expect("remove twice");
        assert_eq!(storage.get("memeState").expect("get"), None);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("memeState"), "memeState");
        assert_eq!(sanitize_filename("../etc/passwd"), "___etc_passwd");
    }

    #[test]
    fn test_memory_storage_clones_share_slots() {
        let storage = MemoryStorage::new();
        let persistence = Persistence::new(storage.clone(), "k");
        persistence.save(&SavedState::default()).expect("save");
        assert!(storage.get("k").expect("get").is_some());
        persistence.clear().expect("clear");
        assert!(storage.get("k").expect("get").is_none());
    }
}
