//! Editor elements - the text and sticker layers placed on the board.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Smallest scale an element may have.
pub const MIN_SCALE: f32 = 0.5;

/// Smallest font size the toolbar allows.
pub const MIN_FONT_SIZE: u32 = 16;

/// Largest font size the toolbar allows.
pub const MAX_FONT_SIZE: u32 = 120;

/// Font size change applied by one toolbar step.
pub const FONT_SIZE_STEP: u32 = 4;

/// Font size given to new text elements.
pub const DEFAULT_FONT_SIZE: u32 = 32;

/// Font family given to new text elements.
pub const DEFAULT_FONT_FAMILY: &str = "Arial, sans-serif";

/// Fill color given to new text elements.
pub const DEFAULT_TEXT_COLOR: &str = "white";

/// Font size stickers are drawn at.
pub const STICKER_FONT_SIZE: f32 = 60.0;

/// Unique identifier for an element.
///
/// Identifiers are random v4 UUIDs, so an id is never handed out twice
/// within (or across) editing sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse an id from its string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point in board coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate (pixels from the left edge of the board).
    pub x: f32,
    /// Y coordinate (pixels from the top edge of the board).
    pub y: f32,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Horizontal alignment of text inside its box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Flush left.
    Left,
    /// Centered.
    #[default]
    Center,
    /// Flush right.
    Right,
}

impl TextAlign {
    /// The CSS / SVG keyword for this alignment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

impl std::str::FromStr for TextAlign {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Ok(Self::Left),
            "center" | "middle" => Ok(Self::Center),
            "right" | "end" => Ok(Self::Right),
            other => Err(format!("unknown text alignment: {other}")),
        }
    }
}

/// Styling of a text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Font size in pixels, kept within [`MIN_FONT_SIZE`]..=[`MAX_FONT_SIZE`].
    pub font_size: u32,
    /// CSS font family list.
    pub font_family: String,
    /// Fill color (any CSS color string).
    pub color: String,
    /// Alignment of each line inside the box.
    pub text_align: TextAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            color: DEFAULT_TEXT_COLOR.to_string(),
            text_align: TextAlign::Center,
        }
    }
}

/// Clamp a font size into the toolbar range.
#[must_use]
pub fn clamp_font_size(size: u32) -> u32 {
    size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

/// The content an element carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    /// An editable text caption.
    Text {
        /// Text content; may be empty while it is being authored.
        content: String,
        /// Font and color settings.
        style: TextStyle,
    },

    /// A single emoji or symbol.
    Sticker {
        /// The glyph to draw.
        glyph: String,
    },
}

impl ElementKind {
    /// A text element with default styling.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
            style: TextStyle::default(),
        }
    }

    /// A sticker element.
    #[must_use]
    pub fn sticker(glyph: impl Into<String>) -> Self {
        Self::Sticker {
            glyph: glyph.into(),
        }
    }

    /// Whether this is a text element.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }

    /// Short name used in logs and the persisted `type` field.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Sticker { .. } => "sticker",
        }
    }
}

/// A placed element: content plus its transform.
///
/// `position` is the top-left corner of the element's unscaled box.
/// Rotation and scale pivot about the centre of that box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    /// Element content.
    pub kind: ElementKind,
    /// Top-left anchor in board coordinates.
    pub position: Point,
    /// Uniform scale, never below [`MIN_SCALE`].
    scale: f32,
    /// Rotation in degrees, clockwise. Unbounded.
    pub rotation: f32,
}

impl Element {
    /// Create a new element at the origin with identity transform.
    #[must_use]
    pub fn new(kind: ElementKind) -> Self {
        Self {
            id: ElementId::new(),
            kind,
            position: Point::default(),
            scale: 1.0,
            rotation: 0.0,
        }
    }

    /// Set the position.
    #[must_use]
    pub fn with_position(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    /// Set the scale (clamped to [`MIN_SCALE`]).
    #[must_use]
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.set_scale(scale);
        self
    }

    /// Set the rotation in degrees.
    #[must_use]
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    /// Current uniform scale.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Set the scale, clamping to [`MIN_SCALE`]. Non-finite values are
    /// treated as the floor.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = if scale.is_finite() {
            scale.max(MIN_SCALE)
        } else {
            MIN_SCALE
        };
    }

    /// Text content, if this is a text element.
    #[must_use]
    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Text { content, .. } => Some(content),
            ElementKind::Sticker { .. } => None,
        }
    }

    /// Text style, if this is a text element.
    #[must_use]
    pub fn text_style(&self) -> Option<&TextStyle> {
        match &self.kind {
            ElementKind::Text { style, .. } => Some(style),
            ElementKind::Sticker { .. } => None,
        }
    }

    /// Whether this is a text element whose content is empty or blank.
    #[must_use]
    pub fn is_blank_text(&self) -> bool {
        self.text_content().is_some_and(|c| c.trim().is_empty())
    }

    /// Apply a patch. Text-only fields are ignored on stickers and the
    /// glyph is ignored on text. Returns whether anything changed.
    pub fn apply(&mut self, patch: &ElementPatch) -> bool {
        let before = self.clone();

        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(scale) = patch.scale {
            self.set_scale(scale);
        }
        if let Some(rotation) = patch.rotation {
            if rotation.is_finite() {
                self.rotation = rotation;
            }
        }

        match &mut self.kind {
            ElementKind::Text { content, style } => {
                if let Some(text) = &patch.content {
                    content.clone_from(text);
                }
                if let Some(size) = patch.font_size {
                    style.font_size = clamp_font_size(size);
                }
                if let Some(family) = &patch.font_family {
                    style.font_family.clone_from(family);
                }
                if let Some(color) = &patch.color {
                    style.color.clone_from(color);
                }
                if let Some(align) = patch.text_align {
                    style.text_align = align;
                }
            }
            ElementKind::Sticker { glyph } => {
                if let Some(new_glyph) = &patch.glyph {
                    glyph.clone_from(new_glyph);
                }
            }
        }

        *self != before
    }
}

/// A partial update to an element. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementPatch {
    /// New top-left anchor.
    pub position: Option<Point>,
    /// New scale (clamped).
    pub scale: Option<f32>,
    /// New rotation in degrees.
    pub rotation: Option<f32>,
    /// New text content.
    pub content: Option<String>,
    /// New font size (clamped).
    pub font_size: Option<u32>,
    /// New font family.
    pub font_family: Option<String>,
    /// New text color.
    pub color: Option<String>,
    /// New alignment.
    pub text_align: Option<TextAlign>,
    /// New sticker glyph.
    pub glyph: Option<String>,
}

impl ElementPatch {
    /// Patch that moves an element.
    #[must_use]
    pub fn position(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    /// Patch that replaces text content.
    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_never_below_floor() {
        let mut element = Element::new(ElementKind::text("Hi"));
        element.set_scale(0.1);
        assert!((element.scale() - MIN_SCALE).abs() < f32::EPSILON);
        element.set_scale(f32::NAN);
        assert!((element.scale() - MIN_SCALE).abs() < f32::EPSILON);
        element.set_scale(2.5);
        assert!((element.scale() - 2.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_patch_ignores_text_fields_on_sticker() {
        let mut sticker = Element::new(ElementKind::sticker("😂"));
        let changed = sticker.apply(&ElementPatch {
            content: Some("nope".into()),
            font_size: Some(40),
            ..ElementPatch::default()
        });
        assert!(!changed);
        assert_eq!(sticker.kind, ElementKind::sticker("😂"));
    }

    #[test]
    fn test_patch_clamps_font_size() {
        let mut text = Element::new(ElementKind::text("Hi"));
        text.apply(&ElementPatch {
            font_size: Some(500),
            ..ElementPatch::default()
        });
        assert_eq!(text.text_style().map(|s| s.font_size), Some(MAX_FONT_SIZE));
    }

    #[test]
    fn test_blank_text_detection() {
        assert!(Element::new(ElementKind::text("   ")).is_blank_text());
        assert!(!Element::new(ElementKind::text("x")).is_blank_text());
        assert!(!Element::new(ElementKind::sticker("🔥")).is_blank_text());
    }

    #[test]
    fn test_text_align_parse() {
        assert_eq!("LEFT".parse::<TextAlign>(), Ok(TextAlign::Left));
        assert_eq!("end".parse::<TextAlign>(), Ok(TextAlign::Right));
        assert!("justify".parse::<TextAlign>().is_err());
    }
}
