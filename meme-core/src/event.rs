//! Input events for the editor.
//!
//! The host translates its native pointer, keyboard and toolbar events into
//! [`EditorEvent`]s and feeds them to [`Editor::handle_event`](crate::Editor::handle_event)
//! in delivery order.

use serde::{Deserialize, Serialize};

use crate::element::TextAlign;

/// Phase of a pointer (mouse, pen or touch) event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Button pressed / finger down.
    Down,
    /// Pointer moved.
    Move,
    /// Button released / finger up.
    Up,
    /// Pointer left the captured element.
    Leave,
    /// The platform cancelled the pointer (e.g. palm rejection).
    Cancel,
}

impl PointerPhase {
    /// Whether this phase terminates a gesture. Leave and cancel end a
    /// gesture exactly like up.
    #[must_use]
    pub const fn ends_gesture(self) -> bool {
        matches!(self, Self::Up | Self::Leave | Self::Cancel)
    }
}

/// A pointer event in board coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Phase of this event.
    pub phase: PointerPhase,
    /// X position in board coordinates.
    pub x: f32,
    /// Y position in board coordinates.
    pub y: f32,
    /// Platform pointer id (for capture bookkeeping).
    #[serde(default)]
    pub pointer_id: u32,
}

impl PointerEvent {
    /// Create a pointer event for the primary pointer.
    #[must_use]
    pub const fn new(phase: PointerPhase, x: f32, y: f32) -> Self {
        Self {
            phase,
            x,
            y,
            pointer_id: 0,
        }
    }

    /// Pointer down at a point.
    #[must_use]
    pub const fn down(x: f32, y: f32) -> Self {
        Self::new(PointerPhase::Down, x, y)
    }

    /// Pointer move to a point.
    #[must_use]
    pub const fn moved(x: f32, y: f32) -> Self {
        Self::new(PointerPhase::Move, x, y)
    }

    /// Pointer up at a point.
    #[must_use]
    pub const fn up(x: f32, y: f32) -> Self {
        Self::new(PointerPhase::Up, x, y)
    }
}

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct KeyModifiers {
    /// Shift key pressed.
    #[serde(default)]
    pub shift: bool,
    /// Control key pressed.
    #[serde(default)]
    pub ctrl: bool,
    /// Alt/Option key pressed.
    #[serde(default)]
    pub alt: bool,
    /// Meta/Command key pressed.
    #[serde(default)]
    pub meta: bool,
}

impl KeyModifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    #[must_use]
    pub const fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Everything the editor reacts to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EditorEvent {
    /// Raw pointer input on the board.
    Pointer(PointerEvent),

    /// Key press.
    Key {
        /// Key name (`"Escape"`, `"z"`, ...).
        key: String,
        /// Active modifier keys.
        #[serde(default)]
        modifiers: KeyModifiers,
    },

    /// The focused text element's content changed to this value.
    TextInput {
        /// Full new content.
        content: String,
    },

    /// "Add text" button.
    AddText {
        /// Initial content; the default caption when absent.
        #[serde(default)]
        content: Option<String>,
    },

    /// Sticker palette button.
    AddSticker {
        /// Emoji or symbol.
        glyph: String,
    },

    /// Background palette swatch.
    SetBackground {
        /// Solid color or `linear-gradient(...)` descriptor.
        descriptor: String,
    },

    /// Toolbar "A+".
    IncreaseFontSize,

    /// Toolbar "A-".
    DecreaseFontSize,

    /// Toolbar color picker.
    SetTextColor {
        /// New fill color.
        color: String,
    },

    /// Toolbar alignment buttons.
    SetTextAlign {
        /// New alignment.
        align: TextAlign,
    },

    /// Toolbar font picker.
    SetFontFamily {
        /// New font family.
        family: String,
    },

    /// Toolbar delete button.
    DeleteSelected,

    /// "Done" button.
    Done,

    /// Undo the last change.
    Undo,

    /// Redo the last undone change.
    Redo,
}
