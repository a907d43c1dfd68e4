//! Geometry and transform math for elements.
//!
//! All functions here are pure. Every consumer (hit-testing, gestures,
//! preview and export rendering) goes through the same box and transform
//! computation so what is edited is what gets exported.
//!
//! ## Transform order
//!
//! ```text
//! translate(centre) -> rotate(rotation) -> scale(scale) -> translate(-w/2, -h/2)
//! ```
//!
//! A point in the element's local frame (origin at the top-left of its
//! unscaled box) is mapped to board coordinates by applying the steps right
//! to left, so rotation and scale pivot about the element's own centre.

use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementKind, Point, TextStyle, STICKER_FONT_SIZE};

/// Padding added to measured text on each axis.
pub const TEXT_PADDING: f32 = 20.0;

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT: f32 = 1.4;

/// Sticker box width as a fraction of the sticker font size.
pub const STICKER_WIDTH_RATIO: f32 = 0.8;

/// Pick radius around a handle centre.
pub const HANDLE_RADIUS: f32 = 12.0;

/// Distance of the rotate handle above the top edge, in local units.
pub const ROTATE_HANDLE_OFFSET: f32 = 24.0;

/// An axis-aligned box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
}

impl BoundingBox {
    /// Centre of the box.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Whether a point lies inside the box (edges inclusive).
    #[must_use]
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }
}

/// Measures glyph runs. Implemented by whatever knows the font metrics of
/// the host; [`GlyphEstimate`] is the portable default.
pub trait TextMeasure: std::fmt::Debug + Send + Sync {
    /// Advance width of a single line of bold text.
    fn line_width(&self, line: &str, font_size: f32, font_family: &str) -> f32;

    /// Distance between consecutive baselines.
    fn line_height(&self, font_size: f32) -> f32 {
        font_size * LINE_HEIGHT
    }
}

/// Font-independent estimate of bold text metrics.
///
/// Narrow glyphs advance 0.6 em, wide glyphs (CJK, emoji, pictographs)
/// advance 1.0 em, and combining joiners/selectors advance nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlyphEstimate;

impl TextMeasure for GlyphEstimate {
    fn line_width(&self, line: &str, font_size: f32, _font_family: &str) -> f32 {
        line.chars().map(|c| advance_em(c) * font_size).sum()
    }
}

fn advance_em(c: char) -> f32 {
    let cp = u32::from(c);
    match cp {
        0x200D | 0xFE00..=0xFE0F | 0x0300..=0x036F => 0.0,
        0x1100..=0x115F
        | 0x2600..=0x27BF
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x1F000..=0x1FAFF
        | 0x20000..=0x3FFFD => 1.0,
        _ => 0.6,
    }
}

/// Split content into rendered lines. Empty content is one empty line.
pub fn text_lines(content: &str) -> impl Iterator<Item = &str> {
    content.split('\n')
}

/// Size of the glyph run for some text, without padding.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn measure_text(content: &str, style: &TextStyle, measurer: &dyn TextMeasure) -> (f32, f32) {
    let size = style.font_size as f32;
    let mut width: f32 = 0.0;
    let mut lines = 0_usize;
    for line in text_lines(content) {
        width = width.max(measurer.line_width(line, size, &style.font_family));
        lines += 1;
    }
    (width, lines as f32 * measurer.line_height(size))
}

/// The element's unscaled, unrotated box, anchored at its position.
#[must_use]
pub fn bounding_box(element: &Element, measurer: &dyn TextMeasure) -> BoundingBox {
    let (w, h) = match &element.kind {
        ElementKind::Text { content, style } => {
            let (w, h) = measure_text(content, style, measurer);
            (w + TEXT_PADDING, h + TEXT_PADDING)
        }
        ElementKind::Sticker { .. } => {
            (STICKER_FONT_SIZE * STICKER_WIDTH_RATIO, STICKER_FONT_SIZE)
        }
    };
    BoundingBox {
        x: element.position.x,
        y: element.position.y,
        w,
        h,
    }
}

/// Placement of an element's local frame on the board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTransform {
    /// Board-space pivot (centre of the unscaled box).
    pub center: Point,
    /// Rotation in degrees.
    pub rotation: f32,
    /// Uniform scale.
    pub scale: f32,
    /// Unscaled box width.
    pub width: f32,
    /// Unscaled box height.
    pub height: f32,
}

impl RenderTransform {
    /// Rotation in radians.
    #[must_use]
    pub fn radians(&self) -> f32 {
        self.rotation.to_radians()
    }

    /// Map a local point (origin at the box's top-left) to board space.
    #[must_use]
    pub fn to_board(&self, local: Point) -> Point {
        let (sin, cos) = self.radians().sin_cos();
        let dx = (local.x - self.width / 2.0) * self.scale;
        let dy = (local.y - self.height / 2.0) * self.scale;
        Point::new(
            self.center.x + dx * cos - dy * sin,
            self.center.y + dx * sin + dy * cos,
        )
    }

    /// Map a board point into the element's local frame.
    #[must_use]
    pub fn to_local(&self, board: Point) -> Point {
        let (sin, cos) = self.radians().sin_cos();
        let qx = board.x - self.center.x;
        let qy = board.y - self.center.y;
        let rx = qx * cos + qy * sin;
        let ry = -qx * sin + qy * cos;
        Point::new(
            rx / self.scale + self.width / 2.0,
            ry / self.scale + self.height / 2.0,
        )
    }
}

/// Compute how an element is placed on the board.
#[must_use]
pub fn render_transform(element: &Element, measurer: &dyn TextMeasure) -> RenderTransform {
    let bbox = bounding_box(element, measurer);
    RenderTransform {
        center: bbox.center(),
        rotation: element.rotation,
        scale: element.scale(),
        width: bbox.w,
        height: bbox.h,
    }
}

/// Whether a board point falls on the element.
///
/// The point is taken into the element's local frame, where the box is
/// axis-aligned, so rotated and scaled elements are hit where they are drawn.
#[must_use]
pub fn contains_point(element: &Element, measurer: &dyn TextMeasure, px: f32, py: f32) -> bool {
    let transform = render_transform(element, measurer);
    let local = transform.to_local(Point::new(px, py));
    local.x >= 0.0 && local.x <= transform.width && local.y >= 0.0 && local.y <= transform.height
}

/// Board position of the resize handle (bottom-right corner).
#[must_use]
pub fn resize_handle_center(element: &Element, measurer: &dyn TextMeasure) -> Point {
    let transform = render_transform(element, measurer);
    transform.to_board(Point::new(transform.width, transform.height))
}

/// Board position of the rotate handle (above the top edge, centred).
#[must_use]
pub fn rotate_handle_center(element: &Element, measurer: &dyn TextMeasure) -> Point {
    let transform = render_transform(element, measurer);
    transform.to_board(Point::new(transform.width / 2.0, -ROTATE_HANDLE_OFFSET))
}

/// Whether a point is within pick distance of a handle centre.
#[must_use]
pub fn hits_handle(handle: Point, px: f32, py: f32) -> bool {
    (px - handle.x).hypot(py - handle.y) <= HANDLE_RADIUS
}
