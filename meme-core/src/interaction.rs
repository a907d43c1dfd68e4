//! Pointer-driven drag / resize / rotate gestures.
//!
//! ```text
//!            down on body            move: position = origin + delta
//!   Idle ───────────────────▶ Dragging ───────────────┐
//!    ▲  ─── down on resize ─▶ Resizing  scale = max(0.5, s0 + |delta| / 100)
//!    │  ─── down on rotate ─▶ Rotating  rotation = atan2(p - centre)
//!    └────────── up / leave / cancel ◀────────────────┘
//! ```
//!
//! The gesture is a single tagged value, so at most one can be active.
//! While a gesture is active, further pointer-downs are ignored and moves
//! from other pointers are dropped (pointer capture).

use serde::{Deserialize, Serialize};

use crate::element::{ElementId, Point, MIN_SCALE};
use crate::event::PointerEvent;
use crate::geometry;
use crate::store::ElementStore;

/// Drag distance that adds 1.0 to the scale.
pub const RESIZE_DISTANCE_PER_UNIT_SCALE: f32 = 100.0;

/// The transform fields a gesture may change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformSnapshot {
    /// Top-left anchor.
    pub position: Point,
    /// Uniform scale.
    pub scale: f32,
    /// Rotation in degrees.
    pub rotation: f32,
}

/// Everything captured at pointer-down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureOrigin {
    /// Element being manipulated.
    pub target: ElementId,
    /// Pointer that owns the gesture.
    pub pointer_id: u32,
    /// Pointer position at pointer-down.
    pub pointer: Point,
    /// Element transform at pointer-down.
    pub original: TransformSnapshot,
}

/// The active gesture, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Gesture {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Moving an element.
    Dragging(GestureOrigin),
    /// Scaling an element by its resize handle.
    Resizing(GestureOrigin),
    /// Rotating an element by its rotate handle.
    Rotating(GestureOrigin),
}

impl Gesture {
    /// The captured origin of an active gesture.
    #[must_use]
    pub const fn origin(&self) -> Option<&GestureOrigin> {
        match self {
            Self::Idle => None,
            Self::Dragging(origin) | Self::Resizing(origin) | Self::Rotating(origin) => {
                Some(origin)
            }
        }
    }

    /// The kind of an active gesture.
    #[must_use]
    pub const fn kind(&self) -> Option<GestureKind> {
        match self {
            Self::Idle => None,
            Self::Dragging(_) => Some(GestureKind::Drag),
            Self::Resizing(_) => Some(GestureKind::Resize),
            Self::Rotating(_) => Some(GestureKind::Rotate),
        }
    }
}

/// Kinds of transform gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureKind {
    /// Move.
    Drag,
    /// Scale.
    Resize,
    /// Rotate.
    Rotate,
}

/// What a pointer-down landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    /// The selected element's resize handle.
    ResizeHandle(ElementId),
    /// The selected element's rotate handle.
    RotateHandle(ElementId),
    /// An element's body.
    Body(ElementId),
    /// Nothing.
    EmptyCanvas,
}

/// Result of a pointer-down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerDown {
    /// A gesture started on an element.
    Started {
        /// Gesture kind.
        kind: GestureKind,
        /// Element being manipulated.
        target: ElementId,
    },
    /// The pointer landed on empty canvas; no gesture started.
    EmptyCanvas(Point),
    /// A gesture is already active; the event was ignored.
    Ignored,
}

/// Result of a completed gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureEnd {
    /// Gesture kind.
    pub kind: GestureKind,
    /// Element that was manipulated.
    pub target: ElementId,
    /// Transform before the gesture.
    pub original: TransformSnapshot,
    /// Whether the element's transform differs from `original`.
    pub changed: bool,
}

/// Find what lies under a board point.
///
/// Handles of `handles_for` (the selected element, once its handles are
/// attached) take priority over any element body; bodies are searched
/// topmost first.
#[must_use]
pub fn hit_test(
    store: &ElementStore,
    handles_for: Option<ElementId>,
    x: f32,
    y: f32,
) -> HitTarget {
    if let Some(element) = handles_for.and_then(|id| store.find(id)) {
        let measurer = store.measurer();
        if geometry::hits_handle(geometry::resize_handle_center(element, measurer), x, y) {
            return HitTarget::ResizeHandle(element.id);
        }
        if geometry::hits_handle(geometry::rotate_handle_center(element, measurer), x, y) {
            return HitTarget::RotateHandle(element.id);
        }
    }
    store
        .element_at(x, y)
        .map_or(HitTarget::EmptyCanvas, HitTarget::Body)
}

/// Interprets pointer streams as transform gestures.
#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    gesture: Gesture,
}

impl InteractionController {
    /// Create an idle controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current gesture.
    #[must_use]
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Whether no gesture is active.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self.gesture, Gesture::Idle)
    }

    /// Handle a pointer-down.
    pub fn pointer_down(
        &mut self,
        store: &ElementStore,
        handles_for: Option<ElementId>,
        event: &PointerEvent,
    ) -> PointerDown {
        if !self.is_idle() {
            tracing::debug!("Pointer down ignored: gesture already active");
            return PointerDown::Ignored;
        }

        let (kind, target) = match hit_test(store, handles_for, event.x, event.y) {
            HitTarget::ResizeHandle(id) => (GestureKind::Resize, id),
            HitTarget::RotateHandle(id) => (GestureKind::Rotate, id),
            HitTarget::Body(id) => (GestureKind::Drag, id),
            HitTarget::EmptyCanvas => {
                return PointerDown::EmptyCanvas(Point::new(event.x, event.y));
            }
        };
        let Some(element) = store.find(target) else {
            return PointerDown::EmptyCanvas(Point::new(event.x, event.y));
        };

        let origin = GestureOrigin {
            target,
            pointer_id: event.pointer_id,
            pointer: Point::new(event.x, event.y),
            original: TransformSnapshot {
                position: element.position,
                scale: element.scale(),
                rotation: element.rotation,
            },
        };
        self.gesture = match kind {
            GestureKind::Drag => Gesture::Dragging(origin),
            GestureKind::Resize => Gesture::Resizing(origin),
            GestureKind::Rotate => Gesture::Rotating(origin),
        };
        tracing::debug!("Started {kind:?} on {target}");
        PointerDown::Started { kind, target }
    }

    /// Handle a pointer move. Returns whether the target changed.
    pub fn pointer_move(&mut self, store: &mut ElementStore, event: &PointerEvent) -> bool {
        let gesture = self.gesture;
        let Some(origin) = gesture.origin() else {
            return false;
        };
        if origin.pointer_id != event.pointer_id {
            return false;
        }

        let delta_x = event.x - origin.pointer.x;
        let delta_y = event.y - origin.pointer.y;

        let changed = match gesture {
            Gesture::Idle => false,
            Gesture::Dragging(origin) => store.update(origin.target, |element| {
                element.position = Point::new(
                    origin.original.position.x + delta_x,
                    origin.original.position.y + delta_y,
                );
            }),
            Gesture::Resizing(origin) => {
                let scale = resized_scale(origin.original.scale, delta_x, delta_y);
                store.update(origin.target, |element| element.set_scale(scale))
            }
            Gesture::Rotating(origin) => {
                let Some(element) = store.find(origin.target) else {
                    return self.abandon(origin.target);
                };
                let center = geometry::bounding_box(element, store.measurer()).center();
                let rotation = pointer_angle(center, event.x, event.y);
                store.update(origin.target, |element| element.rotation = rotation)
            }
        };

        if !store.contains(origin.target) {
            return self.abandon(origin.target);
        }
        changed
    }

    /// Handle up, leave or cancel: commit and return to idle.
    ///
    /// Returns `None` if no gesture was active or the event belongs to a
    /// different pointer.
    pub fn pointer_up(&mut self, store: &ElementStore, event: &PointerEvent) -> Option<GestureEnd> {
        let origin = *self.gesture.origin()?;
        if origin.pointer_id != event.pointer_id {
            return None;
        }
        let kind = self.gesture.kind()?;
        self.gesture = Gesture::Idle;

        let changed = store.find(origin.target).is_some_and(|element| {
            element.position != origin.original.position
                || (element.scale() - origin.original.scale).abs() > f32::EPSILON
                || (element.rotation - origin.original.rotation).abs() > f32::EPSILON
        });
        tracing::debug!("Finished {kind:?} on {} (changed: {changed})", origin.target);
        Some(GestureEnd {
            kind,
            target: origin.target,
            original: origin.original,
            changed,
        })
    }

    /// Drop any active gesture without committing.
    pub fn reset(&mut self) {
        self.gesture = Gesture::Idle;
    }

    fn abandon(&mut self, target: ElementId) -> bool {
        tracing::debug!("Gesture target {target} vanished; returning to idle");
        self.gesture = Gesture::Idle;
        false
    }
}

/// Scale after a resize drag of `(delta_x, delta_y)`.
///
/// Scale grows with the distance dragged, whatever the direction.
#[must_use]
pub fn resized_scale(original: f32, delta_x: f32, delta_y: f32) -> f32 {
    let distance = delta_x.hypot(delta_y);
    (original + distance / RESIZE_DISTANCE_PER_UNIT_SCALE).max(MIN_SCALE)
}

/// Angle in degrees from `center` to the pointer.
#[must_use]
pub fn pointer_angle(center: Point, x: f32, y: f32) -> f32 {
    (y - center.y).atan2(x - center.x).to_degrees()
}
