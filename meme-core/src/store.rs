//! Ordered storage for placed elements.
//!
//! Store order is paint order: later elements are drawn over earlier ones,
//! and hit-testing walks from the last element back to the first so the
//! element on top wins.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementId, ElementKind, ElementPatch, Point};
use crate::geometry::{self, BoundingBox, GlyphEstimate, TextMeasure};

/// Default board width in pixels.
pub const DEFAULT_BOARD_WIDTH: f32 = 400.0;

/// Default board height in pixels.
pub const DEFAULT_BOARD_HEIGHT: f32 = 600.0;

/// Size of the editing surface in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardSize {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl BoardSize {
    /// Create a board size.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for BoardSize {
    fn default() -> Self {
        Self::new(DEFAULT_BOARD_WIDTH, DEFAULT_BOARD_HEIGHT)
    }
}

/// The ordered collection of elements on the board.
///
/// Every successful mutation bumps [`revision`](Self::revision); owners
/// compare revisions to know when a re-render or a save is due.
#[derive(Debug, Clone)]
pub struct ElementStore {
    elements: Vec<Element>,
    board: BoardSize,
    measurer: Arc<dyn TextMeasure>,
    revision: u64,
}

impl ElementStore {
    /// Create an empty store for a board of the given size.
    #[must_use]
    pub fn new(board: BoardSize, measurer: Arc<dyn TextMeasure>) -> Self {
        Self {
            elements: Vec::new(),
            board,
            measurer,
            revision: 0,
        }
    }

    /// Create an empty store that estimates text metrics.
    #[must_use]
    pub fn with_estimate(board: BoardSize) -> Self {
        Self::new(board, Arc::new(GlyphEstimate))
    }

    /// The board this store lays elements out on.
    #[must_use]
    pub fn board(&self) -> BoardSize {
        self.board
    }

    /// Resize the board. Existing elements keep their positions.
    pub fn set_board(&mut self, board: BoardSize) {
        self.board = board;
        self.revision += 1;
    }

    /// The text measurer used for all box computations.
    #[must_use]
    pub fn measurer(&self) -> &dyn TextMeasure {
        self.measurer.as_ref()
    }

    /// Shared handle to the measurer.
    #[must_use]
    pub fn measurer_arc(&self) -> Arc<dyn TextMeasure> {
        Arc::clone(&self.measurer)
    }

    /// Create an element and append it on top.
    ///
    /// Without a position, the element's box is centred on the board.
    pub fn create(&mut self, kind: ElementKind, position: Option<Point>) -> ElementId {
        let mut element = Element::new(kind);
        element.position = position.unwrap_or_else(|| self.centered_position(&element));
        self.insert(element)
    }

    /// Append an existing element on top.
    ///
    /// If its id is already present a fresh id is assigned, keeping ids unique.
    pub fn insert(&mut self, mut element: Element) -> ElementId {
        if self.index_of(element.id).is_some() {
            element.id = ElementId::new();
        }
        let id = element.id;
        tracing::debug!(
            "Created {} element {id} at ({}, {})",
            element.kind.type_name(),
            element.position.x,
            element.position.y
        );
        self.elements.push(element);
        self.revision += 1;
        id
    }

    /// Top-left position that centres an element's box on the board.
    #[must_use]
    pub fn centered_position(&self, element: &Element) -> Point {
        let bbox = geometry::bounding_box(element, self.measurer());
        Point::new(
            self.board.width / 2.0 - bbox.w / 2.0,
            self.board.height / 2.0 - bbox.h / 2.0,
        )
    }

    /// Look up an element.
    #[must_use]
    pub fn find(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Mutable access to an element.
    ///
    /// The revision is bumped up front since the store cannot see what the
    /// caller changes. Prefer [`update`](Self::update) when change detection
    /// matters. The id must not be changed through this reference.
    pub fn find_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        let element = self.elements.iter_mut().find(|e| e.id == id)?;
        self.revision += 1;
        Some(element)
    }

    /// Whether an element exists.
    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.index_of(id).is_some()
    }

    /// Position of an element in paint order.
    #[must_use]
    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id == id)
    }

    /// Apply a patch. Returns whether the element exists and changed.
    /// Patching a missing id is a no-op.
    pub fn mutate(&mut self, id: ElementId, patch: &ElementPatch) -> bool {
        self.update(id, |element| {
            element.apply(patch);
        })
    }

    /// Update an element using a closure. Returns whether it changed.
    /// Updating a missing id is a no-op.
    pub fn update<F>(&mut self, id: ElementId, f: F) -> bool
    where
        F: FnOnce(&mut Element),
    {
        let Some(element) = self.elements.iter_mut().find(|e| e.id == id) else {
            tracing::debug!("Ignoring update for missing element {id}");
            return false;
        };
        let before = element.clone();
        f(element);
        // The id is the lookup key; closures may not change it.
        element.id = before.id;
        let changed = *element != before;
        if changed {
            self.revision += 1;
        }
        changed
    }

    /// Remove an element. Deleting a missing id is a no-op.
    pub fn delete(&mut self, id: ElementId) -> Option<Element> {
        let index = self.index_of(id)?;
        let removed = self.elements.remove(index);
        self.revision += 1;
        tracing::debug!("Deleted {} element {id}", removed.kind.type_name());
        Some(removed)
    }

    /// All elements, back to front.
    #[must_use]
    pub fn all(&self) -> &[Element] {
        &self.elements
    }

    /// Iterate elements, back to front.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Replace the whole collection (restore, undo/redo).
    pub fn replace_all(&mut self, elements: Vec<Element>) {
        self.elements.clear();
        for element in elements {
            self.insert(element);
        }
        self.revision += 1;
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.revision += 1;
    }

    /// The topmost element under a board point.
    #[must_use]
    pub fn element_at(&self, x: f32, y: f32) -> Option<ElementId> {
        self.elements
            .iter()
            .rev()
            .find(|e| geometry::contains_point(e, self.measurer(), x, y))
            .map(|e| e.id)
    }

    /// An element's unscaled box.
    #[must_use]
    pub fn bounding_box(&self, id: ElementId) -> Option<BoundingBox> {
        self.find(id)
            .map(|e| geometry::bounding_box(e, self.measurer()))
    }

    /// Monotonic change counter.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl Default for ElementStore {
    fn default() -> Self {
        Self::with_estimate(BoardSize::default())
    }
}
