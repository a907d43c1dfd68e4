//! Selection tracking and the contextual text toolbar.

use std::collections::HashSet;

use serde::Serialize;

use crate::element::{
    clamp_font_size, ElementId, ElementPatch, TextAlign, TextStyle, FONT_SIZE_STEP,
};
use crate::store::ElementStore;

/// What the text toolbar currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolbarState {
    /// Whether the toolbar is open.
    pub visible: bool,
    /// Font size of the selected text.
    pub font_size: Option<u32>,
    /// Fill color of the selected text.
    pub color: Option<String>,
    /// Alignment of the selected text.
    pub text_align: Option<TextAlign>,
    /// Font family of the selected text.
    pub font_family: Option<String>,
}

impl ToolbarState {
    fn showing(style: &TextStyle) -> Self {
        Self {
            visible: true,
            font_size: Some(style.font_size),
            color: Some(style.color.clone()),
            text_align: Some(style.text_align),
            font_family: Some(style.font_family.clone()),
        }
    }
}

/// Tracks the single selected element and routes style edits to it.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    selected: Option<ElementId>,
    focused: Option<ElementId>,
    handles: HashSet<ElementId>,
    toolbar: ToolbarState,
}

impl Selection {
    /// Create an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select an element, replacing any previous selection.
    ///
    /// Text elements get resize/rotate handles attached the first time they
    /// are selected, open the toolbar, and take input focus. Selecting a
    /// missing id is a no-op.
    pub fn select(&mut self, store: &ElementStore, id: ElementId) -> bool {
        let Some(element) = store.find(id) else {
            tracing::debug!("Ignoring selection of missing element {id}");
            return false;
        };
        self.deselect();
        self.selected = Some(id);

        if let Some(style) = element.text_style() {
            if self.handles.insert(id) {
                tracing::debug!("Attached transform handles to {id}");
            }
            self.toolbar = ToolbarState::showing(style);
            self.focused = Some(id);
        }
        true
    }

    /// Clear the selection and hide the toolbar.
    pub fn deselect(&mut self) {
        self.selected = None;
        self.focused = None;
        self.toolbar = ToolbarState::default();
    }

    /// The selected element.
    #[must_use]
    pub fn selected(&self) -> Option<ElementId> {
        self.selected
    }

    /// Whether `id` is selected.
    #[must_use]
    pub fn is_selected(&self, id: ElementId) -> bool {
        self.selected == Some(id)
    }

    /// The element holding input focus.
    #[must_use]
    pub fn focused(&self) -> Option<ElementId> {
        self.focused
    }

    /// Whether handles have been attached to `id`.
    #[must_use]
    pub fn has_handles(&self, id: ElementId) -> bool {
        self.handles.contains(&id)
    }

    /// The selected element, if it shows handles.
    #[must_use]
    pub fn handles_for(&self) -> Option<ElementId> {
        self.selected.filter(|id| self.handles.contains(id))
    }

    /// The toolbar state.
    #[must_use]
    pub fn toolbar(&self) -> &ToolbarState {
        &self.toolbar
    }

    /// Re-sync with the store after outside changes (delete, undo).
    pub fn refresh(&mut self, store: &ElementStore) {
        self.handles.retain(|id| store.contains(*id));
        match self.selected.and_then(|id| store.find(id)) {
            Some(element) => {
                if let Some(style) = element.text_style() {
                    self.toolbar = ToolbarState::showing(style);
                }
            }
            None if self.selected.is_some() => self.deselect(),
            None => {}
        }
    }

    /// Toolbar "A+": grow the selected text by one step, up to the maximum.
    pub fn increase_font_size(&mut self, store: &mut ElementStore) -> bool {
        self.edit_selected_text(store, |style| ElementPatch {
            font_size: Some(clamp_font_size(style.font_size.saturating_add(FONT_SIZE_STEP))),
            ..ElementPatch::default()
        })
    }

    /// Toolbar "A-": shrink the selected text by one step, down to the minimum.
    pub fn decrease_font_size(&mut self, store: &mut ElementStore) -> bool {
        self.edit_selected_text(store, |style| ElementPatch {
            font_size: Some(clamp_font_size(style.font_size.saturating_sub(FONT_SIZE_STEP))),
            ..ElementPatch::default()
        })
    }

    /// Set the selected text's fill color.
    pub fn set_text_color(&mut self, store: &mut ElementStore, color: &str) -> bool {
        self.edit_selected_text(store, |_| ElementPatch {
            color: Some(color.to_string()),
            ..ElementPatch::default()
        })
    }

    /// Set the selected text's alignment.
    pub fn set_text_align(&mut self, store: &mut ElementStore, align: TextAlign) -> bool {
        self.edit_selected_text(store, |_| ElementPatch {
            text_align: Some(align),
            ..ElementPatch::default()
        })
    }

    /// Set the selected text's font family.
    pub fn set_font_family(&mut self, store: &mut ElementStore, family: &str) -> bool {
        self.edit_selected_text(store, |_| ElementPatch {
            font_family: Some(family.to_string()),
            ..ElementPatch::default()
        })
    }

    fn edit_selected_text<F>(&mut self, store: &mut ElementStore, patch: F) -> bool
    where
        F: FnOnce(&TextStyle) -> ElementPatch,
    {
        let Some(id) = self.selected else {
            return false;
        };
        let Some(style) = store.find(id).and_then(|e| e.text_style()) else {
            return false;
        };
        let patch = patch(style);
        let changed = store.mutate(id, &patch);
        self.refresh(store);
        changed
    }
}

/// Whether there is anything worth exporting: at least one text element
/// with non-whitespace content.
#[must_use]
pub fn has_shareable_content(store: &ElementStore) -> bool {
    store
        .iter()
        .filter_map(|e| e.text_content())
        .any(|content| !content.trim().is_empty())
}
