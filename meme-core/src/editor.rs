//! The editor: one explicit state object tying the model together.
//!
//! An [`Editor`] owns the element store, the selection, the gesture state,
//! the background, undo history and the persistence slot. Hosts feed it
//! [`EditorEvent`]s in delivery order and re-render whenever
//! [`Editor::needs_render`] says so.

use std::sync::Arc;

use crate::background::{Background, DEFAULT_BACKGROUND};
use crate::element::{ElementId, ElementKind, ElementPatch, Point, TextAlign};
use crate::error::CoreResult;
use crate::event::{EditorEvent, KeyModifiers, PointerEvent, PointerPhase};
use crate::geometry::{GlyphEstimate, TextMeasure};
use crate::history::{History, Snapshot, DEFAULT_HISTORY_LIMIT};
use crate::interaction::{Gesture, GestureEnd, InteractionController, PointerDown};
use crate::persistence::{Persistence, SavedState};
use crate::selection::{self, Selection};
use crate::store::{BoardSize, ElementStore};

/// Caption of the placeholder text on a fresh board.
pub const DEFAULT_CAPTION: &str = "Create your meme";

/// Caption given by the "add text" button.
pub const NEW_TEXT_CAPTION: &str = "New text";

/// Editor settings.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Board size.
    pub board: BoardSize,
    /// Background descriptor for a fresh board.
    pub background: String,
    /// Caption of the placeholder text on a fresh board.
    pub default_caption: String,
    /// Caption used by "add text" when none is given.
    pub new_text_caption: String,
    /// Number of undo steps kept.
    pub history_limit: usize,
    /// Text metrics used for every box computation.
    pub measurer: Arc<dyn TextMeasure>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            board: BoardSize::default(),
            background: DEFAULT_BACKGROUND.to_string(),
            default_caption: DEFAULT_CAPTION.to_string(),
            new_text_caption: NEW_TEXT_CAPTION.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            measurer: Arc::new(GlyphEstimate),
        }
    }
}

/// The meme editor state.
#[derive(Debug)]
pub struct Editor {
    config: EditorConfig,
    store: ElementStore,
    selection: Selection,
    interaction: InteractionController,
    background: Background,
    history: History,
    persistence: Persistence,
    /// Text element created by tapping empty canvas, until authoring ends.
    authoring: Option<ElementId>,
    /// Element whose consecutive text edits share one undo step.
    typing: Option<ElementId>,
    background_revision: u64,
    view_revision: u64,
    rendered_revision: Option<u64>,
    saved_revision: Option<u64>,
}

impl Editor {
    /// Create an editor with an empty board. Nothing is loaded.
    #[must_use]
    pub fn new(config: EditorConfig, persistence: Persistence) -> Self {
        let store = ElementStore::new(config.board, Arc::clone(&config.measurer));
        let background = Background::parse(&config.background);
        let history = History::new(config.history_limit);
        Self {
            config,
            store,
            selection: Selection::new(),
            interaction: InteractionController::new(),
            background,
            history,
            persistence,
            authoring: None,
            typing: None,
            background_revision: 0,
            view_revision: 0,
            rendered_revision: None,
            saved_revision: None,
        }
    }

    /// Create an editor from the persisted slot.
    ///
    /// A missing or unreadable slot yields the default board: one
    /// placeholder caption on the default background. The first text
    /// element is selected.
    #[must_use]
    pub fn restore(config: EditorConfig, persistence: Persistence) -> Self {
        let saved = persistence.load();
        let mut editor = Self::new(config, persistence);
        match saved {
            Some(state) => {
                editor.apply_saved(&state);
                editor.saved_revision = Some(editor.content_revision());
                tracing::info!("Restored {} element(s)", editor.store.len());
            }
            None => {
                let caption = editor.config.default_caption.clone();
                editor.store.create(ElementKind::text(caption), None);
                tracing::info!("No saved meme; starting with the default board");
            }
        }

        let first_text = editor.store.iter().find(|e| e.kind.is_text()).map(|e| e.id);
        if let Some(id) = first_text {
            editor.select(id);
        }
        editor
    }

    fn apply_saved(&mut self, state: &SavedState) {
        self.background = state.background();
        self.background_revision += 1;
        self.store.clear();
        for layer in state.restored_layers() {
            let id = self.store.create(layer.kind, layer.position);
            self.store.update(id, |element| {
                element.set_scale(layer.scale);
                element.rotation = layer.rotation;
            });
        }
        self.history.clear();
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Editor settings.
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The element store.
    #[must_use]
    pub fn store(&self) -> &ElementStore {
        &self.store
    }

    /// The selection and toolbar state.
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The active gesture.
    #[must_use]
    pub fn gesture(&self) -> &Gesture {
        self.interaction.gesture()
    }

    /// The board background.
    #[must_use]
    pub fn background(&self) -> &Background {
        &self.background
    }

    /// The text element currently being authored, if any.
    #[must_use]
    pub fn authoring(&self) -> Option<ElementId> {
        self.authoring
    }

    /// Undo/redo stacks.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// The persistence slot.
    #[must_use]
    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    /// Whether any text element has non-whitespace content.
    #[must_use]
    pub fn has_shareable_content(&self) -> bool {
        selection::has_shareable_content(&self.store)
    }

    // ------------------------------------------------------------------
    // Event dispatch
    // ------------------------------------------------------------------

    /// Apply one input event.
    pub fn handle_event(&mut self, event: EditorEvent) {
        tracing::trace!(?event, "Handling event");
        match event {
            EditorEvent::Pointer(pointer) => self.handle_pointer(&pointer),
            EditorEvent::Key { key, modifiers } => {
                self.handle_key(&key, modifiers);
            }
            EditorEvent::TextInput { content } => {
                self.edit_text(&content);
            }
            EditorEvent::AddText { content } => {
                self.add_text(content.as_deref());
            }
            EditorEvent::AddSticker { glyph } => {
                self.add_sticker(&glyph);
            }
            EditorEvent::SetBackground { descriptor } => {
                self.set_background(&descriptor);
            }
            EditorEvent::IncreaseFontSize => {
                self.increase_font_size();
            }
            EditorEvent::DecreaseFontSize => {
                self.decrease_font_size();
            }
            EditorEvent::SetTextColor { color } => {
                self.set_text_color(&color);
            }
            EditorEvent::SetTextAlign { align } => {
                self.set_text_align(align);
            }
            EditorEvent::SetFontFamily { family } => {
                self.set_font_family(&family);
            }
            EditorEvent::DeleteSelected => {
                self.delete_selected();
            }
            EditorEvent::Done => self.done(),
            EditorEvent::Undo => {
                self.undo();
            }
            EditorEvent::Redo => {
                self.redo();
            }
        }
    }

    fn handle_pointer(&mut self, event: &PointerEvent) {
        match event.phase {
            PointerPhase::Down => {
                let handles = self.selection.handles_for();
                match self.interaction.pointer_down(&self.store, handles, event) {
                    PointerDown::Started { target, .. } => {
                        if !self.selection.is_selected(target) {
                            self.select(target);
                        }
                    }
                    PointerDown::EmptyCanvas(point) => {
                        self.tap_canvas(point);
                    }
                    PointerDown::Ignored => {}
                }
            }
            PointerPhase::Move => {
                self.interaction.pointer_move(&mut self.store, event);
            }
            PointerPhase::Up | PointerPhase::Leave | PointerPhase::Cancel => {
                if let Some(end) = self.interaction.pointer_up(&self.store, event) {
                    self.finish_gesture(&end);
                }
            }
        }
    }

    fn finish_gesture(&mut self, end: &GestureEnd) {
        if !end.changed {
            return;
        }
        let mut before = self.capture();
        if let Some(element) = before.elements.iter_mut().find(|e| e.id == end.target) {
            element.position = end.original.position;
            element.set_scale(end.original.scale);
            element.rotation = end.original.rotation;
        }
        self.record(before);
        self.commit();
    }

    /// Apply a keyboard shortcut. Returns whether the key was handled.
    ///
    /// | Key | Action |
    /// |-----|--------|
    /// | `Escape` | deselect |
    /// | `Ctrl/Cmd+Z` | undo |
    /// | `Ctrl/Cmd+Y`, `Ctrl/Cmd+Shift+Z` | redo |
    /// | `Ctrl/Cmd+S` | save now |
    pub fn handle_key(&mut self, key: &str, modifiers: KeyModifiers) -> bool {
        if key == "Escape" {
            self.deselect();
            return true;
        }
        if !modifiers.command() {
            return false;
        }
        match key.to_ascii_lowercase().as_str() {
            "z" if modifiers.shift => {
                self.redo();
            }
            "z" => {
                self.undo();
            }
            "y" => {
                self.redo();
            }
            "s" => {
                if let Err(e) = self.save() {
                    tracing::error!("Save failed: {e}");
                }
            }
            _ => return false,
        }
        true
    }

    // ------------------------------------------------------------------
    // Element lifecycle
    // ------------------------------------------------------------------

    /// "Add text": a centred text element, selected.
    pub fn add_text(&mut self, content: Option<&str>) -> ElementId {
        self.finish_authoring();
        self.record(self.capture());
        let content = content.unwrap_or(&self.config.new_text_caption).to_string();
        let id = self.store.create(ElementKind::text(content), None);
        self.select(id);
        self.commit();
        id
    }

    /// Add a centred sticker, selected. Empty glyphs are ignored.
    pub fn add_sticker(&mut self, glyph: &str) -> Option<ElementId> {
        if glyph.trim().is_empty() {
            tracing::debug!("Ignoring empty sticker glyph");
            return None;
        }
        self.finish_authoring();
        self.record(self.capture());
        let id = self.store.create(ElementKind::sticker(glyph), None);
        self.select(id);
        self.commit();
        Some(id)
    }

    /// Tap on empty canvas: end any authoring and start a new, empty text
    /// element at the tap point.
    ///
    /// The new element is discarded if authoring ends before it gets
    /// content.
    pub fn tap_canvas(&mut self, point: Point) -> ElementId {
        self.finish_authoring();
        self.selection.deselect();
        let id = self.store.create(ElementKind::text(""), Some(point));
        self.authoring = Some(id);
        self.select(id);
        id
    }

    /// Replace the content of the focused text element.
    ///
    /// Consecutive edits of the same element form one undo step.
    pub fn edit_text(&mut self, content: &str) -> bool {
        let Some(id) = self.selection.focused() else {
            return false;
        };
        if self.store.find(id).and_then(|e| e.text_content()) == Some(content) {
            return false;
        }
        if self.typing != Some(id) {
            self.record(self.capture());
            self.typing = Some(id);
        }
        let changed = self.store.mutate(id, &ElementPatch::content(content));
        self.selection.refresh(&self.store);
        changed
    }

    /// Select an element. Selecting a different element ends authoring.
    pub fn select(&mut self, id: ElementId) -> bool {
        if !self.store.contains(id) {
            return false;
        }
        if self.authoring != Some(id) {
            self.finish_authoring();
        }
        self.typing = None;
        let selected = self.selection.select(&self.store, id);
        self.view_revision += 1;
        selected
    }

    /// Clear the selection, ending authoring.
    pub fn deselect(&mut self) {
        self.finish_authoring();
        self.typing = None;
        self.selection.deselect();
        self.view_revision += 1;
    }

    /// "Done": deselect, end authoring, persist.
    pub fn done(&mut self) {
        self.deselect();
        self.commit();
    }

    /// Delete the selected element.
    pub fn delete_selected(&mut self) -> bool {
        let Some(id) = self.selection.selected() else {
            return false;
        };
        if self.authoring == Some(id) {
            self.deselect();
            return true;
        }
        self.record(self.capture());
        let removed = self.store.delete(id).is_some();
        self.selection.refresh(&self.store);
        self.view_revision += 1;
        self.commit();
        removed
    }

    /// End the session: discard an empty authoring element and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the final save fails.
    pub fn close(&mut self) -> CoreResult<()> {
        self.finish_authoring();
        self.interaction.reset();
        self.save()
    }

    fn finish_authoring(&mut self) -> bool {
        let Some(id) = self.authoring.take() else {
            return false;
        };
        if !self.store.find(id).is_some_and(crate::Element::is_blank_text) {
            return false;
        }
        self.store.delete(id);
        self.selection.refresh(&self.store);
        if self.typing == Some(id) {
            self.typing = None;
        }
        tracing::debug!("Discarded empty text element {id}");
        true
    }

    // ------------------------------------------------------------------
    // Styling
    // ------------------------------------------------------------------

    /// Set the board background from a descriptor.
    pub fn set_background(&mut self, descriptor: &str) -> bool {
        let background = Background::parse(descriptor);
        if background == self.background {
            return false;
        }
        self.record(self.capture());
        self.background = background;
        self.background_revision += 1;
        self.commit();
        true
    }

    /// Grow the selected text by one step.
    pub fn increase_font_size(&mut self) -> bool {
        self.edit_style(Selection::increase_font_size)
    }

    /// Shrink the selected text by one step.
    pub fn decrease_font_size(&mut self) -> bool {
        self.edit_style(Selection::decrease_font_size)
    }

    /// Set the selected text's color.
    pub fn set_text_color(&mut self, color: &str) -> bool {
        self.edit_style(|selection, store| selection.set_text_color(store, color))
    }

    /// Set the selected text's alignment.
    pub fn set_text_align(&mut self, align: TextAlign) -> bool {
        self.edit_style(|selection, store| selection.set_text_align(store, align))
    }

    /// Set the selected text's font family.
    pub fn set_font_family(&mut self, family: &str) -> bool {
        self.edit_style(|selection, store| selection.set_font_family(store, family))
    }

    fn edit_style<F>(&mut self, edit: F) -> bool
    where
        F: FnOnce(&mut Selection, &mut ElementStore) -> bool,
    {
        let before = self.capture();
        let changed = edit(&mut self.selection, &mut self.store);
        if changed {
            self.record(before);
            self.commit();
        }
        changed
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Undo the last change.
    pub fn undo(&mut self) -> bool {
        let current = self.capture();
        match self.history.undo(current) {
            Some(previous) => {
                self.apply_snapshot(previous);
                true
            }
            None => false,
        }
    }

    /// Redo the last undone change.
    pub fn redo(&mut self) -> bool {
        let current = self.capture();
        match self.history.redo(current) {
            Some(next) => {
                self.apply_snapshot(next);
                true
            }
            None => false,
        }
    }

    fn capture(&self) -> Snapshot {
        Snapshot {
            elements: self.persistable().cloned().collect(),
            background: self.background.clone(),
        }
    }

    fn record(&mut self, before: Snapshot) {
        self.history.checkpoint(before);
        self.typing = None;
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.interaction.reset();
        self.authoring = None;
        self.typing = None;
        self.store.replace_all(snapshot.elements);
        if snapshot.background != self.background {
            self.background = snapshot.background;
            self.background_revision += 1;
        }
        self.selection.refresh(&self.store);
        self.view_revision += 1;
        self.commit();
    }

    // ------------------------------------------------------------------
    // Persistence and rendering bookkeeping
    // ------------------------------------------------------------------

    /// Elements that belong in saved state: everything except an empty
    /// authoring element.
    fn persistable(&self) -> impl Iterator<Item = &crate::Element> {
        let authoring = self.authoring;
        self.store
            .iter()
            .filter(move |e| !(Some(e.id) == authoring && e.is_blank_text()))
    }

    /// The document that would be saved now.
    #[must_use]
    pub fn snapshot(&self) -> SavedState {
        SavedState::capture(self.persistable(), &self.background)
    }

    /// Save now.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot rejects the write.
    pub fn save(&mut self) -> CoreResult<()> {
        self.persistence.save(&self.snapshot())?;
        self.saved_revision = Some(self.content_revision());
        Ok(())
    }

    /// Save if anything changed since the last save. Returns whether a
    /// save happened.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot rejects the write.
    pub fn save_if_dirty(&mut self) -> CoreResult<bool> {
        if !self.is_dirty() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Whether content changed since the last save.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.saved_revision != Some(self.content_revision())
    }

    fn commit(&mut self) {
        if let Err(e) = self.save_if_dirty() {
            tracing::error!("Failed to persist meme: {e}");
        }
    }

    fn content_revision(&self) -> u64 {
        self.store.revision().wrapping_add(self.background_revision)
    }

    fn render_revision(&self) -> u64 {
        self.content_revision().wrapping_add(self.view_revision)
    }

    /// Whether anything visible changed since [`mark_rendered`](Self::mark_rendered).
    #[must_use]
    pub fn needs_render(&self) -> bool {
        self.rendered_revision != Some(self.render_revision())
    }

    /// Record that the current state has been drawn.
    pub fn mark_rendered(&mut self) {
        self.rendered_revision = Some(self.render_revision());
    }
}
