//! WebAssembly bindings for meme-core.
//!
//! The browser page keeps its DOM as a thin view over [`WasmEditor`]: it
//! forwards input as events and redraws from [`WasmEditor::get_view_json`]
//! whenever [`WasmEditor::needs_render`] is true.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::{
    geometry, BoardSize, Editor, EditorConfig, EditorEvent, Element, KeyValueStore, Persistence,
    PointerEvent, PointerPhase, StorageError, ToolbarState, DEFAULT_STORAGE_KEY,
};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();
}

/// The browser's `window.localStorage`.
///
/// The storage object is looked up on every access, so the handle itself
/// holds no JS value.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    fn storage() -> Result<web_sys::Storage, StorageError> {
        web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window".into()))?
            .local_storage()
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))?
            .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".into()))
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::WriteRejected(format!("{e:?}")))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| StorageError::WriteRejected(format!("{e:?}")))
    }
}

/// One element as the DOM binding needs it.
#[derive(Debug, Serialize)]
struct ElementView<'a> {
    #[serde(flatten)]
    element: &'a Element,
    width: f32,
    height: f32,
    selected: bool,
    handles: bool,
}

/// Everything needed to redraw the page.
#[derive(Debug, Serialize)]
struct ViewState<'a> {
    background: String,
    elements: Vec<ElementView<'a>>,
    toolbar: &'a ToolbarState,
    has_shareable_content: bool,
}

/// Editor instance for WASM.
#[wasm_bindgen]
pub struct WasmEditor {
    editor: Editor,
}

#[wasm_bindgen]
impl WasmEditor {
    /// Restore the editor from `localStorage` for a board of the given size.
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        let config = EditorConfig {
            board: BoardSize::new(width, height),
            ..EditorConfig::default()
        };
        Self::with_persistence(config, Persistence::new(LocalStorage, DEFAULT_STORAGE_KEY))
    }

    /// Apply an [`EditorEvent`] serialized as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error string if the JSON is not a valid event.
    #[wasm_bindgen(js_name = handleEventJson)]
    pub fn handle_event_json(&mut self, json: &str) -> Result<(), String> {
        let event: EditorEvent = serde_json::from_str(json).map_err(|e| e.to_string())?;
        self.editor.handle_event(event);
        Ok(())
    }

    /// Forward a pointer event (`"down"`, `"move"`, `"up"`, `"leave"`, `"cancel"`).
    ///
    /// # Errors
    ///
    /// Returns an error string for an unknown phase.
    #[wasm_bindgen(js_name = pointer)]
    pub fn pointer(&mut self, phase: &str, x: f32, y: f32, pointer_id: u32) -> Result<(), String> {
        let phase = match phase {
            "down" => PointerPhase::Down,
            "move" => PointerPhase::Move,
            "up" => PointerPhase::Up,
            "leave" => PointerPhase::Leave,
            "cancel" => PointerPhase::Cancel,
            other => return Err(format!("unknown pointer phase: {other}")),
        };
        let mut event = PointerEvent::new(phase, x, y);
        event.pointer_id = pointer_id;
        self.editor.handle_event(EditorEvent::Pointer(event));
        Ok(())
    }

    /// Current view as JSON.
    #[wasm_bindgen(js_name = getViewJson)]
    #[must_use]
    pub fn get_view_json(&self) -> String {
        let store = self.editor.store();
        let selection = self.editor.selection();
        let elements = store
            .iter()
            .map(|element| {
                let bbox = geometry::bounding_box(element, store.measurer());
                ElementView {
                    element,
                    width: bbox.w,
                    height: bbox.h,
                    selected: selection.is_selected(element.id),
                    handles: selection.handles_for() == Some(element.id),
                }
            })
            .collect();
        let view = ViewState {
            background: self.editor.background().descriptor(),
            elements,
            toolbar: selection.toolbar(),
            has_shareable_content: self.editor.has_shareable_content(),
        };
        serde_json::to_string(&view).unwrap_or_default()
    }

    /// The document that would be persisted, as JSON.
    #[wasm_bindgen(js_name = getStateJson)]
    #[must_use]
    pub fn get_state_json(&self) -> String {
        self.editor.snapshot().to_json().unwrap_or_default()
    }

    /// Whether the view changed since the last [`mark_rendered`](Self::mark_rendered).
    #[wasm_bindgen(js_name = needsRender)]
    #[must_use]
    pub fn needs_render(&self) -> bool {
        self.editor.needs_render()
    }

    /// Record that the page has been redrawn.
    #[wasm_bindgen(js_name = markRendered)]
    pub fn mark_rendered(&mut self) {
        self.editor.mark_rendered();
    }

    /// Whether there is something worth sharing.
    #[wasm_bindgen(js_name = hasShareableContent)]
    #[must_use]
    pub fn has_shareable_content(&self) -> bool {
        self.editor.has_shareable_content()
    }

    /// Autosave tick: save if dirty.
    ///
    /// # Errors
    ///
    /// Returns an error string if `localStorage` rejects the write.
    #[wasm_bindgen(js_name = autosave)]
    pub fn autosave(&mut self) -> Result<bool, String> {
        self.editor.save_if_dirty().map_err(|e| e.to_string())
    }

    /// `beforeunload`: end authoring and save.
    ///
    /// # Errors
    ///
    /// Returns an error string if `localStorage` rejects the write.
    #[wasm_bindgen(js_name = close)]
    pub fn close(&mut self) -> Result<(), String> {
        self.editor.close().map_err(|e| e.to_string())
    }
}

impl WasmEditor {
    /// Restore from an arbitrary slot.
    #[must_use]
    pub fn with_persistence(config: EditorConfig, persistence: Persistence) -> Self {
        Self {
            editor: Editor::restore(config, persistence),
        }
    }
}
