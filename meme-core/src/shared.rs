//! Thread-safe handle to one editor.
//!
//! Multi-threaded hosts (an autosave task next to an input loop) share an
//! [`Editor`] through [`SharedEditor`]; every access goes through
//! [`SharedEditor::with`], so store mutations are serialized.

use std::sync::{Arc, Mutex, PoisonError};

use crate::editor::Editor;
use crate::error::CoreResult;
use crate::event::EditorEvent;

/// Cloneable, mutex-serialized editor handle.
#[derive(Debug, Clone)]
pub struct SharedEditor {
    inner: Arc<Mutex<Editor>>,
}

impl SharedEditor {
    /// Wrap an editor.
    #[must_use]
    pub fn new(editor: Editor) -> Self {
        Self {
            inner: Arc::new(Mutex::new(editor)),
        }
    }

    /// Run `f` with exclusive access to the editor. A poisoned lock is
    /// recovered.
    pub fn with<R>(&self, f: impl FnOnce(&mut Editor) -> R) -> R {
        let mut editor = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut editor)
    }

    /// Apply one event.
    pub fn handle_event(&self, event: EditorEvent) {
        self.with(|editor| editor.handle_event(event));
    }

    /// Save if dirty. Returns whether a save happened.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot rejects the write.
    pub fn save_if_dirty(&self) -> CoreResult<bool> {
        self.with(Editor::save_if_dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorConfig;
    use crate::persistence::Persistence;

    #[test]
    fn test_clones_share_one_editor() {
        let shared = SharedEditor::new(Editor::new(
            EditorConfig::default(),
            Persistence::in_memory(),
        ));
        let other = shared.clone();
        other.handle_event(EditorEvent::AddSticker {
            glyph: "🔥".into(),
        });
        assert_eq!(shared.with(|editor| editor.store().len()), 1);
    }

    #[test]
    fn test_concurrent_access_is_serialized() {
        let shared = SharedEditor::new(Editor::new(
            EditorConfig::default(),
            Persistence::in_memory(),
        ));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    shared.handle_event(EditorEvent::AddText {
                        content: Some(format!("caption {i}")),
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread");
        }
        assert_eq!(shared.with(|editor| editor.store().len()), 8);
        assert!(!shared.save_if_dirty().expect("save"));
    }
}
