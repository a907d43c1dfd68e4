//! Editing sessions: event-script replay with autosave, and export to file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use meme_core::{Editor, EditorEvent, SharedEditor};
use meme_renderer::{ExportFormat, RenderScene, Renderer};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::{AppError, AppResult};

/// Parse a JSON array of editor events.
///
/// # Errors
///
/// Returns [`AppError::Script`] if the JSON is not a list of events.
pub fn parse_script(json: &str) -> AppResult<Vec<EditorEvent>> {
    Ok(serde_json::from_str(json)?)
}

/// Read and parse an event script file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_script(path: &Path) -> AppResult<Vec<EditorEvent>> {
    let json = std::fs::read_to_string(path)?;
    parse_script(&json)
}

/// Handle to a running autosave task. Dropping it stops the task.
#[derive(Debug)]
pub struct AutosaveTask {
    handle: JoinHandle<()>,
}

impl AutosaveTask {
    /// Stop the task.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Whether the task has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for AutosaveTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// One open editor plus its autosave timer.
#[derive(Debug, Clone)]
pub struct Session {
    editor: SharedEditor,
    autosave_every: Duration,
}

impl Session {
    /// Start a session around an editor.
    #[must_use]
    pub fn new(editor: Editor, autosave_every: Duration) -> Self {
        Self {
            editor: SharedEditor::new(editor),
            autosave_every,
        }
    }

    /// The shared editor handle.
    #[must_use]
    pub fn editor(&self) -> &SharedEditor {
        &self.editor
    }

    /// Spawn the periodic autosave task. Each tick saves only if the editor
    /// changed since the last save.
    #[must_use]
    pub fn spawn_autosave(&self) -> AutosaveTask {
        let editor = self.editor.clone();
        let period = self.autosave_every.max(Duration::from_millis(10));
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match editor.save_if_dirty() {
                    Ok(true) => tracing::debug!("Autosaved"),
                    Ok(false) => {}
                    Err(e) => tracing::error!("Autosave failed: {e}"),
                }
            }
        });
        AutosaveTask { handle }
    }

    /// Apply events in order with autosave running, then close the session.
    /// Dropping the future before it completes also stops the autosave task.
    ///
    /// Returns the number of events applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the final save fails.
    #[tracing::instrument(skip_all, fields(events = events.len()))]
    pub async fn replay(&self, events: Vec<EditorEvent>) -> AppResult<usize> {
        let autosave = self.spawn_autosave();
        let mut applied = 0;
        for event in events {
            tracing::debug!(?event, "Replaying");
            self.editor.handle_event(event);
            applied += 1;
            tokio::task::yield_now().await;
        }
        autosave.abort();
        self.close()?;
        tracing::info!(applied, "Replay finished");
        Ok(applied)
    }

    /// End authoring and write the final snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot rejects the write.
    pub fn close(&self) -> AppResult<()> {
        self.editor.with(Editor::close)?;
        Ok(())
    }
}

/// Render the editor's board and write it to `out`, or to
/// `meme-<millis>.<ext>` in the current directory.
///
/// # Errors
///
/// Returns [`AppError::NothingToShare`] when no caption has text and `force`
/// is false, or an error if rendering or writing fails.
pub fn export_board(
    editor: &Editor,
    renderer: &Renderer,
    format: ExportFormat,
    out: Option<&Path>,
    force: bool,
) -> AppResult<PathBuf> {
    if !force && !editor.has_shareable_content() {
        return Err(AppError::NothingToShare);
    }
    let artifact = renderer.export(&RenderScene::from_editor(editor), format)?;
    let path = out.map_or_else(|| PathBuf::from(artifact.default_file_name()), Path::to_path_buf);
    artifact.save(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meme_core::{
        EditorConfig, KeyValueStore, MemoryStorage, Persistence, DEFAULT_STORAGE_KEY,
    };
    use meme_renderer::RendererConfig;

    fn renderer() -> Renderer {
        Renderer::new(RendererConfig {
            load_system_fonts: false,
            ..RendererConfig::default()
        })
    }

    #[test]
    fn test_parse_script_rejects_non_array() {
        assert!(matches!(
            parse_script(r#"{"type":"done"}"#),
            Err(AppError::Script(_))
        ));
        assert_eq!(parse_script("[]").expect("empty script").len(), 0);
    }

    #[tokio::test]
    async fn test_replay_saves_at_end() {
        let storage = MemoryStorage::new();
        let editor = Editor::new(
            EditorConfig::default(),
            Persistence::new(storage.clone(), DEFAULT_STORAGE_KEY),
        );
        let session = Session::new(editor, Duration::from_secs(10));
        let events = parse_script(
            r#"[
                {"type":"add_text","data":{"content":"hello"}},
                {"type":"pointer","data":{"phase":"down","x":5.0,"y":5.0}},
                {"type":"pointer","data":{"phase":"up","x":5.0,"y":5.0}}
            ]"#,
        )
        .expect("script");

        assert_eq!(session.replay(events).await.expect("replay"), 3);

        let saved = storage.get(DEFAULT_STORAGE_KEY).expect("read").expect("written");
        assert!(saved.contains("hello"));
        // The blank tap-created caption was discarded on close.
        assert_eq!(session.editor().with(|e| e.store().len()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_flushes_dirty_editor() {
        let storage = MemoryStorage::new();
        let editor = Editor::new(
            EditorConfig::default(),
            Persistence::new(storage.clone(), DEFAULT_STORAGE_KEY),
        );
        let session = Session::new(editor, Duration::from_secs(10));
        session.editor().with(|e| {
            let id = e.add_text(Some("draft"));
            e.select(id);
            e.edit_text("draft two");
        });
        assert!(session.editor().with(|e| e.is_dirty()));

        let autosave = session.spawn_autosave();
        tokio::time::sleep(Duration::from_secs(11)).await;
        autosave.abort();

        assert!(!session.editor().with(|e| e.is_dirty()));
        let saved = storage.get(DEFAULT_STORAGE_KEY).expect("read").expect("written");
        assert!(saved.contains("draft two"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_autosave_stops_saving() {
        let storage = MemoryStorage::new();
        let editor = Editor::new(
            EditorConfig::default(),
            Persistence::new(storage.clone(), DEFAULT_STORAGE_KEY),
        );
        let session = Session::new(editor, Duration::from_secs(10));
        session.editor().with(|e| {
            let id = e.add_text(Some("draft"));
            e.select(id);
            e.edit_text("never flushed");
        });

        drop(session.spawn_autosave());
        tokio::time::sleep(Duration::from_secs(25)).await;

        assert!(session.editor().with(|e| e.is_dirty()));
        let saved = storage.get(DEFAULT_STORAGE_KEY).expect("read").expect("written");
        assert!(!saved.contains("never flushed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_replay_stops_autosave() {
        let storage = MemoryStorage::new();
        let editor = Editor::new(
            EditorConfig::default(),
            Persistence::new(storage.clone(), DEFAULT_STORAGE_KEY),
        );
        let session = Session::new(editor, Duration::from_secs(10));
        let events = vec![EditorEvent::AddText { content: None }; 64];

        tokio::select! {
            _ = session.replay(events) => panic!("replay should be cancelled first"),
            () = tokio::task::yield_now() => {}
        }
        session.editor().with(|e| {
            let last = e.store().all().last().map(|el| el.id).expect("captions added");
            e.select(last);
            e.edit_text("typed after cancel");
        });
        tokio::time::sleep(Duration::from_secs(25)).await;

        assert!(session.editor().with(|e| e.is_dirty()));
        let saved = storage.get(DEFAULT_STORAGE_KEY).expect("read").expect("written");
        assert!(!saved.contains("typed after cancel"));
    }

    #[test]
    fn test_export_refuses_empty_board() {
        let editor = Editor::new(EditorConfig::default(), Persistence::in_memory());
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("meme.png");
        assert!(matches!(
            export_board(&editor, &renderer(), ExportFormat::Png, Some(&out), false),
            Err(AppError::NothingToShare)
        ));
        assert!(!out.exists());

        let forced = export_board(&editor, &renderer(), ExportFormat::Png, Some(&out), true)
            .expect("forced export");
        assert_eq!(forced, out);
        assert!(out.exists());
    }
}
