//! Editor Integration Tests
//!
//! Drives the editor through its public event API:
//! - Creating, moving and styling elements
//! - Empty-text discard when authoring ends
//! - Topmost-wins hit-testing
//! - Persistence round trips and corrupt-state recovery

use meme_core::{
    Background, Editor, EditorConfig, EditorEvent, ElementId, ElementKind, ElementStore,
    FileStorage, InteractionController, KeyValueStore, MemoryStorage, Persistence, Point,
    PointerEvent, DEFAULT_CAPTION, DEFAULT_STORAGE_KEY, MAX_FONT_SIZE, MIN_SCALE,
};

fn editor_with(storage: &MemoryStorage) -> Editor {
    Editor::restore(
        EditorConfig::default(),
        Persistence::new(storage.clone(), DEFAULT_STORAGE_KEY),
    )
}

fn empty_editor() -> Editor {
    Editor::new(EditorConfig::default(), Persistence::in_memory())
}

fn pointer(editor: &mut Editor, event: PointerEvent) {
    editor.handle_event(EditorEvent::Pointer(event));
}

/// Drag from `from` (snapped to whole pixels) by `delta`.
fn drag(editor: &mut Editor, from: Point, delta: (f32, f32)) {
    let from = Point::new(from.x.round(), from.y.round());
    let to = Point::new(from.x + delta.0, from.y + delta.1);
    pointer(editor, PointerEvent::down(from.x, from.y));
    pointer(editor, PointerEvent::moved(to.x, to.y));
    pointer(editor, PointerEvent::up(to.x, to.y));
}

fn centre_of(editor: &Editor, id: ElementId) -> Point {
    editor
        .store()
        .bounding_box(id)
        .expect("element exists")
        .center()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_add_and_move_text() {
    let mut editor = empty_editor();
    let id = editor.add_text(Some("Hi"));
    let start = editor.store().find(id).expect("created").position;

    let centre = centre_of(&editor, id);
    drag(&mut editor, centre, (50.0, -20.0));

    let end = editor.store().find(id).expect("still there").position;
    assert_eq!(end, Point::new(start.x + 50.0, start.y - 20.0));
}

#[test]
fn test_font_size_clamps_at_maximum() {
    let mut editor = empty_editor();
    let id = editor.add_text(Some("big"));
    for _ in 0..30 {
        editor.handle_event(EditorEvent::IncreaseFontSize);
    }
    let size = editor
        .store()
        .find(id)
        .and_then(|e| e.text_style())
        .map(|s| s.font_size);
    assert_eq!(size, Some(MAX_FONT_SIZE));
}

#[test]
fn test_empty_text_discarded_when_authoring_ends() {
    let mut editor = empty_editor();
    editor.add_text(Some("existing"));
    editor.deselect();
    let count = editor.store().len();

    // Tap empty canvas far from the existing caption.
    pointer(&mut editor, PointerEvent::down(5.0, 5.0));
    pointer(&mut editor, PointerEvent::up(5.0, 5.0));
    assert_eq!(editor.store().len(), count + 1);
    assert!(editor.authoring().is_some());

    editor.handle_event(EditorEvent::Done);
    assert_eq!(editor.store().len(), count);
}

#[test]
fn test_empty_text_never_persisted() {
    let storage = MemoryStorage::new();
    let mut editor = editor_with(&storage);
    editor.tap_canvas(Point::new(5.0, 5.0));
    editor.save().expect("save");

    let saved = storage
        .get(DEFAULT_STORAGE_KEY)
        .expect("read")
        .expect("slot written");
    let value: serde_json::Value = serde_json::from_str(&saved).expect("json");
    assert_eq!(value["layers"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_topmost_element_wins_hit_test() {
    let mut editor = empty_editor();
    let a = editor.add_sticker("🅰").expect("a");
    let b = editor.add_sticker("🅱").expect("b");
    // Both are centred, so they overlap completely.
    editor.deselect();

    let centre = centre_of(&editor, a);
    pointer(&mut editor, PointerEvent::down(centre.x, centre.y));
    assert_eq!(editor.selection().selected(), Some(b));
    pointer(&mut editor, PointerEvent::up(centre.x, centre.y));
}

#[test]
fn test_corrupt_state_falls_back_to_default() {
    let storage = MemoryStorage::new();
    storage.set(DEFAULT_STORAGE_KEY, "not json").expect("seed slot");

    let editor = editor_with(&storage);
    assert_eq!(editor.store().len(), 1);
    assert_eq!(
        editor.store().all()[0].text_content(),
        Some(DEFAULT_CAPTION)
    );
    assert_eq!(editor.background(), &Background::default());
}

#[test]
fn test_hostile_saved_background_restores_softly() {
    let cases = [
        ("aéééééééé", Background::Solid("aéééééééé".into())),
        ("linear-gradient(", Background::default()),
        (
            "linear-gradient(é, ü)",
            Background::LinearGradient {
                angle: 180.0,
                from: "é".into(),
                to: "ü".into(),
            },
        ),
        ("<svg onload=x>", Background::default()),
    ];
    for (descriptor, expected) in cases {
        let storage = MemoryStorage::new();
        let json = serde_json::json!({ "backgroundColor": descriptor, "layers": [] });
        storage
            .set(DEFAULT_STORAGE_KEY, &json.to_string())
            .expect("seed slot");

        let editor = editor_with(&storage);
        assert_eq!(editor.background(), &expected, "restoring {descriptor:?}");
    }
}

#[test]
fn test_hostile_background_descriptor_is_applied_softly() {
    let mut editor = empty_editor();
    assert!(editor.set_background("aéééééééé"));
    assert_eq!(editor.background(), &Background::Solid("aéééééééé".into()));

    assert!(editor.set_background("linear-gradient("));
    assert_eq!(editor.background(), &Background::default());

    assert!(editor.set_background("LINEAR-GRADIENT(#000, 🌈)"));
    assert!(matches!(
        editor.background(),
        Background::LinearGradient { .. }
    ));
}

#[test]
fn test_restore_from_file_storage() {
    let dir = tempfile::tempdir().expect("tempdir");
    let persistence = || Persistence::new(FileStorage::new(dir.path()), DEFAULT_STORAGE_KEY);

    let mut editor = Editor::restore(EditorConfig::default(), persistence());
    editor.add_sticker("🐸");
    editor.set_background("linear-gradient(135deg, #667eea 0%, #764ba2 100%)");
    editor.close().expect("final save");
    let saved = editor.snapshot();

    let reopened = Editor::restore(EditorConfig::default(), persistence());
    assert_eq!(reopened.snapshot(), saved);
    assert_eq!(reopened.store().len(), 2);
    assert!(matches!(
        reopened.background(),
        Background::LinearGradient { .. }
    ));
}

#[test]
fn test_cancel_mid_drag_leaves_no_stuck_gesture() {
    let mut editor = empty_editor();
    let id = editor.add_sticker("🔥").expect("sticker");
    let centre = centre_of(&editor, id);
    pointer(&mut editor, PointerEvent::down(centre.x, centre.y));
    pointer(&mut editor, PointerEvent::moved(centre.x + 5.0, centre.y));
    pointer(
        &mut editor,
        PointerEvent::new(meme_core::PointerPhase::Cancel, 0.0, 0.0),
    );
    assert!(editor.gesture() == &meme_core::Gesture::Idle);

    // Further moves do nothing.
    let position = editor.store().find(id).map(|e| e.position);
    pointer(&mut editor, PointerEvent::moved(300.0, 300.0));
    assert_eq!(editor.store().find(id).map(|e| e.position), position);
}

#[test]
fn test_event_script_from_json() {
    let script = r##"[
        {"type":"add_text","data":{"content":"when the build passes"}},
        {"type":"set_text_color","data":{"color":"#ffcc00"}},
        {"type":"set_text_align","data":{"align":"left"}},
        {"type":"add_sticker","data":{"glyph":"🎉"}},
        {"type":"set_background","data":{"descriptor":"#222"}},
        {"type":"undo"},
        {"type":"done"}
    ]"##;
    let events: Vec<EditorEvent> = serde_json::from_str(script).expect("parse script");
    let mut editor = empty_editor();
    for event in events {
        editor.handle_event(event);
    }
    assert_eq!(editor.store().len(), 2);
    assert_eq!(editor.background(), &Background::default());
    assert!(editor.has_shareable_content());
    assert_eq!(editor.selection().selected(), None);
}

// ============================================================================
// Properties
// ============================================================================

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[derive(Debug, Clone)]
    enum Op {
        Text(String),
        Sticker(String),
        Background(&'static str),
        Bigger,
        Smaller,
        Color(&'static str),
        DragLast(i16, i16),
        DeleteSelected,
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            "[a-zA-Z !?]{1,16}".prop_map(Op::Text),
            prop::sample::select(vec!["😂", "🔥", "🐸", "💯"])
                .prop_map(|g| Op::Sticker(g.to_string())),
            prop::sample::select(vec![
                "#3498db",
                "red",
                "linear-gradient(135deg, #667eea, #764ba2)",
                "linear-gradient(to right, #000 0%, #fff 100%)",
            ])
            .prop_map(Op::Background),
            Just(Op::Bigger),
            Just(Op::Smaller),
            prop::sample::select(vec!["white", "black", "#ff0000"]).prop_map(Op::Color),
            (-120i16..120, -120i16..120).prop_map(|(dx, dy)| Op::DragLast(dx, dy)),
            Just(Op::DeleteSelected),
        ]
    }

    fn apply(editor: &mut Editor, op: &Op) {
        match op {
            Op::Text(text) => {
                editor.add_text(Some(text.as_str()));
            }
            Op::Sticker(glyph) => {
                editor.add_sticker(glyph);
            }
            Op::Background(descriptor) => {
                editor.set_background(descriptor);
            }
            Op::Bigger => {
                editor.increase_font_size();
            }
            Op::Smaller => {
                editor.decrease_font_size();
            }
            Op::Color(color) => {
                editor.set_text_color(color);
            }
            Op::DragLast(dx, dy) => {
                if let Some(last) = editor.store().all().last().map(|e| e.id) {
                    let from = centre_of(editor, last);
                    drag(editor, from, (f32::from(*dx), f32::from(*dy)));
                }
            }
            Op::DeleteSelected => {
                editor.delete_selected();
            }
        }
    }

    proptest! {
        #[test]
        fn prop_ids_are_unique(
            creates in 1usize..60,
            deletes in prop::collection::vec(any::<prop::sample::Index>(), 0..20)
        ) {
            let mut store = ElementStore::default();
            let mut seen = HashSet::new();
            for i in 0..creates {
                let id = store.create(ElementKind::text(format!("{i}")), None);
                prop_assert!(seen.insert(id), "id {} handed out twice", id);
            }
            for index in deletes {
                if store.is_empty() {
                    break;
                }
                let victim = store.all()[index.index(store.len())].id;
                store.delete(victim);
                let fresh = store.create(ElementKind::sticker("🔥"), None);
                prop_assert!(seen.insert(fresh), "id {} reused after delete", fresh);
            }
            let live: HashSet<_> = store.iter().map(|e| e.id).collect();
            prop_assert_eq!(live.len(), store.len());
        }

        #[test]
        fn prop_resize_never_goes_below_floor(
            start in 0.5f32..4.0,
            moves in prop::collection::vec((-400.0f32..400.0, -400.0f32..400.0), 0..8)
        ) {
            let mut store = ElementStore::default();
            let id = store.create(ElementKind::text("resize"), Some(Point::new(100.0, 100.0)));
            store.update(id, |e| e.set_scale(start));
            let handle = meme_core::geometry::resize_handle_center(
                store.find(id).expect("exists"),
                store.measurer(),
            );

            let mut controller = InteractionController::new();
            controller.pointer_down(&store, Some(id), &PointerEvent::down(handle.x, handle.y));
            for (dx, dy) in moves {
                let to = PointerEvent::moved(handle.x + dx, handle.y + dy);
                controller.pointer_move(&mut store, &to);
                let scale = store.find(id).expect("exists").scale();
                prop_assert!(scale >= MIN_SCALE);
                prop_assert!(scale >= start - f32::EPSILON);
            }
        }

        #[test]
        fn prop_persistence_round_trip(ops in prop::collection::vec(arb_op(), 0..24)) {
            let storage = MemoryStorage::new();
            let mut editor = Editor::new(
                EditorConfig::default(),
                Persistence::new(storage.clone(), DEFAULT_STORAGE_KEY),
            );
            for op in &ops {
                apply(&mut editor, op);
            }
            editor.save().expect("save");
            let first = storage.get(DEFAULT_STORAGE_KEY).expect("read").expect("written");

            let mut reopened = editor_with(&storage);
            reopened.save().expect("save again");
            let second = storage.get(DEFAULT_STORAGE_KEY).expect("read").expect("written");

            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_any_background_descriptor_is_accepted(
            descriptor in any::<String>(),
            tail in "\\PC{0,12}",
        ) {
            let mut editor = empty_editor();
            editor.set_background(&descriptor);
            editor.set_background(&format!("linear-gradient({tail}"));

            let storage = MemoryStorage::new();
            let json = serde_json::json!({ "backgroundColor": descriptor, "layers": [] });
            storage.set(DEFAULT_STORAGE_KEY, &json.to_string()).expect("seed slot");
            let restored = editor_with(&storage);
            prop_assert!(!restored.background().primary_color().is_empty());
        }
    }
}
