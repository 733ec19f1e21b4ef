use std::sync::Arc;
use std::time::{Duration, Instant};

use montage::cache::{AssetCache, AssetState, MediaLoader, MediaSource};
use montage::editor::EditorService;
use montage::error::TimelineError;
use montage::interaction::{InteractionController, TrimEdge, Viewport};
use montage::model::clip::{Clip, SourceRef};
use montage::model::project::{Project, Resolution};
use montage::model::track::MediaKind;
use uuid::Uuid;

struct FixedLoader;

impl MediaLoader for FixedLoader {
    fn load(&self, _source: &SourceRef) -> Result<MediaSource, TimelineError> {
        Ok(MediaSource::procedural(64, 36, 1, Some(10.0)))
    }
}

fn setup() -> (EditorService, Uuid) {
    let project = Project::new("Test", Resolution::FULL_HD, 30.0);
    let cache = Arc::new(AssetCache::new(Arc::new(FixedLoader)));
    let editor = EditorService::new(project, cache);
    let track_id = editor.add_track(MediaKind::Video, "Video 1").unwrap();
    (editor, track_id)
}

fn add_clip(editor: &EditorService, track_id: Uuid, start: f64, duration: f64) -> Uuid {
    let clip = Clip::video("/media/a.mp4", start, duration);
    let id = editor.add_clip(track_id, clip).unwrap();
    let source = SourceRef::new("/media/a.mp4", MediaKind::Video);
    let cache = editor.asset_cache();
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        cache.poll();
        if matches!(cache.state(&source), Some(AssetState::Ready(_))) {
            return id;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    panic!("Source never became ready");
}

fn clip_of(editor: &EditorService, clip_id: Uuid) -> Clip {
    editor
        .with_project(|p| p.find_clip(clip_id).unwrap().1.clone())
        .unwrap()
}

#[test]
fn test_viewport_maps_pixels_to_seconds() {
    let viewport = Viewport::default();
    assert_eq!(viewport.x_to_time(100.0), 1.0);
    assert_eq!(viewport.time_to_x(2.5), 250.0);

    let zoomed = Viewport {
        base_px_per_second: 100.0,
        zoom: 2.0,
    };
    assert_eq!(zoomed.x_to_time(100.0), 0.5);
    assert_eq!(zoomed.time_to_x(1.0), 200.0);
}

#[test]
fn test_zoom_is_clamped() {
    let (editor, _) = setup();
    let mut controller = InteractionController::new(editor);

    controller.set_zoom(1000.0);
    assert_eq!(controller.viewport.zoom, 50.0);
    controller.set_zoom(0.001);
    assert_eq!(controller.viewport.zoom, 0.05);
}

#[test]
fn test_selection_plain_and_additive() {
    let (editor, _) = setup();
    let mut controller = InteractionController::new(editor);
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    controller.select(a, false);
    controller.select(b, false);
    assert_eq!(controller.selection().len(), 1);
    assert!(controller.selection().contains(&b));

    controller.select(a, true);
    assert_eq!(controller.selection().len(), 2);
    // Additive click on a selected clip deselects it.
    controller.select(a, true);
    assert!(!controller.selection().contains(&a));

    controller.clear_selection();
    assert!(controller.selection().is_empty());
}

#[test]
fn test_drag_rejection_holds_last_accepted_position() {
    let (editor, track_id) = setup();
    add_clip(&editor, track_id, 0.0, 5.0);
    let mover = editor
        .add_clip(track_id, Clip::video("/media/b.mp4", 6.0, 2.0))
        .unwrap();
    let mut controller = InteractionController::new(editor.clone());

    // Grab at 650 px = 6.5 s, half a second into the clip.
    controller.begin_drag(mover, 650.0).unwrap();

    // 350 px - offset = 3.0 s, which collides with the first clip.
    let step = controller.drag_to(350.0).unwrap();
    assert!(matches!(step.rejection, Some(TimelineError::Overlap { .. })));
    assert_eq!(step.accepted_start_time, 6.0, "Clip holds where it was");
    assert_eq!(clip_of(&editor, mover).start_time, 6.0);

    // A later valid position is accepted; the gesture recovers.
    let step = controller.drag_to(950.0).unwrap();
    assert!(step.rejection.is_none());
    assert_eq!(step.accepted_start_time, 9.0);

    assert_eq!(controller.end_drag(), Some(9.0));
    assert_eq!(clip_of(&editor, mover).start_time, 9.0);
}

#[test]
fn test_drag_snaps_to_grid_when_enabled() {
    let (editor, track_id) = setup();
    let clip_id = add_clip(&editor, track_id, 0.0, 2.0);
    let mut controller = InteractionController::new(editor.clone());
    assert!(controller.snap_enabled());

    controller.begin_drag(clip_id, 0.0).unwrap();
    let step = controller.drag_to(340.0).unwrap();
    assert_eq!(step.accepted_start_time, 3.0);

    controller.toggle_snap();
    let step = controller.drag_to(340.0).unwrap();
    assert!((step.accepted_start_time - 3.4).abs() < 1e-9);
    controller.end_drag();
}

#[test]
fn test_drag_on_locked_track_fails_fast() {
    let (editor, track_id) = setup();
    let clip_id = add_clip(&editor, track_id, 0.0, 2.0);
    editor.set_track_locked(track_id, true).unwrap();
    let mut controller = InteractionController::new(editor);

    assert!(matches!(
        controller.begin_drag(clip_id, 0.0),
        Err(TimelineError::LockedTrack(_))
    ));
    assert!(controller.drag_to(100.0).is_err(), "No drag was started");
}

#[test]
fn test_trailing_edge_trim_gesture() {
    let (editor, track_id) = setup();
    let clip_id = add_clip(&editor, track_id, 2.0, 5.0);
    let mut controller = InteractionController::new(editor.clone());

    controller.begin_trim(clip_id, TrimEdge::End, 700.0).unwrap();
    let step = controller.trim_to(600.0).unwrap();
    assert!(step.rejection.is_none());
    controller.end_trim();

    let clip = clip_of(&editor, clip_id);
    assert_eq!(clip.start_time, 2.0, "End handle never moves the start");
    assert_eq!(clip.trim_start, 0.0);
    assert_eq!(clip.trim_end, 4.0);
    assert_eq!(clip.duration, 4.0);
}

#[test]
fn test_leading_edge_trim_gesture() {
    let (editor, track_id) = setup();
    let clip_id = add_clip(&editor, track_id, 2.0, 5.0);
    let mut controller = InteractionController::new(editor.clone());

    controller
        .begin_trim(clip_id, TrimEdge::Start, 200.0)
        .unwrap();
    let step = controller.trim_to(300.0).unwrap();
    assert!(step.rejection.is_none());
    assert_eq!(step.accepted_start_time, 3.0);
    controller.end_trim();

    let clip = clip_of(&editor, clip_id);
    assert_eq!(clip.trim_start, 1.0);
    assert_eq!(clip.start_time, 3.0);
    assert_eq!(clip.trim_end, 5.0, "Opposite bound stays put");
    assert_eq!(clip.duration, 4.0);
    assert_eq!(clip.end_time(), 7.0);
}

#[test]
fn test_invalid_trim_gesture_leaves_clip_unchanged() {
    let (editor, track_id) = setup();
    let clip_id = add_clip(&editor, track_id, 2.0, 5.0);
    let mut controller = InteractionController::new(editor.clone());

    controller
        .begin_trim(clip_id, TrimEdge::Start, 200.0)
        .unwrap();
    // 10 s to the left would push trim_start negative.
    let step = controller.trim_to(-800.0).unwrap();
    assert!(matches!(step.rejection, Some(TimelineError::InvalidTrim(_))));
    controller.end_trim();

    let clip = clip_of(&editor, clip_id);
    assert_eq!(clip.start_time, 2.0);
    assert_eq!(clip.trim_start, 0.0);
    assert_eq!(clip.duration, 5.0);
}

#[test]
fn test_ruler_click_returns_clamped_time() {
    let (editor, _) = setup();
    let controller = InteractionController::new(editor);

    assert_eq!(controller.ruler_click(250.0).unwrap(), 2.5);
    assert_eq!(controller.ruler_click(-40.0).unwrap(), 0.0);
}
