use std::sync::Arc;
use std::time::{Duration, Instant};

use montage::animation::EasingFunction;
use montage::cache::{AssetCache, AssetState, MediaLoader, MediaSource};
use montage::error::TimelineError;
use montage::model::clip::{Clip, SourceRef};
use montage::model::color::Color;
use montage::model::keyframe::{AnimatedProperty, Keyframe, KeyframeValue};
use montage::model::project::{Project, Resolution};
use montage::model::track::{MediaKind, Track};
use montage::renderer::compositor::{self, OverlayOptions};
use montage::renderer::{PlaybackClock, PreviewConfig, PreviewEngine, SnapshotSlot};

/// Loader that never finishes within a test's lifetime; everything it backs
/// stays in `Loading`.
struct StalledLoader;

impl MediaLoader for StalledLoader {
    fn load(&self, _source: &SourceRef) -> Result<MediaSource, TimelineError> {
        std::thread::sleep(Duration::from_secs(30));
        Ok(MediaSource::silent(None))
    }
}

struct FailingLoader;

impl MediaLoader for FailingLoader {
    fn load(&self, source: &SourceRef) -> Result<MediaSource, TimelineError> {
        Err(TimelineError::Media(format!(
            "No decoder for {}",
            source.uri
        )))
    }
}

fn small_project() -> Project {
    Project::new(
        "Render Test",
        Resolution {
            width: 200,
            height: 100,
        },
        30.0,
    )
}

fn text_track(name: &str, order: u32, content: &str, color: Color) -> Track {
    let mut track = Track::new(MediaKind::Text, name, order);
    let mut clip = Clip::text(content, 0.0, 10.0);
    if let Some(style) = clip.text.as_mut() {
        style.color = color;
    }
    track.clips.push(clip);
    track
}

#[test]
fn test_clock_advances_only_while_playing() {
    let mut clock = PlaybackClock::new();
    clock.advance(1.0, 10.0);
    assert_eq!(clock.current_time(), 0.0);

    clock.play();
    clock.advance(1.0, 10.0);
    assert_eq!(clock.current_time(), 1.0);

    clock.pause();
    clock.advance(1.0, 10.0);
    assert_eq!(clock.current_time(), 1.0);
}

#[test]
fn test_clock_wraps_to_zero_when_looping() {
    let mut clock = PlaybackClock::new();
    clock.set_looping(true);
    clock.play();
    clock.seek(9.5, 10.0);
    clock.advance(1.0, 10.0);

    assert_eq!(clock.current_time(), 0.0);
    assert!(clock.is_playing(), "Looping playback keeps running");
}

#[test]
fn test_clock_holds_at_end_without_looping() {
    let mut clock = PlaybackClock::new();
    clock.play();
    clock.seek(9.5, 10.0);
    clock.advance(1.0, 10.0);

    assert_eq!(clock.current_time(), 10.0);
    assert!(!clock.is_playing());
}

#[test]
fn test_clock_seek_clamps_and_stop_resets() {
    let mut clock = PlaybackClock::new();
    clock.seek(15.0, 10.0);
    assert_eq!(clock.current_time(), 10.0);
    clock.seek(-3.0, 10.0);
    assert_eq!(clock.current_time(), 0.0);

    clock.play();
    clock.seek(5.0, 10.0);
    clock.stop();
    assert_eq!(clock.current_time(), 0.0);
    assert!(!clock.is_playing());
}

#[test]
fn test_clock_respects_playback_rate() {
    let mut clock = PlaybackClock::new();
    clock.set_rate(2.0);
    clock.play();
    clock.advance(1.0, 10.0);
    assert_eq!(clock.current_time(), 2.0);
}

#[test]
fn test_snapshot_slot_swaps_whole_projects() {
    let slot = SnapshotSlot::new(small_project());
    assert_eq!(slot.load().tracks.len(), 0);

    let mut updated = small_project();
    updated.tracks.push(Track::new(MediaKind::Video, "V1", 0));
    slot.publish(updated);

    let snapshot = slot.load();
    assert_eq!(snapshot.tracks.len(), 1);
    // Old pointers stay valid; the slot only swaps, never mutates in place.
    let again = slot.load();
    assert!(Arc::ptr_eq(&snapshot, &again));
}

#[test]
fn test_compose_never_blocks_on_loading_media() {
    let mut project = small_project();
    let mut track = Track::new(MediaKind::Video, "V1", 0);
    let mut clip = Clip::video("/media/slow.mp4", 0.0, 10.0);
    clip.bounds = montage::model::clip::Bounds::new(0.0, 0.0, 200.0, 100.0);
    track.clips.push(clip);
    project.tracks.push(track);

    let cache = AssetCache::new(Arc::new(StalledLoader));
    let started = Instant::now();
    let frame = compositor::compose_frame(&project, 1.0, &cache, &OverlayOptions::default());
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "Compositing must not wait for the loader"
    );

    // The loading placeholder is a gray checker with cells at 60 and 90.
    let pixel = frame.get_pixel(0, 0).0;
    assert!(pixel[0] == 60 || pixel[0] == 90);
    assert_eq!(pixel[0], pixel[1]);
    assert_eq!(pixel[1], pixel[2]);
}

#[test]
fn test_failed_asset_renders_error_placeholder() {
    let mut project = small_project();
    let mut track = Track::new(MediaKind::Video, "V1", 0);
    let mut clip = Clip::video("/media/bad.mp4", 0.0, 10.0);
    clip.bounds = montage::model::clip::Bounds::new(0.0, 0.0, 200.0, 100.0);
    let source = clip.source.clone().unwrap();
    track.clips.push(clip);
    project.tracks.push(track);

    let cache = AssetCache::new(Arc::new(FailingLoader));
    cache.request(&source);
    let deadline = Instant::now() + Duration::from_secs(5);
    while !matches!(cache.state(&source), Some(AssetState::Error(_))) {
        assert!(Instant::now() < deadline, "Load never failed");
        cache.poll();
        std::thread::sleep(Duration::from_millis(1));
    }

    let frame = compositor::compose_frame(&project, 1.0, &cache, &OverlayOptions::default());
    // The error placeholder is a red hatch, clearly distinct from both the
    // background and the loading checker.
    let pixel = frame.get_pixel(0, 0).0;
    assert_eq!(pixel, [200, 60, 60, 255]);
}

#[test]
fn test_higher_ordered_track_renders_on_top() {
    let mut project = small_project();
    project
        .tracks
        .push(text_track("Bottom", 0, "AAAA", Color::rgb(255, 0, 0)));
    project
        .tracks
        .push(text_track("Top", 1, "AAAA", Color::rgb(0, 0, 255)));

    let frame = compositor::compose_frame(&project, 1.0, &AssetCache::with_default_loader(), &OverlayOptions::default());
    assert_eq!(frame.get_pixel(5, 5).0, [0, 0, 255, 255]);
}

#[test]
fn test_hidden_track_is_skipped() {
    let mut project = small_project();
    project
        .tracks
        .push(text_track("Bottom", 0, "AAAA", Color::rgb(255, 0, 0)));
    let mut top = text_track("Top", 1, "AAAA", Color::rgb(0, 0, 255));
    top.visible = false;
    project.tracks.push(top);

    let frame = compositor::compose_frame(&project, 1.0, &AssetCache::with_default_loader(), &OverlayOptions::default());
    assert_eq!(frame.get_pixel(5, 5).0, [255, 0, 0, 255]);
}

#[test]
fn test_fully_transparent_clip_leaves_background() {
    let mut project = small_project();
    let mut track = text_track("T1", 0, "AAAA", Color::rgb(255, 0, 0));
    track.clips[0].keyframes.push(Keyframe::new(
        AnimatedProperty::Opacity,
        0.0,
        KeyframeValue::scalar(0.0),
        EasingFunction::Linear,
    ));
    project.tracks.push(track);

    let frame = compositor::compose_frame(&project, 1.0, &AssetCache::with_default_loader(), &OverlayOptions::default());
    assert_eq!(frame.get_pixel(5, 5).0, [0, 0, 0, 255]);
}

#[test]
fn test_animated_opacity_blends_toward_background() {
    let mut project = small_project();
    let mut track = text_track("T1", 0, "AAAA", Color::rgb(255, 0, 0));
    for (time, value) in [(0.0, 0.0), (4.0, 1.0)] {
        track.clips[0].keyframes.push(Keyframe::new(
            AnimatedProperty::Opacity,
            time,
            KeyframeValue::scalar(value),
            EasingFunction::Linear,
        ));
    }
    track.clips[0].sort_keyframes();
    project.tracks.push(track);

    let frame = compositor::compose_frame(&project, 2.0, &AssetCache::with_default_loader(), &OverlayOptions::default());
    // 50% red over black.
    assert_eq!(frame.get_pixel(5, 5).0[0], 128);
    assert_eq!(frame.get_pixel(5, 5).0[1], 0);
}

#[test]
fn test_grid_overlay_tints_grid_lines() {
    let project = small_project();
    let overlays = OverlayOptions {
        show_grid: true,
        show_safe_zones: false,
        grid_spacing: 50,
    };

    let frame = compositor::compose_frame(&project, 0.0, &AssetCache::with_default_loader(), &overlays);
    // 15% white over black on the line, untouched off it.
    assert_eq!(frame.get_pixel(0, 10).0[0], 38);
    assert_eq!(frame.get_pixel(25, 10).0[0], 0);
}

#[test]
fn test_preview_engine_emits_frames_and_status() {
    let mut project = small_project();
    project
        .tracks
        .push(text_track("T1", 0, "Hi", Color::rgb(0, 255, 0)));
    let slot = Arc::new(SnapshotSlot::new(project));
    let cache = Arc::new(AssetCache::with_default_loader());

    let engine = PreviewEngine::spawn(slot, cache, PreviewConfig { tick_rate: 60.0 });
    let handle = engine.handle();
    handle.play().unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut frame = None;
    while frame.is_none() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
        frame = engine.try_frame();
    }
    let frame = frame.expect("Preview loop never produced a frame");
    assert_eq!(frame.image.width(), 200);
    assert_eq!(frame.image.height(), 100);

    let status = engine.latest_status().expect("No transport status seen");
    assert_eq!(status.duration, 10.0);

    engine.shutdown();
}

#[test]
fn test_preview_seek_moves_playhead_while_paused() {
    let mut project = small_project();
    project
        .tracks
        .push(text_track("T1", 0, "Hi", Color::rgb(0, 255, 0)));
    let slot = Arc::new(SnapshotSlot::new(project));
    let cache = Arc::new(AssetCache::with_default_loader());

    let engine = PreviewEngine::spawn(slot, cache, PreviewConfig { tick_rate: 60.0 });
    engine.handle().seek(4.0).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut seen = None;
    while Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
        if let Some(status) = engine.latest_status() {
            if status.current_time == 4.0 {
                seen = Some(status);
                break;
            }
        }
    }
    let status = seen.expect("Seek never reflected in the transport status");
    assert!(!status.is_playing);
}
