use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use montage::cache::{AssetCache, AssetState, MediaLoader, MediaSource};
use montage::error::TimelineError;
use montage::model::clip::SourceRef;
use montage::model::track::MediaKind;

struct CountingLoader {
    loads: Arc<AtomicUsize>,
    fail: bool,
}

impl MediaLoader for CountingLoader {
    fn load(&self, source: &SourceRef) -> Result<MediaSource, TimelineError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TimelineError::Media(format!(
                "Cannot decode {}",
                source.uri
            )));
        }
        Ok(MediaSource::procedural(32, 18, 7, Some(8.0)))
    }
}

fn wait_settled(cache: &AssetCache, source: &SourceRef) -> AssetState {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        cache.poll();
        match cache.state(source) {
            Some(state @ AssetState::Ready(_)) | Some(state @ AssetState::Error(_)) => {
                return state;
            }
            _ => std::thread::sleep(Duration::from_millis(1)),
        }
    }
    panic!("Load of {} never settled", source.uri);
}

#[test]
fn test_one_load_per_key_for_repeated_requests() {
    let loads = Arc::new(AtomicUsize::new(0));
    let cache = AssetCache::new(Arc::new(CountingLoader {
        loads: Arc::clone(&loads),
        fail: false,
    }));
    let source = SourceRef::new("/media/shared.mp4", MediaKind::Video);

    for _ in 0..10 {
        cache.request(&source);
    }
    let state = wait_settled(&cache, &source);

    assert!(state.is_ready());
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn test_error_state_is_terminal_until_evicted() {
    let loads = Arc::new(AtomicUsize::new(0));
    let cache = AssetCache::new(Arc::new(CountingLoader {
        loads: Arc::clone(&loads),
        fail: true,
    }));
    let source = SourceRef::new("/media/broken.mp4", MediaKind::Video);

    cache.request(&source);
    let state = wait_settled(&cache, &source);
    assert!(matches!(state, AssetState::Error(_)));

    // Further requests do not retry a failed key.
    cache.request(&source);
    cache.poll();
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(matches!(cache.state(&source), Some(AssetState::Error(_))));

    // Eviction clears the key so the next request starts fresh.
    cache.evict(&source);
    assert!(cache.state(&source).is_none());
    cache.request(&source);
    wait_settled(&cache, &source);
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[test]
fn test_frame_at_is_none_until_ready() {
    let loads = Arc::new(AtomicUsize::new(0));
    let cache = AssetCache::new(Arc::new(CountingLoader {
        loads,
        fail: false,
    }));
    let source = SourceRef::new("/media/a.mp4", MediaKind::Video);

    assert!(cache.frame_at(&source, 0.0).is_none(), "never requested");

    cache.request(&source);
    wait_settled(&cache, &source);

    let frame = cache.frame_at(&source, 0.5).expect("Frame after ready");
    assert_eq!(frame.width(), 32);
    assert_eq!(frame.height(), 18);
}

#[test]
fn test_frames_in_same_bucket_are_cached() {
    let loads = Arc::new(AtomicUsize::new(0));
    let cache = AssetCache::new(Arc::new(CountingLoader {
        loads,
        fail: false,
    }));
    let source = SourceRef::new("/media/a.mp4", MediaKind::Video);
    cache.request(&source);
    wait_settled(&cache, &source);

    // Two lookups inside one 10 ms bucket return the same allocation.
    let a = cache.frame_at(&source, 0.100).unwrap();
    let b = cache.frame_at(&source, 0.104).unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let c = cache.frame_at(&source, 0.120).unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
}

#[test]
fn test_natural_duration_comes_from_ready_media() {
    let loads = Arc::new(AtomicUsize::new(0));
    let cache = AssetCache::new(Arc::new(CountingLoader {
        loads,
        fail: false,
    }));
    let source = SourceRef::new("/media/a.mp4", MediaKind::Video);

    assert_eq!(cache.natural_duration(&source), None);
    cache.request(&source);
    wait_settled(&cache, &source);
    assert_eq!(cache.natural_duration(&source), Some(8.0));
}

#[test]
fn test_keys_distinguish_kind() {
    let loads = Arc::new(AtomicUsize::new(0));
    let cache = AssetCache::new(Arc::new(CountingLoader {
        loads: Arc::clone(&loads),
        fail: false,
    }));
    let video = SourceRef::new("/media/a.bin", MediaKind::Video);
    let audio = SourceRef::new("/media/a.bin", MediaKind::Audio);

    cache.request(&video);
    cache.request(&audio);
    wait_settled(&cache, &video);
    wait_settled(&cache, &audio);
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}
