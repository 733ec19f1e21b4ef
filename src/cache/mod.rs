//! Media asset cache. One load attempt per `(uri, kind)` key, shared by
//! every clip referencing the same source; loads run on background threads
//! and consumers poll readiness instead of blocking.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use image::RgbaImage;
use log::{debug, warn};
use lru::LruCache;

use crate::error::TimelineError;
use crate::model::clip::SourceRef;
use crate::model::track::MediaKind;

const DEFAULT_FRAME_CACHE_SIZE: usize = 256;

/// Lifecycle of one cache entry. `Error` is terminal; a fresh load only
/// happens after an explicit `evict`.
#[derive(Clone, Debug)]
pub enum AssetState {
    Loading,
    Ready(Arc<MediaSource>),
    Error(String),
}

impl AssetState {
    pub fn is_ready(&self) -> bool {
        matches!(self, AssetState::Ready(_))
    }
}

/// Decoded (or procedurally backed) media a clip can pull frames from.
#[derive(Debug)]
pub struct MediaSource {
    /// Source's intrinsic length in seconds, when the format reports one.
    /// Still images and untimed sources have none.
    pub natural_duration: Option<f64>,
    content: MediaContent,
}

#[derive(Debug)]
enum MediaContent {
    Still(Arc<RgbaImage>),
    /// Stand-in for sources whose real decoder lives outside this crate.
    /// Frames are a deterministic function of (seed, time).
    Procedural {
        width: u32,
        height: u32,
        seed: u64,
    },
    /// Audio-only sources carry no visual frames.
    Silent,
}

impl MediaSource {
    pub fn still(image: RgbaImage) -> Self {
        Self {
            natural_duration: None,
            content: MediaContent::Still(Arc::new(image)),
        }
    }

    pub fn procedural(width: u32, height: u32, seed: u64, natural_duration: Option<f64>) -> Self {
        Self {
            natural_duration,
            content: MediaContent::Procedural { width, height, seed },
        }
    }

    pub fn silent(natural_duration: Option<f64>) -> Self {
        Self {
            natural_duration,
            content: MediaContent::Silent,
        }
    }

    fn render_frame(&self, time: f64) -> Option<Arc<RgbaImage>> {
        match &self.content {
            MediaContent::Still(image) => Some(Arc::clone(image)),
            MediaContent::Procedural { width, height, seed } => {
                let bucket = frame_bucket(time);
                let mut image = RgbaImage::new(*width, *height);
                for (x, y, pixel) in image.enumerate_pixels_mut() {
                    let mixed = seed
                        .wrapping_mul(0x9e37_79b9_7f4a_7c15)
                        .wrapping_add(bucket as u64);
                    let r = ((x as u64 * 7 + mixed) % 256) as u8;
                    let g = ((y as u64 * 5 + mixed / 3) % 256) as u8;
                    let b = ((mixed / 7) % 256) as u8;
                    *pixel = image::Rgba([r, g, b, 255]);
                }
                Some(Arc::new(image))
            }
            MediaContent::Silent => None,
        }
    }
}

/// 10 ms buckets: repeated ticks inside one bucket hit the frame LRU.
fn frame_bucket(time: f64) -> i64 {
    (time.max(0.0) * 100.0).floor() as i64
}

/// Seam for a real decoder. The built-in loader decodes images via the
/// `image` crate and backs timed media with procedural frames.
pub trait MediaLoader: Send + Sync {
    fn load(&self, source: &SourceRef) -> Result<MediaSource, TimelineError>;
}

pub struct FileLoader;

impl MediaLoader for FileLoader {
    fn load(&self, source: &SourceRef) -> Result<MediaSource, TimelineError> {
        match source.kind {
            MediaKind::Image => {
                let image = image::open(&source.uri)?.to_rgba8();
                Ok(MediaSource::still(image))
            }
            MediaKind::Video => {
                if !std::path::Path::new(&source.uri).exists() {
                    return Err(TimelineError::Media(format!(
                        "Source not found: {}",
                        source.uri
                    )));
                }
                let seed = uri_seed(&source.uri);
                Ok(MediaSource::procedural(1920, 1080, seed, None))
            }
            MediaKind::Audio => {
                if !std::path::Path::new(&source.uri).exists() {
                    return Err(TimelineError::Media(format!(
                        "Source not found: {}",
                        source.uri
                    )));
                }
                Ok(MediaSource::silent(None))
            }
            MediaKind::Text => Err(TimelineError::Media(
                "Text clips have no media source".to_string(),
            )),
        }
    }
}

fn uri_seed(uri: &str) -> u64 {
    uri.bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
            (acc ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
        })
}

type LoadResult = (SourceRef, Result<MediaSource, TimelineError>);

pub type SharedAssetCache = Arc<AssetCache>;

pub struct AssetCache {
    states: Mutex<HashMap<SourceRef, AssetState>>,
    frames: Mutex<LruCache<(SourceRef, i64), Arc<RgbaImage>>>,
    results_tx: Sender<LoadResult>,
    results_rx: Mutex<Receiver<LoadResult>>,
    loader: Arc<dyn MediaLoader>,
}

impl AssetCache {
    pub fn new(loader: Arc<dyn MediaLoader>) -> Self {
        let capacity = NonZeroUsize::new(DEFAULT_FRAME_CACHE_SIZE)
            .expect("DEFAULT_FRAME_CACHE_SIZE must be > 0");
        let (results_tx, results_rx) = mpsc::channel();
        Self {
            states: Mutex::new(HashMap::new()),
            frames: Mutex::new(LruCache::new(capacity)),
            results_tx,
            results_rx: Mutex::new(results_rx),
            loader,
        }
    }

    pub fn with_default_loader() -> Self {
        Self::new(Arc::new(FileLoader))
    }

    /// Start loading a source if it is not already known. Concurrent
    /// requests for the same key share the single in-flight attempt; the
    /// key is marked `Loading` before the worker thread starts.
    pub fn request(&self, source: &SourceRef) {
        let mut states = match self.states.lock() {
            Ok(s) => s,
            Err(_) => return,
        };
        if states.contains_key(source) {
            return;
        }
        states.insert(source.clone(), AssetState::Loading);
        drop(states);

        debug!("Asset load started: {} ({})", source.uri, source.kind);
        let loader = Arc::clone(&self.loader);
        let tx = self.results_tx.clone();
        let key = source.clone();
        thread::spawn(move || {
            let result = loader.load(&key);
            // Receiver gone means the cache was dropped; nothing to do.
            let _ = tx.send((key, result));
        });
    }

    /// Drain finished loads into the state map. Called once per render tick;
    /// never blocks.
    pub fn poll(&self) {
        let rx = match self.results_rx.lock() {
            Ok(rx) => rx,
            Err(_) => return,
        };
        while let Ok((key, result)) = rx.try_recv() {
            let mut states = match self.states.lock() {
                Ok(s) => s,
                Err(_) => return,
            };
            // An evicted key dropped its claim on this load.
            if !matches!(states.get(&key), Some(AssetState::Loading)) {
                continue;
            }
            match result {
                Ok(media) => {
                    debug!("Asset ready: {}", key.uri);
                    states.insert(key, AssetState::Ready(Arc::new(media)));
                }
                Err(err) => {
                    warn!("Asset load failed: {}: {}", key.uri, err);
                    states.insert(key, AssetState::Error(err.to_string()));
                }
            }
        }
    }

    /// `None` means the source was never requested.
    pub fn state(&self, source: &SourceRef) -> Option<AssetState> {
        self.states.lock().ok()?.get(source).cloned()
    }

    pub fn natural_duration(&self, source: &SourceRef) -> Option<f64> {
        match self.state(source)? {
            AssetState::Ready(media) => media.natural_duration,
            _ => None,
        }
    }

    /// Resolve the frame for a source at a source-relative time. `None`
    /// while loading, on error, or for non-visual sources; the compositor
    /// substitutes placeholders.
    pub fn frame_at(&self, source: &SourceRef, time: f64) -> Option<Arc<RgbaImage>> {
        let media = match self.state(source)? {
            AssetState::Ready(media) => media,
            _ => return None,
        };
        let key = (source.clone(), frame_bucket(time));
        if let Ok(mut frames) = self.frames.lock() {
            if let Some(frame) = frames.get(&key) {
                return Some(Arc::clone(frame));
            }
        }
        let frame = media.render_frame(time)?;
        if let Ok(mut frames) = self.frames.lock() {
            frames.put(key, Arc::clone(&frame));
        }
        Some(frame)
    }

    /// Drop a key entirely so a later `request` retries the load. The only
    /// way out of a terminal `Error` state.
    pub fn evict(&self, source: &SourceRef) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(source);
        }
        if let Ok(mut frames) = self.frames.lock() {
            let stale: Vec<_> = frames
                .iter()
                .map(|(k, _)| k.clone())
                .filter(|(s, _)| s == source)
                .collect();
            for key in stale {
                frames.pop(&key);
            }
        }
    }
}
