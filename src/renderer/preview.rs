//! Real-time preview loop. A dedicated thread ticks at a fixed rate,
//! reads one immutable project snapshot per tick and composites the frame
//! at the playback clock's current time. Editing never blocks rendering
//! and a mid-tick mutation is never partially visible in a frame.

use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TrySendError};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use image::RgbaImage;
use log::info;

use crate::cache::SharedAssetCache;
use crate::error::TimelineError;
use crate::model::project::Project;
use crate::renderer::compositor::{self, OverlayOptions};
use crate::util::timing::ScopedTimer;

/// Single-slot snapshot exchange between the editing session and the
/// render thread. The editor publishes a fresh `Arc<Project>` after every
/// mutation; the render thread clones the pointer once per tick.
pub struct SnapshotSlot {
    inner: RwLock<Arc<Project>>,
}

impl SnapshotSlot {
    pub fn new(project: Project) -> Self {
        Self {
            inner: RwLock::new(Arc::new(project)),
        }
    }

    pub fn publish(&self, project: Project) {
        let next = Arc::new(project);
        match self.inner.write() {
            Ok(mut slot) => *slot = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    pub fn load(&self) -> Arc<Project> {
        match self.inner.read() {
            Ok(slot) => Arc::clone(&slot),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }
}

/// Playback time state, advanced once per tick. Cancellable and resettable
/// at any point without leaving the renderer inconsistent.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct PlaybackClock {
    current_time: f64,
    rate: f64,
    playing: bool,
    looping: bool,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            rate: 1.0,
            playing: false,
            looping: false,
        }
    }
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.current_time = 0.0;
    }

    pub fn seek(&mut self, time: f64, duration: f64) {
        self.current_time = time.clamp(0.0, duration.max(0.0));
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate.max(0.0);
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Advance by a wall-clock delta. At the end of the composition either
    /// wrap to 0 (loop enabled) or stop and hold at the end.
    pub fn advance(&mut self, wall_delta: f64, duration: f64) {
        if !self.playing {
            return;
        }
        self.current_time += wall_delta * self.rate;
        if duration <= 0.0 {
            self.current_time = 0.0;
            return;
        }
        if self.current_time >= duration {
            if self.looping {
                self.current_time = 0.0;
            } else {
                self.current_time = duration;
                self.playing = false;
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct TransportStatus {
    pub current_time: f64,
    pub duration: f64,
    pub is_playing: bool,
}

pub struct PreviewFrame {
    pub time: f64,
    pub image: RgbaImage,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PreviewCommand {
    Play,
    Pause,
    Stop,
    Seek(f64),
    SetRate(f64),
    SetLoop(bool),
    ToggleGrid,
    ToggleSafeZones,
    Shutdown,
}

/// Cloneable command side of the preview engine; safe to hand to the
/// interaction layer or the hosting UI.
#[derive(Clone)]
pub struct PreviewHandle {
    commands: Sender<PreviewCommand>,
}

impl PreviewHandle {
    pub fn send(&self, command: PreviewCommand) -> Result<(), TimelineError> {
        self.commands
            .send(command)
            .map_err(|_| TimelineError::Runtime("Preview loop is gone".to_string()))
    }

    pub fn play(&self) -> Result<(), TimelineError> {
        self.send(PreviewCommand::Play)
    }

    pub fn pause(&self) -> Result<(), TimelineError> {
        self.send(PreviewCommand::Pause)
    }

    pub fn stop(&self) -> Result<(), TimelineError> {
        self.send(PreviewCommand::Stop)
    }

    pub fn seek(&self, time: f64) -> Result<(), TimelineError> {
        self.send(PreviewCommand::Seek(time))
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct PreviewConfig {
    /// Render loop frequency, decoupled from the UI event rate.
    pub tick_rate: f64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { tick_rate: 30.0 }
    }
}

pub struct PreviewEngine {
    commands: Sender<PreviewCommand>,
    frames: Receiver<PreviewFrame>,
    status: Receiver<TransportStatus>,
    worker: Option<JoinHandle<()>>,
}

impl PreviewEngine {
    pub fn spawn(
        slot: Arc<SnapshotSlot>,
        cache: SharedAssetCache,
        config: PreviewConfig,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<PreviewCommand>();
        // Bounded outputs: a slow consumer drops frames, never stalls the loop.
        let (frame_tx, frame_rx) = mpsc::sync_channel::<PreviewFrame>(2);
        let (status_tx, status_rx) = mpsc::sync_channel::<TransportStatus>(8);

        let worker = thread::spawn(move || {
            run_loop(slot, cache, config, cmd_rx, frame_tx, status_tx);
        });

        Self {
            commands: cmd_tx,
            frames: frame_rx,
            status: status_rx,
            worker: Some(worker),
        }
    }

    pub fn handle(&self) -> PreviewHandle {
        PreviewHandle {
            commands: self.commands.clone(),
        }
    }

    /// Most recent composed frame, if one is waiting.
    pub fn try_frame(&self) -> Option<PreviewFrame> {
        let mut latest = None;
        while let Ok(frame) = self.frames.try_recv() {
            latest = Some(frame);
        }
        latest
    }

    /// Most recent transport status, draining older ones.
    pub fn latest_status(&self) -> Option<TransportStatus> {
        let mut latest = None;
        while let Ok(status) = self.status.try_recv() {
            latest = Some(status);
        }
        latest
    }

    pub fn shutdown(mut self) {
        self.stop_worker();
    }

    fn stop_worker(&mut self) {
        let _ = self.commands.send(PreviewCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for PreviewEngine {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

fn run_loop(
    slot: Arc<SnapshotSlot>,
    cache: SharedAssetCache,
    config: PreviewConfig,
    commands: Receiver<PreviewCommand>,
    frames: SyncSender<PreviewFrame>,
    status: SyncSender<TransportStatus>,
) {
    let tick = Duration::from_secs_f64(1.0 / config.tick_rate.max(1.0));
    let mut clock = PlaybackClock::new();
    let mut overlays = OverlayOptions::default();
    let mut last_tick = Instant::now();
    info!("Preview loop started at {} Hz", config.tick_rate);

    loop {
        // One consistent snapshot for the whole tick.
        let project = slot.load();
        let duration = project.duration();

        loop {
            match commands.try_recv() {
                Ok(PreviewCommand::Play) => clock.play(),
                Ok(PreviewCommand::Pause) => clock.pause(),
                Ok(PreviewCommand::Stop) => clock.stop(),
                Ok(PreviewCommand::Seek(time)) => clock.seek(time, duration),
                Ok(PreviewCommand::SetRate(rate)) => clock.set_rate(rate),
                Ok(PreviewCommand::SetLoop(looping)) => clock.set_looping(looping),
                Ok(PreviewCommand::ToggleGrid) => overlays.show_grid = !overlays.show_grid,
                Ok(PreviewCommand::ToggleSafeZones) => {
                    overlays.show_safe_zones = !overlays.show_safe_zones;
                }
                Ok(PreviewCommand::Shutdown) => return,
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => return,
            }
        }

        let now = Instant::now();
        let wall_delta = now.duration_since(last_tick).as_secs_f64();
        last_tick = now;
        clock.advance(wall_delta, duration);

        cache.poll();
        let image = {
            let _timer = ScopedTimer::debug("Preview tick composite");
            compositor::compose_frame(&project, clock.current_time(), &cache, &overlays)
        };

        let frame = PreviewFrame {
            time: clock.current_time(),
            image,
        };
        match frames.try_send(frame) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => return,
        }
        let _ = status.try_send(TransportStatus {
            current_time: clock.current_time(),
            duration,
            is_playing: clock.is_playing(),
        });

        let elapsed = now.elapsed();
        if elapsed < tick {
            thread::sleep(tick - elapsed);
        }
    }
}
