//! Export job assembly. Validates settings, freezes an immutable job
//! descriptor and runs a worker thread that renders frames through the
//! compositor and hands them to an external `Encoder`. Progress is reported
//! monotonically over a channel and always terminates in `Completed` or
//! `Error`; a failed export never disturbs the timeline or the preview.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use image::RgbaImage;
use log::{error, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::SharedAssetCache;
use crate::error::TimelineError;
use crate::model::project::{Project, Resolution};
use crate::renderer::compositor::{self, OverlayOptions};

pub const SUPPORTED_RESOLUTIONS: &[Resolution] = &[
    Resolution {
        width: 854,
        height: 480,
    },
    Resolution {
        width: 1280,
        height: 720,
    },
    Resolution {
        width: 1920,
        height: 1080,
    },
    Resolution {
        width: 3840,
        height: 2160,
    },
];

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    Draft,
    #[default]
    Standard,
    High,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ExportSettings {
    pub file_name: String,
    pub format: String,
    pub resolution: Resolution,
    pub frame_rate: f64,
    pub bitrate: u64,
    pub audio_bitrate: u64,
    #[serde(default)]
    pub quality: QualityPreset,
}

impl ExportSettings {
    pub fn validate(&self) -> Result<(), TimelineError> {
        if self.file_name.trim().is_empty() {
            return Err(TimelineError::Export("File name is empty".to_string()));
        }
        if self.frame_rate <= 0.0 {
            return Err(TimelineError::Export(format!(
                "Frame rate {} must be positive",
                self.frame_rate
            )));
        }
        if self.bitrate == 0 {
            return Err(TimelineError::Export("Bitrate must be positive".to_string()));
        }
        if self.audio_bitrate == 0 {
            return Err(TimelineError::Export(
                "Audio bitrate must be positive".to_string(),
            ));
        }
        if !SUPPORTED_RESOLUTIONS.contains(&self.resolution) {
            return Err(TimelineError::Export(format!(
                "Unsupported resolution {}x{}",
                self.resolution.width, self.resolution.height
            )));
        }
        Ok(())
    }
}

/// Immutable descriptor handed to the external encoder collaborator.
#[derive(Clone, PartialEq, Debug)]
pub struct ExportJob {
    pub id: Uuid,
    pub project_id: Uuid,
    pub settings: ExportSettings,
    pub duration: f64,
    pub total_frames: u64,
}

#[derive(Clone, PartialEq, Debug)]
pub enum ExportProgress {
    /// Percent complete, monotonically increasing within 0..=100.
    Running(u8),
    Completed,
    Error(String),
}

/// The out-of-scope encoder seam. The worker feeds it composed frames in
/// order and finishes it exactly once on success.
pub trait Encoder: Send {
    fn encode_frame(&mut self, frame_index: u64, image: &RgbaImage) -> Result<(), TimelineError>;
    fn finish(&mut self) -> Result<(), TimelineError>;
}

/// Discards every frame. Useful for hosts that only want the descriptor
/// and progress contract exercised.
pub struct NullEncoder;

impl Encoder for NullEncoder {
    fn encode_frame(&mut self, _frame_index: u64, _image: &RgbaImage) -> Result<(), TimelineError> {
        Ok(())
    }

    fn finish(&mut self) -> Result<(), TimelineError> {
        Ok(())
    }
}

/// A running export: descriptor plus the progress receiver. Dropping the
/// task joins the worker.
pub struct ExportTask {
    pub job: ExportJob,
    progress: Receiver<ExportProgress>,
    worker: Option<JoinHandle<()>>,
}

impl ExportTask {
    pub fn progress(&self) -> &Receiver<ExportProgress> {
        &self.progress
    }

    /// Block until the job terminates and return its final state.
    pub fn wait(mut self) -> ExportProgress {
        let mut last = ExportProgress::Error("Export worker vanished".to_string());
        while let Ok(update) = self.progress.recv() {
            let terminal = matches!(
                update,
                ExportProgress::Completed | ExportProgress::Error(_)
            );
            last = update;
            if terminal {
                break;
            }
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        last
    }
}

impl Drop for ExportTask {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

pub struct ExportJobBuilder;

impl ExportJobBuilder {
    /// Validate settings, freeze the descriptor from a project snapshot and
    /// start the render/encode worker.
    pub fn start(
        project: Project,
        settings: ExportSettings,
        cache: SharedAssetCache,
        mut encoder: Box<dyn Encoder>,
    ) -> Result<ExportTask, TimelineError> {
        settings.validate()?;
        let duration = project.duration();
        if duration <= 0.0 {
            return Err(TimelineError::Export(
                "Project has no clips to export".to_string(),
            ));
        }

        let total_frames = (duration * settings.frame_rate).ceil().max(1.0) as u64;
        let job = ExportJob {
            id: Uuid::new_v4(),
            project_id: project.id,
            settings: settings.clone(),
            duration,
            total_frames,
        };
        info!(
            "Export job {} started: {} frames at {} fps",
            job.id, total_frames, settings.frame_rate
        );

        let (progress_tx, progress_rx) = mpsc::channel();
        let worker = thread::spawn(move || {
            run_export(&project, &settings, total_frames, &cache, encoder.as_mut(), &progress_tx);
        });

        Ok(ExportTask {
            job,
            progress: progress_rx,
            worker: Some(worker),
        })
    }
}

fn run_export(
    project: &Project,
    settings: &ExportSettings,
    total_frames: u64,
    cache: &SharedAssetCache,
    encoder: &mut dyn Encoder,
    progress: &Sender<ExportProgress>,
) {
    let overlays = OverlayOptions::default();
    let mut last_percent = 0u8;

    for frame_index in 0..total_frames {
        let time = frame_index as f64 / settings.frame_rate;
        cache.poll();
        let mut image = compositor::compose_frame(project, time, cache, &overlays);
        if settings.resolution != project.resolution {
            image = image::imageops::resize(
                &image,
                settings.resolution.width,
                settings.resolution.height,
                image::imageops::FilterType::Triangle,
            );
        }
        if let Err(err) = encoder.encode_frame(frame_index, &image) {
            error!("Export frame {} failed: {}", frame_index, err);
            let _ = progress.send(ExportProgress::Error(err.to_string()));
            return;
        }

        let percent = (((frame_index + 1) * 100) / total_frames).min(100) as u8;
        if percent > last_percent {
            last_percent = percent;
            let _ = progress.send(ExportProgress::Running(percent));
        }
    }

    match encoder.finish() {
        Ok(()) => {
            let _ = progress.send(ExportProgress::Completed);
        }
        Err(err) => {
            error!("Export finalization failed: {}", err);
            let _ = progress.send(ExportProgress::Error(err.to_string()));
        }
    }
}
