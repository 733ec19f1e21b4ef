//! Validated timeline mutations. Handlers operate on the shared project
//! behind `Arc<RwLock<_>>`; every operation is atomic — it validates first
//! against current state and either applies fully or returns the error with
//! the project untouched. `EditorService` fronts the handlers and publishes
//! an immutable snapshot for the render thread after each successful change.

pub mod clip_handler;
pub mod keyframe_handler;
pub mod track_handler;

pub use clip_handler::ClipHandler;
pub use keyframe_handler::{KeyframeHandler, KeyframePatch};
pub use track_handler::TrackHandler;

use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::animation::EasingFunction;
use crate::cache::SharedAssetCache;
use crate::error::TimelineError;
use crate::model::clip::{Bounds, Clip};
use crate::model::keyframe::{AnimatedProperty, KeyframeValue};
use crate::model::project::Project;
use crate::model::track::MediaKind;
use crate::renderer::preview::SnapshotSlot;

pub struct EditorService {
    project: Arc<RwLock<Project>>,
    snapshot: Arc<SnapshotSlot>,
    cache: SharedAssetCache,
}

impl Clone for EditorService {
    fn clone(&self) -> Self {
        Self {
            project: Arc::clone(&self.project),
            snapshot: Arc::clone(&self.snapshot),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl EditorService {
    pub fn new(project: Project, cache: SharedAssetCache) -> Self {
        // Kick off loads for everything the document already references.
        for track in &project.tracks {
            for clip in &track.clips {
                if let Some(source) = &clip.source {
                    cache.request(source);
                }
            }
        }
        let snapshot = Arc::new(SnapshotSlot::new(project.clone()));
        Self {
            project: Arc::new(RwLock::new(project)),
            snapshot,
            cache,
        }
    }

    pub fn snapshot_slot(&self) -> Arc<SnapshotSlot> {
        Arc::clone(&self.snapshot)
    }

    pub fn asset_cache(&self) -> SharedAssetCache {
        Arc::clone(&self.cache)
    }

    /// Read access to the live project for inspection.
    pub fn with_project<R>(&self, f: impl FnOnce(&Project) -> R) -> Result<R, TimelineError> {
        let proj = self
            .project
            .read()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;
        Ok(f(&proj))
    }

    pub fn duration(&self) -> f64 {
        self.with_project(|p| p.duration()).unwrap_or(0.0)
    }

    pub fn is_track_locked(&self, track_id: Uuid) -> bool {
        self.with_project(|p| p.get_track(track_id).map(|t| t.locked))
            .ok()
            .flatten()
            .unwrap_or(false)
    }

    pub fn is_clip_on_locked_track(&self, clip_id: Uuid) -> bool {
        self.with_project(|p| p.track_of_clip(clip_id).map(|t| t.locked))
            .ok()
            .flatten()
            .unwrap_or(false)
    }

    fn publish(&self) -> Result<(), TimelineError> {
        let proj = self
            .project
            .read()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;
        self.snapshot.publish(proj.clone());
        Ok(())
    }

    pub fn add_track(&self, kind: MediaKind, name: &str) -> Result<Uuid, TimelineError> {
        let id = TrackHandler::add_track(&self.project, kind, name)?;
        self.publish()?;
        Ok(id)
    }

    pub fn remove_track(&self, track_id: Uuid) -> Result<(), TimelineError> {
        TrackHandler::remove_track(&self.project, track_id)?;
        self.publish()
    }

    pub fn rename_track(&self, track_id: Uuid, name: &str) -> Result<(), TimelineError> {
        TrackHandler::rename_track(&self.project, track_id, name)?;
        self.publish()
    }

    pub fn set_track_visible(&self, track_id: Uuid, visible: bool) -> Result<(), TimelineError> {
        TrackHandler::set_visible(&self.project, track_id, visible)?;
        self.publish()
    }

    pub fn set_track_locked(&self, track_id: Uuid, locked: bool) -> Result<(), TimelineError> {
        TrackHandler::set_locked(&self.project, track_id, locked)?;
        self.publish()
    }

    pub fn set_track_volume(&self, track_id: Uuid, volume: f64) -> Result<(), TimelineError> {
        TrackHandler::set_volume(&self.project, track_id, volume)?;
        self.publish()
    }

    pub fn add_clip(&self, track_id: Uuid, clip: Clip) -> Result<Uuid, TimelineError> {
        let source = clip.source.clone();
        let id = ClipHandler::add_clip(&self.project, track_id, clip)?;
        // Only assets the timeline actually references get loaded.
        if let Some(source) = &source {
            self.cache.request(source);
        }
        self.publish()?;
        Ok(id)
    }

    pub fn move_clip(
        &self,
        clip_id: Uuid,
        new_start_time: f64,
        snap_grid: Option<f64>,
    ) -> Result<f64, TimelineError> {
        let accepted = ClipHandler::move_clip(&self.project, clip_id, new_start_time, snap_grid)?;
        self.publish()?;
        Ok(accepted)
    }

    pub fn trim_clip(
        &self,
        clip_id: Uuid,
        new_trim_start: f64,
        new_trim_end: f64,
    ) -> Result<(), TimelineError> {
        let natural = self.source_natural_duration(clip_id)?;
        ClipHandler::trim_clip(&self.project, clip_id, new_trim_start, new_trim_end, natural)?;
        self.publish()
    }

    pub fn trim_leading_edge(
        &self,
        clip_id: Uuid,
        new_trim_start: f64,
    ) -> Result<(), TimelineError> {
        let natural = self.source_natural_duration(clip_id)?;
        ClipHandler::trim_leading_edge(&self.project, clip_id, new_trim_start, natural)?;
        self.publish()
    }

    pub fn duplicate_clip(&self, clip_id: Uuid) -> Result<Uuid, TimelineError> {
        let id = ClipHandler::duplicate_clip(&self.project, clip_id)?;
        self.publish()?;
        Ok(id)
    }

    pub fn split_clip(&self, clip_id: Uuid, at_time: f64) -> Result<Uuid, TimelineError> {
        let id = ClipHandler::split_clip(&self.project, clip_id, at_time)?;
        self.publish()?;
        Ok(id)
    }

    pub fn delete_clip(&self, clip_id: Uuid) -> Result<(), TimelineError> {
        ClipHandler::delete_clip(&self.project, clip_id)?;
        self.publish()
    }

    pub fn set_clip_bounds(&self, clip_id: Uuid, bounds: Bounds) -> Result<(), TimelineError> {
        ClipHandler::set_bounds(&self.project, clip_id, bounds)?;
        self.publish()
    }

    pub fn set_clip_volume(&self, clip_id: Uuid, volume: f64) -> Result<(), TimelineError> {
        ClipHandler::set_volume(&self.project, clip_id, volume)?;
        self.publish()
    }

    pub fn add_keyframe(
        &self,
        clip_id: Uuid,
        property: AnimatedProperty,
        time: f64,
        value: KeyframeValue,
        easing: EasingFunction,
    ) -> Result<Uuid, TimelineError> {
        let id =
            KeyframeHandler::add_keyframe(&self.project, clip_id, property, time, value, easing)?;
        self.publish()?;
        Ok(id)
    }

    pub fn update_keyframe(
        &self,
        clip_id: Uuid,
        keyframe_id: Uuid,
        patch: KeyframePatch,
    ) -> Result<(), TimelineError> {
        KeyframeHandler::update_keyframe(&self.project, clip_id, keyframe_id, patch)?;
        self.publish()
    }

    pub fn delete_keyframe(&self, clip_id: Uuid, keyframe_id: Uuid) -> Result<(), TimelineError> {
        KeyframeHandler::delete_keyframe(&self.project, clip_id, keyframe_id)?;
        self.publish()
    }

    /// Intrinsic source length for trim validation, when the cache knows it.
    fn source_natural_duration(&self, clip_id: Uuid) -> Result<Option<f64>, TimelineError> {
        let source = self.with_project(|p| {
            p.find_clip(clip_id)
                .and_then(|(_, clip)| clip.source.clone())
        })?;
        Ok(source.and_then(|s| self.cache.natural_duration(&s)))
    }
}
