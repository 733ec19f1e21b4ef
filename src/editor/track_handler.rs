use std::sync::{Arc, RwLock};

use log::info;
use uuid::Uuid;

use crate::error::TimelineError;
use crate::model::project::Project;
use crate::model::track::{MediaKind, Track};

pub struct TrackHandler;

impl TrackHandler {
    pub fn add_track(
        project: &Arc<RwLock<Project>>,
        kind: MediaKind,
        name: &str,
    ) -> Result<Uuid, TimelineError> {
        let mut proj = project
            .write()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;

        let order = proj.tracks.len() as u32;
        let track = Track::new(kind, name, order);
        let id = track.id;
        info!("Add {} track '{}' (order {})", kind, name, order);
        proj.tracks.push(track);
        Ok(id)
    }

    /// Removing a track cascades deletion of its clips and their keyframes,
    /// then re-ranks the remaining orders to stay contiguous.
    pub fn remove_track(project: &Arc<RwLock<Project>>, track_id: Uuid) -> Result<(), TimelineError> {
        let mut proj = project
            .write()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;

        let index = proj
            .tracks
            .iter()
            .position(|t| t.id == track_id)
            .ok_or_else(|| TimelineError::Project(format!("Track {} not found", track_id)))?;
        proj.tracks.remove(index);
        proj.normalize_track_orders();
        Ok(())
    }

    pub fn rename_track(
        project: &Arc<RwLock<Project>>,
        track_id: Uuid,
        name: &str,
    ) -> Result<(), TimelineError> {
        let mut proj = project
            .write()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;
        let track = proj
            .get_track_mut(track_id)
            .ok_or_else(|| TimelineError::Project(format!("Track {} not found", track_id)))?;
        track.name = name.to_string();
        Ok(())
    }

    pub fn set_visible(
        project: &Arc<RwLock<Project>>,
        track_id: Uuid,
        visible: bool,
    ) -> Result<(), TimelineError> {
        let mut proj = project
            .write()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;
        let track = proj
            .get_track_mut(track_id)
            .ok_or_else(|| TimelineError::Project(format!("Track {} not found", track_id)))?;
        track.visible = visible;
        Ok(())
    }

    pub fn set_locked(
        project: &Arc<RwLock<Project>>,
        track_id: Uuid,
        locked: bool,
    ) -> Result<(), TimelineError> {
        let mut proj = project
            .write()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;
        let track = proj
            .get_track_mut(track_id)
            .ok_or_else(|| TimelineError::Project(format!("Track {} not found", track_id)))?;
        track.locked = locked;
        Ok(())
    }

    /// Volume only exists on audio tracks.
    pub fn set_volume(
        project: &Arc<RwLock<Project>>,
        track_id: Uuid,
        volume: f64,
    ) -> Result<(), TimelineError> {
        let mut proj = project
            .write()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;
        let track = proj
            .get_track_mut(track_id)
            .ok_or_else(|| TimelineError::Project(format!("Track {} not found", track_id)))?;
        if track.kind != MediaKind::Audio {
            return Err(TimelineError::Project(format!(
                "Track {} is not an audio track",
                track_id
            )));
        }
        track.volume = Some(volume.max(0.0));
        Ok(())
    }
}
