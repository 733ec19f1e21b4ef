use std::sync::{Arc, RwLock};

use log::debug;
use uuid::Uuid;

use crate::error::TimelineError;
use crate::model::clip::{Bounds, Clip, TIME_EPSILON};
use crate::model::project::Project;
use crate::model::track::Track;

pub struct ClipHandler;

impl ClipHandler {
    /// Place a clip on a track. Validates everything against the current
    /// state before touching it, so a rejected call leaves the project
    /// unchanged.
    pub fn add_clip(
        project: &Arc<RwLock<Project>>,
        track_id: Uuid,
        clip: Clip,
    ) -> Result<Uuid, TimelineError> {
        let mut proj = project
            .write()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;

        let track = proj
            .get_track_mut(track_id)
            .ok_or_else(|| TimelineError::Project(format!("Track {} not found", track_id)))?;
        Self::check_unlocked(track)?;

        if track.kind != clip.kind {
            return Err(TimelineError::Project(format!(
                "Cannot place a {} clip on a {} track",
                clip.kind, track.kind
            )));
        }
        if clip.start_time < 0.0 {
            return Err(TimelineError::OutOfBounds(format!(
                "Clip start {} is negative",
                clip.start_time
            )));
        }
        if clip.duration <= 0.0 {
            return Err(TimelineError::OutOfBounds(format!(
                "Clip duration {} must be positive",
                clip.duration
            )));
        }
        if (clip.trim_end - clip.trim_start - clip.duration).abs() > TIME_EPSILON {
            return Err(TimelineError::InvalidTrim(format!(
                "Trim window [{}, {}] does not match duration {}",
                clip.trim_start, clip.trim_end, clip.duration
            )));
        }
        if track.overlaps(clip.start_time, clip.duration, None) {
            return Err(TimelineError::Overlap {
                track_id,
                message: format!(
                    "Interval [{}, {}) collides with an existing clip",
                    clip.start_time,
                    clip.end_time()
                ),
            });
        }

        let id = clip.id;
        debug!(
            "Add {} clip {} at {}s for {}s on track {}",
            clip.kind, id, clip.start_time, clip.duration, track_id
        );
        track.clips.push(clip);
        Ok(id)
    }

    /// Move a clip along its track. Clamps to >= 0, optionally rounds to the
    /// snap grid before validation, and returns the accepted start time.
    /// On rejection the clip keeps its prior position.
    pub fn move_clip(
        project: &Arc<RwLock<Project>>,
        clip_id: Uuid,
        new_start_time: f64,
        snap_grid: Option<f64>,
    ) -> Result<f64, TimelineError> {
        let mut proj = project
            .write()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;

        let track_id = proj
            .track_of_clip(clip_id)
            .map(|t| t.id)
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;
        let track = proj
            .get_track_mut(track_id)
            .ok_or_else(|| TimelineError::Project(format!("Track {} not found", track_id)))?;
        Self::check_unlocked(track)?;

        let mut candidate = new_start_time.max(0.0);
        if let Some(grid) = snap_grid {
            if grid > 0.0 {
                candidate = (candidate / grid).round() * grid;
            }
        }

        let duration = track
            .get_clip(clip_id)
            .map(|c| c.duration)
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;
        if track.overlaps(candidate, duration, Some(clip_id)) {
            return Err(TimelineError::Overlap {
                track_id,
                message: format!(
                    "Interval [{}, {}) collides with an existing clip",
                    candidate,
                    candidate + duration
                ),
            });
        }

        if let Some(clip) = track.get_clip_mut(clip_id) {
            clip.start_time = candidate;
        }
        Ok(candidate)
    }

    /// Adjust the source window. `start_time` is untouched; duration is
    /// recomputed from the new window, and keyframes past the shortened
    /// duration are dropped so every keyframe time stays within
    /// `[0, duration]`. `natural_duration` is the source's intrinsic length
    /// when known.
    pub fn trim_clip(
        project: &Arc<RwLock<Project>>,
        clip_id: Uuid,
        new_trim_start: f64,
        new_trim_end: f64,
        natural_duration: Option<f64>,
    ) -> Result<(), TimelineError> {
        let mut proj = project
            .write()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;

        let track_id = proj
            .track_of_clip(clip_id)
            .map(|t| t.id)
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;
        let track = proj
            .get_track_mut(track_id)
            .ok_or_else(|| TimelineError::Project(format!("Track {} not found", track_id)))?;
        Self::check_unlocked(track)?;

        let new_duration = new_trim_end - new_trim_start;
        Self::validate_trim_window(new_trim_start, new_trim_end, natural_duration)?;

        let start_time = track
            .get_clip(clip_id)
            .map(|c| c.start_time)
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;
        if track.overlaps(start_time, new_duration, Some(clip_id)) {
            return Err(TimelineError::Overlap {
                track_id,
                message: format!(
                    "Trimmed interval [{}, {}) collides with an existing clip",
                    start_time,
                    start_time + new_duration
                ),
            });
        }

        if let Some(clip) = track.get_clip_mut(clip_id) {
            clip.trim_start = new_trim_start;
            clip.trim_end = new_trim_end;
            clip.duration = new_duration;
            clip.keyframes
                .retain(|kf| kf.time.into_inner() <= new_duration);
        }
        Ok(())
    }

    /// Leading-edge trim gesture: move `trim_start` and shift `start_time`
    /// by the same delta so the clip's far edge stays fixed. Keyframe times
    /// shift with the content; keyframes trimmed off the front are dropped.
    /// Applied atomically after all validation.
    pub fn trim_leading_edge(
        project: &Arc<RwLock<Project>>,
        clip_id: Uuid,
        new_trim_start: f64,
        natural_duration: Option<f64>,
    ) -> Result<(), TimelineError> {
        let mut proj = project
            .write()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;

        let track_id = proj
            .track_of_clip(clip_id)
            .map(|t| t.id)
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;
        let track = proj
            .get_track_mut(track_id)
            .ok_or_else(|| TimelineError::Project(format!("Track {} not found", track_id)))?;
        Self::check_unlocked(track)?;

        let (old_trim_start, trim_end, old_start) = track
            .get_clip(clip_id)
            .map(|c| (c.trim_start, c.trim_end, c.start_time))
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;

        Self::validate_trim_window(new_trim_start, trim_end, natural_duration)?;
        let delta = new_trim_start - old_trim_start;
        let new_start = old_start + delta;
        if new_start < 0.0 {
            return Err(TimelineError::OutOfBounds(format!(
                "Leading trim would move clip start to {}",
                new_start
            )));
        }
        let new_duration = trim_end - new_trim_start;
        if track.overlaps(new_start, new_duration, Some(clip_id)) {
            return Err(TimelineError::Overlap {
                track_id,
                message: format!(
                    "Trimmed interval [{}, {}) collides with an existing clip",
                    new_start,
                    new_start + new_duration
                ),
            });
        }

        if let Some(clip) = track.get_clip_mut(clip_id) {
            clip.trim_start = new_trim_start;
            clip.start_time = new_start;
            clip.duration = new_duration;
            for keyframe in &mut clip.keyframes {
                keyframe.time =
                    ordered_float::OrderedFloat(keyframe.time.into_inner() - delta);
            }
            clip.keyframes.retain(|kf| {
                let t = kf.time.into_inner();
                (0.0..=new_duration).contains(&t)
            });
        }
        Ok(())
    }

    /// Copy a clip immediately after itself: same duration, trim window and
    /// keyframes (times stay clip-relative), fresh ids throughout.
    pub fn duplicate_clip(
        project: &Arc<RwLock<Project>>,
        clip_id: Uuid,
    ) -> Result<Uuid, TimelineError> {
        let mut proj = project
            .write()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;

        let track_id = proj
            .track_of_clip(clip_id)
            .map(|t| t.id)
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;
        let track = proj
            .get_track_mut(track_id)
            .ok_or_else(|| TimelineError::Project(format!("Track {} not found", track_id)))?;
        Self::check_unlocked(track)?;

        let original = track
            .get_clip(clip_id)
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;

        let mut copy = original.clone();
        copy.id = Uuid::new_v4();
        copy.start_time = original.end_time();
        for keyframe in &mut copy.keyframes {
            keyframe.id = Uuid::new_v4();
        }

        if track.overlaps(copy.start_time, copy.duration, None) {
            return Err(TimelineError::Overlap {
                track_id,
                message: format!(
                    "Duplicate slot [{}, {}) collides with an existing clip",
                    copy.start_time,
                    copy.end_time()
                ),
            });
        }

        let id = copy.id;
        track.clips.push(copy);
        Ok(id)
    }

    /// Split one clip into two at a timeline-absolute time strictly inside
    /// it. Trim windows partition at the cut; keyframes are assigned to the
    /// side their time falls on (right-side times re-based), and a keyframe
    /// sitting exactly at the cut stays with the left clip. Returns the id
    /// of the new right-hand clip.
    pub fn split_clip(
        project: &Arc<RwLock<Project>>,
        clip_id: Uuid,
        at_time: f64,
    ) -> Result<Uuid, TimelineError> {
        let mut proj = project
            .write()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;

        let track_id = proj
            .track_of_clip(clip_id)
            .map(|t| t.id)
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;
        let track = proj
            .get_track_mut(track_id)
            .ok_or_else(|| TimelineError::Project(format!("Track {} not found", track_id)))?;
        Self::check_unlocked(track)?;

        let original = track
            .get_clip(clip_id)
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;
        if at_time <= original.start_time + TIME_EPSILON
            || at_time >= original.end_time() - TIME_EPSILON
        {
            return Err(TimelineError::OutOfBounds(format!(
                "Split time {} is outside clip interval ({}, {})",
                at_time,
                original.start_time,
                original.end_time()
            )));
        }

        let left_duration = at_time - original.start_time;
        let mut right = original.clone();
        right.id = Uuid::new_v4();
        right.start_time = at_time;
        right.duration = original.duration - left_duration;
        right.trim_start = original.trim_start + left_duration;
        right.keyframes.clear();
        for keyframe in original.keyframes.iter() {
            if keyframe.time.into_inner() > left_duration {
                let mut moved = keyframe.clone();
                moved.id = Uuid::new_v4();
                moved.time = ordered_float::OrderedFloat(keyframe.time.into_inner() - left_duration);
                right.keyframes.push(moved);
            }
        }

        let right_id = right.id;
        if let Some(clip) = track.get_clip_mut(clip_id) {
            clip.duration = left_duration;
            clip.trim_end = clip.trim_start + left_duration;
            clip.keyframes
                .retain(|kf| kf.time.into_inner() <= left_duration);
        }
        track.clips.push(right);
        Ok(right_id)
    }

    pub fn delete_clip(project: &Arc<RwLock<Project>>, clip_id: Uuid) -> Result<(), TimelineError> {
        let mut proj = project
            .write()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;

        let track_id = proj
            .track_of_clip(clip_id)
            .map(|t| t.id)
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;
        let track = proj
            .get_track_mut(track_id)
            .ok_or_else(|| TimelineError::Project(format!("Track {} not found", track_id)))?;
        Self::check_unlocked(track)?;

        let index = track
            .clips
            .iter()
            .position(|c| c.id == clip_id)
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;
        track.clips.remove(index);
        Ok(())
    }

    pub fn set_bounds(
        project: &Arc<RwLock<Project>>,
        clip_id: Uuid,
        bounds: Bounds,
    ) -> Result<(), TimelineError> {
        let mut proj = project
            .write()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;
        let (track_id, _) = proj
            .find_clip(clip_id)
            .map(|(tid, c)| (tid, c.id))
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;
        let track = proj
            .get_track_mut(track_id)
            .ok_or_else(|| TimelineError::Project(format!("Track {} not found", track_id)))?;
        Self::check_unlocked(track)?;
        if let Some(clip) = track.get_clip_mut(clip_id) {
            clip.bounds = bounds;
        }
        Ok(())
    }

    pub fn set_volume(
        project: &Arc<RwLock<Project>>,
        clip_id: Uuid,
        volume: f64,
    ) -> Result<(), TimelineError> {
        let mut proj = project
            .write()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;
        let (track_id, _) = proj
            .find_clip(clip_id)
            .map(|(tid, c)| (tid, c.id))
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;
        let track = proj
            .get_track_mut(track_id)
            .ok_or_else(|| TimelineError::Project(format!("Track {} not found", track_id)))?;
        Self::check_unlocked(track)?;
        if let Some(clip) = track.get_clip_mut(clip_id) {
            clip.volume = volume.max(0.0);
        }
        Ok(())
    }

    fn check_unlocked(track: &Track) -> Result<(), TimelineError> {
        if track.locked {
            Err(TimelineError::LockedTrack(track.id))
        } else {
            Ok(())
        }
    }

    fn validate_trim_window(
        trim_start: f64,
        trim_end: f64,
        natural_duration: Option<f64>,
    ) -> Result<(), TimelineError> {
        if trim_start < 0.0 {
            return Err(TimelineError::InvalidTrim(format!(
                "Trim start {} is negative",
                trim_start
            )));
        }
        if trim_end - trim_start <= 0.0 {
            return Err(TimelineError::InvalidTrim(format!(
                "Trim window [{}, {}] is empty",
                trim_start, trim_end
            )));
        }
        if let Some(natural) = natural_duration {
            if trim_end > natural + TIME_EPSILON {
                return Err(TimelineError::InvalidTrim(format!(
                    "Trim end {} exceeds source duration {}",
                    trim_end, natural
                )));
            }
        }
        Ok(())
    }
}
