use std::sync::{Arc, RwLock};

use ordered_float::OrderedFloat;
use uuid::Uuid;

use crate::animation::EasingFunction;
use crate::error::TimelineError;
use crate::model::clip::Clip;
use crate::model::keyframe::{AnimatedProperty, Keyframe, KeyframeValue};
use crate::model::project::Project;

/// Partial keyframe edit; `None` fields are left as they are.
#[derive(Clone, Debug, Default)]
pub struct KeyframePatch {
    pub time: Option<f64>,
    pub value: Option<KeyframeValue>,
    pub easing: Option<EasingFunction>,
}

pub struct KeyframeHandler;

impl KeyframeHandler {
    /// Add a keyframe at a clip-relative time. A keyframe already sitting at
    /// the exact same (property, time) is replaced rather than duplicated,
    /// keeping the per-property list free of equal times.
    pub fn add_keyframe(
        project: &Arc<RwLock<Project>>,
        clip_id: Uuid,
        property: AnimatedProperty,
        time: f64,
        value: KeyframeValue,
        easing: EasingFunction,
    ) -> Result<Uuid, TimelineError> {
        let mut proj = project
            .write()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;

        let (track_id, _) = proj
            .find_clip(clip_id)
            .map(|(tid, c)| (tid, c.id))
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;
        if proj.get_track(track_id).is_some_and(|t| t.locked) {
            return Err(TimelineError::LockedTrack(track_id));
        }

        let clip = proj
            .find_clip_mut(clip_id)
            .map(|(_, c)| c)
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;

        Self::validate_time(clip, time)?;
        Self::validate_shape(property, &value)?;

        let keyframe = Keyframe::new(property, time, value, easing);
        let id = keyframe.id;
        clip.keyframes
            .retain(|kf| !(kf.property == property && kf.time == OrderedFloat(time)));
        clip.keyframes.push(keyframe);
        clip.sort_keyframes();
        Ok(id)
    }

    pub fn update_keyframe(
        project: &Arc<RwLock<Project>>,
        clip_id: Uuid,
        keyframe_id: Uuid,
        patch: KeyframePatch,
    ) -> Result<(), TimelineError> {
        let mut proj = project
            .write()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;

        let (track_id, _) = proj
            .find_clip(clip_id)
            .map(|(tid, c)| (tid, c.id))
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;
        if proj.get_track(track_id).is_some_and(|t| t.locked) {
            return Err(TimelineError::LockedTrack(track_id));
        }

        let clip = proj
            .find_clip_mut(clip_id)
            .map(|(_, c)| c)
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;

        let property = clip
            .keyframes
            .iter()
            .find(|kf| kf.id == keyframe_id)
            .map(|kf| kf.property)
            .ok_or_else(|| {
                TimelineError::Project(format!("Keyframe {} not found", keyframe_id))
            })?;

        if let Some(new_time) = patch.time {
            Self::validate_time(clip, new_time)?;
            let occupied = clip.keyframes.iter().any(|kf| {
                kf.id != keyframe_id
                    && kf.property == property
                    && kf.time == OrderedFloat(new_time)
            });
            if occupied {
                return Err(TimelineError::InvalidKeyframe(format!(
                    "A {} keyframe already exists at {}s",
                    property, new_time
                )));
            }
        }
        if let Some(ref new_value) = patch.value {
            Self::validate_shape(property, new_value)?;
        }

        // Validated; apply the patch.
        if let Some(keyframe) = clip.keyframes.iter_mut().find(|kf| kf.id == keyframe_id) {
            if let Some(new_time) = patch.time {
                keyframe.time = OrderedFloat(new_time);
            }
            if let Some(new_value) = patch.value {
                keyframe.value = new_value;
            }
            if let Some(new_easing) = patch.easing {
                keyframe.easing = new_easing;
            }
        }
        clip.sort_keyframes();
        Ok(())
    }

    pub fn delete_keyframe(
        project: &Arc<RwLock<Project>>,
        clip_id: Uuid,
        keyframe_id: Uuid,
    ) -> Result<(), TimelineError> {
        let mut proj = project
            .write()
            .map_err(|_| TimelineError::Runtime("Lock poisoned".to_string()))?;

        let (track_id, _) = proj
            .find_clip(clip_id)
            .map(|(tid, c)| (tid, c.id))
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;
        if proj.get_track(track_id).is_some_and(|t| t.locked) {
            return Err(TimelineError::LockedTrack(track_id));
        }

        let clip = proj
            .find_clip_mut(clip_id)
            .map(|(_, c)| c)
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;

        let index = clip
            .keyframes
            .iter()
            .position(|kf| kf.id == keyframe_id)
            .ok_or_else(|| {
                TimelineError::Project(format!("Keyframe {} not found", keyframe_id))
            })?;
        clip.keyframes.remove(index);
        Ok(())
    }

    fn validate_time(clip: &Clip, time: f64) -> Result<(), TimelineError> {
        if time < 0.0 || time > clip.duration {
            return Err(TimelineError::InvalidKeyframe(format!(
                "Time {} is outside the clip window [0, {}]",
                time, clip.duration
            )));
        }
        Ok(())
    }

    fn validate_shape(
        property: AnimatedProperty,
        value: &KeyframeValue,
    ) -> Result<(), TimelineError> {
        if !value.matches(property) {
            return Err(TimelineError::InvalidKeyframe(format!(
                "Property {} expects a {} value",
                property,
                if property.expects_vec2() {
                    "vec2"
                } else {
                    "scalar"
                }
            )));
        }
        Ok(())
    }
}
