use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::clip::Clip;
use super::color::Color;
use super::track::Track;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const FULL_HD: Resolution = Resolution {
        width: 1920,
        height: 1080,
    };
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ProjectSettings {
    #[serde(default)]
    pub background: Color,
    #[serde(default = "default_export_format")]
    pub export_format: String,
    #[serde(default = "default_export_quality")]
    pub export_quality: String,
}

fn default_export_format() -> String {
    "mp4".to_string()
}

fn default_export_quality() -> String {
    "high".to_string()
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            background: Color::BLACK,
            export_format: default_export_format(),
            export_quality: default_export_quality(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub resolution: Resolution,
    pub frame_rate: f64,
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub settings: ProjectSettings,
}

impl Project {
    pub fn new(name: &str, resolution: Resolution, frame_rate: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            resolution,
            frame_rate,
            tracks: Vec::new(),
            settings: ProjectSettings::default(),
        }
    }

    pub fn load(json_str: &str) -> Result<Self, serde_json::Error> {
        let project: Project = serde_json::from_str(json_str)?;
        Ok(project)
    }

    pub fn save(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Derived, never stored: the latest clip end across all tracks, or 0
    /// for an empty project.
    pub fn duration(&self) -> f64 {
        self.tracks
            .iter()
            .flat_map(|t| t.clips.iter())
            .map(|c| c.end_time())
            .fold(0.0, f64::max)
    }

    pub fn get_track(&self, id: Uuid) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn get_track_mut(&mut self, id: Uuid) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    /// Locate a clip together with its owning track id.
    pub fn find_clip(&self, clip_id: Uuid) -> Option<(Uuid, &Clip)> {
        for track in &self.tracks {
            if let Some(clip) = track.get_clip(clip_id) {
                return Some((track.id, clip));
            }
        }
        None
    }

    pub fn find_clip_mut(&mut self, clip_id: Uuid) -> Option<(Uuid, &mut Clip)> {
        for track in &mut self.tracks {
            let track_id = track.id;
            if let Some(clip) = track.get_clip_mut(clip_id) {
                return Some((track_id, clip));
            }
        }
        None
    }

    pub fn track_of_clip(&self, clip_id: Uuid) -> Option<&Track> {
        self.tracks.iter().find(|t| t.get_clip(clip_id).is_some())
    }

    /// Tracks in composite order, ascending (first renders underneath).
    pub fn tracks_in_render_order(&self) -> Vec<&Track> {
        let mut tracks: Vec<&Track> = self.tracks.iter().collect();
        tracks.sort_by_key(|t| t.order);
        tracks
    }

    /// Re-rank track orders to be unique and contiguous (0..n), preserving
    /// the current relative ordering. Called after track removal.
    pub fn normalize_track_orders(&mut self) {
        self.tracks.sort_by_key(|t| t.order);
        for (index, track) in self.tracks.iter_mut().enumerate() {
            track.order = index as u32;
        }
    }
}
