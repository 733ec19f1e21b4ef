use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::clip::Clip;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Text,
    Image,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Text => "text",
            MediaKind::Image => "image",
        };
        write!(f, "{}", s)
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Track {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub name: String,
    #[serde(default)]
    pub clips: Vec<Clip>,
    /// Composite rank; lower orders render first (underneath). Unique and
    /// contiguous within a project.
    pub order: u32,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    /// Audio tracks only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

fn default_visible() -> bool {
    true
}

impl Track {
    pub fn new(kind: MediaKind, name: &str, order: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            name: name.to_string(),
            clips: Vec::new(),
            order,
            visible: true,
            locked: false,
            volume: match kind {
                MediaKind::Audio => Some(1.0),
                _ => None,
            },
        }
    }

    pub fn get_clip(&self, id: Uuid) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn get_clip_mut(&mut self, id: Uuid) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == id)
    }

    /// The single clip active at `time`, if any. At most one exists by the
    /// no-overlap invariant, so a linear scan is enough.
    pub fn clip_at(&self, time: f64) -> Option<&Clip> {
        self.clips.iter().find(|c| c.contains(time))
    }

    /// Interval collision check scoped to this track, O(clips-in-track).
    /// `exclude` skips the clip being moved or trimmed.
    pub fn overlaps(&self, start: f64, duration: f64, exclude: Option<Uuid>) -> bool {
        let end = start + duration;
        self.clips.iter().any(|c| {
            if Some(c.id) == exclude {
                return false;
            }
            start < c.end_time() && c.start_time < end
        })
    }
}
