use std::collections::HashMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::color::Color;
use super::keyframe::{AnimatedProperty, Keyframe, KeyframeValue};
use super::track::MediaKind;

/// Tolerance for the `duration == trim_end - trim_start` invariant.
pub const TIME_EPSILON: f64 = 1e-9;

/// Reference into the asset cache. Multiple clips may share one entry;
/// the cache key is `(uri, kind)`.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash, Debug)]
pub struct SourceRef {
    pub uri: String,
    pub kind: MediaKind,
}

impl SourceRef {
    pub fn new(uri: &str, kind: MediaKind) -> Self {
        Self {
            uri: uri.to_string(),
            kind,
        }
    }
}

/// Composite placement of a clip within the project frame.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1920.0,
            height: 1080.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct TextStyle {
    pub content: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_text_color")]
    pub color: Color,
}

fn default_font_size() -> f64 {
    48.0
}

fn default_text_color() -> Color {
    Color::WHITE
}

/// Opaque effect descriptor. The timeline core carries these verbatim for
/// the hosting application; it never interprets them.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct EffectConfig {
    pub effect_type: String,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Clip {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Asset reference; `None` for text clips, which draw their own content.
    #[serde(default)]
    pub source: Option<SourceRef>,
    /// Timeline-absolute start in seconds, always >= 0.
    pub start_time: f64,
    /// Seconds on the timeline, always > 0 and equal to `trim_end - trim_start`.
    pub duration: f64,
    /// Source-relative window start in seconds.
    #[serde(default)]
    pub trim_start: f64,
    /// Source-relative window end in seconds.
    pub trim_end: f64,
    #[serde(default)]
    pub bounds: Bounds,
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default)]
    pub text: Option<TextStyle>,
    #[serde(default)]
    pub effects: Vec<EffectConfig>,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
}

fn default_volume() -> f64 {
    1.0
}

impl Clip {
    pub fn new(kind: MediaKind, source: Option<SourceRef>, start_time: f64, duration: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            source,
            start_time,
            duration,
            trim_start: 0.0,
            trim_end: duration,
            bounds: Bounds::default(),
            volume: 1.0,
            text: None,
            effects: Vec::new(),
            keyframes: Vec::new(),
        }
    }

    pub fn video(uri: &str, start_time: f64, duration: f64) -> Self {
        Self::new(
            MediaKind::Video,
            Some(SourceRef::new(uri, MediaKind::Video)),
            start_time,
            duration,
        )
    }

    pub fn image(uri: &str, start_time: f64, duration: f64) -> Self {
        Self::new(
            MediaKind::Image,
            Some(SourceRef::new(uri, MediaKind::Image)),
            start_time,
            duration,
        )
    }

    pub fn audio(uri: &str, start_time: f64, duration: f64) -> Self {
        Self::new(
            MediaKind::Audio,
            Some(SourceRef::new(uri, MediaKind::Audio)),
            start_time,
            duration,
        )
    }

    pub fn text(content: &str, start_time: f64, duration: f64) -> Self {
        let mut clip = Self::new(MediaKind::Text, None, start_time, duration);
        clip.text = Some(TextStyle {
            content: content.to_string(),
            font_size: default_font_size(),
            color: default_text_color(),
        });
        clip
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Half-open containment: `[start_time, start_time + duration)`.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time()
    }

    pub fn relative_time(&self, global_time: f64) -> f64 {
        global_time - self.start_time
    }

    /// Sorted keyframes for one property, ascending by time.
    pub fn keyframes_for(&self, property: AnimatedProperty) -> Vec<&Keyframe> {
        self.keyframes
            .iter()
            .filter(|kf| kf.property == property)
            .collect()
    }

    /// Keep the keyframe list sorted by (property, time). Insertion and
    /// keyframe-time edits funnel through this.
    pub fn sort_keyframes(&mut self) {
        self.keyframes
            .sort_by(|a, b| (a.property, a.time).cmp(&(b.property, b.time)));
    }

    /// The non-animated fallback value used when a property has no keyframes.
    pub fn static_value(&self, property: AnimatedProperty) -> KeyframeValue {
        match property {
            AnimatedProperty::Position => KeyframeValue::vec2(self.bounds.x, self.bounds.y),
            AnimatedProperty::Scale => KeyframeValue::vec2(1.0, 1.0),
            AnimatedProperty::Rotation => KeyframeValue::Scalar(OrderedFloat(0.0)),
            AnimatedProperty::Opacity => KeyframeValue::Scalar(OrderedFloat(1.0)),
            AnimatedProperty::Volume => KeyframeValue::Scalar(OrderedFloat(self.volume)),
        }
    }
}
