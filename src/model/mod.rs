pub mod clip;
pub mod color;
pub mod keyframe;
pub mod project;
pub mod track;

pub use clip::{Bounds, Clip, EffectConfig, SourceRef, TextStyle};
pub use color::Color;
pub use keyframe::{AnimatedProperty, Keyframe, KeyframeValue, Vec2};
pub use project::{Project, ProjectSettings, Resolution};
pub use track::{MediaKind, Track};
