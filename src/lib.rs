//! Multi-track timeline model and real-time preview engine for a video
//! editor. The crate owns the temporal data model, validated editing
//! operations, keyframe interpolation, asynchronous media readiness and the
//! fixed-rate compositing loop; encoding/decoding plugs in at the
//! [`cache::MediaLoader`] and [`export::Encoder`] seams.

pub mod animation;
pub mod cache;
pub mod editor;
pub mod error;
pub mod export;
pub mod interaction;
pub mod model;
pub mod renderer;
pub mod util;

pub use error::TimelineError;
