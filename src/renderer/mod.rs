pub mod compositor;
pub mod preview;

pub use compositor::{OverlayOptions, compose_frame};
pub use preview::{
    PlaybackClock, PreviewCommand, PreviewConfig, PreviewEngine, PreviewFrame, PreviewHandle,
    SnapshotSlot, TransportStatus,
};
