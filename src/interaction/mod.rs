//! Pointer-gesture to timeline-mutation translation, independent of any UI
//! toolkit. Consumes pixel coordinates and deltas, converts through the
//! viewport's time scale, and calls the validated editor operations. A
//! rejected move or trim holds the last accepted state for the rest of the
//! gesture; it never snaps back to the pre-drag position mid-gesture.

use std::collections::HashSet;

use uuid::Uuid;

use crate::editor::EditorService;
use crate::error::TimelineError;
use crate::renderer::preview::PreviewHandle;

pub const DEFAULT_BASE_PX_PER_SECOND: f64 = 100.0;
pub const DEFAULT_GRID_UNIT: f64 = 1.0;
const MIN_ZOOM: f64 = 0.05;
const MAX_ZOOM: f64 = 50.0;

/// Pixel/time mapping of the timeline panel.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Viewport {
    pub base_px_per_second: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            base_px_per_second: DEFAULT_BASE_PX_PER_SECOND,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn time_per_pixel(&self) -> f64 {
        1.0 / (self.base_px_per_second * self.zoom)
    }

    pub fn x_to_time(&self, x: f64) -> f64 {
        x * self.time_per_pixel()
    }

    pub fn time_to_x(&self, time: f64) -> f64 {
        time * self.base_px_per_second * self.zoom
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TrimEdge {
    Start,
    End,
}

/// Result of one drag/trim step: where the clip is now, and the rejection
/// that kept it there if the candidate failed validation.
#[derive(Debug)]
pub struct GestureStep {
    pub accepted_start_time: f64,
    pub rejection: Option<TimelineError>,
}

struct DragState {
    clip_id: Uuid,
    /// Seconds between the cursor and the clip's start at grab time.
    grab_offset: f64,
    last_accepted: f64,
}

struct TrimState {
    clip_id: Uuid,
    edge: TrimEdge,
    grab_x: f64,
    original_trim_start: f64,
    original_trim_end: f64,
    original_start_time: f64,
}

pub struct InteractionController {
    editor: EditorService,
    preview: Option<PreviewHandle>,
    pub viewport: Viewport,
    snap_enabled: bool,
    grid_unit: f64,
    selection: HashSet<Uuid>,
    drag: Option<DragState>,
    trim: Option<TrimState>,
}

impl InteractionController {
    pub fn new(editor: EditorService) -> Self {
        Self {
            editor,
            preview: None,
            viewport: Viewport::default(),
            snap_enabled: true,
            grid_unit: DEFAULT_GRID_UNIT,
            selection: HashSet::new(),
            drag: None,
            trim: None,
        }
    }

    /// Wire the playhead to a running preview loop.
    pub fn with_preview(mut self, preview: PreviewHandle) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.viewport.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn toggle_snap(&mut self) {
        self.snap_enabled = !self.snap_enabled;
    }

    pub fn snap_enabled(&self) -> bool {
        self.snap_enabled
    }

    pub fn set_grid_unit(&mut self, unit: f64) {
        if unit > 0.0 {
            self.grid_unit = unit;
        }
    }

    fn snap_grid(&self) -> Option<f64> {
        self.snap_enabled.then_some(self.grid_unit)
    }

    /// Additive modifier toggles membership; a plain click selects only the
    /// clicked clip.
    pub fn select(&mut self, clip_id: Uuid, additive: bool) {
        if additive {
            if !self.selection.insert(clip_id) {
                self.selection.remove(&clip_id);
            }
        } else {
            self.selection.clear();
            self.selection.insert(clip_id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selection(&self) -> &HashSet<Uuid> {
        &self.selection
    }

    /// Grab a clip. Locked tracks fast-fail here, before any model call.
    pub fn begin_drag(&mut self, clip_id: Uuid, pointer_x: f64) -> Result<(), TimelineError> {
        self.check_unlocked(clip_id)?;
        let start_time = self
            .editor
            .with_project(|p| p.find_clip(clip_id).map(|(_, c)| c.start_time))?
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;
        self.drag = Some(DragState {
            clip_id,
            grab_offset: self.viewport.x_to_time(pointer_x) - start_time,
            last_accepted: start_time,
        });
        Ok(())
    }

    /// One pointer-move step of an active drag.
    pub fn drag_to(&mut self, pointer_x: f64) -> Result<GestureStep, TimelineError> {
        let snap = self.snap_grid();
        let candidate = {
            let drag = self
                .drag
                .as_ref()
                .ok_or_else(|| TimelineError::Runtime("No drag in progress".to_string()))?;
            (self.viewport.x_to_time(pointer_x) - drag.grab_offset).max(0.0)
        };
        let drag = self
            .drag
            .as_mut()
            .ok_or_else(|| TimelineError::Runtime("No drag in progress".to_string()))?;
        match self.editor.move_clip(drag.clip_id, candidate, snap) {
            Ok(accepted) => {
                drag.last_accepted = accepted;
                Ok(GestureStep {
                    accepted_start_time: accepted,
                    rejection: None,
                })
            }
            Err(err) => Ok(GestureStep {
                accepted_start_time: drag.last_accepted,
                rejection: Some(err),
            }),
        }
    }

    /// The last accepted state is final.
    pub fn end_drag(&mut self) -> Option<f64> {
        self.drag.take().map(|d| d.last_accepted)
    }

    pub fn begin_trim(
        &mut self,
        clip_id: Uuid,
        edge: TrimEdge,
        pointer_x: f64,
    ) -> Result<(), TimelineError> {
        self.check_unlocked(clip_id)?;
        let (trim_start, trim_end, start_time) = self
            .editor
            .with_project(|p| {
                p.find_clip(clip_id)
                    .map(|(_, c)| (c.trim_start, c.trim_end, c.start_time))
            })?
            .ok_or_else(|| TimelineError::Project(format!("Clip {} not found", clip_id)))?;
        self.trim = Some(TrimState {
            clip_id,
            edge,
            grab_x: pointer_x,
            original_trim_start: trim_start,
            original_trim_end: trim_end,
            original_start_time: start_time,
        });
        Ok(())
    }

    /// One pointer-move step of an active trim. Each handle adjusts only its
    /// own trim bound; the opposite bound never moves.
    pub fn trim_to(&mut self, pointer_x: f64) -> Result<GestureStep, TimelineError> {
        let (clip_id, edge, delta, original_trim_start, original_trim_end) = {
            let trim = self
                .trim
                .as_ref()
                .ok_or_else(|| TimelineError::Runtime("No trim in progress".to_string()))?;
            (
                trim.clip_id,
                trim.edge,
                (pointer_x - trim.grab_x) * self.viewport.time_per_pixel(),
                trim.original_trim_start,
                trim.original_trim_end,
            )
        };

        let result = match edge {
            TrimEdge::Start => self
                .editor
                .trim_leading_edge(clip_id, original_trim_start + delta),
            TrimEdge::End => {
                self.editor
                    .trim_clip(clip_id, original_trim_start, original_trim_end + delta)
            }
        };

        let held = self
            .editor
            .with_project(|p| p.find_clip(clip_id).map(|(_, c)| c.start_time))?
            .unwrap_or(self.trim.as_ref().map_or(0.0, |t| t.original_start_time));
        Ok(GestureStep {
            accepted_start_time: held,
            rejection: result.err(),
        })
    }

    pub fn end_trim(&mut self) {
        self.trim = None;
    }

    /// Clicking the ruler moves the playhead directly, independent of clips.
    pub fn ruler_click(&self, pointer_x: f64) -> Result<f64, TimelineError> {
        let time = self.viewport.x_to_time(pointer_x).max(0.0);
        if let Some(preview) = &self.preview {
            preview.seek(time)?;
        }
        Ok(time)
    }

    fn check_unlocked(&self, clip_id: Uuid) -> Result<(), TimelineError> {
        let locked_track = self.editor.with_project(|p| {
            p.track_of_clip(clip_id)
                .filter(|t| t.locked)
                .map(|t| t.id)
        })?;
        match locked_track {
            Some(track_id) => Err(TimelineError::LockedTrack(track_id)),
            None => Ok(()),
        }
    }
}
