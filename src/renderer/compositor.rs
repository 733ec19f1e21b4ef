//! Pure frame assembly: project snapshot + time in, RGBA bitmap out.
//! Never blocks on media readiness and never panics the render loop;
//! unavailable assets draw deterministic placeholders.

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::animation::{self, SampledProperties};
use crate::cache::{AssetCache, AssetState};
use crate::model::clip::{Bounds, Clip, TextStyle};
use crate::model::project::Project;
use crate::model::track::MediaKind;

const PLACEHOLDER_SIZE: (u32, u32) = (320, 180);
const CHECKER_CELL: u32 = 16;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct OverlayOptions {
    pub show_grid: bool,
    pub show_safe_zones: bool,
    /// Grid line spacing in output pixels.
    pub grid_spacing: u32,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            show_grid: false,
            show_safe_zones: false,
            grid_spacing: 100,
        }
    }
}

/// Composite the project at `time`. Tracks render in ascending order, so
/// later-ordered tracks land on top; at most one clip is active per track.
pub fn compose_frame(
    project: &Project,
    time: f64,
    cache: &AssetCache,
    overlays: &OverlayOptions,
) -> RgbaImage {
    let width = project.resolution.width.max(1);
    let height = project.resolution.height.max(1);
    let bg = project.settings.background;
    let mut frame = RgbaImage::from_pixel(width, height, Rgba([bg.r, bg.g, bg.b, 255]));

    for track in project.tracks_in_render_order() {
        if !track.visible || track.kind == MediaKind::Audio {
            continue;
        }
        let Some(clip) = track.clip_at(time) else {
            continue;
        };
        let relative = clip.relative_time(time);
        let props = animation::sample(clip, relative);
        if props.opacity <= 0.0 {
            continue;
        }
        let (layer, layer_bounds) = resolve_layer(clip, relative, cache);
        if let Some(layer) = layer {
            composite_layer(&mut frame, &layer, &props, &layer_bounds);
        }
    }

    if overlays.show_grid {
        draw_grid(&mut frame, overlays.grid_spacing);
    }
    if overlays.show_safe_zones {
        draw_safe_zones(&mut frame);
    }
    frame
}

/// Pick the pixels a clip contributes at the given clip-relative time.
/// Text draws its own content; media goes through the cache and falls back
/// to a loading or error placeholder.
fn resolve_layer(
    clip: &Clip,
    relative_time: f64,
    cache: &AssetCache,
) -> (Option<Arc<RgbaImage>>, Bounds) {
    if clip.kind == MediaKind::Text {
        if let Some(style) = &clip.text {
            let layer = text_layer(style);
            let bounds = Bounds::new(
                clip.bounds.x,
                clip.bounds.y,
                layer.width() as f64,
                layer.height() as f64,
            );
            return (Some(Arc::new(layer)), bounds);
        }
        return (None, clip.bounds);
    }

    let Some(source) = &clip.source else {
        return (None, clip.bounds);
    };
    // Idempotent: the cache issues at most one load per key.
    cache.request(source);
    let layer = match cache.state(source) {
        Some(AssetState::Ready(_)) => cache
            .frame_at(source, relative_time + clip.trim_start)
            .or_else(|| Some(Arc::new(loading_placeholder()))),
        Some(AssetState::Error(_)) => Some(Arc::new(error_placeholder())),
        Some(AssetState::Loading) | None => Some(Arc::new(loading_placeholder())),
    };
    (layer, clip.bounds)
}

/// Deterministic gray checker shown while a source is still loading.
pub fn loading_placeholder() -> RgbaImage {
    let (w, h) = PLACEHOLDER_SIZE;
    let mut image = RgbaImage::new(w, h);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let cell = (x / CHECKER_CELL + y / CHECKER_CELL) % 2;
        let v = if cell == 0 { 60 } else { 90 };
        *pixel = Rgba([v, v, v, 255]);
    }
    image
}

/// Distinct hatched placeholder for sources that failed to load.
pub fn error_placeholder() -> RgbaImage {
    let (w, h) = PLACEHOLDER_SIZE;
    let mut image = RgbaImage::new(w, h);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let on_hatch = (x + y) % 24 < 3;
        *pixel = if on_hatch {
            Rgba([200, 60, 60, 255])
        } else {
            Rgba([70, 20, 20, 255])
        };
    }
    image
}

/// Stand-in text rendering: a solid block sized from the content and font
/// size. Real glyph rasterization belongs to the hosting renderer.
fn text_layer(style: &TextStyle) -> RgbaImage {
    let glyph_width = (style.font_size * 0.6).max(1.0);
    let width = (glyph_width * style.content.chars().count().max(1) as f64).ceil() as u32;
    let height = (style.font_size * 1.2).ceil().max(1.0) as u32;
    let c = style.color;
    RgbaImage::from_pixel(width.max(1), height, Rgba([c.r, c.g, c.b, c.a]))
}

/// Alpha-composite `src` into `dest` with position, scale, rotation and
/// opacity applied. Inverse-maps each destination pixel inside the rotated
/// rect's bounding box; rows blend in parallel.
fn composite_layer(
    dest: &mut RgbaImage,
    src: &RgbaImage,
    props: &SampledProperties,
    bounds: &Bounds,
) {
    let dw = bounds.width * props.scale.0;
    let dh = bounds.height * props.scale.1;
    if dw <= 0.0 || dh <= 0.0 {
        return;
    }
    let (dest_w, dest_h) = (dest.width() as i64, dest.height() as i64);
    let cx = props.position.0 + dw / 2.0;
    let cy = props.position.1 + dh / 2.0;
    let theta = props.rotation.to_radians();
    let (sin_t, cos_t) = theta.sin_cos();
    let (hw, hh) = (dw / 2.0, dh / 2.0);

    // Axis-aligned bounding box of the rotated rect, clamped to the frame.
    let extent_x = hw * cos_t.abs() + hh * sin_t.abs();
    let extent_y = hw * sin_t.abs() + hh * cos_t.abs();
    let min_x = ((cx - extent_x).floor() as i64).clamp(0, dest_w) as usize;
    let max_x = ((cx + extent_x).ceil() as i64).clamp(0, dest_w) as usize;
    let min_y = ((cy - extent_y).floor() as i64).clamp(0, dest_h) as usize;
    let max_y = ((cy + extent_y).ceil() as i64).clamp(0, dest_h) as usize;
    if min_x >= max_x || min_y >= max_y {
        return;
    }

    let (src_w, src_h) = (src.width(), src.height());
    let opacity = props.opacity.clamp(0.0, 1.0);
    let stride = dest_w as usize * 4;

    dest.par_chunks_exact_mut(stride)
        .enumerate()
        .skip(min_y)
        .take(max_y - min_y)
        .for_each(|(y, row)| {
            for x in min_x..max_x {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                // Rotate back into the layer's local space.
                let lx = dx * cos_t + dy * sin_t;
                let ly = -dx * sin_t + dy * cos_t;
                let u = (lx + hw) / dw;
                let v = (ly + hh) / dh;
                if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                    continue;
                }
                let sx = ((u * src_w as f64) as u32).min(src_w - 1);
                let sy = ((v * src_h as f64) as u32).min(src_h - 1);
                let sp = src.get_pixel(sx, sy).0;
                let alpha = sp[3] as f64 / 255.0 * opacity;
                if alpha <= 0.0 {
                    continue;
                }
                let offset = x * 4;
                for channel in 0..3 {
                    let d = row[offset + channel] as f64;
                    let s = sp[channel] as f64;
                    row[offset + channel] = (s * alpha + d * (1.0 - alpha)).round() as u8;
                }
                let da = row[offset + 3] as f64 / 255.0;
                row[offset + 3] = ((alpha + da * (1.0 - alpha)) * 255.0).round() as u8;
            }
        });
}

fn draw_grid(frame: &mut RgbaImage, spacing: u32) {
    let spacing = spacing.max(8);
    let line = Rgba([255, 255, 255, 255]);
    let (w, h) = (frame.width(), frame.height());
    for x in (0..w).step_by(spacing as usize) {
        for y in 0..h {
            blend_overlay_pixel(frame, x, y, line, 0.15);
        }
    }
    for y in (0..h).step_by(spacing as usize) {
        for x in 0..w {
            blend_overlay_pixel(frame, x, y, line, 0.15);
        }
    }
}

/// Action-safe (90%) and title-safe (80%) rectangle outlines.
fn draw_safe_zones(frame: &mut RgbaImage) {
    let (w, h) = (frame.width(), frame.height());
    draw_rect_outline(frame, w / 20, h / 20, w - w / 10, h - h / 10, Rgba([255, 255, 255, 255]));
    draw_rect_outline(frame, w / 10, h / 10, w - w / 5, h - h / 5, Rgba([255, 220, 80, 255]));
}

fn draw_rect_outline(frame: &mut RgbaImage, x: u32, y: u32, width: u32, height: u32, color: Rgba<u8>) {
    if width == 0 || height == 0 {
        return;
    }
    let (x1, y1) = (x + width - 1, y + height - 1);
    for px in x..=x1 {
        blend_overlay_pixel(frame, px, y, color, 0.5);
        blend_overlay_pixel(frame, px, y1, color, 0.5);
    }
    for py in y..=y1 {
        blend_overlay_pixel(frame, x, py, color, 0.5);
        blend_overlay_pixel(frame, x1, py, color, 0.5);
    }
}

fn blend_overlay_pixel(frame: &mut RgbaImage, x: u32, y: u32, color: Rgba<u8>, alpha: f64) {
    if x >= frame.width() || y >= frame.height() {
        return;
    }
    let pixel = frame.get_pixel_mut(x, y);
    for channel in 0..3 {
        let d = pixel.0[channel] as f64;
        let s = color.0[channel] as f64;
        pixel.0[channel] = (s * alpha + d * (1.0 - alpha)).round() as u8;
    }
}
