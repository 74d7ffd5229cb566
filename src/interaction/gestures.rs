//! Geometry of the resize and crop gestures. Handles are numbered like
//! [`corner_handles`]: 0 top-left, 1 top-right, 2 bottom-right, 3 bottom-left.

use egui::{Pos2, Rect, Vec2, pos2, vec2};

use crate::element::CropRect;
use crate::geometry::{corner_handles, normalized_rect};

/// Smallest crop window edge, in source pixels
pub const MIN_CROP_SIZE: f32 = 1.0;

pub fn opposite_handle(handle: usize) -> usize {
    (handle + 2) % 4
}

fn direction(value: f32, fallback: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else if fallback < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Box after dragging corner `handle` of `start` to `pointer`.
///
/// The opposite corner stays put. With `keep_aspect` the start box's aspect
/// ratio is kept: the axis the pointer moved further along decides the size
/// and the other axis follows.
pub fn resize_from_handle(start: Rect, handle: usize, pointer: Pos2, keep_aspect: bool) -> Rect {
    let corners = corner_handles(start);
    let handle = handle % 4;
    let anchor = corners[opposite_handle(handle)];
    let dragged = corners[handle];

    if !keep_aspect || start.width() <= 0.0 || start.height() <= 0.0 {
        return normalized_rect(anchor, pointer);
    }

    let aspect = start.width() / start.height();
    let moved = pointer - dragged;
    let mut width = (pointer.x - anchor.x).abs();
    let mut height = (pointer.y - anchor.y).abs();
    if moved.x.abs() >= moved.y.abs() {
        height = width / aspect;
    } else {
        width = height * aspect;
    }

    let dir_x = direction(pointer.x - anchor.x, dragged.x - anchor.x);
    let dir_y = direction(pointer.y - anchor.y, dragged.y - anchor.y);
    normalized_rect(anchor, anchor + vec2(dir_x * width, dir_y * height))
}

/// Display box and crop window after moving crop handle `handle` by `delta`
/// screen pixels.
///
/// The crop window moves by `delta` scaled with `ratio` (source pixels per
/// display pixel) and stays inside the `source` frame; the display box moves
/// the same corner by whatever part of the move survived the clamp.
pub fn crop_from_handle(
    start_rect: Rect,
    start_crop: CropRect,
    handle: usize,
    delta: Vec2,
    ratio: (f32, f32),
    source: (u32, u32),
) -> (Rect, CropRect) {
    let (rx, ry) = ratio;
    let (source_w, source_h) = (source.0 as f32, source.1 as f32);
    let moves_left = matches!(handle % 4, 0 | 3);
    let moves_top = matches!(handle % 4, 0 | 1);

    let mut left = start_crop.x;
    let mut top = start_crop.y;
    let mut right = start_crop.x + start_crop.width;
    let mut bottom = start_crop.y + start_crop.height;

    let (mut min, mut max) = (start_rect.min, start_rect.max);

    if moves_left {
        let new_left = (left + delta.x * rx).clamp(0.0, (right - MIN_CROP_SIZE).max(0.0));
        min.x += display_delta(new_left - left, rx);
        left = new_left;
    } else {
        let floor = (left + MIN_CROP_SIZE).min(source_w);
        let new_right = (right + delta.x * rx).clamp(floor, source_w);
        max.x += display_delta(new_right - right, rx);
        right = new_right;
    }

    if moves_top {
        let new_top = (top + delta.y * ry).clamp(0.0, (bottom - MIN_CROP_SIZE).max(0.0));
        min.y += display_delta(new_top - top, ry);
        top = new_top;
    } else {
        let floor = (top + MIN_CROP_SIZE).min(source_h);
        let new_bottom = (bottom + delta.y * ry).clamp(floor, source_h);
        max.y += display_delta(new_bottom - bottom, ry);
        bottom = new_bottom;
    }

    let rect = normalized_rect(pos2(min.x, min.y), pos2(max.x, max.y));
    let crop = CropRect::new(left, top, right - left, bottom - top);
    (rect, crop)
}

fn display_delta(source_delta: f32, ratio: f32) -> f32 {
    if ratio > 0.0 {
        source_delta / ratio
    } else {
        0.0
    }
}
