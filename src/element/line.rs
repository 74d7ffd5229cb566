use egui::{Pos2, Rect, Vec2, pos2};
use serde::{Deserialize, Serialize};

use super::common::{ObjectBase, map_between_rects};
use super::{Element, ElementKind};
use crate::color::Color;
use crate::geometry::{LINE_HIT_TOLERANCE, distance_to_segment};
use crate::surface::Surface;

/// Both endpoints of a line, as captured by endpoint-drag commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineEnds {
    pub start: Pos2,
    pub end: Pos2,
}

/// Straight segment from (`x`, `y`) to (`end_x`, `end_y`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineObject {
    #[serde(flatten)]
    pub base: ObjectBase,
    #[serde(default)]
    pub end_x: f32,
    #[serde(default)]
    pub end_y: f32,
    #[serde(default, rename = "hasArrowStart")]
    pub arrow_start: bool,
    #[serde(default, rename = "hasArrowEnd")]
    pub arrow_end: bool,
}

impl Default for LineObject {
    fn default() -> Self {
        Self::new(Pos2::ZERO, Pos2::ZERO)
    }
}

impl LineObject {
    pub fn new(start: Pos2, end: Pos2) -> Self {
        let mut base = ObjectBase {
            stroke: Color::BLACK,
            stroke_width: 2.0,
            ..ObjectBase::default()
        };
        base.x = start.x;
        base.y = start.y;
        let mut line = Self {
            base,
            end_x: end.x,
            end_y: end.y,
            arrow_start: false,
            arrow_end: false,
        };
        line.sync_extent();
        line
    }

    pub fn start(&self) -> Pos2 {
        pos2(self.base.x, self.base.y)
    }

    pub fn end(&self) -> Pos2 {
        pos2(self.end_x, self.end_y)
    }

    pub fn ends(&self) -> LineEnds {
        LineEnds {
            start: self.start(),
            end: self.end(),
        }
    }

    pub fn set_ends(&mut self, ends: LineEnds) {
        self.base.x = ends.start.x;
        self.base.y = ends.start.y;
        self.end_x = ends.end.x;
        self.end_y = ends.end.y;
        self.sync_extent();
    }

    /// Move one endpoint: 0 is the start, anything else the end.
    pub fn set_endpoint(&mut self, index: usize, pos: Pos2) {
        let mut ends = self.ends();
        if index == 0 {
            ends.start = pos;
        } else {
            ends.end = pos;
        }
        self.set_ends(ends);
    }

    pub fn length(&self) -> f32 {
        (self.end() - self.start()).length()
    }

    // width/height mirror the endpoint extent so persisted files stay readable
    fn sync_extent(&mut self) {
        self.base.width = (self.end_x - self.base.x).abs();
        self.base.height = (self.end_y - self.base.y).abs();
    }

    fn arrow_head(&self, tip: Pos2, from: Pos2) -> Option<[Pos2; 3]> {
        let direction = (tip - from).normalized();
        if !direction.is_finite() || direction == Vec2::ZERO {
            return None;
        }
        let size = (self.base.stroke_width * 3.0).max(8.0);
        let back = tip - direction * size;
        let side = direction.rot90() * (size / 2.0);
        Some([tip, back + side, back - side])
    }
}

impl Element for LineObject {
    fn element_type(&self) -> ElementKind {
        ElementKind::Line
    }

    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn bounds(&self) -> Rect {
        Rect::from_two_pos(self.start(), self.end())
    }

    fn draw_local(&self, surface: &mut dyn Surface, layer_opacity: f32) {
        let stroke = self.base.paint_stroke(layer_opacity);
        surface.stroke_polyline(&[self.start(), self.end()], false, stroke);

        let head_color = stroke.color;
        if self.arrow_start {
            if let Some(head) = self.arrow_head(self.start(), self.end()) {
                surface.fill_polygon(&head, head_color);
            }
        }
        if self.arrow_end {
            if let Some(head) = self.arrow_head(self.end(), self.start()) {
                surface.fill_polygon(&head, head_color);
            }
        }
    }

    fn hit_test_local(&self, point: Pos2) -> bool {
        let start = self.start();
        if self.length() == 0.0 {
            return (point.x - start.x).abs() <= LINE_HIT_TOLERANCE
                && (point.y - start.y).abs() <= LINE_HIT_TOLERANCE;
        }
        let tolerance = LINE_HIT_TOLERANCE.max(self.base.stroke_width / 2.0 + 2.0);
        distance_to_segment(point, start, self.end()) <= tolerance
    }

    fn translate(&mut self, delta: Vec2) {
        self.base.translate(delta);
        self.end_x += delta.x;
        self.end_y += delta.y;
    }

    fn set_bounds(&mut self, rect: Rect) {
        let old = self.bounds();
        let new = Rect::from_two_pos(rect.min, rect.max);
        self.set_ends(LineEnds {
            start: map_between_rects(self.start(), old, new),
            end: map_between_rects(self.end(), old, new),
        });
    }
}
