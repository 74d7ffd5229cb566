use egui::{Pos2, Rect};
use serde::{Deserialize, Serialize};

use super::common::{ObjectBase, ellipse_points, rect_points};
use super::{Element, ElementKind};
use crate::geometry::point_in_ellipse;
use crate::surface::Surface;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RectangleObject {
    #[serde(flatten)]
    pub base: ObjectBase,
}

impl RectangleObject {
    pub fn new(rect: Rect) -> Self {
        Self {
            base: ObjectBase::with_rect(rect),
        }
    }
}

impl Element for RectangleObject {
    fn element_type(&self) -> ElementKind {
        ElementKind::Rectangle
    }

    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn draw_local(&self, surface: &mut dyn Surface, layer_opacity: f32) {
        let points = rect_points(self.base.rect());
        surface.fill_polygon(&points, self.base.fill_color32(layer_opacity));
        surface.stroke_polyline(&points, true, self.base.paint_stroke(layer_opacity));
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EllipseObject {
    #[serde(flatten)]
    pub base: ObjectBase,
}

impl EllipseObject {
    pub fn new(rect: Rect) -> Self {
        Self {
            base: ObjectBase::with_rect(rect),
        }
    }
}

impl Element for EllipseObject {
    fn element_type(&self) -> ElementKind {
        ElementKind::Ellipse
    }

    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn draw_local(&self, surface: &mut dyn Surface, layer_opacity: f32) {
        let rect = self.base.rect();
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return;
        }
        let points = ellipse_points(rect);
        surface.fill_polygon(&points, self.base.fill_color32(layer_opacity));
        surface.stroke_polyline(&points, true, self.base.paint_stroke(layer_opacity));
    }

    fn hit_test_local(&self, point: Pos2) -> bool {
        point_in_ellipse(point, self.base.rect())
    }
}
