use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

use super::common::{ObjectBase, map_between_rects};
use super::{Element, ElementKind, GraphicObject};
use crate::color::Color;
use crate::surface::Surface;

/// Ordered collection of exclusively owned children.
///
/// The group's own box is derived from its children; [`GroupObject::recalculate_bounds`]
/// writes the union back into `base` after anything moves a child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupObject {
    #[serde(flatten)]
    pub base: ObjectBase,
    #[serde(default)]
    pub children: Vec<GraphicObject>,
    #[serde(default, rename = "isGrayscale")]
    pub grayscale: bool,
}

impl Default for GroupObject {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl GroupObject {
    pub fn new(children: Vec<GraphicObject>) -> Self {
        let mut group = Self {
            base: ObjectBase {
                fill: Color::TRANSPARENT,
                stroke: Color::TRANSPARENT,
                stroke_width: 0.0,
                ..ObjectBase::default()
            },
            children,
            grayscale: false,
        };
        group.recalculate_bounds();
        group
    }

    /// Union of the children's boxes, `None` for an empty group.
    pub fn children_bounds(&self) -> Option<Rect> {
        self.children
            .iter()
            .map(GraphicObject::bounds)
            .reduce(|acc, rect| acc.union(rect))
    }

    pub fn recalculate_bounds(&mut self) {
        if let Some(rect) = self.children_bounds() {
            self.base.set_rect(rect);
        }
    }

    /// Writes the flag to every descendant image and nested group.
    pub fn set_grayscale(&mut self, grayscale: bool) {
        self.grayscale = grayscale;
        for child in &mut self.children {
            match child {
                GraphicObject::Image(image) => image.set_grayscale(grayscale),
                GraphicObject::Group(group) => group.set_grayscale(grayscale),
                _ => {}
            }
        }
    }

    /// Map every descendant from `old` into `new` proportionally.
    pub fn scale_children(&mut self, old: Rect, new: Rect) {
        let map = |p: Pos2| map_between_rects(p, old, new);
        for child in &mut self.children {
            child.map_geometry(&map);
        }
        self.recalculate_bounds();
    }

    pub fn contains_kind(&self, kind: ElementKind) -> bool {
        self.children.iter().any(|child| {
            child.element_type() == kind
                || matches!(child, GraphicObject::Group(group) if group.contains_kind(kind))
        })
    }
}

impl Element for GroupObject {
    fn element_type(&self) -> ElementKind {
        ElementKind::Group
    }

    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn bounds(&self) -> Rect {
        self.children_bounds().unwrap_or_else(|| self.base.rect())
    }

    fn draw_local(&self, surface: &mut dyn Surface, layer_opacity: f32) {
        let opacity = layer_opacity * self.base.opacity.clamp(0.0, 1.0);
        for child in &self.children {
            child.draw(surface, opacity);
        }
    }

    fn hit_test_local(&self, point: Pos2) -> bool {
        self.children.iter().any(|child| child.hit_test(point))
    }

    fn translate(&mut self, delta: Vec2) {
        for child in &mut self.children {
            child.translate(delta);
        }
        self.base.translate(delta);
    }

    fn set_bounds(&mut self, rect: Rect) {
        if self.children.is_empty() {
            self.base.set_rect(rect);
            return;
        }
        let old = self.bounds();
        self.scale_children(old, Rect::from_two_pos(rect.min, rect.max));
    }
}
