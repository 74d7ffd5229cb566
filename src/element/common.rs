use egui::{Pos2, Rect, Stroke, Vec2, pos2, vec2};
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::id_generator::ObjectId;

/// Segments used to approximate an ellipse outline
pub const ELLIPSE_SEGMENTS: usize = 64;

/// State shared by every graphic object variant.
///
/// `x`/`y` is the top-left of the unrotated box (the start point for lines).
/// `rotation` is in degrees, clockwise, about the object's own center.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectBase {
    #[serde(skip, default = "ObjectId::next")]
    pub id: ObjectId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    #[serde(rename = "fillColor")]
    pub fill: Color,
    #[serde(rename = "strokeColor")]
    pub stroke: Color,
    pub stroke_width: f32,
    pub opacity: f32,
    #[serde(skip)]
    pub selected: bool,
}

impl Default for ObjectBase {
    fn default() -> Self {
        Self {
            id: ObjectId::next(),
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            rotation: 0.0,
            fill: Color::BLUE,
            stroke: Color::BLACK,
            stroke_width: 1.0,
            opacity: 1.0,
            selected: false,
        }
    }
}

// Selection is interaction state, not document content.
impl PartialEq for ObjectBase {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.x == other.x
            && self.y == other.y
            && self.width == other.width
            && self.height == other.height
            && self.rotation == other.rotation
            && self.fill == other.fill
            && self.stroke == other.stroke
            && self.stroke_width == other.stroke_width
            && self.opacity == other.opacity
    }
}

impl ObjectBase {
    pub fn with_rect(rect: Rect) -> Self {
        let mut base = Self::default();
        base.set_rect(rect);
        base
    }

    pub fn position(&self) -> Pos2 {
        pos2(self.x, self.y)
    }

    pub fn size(&self) -> Vec2 {
        vec2(self.width, self.height)
    }

    pub fn rect(&self) -> Rect {
        Rect::from_min_size(self.position(), self.size())
    }

    /// Assign a box, normalizing inverted corners so sizes stay non-negative.
    pub fn set_rect(&mut self, rect: Rect) {
        let rect = Rect::from_two_pos(rect.min, rect.max);
        self.x = rect.min.x;
        self.y = rect.min.y;
        self.width = rect.width().max(0.0);
        self.height = rect.height().max(0.0);
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    pub fn fill_color32(&self, layer_opacity: f32) -> egui::Color32 {
        self.fill.to_color32(self.opacity * layer_opacity)
    }

    pub fn paint_stroke(&self, layer_opacity: f32) -> Stroke {
        if self.stroke_width <= 0.0 {
            return Stroke::NONE;
        }
        Stroke::new(
            self.stroke_width,
            self.stroke.to_color32(self.opacity * layer_opacity),
        )
    }
}

pub(crate) fn rect_points(rect: Rect) -> Vec<Pos2> {
    vec![
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
    ]
}

pub(crate) fn ellipse_points(rect: Rect) -> Vec<Pos2> {
    let center = rect.center();
    let rx = rect.width() / 2.0;
    let ry = rect.height() / 2.0;
    (0..ELLIPSE_SEGMENTS)
        .map(|i| {
            let t = i as f32 / ELLIPSE_SEGMENTS as f32 * std::f32::consts::TAU;
            pos2(center.x + rx * t.cos(), center.y + ry * t.sin())
        })
        .collect()
}

/// Map `p` from `old` into `new`, keeping its relative position.
/// A degenerate axis keeps its offset from the box origin unscaled.
pub fn map_between_rects(p: Pos2, old: Rect, new: Rect) -> Pos2 {
    let sx = if old.width() > 0.0 {
        new.width() / old.width()
    } else {
        1.0
    };
    let sy = if old.height() > 0.0 {
        new.height() / old.height()
    } else {
        1.0
    };
    pos2(
        new.min.x + (p.x - old.min.x) * sx,
        new.min.y + (p.y - old.min.y) * sy,
    )
}
