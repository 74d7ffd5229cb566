use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

mod common;
mod group;
mod image;
mod line;
mod property;
mod shape;
mod text;

pub use common::{ObjectBase, map_between_rects};
pub use group::GroupObject;
pub use image::{ColorFilter, CropRect, ImageObject, ImageState, RenderKey};
pub use line::{LineEnds, LineObject};
pub use property::{DependentState, PropertyError, PropertyKey, PropertyValue};
pub use shape::{EllipseObject, RectangleObject};
pub use text::{DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, DEFAULT_TEXT, TextObject};

use crate::geometry::{Transform2, corner_handles, unrotate_point};
use crate::id_generator::ObjectId;
use crate::surface::Surface;

/// Discriminator of the object variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Rectangle,
    Ellipse,
    Line,
    Text,
    Group,
    Image,
}

/// Common trait that all graphic objects implement
pub trait Element {
    fn element_type(&self) -> ElementKind;

    fn base(&self) -> &ObjectBase;

    fn base_mut(&mut self) -> &mut ObjectBase;

    fn id(&self) -> ObjectId {
        self.base().id
    }

    /// Axis-aligned box in the object's unrotated frame
    fn bounds(&self) -> Rect {
        self.base().rect()
    }

    fn center(&self) -> Pos2 {
        self.bounds().center()
    }

    /// Paint in the local (unrotated) frame
    fn draw_local(&self, surface: &mut dyn Surface, layer_opacity: f32);

    fn draw(&self, surface: &mut dyn Surface, layer_opacity: f32) {
        let rotation = self.base().rotation;
        if rotation == 0.0 {
            self.draw_local(surface, layer_opacity);
            return;
        }
        surface.push_transform(Transform2::rotation_about(self.center(), rotation));
        self.draw_local(surface, layer_opacity);
        surface.pop_transform();
    }

    /// Hit test against a point already in the local frame
    fn hit_test_local(&self, point: Pos2) -> bool {
        self.bounds().contains(point)
    }

    /// Test a document-space point, undoing this object's rotation first
    fn hit_test(&self, point: Pos2) -> bool {
        let local = unrotate_point(point, self.center(), self.base().rotation);
        self.hit_test_local(local)
    }

    fn translate(&mut self, delta: Vec2) {
        self.base_mut().translate(delta);
    }

    /// Assign a new box; inverted corners are normalized
    fn set_bounds(&mut self, rect: Rect) {
        self.base_mut().set_rect(rect);
    }
}

/// A node of the scene graph.
///
/// `Clone` keeps ids and is what commands use for snapshots;
/// [`GraphicObject::duplicate`] is the copy/paste flavour with fresh ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GraphicObject {
    Rectangle(RectangleObject),
    Ellipse(EllipseObject),
    Line(LineObject),
    Text(TextObject),
    Group(GroupObject),
    Image(ImageObject),
}

impl GraphicObject {
    pub fn as_element(&self) -> &dyn Element {
        match self {
            GraphicObject::Rectangle(o) => o,
            GraphicObject::Ellipse(o) => o,
            GraphicObject::Line(o) => o,
            GraphicObject::Text(o) => o,
            GraphicObject::Group(o) => o,
            GraphicObject::Image(o) => o,
        }
    }

    pub fn as_element_mut(&mut self) -> &mut dyn Element {
        match self {
            GraphicObject::Rectangle(o) => o,
            GraphicObject::Ellipse(o) => o,
            GraphicObject::Line(o) => o,
            GraphicObject::Text(o) => o,
            GraphicObject::Group(o) => o,
            GraphicObject::Image(o) => o,
        }
    }

    /// Anchor point: the start of a line, the top-left of everything else
    pub fn position(&self) -> Pos2 {
        match self {
            GraphicObject::Line(line) => line.start(),
            other => other.bounds().min,
        }
    }

    pub fn set_position(&mut self, position: Pos2) {
        let delta = position - self.position();
        if delta != Vec2::ZERO {
            self.translate(delta);
        }
    }

    pub fn is_selected(&self) -> bool {
        self.base().selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.base_mut().selected = selected;
    }

    /// Deep copy with fresh ids throughout and no selection.
    pub fn duplicate(&self) -> GraphicObject {
        let mut copy = self.clone();
        copy.assign_fresh_ids();
        copy.set_selected(false);
        copy
    }

    fn assign_fresh_ids(&mut self) {
        self.base_mut().id = ObjectId::next();
        if let GraphicObject::Group(group) = self {
            for child in &mut group.children {
                child.assign_fresh_ids();
            }
        }
    }

    /// Apply a point mapping to the object's geometry: endpoints for lines,
    /// every descendant for groups, the box corners for everything else.
    pub fn map_geometry(&mut self, map: &dyn Fn(Pos2) -> Pos2) {
        match self {
            GraphicObject::Line(line) => {
                let ends = line.ends();
                line.set_ends(LineEnds {
                    start: map(ends.start),
                    end: map(ends.end),
                });
            }
            GraphicObject::Group(group) => {
                for child in &mut group.children {
                    child.map_geometry(map);
                }
                group.recalculate_bounds();
            }
            other => {
                let rect = other.bounds();
                other.set_bounds(Rect::from_two_pos(map(rect.min), map(rect.max)));
            }
        }
    }

    /// Resize from `old` to `new`. Groups first restore their children from
    /// `snapshot` (the pre-resize children) so repeated resizes do not drift.
    pub fn resize_between(&mut self, old: Rect, new: Rect, snapshot: Option<&[GraphicObject]>) {
        match self {
            GraphicObject::Group(group) => {
                if let Some(children) = snapshot {
                    group.children = children.to_vec();
                }
                group.scale_children(old, new);
            }
            GraphicObject::Line(_) => {
                self.map_geometry(&|p| map_between_rects(p, old, new));
            }
            other => other.set_bounds(new),
        }
    }

    /// Handle positions in the unrotated frame: endpoints for a line,
    /// corners (TL, TR, BR, BL) for everything else.
    pub fn handles(&self) -> Vec<Pos2> {
        match self {
            GraphicObject::Line(line) => vec![line.start(), line.end()],
            other => corner_handles(other.bounds()).to_vec(),
        }
    }

    /// This object or a descendant with the given id.
    pub fn find(&self, id: ObjectId) -> Option<&GraphicObject> {
        if self.id() == id {
            return Some(self);
        }
        match self {
            GraphicObject::Group(group) => group.children.iter().find_map(|c| c.find(id)),
            _ => None,
        }
    }

    pub fn find_mut(&mut self, id: ObjectId) -> Option<&mut GraphicObject> {
        if self.id() == id {
            return Some(self);
        }
        match self {
            GraphicObject::Group(group) => group.children.iter_mut().find_map(|c| c.find_mut(id)),
            _ => None,
        }
    }

    /// Whether this object is, or (for groups) contains, the given kind.
    pub fn contains_kind(&self, kind: ElementKind) -> bool {
        match self {
            GraphicObject::Group(group) => group.contains_kind(kind),
            other => other.element_type() == kind,
        }
    }

    pub fn as_group(&self) -> Option<&GroupObject> {
        match self {
            GraphicObject::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut GroupObject> {
        match self {
            GraphicObject::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_line(&self) -> Option<&LineObject> {
        match self {
            GraphicObject::Line(line) => Some(line),
            _ => None,
        }
    }

    pub fn as_line_mut(&mut self) -> Option<&mut LineObject> {
        match self {
            GraphicObject::Line(line) => Some(line),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageObject> {
        match self {
            GraphicObject::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_image_mut(&mut self) -> Option<&mut ImageObject> {
        match self {
            GraphicObject::Image(image) => Some(image),
            _ => None,
        }
    }
}

impl Element for GraphicObject {
    fn element_type(&self) -> ElementKind {
        self.as_element().element_type()
    }

    fn base(&self) -> &ObjectBase {
        self.as_element().base()
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        self.as_element_mut().base_mut()
    }

    fn bounds(&self) -> Rect {
        self.as_element().bounds()
    }

    fn draw_local(&self, surface: &mut dyn Surface, layer_opacity: f32) {
        self.as_element().draw_local(surface, layer_opacity);
    }

    fn draw(&self, surface: &mut dyn Surface, layer_opacity: f32) {
        self.as_element().draw(surface, layer_opacity);
    }

    fn hit_test_local(&self, point: Pos2) -> bool {
        self.as_element().hit_test_local(point)
    }

    fn hit_test(&self, point: Pos2) -> bool {
        self.as_element().hit_test(point)
    }

    fn translate(&mut self, delta: Vec2) {
        self.as_element_mut().translate(delta);
    }

    fn set_bounds(&mut self, rect: Rect) {
        self.as_element_mut().set_bounds(rect);
    }
}

impl From<RectangleObject> for GraphicObject {
    fn from(object: RectangleObject) -> Self {
        GraphicObject::Rectangle(object)
    }
}

impl From<EllipseObject> for GraphicObject {
    fn from(object: EllipseObject) -> Self {
        GraphicObject::Ellipse(object)
    }
}

impl From<LineObject> for GraphicObject {
    fn from(object: LineObject) -> Self {
        GraphicObject::Line(object)
    }
}

impl From<TextObject> for GraphicObject {
    fn from(object: TextObject) -> Self {
        GraphicObject::Text(object)
    }
}

impl From<GroupObject> for GraphicObject {
    fn from(object: GroupObject) -> Self {
        GraphicObject::Group(object)
    }
}

impl From<ImageObject> for GraphicObject {
    fn from(object: ImageObject) -> Self {
        GraphicObject::Image(object)
    }
}
