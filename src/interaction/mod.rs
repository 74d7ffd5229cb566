pub mod gestures;

use egui::{Pos2, Rect, Stroke};
use image::GrayImage;
use log::debug;

use crate::color::Color;
use crate::command::{Command, ObjectMove};
use crate::editor::Editor;
use crate::element::{
    CropRect, DEFAULT_TEXT, Element, EllipseObject, GraphicObject, ImageState, LineEnds,
    LineObject, RectangleObject, TextObject,
};
use crate::geometry::{handle_hit_index, normalized_rect, unrotate_point};
use crate::id_generator::ObjectId;
use crate::surface::Surface;

use gestures::{crop_from_handle, resize_from_handle};

/// Alpha of shapes while they are being drawn
const PROVISIONAL_ALPHA: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Select,
    Rectangle,
    Ellipse,
    Line,
    Text,
    Crop,
    Erase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

/// A pointer event in document coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pos: Pos2,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(pos: Pos2) -> Self {
        Self {
            pos,
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_shift(pos: Pos2) -> Self {
        Self {
            pos,
            modifiers: Modifiers {
                shift: true,
                ctrl: false,
            },
        }
    }
}

/// What the current gesture is doing
#[derive(Debug, Clone, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Drawing {
        start: Pos2,
        object: GraphicObject,
    },
    /// Moving the selection; `origins` are the anchor positions at press time
    Dragging {
        start: Pos2,
        origins: Vec<(ObjectId, Pos2)>,
    },
    Resizing {
        id: ObjectId,
        handle: usize,
        start_rect: Rect,
        /// Set when a line endpoint is dragged
        line_start: Option<LineEnds>,
        /// A group's children as they were at press time
        children: Option<Vec<GraphicObject>>,
    },
    RangeSelecting {
        start: Pos2,
        rect: Rect,
    },
    Cropping {
        id: ObjectId,
        handle: usize,
        start: Pos2,
        before: Box<ImageState>,
        start_crop: CropRect,
    },
    Erasing {
        id: ObjectId,
        mask_before: Option<GrayImage>,
        changed: bool,
    },
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }
}

/// Provisional visuals of the running gesture
#[derive(Debug, Clone, Copy, Default)]
pub struct Preview<'a> {
    pub object: Option<&'a GraphicObject>,
    pub marquee: Option<Rect>,
}

/// Turns pointer input into live feedback and, when a gesture ends, into at
/// most one command.
#[derive(Debug, Default)]
pub struct InteractionController {
    state: InteractionState,
}

fn local_point(object: &GraphicObject, point: Pos2) -> Pos2 {
    match object {
        GraphicObject::Line(_) => point,
        other => unrotate_point(point, other.center(), other.base().rotation),
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn pointer_down(&mut self, editor: &mut Editor, event: PointerEvent) {
        if !self.state.is_idle() {
            self.cancel(editor);
        }
        match editor.tool() {
            Tool::Select => self.select_down(editor, event),
            Tool::Rectangle | Tool::Ellipse | Tool::Line => self.draw_down(editor, event),
            Tool::Text => self.text_down(editor, event),
            Tool::Crop => self.crop_down(editor, event),
            Tool::Erase => self.erase_down(editor, event),
        }
    }

    /// Handle of the last selected object under `point`
    fn handle_under(&self, editor: &Editor, point: Pos2) -> Option<(ObjectId, usize)> {
        let id = editor.selection().last()?;
        let object = editor.document().find_object(id)?;
        let local = local_point(object, point);
        let handle = handle_hit_index(&object.handles(), local, editor.config().handle_radius)?;
        Some((id, handle))
    }

    fn select_down(&mut self, editor: &mut Editor, event: PointerEvent) {
        if let Some((id, handle)) = self.handle_under(editor, event.pos) {
            if let Some(object) = editor.document().find_object(id) {
                debug!("Resizing {} from handle {}", id, handle);
                self.state = InteractionState::Resizing {
                    id,
                    handle,
                    start_rect: object.bounds(),
                    line_start: object.as_line().map(LineObject::ends),
                    children: object.as_group().map(|g| g.children.clone()),
                };
                return;
            }
        }

        let shift = event.modifiers.shift;
        match editor.document().hit_test(event.pos) {
            Some(id) if shift => editor.toggle_selection(id),
            Some(id) => {
                // pressing on a selected object keeps a multi-selection so it moves together
                if !editor.selection().contains(id) {
                    editor.select_single(Some(id));
                }
                let document = editor.document();
                let origins = editor
                    .selection()
                    .ids()
                    .iter()
                    .filter_map(|id| document.find_object(*id).map(|o| (*id, o.position())))
                    .collect();
                self.state = InteractionState::Dragging {
                    start: event.pos,
                    origins,
                };
            }
            None if shift => {}
            None => {
                editor.clear_selection();
                self.state = InteractionState::RangeSelecting {
                    start: event.pos,
                    rect: Rect::from_min_max(event.pos, event.pos),
                };
            }
        }
    }

    fn draw_down(&mut self, editor: &mut Editor, event: PointerEvent) {
        if !editor.document().active_layer().is_interactive() {
            debug!("Active layer is hidden or locked, not drawing");
            return;
        }
        let at = Rect::from_min_max(event.pos, event.pos);
        let object: GraphicObject = match editor.tool() {
            Tool::Rectangle => {
                let mut shape = RectangleObject::new(at);
                shape.base.fill = Color::SKY_BLUE.with_alpha(PROVISIONAL_ALPHA);
                shape.into()
            }
            Tool::Ellipse => {
                let mut shape = EllipseObject::new(at);
                shape.base.fill = Color::SALMON.with_alpha(PROVISIONAL_ALPHA);
                shape.into()
            }
            _ => {
                let mut line = LineObject::new(event.pos, event.pos);
                line.base.stroke = Color::BLACK.with_alpha(PROVISIONAL_ALPHA);
                line.into()
            }
        };
        self.state = InteractionState::Drawing {
            start: event.pos,
            object,
        };
    }

    fn text_down(&mut self, editor: &mut Editor, event: PointerEvent) {
        if !editor.document().active_layer().is_interactive() {
            return;
        }
        if editor.add_object(TextObject::new(event.pos, DEFAULT_TEXT)).is_ok() {
            editor.set_tool(Tool::Select);
        }
    }

    fn crop_down(&mut self, editor: &mut Editor, event: PointerEvent) {
        if let Some((id, handle)) = self.handle_under(editor, event.pos) {
            if let Some(image) = editor
                .document()
                .find_object(id)
                .and_then(GraphicObject::as_image)
            {
                debug!("Cropping {} from handle {}", id, handle);
                self.state = InteractionState::Cropping {
                    id,
                    handle,
                    start: event.pos,
                    start_crop: image.crop(),
                    before: Box::new(image.capture_state()),
                };
                return;
            }
        }
        // pick the image to crop
        let document = editor.document();
        let hit = document
            .hit_test(event.pos)
            .filter(|id| document.find_object(*id).and_then(GraphicObject::as_image).is_some());
        editor.select_single(hit);
    }

    fn erase_down(&mut self, editor: &mut Editor, event: PointerEvent) {
        let Some(id) = editor.document().hit_test(event.pos) else {
            return;
        };
        let radius = editor.config().erase_radius;
        let Some(image) = editor
            .document_mut()
            .find_object_mut(id)
            .and_then(GraphicObject::as_image_mut)
        else {
            return;
        };
        let mask_before = image.erase_mask().cloned();
        let changed = image.erase_at(event.pos, radius);
        self.state = InteractionState::Erasing {
            id,
            mask_before,
            changed,
        };
        editor.request_redraw();
    }

    pub fn pointer_move(&mut self, editor: &mut Editor, event: PointerEvent) {
        let pos = event.pos;
        match &mut self.state {
            InteractionState::Idle => return,
            InteractionState::Drawing { start, object } => match object {
                GraphicObject::Line(line) => line.set_ends(LineEnds {
                    start: *start,
                    end: pos,
                }),
                other => other.set_bounds(normalized_rect(*start, pos)),
            },
            InteractionState::Dragging { start, origins } => {
                let delta = pos - *start;
                let document = editor.document_mut();
                for (id, origin) in origins.iter() {
                    if let Some(object) = document.find_object_mut(*id) {
                        object.set_position(*origin + delta);
                    }
                }
            }
            InteractionState::Resizing {
                id,
                handle,
                start_rect,
                line_start,
                children,
            } => {
                let Some(object) = editor.document_mut().find_object_mut(*id) else {
                    return;
                };
                match (object, line_start.as_ref()) {
                    (GraphicObject::Line(line), Some(ends)) => {
                        let mut moved = *ends;
                        if *handle == 0 {
                            moved.start = pos;
                        } else {
                            moved.end = pos;
                        }
                        line.set_ends(moved);
                    }
                    (object, _) => {
                        let rotation = object.base().rotation;
                        let local = unrotate_point(pos, start_rect.center(), rotation);
                        let target =
                            resize_from_handle(*start_rect, *handle, local, event.modifiers.shift);
                        object.resize_between(*start_rect, target, children.as_deref());
                    }
                }
            }
            InteractionState::RangeSelecting { start, rect } => {
                *rect = normalized_rect(*start, pos);
            }
            InteractionState::Cropping {
                id,
                handle,
                start,
                before,
                start_crop,
            } => {
                let Some(image) = editor
                    .document_mut()
                    .find_object_mut(*id)
                    .and_then(GraphicObject::as_image_mut)
                else {
                    return;
                };
                let rotation = image.base().rotation;
                let center = before.rect.center();
                let local = |p: Pos2| unrotate_point(p, center, rotation);
                let delta = local(pos) - local(*start);
                let ratio = ratio_of(before.rect, *start_crop);
                let source = before.pixels.dimensions();
                let (rect, crop) =
                    crop_from_handle(before.rect, *start_crop, *handle, delta, ratio, source);
                image.set_crop(crop);
                image.set_bounds(rect);
            }
            InteractionState::Erasing { id, changed, .. } => {
                let radius = editor.config().erase_radius;
                if let Some(image) = editor
                    .document_mut()
                    .find_object_mut(*id)
                    .and_then(GraphicObject::as_image_mut)
                {
                    *changed |= image.erase_at(pos, radius);
                }
            }
        }
        editor.request_redraw();
    }

    pub fn pointer_up(&mut self, editor: &mut Editor, event: PointerEvent) {
        self.pointer_move(editor, event);
        match std::mem::take(&mut self.state) {
            InteractionState::Idle => {}
            InteractionState::Drawing { object, .. } => commit_drawing(editor, object),
            InteractionState::Dragging { origins, .. } => {
                let document = editor.document();
                let moves: Vec<ObjectMove> = origins
                    .into_iter()
                    .filter_map(|(id, old)| {
                        let new = document.find_object(id)?.position();
                        (new != old).then_some(ObjectMove { id, old, new })
                    })
                    .collect();
                if let [single] = moves[..] {
                    editor.record(Command::Move {
                        id: single.id,
                        old: single.old,
                        new: single.new,
                    });
                } else if !moves.is_empty() {
                    editor.record(Command::MoveObjects { moves });
                }
            }
            InteractionState::Resizing {
                id,
                start_rect,
                line_start,
                children,
                ..
            } => {
                let Some(object) = editor.document().find_object(id) else {
                    return;
                };
                match (object.as_line(), line_start) {
                    (Some(line), Some(old)) => {
                        let new = line.ends();
                        if new != old {
                            editor.record(Command::MoveLineEnd { id, old, new });
                        }
                    }
                    _ => {
                        let new = object.bounds();
                        if new != start_rect {
                            editor.record(Command::Resize {
                                id,
                                old: start_rect,
                                new,
                                children,
                            });
                        }
                    }
                }
            }
            InteractionState::RangeSelecting { rect, .. } => {
                let ids = editor.document().objects_in_rect(rect);
                editor.select_many(ids);
            }
            InteractionState::Cropping { id, before, .. } => {
                let Some(image) = editor
                    .document_mut()
                    .find_object_mut(id)
                    .and_then(GraphicObject::as_image_mut)
                else {
                    return;
                };
                let crop = image.crop();
                let rect = image.bounds();
                if crop == before.crop && rect == before.rect {
                    return;
                }
                // back to the press-time state; the command performs the crop
                image.restore_state(&before);
                if let Err(err) = editor.execute(Command::crop_image(id, *before, crop, rect)) {
                    debug!("Crop of {} not applied: {}", id, err);
                }
            }
            InteractionState::Erasing {
                id,
                mask_before,
                changed,
            } => {
                if !changed {
                    return;
                }
                let after = editor
                    .document()
                    .find_object(id)
                    .and_then(GraphicObject::as_image)
                    .and_then(|image| image.erase_mask().cloned());
                editor.record(Command::EraseStroke {
                    id,
                    before: mask_before,
                    after,
                });
            }
        }
    }

    /// Abandon the running gesture and restore what it changed.
    pub fn cancel(&mut self, editor: &mut Editor) {
        let document = editor.document_mut();
        match std::mem::take(&mut self.state) {
            InteractionState::Idle
            | InteractionState::Drawing { .. }
            | InteractionState::RangeSelecting { .. } => {}
            InteractionState::Dragging { origins, .. } => {
                for (id, origin) in origins {
                    if let Some(object) = document.find_object_mut(id) {
                        object.set_position(origin);
                    }
                }
            }
            InteractionState::Resizing {
                id,
                start_rect,
                line_start,
                children,
                ..
            } => {
                let Some(object) = document.find_object_mut(id) else {
                    return;
                };
                match (object, line_start, children) {
                    (GraphicObject::Line(line), Some(ends), _) => line.set_ends(ends),
                    (GraphicObject::Group(group), _, Some(children)) => {
                        group.children = children;
                        group.recalculate_bounds();
                    }
                    (other, _, _) => other.set_bounds(start_rect),
                }
            }
            InteractionState::Cropping { id, before, .. } => {
                let image = document
                    .find_object_mut(id)
                    .and_then(GraphicObject::as_image_mut);
                if let Some(image) = image {
                    image.restore_state(&before);
                }
            }
            InteractionState::Erasing {
                id, mask_before, ..
            } => {
                let image = document
                    .find_object_mut(id)
                    .and_then(GraphicObject::as_image_mut);
                if let Some(image) = image {
                    image.set_erase_mask(mask_before);
                }
            }
        }
        editor.request_redraw();
    }

    pub fn preview(&self) -> Preview<'_> {
        match &self.state {
            InteractionState::Drawing { object, .. } => Preview {
                object: Some(object),
                marquee: None,
            },
            InteractionState::RangeSelecting { rect, .. } => Preview {
                object: None,
                marquee: Some(*rect),
            },
            _ => Preview::default(),
        }
    }

    /// Draw the provisional shape and the marquee on top of the document.
    pub fn render_overlay(&self, surface: &mut dyn Surface) {
        let preview = self.preview();
        if let Some(object) = preview.object {
            object.draw(surface, 1.0);
        }
        if let Some(rect) = preview.marquee {
            let corners = crate::geometry::corner_handles(rect);
            let accent = Color::SELECTION.to_color32(1.0);
            surface.fill_polygon(&corners, Color::SELECTION.with_alpha(40).to_color32(1.0));
            surface.stroke_polyline(&corners, true, Stroke::new(1.0, accent));
        }
    }
}

fn ratio_of(display: Rect, crop: CropRect) -> (f32, f32) {
    let scale = |crop: f32, display: f32| if display > 0.0 { crop / display } else { 1.0 };
    (
        scale(crop.width, display.width()),
        scale(crop.height, display.height()),
    )
}

/// Commit a drawn shape in its final colors. Degenerate shapes are dropped.
fn commit_drawing(editor: &mut Editor, mut object: GraphicObject) {
    let degenerate = match &object {
        GraphicObject::Line(line) => line.length() == 0.0,
        other => {
            let size = other.bounds().size();
            size.x == 0.0 || size.y == 0.0
        }
    };
    if degenerate {
        debug!("Dropping zero-size shape");
        return;
    }
    let base = object.base_mut();
    base.fill = base.fill.with_alpha(255);
    base.stroke = base.stroke.with_alpha(255);
    if let Err(err) = editor.add_object(object) {
        debug!("Drawn shape not added: {}", err);
    }
}
