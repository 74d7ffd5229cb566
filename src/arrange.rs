//! Alignment and z-order operations. Each builds a single command so the
//! whole operation undoes in one step.

use egui::{Rect, Vec2, vec2};

use crate::command::{Command, ObjectMove};
use crate::document::Document;
use crate::element::Element;
use crate::id_generator::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
    Top,
    Bottom,
    /// Centers share one x, the average of all centers
    CenterHorizontal,
    /// Centers share one y, the average of all centers
    CenterVertical,
}

/// One batch move aligning `ids`.
///
/// `None` when fewer than two of the objects exist or nothing would move.
pub fn align(doc: &Document, ids: &[ObjectId], alignment: Alignment) -> Option<Command> {
    let boxes: Vec<(ObjectId, Rect, egui::Pos2)> = ids
        .iter()
        .filter_map(|id| {
            let object = doc.find_object(*id)?;
            Some((*id, object.bounds(), object.position()))
        })
        .collect();
    if boxes.len() < 2 {
        return None;
    }

    let count = boxes.len() as f32;
    let rects: Vec<Rect> = boxes.iter().map(|(_, r, _)| *r).collect();
    let min = |edge: fn(&Rect) -> f32| rects.iter().map(edge).fold(f32::INFINITY, f32::min);
    let max = |edge: fn(&Rect) -> f32| rects.iter().map(edge).fold(f32::NEG_INFINITY, f32::max);
    let mean = |edge: fn(&Rect) -> f32| rects.iter().map(edge).sum::<f32>() / count;
    let target = match alignment {
        Alignment::Left => min(|r| r.left()),
        Alignment::Right => max(|r| r.right()),
        Alignment::Top => min(|r| r.top()),
        Alignment::Bottom => max(|r| r.bottom()),
        Alignment::CenterHorizontal => mean(|r| r.center().x),
        Alignment::CenterVertical => mean(|r| r.center().y),
    };

    let moves: Vec<ObjectMove> = boxes
        .into_iter()
        .filter_map(|(id, rect, position)| {
            let delta = alignment_delta(rect, alignment, target);
            (delta != Vec2::ZERO).then(|| ObjectMove {
                id,
                old: position,
                new: position + delta,
            })
        })
        .collect();

    (!moves.is_empty()).then_some(Command::MoveObjects { moves })
}

fn alignment_delta(rect: Rect, alignment: Alignment, target: f32) -> Vec2 {
    match alignment {
        Alignment::Left => vec2(target - rect.left(), 0.0),
        Alignment::Right => vec2(target - rect.right(), 0.0),
        Alignment::Top => vec2(0.0, target - rect.top()),
        Alignment::Bottom => vec2(0.0, target - rect.bottom()),
        Alignment::CenterHorizontal => vec2(target - rect.center().x, 0.0),
        Alignment::CenterVertical => vec2(0.0, target - rect.center().y),
    }
}

fn reorder(
    doc: &Document,
    id: ObjectId,
    new_index: impl FnOnce(usize, usize) -> usize,
) -> Option<Command> {
    let (layer, old_index) = doc.locate(id)?;
    let len = doc.layer(layer)?.len();
    let new_index = new_index(old_index, len);
    (new_index != old_index).then_some(Command::Reorder {
        layer,
        old_index,
        new_index,
    })
}

/// One step towards the front
pub fn bring_forward(doc: &Document, id: ObjectId) -> Option<Command> {
    reorder(doc, id, |index, len| (index + 1).min(len - 1))
}

pub fn send_backward(doc: &Document, id: ObjectId) -> Option<Command> {
    reorder(doc, id, |index, _| index.saturating_sub(1))
}

pub fn bring_to_front(doc: &Document, id: ObjectId) -> Option<Command> {
    reorder(doc, id, |_, len| len - 1)
}

pub fn send_to_back(doc: &Document, id: ObjectId) -> Option<Command> {
    reorder(doc, id, |_, _| 0)
}
