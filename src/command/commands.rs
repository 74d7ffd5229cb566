use egui::{Pos2, Rect};
use image::GrayImage;
use log::warn;

use super::{CommandError, CommandResult};
use crate::document::Document;
use crate::element::{
    CropRect, DependentState, Element, GraphicObject, GroupObject, ImageObject, ImageState,
    LineEnds, LineObject, PropertyKey, PropertyValue,
};
use crate::id_generator::ObjectId;
use crate::layer::{Layer, LayerId, LayerProperty};

/// One object's position before and after a batch move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectMove {
    pub id: ObjectId,
    pub old: Pos2,
    pub new: Pos2,
}

/// An object taken out of a layer, with the index it had before removal
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedEntry {
    pub index: usize,
    pub id: ObjectId,
    pub object: Option<GraphicObject>,
}

/// One group dissolved by [`Command::Ungroup`]
#[derive(Debug, Clone, PartialEq)]
pub struct UngroupEntry {
    pub index: usize,
    pub group_id: ObjectId,
    pub child_ids: Vec<ObjectId>,
    /// The group while its children live in the layer
    pub shell: Option<GraphicObject>,
}

/// A reversible document mutation.
///
/// Every variant captures, at construction, what it needs to undo itself.
/// Objects that leave the document are owned by the command until it is
/// reverted, so undo brings back the very same object.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddObject {
        layer: LayerId,
        id: ObjectId,
        object: Option<GraphicObject>,
    },

    RemoveObject {
        layer: LayerId,
        id: ObjectId,
        index: usize,
        object: Option<GraphicObject>,
    },

    /// Entries are kept in descending index order
    RemoveObjects {
        layer: LayerId,
        entries: Vec<RemovedEntry>,
    },

    Move {
        id: ObjectId,
        old: Pos2,
        new: Pos2,
    },

    MoveLineEnd {
        id: ObjectId,
        old: LineEnds,
        new: LineEnds,
    },

    /// `children` holds a group's children as they were before the resize
    Resize {
        id: ObjectId,
        old: Rect,
        new: Rect,
        children: Option<Vec<GraphicObject>>,
    },

    MoveObjects {
        moves: Vec<ObjectMove>,
    },

    /// `restore` puts back what the setter overwrote besides `key`
    PropertyChange {
        id: ObjectId,
        key: PropertyKey,
        old: PropertyValue,
        new: PropertyValue,
        restore: Option<DependentState>,
    },

    LayerProperty {
        layer: LayerId,
        old: LayerProperty,
        new: LayerProperty,
    },

    Reorder {
        layer: LayerId,
        old_index: usize,
        new_index: usize,
    },

    /// `members` are `(index, id)` in ascending index order
    Group {
        layer: LayerId,
        group_id: ObjectId,
        members: Vec<(usize, ObjectId)>,
        insert_index: usize,
        shell: Option<GraphicObject>,
    },

    /// Entries are kept in ascending index order
    Ungroup {
        layer: LayerId,
        entries: Vec<UngroupEntry>,
    },

    CropImage {
        id: ObjectId,
        old: Box<ImageState>,
        new: Box<ImageState>,
    },

    EraseStroke {
        id: ObjectId,
        before: Option<GrayImage>,
        after: Option<GrayImage>,
    },

    Composite {
        label: String,
        commands: Vec<Command>,
    },
}

fn layer_mut(doc: &mut Document, id: LayerId) -> Result<&mut Layer, CommandError> {
    doc.layer_mut(id).ok_or(CommandError::LayerNotFound(id))
}

fn object_mut(doc: &mut Document, id: ObjectId) -> Result<&mut GraphicObject, CommandError> {
    doc.find_object_mut(id).ok_or(CommandError::ObjectNotFound(id))
}

fn ensure_all_exist(doc: &Document, moves: &[ObjectMove]) -> CommandResult {
    match moves.iter().find(|m| doc.find_object(m.id).is_none()) {
        Some(missing) => Err(CommandError::ObjectNotFound(missing.id)),
        None => Ok(()),
    }
}

fn take_object(
    slot: &mut Option<GraphicObject>,
    id: ObjectId,
) -> Result<GraphicObject, CommandError> {
    slot.take().ok_or(CommandError::MissingState(id))
}

impl Command {
    pub fn add_object(layer: LayerId, object: impl Into<GraphicObject>) -> Self {
        let object = object.into();
        Command::AddObject {
            layer,
            id: object.id(),
            object: Some(object),
        }
    }

    /// Remove a top-level object, remembering its index.
    pub fn remove_object(doc: &Document, id: ObjectId) -> Option<Self> {
        let (layer, index) = doc.locate(id)?;
        Some(Command::RemoveObject {
            layer,
            id,
            index,
            object: None,
        })
    }

    /// Remove several objects of one layer. Ids not in the layer are ignored.
    pub fn remove_objects(doc: &Document, layer: LayerId, ids: &[ObjectId]) -> Option<Self> {
        let target = doc.layer(layer)?;
        let mut entries: Vec<RemovedEntry> = ids
            .iter()
            .filter_map(|id| {
                target.index_of(*id).map(|index| RemovedEntry {
                    index,
                    id: *id,
                    object: None,
                })
            })
            .collect();
        if entries.is_empty() {
            return None;
        }
        entries.sort_by(|a, b| b.index.cmp(&a.index));
        entries.dedup_by_key(|e| e.id);
        Some(Command::RemoveObjects { layer, entries })
    }

    /// Resize whose reverse is the object's current box.
    pub fn resize(doc: &Document, id: ObjectId, new: Rect) -> Option<Self> {
        let object = doc.find_object(id)?;
        let children = object.as_group().map(|g| g.children.clone());
        Some(Command::Resize {
            id,
            old: object.bounds(),
            new,
            children,
        })
    }

    /// Group top-level objects of one layer. Needs at least two members.
    pub fn group(doc: &Document, layer: LayerId, ids: &[ObjectId]) -> Option<Self> {
        let target = doc.layer(layer)?;
        let mut members: Vec<(usize, ObjectId)> = ids
            .iter()
            .filter_map(|id| target.index_of(*id).map(|index| (index, *id)))
            .collect();
        members.sort_by_key(|(index, _)| *index);
        members.dedup();
        if members.len() < 2 {
            return None;
        }
        let shell = GraphicObject::Group(GroupObject::new(Vec::new()));
        Some(Command::Group {
            layer,
            group_id: shell.id(),
            insert_index: members[0].0,
            members,
            shell: Some(shell),
        })
    }

    /// Dissolve the groups among `ids` in one layer.
    pub fn ungroup(doc: &Document, layer: LayerId, ids: &[ObjectId]) -> Option<Self> {
        let target = doc.layer(layer)?;
        let mut entries: Vec<UngroupEntry> = target
            .objects
            .iter()
            .enumerate()
            .filter(|(_, o)| ids.contains(&o.id()))
            .filter_map(|(index, o)| {
                let group = o.as_group()?;
                Some(UngroupEntry {
                    index,
                    group_id: o.id(),
                    child_ids: group.children.iter().map(|c| c.id()).collect(),
                    shell: None,
                })
            })
            .collect();
        if entries.is_empty() {
            return None;
        }
        entries.sort_by_key(|e| e.index);
        Some(Command::Ungroup { layer, entries })
    }

    /// Physically crop an image. `before` is the image state when the crop
    /// gesture started; `crop` is in its source pixels and `rect` is the
    /// display box after the crop.
    pub fn crop_image(id: ObjectId, before: ImageState, crop: CropRect, rect: Rect) -> Self {
        let after = before.cropped(crop, rect);
        Command::CropImage {
            id,
            old: Box::new(before),
            new: Box::new(after),
        }
    }

    pub fn composite(label: impl Into<String>, commands: Vec<Command>) -> Self {
        Command::Composite {
            label: label.into(),
            commands,
        }
    }

    /// Menu label
    pub fn label(&self) -> String {
        let label = match self {
            Command::AddObject { .. } => "Add Object",
            Command::RemoveObject { .. } | Command::RemoveObjects { .. } => "Delete",
            Command::Move { .. } | Command::MoveObjects { .. } => "Move",
            Command::MoveLineEnd { .. } => "Move Line End",
            Command::Resize { .. } => "Resize",
            Command::PropertyChange { key, .. } => return format!("Change {}", key.name()),
            Command::LayerProperty { .. } => "Change Layer",
            Command::Reorder { .. } => "Reorder",
            Command::Group { .. } => "Group",
            Command::Ungroup { .. } => "Ungroup",
            Command::CropImage { .. } => "Crop Image",
            Command::EraseStroke { .. } => "Erase",
            Command::Composite { label, .. } => return label.clone(),
        };
        label.to_string()
    }

    /// Perform the mutation
    pub fn apply(&mut self, doc: &mut Document) -> CommandResult {
        match self {
            Command::AddObject { layer, id, object } => {
                let target = layer_mut(doc, *layer)?;
                target.push(take_object(object, *id)?);
            }
            Command::RemoveObject {
                layer, id, object, ..
            } => {
                let target = layer_mut(doc, *layer)?;
                let (_, mut removed) = target
                    .remove_by_id(*id)
                    .ok_or(CommandError::ObjectNotFound(*id))?;
                removed.set_selected(false);
                *object = Some(removed);
            }
            Command::RemoveObjects { layer, entries } => {
                let target = layer_mut(doc, *layer)?;
                if let Some(missing) = entries.iter().find(|e| target.index_of(e.id).is_none()) {
                    return Err(CommandError::ObjectNotFound(missing.id));
                }
                // highest index first so the lower recorded indices stay valid
                for entry in entries.iter_mut() {
                    if let Some((_, mut removed)) = target.remove_by_id(entry.id) {
                        removed.set_selected(false);
                        entry.object = Some(removed);
                    }
                }
            }
            Command::Move { id, new, .. } => object_mut(doc, *id)?.set_position(*new),
            Command::MoveLineEnd { id, new, .. } => line_mut(doc, *id)?.set_ends(*new),
            Command::Resize {
                id,
                old,
                new,
                children,
            } => {
                let object = object_mut(doc, *id)?;
                object.resize_between(*old, *new, children.as_deref());
            }
            Command::MoveObjects { moves } => {
                ensure_all_exist(doc, moves)?;
                for m in moves.iter() {
                    object_mut(doc, m.id)?.set_position(m.new);
                }
            }
            Command::PropertyChange { id, key, new, .. } => {
                doc.set_property(*id, *key, new)?;
            }
            Command::LayerProperty { layer, new, .. } => {
                new.apply_to(layer_mut(doc, *layer)?);
            }
            Command::Reorder {
                layer,
                old_index,
                new_index,
            } => {
                let target = layer_mut(doc, *layer)?;
                if !target.move_object(*old_index, *new_index) {
                    return Err(CommandError::IndexOutOfRange(*old_index));
                }
            }
            Command::Group {
                layer,
                group_id,
                members,
                insert_index,
                shell,
            } => {
                let target = layer_mut(doc, *layer)?;
                let missing = members.iter().find(|(_, id)| target.index_of(*id).is_none());
                if let Some((_, missing)) = missing {
                    return Err(CommandError::ObjectNotFound(*missing));
                }
                let mut group = take_object(shell, *group_id)?;
                let mut children = Vec::with_capacity(members.len());
                for (_, id) in members.iter().rev() {
                    if let Some((_, mut child)) = target.remove_by_id(*id) {
                        child.set_selected(false);
                        children.push(child);
                    }
                }
                children.reverse();
                if let Some(g) = group.as_group_mut() {
                    g.children = children;
                    g.recalculate_bounds();
                }
                let index = (*insert_index).min(target.len());
                target.insert_clamped(index, group);
            }
            Command::Ungroup { layer, entries } => {
                let target = layer_mut(doc, *layer)?;
                let missing = entries.iter().find(|e| target.index_of(e.group_id).is_none());
                if let Some(missing) = missing {
                    return Err(CommandError::ObjectNotFound(missing.group_id));
                }
                for entry in entries.iter_mut().rev() {
                    let Some((index, mut group)) = target.remove_by_id(entry.group_id) else {
                        continue;
                    };
                    group.set_selected(false);
                    let children = group
                        .as_group_mut()
                        .map(|g| std::mem::take(&mut g.children))
                        .unwrap_or_default();
                    entry.child_ids = children.iter().map(|c| c.id()).collect();
                    for (offset, child) in children.into_iter().enumerate() {
                        target.insert_clamped(index + offset, child);
                    }
                    entry.shell = Some(group);
                }
            }
            Command::CropImage { id, new, .. } => image_mut(doc, *id)?.restore_state(new),
            Command::EraseStroke { id, after, .. } => {
                image_mut(doc, *id)?.set_erase_mask(after.clone());
            }
            Command::Composite { commands, .. } => {
                for i in 0..commands.len() {
                    if let Err(e) = commands[i].apply(doc) {
                        // roll back the steps that already ran
                        for done in commands[..i].iter_mut().rev() {
                            if let Err(rollback) = done.revert(doc) {
                                warn!("Rollback of '{}' failed: {rollback}", done.label());
                            }
                        }
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }

    /// Restore the state from before [`Command::apply`]
    pub fn revert(&mut self, doc: &mut Document) -> CommandResult {
        match self {
            Command::AddObject { layer, id, object } => {
                let target = layer_mut(doc, *layer)?;
                let (_, mut removed) = target
                    .remove_by_id(*id)
                    .ok_or(CommandError::ObjectNotFound(*id))?;
                removed.set_selected(false);
                *object = Some(removed);
            }
            Command::RemoveObject {
                layer,
                id,
                index,
                object,
            } => {
                let restored = take_object(object, *id)?;
                layer_mut(doc, *layer)?.insert_clamped(*index, restored);
            }
            Command::RemoveObjects { layer, entries } => {
                let target = layer_mut(doc, *layer)?;
                // lowest index first so each insert lands where it was recorded
                for entry in entries.iter_mut().rev() {
                    if let Some(object) = entry.object.take() {
                        target.insert_clamped(entry.index, object);
                    }
                }
            }
            Command::Move { id, old, .. } => object_mut(doc, *id)?.set_position(*old),
            Command::MoveLineEnd { id, old, .. } => line_mut(doc, *id)?.set_ends(*old),
            Command::Resize {
                id,
                old,
                new,
                children,
            } => {
                match (object_mut(doc, *id)?, children.as_ref()) {
                    (GraphicObject::Group(group), Some(snapshot)) => {
                        group.children = snapshot.clone();
                        group.recalculate_bounds();
                    }
                    (object, _) => object.resize_between(*new, *old, None),
                }
            }
            Command::MoveObjects { moves } => {
                ensure_all_exist(doc, moves)?;
                for m in moves.iter().rev() {
                    object_mut(doc, m.id)?.set_position(m.old);
                }
            }
            Command::PropertyChange {
                id,
                key,
                old,
                restore,
                ..
            } => {
                doc.set_property(*id, *key, old)?;
                if let Some(state) = restore {
                    doc.restore_dependents(*id, state)?;
                }
            }
            Command::LayerProperty { layer, old, .. } => {
                old.apply_to(layer_mut(doc, *layer)?);
            }
            Command::Reorder {
                layer,
                old_index,
                new_index,
            } => {
                let target = layer_mut(doc, *layer)?;
                if !target.move_object(*new_index, *old_index) {
                    return Err(CommandError::IndexOutOfRange(*new_index));
                }
            }
            Command::Group {
                layer,
                group_id,
                members,
                shell,
                ..
            } => {
                let target = layer_mut(doc, *layer)?;
                let (_, mut group) = target
                    .remove_by_id(*group_id)
                    .ok_or(CommandError::ObjectNotFound(*group_id))?;
                let mut children = group
                    .as_group_mut()
                    .map(|g| std::mem::take(&mut g.children))
                    .unwrap_or_default();
                for (index, id) in members.iter() {
                    if let Some(pos) = children.iter().position(|c| c.id() == *id) {
                        target.insert_clamped(*index, children.remove(pos));
                    }
                }
                group.set_selected(false);
                *shell = Some(group);
            }
            Command::Ungroup { layer, entries } => {
                let target = layer_mut(doc, *layer)?;
                for entry in entries.iter_mut() {
                    let Some(shell) = entry.shell.as_mut() else {
                        return Err(CommandError::MissingState(entry.group_id));
                    };
                    if let Some(group) = shell.as_group_mut() {
                        group.children = entry
                            .child_ids
                            .iter()
                            .filter_map(|id| target.remove_by_id(*id).map(|(_, c)| c))
                            .collect();
                        group.recalculate_bounds();
                    }
                }
                // ascending, like RemoveObjects: each recorded index refers to
                // the layer with every lower-indexed group already back in place
                for entry in entries.iter_mut() {
                    if let Some(group) = entry.shell.take() {
                        target.insert_clamped(entry.index, group);
                    }
                }
            }
            Command::CropImage { id, old, .. } => image_mut(doc, *id)?.restore_state(old),
            Command::EraseStroke { id, before, .. } => {
                image_mut(doc, *id)?.set_erase_mask(before.clone());
            }
            Command::Composite { commands, .. } => {
                for command in commands.iter_mut().rev() {
                    command.revert(doc)?;
                }
            }
        }
        Ok(())
    }
}

fn line_mut(doc: &mut Document, id: ObjectId) -> Result<&mut LineObject, CommandError> {
    object_mut(doc, id)?
        .as_line_mut()
        .ok_or(CommandError::WrongKind(id, "a line"))
}

fn image_mut(doc: &mut Document, id: ObjectId) -> Result<&mut ImageObject, CommandError> {
    object_mut(doc, id)?
        .as_image_mut()
        .ok_or(CommandError::WrongKind(id, "an image"))
}
