use crate::document::Document;
use crate::element::{Element, GraphicObject};
use crate::id_generator::ObjectId;

/// Ordered set of selected objects.
///
/// `last` is the object the property panel binds to: the most recently added
/// one, or the last remaining one after a removal. Each mutation keeps the
/// objects' `selected` flags in step with membership.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: Vec<ObjectId>,
    last: Option<ObjectId>,
}

fn set_flag(doc: &mut Document, id: ObjectId, selected: bool) {
    if let Some(object) = doc.find_object_mut(id) {
        object.set_selected(selected);
    }
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[ObjectId] {
        &self.ids
    }

    pub fn last(&self) -> Option<ObjectId> {
        self.last
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains(&id)
    }

    /// Clear, then select `id` if given.
    pub fn select_single(&mut self, doc: &mut Document, id: Option<ObjectId>) {
        self.clear_all(doc);
        if let Some(id) = id {
            if doc.find_object(id).is_some() {
                self.ids.push(id);
                self.last = Some(id);
                set_flag(doc, id, true);
            }
        }
    }

    /// Add or remove one object, leaving the rest alone.
    pub fn toggle(&mut self, doc: &mut Document, id: ObjectId) {
        if let Some(index) = self.ids.iter().position(|i| *i == id) {
            self.ids.remove(index);
            set_flag(doc, id, false);
            self.last = self.ids.last().copied();
        } else if doc.find_object(id).is_some() {
            self.ids.push(id);
            set_flag(doc, id, true);
            self.last = Some(id);
        }
    }

    pub fn clear_all(&mut self, doc: &mut Document) {
        for id in self.ids.drain(..) {
            set_flag(doc, id, false);
        }
        // stale flags, e.g. on objects resurrected by undo
        for object in doc.objects_mut() {
            object.set_selected(false);
        }
        self.last = None;
    }

    /// Replace the selection with `ids` in order.
    pub fn set_many(&mut self, doc: &mut Document, ids: impl IntoIterator<Item = ObjectId>) {
        self.clear_all(doc);
        for id in ids {
            if !self.ids.contains(&id) && doc.find_object(id).is_some() {
                self.ids.push(id);
                set_flag(doc, id, true);
            }
        }
        self.last = self.ids.last().copied();
    }

    /// Drop ids that no longer resolve (after undo/redo or deletion) and
    /// re-sync flags.
    pub fn retain_existing(&mut self, doc: &mut Document) {
        self.ids.retain(|id| doc.find_object(*id).is_some());
        for object in doc.objects_mut() {
            sync_flags(object, &self.ids);
        }
        if self.last.is_none_or(|id| !self.ids.contains(&id)) {
            self.last = self.ids.last().copied();
        }
    }
}

fn sync_flags(object: &mut GraphicObject, ids: &[ObjectId]) {
    let selected = ids.contains(&object.id());
    object.set_selected(selected);
    if let Some(group) = object.as_group_mut() {
        for child in &mut group.children {
            sync_flags(child, ids);
        }
    }
}
