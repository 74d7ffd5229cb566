use crate::element::{PropertyKey, PropertyValue};
use crate::id_generator::ObjectId;

/// Notifications emitted by an [`Editor`](crate::editor::Editor)
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// The canvas needs repainting. Coalesced by the redraw throttle.
    RedrawRequested,
    SelectionChanged {
        ids: Vec<ObjectId>,
    },
    PropertyChanged {
        id: ObjectId,
        key: PropertyKey,
        old: PropertyValue,
        new: PropertyValue,
    },
    HistoryChanged {
        can_undo: bool,
        can_redo: bool,
    },
    /// Structural change: objects or layers added, removed or reordered
    DocumentChanged,
}
