use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

// Single static counter for all graphic objects
static NEXT_OBJECT_ID: AtomicUsize = AtomicUsize::new(1);

/// Process-wide identity of a graphic object.
///
/// Commands refer to objects through this id, so it survives an object being
/// moved in and out of its owning collection by undo/redo. It is not persisted;
/// a loaded project gets fresh ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Allocate the next unused id
    pub fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::next()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
