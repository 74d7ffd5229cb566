use std::fmt;

use egui::Pos2;
use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::element::{Element, GraphicObject};
use crate::id_generator::ObjectId;

pub const DEFAULT_LAYER_NAME: &str = "Layer 1";

/// A unique identifier for a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(Uuid);

impl LayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered stack of graphic objects; the last object is drawn on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    #[serde(rename = "isVisible")]
    pub visible: bool,
    #[serde(rename = "isLocked")]
    pub locked: bool,
    pub opacity: f32,
    #[serde(rename = "graphicObjects")]
    pub objects: Vec<GraphicObject>,
}

impl Default for Layer {
    fn default() -> Self {
        Self::new(DEFAULT_LAYER_NAME)
    }
}

impl Layer {
    pub fn new(name: &str) -> Self {
        Self {
            id: LayerId::new(),
            name: name.to_string(),
            visible: true,
            locked: false,
            opacity: 1.0,
            objects: Vec::new(),
        }
    }

    /// Visible and unlocked layers take part in hit testing and selection
    pub fn is_interactive(&self) -> bool {
        self.visible && !self.locked
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Index of a top-level object
    pub fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id() == id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&GraphicObject> {
        self.objects.iter().find(|o| o.id() == id)
    }

    pub fn push(&mut self, object: GraphicObject) {
        self.objects.push(object);
    }

    /// Insert at `index`, appending when the index is past the end.
    /// Returns the index actually used.
    pub fn insert_clamped(&mut self, index: usize, object: GraphicObject) -> usize {
        if index > self.objects.len() {
            warn!(
                "Insert index {} out of range for layer '{}' ({} objects), appending",
                index,
                self.name,
                self.objects.len()
            );
            self.objects.push(object);
            return self.objects.len() - 1;
        }
        self.objects.insert(index, object);
        index
    }

    pub fn take(&mut self, index: usize) -> Option<GraphicObject> {
        (index < self.objects.len()).then(|| self.objects.remove(index))
    }

    pub fn remove_by_id(&mut self, id: ObjectId) -> Option<(usize, GraphicObject)> {
        let index = self.index_of(id)?;
        Some((index, self.objects.remove(index)))
    }

    /// Move one object within the stack, shifting the others but keeping
    /// their relative order. `new` is clamped to the last position.
    pub fn move_object(&mut self, old: usize, new: usize) -> bool {
        if old >= self.objects.len() {
            return false;
        }
        let new = new.min(self.objects.len() - 1);
        if old != new {
            let object = self.objects.remove(old);
            self.objects.insert(new, object);
        }
        true
    }

    /// Topmost object under `point`
    pub fn hit_test(&self, point: Pos2) -> Option<ObjectId> {
        self.objects
            .iter()
            .rev()
            .find(|o| o.hit_test(point))
            .map(|o| o.id())
    }
}

/// Undoable layer attributes
#[derive(Debug, Clone, PartialEq)]
pub enum LayerProperty {
    Name(String),
    Visible(bool),
    Locked(bool),
    Opacity(f32),
}

impl LayerProperty {
    /// Write into `layer`, returning the previous value of the same attribute.
    pub fn apply_to(&self, layer: &mut Layer) -> LayerProperty {
        match self {
            LayerProperty::Name(name) => {
                LayerProperty::Name(std::mem::replace(&mut layer.name, name.clone()))
            }
            LayerProperty::Visible(visible) => {
                LayerProperty::Visible(std::mem::replace(&mut layer.visible, *visible))
            }
            LayerProperty::Locked(locked) => {
                LayerProperty::Locked(std::mem::replace(&mut layer.locked, *locked))
            }
            LayerProperty::Opacity(opacity) => {
                let opacity = opacity.clamp(0.0, 1.0);
                LayerProperty::Opacity(std::mem::replace(&mut layer.opacity, opacity))
            }
        }
    }

    pub fn read_from(&self, layer: &Layer) -> LayerProperty {
        match self {
            LayerProperty::Name(_) => LayerProperty::Name(layer.name.clone()),
            LayerProperty::Visible(_) => LayerProperty::Visible(layer.visible),
            LayerProperty::Locked(_) => LayerProperty::Locked(layer.locked),
            LayerProperty::Opacity(_) => LayerProperty::Opacity(layer.opacity),
        }
    }
}
