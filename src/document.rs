use egui::{Pos2, Rect, Vec2, vec2};
use uuid::Uuid;

use crate::element::{
    DependentState, Element, GraphicObject, PropertyError, PropertyKey, PropertyValue,
};
use crate::id_generator::ObjectId;
use crate::layer::{Layer, LayerId};
use crate::surface::{RenderOptions, Surface, draw_selection_handles};

pub const DPI: f32 = 96.0;
pub const MM_PER_INCH: f32 = 25.4;
pub const MIN_SIZE_MM: f32 = 1.0;
pub const MAX_SIZE_MM: f32 = 4000.0;
pub const DEFAULT_TITLE: &str = "Untitled";
/// A4 portrait
pub const DEFAULT_WIDTH_MM: f32 = 210.0;
pub const DEFAULT_HEIGHT_MM: f32 = 297.0;

/// A property change observed on an object.
///
/// `from_history` marks changes made while a command was being applied or
/// reverted; those must never be recorded as new undo steps.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectChange {
    pub id: ObjectId,
    pub key: PropertyKey,
    pub old: PropertyValue,
    pub new: PropertyValue,
    /// What the setter overwrote besides `key`, for undo
    pub restore: Option<DependentState>,
    pub from_history: bool,
}

/// One canvas: physical page size plus an ordered stack of layers.
/// `layers[0]` is the bottom layer.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    width_mm: f32,
    height_mm: f32,
    pub layers: Vec<Layer>,
    active_layer: LayerId,
    /// Pixels per inch of document space
    dpi: f32,
    changes: Vec<ObjectChange>,
    history_depth: u32,
}

// Identity, resolution, the change outbox and the replay guard are session state.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.width_mm == other.width_mm
            && self.height_mm == other.height_mm
            && self.active_layer == other.active_layer
            && self.layers == other.layers
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE)
    }
}

fn clamp_mm(value: f32) -> f32 {
    if value.is_nan() {
        return MIN_SIZE_MM;
    }
    value.clamp(MIN_SIZE_MM, MAX_SIZE_MM)
}

impl Document {
    pub fn new(title: &str) -> Self {
        Self::from_parts(title, DEFAULT_WIDTH_MM, DEFAULT_HEIGHT_MM, Vec::new())
    }

    /// Build from loaded parts. An empty layer list gets one default layer.
    pub fn from_parts(title: &str, width_mm: f32, height_mm: f32, mut layers: Vec<Layer>) -> Self {
        if layers.is_empty() {
            layers.push(Layer::default());
        }
        let active_layer = layers[0].id;
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            width_mm: clamp_mm(width_mm),
            height_mm: clamp_mm(height_mm),
            layers,
            active_layer,
            dpi: DPI,
            changes: Vec::new(),
            history_depth: 0,
        }
    }

    pub fn width_mm(&self) -> f32 {
        self.width_mm
    }

    pub fn height_mm(&self) -> f32 {
        self.height_mm
    }

    /// Clamped to [1, 4000] mm. Returns whether the stored value changed.
    pub fn set_width_mm(&mut self, value: f32) -> bool {
        let value = clamp_mm(value);
        let changed = self.width_mm != value;
        self.width_mm = value;
        changed
    }

    pub fn set_height_mm(&mut self, value: f32) -> bool {
        let value = clamp_mm(value);
        let changed = self.height_mm != value;
        self.height_mm = value;
        changed
    }

    pub fn dpi(&self) -> f32 {
        self.dpi
    }

    /// Non-positive values fall back to [`DPI`].
    pub fn set_dpi(&mut self, dpi: f32) {
        self.dpi = if dpi > 0.0 { dpi } else { DPI };
    }

    pub fn width_px(&self) -> f32 {
        self.width_mm / MM_PER_INCH * self.dpi
    }

    pub fn height_px(&self) -> f32 {
        self.height_mm / MM_PER_INCH * self.dpi
    }

    pub fn size_px(&self) -> Vec2 {
        vec2(self.width_px(), self.height_px())
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn active_layer_id(&self) -> LayerId {
        self.active_layer
    }

    pub fn set_active_layer(&mut self, id: LayerId) -> bool {
        if self.layer(id).is_none() {
            return false;
        }
        self.active_layer = id;
        true
    }

    pub fn active_layer(&self) -> &Layer {
        let index = self
            .layers
            .iter()
            .position(|l| l.id == self.active_layer)
            .unwrap_or(0);
        &self.layers[index]
    }

    pub fn active_layer_mut(&mut self) -> &mut Layer {
        let index = self
            .layers
            .iter()
            .position(|l| l.id == self.active_layer)
            .unwrap_or(0);
        &mut self.layers[index]
    }

    /// Add a layer on top and make it active.
    pub fn add_layer(&mut self, name: &str) -> LayerId {
        let layer = Layer::new(name);
        let id = layer.id;
        self.layers.push(layer);
        self.active_layer = id;
        id
    }

    /// Remove a layer with its objects. The last remaining layer stays.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<Layer> {
        if self.layers.len() <= 1 {
            return None;
        }
        let index = self.layers.iter().position(|l| l.id == id)?;
        let removed = self.layers.remove(index);
        if self.active_layer == id {
            self.active_layer = self.layers[index.saturating_sub(1)].id;
        }
        Some(removed)
    }

    /// Any object, nested ones included
    pub fn find_object(&self, id: ObjectId) -> Option<&GraphicObject> {
        self.layers
            .iter()
            .flat_map(|l| l.objects.iter())
            .find_map(|o| o.find(id))
    }

    pub fn find_object_mut(&mut self, id: ObjectId) -> Option<&mut GraphicObject> {
        self.layers
            .iter_mut()
            .flat_map(|l| l.objects.iter_mut())
            .find_map(|o| o.find_mut(id))
    }

    /// Layer and index of a top-level object
    pub fn locate(&self, id: ObjectId) -> Option<(LayerId, usize)> {
        self.layers
            .iter()
            .find_map(|l| l.index_of(id).map(|index| (l.id, index)))
    }

    pub fn objects(&self) -> impl Iterator<Item = &GraphicObject> {
        self.layers.iter().flat_map(|l| l.objects.iter())
    }

    pub fn objects_mut(&mut self) -> impl Iterator<Item = &mut GraphicObject> {
        self.layers.iter_mut().flat_map(|l| l.objects.iter_mut())
    }

    /// Topmost hit: top layer first, and front to back within a layer.
    /// Hidden and locked layers are skipped.
    pub fn hit_test(&self, point: Pos2) -> Option<ObjectId> {
        self.layers
            .iter()
            .rev()
            .filter(|l| l.is_interactive())
            .find_map(|l| l.hit_test(point))
    }

    /// Marquee selection: objects whose whole box lies inside `rect`.
    pub fn objects_in_rect(&self, rect: Rect) -> Vec<ObjectId> {
        self.layers
            .iter()
            .filter(|l| l.is_interactive())
            .flat_map(|l| l.objects.iter())
            .filter(|o| rect.contains_rect(o.bounds()))
            .map(|o| o.id())
            .collect()
    }

    pub fn render(&self, surface: &mut dyn Surface, options: &RenderOptions) {
        for layer in self.layers.iter().filter(|l| l.visible) {
            for object in &layer.objects {
                object.draw(surface, layer.opacity);
            }
        }
        if !options.show_selection {
            return;
        }
        for object in self
            .layers
            .iter()
            .filter(|l| l.visible)
            .flat_map(|l| l.objects.iter())
            .filter(|o| o.is_selected())
        {
            draw_selection_handles(surface, object, options.handle_radius);
        }
    }

    /// Observed property assignment. Returns whether the value changed; a
    /// change is queued for [`Document::take_changes`].
    pub fn set_property(
        &mut self,
        id: ObjectId,
        key: PropertyKey,
        value: &PropertyValue,
    ) -> Result<bool, PropertyError> {
        let from_history = self.is_replaying_history();
        let object = self
            .find_object_mut(id)
            .ok_or(PropertyError::ObjectNotFound(id))?;
        let restore = object.capture_dependents(key);
        let old = object.set_property(key, value)?;
        let new = object.get_property(key)?;
        if old == new {
            if let Some(state) = &restore {
                object.restore_dependents(state);
            }
            return Ok(false);
        }
        self.changes.push(ObjectChange {
            id,
            key,
            old,
            new,
            restore,
            from_history,
        });
        Ok(true)
    }

    pub fn restore_dependents(
        &mut self,
        id: ObjectId,
        state: &DependentState,
    ) -> Result<(), PropertyError> {
        self.find_object_mut(id)
            .ok_or(PropertyError::ObjectNotFound(id))?
            .restore_dependents(state);
        Ok(())
    }

    pub fn take_changes(&mut self) -> Vec<ObjectChange> {
        std::mem::take(&mut self.changes)
    }

    /// Entered by the command history around every apply/revert.
    pub(crate) fn begin_history_replay(&mut self) {
        self.history_depth += 1;
    }

    pub(crate) fn end_history_replay(&mut self) {
        self.history_depth = self.history_depth.saturating_sub(1);
    }

    pub fn is_replaying_history(&self) -> bool {
        self.history_depth > 0
    }
}
