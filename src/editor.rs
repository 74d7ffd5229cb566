use egui::{Pos2, Vec2, vec2};
use image::RgbaImage;
use log::{debug, warn};

use crate::arrange::{self, Alignment};
use crate::command::{Command, CommandError, CommandHistory, CommandResult};
use crate::config::EditorConfig;
use crate::document::Document;
use crate::element::{
    Element, GraphicObject, ImageObject, PropertyError, PropertyKey, PropertyValue,
};
use crate::event::{EditorEvent, EventBus, RedrawThrottle};
use crate::id_generator::ObjectId;
use crate::interaction::Tool;
use crate::layer::{LayerId, LayerProperty};
use crate::selection::Selection;

/// Single-object clipboard.
///
/// Holds the last pasted instance so that every paste lands one offset
/// further than the previous one.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    object: Option<GraphicObject>,
}

impl Clipboard {
    pub fn is_empty(&self) -> bool {
        self.object.is_none()
    }

    pub fn object(&self) -> Option<&GraphicObject> {
        self.object.as_ref()
    }
}

/// One open document with its history, selection and notifications.
///
/// Every user-level mutation goes through here so it lands on the undo stack
/// and is announced on the event bus.
#[derive(Debug)]
pub struct Editor {
    document: Document,
    history: CommandHistory,
    selection: Selection,
    clipboard: Clipboard,
    events: EventBus,
    throttle: RedrawThrottle,
    config: EditorConfig,
    tool: Tool,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Document::default())
    }
}

impl Editor {
    pub fn new(document: Document) -> Self {
        Self::with_config(document, EditorConfig::default())
    }

    pub fn with_config(mut document: Document, config: EditorConfig) -> Self {
        document.set_dpi(config.dpi);
        Self {
            document,
            history: CommandHistory::with_limit(config.history_limit),
            selection: Selection::new(),
            clipboard: Clipboard::default(),
            events: EventBus::new(),
            throttle: RedrawThrottle::new(config.redraw_interval_ms),
            config,
            tool: Tool::Select,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Direct access for live gesture feedback. Changes made here are not
    /// recorded; the gesture records one command when it ends.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    /// Page size in pixels at the configured resolution
    pub fn canvas_size_px(&self) -> Vec2 {
        self.document.size_px()
    }

    /// Apply `command` and push it onto the undo stack.
    pub fn execute(&mut self, command: Command) -> CommandResult {
        let result = self.history.execute(command, &mut self.document);
        if let Err(e) = &result {
            warn!("Command failed: {e}");
        }
        self.after_history_change();
        result
    }

    /// Push a command whose effect is already in the document.
    pub fn record(&mut self, command: Command) {
        self.history.record(command);
        self.after_history_change();
    }

    pub fn undo(&mut self) -> Result<bool, CommandError> {
        let result = self.history.undo(&mut self.document);
        self.after_history_change();
        result
    }

    pub fn redo(&mut self) -> Result<bool, CommandError> {
        let result = self.history.redo(&mut self.document);
        self.after_history_change();
        result
    }

    fn after_history_change(&mut self) {
        let before = self.selection.ids().to_vec();
        self.selection.retain_existing(&mut self.document);
        self.flush_changes();
        if self.selection.ids() != before.as_slice() {
            self.emit_selection();
        }
        self.events.emit(EditorEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
        self.events.emit(EditorEvent::DocumentChanged);
        self.request_redraw();
    }

    /// Publish queued property changes. Changes made outside of undo/redo to
    /// allow-listed properties become undo steps.
    fn flush_changes(&mut self) {
        for change in self.document.take_changes() {
            if !change.from_history && !self.history.is_executing() && change.key.is_recorded() {
                debug!("Recording change of {} on {}", change.key.name(), change.id);
                self.history.record(Command::PropertyChange {
                    id: change.id,
                    key: change.key,
                    old: change.old.clone(),
                    new: change.new.clone(),
                    restore: change.restore.clone(),
                });
            }
            self.events.emit(EditorEvent::PropertyChanged {
                id: change.id,
                key: change.key,
                old: change.old,
                new: change.new,
            });
        }
    }

    /// Property panel edit. Returns whether the value changed.
    pub fn set_property(
        &mut self,
        id: ObjectId,
        key: PropertyKey,
        value: PropertyValue,
    ) -> Result<bool, PropertyError> {
        let changed = self.document.set_property(id, key, &value)?;
        if changed {
            self.flush_changes();
            self.events.emit(EditorEvent::HistoryChanged {
                can_undo: self.history.can_undo(),
                can_redo: self.history.can_redo(),
            });
            self.request_redraw();
        }
        Ok(changed)
    }

    /// Undoable layer attribute edit. No-op when the value is unchanged.
    pub fn set_layer_property(&mut self, layer: LayerId, value: LayerProperty) -> CommandResult {
        let old = self
            .document
            .layer(layer)
            .map(|l| value.read_from(l))
            .ok_or(CommandError::LayerNotFound(layer))?;
        if old == value {
            return Ok(());
        }
        self.execute(Command::LayerProperty {
            layer,
            old,
            new: value,
        })
    }

    /// Add a new object on the active layer and select it.
    pub fn add_object(
        &mut self,
        object: impl Into<GraphicObject>,
    ) -> Result<ObjectId, CommandError> {
        let object = object.into();
        let id = object.id();
        let layer = self.document.active_layer_id();
        self.execute(Command::add_object(layer, object))?;
        self.select_single(Some(id));
        Ok(id)
    }

    pub fn select_single(&mut self, id: Option<ObjectId>) {
        self.selection.select_single(&mut self.document, id);
        self.emit_selection();
    }

    pub fn toggle_selection(&mut self, id: ObjectId) {
        self.selection.toggle(&mut self.document, id);
        self.emit_selection();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear_all(&mut self.document);
        self.emit_selection();
    }

    pub fn select_many(&mut self, ids: impl IntoIterator<Item = ObjectId>) {
        self.selection.set_many(&mut self.document, ids);
        self.emit_selection();
    }

    fn emit_selection(&mut self) {
        self.events.emit(EditorEvent::SelectionChanged {
            ids: self.selection.ids().to_vec(),
        });
        self.request_redraw();
    }

    /// Selected top-level objects grouped per layer, in layer order
    fn selected_by_layer(&self) -> Vec<(LayerId, Vec<ObjectId>)> {
        let mut per_layer: Vec<(LayerId, Vec<ObjectId>)> = Vec::new();
        for layer in &self.document.layers {
            let ids: Vec<ObjectId> = self
                .selection
                .ids()
                .iter()
                .copied()
                .filter(|id| layer.index_of(*id).is_some())
                .collect();
            if !ids.is_empty() {
                per_layer.push((layer.id, ids));
            }
        }
        per_layer
    }

    /// Remove every selected object as one undo step.
    pub fn delete_selected(&mut self) -> CommandResult {
        let mut commands: Vec<Command> = self
            .selected_by_layer()
            .into_iter()
            .filter_map(|(layer, ids)| Command::remove_objects(&self.document, layer, &ids))
            .collect();
        let command = match commands.len() {
            0 => return Ok(()),
            1 => commands.remove(0),
            _ => Command::composite("Delete", commands),
        };
        self.execute(command)
    }

    /// Copy the last selected object. Returns whether anything was copied.
    pub fn copy(&mut self) -> bool {
        let Some(object) = self
            .selection
            .last()
            .and_then(|id| self.document.find_object(id))
        else {
            return false;
        };
        let mut copy = object.clone();
        copy.set_selected(false);
        self.clipboard.object = Some(copy);
        true
    }

    /// Paste one offset step away from the previous paste (or the copied
    /// object) onto the active layer, and select the pasted object.
    pub fn paste(&mut self) -> Option<ObjectId> {
        let template = self.clipboard.object.as_ref()?;
        let mut pasted = template.duplicate();
        let offset = self.config.paste_offset;
        pasted.translate(vec2(offset, offset));
        self.clipboard.object = Some(pasted.clone());
        match self.add_object(pasted) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Paste failed: {e}");
                None
            }
        }
    }

    /// Group the selected objects of the layer holding the last selected one.
    pub fn group_selected(&mut self) -> Option<ObjectId> {
        let anchor = self.selection.last()?;
        let (layer, _) = self.document.locate(anchor)?;
        let ids: Vec<ObjectId> = self.selection.ids().to_vec();
        let command = Command::group(&self.document, layer, &ids)?;
        let Command::Group { group_id, .. } = &command else {
            return None;
        };
        let group_id = *group_id;
        self.execute(command).ok()?;
        self.select_single(Some(group_id));
        Some(group_id)
    }

    /// Dissolve every selected group; the freed children become the selection.
    pub fn ungroup_selected(&mut self) -> CommandResult {
        let mut commands: Vec<Command> = self
            .selected_by_layer()
            .into_iter()
            .filter_map(|(layer, ids)| Command::ungroup(&self.document, layer, &ids))
            .collect();
        let children: Vec<ObjectId> = commands
            .iter()
            .flat_map(|c| match c {
                Command::Ungroup { entries, .. } => {
                    entries.iter().flat_map(|e| e.child_ids.clone()).collect()
                }
                _ => Vec::new(),
            })
            .collect();
        let command = match commands.len() {
            0 => return Ok(()),
            1 => commands.remove(0),
            _ => Command::composite("Ungroup", commands),
        };
        self.execute(command)?;
        self.select_many(children);
        Ok(())
    }

    pub fn align_selected(&mut self, alignment: Alignment) -> CommandResult {
        match arrange::align(&self.document, self.selection.ids(), alignment) {
            Some(command) => self.execute(command),
            None => Ok(()),
        }
    }

    fn arrange_last(&mut self, op: fn(&Document, ObjectId) -> Option<Command>) -> CommandResult {
        let Some(command) = self.selection.last().and_then(|id| op(&self.document, id)) else {
            return Ok(());
        };
        self.execute(command)
    }

    pub fn bring_forward(&mut self) -> CommandResult {
        self.arrange_last(arrange::bring_forward)
    }

    pub fn send_backward(&mut self) -> CommandResult {
        self.arrange_last(arrange::send_backward)
    }

    pub fn bring_to_front(&mut self) -> CommandResult {
        self.arrange_last(arrange::bring_to_front)
    }

    pub fn send_to_back(&mut self) -> CommandResult {
        self.arrange_last(arrange::send_to_back)
    }

    /// Place decoded pixels on the active layer as one undoable step.
    pub fn import_image(&mut self, pixels: RgbaImage, at: Pos2) -> Result<ObjectId, CommandError> {
        self.add_object(ImageObject::new(pixels, at))
    }

    /// Ask for a repaint; requests closer together than the redraw interval
    /// are coalesced.
    pub fn request_redraw(&mut self) {
        if self.throttle.request() {
            self.events.emit(EditorEvent::RedrawRequested);
        }
    }

    /// Emit a redraw held back by the throttle, if its interval has passed.
    pub fn flush_redraw(&mut self, now: f64) {
        if self.throttle.flush(now) {
            self.events.emit(EditorEvent::RedrawRequested);
        }
    }
}
