use std::path::PathBuf;

use egui::{Color32, Pos2, Sense, Vec2};
use log::warn;

use crate::arrange::Alignment;
use crate::color::Color;
use crate::command::Command;
use crate::config::EditorConfig;
use crate::editor::Editor;
use crate::element::{Element, PropertyKey, PropertyValue};
use crate::geometry::Transform2;
use crate::interaction::{InteractionController, Modifiers, PointerEvent, Tool};
use crate::layer::LayerProperty;
use crate::persistence;
use crate::surface::{PainterSurface, RenderOptions, TextureCache};
use crate::workspace::Workspace;

const TOOLS: [(Tool, &str); 7] = [
    (Tool::Select, "Select"),
    (Tool::Rectangle, "Rectangle"),
    (Tool::Ellipse, "Ellipse"),
    (Tool::Line, "Line"),
    (Tool::Text, "Text"),
    (Tool::Crop, "Crop"),
    (Tool::Erase, "Erase"),
];

/// Margin between the panel edge and the page
const PAGE_MARGIN: f32 = 24.0;

/// We derive Deserialize/Serialize so we can persist app settings on shutdown.
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct FigcraftApp {
    config: EditorConfig,
    project_path: String,
    #[serde(skip)]
    workspace: Workspace,
    #[serde(skip)]
    controller: InteractionController,
    // GPU resources
    #[serde(skip)]
    textures: TextureCache,
    #[serde(skip)]
    status: Option<String>,
}

impl Default for FigcraftApp {
    fn default() -> Self {
        Self {
            config: EditorConfig::default(),
            project_path: "untitled.json".to_string(),
            workspace: Workspace::default(),
            controller: InteractionController::new(),
            textures: TextureCache::default(),
            status: None,
        }
    }
}

impl FigcraftApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let mut app: FigcraftApp = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();
        app.workspace = Workspace::new(app.config.clone());
        app
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("New").clicked() {
                self.controller = InteractionController::new();
                self.workspace.new_document();
            }
            ui.text_edit_singleline(&mut self.project_path);
            if ui.button("Open").clicked() {
                match persistence::load_project(&PathBuf::from(&self.project_path)) {
                    Ok(doc) => {
                        self.controller = InteractionController::new();
                        self.workspace.open(doc);
                    }
                    Err(e) => self.status = Some(e.to_string()),
                }
            }
            if ui.button("Save").clicked() {
                if let Some(editor) = self.workspace.active() {
                    let path = PathBuf::from(&self.project_path);
                    self.status = match persistence::save_project(&path, editor.document()) {
                        Ok(()) => Some(format!("Saved {}", path.display())),
                        Err(e) => Some(e.to_string()),
                    };
                }
            }
            ui.separator();

            let Some(editor) = self.workspace.active_mut() else {
                return;
            };
            for (tool, label) in TOOLS {
                if ui.selectable_label(editor.tool() == tool, label).clicked() {
                    self.controller.cancel(editor);
                    editor.set_tool(tool);
                }
            }
            ui.separator();
            if ui
                .add_enabled(editor.history().can_undo(), egui::Button::new("Undo"))
                .clicked()
            {
                report(editor.undo().map(|_| ()));
            }
            if ui
                .add_enabled(editor.history().can_redo(), egui::Button::new("Redo"))
                .clicked()
            {
                report(editor.redo().map(|_| ()));
            }
            ui.menu_button("Arrange", |ui| {
                for (alignment, label) in [
                    (Alignment::Left, "Align Left"),
                    (Alignment::Right, "Align Right"),
                    (Alignment::Top, "Align Top"),
                    (Alignment::Bottom, "Align Bottom"),
                    (Alignment::CenterHorizontal, "Align Centers Horizontally"),
                    (Alignment::CenterVertical, "Align Centers Vertically"),
                ] {
                    if ui.button(label).clicked() {
                        report(editor.align_selected(alignment));
                        ui.close_menu();
                    }
                }
                ui.separator();
                if ui.button("Bring to Front").clicked() {
                    report(editor.bring_to_front());
                }
                if ui.button("Bring Forward").clicked() {
                    report(editor.bring_forward());
                }
                if ui.button("Send Backward").clicked() {
                    report(editor.send_backward());
                }
                if ui.button("Send to Back").clicked() {
                    report(editor.send_to_back());
                }
                ui.separator();
                if ui.button("Group").clicked() {
                    editor.group_selected();
                }
                if ui.button("Ungroup").clicked() {
                    report(editor.ungroup_selected());
                }
            });
        });
    }

    fn tabs(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let tabs: Vec<(uuid::Uuid, String)> = self
                .workspace
                .editors()
                .iter()
                .map(|e| (e.document().id, e.document().title.clone()))
                .collect();
            for (id, title) in tabs {
                let active = self.workspace.active_id() == Some(id);
                if ui.selectable_label(active, title.as_str()).clicked() && !active {
                    self.controller = InteractionController::new();
                    self.workspace.set_active(id);
                }
                if ui.small_button("x").clicked() {
                    self.controller = InteractionController::new();
                    self.workspace.close_document(id);
                }
            }
        });
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let Some(editor) = self.workspace.active_mut() else {
            return;
        };
        if ctx.wants_keyboard_input() {
            return;
        }
        let (undo, redo, delete, copy, paste, group, ungroup, escape) = ctx.input(|i| {
            let cmd = i.modifiers.command;
            let shift = i.modifiers.shift;
            (
                cmd && !shift && i.key_pressed(egui::Key::Z),
                cmd && (i.key_pressed(egui::Key::Y) || (shift && i.key_pressed(egui::Key::Z))),
                i.key_pressed(egui::Key::Delete),
                cmd && i.key_pressed(egui::Key::C),
                cmd && i.key_pressed(egui::Key::V),
                cmd && !shift && i.key_pressed(egui::Key::G),
                cmd && shift && i.key_pressed(egui::Key::G),
                i.key_pressed(egui::Key::Escape),
            )
        });
        if escape {
            self.controller.cancel(editor);
        }
        if undo {
            report(editor.undo().map(|_| ()));
        }
        if redo {
            report(editor.redo().map(|_| ()));
        }
        if delete {
            report(editor.delete_selected());
        }
        if copy {
            editor.copy();
        }
        if paste {
            editor.paste();
        }
        if group {
            editor.group_selected();
        }
        if ungroup {
            report(editor.ungroup_selected());
        }
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let Some(editor) = self.workspace.active_mut() else {
            ui.label("No document open");
            return;
        };
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let origin = response.rect.min + Vec2::splat(PAGE_MARGIN);
        let view = Transform2::translation(origin.to_vec2());
        let to_document = |p: Pos2| p - origin.to_vec2();

        let (pressed, released, pointer, modifiers) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.interact_pos(),
                i.modifiers,
            )
        });
        if let Some(pos) = pointer {
            let event = PointerEvent {
                pos: to_document(pos),
                modifiers: Modifiers {
                    shift: modifiers.shift,
                    ctrl: modifiers.command,
                },
            };
            if pressed && response.hovered() {
                self.controller.pointer_down(editor, event);
            } else if released && !self.controller.state().is_idle() {
                self.controller.pointer_up(editor, event);
            } else if !self.controller.state().is_idle() {
                self.controller.pointer_move(editor, event);
            }
        }

        let page = egui::Rect::from_min_size(origin, editor.canvas_size_px());
        painter.rect_filled(page, 0.0, Color32::WHITE);

        self.textures.begin_frame();
        let mut surface = PainterSurface::new(&painter, &mut self.textures, view);
        let options = RenderOptions {
            show_selection: true,
            handle_radius: editor.config().handle_radius,
        };
        editor.document().render(&mut surface, &options);
        self.controller.render_overlay(&mut surface);

        if !self.controller.state().is_idle() {
            ui.ctx().request_repaint();
        }
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        let Some(editor) = self.workspace.active_mut() else {
            return;
        };
        layers_panel(ui, editor);
        ui.separator();
        properties_panel(ui, editor);
        if let Some(status) = &self.status {
            ui.separator();
            ui.label(status.as_str());
        }
    }
}

fn report(result: Result<(), crate::command::CommandError>) {
    if let Err(e) = result {
        warn!("{e}");
    }
}

fn layers_panel(ui: &mut egui::Ui, editor: &mut Editor) {
    ui.heading("Layers");
    if ui.button("Add Layer").clicked() {
        let name = format!("Layer {}", editor.document().layers.len() + 1);
        editor.document_mut().add_layer(&name);
    }
    let layers: Vec<_> = editor
        .document()
        .layers
        .iter()
        .rev()
        .map(|l| (l.id, l.name.clone(), l.visible, l.locked))
        .collect();
    let active = editor.document().active_layer_id();
    for (id, name, mut visible, mut locked) in layers {
        ui.horizontal(|ui| {
            if ui.checkbox(&mut visible, "").changed() {
                report(editor.set_layer_property(id, LayerProperty::Visible(visible)));
            }
            if ui.checkbox(&mut locked, "🔒").changed() {
                report(editor.set_layer_property(id, LayerProperty::Locked(locked)));
            }
            if ui.selectable_label(active == id, name.as_str()).clicked() {
                editor.document_mut().set_active_layer(id);
            }
        });
    }
}

fn properties_panel(ui: &mut egui::Ui, editor: &mut Editor) {
    ui.heading("Properties");
    let Some(id) = editor.selection().last() else {
        ui.label("Nothing selected");
        return;
    };
    let Some(object) = editor.document().find_object(id) else {
        return;
    };
    let values: Vec<(PropertyKey, PropertyValue)> = PropertyKey::ALL
        .iter()
        .filter_map(|key| object.get_property(*key).ok().map(|v| (*key, v)))
        .collect();
    let (position, bounds) = (object.position(), object.bounds());

    for (key, value) in values {
        let edited = ui
            .horizontal(|ui| {
                ui.label(key.name());
                property_widget(ui, value)
            })
            .inner;
        let Some(new) = edited else {
            continue;
        };
        match (key, &new) {
            // panel geometry edits go through the geometry commands
            (PropertyKey::X | PropertyKey::Y, PropertyValue::Number(v)) => {
                let mut target = position;
                if key == PropertyKey::X {
                    target.x = *v;
                } else {
                    target.y = *v;
                }
                report(editor.execute(Command::Move {
                    id,
                    old: position,
                    new: target,
                }));
            }
            (PropertyKey::Width | PropertyKey::Height, PropertyValue::Number(v)) => {
                let mut size = bounds.size();
                if key == PropertyKey::Width {
                    size.x = (*v).max(0.0);
                } else {
                    size.y = (*v).max(0.0);
                }
                let rect = egui::Rect::from_min_size(bounds.min, size);
                if let Some(command) = Command::resize(editor.document(), id, rect) {
                    report(editor.execute(command));
                }
            }
            _ => {
                if let Err(e) = editor.set_property(id, key, new) {
                    warn!("{e}");
                }
            }
        }
    }
}

/// Widget for one value; returns the edited value when it changed.
fn property_widget(ui: &mut egui::Ui, value: PropertyValue) -> Option<PropertyValue> {
    match value {
        PropertyValue::Number(mut n) => ui
            .add(egui::DragValue::new(&mut n).speed(0.5))
            .changed()
            .then_some(PropertyValue::Number(n)),
        PropertyValue::Flag(mut b) => ui
            .checkbox(&mut b, "")
            .changed()
            .then_some(PropertyValue::Flag(b)),
        PropertyValue::Text(mut s) => ui
            .text_edit_singleline(&mut s)
            .changed()
            .then_some(PropertyValue::Text(s)),
        PropertyValue::Color(c) => {
            let mut rgba = [c.r, c.g, c.b, c.a];
            ui.color_edit_button_srgba_unmultiplied(&mut rgba)
                .changed()
                .then(|| PropertyValue::Color(Color::argb(rgba[3], rgba[0], rgba[1], rgba[2])))
        }
    }
}

impl eframe::App for FigcraftApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_shortcuts(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ui);
            self.tabs(ui);
        });

        egui::SidePanel::right("inspector")
            .default_width(220.0)
            .show(ctx, |ui| self.side_panel(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.canvas(ui));
    }
}
