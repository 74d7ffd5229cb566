use std::collections::HashMap;

use egui::epaint::{Mesh, TextShape, Vertex};
use egui::{
    Color32, ColorImage, Context, FontFamily, FontId, Painter, Pos2, Rect, Shape, Stroke,
    TextureHandle, TextureId, TextureOptions, pos2,
};

use crate::color::Color;
use crate::element::{Element, GraphicObject, ImageObject, RenderKey};
use crate::geometry::{Transform2, corner_handles};

/// Drawing target for graphic objects.
///
/// Coordinates are in document space; implementations apply the current
/// transform stack themselves.
pub trait Surface {
    fn push_transform(&mut self, transform: Transform2);

    fn pop_transform(&mut self);

    fn fill_polygon(&mut self, points: &[Pos2], fill: Color32);

    fn stroke_polyline(&mut self, points: &[Pos2], closed: bool, stroke: Stroke);

    fn draw_text(&mut self, pos: Pos2, text: &str, family: &str, size: f32, color: Color32);

    /// Draw an image's rendered pixels stretched into `dest`.
    fn draw_image(&mut self, image: &ImageObject, dest: Rect, layer_opacity: f32);
}

/// Options for [`crate::document::Document::render`]
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub show_selection: bool,
    pub handle_radius: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_selection: true,
            handle_radius: 6.0,
        }
    }
}

impl RenderOptions {
    /// Export rendering: no selection decorations
    pub fn export() -> Self {
        Self {
            show_selection: false,
            ..Self::default()
        }
    }
}

/// Outline plus handles for a selected object, rotated with it.
pub fn draw_selection_handles(surface: &mut dyn Surface, object: &GraphicObject, radius: f32) {
    let rotation = object.base().rotation;
    if rotation != 0.0 {
        surface.push_transform(Transform2::rotation_about(object.center(), rotation));
    }

    let accent = Color::SELECTION.to_color32(1.0);
    if !matches!(object, GraphicObject::Line(_)) {
        let outline = corner_handles(object.bounds());
        surface.stroke_polyline(&outline, true, Stroke::new(1.0, accent));
    }
    for handle in object.handles() {
        let square = Rect::from_center_size(handle, egui::vec2(radius, radius) * 2.0);
        let corners = corner_handles(square);
        surface.fill_polygon(&corners, Color32::WHITE);
        surface.stroke_polyline(&corners, true, Stroke::new(1.0, accent));
    }

    if rotation != 0.0 {
        surface.pop_transform();
    }
}

/// Caches uploaded textures of image objects, keyed by their render key.
pub struct TextureCache {
    textures: HashMap<RenderKey, TextureHandle>,
    last_used: HashMap<RenderKey, u64>,
    current_frame: u64,
    max_entries: usize,
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new(64)
    }
}

impl TextureCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            textures: HashMap::new(),
            last_used: HashMap::new(),
            current_frame: 0,
            max_entries,
        }
    }

    /// Call once per frame before drawing
    pub fn begin_frame(&mut self) {
        self.current_frame += 1;
    }

    pub fn texture_for(&mut self, ctx: &Context, image: &ImageObject) -> TextureId {
        let key = image.render_key();
        if let Some(handle) = self.textures.get(&key) {
            self.last_used.insert(key, self.current_frame);
            return handle.id();
        }

        // Older versions of the same object are never drawn again
        self.textures.retain(|k, _| k.id != key.id);
        self.last_used.retain(|k, _| k.id != key.id);
        self.prune_if_needed();

        let pixels = image.rendered_pixels();
        let size = [pixels.width() as usize, pixels.height() as usize];
        let color_image = ColorImage::from_rgba_unmultiplied(size, pixels.as_raw());
        let name = format!("image_{}_v{}", key.id.get(), key.version);
        let handle = ctx.load_texture(name, color_image, TextureOptions::LINEAR);
        let id = handle.id();
        self.textures.insert(key, handle);
        self.last_used.insert(key, self.current_frame);
        id
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    fn prune_if_needed(&mut self) {
        if self.textures.len() < self.max_entries {
            return;
        }
        let mut entries: Vec<(RenderKey, u64)> =
            self.last_used.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_by_key(|(_, frame)| *frame);
        let to_remove = entries.len() + 1 - self.max_entries.max(1);
        for (key, _) in entries.into_iter().take(to_remove) {
            self.textures.remove(&key);
            self.last_used.remove(&key);
        }
    }

    pub fn clear(&mut self) {
        self.textures.clear();
        self.last_used.clear();
    }
}

/// [`Surface`] over an egui painter, mapping document space into `canvas`.
pub struct PainterSurface<'a> {
    painter: &'a Painter,
    textures: &'a mut TextureCache,
    stack: Vec<Transform2>,
}

impl<'a> PainterSurface<'a> {
    /// `view` maps document coordinates to screen coordinates.
    pub fn new(painter: &'a Painter, textures: &'a mut TextureCache, view: Transform2) -> Self {
        Self {
            painter,
            textures,
            stack: vec![view],
        }
    }

    fn current(&self) -> Transform2 {
        self.stack.last().copied().unwrap_or_default()
    }

    fn map_points(&self, points: &[Pos2]) -> Vec<Pos2> {
        let transform = self.current();
        points.iter().map(|p| transform.apply(*p)).collect()
    }
}

fn egui_family(family: &str) -> FontFamily {
    let lower = family.to_ascii_lowercase();
    if lower.contains("mono") || lower.contains("courier") || lower.contains("consolas") {
        FontFamily::Monospace
    } else {
        FontFamily::Proportional
    }
}

impl Surface for PainterSurface<'_> {
    fn push_transform(&mut self, transform: Transform2) {
        let combined = transform.then(&self.current());
        self.stack.push(combined);
    }

    fn pop_transform(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    fn fill_polygon(&mut self, points: &[Pos2], fill: Color32) {
        if points.len() < 3 || fill.a() == 0 {
            return;
        }
        let mapped = self.map_points(points);
        self.painter
            .add(Shape::convex_polygon(mapped, fill, Stroke::NONE));
    }

    fn stroke_polyline(&mut self, points: &[Pos2], closed: bool, stroke: Stroke) {
        if points.len() < 2 || stroke.is_empty() {
            return;
        }
        let mapped = self.map_points(points);
        let shape = if closed {
            Shape::closed_line(mapped, stroke)
        } else {
            Shape::line(mapped, stroke)
        };
        self.painter.add(shape);
    }

    fn draw_text(&mut self, pos: Pos2, text: &str, family: &str, size: f32, color: Color32) {
        if text.is_empty() || color.a() == 0 {
            return;
        }
        let transform = self.current();
        let galley =
            self.painter
                .layout_no_wrap(text.to_string(), FontId::new(size, egui_family(family)), color);
        let shape = TextShape::new(transform.apply(pos), galley, color)
            .with_angle(transform.rotation_radians());
        self.painter.add(shape);
    }

    fn draw_image(&mut self, image: &ImageObject, dest: Rect, layer_opacity: f32) {
        let (width, height) = image.source_size();
        if width == 0 || height == 0 || dest.width() <= 0.0 || dest.height() <= 0.0 {
            return;
        }
        let texture = self.textures.texture_for(self.painter.ctx(), image);
        let tint = Color32::WHITE.gamma_multiply(layer_opacity.clamp(0.0, 1.0));
        let corners = self.map_points(&corner_handles(dest));
        let uvs = [pos2(0.0, 0.0), pos2(1.0, 0.0), pos2(1.0, 1.0), pos2(0.0, 1.0)];

        let mut mesh = Mesh::with_texture(texture);
        for (pos, uv) in corners.into_iter().zip(uvs) {
            mesh.vertices.push(Vertex {
                pos,
                uv,
                color: tint,
            });
        }
        mesh.add_triangle(0, 1, 2);
        mesh.add_triangle(0, 2, 3);
        self.painter.add(Shape::mesh(mesh));
    }
}
