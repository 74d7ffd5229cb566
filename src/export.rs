//! Rendering a document off screen and handing the pixels to an encoder.

use std::path::Path;

use egui::{Color32, Pos2, Rect, Stroke, pos2};
use image::{ImageFormat, Rgba, RgbaImage};
use log::info;
use thiserror::Error;

use crate::document::Document;
use crate::element::ImageObject;
use crate::geometry::{Transform2, calculate_bounds, distance_to_segment};
use crate::surface::{RenderOptions, Surface};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Export size {width}x{height} is empty")]
    EmptyTarget { width: u32, height: u32 },

    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Writes rendered pixels to a file format
pub trait Encoder {
    fn encode(&self, pixels: &RgbaImage, path: &Path) -> ExportResult<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PngEncoder;

impl Encoder for PngEncoder {
    fn encode(&self, pixels: &RgbaImage, path: &Path) -> ExportResult<()> {
        pixels.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

/// A text run seen by an [`OffscreenSurface`], in target pixels.
///
/// Glyphs are not rasterized here; encoders with font support draw these.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub pos: Pos2,
    pub text: String,
    pub family: String,
    pub size: f32,
    pub color: Color32,
    pub angle: f32,
}

/// CPU [`Surface`] drawing into an RGBA buffer
pub struct OffscreenSurface {
    pixels: RgbaImage,
    stack: Vec<Transform2>,
    texts: Vec<TextRun>,
}

impl std::fmt::Debug for OffscreenSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffscreenSurface")
            .field("size", &self.pixels.dimensions())
            .field("depth", &self.stack.len())
            .field("texts", &self.texts.len())
            .finish()
    }
}

/// Source-over of a premultiplied color onto a straight-alpha pixel
fn blend(dst: &mut Rgba<u8>, src: [f32; 4]) {
    let sa = src[3];
    if sa <= 0.0 {
        return;
    }
    let da = f32::from(dst.0[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        let d = f32::from(dst.0[c]) / 255.0 * da;
        let premul = src[c] + d * (1.0 - sa);
        let straight = if out_a > 0.0 { premul / out_a } else { 0.0 };
        dst.0[c] = (straight * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

fn premultiplied(color: Color32) -> [f32; 4] {
    [
        f32::from(color.r()) / 255.0,
        f32::from(color.g()) / 255.0,
        f32::from(color.b()) / 255.0,
        f32::from(color.a()) / 255.0,
    ]
}

/// Even-odd rule
fn point_in_polygon(p: Pos2, polygon: &[Pos2]) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

impl OffscreenSurface {
    /// Transparent `width` x `height` target; `view` maps document space
    /// into target pixels.
    pub fn new(width: u32, height: u32, view: Transform2) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            stack: vec![view],
            texts: Vec::new(),
        }
    }

    pub fn with_background(mut self, background: Color32) -> Self {
        let [r, g, b, a] = background.to_srgba_unmultiplied();
        for pixel in self.pixels.pixels_mut() {
            *pixel = Rgba([r, g, b, a]);
        }
        self
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }

    pub fn texts(&self) -> &[TextRun] {
        &self.texts
    }

    fn current(&self) -> Transform2 {
        self.stack.last().copied().unwrap_or_default()
    }

    fn map_points(&self, points: &[Pos2]) -> Vec<Pos2> {
        let transform = self.current();
        points.iter().map(|p| transform.apply(*p)).collect()
    }

    /// Pixel range covered by `rect`, clipped to the target
    fn pixel_span(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        let (width, height) = self.pixels.dimensions();
        let min_x = rect.min.x.floor().max(0.0);
        let min_y = rect.min.y.floor().max(0.0);
        let max_x = rect.max.x.ceil().min(width as f32);
        let max_y = rect.max.y.ceil().min(height as f32);
        if min_x >= max_x || min_y >= max_y {
            return None;
        }
        Some((min_x as u32, min_y as u32, max_x as u32, max_y as u32))
    }

    fn cover(&mut self, area: Rect, color: [f32; 4], inside: impl Fn(Pos2) -> bool) {
        let Some((x0, y0, x1, y1)) = self.pixel_span(area) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                if inside(pos2(x as f32 + 0.5, y as f32 + 0.5)) {
                    blend(self.pixels.get_pixel_mut(x, y), color);
                }
            }
        }
    }
}

impl Surface for OffscreenSurface {
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
        let Some(area) = calculate_bounds(&mapped) else {
            return;
        };
        self.cover(area, premultiplied(fill), |p| point_in_polygon(p, &mapped));
    }

    fn stroke_polyline(&mut self, points: &[Pos2], closed: bool, stroke: Stroke) {
        if points.len() < 2 || stroke.is_empty() {
            return;
        }
        let mut mapped = self.map_points(points);
        if closed {
            mapped.push(mapped[0]);
        }
        let Some(area) = calculate_bounds(&mapped) else {
            return;
        };
        let half = (stroke.width / 2.0).max(0.5);
        let area = area.expand(half);
        self.cover(area, premultiplied(stroke.color), |p| {
            mapped
                .windows(2)
                .any(|segment| distance_to_segment(p, segment[0], segment[1]) <= half)
        });
    }

    fn draw_text(&mut self, pos: Pos2, text: &str, family: &str, size: f32, color: Color32) {
        if text.is_empty() || color.a() == 0 {
            return;
        }
        let transform = self.current();
        self.texts.push(TextRun {
            pos: transform.apply(pos),
            text: text.to_string(),
            family: family.to_string(),
            size,
            color,
            angle: transform.rotation_radians(),
        });
    }

    fn draw_image(&mut self, image: &ImageObject, dest: Rect, layer_opacity: f32) {
        let source = image.rendered_pixels();
        let (src_w, src_h) = source.dimensions();
        if src_w == 0 || src_h == 0 || dest.width() <= 0.0 || dest.height() <= 0.0 {
            return;
        }
        let transform = self.current();
        let Some(inverse) = transform.inverse() else {
            return;
        };
        let corners = self.map_points(&crate::geometry::corner_handles(dest));
        let Some(area) = calculate_bounds(&corners) else {
            return;
        };
        let Some((x0, y0, x1, y1)) = self.pixel_span(area) else {
            return;
        };
        let opacity = layer_opacity.clamp(0.0, 1.0);
        for y in y0..y1 {
            for x in x0..x1 {
                let local = inverse.apply(pos2(x as f32 + 0.5, y as f32 + 0.5));
                if !dest.contains(local) {
                    continue;
                }
                let u = ((local.x - dest.min.x) / dest.width() * src_w as f32) as u32;
                let v = ((local.y - dest.min.y) / dest.height() * src_h as f32) as u32;
                let (u, v) = (u.min(src_w - 1), v.min(src_h - 1));
                let Some(texel) = source.get_pixel_checked(u, v) else {
                    continue;
                };
                let alpha = f32::from(texel.0[3]) / 255.0 * opacity;
                let color = [
                    f32::from(texel.0[0]) / 255.0 * alpha,
                    f32::from(texel.0[1]) / 255.0 * alpha,
                    f32::from(texel.0[2]) / 255.0 * alpha,
                    alpha,
                ];
                blend(self.pixels.get_pixel_mut(x, y), color);
            }
        }
    }
}

/// Render every visible layer without selection decorations.
pub fn render_to_surface(doc: &Document, surface: &mut dyn Surface) {
    doc.render(surface, &RenderOptions::export());
}

/// Render `doc` scaled to `width` x `height` pixels.
pub fn rasterize_document(
    doc: &Document,
    width: u32,
    height: u32,
) -> ExportResult<OffscreenSurface> {
    if width == 0 || height == 0 {
        return Err(ExportError::EmptyTarget { width, height });
    }
    let scale = width as f32 / doc.width_px().max(1.0);
    let mut surface = OffscreenSurface::new(width, height, Transform2::scale(scale));
    render_to_surface(doc, &mut surface);
    Ok(surface)
}

/// Render and hand the pixels to `encoder`.
pub fn export_document(
    doc: &Document,
    width: u32,
    height: u32,
    encoder: &dyn Encoder,
    path: &Path,
) -> ExportResult<()> {
    let surface = rasterize_document(doc, width, height)?;
    encoder.encode(surface.pixels(), path)?;
    info!("Exported '{}' to {} ({}x{})", doc.title, path.display(), width, height);
    Ok(())
}
