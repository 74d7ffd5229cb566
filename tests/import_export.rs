use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use egui::{Color32, Rect, pos2, vec2};
use figcraft::color::Color;
use figcraft::document::Document;
use figcraft::element::{RectangleObject, TextObject};
use figcraft::export::{
    ExportError, OffscreenSurface, PngEncoder, export_document, rasterize_document,
};
use figcraft::geometry::Transform2;
use figcraft::import::{Importer, Rasterizer};
use figcraft::surface::RenderOptions;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
    Rect::from_min_size(pos2(x, y), vec2(w, h))
}

fn temp_file(extension: &str) -> PathBuf {
    std::env::temp_dir().join(format!("figcraft-test-{}.{extension}", uuid::Uuid::new_v4()))
}

/// Hands out a fixed image for any path
struct FakeRasterizer {
    width: u32,
    height: u32,
}

impl Rasterizer for FakeRasterizer {
    fn rasterize(&self, _path: &Path) -> Option<RgbaImage> {
        Some(RgbaImage::from_pixel(self.width, self.height, Rgba([0, 0, 0, 255])))
    }
}

/// Blocks until the test lets it go
struct GatedRasterizer {
    gate: Mutex<mpsc::Receiver<()>>,
}

impl Rasterizer for GatedRasterizer {
    fn rasterize(&self, _path: &Path) -> Option<RgbaImage> {
        let _ = self.gate.lock().recv_timeout(Duration::from_secs(5));
        Some(RgbaImage::new(8, 8))
    }
}

fn write_png(width: u32, height: u32) -> PathBuf {
    let path = temp_file("png");
    RgbaImage::from_pixel(width, height, Rgba([0, 128, 255, 255]))
        .save(&path)
        .unwrap();
    path
}

// 25.4 mm square page: exactly 96 px at 96 dpi
fn inch_document() -> Document {
    let mut doc = Document::new("Export");
    doc.set_width_mm(25.4);
    doc.set_height_mm(25.4);
    let mut red = RectangleObject::new(rect(10.0, 10.0, 50.0, 50.0));
    red.base.fill = Color::rgb(255, 0, 0);
    red.base.stroke = Color::TRANSPARENT;
    doc.active_layer_mut().push(red.into());
    doc
}

#[test]
fn test_import_png() {
    let path = write_png(6, 4);
    let pixels = Importer::new().import_blocking(&path).unwrap();
    assert_eq!(pixels.dimensions(), (6, 4));
    assert_eq!(pixels.get_pixel(0, 0).0, [0, 128, 255, 255]);
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_import_failures_yield_none() {
    let importer = Importer::new();

    let corrupt = temp_file("png");
    std::fs::write(&corrupt, b"definitely not a png").unwrap();
    assert!(importer.import_blocking(&corrupt).is_none());
    std::fs::remove_file(&corrupt).unwrap();

    assert!(importer.import_blocking(&temp_file("png")).is_none());
    assert!(importer.import_blocking(Path::new("figure.xyz")).is_none());
}

#[test]
fn test_rasterizer_routing_ignores_case() {
    let importer = Importer::new();
    assert!(!importer.has_rasterizer("pdf"));
    importer.register(
        "PDF",
        Arc::new(FakeRasterizer {
            width: 3,
            height: 2,
        }),
    );
    assert!(importer.has_rasterizer("pdf"));
    assert!(importer.has_rasterizer(".Pdf"));

    let pixels = importer.import_blocking(Path::new("paper/figure.PDF")).unwrap();
    assert_eq!(pixels.dimensions(), (3, 2));
}

#[test]
fn test_empty_rasterizer_result_is_none() {
    let importer = Importer::new();
    importer.register(
        "emf",
        Arc::new(FakeRasterizer {
            width: 0,
            height: 0,
        }),
    );
    assert!(importer.import_blocking(Path::new("chart.emf")).is_none());
}

#[test]
fn test_async_import_wait() {
    let path = write_png(5, 5);
    let handle = Importer::new().import_async(path.clone());
    let pixels = handle.wait().unwrap();
    assert_eq!(pixels.dimensions(), (5, 5));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_async_import_polling() {
    let importer = Importer::new();
    importer.register(
        "ai",
        Arc::new(FakeRasterizer {
            width: 7,
            height: 9,
        }),
    );
    let mut handle = importer.import_async("logo.ai");

    let mut result = None;
    for _ in 0..500 {
        if let Some(taken) = handle.try_take() {
            result = Some(taken);
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    let pixels = result.unwrap().unwrap();
    assert_eq!(pixels.dimensions(), (7, 9));
    assert!(handle.is_done());
    // the result is handed out once
    assert!(handle.try_take().is_none());
}

#[test]
fn test_cancelled_import_finishes_empty() {
    let (release, gate) = mpsc::channel();
    let importer = Importer::new();
    importer.register(
        "pdf",
        Arc::new(GatedRasterizer {
            gate: Mutex::new(gate),
        }),
    );

    let mut handle = importer.import_async("slow.pdf");
    assert!(!handle.is_cancelled());
    handle.cancel();
    assert!(handle.is_cancelled());
    assert_eq!(handle.try_take(), Some(None));
    assert!(handle.is_done());

    release.send(()).unwrap();
}

#[test]
fn test_offscreen_surface_background() {
    let surface = OffscreenSurface::new(2, 2, Transform2::IDENTITY).with_background(Color32::WHITE);
    assert!(surface.pixels().pixels().all(|p| p.0 == [255, 255, 255, 255]));
    assert!(surface.texts().is_empty());
}

#[test]
fn test_rasterize_page_size() {
    let doc = inch_document();
    assert_eq!(doc.width_px(), 96.0);

    let surface = rasterize_document(&doc, 96, 96).unwrap();
    let pixels = surface.into_pixels();
    assert_eq!(pixels.dimensions(), (96, 96));
    assert_eq!(pixels.get_pixel(30, 30).0, [255, 0, 0, 255]);
    assert_eq!(pixels.get_pixel(80, 80).0[3], 0);

    // twice the pixels, same picture
    let pixels = rasterize_document(&doc, 192, 192).unwrap().into_pixels();
    assert_eq!(pixels.get_pixel(100, 100).0, [255, 0, 0, 255]);
    assert_eq!(pixels.get_pixel(150, 150).0[3], 0);
}

#[test]
fn test_export_has_no_selection_handles() {
    let mut doc = inch_document();
    doc.layers[0].objects[0].set_selected(true);

    let exported = rasterize_document(&doc, 96, 96).unwrap();
    assert_eq!(exported.pixels().get_pixel(5, 5).0[3], 0);

    // the on-screen render of the same document shows the handle
    let mut screen = OffscreenSurface::new(96, 96, Transform2::IDENTITY);
    doc.render(&mut screen, &RenderOptions::default());
    assert_eq!(screen.pixels().get_pixel(5, 5).0, [255, 255, 255, 255]);
}

#[test]
fn test_hidden_layers_are_not_exported() {
    let mut doc = inch_document();
    let hidden = doc.add_layer("Hidden");
    let mut blue = RectangleObject::new(rect(65.0, 65.0, 20.0, 20.0));
    blue.base.fill = Color::rgb(0, 0, 255);
    let layer = doc.layer_mut(hidden).unwrap();
    layer.push(blue.into());
    layer.visible = false;

    let pixels = rasterize_document(&doc, 96, 96).unwrap().into_pixels();
    assert_eq!(pixels.get_pixel(75, 75).0[3], 0);
}

#[test]
fn test_text_is_collected_as_runs() {
    let mut doc = inch_document();
    doc.active_layer_mut()
        .push(TextObject::new(pos2(5.0, 70.0), "Caption").into());

    let surface = rasterize_document(&doc, 192, 192).unwrap();
    let runs = surface.texts();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].text, "Caption");
    assert_eq!(runs[0].family, "Arial");
    assert_eq!(runs[0].pos, pos2(10.0, 140.0));
}

#[test]
fn test_export_png_file() {
    let doc = inch_document();
    let path = temp_file("png");
    export_document(&doc, 96, 96, &PngEncoder, &path).unwrap();

    let written = image::open(&path).unwrap().to_rgba8();
    assert_eq!(written.dimensions(), (96, 96));
    assert_eq!(written.get_pixel(30, 30).0, [255, 0, 0, 255]);
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_export_empty_target_fails() {
    let doc = inch_document();
    let path = temp_file("png");
    let result = export_document(&doc, 0, 96, &PngEncoder, &path);
    assert!(matches!(
        result,
        Err(ExportError::EmptyTarget {
            width: 0,
            height: 96
        })
    ));
    assert!(!path.exists());
}
