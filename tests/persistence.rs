use std::path::PathBuf;

use egui::{Rect, pos2, vec2};
use figcraft::color::Color;
use figcraft::document::Document;
use figcraft::element::{
    CropRect, Element, ElementKind, GraphicObject, GroupObject, ImageObject, LineObject,
    RectangleObject, TextObject,
};
use figcraft::layer::DEFAULT_LAYER_NAME;
use figcraft::persistence::{
    PersistenceError, ProjectData, from_json, load_project, save_project, to_json,
};
use image::{GrayImage, Luma, Rgba, RgbaImage};

fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
    Rect::from_min_size(pos2(x, y), vec2(w, h))
}

fn temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("figcraft-test-{}.json", uuid::Uuid::new_v4()))
}

// A document with one of every object kind spread over two layers
fn create_sample_document() -> Document {
    let mut doc = Document::new("Figure 3");
    doc.set_width_mm(120.0);
    doc.set_height_mm(80.0);

    let mut rectangle = RectangleObject::new(rect(10.0, 20.0, 30.0, 40.0));
    rectangle.base.rotation = 15.0;
    rectangle.base.fill = Color::argb(0x80, 0x12, 0x34, 0x56);
    doc.active_layer_mut().push(rectangle.into());

    let mut line = LineObject::new(pos2(0.0, 0.0), pos2(50.0, 25.0));
    line.arrow_end = true;
    doc.active_layer_mut().push(line.into());

    let group = GroupObject::new(vec![
        RectangleObject::new(rect(0.0, 0.0, 5.0, 5.0)).into(),
        TextObject::new(pos2(10.0, 10.0), "label").into(),
    ]);

    let top = doc.add_layer("Annotations");
    let layer = doc.layer_mut(top).unwrap();
    layer.opacity = 0.5;
    layer.locked = true;
    layer.push(group.into());
    doc
}

#[test]
fn test_round_trip_keeps_content() {
    let doc = create_sample_document();
    let json = to_json(&doc).unwrap();
    let loaded = from_json(&json).unwrap();

    assert_eq!(loaded.title, "Figure 3");
    assert_eq!(loaded.width_mm(), 120.0);
    assert_eq!(loaded.height_mm(), 80.0);
    assert_eq!(loaded.layers.len(), 2);
    assert_eq!(loaded.layers[1].name, "Annotations");
    assert_eq!(loaded.layers[1].opacity, 0.5);
    assert!(loaded.layers[1].locked);
    assert_eq!(loaded.layers[0].id, doc.layers[0].id);

    let kinds: Vec<ElementKind> = loaded.objects().map(|o| o.element_type()).collect();
    assert_eq!(
        kinds,
        vec![ElementKind::Rectangle, ElementKind::Line, ElementKind::Group]
    );

    let rectangle = loaded.layers[0].objects[0].base();
    assert_eq!(rectangle.rect(), rect(10.0, 20.0, 30.0, 40.0));
    assert_eq!(rectangle.rotation, 15.0);
    assert_eq!(rectangle.fill, Color::argb(0x80, 0x12, 0x34, 0x56));

    let line = loaded.layers[0].objects[1].as_line().unwrap();
    assert_eq!(line.end(), pos2(50.0, 25.0));
    assert!(line.arrow_end);
    assert!(!line.arrow_start);

    let group = loaded.layers[1].objects[0].as_group().unwrap();
    assert_eq!(group.children.len(), 2);
    match &group.children[1] {
        GraphicObject::Text(text) => assert_eq!(text.text, "label"),
        other => panic!("expected text, got {other:?}"),
    }

    // ids are session state, so a second save is byte-identical
    assert_eq!(to_json(&loaded).unwrap(), json);
}

#[test]
fn test_loaded_objects_get_fresh_ids() {
    let doc = create_sample_document();
    let loaded = from_json(&to_json(&doc).unwrap()).unwrap();
    for object in loaded.objects() {
        assert!(doc.find_object(object.id()).is_none());
    }
}

#[test]
fn test_selection_is_not_saved() {
    let mut doc = create_sample_document();
    doc.layers[0].objects[0].set_selected(true);
    let loaded = from_json(&to_json(&doc).unwrap()).unwrap();
    assert!(loaded.objects().all(|o| !o.is_selected()));
}

#[test]
fn test_image_data_round_trip() {
    let mut pixels = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]));
    pixels.put_pixel(1, 1, Rgba([200, 100, 0, 128]));
    let mut image = ImageObject::new(pixels.clone(), pos2(5.0, 5.0));
    image.set_crop(CropRect::new(1.0, 0.0, 2.0, 3.0));
    image.set_grayscale(true);
    let mut mask = GrayImage::from_pixel(4, 3, Luma([255]));
    mask.put_pixel(0, 0, Luma([0]));
    image.set_erase_mask(Some(mask.clone()));

    let mut doc = Document::default();
    doc.active_layer_mut().push(image.into());
    let loaded = from_json(&to_json(&doc).unwrap()).unwrap();

    let image = loaded.objects().next().unwrap().as_image().unwrap();
    assert_eq!(image.pixels(), &pixels);
    assert_eq!(image.crop(), CropRect::new(1.0, 0.0, 2.0, 3.0));
    assert!(image.grayscale());
    assert_eq!(image.erase_mask(), Some(&mask));
}

#[test]
fn test_legacy_object_list_becomes_one_layer() {
    let json = r##"{
        "title": "Old figure",
        "widthMm": 100,
        "heightMm": 50,
        "graphicObjects": [
            { "type": "Rectangle", "x": 1, "y": 2, "width": 3, "height": 4, "fillColor": "#ffff0000" },
            { "type": "Ellipse", "x": 5, "y": 5, "width": 10, "height": 10 }
        ]
    }"##;
    let doc = from_json(json).unwrap();

    assert_eq!(doc.layers.len(), 1);
    assert_eq!(doc.layers[0].name, DEFAULT_LAYER_NAME);
    assert_eq!(doc.layers[0].objects.len(), 2);
    assert_eq!(doc.active_layer_id(), doc.layers[0].id);
    assert_eq!(doc.layers[0].objects[0].base().fill, Color::rgb(255, 0, 0));

    // saving writes the layered form only
    let saved = to_json(&doc).unwrap();
    let data: ProjectData = serde_json::from_str(&saved).unwrap();
    assert!(data.graphic_objects.is_none());
    assert_eq!(data.layers.len(), 1);
}

#[test]
fn test_layers_win_over_legacy_list() {
    let mut data = ProjectData {
        graphic_objects: Some(vec![RectangleObject::new(rect(0.0, 0.0, 1.0, 1.0)).into()]),
        layers: vec![figcraft::layer::Layer::new("Kept")],
        ..ProjectData::default()
    };
    data.ensure_layer_compatibility();
    assert!(data.graphic_objects.is_none());
    assert_eq!(data.layers.len(), 1);
    assert!(data.layers[0].objects.is_empty());
}

#[test]
fn test_malformed_colors_load_as_transparent() {
    let json = r##"{
        "layers": [{
            "name": "L",
            "graphicObjects": [
                { "type": "Rectangle", "width": 3, "height": 4, "fillColor": "bogus", "strokeColor": 42 }
            ]
        }]
    }"##;
    let doc = from_json(json).unwrap();
    let base = doc.objects().next().unwrap().base();
    assert_eq!(base.fill, Color::TRANSPARENT);
    assert_eq!(base.stroke, Color::TRANSPARENT);
}

#[test]
fn test_missing_fields_take_defaults() {
    let doc = from_json("{}").unwrap();
    assert_eq!(doc.title, "Untitled");
    assert_eq!(doc.width_mm(), 210.0);
    assert_eq!(doc.height_mm(), 297.0);
    assert_eq!(doc.layers.len(), 1);

    let json = r#"{ "layers": [{ "graphicObjects": [{ "type": "Text", "x": 5, "y": 6 }] }] }"#;
    let doc = from_json(json).unwrap();
    let layer = &doc.layers[0];
    assert!(layer.visible);
    assert!(!layer.locked);
    assert_eq!(layer.opacity, 1.0);
    match &layer.objects[0] {
        GraphicObject::Text(text) => {
            assert_eq!(text.text, "Text");
            assert_eq!(text.font_family, "Arial");
            assert_eq!(text.font_size, 24.0);
            assert_eq!(text.base.opacity, 1.0);
            assert_eq!(text.base.position(), pos2(5.0, 6.0));
        }
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn test_page_size_is_clamped() {
    let doc = from_json(r#"{ "widthMm": 0, "heightMm": 99999 }"#).unwrap();
    assert_eq!(doc.width_mm(), 1.0);
    assert_eq!(doc.height_mm(), 4000.0);
}

#[test]
fn test_save_and_load_file() {
    let doc = create_sample_document();
    let path = temp_path();
    save_project(&path, &doc).unwrap();

    let loaded = load_project(&path).unwrap();
    assert_eq!(loaded.title, doc.title);
    assert_eq!(loaded.objects().count(), 3);
    assert_eq!(to_json(&loaded).unwrap(), to_json(&doc).unwrap());

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_missing_file_is_read_error() {
    let result = load_project(&temp_path());
    assert!(matches!(result, Err(PersistenceError::ReadError(_))));
}

#[test]
fn test_invalid_json_is_error() {
    assert!(matches!(
        from_json("not json at all"),
        Err(PersistenceError::SerializationError(_))
    ));
    // a bad object tag fails the document rather than dropping the object
    let json = r#"{ "layers": [{ "graphicObjects": [{ "type": "Star" }] }] }"#;
    assert!(from_json(json).is_err());
}
