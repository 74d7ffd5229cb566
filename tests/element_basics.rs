use egui::{Rect, pos2, vec2};
use figcraft::color::Color;
use figcraft::element::{
    CropRect, Element, ElementKind, EllipseObject, GraphicObject, GroupObject, ImageObject,
    LineObject, PropertyError, PropertyKey, PropertyValue, RectangleObject, TextObject,
};
use figcraft::geometry::rotate_point;
use image::{Rgba, RgbaImage};

fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
    Rect::from_min_size(pos2(x, y), vec2(w, h))
}

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.001
}

// Opaque image filled with one color
fn solid_image(width: u32, height: u32, color: [u8; 4]) -> ImageObject {
    ImageObject::new(RgbaImage::from_pixel(width, height, Rgba(color)), pos2(0.0, 0.0))
}

#[test]
fn test_rectangle_hit_test() {
    let shape = RectangleObject::new(rect(10.0, 10.0, 100.0, 50.0));
    assert!(shape.hit_test(pos2(50.0, 30.0)));
    assert!(shape.hit_test(pos2(10.0, 10.0)));
    assert!(!shape.hit_test(pos2(5.0, 30.0)));
    assert!(!shape.hit_test(pos2(50.0, 61.0)));
}

#[test]
fn test_ellipse_hit_test_excludes_corners() {
    let shape = EllipseObject::new(rect(0.0, 0.0, 100.0, 50.0));
    assert!(shape.hit_test(pos2(50.0, 25.0)));
    assert!(!shape.hit_test(pos2(2.0, 2.0)));

    // zero size never hits and never panics
    let flat = EllipseObject::new(rect(0.0, 0.0, 0.0, 50.0));
    assert!(!flat.hit_test(pos2(0.0, 25.0)));
}

#[test]
fn test_line_hit_tolerance() {
    let line = LineObject::new(pos2(0.0, 0.0), pos2(100.0, 0.0));
    assert!(line.hit_test(pos2(50.0, 4.0)));
    assert!(!line.hit_test(pos2(50.0, 6.0)));
    // beyond the end the distance is measured to the endpoint
    assert!(!line.hit_test(pos2(106.0, 0.0)));

    let mut thick = LineObject::new(pos2(0.0, 0.0), pos2(100.0, 0.0));
    thick.base.stroke_width = 12.0;
    assert!(thick.hit_test(pos2(50.0, 7.5)));
}

#[test]
fn test_zero_length_line_uses_box() {
    let dot = LineObject::new(pos2(10.0, 10.0), pos2(10.0, 10.0));
    assert!(dot.hit_test(pos2(14.0, 13.0)));
    assert!(!dot.hit_test(pos2(16.0, 10.0)));
    assert_eq!(dot.length(), 0.0);
}

#[test]
fn test_rotated_hit_test_agrees_with_unrotated() {
    let shapes: Vec<GraphicObject> = vec![
        RectangleObject::new(rect(0.0, 0.0, 100.0, 20.0)).into(),
        EllipseObject::new(rect(0.0, 0.0, 100.0, 20.0)).into(),
        TextObject::new(pos2(0.0, 0.0), "Rotated").into(),
    ];
    let points = [
        pos2(90.0, 10.0),
        pos2(50.0, 10.0),
        pos2(5.0, 5.0),
        pos2(50.0, 40.0),
        pos2(120.0, 10.0),
    ];
    for shape in shapes {
        for angle in [30.0, 90.0, 215.0] {
            let mut rotated = shape.clone();
            rotated.base_mut().rotation = angle;
            let center = shape.center();
            for point in points {
                let turned = rotate_point(point, center, angle);
                assert_eq!(
                    rotated.hit_test(turned),
                    shape.hit_test(point),
                    "{:?} at {angle} degrees, point {point:?}",
                    shape.element_type()
                );
            }
        }
    }
}

#[test]
fn test_text_measures_its_box() {
    let text = TextObject::new(pos2(5.0, 5.0), "Hello");
    let bounds = text.bounds();
    assert!(approx_eq(bounds.width(), 5.0 * 24.0 * 0.6));
    assert!(approx_eq(bounds.height(), 24.0));

    let two_lines = TextObject::new(pos2(0.0, 0.0), "ab\nabcd");
    let (width, height) = two_lines.measure();
    assert!(approx_eq(width, 4.0 * 24.0 * 0.6));
    assert!(approx_eq(height, 48.0));
}

#[test]
fn test_clone_keeps_identity_duplicate_does_not() {
    let shape: GraphicObject = RectangleObject::new(rect(0.0, 0.0, 10.0, 10.0)).into();
    let clone = shape.clone();
    assert_eq!(clone.id(), shape.id());

    let mut copy = shape.duplicate();
    assert_ne!(copy.id(), shape.id());
    copy.translate(vec2(5.0, 5.0));
    copy.base_mut().fill = Color::WHITE;
    assert_eq!(shape.position(), pos2(0.0, 0.0));
    assert_eq!(shape.base().fill, Color::BLUE);
}

#[test]
fn test_duplicate_group_gets_fresh_child_ids() {
    let children: Vec<GraphicObject> = vec![
        RectangleObject::new(rect(0.0, 0.0, 10.0, 10.0)).into(),
        GroupObject::new(vec![EllipseObject::new(rect(20.0, 0.0, 10.0, 10.0)).into()]).into(),
    ];
    let group: GraphicObject = GroupObject::new(children).into();
    let copy = group.duplicate();

    let original = group.as_group().unwrap();
    let duplicated = copy.as_group().unwrap();
    assert_ne!(duplicated.children[0].id(), original.children[0].id());
    let nested_original = original.children[1].as_group().unwrap();
    let nested_copy = duplicated.children[1].as_group().unwrap();
    assert_ne!(nested_copy.children[0].id(), nested_original.children[0].id());
    assert_eq!(copy.bounds(), group.bounds());
}

#[test]
fn test_duplicate_image_owns_its_pixels() {
    let image: GraphicObject = solid_image(20, 20, [255, 0, 0, 255]).into();
    let mut copy = image.duplicate();
    let copy_image = copy.as_image_mut().unwrap();
    assert!(copy_image.erase_at(pos2(10.0, 10.0), 3.0));

    let original = image.as_image().unwrap();
    assert!(original.erase_mask().is_none());
    assert_eq!(original.rendered_pixels().get_pixel(10, 10).0[3], 255);
}

#[test]
fn test_group_bounds_include_line_endpoints() {
    let line = LineObject::new(pos2(50.0, 60.0), pos2(-10.0, 5.0));
    let shape = RectangleObject::new(rect(0.0, 0.0, 20.0, 20.0));
    let group = GroupObject::new(vec![line.into(), shape.into()]);
    assert_eq!(group.bounds(), Rect::from_min_max(pos2(-10.0, 0.0), pos2(50.0, 60.0)));
    assert_eq!(group.base.position(), pos2(-10.0, 0.0));
}

#[test]
fn test_group_translate_moves_descendants() {
    let inner = GroupObject::new(vec![RectangleObject::new(rect(0.0, 0.0, 10.0, 10.0)).into()]);
    let line = LineObject::new(pos2(0.0, 0.0), pos2(10.0, 10.0));
    let mut group: GraphicObject = GroupObject::new(vec![inner.into(), line.into()]).into();

    group.translate(vec2(5.0, -5.0));
    let children = &group.as_group().unwrap().children;
    assert_eq!(children[0].as_group().unwrap().children[0].position(), pos2(5.0, -5.0));
    assert_eq!(children[1].as_line().unwrap().end(), pos2(15.0, 5.0));
    assert_eq!(group.position(), pos2(5.0, -5.0));
}

#[test]
fn test_group_hit_test_is_per_child() {
    let group = GroupObject::new(vec![
        RectangleObject::new(rect(0.0, 0.0, 10.0, 10.0)).into(),
        RectangleObject::new(rect(50.0, 50.0, 10.0, 10.0)).into(),
    ]);
    assert!(group.hit_test(pos2(5.0, 5.0)));
    assert!(group.hit_test(pos2(55.0, 55.0)));
    // inside the union but between the children
    assert!(!group.hit_test(pos2(30.0, 30.0)));
}

#[test]
fn test_grayscale_propagates_to_descendants() {
    let nested = GroupObject::new(vec![solid_image(2, 2, [255, 0, 0, 255]).into()]);
    let green = solid_image(2, 2, [0, 255, 0, 255]);
    let mut group = GroupObject::new(vec![green.into(), nested.into()]);
    group.set_grayscale(true);

    assert!(group.children[0].as_image().unwrap().grayscale());
    let nested = group.children[1].as_group().unwrap();
    assert!(nested.grayscale);
    assert!(nested.children[0].as_image().unwrap().grayscale());
    assert!(group.contains_kind(ElementKind::Image));
    assert!(!group.contains_kind(ElementKind::Text));
}

#[test]
fn test_image_pixels_set_display_size() {
    let mut image = solid_image(40, 30, [0, 0, 0, 255]);
    assert_eq!(image.bounds(), rect(0.0, 0.0, 40.0, 30.0));
    assert_eq!(image.crop(), CropRect::full(40, 30));

    image.set_crop(CropRect::new(5.0, 5.0, 10.0, 10.0));
    let version = image.version();
    image.set_pixels(RgbaImage::new(8, 6));
    assert_eq!(image.bounds().size(), vec2(8.0, 6.0));
    assert_eq!(image.crop(), CropRect::full(8, 6));
    assert!(image.version() > version);
}

#[test]
fn test_rendered_pixels_follow_crop() {
    let mut pixels = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
    pixels.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
    let mut image = ImageObject::new(pixels, pos2(0.0, 0.0));
    image.set_crop(CropRect::new(1.0, 1.0, 2.0, 2.0));

    let rendered = image.rendered_pixels();
    assert_eq!(rendered.dimensions(), (2, 2));
    assert_eq!(rendered.get_pixel(0, 0).0, [255, 255, 255, 255]);
    assert_eq!(image.cropped_pixels(image.crop()).dimensions(), (2, 2));
}

#[test]
fn test_erase_clears_alpha_under_the_stamp() {
    let mut image = solid_image(20, 20, [10, 20, 30, 255]);
    assert!(image.erase_at(pos2(10.0, 10.0), 3.0));
    assert!(image.erase_mask().is_some());

    let rendered = image.rendered_pixels();
    assert_eq!(rendered.get_pixel(10, 10).0[3], 0);
    assert_eq!(rendered.get_pixel(0, 0).0[3], 255);

    // the same stamp again changes nothing
    assert!(!image.erase_at(pos2(10.0, 10.0), 3.0));
    // outside the image nothing is touched
    assert!(!image.erase_at(pos2(100.0, 100.0), 3.0));
}

#[test]
fn test_erase_radius_scales_with_display() {
    // 40x40 source shown at 20x20: one display pixel is two source pixels
    let mut image = solid_image(40, 40, [0, 0, 0, 255]);
    image.set_bounds(rect(0.0, 0.0, 20.0, 20.0));
    image.erase_at(pos2(10.0, 10.0), 2.0);

    let mask = image.erase_mask().unwrap();
    assert_eq!(mask.get_pixel(20, 20).0[0], 0);
    assert_eq!(mask.get_pixel(23, 20).0[0], 0);
    assert_eq!(mask.get_pixel(26, 20).0[0], 255);
}

#[test]
fn test_grayscale_and_opacity_filter() {
    let mut image = solid_image(1, 1, [255, 0, 0, 255]);
    assert!(image.color_filter().is_identity());

    image.set_grayscale(true);
    image.base.opacity = 0.5;
    let pixel = image.rendered_pixels().get_pixel(0, 0).0;
    assert_eq!(pixel[0], pixel[1]);
    assert_eq!(pixel[1], pixel[2]);
    assert_eq!(pixel[0], 54);
    assert_eq!(pixel[3], 128);
    assert_ne!(image.render_key(), solid_image(1, 1, [255, 0, 0, 255]).render_key());
}

#[test]
fn test_set_bounds_normalizes_inverted_rect() {
    let mut shape = RectangleObject::new(rect(0.0, 0.0, 10.0, 10.0));
    shape.set_bounds(Rect::from_min_max(pos2(30.0, 40.0), pos2(10.0, 20.0)));
    assert_eq!(shape.bounds(), rect(10.0, 20.0, 20.0, 20.0));
}

#[test]
fn test_typed_properties() {
    let mut shape: GraphicObject = RectangleObject::new(rect(0.0, 0.0, 10.0, 10.0)).into();

    let old = shape
        .set_property(PropertyKey::Opacity, &PropertyValue::Number(1.5))
        .unwrap();
    assert_eq!(old, PropertyValue::Number(1.0));
    assert_eq!(shape.base().opacity, 1.0);

    shape
        .set_property(PropertyKey::Width, &PropertyValue::Number(25.0))
        .unwrap();
    assert_eq!(shape.bounds().width(), 25.0);

    let unsupported = shape.set_property(PropertyKey::Text, &PropertyValue::Text("x".into()));
    assert!(matches!(unsupported, Err(PropertyError::Unsupported { .. })));

    let mismatch = shape.set_property(PropertyKey::Rotation, &PropertyValue::Flag(true));
    assert!(matches!(mismatch, Err(PropertyError::TypeMismatch { .. })));

    let mut text: GraphicObject = TextObject::new(pos2(0.0, 0.0), "a").into();
    text.set_property(PropertyKey::Text, &PropertyValue::Text("abcd".into()))
        .unwrap();
    assert!(approx_eq(text.bounds().width(), 4.0 * 24.0 * 0.6));
}
