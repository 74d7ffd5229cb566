use egui::{Pos2, Rect, pos2, vec2};
use figcraft::document::Document;
use figcraft::editor::Editor;
use figcraft::element::{
    CropRect, DEFAULT_TEXT, Element, ElementKind, GraphicObject, GroupObject, ImageObject,
    LineObject, RectangleObject,
};
use figcraft::id_generator::ObjectId;
use figcraft::interaction::{InteractionController, InteractionState, PointerEvent, Tool};
use image::{Rgba, RgbaImage};

fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
    Rect::from_min_size(pos2(x, y), vec2(w, h))
}

fn editor_with(objects: Vec<GraphicObject>) -> (Editor, Vec<ObjectId>) {
    let mut doc = Document::default();
    let ids = objects.iter().map(|o| o.id()).collect();
    for object in objects {
        doc.active_layer_mut().push(object);
    }
    (Editor::new(doc), ids)
}

fn rectangle(x: f32, y: f32, w: f32, h: f32) -> GraphicObject {
    RectangleObject::new(rect(x, y, w, h)).into()
}

// Press, move through `path`, release at the last point
fn drag(controller: &mut InteractionController, editor: &mut Editor, from: Pos2, path: &[Pos2]) {
    controller.pointer_down(editor, PointerEvent::new(from));
    for point in path {
        controller.pointer_move(editor, PointerEvent::new(*point));
    }
    let end = path.last().copied().unwrap_or(from);
    controller.pointer_up(editor, PointerEvent::new(end));
}

fn bounds_of(editor: &Editor, id: ObjectId) -> Rect {
    editor.document().find_object(id).unwrap().bounds()
}

#[test]
fn test_draw_rectangle_commits_one_command() {
    let (mut editor, _) = editor_with(Vec::new());
    let mut controller = InteractionController::new();
    editor.set_tool(Tool::Rectangle);

    controller.pointer_down(&mut editor, PointerEvent::new(pos2(60.0, 40.0)));
    controller.pointer_move(&mut editor, PointerEvent::new(pos2(10.0, 10.0)));
    let preview = controller.preview();
    assert_eq!(preview.object.unwrap().bounds(), rect(10.0, 10.0, 50.0, 30.0));
    // nothing is in the document until release
    assert_eq!(editor.document().objects().count(), 0);

    controller.pointer_up(&mut editor, PointerEvent::new(pos2(10.0, 10.0)));
    assert!(controller.state().is_idle());

    let object = editor.document().objects().next().unwrap();
    assert_eq!(object.element_type(), ElementKind::Rectangle);
    assert_eq!(object.bounds(), rect(10.0, 10.0, 50.0, 30.0));
    assert_eq!(object.base().fill.a, 255);
    assert_eq!(editor.selection().last(), Some(object.id()));
    assert_eq!(editor.history().undo_len(), 1);

    editor.undo().unwrap();
    assert_eq!(editor.document().objects().count(), 0);
}

#[test]
fn test_zero_size_shape_is_dropped() {
    let (mut editor, _) = editor_with(Vec::new());
    let mut controller = InteractionController::new();
    editor.set_tool(Tool::Ellipse);

    drag(&mut controller, &mut editor, pos2(10.0, 10.0), &[pos2(10.0, 40.0)]);
    assert_eq!(editor.document().objects().count(), 0);
    assert!(!editor.history().can_undo());
}

#[test]
fn test_draw_line() {
    let (mut editor, _) = editor_with(Vec::new());
    let mut controller = InteractionController::new();
    editor.set_tool(Tool::Line);

    drag(&mut controller, &mut editor, pos2(5.0, 5.0), &[pos2(50.0, 80.0)]);
    let line = editor.document().objects().next().unwrap().as_line().unwrap();
    assert_eq!(line.start(), pos2(5.0, 5.0));
    assert_eq!(line.end(), pos2(50.0, 80.0));
}

#[test]
fn test_drawing_on_locked_layer_is_ignored() {
    let (mut editor, _) = editor_with(Vec::new());
    let mut controller = InteractionController::new();
    editor.document_mut().active_layer_mut().locked = true;
    editor.set_tool(Tool::Rectangle);

    drag(&mut controller, &mut editor, pos2(0.0, 0.0), &[pos2(40.0, 40.0)]);
    assert_eq!(editor.document().objects().count(), 0);
}

#[test]
fn test_drag_records_single_move() {
    let (mut editor, ids) = editor_with(vec![rectangle(10.0, 10.0, 40.0, 40.0)]);
    let mut controller = InteractionController::new();

    drag(
        &mut controller,
        &mut editor,
        pos2(20.0, 20.0),
        &[pos2(25.0, 30.0), pos2(30.0, 35.0)],
    );
    assert_eq!(bounds_of(&editor, ids[0]).min, pos2(20.0, 25.0));
    assert_eq!(editor.history().undo_len(), 1);
    assert_eq!(editor.history().undo_label().as_deref(), Some("Move"));

    editor.undo().unwrap();
    assert_eq!(bounds_of(&editor, ids[0]).min, pos2(10.0, 10.0));
}

#[test]
fn test_click_without_movement_records_nothing() {
    let (mut editor, ids) = editor_with(vec![rectangle(10.0, 10.0, 40.0, 40.0)]);
    let mut controller = InteractionController::new();

    drag(&mut controller, &mut editor, pos2(20.0, 20.0), &[]);
    assert!(!editor.history().can_undo());
    assert_eq!(editor.selection().ids(), &[ids[0]]);
}

#[test]
fn test_multi_selection_drags_together() {
    let (mut editor, ids) = editor_with(vec![
        rectangle(0.0, 0.0, 20.0, 20.0),
        rectangle(100.0, 0.0, 20.0, 20.0),
    ]);
    let mut controller = InteractionController::new();
    editor.select_many(ids.clone());

    drag(&mut controller, &mut editor, pos2(10.0, 10.0), &[pos2(15.0, 30.0)]);
    assert_eq!(editor.selection().len(), 2);
    assert_eq!(bounds_of(&editor, ids[0]).min, pos2(5.0, 20.0));
    assert_eq!(bounds_of(&editor, ids[1]).min, pos2(105.0, 20.0));

    // both move back in one step
    editor.undo().unwrap();
    assert_eq!(bounds_of(&editor, ids[0]).min, pos2(0.0, 0.0));
    assert_eq!(bounds_of(&editor, ids[1]).min, pos2(100.0, 0.0));
    assert!(!editor.history().can_undo());
}

#[test]
fn test_shift_click_toggles() {
    let (mut editor, ids) = editor_with(vec![
        rectangle(0.0, 0.0, 20.0, 20.0),
        rectangle(100.0, 0.0, 20.0, 20.0),
    ]);
    let mut controller = InteractionController::new();

    controller.pointer_down(&mut editor, PointerEvent::new(pos2(10.0, 10.0)));
    controller.pointer_up(&mut editor, PointerEvent::new(pos2(10.0, 10.0)));
    controller.pointer_down(&mut editor, PointerEvent::with_shift(pos2(110.0, 10.0)));
    controller.pointer_up(&mut editor, PointerEvent::with_shift(pos2(110.0, 10.0)));
    assert_eq!(editor.selection().ids(), &[ids[0], ids[1]]);
    assert_eq!(editor.selection().last(), Some(ids[1]));

    controller.pointer_down(&mut editor, PointerEvent::with_shift(pos2(110.0, 10.0)));
    controller.pointer_up(&mut editor, PointerEvent::with_shift(pos2(110.0, 10.0)));
    assert_eq!(editor.selection().ids(), &[ids[0]]);
    assert_eq!(editor.selection().last(), Some(ids[0]));
}

#[test]
fn test_topmost_object_wins() {
    let (mut editor, ids) = editor_with(vec![
        rectangle(0.0, 0.0, 50.0, 50.0),
        rectangle(20.0, 20.0, 50.0, 50.0),
    ]);
    let mut controller = InteractionController::new();

    drag(&mut controller, &mut editor, pos2(30.0, 30.0), &[]);
    assert_eq!(editor.selection().last(), Some(ids[1]));
}

#[test]
fn test_range_select_takes_fully_contained_objects() {
    let (mut editor, ids) = editor_with(vec![
        rectangle(10.0, 10.0, 20.0, 20.0),
        rectangle(40.0, 40.0, 30.0, 30.0),
        rectangle(300.0, 300.0, 20.0, 20.0),
    ]);
    let mut controller = InteractionController::new();

    controller.pointer_down(&mut editor, PointerEvent::new(pos2(0.0, 0.0)));
    controller.pointer_move(&mut editor, PointerEvent::new(pos2(60.0, 60.0)));
    assert_eq!(controller.preview().marquee, Some(rect(0.0, 0.0, 60.0, 60.0)));
    controller.pointer_move(&mut editor, PointerEvent::new(pos2(80.0, 80.0)));
    controller.pointer_up(&mut editor, PointerEvent::new(pos2(80.0, 80.0)));

    assert_eq!(editor.selection().ids(), &[ids[0], ids[1]]);
    assert!(editor.document().find_object(ids[1]).unwrap().is_selected());
    assert!(!editor.document().find_object(ids[2]).unwrap().is_selected());
    assert!(!editor.history().can_undo());
}

#[test]
fn test_range_select_skips_locked_layers() {
    let (mut editor, ids) = editor_with(vec![rectangle(10.0, 10.0, 20.0, 20.0)]);
    let mut controller = InteractionController::new();
    let locked = editor.document().active_layer_id();
    editor.document_mut().layer_mut(locked).unwrap().locked = true;

    drag(&mut controller, &mut editor, pos2(0.0, 0.0), &[pos2(100.0, 100.0)]);
    assert!(editor.selection().is_empty());
    assert!(!editor.document().find_object(ids[0]).unwrap().is_selected());
}

#[test]
fn test_resize_from_corner_handle() {
    let (mut editor, ids) = editor_with(vec![rectangle(0.0, 0.0, 100.0, 50.0)]);
    let mut controller = InteractionController::new();
    editor.select_single(Some(ids[0]));

    drag(&mut controller, &mut editor, pos2(100.0, 50.0), &[pos2(150.0, 100.0)]);
    assert_eq!(bounds_of(&editor, ids[0]), rect(0.0, 0.0, 150.0, 100.0));
    assert_eq!(editor.history().undo_label().as_deref(), Some("Resize"));

    editor.undo().unwrap();
    assert_eq!(bounds_of(&editor, ids[0]), rect(0.0, 0.0, 100.0, 50.0));
}

#[test]
fn test_shift_resize_keeps_aspect() {
    let (mut editor, ids) = editor_with(vec![rectangle(0.0, 0.0, 100.0, 50.0)]);
    let mut controller = InteractionController::new();
    editor.select_single(Some(ids[0]));

    controller.pointer_down(&mut editor, PointerEvent::new(pos2(100.0, 50.0)));
    controller.pointer_move(&mut editor, PointerEvent::with_shift(pos2(200.0, 60.0)));
    controller.pointer_up(&mut editor, PointerEvent::with_shift(pos2(200.0, 60.0)));
    assert_eq!(bounds_of(&editor, ids[0]), rect(0.0, 0.0, 200.0, 100.0));
}

#[test]
fn test_group_resize_scales_children() {
    let group: GraphicObject = GroupObject::new(vec![
        rectangle(0.0, 0.0, 10.0, 10.0),
        rectangle(40.0, 40.0, 10.0, 10.0),
    ])
    .into();
    let (mut editor, ids) = editor_with(vec![group]);
    let mut controller = InteractionController::new();
    editor.select_single(Some(ids[0]));

    drag(
        &mut controller,
        &mut editor,
        pos2(50.0, 50.0),
        &[pos2(80.0, 80.0), pos2(100.0, 100.0)],
    );
    let group = editor.document().find_object(ids[0]).unwrap().as_group().unwrap();
    assert_eq!(group.children[0].bounds(), rect(0.0, 0.0, 20.0, 20.0));
    assert_eq!(group.children[1].bounds(), rect(80.0, 80.0, 20.0, 20.0));

    editor.undo().unwrap();
    let group = editor.document().find_object(ids[0]).unwrap().as_group().unwrap();
    assert_eq!(group.children[1].bounds(), rect(40.0, 40.0, 10.0, 10.0));
}

#[test]
fn test_line_handle_moves_one_endpoint() {
    let line: GraphicObject = LineObject::new(pos2(0.0, 0.0), pos2(100.0, 0.0)).into();
    let (mut editor, ids) = editor_with(vec![line]);
    let mut controller = InteractionController::new();
    editor.select_single(Some(ids[0]));

    drag(&mut controller, &mut editor, pos2(100.0, 0.0), &[pos2(100.0, 50.0)]);
    let line = editor.document().find_object(ids[0]).unwrap().as_line().unwrap();
    assert_eq!(line.start(), pos2(0.0, 0.0));
    assert_eq!(line.end(), pos2(100.0, 50.0));
    assert_eq!(editor.history().undo_label().as_deref(), Some("Move Line End"));

    editor.undo().unwrap();
    let line = editor.document().find_object(ids[0]).unwrap().as_line().unwrap();
    assert_eq!(line.end(), pos2(100.0, 0.0));
}

#[test]
fn test_text_tool_places_text_and_returns_to_select() {
    let (mut editor, _) = editor_with(Vec::new());
    let mut controller = InteractionController::new();
    editor.set_tool(Tool::Text);

    controller.pointer_down(&mut editor, PointerEvent::new(pos2(30.0, 40.0)));
    controller.pointer_up(&mut editor, PointerEvent::new(pos2(30.0, 40.0)));

    assert_eq!(editor.tool(), Tool::Select);
    let object = editor.document().objects().next().unwrap();
    assert_eq!(object.element_type(), ElementKind::Text);
    assert_eq!(object.position(), pos2(30.0, 40.0));
    match object {
        GraphicObject::Text(text) => assert_eq!(text.text, DEFAULT_TEXT),
        other => panic!("expected text, got {other:?}"),
    }

    editor.undo().unwrap();
    assert_eq!(editor.document().objects().count(), 0);
}

fn image_100() -> GraphicObject {
    let mut pixels = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 255, 255]));
    pixels.put_pixel(10, 10, Rgba([255, 0, 0, 255]));
    ImageObject::new(pixels, pos2(0.0, 0.0)).into()
}

#[test]
fn test_crop_gesture_is_one_undo_step() {
    let (mut editor, ids) = editor_with(vec![image_100()]);
    let mut controller = InteractionController::new();
    editor.set_tool(Tool::Crop);

    // first click picks the image
    drag(&mut controller, &mut editor, pos2(50.0, 50.0), &[]);
    assert_eq!(editor.selection().last(), Some(ids[0]));

    controller.pointer_down(&mut editor, PointerEvent::new(pos2(0.0, 0.0)));
    assert!(matches!(controller.state(), InteractionState::Cropping { .. }));
    controller.pointer_move(&mut editor, PointerEvent::new(pos2(5.0, 5.0)));
    controller.pointer_up(&mut editor, PointerEvent::new(pos2(10.0, 10.0)));

    let image = editor.document().find_object(ids[0]).unwrap().as_image().unwrap();
    assert_eq!(image.source_size(), (90, 90));
    assert_eq!(image.crop(), CropRect::full(90, 90));
    assert_eq!(image.bounds(), Rect::from_min_max(pos2(10.0, 10.0), pos2(100.0, 100.0)));
    // the old (10, 10) pixel is now the top-left one
    assert_eq!(image.pixels().get_pixel(0, 0).0, [255, 0, 0, 255]);
    assert_eq!(editor.history().undo_len(), 1);

    editor.undo().unwrap();
    let image = editor.document().find_object(ids[0]).unwrap().as_image().unwrap();
    assert_eq!(image.source_size(), (100, 100));
    assert_eq!(image.crop(), CropRect::full(100, 100));
    assert_eq!(image.bounds(), rect(0.0, 0.0, 100.0, 100.0));
}

#[test]
fn test_erase_stroke_is_undoable() {
    let (mut editor, ids) = editor_with(vec![image_100()]);
    let mut controller = InteractionController::new();
    editor.set_tool(Tool::Erase);

    drag(
        &mut controller,
        &mut editor,
        pos2(50.0, 50.0),
        &[pos2(55.0, 50.0), pos2(60.0, 50.0)],
    );
    let alpha_at = |editor: &Editor, x: u32, y: u32| {
        let image = editor.document().find_object(ids[0]).unwrap().as_image().unwrap();
        image.rendered_pixels().get_pixel(x, y).0[3]
    };
    assert_eq!(alpha_at(&editor, 50, 50), 0);
    assert_eq!(alpha_at(&editor, 60, 50), 0);
    assert_eq!(editor.history().undo_label().as_deref(), Some("Erase"));

    editor.undo().unwrap();
    assert_eq!(alpha_at(&editor, 50, 50), 255);
    editor.redo().unwrap();
    assert_eq!(alpha_at(&editor, 55, 50), 0);
}

#[test]
fn test_cancel_restores_drag_origin() {
    let (mut editor, ids) = editor_with(vec![rectangle(10.0, 10.0, 40.0, 40.0)]);
    let mut controller = InteractionController::new();

    controller.pointer_down(&mut editor, PointerEvent::new(pos2(20.0, 20.0)));
    controller.pointer_move(&mut editor, PointerEvent::new(pos2(80.0, 90.0)));
    assert_eq!(bounds_of(&editor, ids[0]).min, pos2(70.0, 80.0));

    controller.cancel(&mut editor);
    assert!(controller.state().is_idle());
    assert_eq!(bounds_of(&editor, ids[0]).min, pos2(10.0, 10.0));
    assert!(!editor.history().can_undo());
}

#[test]
fn test_handle_takes_priority_over_objects() {
    // the second rectangle covers the first one's bottom-right handle
    let (mut editor, ids) = editor_with(vec![
        rectangle(0.0, 0.0, 50.0, 50.0),
        rectangle(45.0, 45.0, 50.0, 50.0),
    ]);
    let mut controller = InteractionController::new();
    editor.select_single(Some(ids[0]));

    controller.pointer_down(&mut editor, PointerEvent::new(pos2(50.0, 50.0)));
    assert!(matches!(
        controller.state(),
        InteractionState::Resizing { handle: 2, .. }
    ));
    controller.cancel(&mut editor);
}
