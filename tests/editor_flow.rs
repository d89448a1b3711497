//! End-to-end flows through the public editor API: full pointer lifecycles,
//! mixed undo/redo sequences and the import pipeline.

use atelier::{
    BrushMode, CanvasView, Editor, HistoryLog, KeyCommand, PaperTexture, PointerInput, Tool,
};
use image::{Rgba, RgbaImage};

fn identity_view(w: u32, h: u32) -> CanvasView {
    CanvasView {
        center_x: w as f32 / 2.0,
        center_y: h as f32 / 2.0,
        width: w,
        height: h,
    }
}

fn select_preset(editor: &mut Editor, name: &str) {
    let id = editor
        .presets()
        .iter()
        .find(|p| p.name == name)
        .map(|p| p.id)
        .unwrap();
    editor.select_brush(id);
}

#[test]
fn straight_stroke_covers_the_expected_span() {
    let mut editor = Editor::new(800, 600);
    let v = identity_view(800, 600);
    select_preset(&mut editor, "Hard Round");
    editor.settings.size = 20.0;
    editor.settings.flow = 100.0;
    editor.settings.opacity = 100.0;
    editor.settings.stabilizer_enabled = false;

    editor.pointer_down(&PointerInput::pen(100.0, 300.0, 1.0), &v);
    editor.pointer_move(&PointerInput::pen(700.0, 300.0, 1.0), &v);
    editor.pointer_up(&PointerInput::pen(700.0, 300.0, 1.0), &v);

    let layer = editor.layers().active_id();
    let raster = editor.layers().raster(layer).unwrap();

    // Size 20 at spacing 0.1 places a stamp every 2 px from 100 to 700
    for x in [100u32, 250, 400, 550, 700] {
        assert!(raster.get_pixel(x, 300)[3] > 0, "no ink at x={x}");
    }
    // Full flow and pressure: the stroke center is effectively opaque
    assert!(raster.get_pixel(400, 300)[3] >= 250);
    // Well off the line stays clean
    assert_eq!(raster.get_pixel(400, 340)[3], 0);
    assert_eq!(editor.history().len(), 1);
}

#[test]
fn mixed_edit_session_unwinds_and_replays() {
    let mut editor = Editor::new(120, 120);
    let v = identity_view(120, 120);
    editor.settings.stabilizer_enabled = false;
    let base_layer = editor.layers().active_id();

    // Stroke on the base layer
    editor.pointer_down(&PointerInput::pen(20.0, 60.0, 0.9), &v);
    editor.pointer_move(&PointerInput::pen(100.0, 60.0, 0.9), &v);
    editor.pointer_up(&PointerInput::pen(100.0, 60.0, 0.9), &v);

    // New layer, stroke there, then delete it
    let second = editor.add_layer();
    editor.settings.color = [200, 0, 0];
    editor.pointer_down(&PointerInput::pen(60.0, 20.0, 0.9), &v);
    editor.pointer_move(&PointerInput::pen(60.0, 100.0, 0.9), &v);
    editor.pointer_up(&PointerInput::pen(60.0, 100.0, 0.9), &v);
    editor.delete_layer(second).unwrap();

    assert_eq!(editor.history().len(), 4);
    assert_eq!(editor.layers().layers().len(), 2);

    // Unwind everything
    for _ in 0..4 {
        editor.key_command(KeyCommand::Undo);
    }
    assert_eq!(editor.layers().layers().len(), 2);
    assert_eq!(
        editor.layers().raster(base_layer).unwrap().get_pixel(60, 60)[3],
        0
    );

    // Replay everything
    for _ in 0..4 {
        editor.key_command(KeyCommand::Redo);
    }
    assert_eq!(editor.layers().layers().len(), 2);
    assert!(editor.layers().raster(base_layer).unwrap().get_pixel(60, 60)[3] > 0);
}

#[test]
fn history_cap_holds_through_the_editor() {
    let mut editor = Editor::new(40, 40);
    editor.set_tool(Tool::Fill);
    let v = identity_view(40, 40);

    // Alternate fill colors so every action changes pixels
    for i in 0..31u16 {
        editor.settings.color = [(i % 2 * 200) as u8, (i / 2) as u8, 0];
        editor.pointer_down(&PointerInput::mouse(20.0, 20.0, true), &v);
        editor.pointer_up(&PointerInput::mouse(20.0, 20.0, true), &v);
    }
    assert_eq!(editor.history().len(), HistoryLog::CAPACITY);

    let mut undone = 0;
    while editor.history().can_undo() {
        editor.key_command(KeyCommand::Undo);
        undone += 1;
    }
    assert_eq!(undone, 30);
    // The evicted first fill survives the full unwind
    let layer = editor.layers().active_id();
    assert!(editor.layers().raster(layer).unwrap().get_pixel(20, 20)[3] > 0);
}

#[test]
fn import_pipeline_round_trips_through_undo() {
    let mut editor = Editor::new(64, 64);
    let photo = RgbaImage::from_pixel(32, 32, Rgba([40, 80, 120, 255]));
    let id = editor.place_image(&photo);

    assert_eq!(editor.layers().layers().len(), 3);
    assert_eq!(
        editor.layers().raster(id).unwrap().get_pixel(32, 32),
        Rgba([40, 80, 120, 255])
    );

    // Draw, then LayerAdd
    editor.key_command(KeyCommand::Undo);
    assert_eq!(editor.layers().raster(id).unwrap().get_pixel(32, 32)[3], 0);
    editor.key_command(KeyCommand::Undo);
    assert_eq!(editor.layers().layers().len(), 2);

    editor.key_command(KeyCommand::Redo);
    editor.key_command(KeyCommand::Redo);
    assert_eq!(editor.layers().layers().len(), 3);
    assert_eq!(
        editor.layers().raster(id).unwrap().get_pixel(32, 32),
        Rgba([40, 80, 120, 255])
    );
}

#[test]
fn cut_paste_moves_pixels_between_spots() {
    let mut editor = Editor::new(200, 200);
    let layer = editor.layers().active_id();
    {
        let raster = editor.layers_mut().raster_mut(layer).unwrap();
        for y in 10..40 {
            for x in 10..40 {
                raster.put_pixel(x, y, Rgba([1, 2, 3, 255]));
            }
        }
    }
    editor.set_tool(Tool::Select);
    let v = identity_view(200, 200);

    editor.pointer_down(&PointerInput::mouse(10.0, 10.0, true), &v);
    editor.pointer_move(&PointerInput::mouse(40.0, 40.0, true), &v);
    editor.pointer_up(&PointerInput::mouse(40.0, 40.0, true), &v);

    editor.key_command(KeyCommand::Cut);
    assert_eq!(editor.history().len(), 1);
    assert_eq!(editor.layers().raster(layer).unwrap().get_pixel(20, 20)[3], 0);

    editor.key_command(KeyCommand::Paste);
    editor.key_command(KeyCommand::Commit);
    // Pasted centered: the 30×30 block lands at (85,85)
    assert_eq!(
        editor.layers().raster(layer).unwrap().get_pixel(100, 100),
        Rgba([1, 2, 3, 255])
    );
    assert_eq!(editor.history().len(), 2);
}

#[test]
fn multiply_brush_darkens_the_layer_it_touches() {
    let mut editor = Editor::new(100, 100);
    let v = identity_view(100, 100);
    select_preset(&mut editor, "Watercolor");
    assert_eq!(editor.active_preset().mode, BrushMode::Stamp);
    editor.settings.color = [0, 0, 255];
    editor.settings.flow = 80.0;
    editor.settings.stabilizer_enabled = false;

    let layer = editor.layers().active_id();
    editor
        .layers_mut()
        .raster_mut(layer)
        .unwrap()
        .fill(Rgba([255, 200, 200, 255]));

    editor.pointer_down(&PointerInput::pen(20.0, 50.0, 0.9), &v);
    editor.pointer_move(&PointerInput::pen(80.0, 50.0, 0.9), &v);
    editor.pointer_up(&PointerInput::pen(80.0, 50.0, 0.9), &v);

    let px = editor.layers().raster(layer).unwrap().get_pixel(50, 50);
    // Blue multiplied into pink: red channel collapses
    assert!(px[0] < 255, "expected darkening, got {:?}", px);
    assert!(px[2] > px[0]);
}

#[test]
fn export_flattens_visible_layers_over_white() {
    let mut editor = Editor::new(30, 30);
    let layer = editor.layers().active_id();
    editor
        .layers_mut()
        .raster_mut(layer)
        .unwrap()
        .put_pixel(15, 15, Rgba([0, 0, 0, 255]));
    let hidden = editor.layers_mut().add_layer("Hidden");
    editor
        .layers_mut()
        .raster_mut(hidden)
        .unwrap()
        .fill(Rgba([255, 0, 0, 255]));
    editor.layers_mut().set_visible(hidden, false);

    let flat = editor.flatten();
    assert_eq!(*flat.get_pixel(15, 15), Rgba([0, 0, 0, 255]));
    assert_eq!(*flat.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
}

#[test]
fn new_project_paper_textures_are_deterministic() {
    let mut a = Editor::new(10, 10);
    let mut b = Editor::new(10, 10);
    a.new_project(48, 48, PaperTexture::Rough);
    b.new_project(48, 48, PaperTexture::Rough);
    let bg_a = a.layers().background_id();
    let bg_b = b.layers().background_id();
    assert_eq!(
        a.layers().raster(bg_a).unwrap().as_image(),
        b.layers().raster(bg_b).unwrap().as_image()
    );
}
