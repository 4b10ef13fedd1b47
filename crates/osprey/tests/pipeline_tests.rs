use osprey::{
    Channels, DataArray, Frame, FrameBuffer, FrameBufferFormat, HandleState, Library,
    LibraryConfig, Pixels, Renderer, Size,
};
use std::path::PathBuf;

const VERTICES: [[f32; 3]; 4] = [
    [-1.0, -1.0, 3.0],
    [-1.0, 1.0, 3.0],
    [1.0, -1.0, 3.0],
    [0.1, 0.1, 0.3],
];
const COLORS: [[f32; 4]; 4] = [
    [0.9, 0.5, 0.5, 1.0],
    [0.8, 0.8, 0.8, 1.0],
    [0.8, 0.8, 0.8, 1.0],
    [0.5, 0.9, 0.5, 1.0],
];
const INDICES: [[i32; 3]; 2] = [[0, 1, 2], [1, 2, 3]];

fn library() -> Library {
    Library::with_config(LibraryConfig {
        num_threads: 2,
        ..LibraryConfig::default()
    })
    .unwrap()
}

/// Builds the two-triangle tutorial scene and returns a committed renderer.
///
/// Every intermediate handle is released before returning.
fn tutorial_renderer(lib: &Library, size: Size) -> Renderer<'_> {
    let mut camera = lib.new_camera("perspective").unwrap();
    camera.set_aspect(size.aspect()).unwrap();
    camera.set_position([0.0, 0.0, 0.0]).unwrap();
    camera.set_direction([0.1, 0.0, 1.0]).unwrap();
    camera.set_up([0.0, 1.0, 0.0]).unwrap();
    camera.commit().unwrap();

    let mut mesh = lib.new_geometry("triangles").unwrap();
    let mut vertex = lib.new_data(&DataArray::float3a(&VERTICES)).unwrap();
    vertex.commit().unwrap();
    let mut color = lib.new_data(&DataArray::float4(&COLORS)).unwrap();
    color.commit().unwrap();
    let mut index = lib.new_data(&DataArray::int3(&INDICES)).unwrap();
    index.commit().unwrap();
    mesh.set_vertices(&vertex).unwrap();
    mesh.set_vertex_colors(&color).unwrap();
    mesh.set_indices(&index).unwrap();
    mesh.commit().unwrap();
    vertex.release().unwrap();
    color.release().unwrap();
    index.release().unwrap();

    let mut model = lib.new_model().unwrap();
    model.add_geometry(&mesh).unwrap();
    model.commit().unwrap();
    mesh.release().unwrap();

    let mut light = lib.new_light("ambient").unwrap();
    light.commit().unwrap();
    let mut lights = lib.new_light_data(&[&light]).unwrap();
    lights.commit().unwrap();
    light.release().unwrap();

    let mut renderer = lib.new_renderer("scivis").unwrap();
    renderer.set_ao_samples(1).unwrap();
    renderer.set_background(1.0).unwrap();
    renderer.set_model(&model).unwrap();
    renderer.set_camera(&camera).unwrap();
    renderer.set_lights(&lights).unwrap();
    renderer.commit().unwrap();

    model.release().unwrap();
    camera.release().unwrap();
    lights.release().unwrap();
    renderer
}

fn frame_buffer(lib: &Library, size: Size) -> FrameBuffer<'_> {
    let mut fb = lib
        .new_frame_buffer(size, FrameBufferFormat::Srgba, Channels::COLOR | Channels::ACCUM)
        .unwrap();
    fb.clear(Channels::COLOR | Channels::ACCUM).unwrap();
    fb
}

fn first_frame(size: Size) -> Frame {
    let lib = library();
    let renderer = tutorial_renderer(&lib, size);
    let mut fb = frame_buffer(&lib, size);
    fb.render_frame(&renderer, Channels::COLOR | Channels::ACCUM).unwrap();
    fb.map_color().unwrap()
}

fn temp_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("osprey-pipeline-{}-{name}", std::process::id()))
}

#[test]
fn first_frame_is_deterministic() {
    let size = Size::new(32, 24);
    let a = first_frame(size);
    let b = first_frame(size);
    assert_eq!(a, b);
    assert_eq!(a.size, size);
    match &a.pixels {
        Pixels::Rgba8(bytes) => assert_eq!(bytes.len(), size.pixel_count() * 4),
        Pixels::Rgba32f(_) => panic!("srgba frame buffer mapped as floats"),
    }
}

#[test]
fn background_shows_where_the_mesh_is_missing() {
    let size = Size::new(32, 24);
    let frame = first_frame(size);
    let Pixels::Rgba8(bytes) = &frame.pixels else {
        panic!("expected bytes");
    };
    // The mesh sits right of center; the top-left corner sees the background.
    let top_left = ((size.height - 1) * size.width) as usize * 4;
    assert_eq!(&bytes[top_left..top_left + 3], &[255, 255, 255]);
}

#[test]
fn accumulation_counts_frames_until_cleared() {
    let size = Size::new(16, 12);
    let lib = library();
    let renderer = tutorial_renderer(&lib, size);
    let mut fb = frame_buffer(&lib, size);

    let first = fb.render_frame(&renderer, Channels::COLOR | Channels::ACCUM).unwrap();
    assert!(first.is_infinite());
    for _ in 0..9 {
        fb.render_frame(&renderer, Channels::COLOR | Channels::ACCUM).unwrap();
    }
    assert_eq!(fb.accumulated_frames().unwrap(), 10);

    fb.clear(Channels::ACCUM).unwrap();
    assert_eq!(fb.accumulated_frames().unwrap(), 0);
}

#[test]
fn rendering_without_accum_does_not_accumulate() {
    let size = Size::new(8, 8);
    let lib = library();
    let renderer = tutorial_renderer(&lib, size);
    let mut fb = frame_buffer(&lib, size);
    fb.render_frame(&renderer, Channels::COLOR).unwrap();
    fb.render_frame(&renderer, Channels::COLOR).unwrap();
    assert_eq!(fb.accumulated_frames().unwrap(), 0);
}

#[test]
fn releasing_every_handle_leaves_no_objects() {
    let size = Size::new(8, 6);
    let lib = library();
    {
        let renderer = tutorial_renderer(&lib, size);
        // camera, vertex/color/index data, mesh, model, light, light data, renderer
        assert_eq!(lib.live_objects(), 9);
        assert_eq!(lib.open_handles(), 1);

        let mut fb = frame_buffer(&lib, size);
        fb.render_frame(&renderer, Channels::COLOR | Channels::ACCUM).unwrap();
        fb.release().unwrap();
        renderer.release().unwrap();
    }
    assert_eq!(lib.live_objects(), 0);
    let report = lib.shutdown();
    assert_eq!(report.leaked_objects, 0);
    assert_eq!(report.open_handles, 0);
}

#[test]
fn forgotten_handles_are_reported_at_shutdown() {
    let lib = library();
    let camera = lib.new_camera("perspective").unwrap();
    std::mem::forget(camera);
    let report = lib.shutdown();
    assert_eq!(report.open_handles, 1);
    assert_eq!(report.leaked_objects, 1);
}

#[test]
fn saved_images_match_the_frame_buffer_size() {
    let size = Size::new(20, 10);
    let lib = library();
    let renderer = tutorial_renderer(&lib, size);
    let mut fb = frame_buffer(&lib, size);
    fb.render_frame(&renderer, Channels::COLOR | Channels::ACCUM).unwrap();

    let png = temp_file("first.png");
    fb.save(&png).unwrap();
    let decoded = image::open(&png).unwrap();
    let _ = std::fs::remove_file(&png);
    assert_eq!((decoded.width(), decoded.height()), (20, 10));

    let ppm = temp_file("first.ppm");
    fb.save_with(&ppm, size, FrameBufferFormat::Srgba).unwrap();
    let bytes = std::fs::read(&ppm).unwrap();
    let _ = std::fs::remove_file(&ppm);
    assert!(bytes.starts_with(b"P6\n20 10\n255\n"));
    assert_eq!(bytes.len(), b"P6\n20 10\n255\n".len() + 20 * 10 * 3 + 1);
}

#[test]
fn saving_with_the_wrong_size_is_rejected() {
    let size = Size::new(4, 4);
    let lib = library();
    let fb = frame_buffer(&lib, size);
    let err = fb
        .save_with(temp_file("wrong.png"), Size::new(8, 8), FrameBufferFormat::Srgba)
        .unwrap_err();
    assert!(matches!(err, osprey::Error::SizeMismatch { .. }));
}

#[test]
fn float_frame_buffers_map_linear_values() {
    let size = Size::new(8, 6);
    let lib = library();
    let renderer = tutorial_renderer(&lib, size);
    let mut fb = lib
        .new_frame_buffer(size, FrameBufferFormat::Rgba32f, Channels::COLOR | Channels::DEPTH)
        .unwrap();
    fb.render_frame(&renderer, Channels::COLOR | Channels::DEPTH).unwrap();

    let frame = fb.map_color().unwrap();
    let Pixels::Rgba32f(values) = &frame.pixels else {
        panic!("expected floats");
    };
    assert_eq!(values.len(), size.pixel_count() * 4);
    assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));

    let depth = fb.map_depth().unwrap();
    assert_eq!(depth.len(), size.pixel_count());
    assert!(depth.iter().any(|d| d.is_finite()));
    assert!(depth.iter().any(|d| d.is_infinite()));
}

#[test]
fn handles_track_their_lifecycle() {
    let lib = library();
    let mut light = lib.new_light("distant").unwrap();
    assert_eq!(light.type_name().unwrap(), "distant");
    assert_eq!(light.state(), HandleState::Created);
    light.set_direction([0.0, -1.0, 0.0]).unwrap();
    assert_eq!(light.state(), HandleState::Configured);
    light.commit().unwrap();
    assert_eq!(light.state(), HandleState::Committed);
    light.set_intensity(2.0).unwrap();
    assert_eq!(light.state(), HandleState::Configured);
}
