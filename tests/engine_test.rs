use rand::SeedableRng;
use rand::rngs::StdRng;
use scatter3d::camera::ControlInput;
use scatter3d::dataset::{CellValue, Dataset};
use scatter3d::engine::{EngineState, FrameStatus, SceneEngine, SceneInput, TeardownStep, drive};
use scatter3d::error::{EngineError, Result};
use scatter3d::options::SceneOptions;
use scatter3d::projector::AxisSelection;
use scatter3d::renderer::{GraphicsContext, Renderer, RendererConfig, SoftwareContext};
use scatter3d::shape::Shape;
use scatter3d::surface::DisplaySurface;
use std::time::Duration;

// Helper function to build a small cloud with two close pairs
fn dataset() -> Dataset {
    Dataset::from_parts(
        &["A", "B", "C"],
        vec![
            vec![0.into(), 0.into(), 0.into()],
            vec![10.into(), 0.into(), 0.into()],
            vec![40.into(), 40.into(), 40.into()],
            vec![45.into(), 40.into(), 40.into()],
            vec!["x".into(), 1.into(), 1.into()],
        ],
    )
}

fn input(shape: Shape) -> SceneInput {
    SceneInput::new(dataset(), AxisSelection::new("A", "B", "C"), shape)
}

fn engine_with(options: SceneOptions) -> SceneEngine {
    SceneEngine::new(Box::new(SoftwareContext::new()), options).with_rng(StdRng::seed_from_u64(11))
}

fn engine() -> SceneEngine {
    engine_with(SceneOptions::default())
}

// Graphics context that can never hand out a renderer
struct NoContext;

impl GraphicsContext for NoContext {
    fn create_renderer(&mut self, _config: &RendererConfig) -> Result<Box<dyn Renderer>> {
        Err(EngineError::ContextUnavailable("no adapter".to_string()))
    }
}

#[test]
fn mount_constructs_and_starts_the_loop() {
    let engine = engine();
    let surface = DisplaySurface::new(640);

    engine.mount(input(Shape::Sphere), Some(&surface)).unwrap();

    assert_eq!(engine.state(), EngineState::Animating);
    assert_eq!(engine.point_count(), Some(4));
    assert_eq!(engine.edge_count(), Some(2));
    assert_eq!(engine.renderer_size(), Some((640, 600)));
    assert!(engine.pending_frame().is_some());
    assert!(surface.is_attached());
    assert_eq!(surface.observer_count(), 1);

    assert_eq!(engine.tick().unwrap(), FrameStatus::Rendered);
    assert_eq!(engine.tick().unwrap(), FrameStatus::Rendered);
    assert_eq!(engine.frames(), 2);
}

#[test]
fn degenerate_input_renders_nothing() {
    let engine = engine();
    let surface = DisplaySurface::new(640);

    let missing_axis = SceneInput::new(dataset(), AxisSelection::new("A", "B", "Q"), Shape::Cube);
    engine.mount(missing_axis, Some(&surface)).unwrap();
    assert_eq!(engine.state(), EngineState::Uninitialized);

    engine.mount(SceneInput::default(), Some(&surface)).unwrap();
    assert_eq!(engine.state(), EngineState::Uninitialized);

    // No surface yet
    engine.mount(input(Shape::Cube), None).unwrap();
    assert_eq!(engine.state(), EngineState::Uninitialized);

    assert_eq!(engine.tick().unwrap(), FrameStatus::Idle);
    assert!(engine.capture_image().is_none());
    assert!(!surface.is_attached());
}

#[test]
fn capture_before_construction_is_none() {
    let engine = engine();
    assert!(engine.capture_image().is_none());
    assert!(engine.handle().capture_image().is_none());
}

#[test]
fn snapshot_is_a_png_of_surface_width_by_600() {
    let engine = engine();
    let surface = DisplaySurface::new(512);
    engine.mount(input(Shape::Icosahedron), Some(&surface)).unwrap();
    engine.tick().unwrap();

    let png = engine.handle().capture_image().unwrap();
    let image = image::load_from_memory(&png).unwrap().to_rgb8();

    assert_eq!(image.dimensions(), (512, 600));
    // The corner only sees the background
    assert_eq!(image.get_pixel(0, 0).0, [0x05, 0x02, 0x0a]);
    // Something brighter than the background was drawn
    assert!(image.pixels().any(|p| p.0.iter().any(|&c| c > 0x80)));
}

#[test]
fn capture_without_preserved_buffer_is_blank() {
    let options = SceneOptions {
        preserve_drawing_buffer: false,
        ..SceneOptions::default()
    };
    let engine = engine_with(options);
    let surface = DisplaySurface::new(320);
    engine.mount(input(Shape::Cube), Some(&surface)).unwrap();

    let png = engine.capture_image().unwrap();
    let image = image::load_from_memory(&png).unwrap().to_rgb8();
    assert!(image.pixels().all(|p| p.0 == [0, 0, 0]));
}

#[test]
fn dispose_twice_is_harmless_and_ordered() {
    let engine = engine();
    let surface = DisplaySurface::new(640);
    engine.mount(input(Shape::Tetrahedron), Some(&surface)).unwrap();

    engine.dispose();
    engine.dispose();

    assert_eq!(engine.state(), EngineState::Disposed);
    assert!(engine.pending_frame().is_none());
    assert_eq!(engine.tick().unwrap(), FrameStatus::Idle);
    assert!(engine.capture_image().is_none());
    assert!(!surface.is_attached());
    assert_eq!(surface.observer_count(), 0);
    assert_eq!(
        engine.last_teardown(),
        vec![
            TeardownStep::StopLoop,
            TeardownStep::ReleaseControls,
            TeardownStep::ReleaseRenderer,
            TeardownStep::DetachSurface,
            TeardownStep::StopObserving,
        ]
    );
}

#[test]
fn dispose_on_a_fresh_engine_is_a_no_op() {
    let engine = engine();
    engine.dispose();
    assert_eq!(engine.state(), EngineState::Disposed);
    assert!(engine.last_teardown().is_empty());
}

#[test]
fn resize_updates_renderer_and_camera_without_restarting() {
    let engine = engine();
    let surface = DisplaySurface::new(800);
    engine.mount(input(Shape::Cube), Some(&surface)).unwrap();
    for _ in 0..3 {
        engine.tick().unwrap();
    }
    let builds = engine.builds();

    surface.set_width(1200);
    assert!(engine.poll_resize());

    assert_eq!(engine.renderer_size(), Some((1200, 600)));
    assert!((engine.camera_aspect().unwrap() - 2.0).abs() < 1e-6);
    assert_eq!(engine.state(), EngineState::Animating);
    assert_eq!(engine.builds(), builds);
    assert_eq!(engine.frames(), 3);
    assert_eq!(engine.point_count(), Some(4));

    // Nothing new to apply
    assert!(!engine.poll_resize());
}

#[test]
fn zero_width_resize_is_ignored() {
    let engine = engine();
    let surface = DisplaySurface::new(800);
    engine.mount(input(Shape::Cube), Some(&surface)).unwrap();

    surface.set_width(0);
    assert!(!engine.poll_resize());
    assert_eq!(engine.renderer_size(), Some((800, 600)));
}

#[test]
fn resize_beyond_the_context_limit_is_refused() {
    let engine = SceneEngine::new(
        Box::new(SoftwareContext::with_max_dimension(1024)),
        SceneOptions::default(),
    );
    let surface = DisplaySurface::new(800);
    engine.mount(input(Shape::Cube), Some(&surface)).unwrap();
    engine.tick().unwrap();

    surface.set_width(2000);
    assert!(!engine.poll_resize());
    assert_eq!(engine.renderer_size(), Some((800, 600)));
    assert!((engine.camera_aspect().unwrap() - 800.0 / 600.0).abs() < 1e-6);
    assert_eq!(engine.state(), EngineState::Animating);
    assert_eq!(engine.tick().unwrap(), FrameStatus::Rendered);

    // A width inside the limit still applies
    surface.set_width(1000);
    assert!(engine.poll_resize());
    assert_eq!(engine.renderer_size(), Some((1000, 600)));
}

#[test]
fn zero_width_surface_falls_back_at_construction() {
    let engine = engine();
    let surface = DisplaySurface::new(0);
    engine.mount(input(Shape::Cube), Some(&surface)).unwrap();
    assert_eq!(engine.renderer_size(), Some((800, 600)));
}

#[test]
fn unchanged_input_is_a_no_op_and_changes_rebuild() {
    let engine = engine();
    let surface = DisplaySurface::new(640);
    engine.mount(input(Shape::Cube), Some(&surface)).unwrap();
    engine.tick().unwrap();
    engine.tick().unwrap();

    engine.mount(input(Shape::Cube), Some(&surface)).unwrap();
    assert_eq!(engine.builds(), 1);
    assert_eq!(engine.frames(), 2);

    engine.mount(input(Shape::Octahedron), Some(&surface)).unwrap();
    assert_eq!(engine.builds(), 2);
    assert_eq!(engine.frames(), 0);
    assert_eq!(engine.state(), EngineState::Animating);
    assert_eq!(engine.last_teardown().len(), 5);

    let fewer = SceneInput::new(
        Dataset::from_parts(&["A", "B", "C"], vec![vec![1.into(), 2.into(), 3.into()]]),
        AxisSelection::new("A", "B", "C"),
        Shape::Octahedron,
    );
    engine.mount(fewer, Some(&surface)).unwrap();
    assert_eq!(engine.builds(), 3);
    assert_eq!(engine.point_count(), Some(1));
    assert_eq!(surface.observer_count(), 1);
}

#[test]
fn context_failure_is_fatal_and_leaves_engine_uninitialized() {
    let engine = SceneEngine::new(Box::new(NoContext), SceneOptions::default());
    let surface = DisplaySurface::new(640);

    let err = engine.mount(input(Shape::Sphere), Some(&surface)).unwrap_err();

    assert!(matches!(err, EngineError::ContextUnavailable(_)));
    assert_eq!(engine.state(), EngineState::Uninitialized);
    assert!(engine.capture_image().is_none());
    assert!(!surface.is_attached());
}

#[test]
fn snapshot_handle_does_not_outlive_the_engine() {
    let engine = engine();
    let surface = DisplaySurface::new(320);
    engine.mount(input(Shape::Cube), Some(&surface)).unwrap();

    let handle = engine.handle();
    assert!(handle.capture_image().is_some());

    drop(engine);
    assert!(handle.capture_image().is_none());
}

#[test]
fn control_input_moves_the_camera_between_frames() {
    let engine = engine();
    let surface = DisplaySurface::new(640);
    engine.mount(input(Shape::Cube), Some(&surface)).unwrap();
    let start = engine.camera_distance().unwrap();

    engine.handle_input(ControlInput::Zoom { steps: 3.0 });
    engine.tick().unwrap();

    assert!(engine.camera_distance().unwrap() < start);
}

#[test]
fn unknown_shape_names_draw_spheres() {
    let engine = engine();
    let surface = DisplaySurface::new(320);
    let input = SceneInput::new(
        dataset(),
        AxisSelection::new("A", "B", "C"),
        Shape::from_name("dodecahedron"),
    );
    engine.mount(input, Some(&surface)).unwrap();
    assert_eq!(engine.state(), EngineState::Animating);
}

#[tokio::test]
async fn driver_runs_frames_and_disposes_on_shutdown() {
    let engine = engine();
    let surface = DisplaySurface::new(320);
    engine.mount(input(Shape::Cube), Some(&surface)).unwrap();

    let resizer = surface.clone();
    let shutdown = async move {
        tokio::time::sleep(Duration::from_millis(40)).await;
        resizer.set_width(400);
        tokio::time::sleep(Duration::from_millis(40)).await;
    };

    let frames = drive(&engine, &surface, Duration::from_millis(5), shutdown)
        .await
        .unwrap();

    assert!(frames > 0);
    assert_eq!(engine.state(), EngineState::Disposed);
    assert!(!surface.is_attached());
}

#[tokio::test]
async fn driver_stops_when_nothing_is_animating() {
    let engine = engine();
    let surface = DisplaySurface::new(320);

    let frames = drive(&engine, &surface, Duration::from_millis(5), std::future::pending())
        .await
        .unwrap();

    assert_eq!(frames, 0);
}

#[test]
fn row_shorter_than_header_is_skipped() {
    let data = Dataset::from_parts(
        &["A", "B", "C"],
        vec![vec![1.into(), 2.into()], vec![CellValue::from(1), 2.into(), 3.into()]],
    );
    let engine = engine();
    let surface = DisplaySurface::new(320);
    engine
        .mount(SceneInput::new(data, AxisSelection::new("A", "B", "C"), Shape::Cube), Some(&surface))
        .unwrap();
    assert_eq!(engine.point_count(), Some(1));
}
