use glam::Vec3;
use scatter3d::camera::{ControlInput, OrbitControls, PerspectiveCamera};
use scatter3d::options::{CameraOptions, ControlOptions};

fn setup() -> (PerspectiveCamera, OrbitControls) {
    let camera = PerspectiveCamera::new(&CameraOptions::default(), 800.0 / 600.0);
    let controls = OrbitControls::new(&camera, ControlOptions::default());
    (camera, controls)
}

// Run enough frames for damped motion to settle
fn settle(controls: &mut OrbitControls, camera: &mut PerspectiveCamera) {
    for _ in 0..200 {
        controls.update(camera);
    }
}

#[test]
fn zoom_is_clamped_to_min_and_max_distance() {
    let (mut camera, mut controls) = setup();

    for _ in 0..100 {
        controls.handle_input(ControlInput::Zoom { steps: 5.0 }, &camera, 600);
        controls.update(&mut camera);
    }
    assert!((camera.distance_to_target() - 15.0).abs() < 1e-3);

    for _ in 0..200 {
        controls.handle_input(ControlInput::Zoom { steps: -5.0 }, &camera, 600);
        controls.update(&mut camera);
    }
    assert!((camera.distance_to_target() - 400.0).abs() < 1e-2);
}

#[test]
fn damping_decays_rotation_after_input_stops() {
    let (mut camera, mut controls) = setup();
    let start = camera.position;

    controls.handle_input(ControlInput::Rotate { dx: 120.0, dy: 0.0 }, &camera, 600);
    assert!(controls.is_moving());

    // First frame only applies part of the drag
    controls.update(&mut camera);
    let first_step = (camera.position - start).length();
    assert!(first_step > 0.0);
    assert!(controls.is_moving());

    let before = camera.position;
    controls.update(&mut camera);
    let second_step = (camera.position - before).length();
    assert!(second_step < first_step);

    settle(&mut controls, &mut camera);
    assert!(!controls.is_moving());
    let at_rest = camera.position;
    controls.update(&mut camera);
    assert!((camera.position - at_rest).length() < 1e-4);
}

#[test]
fn rotation_keeps_the_orbit_radius() {
    let (mut camera, mut controls) = setup();
    let radius = camera.distance_to_target();

    controls.handle_input(ControlInput::Rotate { dx: 300.0, dy: 80.0 }, &camera, 600);
    settle(&mut controls, &mut camera);

    assert!((camera.distance_to_target() - radius).abs() < 1e-2);
}

#[test]
fn pan_moves_the_target() {
    let (mut camera, mut controls) = setup();

    controls.handle_input(ControlInput::Pan { dx: 50.0, dy: 0.0 }, &camera, 600);
    settle(&mut controls, &mut camera);

    assert!(controls.target().length() > 1.0);
    assert_eq!(camera.target, controls.target());
}

#[test]
fn disposed_controls_ignore_input() {
    let (mut camera, mut controls) = setup();
    let start = camera.position;

    controls.dispose();
    controls.dispose();
    controls.handle_input(ControlInput::Rotate { dx: 200.0, dy: 50.0 }, &camera, 600);

    assert!(!controls.update(&mut camera));
    assert_eq!(camera.position, start);
    assert!(controls.is_disposed());
}

#[test]
fn aspect_change_updates_the_projection() {
    let (mut camera, _) = setup();
    let before = camera.projection_matrix();

    camera.set_aspect(1024.0 / 600.0);

    assert_ne!(camera.projection_matrix(), before);
    // Horizontal scale shrinks as the viewport widens
    assert!(camera.projection_matrix().x_axis.x < before.x_axis.x);
    let centre = camera.project(Vec3::ZERO, 1024, 600).unwrap();
    assert!((centre.x - 512.0).abs() < 1e-2);
}
