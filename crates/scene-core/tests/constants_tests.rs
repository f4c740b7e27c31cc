// Tests for tuning constants and the camera helpers built on them.

use glam::Vec3;
use scene_core::*;

#[test]
#[allow(clippy::assertions_on_constants)]
fn constants_are_within_reasonable_bounds() {
    // Timing
    assert!(PREALLOCATION_TIME_SEC > 0.0 && PREALLOCATION_TIME_SEC < 0.1);
    assert!(SCORE_LEAD_IN_SEC > 0.0);
    assert!(LISTENER_UPDATES_PER_SEC > 0);

    // A tap must finish before the next tap of the same note starts.
    assert!(ECHO_NOTE_DURATION_SEC < ECHO_DELAY_TIME_SEC);
    assert!(ECHO_DELAY_COUNT >= 1);
    assert_eq!(ECHO_ROTATION_COUNT, 3);

    // Bubbles shrink away before they leave the fade band.
    assert!(BUBBLE_FADE_START_Y > BUBBLE_START_Y + BUBBLE_TILT_HEIGHT);
    assert!(BUBBLE_FADE_RANGE_Y > 0.0);
    assert!(BUBBLE_REGROW_PER_SEC > 0.0);
}

#[test]
fn palette_channels_are_normalized() {
    for c in [
        PILLAR_COLOR,
        GLOW_COLOR,
        POINT_NOTE_COLOR,
        POINT_BACKDROP_COLOR,
        BUBBLE_REST_COLOR,
        BUBBLE_LIT_COLOR,
    ] {
        assert!(c.iter().all(|v| (0.0..=1.0).contains(v)), "{c:?}");
    }
    assert_eq!(rgb(GLOW_COLOR), Vec3::ONE);
}

#[test]
fn camera_world_matrix_places_listener_at_eye() {
    let camera = Camera::default();
    let world = camera.world_matrix();
    let eye = world.w_axis.truncate();
    assert!((eye - camera.eye).length() < 1e-3);
    // Forward (-Z in view space) points at the target.
    let forward = world.transform_vector3(-Vec3::Z).normalize();
    let expected = (camera.target - camera.eye).normalize();
    assert!(forward.dot(expected) > 0.9999);
}

#[test]
fn orbit_moves_camera_until_released() {
    let mut camera = Camera::default();
    let mut orbit = OrbitCamera::default();
    orbit.update(&mut camera, 1.0);
    let first = camera.eye;
    assert_eq!(camera.target, orbit.target);
    assert!((first.y - orbit.eye_height).abs() < 1e-6);

    orbit.update(&mut camera, 100.0);
    assert_ne!(camera.eye, first);

    orbit.release("key pressed");
    assert!(!orbit.enabled);
    let held = camera.eye;
    orbit.update(&mut camera, 200.0);
    assert_eq!(camera.eye, held);
}
