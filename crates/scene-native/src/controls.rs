use glam::{Quat, Vec3};
use scene_core::Camera;
use winit::keyboard::{Key, NamedKey};

const MOVE_STEP: f32 = 5.0; // world units per key press
const TURN_STEP: f32 = 0.05; // radians per key press

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    TogglePause,
    Quit,
    /// Move along (right, up, forward) in camera space.
    Move(Vec3),
    /// Turn around the vertical axis through the target.
    Turn(f32),
}

impl Command {
    /// Whether the command takes the camera away from the automatic orbit.
    pub fn moves_camera(self) -> bool {
        matches!(self, Command::Move(_) | Command::Turn(_))
    }
}

#[inline]
pub fn command_for_char(key: &str) -> Option<Command> {
    match key {
        "w" | "W" => Some(Command::Move(Vec3::Z)),
        "s" | "S" => Some(Command::Move(-Vec3::Z)),
        "a" | "A" => Some(Command::Move(-Vec3::X)),
        "d" | "D" => Some(Command::Move(Vec3::X)),
        "e" | "E" => Some(Command::Move(Vec3::Y)),
        "q" | "Q" => Some(Command::Move(-Vec3::Y)),
        "p" | "P" => Some(Command::TogglePause),
        _ => None,
    }
}

pub fn command_for_key(key: &Key) -> Option<Command> {
    match key {
        Key::Named(NamedKey::Space) => Some(Command::TogglePause),
        Key::Named(NamedKey::Escape) => Some(Command::Quit),
        Key::Named(NamedKey::ArrowUp) => Some(Command::Move(Vec3::Z)),
        Key::Named(NamedKey::ArrowDown) => Some(Command::Move(-Vec3::Z)),
        Key::Named(NamedKey::ArrowLeft) => Some(Command::Turn(TURN_STEP)),
        Key::Named(NamedKey::ArrowRight) => Some(Command::Turn(-TURN_STEP)),
        Key::Character(c) => command_for_char(c.as_str()),
        _ => None,
    }
}

/// Apply a camera command. Non-camera commands are ignored.
pub fn apply_to_camera(camera: &mut Camera, command: Command) {
    match command {
        Command::Move(dir) => {
            let forward = (camera.target - camera.eye).normalize_or_zero();
            let right = forward.cross(camera.up).normalize_or_zero();
            let offset = (right * dir.x + camera.up * dir.y + forward * dir.z) * MOVE_STEP;
            camera.eye += offset;
            camera.target += offset;
        }
        Command::Turn(angle) => {
            let arm = camera.eye - camera.target;
            camera.eye = camera.target + Quat::from_rotation_y(angle) * arm;
        }
        Command::TogglePause | Command::Quit => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_keys_map_case_insensitively() {
        assert_eq!(command_for_char("w"), command_for_char("W"));
        assert_eq!(command_for_char("p"), Some(Command::TogglePause));
        assert_eq!(command_for_char("z"), None);
        assert_eq!(command_for_key(&Key::Named(NamedKey::Escape)), Some(Command::Quit));
    }

    #[test]
    fn moving_forward_keeps_view_direction() {
        let mut camera = Camera::default();
        let before = (camera.target - camera.eye).normalize();
        let eye = camera.eye;
        apply_to_camera(&mut camera, Command::Move(Vec3::Z));
        let after = (camera.target - camera.eye).normalize();
        assert!((before - after).length() < 1e-5);
        assert!(((camera.eye - eye).length() - MOVE_STEP).abs() < 1e-3);
    }

    #[test]
    fn turning_keeps_distance_to_target() {
        let mut camera = Camera::default();
        let distance = camera.eye.distance(camera.target);
        apply_to_camera(&mut camera, Command::Turn(0.5));
        assert!((camera.eye.distance(camera.target) - distance).abs() < 1e-2);
        assert!(Command::Turn(0.5).moves_camera());
        assert!(!Command::TogglePause.moves_camera());
    }
}
