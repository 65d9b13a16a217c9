use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

const PITCH_LIMIT: f32 = 89.0;
const ZOOM_MIN: f32 = 1.0;
const ZOOM_MAX: f32 = 45.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

/// Fly camera driven by yaw/pitch in degrees. `front`, `right` and `up` are
/// unit vectors recomputed whenever the angles change.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    zoom: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw,
            pitch,
            movement_speed: 10.0,
            mouse_sensitivity: 0.1,
            zoom: ZOOM_MAX,
            znear: 0.1,
            zfar: 1000.0,
        };
        camera.update_vectors();
        camera
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        let mut camera = Self::new(
            Vec3::from_array(config.position),
            config.yaw,
            config.pitch,
        );
        camera.movement_speed = config.movement_speed;
        camera.mouse_sensitivity = config.mouse_sensitivity;
        camera.zoom = config.zoom.clamp(ZOOM_MIN, ZOOM_MAX);
        camera.znear = config.near;
        camera.zfar = config.far;
        camera
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Vertical field of view in degrees.
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn build_view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    pub fn build_projection(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.zoom.to_radians(),
            aspect_ratio,
            self.znear,
            self.zfar,
        )
    }

    pub fn process_keyboard(&mut self, movement: CameraMovement, delta: f32) {
        let velocity = self.movement_speed * delta;
        match movement {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    pub fn process_mouse_movement(
        &mut self,
        x_offset: f32,
        y_offset: f32,
        constrain_pitch: bool,
    ) {
        self.yaw += x_offset * self.mouse_sensitivity;
        self.pitch += y_offset * self.mouse_sensitivity;
        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
        self.update_vectors();
    }

    pub fn process_mouse_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(ZOOM_MIN, ZOOM_MAX);
    }

    fn update_vectors(&mut self) {
        let (sin_yaw, cos_yaw) = self.yaw.to_radians().sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.to_radians().sin_cos();
        self.front =
            Vec3::new(cos_yaw * cos_pitch, sin_pitch, sin_yaw * cos_pitch)
                .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn default_yaw_looks_down_negative_z() {
        let camera = Camera::new(Vec3::new(0.0, 15.0, 30.0), -90.0, 0.0);
        assert!(camera.front().abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert!(camera.right().abs_diff_eq(Vec3::X, 1e-6));
        assert!(camera.up().abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn basis_stays_orthonormal() {
        let mut camera = Camera::new(Vec3::ZERO, -90.0, 0.0);
        for (dx, dy) in [(120.0, 35.0), (-800.0, 400.0), (33.0, -900.0)] {
            camera.process_mouse_movement(dx, dy, true);
            assert_relative_eq!(camera.front().length(), 1.0, epsilon = 1e-5);
            assert_relative_eq!(camera.up().length(), 1.0, epsilon = 1e-5);
            assert_relative_eq!(camera.front().dot(camera.up()), 0.0, epsilon = 1e-5);
            assert_relative_eq!(camera.front().dot(camera.right()), 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn pitch_is_clamped_when_constrained() {
        let mut camera = Camera::new(Vec3::ZERO, -90.0, 0.0);
        camera.process_mouse_movement(0.0, 10_000.0, true);
        assert_eq!(camera.pitch(), PITCH_LIMIT);
        camera.process_mouse_movement(0.0, -20_000.0, true);
        assert_eq!(camera.pitch(), -PITCH_LIMIT);
        camera.process_mouse_movement(0.0, -100.0, false);
        assert!(camera.pitch() < -PITCH_LIMIT);
    }

    #[test]
    fn scroll_zoom_is_clamped() {
        let mut camera = Camera::new(Vec3::ZERO, -90.0, 0.0);
        camera.process_mouse_scroll(10.0);
        assert_eq!(camera.zoom(), 35.0);
        camera.process_mouse_scroll(100.0);
        assert_eq!(camera.zoom(), ZOOM_MIN);
        camera.process_mouse_scroll(-100.0);
        assert_eq!(camera.zoom(), ZOOM_MAX);
    }

    #[test]
    fn keyboard_moves_along_basis() {
        let mut camera = Camera::new(Vec3::ZERO, -90.0, 0.0);
        camera.process_keyboard(CameraMovement::Forward, 0.5);
        assert!(camera.position.abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), 1e-5));
        camera.process_keyboard(CameraMovement::Right, 0.1);
        assert!(camera.position.abs_diff_eq(Vec3::new(1.0, 0.0, -5.0), 1e-5));
        camera.process_keyboard(CameraMovement::Backward, 0.5);
        camera.process_keyboard(CameraMovement::Left, 0.1);
        assert!(camera.position.abs_diff_eq(Vec3::ZERO, 1e-5));
    }

    #[test]
    fn view_maps_eye_to_origin() {
        let camera = Camera::new(Vec3::new(0.0, 15.0, 30.0), -90.0, 0.0);
        let eye = camera.build_view().transform_point3(camera.position);
        assert!(eye.abs_diff_eq(Vec3::ZERO, 1e-5));
    }
}
