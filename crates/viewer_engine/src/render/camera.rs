//! # Free-fly Camera
//!
//! Yaw/pitch camera driven by raw input deltas: pointer motion turns it,
//! scroll zooms the field of view, and held movement keys translate it.
//!
//! ## Design Principles
//! - **Explicit ownership**: the frame loop owns the one camera and lends it
//!   `&mut` to input handling and `&` to frame composition
//! - **Library-agnostic**: no windowing or Vulkan types in the camera itself
//! - **Invariants enforced on write**: pitch and fov are clamped in every mutator

use bitflags::bitflags;

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};

/// Pitch limit in degrees, keeps `front` away from `world_up`
pub const PITCH_LIMIT: f32 = 89.0;

/// Narrowest field of view in degrees (inclusive)
pub const MIN_FOV: f32 = 1.0;

/// Widest field of view in degrees (inclusive)
pub const MAX_FOV: f32 = 45.0;

bitflags! {
    /// Movement directions held during a frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Movement: u8 {
        /// Along `front`
        const FORWARD = 1 << 0;
        /// Against `front`
        const BACKWARD = 1 << 1;
        /// Against `right`
        const LEFT = 1 << 2;
        /// Along `right`
        const RIGHT = 1 << 3;
        /// Along the camera's `up`
        const UP = 1 << 4;
        /// Against the camera's `up`
        const DOWN = 1 << 5;
    }
}

/// World-space up direction used to derive the camera basis
pub fn world_up() -> Vec3 {
    Vec3::y()
}

/// Free-fly perspective camera
///
/// # Coordinate System
/// Right-handed, Y-up world space. A yaw of -90° looks down -Z. The basis
/// `front`/`right`/`up` is orthonormal and re-derived from yaw and pitch on
/// every orientation change.
///
/// # Pointer handling
/// The first pointer sample only seeds the last known position, so the
/// cursor jump when the window grabs the pointer does not spin the view.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    front: Vec3,
    right: Vec3,
    up: Vec3,
    yaw: f32,
    pitch: f32,
    fov: f32,
    movement_speed: f32,
    mouse_sensitivity: f32,
    first_mouse_sample: bool,
    last_pointer: (f64, f64),
}

impl Camera {
    /// Create a camera at `position` looking along the direction given by
    /// `yaw` and `pitch` (degrees)
    ///
    /// Pitch is clamped to ±[`PITCH_LIMIT`]. The remaining parameters take
    /// the defaults: fov 45°, speed 2.5 units/s, sensitivity 0.1°/pixel.
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            front: -Vec3::z(),
            right: Vec3::x(),
            up: Vec3::y(),
            yaw,
            pitch: utils::clamp(pitch, -PITCH_LIMIT, PITCH_LIMIT),
            fov: MAX_FOV,
            movement_speed: 2.5,
            mouse_sensitivity: 0.1,
            first_mouse_sample: true,
            last_pointer: (0.0, 0.0),
        };
        camera.update_basis();
        camera
    }

    /// Set the field of view in degrees, clamped to [`MIN_FOV`]..=[`MAX_FOV`]
    pub fn with_fov(mut self, fov: f32) -> Self {
        self.fov = utils::clamp(fov, MIN_FOV, MAX_FOV);
        self
    }

    /// Set the movement speed in units per second
    pub fn with_movement_speed(mut self, speed: f32) -> Self {
        self.movement_speed = speed;
        self
    }

    /// Set the pointer sensitivity in degrees per pixel
    pub fn with_mouse_sensitivity(mut self, sensitivity: f32) -> Self {
        self.mouse_sensitivity = sensitivity;
        self
    }

    /// Integrate an absolute pointer position (pixels)
    ///
    /// Screen y grows downward, so moving the pointer up pitches the camera up.
    pub fn on_pointer_move(&mut self, x: f64, y: f64) {
        if self.first_mouse_sample {
            self.last_pointer = (x, y);
            self.first_mouse_sample = false;
            return;
        }

        let (last_x, last_y) = self.last_pointer;
        let offset_x = (x - last_x) as f32 * self.mouse_sensitivity;
        let offset_y = (last_y - y) as f32 * self.mouse_sensitivity;
        self.last_pointer = (x, y);

        self.yaw += offset_x;
        self.pitch = utils::clamp(self.pitch + offset_y, -PITCH_LIMIT, PITCH_LIMIT);
        self.update_basis();

        log::trace!(
            "Camera orientation: yaw={:.2} pitch={:.2}",
            self.yaw,
            self.pitch
        );
    }

    /// Zoom by a scroll delta; positive scrolls narrow the field of view
    pub fn on_scroll(&mut self, delta: f64) {
        self.fov = utils::clamp(self.fov - delta as f32, MIN_FOV, MAX_FOV);
        log::trace!("Camera fov: {:.2}", self.fov);
    }

    /// Translate by every held direction for `delta_time` seconds
    ///
    /// Directions add up without normalisation, so holding two orthogonal
    /// keys covers `speed * dt * sqrt(2)`.
    pub fn on_key_state(&mut self, pressed: Movement, delta_time: f32) {
        if pressed.is_empty() {
            return;
        }

        let step = self.movement_speed * delta_time;
        let directions = [
            (Movement::FORWARD, self.front),
            (Movement::BACKWARD, -self.front),
            (Movement::RIGHT, self.right),
            (Movement::LEFT, -self.right),
            (Movement::UP, self.up),
            (Movement::DOWN, -self.up),
        ];
        for (flag, direction) in directions {
            if pressed.contains(flag) {
                self.position += direction * step;
            }
        }

        log::trace!(
            "Camera position: ({:.2}, {:.2}, {:.2})",
            self.position.x,
            self.position.y,
            self.position.z
        );
    }

    /// View matrix looking from `position` along `front`
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.position + self.front, self.up)
    }

    /// Projection matrix for the current field of view
    ///
    /// Includes the Vulkan coordinate transform: the result maps view space
    /// straight to Vulkan clip space (Y down, depth 0..1).
    pub fn projection_matrix(&self, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::perspective(utils::deg_to_rad(self.fov), aspect, near, far)
            * Mat4::vulkan_coordinate_transform()
    }

    /// Camera position in world space
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit viewing direction
    pub fn front(&self) -> Vec3 {
        self.front
    }

    /// Unit right vector
    pub fn right(&self) -> Vec3 {
        self.right
    }

    /// Unit up vector
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Yaw in degrees
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Pitch in degrees, always within ±[`PITCH_LIMIT`]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Field of view in degrees, always within [`MIN_FOV`]..=[`MAX_FOV`]
    pub fn fov(&self) -> f32 {
        self.fov
    }

    /// Movement speed in units per second
    pub fn movement_speed(&self) -> f32 {
        self.movement_speed
    }

    fn update_basis(&mut self) {
        let yaw = utils::deg_to_rad(self.yaw);
        let pitch = utils::deg_to_rad(self.pitch);
        self.front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
        self.right = self.front.cross(&world_up()).normalize();
        self.up = self.right.cross(&self.front).normalize();
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 3.0), -90.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_orthonormal(camera: &Camera) {
        assert_relative_eq!(camera.front().norm(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(camera.right().norm(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(camera.up().norm(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(camera.front().dot(&camera.right()), 0.0, epsilon = 1e-5);
        assert_relative_eq!(camera.front().dot(&camera.up()), 0.0, epsilon = 1e-5);
        assert_relative_eq!(camera.right().dot(&camera.up()), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_default_camera_faces_negative_z() {
        let camera = Camera::default();
        assert_relative_eq!(camera.position(), Vec3::new(0.0, 0.0, 3.0));
        assert_relative_eq!(camera.front(), Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
        assert_relative_eq!(camera.right(), Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(camera.up(), Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
        assert_eq!(camera.fov(), 45.0);
        assert_eq!(camera.movement_speed(), 2.5);
    }

    #[test]
    fn test_first_pointer_move_only_seeds() {
        let mut camera = Camera::default();
        let front = camera.front();

        camera.on_pointer_move(400.0, 300.0);
        assert_eq!(camera.yaw(), -90.0);
        assert_eq!(camera.pitch(), 0.0);
        assert_eq!(camera.front(), front);

        camera.on_pointer_move(410.0, 300.0);
        assert_relative_eq!(camera.yaw(), -89.0, epsilon = 1e-5);
    }

    #[test]
    fn test_pointer_up_pitches_up() {
        let mut camera = Camera::default();
        camera.on_pointer_move(0.0, 100.0);
        camera.on_pointer_move(0.0, 50.0);
        assert_relative_eq!(camera.pitch(), 5.0, epsilon = 1e-5);
        assert!(camera.front().y > 0.0);
    }

    #[test]
    fn test_pitch_clamped_for_any_sequence() {
        let mut camera = Camera::default();
        camera.on_pointer_move(0.0, 0.0);
        for step in 1..=50 {
            let y = if step % 7 < 4 { -5000.0 * step as f64 } else { 9000.0 * step as f64 };
            camera.on_pointer_move(step as f64 * 313.0, y);
            assert!(camera.pitch() >= -PITCH_LIMIT && camera.pitch() <= PITCH_LIMIT);
            assert_orthonormal(&camera);
        }
    }

    #[test]
    fn test_extreme_pitch_keeps_basis_orthonormal() {
        let mut camera = Camera::default();
        camera.on_pointer_move(0.0, 0.0);
        camera.on_pointer_move(0.0, -100_000.0);
        assert_eq!(camera.pitch(), PITCH_LIMIT);
        assert_orthonormal(&camera);
    }

    #[test]
    fn test_scroll_clamps_fov() {
        let mut camera = Camera::default();
        camera.on_scroll(-10.0);
        assert_eq!(camera.fov(), 45.0);
        camera.on_scroll(50.0);
        assert_eq!(camera.fov(), 1.0);

        let mut camera = Camera::default();
        camera.on_scroll(10.0);
        assert_relative_eq!(camera.fov(), 35.0);
    }

    #[test]
    fn test_orthogonal_keys_are_additive() {
        let mut camera = Camera::default();
        let start = camera.position();
        camera.on_key_state(Movement::FORWARD | Movement::RIGHT, 2.0);

        let moved = camera.position() - start;
        let step = 2.5 * 2.0;
        assert_relative_eq!(moved.dot(&camera.front()), step, epsilon = 1e-5);
        assert_relative_eq!(moved.dot(&camera.right()), step, epsilon = 1e-5);
        assert_relative_eq!(moved.norm(), step * 2.0_f32.sqrt(), epsilon = 1e-5);
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let mut camera = Camera::default();
        let start = camera.position();
        camera.on_key_state(Movement::UP | Movement::DOWN | Movement::LEFT | Movement::RIGHT, 1.0);
        assert_relative_eq!(camera.position(), start, epsilon = 1e-6);
    }

    #[test]
    fn test_up_follows_camera_up() {
        let mut camera = Camera::default();
        camera.on_pointer_move(0.0, 0.0);
        camera.on_pointer_move(0.0, -300.0);
        let start = camera.position();
        camera.on_key_state(Movement::UP, 1.0);
        let moved = (camera.position() - start).normalize();
        assert_relative_eq!(moved, camera.up(), epsilon = 1e-5);
    }

    #[test]
    fn test_view_matrix_is_pure() {
        let camera = Camera::default();
        let first = camera.view_matrix();
        let second = camera.view_matrix();
        assert_eq!(first, second);

        let origin = first.transform_point(&nalgebra::Point3::origin());
        assert_relative_eq!(origin.z, -3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_projection_narrows_with_fov() {
        let wide = Camera::default().projection_matrix(1.0, 0.1, 100.0);
        let narrow = Camera::default().with_fov(20.0).projection_matrix(1.0, 0.1, 100.0);
        assert!(narrow[(0, 0)] > wide[(0, 0)]);
    }
}
