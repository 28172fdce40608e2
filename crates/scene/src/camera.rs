//! Translation-only camera with a fixed perspective projection.

use glam::{Mat4, Vec3};

/// Step applied per A/D/W/S key press.
pub const MOVE_STEP: f32 = 0.2;

/// Scale applied to mouse-wheel deltas.
pub const ZOOM_STEP: f32 = 0.5;

/// Perspective projection parameters.
///
/// The aspect ratio is fixed rather than tracking the window size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y: 70.0_f32.to_radians(),
            aspect: 1700.0 / 900.0,
            near: 0.1,
            far: 200.0,
        }
    }
}

impl Projection {
    /// Right-handed perspective with Y flipped for Vulkan clip space.
    pub fn matrix(&self) -> Mat4 {
        let mut proj = Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far);
        proj.y_axis.y *= -1.0;
        proj
    }
}

/// Camera described by a world translation only.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, -2.0),
            projection: Projection::default(),
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// View matrix: the world is translated by the camera position.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    // Key bindings: A/D move x, W/S move y.

    pub fn move_left(&mut self) {
        self.position.x += MOVE_STEP;
    }

    pub fn move_right(&mut self) {
        self.position.x -= MOVE_STEP;
    }

    pub fn move_up(&mut self) {
        self.position.y -= MOVE_STEP;
    }

    pub fn move_down(&mut self) {
        self.position.y += MOVE_STEP;
    }

    /// Moves along z by `wheel_delta` scaled by [`ZOOM_STEP`].
    pub fn zoom(&mut self, wheel_delta: f32) {
        self.position.z += wheel_delta * ZOOM_STEP;
    }
}
