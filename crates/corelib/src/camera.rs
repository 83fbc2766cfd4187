use crate::{InputState, Mat4, Vec3};

const MAX_PITCH_DEG: f32 = 89.0;
const MIN_ZOOM_DEG: f32 = 1.0;
const MAX_ZOOM_DEG: f32 = 45.0;

/// Free-flying perspective camera (right-handed, Y up).
///
/// Angles are kept in degrees; `yaw = -90` looks down -Z.
#[derive(Clone, Copy, Debug)]
pub struct FlyCamera {
    pub position: Vec3,
    pub world_up: Vec3,
    pub yaw_deg: f32,
    pub pitch_deg: f32,
    /// Units per second.
    pub speed: f32,
    /// Degrees per pixel of pointer motion.
    pub sensitivity: f32,
    /// Vertical field of view in degrees.
    pub zoom_deg: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl FlyCamera {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            world_up: Vec3::Y,
            yaw_deg: -90.0,
            pitch_deg: 0.0,
            speed: 2.5,
            sensitivity: 0.1,
            zoom_deg: MAX_ZOOM_DEG,
            z_near: 0.1,
            z_far: 300.0,
        }
    }

    #[inline]
    pub fn front(&self) -> Vec3 {
        let (yaw, pitch) = (self.yaw_deg.to_radians(), self.pitch_deg.to_radians());
        Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.front().cross(self.world_up).normalize()
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.right().cross(self.front()).normalize()
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front(), self.up())
    }

    /// wgpu-style projection (depth in [0,1]).
    #[inline]
    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.zoom_deg.to_radians(),
            aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }

    /// Apply one frame of input: movement scaled by `dt`, look and zoom by raw deltas.
    pub fn process_input(&mut self, input: &InputState, dt: f32) {
        let step = self.speed * dt;
        let (front, right, up) = (self.front(), self.right(), self.up());

        let mut motion = Vec3::ZERO;
        if input.forward {
            motion += front;
        }
        if input.backward {
            motion -= front;
        }
        if input.right {
            motion += right;
        }
        if input.left {
            motion -= right;
        }
        if input.up {
            motion += up;
        }
        if input.down {
            motion -= up;
        }
        self.position += motion * step;

        if input.look_active {
            // Screen y grows downwards; pitch grows upwards.
            self.yaw_deg += input.mouse_delta.x * self.sensitivity;
            self.pitch_deg = (self.pitch_deg - input.mouse_delta.y * self.sensitivity)
                .clamp(-MAX_PITCH_DEG, MAX_PITCH_DEG);
        }

        if input.scroll_delta != 0.0 {
            self.zoom_deg = (self.zoom_deg - input.scroll_delta).clamp(MIN_ZOOM_DEG, MAX_ZOOM_DEG);
        }
    }
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 3.0))
    }
}
