//! Core types: math re-exports, model transform, fly camera, input and timing.

pub use glam::{Mat4, Quat, Vec2, Vec3, vec3};

pub mod camera;
pub mod clock;
pub mod error;
pub mod input;
pub mod transform;

pub use camera::FlyCamera;
pub use clock::FrameClock;
pub use error::{CoreError, CoreResult};
pub use input::InputState;
pub use transform::Transform;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_is_identity_matrix() {
        let t = Transform::identity();
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn translate_then_scale_matrix() {
        let t = Transform::from_trs(vec3(1.0, 2.0, 3.0), Quat::IDENTITY, vec3(2.0, 2.0, 2.0));
        // Last column holds translation, diagonal holds scale (no rotation).
        let m = t.matrix().to_cols_array();
        assert!((m[12] - 1.0).abs() < 1e-6);
        assert!((m[13] - 2.0).abs() < 1e-6);
        assert!((m[14] - 3.0).abs() < 1e-6);
        assert!((m[0] - 2.0).abs() < 1e-6);
        assert!((m[5] - 2.0).abs() < 1e-6);
        assert!((m[10] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn camera_matrices_are_finite() {
        let cam = FlyCamera::new(vec3(0.0, 0.0, 3.0));
        let pv = cam.projection(4.0 / 3.0) * cam.view();
        assert!(pv.to_cols_array().iter().all(|f| f.is_finite()));
    }
}
