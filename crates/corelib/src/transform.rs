use crate::{Mat4, Quat, Vec3};

/// Model transform: translation, orientation and (possibly non-uniform) scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    #[inline]
    pub const fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    #[inline]
    pub fn from_trs(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Orientation after spinning about world +Y for `seconds` at `rate` rad/s.
    #[inline]
    pub fn spinning_y(seconds: f32, rate: f32) -> Self {
        Self {
            rotation: Quat::from_rotation_y(seconds * rate),
            ..Self::identity()
        }
    }

    /// Build matrix = T * R * S (column-major Mat4 per glam).
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_rotates_x_axis_towards_minus_z() {
        let t = Transform::spinning_y(std::f32::consts::FRAC_PI_2, 1.0);
        let x = t.matrix().transform_vector3(Vec3::X);
        assert!((x - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn spin_at_time_zero_is_identity() {
        assert_eq!(Transform::spinning_y(0.0, 0.3).matrix(), Mat4::IDENTITY);
    }
}
