use glam::{Mat4, Quat, Vec3};

/// Placement of an object in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub pos: Vec3,
    pub rot: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            pos: Vec3::ZERO,
            rot: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn build_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rot, self.pos)
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    #[test]
    fn matrix_scales_then_rotates_then_translates() {
        let transform = Transform {
            pos: Vec3::new(0.0, 5.0, 0.0),
            rot: Quat::from_rotation_y(FRAC_PI_2),
            scale: Vec3::splat(2.0),
        };
        let moved = transform.build_matrix().transform_point3(Vec3::X);
        assert!(moved.abs_diff_eq(Vec3::new(0.0, 5.0, -2.0), 1e-5));
    }

    #[test]
    fn default_rotation_and_scale_leave_a_translation() {
        let matrix = Transform {
            pos: Vec3::new(0.0, 12.0, 0.0),
            ..Default::default()
        }
        .build_matrix();
        assert_eq!(matrix, Mat4::from_translation(Vec3::new(0.0, 12.0, 0.0)));
    }
}
