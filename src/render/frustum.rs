use glam::{Mat4, Vec3, Vec4};

/// Six normalized clip planes (left, right, bottom, top, near, far) as
/// `xyz = normal, w = offset`, with normals pointing inside.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    /// Gribb-Hartmann extraction. glam multiplies column vectors, so the
    /// clip-space equations are the rows of the matrix. Clip depth runs from
    /// 0 to w under wgpu, which makes the near plane row 2 on its own.
    pub fn from_view_projection(view_projection: &Mat4) -> Self {
        let row0 = view_projection.row(0);
        let row1 = view_projection.row(1);
        let row2 = view_projection.row(2);
        let row3 = view_projection.row(3);

        let planes = [
            row3 + row0,
            row3 - row0,
            row3 + row1,
            row3 - row1,
            row2,
            row3 - row2,
        ]
        .map(|plane| plane / plane.truncate().length());

        Self { planes }
    }

    pub fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }

    /// Conservative test, spheres touching a plane from outside still count
    /// as visible.
    pub fn contains_sphere(&self, center: Vec3, radius: f32) -> bool {
        !self
            .planes
            .iter()
            .any(|plane| plane.truncate().dot(center) + plane.w < -radius)
    }
}

pub fn is_sphere_in_frustum(
    center: Vec3,
    radius: f32,
    view_projection: &Mat4,
) -> bool {
    Frustum::from_view_projection(view_projection)
        .contains_sphere(center, radius)
}
