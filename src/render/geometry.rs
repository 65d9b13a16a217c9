use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Vec2, Vec3};

use super::mesh::{SkyboxVertex, Vertex};

/// Fewest segments that still enclose a volume. Smaller counts are raised.
pub const MIN_SECTORS: u32 = 3;
pub const MIN_STACKS: u32 = 2;

/// Triangles wind counter-clockwise seen from outside the shape.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Open cylinder wall centered on the origin, axis along Y.
pub fn cylinder(radius: f32, height: f32, sectors: u32) -> Geometry {
    let sectors = sectors.max(MIN_SECTORS);
    let half_height = height / 2.0;
    let step = TAU / sectors as f32;

    let mut vertices = Vec::with_capacity(2 * (sectors as usize + 1));
    for i in 0..=sectors {
        let (sin, cos) = (i as f32 * step).sin_cos();
        let (x, z) = (radius * cos, radius * sin);
        let normal = Vec3::new(cos, 0.0, sin);
        let u = i as f32 / sectors as f32;
        vertices.push(Vertex::new(
            Vec3::new(x, half_height, z),
            normal,
            Vec3::ONE,
            Vec2::new(u, 1.0),
        ));
        vertices.push(Vertex::new(
            Vec3::new(x, -half_height, z),
            normal,
            Vec3::ONE,
            Vec2::new(u, 0.0),
        ));
    }

    let mut indices = Vec::with_capacity(6 * sectors as usize);
    for i in 0..sectors {
        let top = i * 2;
        let bottom = top + 1;
        indices.extend_from_slice(&[top, top + 2, bottom]);
        indices.extend_from_slice(&[bottom, top + 2, bottom + 2]);
    }

    Geometry { vertices, indices }
}

/// Cone without its base disc, tip at `+height / 2`.
pub fn cone(radius: f32, height: f32, sectors: u32) -> Geometry {
    let sectors = sectors.max(MIN_SECTORS);
    let step = TAU / sectors as f32;

    let mut vertices = Vec::with_capacity(sectors as usize + 2);
    vertices.push(Vertex::new(
        Vec3::new(0.0, height / 2.0, 0.0),
        Vec3::Y,
        Vec3::ONE,
        Vec2::new(0.5, 1.0),
    ));
    for i in 0..=sectors {
        let (sin, cos) = (i as f32 * step).sin_cos();
        vertices.push(Vertex::new(
            Vec3::new(radius * cos, -height / 2.0, radius * sin),
            Vec3::new(cos, 0.0, sin),
            Vec3::ONE,
            Vec2::new((cos + 1.0) * 0.5, (sin + 1.0) * 0.5),
        ));
    }

    let indices = (1..=sectors).flat_map(|i| [0, i + 1, i]).collect();

    Geometry { vertices, indices }
}

/// UV sphere. Pole rows are kept as vertices but produce no degenerate
/// triangles.
pub fn sphere(radius: f32, sectors: u32, stacks: u32) -> Geometry {
    let sectors = sectors.max(MIN_SECTORS);
    let stacks = stacks.max(MIN_STACKS);
    let sector_step = TAU / sectors as f32;
    let stack_step = PI / stacks as f32;

    let mut vertices =
        Vec::with_capacity((stacks as usize + 1) * (sectors as usize + 1));
    for i in 0..=stacks {
        let (sin_stack, cos_stack) = (FRAC_PI_2 - i as f32 * stack_step).sin_cos();
        for j in 0..=sectors {
            let (sin_sector, cos_sector) = (j as f32 * sector_step).sin_cos();
            let normal =
                Vec3::new(cos_stack * cos_sector, sin_stack, cos_stack * sin_sector);
            vertices.push(Vertex::new(
                normal * radius,
                normal,
                Vec3::ONE,
                Vec2::new(j as f32 / sectors as f32, i as f32 / stacks as f32),
            ));
        }
    }

    let mut indices = Vec::new();
    for i in 0..stacks {
        let mut k1 = i * (sectors + 1);
        let mut k2 = k1 + sectors + 1;
        for _ in 0..sectors {
            if i != 0 {
                indices.extend_from_slice(&[k1, k1 + 1, k2]);
            }
            if i != stacks - 1 {
                indices.extend_from_slice(&[k1 + 1, k2 + 1, k2]);
            }
            k1 += 1;
            k2 += 1;
        }
    }

    Geometry { vertices, indices }
}

pub const GROUND_HALF_EXTENT: f32 = 50.0;
pub const GROUND_COLOR: Vec3 = Vec3::new(0.3, 0.5, 0.3);

/// Quad on the XZ plane facing +Y, texture repeated once per unit.
pub fn ground_quad() -> Geometry {
    let e = GROUND_HALF_EXTENT;
    let corner = |x: f32, z: f32, u: f32, v: f32| {
        Vertex::new(Vec3::new(x, 0.0, z), Vec3::Y, GROUND_COLOR, Vec2::new(u, v))
    };
    Geometry {
        vertices: vec![
            corner(-e, -e, 0.0, 0.0),
            corner(e, -e, 2.0 * e, 0.0),
            corner(e, e, 2.0 * e, 2.0 * e),
            corner(-e, e, 0.0, 2.0 * e),
        ],
        indices: vec![0, 2, 1, 0, 3, 2],
    }
}

/// 36 corner positions of the unit cube, twelve unconnected triangles.
pub fn skybox_cube() -> Vec<SkyboxVertex> {
    #[rustfmt::skip]
    const POSITIONS: [[f32; 3]; 36] = [
        [-1.0,  1.0, -1.0], [-1.0, -1.0, -1.0], [ 1.0, -1.0, -1.0],
        [ 1.0, -1.0, -1.0], [ 1.0,  1.0, -1.0], [-1.0,  1.0, -1.0],

        [-1.0, -1.0,  1.0], [-1.0, -1.0, -1.0], [-1.0,  1.0, -1.0],
        [-1.0,  1.0, -1.0], [-1.0,  1.0,  1.0], [-1.0, -1.0,  1.0],

        [ 1.0, -1.0, -1.0], [ 1.0, -1.0,  1.0], [ 1.0,  1.0,  1.0],
        [ 1.0,  1.0,  1.0], [ 1.0,  1.0, -1.0], [ 1.0, -1.0, -1.0],

        [-1.0, -1.0,  1.0], [-1.0,  1.0,  1.0], [ 1.0,  1.0,  1.0],
        [ 1.0,  1.0,  1.0], [ 1.0, -1.0,  1.0], [-1.0, -1.0,  1.0],

        [-1.0,  1.0, -1.0], [ 1.0,  1.0, -1.0], [ 1.0,  1.0,  1.0],
        [ 1.0,  1.0,  1.0], [-1.0,  1.0,  1.0], [-1.0,  1.0, -1.0],

        [-1.0, -1.0, -1.0], [-1.0, -1.0,  1.0], [ 1.0, -1.0, -1.0],
        [ 1.0, -1.0, -1.0], [-1.0, -1.0,  1.0], [ 1.0, -1.0,  1.0],
    ];
    POSITIONS
        .iter()
        .map(|&position| SkyboxVertex { position })
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    /// Every non-degenerate triangle must face away from `center_of`.
    fn assert_outward(geometry: &Geometry, center_of: impl Fn(Vec3) -> Vec3) {
        for triangle in geometry.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2]
                .map(|k| geometry.vertices[triangle[k] as usize].position());
            let normal = (b - a).cross(c - a);
            if normal.length() < 1e-6 {
                continue;
            }
            let centroid = (a + b + c) / 3.0;
            assert!(
                normal.dot(centroid - center_of(centroid)) > 0.0,
                "triangle {triangle:?} faces inward"
            );
        }
    }

    fn assert_indices_in_range(geometry: &Geometry) {
        let count = geometry.vertices.len() as u32;
        assert_eq!(geometry.indices.len() % 3, 0);
        assert!(geometry.indices.iter().all(|&i| i < count));
    }

    #[test]
    fn cylinder_counts_and_winding() {
        let geometry = cylinder(1.0, 10.0, 36);
        assert_eq!(geometry.vertices.len(), 74);
        assert_eq!(geometry.indices.len(), 36 * 6);
        assert_indices_in_range(&geometry);
        assert_outward(&geometry, |p| Vec3::new(0.0, p.y, 0.0));
        for vertex in &geometry.vertices {
            assert_relative_eq!(vertex.position[1].abs(), 5.0);
        }
    }

    #[test]
    fn cone_counts_and_winding() {
        let geometry = cone(1.5, 3.0, 36);
        assert_eq!(geometry.vertices.len(), 38);
        assert_eq!(geometry.indices.len(), 36 * 3);
        assert_indices_in_range(&geometry);
        assert_outward(&geometry, |p| Vec3::new(0.0, p.y, 0.0));
        assert_eq!(geometry.vertices[0].position, [0.0, 1.5, 0.0]);
    }

    #[test]
    fn sphere_counts_and_winding() {
        let (sectors, stacks) = (36, 18);
        let geometry = sphere(0.5, sectors, stacks);
        assert_eq!(
            geometry.vertices.len() as u32,
            (stacks + 1) * (sectors + 1)
        );
        // two triangles per quad, one at each pole row
        assert_eq!(
            geometry.indices.len() as u32,
            (2 * sectors * (stacks - 2) + 2 * sectors) * 3
        );
        assert_indices_in_range(&geometry);
        assert_outward(&geometry, |_| Vec3::ZERO);
        for vertex in &geometry.vertices {
            assert_relative_eq!(vertex.position().length(), 0.5, epsilon = 1e-5);
        }
    }

    #[test]
    fn segment_counts_below_minimum_are_raised() {
        let geometry = cylinder(1.0, 2.0, 0);
        assert_eq!(geometry.vertices.len(), 2 * (MIN_SECTORS as usize + 1));
        assert_eq!(geometry.indices.len(), 6 * MIN_SECTORS as usize);
        assert_indices_in_range(&geometry);

        let geometry = cone(1.0, 2.0, 1);
        assert_eq!(geometry.vertices.len(), MIN_SECTORS as usize + 2);
        assert_eq!(geometry.indices.len(), 3 * MIN_SECTORS as usize);
        assert_indices_in_range(&geometry);

        for (sectors, stacks) in [(0, 0), (0, 1), (5, 0)] {
            let geometry = sphere(1.0, sectors, stacks);
            let sectors = sectors.max(MIN_SECTORS);
            assert_eq!(
                geometry.vertices.len() as u32,
                (MIN_STACKS + 1) * (sectors + 1)
            );
            // only the two pole rows, one triangle per sector each
            assert_eq!(geometry.indices.len() as u32, 2 * sectors * 3);
            assert_indices_in_range(&geometry);
            assert_outward(&geometry, |_| Vec3::ZERO);
        }
    }

    #[test]
    fn ground_quad_faces_up() {
        let geometry = ground_quad();
        assert_eq!(geometry.vertices.len(), 4);
        assert_outward(&geometry, |p| p - Vec3::Y);
        assert_eq!(geometry.vertices[2].tex_coords, [50.0, 50.0]);
        assert!(geometry
            .vertices
            .iter()
            .all(|v| v.color == GROUND_COLOR.to_array()));
    }

    #[test]
    fn skybox_cube_has_twelve_triangles_on_the_unit_cube() {
        let cube = skybox_cube();
        assert_eq!(cube.len(), 36);
        assert!(cube
            .iter()
            .flat_map(|v| v.position)
            .all(|c| c.abs() == 1.0));
    }
}
