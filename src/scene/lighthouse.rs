use glam::{Mat4, Vec3};

use crate::{
    config::TextureSetConfig,
    render::{
        geometry,
        gpu::Gpu,
        light::Light,
        mesh::Mesh,
        texture::{ImageSource, Texture, TextureKind},
        Drawable,
    },
};

/// Culling sphere, picked by hand to cover tower, roof and beacon.
pub const BOUNDING_CENTER: Vec3 = Vec3::new(0.0, 5.0, 0.0);
pub const BOUNDING_RADIUS: f32 = 10.0;

pub const BEACON_POSITION: Vec3 = Vec3::new(0.0, 12.0, 0.0);
pub const BEACON_DEGREES_PER_SECOND: f32 = 45.0;

const TOWER_POSITION: Vec3 = Vec3::new(0.0, 5.0, 0.0);
const ROOF_POSITION: Vec3 = Vec3::new(0.0, 10.0, 0.0);

/// Tower, roof and the beacon lamp on top.
#[derive(Debug)]
pub struct Lighthouse {
    tower: Mesh,
    roof: Mesh,
    beacon: Mesh,
}

impl Lighthouse {
    pub fn new(
        gpu: &mut dyn Gpu,
        images: &dyn ImageSource,
        textures: &TextureSetConfig,
    ) -> Self {
        let set = [
            (textures.diffuse.as_str(), TextureKind::Diffuse),
            (textures.normal.as_str(), TextureKind::Normal),
            (textures.roughness.as_str(), TextureKind::Roughness),
        ];
        // tower and roof each own a copy of the brick set
        let mut loaded = Texture::load_all(gpu, images, &[set, set].concat());
        let roof_textures = loaded.split_off(set.len());
        let tower_textures = loaded;

        let tower = geometry::cylinder(1.0, 10.0, 36);
        let roof = geometry::cone(1.5, 3.0, 36);
        let beacon = geometry::sphere(0.5, 36, 18);

        Self {
            tower: Mesh::new(
                gpu,
                "lighthouse_tower",
                &tower.vertices,
                &tower.indices,
                tower_textures,
            ),
            roof: Mesh::new(
                gpu,
                "lighthouse_roof",
                &roof.vertices,
                &roof.indices,
                roof_textures,
            ),
            beacon: Mesh::new(
                gpu,
                "lighthouse_beacon",
                &beacon.vertices,
                &beacon.indices,
                vec![],
            ),
        }
    }

    /// Beam direction after `elapsed` seconds: a full turn around Y every
    /// eight seconds, tilted down 45 degrees.
    pub fn beacon_direction(elapsed: f32) -> Vec3 {
        let angle = (elapsed * BEACON_DEGREES_PER_SECOND).to_radians();
        Vec3::new(angle.cos(), -1.0, angle.sin()).normalize()
    }

    /// Turns the beacon light, pushes it to the bound program and draws the
    /// three parts.
    pub fn render(&self, gpu: &mut dyn Gpu, elapsed: f32, beacon: &mut Light) {
        beacon.set_position(BEACON_POSITION);
        beacon.set_direction(Self::beacon_direction(elapsed));
        gpu.set_vec3("spotLight.position", beacon.position());
        gpu.set_vec3("spotLight.direction", beacon.direction());

        for (mesh, position) in [
            (&self.tower, TOWER_POSITION),
            (&self.roof, ROOF_POSITION),
            (&self.beacon, BEACON_POSITION),
        ] {
            gpu.set_mat4("model", Mat4::from_translation(position));
            mesh.draw(gpu);
        }
    }
}
