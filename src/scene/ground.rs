use glam::Mat4;

use crate::{
    config::TextureSetConfig,
    render::{
        geometry,
        gpu::Gpu,
        mesh::Mesh,
        texture::{ImageSource, Texture, TextureKind},
        Drawable,
    },
};

/// Large textured quad at y = 0, visible from both sides.
#[derive(Debug)]
pub struct Ground {
    mesh: Mesh,
}

impl Ground {
    pub fn new(
        gpu: &mut dyn Gpu,
        images: &dyn ImageSource,
        textures: &TextureSetConfig,
    ) -> Self {
        let textures = Texture::load_all(
            gpu,
            images,
            &[
                (textures.diffuse.as_str(), TextureKind::Diffuse),
                (textures.normal.as_str(), TextureKind::Normal),
                (textures.roughness.as_str(), TextureKind::Roughness),
            ],
        );
        let quad = geometry::ground_quad();
        Self {
            mesh: Mesh::new(
                gpu,
                "ground_plane",
                &quad.vertices,
                &quad.indices,
                textures,
            ),
        }
    }
}

impl Drawable for Ground {
    fn draw(&self, gpu: &mut dyn Gpu) {
        gpu.set_cull_face(false);
        gpu.set_mat4("model", Mat4::IDENTITY);
        self.mesh.draw(gpu);
        gpu.set_cull_face(true);
    }
}
