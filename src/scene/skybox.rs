use bytemuck::cast_slice;
use glam::{Mat3, Mat4};
use log::error;

use crate::render::{
    geometry,
    gpu::{DepthFunc, Gpu, MeshHandle, MeshUpload, ProgramId, TextureHandle},
    texture::{self, ImageSource},
};

pub const SKYBOX_FAR: f32 = 1000.0;

/// Cubemap drawn behind everything else.
#[derive(Debug)]
pub struct Skybox {
    mesh: MeshHandle,
    cubemap: Option<TextureHandle>,
}

impl Skybox {
    /// A cubemap that fails to load leaves the skybox drawing with the
    /// backend's fallback texture.
    pub fn new(gpu: &mut dyn Gpu, images: &dyn ImageSource, faces: &[String; 6]) -> Self {
        let cubemap = match texture::load_cubemap(gpu, images, "skybox_cubemap", faces) {
            Ok(handle) => Some(handle),
            Err(err) => {
                error!("Skybox cubemap unavailable: {}", err);
                None
            }
        };
        let vertices = geometry::skybox_cube();
        let mesh = gpu.upload_mesh(MeshUpload {
            label: "skybox",
            vertices: cast_slice(&vertices),
            vertex_count: vertices.len() as u32,
            indices: None,
        });
        Self { mesh, cubemap }
    }

    /// Draws at maximum depth with the camera translation removed, then puts
    /// back the default depth test and face culling.
    pub fn draw(&self, gpu: &mut dyn Gpu, program: ProgramId, view: Mat4, projection: Mat4) {
        gpu.set_depth_func(DepthFunc::LessEqual);
        gpu.set_cull_face(false);
        gpu.use_program(program);
        gpu.set_mat4("view", Mat4::from_mat3(Mat3::from_mat4(view)));
        gpu.set_mat4("projection", projection);
        gpu.active_texture(0);
        gpu.bind_texture(self.cubemap.as_ref());
        gpu.set_int("skybox", 0);
        gpu.draw(&self.mesh);
        gpu.set_cull_face(true);
        gpu.set_depth_func(DepthFunc::Less);
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::{
        config::AssetsConfig,
        render::{
            recorder::{Command, RecordingGpu},
            texture::tests::StubImages,
        },
    };

    fn faces_of(size: u32) -> StubImages {
        AssetsConfig::default()
            .skybox
            .iter()
            .fold(StubImages::default(), |images, id| images.with(id, size, size))
    }

    #[test]
    fn view_translation_is_stripped() {
        let mut gpu = RecordingGpu::default();
        let skybox = Skybox::new(&mut gpu, &faces_of(4), &AssetsConfig::default().skybox);
        let view = Mat4::look_at_rh(Vec3::new(30.0, 8.0, -12.0), Vec3::ZERO, Vec3::Y);

        skybox.draw(&mut gpu, ProgramId(1), view, Mat4::IDENTITY);

        let stripped = gpu.mat4_uniform("view").unwrap();
        assert_eq!(stripped.w_axis, glam::Vec4::W);
        assert!(stripped
            .transform_vector3(Vec3::Z)
            .abs_diff_eq(view.transform_vector3(Vec3::Z), 1e-6));
    }

    #[test]
    fn depth_and_culling_are_restored() {
        let mut gpu = RecordingGpu::default();
        let skybox = Skybox::new(&mut gpu, &faces_of(4), &AssetsConfig::default().skybox);
        assert!(skybox.cubemap.is_some());

        skybox.draw(&mut gpu, ProgramId(1), Mat4::IDENTITY, Mat4::IDENTITY);

        let commands = gpu.commands();
        assert_eq!(commands[0], Command::DepthFunc(DepthFunc::LessEqual));
        assert_eq!(commands[1], Command::CullFace(false));
        assert_eq!(commands[2], Command::UseProgram(ProgramId(1)));
        let draw = gpu.position(|c| *c == Command::Draw("skybox".into())).unwrap();
        assert_eq!(
            &commands[draw + 1..],
            &[Command::CullFace(true), Command::DepthFunc(DepthFunc::Less)]
        );
        assert_eq!(gpu.int_uniform("skybox"), Some(0));
    }

    #[test]
    fn broken_cubemap_still_draws() {
        let mut gpu = RecordingGpu::default();
        let mut images = faces_of(4);
        images.insert("skybox.top", image::RgbaImage::new(4, 2));
        let skybox = Skybox::new(&mut gpu, &images, &AssetsConfig::default().skybox);
        assert!(skybox.cubemap.is_none());

        skybox.draw(&mut gpu, ProgramId(1), Mat4::IDENTITY, Mat4::IDENTITY);

        assert!(gpu.commands().contains(&Command::BindTexture(None)));
        assert_eq!(gpu.draw_labels(), vec!["skybox"]);
    }
}
