use std::{mem, path::Path};

use bytemuck::{cast_slice, Pod, Zeroable};
use glam::{Vec2, Vec3};
use log::info;
use thiserror::Error;

use crate::transform::Transform;

use super::{
    gpu::{Gpu, MeshHandle, MeshUpload},
    texture::{Texture, TextureKind},
    Drawable,
};

pub trait VertexTrait: Pod {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, color: Vec3, tex_coords: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            color: color.to_array(),
            tex_coords: tex_coords.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

impl VertexTrait for Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Float32x3,
            3 => Float32x2
        ];
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Position-only vertex of the skybox cube.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SkyboxVertex {
    pub position: [f32; 3],
}

impl VertexTrait for SkyboxVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 1] =
            wgpu::vertex_attr_array![0 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Uploaded geometry plus the textures it samples. Owns its GPU buffers
/// through the handle, so a `Mesh` can be moved but never copied.
#[derive(Debug)]
pub struct Mesh {
    handle: MeshHandle,
    textures: Vec<Texture>,
}

impl Mesh {
    pub fn new<V: VertexTrait>(
        gpu: &mut dyn Gpu,
        label: &str,
        vertices: &[V],
        indices: &[u32],
        textures: Vec<Texture>,
    ) -> Self {
        let handle = gpu.upload_mesh(MeshUpload {
            label,
            vertices: cast_slice(vertices),
            vertex_count: vertices.len() as u32,
            indices: Some(indices),
        });
        Self { handle, textures }
    }

    pub fn handle(&self) -> &MeshHandle {
        &self.handle
    }

    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    fn texture(&self, kind: TextureKind) -> Option<&Texture> {
        self.textures
            .iter()
            .find(|texture| texture.kind() == kind && texture.is_loaded())
    }
}

impl Drawable for Mesh {
    fn draw(&self, gpu: &mut dyn Gpu) {
        for kind in TextureKind::ALL {
            match self.texture(kind) {
                Some(texture) => {
                    gpu.active_texture(kind.unit());
                    gpu.bind_texture(texture.handle());
                    gpu.set_int(kind.sampler_name(), kind.unit() as i32);
                }
                None => gpu.set_int(kind.sampler_name(), -1),
            }
        }
        gpu.draw(&self.handle);
        gpu.active_texture(0);
    }
}

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("failed to load {path}: {source}")]
    Obj {
        path: String,
        #[source]
        source: tobj::LoadError,
    },
    #[error("{0} contains no geometry")]
    Empty(String),
}

/// Meshes sharing one model matrix, as loaded from an OBJ file.
#[derive(Debug)]
pub struct Model {
    pub transform: Transform,
    meshes: Vec<Mesh>,
}

impl Model {
    pub fn load_obj(
        gpu: &mut dyn Gpu,
        path: &Path,
        transform: Transform,
    ) -> Result<Self, MeshError> {
        let (models, _materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)
            .map_err(|source| MeshError::Obj {
                path: path.display().to_string(),
                source,
            })?;

        let meshes = models
            .iter()
            .filter(|model| !model.mesh.indices.is_empty())
            .map(|model| {
                let vertices = obj_vertices(&model.mesh);
                Mesh::new(
                    gpu,
                    &model.name,
                    &vertices,
                    &model.mesh.indices,
                    vec![],
                )
            })
            .collect::<Vec<_>>();

        if meshes.is_empty() {
            return Err(MeshError::Empty(path.display().to_string()));
        }
        info!("Model loaded: {} ({} meshes)", path.display(), meshes.len());

        Ok(Self { transform, meshes })
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }
}

impl Drawable for Model {
    fn draw(&self, gpu: &mut dyn Gpu) {
        gpu.set_mat4("model", self.transform.build_matrix());
        for mesh in &self.meshes {
            mesh.draw(gpu);
        }
    }
}

fn obj_vertices(mesh: &tobj::Mesh) -> Vec<Vertex> {
    let triple = |data: &[f32], i: usize, fallback: [f32; 3]| {
        data.get(i * 3..i * 3 + 3)
            .map(|v| [v[0], v[1], v[2]])
            .unwrap_or(fallback)
    };

    (0..mesh.positions.len() / 3)
        .map(|i| Vertex {
            position: triple(&mesh.positions, i, [0.0; 3]),
            normal: triple(&mesh.normals, i, [0.0, 1.0, 0.0]),
            color: triple(&mesh.vertex_color, i, [1.0; 3]),
            tex_coords: mesh
                .texcoords
                .get(i * 2..i * 2 + 2)
                .map(|uv| [uv[0], 1.0 - uv[1]])
                .unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recorder::{Command, RecordingGpu};

    fn quad() -> (Vec<Vertex>, Vec<u32>) {
        let v = |x: f32, z: f32| {
            Vertex::new(Vec3::new(x, 0.0, z), Vec3::Y, Vec3::ONE, Vec2::ZERO)
        };
        (vec![v(0.0, 0.0), v(1.0, 0.0), v(1.0, 1.0)], vec![0, 2, 1])
    }

    #[test]
    fn vertex_layout_matches_struct() {
        let desc = Vertex::desc();
        assert_eq!(desc.array_stride, 44);
        assert_eq!(desc.attributes[3].offset, 36);
        assert_eq!(SkyboxVertex::desc().array_stride, 12);
    }

    #[test]
    fn draw_binds_present_kinds_and_disables_missing_ones() {
        let mut gpu = RecordingGpu::default();
        let (vertices, indices) = quad();
        let diffuse = Texture::from_image(
            &mut gpu,
            "sand_diff",
            TextureKind::Diffuse,
            image::RgbaImage::new(2, 2),
        );
        let roughness = Texture::from_image(
            &mut gpu,
            "sand_rough",
            TextureKind::Roughness,
            image::RgbaImage::new(2, 2),
        );
        let mesh = Mesh::new(
            &mut gpu,
            "quad",
            &vertices,
            &indices,
            vec![diffuse, roughness],
        );
        gpu.clear_commands();

        mesh.draw(&mut gpu);

        assert_eq!(gpu.int_uniform("texture_diffuse1"), Some(0));
        assert_eq!(gpu.int_uniform("texture_normal1"), Some(-1));
        assert_eq!(gpu.int_uniform("texture_roughness1"), Some(2));
        assert_eq!(gpu.draw_labels(), vec!["quad"]);
        assert_eq!(gpu.commands().last(), Some(&Command::ActiveTexture(0)));
        let bound = gpu
            .commands()
            .iter()
            .filter(|command| matches!(command, Command::BindTexture(Some(_))))
            .count();
        assert_eq!(bound, 2);
    }

    #[test]
    fn unloaded_texture_counts_as_missing() {
        let mut gpu = RecordingGpu::default();
        let (vertices, indices) = quad();
        let normal = Texture::unloaded("missing_nor", TextureKind::Normal);
        let mesh =
            Mesh::new(&mut gpu, "quad", &vertices, &indices, vec![normal]);

        mesh.draw(&mut gpu);

        assert_eq!(gpu.int_uniform("texture_normal1"), Some(-1));
        assert!(!gpu
            .commands()
            .iter()
            .any(|command| matches!(command, Command::BindTexture(_))));
    }

    #[test]
    fn dropping_a_mesh_releases_buffers_and_textures() {
        let mut gpu = RecordingGpu::default();
        let (vertices, indices) = quad();
        let diffuse = Texture::from_image(
            &mut gpu,
            "sand_diff",
            TextureKind::Diffuse,
            image::RgbaImage::new(1, 1),
        );
        let mesh =
            Mesh::new(&mut gpu, "quad", &vertices, &indices, vec![diffuse]);
        assert_eq!(gpu.live_resources(), 2);
        drop(mesh);
        assert_eq!(gpu.live_resources(), 0);
    }

    #[test]
    fn model_sets_its_matrix_before_drawing() {
        let mut gpu = RecordingGpu::default();
        let (vertices, indices) = quad();
        let model = Model {
            transform: Transform {
                pos: Vec3::new(3.0, 0.0, 0.0),
                ..Default::default()
            },
            meshes: vec![Mesh::new(&mut gpu, "rock", &vertices, &indices, vec![])],
        };

        model.draw(&mut gpu);

        let model_matrix = gpu.mat4_uniform("model").unwrap();
        assert_eq!(model_matrix.w_axis.x, 3.0);
        assert_eq!(gpu.draw_labels(), vec!["rock"]);
    }

    #[test]
    fn missing_obj_is_an_error() {
        let mut gpu = RecordingGpu::default();
        let result = Model::load_obj(
            &mut gpu,
            Path::new("does/not/exist.obj"),
            Transform::default(),
        );
        assert!(matches!(result, Err(MeshError::Obj { .. })));
    }
}
