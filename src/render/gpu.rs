use std::{
    fmt,
    sync::mpsc::{channel, Receiver, Sender},
};

use glam::{Mat4, Vec3};
use image::RgbaImage;

pub const MAX_TEXTURE_UNITS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Mat4(Mat4),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthFunc {
    #[default]
    Less,
    LessEqual,
}

impl DepthFunc {
    pub fn compare(self) -> wgpu::CompareFunction {
        match self {
            DepthFunc::Less => wgpu::CompareFunction::Less,
            DepthFunc::LessEqual => wgpu::CompareFunction::LessEqual,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    D2,
    Cube,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Srgb,
    Linear,
}

pub struct MeshUpload<'a> {
    pub label: &'a str,
    pub vertices: &'a [u8],
    pub vertex_count: u32,
    pub indices: Option<&'a [u32]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Mesh(u64),
    Texture(u64),
}

/// Owns a vertex (and optional index) buffer living in a backend.
/// Dropping the handle queues the buffers for release.
pub struct MeshHandle {
    id: u64,
    label: String,
    vertex_count: u32,
    index_count: Option<u32>,
    release: Sender<Release>,
}

impl MeshHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> Option<u32> {
        self.index_count
    }
}

impl Drop for MeshHandle {
    fn drop(&mut self) {
        // the backend may already be gone on shutdown
        let _ = self.release.send(Release::Mesh(self.id));
    }
}

impl fmt::Debug for MeshHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MeshHandle({}, {})", self.id, self.label)
    }
}

pub struct TextureHandle {
    id: u64,
    label: String,
    dimension: TextureDimension,
    release: Sender<Release>,
}

impl TextureHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn dimension(&self) -> TextureDimension {
        self.dimension
    }
}

impl Drop for TextureHandle {
    fn drop(&mut self) {
        let _ = self.release.send(Release::Texture(self.id));
    }
}

impl fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextureHandle({}, {})", self.id, self.label)
    }
}

/// Hands out resource ids and collects the release messages sent by
/// dropped handles.
pub struct Handles {
    next_id: u64,
    release_rx: Receiver<Release>,
    release_tx: Sender<Release>,
}

impl Default for Handles {
    fn default() -> Self {
        let (release_tx, release_rx) = channel();
        Self {
            next_id: 1,
            release_rx,
            release_tx,
        }
    }
}

impl Handles {
    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn mesh(
        &mut self,
        label: &str,
        vertex_count: u32,
        index_count: Option<u32>,
    ) -> MeshHandle {
        MeshHandle {
            id: self.next(),
            label: label.to_string(),
            vertex_count,
            index_count,
            release: self.release_tx.clone(),
        }
    }

    pub fn texture(
        &mut self,
        label: &str,
        dimension: TextureDimension,
    ) -> TextureHandle {
        TextureHandle {
            id: self.next(),
            label: label.to_string(),
            dimension,
            release: self.release_tx.clone(),
        }
    }

    pub fn drain(&self) -> Vec<Release> {
        self.release_rx.try_iter().collect()
    }
}

/// Immediate-mode access to the GPU: a bound program with named uniforms,
/// a little fixed-function state, draws, and resource uploads.
///
/// Uniform writes go to the currently bound program. Names that the program
/// does not declare, mismatched value types and writes without a valid
/// program are ignored.
pub trait Gpu {
    fn use_program(&mut self, program: ProgramId);
    fn set_uniform(&mut self, name: &str, value: UniformValue);
    fn set_depth_func(&mut self, func: DepthFunc);
    fn set_cull_face(&mut self, enabled: bool);
    fn active_texture(&mut self, unit: u32);
    fn bind_texture(&mut self, texture: Option<&TextureHandle>);
    fn draw(&mut self, mesh: &MeshHandle);

    fn upload_mesh(&mut self, upload: MeshUpload<'_>) -> MeshHandle;
    fn upload_texture(
        &mut self,
        label: &str,
        image: &RgbaImage,
        color_space: ColorSpace,
    ) -> TextureHandle;
    fn upload_cubemap(
        &mut self,
        label: &str,
        faces: &[RgbaImage; 6],
    ) -> TextureHandle;

    fn set_bool(&mut self, name: &str, value: bool) {
        self.set_uniform(name, UniformValue::Int(value as i32));
    }

    fn set_int(&mut self, name: &str, value: i32) {
        self.set_uniform(name, UniformValue::Int(value));
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.set_uniform(name, UniformValue::Float(value));
    }

    fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.set_uniform(name, UniformValue::Vec3(value));
    }

    fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.set_uniform(name, UniformValue::Mat4(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_handles_are_queued_for_release() {
        let mut handles = Handles::default();
        let mesh = handles.mesh("quad", 4, Some(6));
        let texture = handles.texture("sand", TextureDimension::D2);
        let (mesh_id, texture_id) = (mesh.id(), texture.id());
        assert_ne!(mesh_id, texture_id);
        assert!(handles.drain().is_empty());

        drop(texture);
        drop(mesh);
        assert_eq!(
            handles.drain(),
            vec![Release::Texture(texture_id), Release::Mesh(mesh_id)]
        );
    }
}
