use std::collections::HashSet;

use glam::{Mat4, Vec3};
use image::RgbaImage;

use super::gpu::{
    ColorSpace, DepthFunc, Gpu, Handles, MeshHandle, MeshUpload, ProgramId,
    Release, TextureDimension, TextureHandle, UniformValue,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    UseProgram(ProgramId),
    Uniform(String, UniformValue),
    DepthFunc(DepthFunc),
    CullFace(bool),
    ActiveTexture(u32),
    BindTexture(Option<u64>),
    Draw(String),
}

/// `Gpu` that records every call instead of talking to a device.
#[derive(Default)]
pub struct RecordingGpu {
    commands: Vec<Command>,
    handles: Handles,
    live: HashSet<u64>,
    texture_uploads: Vec<(String, RgbaImage, ColorSpace)>,
}

impl RecordingGpu {
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn texture_uploads(&self) -> &[(String, RgbaImage, ColorSpace)] {
        &self.texture_uploads
    }

    /// Meshes and textures uploaded and not yet released.
    pub fn live_resources(&mut self) -> usize {
        for release in self.handles.drain() {
            let (Release::Mesh(id) | Release::Texture(id)) = release;
            self.live.remove(&id);
        }
        self.live.len()
    }

    pub fn draw_labels(&self) -> Vec<String> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                Command::Draw(label) => Some(label.clone()),
                _ => None,
            })
            .collect()
    }

    /// Names of uniform writes, in call order.
    pub fn uniform_names(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                Command::Uniform(name, _) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    fn last_uniform(&self, name: &str) -> Option<UniformValue> {
        self.commands.iter().rev().find_map(|command| match command {
            Command::Uniform(n, value) if n == name => Some(*value),
            _ => None,
        })
    }

    pub fn int_uniform(&self, name: &str) -> Option<i32> {
        match self.last_uniform(name)? {
            UniformValue::Int(value) => Some(value),
            _ => None,
        }
    }

    pub fn float_uniform(&self, name: &str) -> Option<f32> {
        match self.last_uniform(name)? {
            UniformValue::Float(value) => Some(value),
            _ => None,
        }
    }

    pub fn vec3_uniform(&self, name: &str) -> Option<Vec3> {
        match self.last_uniform(name)? {
            UniformValue::Vec3(value) => Some(value),
            _ => None,
        }
    }

    pub fn mat4_uniform(&self, name: &str) -> Option<Mat4> {
        match self.last_uniform(name)? {
            UniformValue::Mat4(value) => Some(value),
            _ => None,
        }
    }

    /// Index of the first command matching `predicate`.
    pub fn position(&self, predicate: impl Fn(&Command) -> bool) -> Option<usize> {
        self.commands.iter().position(predicate)
    }
}

impl Gpu for RecordingGpu {
    fn use_program(&mut self, program: ProgramId) {
        self.commands.push(Command::UseProgram(program));
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.commands.push(Command::Uniform(name.to_string(), value));
    }

    fn set_depth_func(&mut self, func: DepthFunc) {
        self.commands.push(Command::DepthFunc(func));
    }

    fn set_cull_face(&mut self, enabled: bool) {
        self.commands.push(Command::CullFace(enabled));
    }

    fn active_texture(&mut self, unit: u32) {
        self.commands.push(Command::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, texture: Option<&TextureHandle>) {
        self.commands
            .push(Command::BindTexture(texture.map(TextureHandle::id)));
    }

    fn draw(&mut self, mesh: &MeshHandle) {
        self.commands.push(Command::Draw(mesh.label().to_string()));
    }

    fn upload_mesh(&mut self, upload: MeshUpload<'_>) -> MeshHandle {
        let handle = self.handles.mesh(
            upload.label,
            upload.vertex_count,
            upload.indices.map(|indices| indices.len() as u32),
        );
        self.live.insert(handle.id());
        handle
    }

    fn upload_texture(
        &mut self,
        label: &str,
        image: &RgbaImage,
        color_space: ColorSpace,
    ) -> TextureHandle {
        self.texture_uploads
            .push((label.to_string(), image.clone(), color_space));
        let handle = self.handles.texture(label, TextureDimension::D2);
        self.live.insert(handle.id());
        handle
    }

    fn upload_cubemap(
        &mut self,
        label: &str,
        _faces: &[RgbaImage; 6],
    ) -> TextureHandle {
        let handle = self.handles.texture(label, TextureDimension::Cube);
        self.live.insert(handle.id());
        handle
    }
}
