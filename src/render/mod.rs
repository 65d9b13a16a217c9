use gpu::Gpu;

pub mod camera;
pub mod frustum;
pub mod geometry;
pub mod gpu;
pub mod light;
pub mod mesh;
#[cfg(test)]
pub mod recorder;
pub mod shader;
pub mod state;
pub mod texture;
pub mod uniforms;

/// Anything that can issue its own draw calls against the bound program.
/// Implementations leave texture unit 0 active when they return.
pub trait Drawable {
    fn draw(&self, gpu: &mut dyn Gpu);
}
