use std::{collections::HashMap, fmt, path::Path, sync::Arc};

use anyhow::{Context, Result};
use image::RgbaImage;
use log::{debug, info, trace, warn};
use wgpu::util::DeviceExt;
use winit::{dpi::PhysicalSize, window::Window};

use super::{
    gpu::{
        ColorSpace, DepthFunc, Gpu, Handles, MeshHandle, MeshUpload, ProgramId,
        Release, TextureDimension, TextureHandle, UniformValue,
        MAX_TEXTURE_UNITS,
    },
    shader::{KindLayout, PipelineKey, Program, ProgramKind, ShaderAssets},
    texture::GpuTexture,
};

pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.1,
    b: 0.15,
    a: 1.0,
};

const INITIAL_UNIFORM_ARENA: u64 = 64 * 1024;

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: Option<(wgpu::Buffer, u32)>,
    vertex_count: u32,
    stride: u64,
}

/// One recorded draw, replayed in `end_frame`.
struct DrawCall {
    program: usize,
    key: PipelineKey,
    uniform_offset: u32,
    mesh: u64,
    textures: Vec<Option<u64>>,
}

struct UniformArena {
    buffer: wgpu::Buffer,
    bind_groups: HashMap<ProgramKind, wgpu::BindGroup>,
    bytes: Vec<u8>,
}

impl UniformArena {
    fn new(
        device: &wgpu::Device,
        layouts: &HashMap<ProgramKind, KindLayout>,
        size: u64,
    ) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform_arena"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_groups = layouts
            .iter()
            .map(|(&kind, layout)| {
                let bind_group =
                    device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some(&format!(
                            "{}_uniforms_bind_group",
                            kind.shader_id()
                        )),
                        layout: &layout.uniforms,
                        entries: &[wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::Buffer(
                                wgpu::BufferBinding {
                                    buffer: &buffer,
                                    offset: 0,
                                    size: wgpu::BufferSize::new(
                                        kind.uniforms().size(),
                                    ),
                                },
                            ),
                        }],
                    });
                (kind, bind_group)
            })
            .collect();
        Self {
            buffer,
            bind_groups,
            bytes: Vec::new(),
        }
    }

    /// Appends a snapshot at the next aligned offset.
    fn push(&mut self, data: &[u8], alignment: u64) -> u32 {
        let offset = (self.bytes.len() as u64).next_multiple_of(alignment);
        self.bytes.resize(offset as usize, 0);
        self.bytes.extend_from_slice(data);
        offset as u32
    }
}

pub struct RenderState {
    _adapter: wgpu::Adapter,
    _instance: wgpu::Instance,
    arena: UniformArena,
    config: wgpu::SurfaceConfiguration,
    depth: wgpu::TextureView,
    pub device: wgpu::Device,
    fallback_2d: GpuTexture,
    fallback_cube: GpuTexture,
    handles: Handles,
    layouts: HashMap<ProgramKind, KindLayout>,
    meshes: HashMap<u64, GpuMesh>,
    programs: Vec<Program>,
    queue: wgpu::Queue,
    shaders: ShaderAssets,
    surface: wgpu::Surface<'static>,
    textures: HashMap<u64, GpuTexture>,
    uniform_alignment: u64,

    active_unit: u32,
    bound: Option<usize>,
    cull: bool,
    depth_func: DepthFunc,
    draws: Vec<DrawCall>,
    units: [Option<u64>; MAX_TEXTURE_UNITS],
}

impl fmt::Debug for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RenderState")
    }
}

impl RenderState {
    pub async fn new(window: Arc<Window>, shader_root: &Path) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window.clone())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                compatible_surface: Some(&surface),
                ..Default::default()
            })
            .await
            .context("no compatible GPU adapter")?;
        info!("Adapter: {:?}", adapter.get_info());
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await?;

        let size = window.inner_size();
        let config = surface
            .get_default_config(&adapter, size.width.max(1), size.height.max(1))
            .context("surface is not supported by the adapter")?;
        surface.configure(&device, &config);

        let shaders = ShaderAssets::new(shader_root).with_context(|| {
            format!("opening shader directory {}", shader_root.display())
        })?;
        let layouts = ProgramKind::ALL
            .into_iter()
            .map(|kind| (kind, KindLayout::new(&device, kind)))
            .collect();
        let arena = UniformArena::new(&device, &layouts, INITIAL_UNIFORM_ARENA);
        let uniform_alignment =
            device.limits().min_uniform_buffer_offset_alignment as u64;
        let depth = GpuTexture::create_depth(&device, &config);
        let fallback_2d = GpuTexture::fallback(
            &device,
            &queue,
            wgpu::TextureViewDimension::D2,
        );
        let fallback_cube = GpuTexture::fallback(
            &device,
            &queue,
            wgpu::TextureViewDimension::Cube,
        );

        Ok(Self {
            _adapter: adapter,
            _instance: instance,
            arena,
            config,
            depth,
            device,
            fallback_2d,
            fallback_cube,
            handles: Handles::default(),
            layouts,
            meshes: HashMap::new(),
            programs: vec![],
            queue,
            shaders,
            surface,
            textures: HashMap::new(),
            uniform_alignment,

            active_unit: 0,
            bound: None,
            cull: true,
            depth_func: DepthFunc::Less,
            draws: vec![],
            units: [None; MAX_TEXTURE_UNITS],
        })
    }

    /// Always returns an id. A program that failed to build stays in the
    /// table as an invalid program.
    pub fn create_program(&mut self, kind: ProgramKind) -> ProgramId {
        let program = Program::new(&self.device, &mut self.shaders, kind);
        self.programs.push(program);
        ProgramId(self.programs.len() - 1)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = GpuTexture::create_depth(&self.device, &self.config);
    }

    /// Frees released resources, reloads changed shaders and resets the
    /// fixed-function state.
    pub fn begin_frame(&mut self) {
        for release in self.handles.drain() {
            match release {
                Release::Mesh(id) => {
                    self.meshes.remove(&id);
                }
                Release::Texture(id) => {
                    self.textures.remove(&id);
                }
            }
            trace!("Released {:?}", release);
        }

        for shader_id in self.shaders.hot_reload() {
            for program in &mut self.programs {
                if program.kind.shader_id() == shader_id {
                    program.reload(&self.device, &mut self.shaders);
                }
            }
        }

        self.active_unit = 0;
        self.bound = None;
        self.cull = true;
        self.depth_func = DepthFunc::Less;
        self.units = [None; MAX_TEXTURE_UNITS];
        self.draws.clear();
        self.arena.bytes.clear();
    }

    /// Uploads this frame's uniforms and replays the recorded draws in a
    /// single render pass.
    pub fn end_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        let draws = std::mem::take(&mut self.draws);
        let frame = self.surface.get_current_texture()?;

        let arena_size = self.arena.bytes.len() as u64;
        if arena_size > self.arena.buffer.size() {
            debug!("Growing uniform arena to {} bytes", arena_size);
            let bytes = std::mem::take(&mut self.arena.bytes);
            self.arena = UniformArena::new(
                &self.device,
                &self.layouts,
                arena_size.next_power_of_two(),
            );
            self.arena.bytes = bytes;
        }
        if !self.arena.bytes.is_empty() {
            self.queue
                .write_buffer(&self.arena.buffer, 0, &self.arena.bytes);
        }

        let texture_groups = draws
            .iter()
            .map(|draw| self.texture_bind_group(draw))
            .collect::<Vec<_>>();

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(
            &wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            },
        );

        {
            let mut rpass =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("scene_pass"),
                    color_attachments: &[Some(
                        wgpu::RenderPassColorAttachment {
                            view: &view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                                store: wgpu::StoreOp::Store,
                            },
                        },
                    )],
                    depth_stencil_attachment: Some(
                        wgpu::RenderPassDepthStencilAttachment {
                            view: &self.depth,
                            depth_ops: Some(wgpu::Operations {
                                load: wgpu::LoadOp::Clear(1.0),
                                store: wgpu::StoreOp::Store,
                            }),
                            stencil_ops: None,
                        },
                    ),
                    ..Default::default()
                });

            for (draw, textures) in draws.iter().zip(&texture_groups) {
                let program = &self.programs[draw.program];
                let (Some(pipeline), Some(mesh)) =
                    (program.pipeline(&draw.key), self.meshes.get(&draw.mesh))
                else {
                    continue;
                };
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(
                    0,
                    &self.arena.bind_groups[&program.kind],
                    &[draw.uniform_offset],
                );
                rpass.set_bind_group(1, textures, &[]);
                rpass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                match &mesh.index_buffer {
                    Some((buffer, count)) => {
                        rpass.set_index_buffer(
                            buffer.slice(..),
                            wgpu::IndexFormat::Uint32,
                        );
                        rpass.draw_indexed(0..*count, 0, 0..1);
                    }
                    None => rpass.draw(0..mesh.vertex_count, 0..1),
                }
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn texture_bind_group(&self, draw: &DrawCall) -> wgpu::BindGroup {
        let kind = self.programs[draw.program].kind;
        let resolved = kind
            .texture_units()
            .iter()
            .zip(&draw.textures)
            .map(|(&dimension, id)| {
                let fallback = match dimension {
                    TextureDimension::D2 => &self.fallback_2d,
                    TextureDimension::Cube => &self.fallback_cube,
                };
                id.and_then(|id| self.textures.get(&id))
                    .filter(|texture| texture.dimension == fallback.dimension)
                    .unwrap_or(fallback)
            })
            .collect::<Vec<_>>();

        let entries = resolved
            .iter()
            .enumerate()
            .flat_map(|(unit, texture)| {
                let binding = unit as u32 * 2;
                [
                    wgpu::BindGroupEntry {
                        binding,
                        resource: wgpu::BindingResource::TextureView(
                            &texture.view,
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: binding + 1,
                        resource: wgpu::BindingResource::Sampler(
                            &texture.sampler,
                        ),
                    },
                ]
            })
            .collect::<Vec<_>>();

        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{}_textures_bind_group", kind.shader_id())),
            layout: &self.layouts[&kind].textures,
            entries: &entries,
        })
    }
}

impl Gpu for RenderState {
    fn use_program(&mut self, program: ProgramId) {
        self.bound = match self.programs.get_mut(program.0) {
            Some(found) => found.check_valid().then_some(program.0),
            None => {
                warn!("Unknown program {:?}", program);
                None
            }
        };
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        let Some(index) = self.bound else {
            return;
        };
        let program = &mut self.programs[index];
        if !program.uniforms.set(name, value) {
            trace!("{} has no uniform {}", program.kind.shader_id(), name);
        }
    }

    fn set_depth_func(&mut self, func: DepthFunc) {
        self.depth_func = func;
    }

    fn set_cull_face(&mut self, enabled: bool) {
        self.cull = enabled;
    }

    fn active_texture(&mut self, unit: u32) {
        if (unit as usize) < MAX_TEXTURE_UNITS {
            self.active_unit = unit;
        } else {
            warn!("Texture unit {} out of range", unit);
        }
    }

    fn bind_texture(&mut self, texture: Option<&TextureHandle>) {
        self.units[self.active_unit as usize] = texture.map(TextureHandle::id);
    }

    fn draw(&mut self, mesh: &MeshHandle) {
        let Some(index) = self.bound else {
            trace!("Draw of {} without a valid program", mesh.label());
            return;
        };
        let Some(gpu_mesh) = self.meshes.get(&mesh.id()) else {
            warn!("Draw of unknown mesh {:?}", mesh);
            return;
        };
        let program = &mut self.programs[index];
        let kind = program.kind;
        if gpu_mesh.stride != kind.vertex_layout().array_stride {
            warn!(
                "Mesh {} does not match the {} vertex layout",
                mesh.label(),
                kind.shader_id()
            );
            return;
        }

        let key = PipelineKey {
            depth: self.depth_func,
            cull: self.cull,
        };
        if !program.ensure_pipeline(
            &self.device,
            &self.layouts[&kind],
            self.config.format,
            key,
        ) {
            self.bound = None;
            return;
        }

        let uniform_offset = self
            .arena
            .push(&program.uniforms.as_bytes(), self.uniform_alignment);
        let textures = (0..kind.texture_units().len())
            .map(|unit| self.units[unit])
            .collect();
        self.draws.push(DrawCall {
            program: index,
            key,
            uniform_offset,
            mesh: mesh.id(),
            textures,
        });
    }

    fn upload_mesh(&mut self, upload: MeshUpload<'_>) -> MeshHandle {
        let vertex_buffer =
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{}_vertex_buffer", upload.label)),
                    contents: upload.vertices,
                    usage: wgpu::BufferUsages::VERTEX,
                });
        let index_buffer = upload.indices.map(|indices| {
            let buffer = self.device.create_buffer_init(
                &wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{}_index_buffer", upload.label)),
                    contents: bytemuck::cast_slice(indices),
                    usage: wgpu::BufferUsages::INDEX,
                },
            );
            (buffer, indices.len() as u32)
        });
        let stride = match upload.vertex_count {
            0 => 0,
            count => upload.vertices.len() as u64 / count as u64,
        };

        let handle = self.handles.mesh(
            upload.label,
            upload.vertex_count,
            index_buffer.as_ref().map(|(_, count)| *count),
        );
        debug!("Mesh uploaded: {:?}", handle);
        self.meshes.insert(
            handle.id(),
            GpuMesh {
                vertex_buffer,
                index_buffer,
                vertex_count: upload.vertex_count,
                stride,
            },
        );
        handle
    }

    fn upload_texture(
        &mut self,
        label: &str,
        image: &RgbaImage,
        color_space: ColorSpace,
    ) -> TextureHandle {
        let texture = GpuTexture::from_image(
            &self.device,
            &self.queue,
            label,
            image,
            color_space,
        );
        let handle = self.handles.texture(label, TextureDimension::D2);
        self.textures.insert(handle.id(), texture);
        handle
    }

    fn upload_cubemap(
        &mut self,
        label: &str,
        faces: &[RgbaImage; 6],
    ) -> TextureHandle {
        let texture =
            GpuTexture::cubemap(&self.device, &self.queue, label, faces);
        let handle = self.handles.texture(label, TextureDimension::Cube);
        self.textures.insert(handle.id(), texture);
        handle
    }
}
