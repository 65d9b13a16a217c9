use std::{
    collections::{HashMap, HashSet},
    path::Path,
    time::{Duration, Instant},
};

use assets_manager::{loader, Asset, AssetCache};
use log::{error, info, warn};
use thiserror::Error;

use super::{
    gpu::{DepthFunc, TextureDimension},
    mesh::{SkyboxVertex, Vertex, VertexTrait},
    texture::GpuTexture,
    uniforms::{LitUniforms, SkyboxUniforms, UniformBlock},
};

pub const RELOAD_DEBOUNCE: Duration = Duration::from_millis(300);

pub struct WgslSource(String);

impl From<String> for WgslSource {
    fn from(value: String) -> Self {
        WgslSource(value)
    }
}

impl Asset for WgslSource {
    const EXTENSION: &'static str = "wgsl";
    type Loader = loader::LoadFrom<String, loader::StringLoader>;
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to read shader {id}: {source}")]
    Source {
        id: String,
        #[source]
        source: assets_manager::Error,
    },
    #[error("shader {id} failed validation:\n{message}")]
    Validation { id: String, message: String },
}

/// WGSL sources under the shader directory, watched for changes.
pub struct ShaderAssets {
    cache: AssetCache,
    last_reload: Instant,
    tracked: HashSet<String>,
}

impl ShaderAssets {
    pub fn new(root: &Path) -> std::io::Result<Self> {
        Ok(Self {
            cache: AssetCache::new(root)?,
            last_reload: Instant::now(),
            tracked: HashSet::new(),
        })
    }

    pub fn source(&mut self, shader_id: &str) -> Result<String, ShaderError> {
        self.tracked.insert(shader_id.to_string());
        let handle = self.cache.load::<WgslSource>(shader_id).map_err(
            |source| ShaderError::Source {
                id: shader_id.to_string(),
                source,
            },
        )?;
        let source = handle.read().0.clone();
        Ok(source)
    }

    /// Ids of tracked shaders whose file changed since the last call.
    pub fn hot_reload(&mut self) -> Vec<String> {
        self.cache.hot_reload();
        if self.last_reload.elapsed() < RELOAD_DEBOUNCE {
            return vec![];
        }

        let changed = self
            .tracked
            .iter()
            .filter(|shader_id| {
                self.cache
                    .load::<WgslSource>(shader_id)
                    .is_ok_and(|handle| handle.reloaded_global())
            })
            .cloned()
            .collect::<Vec<_>>();
        if !changed.is_empty() {
            self.last_reload = Instant::now();
        }
        changed
    }
}

/// The fixed set of programs the renderer knows how to lay out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    Lit,
    Skybox,
}

impl ProgramKind {
    pub const ALL: [ProgramKind; 2] = [ProgramKind::Lit, ProgramKind::Skybox];

    pub fn shader_id(self) -> &'static str {
        match self {
            ProgramKind::Lit => "lit",
            ProgramKind::Skybox => "skybox",
        }
    }

    pub fn uniforms(self) -> Box<dyn UniformBlock> {
        match self {
            ProgramKind::Lit => Box::<LitUniforms>::default(),
            ProgramKind::Skybox => Box::<SkyboxUniforms>::default(),
        }
    }

    /// Dimension sampled at each texture unit, indexed by unit.
    pub fn texture_units(self) -> &'static [TextureDimension] {
        match self {
            ProgramKind::Lit => &[TextureDimension::D2; 3],
            ProgramKind::Skybox => &[TextureDimension::Cube],
        }
    }

    pub fn vertex_layout(self) -> wgpu::VertexBufferLayout<'static> {
        match self {
            ProgramKind::Lit => Vertex::desc(),
            ProgramKind::Skybox => SkyboxVertex::desc(),
        }
    }
}

fn view_dimension(dimension: TextureDimension) -> wgpu::TextureViewDimension {
    match dimension {
        TextureDimension::D2 => wgpu::TextureViewDimension::D2,
        TextureDimension::Cube => wgpu::TextureViewDimension::Cube,
    }
}

/// Bind group and pipeline layouts shared by every program of one kind.
/// Group 0 holds the uniform block at a dynamic offset, group 1 a
/// texture/sampler pair per unit.
pub struct KindLayout {
    pub uniforms: wgpu::BindGroupLayout,
    pub textures: wgpu::BindGroupLayout,
    pipeline: wgpu::PipelineLayout,
}

impl KindLayout {
    pub fn new(device: &wgpu::Device, kind: ProgramKind) -> Self {
        let label = kind.shader_id();
        let uniforms =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{}_uniforms_layout", label)),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX
                        | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(
                            kind.uniforms().size(),
                        ),
                    },
                    count: None,
                }],
            });

        let entries = kind
            .texture_units()
            .iter()
            .enumerate()
            .flat_map(|(unit, &dimension)| {
                let binding = unit as u32 * 2;
                [
                    wgpu::BindGroupLayoutEntry {
                        binding,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float {
                                filterable: true,
                            },
                            view_dimension: view_dimension(dimension),
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: binding + 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(
                            wgpu::SamplerBindingType::Filtering,
                        ),
                        count: None,
                    },
                ]
            })
            .collect::<Vec<_>>();
        let textures =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{}_textures_layout", label)),
                entries: &entries,
            });

        let pipeline =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{}_pipeline_layout", label)),
                bind_group_layouts: &[&uniforms, &textures],
                push_constant_ranges: &[],
            });

        Self {
            uniforms,
            textures,
            pipeline,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub depth: DepthFunc,
    pub cull: bool,
}

/// A compiled program. A program whose module is `None` failed to build and
/// ignores every call made on it.
pub struct Program {
    pub kind: ProgramKind,
    pub uniforms: Box<dyn UniformBlock>,
    module: Option<wgpu::ShaderModule>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    warned: bool,
}

impl Program {
    pub fn new(
        device: &wgpu::Device,
        shaders: &mut ShaderAssets,
        kind: ProgramKind,
    ) -> Self {
        let module = match Self::compile(device, shaders, kind) {
            Ok(module) => {
                info!("Program compiled: {}", kind.shader_id());
                Some(module)
            }
            Err(err) => {
                error!("{}", err);
                None
            }
        };
        Self {
            kind,
            uniforms: kind.uniforms(),
            module,
            pipelines: HashMap::new(),
            warned: false,
        }
    }

    fn compile(
        device: &wgpu::Device,
        shaders: &mut ShaderAssets,
        kind: ProgramKind,
    ) -> Result<wgpu::ShaderModule, ShaderError> {
        let shader_id = kind.shader_id();
        let source = shaders.source(shader_id)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{}_module", shader_id)),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        match pollster::block_on(device.pop_error_scope()) {
            Some(err) => Err(ShaderError::Validation {
                id: shader_id.to_string(),
                message: err.to_string(),
            }),
            None => Ok(module),
        }
    }

    /// Rebuilds from the current source. A failed rebuild keeps the program
    /// that was working.
    pub fn reload(&mut self, device: &wgpu::Device, shaders: &mut ShaderAssets) {
        match Self::compile(device, shaders, self.kind) {
            Ok(module) => {
                info!("Reloading {} program", self.kind.shader_id());
                self.module = Some(module);
                self.pipelines.clear();
                self.warned = false;
            }
            Err(err) => error!("{}", err),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.module.is_some()
    }

    /// Logs once per invalid program, returns whether it is usable.
    pub fn check_valid(&mut self) -> bool {
        if !self.is_valid() && !self.warned {
            warn!("{} program is invalid, its calls are ignored", self.kind.shader_id());
            self.warned = true;
        }
        self.is_valid()
    }

    pub fn pipeline(
        &self,
        key: &PipelineKey,
    ) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }

    /// Creates the pipeline for `key` on first use. A pipeline that fails
    /// validation invalidates the program.
    pub fn ensure_pipeline(
        &mut self,
        device: &wgpu::Device,
        layout: &KindLayout,
        format: wgpu::TextureFormat,
        key: PipelineKey,
    ) -> bool {
        if self.pipelines.contains_key(&key) {
            return true;
        }
        let Some(module) = &self.module else {
            return false;
        };

        let label = format!(
            "{}_pipeline_{:?}_{}",
            self.kind.shader_id(),
            key.depth,
            if key.cull { "cull" } else { "nocull" }
        );
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&label),
                layout: Some(&layout.pipeline),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: "vs_main",
                    buffers: &[self.kind.vertex_layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: "fs_main",
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: key.cull.then_some(wgpu::Face::Back),
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: GpuTexture::DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: key.depth.compare(),
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            error!("{} failed validation:\n{}", label, err);
            self.module = None;
            self.pipelines.clear();
            return false;
        }
        self.pipelines.insert(key, pipeline);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gpu::UniformValue;

    #[test]
    fn kinds_expose_matching_blocks_and_units() {
        let mut lit = ProgramKind::Lit.uniforms();
        assert!(lit.set("numPointLights", UniformValue::Int(3)));
        assert_eq!(ProgramKind::Lit.texture_units().len(), 3);

        let mut skybox = ProgramKind::Skybox.uniforms();
        assert!(skybox.set("skybox", UniformValue::Int(0)));
        assert!(!skybox.set("numPointLights", UniformValue::Int(3)));
        assert_eq!(
            ProgramKind::Skybox.texture_units(),
            &[TextureDimension::Cube]
        );
    }

    #[test]
    fn vertex_layouts_follow_kind() {
        assert_eq!(ProgramKind::Lit.vertex_layout().attributes.len(), 4);
        assert_eq!(ProgramKind::Skybox.vertex_layout().attributes.len(), 1);
    }

    #[test]
    fn bundled_sources_are_readable() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/shaders");
        let mut shaders = ShaderAssets::new(&root).unwrap();
        for kind in ProgramKind::ALL {
            let source = shaders.source(kind.shader_id()).unwrap();
            assert!(source.contains("fn vs_main"));
            assert!(source.contains("fn fs_main"));
        }
        assert!(matches!(
            shaders.source("missing"),
            Err(ShaderError::Source { .. })
        ));
    }
}
