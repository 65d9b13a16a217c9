use std::{
    borrow::Cow,
    path::Path,
    sync::{mpsc::channel, Arc},
};

use assets_manager::{loader::Loader, Asset, AssetCache, BoxedError};
use image::{imageops, DynamicImage, RgbaImage};
use log::{error, info};
use thiserror::Error;
use threadpool::ThreadPool;

use super::gpu::{ColorSpace, Gpu, TextureHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    Diffuse,
    Normal,
    Roughness,
}

impl TextureKind {
    pub const ALL: [TextureKind; 3] =
        [TextureKind::Diffuse, TextureKind::Normal, TextureKind::Roughness];

    pub fn unit(self) -> u32 {
        match self {
            TextureKind::Diffuse => 0,
            TextureKind::Normal => 1,
            TextureKind::Roughness => 2,
        }
    }

    pub fn sampler_name(self) -> &'static str {
        match self {
            TextureKind::Diffuse => "texture_diffuse1",
            TextureKind::Normal => "texture_normal1",
            TextureKind::Roughness => "texture_roughness1",
        }
    }

    /// Color maps are sampled as sRGB, data maps stay linear.
    pub fn color_space(self) -> ColorSpace {
        match self {
            TextureKind::Diffuse => ColorSpace::Srgb,
            TextureKind::Normal | TextureKind::Roughness => ColorSpace::Linear,
        }
    }

    pub fn flip_vertically(self) -> bool {
        self != TextureKind::Diffuse
    }
}

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to load image {id}: {source}")]
    Load {
        id: String,
        #[source]
        source: BoxedError,
    },
    #[error("cubemap face {id} is {width}x{height}, faces must be square")]
    NotSquare { id: String, width: u32, height: u32 },
    #[error("cubemap face {id} is {width}x{height}, expected {expected}x{expected}")]
    SizeMismatch {
        id: String,
        width: u32,
        height: u32,
        expected: u32,
    },
    #[error("cubemap needs 6 faces, got {0}")]
    FaceCount(usize),
}

/// Where decoded RGBA images come from.
pub trait ImageSource {
    fn load(&self, id: &str) -> Result<RgbaImage, BoxedError>;

    /// Results come back in the order of `ids`.
    fn load_many(&self, ids: &[&str]) -> Vec<Result<RgbaImage, BoxedError>> {
        ids.iter().map(|id| self.load(id)).collect()
    }
}

pub struct Image(DynamicImage);

pub struct ImageLoader;
impl Loader<Image> for ImageLoader {
    fn load(content: Cow<[u8]>, _ext: &str) -> Result<Image, BoxedError> {
        Ok(Image(image::load_from_memory(&content)?))
    }
}

impl Asset for Image {
    const EXTENSIONS: &'static [&'static str] = &["jpg", "jpeg", "png", "exr"];
    type Loader = ImageLoader;
}

/// Image cache over the asset directory. Ids are dot separated paths
/// without extension, e.g. `skybox.right`.
pub struct ImageAssets {
    cache: Arc<AssetCache>,
    pool: ThreadPool,
}

impl ImageAssets {
    pub fn new(root: &Path) -> std::io::Result<Self> {
        Ok(Self {
            cache: Arc::new(AssetCache::new(root)?),
            pool: ThreadPool::default(),
        })
    }
}

impl ImageSource for ImageAssets {
    fn load(&self, id: &str) -> Result<RgbaImage, BoxedError> {
        let handle = self.cache.load::<Image>(id)?;
        let image = handle.read().0.to_rgba8();
        Ok(image)
    }

    fn load_many(&self, ids: &[&str]) -> Vec<Result<RgbaImage, BoxedError>> {
        let (load_tx, load_rx) = channel();
        for (index, id) in ids.iter().enumerate() {
            let cache = self.cache.clone();
            let id = id.to_string();
            let load_tx = load_tx.clone();
            self.pool.execute(move || {
                let result = cache
                    .load::<Image>(&id)
                    .map(|handle| handle.read().0.to_rgba8())
                    .map_err(BoxedError::from);
                let _ = load_tx.send((index, result));
            });
        }
        drop(load_tx);

        let mut results = ids.iter().map(|_| None).collect::<Vec<_>>();
        for (index, result) in load_rx {
            results[index] = Some(result);
        }
        results
            .into_iter()
            .zip(ids)
            .map(|(result, id)| {
                result.unwrap_or_else(|| {
                    Err(format!("decoder for {id} stopped").into())
                })
            })
            .collect()
    }
}

/// A 2D map of one kind. `handle` is `None` when the image failed to load,
/// meshes then treat the kind as absent.
#[derive(Debug)]
pub struct Texture {
    id: String,
    kind: TextureKind,
    handle: Option<TextureHandle>,
}

impl Texture {
    pub fn unloaded(id: &str, kind: TextureKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            handle: None,
        }
    }

    pub fn from_image(
        gpu: &mut dyn Gpu,
        id: &str,
        kind: TextureKind,
        mut image: RgbaImage,
    ) -> Self {
        if kind.flip_vertically() {
            imageops::flip_vertical_in_place(&mut image);
        }
        let handle = gpu.upload_texture(id, &image, kind.color_space());
        Self {
            id: id.to_string(),
            kind,
            handle: Some(handle),
        }
    }

    pub fn load(
        gpu: &mut dyn Gpu,
        images: &dyn ImageSource,
        id: &str,
        kind: TextureKind,
    ) -> Self {
        Self::from_result(gpu, id, kind, images.load(id))
    }

    /// Decodes the whole set through `load_many`, then uploads in order.
    pub fn load_all(
        gpu: &mut dyn Gpu,
        images: &dyn ImageSource,
        requests: &[(&str, TextureKind)],
    ) -> Vec<Self> {
        let ids = requests.iter().map(|(id, _)| *id).collect::<Vec<_>>();
        images
            .load_many(&ids)
            .into_iter()
            .zip(requests)
            .map(|(result, (id, kind))| Self::from_result(gpu, id, *kind, result))
            .collect()
    }

    fn from_result(
        gpu: &mut dyn Gpu,
        id: &str,
        kind: TextureKind,
        result: Result<RgbaImage, BoxedError>,
    ) -> Self {
        match result {
            Ok(image) => {
                info!("Texture loaded: {} ({:?})", id, kind);
                Self::from_image(gpu, id, kind, image)
            }
            Err(source) => {
                let err = TextureError::Load {
                    id: id.to_string(),
                    source,
                };
                error!("{}", err);
                Self::unloaded(id, kind)
            }
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    pub fn handle(&self) -> Option<&TextureHandle> {
        self.handle.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }
}

/// Loads the six faces in +X, -X, +Y, -Y, +Z, -Z order. Every face must
/// decode and all must share one square size.
pub fn load_cubemap(
    gpu: &mut dyn Gpu,
    images: &dyn ImageSource,
    label: &str,
    face_ids: &[String; 6],
) -> Result<TextureHandle, TextureError> {
    let ids = face_ids.iter().map(String::as_str).collect::<Vec<_>>();
    let faces = images
        .load_many(&ids)
        .into_iter()
        .zip(face_ids)
        .map(|(result, id)| {
            result.map_err(|source| TextureError::Load {
                id: id.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let expected = faces.first().map(|face| face.width()).unwrap_or_default();
    for (face, id) in faces.iter().zip(face_ids) {
        let (width, height) = face.dimensions();
        if width != height {
            return Err(TextureError::NotSquare {
                id: id.clone(),
                width,
                height,
            });
        }
        if width != expected {
            return Err(TextureError::SizeMismatch {
                id: id.clone(),
                width,
                height,
                expected,
            });
        }
    }

    let faces: [RgbaImage; 6] = faces
        .try_into()
        .map_err(|faces: Vec<_>| TextureError::FaceCount(faces.len()))?;
    info!("Cubemap loaded: {} ({}px faces)", label, expected);
    Ok(gpu.upload_cubemap(label, &faces))
}

/// wgpu side of an uploaded texture.
pub struct GpuTexture {
    pub dimension: wgpu::TextureViewDimension,
    pub sampler: wgpu::Sampler,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    pub const DEPTH_FORMAT: wgpu::TextureFormat =
        wgpu::TextureFormat::Depth32Float;

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        image: &RgbaImage,
        color_space: ColorSpace,
    ) -> Self {
        let format = match color_space {
            ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
        };
        let (width, height) = image.dimensions();
        let texture = Self::create_layers(
            device,
            queue,
            label,
            format,
            (width, height),
            &[image.as_raw()],
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{}_sampler", label)),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            ..Default::default()
        });

        Self {
            dimension: wgpu::TextureViewDimension::D2,
            sampler,
            view,
        }
    }

    pub fn cubemap(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        faces: &[RgbaImage; 6],
    ) -> Self {
        let size = faces[0].dimensions();
        let layers = faces.each_ref().map(|face| face.as_raw().as_slice());
        let texture = Self::create_layers(
            device,
            queue,
            label,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            size,
            &layers,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{}_view", label)),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{}_sampler", label)),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        Self {
            dimension: wgpu::TextureViewDimension::Cube,
            sampler,
            view,
        }
    }

    /// 1x1 white texture bound to units that have nothing usable.
    pub fn fallback(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        dimension: wgpu::TextureViewDimension,
    ) -> Self {
        let pixel = RgbaImage::from_pixel(1, 1, image::Rgba([255; 4]));
        match dimension {
            wgpu::TextureViewDimension::Cube => Self::cubemap(
                device,
                queue,
                "fallback_cube",
                &std::array::from_fn(|_| pixel.clone()),
            ),
            _ => Self::from_image(
                device,
                queue,
                "fallback_2d",
                &pixel,
                ColorSpace::Linear,
            ),
        }
    }

    pub fn create_depth(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> wgpu::TextureView {
        let size = wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_layers(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        format: wgpu::TextureFormat,
        (width, height): (u32, u32),
        layers: &[&[u8]],
    ) -> wgpu::Texture {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: layers.len() as u32,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, data) in layers.iter().enumerate() {
            queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }

        texture
    }
}
