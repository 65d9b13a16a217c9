use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use glam::{Quat, Vec3};
use log::info;
use serde::Deserialize;
use thiserror::Error;

use crate::transform::Transform;

pub const CONFIG_ENV: &str = "LIGHTHOUSE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "lighthouse.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub assets: AssetsConfig,
}

impl Config {
    /// Reads `$LIGHTHOUSE_CONFIG`, else `lighthouse.toml` if it exists, else
    /// falls back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))
            }
            None => {
                info!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
        info!("Config loaded from {}", path.display());
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub always_on_top: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Lighthouse".to_string(),
            width: 1280,
            height: 720,
            always_on_top: false,
        }
    }
}

/// Angles in degrees.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    pub zoom: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 15.0, 30.0],
            yaw: -90.0,
            pitch: 0.0,
            movement_speed: 10.0,
            mouse_sensitivity: 0.1,
            zoom: 45.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextureSetConfig {
    pub diffuse: String,
    pub normal: String,
    pub roughness: String,
}

impl TextureSetConfig {
    fn named(dir: &str, stem: &str) -> Self {
        Self {
            diffuse: format!("{}.{}_diff_2k", dir, stem),
            normal: format!("{}.{}_nor_gl_2k", dir, stem),
            roughness: format!("{}.{}_rough_2k", dir, stem),
        }
    }
}

/// An OBJ file drawn after the ground plane.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub position: [f32; 3],
    /// Rotation around the Y axis, degrees.
    #[serde(default)]
    pub rotation_y: f32,
    #[serde(default = "unit_scale")]
    pub scale: f32,
}

fn unit_scale() -> f32 {
    1.0
}

impl ModelConfig {
    pub fn transform(&self) -> Transform {
        Transform {
            pos: Vec3::from_array(self.position),
            rot: Quat::from_rotation_y(self.rotation_y.to_radians()),
            scale: Vec3::splat(self.scale),
        }
    }
}

/// Texture ids are dot separated paths below `<root>/textures` without
/// extension.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub root: PathBuf,
    /// +X, -X, +Y, -Y, +Z, -Z.
    pub skybox: [String; 6],
    pub lighthouse: TextureSetConfig,
    pub ground: TextureSetConfig,
    pub models: Vec<ModelConfig>,
}

impl AssetsConfig {
    pub fn textures_dir(&self) -> PathBuf {
        self.root.join("textures")
    }

    pub fn shaders_dir(&self) -> PathBuf {
        self.root.join("shaders")
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            skybox: ["right", "left", "top", "bottom", "front", "back"]
                .map(|face| format!("skybox.{}", face)),
            lighthouse: TextureSetConfig::named(
                "lighthouse",
                "seaworn_sandstone_brick",
            ),
            ground: TextureSetConfig::named("plane", "coast_sand_rocks_02"),
            models: vec![],
        }
    }
}
