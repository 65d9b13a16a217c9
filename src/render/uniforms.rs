use encase::ShaderType;
use glam::{Mat4, Vec3};
use log::error;

use super::gpu::UniformValue;

pub const MAX_POINT_LIGHTS: usize = 8;

/// CPU mirror of a program's uniform block, addressed by GLSL-style names.
pub trait UniformBlock {
    /// Returns false when the block has no uniform of that name and type.
    fn set(&mut self, name: &str, value: UniformValue) -> bool;
    fn as_bytes(&self) -> Vec<u8>;
    fn size(&self) -> u64;
}

fn write_uniform<T: ShaderType + encase::internal::WriteInto>(
    data: &T,
) -> Vec<u8> {
    let mut buffer = encase::UniformBuffer::new(Vec::<u8>::new());
    if let Err(err) = buffer.write(data) {
        error!("Uniform block serialisation failed: {}", err);
    }
    buffer.into_inner()
}

/// Splits `pointLights[2].diffuse` into `("pointLights", Some(2), "diffuse")`
/// and `dirLight.direction` into `("dirLight", None, "direction")`.
pub fn split_member(name: &str) -> Option<(&str, Option<usize>, &str)> {
    let (base, field) = name.split_once('.')?;
    match base.split_once('[') {
        Some((array, index)) => {
            let index = index.strip_suffix(']')?.parse().ok()?;
            Some((array, Some(index), field))
        }
        None => Some((base, None, field)),
    }
}

macro_rules! set_fields {
    ($this:expr, $field:expr, $value:expr,
     vec3: { $( $vname:literal => $vfield:ident ),* }
     $( , float: { $( $fname:literal => $ffield:ident ),* } )?) => {
        match ($field, $value) {
            $(
                ($vname, UniformValue::Vec3(val)) => {
                    $this.$vfield = val;
                    true
                }
            )*
            $( $(
                ($fname, UniformValue::Float(val)) => {
                    $this.$ffield = val;
                    true
                }
            )* )?
            _ => false,
        }
    };
}

#[derive(Debug, Default, Clone, Copy, ShaderType)]
pub struct DirLightUniform {
    pub direction: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl DirLightUniform {
    fn set(&mut self, field: &str, value: UniformValue) -> bool {
        set_fields!(self, field, value, vec3: {
            "direction" => direction,
            "ambient" => ambient,
            "diffuse" => diffuse,
            "specular" => specular
        })
    }
}

#[derive(Debug, Default, Clone, Copy, ShaderType)]
pub struct SpotLightUniform {
    pub position: Vec3,
    pub direction: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub cut_off: f32,
    pub outer_cut_off: f32,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl SpotLightUniform {
    fn set(&mut self, field: &str, value: UniformValue) -> bool {
        set_fields!(self, field, value, vec3: {
            "position" => position,
            "direction" => direction,
            "ambient" => ambient,
            "diffuse" => diffuse,
            "specular" => specular
        }, float: {
            "cutOff" => cut_off,
            "outerCutOff" => outer_cut_off,
            "constant" => constant,
            "linear" => linear,
            "quadratic" => quadratic
        })
    }
}

#[derive(Debug, Default, Clone, Copy, ShaderType)]
pub struct PointLightUniform {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl PointLightUniform {
    fn set(&mut self, field: &str, value: UniformValue) -> bool {
        set_fields!(self, field, value, vec3: {
            "position" => position,
            "ambient" => ambient,
            "diffuse" => diffuse,
            "specular" => specular
        }, float: {
            "constant" => constant,
            "linear" => linear,
            "quadratic" => quadratic
        })
    }
}

/// Uniform block of the `lit` program. Field order matches `Uniforms` in
/// `assets/shaders/lit.wgsl`.
#[derive(Debug, Clone, ShaderType)]
pub struct LitUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub model: Mat4,
    pub view_pos: Vec3,
    pub num_point_lights: i32,
    pub dir_light: DirLightUniform,
    pub spot_light: SpotLightUniform,
    pub point_lights: [PointLightUniform; MAX_POINT_LIGHTS],
    pub diffuse_unit: i32,
    pub normal_unit: i32,
    pub roughness_unit: i32,
}

impl Default for LitUniforms {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            model: Mat4::IDENTITY,
            view_pos: Vec3::ZERO,
            num_point_lights: 0,
            dir_light: DirLightUniform::default(),
            spot_light: SpotLightUniform::default(),
            point_lights: [PointLightUniform::default(); MAX_POINT_LIGHTS],
            diffuse_unit: -1,
            normal_unit: -1,
            roughness_unit: -1,
        }
    }
}

impl UniformBlock for LitUniforms {
    fn set(&mut self, name: &str, value: UniformValue) -> bool {
        match (name, value) {
            ("view", UniformValue::Mat4(val)) => self.view = val,
            ("projection", UniformValue::Mat4(val)) => self.projection = val,
            ("model", UniformValue::Mat4(val)) => self.model = val,
            ("viewPos", UniformValue::Vec3(val)) => self.view_pos = val,
            ("numPointLights", UniformValue::Int(val)) => {
                self.num_point_lights = val.clamp(0, MAX_POINT_LIGHTS as i32)
            }
            ("texture_diffuse1", UniformValue::Int(val)) => {
                self.diffuse_unit = val
            }
            ("texture_normal1", UniformValue::Int(val)) => {
                self.normal_unit = val
            }
            ("texture_roughness1", UniformValue::Int(val)) => {
                self.roughness_unit = val
            }
            _ => {
                return match split_member(name) {
                    Some(("dirLight", None, field)) => {
                        self.dir_light.set(field, value)
                    }
                    Some(("spotLight", None, field)) => {
                        self.spot_light.set(field, value)
                    }
                    Some(("pointLights", Some(index), field)) => self
                        .point_lights
                        .get_mut(index)
                        .is_some_and(|light| light.set(field, value)),
                    _ => false,
                }
            }
        }
        true
    }

    fn as_bytes(&self) -> Vec<u8> {
        write_uniform(self)
    }

    fn size(&self) -> u64 {
        Self::min_size().get()
    }
}

/// Uniform block of the `skybox` program.
#[derive(Debug, Clone, ShaderType)]
pub struct SkyboxUniforms {
    pub view: Mat4,
    pub projection: Mat4,
}

impl Default for SkyboxUniforms {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }
}

impl UniformBlock for SkyboxUniforms {
    fn set(&mut self, name: &str, value: UniformValue) -> bool {
        match (name, value) {
            ("view", UniformValue::Mat4(val)) => self.view = val,
            ("projection", UniformValue::Mat4(val)) => self.projection = val,
            // the cubemap is always sampled from unit 0
            ("skybox", UniformValue::Int(0)) => {}
            _ => return false,
        }
        true
    }

    fn as_bytes(&self) -> Vec<u8> {
        write_uniform(self)
    }

    fn size(&self) -> u64 {
        Self::min_size().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_member_names() {
        assert_eq!(
            split_member("pointLights[2].diffuse"),
            Some(("pointLights", Some(2), "diffuse"))
        );
        assert_eq!(
            split_member("dirLight.direction"),
            Some(("dirLight", None, "direction"))
        );
        assert_eq!(split_member("view"), None);
        assert_eq!(split_member("pointLights[x].position"), None);
        assert_eq!(split_member("pointLights[1.position"), None);
    }

    #[test]
    fn lit_block_routes_names_to_fields() {
        let mut block = LitUniforms::default();
        assert!(block.set("viewPos", UniformValue::Vec3(Vec3::ONE)));
        assert!(block.set("spotLight.cutOff", UniformValue::Float(0.9)));
        assert!(block.set(
            "pointLights[3].diffuse",
            UniformValue::Vec3(Vec3::new(0.3, 0.7, 0.9))
        ));
        assert!(block.set("numPointLights", UniformValue::Int(4)));

        assert_eq!(block.view_pos, Vec3::ONE);
        assert_eq!(block.spot_light.cut_off, 0.9);
        assert_eq!(block.point_lights[3].diffuse, Vec3::new(0.3, 0.7, 0.9));
        assert_eq!(block.num_point_lights, 4);
    }

    #[test]
    fn lit_block_ignores_unknown_names_and_types() {
        let mut block = LitUniforms::default();
        assert!(!block.set("fog.density", UniformValue::Float(1.0)));
        assert!(!block.set("viewPos", UniformValue::Float(1.0)));
        assert!(!block.set("dirLight.cutOff", UniformValue::Float(1.0)));
        let out_of_range = format!("pointLights[{}].position", MAX_POINT_LIGHTS);
        assert!(!block.set(&out_of_range, UniformValue::Vec3(Vec3::ONE)));
        assert_eq!(block.view_pos, Vec3::ZERO);
    }

    #[test]
    fn point_light_count_is_clamped_to_array_length() {
        let mut block = LitUniforms::default();
        block.set("numPointLights", UniformValue::Int(100));
        assert_eq!(block.num_point_lights, MAX_POINT_LIGHTS as i32);
    }

    #[test]
    fn serialized_size_matches_min_size() {
        let lit = LitUniforms::default();
        assert_eq!(lit.as_bytes().len() as u64, UniformBlock::size(&lit));
        let skybox = SkyboxUniforms::default();
        assert_eq!(skybox.as_bytes().len() as u64, UniformBlock::size(&skybox));
        assert_eq!(UniformBlock::size(&skybox), 128);
    }
}
