use glam::Vec3;

use crate::render::{
    gpu::Gpu,
    light::{
        Light, ATTENUATION_CONSTANT, ATTENUATION_LINEAR, ATTENUATION_QUADRATIC,
    },
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl PointLight {
    /// Dim ambient, white specular and the default falloff.
    pub fn new(position: Vec3, diffuse: Vec3) -> Self {
        Self {
            position,
            ambient: Vec3::splat(0.05),
            diffuse,
            specular: Vec3::ONE,
            constant: ATTENUATION_CONSTANT,
            linear: ATTENUATION_LINEAR,
            quadratic: ATTENUATION_QUADRATIC,
        }
    }

    /// Writes the light into slot `index` of the `pointLights` array.
    pub fn push(&self, gpu: &mut dyn Gpu, index: usize) {
        let field = |name: &str| format!("pointLights[{}].{}", index, name);
        gpu.set_vec3(&field("position"), self.position);
        gpu.set_vec3(&field("ambient"), self.ambient);
        gpu.set_vec3(&field("diffuse"), self.diffuse);
        gpu.set_vec3(&field("specular"), self.specular);
        gpu.set_float(&field("constant"), self.constant);
        gpu.set_float(&field("linear"), self.linear);
        gpu.set_float(&field("quadratic"), self.quadratic);
    }
}

/// Pushes the count, then every light at the index it has in `lights`.
pub fn push_point_lights(gpu: &mut dyn Gpu, lights: &[PointLight]) {
    gpu.set_int("numPointLights", lights.len() as i32);
    for (index, light) in lights.iter().enumerate() {
        light.push(gpu, index);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl DirectionalLight {
    pub fn push(&self, gpu: &mut dyn Gpu) {
        gpu.set_vec3("dirLight.direction", self.direction);
        gpu.set_vec3("dirLight.ambient", self.ambient);
        gpu.set_vec3("dirLight.diffuse", self.diffuse);
        gpu.set_vec3("dirLight.specular", self.specular);
    }
}

/// Fixed cone and color of the beacon. Position and direction come from the
/// beacon's `Light`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLightParams {
    pub cut_off_degrees: f32,
    pub outer_cut_off_degrees: f32,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for SpotLightParams {
    fn default() -> Self {
        Self {
            cut_off_degrees: 12.5,
            outer_cut_off_degrees: 17.5,
            ambient: Vec3::splat(0.1),
            diffuse: Vec3::splat(0.8),
            specular: Vec3::ONE,
            constant: ATTENUATION_CONSTANT,
            linear: ATTENUATION_LINEAR,
            quadratic: ATTENUATION_QUADRATIC,
        }
    }
}

impl SpotLightParams {
    /// Cutoffs are pushed as cosines.
    pub fn push(&self, gpu: &mut dyn Gpu, beacon: &Light) {
        gpu.set_vec3("spotLight.position", beacon.position());
        gpu.set_vec3("spotLight.direction", beacon.direction());
        gpu.set_float("spotLight.cutOff", self.cut_off_degrees.to_radians().cos());
        gpu.set_float(
            "spotLight.outerCutOff",
            self.outer_cut_off_degrees.to_radians().cos(),
        );
        gpu.set_vec3("spotLight.ambient", self.ambient);
        gpu.set_vec3("spotLight.diffuse", self.diffuse);
        gpu.set_vec3("spotLight.specular", self.specular);
        gpu.set_float("spotLight.constant", self.constant);
        gpu.set_float("spotLight.linear", self.linear);
        gpu.set_float("spotLight.quadratic", self.quadratic);
    }
}

/// Sun-like light of the coast scene.
pub fn default_directional_light() -> DirectionalLight {
    DirectionalLight {
        direction: Vec3::new(-0.2, -1.0, -0.3),
        ambient: Vec3::splat(0.1),
        diffuse: Vec3::splat(0.5),
        specular: Vec3::ONE,
    }
}

pub fn default_point_lights() -> Vec<PointLight> {
    vec![
        PointLight::new(Vec3::new(10.0, 5.0, 10.0), Vec3::new(0.8, 0.8, 0.7)),
        PointLight::new(Vec3::new(-10.0, 10.0, -10.0), Vec3::new(0.7, 0.3, 0.3)),
        PointLight::new(Vec3::new(0.0, 20.0, 0.0), Vec3::new(0.3, 0.7, 0.9)),
    ]
}
