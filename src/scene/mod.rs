use glam::{Mat4, Vec3};
use log::info;
use thiserror::Error;

use crate::{
    config::AssetsConfig,
    render::{
        camera::Camera,
        frustum::is_sphere_in_frustum,
        gpu::{Gpu, ProgramId},
        light::Light,
        texture::ImageSource,
        Drawable,
    },
};

use ground::Ground;
use lighthouse::Lighthouse;
use lights::{DirectionalLight, PointLight, SpotLightParams};
use skybox::{Skybox, SKYBOX_FAR};

pub mod ground;
pub mod lighthouse;
pub mod lights;
pub mod skybox;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("scene rendered before setup")]
    NotReady,
}

/// Programs the scene draws with, created by the backend up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenePrograms {
    pub lit: ProgramId,
    pub skybox: ProgramId,
}

#[derive(Debug)]
struct SceneObjects {
    skybox: Skybox,
    lighthouse: Lighthouse,
    ground: Ground,
    dir_light: DirectionalLight,
    point_lights: Vec<PointLight>,
}

/// The coast: skybox, lighthouse with its turning beacon, ground and any
/// extra meshes, lit by one directional light, the beacon spotlight and a
/// few point lights.
pub struct Scene {
    programs: ScenePrograms,
    objects: Option<SceneObjects>,
    beacon: Light,
    spot: SpotLightParams,
    meshes: Vec<Box<dyn Drawable>>,
}

impl Scene {
    pub fn new(programs: ScenePrograms) -> Self {
        Self {
            programs,
            objects: None,
            beacon: Light::new(lighthouse::BEACON_POSITION, Vec3::ONE, Vec3::NEG_Y),
            spot: SpotLightParams::default(),
            meshes: vec![],
        }
    }

    /// Builds the geometry, loads every texture and places the directional
    /// and point lights. Assets that fail to load are logged and the objects
    /// using them draw untextured.
    pub fn setup(
        &mut self,
        gpu: &mut dyn Gpu,
        images: &dyn ImageSource,
        assets: &AssetsConfig,
    ) {
        let skybox = Skybox::new(gpu, images, &assets.skybox);
        let lighthouse = Lighthouse::new(gpu, images, &assets.lighthouse);
        let ground = Ground::new(gpu, images, &assets.ground);
        self.objects = Some(SceneObjects {
            skybox,
            lighthouse,
            ground,
            dir_light: lights::default_directional_light(),
            point_lights: lights::default_point_lights(),
        });
        info!("Scene ready");
    }

    /// Extra meshes are drawn after the ground, in insertion order.
    pub fn add_mesh(&mut self, mesh: Box<dyn Drawable>) {
        self.meshes.push(mesh);
    }

    /// Draws one frame: skybox, lighthouse when its bounding sphere is in
    /// view, ground, then the extra meshes.
    pub fn render(
        &mut self,
        gpu: &mut dyn Gpu,
        camera: &Camera,
        elapsed: f32,
        aspect_ratio: f32,
    ) -> Result<(), SceneError> {
        let objects = self.objects.as_ref().ok_or(SceneError::NotReady)?;

        let view = camera.build_view();
        let projection = camera.build_projection(aspect_ratio);
        let skybox_projection = Mat4::perspective_rh(
            camera.zoom().to_radians(),
            aspect_ratio,
            camera.znear,
            SKYBOX_FAR,
        );
        objects
            .skybox
            .draw(gpu, self.programs.skybox, view, skybox_projection);

        gpu.use_program(self.programs.lit);
        gpu.set_mat4("view", view);
        gpu.set_mat4("projection", projection);
        gpu.set_vec3("viewPos", camera.position);
        self.spot.push(gpu, &self.beacon);
        objects.dir_light.push(gpu);
        lights::push_point_lights(gpu, &objects.point_lights);

        if is_sphere_in_frustum(
            lighthouse::BOUNDING_CENTER,
            lighthouse::BOUNDING_RADIUS,
            &(projection * view),
        ) {
            objects.lighthouse.render(gpu, elapsed, &mut self.beacon);
        }

        objects.ground.draw(gpu);
        for mesh in &self.meshes {
            mesh.draw(gpu);
        }
        Ok(())
    }
}
