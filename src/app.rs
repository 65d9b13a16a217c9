use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoopProxy};
use winit::keyboard::KeyCode;
use winit::window::{CursorGrabMode, Window, WindowId, WindowLevel};

use crate::config::Config;
use crate::input::{Inputs, UserEvent};
use crate::render::camera::{Camera, CameraMovement};
use crate::render::mesh::Model;
use crate::render::shader::ProgramKind;
use crate::render::state::RenderState;
use crate::render::texture::ImageAssets;
use crate::scene::{Scene, ScenePrograms};

const MOVEMENT_KEYS: [(KeyCode, CameraMovement); 4] = [
    (KeyCode::KeyW, CameraMovement::Forward),
    (KeyCode::KeyS, CameraMovement::Backward),
    (KeyCode::KeyA, CameraMovement::Left),
    (KeyCode::KeyD, CameraMovement::Right),
];

pub struct App {
    camera: Camera,
    config: Config,
    current: Instant,
    cursor_grabbed: bool,
    elapsed: Duration,
    inputs: Inputs,
    proxy: EventLoopProxy<UserEvent>,
    render_state: Option<RenderState>,
    scene: Option<Scene>,
    window: Option<Arc<Window>>,
}

impl App {
    pub fn new(proxy: EventLoopProxy<UserEvent>, config: Config) -> Self {
        Self {
            camera: Camera::from_config(&config.camera),
            config,
            current: Instant::now(),
            cursor_grabbed: false,
            elapsed: Duration::default(),
            inputs: Inputs::default(),
            proxy,
            render_state: None,
            scene: None,
            window: None,
        }
    }

    fn create_window(&self, event_loop: &ActiveEventLoop) -> Result<Window> {
        let window = &self.config.window;
        let level = if window.always_on_top {
            WindowLevel::AlwaysOnTop
        } else {
            WindowLevel::Normal
        };
        let attributes = Window::default_attributes()
            .with_title(window.title.as_str())
            .with_inner_size(LogicalSize::new(window.width, window.height))
            .with_window_level(level);
        Ok(event_loop.create_window(attributes)?)
    }

    /// Brings up the backend, compiles both programs and builds the scene.
    fn init(&mut self, window: Arc<Window>) -> Result<()> {
        let assets = &self.config.assets;
        let mut state = pollster::block_on(RenderState::new(
            window,
            &assets.shaders_dir(),
        ))?;
        let programs = ScenePrograms {
            lit: state.create_program(ProgramKind::Lit),
            skybox: state.create_program(ProgramKind::Skybox),
        };

        let textures_dir = assets.textures_dir();
        let images = ImageAssets::new(&textures_dir).with_context(|| {
            format!("opening texture directory {}", textures_dir.display())
        })?;
        let mut scene = Scene::new(programs);
        scene.setup(&mut state, &images, assets);

        for model in &assets.models {
            match Model::load_obj(&mut state, &model.path, model.transform()) {
                Ok(loaded) => scene.add_mesh(Box::new(loaded)),
                Err(err) => error!("{}", err),
            }
        }

        self.render_state = Some(state);
        self.scene = Some(scene);
        Ok(())
    }

    /// Locked keeps the cursor in place, Confined is the fallback for
    /// platforms without it. Both hide the cursor.
    fn set_cursor_grab(&mut self, grab: bool) {
        let Some(window) = &self.window else {
            return;
        };
        let result = if grab {
            window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
        } else {
            window.set_cursor_grab(CursorGrabMode::None)
        };
        if let Err(err) = result {
            warn!("Cursor grab unavailable: {}", err);
            return;
        }
        window.set_cursor_visible(!grab);
        self.cursor_grabbed = grab;
        self.inputs.reset_mouse();
        info!("Cursor grabbed: {}", grab);
    }

    fn update(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let delta = now - self.current;
        self.current = now;
        self.elapsed += delta;

        self.inputs.update();
        if self.inputs.key_pressed(KeyCode::Escape)
            && self.proxy.send_event(UserEvent::ExitApp).is_err()
        {
            event_loop.exit();
        }
        if self.inputs.key_pressed(KeyCode::KeyC) {
            self.set_cursor_grab(!self.cursor_grabbed);
        }

        let dt = delta.as_secs_f32();
        for (key, movement) in MOVEMENT_KEYS {
            if self.inputs.key_held(key) {
                self.camera.process_keyboard(movement, dt);
            }
        }
        // a free cursor only reports positions inside the window
        let (dx, dy) = if self.cursor_grabbed {
            self.inputs.mouse_motion()
        } else {
            self.inputs.mouse_offset()
        };
        if dx != 0.0 || dy != 0.0 {
            self.camera.process_mouse_movement(dx, dy, true);
        }
        let scroll = self.inputs.scroll();
        if scroll != 0.0 {
            self.camera.process_mouse_scroll(scroll);
        }

        self.render(event_loop);
    }

    fn render(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(state), Some(scene)) =
            (self.render_state.as_mut(), self.scene.as_mut())
        else {
            return;
        };

        state.begin_frame();
        let aspect_ratio = state.aspect_ratio();
        if let Err(err) = scene.render(
            state,
            &self.camera,
            self.elapsed.as_secs_f32(),
            aspect_ratio,
        ) {
            error!("{}", err);
        }

        match state.end_frame() {
            Ok(()) => (),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                if let Some(window) = &self.window {
                    state.resize(window.inner_size());
                }
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("Surface out of memory, exiting");
                event_loop.exit();
            }
            Err(err) => warn!("Frame skipped: {}", err),
        }
    }
}

impl ApplicationHandler<UserEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window = match self.create_window(event_loop) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                error!("Failed to create window: {:#}", err);
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());
        if let Err(err) = self.init(window) {
            error!("Failed to initialise renderer: {:#}", err);
            event_loop.exit();
            return;
        }
        self.set_cursor_grab(true);
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::ExitApp => {
                info!("User event: exit app");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = self.render_state.as_mut() {
                    state.resize(size);
                }
            }
            WindowEvent::RedrawRequested => {
                self.update(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => (),
        }
        self.inputs.on_event(event);
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.inputs.on_mouse_motion(delta.0, delta.1);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
