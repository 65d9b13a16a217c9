use anyhow::{Context, Result};
use app::App;
use config::Config;
use env_logger::Env;
use input::UserEvent;
use winit::event_loop::{self, EventLoop};

mod app;
mod config;
mod input;
mod render;
mod scene;
mod transform;

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        Env::default().filter_or("RUST_LOG", "lighthouse=info,wgpu=warn"),
    )
    .init();
    let config = Config::load().context("loading configuration")?;

    let event_loop = EventLoop::<UserEvent>::with_user_event().build()?;
    event_loop.set_control_flow(event_loop::ControlFlow::Poll);

    let mut app = App::new(event_loop.create_proxy(), config);
    event_loop.run_app(&mut app)?;
    Ok(())
}
