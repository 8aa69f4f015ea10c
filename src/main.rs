//! Terrain viewer
//!
//! Run with:
//!   cargo run --release -- --heightmap iceland.png
//!   cargo run --release -- --grid-size 256 --octaves 8
//!
//! Controls:
//!   WASD     - Move camera
//!   QE       - Move down/up
//!   Shift    - Sprint (2x speed)
//!   Mouse    - Look around (hold right mouse button)
//!   Scroll   - Zoom
//!   F        - Toggle wireframe
//!   R        - Regenerate procedural terrain
//!   F1       - Toggle overlay
//!   Escape   - Exit

mod args;

use std::sync::Arc;

use clap::Parser;
use glam::Vec2;
use terrain_viewer::{
    overlay::Overlay,
    resources::Mesh,
    scene::Camera,
    terrain::{HeightSampleSource, ImageHeightSource},
    TerrainConfig, TerrainMesh, TerrainRenderer, TerrainResult, ViewerConfig, ViewerSession,
};
use winit::{
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowBuilder},
};

use crate::args::ClapArgs;

/// Everything the event loop closure owns
struct App {
    config: TerrainConfig,
    window: Arc<Window>,
    renderer: TerrainRenderer,
    overlay: Overlay,
    session: ViewerSession,
    frames: u64,
    max_frames: Option<u64>,
}

fn main() {
    env_logger::init();

    let args = ClapArgs::parse();
    let config = ViewerConfig::from(&args);

    if let Err(e) = run(config, args.max_frames) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: ViewerConfig, max_frames: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let (terrain, source_label, procedural) = build_initial_terrain(&config.terrain)?;

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(format!("{} - {}", config.title, source_label))
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .build(&event_loop)?,
    );

    let renderer = TerrainRenderer::new(Arc::clone(&window), config.vsync)?;
    let overlay = Overlay::new(renderer.device(), renderer.surface_format(), &window);

    let mut session = ViewerSession::new(Camera::default());
    session.procedural = procedural;
    session.noise_offset = config.terrain.noise_offset;
    session.wireframe = config.wireframe && renderer.supports_wireframe();

    let mut app = App {
        config: config.terrain,
        window,
        renderer,
        overlay,
        session,
        frames: 0,
        max_frames,
    };
    app.show_terrain(&terrain, &source_label)?;

    event_loop.run(move |event, elwt: &EventLoopWindowTarget<()>| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => {
                let consumed = app.overlay.on_window_event(&app.window, &event);
                app.handle_window_event(&event, consumed, elwt);
            }
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta },
                ..
            } => {
                if app.session.input.mouse_look_active && !app.overlay.wants_pointer_input() {
                    app.session.input.mouse_delta += Vec2::new(delta.0 as f32, delta.1 as f32);
                }
            }
            Event::AboutToWait => {
                let dt = app.session.timer.tick();
                let apply_input = !app.overlay.wants_keyboard_input();
                app.session.update(dt, apply_input);

                if app.session.take_regenerate() {
                    app.regenerate();
                }

                app.window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}

/// Terrain from the configured heightmap, or from noise when there is none
/// or it fails to decode
fn build_initial_terrain(config: &TerrainConfig) -> TerrainResult<(TerrainMesh, String, bool)> {
    let pipeline = config.pipeline();
    let params = config.grid_params();

    if let Some(path) = &config.heightmap {
        match ImageHeightSource::open(path, config.mapping) {
            Ok(source) => {
                let mesh = pipeline.generate(&source, &params)?;
                return Ok((mesh, source.label().to_string(), false));
            }
            Err(e) if e.is_decode_error() => {
                log::warn!("{}; falling back to procedural terrain", e);
            }
            Err(e) => return Err(e),
        }
    }

    let source = config.noise_source(config.noise_offset);
    let mesh = pipeline.generate(&source, &params)?;
    Ok((mesh, source.label().to_string(), true))
}

impl App {
    fn show_terrain(&mut self, terrain: &TerrainMesh, label: &str) -> TerrainResult<()> {
        let mesh = Mesh::from_terrain(terrain, label)?;
        self.renderer.upload(&mesh);
        self.session.set_terrain(terrain, label);

        if let Some((min, max)) = mesh.bounds() {
            let mut camera = Camera::framing(min, max);
            let (width, height) = self.renderer.surface_size();
            camera.set_aspect(width as f32, height as f32);
            self.session.set_camera(camera);
        }
        Ok(())
    }

    fn regenerate(&mut self) {
        let source = self.config.noise_source(self.session.noise_offset);
        let result = self
            .config
            .pipeline()
            .generate(&source, &self.config.grid_params())
            .and_then(|terrain| {
                let mesh = Mesh::from_terrain(&terrain, source.label())?;
                Ok((terrain, mesh))
            });
        match result {
            Ok((terrain, mesh)) => {
                self.renderer.upload(&mesh);
                self.session.set_terrain(&terrain, source.label());
            }
            Err(e) => log::error!("Regeneration failed: {}", e),
        }
    }

    fn render_frame(&mut self, elwt: &EventLoopWindowTarget<()>) {
        let overlay = if self.session.show_overlay {
            let wireframe_available = self.renderer.supports_wireframe();
            self.overlay
                .run(&self.window, &mut self.session, wireframe_available);
            Some(&mut self.overlay)
        } else {
            None
        };

        if let Err(e) = self
            .renderer
            .render(&self.session.camera, self.session.wireframe, overlay)
        {
            log::error!("Render error: {}", e);
            elwt.exit();
            return;
        }

        self.frames += 1;
        if self.max_frames.is_some_and(|max| self.frames >= max) {
            log::info!("Rendered {} frames, exiting", self.frames);
            elwt.exit();
        }
    }

    fn handle_window_event(
        &mut self,
        event: &WindowEvent,
        consumed: bool,
        elwt: &EventLoopWindowTarget<()>,
    ) {
        match event {
            WindowEvent::CloseRequested => elwt.exit(),
            WindowEvent::Resized(size) => {
                self.renderer.resize(size.width, size.height);
                self.session
                    .camera
                    .set_aspect(size.width as f32, size.height as f32);
            }
            WindowEvent::RedrawRequested => self.render_frame(elwt),
            _ if consumed => {}
            WindowEvent::KeyboardInput { event, .. } => {
                let pressed = event.state == ElementState::Pressed;

                if let PhysicalKey::Code(key) = event.physical_key {
                    match key {
                        KeyCode::Escape => elwt.exit(),
                        KeyCode::F1 if pressed && !event.repeat => {
                            self.session.toggle_overlay();
                        }
                        KeyCode::KeyF if pressed && !event.repeat => {
                            if self.renderer.supports_wireframe() {
                                self.session.toggle_wireframe();
                            }
                        }
                        KeyCode::KeyR if pressed && !event.repeat => {
                            self.session.request_regenerate();
                        }
                        KeyCode::KeyW => self.session.input.forward = pressed,
                        KeyCode::KeyS => self.session.input.backward = pressed,
                        KeyCode::KeyA => self.session.input.left = pressed,
                        KeyCode::KeyD => self.session.input.right = pressed,
                        KeyCode::KeyQ => self.session.input.down = pressed,
                        KeyCode::KeyE => self.session.input.up = pressed,
                        KeyCode::ShiftLeft | KeyCode::ShiftRight => self.session.input.sprint = pressed,
                        _ => {}
                    }
                }
            }
            WindowEvent::MouseInput {
                state: btn_state,
                button: MouseButton::Right,
                ..
            } => {
                let pressed = *btn_state == ElementState::Pressed;
                self.session.input.mouse_look_active = pressed;
                self.set_cursor_grab(pressed);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.session.input.scroll_delta += scroll;
            }
            WindowEvent::Focused(false) => {
                // Release all keys when window loses focus
                self.session.release_input();
                self.set_cursor_grab(false);
            }
            _ => {}
        }
    }

    fn set_cursor_grab(&mut self, grab: bool) {
        if grab == self.session.cursor_grabbed {
            return;
        }
        let mode = if grab {
            CursorGrabMode::Confined
        } else {
            CursorGrabMode::None
        };
        if let Err(e) = self.window.set_cursor_grab(mode) {
            log::debug!("Cursor grab unavailable: {}", e);
        }
        self.window.set_cursor_visible(!grab);
        self.session.cursor_grabbed = grab;
    }
}
