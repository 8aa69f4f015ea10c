//! egui overlay
//!
//! Statistics window plus the regeneration controls for procedural
//! terrain. Input goes through egui-winit, drawing through egui-wgpu into
//! the frame encoder owned by the renderer.

use egui::ViewportId;
use egui_wgpu::ScreenDescriptor;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::session::ViewerSession;

/// Range of the noise offset sliders, in grid cells
const OFFSET_RANGE: std::ops::RangeInclusive<f32> = -512.0..=512.0;

pub struct Overlay {
    /// egui context (shared state for UI)
    ctx: egui::Context,
    /// egui-winit state for input handling
    winit_state: egui_winit::State,
    /// egui-wgpu renderer for drawing
    renderer: egui_wgpu::Renderer,
    /// Cached paint jobs from last frame
    paint_jobs: Vec<egui::ClippedPrimitive>,
    /// Cached textures delta
    textures_delta: egui::TexturesDelta,
}

impl Overlay {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, window: &Window) -> Self {
        let ctx = egui::Context::default();

        let winit_state = egui_winit::State::new(
            ctx.clone(),
            ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
        );

        let renderer = egui_wgpu::Renderer::new(device, format, None, 1);

        Self {
            ctx,
            winit_state,
            renderer,
            paint_jobs: Vec::new(),
            textures_delta: egui::TexturesDelta::default(),
        }
    }

    /// Handle a winit window event, returns whether egui consumed it
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.winit_state.on_window_event(window, event).consumed
    }

    /// Check if egui wants keyboard input
    pub fn wants_keyboard_input(&self) -> bool {
        self.ctx.wants_keyboard_input()
    }

    /// Check if egui wants pointer input
    pub fn wants_pointer_input(&self) -> bool {
        self.ctx.wants_pointer_input()
    }

    /// Run the UI for one frame and tessellate it
    pub fn run(&mut self, window: &Window, session: &mut ViewerSession, wireframe_available: bool) {
        let raw_input = self.winit_state.take_egui_input(window);
        self.ctx.begin_frame(raw_input);

        build_ui(&self.ctx, session, wireframe_available);

        let full_output = self.ctx.end_frame();
        self.winit_state
            .handle_platform_output(window, full_output.platform_output);

        self.paint_jobs = self
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        self.textures_delta
            .append(full_output.textures_delta);
    }

    /// Record the overlay into `encoder` on top of `view`. Returns extra
    /// command buffers that must be submitted before the encoder.
    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        (width, height): (u32, u32),
    ) -> Vec<wgpu::CommandBuffer> {
        let screen_descriptor = ScreenDescriptor {
            size_in_pixels: [width, height],
            pixels_per_point: self.ctx.pixels_per_point(),
        };

        for (id, image_delta) in &self.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }

        let command_buffers = self.renderer.update_buffers(
            device,
            queue,
            encoder,
            &self.paint_jobs,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load, // Preserve existing content
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.renderer
                .render(&mut render_pass, &self.paint_jobs, &screen_descriptor);
        }

        for id in &self.textures_delta.free {
            self.renderer.free_texture(id);
        }
        self.textures_delta = egui::TexturesDelta::default();

        command_buffers
    }
}

fn build_ui(ctx: &egui::Context, session: &mut ViewerSession, wireframe_available: bool) {
    let fps = session.timer.fps();
    let frame_ms = session.timer.frame_time_ms();
    let cam_pos = session.camera.position;
    let fov = session.camera.projection.fov_degrees();

    egui::Window::new("Terrain")
        .default_pos([10.0, 10.0])
        .default_size([240.0, 320.0])
        .show(ctx, |ui| {
            ui.heading("Performance");
            ui.label(format!("FPS: {:.1}", fps));
            ui.label(format!("Frame time: {:.2} ms", frame_ms));
            ui.separator();

            let stats = &session.stats;
            ui.heading("Terrain");
            ui.label(format!("Source: {}", stats.source));
            ui.label(format!("Grid: {}x{}", stats.grid_size.0, stats.grid_size.1));
            ui.label(format!("Vertices: {}", stats.vertex_count));
            ui.label(format!("Indices: {}", stats.index_count));
            ui.label(format!("Triangles: {}", stats.triangle_count));
            if stats.degenerate_triangles > 0 {
                ui.label(format!("Degenerate: {}", stats.degenerate_triangles));
            }
            if let Some((lo, hi)) = stats.height_range {
                ui.label(format!("Height: {:.2} .. {:.2}", lo, hi));
            }
            ui.separator();

            ui.heading("Camera");
            ui.label(format!(
                "Position: ({:.1}, {:.1}, {:.1})",
                cam_pos.x, cam_pos.y, cam_pos.z
            ));
            ui.label(format!("FOV: {:.1}°", fov));
            ui.add_enabled(
                wireframe_available,
                egui::Checkbox::new(&mut session.wireframe, "Wireframe"),
            );

            if session.procedural {
                ui.separator();
                ui.heading("Noise");
                ui.add(egui::Slider::new(&mut session.noise_offset.x, OFFSET_RANGE).text("offset x"));
                ui.add(egui::Slider::new(&mut session.noise_offset.y, OFFSET_RANGE).text("offset y"));
                if ui.button("Regenerate").clicked() {
                    session.request_regenerate();
                }
            }

            ui.separator();
            ui.heading("Controls");
            ui.label("WASD - Move");
            ui.label("Q/E - Down/Up");
            ui.label("RMB + Mouse - Look");
            ui.label("Scroll - Zoom");
            ui.label("F - Toggle wireframe");
            ui.label("R - Regenerate");
            ui.label("F1 - Toggle this UI");
        });
}
