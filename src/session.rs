//! Per-window viewer state
//!
//! Everything the event loop mutates between frames lives in
//! [`ViewerSession`]: camera and controller, input, frame timing, toggles
//! and the statistics shown by the overlay.

use std::collections::VecDeque;
use std::time::Instant;

use glam::Vec2;

use crate::scene::{Camera, CameraController, CameraInput, FreeFlyController};
use crate::terrain::TerrainMesh;

/// Number of frames averaged for the FPS readout
const FPS_WINDOW: usize = 60;

/// Delta time and averaged frame rate
#[derive(Debug, Clone)]
pub struct FrameTimer {
    last_frame: Instant,
    /// Frame time history for averaging
    frame_times: VecDeque<f32>,
    /// Current FPS (averaged)
    fps: f32,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            frame_times: VecDeque::with_capacity(FPS_WINDOW),
            fps: 0.0,
        }
    }

    /// Seconds since the previous tick
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.record(dt);
        dt
    }

    /// Add a frame time to the averaging window
    pub fn record(&mut self, dt: f32) {
        if self.frame_times.len() >= FPS_WINDOW {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(dt);

        let avg_dt = self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        self.fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Averaged frame time in milliseconds
    pub fn frame_time_ms(&self) -> f32 {
        if self.fps > 0.0 {
            1000.0 / self.fps
        } else {
            0.0
        }
    }
}

/// Summary of the terrain currently on screen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerrainStats {
    pub source: String,
    pub grid_size: (u32, u32),
    pub vertex_count: usize,
    pub index_count: usize,
    pub triangle_count: usize,
    pub degenerate_triangles: usize,
    pub height_range: Option<(f32, f32)>,
}

impl TerrainStats {
    pub fn from_mesh(mesh: &TerrainMesh, source: &str) -> Self {
        Self {
            source: source.to_string(),
            grid_size: mesh.grid_size(),
            vertex_count: mesh.vertex_count(),
            index_count: mesh.index_count(),
            triangle_count: mesh.triangle_count(),
            degenerate_triangles: mesh.degenerate_triangles(),
            height_range: mesh.height_range(),
        }
    }
}

/// State owned by the event loop and passed by reference to the renderer
/// and overlay
pub struct ViewerSession {
    pub camera: Camera,
    pub controller: FreeFlyController,
    pub input: CameraInput,
    pub timer: FrameTimer,
    pub show_overlay: bool,
    pub wireframe: bool,
    pub cursor_grabbed: bool,
    pub stats: TerrainStats,
    /// Noise offset edited in the overlay, in grid cells
    pub noise_offset: Vec2,
    /// Whether the terrain comes from noise and can be regenerated
    pub procedural: bool,
    regenerate_requested: bool,
}

impl ViewerSession {
    pub fn new(camera: Camera) -> Self {
        let mut controller = FreeFlyController::default();
        controller.sync_with_camera(&camera);
        Self {
            camera,
            controller,
            input: CameraInput::new(),
            timer: FrameTimer::new(),
            show_overlay: true,
            wireframe: false,
            cursor_grabbed: false,
            stats: TerrainStats::default(),
            noise_offset: Vec2::ZERO,
            procedural: false,
            regenerate_requested: false,
        }
    }

    /// Advance the camera by one frame and clear per-frame input
    pub fn update(&mut self, dt: f32, apply_input: bool) {
        if apply_input {
            self.controller.update(&mut self.camera, &self.input, dt);
        }
        self.input.reset_deltas();
    }

    /// Replace the camera, e.g. after new terrain was loaded
    pub fn set_camera(&mut self, camera: Camera) {
        self.controller.sync_with_camera(&camera);
        self.camera = camera;
    }

    pub fn set_terrain(&mut self, mesh: &TerrainMesh, source: &str) {
        self.stats = TerrainStats::from_mesh(mesh, source);
    }

    pub fn toggle_overlay(&mut self) {
        self.show_overlay = !self.show_overlay;
    }

    pub fn toggle_wireframe(&mut self) {
        self.wireframe = !self.wireframe;
    }

    /// Ask for procedural terrain to be rebuilt. Ignored for image terrain.
    pub fn request_regenerate(&mut self) {
        if self.procedural {
            self.regenerate_requested = true;
        }
    }

    /// Consume a pending regeneration request
    pub fn take_regenerate(&mut self) -> bool {
        std::mem::take(&mut self.regenerate_requested)
    }

    /// Drop all held keys, e.g. on focus loss
    pub fn release_input(&mut self) {
        self.input = CameraInput::new();
    }
}
