//! wgpu terrain renderer
//!
//! Owns the surface, device and every GPU resource. Terrain is drawn with a
//! height color ramp and a single directional light; wireframe drawing uses
//! a line-mode pipeline when the adapter supports it.

use std::ops::Range;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use thiserror::Error;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::overlay::Overlay;
use crate::resources::{DrawMode, Mesh, TerrainVertex};
use crate::scene::Camera;

/// Renderer error type
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to create surface: {0}")]
    SurfaceCreationFailed(String),
    #[error("No suitable adapter found")]
    NoAdapter,
    #[error("Failed to create device: {0}")]
    DeviceCreationFailed(String),
    #[error("Surface does not support any texture format")]
    NoSurfaceFormat,
    #[error("Out of memory")]
    OutOfMemory,
}

pub type RenderResult<T> = Result<T, RenderError>;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.53,
    g: 0.71,
    b: 0.86,
    a: 1.0,
};

/// Direction towards the light, in world space
const LIGHT_DIRECTION: Vec3 = Vec3::new(-0.4, 1.0, -0.3);

pub const TERRAIN_SHADER: &str = r#"
struct CameraUniforms {
    view_proj: mat4x4<f32>,
    position: vec4<f32>,
}

struct TerrainUniforms {
    // x = min height, y = max height
    height_range: vec4<f32>,
    light_dir: vec4<f32>,
}

@group(0) @binding(0) var<uniform> camera: CameraUniforms;
@group(0) @binding(1) var<uniform> terrain: TerrainUniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) height: f32,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(input.position, 1.0);
    out.normal = input.normal;
    out.height = input.position.y;
    return out;
}

fn elevation_color(t: f32) -> vec3<f32> {
    let lowland = vec3<f32>(0.10, 0.36, 0.10);
    let grass = vec3<f32>(0.30, 0.69, 0.22);
    let hills = vec3<f32>(1.00, 0.84, 0.18);
    let rock = vec3<f32>(0.55, 0.27, 0.07);
    let snow = vec3<f32>(1.00, 1.00, 1.00);

    if (t < 0.25) {
        return mix(lowland, grass, t / 0.25);
    } else if (t < 0.5) {
        return mix(grass, hills, (t - 0.25) / 0.25);
    } else if (t < 0.75) {
        return mix(hills, rock, (t - 0.5) / 0.25);
    }
    return mix(rock, snow, (t - 0.75) / 0.25);
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let span = max(terrain.height_range.y - terrain.height_range.x, 1e-6);
    let t = clamp((input.height - terrain.height_range.x) / span, 0.0, 1.0);
    let base = elevation_color(t);

    // Zero normals (degenerate or isolated vertices) get ambient light only
    var diffuse = 0.0;
    if (dot(input.normal, input.normal) > 0.0) {
        diffuse = max(dot(normalize(input.normal), normalize(terrain.light_dir.xyz)), 0.0);
    }
    let color = base * (0.25 + 0.75 * diffuse);
    return vec4<f32>(color, 1.0);
}

@fragment
fn fs_wire(input: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(0.05, 0.05, 0.05, 1.0);
}
"#;

/// Uniform data consumed by the terrain fragment shader
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct TerrainUniformData {
    height_range: Vec4,
    light_dir: Vec4,
}

/// One list pipeline and one strip pipeline sharing a polygon mode
struct PipelinePair {
    list: wgpu::RenderPipeline,
    strip: wgpu::RenderPipeline,
}

impl PipelinePair {
    fn select(&self, mode: &DrawMode) -> &wgpu::RenderPipeline {
        match mode {
            DrawMode::TriangleList => &self.list,
            DrawMode::TriangleStrips(_) => &self.strip,
        }
    }
}

/// Terrain buffers resident on the GPU
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    draw_mode: DrawMode,
    ranges: Vec<Range<u32>>,
}

impl GpuMesh {
    fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        for range in &self.ranges {
            pass.draw_indexed(range.clone(), 0, 0..1);
        }
    }
}

/// Renders uploaded terrain and the overlay to the window surface
pub struct TerrainRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    camera_buffer: wgpu::Buffer,
    terrain_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    fill: PipelinePair,
    wireframe: Option<PipelinePair>,
    mesh: Option<GpuMesh>,
}

impl TerrainRenderer {
    /// Blocking initialization for native targets
    pub fn new(window: Arc<Window>, vsync: bool) -> RenderResult<Self> {
        pollster::block_on(Self::new_async(window, vsync))
    }

    pub async fn new_async(window: Arc<Window>, vsync: bool) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| RenderError::SurfaceCreationFailed(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Selected GPU: {} ({:?} backend)",
            adapter_info.name,
            adapter_info.backend
        );

        let line_mode = adapter
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE);
        if !line_mode {
            log::warn!("Adapter lacks POLYGON_MODE_LINE, wireframe mode is unavailable");
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Terrain Device"),
                    required_features: if line_mode {
                        wgpu::Features::POLYGON_MODE_LINE
                    } else {
                        wgpu::Features::empty()
                    },
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::DeviceCreationFailed(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;

        let present_mode = if vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let size = window.inner_size();
        let (width, height) = clamp_surface_size(
            size.width,
            size.height,
            device.limits().max_texture_dimension_2d,
        );

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, width, height);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniforms"),
            contents: bytemuck::bytes_of(&Camera::default().uniform_data()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let terrain_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Terrain Uniforms"),
            contents: bytemuck::bytes_of(&terrain_uniforms(0.0, 1.0)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Terrain Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX),
                uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Terrain Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: terrain_buffer.as_entire_binding(),
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Terrain Shader"),
            source: wgpu::ShaderSource::Wgsl(TERRAIN_SHADER.into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Terrain Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let builder = PipelineBuilder {
            device: &device,
            layout: &layout,
            shader: &shader,
            format: surface_format,
        };
        let fill = builder.pair(wgpu::PolygonMode::Fill, "fs_main");
        let wireframe = line_mode.then(|| builder.pair(wgpu::PolygonMode::Line, "fs_wire"));

        Ok(Self {
            surface,
            device,
            queue,
            surface_config,
            depth_view,
            camera_buffer,
            terrain_buffer,
            bind_group,
            fill,
            wireframe,
            mesh: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    /// Actual surface size (may be clamped by device limits)
    pub fn surface_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    pub fn supports_wireframe(&self) -> bool {
        self.wireframe.is_some()
    }

    /// Replace the terrain on the GPU. Empty meshes clear it.
    pub fn upload(&mut self, mesh: &Mesh) {
        if mesh.is_empty() {
            log::debug!("Mesh '{}' has no triangles, nothing to draw", mesh.name);
            self.mesh = None;
            return;
        }

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Terrain Vertices"),
                contents: mesh.vertex_bytes(),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Terrain Indices"),
                contents: mesh.index_bytes(),
                usage: wgpu::BufferUsages::INDEX,
            });

        let (min, max) = mesh
            .bounds()
            .map(|(min, max)| (min.y, max.y))
            .unwrap_or((0.0, 1.0));
        self.queue.write_buffer(
            &self.terrain_buffer,
            0,
            bytemuck::bytes_of(&terrain_uniforms(min, max)),
        );

        log::debug!(
            "Uploaded '{}': {} vertices, {} indices",
            mesh.name,
            mesh.vertex_count(),
            mesh.index_count()
        );

        self.mesh = Some(GpuMesh {
            vertex_buffer,
            index_buffer,
            draw_mode: mesh.draw_mode.clone(),
            ranges: draw_ranges(mesh),
        });
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let (width, height) =
            clamp_surface_size(width, height, self.device.limits().max_texture_dimension_2d);
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, width, height);
    }

    /// Draw one frame. A lost or outdated surface is reconfigured and the
    /// frame skipped.
    pub fn render(
        &mut self,
        camera: &Camera,
        wireframe: bool,
        overlay: Option<&mut Overlay>,
    ) -> RenderResult<()> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(RenderError::OutOfMemory),
            Err(e) => {
                log::warn!("Skipping frame: {}", e);
                return Ok(());
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&camera.uniform_data()),
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Terrain Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(mesh) = &self.mesh {
                let pipelines = match (&self.wireframe, wireframe) {
                    (Some(lines), true) => lines,
                    _ => &self.fill,
                };
                pass.set_pipeline(pipelines.select(&mesh.draw_mode));
                pass.set_bind_group(0, &self.bind_group, &[]);
                mesh.draw(&mut pass);
            }
        }

        let mut command_buffers = Vec::new();
        if let Some(overlay) = overlay {
            command_buffers = overlay.paint(
                &self.device,
                &self.queue,
                &mut encoder,
                &view,
                self.surface_size(),
            );
        }

        command_buffers.push(encoder.finish());
        self.queue.submit(command_buffers);
        frame.present();

        Ok(())
    }
}

struct PipelineBuilder<'a> {
    device: &'a wgpu::Device,
    layout: &'a wgpu::PipelineLayout,
    shader: &'a wgpu::ShaderModule,
    format: wgpu::TextureFormat,
}

impl PipelineBuilder<'_> {
    fn pair(&self, polygon_mode: wgpu::PolygonMode, fragment: &str) -> PipelinePair {
        PipelinePair {
            list: self.build(
                wgpu::PrimitiveTopology::TriangleList,
                None,
                polygon_mode,
                fragment,
            ),
            strip: self.build(
                wgpu::PrimitiveTopology::TriangleStrip,
                Some(wgpu::IndexFormat::Uint32),
                polygon_mode,
                fragment,
            ),
        }
    }

    fn build(
        &self,
        topology: wgpu::PrimitiveTopology,
        strip_index_format: Option<wgpu::IndexFormat>,
        polygon_mode: wgpu::PolygonMode,
        fragment: &str,
    ) -> wgpu::RenderPipeline {
        let label = format!("Terrain {:?} {:?}", topology, polygon_mode);
        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&label),
                layout: Some(self.layout),
                vertex: wgpu::VertexState {
                    module: self.shader,
                    entry_point: "vs_main",
                    compilation_options: Default::default(),
                    buffers: &[TerrainVertex::layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: self.shader,
                    entry_point: fragment,
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format,
                    // Terrain triangles wind clockwise seen from above
                    front_face: wgpu::FrontFace::Cw,
                    cull_mode: None,
                    polygon_mode,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            })
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn terrain_uniforms(min_height: f32, max_height: f32) -> TerrainUniformData {
    TerrainUniformData {
        height_range: Vec4::new(min_height, max_height, 0.0, 0.0),
        light_dir: LIGHT_DIRECTION.normalize().extend(0.0),
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Clamp to device limits while maintaining aspect ratio
fn clamp_surface_size(width: u32, height: u32, max_size: u32) -> (u32, u32) {
    if width > max_size || height > max_size {
        let scale = (max_size as f32 / width as f32).min(max_size as f32 / height as f32);
        let new_width = ((width as f32 * scale) as u32).max(1);
        let new_height = ((height as f32 * scale) as u32).max(1);
        (new_width, new_height)
    } else {
        (width.max(1), height.max(1))
    }
}

/// Index ranges of the draw calls a mesh turns into
pub fn draw_ranges(mesh: &Mesh) -> Vec<Range<u32>> {
    match &mesh.draw_mode {
        DrawMode::TriangleList => vec![0..mesh.index_count() as u32],
        DrawMode::TriangleStrips(ranges) => ranges.clone(),
    }
}
