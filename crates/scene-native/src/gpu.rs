use std::ops::Range;

use glam::{Mat4, Vec3};
use scene_core::{Camera, InstanceHandle, InstanceRenderer, MeshKind};
use wgpu::util::DeviceExt;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const INITIAL_INSTANCE_CAPACITY: usize = 2048;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    light_dir: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceData {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

impl InstanceData {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4
    ];
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Geometry {
    Box,
    Quad,
}

fn geometry(mesh: MeshKind) -> Geometry {
    match mesh {
        MeshKind::EchoPillar | MeshKind::EchoGlow => Geometry::Box,
        MeshKind::Ground | MeshKind::PointNote | MeshKind::PointBackdrop | MeshKind::Bubble => {
            Geometry::Quad
        }
    }
}

/// CPU-side instance lists, packed in the GPU layout as the animators write them.
#[derive(Default)]
pub struct InstanceBatches {
    data: [Vec<InstanceData>; 6],
    visible: [Vec<bool>; 6],
}

impl InstanceBatches {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_mut(&mut self, handle: InstanceHandle) -> Option<(&mut InstanceData, &mut bool)> {
        let mesh = handle.mesh.index();
        let i = handle.index as usize;
        let data = self.data[mesh].get_mut(i)?;
        let visible = self.visible[mesh].get_mut(i)?;
        Some((data, visible))
    }

    fn visible_instances(&self, mesh: MeshKind) -> impl Iterator<Item = &InstanceData> {
        let m = mesh.index();
        self.data[m]
            .iter()
            .zip(&self.visible[m])
            .filter(|(_, v)| **v)
            .map(|(d, _)| d)
    }
}

impl InstanceRenderer for InstanceBatches {
    fn allocate_instances(&mut self, mesh: MeshKind, count: usize) -> Vec<InstanceHandle> {
        let m = mesh.index();
        let first = self.data[m].len() as u32;
        self.data[m].extend(std::iter::repeat(InstanceData {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            color: [1.0; 4],
        })
        .take(count));
        self.visible[m].extend(std::iter::repeat(true).take(count));
        log::debug!("[gpu] {mesh:?}: {count} instances allocated, {} total", self.data[m].len());
        (0..count as u32)
            .map(|i| InstanceHandle {
                mesh,
                index: first + i,
            })
            .collect()
    }

    fn set_instance_transform(&mut self, handle: InstanceHandle, matrix: Mat4) {
        if let Some((d, _)) = self.get_mut(handle) {
            d.model = matrix.to_cols_array_2d();
        }
    }

    fn set_instance_color(&mut self, handle: InstanceHandle, rgb: Vec3) {
        if let Some((d, _)) = self.get_mut(handle) {
            d.color = [rgb.x, rgb.y, rgb.z, 1.0];
        }
    }

    fn set_instance_visible(&mut self, handle: InstanceHandle, visible: bool) {
        if let Some((_, v)) = self.get_mut(handle) {
            *v = visible;
        }
    }
}

pub struct GpuState<'w> {
    pub window: &'w winit::window::Window,
    surface: wgpu::Surface<'w>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    box_vb: wgpu::Buffer,
    box_vertex_count: u32,
    quad_vb: wgpu::Buffer,
    quad_vertex_count: u32,
    instance_vb: wgpu::Buffer,
    instance_capacity: usize,
    depth_view: wgpu::TextureView,
    staging: Vec<InstanceData>,
    draws: Vec<(Geometry, Range<u32>)>,
}

impl<'w> GpuState<'w> {
    pub async fn new(window: &'w winit::window::Window) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No GPU adapter"))?;
        log::info!("[gpu] adapter: {}", adapter.get_info().name);
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: None,
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .first()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Surface reports no texture formats"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            desired_maximum_frame_latency: 2,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, config.width, config.height);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("instances"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/instances.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniforms"),
            size: std::mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let box_vertices = box_vertices(Vec3::new(0.5, 1.0, 0.5));
        let box_vb = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("box_vb"),
            contents: bytemuck::cast_slice(&box_vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_vertices = quad_vertices();
        let quad_vb = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad_vb"),
            contents: bytemuck::cast_slice(&quad_vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let instance_vb = create_instance_buffer(&device, INITIAL_INSTANCE_CAPACITY);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bg"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let vertex_buffers = [
            // slot 0: mesh vertices
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &Vertex::ATTRIBUTES,
            },
            // slot 1: per-instance model matrix and color
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<InstanceData>() as u64,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &InstanceData::ATTRIBUTES,
            },
        ];
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &vertex_buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            cache: None,
            multiview: None,
        });

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            pipeline,
            uniform_buffer,
            bind_group,
            box_vb,
            box_vertex_count: box_vertices.len() as u32,
            quad_vb,
            quad_vertex_count: quad_vertices.len() as u32,
            instance_vb,
            instance_capacity: INITIAL_INSTANCE_CAPACITY,
            depth_view,
            staging: Vec::with_capacity(INITIAL_INSTANCE_CAPACITY),
            draws: Vec::with_capacity(MeshKind::ALL.len()),
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, new_size.width, new_size.height);
    }

    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }

    /// Draw every visible instance of every mesh from `camera`.
    pub fn render(
        &mut self,
        scene: &InstanceBatches,
        camera: &Camera,
    ) -> Result<(), wgpu::SurfaceError> {
        self.staging.clear();
        self.draws.clear();
        for mesh in MeshKind::ALL {
            let start = self.staging.len() as u32;
            self.staging.extend(scene.visible_instances(mesh).copied());
            let end = self.staging.len() as u32;
            if end > start {
                self.draws.push((geometry(mesh), start..end));
            }
        }
        if self.staging.len() > self.instance_capacity {
            self.instance_capacity = self.staging.len().next_power_of_two();
            self.instance_vb = create_instance_buffer(&self.device, self.instance_capacity);
            log::debug!("[gpu] instance buffer grown to {}", self.instance_capacity);
        }

        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&Uniforms {
                view_proj: camera.view_proj().to_cols_array_2d(),
                light_dir: [0.3, 1.0, 0.5, 0.0],
            }),
        );
        if !self.staging.is_empty() {
            self.queue
                .write_buffer(&self.instance_vb, 0, bytemuck::cast_slice(&self.staging));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("rpass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.01,
                            g: 0.01,
                            b: 0.02,
                            a: 1.0,
                        }),
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
            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.bind_group, &[]);
            rpass.set_vertex_buffer(1, self.instance_vb.slice(..));
            for (kind, instances) in &self.draws {
                let (vb, count) = match kind {
                    Geometry::Box => (&self.box_vb, self.box_vertex_count),
                    Geometry::Quad => (&self.quad_vb, self.quad_vertex_count),
                };
                rpass.set_vertex_buffer(0, vb.slice(..));
                rpass.draw(0..count, instances.clone());
            }
        }
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("instance_vb"),
        size: (std::mem::size_of::<InstanceData>() * capacity) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("depth"),
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
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

fn face(normal: Vec3, u: Vec3, v: Vec3, half: Vec3, out: &mut Vec<Vertex>) {
    let c = normal * half;
    let du = u * half;
    let dv = v * half;
    let corners = [c - du - dv, c + du - dv, c + du + dv, c - du + dv];
    for i in [0, 1, 2, 0, 2, 3] {
        out.push(Vertex {
            position: corners[i].to_array(),
            normal: normal.to_array(),
        });
    }
}

/// Axis-aligned box centred on the origin, 36 vertices.
fn box_vertices(half: Vec3) -> Vec<Vertex> {
    let mut out = Vec::with_capacity(36);
    face(Vec3::X, -Vec3::Z, Vec3::Y, half, &mut out);
    face(-Vec3::X, Vec3::Z, Vec3::Y, half, &mut out);
    face(Vec3::Y, Vec3::X, -Vec3::Z, half, &mut out);
    face(-Vec3::Y, Vec3::X, Vec3::Z, half, &mut out);
    face(Vec3::Z, Vec3::X, Vec3::Y, half, &mut out);
    face(-Vec3::Z, -Vec3::X, Vec3::Y, half, &mut out);
    out
}

/// Unit quad in the XY plane facing +Z.
fn quad_vertices() -> Vec<Vertex> {
    let mut out = Vec::with_capacity(6);
    let half = Vec3::new(0.5, 0.5, 0.0);
    let corners = [
        Vec3::new(-half.x, -half.y, 0.0),
        Vec3::new(half.x, -half.y, 0.0),
        Vec3::new(half.x, half.y, 0.0),
        Vec3::new(-half.x, half.y, 0.0),
    ];
    for i in [0, 1, 2, 0, 2, 3] {
        out.push(Vertex {
            position: corners[i].to_array(),
            normal: Vec3::Z.to_array(),
        });
    }
    out
}
