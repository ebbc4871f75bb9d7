//! Voxel-space reflections for wgpu renderers.
//!
//! Per frame the effect captures the rendered scene into a lighting/position
//! pair, scatters it into a 3D voxel grid with a compute dispatch, ray-marches
//! the grid for per-pixel reflections, blurs the result with alternating
//! horizontal/vertical passes and blends it over the source frame. The host
//! owns the scene, camera and presentation; this crate only consumes a color
//! view, a depth view and the camera matrices, and writes a destination view.

pub mod config;
pub mod context;
pub mod graph;
pub mod grid_store;
pub mod passes;
pub mod pipeline;
pub mod pool;
pub mod render_targets;

pub use config::{GridStorage, ReflectionConfig};
pub use context::GpuContext;

use glam::{Mat4, Vec3};
use voxref_gpu_shared::shaders;
use voxref_gpu_shared::uniforms::{
    BlurParams, CaptureParams, CompositeParams, ReflectParams, VoxelizeParams,
};

use crate::graph::{ResourceId, StageIo};
use crate::grid_store::{GridPhase, VoxelGridStore};
use crate::pipeline::Pipelines;
use crate::pool::TargetPool;
use crate::render_targets::CaptureTargets;

/// Camera state for one frame. The inverses are re-derived on every
/// construction so a stale inverse can never outlive a projection change.
#[derive(Clone, Copy, Debug)]
pub struct CameraMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    pub inv_view: Mat4,
    pub inv_projection: Mat4,
    pub position: Vec3,
}

impl CameraMatrices {
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        let inv_view = view.inverse();
        let inv_projection = projection.inverse();
        let position = inv_view.w_axis.truncate();
        Self {
            view,
            projection,
            inv_view,
            inv_projection,
            position,
        }
    }

    /// False for degenerate cameras (singular projection), whose inverses
    /// contain non-finite values.
    pub fn is_finite(&self) -> bool {
        self.inv_view.is_finite() && self.inv_projection.is_finite()
    }
}

/// Per-frame inputs handed over by the host renderer.
pub struct FrameInput<'a> {
    /// Rendered scene color (TEXTURE_BINDING usage).
    pub source: &'a wgpu::TextureView,
    /// Hardware depth buffer (TEXTURE_BINDING usage).
    pub depth: &'a wgpu::TextureView,
    /// Where the composited frame lands (RENDER_ATTACHMENT usage).
    pub destination: &'a wgpu::TextureView,
    pub camera: CameraMatrices,
}

struct ParamBuffers {
    capture: wgpu::Buffer,
    voxelize: wgpu::Buffer,
    reflect: wgpu::Buffer,
    blur_h: wgpu::Buffer,
    blur_v: wgpu::Buffer,
    composite: wgpu::Buffer,
}

fn create_uniform_buffer(device: &wgpu::Device, label: &str, size: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: size as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// One recorded stage: declared IO plus the deferred encoder work.
struct Stage<'a> {
    io: StageIo,
    record: Box<dyn FnOnce(&mut wgpu::CommandEncoder) + 'a>,
}

impl<'a> Stage<'a> {
    fn new(
        name: &'static str,
        reads: &[ResourceId],
        writes: &[ResourceId],
        record: impl FnOnce(&mut wgpu::CommandEncoder) + 'a,
    ) -> Self {
        Self {
            io: StageIo::new(name, reads, writes),
            record: Box::new(record),
        }
    }
}

/// The voxel reflection effect. Allocate once, call [`render`] every frame.
///
/// [`render`]: VoxelReflections::render
pub struct VoxelReflections {
    config: ReflectionConfig,
    grid: VoxelGridStore,
    captures: CaptureTargets,
    pool: TargetPool,
    pipelines: Option<Pipelines>,
    passthrough_bgl: wgpu::BindGroupLayout,
    passthrough: wgpu::RenderPipeline,
    buffers: ParamBuffers,
    linear_sampler: wgpu::Sampler,
    depth_sampler: wgpu::Sampler,
    grid_sampler: wgpu::Sampler,
}

impl VoxelReflections {
    /// Validate the configuration, allocate the grid and captures, and build
    /// the pipelines. Effect-pipeline failure degrades to pass-through
    /// instead of failing construction; only an unusable pass-through path
    /// is a hard error.
    pub fn new(
        device: &wgpu::Device,
        config: ReflectionConfig,
        destination_format: wgpu::TextureFormat,
    ) -> Result<Self, String> {
        config.validate()?;

        let grid = VoxelGridStore::new(device, config.voxel_dimension, config.storage)?;
        let captures = render_targets::create_capture_targets(device, config.voxel_dimension);

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let passthrough_bgl = pipeline::create_blit_bind_group_layout(device);
        let passthrough = pipeline::create_fullscreen_effect_pipeline(
            device,
            "Passthrough Pipeline",
            shaders::BLIT_FRAG,
            "fs_main",
            &passthrough_bgl,
            destination_format,
        );
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(format!("pass-through pipeline creation failed: {error}"));
        }

        let pipelines = match Pipelines::create(device, config.storage, destination_format) {
            Ok(p) => Some(p),
            Err(e) => {
                log::warn!("{e}; reflections disabled, frames will pass through");
                None
            }
        };

        let buffers = ParamBuffers {
            capture: create_uniform_buffer(device, "Capture Params", std::mem::size_of::<CaptureParams>()),
            voxelize: create_uniform_buffer(device, "Voxelize Params", std::mem::size_of::<VoxelizeParams>()),
            reflect: create_uniform_buffer(device, "Reflect Params", std::mem::size_of::<ReflectParams>()),
            blur_h: create_uniform_buffer(device, "Blur H Params", std::mem::size_of::<BlurParams>()),
            blur_v: create_uniform_buffer(device, "Blur V Params", std::mem::size_of::<BlurParams>()),
            composite: create_uniform_buffer(device, "Composite Params", std::mem::size_of::<CompositeParams>()),
        };

        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("voxref Linear Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let depth_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("voxref Depth Sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        // Trilinear within the single mip level of the grid texture.
        let grid_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("voxref Grid Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        log::info!(
            "voxel reflections initialized: {}x{}, D={}, {:?}",
            config.resolution.0,
            config.resolution.1,
            config.voxel_dimension,
            config.storage
        );

        Ok(Self {
            config,
            grid,
            captures,
            pool: TargetPool::new(),
            pipelines,
            passthrough_bgl,
            passthrough,
            buffers,
            linear_sampler,
            depth_sampler,
            grid_sampler,
        })
    }

    pub fn config(&self) -> &ReflectionConfig {
        &self.config
    }

    pub fn grid(&self) -> &VoxelGridStore {
        &self.grid
    }

    /// Update the output resolution. Pooled blur targets of the old size are
    /// dropped; grid and captures are resolution-independent.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.resolution = (width, height);
            self.pool.purge();
            log::info!("voxel reflections resized to {width}x{height}");
        }
    }

    /// Run the full pipeline for one frame.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        frame: &FrameInput<'_>,
    ) -> Result<(), String> {
        self.grid.begin_frame();

        let Some(pipelines) = self.pipelines.as_ref() else {
            log::warn!("reflection pipelines unavailable; passing frame through");
            return self.record_passthrough(device, queue, frame);
        };
        if !frame.camera.is_finite() {
            log::warn!("camera matrices are not finite; passing frame through");
            return self.record_passthrough(device, queue, frame);
        }

        let cfg = &self.config;
        let dim = self.grid.dimension();

        self.write_params(queue, frame);

        // Per-frame bind groups.
        let lighting_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Lighting Capture BG"),
            layout: &pipelines.blit_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(frame.source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
                },
            ],
        });
        let position_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Position Capture BG"),
            layout: &pipelines.capture_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.buffers.capture.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(frame.depth),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.depth_sampler),
                },
            ],
        });
        let voxelize_entries = [
            wgpu::BindGroupEntry {
                binding: 0,
                resource: self.buffers.voxelize.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&self.captures.lighting.color_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&self.captures.position.color_view),
            },
            self.grid.voxelize_binding(),
        ];
        let voxelize_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Voxelize BG"),
            layout: &pipelines.voxelize_bgl,
            entries: &voxelize_entries,
        });
        let mut march_entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: self.buffers.reflect.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(frame.depth),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&self.depth_sampler),
            },
        ];
        march_entries.extend(self.grid.march_bindings(&self.grid_sampler));
        let march_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("March BG"),
            layout: &pipelines.march_bgl,
            entries: &march_entries,
        });

        // Blur temporaries leased up front; the leases hand them back when
        // the frame ends on every path, debug mode included.
        let (rw, rh) = cfg.reflection_extent();
        let ping = self.pool.lease(device, rw, rh, "Reflection Ping");
        let pong = self.pool.lease(device, rw, rh, "Reflection Pong");

        let blur_h_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blur H BG"),
            layout: &pipelines.blur_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.buffers.blur_h.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&ping.color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
                },
            ],
        });
        let blur_v_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blur V BG"),
            layout: &pipelines.blur_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.buffers.blur_v.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&pong.color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
                },
            ],
        });
        let composite_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite BG"),
            layout: &pipelines.composite_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.buffers.composite.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(frame.source),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&ping.color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
                },
            ],
        });

        let mut stages: Vec<Stage<'_>> = Vec::new();

        stages.push(Stage::new(
            "lighting capture",
            &[ResourceId::SourceColor],
            &[ResourceId::LightingCapture],
            |enc| {
                passes::capture::record_lighting_capture(
                    enc,
                    &self.captures.lighting,
                    &pipelines.lighting_blit,
                    &lighting_bg,
                );
            },
        ));
        stages.push(Stage::new(
            "position capture",
            &[ResourceId::SceneDepth],
            &[ResourceId::PositionCapture],
            |enc| {
                passes::capture::record_position_capture(
                    enc,
                    &self.captures.position,
                    &pipelines.position_capture,
                    &position_bg,
                );
            },
        ));

        // The grid is cleared every frame so reflections only ever see this
        // frame's geometry.
        stages.push(Stage::new(
            "grid clear",
            &[],
            &[ResourceId::VoxelGrid],
            |enc| match pipelines.grid_clear.as_ref() {
                Some(clear) => passes::voxelize::record_grid_clear(enc, clear, &voxelize_bg, dim),
                None => self.grid.record_buffer_clear(enc),
            },
        ));
        stages.push(Stage::new(
            "voxelize",
            &[ResourceId::LightingCapture, ResourceId::PositionCapture],
            &[ResourceId::VoxelGrid],
            |enc| {
                passes::voxelize::record_voxelize(enc, &pipelines.voxelize, &voxelize_bg, dim);
            },
        ));
        self.grid.mark_written();
        debug_assert_eq!(self.grid.phase(), GridPhase::Readable);

        if cfg.debug_mode {
            stages.push(Stage::new(
                "debug view",
                &[ResourceId::VoxelGrid, ResourceId::SceneDepth],
                &[ResourceId::Destination],
                |enc| {
                    debug_assert_eq!(self.grid.phase(), GridPhase::Readable);
                    passes::reflect::record_debug_view(
                        enc,
                        frame.destination,
                        &pipelines.debug_view,
                        &march_bg,
                    );
                },
            ));
        } else {
            stages.push(Stage::new(
                "reflect",
                &[ResourceId::VoxelGrid, ResourceId::SceneDepth],
                &[ResourceId::BlurPing],
                |enc| {
                    debug_assert_eq!(self.grid.phase(), GridPhase::Readable);
                    passes::reflect::record_reflection(enc, &ping, &pipelines.reflect, &march_bg);
                },
            ));
            for _ in 0..cfg.blur_iterations {
                stages.push(Stage::new(
                    "blur horizontal",
                    &[ResourceId::BlurPing],
                    &[ResourceId::BlurPong],
                    |enc| {
                        passes::blur::record_blur_pass(enc, &pong, &pipelines.blur, &blur_h_bg, "Blur H");
                    },
                ));
                stages.push(Stage::new(
                    "blur vertical",
                    &[ResourceId::BlurPong],
                    &[ResourceId::BlurPing],
                    |enc| {
                        passes::blur::record_blur_pass(enc, &ping, &pipelines.blur, &blur_v_bg, "Blur V");
                    },
                ));
            }
            stages.push(Stage::new(
                "composite",
                &[ResourceId::SourceColor, ResourceId::BlurPing],
                &[ResourceId::Destination],
                |enc| {
                    passes::composite::record_composite(
                        enc,
                        frame.destination,
                        &pipelines.composite,
                        &composite_bg,
                    );
                },
            ));
        }

        debug_assert_eq!(
            stages.iter().map(|s| s.io.clone()).collect::<Vec<_>>(),
            graph::plan_frame(cfg.debug_mode, cfg.blur_iterations),
        );
        self.submit_stages(device, queue, stages)
    }

    /// Write every kernel's params as a pure function of this frame's camera
    /// and the configuration.
    fn write_params(&self, queue: &wgpu::Queue, frame: &FrameInput<'_>) {
        let cfg = &self.config;
        let camera = &frame.camera;

        queue.write_buffer(
            &self.buffers.capture,
            0,
            bytemuck::bytes_of(&CaptureParams {
                inv_view: camera.inv_view.to_cols_array_2d(),
                inv_projection: camera.inv_projection.to_cols_array_2d(),
            }),
        );
        queue.write_buffer(
            &self.buffers.voxelize,
            0,
            bytemuck::bytes_of(&VoxelizeParams {
                dimension: self.grid.dimension(),
                boundary: cfg.world_volume_boundary,
                _pad0: 0.0,
                _pad1: 0.0,
            }),
        );
        queue.write_buffer(
            &self.buffers.reflect,
            0,
            bytemuck::bytes_of(&ReflectParams {
                inv_view: camera.inv_view.to_cols_array_2d(),
                inv_projection: camera.inv_projection.to_cols_array_2d(),
                camera_pos: camera.position.extend(1.0).to_array(),
                dimension: self.grid.dimension(),
                max_iterations: cfg.max_iterations,
                boundary: cfg.world_volume_boundary,
                ray_step: cfg.ray_step,
                ray_offset: cfg.ray_offset,
                hit_threshold: cfg.hit_threshold,
                _pad0: 0.0,
                _pad1: 0.0,
            }),
        );
        queue.write_buffer(
            &self.buffers.blur_h,
            0,
            bytemuck::bytes_of(&BlurParams {
                blur_step: cfg.blur_step,
                horizontal: 1,
                _pad0: 0.0,
                _pad1: 0.0,
            }),
        );
        queue.write_buffer(
            &self.buffers.blur_v,
            0,
            bytemuck::bytes_of(&BlurParams {
                blur_step: cfg.blur_step,
                horizontal: 0,
                _pad0: 0.0,
                _pad1: 0.0,
            }),
        );
        queue.write_buffer(
            &self.buffers.composite,
            0,
            bytemuck::bytes_of(&CompositeParams {
                intensity: cfg.intensity,
                _pad0: 0.0,
                _pad1: 0.0,
                _pad2: 0.0,
            }),
        );
    }

    /// Submit the recorded stages batch by batch; batch boundaries are the
    /// read-after-write sync points from the frame graph.
    fn submit_stages(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        stages: Vec<Stage<'_>>,
    ) -> Result<(), String> {
        let ios: Vec<StageIo> = stages.iter().map(|s| s.io.clone()).collect();
        let batches = graph::plan_batches(&ios);

        let mut iter = stages.into_iter();
        for batch in batches {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("voxref Frame Encoder"),
            });
            for _ in batch {
                if let Some(stage) = iter.next() {
                    (stage.record)(&mut encoder);
                }
            }
            queue.submit(std::iter::once(encoder.finish()));
        }
        Ok(())
    }

    /// Degraded path: copy the source frame to the destination unmodified.
    fn record_passthrough(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        frame: &FrameInput<'_>,
    ) -> Result<(), String> {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Passthrough BG"),
            layout: &self.passthrough_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(frame.source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
                },
            ],
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("voxref Passthrough Encoder"),
        });
        passes::composite::record_passthrough(
            &mut encoder,
            frame.destination,
            &self.passthrough,
            &bind_group,
        );
        queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}
