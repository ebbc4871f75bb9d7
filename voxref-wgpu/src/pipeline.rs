//! Pipeline and bind group layout creation for every pass in the reflection
//! pipeline. Fullscreen passes share one vertex shader and a generic
//! uniform + textures + sampler layout; the capture, voxelize and march
//! passes get dedicated layouts for their depth/storage/3D bindings.

use voxref_gpu_shared::shaders;

use crate::config::GridStorage;
use crate::render_targets::HDR_FORMAT;

/// Shared fullscreen-triangle vertex state.
fn fullscreen_vertex_state(module: &wgpu::ShaderModule) -> wgpu::VertexState<'_> {
    wgpu::VertexState {
        module,
        entry_point: Some("vs_main"),
        compilation_options: wgpu::PipelineCompilationOptions::default(),
        buffers: &[],
    }
}

/// Generic effect layout: params uniform, `num_textures` filterable textures,
/// one filtering sampler as the last binding.
pub fn create_effect_bind_group_layout(
    device: &wgpu::Device,
    label: &str,
    num_textures: u32,
) -> wgpu::BindGroupLayout {
    let mut entries = vec![wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }];

    for i in 0..num_textures {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 1 + i,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
    }

    entries.push(wgpu::BindGroupLayoutEntry {
        binding: 1 + num_textures,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    });

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &entries,
    })
}

/// Blit layout — matches blit.wgsl:
///   0: texture_2d<f32>
///   1: sampler
pub fn create_blit_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Blit BGL"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

/// Position capture layout — matches world_position.wgsl:
///   0: uniform CaptureParams
///   1: texture_depth_2d
///   2: sampler (non-filtering)
pub fn create_capture_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Position Capture BGL"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Depth,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                count: None,
            },
        ],
    })
}

/// Voxelize layout — matches voxelize.wgsl for the chosen grid backing:
///   0: uniform VoxelizeParams
///   1: texture_2d<f32> (lighting capture)
///   2: texture_2d<f32> (position capture)
///   3: texture_storage_3d<rgba16float, write>  [Texture3d]
///   4: storage buffer, read_write              [LinearBuffer]
pub fn create_voxelize_bind_group_layout(
    device: &wgpu::Device,
    storage: GridStorage,
) -> wgpu::BindGroupLayout {
    let mut entries = vec![
        wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        },
    ];

    match storage {
        GridStorage::Texture3d => entries.push(wgpu::BindGroupLayoutEntry {
            binding: 3,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: wgpu::TextureFormat::Rgba16Float,
                view_dimension: wgpu::TextureViewDimension::D3,
            },
            count: None,
        }),
        GridStorage::LinearBuffer => entries.push(wgpu::BindGroupLayoutEntry {
            binding: 4,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: false },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }),
    }

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Voxelize BGL"),
        entries: &entries,
    })
}

/// March layout, shared by reflect.wgsl and debug_view.wgsl:
///   0: uniform ReflectParams
///   1: texture_depth_2d
///   2: sampler (non-filtering)
///   3: texture_3d<f32> + 4: sampler (filtering)  [Texture3d]
///   5: storage buffer, read                      [LinearBuffer]
pub fn create_march_bind_group_layout(
    device: &wgpu::Device,
    storage: GridStorage,
) -> wgpu::BindGroupLayout {
    let mut entries = vec![
        wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Depth,
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
            count: None,
        },
    ];

    match storage {
        GridStorage::Texture3d => {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D3,
                    multisampled: false,
                },
                count: None,
            });
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 4,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }
        GridStorage::LinearBuffer => entries.push(wgpu::BindGroupLayoutEntry {
            binding: 5,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }),
    }

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("March BGL"),
        entries: &entries,
    })
}

/// Build a fullscreen-triangle render pipeline around a fragment entry point.
pub fn create_fullscreen_effect_pipeline(
    device: &wgpu::Device,
    label: &str,
    frag_source: &str,
    frag_entry: &str,
    bgl: &wgpu::BindGroupLayout,
    output_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let vert_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Fullscreen Vert"),
        source: wgpu::ShaderSource::Wgsl(shaders::FULLSCREEN_QUAD_VERT.into()),
    });

    let frag_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(frag_source.into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{label} Layout")),
        bind_group_layouts: &[bgl],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: fullscreen_vertex_state(&vert_module),
        fragment: Some(wgpu::FragmentState {
            module: &frag_module,
            entry_point: Some(frag_entry),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: output_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Build one compute pipeline over the voxelize module.
pub fn create_voxelize_pipeline(
    device: &wgpu::Device,
    label: &str,
    entry: &str,
    bgl: &wgpu::BindGroupLayout,
) -> wgpu::ComputePipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Voxelize Compute"),
        source: wgpu::ShaderSource::Wgsl(shaders::VOXELIZE_COMPUTE.into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{label} Layout")),
        bind_group_layouts: &[bgl],
        push_constant_ranges: &[],
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        module: &module,
        entry_point: Some(entry),
        compilation_options: wgpu::PipelineCompilationOptions::default(),
        cache: None,
    })
}

/// Every pipeline and layout the per-frame orchestration binds against.
pub struct Pipelines {
    pub blit_bgl: wgpu::BindGroupLayout,
    pub capture_bgl: wgpu::BindGroupLayout,
    pub voxelize_bgl: wgpu::BindGroupLayout,
    pub march_bgl: wgpu::BindGroupLayout,
    pub blur_bgl: wgpu::BindGroupLayout,
    pub composite_bgl: wgpu::BindGroupLayout,

    pub lighting_blit: wgpu::RenderPipeline,
    pub position_capture: wgpu::RenderPipeline,
    pub voxelize: wgpu::ComputePipeline,
    /// Clear dispatch for the texture backing; the buffer backing clears via
    /// `CommandEncoder::clear_buffer` instead.
    pub grid_clear: Option<wgpu::ComputePipeline>,
    pub reflect: wgpu::RenderPipeline,
    pub debug_view: wgpu::RenderPipeline,
    pub blur: wgpu::RenderPipeline,
    pub composite: wgpu::RenderPipeline,
}

impl Pipelines {
    /// Create every pipeline, surfacing shader/pipeline validation failures
    /// as an error instead of a device panic so the caller can degrade to
    /// pass-through.
    pub fn create(
        device: &wgpu::Device,
        storage: GridStorage,
        destination_format: wgpu::TextureFormat,
    ) -> Result<Self, String> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let blit_bgl = create_blit_bind_group_layout(device);
        let capture_bgl = create_capture_bind_group_layout(device);
        let voxelize_bgl = create_voxelize_bind_group_layout(device, storage);
        let march_bgl = create_march_bind_group_layout(device, storage);
        let blur_bgl = create_effect_bind_group_layout(device, "Blur BGL", 1);
        let composite_bgl = create_effect_bind_group_layout(device, "Composite BGL", 2);

        let (voxelize_entry, march_entry) = match storage {
            GridStorage::Texture3d => ("cs_texture", "fs_texture"),
            GridStorage::LinearBuffer => ("cs_buffer", "fs_buffer"),
        };

        log::info!("Creating capture pipelines...");
        let lighting_blit = create_fullscreen_effect_pipeline(
            device, "Lighting Capture Pipeline", shaders::BLIT_FRAG, "fs_main", &blit_bgl,
            HDR_FORMAT,
        );
        let position_capture = create_fullscreen_effect_pipeline(
            device, "Position Capture Pipeline", shaders::WORLD_POSITION_FRAG, "fs_main",
            &capture_bgl, wgpu::TextureFormat::Rgba32Float,
        );

        log::info!("Creating voxelize pipeline...");
        let voxelize = create_voxelize_pipeline(device, "Voxelize Pipeline", voxelize_entry, &voxelize_bgl);
        let grid_clear = match storage {
            GridStorage::Texture3d => Some(create_voxelize_pipeline(
                device, "Grid Clear Pipeline", "cs_clear", &voxelize_bgl,
            )),
            GridStorage::LinearBuffer => None,
        };

        log::info!("Creating reflection pipelines...");
        let reflect = create_fullscreen_effect_pipeline(
            device, "Reflect Pipeline", shaders::REFLECT_FRAG, march_entry, &march_bgl, HDR_FORMAT,
        );
        let debug_view = create_fullscreen_effect_pipeline(
            device, "Debug View Pipeline", shaders::DEBUG_VIEW_FRAG, march_entry, &march_bgl,
            destination_format,
        );
        let blur = create_fullscreen_effect_pipeline(
            device, "Blur Pipeline", shaders::BLUR_FRAG, "fs_main", &blur_bgl, HDR_FORMAT,
        );
        let composite = create_fullscreen_effect_pipeline(
            device, "Composite Pipeline", shaders::COMPOSITE_FRAG, "fs_main", &composite_bgl,
            destination_format,
        );

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(format!("reflection pipeline creation failed: {error}"));
        }
        log::info!("All reflection pipelines created.");

        Ok(Self {
            blit_bgl,
            capture_bgl,
            voxelize_bgl,
            march_bgl,
            blur_bgl,
            composite_bgl,
            lighting_blit,
            position_capture,
            voxelize,
            grid_clear,
            reflect,
            debug_view,
            blur,
            composite,
        })
    }
}
