//! GPU voxel grid store.
//!
//! Backs the grid with either a 3D storage texture (trilinear reads) or a
//! flat storage buffer (nearest reads), chosen at initialization. The store
//! carries a per-frame phase tag making the single-writer/single-reader
//! handoff explicit: voxelization runs while `Writable`, the ray-march and
//! debug passes require `Readable`.

use std::cell::Cell;

use crate::config::GridStorage;

/// Bytes per cell (vec4<f32> in the linear representation).
const CELL_SIZE: u64 = 16;

/// Which pipeline stage may touch the grid right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridPhase {
    Writable,
    Readable,
}

#[derive(Debug)]
enum GridBacking {
    Texture3d {
        _texture: wgpu::Texture,
        view: wgpu::TextureView,
    },
    LinearBuffer {
        buffer: wgpu::Buffer,
    },
}

#[derive(Debug)]
pub struct VoxelGridStore {
    dimension: u32,
    backing: GridBacking,
    phase: Cell<GridPhase>,
}

impl VoxelGridStore {
    /// Allocate a zeroed D³ grid, rejecting sizes the device cannot hold.
    pub fn new(
        device: &wgpu::Device,
        dimension: u32,
        storage: GridStorage,
    ) -> Result<Self, String> {
        let limits = device.limits();
        let cells = (dimension as u64).pow(3);

        let backing = match storage {
            GridStorage::Texture3d => {
                if dimension > limits.max_texture_dimension_3d {
                    return Err(format!(
                        "voxel grid dimension {dimension} exceeds device 3D texture limit {}",
                        limits.max_texture_dimension_3d
                    ));
                }
                let texture = device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("Voxel Grid"),
                    size: wgpu::Extent3d {
                        width: dimension,
                        height: dimension,
                        depth_or_array_layers: dimension,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D3,
                    format: wgpu::TextureFormat::Rgba16Float,
                    usage: wgpu::TextureUsages::STORAGE_BINDING
                        | wgpu::TextureUsages::TEXTURE_BINDING,
                    view_formats: &[],
                });
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                GridBacking::Texture3d {
                    _texture: texture,
                    view,
                }
            }
            GridStorage::LinearBuffer => {
                let bytes = cells * CELL_SIZE;
                let max = limits
                    .max_buffer_size
                    .min(limits.max_storage_buffer_binding_size as u64);
                if bytes > max {
                    return Err(format!(
                        "voxel grid of {cells} cells ({bytes} bytes) exceeds device buffer limit {max}"
                    ));
                }
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Voxel Grid"),
                    size: bytes,
                    usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                    mapped_at_creation: false,
                });
                GridBacking::LinearBuffer { buffer }
            }
        };

        log::info!("voxel grid allocated: {dimension}^3 cells, {storage:?}");

        Ok(Self {
            dimension,
            backing,
            phase: Cell::new(GridPhase::Writable),
        })
    }

    #[inline]
    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    pub fn storage(&self) -> GridStorage {
        match self.backing {
            GridBacking::Texture3d { .. } => GridStorage::Texture3d,
            GridBacking::LinearBuffer { .. } => GridStorage::LinearBuffer,
        }
    }

    /// 3D texture view, when texture-backed.
    pub fn texture_view(&self) -> Option<&wgpu::TextureView> {
        match &self.backing {
            GridBacking::Texture3d { view, .. } => Some(view),
            GridBacking::LinearBuffer { .. } => None,
        }
    }

    /// Storage buffer, when buffer-backed.
    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        match &self.backing {
            GridBacking::LinearBuffer { buffer } => Some(buffer),
            GridBacking::Texture3d { .. } => None,
        }
    }

    /// Zero the linear backing in-place. The texture backing is cleared by
    /// the `cs_clear` dispatch instead (recorded by the orchestrator).
    pub fn record_buffer_clear(&self, encoder: &mut wgpu::CommandEncoder) {
        if let GridBacking::LinearBuffer { buffer } = &self.backing {
            encoder.clear_buffer(buffer, 0, None);
        }
    }

    /// Bind group entry for the voxelize kernel's grid binding.
    pub fn voxelize_binding(&self) -> wgpu::BindGroupEntry<'_> {
        match &self.backing {
            GridBacking::Texture3d { view, .. } => wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(view),
            },
            GridBacking::LinearBuffer { buffer } => wgpu::BindGroupEntry {
                binding: 4,
                resource: buffer.as_entire_binding(),
            },
        }
    }

    /// Bind group entries for the march/debug kernels' grid bindings.
    pub fn march_bindings<'a>(
        &'a self,
        grid_sampler: &'a wgpu::Sampler,
    ) -> Vec<wgpu::BindGroupEntry<'a>> {
        match &self.backing {
            GridBacking::Texture3d { view, .. } => vec![
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(grid_sampler),
                },
            ],
            GridBacking::LinearBuffer { buffer } => vec![wgpu::BindGroupEntry {
                binding: 5,
                resource: buffer.as_entire_binding(),
            }],
        }
    }

    /// Reset the phase at the top of a frame: the grid is write-only until
    /// voxelization completes.
    pub fn begin_frame(&self) {
        self.phase.set(GridPhase::Writable);
    }

    /// Voxelization recorded; the grid is now read-only for this frame.
    pub fn mark_written(&self) {
        debug_assert_eq!(self.phase.get(), GridPhase::Writable);
        self.phase.set(GridPhase::Readable);
    }

    #[inline]
    pub fn phase(&self) -> GridPhase {
        self.phase.get()
    }
}
