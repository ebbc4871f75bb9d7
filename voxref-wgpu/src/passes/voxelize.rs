//! Voxelization — compute dispatch scattering capture texels into the grid.

/// Workgroup side length of the voxelize entry points.
const WORKGROUP: u32 = 8;
/// Workgroup side length of the clear entry point (cubic).
const CLEAR_WORKGROUP: u32 = 4;

/// Zero the grid texture via the clear kernel.
pub fn record_grid_clear(
    encoder: &mut wgpu::CommandEncoder,
    pipeline: &wgpu::ComputePipeline,
    bind_group: &wgpu::BindGroup,
    dimension: u32,
) {
    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
        label: Some("Grid Clear Pass"),
        timestamp_writes: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    let groups = dimension.div_ceil(CLEAR_WORKGROUP);
    pass.dispatch_workgroups(groups, groups, groups);
}

/// Dispatch the D x D voxelization grid (third dimension is always 1; depth
/// comes from the position capture).
pub fn record_voxelize(
    encoder: &mut wgpu::CommandEncoder,
    pipeline: &wgpu::ComputePipeline,
    bind_group: &wgpu::BindGroup,
    dimension: u32,
) {
    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
        label: Some("Voxelize Pass"),
        timestamp_writes: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    let groups = dimension.div_ceil(WORKGROUP);
    pass.dispatch_workgroups(groups, groups, 1);
}
