use bytemuck::{Pod, Zeroable};

/// World-position reconstruction parameters — `world_position.wgsl`, group 0 binding 0.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct CaptureParams {
    pub inv_view: [[f32; 4]; 4],
    pub inv_projection: [[f32; 4]; 4],
}

/// Voxelization parameters — `voxelize.wgsl`, group 0 binding 0.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct VoxelizeParams {
    pub dimension: u32,
    pub boundary: f32,
    pub _pad0: f32,
    pub _pad1: f32,
}

/// Ray-march parameters — shared by `reflect.wgsl` and `debug_view.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ReflectParams {
    pub inv_view: [[f32; 4]; 4],
    pub inv_projection: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub dimension: u32,
    pub max_iterations: u32,
    pub boundary: f32,
    pub ray_step: f32,
    pub ray_offset: f32,
    pub hit_threshold: f32,
    pub _pad0: f32,
    pub _pad1: f32,
}

/// Separable blur parameters — `blur.wgsl`. `horizontal` selects the axis.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct BlurParams {
    pub blur_step: f32,
    pub horizontal: u32,
    pub _pad0: f32,
    pub _pad1: f32,
}

/// Final blend parameters — `composite.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct CompositeParams {
    pub intensity: f32,
    pub _pad0: f32,
    pub _pad1: f32,
    pub _pad2: f32,
}
