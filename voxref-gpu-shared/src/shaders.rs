/// Embedded WGSL kernel sources for the voxel reflection pipeline.
/// Shared so every backend compiles the exact same kernels.

pub const FULLSCREEN_QUAD_VERT: &str = include_str!("../shaders/fullscreen_quad.wgsl");
pub const BLIT_FRAG: &str = include_str!("../shaders/blit.wgsl");
pub const WORLD_POSITION_FRAG: &str = include_str!("../shaders/world_position.wgsl");
pub const VOXELIZE_COMPUTE: &str = include_str!("../shaders/voxelize.wgsl");
pub const REFLECT_FRAG: &str = include_str!("../shaders/reflect.wgsl");
pub const DEBUG_VIEW_FRAG: &str = include_str!("../shaders/debug_view.wgsl");
pub const BLUR_FRAG: &str = include_str!("../shaders/blur.wgsl");
pub const COMPOSITE_FRAG: &str = include_str!("../shaders/composite.wgsl");
