//! Effect configuration. Loaded once by the host; every field is validated
//! before any GPU allocation happens.

/// Which representation backs the voxel grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridStorage {
    /// Native 3D texture, trilinear-sampled on read.
    Texture3d,
    /// Flat storage buffer of `D³` cells, nearest-fetched on read.
    LinearBuffer,
}

/// Tuning surface for the reflection pipeline.
#[derive(Clone, Debug)]
pub struct ReflectionConfig {
    /// Output resolution in pixels.
    pub resolution: (u32, u32),
    /// World-space half-extent of the voxelized cube.
    pub world_volume_boundary: f32,
    /// Grid side length D (the grid holds D³ cells).
    pub voxel_dimension: u32,
    /// Resolution divisor for the reflection/blur buffers.
    pub downsample: u32,
    /// Ray origin offset along the reflected direction (self-intersection guard).
    pub ray_offset: f32,
    /// March step length in world units.
    pub ray_step: f32,
    /// March step cap.
    pub max_iterations: u32,
    /// Number of horizontal+vertical blur pairs.
    pub blur_iterations: u32,
    /// Blur tap offset in texels.
    pub blur_step: f32,
    /// Occupancy value above which a march sample counts as a hit.
    pub hit_threshold: f32,
    /// Reflection blend weight in the composite.
    pub intensity: f32,
    /// Visualize the voxelized grid instead of compositing reflections.
    pub debug_mode: bool,
    pub storage: GridStorage,
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            resolution: (1280, 720),
            world_volume_boundary: 10.0,
            voxel_dimension: 128,
            downsample: 2,
            ray_offset: 0.1,
            ray_step: 0.1,
            max_iterations: 100,
            blur_iterations: 2,
            blur_step: 1.0,
            hit_threshold: 0.5,
            intensity: 1.0,
            debug_mode: false,
            storage: GridStorage::Texture3d,
        }
    }
}

impl ReflectionConfig {
    /// Reject invalid configurations before any buffer is allocated.
    pub fn validate(&self) -> Result<(), String> {
        let (w, h) = self.resolution;
        if w == 0 || h == 0 {
            return Err(format!("resolution must be non-zero, got {w}x{h}"));
        }
        if self.voxel_dimension == 0 {
            return Err("voxel_dimension must be at least 1".into());
        }
        if !(self.world_volume_boundary > 0.0) {
            return Err(format!(
                "world_volume_boundary must be positive, got {}",
                self.world_volume_boundary
            ));
        }
        if self.downsample == 0 {
            return Err("downsample must be at least 1".into());
        }
        if w / self.downsample == 0 || h / self.downsample == 0 {
            return Err(format!(
                "downsample {} reduces {w}x{h} to a zero-sized buffer",
                self.downsample
            ));
        }
        if self.max_iterations == 0 {
            return Err("max_iterations must be at least 1".into());
        }
        if !(self.ray_step > 0.0) {
            return Err(format!("ray_step must be positive, got {}", self.ray_step));
        }
        if self.ray_offset < 0.0 {
            return Err(format!("ray_offset must not be negative, got {}", self.ray_offset));
        }
        Ok(())
    }

    /// Size of the reflection and blur buffers.
    pub(crate) fn reflection_extent(&self) -> (u32, u32) {
        (self.resolution.0 / self.downsample, self.resolution.1 / self.downsample)
    }
}
