//! Voxel grid data model shared by the GPU kernels and the host.
//!
//! The GPU owns the grid contents at runtime; this module carries the cell
//! layout, the world-to-cell mapping both voxelize kernels implement, and a
//! software `VoxelGrid` that mirrors the kernel semantics (deposit, clear,
//! ray-march stepping) so the numeric contracts stay testable off-device.

use bytemuck::{Pod, Zeroable};
use glam::{UVec3, Vec3};

/// One grid cell: RGB = captured lighting color, A = occupancy.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Voxel {
    pub data: [f32; 4],
}

impl Voxel {
    /// Empty cell, also the "no reflection" miss sentinel (transparent black).
    pub const ZERO: Voxel = Voxel { data: [0.0; 4] };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { data: [r, g, b, a] }
    }
}

/// World-space cube to cubic grid mapping.
///
/// The grid spans `[-boundary, boundary]` on every axis with `dimension`
/// cells per axis. Cell coordinates come from linear scaling, clamped to
/// `[0, dimension - 1]`, so any query position yields a valid cell.
#[derive(Clone, Copy, Debug)]
pub struct GridMapping {
    pub dimension: u32,
    pub boundary: f32,
}

impl GridMapping {
    pub fn new(dimension: u32, boundary: f32) -> Self {
        debug_assert!(dimension > 0 && boundary > 0.0);
        Self { dimension, boundary }
    }

    /// Whether `p` lies within the mapped world volume.
    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.x.abs() <= self.boundary && p.y.abs() <= self.boundary && p.z.abs() <= self.boundary
    }

    /// Cell coordinate for a world position, clamped per axis.
    #[inline]
    pub fn cell_of(&self, p: Vec3) -> UVec3 {
        let scale = self.dimension as f32 / (2.0 * self.boundary);
        let hi = self.dimension - 1;
        let axis = |v: f32| (((v + self.boundary) * scale).floor().max(0.0) as u32).min(hi);
        UVec3::new(axis(p.x), axis(p.y), axis(p.z))
    }

    /// Flat index for a cell: `x + y*D + z*D*D`.
    #[inline]
    pub fn linear_index(&self, cell: UVec3) -> usize {
        let d = self.dimension as usize;
        cell.x as usize + cell.y as usize * d + cell.z as usize * d * d
    }

    /// World-space center of a cell.
    #[inline]
    pub fn cell_center(&self, cell: UVec3) -> Vec3 {
        let size = 2.0 * self.boundary / self.dimension as f32;
        Vec3::new(
            -self.boundary + (cell.x as f32 + 0.5) * size,
            -self.boundary + (cell.y as f32 + 0.5) * size,
            -self.boundary + (cell.z as f32 + 0.5) * size,
        )
    }

    /// Total cell count (`dimension` cubed).
    #[inline]
    pub fn cell_count(&self) -> usize {
        let d = self.dimension as usize;
        d * d * d
    }
}

/// Ray-march tuning, matching `ReflectParams` on the GPU side.
#[derive(Clone, Copy, Debug)]
pub struct MarchSettings {
    pub ray_offset: f32,
    pub ray_step: f32,
    pub max_iterations: u32,
    pub hit_threshold: f32,
}

impl Default for MarchSettings {
    fn default() -> Self {
        Self {
            ray_offset: 0.1,
            ray_step: 0.1,
            max_iterations: 100,
            hit_threshold: 0.5,
        }
    }
}

/// Software voxel grid mirroring the GPU linear-buffer representation.
///
/// Out-of-range cell coordinates are a programming error and panic via the
/// slice index, matching the kernels' unchecked-store contract (callers clamp
/// through [`GridMapping::cell_of`] first).
pub struct VoxelGrid {
    mapping: GridMapping,
    cells: Vec<Voxel>,
}

impl VoxelGrid {
    /// Allocate a zeroed grid.
    pub fn new(mapping: GridMapping) -> Self {
        Self {
            mapping,
            cells: vec![Voxel::ZERO; mapping.cell_count()],
        }
    }

    #[inline]
    pub fn mapping(&self) -> GridMapping {
        self.mapping
    }

    /// Reset every cell to the zero vector.
    pub fn clear(&mut self) {
        self.cells.fill(Voxel::ZERO);
    }

    #[inline]
    pub fn read(&self, x: u32, y: u32, z: u32) -> Voxel {
        self.cells[self.mapping.linear_index(UVec3::new(x, y, z))]
    }

    #[inline]
    pub fn write(&mut self, x: u32, y: u32, z: u32, voxel: Voxel) {
        let idx = self.mapping.linear_index(UVec3::new(x, y, z));
        self.cells[idx] = voxel;
    }

    /// Project one capture sample into the grid, as the voxelize kernels do.
    ///
    /// Positions outside the volume are skipped so a clamped store can never
    /// corrupt a boundary cell. Returns whether a cell was written.
    pub fn deposit(&mut self, world: Vec3, color: [f32; 3]) -> bool {
        if !self.mapping.contains(world) {
            return false;
        }
        let cell = self.mapping.cell_of(world);
        self.write(cell.x, cell.y, cell.z, Voxel::new(color[0], color[1], color[2], 1.0));
        true
    }

    /// Cells with occupancy above zero.
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|v| v.data[3] > 0.0).count()
    }

    /// Step along a ray through the grid, returning the first cell whose
    /// occupancy exceeds the hit threshold, or [`Voxel::ZERO`] on miss.
    ///
    /// Mirrors the fragment kernels: the query position is clamped into the
    /// volume every step, and the loop never exceeds `max_iterations`.
    pub fn march(&self, origin: Vec3, direction: Vec3, settings: &MarchSettings) -> Voxel {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return Voxel::ZERO;
        }
        let mut pos = origin + dir * settings.ray_offset;
        for _ in 0..settings.max_iterations {
            let cell = self.mapping.cell_of(pos);
            let voxel = self.read(cell.x, cell.y, cell.z);
            if voxel.data[3] > settings.hit_threshold {
                return voxel;
            }
            pos += dir * settings.ray_step;
        }
        Voxel::ZERO
    }
}
