//! Shared GPU contracts for the voxref reflection pipeline.
//!
//! Everything here is platform-independent: the embedded WGSL kernel sources,
//! the `#[repr(C)]` uniform blocks they bind, and the voxel grid data model
//! with its software reference implementation.

pub mod grid;
pub mod shaders;
pub mod uniforms;
