//! Reflection ray-march pass into the downsampled reflection target.

use crate::render_targets::RenderTarget;

pub fn record_reflection(
    encoder: &mut wgpu::CommandEncoder,
    target: &RenderTarget,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    super::record_fullscreen_effect(encoder, &target.color_view, pipeline, bind_group, "Reflect Pass");
}

/// Grid debug view straight to the destination, bypassing blur and blend.
pub fn record_debug_view(
    encoder: &mut wgpu::CommandEncoder,
    destination: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    super::record_fullscreen_effect(encoder, destination, pipeline, bind_group, "Debug View Pass");
}
