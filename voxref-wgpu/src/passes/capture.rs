//! Scene capture — lighting resample + world-position reconstruction, both
//! into the D x D capture targets.

use crate::render_targets::RenderTarget;

/// Resample the source color into the lighting capture.
pub fn record_lighting_capture(
    encoder: &mut wgpu::CommandEncoder,
    target: &RenderTarget,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    super::record_fullscreen_effect(encoder, &target.color_view, pipeline, bind_group, "Lighting Capture");
}

/// Reconstruct per-pixel world positions from the scene depth buffer.
pub fn record_position_capture(
    encoder: &mut wgpu::CommandEncoder,
    target: &RenderTarget,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    super::record_fullscreen_effect(encoder, &target.color_view, pipeline, bind_group, "Position Capture");
}
