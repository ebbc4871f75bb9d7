//! Separable blur pass — one direction per call, ping-ponging targets.

use crate::render_targets::RenderTarget;

pub fn record_blur_pass(
    encoder: &mut wgpu::CommandEncoder,
    target: &RenderTarget,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
    label: &str,
) {
    super::record_fullscreen_effect(encoder, &target.color_view, pipeline, bind_group, label);
}
