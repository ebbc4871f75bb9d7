//! Final composite and the degraded pass-through blit.

/// Blend the reflection buffer over the source into the destination.
pub fn record_composite(
    encoder: &mut wgpu::CommandEncoder,
    destination: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    super::record_fullscreen_effect(encoder, destination, pipeline, bind_group, "Composite Pass");
}

/// Copy the source frame through unmodified.
pub fn record_passthrough(
    encoder: &mut wgpu::CommandEncoder,
    destination: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    super::record_fullscreen_effect(encoder, destination, pipeline, bind_group, "Passthrough Pass");
}
