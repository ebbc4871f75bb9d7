//! Render target creation for the reflection pipeline: the D x D capture
//! pair and the downsampled reflection/blur targets.

/// HDR color format used throughout the pipeline.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// A single-attachment color target.
pub struct RenderTarget {
    pub color_texture: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

/// Create an HDR render target.
pub fn create_hdr_target(device: &wgpu::Device, width: u32, height: u32, label: &str) -> RenderTarget {
    create_render_target(device, width, height, label, HDR_FORMAT)
}

/// Create a render target with a specific format.
pub fn create_render_target(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    label: &str,
    format: wgpu::TextureFormat,
) -> RenderTarget {
    let color_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let color_view = color_texture.create_view(&wgpu::TextureViewDescriptor::default());

    RenderTarget {
        color_texture,
        color_view,
        width,
        height,
    }
}

/// Capture pair: lighting copy + reconstructed world positions, both D x D.
pub struct CaptureTargets {
    pub lighting: RenderTarget,
    pub position: RenderTarget,
}

pub fn create_capture_targets(device: &wgpu::Device, dimension: u32) -> CaptureTargets {
    CaptureTargets {
        lighting: create_hdr_target(device, dimension, dimension, "Lighting Capture"),
        position: create_render_target(
            device,
            dimension,
            dimension,
            "Position Capture",
            wgpu::TextureFormat::Rgba32Float,
        ),
    }
}
