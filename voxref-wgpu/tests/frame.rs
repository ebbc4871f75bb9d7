//! Headless end-to-end checks for the reflection pipeline. Every test skips
//! with a message when the machine has no usable GPU adapter.

use glam::Mat4;
use voxref_wgpu::grid_store::{GridPhase, VoxelGridStore};
use voxref_wgpu::pool::TargetPool;
use voxref_wgpu::{
    CameraMatrices, FrameInput, GpuContext, GridStorage, ReflectionConfig, VoxelReflections,
};

const SIZE: u32 = 64;
const SOURCE_COLOR: [f64; 4] = [0.2, 0.4, 0.6, 1.0];

fn context() -> Option<GpuContext> {
    let _ = env_logger::builder().is_test(true).try_init();
    match GpuContext::headless() {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            eprintln!("skipping GPU test: {e}");
            None
        }
    }
}

struct Scene {
    source_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    destination: wgpu::Texture,
    destination_view: wgpu::TextureView,
}

fn create_scene(device: &wgpu::Device) -> Scene {
    let size = wgpu::Extent3d {
        width: SIZE,
        height: SIZE,
        depth_or_array_layers: 1,
    };
    let source = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Test Source"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba16Float,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let depth = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Test Depth"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Depth32Float,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let destination = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Test Destination"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba32Float,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let source_view = source.create_view(&wgpu::TextureViewDescriptor::default());
    let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
    let destination_view = destination.create_view(&wgpu::TextureViewDescriptor::default());
    Scene {
        source_view,
        depth_view,
        destination,
        destination_view,
    }
}

/// Clear the source to a known color and the depth buffer to `depth_value`.
fn clear_scene(device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene, depth_value: f32) {
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Scene Clear Encoder"),
    });
    {
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Source Clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &scene.source_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: SOURCE_COLOR[0],
                        g: SOURCE_COLOR[1],
                        b: SOURCE_COLOR[2],
                        a: SOURCE_COLOR[3],
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            ..Default::default()
        });
    }
    {
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Depth Clear"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &scene.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(depth_value),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });
    }
    queue.submit(std::iter::once(encoder.finish()));
}

fn camera() -> CameraMatrices {
    CameraMatrices::new(
        Mat4::IDENTITY,
        Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0),
    )
}

/// Read the destination texture back as RGBA f32 pixels.
fn read_destination(device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene) -> Vec<[f32; 4]> {
    let bytes_per_row = SIZE * 16;
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Destination Staging"),
        size: (bytes_per_row * SIZE) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture: &scene.destination,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &staging,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(SIZE),
            },
        },
        wgpu::Extent3d {
            width: SIZE,
            height: SIZE,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    slice.map_async(wgpu::MapMode::Read, |_| {});
    let _ = device.poll(wgpu::Maintain::Wait);
    let data = slice.get_mapped_range();
    let floats: &[f32] = bytemuck::cast_slice(&data);
    floats.chunks_exact(4).map(|c| [c[0], c[1], c[2], c[3]]).collect()
}

fn render_one_frame(storage: GridStorage, debug_mode: bool, depth_value: f32) -> Option<Vec<[f32; 4]>> {
    let ctx = context()?;
    let scene = create_scene(&ctx.device);
    clear_scene(&ctx.device, &ctx.queue, &scene, depth_value);

    let config = ReflectionConfig {
        resolution: (SIZE, SIZE),
        voxel_dimension: 16,
        downsample: 2,
        debug_mode,
        storage,
        ..Default::default()
    };
    let mut effect = VoxelReflections::new(&ctx.device, config, wgpu::TextureFormat::Rgba32Float)
        .expect("effect creation");
    effect
        .render(
            &ctx.device,
            &ctx.queue,
            &FrameInput {
                source: &scene.source_view,
                depth: &scene.depth_view,
                destination: &scene.destination_view,
                camera: camera(),
            },
        )
        .expect("frame render");

    Some(read_destination(&ctx.device, &ctx.queue, &scene))
}

fn assert_close(pixel: [f32; 4], expected: [f32; 4], tolerance: f32) {
    for (got, want) in pixel.iter().zip(expected.iter()) {
        assert!(
            (got - want).abs() < tolerance,
            "pixel {pixel:?} differs from {expected:?}"
        );
    }
}

#[test]
fn empty_scene_passes_source_through_texture_grid() {
    let Some(pixels) = render_one_frame(GridStorage::Texture3d, false, 1.0) else {
        return;
    };
    // No depth -> empty grid -> every march misses -> composite keeps the
    // source color (modulo f16 quantization of the capture chain).
    let expected = [0.2, 0.4, 0.6, 1.0];
    for pixel in pixels {
        assert_close(pixel, expected, 0.01);
    }
}

#[test]
fn empty_scene_passes_source_through_buffer_grid() {
    let Some(pixels) = render_one_frame(GridStorage::LinearBuffer, false, 1.0) else {
        return;
    };
    let expected = [0.2, 0.4, 0.6, 1.0];
    for pixel in pixels {
        assert_close(pixel, expected, 0.01);
    }
}

#[test]
fn debug_mode_bypasses_blur_and_blend() {
    let Some(pixels) = render_one_frame(GridStorage::Texture3d, true, 1.0) else {
        return;
    };
    // The debug view paints background pixels opaque black instead of the
    // blended source, proving the composite path was skipped.
    for pixel in pixels {
        assert_close(pixel, [0.0, 0.0, 0.0, 1.0], 1e-6);
    }
}

#[test]
fn voxelization_populates_the_linear_grid() {
    let Some(ctx) = context() else {
        return;
    };
    let scene = create_scene(&ctx.device);
    // Depth 0.5 everywhere: every capture texel reconstructs a valid world
    // position a couple of units in front of the camera.
    clear_scene(&ctx.device, &ctx.queue, &scene, 0.5);

    let dimension = 16u32;
    let config = ReflectionConfig {
        resolution: (SIZE, SIZE),
        voxel_dimension: dimension,
        storage: GridStorage::LinearBuffer,
        ..Default::default()
    };
    let mut effect = VoxelReflections::new(&ctx.device, config, wgpu::TextureFormat::Rgba32Float)
        .expect("effect creation");
    effect
        .render(
            &ctx.device,
            &ctx.queue,
            &FrameInput {
                source: &scene.source_view,
                depth: &scene.depth_view,
                destination: &scene.destination_view,
                camera: camera(),
            },
        )
        .expect("frame render");
    // After a frame the grid sits on the read side of the handoff.
    assert_eq!(effect.grid().phase(), GridPhase::Readable);

    // Read the grid buffer back through the store's COPY_SRC usage.
    let cells = (dimension as u64).pow(3) * 16;
    let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Grid Staging"),
        size: cells,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Grid Readback Encoder"),
        });
    encoder.copy_buffer_to_buffer(
        effect.grid().buffer().expect("linear grid buffer"),
        0,
        &staging,
        0,
        cells,
    );
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    slice.map_async(wgpu::MapMode::Read, |_| {});
    let _ = ctx.device.poll(wgpu::Maintain::Wait);
    let data = slice.get_mapped_range();
    let floats: &[f32] = bytemuck::cast_slice(&data);

    let occupied: Vec<&[f32]> = floats.chunks_exact(4).filter(|c| c[3] > 0.5).collect();
    assert!(!occupied.is_empty(), "voxelization wrote no cells");
    for cell in occupied {
        // Occupied cells carry the captured lighting color.
        assert!((cell[0] - 0.2).abs() < 0.01, "cell {cell:?}");
        assert!((cell[1] - 0.4).abs() < 0.01, "cell {cell:?}");
        assert!((cell[2] - 0.6).abs() < 0.01, "cell {cell:?}");
    }
}

#[test]
fn march_hits_reflect_the_captured_color_without_blur() {
    let Some(ctx) = context() else {
        return;
    };
    let scene = create_scene(&ctx.device);
    // A flat depth plane in front of the camera: every pixel voxelizes its
    // own surface cell, and the reflected ray's first sample lands back in
    // an occupied cell, so the reflection carries the captured color.
    clear_scene(&ctx.device, &ctx.queue, &scene, 0.5);

    let config = ReflectionConfig {
        resolution: (SIZE, SIZE),
        voxel_dimension: 16,
        downsample: 1,
        blur_iterations: 0,
        storage: GridStorage::LinearBuffer,
        ..Default::default()
    };
    let mut effect = VoxelReflections::new(&ctx.device, config, wgpu::TextureFormat::Rgba32Float)
        .expect("effect creation");
    effect
        .render(
            &ctx.device,
            &ctx.queue,
            &FrameInput {
                source: &scene.source_view,
                depth: &scene.depth_view,
                destination: &scene.destination_view,
                camera: camera(),
            },
        )
        .expect("frame render");

    // With zero blur passes the composite reads the raw march output, which
    // is the captured surface color at full opacity.
    let expected = [0.2, 0.4, 0.6, 1.0];
    for pixel in read_destination(&ctx.device, &ctx.queue, &scene) {
        assert_close(pixel, expected, 0.01);
    }
}

#[test]
fn pool_returns_and_reuses_targets() {
    let Some(ctx) = context() else {
        return;
    };
    let pool = TargetPool::new();
    {
        let _a = pool.lease(&ctx.device, 8, 8, "A");
        let _b = pool.lease(&ctx.device, 8, 8, "B");
        assert_eq!(pool.idle_count(), 0);
    }
    assert_eq!(pool.idle_count(), 2);
    {
        let _c = pool.lease(&ctx.device, 8, 8, "C");
        // Matching size reuses a parked target instead of allocating.
        assert_eq!(pool.idle_count(), 1);
    }
    {
        let _d = pool.lease(&ctx.device, 4, 4, "D");
        // Size mismatch allocates fresh and leaves the parked pair alone.
        assert_eq!(pool.idle_count(), 2);
    }
    assert_eq!(pool.idle_count(), 3);
    pool.purge();
    assert_eq!(pool.idle_count(), 0);
}

#[test]
fn grid_store_exposes_only_its_chosen_backing() {
    let Some(ctx) = context() else {
        return;
    };
    let tex = VoxelGridStore::new(&ctx.device, 8, GridStorage::Texture3d).expect("texture grid");
    assert_eq!(tex.storage(), GridStorage::Texture3d);
    assert!(tex.texture_view().is_some());
    assert!(tex.buffer().is_none());
    assert_eq!(tex.phase(), GridPhase::Writable);

    let buf = VoxelGridStore::new(&ctx.device, 8, GridStorage::LinearBuffer).expect("buffer grid");
    assert_eq!(buf.storage(), GridStorage::LinearBuffer);
    assert!(buf.buffer().is_some());
    assert!(buf.texture_view().is_none());
}

#[test]
fn oversized_grids_are_rejected_before_allocation() {
    let Some(ctx) = context() else {
        return;
    };
    let err = VoxelGridStore::new(&ctx.device, 1 << 20, GridStorage::Texture3d).unwrap_err();
    assert!(err.contains("exceeds"), "{err}");
    let err = VoxelGridStore::new(&ctx.device, 4096, GridStorage::LinearBuffer).unwrap_err();
    assert!(err.contains("exceeds"), "{err}");
}

#[test]
fn degenerate_camera_falls_back_to_passthrough() {
    let Some(ctx) = context() else {
        return;
    };
    let scene = create_scene(&ctx.device);
    clear_scene(&ctx.device, &ctx.queue, &scene, 0.5);

    let config = ReflectionConfig {
        resolution: (SIZE, SIZE),
        voxel_dimension: 8,
        ..Default::default()
    };
    let mut effect = VoxelReflections::new(&ctx.device, config, wgpu::TextureFormat::Rgba32Float)
        .expect("effect creation");
    // A singular projection has no finite inverse.
    let camera = CameraMatrices::new(Mat4::IDENTITY, Mat4::ZERO);
    assert!(!camera.is_finite());
    effect
        .render(
            &ctx.device,
            &ctx.queue,
            &FrameInput {
                source: &scene.source_view,
                depth: &scene.depth_view,
                destination: &scene.destination_view,
                camera,
            },
        )
        .expect("frame render");

    let expected = [0.2, 0.4, 0.6, 1.0];
    for pixel in read_destination(&ctx.device, &ctx.queue, &scene) {
        assert_close(pixel, expected, 0.01);
    }
}
