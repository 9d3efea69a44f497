use std::sync::Arc;

use anyhow::{Context, Result};
use glam::{DMat4, DVec3};

use drape_engine::clamping::{ClampingOptions, ClampingTechnique, DrapeParams};
use drape_engine::device::{Gpu, GpuInit};
use drape_engine::logging::{init_logging, LoggingConfig};
use drape_engine::math::{BoundingSphere, CullSettings};
use drape_engine::render::{RenderCtx, RenderTarget};
use drape_engine::scene::{Mesh, OverlayVertex, PositionVertex, ViewId};

const FRAME_SIZE: u32 = 512;
const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const DEFAULT_FRAMES: u32 = 8;

const GRID_CELLS: u32 = 64;
const GRID_SPACING: f32 = 20.0;

struct Settings {
    texture_size: Option<u32>,
    frames: u32,
    dump_shader: Option<String>,
}

impl Settings {
    fn from_env() -> Result<Self> {
        let texture_size = match std::env::var("DRAPE_TEXTURE_SIZE") {
            Ok(v) => Some(v.parse().with_context(|| format!("DRAPE_TEXTURE_SIZE={v:?}"))?),
            Err(_) => None,
        };
        let frames = match std::env::var("DRAPE_FRAMES") {
            Ok(v) => v.parse().with_context(|| format!("DRAPE_FRAMES={v:?}"))?,
            Err(_) => DEFAULT_FRAMES,
        };

        let mut dump_shader = None;
        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--dump-shader" => {
                    dump_shader = Some(args.next().context("--dump-shader needs a path")?);
                }
                other => anyhow::bail!("unknown argument {other:?}"),
            }
        }

        Ok(Self {
            texture_size,
            frames,
            dump_shader,
        })
    }
}

fn terrain_height(x: f32, z: f32) -> f32 {
    40.0 * (x / 150.0).sin() * (z / 170.0).cos() + 15.0 * (x / 45.0 + z / 60.0).sin()
}

/// Regular height-field grid centred on the origin.
fn terrain_grid() -> (Vec<PositionVertex>, Vec<u32>) {
    let n = GRID_CELLS + 1;
    let half = GRID_CELLS as f32 * GRID_SPACING * 0.5;

    let mut vertices = Vec::with_capacity((n * n) as usize);
    for j in 0..n {
        for i in 0..n {
            let x = i as f32 * GRID_SPACING - half;
            let z = j as f32 * GRID_SPACING - half;
            vertices.push(PositionVertex {
                position: [x, terrain_height(x, z), z],
            });
        }
    }

    let mut indices = Vec::with_capacity((GRID_CELLS * GRID_CELLS * 6) as usize);
    for j in 0..GRID_CELLS {
        for i in 0..GRID_CELLS {
            let a = j * n + i;
            let b = a + 1;
            let c = a + n;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }
    (vertices, indices)
}

/// Flat ribbon meandering across the terrain, well above it.
fn overlay_ribbon() -> (Vec<OverlayVertex>, Vec<u32>) {
    const SEGMENTS: u32 = 48;
    const HALF_WIDTH: f32 = 8.0;
    const ALTITUDE: f32 = 300.0;
    let color = [0.9, 0.2, 0.1, 0.8];

    let half = GRID_CELLS as f32 * GRID_SPACING * 0.4;
    let mut vertices = Vec::with_capacity(((SEGMENTS + 1) * 2) as usize);
    for s in 0..=SEGMENTS {
        let t = s as f32 / SEGMENTS as f32;
        let x = -half + t * 2.0 * half;
        let z = 120.0 * (t * std::f32::consts::TAU).sin();
        vertices.push(OverlayVertex {
            position: [x, ALTITUDE, z - HALF_WIDTH],
            color,
        });
        vertices.push(OverlayVertex {
            position: [x, ALTITUDE, z + HALF_WIDTH],
            color,
        });
    }

    let mut indices = Vec::with_capacity((SEGMENTS * 6) as usize);
    for s in 0..SEGMENTS {
        let a = s * 2;
        indices.extend_from_slice(&[a, a + 1, a + 2, a + 2, a + 1, a + 3]);
    }
    (vertices, indices)
}

/// Orthographic camera looking straight down on `bounds`.
fn draping_camera(bounds: &BoundingSphere) -> (DMat4, DMat4) {
    let r = bounds.radius;
    let eye = bounds.center + DVec3::Y * (r * 2.0);
    let view = DMat4::look_at_rh(eye, bounds.center, DVec3::NEG_Z);
    let projection = DMat4::orthographic_rh(-r, r, -r, r, 1.0, r * 4.0);
    (view, projection)
}

fn orbit_camera(bounds: &BoundingSphere, frame: u32) -> (DMat4, DMat4) {
    let angle = frame as f64 * 0.25;
    let distance = bounds.radius * 1.5;
    let eye = bounds.center
        + DVec3::new(angle.cos() * distance, bounds.radius * 0.6, angle.sin() * distance);
    let view = DMat4::look_at_rh(eye, bounds.center, DVec3::Y);
    let projection = DMat4::perspective_rh(60f64.to_radians(), 1.0, 1.0, distance * 4.0);
    (view, projection)
}

fn render_target(device: &wgpu::Device, label: &str, format: wgpu::TextureFormat) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: FRAME_SIZE,
            height: FRAME_SIZE,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    })
}

fn clear_pass(encoder: &mut wgpu::CommandEncoder, color: &wgpu::TextureView, depth: &wgpu::TextureView) {
    let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("drape-studio clear"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color,
            resolve_target: None,
            depth_slice: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color {
                    r: 0.05,
                    g: 0.07,
                    b: 0.10,
                    a: 1.0,
                }),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: depth,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
}

fn run(settings: Settings) -> Result<()> {
    let gpu = pollster::block_on(Gpu::new(GpuInit::default()))?;

    let mut options = ClampingOptions::default();
    if let Some(size) = settings.texture_size {
        options = options.with_texture_size(size);
    }
    let mut technique = ClampingTechnique::new(gpu.caps(), options);

    if let Some(path) = &settings.dump_shader {
        let source = technique.shader().program().compose();
        std::fs::write(path, source).with_context(|| format!("writing shader to {path}"))?;
        log::info!("overlay shader written to {path}");
    }

    let (terrain_vertices, terrain_indices) = terrain_grid();
    let terrain = Arc::new(Mesh::new(gpu.device(), "terrain", &terrain_vertices, &terrain_indices));
    let bounds = terrain.bounds().context("terrain has no vertices")?;
    technique.on_install(terrain);

    let (ribbon_vertices, ribbon_indices) = overlay_ribbon();
    let ribbon = Mesh::new(gpu.device(), "ribbon", &ribbon_vertices, &ribbon_indices);

    let color = render_target(gpu.device(), "drape-studio color", COLOR_FORMAT);
    let depth = render_target(gpu.device(), "drape-studio depth", DEPTH_FORMAT);
    let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
    let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

    let view = ViewId(0);
    let (depth_camera_view, depth_camera_projection) = draping_camera(&bounds);
    let ctx = RenderCtx::new(gpu.device(), gpu.queue(), gpu.caps());

    for frame in 0..settings.frames {
        let (main_view, main_projection) = orbit_camera(&bounds, frame);
        let params = DrapeParams {
            view,
            depth_view: depth_camera_view,
            depth_projection: depth_camera_projection,
            main_view,
            main_projection,
            overlay: &ribbon,
            cull: CullSettings::default(),
        };

        let mut encoder = gpu.create_encoder("drape-studio frame");
        clear_pass(&mut encoder, &color_view, &depth_view);
        {
            let mut target = RenderTarget::new(&mut encoder, &color_view, COLOR_FORMAT)
                .with_depth(&depth_view, DEPTH_FORMAT);
            technique.pre_cull_terrain(&ctx, &params);
            technique.cull_overlay_group(&ctx, &mut target, &params);
        }
        gpu.submit(encoder);

        if let Some(transforms) = technique.depth_transforms(view) {
            log::debug!(
                "frame {frame}: eye->depth clip {:?}",
                transforms.eye_to_depth_clip.to_cols_array()
            );
        }
    }

    if let Some(captured) = technique.captured_projection(view) {
        log::info!(
            "{} frame(s) draped; captured depth projection {:?}",
            settings.frames,
            captured.to_cols_array()
        );
    }

    technique.on_uninstall();
    technique.release_view(view);
    Ok(())
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());
    let settings = Settings::from_env()?;
    run(settings)
}
