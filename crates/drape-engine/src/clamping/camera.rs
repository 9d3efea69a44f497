use std::rc::Rc;
use std::sync::Arc;

use glam::DMat4;

use crate::math::{compute_near_far, ComputeNearFar, CullSettings};
use crate::render::{to_gpu_matrix, GpuMatrix, MatrixUniform};
use crate::scene::{PositionVertex, TerrainSource, Vertex};

use super::depth_texture::{DepthTexture, CLEAR_DEPTH, DEPTH_FORMAT};
use super::interceptor::ClampProjectionCallback;

const DEPTH_PASS_WGSL: &str = include_str!("shaders/depth_pass.wgsl");

/// Fixed rasterizer state of the depth capture.
///
/// Always filled: host wireframe settings never reach the capture.
pub fn depth_pass_primitive() -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode: None,
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

/// Depth-only camera rendering terrain into a [`DepthTexture`].
///
/// The pass has no color targets and no fragment stage, so lighting and
/// blending cannot affect it. It is recorded before the overlay pass of the
/// same frame.
pub struct OffscreenCamera {
    view_matrix: DMat4,
    projection_matrix: DMat4,
    viewport: u32,
    near_far_mode: ComputeNearFar,
    clamp_callback: Option<Rc<dyn ClampProjectionCallback>>,
    child: Option<Arc<dyn TerrainSource>>,

    depth_view: wgpu::TextureView,
    pipeline: wgpu::RenderPipeline,
    view_proj_ubo: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl OffscreenCamera {
    pub fn new(device: &wgpu::Device, target: &DepthTexture) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("drape depth pass shader"),
            source: wgpu::ShaderSource::Wgsl(DEPTH_PASS_WGSL.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("drape depth pass bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: Some(MatrixUniform::min_binding_size()),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("drape depth pass pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("drape depth pass pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[PositionVertex::layout()],
            },
            fragment: None,
            primitive: depth_pass_primitive(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let view_proj_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("drape depth pass view-proj ubo"),
            size: std::mem::size_of::<GpuMatrix>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("drape depth pass bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: view_proj_ubo.as_entire_binding(),
            }],
        });

        Self {
            view_matrix: DMat4::IDENTITY,
            projection_matrix: DMat4::IDENTITY,
            viewport: target.size,
            near_far_mode: ComputeNearFar::Off,
            clamp_callback: None,
            child: None,
            depth_view: target.view.clone(),
            pipeline,
            view_proj_ubo,
            bind_group,
        }
    }

    #[inline]
    pub fn set_view_matrix(&mut self, view: DMat4) {
        self.view_matrix = view;
    }

    #[inline]
    pub fn view_matrix(&self) -> DMat4 {
        self.view_matrix
    }

    #[inline]
    pub fn set_projection_matrix(&mut self, projection: DMat4) {
        self.projection_matrix = projection;
    }

    #[inline]
    pub fn projection_matrix(&self) -> DMat4 {
        self.projection_matrix
    }

    /// Starts as [`ComputeNearFar::Off`]: the projection is used as given.
    #[inline]
    pub fn set_near_far_mode(&mut self, mode: ComputeNearFar) {
        self.near_far_mode = mode;
    }

    #[inline]
    pub fn near_far_mode(&self) -> ComputeNearFar {
        self.near_far_mode
    }

    #[inline]
    pub fn set_clamp_callback(&mut self, callback: Option<Rc<dyn ClampProjectionCallback>>) {
        self.clamp_callback = callback;
    }

    #[inline]
    pub fn set_child(&mut self, child: Option<Arc<dyn TerrainSource>>) {
        self.child = child;
    }

    #[inline]
    pub fn has_child(&self) -> bool {
        self.child.is_some()
    }

    #[inline]
    pub fn viewport(&self) -> u32 {
        self.viewport
    }

    /// Projection with near/far fitted to the child's bounds.
    ///
    /// The clamp goes through the installed callback when there is one,
    /// otherwise through `cull` directly.
    pub fn clamped_projection(&self, cull: &CullSettings) -> DMat4 {
        let mut projection = self.projection_matrix;
        if self.near_far_mode == ComputeNearFar::Off {
            return projection;
        }

        let Some(bounds) = self.child.as_ref().and_then(|c| c.bounds()) else {
            return projection;
        };
        let Some((mut znear, mut zfar)) = compute_near_far(&self.view_matrix, &bounds) else {
            return projection;
        };

        let clamped = match &self.clamp_callback {
            Some(callback) => callback.clamp_projection(&mut projection, &mut znear, &mut zfar),
            None => cull.clamp_projection(&mut projection, &mut znear, &mut zfar),
        };
        if !clamped {
            log::trace!("depth pass near/far clamp rejected ({znear}, {zfar})");
        }
        projection
    }

    /// Records the depth capture into `encoder` and returns the projection
    /// it was rendered with.
    pub fn render(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        cull: &CullSettings,
    ) -> DMat4 {
        let projection = self.clamped_projection(cull);
        let view_proj = projection * self.view_matrix;
        queue.write_buffer(&self.view_proj_ubo, 0, bytemuck::bytes_of(&to_gpu_matrix(&view_proj)));

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("drape depth pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_DEPTH),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let size = self.viewport as f32;
        pass.set_viewport(0.0, 0.0, size, size, 0.0, 1.0);

        if let Some(child) = &self.child {
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            child.draw_depth(&mut pass);
        }

        projection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_capture_is_always_filled() {
        let p = depth_pass_primitive();
        assert_eq!(p.polygon_mode, wgpu::PolygonMode::Fill);
        assert_eq!(p.cull_mode, None);
        assert_eq!(p.topology, wgpu::PrimitiveTopology::TriangleList);
    }

    #[test]
    fn depth_shader_reads_terrain_positions_only() {
        assert!(DEPTH_PASS_WGSL.contains("@location(0) position: vec3<f32>"));
        assert!(!DEPTH_PASS_WGSL.contains("@fragment"));
    }
}
