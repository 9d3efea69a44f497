use crate::render::{to_gpu_matrix, GpuMatrix, MatrixUniform, RenderTarget};
use crate::scene::{OverlayContent, OverlayVertex, Vertex};
use crate::shader::{VirtualProgram, FRAGMENT_ENTRY, FRAME_BIND_GROUP, VERTEX_ENTRY};

use super::depth_texture::{DepthTexture, DEPTH_SAMPLE_TYPE};
use super::shader::{
    ClampingShader, BINDING_DEPTH_CLIP_TO_EYE, BINDING_DEPTH_SAMPLER, BINDING_DEPTH_TEXTURE,
    BINDING_EYE_TO_DEPTH_CLIP,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameUniform {
    model_view: GpuMatrix,
    projection: GpuMatrix,
}

/// Pipeline targets: color format plus optional depth format.
type PipelineKey = (wgpu::TextureFormat, Option<wgpu::TextureFormat>);

fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

/// Depth state of the overlay pass for a target with `format`.
///
/// Clamped fragments write the simulated depth, so they compete with the
/// terrain already in the target with `LessEqual`.
pub fn overlay_depth_state(format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::LessEqual,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: Some(MatrixUniform::min_binding_size()),
        },
        count: None,
    }
}

/// State attached to the overlay group of one view.
///
/// Holds the composed clamping program, the reserved bind group carrying the
/// depth texture and both transforms, and the overlay pipeline. Bind groups
/// between the frame group and the reserved slot are bound empty.
pub struct SharedState {
    program: VirtualProgram,
    slot: u32,

    frame_ubo: wgpu::Buffer,
    frame_bgl: wgpu::BindGroupLayout,
    frame_bind_group: wgpu::BindGroup,

    empty_bgl: wgpu::BindGroupLayout,
    empty_bind_group: wgpu::BindGroup,

    clamp_bgl: wgpu::BindGroupLayout,
    clamp_bind_group: wgpu::BindGroup,

    pipeline: Option<wgpu::RenderPipeline>,
    pipeline_key: Option<PipelineKey>,
}

impl SharedState {
    pub fn new(
        device: &wgpu::Device,
        shader: &ClampingShader,
        depth: &DepthTexture,
        eye_to_depth_clip: &MatrixUniform,
        depth_clip_to_eye: &MatrixUniform,
    ) -> Self {
        let frame_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("drape frame ubo"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("drape frame bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<FrameUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("drape frame bind group"),
            layout: &frame_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_ubo.as_entire_binding(),
            }],
        });

        let empty_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("drape empty bgl"),
            entries: &[],
        });
        let empty_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("drape empty bind group"),
            layout: &empty_bgl,
            entries: &[],
        });

        let clamp_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("drape clamp bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: BINDING_DEPTH_TEXTURE,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Texture {
                        sample_type: DEPTH_SAMPLE_TYPE,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: BINDING_DEPTH_SAMPLER,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
                uniform_entry(BINDING_EYE_TO_DEPTH_CLIP),
                uniform_entry(BINDING_DEPTH_CLIP_TO_EYE),
            ],
        });

        let clamp_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("drape clamp bind group"),
            layout: &clamp_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: BINDING_DEPTH_TEXTURE,
                    resource: wgpu::BindingResource::TextureView(&depth.view),
                },
                wgpu::BindGroupEntry {
                    binding: BINDING_DEPTH_SAMPLER,
                    resource: wgpu::BindingResource::Sampler(&depth.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: BINDING_EYE_TO_DEPTH_CLIP,
                    resource: eye_to_depth_clip.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: BINDING_DEPTH_CLIP_TO_EYE,
                    resource: depth_clip_to_eye.buffer().as_entire_binding(),
                },
            ],
        });

        Self {
            program: shader.program(),
            slot: shader.bind_group,
            frame_ubo,
            frame_bgl,
            frame_bind_group,
            empty_bgl,
            empty_bind_group,
            clamp_bgl,
            clamp_bind_group,
            pipeline: None,
            pipeline_key: None,
        }
    }

    #[inline]
    pub fn program(&self) -> &VirtualProgram {
        &self.program
    }

    /// Bind group index holding the depth texture and transforms.
    #[inline]
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Uploads the overlay camera for this frame.
    pub fn write_frame(&self, queue: &wgpu::Queue, model_view: &glam::DMat4, projection: &glam::DMat4) {
        let frame = FrameUniform {
            model_view: to_gpu_matrix(model_view),
            projection: to_gpu_matrix(projection),
        };
        queue.write_buffer(&self.frame_ubo, 0, bytemuck::bytes_of(&frame));
    }

    fn ensure_pipeline(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.pipeline_key == Some(key) && self.pipeline.is_some() {
            return;
        }
        let (color_format, depth_format) = key;

        let source = self.program.compose();
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("drape overlay shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let mut layouts: Vec<&wgpu::BindGroupLayout> = Vec::with_capacity(self.slot as usize + 1);
        layouts.push(&self.frame_bgl);
        for _ in FRAME_BIND_GROUP + 1..self.slot {
            layouts.push(&self.empty_bgl);
        }
        layouts.push(&self.clamp_bgl);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("drape overlay pipeline layout"),
            bind_group_layouts: &layouts,
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("drape overlay pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some(VERTEX_ENTRY),
                compilation_options: Default::default(),
                buffers: &[OverlayVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some(FRAGMENT_ENTRY),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: depth_format.map(overlay_depth_state),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!(
            "drape overlay pipeline built for {color_format:?} / {depth_format:?}, clamp group {}",
            self.slot
        );
        self.pipeline = Some(pipeline);
        self.pipeline_key = Some(key);
    }

    /// Records the overlay pass into `target`, loading its existing contents.
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        target: &mut RenderTarget<'_>,
        overlay: &dyn OverlayContent,
    ) {
        self.ensure_pipeline(device, target.formats());
        let Some(pipeline) = self.pipeline.as_ref() else {
            return;
        };

        let depth_stencil_attachment =
            target.depth.map(|d| wgpu::RenderPassDepthStencilAttachment {
                view: d.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            });

        let mut pass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("drape overlay pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(FRAME_BIND_GROUP, &self.frame_bind_group, &[]);
        for group in FRAME_BIND_GROUP + 1..self.slot {
            pass.set_bind_group(group, &self.empty_bind_group, &[]);
        }
        pass.set_bind_group(self.slot, &self.clamp_bind_group, &[]);
        overlay.draw(&mut pass);
    }
}
