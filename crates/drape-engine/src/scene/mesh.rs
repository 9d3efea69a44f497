use std::marker::PhantomData;

use bytemuck::{Pod, Zeroable};
use glam::DVec3;
use wgpu::util::DeviceExt;

use crate::math::BoundingSphere;

use super::{OverlayContent, TerrainSource};

/// Vertex types uploadable into a [`Mesh`].
pub trait Vertex: Pod {
    fn layout() -> wgpu::VertexBufferLayout<'static>;

    fn position(&self) -> [f32; 3];
}

// ── terrain vertex ────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PositionVertex {
    pub position: [f32; 3],
}

impl PositionVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
}

impl Vertex for PositionVertex {
    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PositionVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }

    #[inline]
    fn position(&self) -> [f32; 3] {
        self.position
    }
}

// ── overlay vertex ────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct OverlayVertex {
    pub position: [f32; 3],
    pub color: [f32; 4], // linear, premultiplied
}

impl OverlayVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x4  // color
    ];
}

impl Vertex for OverlayVertex {
    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<OverlayVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }

    #[inline]
    fn position(&self) -> [f32; 3] {
        self.position
    }
}

// ── mesh ──────────────────────────────────────────────────────────────────

/// Indexed triangle list uploaded once.
pub struct Mesh<V> {
    vbo: wgpu::Buffer,
    ibo: wgpu::Buffer,
    index_count: u32,
    bounds: Option<BoundingSphere>,
    _vertex: PhantomData<V>,
}

impl<V: Vertex> Mesh<V> {
    pub fn new(device: &wgpu::Device, label: &str, vertices: &[V], indices: &[u32]) -> Self {
        let vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} vbo")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} ibo")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vbo,
            ibo,
            index_count: indices.len() as u32,
            bounds: bounds_of(vertices),
            _vertex: PhantomData,
        }
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    #[inline]
    pub fn bounds(&self) -> Option<BoundingSphere> {
        self.bounds
    }

    fn draw_indexed(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.index_count == 0 {
            return;
        }
        pass.set_vertex_buffer(0, self.vbo.slice(..));
        pass.set_index_buffer(self.ibo.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

fn bounds_of<V: Vertex>(vertices: &[V]) -> Option<BoundingSphere> {
    BoundingSphere::from_points(vertices.iter().map(|v| {
        let [x, y, z] = v.position();
        DVec3::new(x as f64, y as f64, z as f64)
    }))
}

impl TerrainSource for Mesh<PositionVertex> {
    fn bounds(&self) -> Option<BoundingSphere> {
        self.bounds
    }

    fn draw_depth(&self, pass: &mut wgpu::RenderPass<'_>) {
        self.draw_indexed(pass);
    }
}

impl OverlayContent for Mesh<OverlayVertex> {
    fn is_empty(&self) -> bool {
        self.index_count == 0
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        self.draw_indexed(pass);
    }
}
