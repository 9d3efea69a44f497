use bytemuck::{Pod, Zeroable};
use glam::DMat4;

/// Column-major 4x4 matrix as laid out in a WGSL `mat4x4<f32>` uniform.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GpuMatrix {
    pub cols: [[f32; 4]; 4],
}

/// Narrows a double-precision matrix for upload.
#[inline]
pub fn to_gpu_matrix(m: &DMat4) -> GpuMatrix {
    GpuMatrix {
        cols: m.as_mat4().to_cols_array_2d(),
    }
}

/// A named `mat4x4<f32>` uniform backed by its own buffer.
///
/// The last value written is kept in double precision for diagnostics.
pub struct MatrixUniform {
    name: &'static str,
    buffer: wgpu::Buffer,
    value: DMat4,
}

impl MatrixUniform {
    pub fn new(device: &wgpu::Device, name: &'static str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(name),
            size: std::mem::size_of::<GpuMatrix>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            name,
            buffer,
            value: DMat4::IDENTITY,
        }
    }

    /// Queues an upload of `value`.
    pub fn set(&mut self, queue: &wgpu::Queue, value: DMat4) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&to_gpu_matrix(&value)));
        self.value = value;
    }

    #[inline]
    pub fn get(&self) -> DMat4 {
        self.value
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Minimum binding size for layouts that bind this uniform.
    pub fn min_binding_size() -> std::num::NonZeroU64 {
        std::num::NonZeroU64::new(std::mem::size_of::<GpuMatrix>() as u64)
            .expect("GpuMatrix has non-zero size by construction")
    }
}
