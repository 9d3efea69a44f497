use crate::device::Capabilities;

/// Renderer-facing context (device/queue + platform capabilities).
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub caps: Capabilities,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue, caps: Capabilities) -> Self {
        Self { device, queue, caps }
    }
}

/// Depth buffer of the main view.
#[derive(Copy, Clone)]
pub struct DepthTarget<'a> {
    pub view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
}

/// Target for drawing (encoder + main color/depth views).
///
/// Passes load existing contents; clearing is the host's business.
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
    pub color_format: wgpu::TextureFormat,
    pub depth: Option<DepthTarget<'a>>,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(
        encoder: &'a mut wgpu::CommandEncoder,
        color_view: &'a wgpu::TextureView,
        color_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            encoder,
            color_view,
            color_format,
            depth: None,
        }
    }

    #[inline]
    pub fn with_depth(mut self, view: &'a wgpu::TextureView, format: wgpu::TextureFormat) -> Self {
        self.depth = Some(DepthTarget { view, format });
        self
    }

    /// Formats a pipeline drawing into this target must be built for.
    #[inline]
    pub fn formats(&self) -> (wgpu::TextureFormat, Option<wgpu::TextureFormat>) {
        (self.color_format, self.depth.map(|d| d.format))
    }
}
