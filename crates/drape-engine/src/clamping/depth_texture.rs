/// Format of the depth capture.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Depth the capture is cleared to; also what out-of-range samples read.
pub const CLEAR_DEPTH: f32 = 1.0;

/// How the clamping shader binds the capture.
///
/// Depth formats are never filterable and the GL backend cannot sample a
/// `texture_depth_2d` without comparison, so the capture is read as plain
/// unfilterable float texels.
pub const DEPTH_SAMPLE_TYPE: wgpu::TextureSampleType =
    wgpu::TextureSampleType::Float { filterable: false };

/// Descriptor for a square depth-only capture texture.
pub fn depth_texture_descriptor(size: u32) -> wgpu::TextureDescriptor<'static> {
    let size = size.max(1);
    wgpu::TextureDescriptor {
        label: Some("drape clamp depth texture"),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    }
}

/// Sampler for reading the capture.
///
/// The sampler fetches single texels; linear filtering of the four texels
/// around a lookup happens in the clamping shader. With border support,
/// texels outside [0, 1] read the opaque white border (depth 1.0) instead of
/// repeating edge texels.
pub fn depth_sampler_descriptor(clamp_to_border: bool) -> wgpu::SamplerDescriptor<'static> {
    let (address_mode, border_color) = if clamp_to_border {
        (
            wgpu::AddressMode::ClampToBorder,
            Some(wgpu::SamplerBorderColor::OpaqueWhite),
        )
    } else {
        (wgpu::AddressMode::ClampToEdge, None)
    };

    wgpu::SamplerDescriptor {
        label: Some("drape clamp depth sampler"),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        border_color,
        ..Default::default()
    }
}

/// The captured depth surface of one view.
pub struct DepthTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub size: u32,
    /// Whether the sampler bounds out-of-range lookups itself.
    pub border_sampler: bool,
}

impl DepthTexture {
    pub fn new(device: &wgpu::Device, size: u32, clamp_to_border: bool) -> Self {
        let desc = depth_texture_descriptor(size);
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("drape clamp depth view"),
            ..Default::default()
        });
        let sampler = device.create_sampler(&depth_sampler_descriptor(clamp_to_border));

        Self {
            texture,
            view,
            sampler,
            size: desc.size.width,
            border_sampler: clamp_to_border,
        }
    }
}
