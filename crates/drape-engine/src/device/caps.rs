/// Upper bound for the default depth texture size.
pub const MAX_DEFAULT_TEXTURE_SIZE: u32 = 4096;

/// Platform capabilities the draping technique sizes its resources by.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Capabilities {
    /// Number of bind groups a pipeline layout may use.
    pub max_bind_groups: u32,

    /// Largest supported 2D texture dimension.
    pub max_texture_dimension_2d: u32,

    /// Whether samplers may use `AddressMode::ClampToBorder`.
    pub clamp_to_border: bool,
}

impl Capabilities {
    pub fn from_device(device: &wgpu::Device) -> Self {
        Self::from_parts(&device.limits(), device.features())
    }

    pub fn from_parts(limits: &wgpu::Limits, features: wgpu::Features) -> Self {
        Self {
            max_bind_groups: limits.max_bind_groups,
            max_texture_dimension_2d: limits.max_texture_dimension_2d,
            clamp_to_border: features.contains(wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER),
        }
    }

    /// Largest texture size that is cheap to render into on this platform.
    #[inline]
    pub fn max_fast_texture_size(&self) -> u32 {
        self.max_texture_dimension_2d
    }

    /// Default square size for the depth capture.
    #[inline]
    pub fn default_texture_size(&self) -> u32 {
        MAX_DEFAULT_TEXTURE_SIZE.min(self.max_fast_texture_size()).max(1)
    }

    /// Highest bind group index; reserved so content shaders keep the low slots.
    #[inline]
    pub fn highest_bind_group(&self) -> u32 {
        self.max_bind_groups.saturating_sub(1)
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::from_parts(&wgpu::Limits::default(), wgpu::Features::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_texture_size_is_capped() {
        let caps = Capabilities {
            max_bind_groups: 4,
            max_texture_dimension_2d: 16384,
            clamp_to_border: true,
        };
        assert_eq!(caps.default_texture_size(), 4096);
    }

    #[test]
    fn default_texture_size_follows_small_limits() {
        let caps = Capabilities {
            max_bind_groups: 4,
            max_texture_dimension_2d: 2048,
            clamp_to_border: false,
        };
        assert_eq!(caps.default_texture_size(), 2048);
    }

    #[test]
    fn highest_bind_group_is_last_slot() {
        let caps = Capabilities::default();
        assert_eq!(caps.highest_bind_group(), wgpu::Limits::default().max_bind_groups - 1);
        assert!(!caps.clamp_to_border);
    }
}
