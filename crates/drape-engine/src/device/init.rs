/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Adapter selection preference.
    pub power_preference: wgpu::PowerPreference,

    /// Use a software adapter even when hardware is present.
    pub force_fallback_adapter: bool,

    /// Request `ADDRESS_MODE_CLAMP_TO_BORDER` when the adapter offers it.
    ///
    /// Without it, depth samples outside the captured area are bounded in the
    /// shader instead of by the sampler.
    pub prefer_clamp_to_border: bool,

    /// Features that must be present; device creation fails otherwise.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            prefer_clamp_to_border: true,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        }
    }
}
