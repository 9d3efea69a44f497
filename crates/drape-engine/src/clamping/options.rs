use super::shader::DepthOffset;

/// Construction options for [`super::ClampingTechnique`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClampingOptions {
    /// Square size of each view's depth capture. `None` picks
    /// `min(4096, max texture dimension)`.
    pub texture_size: Option<u32>,
    /// Bind group reserved for the depth texture and transforms. `None`
    /// picks the highest group the device exposes. Fixed after construction.
    pub bind_group_slot: Option<u32>,
    pub depth_offset: DepthOffset,
}

impl ClampingOptions {
    #[inline]
    pub fn with_texture_size(mut self, size: u32) -> Self {
        self.texture_size = Some(size);
        self
    }

    #[inline]
    pub fn with_bind_group_slot(mut self, slot: u32) -> Self {
        self.bind_group_slot = Some(slot);
        self
    }

    #[inline]
    pub fn with_depth_offset(mut self, depth_offset: DepthOffset) -> Self {
        self.depth_offset = depth_offset;
        self
    }
}
