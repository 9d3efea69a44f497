use std::sync::Arc;

use crate::math::BoundingSphere;

/// Terrain content rendered into the depth capture.
///
/// Draws bind their own vertex/index buffers. Vertex slot 0 must carry
/// [`PositionVertex`](super::PositionVertex) data in world coordinates; the
/// depth pipeline and its bind group 0 are already set.
///
/// The technique only reads terrain through `&self` while a frame is being
/// recorded. Hosts that mutate terrain concurrently must synchronize inside
/// their implementation.
pub trait TerrainSource: Send + Sync {
    fn bounds(&self) -> Option<BoundingSphere>;

    fn draw_depth(&self, pass: &mut wgpu::RenderPass<'_>);
}

/// Overlay geometry to be draped.
///
/// Vertex slot 0 must carry [`OverlayVertex`](super::OverlayVertex) data in
/// world coordinates.
pub trait OverlayContent {
    fn is_empty(&self) -> bool;

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>);
}

/// Group of overlay children drawn in insertion order.
#[derive(Default, Clone)]
pub struct OverlayGroup {
    children: Vec<Arc<dyn OverlayContent>>,
}

impl OverlayGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_child(&mut self, child: Arc<dyn OverlayContent>) {
        self.children.push(child);
    }

    pub fn clear(&mut self) {
        self.children.clear();
    }

    #[inline]
    pub fn num_children(&self) -> usize {
        self.children.len()
    }
}

impl OverlayContent for OverlayGroup {
    fn is_empty(&self) -> bool {
        self.children.iter().all(|c| c.is_empty())
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        for child in &self.children {
            child.draw(pass);
        }
    }
}
