use std::sync::Arc;

use glam::DMat4;

use crate::device::Capabilities;
use crate::math::CullSettings;
use crate::render::{RenderCtx, RenderTarget};
use crate::scene::{OverlayContent, TerrainSource, ViewCache, ViewId};
use crate::shader::FRAME_BIND_GROUP;

use super::options::ClampingOptions;
use super::shader::{ClampingShader, DepthOffset};
use super::transform::DepthTransforms;
use super::view_data::{ViewResources, ViewSetup};

/// Per-frame input for one view.
pub struct DrapeParams<'a> {
    pub view: ViewId,
    /// View matrix of the draping (depth capture) camera.
    pub depth_view: DMat4,
    /// Projection of the draping camera, before near/far fitting.
    pub depth_projection: DMat4,
    /// View matrix of the camera the overlay is drawn for.
    pub main_view: DMat4,
    pub main_projection: DMat4,
    pub overlay: &'a dyn OverlayContent,
    pub cull: CullSettings,
}

/// Clamps overlay geometry onto terrain through a per-view depth capture.
///
/// Each frame the terrain is rendered depth-only from the draping camera,
/// the projection actually used is captured, and the overlay is drawn with
/// a vertex stage that snaps every vertex onto the captured surface.
///
/// Terrain is shared as `Arc<dyn TerrainSource>`; the source must not be
/// mutated while a frame is being recorded, which `Send + Sync` and the
/// `&self` draw entry point leave to the implementor.
pub struct ClampingTechnique {
    texture_size: u32,
    slot: u32,
    clamp_to_border: bool,
    depth_offset: DepthOffset,
    terrain: Option<Arc<dyn TerrainSource>>,
    views: ViewCache<ViewResources>,
}

impl ClampingTechnique {
    pub fn new(caps: Capabilities, options: ClampingOptions) -> Self {
        let highest = caps.highest_bind_group();
        let slot = match options.bind_group_slot {
            Some(slot) if slot > FRAME_BIND_GROUP && slot <= highest => slot,
            Some(slot) => {
                log::warn!(
                    "bind group {slot} cannot hold the depth capture (valid: {}..={highest}); using {highest}",
                    FRAME_BIND_GROUP + 1
                );
                highest
            }
            None => highest,
        };

        if !caps.clamp_to_border {
            log::warn!(
                "adapter lacks clamp-to-border sampling; depth lookups outside the capture are resolved in the shader"
            );
        }

        Self {
            texture_size: options
                .texture_size
                .unwrap_or_else(|| caps.default_texture_size()),
            slot,
            clamp_to_border: caps.clamp_to_border,
            depth_offset: options.depth_offset,
            terrain: None,
            views: ViewCache::new(),
        }
    }

    /// Square size used for views created from now on.
    #[inline]
    pub fn texture_size(&self) -> u32 {
        self.texture_size
    }

    /// Existing views keep the texture they were created with.
    pub fn set_texture_size(&mut self, size: u32) {
        if size != self.texture_size {
            log::debug!("draping texture size {} -> {size}", self.texture_size);
            self.texture_size = size;
        }
    }

    /// Bind group reserved for the depth texture and transforms.
    #[inline]
    pub fn bind_group_slot(&self) -> u32 {
        self.slot
    }

    /// Shader contribution for the current configuration.
    pub fn shader(&self) -> ClampingShader {
        ClampingShader {
            bind_group: self.slot,
            depth_offset: self.depth_offset,
            emulate_border: !self.clamp_to_border,
        }
    }

    pub fn on_install(&mut self, terrain: Arc<dyn TerrainSource>) {
        log::info!(
            "clamping technique installed: depth capture {0}x{0}, bind group {1}",
            self.texture_size,
            self.slot
        );
        for view in self.views.values_mut() {
            view.camera.set_child(Some(terrain.clone()));
        }
        self.terrain = Some(terrain);
    }

    pub fn on_uninstall(&mut self) {
        self.terrain = None;
        for view in self.views.values_mut() {
            view.camera.set_child(None);
        }
        log::debug!("clamping technique uninstalled from {} view(s)", self.views.len());
    }

    #[inline]
    pub fn is_installed(&self) -> bool {
        self.terrain.is_some()
    }

    /// Creates the view's resources on the first frame it has overlay content.
    /// Does nothing for an empty overlay.
    pub fn pre_cull_terrain(&mut self, ctx: &RenderCtx<'_>, params: &DrapeParams<'_>) {
        let wanted = !params.overlay.is_empty();
        if !wanted || self.views.contains(params.view) {
            return;
        }

        let setup = ViewSetup {
            texture_size: self.texture_size,
            clamp_to_border: self.clamp_to_border,
            shader: self.shader(),
            terrain: self.terrain.clone(),
        };
        self.views.get_or_create_if(params.view, wanted, || {
            log::debug!(
                "{:?}: depth capture {}x{} in bind group {}",
                params.view,
                setup.texture_size,
                setup.texture_size,
                setup.shader.bind_group
            );
            ViewResources::new(ctx.device, &setup)
        });
    }

    /// Records the view's depth capture followed by the clamped overlay pass.
    ///
    /// Both passes go into `target.encoder`, depth first. An empty overlay is
    /// a no-op and allocates nothing.
    pub fn cull_overlay_group(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        params: &DrapeParams<'_>,
    ) {
        if params.overlay.is_empty() {
            return;
        }
        self.pre_cull_terrain(ctx, params);
        let Some(local) = self.views.get_mut(params.view) else {
            return;
        };

        local.camera.set_view_matrix(params.depth_view);
        local.camera.set_projection_matrix(params.depth_projection);

        local.interceptor.reset();
        local.interceptor.prime(params.cull);
        let rendered = local.camera.render(ctx.queue, target.encoder, &params.cull);
        local.interceptor.release();

        let captured = local.interceptor.captured().unwrap_or_else(|| {
            log::trace!("{:?}: no near/far clamp this frame; using the unfitted projection", params.view);
            rendered
        });

        local.update_transforms(ctx.queue, &params.main_view, &params.depth_view, &captured);
        local
            .shared_state
            .write_frame(ctx.queue, &params.main_view, &params.main_projection);
        local.shared_state.draw(ctx.device, target, params.overlay);
    }

    /// Drops the view's resources. Returns whether it had any.
    pub fn release_view(&mut self, view: ViewId) -> bool {
        let released = self.views.remove(view).is_some();
        if released {
            log::debug!("{view:?}: draping resources released");
        }
        released
    }

    #[inline]
    pub fn has_view(&self, view: ViewId) -> bool {
        self.views.contains(view)
    }

    #[inline]
    pub fn num_views(&self) -> usize {
        self.views.len()
    }

    /// Last transform pair uploaded for `view`.
    pub fn depth_transforms(&self, view: ViewId) -> Option<DepthTransforms> {
        self.views.get(view).and_then(|v| v.transforms())
    }

    /// Projection captured during the view's last depth capture.
    pub fn captured_projection(&self, view: ViewId) -> Option<DMat4> {
        self.views.get(view).and_then(|v| v.interceptor.captured())
    }

    /// The view's resources, for diagnostics.
    pub fn view_resources(&self, view: ViewId) -> Option<&ViewResources> {
        self.views.get(view)
    }
}
