use std::rc::Rc;
use std::sync::Arc;

use glam::DMat4;

use crate::math::ComputeNearFar;
use crate::render::MatrixUniform;
use crate::scene::TerrainSource;

use super::camera::OffscreenCamera;
use super::depth_texture::DepthTexture;
use super::interceptor::{CapturingClamp, ClampProjectionCallback};
use super::shader::{ClampingShader, DEPTH_CLIP_TO_EYE, EYE_TO_DEPTH_CLIP};
use super::shared_state::SharedState;
use super::transform::DepthTransforms;

/// Everything a view needs to build its resources.
pub(crate) struct ViewSetup {
    pub texture_size: u32,
    pub clamp_to_border: bool,
    pub shader: ClampingShader,
    pub terrain: Option<Arc<dyn TerrainSource>>,
}

/// Per-view resources, created on the first frame the view has overlay
/// content and kept until the view is released.
pub struct ViewResources {
    pub depth_texture: DepthTexture,
    pub camera: OffscreenCamera,
    pub shared_state: SharedState,
    pub eye_to_depth_clip: MatrixUniform,
    pub depth_clip_to_eye: MatrixUniform,
    pub interceptor: Rc<CapturingClamp>,

    transforms: Option<DepthTransforms>,
    warned_degenerate: bool,
}

impl ViewResources {
    pub(crate) fn new(device: &wgpu::Device, setup: &ViewSetup) -> Self {
        let depth_texture = DepthTexture::new(device, setup.texture_size, setup.clamp_to_border);

        let interceptor = Rc::new(CapturingClamp::new());
        let mut camera = OffscreenCamera::new(device, &depth_texture);
        camera.set_near_far_mode(ComputeNearFar::BoundingVolumes);
        camera.set_clamp_callback(Some(interceptor.clone() as Rc<dyn ClampProjectionCallback>));
        camera.set_child(setup.terrain.clone());

        let eye_to_depth_clip = MatrixUniform::new(device, EYE_TO_DEPTH_CLIP);
        let depth_clip_to_eye = MatrixUniform::new(device, DEPTH_CLIP_TO_EYE);

        let shared_state = SharedState::new(
            device,
            &setup.shader,
            &depth_texture,
            &eye_to_depth_clip,
            &depth_clip_to_eye,
        );

        Self {
            depth_texture,
            camera,
            shared_state,
            eye_to_depth_clip,
            depth_clip_to_eye,
            interceptor,
            transforms: None,
            warned_degenerate: false,
        }
    }

    /// Last transform pair uploaded to the GPU.
    #[inline]
    pub fn transforms(&self) -> Option<DepthTransforms> {
        self.transforms
    }

    /// Derives and uploads both transforms for this frame.
    ///
    /// A degenerate chain keeps the previous pair on the GPU; it is reported
    /// once per view. Returns whether a new pair was uploaded.
    pub fn update_transforms(
        &mut self,
        queue: &wgpu::Queue,
        main_view: &DMat4,
        depth_view: &DMat4,
        depth_projection: &DMat4,
    ) -> bool {
        let Some(transforms) = DepthTransforms::derive(main_view, depth_view, depth_projection)
        else {
            if !self.warned_degenerate {
                log::warn!("draping transform is singular; keeping the previous depth transforms");
                self.warned_degenerate = true;
            }
            return false;
        };

        self.eye_to_depth_clip.set(queue, transforms.eye_to_depth_clip);
        self.depth_clip_to_eye.set(queue, transforms.depth_clip_to_eye);
        self.transforms = Some(transforms);
        true
    }
}
