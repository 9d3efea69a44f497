//! Terrain clamping for draped overlays.
//!
//! Per view and per frame:
//! 1. the terrain is rendered depth-only from the draping camera
//!    ([`OffscreenCamera`]), and the near/far-fitted projection is recorded by
//!    [`CapturingClamp`];
//! 2. [`DepthTransforms`] maps the overlay camera's eye space into that
//!    capture and back;
//! 3. the overlay is drawn with [`ClampingShader`], which moves each vertex
//!    onto the captured surface and biases its depth toward the eye.

mod camera;
mod depth_texture;
mod interceptor;
mod options;
mod shader;
mod shared_state;
mod technique;
mod transform;
mod view_data;

pub use camera::{depth_pass_primitive, OffscreenCamera};
pub use depth_texture::{
    depth_sampler_descriptor, depth_texture_descriptor, DepthTexture, CLEAR_DEPTH, DEPTH_FORMAT,
    DEPTH_SAMPLE_TYPE,
};
pub use interceptor::{CapturingClamp, ClampProjectionCallback};
pub use options::ClampingOptions;
pub use shader::{
    fragment_depth, ClampedVertex, ClampingShader, DepthOffset, DEPTH_CLIP_TO_EYE, DEPTH_SAMPLER,
    DEPTH_TEXTURE, EYE_TO_DEPTH_CLIP, FRAGMENT_FUNCTION, PROGRAM_NAME, SIM_RANGE, SIM_VERTEX,
    VERTEX_FUNCTION,
};
pub use shared_state::{overlay_depth_state, SharedState};
pub use technique::{ClampingTechnique, DrapeParams};
pub use transform::{scale_bias, DepthTransforms};
pub use view_data::ViewResources;
