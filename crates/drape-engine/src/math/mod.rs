//! Double-precision math shared by the depth pass and the transform chain.
//!
//! Conventions (glam, column vectors, right-handed eye space):
//! - eye space looks down -Z
//! - clip space depth maps to [0, 1] after the divide (WebGPU)
//! - texture space has its origin top-left, +V down

mod bounds;
mod near_far;

pub use bounds::BoundingSphere;
pub use near_far::{compute_near_far, is_orthographic, ndc_depth, ComputeNearFar, CullSettings};
