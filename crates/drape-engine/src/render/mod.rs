//! GPU rendering plumbing shared by the host passes and the draping technique.
//!
//! Convention:
//! - matrices are composed on the CPU in f64 and narrowed once at upload
//! - passes are recorded into a caller-owned encoder in execution order

mod ctx;
mod uniform;

pub use ctx::{DepthTarget, RenderCtx, RenderTarget};
pub use uniform::{to_gpu_matrix, GpuMatrix, MatrixUniform};
