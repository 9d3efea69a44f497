//! GPU device management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue without a surface
//! - negotiating the optional features the draping pipeline benefits from
//! - reporting the platform limits the technique sizes its resources by

mod caps;
mod gpu;
mod init;

pub use caps::{Capabilities, MAX_DEFAULT_TEXTURE_SIZE};
pub use gpu::Gpu;
pub use init::GpuInit;
