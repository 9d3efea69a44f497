//! Shader composition.
//!
//! Techniques contribute named WGSL functions at fixed injection points;
//! [`VirtualProgram::compose`] links them with the host's overlay entry points
//! into a single module.

mod program;

pub use program::{
    wgsl_f32, InjectionPoint, ShaderFunction, Varying, VirtualProgram, FRAGMENT_ENTRY,
    FRAME_BIND_GROUP, VERTEX_ENTRY,
};
