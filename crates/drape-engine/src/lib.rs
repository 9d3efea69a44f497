//! Drape engine crate.
//!
//! Clamps overlay geometry onto terrain with a per-view depth capture, plus
//! the headless GPU runtime pieces it runs on.

pub mod device;
pub mod logging;
pub mod math;
pub mod render;
pub mod scene;
pub mod shader;

pub mod clamping;
