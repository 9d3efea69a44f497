//! Scene collaborators the draping technique renders.
//!
//! The terrain and the overlay content are opaque to the technique: it only
//! needs bounds, a depth-only draw for terrain, and a draw for overlays.

mod mesh;
mod node;
mod view;

pub use mesh::{Mesh, OverlayVertex, PositionVertex, Vertex};
pub use node::{OverlayContent, OverlayGroup, TerrainSource};
pub use view::{ViewCache, ViewId};
