//! Grid store - per-cell terrain and fluid fields
//!
//! The grid is the single shared state every engine component reads and
//! mutates. It is owned by the engine; external readers only see a stable
//! snapshot between ticks.

mod overlay;
mod sampling;
mod store;

pub use overlay::OverlayKind;
pub use store::{
    CellDelta, DirtyFields, GridField, TerrainGrid, MAX_RESOLUTION, MIN_RESOLUTION,
};

pub(crate) use overlay::compute_overlay;
