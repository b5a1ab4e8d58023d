//! Terraflow core - a real-time terrain/fluid simulation engine
//!
//! A sculptable heightfield terrain with two coupled fluids (water,
//! lava) flowing across it. The engine owns the authoritative grid, the
//! brush pick-up/deposit economy with its capacity-bounded hand, the
//! persistent source emitters, the fixed-step scheduler with quality
//! control, and a per-tick perf sampler. Rendering, raycasting-from-
//! pointer, and UI are external collaborators: they feed brush ops and
//! settings in through ports and read grid fields and perf samples out.

pub mod brush;
pub mod config;
pub mod engine;
pub mod error;
pub mod fluids;
pub mod grid;
pub mod perf;
pub mod quality;
pub mod sources;
pub mod worldgen;

/// Re-export of the material/fluid data crate
pub mod simulation {
    pub use terraflow_simulation::*;
}

pub use brush::{BrushKind, BrushOp, BrushPort, Hand};
pub use config::EngineConfig;
pub use engine::{Engine, RunState};
pub use error::EngineError;
pub use fluids::FluidStepper;
pub use grid::{
    CellDelta, DirtyFields, GridField, OverlayKind, TerrainGrid, MAX_RESOLUTION, MIN_RESOLUTION,
};
pub use perf::{GpuTimings, NoopSink, PerfHistory, PerfSample, PerfSink, SharedPerfHistory};
pub use quality::{QualityOpts, QualityUpdate};
pub use sources::{Source, SourceId, SourceManager, SourcePort};
pub use worldgen::{TerrainGenerator, TerrainParams};
