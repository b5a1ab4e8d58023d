//! Material and fluid data for Terraflow
//!
//! This crate provides the foundational data types for the terrain/fluid
//! simulation:
//! - Terrain material definitions (MaterialKind, MaterialDef, Materials)
//! - Fluid definitions (FluidKind, FluidDef, Fluids)
//! - The set of materials a brush hand can carry (HandMaterial)

mod fluids;
mod materials;

pub use fluids::{FluidDef, FluidKind, Fluids};
pub use materials::{HandMaterial, MaterialDef, MaterialKind, Materials};
