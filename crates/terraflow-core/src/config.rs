//! Engine configuration - serializable simulation parameters
//!
//! Every threshold the brush economy and fluid stepper depend on lives
//! here rather than as embedded literals, so hosts can ship presets (RON)
//! and tune interactively.

use serde::{Deserialize, Serialize};

/// Tunable parameters for the simulation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// World extent covered by the grid, in meters per axis
    pub world_size: f32,
    /// Grid resolution the engine starts at (cells per axis)
    pub default_resolution: usize,

    // Scheduling
    /// Fixed simulation timestep in seconds
    pub tick_dt: f32,
    /// Allowed range for the user time-scale multiplier
    pub time_scale_range: (f32, f32),
    /// Upper bound on stepper substeps per tick
    pub max_substeps: u32,

    // Brush economy
    /// The hand rejects pickups at/above this fraction of capacity
    pub hand_full_fraction: f32,
    /// The hand rejects deposits at/below this fraction of capacity
    pub hand_empty_fraction: f32,
    /// Default hand capacity (mass units)
    pub hand_capacity: f32,

    // Fluids
    /// Gravity driving the pipe-flow model (m/s²)
    pub gravity: f32,
    /// Per-cell depth cap for fluid deposits and source injection (m)
    pub max_fluid_depth: f32,
    /// Source injection kernel radius, in cells
    pub source_radius: f32,
    /// Water shallower than this evaporates (m)
    pub shallow_depth: f32,
    /// Heat lava sheds per second of water contact (°C)
    pub quench_rate: f32,
    /// Water depth boiled off per second of lava contact (m)
    pub boil_rate: f32,
    /// Fraction of contacting lava converted to rock per second
    pub contact_solidify_rate: f32,
    /// Ambient temperature lava cools toward (°C)
    pub ambient_temperature: f32,

    // Sediment
    /// Carrying capacity per unit of flow speed
    pub sediment_capacity: f32,
    /// Rate soil erodes into suspension (per second)
    pub erosion_rate: f32,
    /// Rate suspended sediment settles out (per second)
    pub deposition_rate: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            world_size: 512.0,
            default_resolution: 256,
            tick_dt: 1.0 / 60.0,
            time_scale_range: (0.1, 10.0),
            max_substeps: 8,
            hand_full_fraction: 0.99,
            hand_empty_fraction: 0.01,
            hand_capacity: 100.0,
            gravity: 9.81,
            max_fluid_depth: 50.0,
            source_radius: 1.5,
            shallow_depth: 0.05,
            quench_rate: 400.0,
            boil_rate: 0.5,
            contact_solidify_rate: 0.6,
            ambient_temperature: 20.0,
            sediment_capacity: 0.8,
            erosion_rate: 0.3,
            deposition_rate: 0.5,
        }
    }
}

impl EngineConfig {
    /// Clamp a requested time scale into the configured range.
    pub fn clamp_time_scale(&self, scale: f32) -> f32 {
        let (lo, hi) = self.time_scale_range;
        if scale.is_finite() {
            scale.clamp(lo, hi)
        } else {
            1.0
        }
    }

    /// Clamp a requested substep count into `1..=max_substeps`.
    pub fn clamp_substeps(&self, substeps: u32) -> u32 {
        substeps.clamp(1, self.max_substeps)
    }
}
