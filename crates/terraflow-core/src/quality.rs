//! Quality options - resolution, substeps, and render hints

use serde::{Deserialize, Serialize};

/// The engine's current quality settings.
///
/// `sim_resolution` changes trigger a full grid resample, fenced between
/// ticks. `clipmap_levels` is a render-side hint the engine stores and
/// exposes but never acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityOpts {
    /// Grid cell count per axis
    pub sim_resolution: usize,
    /// Fluid stepper passes per tick (finer but slower integration)
    pub sim_substeps: u32,
    /// Optional clipmap level count for the terrain renderer
    pub clipmap_levels: Option<u32>,
}

impl Default for QualityOpts {
    fn default() -> Self {
        Self {
            sim_resolution: 256,
            sim_substeps: 1,
            clipmap_levels: None,
        }
    }
}

/// Partial quality update from the UI; `None` fields keep their current
/// value. The outer `Option` on `clipmap_levels` distinguishes "leave it"
/// from "clear it".
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityUpdate {
    pub sim_resolution: Option<usize>,
    pub sim_substeps: Option<u32>,
    pub clipmap_levels: Option<Option<u32>>,
}
