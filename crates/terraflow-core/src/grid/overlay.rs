//! Debug overlay fields derived from grid state
//!
//! Overlays are a read selector for visualization only; computing one
//! never mutates simulation state. A single overlay is active at a time.

use serde::{Deserialize, Serialize};

use super::store::TerrainGrid;

/// Which derived field the debug overlay exposes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayKind {
    #[default]
    None,
    /// Water flow speed
    Flow,
    /// Moving water volume (depth weighted by flow speed)
    Accumulation,
    /// Lava depth
    Lava,
    /// Standing water depth (still cells only)
    Pools,
    /// Suspended sediment
    Sediment,
    /// Lava temperature
    Temperature,
}

/// Below this flow speed a wet cell counts as a pool
const POOL_SPEED: f32 = 0.05;

/// Fill `out` with the selected overlay field. Returns `false` (leaving
/// `out` untouched) for `OverlayKind::None`.
pub(crate) fn compute_overlay(grid: &TerrainGrid, kind: OverlayKind, out: &mut Vec<f32>) -> bool {
    if kind == OverlayKind::None {
        return false;
    }

    let res = grid.resolution();
    out.clear();
    out.reserve(grid.cell_count());

    for z in 0..res {
        for x in 0..res {
            let i = z * res + x;
            let value = match kind {
                OverlayKind::None => unreachable!(),
                OverlayKind::Flow => grid.flow_vector(x, z).length(),
                OverlayKind::Accumulation => {
                    grid.water[i] * grid.flow_vector(x, z).length()
                }
                OverlayKind::Lava => grid.lava[i],
                OverlayKind::Pools => {
                    if grid.water[i] > 0.0 && grid.flow_vector(x, z).length() < POOL_SPEED {
                        grid.water[i]
                    } else {
                        0.0
                    }
                }
                OverlayKind::Sediment => grid.sediment[i],
                OverlayKind::Temperature => {
                    if grid.lava[i] > 0.0 {
                        grid.heat[i]
                    } else {
                        0.0
                    }
                }
            };
            out.push(value);
        }
    }
    true
}
