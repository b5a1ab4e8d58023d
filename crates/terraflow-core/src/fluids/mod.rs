//! Fluid stepper - advances water and lava one substep at a time
//!
//! Both fluids use the same virtual-pipes scheme: persistent face fluxes
//! accelerated by the surface-height gradient, damped, scaled so no cell
//! ever drains below zero, then applied. Water additionally evaporates
//! and carries sediment; lava stiffens as it cools and solidifies into a
//! static rock layer.

mod interaction;
mod lava;
mod sediment;
mod water;

use terraflow_simulation::{Fluids, Materials};

use crate::config::EngineConfig;
use crate::grid::TerrainGrid;

/// Face fluxes below this are flushed to zero
pub(crate) const MIN_FLOW: f32 = 1e-4;
/// Depths below this count as dry
pub(crate) const MIN_DEPTH: f32 = 1e-4;

/// Reusable buffers so a substep allocates nothing after warm-up
#[derive(Default)]
pub(crate) struct Scratch {
    pub surface: Vec<f32>,
    pub mobility: Vec<f32>,
    pub before: Vec<f32>,
    pub delta: Vec<f32>,
    pub aux: Vec<f32>,
    pub transfers: Vec<(usize, usize, f32)>,
}

/// Advances the fluid state one substep per call
pub struct FluidStepper {
    scratch: Scratch,
}

impl FluidStepper {
    pub fn new() -> Self {
        Self {
            scratch: Scratch::default(),
        }
    }

    /// One substep: water flow, evaporation, lava flow and cooling,
    /// lava/water contact, sediment exchange. Every sub-stage preserves
    /// non-negativity of all depth fields.
    pub fn step(
        &mut self,
        grid: &mut TerrainGrid,
        materials: &Materials,
        fluids: &Fluids,
        config: &EngineConfig,
        dt: f32,
    ) {
        if !(dt > 0.0) {
            return;
        }

        let water_def = fluids.get(terraflow_simulation::FluidKind::Water);
        let lava_def = fluids.get(terraflow_simulation::FluidKind::Lava);

        water::flow(grid, &mut self.scratch, water_def, config, dt);
        water::evaporate(grid, water_def, config, dt);
        lava::flow(grid, &mut self.scratch, lava_def, config, dt);
        lava::cool_and_solidify(grid, lava_def, config, dt);
        interaction::resolve(grid, config, dt);
        sediment::exchange(grid, materials, config, dt);
    }
}

impl Default for FluidStepper {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared pipe-flow pass over one fluid's depth field.
///
/// `surface` is the per-cell driving height; `mobility`, when present,
/// scales the gravitational acceleration per face (used for cooling
/// lava). Applied transfers are recorded in `transfers` as
/// `(from, to, depth)` so callers can advect whatever rides along with
/// the fluid (sediment, heat).
///
/// Mass is conserved exactly up to the final non-negativity clamp, whose
/// remainder is dropped rather than redistributed.
#[allow(clippy::too_many_arguments)]
pub(crate) fn pipe_flow(
    res: usize,
    dt: f32,
    accel: f32,
    damping: f32,
    surface: &[f32],
    mobility: Option<&[f32]>,
    depth: &mut [f32],
    flow_x: &mut [f32],
    flow_z: &mut [f32],
    delta: &mut Vec<f32>,
    transfers: &mut Vec<(usize, usize, f32)>,
) {
    let n = res * res;

    // 1. Accelerate face fluxes from the surface gradient
    for z in 0..res {
        for x in 0..res {
            let i = z * res + x;
            if x + 1 < res {
                let j = i + 1;
                let mut a = accel * (surface[i] - surface[j]);
                if let Some(m) = mobility {
                    a *= 0.5 * (m[i] + m[j]);
                }
                flow_x[i] = (flow_x[i] + a * dt) * damping;
                if flow_x[i].abs() < MIN_FLOW {
                    flow_x[i] = 0.0;
                }
            } else {
                flow_x[i] = 0.0;
            }
            if z + 1 < res {
                let j = i + res;
                let mut a = accel * (surface[i] - surface[j]);
                if let Some(m) = mobility {
                    a *= 0.5 * (m[i] + m[j]);
                }
                flow_z[i] = (flow_z[i] + a * dt) * damping;
                if flow_z[i].abs() < MIN_FLOW {
                    flow_z[i] = 0.0;
                }
            } else {
                flow_z[i] = 0.0;
            }
        }
    }

    // 2. Scale each cell's outflows so it cannot drain below zero. Every
    //    signed face direction is owned by exactly one cell, so a flux is
    //    scaled at most once.
    for z in 0..res {
        for x in 0..res {
            let i = z * res + x;
            let d = depth[i];
            if d <= MIN_DEPTH {
                if flow_x[i] > 0.0 {
                    flow_x[i] = 0.0;
                }
                if flow_z[i] > 0.0 {
                    flow_z[i] = 0.0;
                }
                if x > 0 && flow_x[i - 1] < 0.0 {
                    flow_x[i - 1] = 0.0;
                }
                if z > 0 && flow_z[i - res] < 0.0 {
                    flow_z[i - res] = 0.0;
                }
                continue;
            }

            let mut total_out = flow_x[i].max(0.0) + flow_z[i].max(0.0);
            if x > 0 {
                total_out += (-flow_x[i - 1]).max(0.0);
            }
            if z > 0 {
                total_out += (-flow_z[i - res]).max(0.0);
            }

            let max_out = d / dt;
            if total_out > max_out {
                let s = max_out / total_out;
                if flow_x[i] > 0.0 {
                    flow_x[i] *= s;
                }
                if flow_z[i] > 0.0 {
                    flow_z[i] *= s;
                }
                if x > 0 && flow_x[i - 1] < 0.0 {
                    flow_x[i - 1] *= s;
                }
                if z > 0 && flow_z[i - res] < 0.0 {
                    flow_z[i - res] *= s;
                }
            }
        }
    }

    // 3. Apply through a delta buffer so traversal order cannot bias the
    //    result
    delta.clear();
    delta.resize(n, 0.0);
    transfers.clear();
    for z in 0..res {
        for x in 0..res {
            let i = z * res + x;
            if x + 1 < res {
                let t = flow_x[i] * dt;
                if t > 0.0 {
                    delta[i] -= t;
                    delta[i + 1] += t;
                    transfers.push((i, i + 1, t));
                } else if t < 0.0 {
                    delta[i] += -t;
                    delta[i + 1] -= -t;
                    transfers.push((i + 1, i, -t));
                }
            }
            if z + 1 < res {
                let t = flow_z[i] * dt;
                if t > 0.0 {
                    delta[i] -= t;
                    delta[i + res] += t;
                    transfers.push((i, i + res, t));
                } else if t < 0.0 {
                    delta[i] += -t;
                    delta[i + res] -= -t;
                    transfers.push((i + res, i, -t));
                }
            }
        }
    }
    for i in 0..n {
        depth[i] = (depth[i] + delta[i]).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terraflow_simulation::FluidKind;

    fn grid_with_water_column() -> TerrainGrid {
        let mut grid = TerrainGrid::new(16, 64.0).unwrap();
        grid.rock.fill(10.0);
        let i = grid.index(8, 8);
        grid.water[i] = 4.0;
        grid
    }

    #[test]
    fn full_step_conserves_water_without_sinks() {
        let mut grid = grid_with_water_column();
        let materials = Materials::new();
        let fluids = Fluids::new();
        // Disable the explicit sinks so redistribution alone is measured
        let mut config = EngineConfig::default();
        config.shallow_depth = 0.0;

        let mut stepper = FluidStepper::new();
        let before = grid.total_water();
        for _ in 0..120 {
            stepper.step(&mut grid, &materials, &fluids, &config, 1.0 / 60.0);
        }
        let after = grid.total_water();

        assert!(
            (before - after).abs() < 1e-2,
            "water mass drifted: {before} -> {after}"
        );
        assert!(grid.water.iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn water_seeks_level() {
        let mut grid = grid_with_water_column();
        let materials = Materials::new();
        let fluids = Fluids::new();
        let config = EngineConfig::default();
        let center = grid.index(8, 8);
        let neighbor = grid.index(9, 8);

        let mut stepper = FluidStepper::new();
        for _ in 0..60 {
            stepper.step(&mut grid, &materials, &fluids, &config, 1.0 / 60.0);
        }

        assert!(grid.water[center] < 4.0);
        assert!(grid.water[neighbor] > 0.0);
    }

    #[test]
    fn pipe_flow_never_goes_negative() {
        let res = 8;
        let n = res * res;
        let mut depth = vec![0.0f32; n];
        depth[0] = 0.5;
        // Steep surface away from cell 0 in both directions
        let surface: Vec<f32> = (0..n).map(|i| if i == 0 { 100.0 } else { 0.0 }).collect();
        let mut flow_x = vec![0.0f32; n];
        let mut flow_z = vec![0.0f32; n];
        let mut delta = Vec::new();
        let mut transfers = Vec::new();

        for _ in 0..20 {
            pipe_flow(
                res,
                0.1,
                20.0,
                1.0,
                &surface,
                None,
                &mut depth,
                &mut flow_x,
                &mut flow_z,
                &mut delta,
                &mut transfers,
            );
        }
        assert!(depth.iter().all(|&d| d >= 0.0));
        let total: f32 = depth.iter().sum();
        assert!((total - 0.5).abs() < 1e-4);
    }

    #[test]
    fn cold_lava_spreads_slower_than_hot() {
        let fluids = Fluids::new();
        let config = EngineConfig::default();
        let lava_def = fluids.get(FluidKind::Lava);
        let solidify = lava_def.solidify_temperature.unwrap();

        let run = |temp: f32| -> f32 {
            let mut grid = TerrainGrid::new(16, 64.0).unwrap();
            grid.rock.fill(10.0);
            let i = grid.index(8, 8);
            grid.lava[i] = 4.0;
            grid.heat[i] = temp;
            let mut stepper = FluidStepper::new();
            // Few steps, so cooling cannot cross the solidify threshold
            for _ in 0..5 {
                lava::flow(&mut grid, &mut stepper.scratch, lava_def, &config, 1.0 / 60.0);
            }
            grid.lava[grid.index(9, 8)]
        };

        let hot_spread = run(1100.0);
        let cold_spread = run(solidify + 40.0);
        assert!(hot_spread > cold_spread);
    }
}
