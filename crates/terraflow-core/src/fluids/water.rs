//! Water redistribution and evaporation

use rayon::prelude::*;
use terraflow_simulation::FluidDef;

use crate::config::EngineConfig;
use crate::fluids::{pipe_flow, Scratch, MIN_DEPTH};
use crate::grid::{DirtyFields, TerrainGrid};

/// Redistribute water along the free-surface gradient. Suspended
/// sediment rides along with the transferred water fraction, so it can
/// never outrun the water carrying it.
pub(crate) fn flow(
    grid: &mut TerrainGrid,
    scratch: &mut Scratch,
    def: &FluidDef,
    config: &EngineConfig,
    dt: f32,
) {
    let res = grid.resolution();
    let n = grid.cell_count();

    // Driving surface: terrain plus the denser lava layer below the water
    scratch.surface.clear();
    scratch
        .surface
        .extend((0..n).map(|i| grid.ground_height_at(i) + grid.lava[i] + grid.water[i]));

    // Pre-flow snapshot, for sediment fractions
    scratch.before.clear();
    scratch.before.extend_from_slice(&grid.water);

    pipe_flow(
        res,
        dt,
        config.gravity * def.flow_rate,
        def.damping,
        &scratch.surface,
        None,
        &mut grid.water,
        &mut grid.flow_x,
        &mut grid.flow_z,
        &mut scratch.delta,
        &mut scratch.transfers,
    );

    // Advect sediment with the moved fractions
    scratch.aux.clear();
    scratch.aux.resize(n, 0.0);
    let mut any_sediment = false;
    for &(from, to, moved) in &scratch.transfers {
        let held = scratch.before[from];
        if held > MIN_DEPTH && grid.sediment[from] > 0.0 {
            let carried = grid.sediment[from] * (moved / held);
            scratch.aux[from] -= carried;
            scratch.aux[to] += carried;
            any_sediment = true;
        }
    }
    if any_sediment {
        for i in 0..n {
            grid.sediment[i] = (grid.sediment[i] + scratch.aux[i]).max(0.0);
        }
    }

    grid.mark_dirty(DirtyFields::WATER | DirtyFields::SEDIMENT);
}

/// Evaporate a small fraction of exposed shallow water. An explicit mass
/// sink; the lost remainder is simply dropped.
pub(crate) fn evaporate(grid: &mut TerrainGrid, def: &FluidDef, config: &EngineConfig, dt: f32) {
    let Some(rate) = def.evaporation_rate else {
        return;
    };
    let shallow = config.shallow_depth;
    let loss = (rate * dt).min(1.0);
    if loss <= 0.0 || shallow <= 0.0 {
        return;
    }

    grid.water.par_iter_mut().for_each(|w| {
        if *w > 0.0 && *w < shallow {
            *w -= *w * loss;
        }
    });
    grid.mark_dirty(DirtyFields::WATER);
}

#[cfg(test)]
mod tests {
    use super::*;
    use terraflow_simulation::{FluidKind, Fluids};

    #[test]
    fn water_flows_downhill() {
        let fluids = Fluids::new();
        let config = EngineConfig::default();
        let mut grid = TerrainGrid::new(8, 32.0).unwrap();
        // Terrain steps down from x=0 to x=7
        for z in 0..8 {
            for x in 0..8 {
                let i = grid.index(x, z);
                grid.rock[i] = (8 - x) as f32;
            }
        }
        let top = grid.index(1, 4);
        grid.water[top] = 2.0;

        let mut scratch = Scratch::default();
        for _ in 0..120 {
            flow(
                &mut grid,
                &mut scratch,
                fluids.get(FluidKind::Water),
                &config,
                1.0 / 60.0,
            );
        }

        let downhill: f64 = (0..8)
            .flat_map(|z| (4..8).map(move |x| (x, z)))
            .map(|(x, z)| grid.water[z * 8 + x] as f64)
            .sum();
        assert!(grid.water[top] < 2.0);
        assert!(downhill > 0.0);
    }

    #[test]
    fn sediment_travels_with_water() {
        let fluids = Fluids::new();
        let config = EngineConfig::default();
        let mut grid = TerrainGrid::new(8, 32.0).unwrap();
        for z in 0..8 {
            for x in 0..8 {
                let i = grid.index(x, z);
                grid.rock[i] = (8 - x) as f32;
            }
        }
        let top = grid.index(1, 4);
        grid.water[top] = 2.0;
        grid.sediment[top] = 1.0;

        let total_before = grid.total_sediment();
        let mut scratch = Scratch::default();
        for _ in 0..30 {
            flow(
                &mut grid,
                &mut scratch,
                fluids.get(FluidKind::Water),
                &config,
                1.0 / 60.0,
            );
        }

        assert!(grid.sediment[top] < 1.0);
        assert!((grid.total_sediment() - total_before).abs() < 1e-3);
        assert!(grid.sediment.iter().all(|&s| s >= 0.0));
    }

    #[test]
    fn only_shallow_water_evaporates() {
        let fluids = Fluids::new();
        let config = EngineConfig::default();
        let mut grid = TerrainGrid::new(8, 32.0).unwrap();
        grid.water[0] = 0.01; // shallow
        grid.water[1] = 5.0; // deep

        evaporate(&mut grid, fluids.get(FluidKind::Water), &config, 1.0);
        assert!(grid.water[0] < 0.01);
        assert_eq!(grid.water[1], 5.0);
    }
}
