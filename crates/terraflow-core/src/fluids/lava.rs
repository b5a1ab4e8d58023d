//! Lava flow, cooling, and solidification

use terraflow_simulation::FluidDef;

use crate::config::EngineConfig;
use crate::fluids::{pipe_flow, Scratch, MIN_DEPTH};
use crate::grid::{DirtyFields, TerrainGrid};

/// Flow multiplier for lava at a given temperature: 1.0 at emission
/// temperature, 0.0 at the solidification threshold.
fn mobility(heat: f32, solidify: f32, emit: f32) -> f32 {
    if emit <= solidify {
        return 1.0;
    }
    ((heat - solidify) / (emit - solidify)).clamp(0.0, 1.0)
}

/// Redistribute lava with temperature-dependent viscosity. Heat advects
/// with the moved mass (energy transport), so a hot tongue stays hot as
/// it runs out over cold ground.
pub(crate) fn flow(
    grid: &mut TerrainGrid,
    scratch: &mut Scratch,
    def: &FluidDef,
    config: &EngineConfig,
    dt: f32,
) {
    let res = grid.resolution();
    let n = grid.cell_count();
    let emit = def.emit_temperature.unwrap_or(1100.0);
    let solidify = def.solidify_temperature.unwrap_or(700.0);

    // Lava runs under any water, so its driving surface ignores it
    scratch.surface.clear();
    scratch
        .surface
        .extend((0..n).map(|i| grid.ground_height_at(i) + grid.lava[i]));

    scratch.mobility.clear();
    scratch
        .mobility
        .extend(grid.heat.iter().map(|&h| mobility(h, solidify, emit)));

    scratch.before.clear();
    scratch.before.extend_from_slice(&grid.lava);

    pipe_flow(
        res,
        dt,
        config.gravity * def.flow_rate,
        def.damping,
        &scratch.surface,
        Some(&scratch.mobility),
        &mut grid.lava,
        &mut grid.lava_flow_x,
        &mut grid.lava_flow_z,
        &mut scratch.delta,
        &mut scratch.transfers,
    );

    // Energy transport: moved mass carries its source temperature
    scratch.aux.clear();
    scratch.aux.resize(n, 0.0);
    for &(from, to, moved) in &scratch.transfers {
        let energy = moved * grid.heat[from];
        scratch.aux[from] -= energy;
        scratch.aux[to] += energy;
    }
    for i in 0..n {
        let depth = grid.lava[i];
        if depth > MIN_DEPTH {
            let energy = scratch.before[i] * grid.heat[i] + scratch.aux[i];
            grid.heat[i] = (energy / depth).clamp(0.0, emit);
        }
    }

    grid.mark_dirty(DirtyFields::LAVA | DirtyFields::HEAT);
}

/// Cool lava toward ambient; once it drops below the solidification
/// threshold the whole cell's lava converts irreversibly to static rock.
pub(crate) fn cool_and_solidify(
    grid: &mut TerrainGrid,
    def: &FluidDef,
    config: &EngineConfig,
    dt: f32,
) {
    let solidify = def.solidify_temperature.unwrap_or(700.0);
    let cooling = def.cooling_rate.unwrap_or(0.0);
    let ambient = config.ambient_temperature;

    let mut solidified = false;
    for ((lava, heat), solid) in grid
        .lava
        .iter_mut()
        .zip(grid.heat.iter_mut())
        .zip(grid.solid.iter_mut())
    {
        if *lava <= 0.0 {
            continue;
        }
        *heat = (*heat - cooling * dt).max(ambient);
        if *heat < solidify || *lava <= MIN_DEPTH {
            *solid += *lava;
            *lava = 0.0;
            *heat = 0.0;
            solidified = true;
        }
    }

    let mut dirty = DirtyFields::LAVA | DirtyFields::HEAT;
    if solidified {
        dirty |= DirtyFields::HEIGHT;
    }
    grid.mark_dirty(dirty);
}

#[cfg(test)]
mod tests {
    use super::*;
    use terraflow_simulation::{FluidKind, Fluids};

    #[test]
    fn mobility_spans_the_working_range() {
        assert_eq!(mobility(1100.0, 700.0, 1100.0), 1.0);
        assert_eq!(mobility(700.0, 700.0, 1100.0), 0.0);
        assert_eq!(mobility(400.0, 700.0, 1100.0), 0.0);
        let mid = mobility(900.0, 700.0, 1100.0);
        assert!(mid > 0.4 && mid < 0.6);
    }

    #[test]
    fn lava_below_threshold_becomes_rock() {
        let fluids = Fluids::new();
        let config = EngineConfig::default();
        let def = fluids.get(FluidKind::Lava);
        let mut grid = TerrainGrid::new(8, 32.0).unwrap();
        let i = grid.index(4, 4);
        grid.lava[i] = 2.0;
        grid.heat[i] = 600.0; // already below the 700 threshold

        let ground_before = grid.ground_height_at(i);
        cool_and_solidify(&mut grid, def, &config, 1.0 / 60.0);

        assert_eq!(grid.lava[i], 0.0);
        assert_eq!(grid.solid[i], 2.0);
        assert_eq!(grid.heat[i], 0.0);
        // The rock layer keeps the surface where the lava stood
        assert!((grid.ground_height_at(i) - ground_before).abs() < 1e-5);
    }

    #[test]
    fn hot_lava_survives_one_cooling_step() {
        let fluids = Fluids::new();
        let config = EngineConfig::default();
        let def = fluids.get(FluidKind::Lava);
        let mut grid = TerrainGrid::new(8, 32.0).unwrap();
        let i = grid.index(4, 4);
        grid.lava[i] = 2.0;
        grid.heat[i] = 1100.0;

        cool_and_solidify(&mut grid, def, &config, 1.0 / 60.0);
        assert!(grid.lava[i] > 0.0);
        assert!(grid.heat[i] < 1100.0);
    }

    #[test]
    fn heat_advects_with_flowing_lava() {
        let fluids = Fluids::new();
        let config = EngineConfig::default();
        let def = fluids.get(FluidKind::Lava);
        let mut grid = TerrainGrid::new(8, 32.0).unwrap();
        grid.rock.fill(10.0);
        let i = grid.index(4, 4);
        grid.lava[i] = 4.0;
        grid.heat[i] = 1100.0;

        let mut scratch = Scratch::default();
        for _ in 0..20 {
            flow(&mut grid, &mut scratch, def, &config, 1.0 / 60.0);
        }

        let j = grid.index(5, 4);
        assert!(grid.lava[j] > 0.0);
        assert!(grid.heat[j] > 900.0);
    }

    #[test]
    fn lava_total_is_conserved_by_flow() {
        let fluids = Fluids::new();
        let config = EngineConfig::default();
        let def = fluids.get(FluidKind::Lava);
        let mut grid = TerrainGrid::new(8, 32.0).unwrap();
        grid.rock.fill(10.0);
        let i = grid.index(4, 4);
        grid.lava[i] = 4.0;
        grid.heat[i] = 1100.0;

        let before = grid.total_lava();
        let mut scratch = Scratch::default();
        for _ in 0..60 {
            flow(&mut grid, &mut scratch, def, &config, 1.0 / 60.0);
        }
        assert!((grid.total_lava() - before).abs() < 1e-3);
    }
}
