//! Lava/water contact resolution
//!
//! An irreversible, lossy exchange: water in contact with lava boils off
//! (removed outright, steam is not tracked), while the lava quenches -
//! rapid heat loss plus partial conversion to the solid rock layer.

use crate::config::EngineConfig;
use crate::fluids::MIN_DEPTH;
use crate::grid::{DirtyFields, TerrainGrid};

/// Contact weight contributed by each wet 4-neighbor, relative to water
/// sharing the cell itself
const NEIGHBOR_CONTACT: f32 = 0.25;

pub(crate) fn resolve(grid: &mut TerrainGrid, config: &EngineConfig, dt: f32) {
    let res = grid.resolution();
    let mut touched = false;

    for z in 0..res {
        for x in 0..res {
            let i = z * res + x;
            if grid.lava[i] <= MIN_DEPTH {
                continue;
            }

            let mut neighbors = [usize::MAX; 4];
            let mut neighbor_count = 0;
            if x > 0 {
                neighbors[neighbor_count] = i - 1;
                neighbor_count += 1;
            }
            if x + 1 < res {
                neighbors[neighbor_count] = i + 1;
                neighbor_count += 1;
            }
            if z > 0 {
                neighbors[neighbor_count] = i - res;
                neighbor_count += 1;
            }
            if z + 1 < res {
                neighbors[neighbor_count] = i + res;
                neighbor_count += 1;
            }

            let mut contact = 0.0f32;
            if grid.water[i] > MIN_DEPTH {
                contact += 1.0;
            }
            for &j in &neighbors[..neighbor_count] {
                if grid.water[j] > MIN_DEPTH {
                    contact += NEIGHBOR_CONTACT;
                }
            }
            if contact == 0.0 {
                continue;
            }
            touched = true;

            // Boil water off, nearest first
            let boil = config.boil_rate * dt;
            grid.water[i] = (grid.water[i] - boil).max(0.0);
            for &j in &neighbors[..neighbor_count] {
                grid.water[j] = (grid.water[j] - boil * NEIGHBOR_CONTACT).max(0.0);
            }

            // Quench and partially solidify the lava
            grid.heat[i] = (grid.heat[i] - config.quench_rate * dt * contact).max(0.0);
            let converted = grid.lava[i] * (config.contact_solidify_rate * dt * contact).min(1.0);
            grid.lava[i] -= converted;
            grid.solid[i] += converted;
        }
    }

    if touched {
        grid.mark_dirty(
            DirtyFields::WATER | DirtyFields::LAVA | DirtyFields::HEAT | DirtyFields::HEIGHT,
        );
    }
}
