//! Sediment erosion and deposition
//!
//! Flowing water carries soil up to a flow-proportional capacity: below
//! capacity it strips the soil layer into suspension, above it the
//! surplus settles back out. Still water drops everything.

use terraflow_simulation::{MaterialKind, Materials};

use crate::config::EngineConfig;
use crate::fluids::MIN_DEPTH;
use crate::grid::{DirtyFields, TerrainGrid};

pub(crate) fn exchange(
    grid: &mut TerrainGrid,
    materials: &Materials,
    config: &EngineConfig,
    dt: f32,
) {
    let res = grid.resolution();
    let erodibility = materials.get(MaterialKind::Soil).erodibility;

    let TerrainGrid {
        ref mut soil,
        ref mut sediment,
        ref water,
        ref flow_x,
        ref flow_z,
        ..
    } = *grid;

    for z in 0..res {
        for x in 0..res {
            let i = z * res + x;
            let depth = water[i];

            if depth <= MIN_DEPTH {
                // No carrier: everything settles out immediately
                if sediment[i] > 0.0 {
                    soil[i] += sediment[i];
                    sediment[i] = 0.0;
                }
                continue;
            }

            let left = if x > 0 { flow_x[i - 1] } else { 0.0 };
            let up = if z > 0 { flow_z[i - res] } else { 0.0 };
            let vx = (left + flow_x[i]) * 0.5;
            let vz = (up + flow_z[i]) * 0.5;
            let speed = (vx * vx + vz * vz).sqrt();

            let capacity = config.sediment_capacity * speed * depth.min(1.0);
            let suspended = sediment[i];

            if suspended < capacity {
                let eroded = ((capacity - suspended) * config.erosion_rate * erodibility * dt)
                    .min(soil[i]);
                if eroded > 0.0 {
                    soil[i] -= eroded;
                    sediment[i] += eroded;
                }
            } else {
                let settled = ((suspended - capacity) * config.deposition_rate * dt).min(suspended);
                if settled > 0.0 {
                    sediment[i] -= settled;
                    soil[i] += settled;
                }
            }
        }
    }

    grid.mark_dirty(DirtyFields::HEIGHT | DirtyFields::SEDIMENT);
}
