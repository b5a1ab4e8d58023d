//! Circular falloff kernels for brush and source footprints

use glam::Vec2;
use smallvec::SmallVec;

use crate::grid::TerrainGrid;

/// The set of cells touched by one brush application, with per-cell
/// falloff weights. Weight is 1.0 at the center and quartic-smooth to
/// 0.0 at the radius.
pub struct Footprint {
    pub cells: SmallVec<[(usize, usize, f32); 32]>,
}

impl Footprint {
    /// Collect cells within `radius` of `center`. A radius smaller than a
    /// cell still touches the containing cell at full weight, so a
    /// minimal brush always does something.
    pub fn circle(grid: &TerrainGrid, center: Vec2, radius: f32) -> Self {
        let mut cells = SmallVec::new();
        let res = grid.resolution();
        let cell_size = grid.cell_size();

        if radius < cell_size * 0.5 {
            if let Some((x, z)) = grid.world_to_cell(center) {
                cells.push((x, z, 1.0));
            }
            return Self { cells };
        }

        let min_x = ((center.x - radius) / cell_size).floor().max(0.0) as usize;
        let min_z = ((center.y - radius) / cell_size).floor().max(0.0) as usize;
        let max_x = (((center.x + radius) / cell_size).ceil() as usize).min(res);
        let max_z = (((center.y + radius) / cell_size).ceil() as usize).min(res);

        for z in min_z..max_z {
            for x in min_x..max_x {
                let d = grid.cell_center(x, z).distance(center);
                if d <= radius {
                    let t = d / radius;
                    let falloff = (1.0 - t * t).max(0.0);
                    cells.push((x, z, falloff * falloff));
                }
            }
        }
        Self { cells }
    }

    /// As [`Footprint::circle`], with weights normalized to sum to 1 so a
    /// known total mass can be spread exactly across the footprint.
    pub fn circle_normalized(grid: &TerrainGrid, center: Vec2, radius: f32) -> Self {
        let mut footprint = Self::circle(grid, center, radius);
        let total: f32 = footprint.cells.iter().map(|&(_, _, w)| w).sum();
        if total > 0.0 {
            for cell in footprint.cells.iter_mut() {
                cell.2 /= total;
            }
        }
        footprint
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
