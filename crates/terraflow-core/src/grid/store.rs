//! Terrain grid storage - structure-of-arrays per-cell fields

use glam::Vec2;

use crate::error::EngineError;

/// Smallest supported grid resolution (cells per axis)
pub const MIN_RESOLUTION: usize = 4;
/// Largest supported grid resolution (cells per axis)
pub const MAX_RESOLUTION: usize = 2048;

bitflags::bitflags! {
    /// Which field groups changed since the renderer last drained them
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DirtyFields: u8 {
        const HEIGHT   = 1 << 0;
        const WATER    = 1 << 1;
        const LAVA     = 1 << 2;
        const SEDIMENT = 1 << 3;
        const HEAT     = 1 << 4;
    }
}

/// Renderer-facing field selector
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridField {
    Rock,
    Soil,
    Solid,
    Water,
    Lava,
    Heat,
    Sediment,
    FlowX,
    FlowZ,
}

/// Additive per-cell change applied through [`TerrainGrid::mutate_cell`].
///
/// Material depths clamp at zero: excess negative delta is absorbed
/// silently (removing more soil than present removes all soil and stops,
/// it never borrows from rock).
#[derive(Clone, Copy, Debug, Default)]
pub struct CellDelta {
    pub soil: f32,
    pub rock: f32,
    pub solid: f32,
    pub water: f32,
    pub lava: f32,
    pub sediment: f32,
}

/// The simulation grid: a fixed `resolution × resolution` cell field
/// covering a square `world_size × world_size` meter domain.
pub struct TerrainGrid {
    resolution: usize,
    world_size: f32,
    cell_size: f32,

    /// Bedrock surface elevation (m)
    pub(crate) rock: Vec<f32>,
    /// Soil layer depth (m, >= 0)
    pub(crate) soil: Vec<f32>,
    /// Solidified-lava rock layer depth (m, >= 0)
    pub(crate) solid: Vec<f32>,
    /// Water depth (m, >= 0)
    pub(crate) water: Vec<f32>,
    /// Water flux through each cell's +x face (pipe model)
    pub(crate) flow_x: Vec<f32>,
    /// Water flux through each cell's +z face (pipe model)
    pub(crate) flow_z: Vec<f32>,
    /// Lava depth (m, >= 0)
    pub(crate) lava: Vec<f32>,
    /// Lava flux through each cell's +x face
    pub(crate) lava_flow_x: Vec<f32>,
    /// Lava flux through each cell's +z face
    pub(crate) lava_flow_z: Vec<f32>,
    /// Lava temperature (°C; meaningful only where lava > 0)
    pub(crate) heat: Vec<f32>,
    /// Suspended sediment mass (>= 0)
    pub(crate) sediment: Vec<f32>,

    dirty: DirtyFields,
}

impl TerrainGrid {
    /// Create a flat grid at the given resolution.
    ///
    /// Fails with [`EngineError::InvalidResolution`] when `resolution` is
    /// not a power of two within `MIN_RESOLUTION..=MAX_RESOLUTION`.
    pub fn new(resolution: usize, world_size: f32) -> Result<Self, EngineError> {
        if !Self::is_supported_resolution(resolution) {
            return Err(EngineError::InvalidResolution(resolution));
        }
        Ok(Self::alloc(resolution, world_size))
    }

    pub fn is_supported_resolution(resolution: usize) -> bool {
        resolution.is_power_of_two() && (MIN_RESOLUTION..=MAX_RESOLUTION).contains(&resolution)
    }

    fn alloc(resolution: usize, world_size: f32) -> Self {
        let n = resolution * resolution;
        Self {
            resolution,
            world_size,
            cell_size: world_size / resolution as f32,
            rock: vec![0.0; n],
            soil: vec![0.0; n],
            solid: vec![0.0; n],
            water: vec![0.0; n],
            flow_x: vec![0.0; n],
            flow_z: vec![0.0; n],
            lava: vec![0.0; n],
            lava_flow_x: vec![0.0; n],
            lava_flow_z: vec![0.0; n],
            heat: vec![0.0; n],
            sediment: vec![0.0; n],
            dirty: DirtyFields::all(),
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn world_size(&self) -> f32 {
        self.world_size
    }

    /// Edge length of one cell in meters
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn cell_count(&self) -> usize {
        self.resolution * self.resolution
    }

    #[inline]
    pub fn index(&self, x: usize, z: usize) -> usize {
        debug_assert!(x < self.resolution && z < self.resolution);
        z * self.resolution + x
    }

    /// Terrain surface height: rock elevation plus soil and solidified
    /// lava layers. Fluids sit on top of this.
    #[inline]
    pub fn ground_height_at(&self, i: usize) -> f32 {
        self.rock[i] + self.soil[i] + self.solid[i]
    }

    /// Free surface height including both fluid layers
    #[inline]
    pub fn surface_height_at(&self, i: usize) -> f32 {
        self.ground_height_at(i) + self.lava[i] + self.water[i]
    }

    /// Map a world position to the containing cell, or `None` outside the
    /// simulated domain.
    pub fn world_to_cell(&self, pos: Vec2) -> Option<(usize, usize)> {
        if !pos.x.is_finite() || !pos.y.is_finite() {
            return None;
        }
        if pos.x < 0.0 || pos.y < 0.0 || pos.x >= self.world_size || pos.y >= self.world_size {
            return None;
        }
        let x = (pos.x / self.cell_size) as usize;
        let z = (pos.y / self.cell_size) as usize;
        Some((x.min(self.resolution - 1), z.min(self.resolution - 1)))
    }

    /// World-space center of a cell
    pub fn cell_center(&self, x: usize, z: usize) -> Vec2 {
        Vec2::new(
            (x as f32 + 0.5) * self.cell_size,
            (z as f32 + 0.5) * self.cell_size,
        )
    }

    /// Apply an additive change to one cell's layers and fluids.
    ///
    /// Depth fields clamp at zero; non-finite components are ignored.
    /// Lava temperature is untouched - callers injecting lava blend heat
    /// themselves, since temperature is intensive rather than additive.
    pub fn mutate_cell(&mut self, x: usize, z: usize, delta: &CellDelta) {
        if x >= self.resolution || z >= self.resolution {
            return;
        }
        let i = self.index(x, z);
        let mut dirty = DirtyFields::empty();

        if delta.soil.is_finite() && delta.soil != 0.0 {
            self.soil[i] = (self.soil[i] + delta.soil).max(0.0);
            dirty |= DirtyFields::HEIGHT;
        }
        if delta.rock.is_finite() && delta.rock != 0.0 {
            self.rock[i] = (self.rock[i] + delta.rock).max(0.0);
            dirty |= DirtyFields::HEIGHT;
        }
        if delta.solid.is_finite() && delta.solid != 0.0 {
            self.solid[i] = (self.solid[i] + delta.solid).max(0.0);
            dirty |= DirtyFields::HEIGHT;
        }
        if delta.water.is_finite() && delta.water != 0.0 {
            self.water[i] = (self.water[i] + delta.water).max(0.0);
            dirty |= DirtyFields::WATER;
        }
        if delta.lava.is_finite() && delta.lava != 0.0 {
            self.lava[i] = (self.lava[i] + delta.lava).max(0.0);
            dirty |= DirtyFields::LAVA;
        }
        if delta.sediment.is_finite() && delta.sediment != 0.0 {
            self.sediment[i] = (self.sediment[i] + delta.sediment).max(0.0);
            dirty |= DirtyFields::SEDIMENT;
        }

        self.dirty |= dirty;
    }

    /// Reallocate the grid at a new resolution, resampling the persistent
    /// fields bilinearly so terrain shape is preserved. Flux fields reset.
    ///
    /// On failure the existing grid is untouched.
    pub fn resize(&mut self, resolution: usize) -> Result<(), EngineError> {
        if !Self::is_supported_resolution(resolution) {
            return Err(EngineError::InvalidResolution(resolution));
        }
        if resolution == self.resolution {
            return Ok(());
        }

        let mut next = Self::alloc(resolution, self.world_size);
        let old_res = self.resolution;
        let scale = old_res as f32 / resolution as f32;

        for z in 0..resolution {
            for x in 0..resolution {
                // Sample the old field at this cell center's position
                let fx = (x as f32 + 0.5) * scale - 0.5;
                let fz = (z as f32 + 0.5) * scale - 0.5;
                let i = z * resolution + x;
                next.rock[i] = Self::sample_bilinear(&self.rock, old_res, fx, fz);
                next.soil[i] = Self::sample_bilinear(&self.soil, old_res, fx, fz);
                next.solid[i] = Self::sample_bilinear(&self.solid, old_res, fx, fz);
                next.water[i] = Self::sample_bilinear(&self.water, old_res, fx, fz);
                next.lava[i] = Self::sample_bilinear(&self.lava, old_res, fx, fz);
                next.heat[i] = Self::sample_bilinear(&self.heat, old_res, fx, fz);
                next.sediment[i] = Self::sample_bilinear(&self.sediment, old_res, fx, fz);
            }
        }

        *self = next;
        log::info!("grid resized to {res}x{res}", res = resolution);
        Ok(())
    }

    /// Bilinear sample of a flat field; `fx`/`fz` in cell units with cell
    /// centers at integer coordinates, clamped to the field edge.
    pub(crate) fn sample_bilinear(field: &[f32], res: usize, fx: f32, fz: f32) -> f32 {
        let fx = fx.clamp(0.0, (res - 1) as f32);
        let fz = fz.clamp(0.0, (res - 1) as f32);
        let x0 = fx as usize;
        let z0 = fz as usize;
        let x1 = (x0 + 1).min(res - 1);
        let z1 = (z0 + 1).min(res - 1);
        let tx = fx - x0 as f32;
        let tz = fz - z0 as f32;

        let a = field[z0 * res + x0];
        let b = field[z0 * res + x1];
        let c = field[z1 * res + x0];
        let d = field[z1 * res + x1];
        let top = a + (b - a) * tx;
        let bottom = c + (d - c) * tx;
        top + (bottom - top) * tz
    }

    // --- Mass totals (depth sums; cell area is constant per grid) ---

    pub fn total_water(&self) -> f64 {
        self.water.iter().map(|&w| w as f64).sum()
    }

    pub fn total_lava(&self) -> f64 {
        self.lava.iter().map(|&l| l as f64).sum()
    }

    pub fn total_soil(&self) -> f64 {
        self.soil.iter().map(|&s| s as f64).sum()
    }

    pub fn total_sediment(&self) -> f64 {
        self.sediment.iter().map(|&s| s as f64).sum()
    }

    /// Estimated resident memory of all field storage, in bytes
    pub fn estimated_bytes(&self) -> usize {
        11 * self.cell_count() * std::mem::size_of::<f32>()
    }

    // --- Renderer-facing read access ---

    /// Read-only slice of one field, the source data for GPU textures
    pub fn field(&self, field: GridField) -> &[f32] {
        match field {
            GridField::Rock => &self.rock,
            GridField::Soil => &self.soil,
            GridField::Solid => &self.solid,
            GridField::Water => &self.water,
            GridField::Lava => &self.lava,
            GridField::Heat => &self.heat,
            GridField::Sediment => &self.sediment,
            GridField::FlowX => &self.flow_x,
            GridField::FlowZ => &self.flow_z,
        }
    }

    /// Raw byte view of one field, for direct texture upload
    pub fn field_bytes(&self, field: GridField) -> &[u8] {
        bytemuck::cast_slice(self.field(field))
    }

    /// Fields changed since the last drain; clears the set.
    pub fn take_dirty(&mut self) -> DirtyFields {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self, flags: DirtyFields) {
        self.dirty |= flags;
    }

    /// Per-cell flow vector derived from the face fluxes
    pub fn flow_vector(&self, x: usize, z: usize) -> Vec2 {
        let i = self.index(x, z);
        let left = if x > 0 { self.flow_x[i - 1] } else { 0.0 };
        let up = if z > 0 { self.flow_z[i - self.resolution] } else { 0.0 };
        Vec2::new((left + self.flow_x[i]) * 0.5, (up + self.flow_z[i]) * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_grid(resolution: usize, height: f32) -> TerrainGrid {
        let mut grid = TerrainGrid::new(resolution, 64.0).unwrap();
        grid.rock.fill(height);
        grid
    }

    #[test]
    fn rejects_unsupported_resolutions() {
        assert!(TerrainGrid::new(0, 64.0).is_err());
        assert!(TerrainGrid::new(3, 64.0).is_err());
        assert!(TerrainGrid::new(100, 64.0).is_err());
        assert!(TerrainGrid::new(4096, 64.0).is_err());
        assert!(TerrainGrid::new(4, 64.0).is_ok());
        assert!(TerrainGrid::new(256, 64.0).is_ok());
    }

    #[test]
    fn mutate_clamps_soil_at_zero() {
        let mut grid = flat_grid(4, 10.0);
        let i = grid.index(1, 1);
        grid.soil[i] = 2.0;

        // Removing more soil than present removes all soil and stops;
        // rock is untouched.
        grid.mutate_cell(
            1,
            1,
            &CellDelta {
                soil: -5.0,
                ..Default::default()
            },
        );
        assert_eq!(grid.soil[i], 0.0);
        assert_eq!(grid.rock[i], 10.0);
    }

    #[test]
    fn mutate_ignores_non_finite_components() {
        let mut grid = flat_grid(4, 10.0);
        grid.mutate_cell(
            0,
            0,
            &CellDelta {
                water: f32::NAN,
                soil: 1.0,
                ..Default::default()
            },
        );
        assert_eq!(grid.water[0], 0.0);
        assert_eq!(grid.soil[0], 1.0);
    }

    #[test]
    fn world_to_cell_bounds() {
        let grid = TerrainGrid::new(8, 64.0).unwrap();
        assert_eq!(grid.world_to_cell(Vec2::new(0.0, 0.0)), Some((0, 0)));
        assert_eq!(grid.world_to_cell(Vec2::new(63.9, 63.9)), Some((7, 7)));
        assert_eq!(grid.world_to_cell(Vec2::new(-0.1, 1.0)), None);
        assert_eq!(grid.world_to_cell(Vec2::new(64.0, 1.0)), None);
        assert_eq!(grid.world_to_cell(Vec2::new(f32::NAN, 1.0)), None);
    }

    #[test]
    fn resize_preserves_flat_terrain() {
        let mut grid = flat_grid(16, 12.0);
        grid.resize(32).unwrap();
        assert_eq!(grid.resolution(), 32);
        for z in 0..32 {
            for x in 0..32 {
                let i = grid.index(x, z);
                assert!((grid.ground_height_at(i) - 12.0).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn resize_round_trip_reproduces_heightfield() {
        let mut grid = TerrainGrid::new(32, 64.0).unwrap();
        // A smooth slope survives down-and-back resampling
        for z in 0..32 {
            for x in 0..32 {
                let i = grid.index(x, z);
                grid.rock[i] = 10.0 + x as f32 * 0.25 + z as f32 * 0.125;
            }
        }
        let before: Vec<f32> = (0..grid.cell_count())
            .map(|i| grid.ground_height_at(i))
            .collect();

        grid.resize(64).unwrap();
        grid.resize(32).unwrap();

        for (i, &h) in before.iter().enumerate() {
            assert!(
                (grid.ground_height_at(i) - h).abs() < 0.1,
                "cell {i}: {} vs {h}",
                grid.ground_height_at(i)
            );
        }
    }

    #[test]
    fn resize_failure_retains_grid() {
        let mut grid = flat_grid(16, 5.0);
        grid.soil[0] = 1.5;
        assert_eq!(grid.resize(100), Err(EngineError::InvalidResolution(100)));
        assert_eq!(grid.resolution(), 16);
        assert_eq!(grid.soil[0], 1.5);
    }

    #[test]
    fn dirty_flags_accumulate_and_drain() {
        let mut grid = flat_grid(4, 1.0);
        grid.take_dirty();
        assert_eq!(grid.take_dirty(), DirtyFields::empty());

        grid.mutate_cell(
            0,
            0,
            &CellDelta {
                water: 1.0,
                ..Default::default()
            },
        );
        assert_eq!(grid.take_dirty(), DirtyFields::WATER);
    }

    #[test]
    fn field_bytes_match_field_len() {
        let grid = flat_grid(8, 0.0);
        let floats = grid.field(GridField::Water).len();
        assert_eq!(grid.field_bytes(GridField::Water).len(), floats * 4);
    }
}
