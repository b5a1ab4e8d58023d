//! Initial terrain generation
//!
//! Seeded noise layers fill a grid with a rock heightfield and a soil
//! cover before the first tick. Engines can also start flat; generation
//! is a setup step, never part of the tick loop.

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::grid::{DirtyFields, TerrainGrid};

/// Parameters for the generated heightfield. Serializable so presets can
/// ship alongside the engine config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainParams {
    /// Mean rock elevation (m)
    pub base_height: f32,
    /// Hill amplitude around the base (m)
    pub height_scale: f32,
    /// Noise frequency per meter
    pub frequency: f32,
    /// FBm octave count
    pub octaves: i32,
    /// Maximum soil cover depth (m)
    pub soil_depth: f32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            base_height: 20.0,
            height_scale: 12.0,
            frequency: 0.008,
            octaves: 4,
            soil_depth: 2.5,
        }
    }
}

/// Noise-layer terrain generator. Same seed + params = same terrain.
pub struct TerrainGenerator {
    seed: u64,
    params: TerrainParams,
    rock_noise: FastNoiseLite,
    soil_noise: FastNoiseLite,
}

impl TerrainGenerator {
    pub fn new(seed: u64) -> Self {
        Self::from_params(seed, TerrainParams::default())
    }

    pub fn from_params(seed: u64, params: TerrainParams) -> Self {
        // Derive uncorrelated per-layer seeds from the world seed
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let rock_noise = Self::make_noise(rng.next_u32() as i32, params.frequency, params.octaves);
        let soil_noise = Self::make_noise(
            rng.next_u32() as i32,
            params.frequency * 2.0,
            (params.octaves - 1).max(1),
        );
        Self {
            seed,
            params,
            rock_noise,
            soil_noise,
        }
    }

    fn make_noise(seed: i32, frequency: f32, octaves: i32) -> FastNoiseLite {
        let mut noise = FastNoiseLite::with_seed(seed);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(frequency));
        noise.set_fractal_type(Some(FractalType::FBm));
        noise.set_fractal_octaves(Some(octaves));
        noise
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Fill the grid with fresh terrain. All fluid and sediment state is
    /// cleared; the result is a dry landscape.
    pub fn generate(&self, grid: &mut TerrainGrid) {
        let res = grid.resolution();
        for z in 0..res {
            for x in 0..res {
                let i = z * res + x;
                let pos = grid.cell_center(x, z);

                let n = self.rock_noise.get_noise_2d(pos.x, pos.y);
                grid.rock[i] =
                    (self.params.base_height + n * self.params.height_scale).max(0.0);

                let s = self.soil_noise.get_noise_2d(pos.x, pos.y);
                grid.soil[i] = (s * 0.5 + 0.5).max(0.0) * self.params.soil_depth;

                grid.solid[i] = 0.0;
                grid.water[i] = 0.0;
                grid.flow_x[i] = 0.0;
                grid.flow_z[i] = 0.0;
                grid.lava[i] = 0.0;
                grid.lava_flow_x[i] = 0.0;
                grid.lava_flow_z[i] = 0.0;
                grid.heat[i] = 0.0;
                grid.sediment[i] = 0.0;
            }
        }
        grid.mark_dirty(DirtyFields::all());
        log::info!(
            "generated {res}x{res} terrain, seed {seed}",
            seed = self.seed
        );
    }
}
