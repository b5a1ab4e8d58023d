//! Height and normal queries over the terrain surface
//!
//! These answer per-pointer-move queries from the input layer and must
//! stay cheap: a handful of bilinear taps, no allocation.

use glam::{Vec2, Vec3};

use super::store::TerrainGrid;

impl TerrainGrid {
    /// Interpolated terrain height at a world position, or `None`
    /// outside the simulated domain.
    pub fn sample_height(&self, x: f32, z: f32) -> Option<f32> {
        if self.world_to_cell(Vec2::new(x, z)).is_none() {
            return None;
        }
        Some(self.sample_ground_clamped(x, z))
    }

    /// Terrain surface normal at a world position (y-up), or `None`
    /// outside the simulated domain.
    pub fn sample_normal(&self, x: f32, z: f32) -> Option<Vec3> {
        if self.world_to_cell(Vec2::new(x, z)).is_none() {
            return None;
        }
        let d = self.cell_size();
        let hl = self.sample_ground_clamped(x - d, z);
        let hr = self.sample_ground_clamped(x + d, z);
        let hb = self.sample_ground_clamped(x, z - d);
        let hf = self.sample_ground_clamped(x, z + d);
        Some(Vec3::new(hl - hr, 2.0 * d, hb - hf).normalize())
    }

    /// Fixed-step ray march against the terrain surface.
    ///
    /// The fallback hit test for pointer rays that miss the render mesh:
    /// a bounded linear search (capped distance and step count, one
    /// interpolation refinement), never recursive or open-ended.
    pub fn raymarch_height(
        &self,
        origin: Vec3,
        dir: Vec3,
        max_distance: f32,
        max_steps: u32,
    ) -> Option<Vec3> {
        if max_steps == 0 || !(max_distance > 0.0) {
            return None;
        }
        let dir = dir.normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }

        let step = max_distance / max_steps as f32;
        let mut prev_t = 0.0f32;
        let mut prev_delta: Option<f32> = None;

        for i in 0..=max_steps {
            let t = i as f32 * step;
            let p = origin + dir * t;
            let Some(h) = self.sample_height(p.x, p.z) else {
                prev_delta = None;
                prev_t = t;
                continue;
            };
            let delta = p.y - h;
            if delta <= 0.0 {
                // Crossed the surface; interpolate between the last
                // above-ground sample and this one.
                let t_hit = match prev_delta {
                    Some(d0) if d0 > 0.0 => {
                        prev_t + (t - prev_t) * d0 / (d0 - delta)
                    }
                    _ => t,
                };
                let hit = origin + dir * t_hit;
                let y = self.sample_height(hit.x, hit.z).unwrap_or(hit.y);
                return Some(Vec3::new(hit.x, y, hit.z));
            }
            prev_delta = Some(delta);
            prev_t = t;
        }
        None
    }

    /// Ground height with coordinates clamped into the domain; used for
    /// normals at the boundary.
    fn sample_ground_clamped(&self, x: f32, z: f32) -> f32 {
        let res = self.resolution();
        let fx = x / self.cell_size() - 0.5;
        let fz = z / self.cell_size() - 0.5;

        let fx = fx.clamp(0.0, (res - 1) as f32);
        let fz = fz.clamp(0.0, (res - 1) as f32);
        let x0 = fx as usize;
        let z0 = fz as usize;
        let x1 = (x0 + 1).min(res - 1);
        let z1 = (z0 + 1).min(res - 1);
        let tx = fx - x0 as f32;
        let tz = fz - z0 as f32;

        let a = self.ground_height_at(z0 * res + x0);
        let b = self.ground_height_at(z0 * res + x1);
        let c = self.ground_height_at(z1 * res + x0);
        let d = self.ground_height_at(z1 * res + x1);
        let top = a + (b - a) * tx;
        let bottom = c + (d - c) * tx;
        top + (bottom - top) * tz
    }
}
