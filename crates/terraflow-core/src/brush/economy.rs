//! Brush queue and apply logic
//!
//! Capacity/empty checks run before any grid mutation, so at most the
//! available mass is ever transferred - there is no overdraft path.

use std::sync::{Arc, Mutex, MutexGuard};

use smallvec::SmallVec;
use terraflow_simulation::{Fluids, HandMaterial};

use crate::brush::kernel::Footprint;
use crate::brush::op::{BrushKind, BrushOp};
use crate::brush::Hand;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::grid::{DirtyFields, TerrainGrid};

/// Lock that survives a poisoned mutex; a panicking enqueuer must never
/// take the tick loop down with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clonable handle the input layer uses to reach the brush queue and the
/// hand. Handed out by the engine (explicit dependency injection); safe
/// to use from an input context that interleaves with the tick loop.
#[derive(Clone)]
pub struct BrushPort {
    ops: Arc<Mutex<Vec<BrushOp>>>,
    hand: Arc<Mutex<Hand>>,
}

impl BrushPort {
    pub(crate) fn new(hand: Hand) -> Self {
        Self {
            ops: Arc::new(Mutex::new(Vec::new())),
            hand: Arc::new(Mutex::new(hand)),
        }
    }

    /// Append an op to the per-tick queue. Non-blocking; the op is
    /// applied in FIFO order during the next scheduler tick.
    pub fn enqueue(&self, op: BrushOp) {
        lock(&self.ops).push(op);
    }

    /// Number of ops waiting for the next tick
    pub fn queued(&self) -> usize {
        lock(&self.ops).len()
    }

    /// Snapshot of the hand state, for UI feedback
    pub fn hand(&self) -> Hand {
        *lock(&self.hand)
    }

    pub fn set_hand_capacity(&self, capacity: f32) {
        lock(&self.hand).set_capacity(capacity);
    }

    /// Explicit user action: drop everything carried.
    pub fn reset_hand(&self) {
        lock(&self.hand).reset();
    }

    pub(crate) fn drain(&self) -> Vec<BrushOp> {
        std::mem::take(&mut *lock(&self.ops))
    }

    pub(crate) fn with_hand<R>(&self, f: impl FnOnce(&mut Hand) -> R) -> R {
        f(&mut lock(&self.hand))
    }
}

/// Apply one brush op against the grid and hand.
pub(crate) fn apply_op(
    grid: &mut TerrainGrid,
    hand: &mut Hand,
    fluids: &Fluids,
    op: BrushOp,
    config: &EngineConfig,
) -> Result<(), EngineError> {
    let op = op.sanitized();
    let budget = op.strength * op.dt;
    if budget <= 0.0 {
        return Ok(());
    }

    let footprint = Footprint::circle(grid, op.pos, op.radius);
    if footprint.is_empty() {
        return Ok(());
    }

    match op.effective_kind() {
        BrushKind::Raise => {
            for &(x, z, w) in footprint.cells.iter() {
                let i = grid.index(x, z);
                grid.soil[i] += budget * w;
            }
            grid.mark_dirty(DirtyFields::HEIGHT);
            Ok(())
        }
        BrushKind::Lower => {
            for &(x, z, w) in footprint.cells.iter() {
                let i = grid.index(x, z);
                grid.soil[i] = (grid.soil[i] - budget * w).max(0.0);
            }
            grid.mark_dirty(DirtyFields::HEIGHT);
            Ok(())
        }
        BrushKind::Smooth => {
            smooth(grid, &footprint, budget);
            Ok(())
        }
        BrushKind::Water => {
            for &(x, z, w) in footprint.cells.iter() {
                let i = grid.index(x, z);
                if op.invert {
                    grid.water[i] = (grid.water[i] - budget * w).max(0.0);
                } else {
                    grid.water[i] = (grid.water[i] + budget * w).min(config.max_fluid_depth);
                }
            }
            grid.mark_dirty(DirtyFields::WATER);
            Ok(())
        }
        BrushKind::Pickup(material) => pickup(grid, hand, material, &footprint, budget, config),
        BrushKind::Deposit(material) => {
            deposit(grid, hand, fluids, material, &footprint, budget, config)
        }
    }
}

fn pickup(
    grid: &mut TerrainGrid,
    hand: &mut Hand,
    material: HandMaterial,
    footprint: &Footprint,
    budget: f32,
    config: &EngineConfig,
) -> Result<(), EngineError> {
    // All rejection checks come before any mutation.
    if hand.material() != material {
        if hand.is_empty(config.hand_empty_fraction) {
            hand.rebind(material);
        } else {
            return Err(EngineError::HandFull);
        }
    }
    if hand.is_full(config.hand_full_fraction) {
        return Err(EngineError::HandFull);
    }

    let mut removable: SmallVec<[(usize, f32); 32]> = SmallVec::new();
    let mut total = 0.0f32;
    for &(x, z, w) in footprint.cells.iter() {
        let i = grid.index(x, z);
        let available = match material {
            HandMaterial::Soil => grid.soil[i],
            HandMaterial::Rock => grid.rock[i],
            HandMaterial::Lava => grid.lava[i],
        };
        let amount = (budget * w).min(available);
        if amount > 0.0 {
            removable.push((i, amount));
            total += amount;
        }
    }
    if total <= 0.0 {
        return Ok(());
    }

    let scale = (hand.free_space() / total).min(1.0);
    let mut applied = 0.0f32;
    for &(i, amount) in removable.iter() {
        let amount = amount * scale;
        match material {
            HandMaterial::Soil => grid.soil[i] -= amount,
            HandMaterial::Rock => grid.rock[i] -= amount,
            HandMaterial::Lava => grid.lava[i] -= amount,
        }
        applied += amount;
    }
    hand.store(applied);
    grid.mark_dirty(match material {
        HandMaterial::Lava => DirtyFields::LAVA,
        _ => DirtyFields::HEIGHT,
    });
    Ok(())
}

fn deposit(
    grid: &mut TerrainGrid,
    hand: &mut Hand,
    fluids: &Fluids,
    material: HandMaterial,
    footprint: &Footprint,
    budget: f32,
    config: &EngineConfig,
) -> Result<(), EngineError> {
    if hand.material() != material || hand.is_empty(config.hand_empty_fraction) {
        return Err(EngineError::HandEmpty);
    }

    let mut accepts: SmallVec<[(usize, f32); 32]> = SmallVec::new();
    let mut total = 0.0f32;
    for &(x, z, w) in footprint.cells.iter() {
        let i = grid.index(x, z);
        let want = budget * w;
        // Terrain layers accept unbounded deposits; fluid columns cap out.
        let accept = match material {
            HandMaterial::Soil | HandMaterial::Rock => want,
            HandMaterial::Lava => want.min((config.max_fluid_depth - grid.lava[i]).max(0.0)),
        };
        if accept > 0.0 {
            accepts.push((i, accept));
            total += accept;
        }
    }
    if total <= 0.0 {
        return Ok(());
    }

    let scale = (hand.carried() / total).min(1.0);
    let emit_temp = fluids
        .get(terraflow_simulation::FluidKind::Lava)
        .emit_temperature
        .unwrap_or(1100.0);

    let mut applied = 0.0f32;
    for &(i, accept) in accepts.iter() {
        let amount = accept * scale;
        match material {
            HandMaterial::Soil => grid.soil[i] += amount,
            HandMaterial::Rock => grid.rock[i] += amount,
            HandMaterial::Lava => {
                // Intensive blend: carried lava arrives at emit temperature
                let mass = grid.lava[i] + amount;
                if mass > 0.0 {
                    grid.heat[i] = (grid.lava[i] * grid.heat[i] + amount * emit_temp) / mass;
                }
                grid.lava[i] = mass;
            }
        }
        applied += amount;
    }
    hand.take(applied);
    grid.mark_dirty(match material {
        HandMaterial::Lava => DirtyFields::LAVA | DirtyFields::HEAT,
        _ => DirtyFields::HEIGHT,
    });
    Ok(())
}

/// Kernel-weighted Laplacian blur of the terrain surface, applied
/// through the soil layer (it fills dips and shaves bumps but cannot cut
/// below the soil).
fn smooth(grid: &mut TerrainGrid, footprint: &Footprint, budget: f32) {
    let res = grid.resolution();

    // Gather targets from the pre-op surface so cell order cannot bias
    // the blur.
    let mut deltas: SmallVec<[(usize, f32); 32]> = SmallVec::new();
    for &(x, z, w) in footprint.cells.iter() {
        let i = grid.index(x, z);
        let h = grid.ground_height_at(i);

        let mut sum = 0.0f32;
        let mut count = 0.0f32;
        if x > 0 {
            sum += grid.ground_height_at(i - 1);
            count += 1.0;
        }
        if x + 1 < res {
            sum += grid.ground_height_at(i + 1);
            count += 1.0;
        }
        if z > 0 {
            sum += grid.ground_height_at(i - res);
            count += 1.0;
        }
        if z + 1 < res {
            sum += grid.ground_height_at(i + res);
            count += 1.0;
        }
        if count == 0.0 {
            continue;
        }

        let target = sum / count;
        let blend = (budget * w).min(1.0);
        deltas.push((i, (target - h) * blend));
    }

    for &(i, delta) in deltas.iter() {
        if delta >= 0.0 {
            grid.soil[i] += delta;
        } else {
            grid.soil[i] = (grid.soil[i] + delta).max(0.0);
        }
    }
    grid.mark_dirty(DirtyFields::HEIGHT);
}
