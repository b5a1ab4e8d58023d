//! Persistent fluid emitters
//!
//! Sources inject mass every tick until explicitly removed. Injection is
//! purely additive and mass-exact over a small normalized kernel, so the
//! order sources apply in can never change the result.

use std::sync::{Arc, Mutex, MutexGuard};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use terraflow_simulation::{FluidKind, Fluids};

use crate::brush::Footprint;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::grid::{DirtyFields, TerrainGrid};

/// Stable identifier assigned by the creating layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub u64);

/// A persistent emitter: injects `rate` mass per second at `pos` until
/// removed. Sources never expire on their own.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub pos: Vec2,
    /// Emission rate in mass per second
    pub rate: f32,
    pub fluid: FluidKind,
}

/// Owns the live source list, keyed by id, in insertion order.
#[derive(Default)]
pub struct SourceManager {
    sources: Vec<Source>,
}

impl SourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a source, or update it in place when the id already exists.
    pub fn add(&mut self, source: Source) {
        if let Some(existing) = self.sources.iter_mut().find(|s| s.id == source.id) {
            *existing = source;
        } else {
            self.sources.push(source);
        }
    }

    /// Remove by id. Unknown ids are reported but harmless.
    pub fn remove(&mut self, id: SourceId) -> Result<(), EngineError> {
        let before = self.sources.len();
        self.sources.retain(|s| s.id != id);
        if self.sources.len() == before {
            Err(EngineError::SourceNotFound(id.0))
        } else {
            Ok(())
        }
    }

    /// Idempotent full replace of all sources of one fluid kind, used to
    /// sync a UI-owned list.
    pub fn set_all(&mut self, kind: FluidKind, list: Vec<Source>) {
        self.sources.retain(|s| s.fluid != kind);
        self.sources.extend(list.into_iter().filter(|s| s.fluid == kind));
    }

    pub fn get(&self, id: SourceId) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Inject `rate * dt` mass from every source, before the fluid
    /// stepper runs so fresh mass joins this tick's flow resolution.
    pub fn inject(&self, grid: &mut TerrainGrid, fluids: &Fluids, config: &EngineConfig, dt: f32) {
        if dt <= 0.0 {
            return;
        }

        let radius = config.source_radius * grid.cell_size();
        for source in &self.sources {
            let mass = source.rate.max(0.0) * dt;
            if mass <= 0.0 {
                continue;
            }
            let footprint = Footprint::circle_normalized(grid, source.pos, radius);
            if footprint.is_empty() {
                // Source parked outside the domain; nothing to do
                continue;
            }

            match source.fluid {
                FluidKind::Water => {
                    for &(x, z, w) in footprint.cells.iter() {
                        let i = grid.index(x, z);
                        grid.water[i] = (grid.water[i] + mass * w).min(config.max_fluid_depth);
                    }
                    grid.mark_dirty(DirtyFields::WATER);
                }
                FluidKind::Lava => {
                    let emit = fluids
                        .get(FluidKind::Lava)
                        .emit_temperature
                        .unwrap_or(1100.0);
                    for &(x, z, w) in footprint.cells.iter() {
                        let i = grid.index(x, z);
                        let add = (mass * w).min((config.max_fluid_depth - grid.lava[i]).max(0.0));
                        let total = grid.lava[i] + add;
                        if total > 0.0 {
                            grid.heat[i] = (grid.lava[i] * grid.heat[i] + add * emit) / total;
                        }
                        grid.lava[i] = total;
                    }
                    grid.mark_dirty(DirtyFields::LAVA | DirtyFields::HEAT);
                }
            }
        }
    }
}

/// Command stream from the UI context into the source manager. The only
/// source-mutation path that may interleave with the tick loop.
#[derive(Clone, Debug)]
pub enum SourceCommand {
    Add(Source),
    Remove(SourceId),
    SetAll(FluidKind, Vec<Source>),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clonable handle for the UI layer; commands are drained and applied at
/// the start of the next tick.
#[derive(Clone, Default)]
pub struct SourcePort {
    commands: Arc<Mutex<Vec<SourceCommand>>>,
}

impl SourcePort {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, source: Source) {
        lock(&self.commands).push(SourceCommand::Add(source));
    }

    pub fn remove(&self, id: SourceId) {
        lock(&self.commands).push(SourceCommand::Remove(id));
    }

    pub fn set_all(&self, kind: FluidKind, list: Vec<Source>) {
        lock(&self.commands).push(SourceCommand::SetAll(kind, list));
    }

    pub(crate) fn drain_into(&self, manager: &mut SourceManager) {
        for command in lock(&self.commands).drain(..) {
            match command {
                SourceCommand::Add(source) => manager.add(source),
                SourceCommand::Remove(id) => {
                    if let Err(err) = manager.remove(id) {
                        // Removing an already-gone source is a no-op
                        log::debug!("{err}");
                    }
                }
                SourceCommand::SetAll(kind, list) => manager.set_all(kind, list),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water_source(id: u64, x: f32, rate: f32) -> Source {
        Source {
            id: SourceId(id),
            pos: Vec2::new(x, 32.0),
            rate,
            fluid: FluidKind::Water,
        }
    }

    #[test]
    fn add_is_upsert_by_id() {
        let mut manager = SourceManager::new();
        manager.add(water_source(1, 10.0, 5.0));
        manager.add(water_source(1, 10.0, 9.0));
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.get(SourceId(1)).unwrap().rate, 9.0);
    }

    #[test]
    fn remove_unknown_id_is_reported_not_fatal() {
        let mut manager = SourceManager::new();
        assert_eq!(
            manager.remove(SourceId(7)),
            Err(EngineError::SourceNotFound(7))
        );
        assert!(manager.is_empty());
    }

    #[test]
    fn set_all_empty_twice_is_idempotent() {
        let mut manager = SourceManager::new();
        manager.add(water_source(1, 10.0, 5.0));
        manager.set_all(FluidKind::Water, vec![]);
        assert!(manager.is_empty());
        manager.set_all(FluidKind::Water, vec![]);
        assert!(manager.is_empty());
    }

    #[test]
    fn set_all_only_touches_its_kind() {
        let mut manager = SourceManager::new();
        manager.add(water_source(1, 10.0, 5.0));
        manager.add(Source {
            id: SourceId(2),
            pos: Vec2::new(40.0, 32.0),
            rate: 3.0,
            fluid: FluidKind::Lava,
        });

        manager.set_all(FluidKind::Water, vec![]);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.get(SourceId(2)).unwrap().fluid, FluidKind::Lava);
    }

    #[test]
    fn injection_is_mass_exact() {
        let config = EngineConfig::default();
        let fluids = Fluids::new();
        let mut grid = TerrainGrid::new(16, 64.0).unwrap();
        let mut manager = SourceManager::new();
        manager.add(water_source(1, 32.0, 6.0));

        manager.inject(&mut grid, &fluids, &config, 0.5);
        assert!((grid.total_water() - 3.0).abs() < 1e-4);
    }

    #[test]
    fn injection_order_commutes() {
        let config = EngineConfig::default();
        let fluids = Fluids::new();
        let a = water_source(1, 30.0, 6.0);
        let b = water_source(2, 34.0, 4.0); // overlapping footprints

        let mut grid_ab = TerrainGrid::new(16, 64.0).unwrap();
        let mut grid_ba = TerrainGrid::new(16, 64.0).unwrap();

        let mut m_ab = SourceManager::new();
        m_ab.add(a);
        m_ab.add(b);
        let mut m_ba = SourceManager::new();
        m_ba.add(b);
        m_ba.add(a);

        for _ in 0..10 {
            m_ab.inject(&mut grid_ab, &fluids, &config, 0.1);
            m_ba.inject(&mut grid_ba, &fluids, &config, 0.1);
        }

        for i in 0..grid_ab.cell_count() {
            assert!((grid_ab.water[i] - grid_ba.water[i]).abs() < 1e-5);
        }
    }

    #[test]
    fn out_of_domain_source_is_skipped() {
        let config = EngineConfig::default();
        let fluids = Fluids::new();
        let mut grid = TerrainGrid::new(16, 64.0).unwrap();
        let mut manager = SourceManager::new();
        manager.add(water_source(1, -50.0, 6.0));

        manager.inject(&mut grid, &fluids, &config, 1.0);
        assert_eq!(grid.total_water(), 0.0);
    }

    #[test]
    fn port_commands_apply_at_drain() {
        let port = SourcePort::new();
        let mut manager = SourceManager::new();

        port.add(water_source(1, 10.0, 5.0));
        port.remove(SourceId(99)); // unknown: silently ignored
        assert!(manager.is_empty());

        port.drain_into(&mut manager);
        assert_eq!(manager.len(), 1);
    }
}
