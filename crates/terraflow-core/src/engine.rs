//! Engine facade - run state, scheduling, and the tick loop
//!
//! One logical simulation timeline: ticks execute one at a time, and a
//! tick is atomic from the perspective of readers. The brush and source
//! ports are the only paths that may interleave with the tick loop; all
//! other mutation happens through `&mut Engine` on the owning thread.

use glam::Vec3;
use terraflow_simulation::{Fluids, HandMaterial, Materials};
use web_time::Instant;

use crate::brush::{self, BrushPort, Hand};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fluids::FluidStepper;
use crate::grid::{compute_overlay, OverlayKind, TerrainGrid};
use crate::perf::{GpuTimings, PerfSample, PerfSink};
use crate::quality::{QualityOpts, QualityUpdate};
use crate::sources::{Source, SourceId, SourceManager, SourcePort};
use crate::worldgen::TerrainGenerator;

/// Catch-up ticks allowed per `update` call. When the host frame rate
/// dips the simulation slows down instead of spiraling.
const MAX_STEPS_PER_FRAME: u32 = 2;

/// Scheduler run state, toggled by the host
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RunState {
    Paused,
    #[default]
    Running,
}

/// The simulation engine: owns the grid and every component that touches
/// it.
pub struct Engine {
    config: EngineConfig,
    materials: Materials,
    fluids: Fluids,
    grid: TerrainGrid,
    stepper: FluidStepper,

    brush: BrushPort,
    sources: SourceManager,
    source_port: SourcePort,

    quality: QualityOpts,
    /// Fenced resolution change, applied before the next tick
    pending_resolution: Option<usize>,
    run_state: RunState,
    time_scale: f32,
    time_accumulator: f32,

    frame: u64,
    sinks: Vec<Box<dyn PerfSink>>,
    pending_gpu: Option<GpuTimings>,

    overlay: OverlayKind,
    overlay_buf: Vec<f32>,
    rejections: Vec<EngineError>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let grid = TerrainGrid::new(config.default_resolution, config.world_size)?;
        let quality = QualityOpts {
            sim_resolution: config.default_resolution,
            ..QualityOpts::default()
        };
        let brush = BrushPort::new(Hand::new(HandMaterial::Soil, config.hand_capacity));
        Ok(Self {
            materials: Materials::new(),
            fluids: Fluids::new(),
            grid,
            stepper: FluidStepper::new(),
            brush,
            sources: SourceManager::new(),
            source_port: SourcePort::new(),
            quality,
            pending_resolution: None,
            run_state: RunState::default(),
            time_scale: 1.0,
            time_accumulator: 0.0,
            frame: 0,
            sinks: Vec::new(),
            pending_gpu: None,
            overlay: OverlayKind::None,
            overlay_buf: Vec::new(),
            rejections: Vec::new(),
            config,
        })
    }

    // --- Scheduling ---

    /// Advance by one host frame. Follows a fixed-timestep accumulator:
    /// zero, one, or at most `MAX_STEPS_PER_FRAME` ticks run depending on
    /// how much real time has passed.
    pub fn update(&mut self, frame_dt: f32) {
        if self.run_state == RunState::Paused {
            // Brush ops keep enqueuing while paused; elapsed host time is
            // discarded so resuming does not burst-replay it.
            self.time_accumulator = 0.0;
            return;
        }
        if !frame_dt.is_finite() || frame_dt <= 0.0 {
            return;
        }

        self.time_accumulator += frame_dt;
        let tick_dt = self.config.tick_dt;
        let mut steps = 0;
        while self.time_accumulator >= tick_dt && steps < MAX_STEPS_PER_FRAME {
            self.step();
            self.time_accumulator -= tick_dt;
            steps += 1;
        }
        if self.time_accumulator > tick_dt * 2.0 {
            self.time_accumulator = tick_dt;
        }
    }

    /// One full tick: fenced resize, queued source commands, queued brush
    /// ops in FIFO order, then sources + fluid stepper `sim_substeps`
    /// times. Wrapped by the perf sampler.
    pub fn step(&mut self) {
        let started = Instant::now();

        // Resolution changes never happen mid-tick
        if let Some(resolution) = self.pending_resolution.take() {
            if let Err(err) = self.grid.resize(resolution) {
                log::warn!("deferred resize failed: {err}");
            }
        }

        self.source_port.drain_into(&mut self.sources);

        for op in self.brush.drain() {
            let result = self.brush.with_hand(|hand| {
                brush::apply_op(&mut self.grid, hand, &self.fluids, op, &self.config)
            });
            if let Err(err) = result {
                log::debug!("brush op rejected: {err}");
                self.rejections.push(err);
            }
        }

        let substeps = self.quality.sim_substeps.max(1);
        let sub_dt = self.config.tick_dt * self.time_scale / substeps as f32;
        for _ in 0..substeps {
            self.sources
                .inject(&mut self.grid, &self.fluids, &self.config, sub_dt);
            self.stepper
                .step(&mut self.grid, &self.materials, &self.fluids, &self.config, sub_dt);
        }

        self.emit_sample(started.elapsed().as_secs_f32() * 1000.0);
        self.frame += 1;
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn set_run_state(&mut self, state: RunState) {
        self.run_state = state;
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Set the time-scale multiplier, clamped into the configured range.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = self.config.clamp_time_scale(scale);
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    // --- Quality ---

    pub fn quality(&self) -> QualityOpts {
        self.quality
    }

    /// Partial quality update. A resolution change is validated now but
    /// applied between ticks; on rejection the prior resolution stays.
    pub fn apply_quality(&mut self, update: QualityUpdate) -> Result<(), EngineError> {
        if let Some(resolution) = update.sim_resolution {
            if !TerrainGrid::is_supported_resolution(resolution) {
                return Err(EngineError::InvalidResolution(resolution));
            }
            if resolution != self.grid.resolution() {
                self.pending_resolution = Some(resolution);
            }
            self.quality.sim_resolution = resolution;
        }
        if let Some(substeps) = update.sim_substeps {
            self.quality.sim_substeps = self.config.clamp_substeps(substeps);
        }
        if let Some(levels) = update.clipmap_levels {
            self.quality.clipmap_levels = levels;
        }
        Ok(())
    }

    // --- Brush ---

    /// Handle for the input layer: enqueue ops, read the hand. Explicit
    /// dependency injection; there is no global registry to discover.
    pub fn brush_port(&self) -> BrushPort {
        self.brush.clone()
    }

    pub fn hand(&self) -> Hand {
        self.brush.hand()
    }

    pub fn set_hand_capacity(&mut self, capacity: f32) {
        self.brush.set_hand_capacity(capacity);
    }

    pub fn reset_hand(&mut self) {
        self.brush.reset_hand();
    }

    /// Brush rejections (`HandFull`/`HandEmpty`) since the last call, for
    /// input-layer feedback
    pub fn take_rejections(&mut self) -> Vec<EngineError> {
        std::mem::take(&mut self.rejections)
    }

    // --- Sources ---

    /// Handle for the UI layer; commands apply at the next tick.
    pub fn source_port(&self) -> SourcePort {
        self.source_port.clone()
    }

    pub fn sources(&self) -> &SourceManager {
        &self.sources
    }

    pub fn add_source(&mut self, source: Source) {
        self.sources.add(source);
    }

    pub fn remove_source(&mut self, id: SourceId) -> Result<(), EngineError> {
        self.sources.remove(id)
    }

    pub fn set_sources(&mut self, kind: terraflow_simulation::FluidKind, list: Vec<Source>) {
        self.sources.set_all(kind, list);
    }

    // --- Grid access & queries ---

    /// Read-only grid snapshot; stable between ticks.
    pub fn grid(&self) -> &TerrainGrid {
        &self.grid
    }

    /// Authoring/setup access to the grid. Exclusive borrow means this
    /// can never overlap a running tick.
    pub fn grid_mut(&mut self) -> &mut TerrainGrid {
        &mut self.grid
    }

    /// Seed the grid with generated terrain (setup step).
    pub fn generate_terrain(&mut self, generator: &TerrainGenerator) {
        generator.generate(&mut self.grid);
    }

    pub fn sample_height(&self, x: f32, z: f32) -> Option<f32> {
        self.grid.sample_height(x, z)
    }

    pub fn sample_normal(&self, x: f32, z: f32) -> Option<Vec3> {
        self.grid.sample_normal(x, z)
    }

    pub fn raymarch_height(
        &self,
        origin: Vec3,
        dir: Vec3,
        max_distance: f32,
        max_steps: u32,
    ) -> Option<Vec3> {
        self.grid.raymarch_height(origin, dir, max_distance, max_steps)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn materials(&self) -> &Materials {
        &self.materials
    }

    pub fn fluids(&self) -> &Fluids {
        &self.fluids
    }

    // --- Telemetry ---

    pub fn add_perf_sink(&mut self, sink: Box<dyn PerfSink>) {
        self.sinks.push(sink);
    }

    /// Render layer reports GPU timings here; they attach to the next
    /// emitted sample.
    pub fn submit_gpu_timings(&mut self, timings: GpuTimings) {
        self.pending_gpu = Some(timings);
    }

    fn emit_sample(&mut self, cpu_ms: f32) {
        let gpu = self.pending_gpu.take();
        let sample = PerfSample {
            frame: self.frame,
            cpu_ms,
            gpu_ms: gpu.as_ref().map(|g| g.gpu_ms),
            passes: gpu.as_ref().map(|g| g.passes.clone()).unwrap_or_default(),
            dispatches: gpu.as_ref().map(|g| g.dispatches).unwrap_or(0),
            draws: gpu.as_ref().map(|g| g.draws).unwrap_or(0),
            grid_bytes: self.grid.estimated_bytes(),
        };
        for sink in self.sinks.iter_mut() {
            sink.on_sample(&sample);
        }
    }

    // --- Debug overlay ---

    pub fn overlay(&self) -> OverlayKind {
        self.overlay
    }

    /// Select which derived field `overlay_field` exposes. A pure read
    /// selector; switching overlays never touches simulation state.
    pub fn set_overlay(&mut self, kind: OverlayKind) {
        self.overlay = kind;
    }

    /// The active overlay's scalar field, or `None` when no overlay is
    /// selected.
    pub fn overlay_field(&mut self) -> Option<&[f32]> {
        if compute_overlay(&self.grid, self.overlay, &mut self.overlay_buf) {
            Some(&self.overlay_buf)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::{BrushKind, BrushOp};
    use crate::perf::SharedPerfHistory;
    use glam::Vec2;
    use terraflow_simulation::FluidKind;

    fn small_engine() -> Engine {
        let config = EngineConfig {
            default_resolution: 16,
            world_size: 64.0,
            ..EngineConfig::default()
        };
        Engine::new(config).unwrap()
    }

    fn raise_op(engine: &Engine) -> BrushOp {
        BrushOp {
            kind: BrushKind::Raise,
            pos: engine.grid().cell_center(8, 8),
            radius: 6.0,
            strength: 30.0,
            dt: 0.033,
            invert: false,
        }
    }

    #[test]
    fn paused_engine_applies_nothing() {
        let mut engine = small_engine();
        engine.set_run_state(RunState::Paused);

        let port = engine.brush_port();
        port.enqueue(raise_op(&engine));
        port.enqueue(raise_op(&engine));

        for _ in 0..10 {
            engine.update(1.0 / 60.0);
        }
        assert_eq!(engine.grid().total_soil(), 0.0);
        assert_eq!(engine.frame(), 0);
        assert_eq!(port.queued(), 2);

        // Ops apply, in order, once running resumes
        engine.set_run_state(RunState::Running);
        engine.update(1.0 / 60.0);
        assert!(engine.grid().total_soil() > 0.0);
        assert_eq!(port.queued(), 0);
    }

    #[test]
    fn invalid_resolution_is_rejected_and_grid_kept() {
        let mut engine = small_engine();
        let result = engine.apply_quality(QualityUpdate {
            sim_resolution: Some(100),
            ..QualityUpdate::default()
        });
        assert_eq!(result, Err(EngineError::InvalidResolution(100)));
        assert_eq!(engine.grid().resolution(), 16);
        assert_eq!(engine.quality().sim_resolution, 16);
    }

    #[test]
    fn resolution_change_is_fenced_to_tick_boundary() {
        let mut engine = small_engine();
        engine
            .apply_quality(QualityUpdate {
                sim_resolution: Some(32),
                ..QualityUpdate::default()
            })
            .unwrap();
        // Not applied yet
        assert_eq!(engine.grid().resolution(), 16);

        engine.step();
        assert_eq!(engine.grid().resolution(), 32);
    }

    #[test]
    fn substeps_are_clamped_and_advance_the_same_time() {
        let mut coarse = small_engine();
        let mut fine = small_engine();
        fine.apply_quality(QualityUpdate {
            sim_substeps: Some(4),
            ..QualityUpdate::default()
        })
        .unwrap();
        assert_eq!(fine.quality().sim_substeps, 4);

        // Same source, same wall-clock advance: injected mass matches
        let source = Source {
            id: SourceId(1),
            pos: Vec2::new(32.0, 32.0),
            rate: 6.0,
            fluid: FluidKind::Water,
        };
        coarse.add_source(source);
        fine.add_source(source);

        coarse.step();
        fine.step();

        let a = coarse.grid().total_water();
        let b = fine.grid().total_water();
        assert!((a - b).abs() < 1e-3, "{a} vs {b}");
    }

    #[test]
    fn clamped_quality_values() {
        let mut engine = small_engine();
        engine
            .apply_quality(QualityUpdate {
                sim_substeps: Some(1000),
                ..QualityUpdate::default()
            })
            .unwrap();
        assert_eq!(
            engine.quality().sim_substeps,
            engine.config().max_substeps
        );

        engine.set_time_scale(1000.0);
        assert_eq!(engine.time_scale(), 10.0);
    }

    #[test]
    fn perf_samples_are_pushed_per_tick() {
        let mut engine = small_engine();
        let history = SharedPerfHistory::new(16);
        engine.add_perf_sink(Box::new(history.clone()));

        engine.step();
        engine.step();
        assert_eq!(history.len(), 2);

        let latest = history.latest().unwrap();
        assert_eq!(latest.frame, 1);
        assert_eq!(latest.gpu_ms, None);
        assert!(latest.grid_bytes > 0);
    }

    #[test]
    fn gpu_timings_attach_to_next_sample() {
        let mut engine = small_engine();
        let history = SharedPerfHistory::new(4);
        engine.add_perf_sink(Box::new(history.clone()));

        engine.submit_gpu_timings(GpuTimings {
            gpu_ms: 2.5,
            passes: vec![("terrain".to_string(), 1.5)],
            dispatches: 3,
            draws: 12,
        });
        engine.step();
        let sample = history.latest().unwrap();
        assert_eq!(sample.gpu_ms, Some(2.5));
        assert_eq!(sample.draws, 12);

        // Consumed: the following sample is GPU-less again
        engine.step();
        assert_eq!(history.latest().unwrap().gpu_ms, None);
    }

    #[test]
    fn hand_rejections_surface_to_the_caller() {
        let mut engine = small_engine();
        let port = engine.brush_port();
        port.enqueue(BrushOp {
            kind: BrushKind::Deposit(HandMaterial::Soil),
            ..raise_op(&engine)
        });

        engine.step();
        let rejections = engine.take_rejections();
        assert_eq!(rejections, vec![EngineError::HandEmpty]);
        assert!(engine.take_rejections().is_empty());
    }

    #[test]
    fn overlay_selector_is_pure() {
        let mut engine = small_engine();
        assert!(engine.overlay_field().is_none());

        engine.set_overlay(OverlayKind::Flow);
        let len = engine.overlay_field().unwrap().len();
        assert_eq!(len, engine.grid().cell_count());
        assert_eq!(engine.grid().total_water(), 0.0);

        engine.set_overlay(OverlayKind::None);
        assert!(engine.overlay_field().is_none());
    }
}
