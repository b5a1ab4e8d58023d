//! Scripted scenarios for the headless runner

use glam::Vec2;
use terraflow_core::simulation::{FluidKind, HandMaterial};
use terraflow_core::{BrushKind, BrushOp, BrushPort, Engine, Source, SourceId};

/// A scripted driver poked once per tick
pub enum Scenario {
    /// Sources only; nothing to do per tick
    Passive,
    /// Alternating pickup/deposit strokes through the brush port
    Strokes { port: BrushPort, center: Vec2 },
}

impl Scenario {
    /// Two springs on high ground, draining across the map
    pub fn springs(engine: &mut Engine) -> Self {
        let size = engine.config().world_size;
        engine.add_source(Source {
            id: SourceId(1),
            pos: Vec2::splat(size * 0.3),
            rate: 8.0,
            fluid: FluidKind::Water,
        });
        engine.add_source(Source {
            id: SourceId(2),
            pos: Vec2::new(size * 0.7, size * 0.4),
            rate: 5.0,
            fluid: FluidKind::Water,
        });
        Scenario::Passive
    }

    /// A lava vent beside a water spring: quenching, boiling, new rock
    pub fn volcano(engine: &mut Engine) -> Self {
        let size = engine.config().world_size;
        engine.add_source(Source {
            id: SourceId(1),
            pos: Vec2::splat(size * 0.5),
            rate: 5.0,
            fluid: FluidKind::Lava,
        });
        engine.add_source(Source {
            id: SourceId(2),
            pos: Vec2::new(size * 0.5 + engine.grid().cell_size() * 3.0, size * 0.5),
            rate: 10.0,
            fluid: FluidKind::Water,
        });
        Scenario::Passive
    }

    /// No sources; exercise the hand economy with a moving stroke
    pub fn sculpt(engine: &Engine) -> Self {
        Scenario::Strokes {
            port: engine.brush_port(),
            center: Vec2::splat(engine.config().world_size * 0.5),
        }
    }

    pub fn drive(&mut self, engine: &mut Engine, tick: u64) {
        match self {
            Scenario::Passive => {}
            Scenario::Strokes { port, center } => {
                // Sweep a circle: dig on one side, pile up on the other
                let angle = tick as f32 * 0.05;
                let offset = Vec2::new(angle.cos(), angle.sin()) * 40.0;
                let dt = engine.config().tick_dt;

                port.enqueue(BrushOp {
                    kind: BrushKind::Pickup(HandMaterial::Soil),
                    pos: *center + offset,
                    radius: 10.0,
                    strength: 40.0,
                    dt,
                    invert: false,
                });
                port.enqueue(BrushOp {
                    kind: BrushKind::Deposit(HandMaterial::Soil),
                    pos: *center - offset,
                    radius: 10.0,
                    strength: 40.0,
                    dt,
                    invert: false,
                });
            }
        }
    }
}
