//! Brush operation descriptions

use glam::Vec2;
use terraflow_simulation::HandMaterial;

/// What a single brush application does
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BrushKind {
    /// Add soil, no hand involvement
    Raise,
    /// Strip soil (never digs into rock), no hand involvement
    Lower,
    /// Local Laplacian blur of the terrain surface through the soil layer
    Smooth,
    /// Pour water; inverted, drains it
    Water,
    /// Move material from the terrain into the hand
    Pickup(HandMaterial),
    /// Move material from the hand onto the terrain
    Deposit(HandMaterial),
}

/// One queued brush application. Ephemeral: consumed when applied.
#[derive(Clone, Copy, Debug)]
pub struct BrushOp {
    pub kind: BrushKind,
    /// World-space position on the terrain plane
    pub pos: Vec2,
    /// Footprint radius in meters
    pub radius: f32,
    /// Mass (or height) moved per second at the footprint center
    pub strength: f32,
    /// Elapsed-time slice this op covers, in seconds
    pub dt: f32,
    /// Swap pickup/deposit (and raise/lower, pour/drain) for this op
    /// only. Per-call flag fed by the input layer; never engine state.
    pub invert: bool,
}

impl BrushOp {
    /// Interactive editing stays forgiving: malformed parameters are
    /// clamped to the nearest valid value instead of rejected.
    pub fn sanitized(mut self) -> Self {
        if !self.radius.is_finite() || self.radius < 0.0 {
            self.radius = 0.0;
        }
        if !self.strength.is_finite() || self.strength < 0.0 {
            self.strength = 0.0;
        }
        if !self.dt.is_finite() || self.dt < 0.0 {
            self.dt = 0.0;
        }
        if !self.pos.is_finite() {
            self.pos = Vec2::ZERO;
        }
        self
    }

    /// The kind after resolving the invert flag
    pub fn effective_kind(&self) -> BrushKind {
        if !self.invert {
            return self.kind;
        }
        match self.kind {
            BrushKind::Raise => BrushKind::Lower,
            BrushKind::Lower => BrushKind::Raise,
            BrushKind::Smooth => BrushKind::Smooth,
            BrushKind::Water => BrushKind::Water, // pour/drain resolved at apply
            BrushKind::Pickup(m) => BrushKind::Deposit(m),
            BrushKind::Deposit(m) => BrushKind::Pickup(m),
        }
    }
}
