//! Fluid definitions and registry

use serde::{Deserialize, Serialize};

/// The two simulated fluids
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FluidKind {
    Water,
    Lava,
}

impl FluidKind {
    pub const ALL: [FluidKind; 2] = [FluidKind::Water, FluidKind::Lava];
}

/// Definition of a fluid's flow and thermal properties
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FluidDef {
    pub kind: FluidKind,
    pub name: String,

    /// Base color (RGBA), for debug/preview rendering
    pub color: [u8; 4],

    /// Density (g/cm³)
    pub density: f32,

    /// Fraction of the gravity head applied to face fluxes per second
    pub flow_rate: f32,
    /// Per-tick flux damping factor (1.0 = frictionless)
    pub damping: f32,

    // Thermal properties
    /// Fraction of shallow exposed fluid lost per second (water)
    pub evaporation_rate: Option<f32>,
    /// Temperature the fluid is emitted/scooped at, in Celsius (lava)
    pub emit_temperature: Option<f32>,
    /// Below this temperature the fluid converts to static rock (lava)
    pub solidify_temperature: Option<f32>,
    /// Ambient heat loss in degrees per second (lava)
    pub cooling_rate: Option<f32>,
}

/// Registry of fluids
#[derive(Clone, Debug)]
pub struct Fluids {
    defs: Vec<FluidDef>,
}

impl Fluids {
    pub fn new() -> Self {
        let defs = vec![
            FluidDef {
                kind: FluidKind::Water,
                name: "water".to_string(),
                color: [64, 164, 223, 200],
                density: 1.0,
                flow_rate: 0.9,
                damping: 0.995,
                evaporation_rate: Some(0.02),
                emit_temperature: None,
                solidify_temperature: None,
                cooling_rate: None,
            },
            FluidDef {
                kind: FluidKind::Lava,
                name: "lava".to_string(),
                color: [255, 80, 0, 255],
                density: 3.0,
                flow_rate: 0.25,
                damping: 0.9,
                evaporation_rate: None,
                emit_temperature: Some(1100.0),
                solidify_temperature: Some(700.0),
                cooling_rate: Some(15.0),
            },
        ];
        Self { defs }
    }

    /// Get a fluid definition by kind
    pub fn get(&self, kind: FluidKind) -> &FluidDef {
        self.defs
            .iter()
            .find(|d| d.kind == kind)
            .unwrap_or(&self.defs[0])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FluidDef> {
        self.defs.iter()
    }
}

impl Default for Fluids {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_all_kinds() {
        let fluids = Fluids::new();
        for kind in FluidKind::ALL {
            assert_eq!(fluids.get(kind).kind, kind);
        }
    }

    #[test]
    fn lava_solidifies_below_emission() {
        let fluids = Fluids::new();
        let lava = fluids.get(FluidKind::Lava);
        let emit = lava.emit_temperature.unwrap();
        let solidify = lava.solidify_temperature.unwrap();
        assert!(solidify < emit);
    }

    #[test]
    fn water_evaporates_but_never_freezes_here() {
        let fluids = Fluids::new();
        let water = fluids.get(FluidKind::Water);
        assert!(water.evaporation_rate.is_some());
        assert!(water.solidify_temperature.is_none());
    }
}
