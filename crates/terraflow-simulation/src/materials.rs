//! Terrain material definitions and registry

use serde::{Deserialize, Serialize};

/// Terrain layer materials, bottom to top: rock bedrock, soil cover.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialKind {
    /// Loose cover layer; erodes, deposits, smooths.
    Soil,
    /// Bedrock elevation; only the brush moves it.
    Rock,
}

impl MaterialKind {
    pub const ALL: [MaterialKind; 2] = [MaterialKind::Soil, MaterialKind::Rock];
}

/// Materials the brush hand can pick up and carry.
///
/// Lava is carriable (scooped as molten mass) even though it is simulated
/// as a fluid once placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandMaterial {
    Soil,
    Rock,
    Lava,
}

/// Definition of a terrain material's properties
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaterialDef {
    pub kind: MaterialKind,
    pub name: String,

    /// Base color (RGBA), for debug/preview rendering
    pub color: [u8; 4],

    /// Density (g/cm³)
    pub density: f32,

    /// How readily flowing water strips this layer (0.0 = immune)
    pub erodibility: f32,
}

/// Registry of terrain materials
#[derive(Clone, Debug)]
pub struct Materials {
    defs: Vec<MaterialDef>,
}

impl Materials {
    pub fn new() -> Self {
        let defs = vec![
            MaterialDef {
                kind: MaterialKind::Soil,
                name: "soil".to_string(),
                color: [101, 67, 33, 255],
                density: 1.3,
                erodibility: 1.0,
            },
            MaterialDef {
                kind: MaterialKind::Rock,
                name: "rock".to_string(),
                color: [128, 128, 128, 255],
                density: 2.5,
                erodibility: 0.0,
            },
        ];
        Self { defs }
    }

    /// Get a material definition by kind
    pub fn get(&self, kind: MaterialKind) -> &MaterialDef {
        self.defs
            .iter()
            .find(|d| d.kind == kind)
            .unwrap_or(&self.defs[0])
    }

    pub fn iter(&self) -> impl Iterator<Item = &MaterialDef> {
        self.defs.iter()
    }
}

impl Default for Materials {
    fn default() -> Self {
        Self::new()
    }
}
