//! Water surface sources for the simulated host.

/// Anything that can report the water surface height.
pub trait WaterSource: Send + Sync {
    /// Surface height at horizontal position (`x`, `z`).
    fn height_at(&self, x: f32, z: f32) -> f32;
}

/// Sea level that an operator (or a tides plugin) moves over time, with an
/// optional deterministic swell on top.
#[derive(Debug, Clone, PartialEq)]
pub struct TideLevel {
    pub level: f32,
    /// Peak swell offset in world units; 0 for a flat sea.
    pub swell: f32,
}

impl TideLevel {
    pub fn flat(level: f32) -> Self {
        Self { level, swell: 0.0 }
    }

    pub fn set_level(&mut self, level: f32) {
        self.level = level;
    }
}

impl WaterSource for TideLevel {
    fn height_at(&self, x: f32, z: f32) -> f32 {
        if self.swell == 0.0 {
            return self.level;
        }
        let scale = 0.01;
        self.level + (x * scale).sin() * (z * scale).cos() * self.swell
    }
}
