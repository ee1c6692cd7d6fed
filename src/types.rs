//! Core types shared across all modules.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Basic math
// ---------------------------------------------------------------------------

/// World-space position. `y` is the vertical axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Same horizontal position, new height.
    pub fn with_y(self, y: f32) -> Self {
        Self { y, ..self }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Host handles
// ---------------------------------------------------------------------------

/// Opaque handle of a host entity (the cargo ship).
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Opaque handle of a connected player.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Flags & parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub spawn_override_enabled: bool,
    pub tides_enabled: bool,
    pub debug_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateParameters {
    /// Distance from any block zone within which departure is refused.
    pub block_radius: f32,
    /// Delay between departure retries, also the tide tick period.
    pub recheck_delay_seconds: f32,
}

const DEFAULT_RECHECK_DELAY_SECS: u64 = 10;

/// Longest accepted retry/tide period: one day.
pub const MAX_RECHECK_DELAY_SECONDS: f32 = 86_400.0;

impl GateParameters {
    /// Out-of-range values (negative, NaN, too large) fall back to the
    /// default period.
    pub fn recheck_delay(&self) -> std::time::Duration {
        std::time::Duration::try_from_secs_f32(self.recheck_delay_seconds)
            .ok()
            .filter(|d| !d.is_zero() && d.as_secs_f32() <= MAX_RECHECK_DELAY_SECONDS)
            .unwrap_or(std::time::Duration::from_secs(DEFAULT_RECHECK_DELAY_SECS))
    }
}

impl Default for GateParameters {
    fn default() -> Self {
        Self {
            block_radius: 120.0,
            recheck_delay_seconds: DEFAULT_RECHECK_DELAY_SECS as f32,
        }
    }
}

/// Answer to a departure request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    /// The host's "block" response.
    pub fn blocks(self) -> bool {
        matches!(self, Decision::Deny)
    }
}
