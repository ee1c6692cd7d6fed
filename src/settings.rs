//! Persisted plugin settings and the stores that hold them.
//!
//! The document is flat camelCase JSON:
//!
//! | Key                     | Default              |
//! |-------------------------|----------------------|
//! | `spawnOverrideEnabled`  | `false`              |
//! | `spawnLocation`         | generated offshore   |
//! | `blockZones`            | `{0: spawnLocation}` |
//! | `blockRadius`           | `120.0`              |
//! | `recheckDelaySeconds`   | `10.0`               |
//! | `tidesEnabled`          | `false`              |
//! | `debugEnabled`          | `false`              |

use crate::types::{FeatureFlags, GateParameters, Vec3, MAX_RECHECK_DELAY_SECONDS};
use crate::zones::GeoZoneSet;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Settings document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub spawn_override_enabled: bool,
    #[serde(default = "missing_spawn")]
    pub spawn_location: Vec3,
    // Missing zones come back empty; `validate` re-seeds zone 0 at the spawn.
    #[serde(default)]
    pub block_zones: GeoZoneSet,
    pub block_radius: f32,
    pub recheck_delay_seconds: f32,
    pub tides_enabled: bool,
    pub debug_enabled: bool,
}

/// Stands in for an absent `spawnLocation` so `validate` rejects the
/// document and a fresh offshore point is generated instead.
fn missing_spawn() -> Vec3 {
    Vec3::new(f32::NAN, f32::NAN, f32::NAN)
}

impl Default for Settings {
    fn default() -> Self {
        Self::generate(Vec3::zero())
    }
}

impl Settings {
    /// Fresh defaults around a spawn point (normally a random offshore point
    /// already projected onto the water).
    pub fn generate(spawn_location: Vec3) -> Self {
        let gate = GateParameters::default();
        Self {
            spawn_override_enabled: false,
            spawn_location,
            block_zones: GeoZoneSet::with_spawn(spawn_location),
            block_radius: gate.block_radius,
            recheck_delay_seconds: gate.recheck_delay_seconds,
            tides_enabled: false,
            debug_enabled: false,
        }
    }

    pub fn flags(&self) -> FeatureFlags {
        FeatureFlags {
            spawn_override_enabled: self.spawn_override_enabled,
            tides_enabled: self.tides_enabled,
            debug_enabled: self.debug_enabled,
        }
    }

    pub fn gate(&self) -> GateParameters {
        GateParameters {
            block_radius: self.block_radius,
            recheck_delay_seconds: self.recheck_delay_seconds,
        }
    }

    /// Reject documents the gate cannot run with, and seed zone 0 at the
    /// spawn when the zone set is empty. A set whose zone 0 was removed
    /// explicitly is kept as is.
    pub fn validate(mut self) -> Result<Self, StoreError> {
        if !(self.block_radius.is_finite() && self.block_radius > 0.0) {
            return Err(StoreError::Invalid(format!(
                "blockRadius must be positive, got {}",
                self.block_radius
            )));
        }
        let delay = self.recheck_delay_seconds;
        if !(delay.is_finite() && delay > 0.0 && delay <= MAX_RECHECK_DELAY_SECONDS) {
            return Err(StoreError::Invalid(format!(
                "recheckDelaySeconds must be in (0, {}], got {}",
                MAX_RECHECK_DELAY_SECONDS, delay
            )));
        }
        if !self.spawn_location.is_finite() {
            return Err(StoreError::Invalid(
                "spawnLocation is missing or not finite".into(),
            ));
        }
        if let Some(zone) = self.block_zones.iter().find(|z| !z.position.is_finite()) {
            return Err(StoreError::Invalid(format!(
                "block zone {} is not finite",
                zone.id
            )));
        }
        if self.block_zones.is_empty() {
            debug!("blockZones is empty, seeding zone 0 at the spawn location");
            self.block_zones.upsert_spawn(self.spawn_location);
        }
        Ok(self)
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, StoreError> {
        serde_json::from_str::<Settings>(text)?.validate()
    }

    /// md5 of the serialized document; used to skip redundant writes.
    pub fn fingerprint(&self) -> String {
        match serde_json::to_vec(self) {
            Ok(bytes) => format!("{:x}", md5::compute(bytes)),
            Err(e) => {
                warn!("Failed to fingerprint settings: {}", e);
                String::new()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Where the settings document lives between process runs.
pub trait ConfigStore: Send {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&mut self) -> Result<Option<Settings>, StoreError>;
    fn save(&mut self, settings: &Settings) -> Result<(), StoreError>;
}

/// JSON file on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&mut self) -> Result<Option<Settings>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Settings::from_json(&text).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, settings: &Settings) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, settings.to_json()?)?;
        Ok(())
    }
}

/// Keeps the serialized document in memory; round-trips through JSON exactly
/// like the file store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    document: Option<String>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Some(document.into()),
            saves: 0,
        }
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl ConfigStore for MemoryStore {
    fn load(&mut self) -> Result<Option<Settings>, StoreError> {
        self.document
            .as_deref()
            .map(Settings::from_json)
            .transpose()
    }

    fn save(&mut self, settings: &Settings) -> Result<(), StoreError> {
        self.document = Some(settings.to_json()?);
        self.saves += 1;
        Ok(())
    }
}
