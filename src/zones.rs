//! Departure-block zones: an id-keyed set of points with a radius test.

use crate::types::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Id of the canonical spawn zone.
pub const SPAWN_ZONE_ID: u32 = 0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ZoneError {
    #[error("no block zone with id {0}")]
    NotFound(u32),
    #[error("only the spawn zone is left")]
    Empty,
}

/// A single block zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZonePoint {
    pub id: u32,
    pub position: Vec3,
}

/// Ordered mapping of zone id → position.
///
/// Ids ascend with insertion (`add` always allocates above the current
/// maximum), so the greatest id is the most recently added zone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeoZoneSet {
    zones: BTreeMap<u32, Vec3>,
}

impl GeoZoneSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding only the spawn zone.
    pub fn with_spawn(position: Vec3) -> Self {
        let mut set = Self::new();
        set.upsert_spawn(position);
        set
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<Vec3> {
        self.zones.get(&id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = ZonePoint> + '_ {
        self.zones
            .iter()
            .map(|(&id, &position)| ZonePoint { id, position })
    }

    pub fn add(&mut self, position: Vec3) -> u32 {
        let id = self
            .zones
            .keys()
            .next_back()
            .map_or(SPAWN_ZONE_ID, |max| max + 1);
        self.zones.insert(id, position);
        id
    }

    /// Remove a zone by explicit id.
    ///
    /// The spawn zone can be named explicitly, but the set is never emptied.
    pub fn remove(&mut self, id: u32) -> Result<Vec3, ZoneError> {
        if !self.zones.contains_key(&id) {
            return Err(ZoneError::NotFound(id));
        }
        if self.zones.len() == 1 {
            return Err(ZoneError::Empty);
        }
        self.zones.remove(&id).ok_or(ZoneError::NotFound(id))
    }

    /// Remove the most recently added zone, never the spawn zone and never
    /// the last remaining zone.
    pub fn remove_last(&mut self) -> Result<ZonePoint, ZoneError> {
        if self.zones.len() <= 1 {
            return Err(ZoneError::Empty);
        }
        let id = self
            .zones
            .keys()
            .next_back()
            .copied()
            .filter(|&id| id != SPAWN_ZONE_ID)
            .ok_or(ZoneError::Empty)?;
        let position = self.zones.remove(&id).ok_or(ZoneError::NotFound(id))?;
        Ok(ZonePoint { id, position })
    }

    /// True when `point` is strictly closer than `radius` to any zone.
    pub fn contains(&self, point: Vec3, radius: f32) -> bool {
        self.zones.values().any(|z| z.distance(&point) < radius)
    }

    /// Closest zone to `point` and its distance.
    pub fn nearest(&self, point: Vec3) -> Option<(ZonePoint, f32)> {
        self.iter()
            .map(|z| (z, z.position.distance(&point)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn upsert_spawn(&mut self, position: Vec3) {
        self.zones.insert(SPAWN_ZONE_ID, position);
    }

    pub fn has_spawn(&self) -> bool {
        self.zones.contains_key(&SPAWN_ZONE_ID)
    }
}
