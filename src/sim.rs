//! In-memory game host.
//!
//! Backs the standalone server and the test suite. Every effect the core
//! requests is applied to the simulated world and recorded as a
//! [`HostEffect`] for the caller to drain.

use crate::host::{Host, HostError};
use crate::protocol::{HostEffect, HostEvent};
use crate::types::{EntityId, PlayerId, Vec3};
use crate::water::{TideLevel, WaterSource};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SimPlayer {
    pub position: Vec3,
    pub connected: bool,
    pub sleeping: bool,
    pub admin: bool,
    pub permissions: HashSet<String>,
}

impl SimPlayer {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            connected: true,
            sleeping: false,
            admin: false,
            permissions: HashSet::new(),
        }
    }

    pub fn with_permission(mut self, permission: &str) -> Self {
        self.permissions.insert(permission.to_string());
        self
    }

    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }
}

pub struct SimHost {
    water: TideLevel,
    seed: u64,
    /// Radius of the ring offshore spawn points are drawn from.
    pub offshore_radius: f32,
    offshore_draws: u64,
    path: Vec<Vec3>,
    entities: BTreeMap<EntityId, Vec3>,
    players: BTreeMap<PlayerId, SimPlayer>,
    effects: Vec<HostEffect>,
    egress_requests: Vec<EntityId>,
}

impl SimHost {
    pub fn new(water: TideLevel, seed: u64) -> Self {
        Self {
            water,
            seed,
            offshore_radius: 2000.0,
            offshore_draws: 0,
            path: Vec::new(),
            entities: BTreeMap::new(),
            players: BTreeMap::new(),
            effects: Vec::new(),
            egress_requests: Vec::new(),
        }
    }

    pub fn water(&self) -> &dyn WaterSource {
        &self.water
    }

    pub fn set_water_level(&mut self, level: f32) {
        self.water.set_level(level);
    }

    pub fn set_path(&mut self, nodes: Vec<Vec3>) {
        self.path = nodes;
    }

    pub fn spawn_entity(&mut self, entity: EntityId, position: Vec3) {
        self.entities.insert(entity, position);
    }

    pub fn move_entity(&mut self, entity: EntityId, position: Vec3) {
        if let Some(p) = self.entities.get_mut(&entity) {
            *p = position;
        }
    }

    pub fn destroy_entity(&mut self, entity: EntityId) {
        self.entities.remove(&entity);
    }

    pub fn add_player(&mut self, player: PlayerId, state: SimPlayer) {
        self.players.insert(player, state);
    }

    pub fn player(&self, player: PlayerId) -> Option<&SimPlayer> {
        self.players.get(&player)
    }

    pub fn player_mut(&mut self, player: PlayerId) -> Option<&mut SimPlayer> {
        self.players.get_mut(&player)
    }

    /// Mark the player disconnected; the record is kept so handles stay
    /// resolvable, as on a real server.
    pub fn disconnect(&mut self, player: PlayerId) {
        if let Some(p) = self.players.get_mut(&player) {
            p.connected = false;
        }
    }

    /// Record an effect produced outside the [`Host`] calls (e.g. the answer
    /// to an egress request).
    pub fn record(&mut self, effect: HostEffect) {
        self.effects.push(effect);
    }

    /// Drain recorded effects.
    pub fn take_effects(&mut self) -> Vec<HostEffect> {
        std::mem::take(&mut self.effects)
    }

    pub fn effects(&self) -> &[HostEffect] {
        &self.effects
    }

    /// Drain departures restarted through [`Host::start_egress`]; the driver
    /// feeds them back into the service as fresh egress requests.
    pub fn take_egress_requests(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.egress_requests)
    }

    /// Messages sent to `player`, oldest first.
    pub fn messages_for(&self, player: PlayerId) -> Vec<&str> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                HostEffect::Message { player: p, text } if *p == player => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Apply the world-state part of an inbound event. Events that are
    /// callbacks into the core (spawn, egress, command) only update state
    /// here; the agent routes them to the service.
    pub fn apply(&mut self, event: &HostEvent) {
        match event {
            HostEvent::EntitySpawned { entity, position }
            | HostEvent::EntityMoved { entity, position } => {
                self.entities.insert(*entity, *position);
            }
            HostEvent::EntityDestroyed { entity } => self.destroy_entity(*entity),
            HostEvent::PlayerJoined {
                player,
                position,
                admin,
                permissions,
            } => {
                let mut state = SimPlayer::new(*position).with_admin(*admin);
                state.permissions = permissions.iter().cloned().collect();
                self.add_player(*player, state);
            }
            HostEvent::PlayerMoved { player, position } => {
                if let Some(p) = self.players.get_mut(player) {
                    p.position = *position;
                }
            }
            HostEvent::PlayerLeft { player } => self.disconnect(*player),
            HostEvent::PlayerSleeping { player, sleeping } => {
                if let Some(p) = self.players.get_mut(player) {
                    p.sleeping = *sleeping;
                }
            }
            HostEvent::SetWaterLevel { level } => self.set_water_level(*level),
            HostEvent::SetPath { nodes } => self.set_path(nodes.clone()),
            HostEvent::EgressRequested { .. } | HostEvent::Command { .. } => {}
        }
    }
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new(TideLevel::flat(0.0), 42)
    }
}

impl Host for SimHost {
    fn entity_alive(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    fn entity_position(&self, entity: EntityId) -> Option<Vec3> {
        self.entities.get(&entity).copied()
    }

    fn set_entity_position(&mut self, entity: EntityId, position: Vec3) -> Result<(), HostError> {
        let slot = self
            .entities
            .get_mut(&entity)
            .ok_or(HostError::EntityUnavailable(entity))?;
        *slot = position;
        self.effects
            .push(HostEffect::EntityPosition { entity, position });
        Ok(())
    }

    fn start_egress(&mut self, entity: EntityId) -> Result<(), HostError> {
        if !self.entity_alive(entity) {
            return Err(HostError::EntityUnavailable(entity));
        }
        self.egress_requests.push(entity);
        self.effects.push(HostEffect::EgressRestarted { entity });
        Ok(())
    }

    fn water_height(&self, position: Vec3) -> f32 {
        self.water.height_at(position.x, position.z)
    }

    fn random_offshore_point(&mut self) -> Vec3 {
        // Deterministic per (seed, draw) so regenerated defaults are reproducible.
        let n = self.offshore_draws;
        self.offshore_draws += 1;
        let mixed = self
            .seed
            .wrapping_add(n)
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let angle = (mixed >> 40) as f32 / (1u64 << 24) as f32 * std::f32::consts::TAU;
        let x = angle.cos() * self.offshore_radius;
        let z = angle.sin() * self.offshore_radius;
        Vec3::new(x, self.water.height_at(x, z), z)
    }

    fn reference_path(&self) -> Vec<Vec3> {
        self.path.clone()
    }

    fn player_position(&self, player: PlayerId) -> Option<Vec3> {
        self.players
            .get(&player)
            .filter(|p| p.connected)
            .map(|p| p.position)
    }

    fn player_connected(&self, player: PlayerId) -> bool {
        self.players.get(&player).is_some_and(|p| p.connected)
    }

    fn player_sleeping(&self, player: PlayerId) -> bool {
        self.players.get(&player).is_some_and(|p| p.sleeping)
    }

    fn has_permission(&self, player: PlayerId, permission: &str) -> bool {
        self.players
            .get(&player)
            .is_some_and(|p| p.permissions.contains(permission))
    }

    fn is_admin(&self, player: PlayerId) -> bool {
        self.players.get(&player).is_some_and(|p| p.admin)
    }

    fn set_admin(&mut self, player: PlayerId, admin: bool) {
        if let Some(p) = self.players.get_mut(&player) {
            p.admin = admin;
            self.effects.push(HostEffect::AdminFlag { player, admin });
        }
    }

    fn send_message(&mut self, player: PlayerId, text: &str) -> Result<(), HostError> {
        if !self.player_connected(player) {
            return Err(HostError::PlayerUnavailable(player));
        }
        self.effects.push(HostEffect::Message {
            player,
            text: text.to_string(),
        });
        Ok(())
    }

    fn draw_text(&mut self, player: PlayerId, lifetime: Duration, position: Vec3, text: &str) {
        self.effects.push(HostEffect::DrawText {
            player,
            position,
            text: text.to_string(),
            seconds: lifetime.as_secs_f32(),
        });
    }

    fn draw_sphere(&mut self, player: PlayerId, lifetime: Duration, position: Vec3, radius: f32) {
        self.effects.push(HostEffect::DrawSphere {
            player,
            position,
            radius,
            seconds: lifetime.as_secs_f32(),
        });
    }
}
