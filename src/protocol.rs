//! Host wire protocol.
//!
//! The standalone server plays the game host over line-delimited JSON:
//! one [`HostEvent`] per inbound line, one [`HostEffect`] per outbound line.
//!
//! ## Design rules
//!
//! 1. Every message is internally tagged by `type`, snake_case.
//! 2. Positions are `{ "x", "y", "z" }` objects; `y` is up.
//! 3. Ids are bare integers.
//! 4. Outbound effects are facts about what the core asked the host to do,
//!    in the order it asked.

use crate::types::{Decision, EntityId, PlayerId, Vec3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Inbound  (host → core)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// A cargo ship appeared.
    EntitySpawned { entity: EntityId, position: Vec3 },
    EntityMoved { entity: EntityId, position: Vec3 },
    EntityDestroyed { entity: EntityId },
    /// The ship wants to leave; answered with [`HostEffect::EgressDecision`].
    EgressRequested { entity: EntityId },

    PlayerJoined {
        player: PlayerId,
        position: Vec3,
        #[serde(default)]
        admin: bool,
        #[serde(default)]
        permissions: Vec<String>,
    },
    PlayerMoved { player: PlayerId, position: Vec3 },
    PlayerLeft { player: PlayerId },
    PlayerSleeping { player: PlayerId, sleeping: bool },
    /// `/cargo <args…>` typed by a player.
    Command {
        player: PlayerId,
        #[serde(default)]
        args: Vec<String>,
    },

    SetWaterLevel { level: f32 },
    SetPath { nodes: Vec<Vec3> },
}

// ---------------------------------------------------------------------------
// Outbound  (core → host)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEffect {
    EgressDecision {
        entity: EntityId,
        decision: Decision,
        /// The host's boolean "block" answer.
        block: bool,
    },
    /// A blocked departure is being retried.
    EgressRestarted { entity: EntityId },
    EntityPosition { entity: EntityId, position: Vec3 },
    Message { player: PlayerId, text: String },
    DrawText {
        player: PlayerId,
        position: Vec3,
        text: String,
        seconds: f32,
    },
    DrawSphere {
        player: PlayerId,
        position: Vec3,
        radius: f32,
        seconds: f32,
    },
    AdminFlag { player: PlayerId, admin: bool },
}

impl HostEffect {
    pub fn egress(entity: EntityId, decision: Decision) -> Self {
        HostEffect::EgressDecision {
            entity,
            decision,
            block: decision.blocks(),
        }
    }
}
