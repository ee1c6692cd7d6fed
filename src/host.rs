//! The game-server surface the core drives.
//!
//! Everything that touches the engine (moving the ship, water heights,
//! drawing, chat, permissions) goes through [`Host`]. Handles may go stale
//! between a timer being scheduled and firing; callers treat that as a no-op.

use crate::types::{EntityId, PlayerId, Vec3};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("{0} is no longer available")]
    PlayerUnavailable(PlayerId),
    #[error("{0} is no longer available")]
    EntityUnavailable(EntityId),
}

pub trait Host {
    // -- entities ----------------------------------------------------------

    fn entity_alive(&self, entity: EntityId) -> bool;
    fn entity_position(&self, entity: EntityId) -> Option<Vec3>;
    fn set_entity_position(&mut self, entity: EntityId, position: Vec3) -> Result<(), HostError>;
    /// Re-enter the host's departure entry point for `entity`.
    fn start_egress(&mut self, entity: EntityId) -> Result<(), HostError>;

    // -- world -------------------------------------------------------------

    /// Water surface height at the horizontal position of `position`.
    fn water_height(&self, position: Vec3) -> f32;
    fn random_offshore_point(&mut self) -> Vec3;
    /// Nodes of the ship's patrol path, drawn as a reference in live view.
    fn reference_path(&self) -> Vec<Vec3>;

    // -- players -----------------------------------------------------------

    fn player_position(&self, player: PlayerId) -> Option<Vec3>;
    fn player_connected(&self, player: PlayerId) -> bool;
    fn player_sleeping(&self, player: PlayerId) -> bool;
    fn has_permission(&self, player: PlayerId, permission: &str) -> bool;
    fn is_admin(&self, player: PlayerId) -> bool;
    fn set_admin(&mut self, player: PlayerId, admin: bool);

    fn send_message(&mut self, player: PlayerId, text: &str) -> Result<(), HostError>;
    fn draw_text(&mut self, player: PlayerId, lifetime: Duration, position: Vec3, text: &str);
    fn draw_sphere(&mut self, player: PlayerId, lifetime: Duration, position: Vec3, radius: f32);

    /// Connected and awake.
    fn player_active(&self, player: PlayerId) -> bool {
        self.player_connected(player) && !self.player_sleeping(player)
    }
}
