//! Egress gate: decides whether a ship may leave and polls until it may.

use crate::scheduler::{Scheduler, TimerEvent, TimerHandle};
use crate::types::{Decision, EntityId, GateParameters, Vec3};
use crate::zones::GeoZoneSet;
use log::debug;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No decision yet for the current attempt, or a retry is being made.
    Unchecked,
    /// Denied; a retry is pending.
    Blocked { retry: TimerHandle },
    /// Departure granted. Terminal for this attempt.
    Allowed,
}

#[derive(Debug, Default)]
pub struct EgressGate {
    states: HashMap<EntityId, GateState>,
}

impl EgressGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, entity: EntityId) -> GateState {
        self.states
            .get(&entity)
            .copied()
            .unwrap_or(GateState::Unchecked)
    }

    /// Evaluate a departure request from scratch.
    ///
    /// `position` is `None` when the host could not resolve the entity; such
    /// a request is let through with nothing scheduled.
    pub fn evaluate(
        &mut self,
        scheduler: &mut dyn Scheduler,
        zones: &GeoZoneSet,
        params: GateParameters,
        entity: EntityId,
        position: Option<Vec3>,
    ) -> Decision {
        if let Some(GateState::Blocked { retry }) = self.states.remove(&entity) {
            scheduler.cancel(retry);
        }

        let Some(position) = position else {
            debug!("{} has no position, letting it go", entity);
            return Decision::Allow;
        };

        if zones.contains(position, params.block_radius) {
            let retry =
                scheduler.schedule_after(params.recheck_delay(), TimerEvent::EgressRetry(entity));
            self.states.insert(entity, GateState::Blocked { retry });
            Decision::Deny
        } else {
            self.states.insert(entity, GateState::Allowed);
            Decision::Allow
        }
    }

    /// A retry timer fired. Returns `true` when the host should be asked to
    /// restart the departure.
    pub fn on_retry(&mut self, entity: EntityId, alive: bool) -> bool {
        if !alive {
            self.states.remove(&entity);
            return false;
        }
        self.states.insert(entity, GateState::Unchecked);
        true
    }

    pub fn forget(&mut self, scheduler: &mut dyn Scheduler, entity: EntityId) {
        if let Some(GateState::Blocked { retry }) = self.states.remove(&entity) {
            scheduler.cancel(retry);
        }
    }

    /// Cancel every pending retry.
    pub fn cancel_all(&mut self, scheduler: &mut dyn Scheduler) {
        for (_, state) in self.states.drain() {
            if let GateState::Blocked { retry } = state {
                scheduler.cancel(retry);
            }
        }
    }
}
