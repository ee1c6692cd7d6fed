//! Tide tracking: snaps a ship's height to the water level every tick.

use crate::scheduler::{Scheduler, TimerEvent, TimerHandle};
use crate::types::EntityId;
use std::time::Duration;

/// Outcome of one tide tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TideStep {
    /// Feature off or ship gone; the tracker ends.
    Stop,
    /// Already level.
    Hold,
    /// Overwrite the ship's height.
    Snap(f32),
}

/// One tick of the tracker as a pure function.
pub fn step(tides_enabled: bool, alive: bool, current_y: Option<f32>, water_y: f32) -> TideStep {
    match current_y {
        Some(y) if tides_enabled && alive => {
            if y != water_y {
                TideStep::Snap(water_y)
            } else {
                TideStep::Hold
            }
        }
        _ => TideStep::Stop,
    }
}

/// Periodic re-leveling task bound to one ship.
#[derive(Debug)]
pub struct TideTracker {
    entity: EntityId,
    pending: Option<TimerHandle>,
    ticks: u64,
}

impl TideTracker {
    /// Start tracking; the first tick fires after `first_delay`.
    pub fn start(scheduler: &mut dyn Scheduler, entity: EntityId, first_delay: Duration) -> Self {
        let pending = Some(scheduler.schedule_after(first_delay, TimerEvent::TideTick(entity)));
        Self {
            entity,
            pending,
            ticks: 0,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Record a fired tick and schedule the next one.
    pub fn rearm(&mut self, scheduler: &mut dyn Scheduler, period: Duration) {
        self.ticks += 1;
        self.pending = Some(scheduler.schedule_after(period, TimerEvent::TideTick(self.entity)));
    }

    /// Idempotent.
    pub fn cancel(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(handle) = self.pending.take() {
            scheduler.cancel(handle);
        }
    }
}
