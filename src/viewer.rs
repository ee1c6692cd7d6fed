//! Live view: periodically draws the block zones and the ship's reference
//! path to every subscribed operator.
//!
//! The loop owns a single back-reference to its pending tick. It is created
//! on the first subscription and ends on the first tick that finds the
//! viewer set empty, clearing the back-reference so a later subscription can
//! start a fresh instance.

use crate::host::Host;
use crate::scheduler::{Scheduler, TimerEvent, TimerHandle};
use crate::types::{PlayerId, Vec3};
use crate::zones::GeoZoneSet;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

/// Tick period of the broadcast loop; annotations live exactly this long.
pub const VIEW_PERIOD: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerSession {
    pub observer: PlayerId,
    /// Whether the observer held the admin flag when subscribing.
    pub was_admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// Subscribed. `started` is set when this call created the loop.
    On { started: bool },
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The set was empty at loop top; the loop is gone.
    Stopped,
    /// Annotations drawn. `pruned` lists observers dropped as inactive.
    Rendered { pruned: Vec<PlayerId> },
}

// ---------------------------------------------------------------------------
// Scoped privilege
// ---------------------------------------------------------------------------

/// Grants the host admin flag for the lifetime of the guard when the
/// observer does not hold it at acquire time, and revokes it on drop.
pub struct ElevatedView<'a> {
    host: &'a mut dyn Host,
    player: PlayerId,
    granted: bool,
}

impl<'a> ElevatedView<'a> {
    pub fn acquire(host: &'a mut dyn Host, player: PlayerId) -> Self {
        let granted = !host.is_admin(player);
        if granted {
            host.set_admin(player, true);
        }
        Self {
            host,
            player,
            granted,
        }
    }

    pub fn granted(&self) -> bool {
        self.granted
    }
}

impl<'a> Deref for ElevatedView<'a> {
    type Target = dyn Host + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.host
    }
}

impl<'a> DerefMut for ElevatedView<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.host
    }
}

impl Drop for ElevatedView<'_> {
    fn drop(&mut self) {
        if self.granted {
            self.host.set_admin(self.player, false);
        }
    }
}

// ---------------------------------------------------------------------------
// Broadcast loop
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ViewerBroadcast {
    viewers: Vec<ViewerSession>,
    task: Option<TimerHandle>,
    generation: u64,
}

impl ViewerBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewers(&self) -> &[ViewerSession] {
        &self.viewers
    }

    pub fn is_viewing(&self, player: PlayerId) -> bool {
        self.viewers.iter().any(|v| v.observer == player)
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Number of loop instances started so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn toggle(
        &mut self,
        scheduler: &mut dyn Scheduler,
        host: &dyn Host,
        player: PlayerId,
    ) -> Toggle {
        if let Some(index) = self.viewers.iter().position(|v| v.observer == player) {
            self.viewers.remove(index);
            return Toggle::Off;
        }

        self.viewers.push(ViewerSession {
            observer: player,
            was_admin: host.is_admin(player),
        });

        let started = self.task.is_none();
        if started {
            self.generation += 1;
            self.task = Some(scheduler.schedule_after(Duration::ZERO, TimerEvent::ViewerTick));
        }
        Toggle::On { started }
    }

    /// Run one loop iteration. The timer that triggered it has already fired.
    pub fn tick(
        &mut self,
        scheduler: &mut dyn Scheduler,
        host: &mut dyn Host,
        zones: &GeoZoneSet,
        block_radius: f32,
    ) -> TickOutcome {
        self.task = None;
        if self.viewers.is_empty() {
            return TickOutcome::Stopped;
        }

        let path = host.reference_path();
        let mut pruned = Vec::new();
        let mut index = 0;
        while index < self.viewers.len() {
            let session = self.viewers[index];
            {
                let mut view = ElevatedView::acquire(&mut *host, session.observer);
                render(&mut *view, session.observer, zones, block_radius, &path);
            }
            if host.player_active(session.observer) {
                index += 1;
            } else {
                self.viewers.remove(index);
                pruned.push(session.observer);
            }
        }

        self.task = Some(scheduler.schedule_after(VIEW_PERIOD, TimerEvent::ViewerTick));
        TickOutcome::Rendered { pruned }
    }

    /// Drop every viewer and the pending tick. Idempotent.
    pub fn stop(&mut self, scheduler: &mut dyn Scheduler) -> Vec<PlayerId> {
        if let Some(handle) = self.task.take() {
            scheduler.cancel(handle);
        }
        self.viewers.drain(..).map(|v| v.observer).collect()
    }
}

fn render(host: &mut dyn Host, player: PlayerId, zones: &GeoZoneSet, radius: f32, path: &[Vec3]) {
    for zone in zones.iter() {
        host.draw_text(player, VIEW_PERIOD, zone.position, &format!("zone {}", zone.id));
        host.draw_sphere(player, VIEW_PERIOD, zone.position, radius);
    }
    for (i, node) in path.iter().enumerate() {
        host.draw_text(player, VIEW_PERIOD, *node, &format!("path {}", i));
    }
}
