//! HarborService – the context object behind every host callback.
//!
//! Owns the live settings, the timer queue, and the state of every periodic
//! task. All entry points take the [`Host`] by reference; the service never
//! stores it, so host callbacks and timer events are serialized by whoever
//! owns the service.

use crate::command::{Command, CommandError, PERM_ADMIN};
use crate::gate::{EgressGate, GateState};
use crate::host::Host;
use crate::messages;
use crate::scheduler::{Scheduler, TimerEvent, TimerQueue};
use crate::settings::{ConfigStore, Settings, StoreError};
use crate::tide::{self, TideStep, TideTracker};
use crate::types::{Decision, EntityId, PlayerId};
use crate::viewer::{TickOutcome, Toggle, ViewerBroadcast};
use crate::zones::ZoneError;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarborStats {
    pub zones: usize,
    pub ships_in_harbor: usize,
    pub tide_trackers: usize,
    pub viewers: usize,
    pub viewer_loops_started: u64,
    pub pending_timers: usize,
}

pub struct HarborService {
    settings: Settings,
    store: Box<dyn ConfigStore>,
    timers: TimerQueue,
    gate: EgressGate,
    tides: HashMap<EntityId, TideTracker>,
    /// Ships spawned and not yet allowed to leave.
    in_harbor: BTreeSet<EntityId>,
    viewers: ViewerBroadcast,
    persisted: String,
}

impl HarborService {
    /// Load settings from `store`, regenerating defaults when the document
    /// is missing or unreadable. Only I/O failures abort.
    pub fn load(mut store: Box<dyn ConfigStore>, host: &mut dyn Host) -> Result<Self, StoreError> {
        let settings = match store.load() {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                info!("No stored settings, generating defaults");
                let settings = default_settings(host);
                store.save(&settings)?;
                settings
            }
            Err(StoreError::Io(e)) => return Err(StoreError::Io(e)),
            Err(e) => {
                warn!("Stored settings unusable ({}), regenerating defaults", e);
                let settings = default_settings(host);
                store.save(&settings)?;
                settings
            }
        };

        let persisted = settings.fingerprint();
        Ok(Self {
            settings,
            store,
            timers: TimerQueue::new(),
            gate: EgressGate::new(),
            tides: HashMap::new(),
            in_harbor: BTreeSet::new(),
            viewers: ViewerBroadcast::new(),
            persisted,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    pub fn gate_state(&self, entity: EntityId) -> GateState {
        self.gate.state(entity)
    }

    pub fn tide_tracker(&self, entity: EntityId) -> Option<&TideTracker> {
        self.tides.get(&entity)
    }

    pub fn viewers(&self) -> &ViewerBroadcast {
        &self.viewers
    }

    /// In-memory settings differ from what was last loaded or saved.
    pub fn is_dirty(&self) -> bool {
        self.settings.fingerprint() != self.persisted
    }

    pub fn stats(&self) -> HarborStats {
        HarborStats {
            zones: self.settings.block_zones.len(),
            ships_in_harbor: self.in_harbor.len(),
            tide_trackers: self.tides.len(),
            viewers: self.viewers.viewers().len(),
            viewer_loops_started: self.viewers.generation(),
            pending_timers: self.timers.len(),
        }
    }

    // -----------------------------------------------------------------------
    // Host callbacks
    // -----------------------------------------------------------------------

    pub fn on_entity_spawned(&mut self, host: &mut dyn Host, entity: EntityId) {
        if !host.entity_alive(entity) {
            return;
        }
        self.in_harbor.insert(entity);

        if self.settings.spawn_override_enabled {
            let spawn = self.settings.spawn_location;
            let spawn = spawn.with_y(host.water_height(spawn));
            if let Err(e) = host.set_entity_position(entity, spawn) {
                debug!("Could not move {} to spawn: {}", entity, e);
            }
        }

        if self.settings.tides_enabled {
            self.start_tide(entity);
        }
    }

    /// The host asks whether `entity` may leave. `Deny` means block.
    pub fn on_egress_requested(&mut self, host: &mut dyn Host, entity: EntityId) -> Decision {
        let position = host.entity_position(entity);
        let decision = self.gate.evaluate(
            &mut self.timers,
            &self.settings.block_zones,
            self.settings.gate(),
            entity,
            position,
        );

        match decision {
            Decision::Deny => {
                if self.settings.debug_enabled {
                    debug!("{} not allowed to leave", entity);
                }
            }
            Decision::Allow => {
                if let Some(mut tracker) = self.tides.remove(&entity) {
                    tracker.cancel(&mut self.timers);
                }
                self.in_harbor.remove(&entity);
                if self.settings.debug_enabled {
                    debug!("{} allowed to leave", entity);
                }
            }
        }
        decision
    }

    pub fn on_entity_destroyed(&mut self, entity: EntityId) {
        if let Some(mut tracker) = self.tides.remove(&entity) {
            tracker.cancel(&mut self.timers);
        }
        self.gate.forget(&mut self.timers, entity);
        self.in_harbor.remove(&entity);
    }

    // -----------------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------------

    /// Fire every timer due at or before `now`. Returns how many fired.
    pub fn advance_to(&mut self, host: &mut dyn Host, now: Duration) -> usize {
        let mut fired = 0;
        while let Some((_, event)) = self.timers.pop_due(now) {
            self.fire(host, event);
            fired += 1;
        }
        self.timers.set_now(now);
        fired
    }

    pub fn advance_by(&mut self, host: &mut dyn Host, delta: Duration) -> usize {
        let now = self.timers.now() + delta;
        self.advance_to(host, now)
    }

    fn fire(&mut self, host: &mut dyn Host, event: TimerEvent) {
        match event {
            TimerEvent::EgressRetry(entity) => {
                if self.gate.on_retry(entity, host.entity_alive(entity)) {
                    if let Err(e) = host.start_egress(entity) {
                        debug!("Egress retry for {} dropped: {}", entity, e);
                    }
                }
            }
            TimerEvent::TideTick(entity) => self.tide_tick(host, entity),
            TimerEvent::ViewerTick => self.viewer_tick(host),
        }
    }

    // -----------------------------------------------------------------------
    // Tides
    // -----------------------------------------------------------------------

    fn start_tide(&mut self, entity: EntityId) {
        let period = self.settings.gate().recheck_delay();
        let tracker = TideTracker::start(&mut self.timers, entity, period);
        if let Some(mut old) = self.tides.insert(entity, tracker) {
            old.cancel(&mut self.timers);
        }
    }

    /// With tides on, start a tracker for every live ship still in harbor
    /// that has none. The first tick follows one period later.
    fn start_idle_tides(&mut self, host: &dyn Host) {
        if !self.settings.tides_enabled {
            return;
        }
        let idle: Vec<EntityId> = self
            .in_harbor
            .iter()
            .copied()
            .filter(|e| !self.tides.contains_key(e) && host.entity_alive(*e))
            .collect();
        for entity in idle {
            self.start_tide(entity);
        }
    }

    fn tide_tick(&mut self, host: &mut dyn Host, entity: EntityId) {
        if !self.tides.contains_key(&entity) {
            return;
        }

        let alive = host.entity_alive(entity);
        let position = host.entity_position(entity);
        let water = host.water_height(self.settings.spawn_location);

        match tide::step(self.settings.tides_enabled, alive, position.map(|p| p.y), water) {
            TideStep::Stop => {
                if let Some(mut tracker) = self.tides.remove(&entity) {
                    tracker.cancel(&mut self.timers);
                }
                if !alive {
                    self.in_harbor.remove(&entity);
                }
            }
            TideStep::Hold => self.rearm_tide(entity),
            TideStep::Snap(y) => {
                if let Some(position) = position {
                    if let Err(e) = host.set_entity_position(entity, position.with_y(y)) {
                        debug!("Tide snap for {} dropped: {}", entity, e);
                    } else if self.settings.debug_enabled {
                        debug!("Adjusting {} height to water level {:.2}", entity, y);
                    }
                }
                self.rearm_tide(entity);
            }
        }
    }

    fn rearm_tide(&mut self, entity: EntityId) {
        let period = self.settings.gate().recheck_delay();
        if let Some(tracker) = self.tides.get_mut(&entity) {
            tracker.rearm(&mut self.timers, period);
        }
    }

    // -----------------------------------------------------------------------
    // Live view
    // -----------------------------------------------------------------------

    fn viewer_tick(&mut self, host: &mut dyn Host) {
        let outcome = self.viewers.tick(
            &mut self.timers,
            host,
            &self.settings.block_zones,
            self.settings.block_radius,
        );
        match outcome {
            TickOutcome::Stopped => debug!("Live view loop ended"),
            TickOutcome::Rendered { pruned } => {
                for player in pruned {
                    debug!("{} left live view (inactive)", player);
                    notify(host, player, messages::VIEW_STOPPED);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Handle `/cargo <args…>` from `player`. Replies go to the player; the
    /// returned error mirrors what was reported.
    pub fn on_command<S: AsRef<str>>(
        &mut self,
        host: &mut dyn Host,
        player: PlayerId,
        args: &[S],
    ) -> Result<(), CommandError> {
        if !host.has_permission(player, PERM_ADMIN) {
            notify(host, player, messages::NOT_ALLOWED);
            return Err(CommandError::Unauthorized);
        }

        let command = match Command::parse(args) {
            Ok(command) => command,
            Err(CommandError::InvalidArgument(detail)) => {
                notify(host, player, &messages::args_error(&detail));
                return Err(CommandError::InvalidArgument(detail));
            }
            Err(e) => return Err(e),
        };

        self.execute(host, player, command);
        Ok(())
    }

    pub fn execute(&mut self, host: &mut dyn Host, player: PlayerId, command: Command) {
        match command {
            Command::SetSpawn => {
                let Some(position) = host.player_position(player) else {
                    notify(host, player, messages::NO_POSITION);
                    return;
                };
                let spawn = position.with_y(host.water_height(position));
                self.settings.spawn_location = spawn;
                self.settings.block_zones.upsert_spawn(spawn);
                match self.save() {
                    Ok(()) => notify(host, player, &messages::spawn_location(spawn)),
                    Err(e) => notify(host, player, &messages::save_failed(&e.to_string())),
                }
            }
            Command::SpawnOverride(enabled) => {
                self.settings.spawn_override_enabled = enabled;
                notify(host, player, &messages::toggled("Spawn override", enabled));
            }
            Command::Add => {
                let Some(position) = host.player_position(player) else {
                    notify(host, player, messages::NO_POSITION);
                    return;
                };
                let id = self.settings.block_zones.add(position);
                info!("Block zone {} added at {}", id, position);
                notify(host, player, &messages::zone_added(id, position));
            }
            Command::Remove(id) => {
                let removed = match id {
                    Some(id) => match self.settings.block_zones.remove(id) {
                        Ok(_) => Ok(id),
                        Err(ZoneError::NotFound(_)) => {
                            self.settings.block_zones.remove_last().map(|z| z.id)
                        }
                        Err(e) => Err(e),
                    },
                    None => self.settings.block_zones.remove_last().map(|z| z.id),
                };
                match removed {
                    Ok(id) => {
                        info!("Block zone {} removed", id);
                        notify(host, player, &messages::zone_removed(id));
                    }
                    Err(_) => notify(host, player, messages::ONLY_SPAWN_LEFT),
                }
            }
            Command::List => {
                let lines: Vec<String> = self
                    .settings
                    .block_zones
                    .iter()
                    .map(|z| format!("zone {}: {}", z.id, z.position))
                    .collect();
                notify(host, player, &lines.join("\n"));
            }
            Command::Debug(enabled) => {
                self.settings.debug_enabled = enabled;
                notify(host, player, &messages::toggled("Debug", enabled));
            }
            Command::Tides(enabled) => {
                self.settings.tides_enabled = enabled;
                self.start_idle_tides(host);
                notify(host, player, &messages::toggled("Tide leveling", enabled));
            }
            Command::Reload => {
                match self.store.load() {
                    Ok(Some(settings)) => self.settings = settings,
                    Ok(None) => self.regenerate(host),
                    Err(e) => {
                        warn!("Reload failed ({}), regenerating defaults", e);
                        self.regenerate(host);
                    }
                }
                self.persisted = self.settings.fingerprint();
                self.start_idle_tides(host);
                info!("Settings reloaded");
                notify(host, player, messages::RELOADED);
            }
            Command::Reset => {
                self.regenerate(host);
                info!("Settings reset");
                notify(host, player, messages::RESET);
            }
            Command::Save => match self.save() {
                Ok(()) => notify(host, player, messages::SAVED),
                Err(e) => notify(host, player, &messages::save_failed(&e.to_string())),
            },
            Command::View => match self.viewers.toggle(&mut self.timers, &*host, player) {
                Toggle::On { started } => {
                    if started {
                        debug!("Live view loop started");
                    }
                    notify(host, player, messages::VIEW_STARTED);
                }
                Toggle::Off => notify(host, player, messages::VIEW_STOPPED),
            },
            Command::Blocked => {
                let Some(position) = host.player_position(player) else {
                    notify(host, player, messages::NO_POSITION);
                    return;
                };
                let zones = &self.settings.block_zones;
                let inside = zones.contains(position, self.settings.block_radius);
                let nearest = zones.nearest(position).map(|(z, d)| (z.id, d));
                notify(host, player, &messages::blocked(inside, nearest));
            }
            Command::Help => notify(host, player, messages::HELP),
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn save(&mut self) -> Result<(), StoreError> {
        if let Err(e) = self.store.save(&self.settings) {
            warn!("Failed to save settings: {}", e);
            return Err(e);
        }
        self.persisted = self.settings.fingerprint();
        info!("Settings saved");
        Ok(())
    }

    fn regenerate(&mut self, host: &mut dyn Host) {
        self.settings = default_settings(host);
        if let Err(e) = self.save() {
            warn!("Defaults regenerated but not persisted: {}", e);
        }
    }

    // -----------------------------------------------------------------------
    // Shutdown
    // -----------------------------------------------------------------------

    /// Cancel every task. Safe to call more than once.
    pub fn shutdown(&mut self, host: &mut dyn Host) {
        self.gate.cancel_all(&mut self.timers);
        for (_, mut tracker) in self.tides.drain() {
            tracker.cancel(&mut self.timers);
        }
        for player in self.viewers.stop(&mut self.timers) {
            notify(host, player, messages::VIEW_STOPPED);
        }
        self.timers.clear();
    }
}

fn default_settings(host: &mut dyn Host) -> Settings {
    let point = host.random_offshore_point();
    Settings::generate(point.with_y(host.water_height(point)))
}

/// Best effort; the player may already be gone.
fn notify(host: &mut dyn Host, player: PlayerId, text: &str) {
    if let Err(e) = host.send_message(player, text) {
        debug!("Message to {} dropped: {}", player, e);
    }
}
