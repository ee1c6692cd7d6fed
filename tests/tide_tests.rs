//! Tide tracker unit tests

#[cfg(test)]
mod tests {
    use harbor_gate::command::PERM_ADMIN;
    use harbor_gate::protocol::HostEffect;
    use harbor_gate::settings::{MemoryStore, Settings};
    use harbor_gate::sim::SimPlayer;
    use harbor_gate::tide::{step, TideStep};
    use harbor_gate::water::{TideLevel, WaterSource};
    use harbor_gate::{EntityId, HarborService, Host, PlayerId, SimHost, Vec3};
    use std::time::Duration;

    const SHIP: EntityId = EntityId(3);
    const ADMIN: PlayerId = PlayerId(1);
    const PERIOD: Duration = Duration::from_secs(5);

    fn make_harbor(tides: bool) -> (HarborService, SimHost) {
        let mut settings = Settings::generate(Vec3::new(500.0, 0.0, 500.0));
        settings.recheck_delay_seconds = 5.0;
        settings.tides_enabled = tides;

        let mut host = SimHost::new(TideLevel::flat(0.0), 7);
        host.add_player(ADMIN, SimPlayer::new(Vec3::zero()).with_permission(PERM_ADMIN));
        let store = MemoryStore::with_document(settings.to_json().unwrap());
        let service = HarborService::load(Box::new(store), &mut host).unwrap();
        (service, host)
    }

    fn position_writes(host: &SimHost) -> usize {
        host.effects()
            .iter()
            .filter(|e| matches!(e, HostEffect::EntityPosition { .. }))
            .count()
    }

    // -----------------------------------------------------------------------
    // Step function
    // -----------------------------------------------------------------------

    #[test]
    fn step_snaps_when_heights_differ() {
        assert_eq!(step(true, true, Some(3.0), 1.5), TideStep::Snap(1.5));
        assert_eq!(step(true, true, Some(1.5), 1.5), TideStep::Hold);
    }

    #[test]
    fn step_stops_when_disabled_or_gone() {
        assert_eq!(step(false, true, Some(3.0), 1.5), TideStep::Stop);
        assert_eq!(step(true, false, Some(3.0), 1.5), TideStep::Stop);
        assert_eq!(step(true, true, None, 1.5), TideStep::Stop);
    }

    // -----------------------------------------------------------------------
    // Tracking
    // -----------------------------------------------------------------------

    #[test]
    fn ship_converges_to_water_within_one_tick() {
        let (mut svc, mut host) = make_harbor(true);
        host.spawn_entity(SHIP, Vec3::new(40.0, 6.0, -12.0));
        host.set_water_level(2.5);
        svc.on_entity_spawned(&mut host, SHIP);

        svc.advance_by(&mut host, PERIOD);

        // Only the height changes.
        assert_eq!(host.entity_position(SHIP), Some(Vec3::new(40.0, 2.5, -12.0)));
        assert_eq!(svc.tide_tracker(SHIP).map(|t| t.ticks()), Some(1));
    }

    #[test]
    fn water_is_sampled_at_the_spawn_location() {
        let mut settings = Settings::generate(Vec3::new(500.0, 0.0, 500.0));
        settings.recheck_delay_seconds = 5.0;
        settings.tides_enabled = true;
        let mut host = SimHost::new(
            TideLevel {
                level: 1.0,
                swell: 2.0,
            },
            7,
        );
        let store = MemoryStore::with_document(settings.to_json().unwrap());
        let mut svc = HarborService::load(Box::new(store), &mut host).unwrap();

        let at_spawn = host.water().height_at(500.0, 500.0);
        let at_ship = host.water().height_at(0.0, 0.0);
        assert_ne!(at_spawn, at_ship);

        host.spawn_entity(SHIP, Vec3::new(0.0, 9.0, 0.0));
        svc.on_entity_spawned(&mut host, SHIP);
        svc.advance_by(&mut host, PERIOD);

        assert_eq!(host.entity_position(SHIP).map(|p| p.y), Some(at_spawn));
    }

    #[test]
    fn level_ship_is_not_rewritten() {
        let (mut svc, mut host) = make_harbor(true);
        host.spawn_entity(SHIP, Vec3::new(1.0, 0.0, 1.0));
        svc.on_entity_spawned(&mut host, SHIP);

        svc.advance_by(&mut host, PERIOD * 3);
        assert_eq!(position_writes(&host), 0);
        assert_eq!(svc.tide_tracker(SHIP).map(|t| t.ticks()), Some(3));
    }

    #[test]
    fn disabling_tides_stops_the_tracker_without_writes() {
        let (mut svc, mut host) = make_harbor(true);
        host.spawn_entity(SHIP, Vec3::new(1.0, 4.0, 1.0));
        svc.on_entity_spawned(&mut host, SHIP);
        svc.advance_by(&mut host, PERIOD);
        let writes = position_writes(&host);

        svc.on_command(&mut host, ADMIN, &["tides", "off"]).unwrap();
        host.move_entity(SHIP, Vec3::new(1.0, 9.0, 1.0));
        svc.advance_by(&mut host, PERIOD);

        assert!(svc.tide_tracker(SHIP).is_none());
        assert_eq!(position_writes(&host), writes);
        assert_eq!(host.entity_position(SHIP).map(|p| p.y), Some(9.0));

        svc.advance_by(&mut host, PERIOD * 4);
        assert!(svc.next_deadline().is_none());
    }

    #[test]
    fn enabling_tides_starts_tracking_ships_in_harbor() {
        let (mut svc, mut host) = make_harbor(false);
        host.spawn_entity(SHIP, Vec3::new(1.0, 4.0, 1.0));
        svc.on_entity_spawned(&mut host, SHIP);
        assert!(svc.tide_tracker(SHIP).is_none());

        svc.on_command(&mut host, ADMIN, &["tides", "on"]).unwrap();
        assert!(svc.settings().tides_enabled);
        assert_eq!(svc.tide_tracker(SHIP).map(|t| t.entity()), Some(SHIP));
        svc.advance_by(&mut host, PERIOD);

        assert_eq!(host.entity_position(SHIP).map(|p| p.y), Some(0.0));
    }

    #[test]
    fn tracker_ends_when_ship_disappears() {
        let (mut svc, mut host) = make_harbor(true);
        host.spawn_entity(SHIP, Vec3::new(1.0, 4.0, 1.0));
        svc.on_entity_spawned(&mut host, SHIP);

        host.destroy_entity(SHIP);
        svc.advance_by(&mut host, PERIOD);

        assert!(svc.tide_tracker(SHIP).is_none());
        assert_eq!(svc.stats().ships_in_harbor, 0);
        assert!(svc.next_deadline().is_none());
    }

    // -----------------------------------------------------------------------
    // Spawn override
    // -----------------------------------------------------------------------

    #[test]
    fn spawn_override_moves_ship_to_water_at_spawn() {
        let mut settings = Settings::generate(Vec3::new(50.0, 7.0, 60.0));
        settings.spawn_override_enabled = true;
        let mut host = SimHost::new(TideLevel::flat(1.0), 7);
        let store = MemoryStore::with_document(settings.to_json().unwrap());
        let mut svc = HarborService::load(Box::new(store), &mut host).unwrap();

        host.spawn_entity(SHIP, Vec3::new(-900.0, 0.0, 900.0));
        svc.on_entity_spawned(&mut host, SHIP);

        assert_eq!(host.entity_position(SHIP), Some(Vec3::new(50.0, 1.0, 60.0)));
        assert!(svc.tide_tracker(SHIP).is_none());
    }

    #[test]
    fn spawn_without_override_leaves_ship_alone() {
        let (mut svc, mut host) = make_harbor(false);
        host.spawn_entity(SHIP, Vec3::new(-900.0, 0.0, 900.0));
        svc.on_entity_spawned(&mut host, SHIP);
        assert_eq!(host.entity_position(SHIP), Some(Vec3::new(-900.0, 0.0, 900.0)));
    }
}
