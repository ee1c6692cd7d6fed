//! Operator command unit tests

#[cfg(test)]
mod tests {
    use harbor_gate::command::{Command, CommandError, PERM_ADMIN};
    use harbor_gate::messages;
    use harbor_gate::settings::{ConfigStore, MemoryStore, Settings, StoreError};
    use harbor_gate::sim::SimPlayer;
    use harbor_gate::water::TideLevel;
    use harbor_gate::zones::SPAWN_ZONE_ID;
    use harbor_gate::{EntityId, HarborService, Host, PlayerId, SimHost, Vec3};
    use std::time::Duration;
    use std::sync::{Arc, Mutex};

    const ADMIN: PlayerId = PlayerId(1);
    const GUEST: PlayerId = PlayerId(2);

    /// Store handle the test keeps after the service takes ownership.
    #[derive(Clone, Default)]
    struct SharedStore(Arc<Mutex<MemoryStore>>);

    impl SharedStore {
        fn saves(&self) -> usize {
            self.0.lock().unwrap().saves()
        }

        fn stored(&self) -> Option<Settings> {
            self.0.lock().unwrap().load().unwrap()
        }
    }

    impl ConfigStore for SharedStore {
        fn load(&mut self) -> Result<Option<Settings>, StoreError> {
            self.0.lock().unwrap().load()
        }

        fn save(&mut self, settings: &Settings) -> Result<(), StoreError> {
            self.0.lock().unwrap().save(settings)
        }
    }

    fn make_harbor() -> (HarborService, SimHost, SharedStore) {
        let mut host = SimHost::new(TideLevel::flat(1.5), 9);
        host.add_player(
            ADMIN,
            SimPlayer::new(Vec3::new(200.0, 12.0, -40.0)).with_permission(PERM_ADMIN),
        );
        host.add_player(GUEST, SimPlayer::new(Vec3::new(0.0, 0.0, 0.0)));

        let store = SharedStore::default();
        store
            .clone()
            .save(&Settings::generate(Vec3::new(0.0, 1.5, 0.0)))
            .unwrap();
        let service = HarborService::load(Box::new(store.clone()), &mut host).unwrap();
        (service, host, store)
    }

    fn last_message(host: &SimHost, player: PlayerId) -> String {
        host.messages_for(player)
            .last()
            .map(|m| m.to_string())
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn parse_subcommands() {
        assert_eq!(Command::parse::<&str>(&[]), Ok(Command::Help));
        assert_eq!(Command::parse(&["bogus"]), Ok(Command::Help));
        assert_eq!(Command::parse(&["spawn"]), Ok(Command::SetSpawn));
        assert_eq!(Command::parse(&["spawn", "ON"]), Ok(Command::SpawnOverride(true)));
        assert_eq!(Command::parse(&["remove"]), Ok(Command::Remove(None)));
        assert_eq!(Command::parse(&["remove", "3"]), Ok(Command::Remove(Some(3))));
        assert_eq!(Command::parse(&["remove", "x"]), Ok(Command::Remove(None)));
        assert_eq!(Command::parse(&["debug", "off"]), Ok(Command::Debug(false)));
        assert_eq!(Command::parse(&["view"]), Ok(Command::View));
    }

    #[test]
    fn bad_switch_is_invalid_argument() {
        assert!(matches!(
            Command::parse(&["debug", "maybe"]),
            Err(CommandError::InvalidArgument(_))
        ));
        assert!(matches!(
            Command::parse(&["tides"]),
            Err(CommandError::InvalidArgument(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Authorization
    // -----------------------------------------------------------------------

    #[test]
    fn unauthorized_player_changes_nothing() {
        let (mut svc, mut host, store) = make_harbor();
        let before = svc.settings().clone();

        for args in [vec!["add"], vec!["reset"], vec!["spawn"], vec!["debug", "on"]] {
            assert_eq!(
                svc.on_command(&mut host, GUEST, &args),
                Err(CommandError::Unauthorized)
            );
            assert_eq!(last_message(&host, GUEST), messages::NOT_ALLOWED);
        }
        assert_eq!(svc.settings(), &before);
        assert_eq!(store.saves(), 1);
    }

    #[test]
    fn invalid_argument_is_reported() {
        let (mut svc, mut host, _) = make_harbor();
        let result = svc.on_command(&mut host, ADMIN, &["spawn", "sideways"]);
        assert!(matches!(result, Err(CommandError::InvalidArgument(_))));
        assert!(last_message(&host, ADMIN).starts_with("Invalid arguments"));
        assert!(!svc.settings().spawn_override_enabled);
    }

    #[test]
    fn missing_subcommand_prints_help() {
        let (mut svc, mut host, _) = make_harbor();
        svc.on_command::<&str>(&mut host, ADMIN, &[]).unwrap();
        assert_eq!(last_message(&host, ADMIN), messages::HELP);
    }

    // -----------------------------------------------------------------------
    // Zones
    // -----------------------------------------------------------------------

    #[test]
    fn spawn_moves_zone_zero_to_water_and_persists() {
        let (mut svc, mut host, store) = make_harbor();
        svc.on_command(&mut host, ADMIN, &["spawn"]).unwrap();

        let expected = Vec3::new(200.0, 1.5, -40.0);
        assert_eq!(svc.settings().spawn_location, expected);
        assert_eq!(svc.settings().block_zones.get(SPAWN_ZONE_ID), Some(expected));
        assert_eq!(store.stored().unwrap().spawn_location, expected);
        assert_eq!(last_message(&host, ADMIN), messages::spawn_location(expected));
        assert!(!svc.is_dirty());
    }

    #[test]
    fn spawn_switch_is_not_persisted() {
        let (mut svc, mut host, store) = make_harbor();
        svc.on_command(&mut host, ADMIN, &["spawn", "on"]).unwrap();
        assert!(svc.settings().spawn_override_enabled);
        assert!(!store.stored().unwrap().spawn_override_enabled);
        assert!(svc.is_dirty());
    }

    #[test]
    fn add_and_remove_zones() {
        let (mut svc, mut host, _) = make_harbor();
        svc.on_command(&mut host, ADMIN, &["add"]).unwrap();
        svc.on_command(&mut host, ADMIN, &["add"]).unwrap();
        assert_eq!(svc.settings().block_zones.len(), 3);
        assert_eq!(
            svc.settings().block_zones.get(2),
            Some(Vec3::new(200.0, 12.0, -40.0))
        );

        svc.on_command(&mut host, ADMIN, &["remove", "1"]).unwrap();
        assert!(svc.settings().block_zones.get(1).is_none());
        assert_eq!(last_message(&host, ADMIN), messages::zone_removed(1));
    }

    #[test]
    fn remove_falls_back_to_latest() {
        let (mut svc, mut host, _) = make_harbor();
        for _ in 0..3 {
            svc.on_command(&mut host, ADMIN, &["add"]).unwrap();
        }

        svc.on_command(&mut host, ADMIN, &["remove"]).unwrap();
        assert!(svc.settings().block_zones.get(3).is_none());
        svc.on_command(&mut host, ADMIN, &["remove", "abc"]).unwrap();
        assert!(svc.settings().block_zones.get(2).is_none());
        svc.on_command(&mut host, ADMIN, &["remove", "99"]).unwrap();
        assert!(svc.settings().block_zones.get(1).is_none());

        svc.on_command(&mut host, ADMIN, &["remove"]).unwrap();
        assert_eq!(last_message(&host, ADMIN), messages::ONLY_SPAWN_LEFT);
        assert_eq!(svc.settings().block_zones.len(), 1);
        assert!(svc.settings().block_zones.has_spawn());
    }

    #[test]
    fn blocked_reports_containment() {
        let (mut svc, mut host, _) = make_harbor();
        svc.on_command(&mut host, ADMIN, &["blocked"]).unwrap();
        assert!(last_message(&host, ADMIN).starts_with("You are not inside"));

        svc.on_command(&mut host, ADMIN, &["add"]).unwrap();
        svc.on_command(&mut host, ADMIN, &["blocked"]).unwrap();
        assert!(last_message(&host, ADMIN).starts_with("You are inside"));
    }

    #[test]
    fn list_shows_every_zone() {
        let (mut svc, mut host, _) = make_harbor();
        svc.on_command(&mut host, ADMIN, &["add"]).unwrap();
        svc.on_command(&mut host, ADMIN, &["list"]).unwrap();
        let listing = last_message(&host, ADMIN);
        assert!(listing.contains("zone 0:"));
        assert!(listing.contains("zone 1:"));
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    #[test]
    fn save_persists_live_edits() {
        let (mut svc, mut host, store) = make_harbor();
        svc.on_command(&mut host, ADMIN, &["add"]).unwrap();
        assert_eq!(store.stored().unwrap().block_zones.len(), 1);

        svc.on_command(&mut host, ADMIN, &["save"]).unwrap();
        assert_eq!(store.stored().unwrap().block_zones.len(), 2);
        assert_eq!(last_message(&host, ADMIN), messages::SAVED);
    }

    #[test]
    fn reload_discards_unsaved_edits() {
        let (mut svc, mut host, _) = make_harbor();
        svc.on_command(&mut host, ADMIN, &["add"]).unwrap();
        svc.on_command(&mut host, ADMIN, &["debug", "on"]).unwrap();

        svc.on_command(&mut host, ADMIN, &["reload"]).unwrap();
        assert_eq!(svc.settings().block_zones.len(), 1);
        assert!(!svc.settings().debug_enabled);
        assert_eq!(last_message(&host, ADMIN), messages::RELOADED);
    }

    #[test]
    fn reset_leaves_exactly_the_spawn_zone() {
        let (mut svc, mut host, store) = make_harbor();
        for _ in 0..4 {
            svc.on_command(&mut host, ADMIN, &["add"]).unwrap();
        }
        svc.on_command(&mut host, ADMIN, &["tides", "on"]).unwrap();

        svc.on_command(&mut host, ADMIN, &["reset"]).unwrap();
        let zones = &svc.settings().block_zones;
        assert_eq!(zones.len(), 1);
        assert!(zones.has_spawn());
        assert!(!svc.settings().tides_enabled);
        assert_eq!(store.stored().as_ref(), Some(svc.settings()));
        // Generated spawn points sit on the water.
        assert_eq!(svc.settings().spawn_location.y, 1.5);
    }

    #[test]
    fn corrupt_document_is_regenerated_on_load() {
        let mut host = SimHost::new(TideLevel::flat(0.0), 3);
        let store = MemoryStore::with_document("{ this is not json");
        let svc = HarborService::load(Box::new(store), &mut host).unwrap();
        assert_eq!(svc.settings().block_zones.len(), 1);
        assert_eq!(svc.settings().block_radius, 120.0);
    }

    #[test]
    fn removed_spawn_zone_survives_save_and_reload() {
        let (mut svc, mut host, _) = make_harbor();
        svc.on_command(&mut host, ADMIN, &["add"]).unwrap();
        svc.on_command(&mut host, ADMIN, &["remove", "0"]).unwrap();
        assert_eq!(last_message(&host, ADMIN), messages::zone_removed(0));

        svc.on_command(&mut host, ADMIN, &["save"]).unwrap();
        svc.on_command(&mut host, ADMIN, &["reload"]).unwrap();
        let ids: Vec<u32> = svc.settings().block_zones.iter().map(|z| z.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn reload_enabling_tides_tracks_ships_in_harbor() {
        const SHIP: EntityId = EntityId(11);
        let (mut svc, mut host, store) = make_harbor();
        host.spawn_entity(SHIP, Vec3::new(5.0, 9.0, 5.0));
        svc.on_entity_spawned(&mut host, SHIP);
        assert!(svc.tide_tracker(SHIP).is_none());

        let mut stored = store.stored().unwrap();
        stored.tides_enabled = true;
        store.clone().save(&stored).unwrap();

        svc.on_command(&mut host, ADMIN, &["reload"]).unwrap();
        assert!(svc.tide_tracker(SHIP).is_some());
        svc.advance_by(&mut host, Duration::from_secs(10));
        assert_eq!(host.entity_position(SHIP).map(|p| p.y), Some(1.5));
    }

    #[test]
    fn oversized_delay_is_regenerated_on_load() {
        let mut host = SimHost::new(TideLevel::flat(0.0), 3);
        let mut settings = Settings::generate(Vec3::zero());
        settings.recheck_delay_seconds = 1e30;
        let store = MemoryStore::with_document(serde_json::to_string(&settings).unwrap());
        let mut svc = HarborService::load(Box::new(store), &mut host).unwrap();
        assert_eq!(svc.settings().recheck_delay_seconds, 10.0);

        let ship = EntityId(4);
        let spawn = svc.settings().spawn_location;
        host.spawn_entity(ship, spawn);
        svc.on_entity_spawned(&mut host, ship);
        assert!(svc.on_egress_requested(&mut host, ship).blocks());
        assert_eq!(svc.next_deadline(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn missing_spawn_location_is_regenerated_offshore() {
        let mut host = SimHost::new(TideLevel::flat(0.0), 3);
        let store = MemoryStore::with_document(r#"{ "debugEnabled": true }"#);
        let svc = HarborService::load(Box::new(store), &mut host).unwrap();

        let spawn = svc.settings().spawn_location;
        assert!((spawn.distance(&Vec3::zero()) - host.offshore_radius).abs() < 1.0);
        assert_eq!(svc.settings().block_zones.get(SPAWN_ZONE_ID), Some(spawn));
        assert!(!svc.settings().debug_enabled);
    }
}
