//! One editing session: account, floors, rules and the status line, plus the
//! save/load round trip through a [`MappingGateway`].
//!
//! Tier and declared total live in the layout engine only; the session reads
//! them back from there for the save check.
//!
//! A save borrows the session mutably for the whole blocking call, so no edit
//! or second save can interleave with it. Concurrent sessions on other
//! machines are last-writer-wins.

use crate::client::{MappingClientError, MappingGateway};
use crate::engine::automation::{AutomationRuleModel, ReferenceCheck};
use crate::engine::error::{MappingError, Result};
use crate::engine::layout::FloorplanLayoutEngine;
use crate::models::account::Account;
use crate::models::mapping::MappingSnapshot;
use log::{info, warn};

pub const STATUS_SAVED: &str = "Saved!";
pub const STATUS_SAVE_FAILED: &str = "Save failed";
pub const STATUS_LOAD_FAILED: &str = "Load failed";

#[derive(Debug, Clone)]
pub struct MappingSession {
    engine: FloorplanLayoutEngine,
    rules: AutomationRuleModel,
    status: Option<String>,
}

impl MappingSession {
    pub fn new(account: Account, actor: impl Into<String>) -> Self {
        MappingSession {
            engine: FloorplanLayoutEngine::new(&account, actor),
            rules: AutomationRuleModel::default(),
            status: None,
        }
    }

    pub fn account(&self) -> Account {
        Account::new(self.engine.tier(), self.engine.total_sqft())
    }

    pub fn engine(&self) -> &FloorplanLayoutEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut FloorplanLayoutEngine {
        &mut self.engine
    }

    pub fn rules(&self) -> &AutomationRuleModel {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut AutomationRuleModel {
        &mut self.rules
    }

    /// Last inline status message ("Saved!", a quota message, ...).
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_account(&mut self, account: Account) {
        self.engine.set_tier(account.tier);
        self.engine.set_total_sqft(account.declared_sqft);
    }

    pub fn set_total_sqft(&mut self, total_sqft: f64) {
        self.engine.set_total_sqft(total_sqft);
    }

    /// Tier limits re-checked right before anything is sent.
    pub fn check_quotas(&self) -> Result<()> {
        let tier = self.engine.tier();
        let quota = tier.quota();
        let declared_sqft = self.engine.total_sqft();
        if declared_sqft > quota.max_sqft {
            return Err(MappingError::DeclaredAreaOverTier {
                tier,
                declared_sqft,
                max_sqft: quota.max_sqft,
            });
        }
        if self.engine.device_count() > quota.max_devices {
            return Err(MappingError::DeviceCountOverTier {
                tier,
                max_devices: quota.max_devices,
            });
        }
        Ok(())
    }

    /// Reference check of every rule against the devices of all floors.
    pub fn rule_checks(&self) -> Vec<ReferenceCheck> {
        self.rules.check_all(&self.engine.all_devices())
    }

    /// Send the current floor to `/mapping/save`. Exactly one gateway call is
    /// made when the quota check passes, none otherwise.
    pub fn save<G: MappingGateway + ?Sized>(&mut self, gateway: &G) -> Result<()> {
        self.checked_send(|session| gateway.save_snapshot(&session.engine.snapshot()))
    }

    /// Send the current floor's devices to the flat `POST /mapping` endpoint,
    /// the same floor [`Self::load_devices`] writes back to. The quota check
    /// still counts every floor.
    pub fn save_devices<G: MappingGateway + ?Sized>(&mut self, gateway: &G) -> Result<()> {
        self.checked_send(|session| gateway.store_devices(session.engine.floor().devices.devices()))
    }

    fn checked_send<F>(&mut self, send: F) -> Result<()>
    where
        F: FnOnce(&Self) -> std::result::Result<(), MappingClientError>,
    {
        if let Err(e) = self.check_quotas() {
            warn!("Save blocked: {}", e);
            self.status = Some(e.to_string());
            return Err(e);
        }
        match send(self) {
            Ok(()) => {
                info!("Mapping saved (floor {})", self.engine.current_floor_number());
                self.status = Some(STATUS_SAVED.to_string());
                Ok(())
            }
            Err(e) => {
                warn!("Save failed: {}", e);
                self.status = Some(e.user_message().unwrap_or(STATUS_SAVE_FAILED).to_string());
                Err(e.into())
            }
        }
    }

    /// Fetch `/mapping/load` and show its floor. A failed load, or one naming
    /// a floor out of range, leaves an empty mapping behind.
    pub fn load<G: MappingGateway + ?Sized>(&mut self, gateway: &G) -> Result<()> {
        let loaded = gateway
            .load_snapshot()
            .map_err(MappingError::from)
            .and_then(|snapshot| self.apply(snapshot));
        match loaded {
            Ok(()) => {
                self.status = None;
                Ok(())
            }
            Err(e) => {
                warn!("Load failed: {}", e);
                self.engine.clear();
                self.status = Some(STATUS_LOAD_FAILED.to_string());
                Err(e)
            }
        }
    }

    /// Fetch the flat device list into the current floor, replacing its
    /// devices. Other floors are untouched. A failed fetch leaves the current
    /// floor without devices.
    pub fn load_devices<G: MappingGateway + ?Sized>(&mut self, gateway: &G) -> Result<()> {
        match gateway.fetch_devices() {
            Ok(devices) => {
                info!("Loaded {} device(s)", devices.len());
                self.engine.set_devices(devices);
                Ok(())
            }
            Err(e) => {
                warn!("Loading devices failed: {}", e);
                self.engine.set_devices(Vec::new());
                Err(e.into())
            }
        }
    }

    /// Pull tier and declared footage from `/users`. The current account is
    /// kept when the call fails or returns nobody.
    pub fn refresh_account<G: MappingGateway + ?Sized>(&mut self, gateway: &G) -> Result<()> {
        let users = gateway.fetch_users()?;
        match Account::from_users(&users) {
            Some(account) => {
                info!(
                    "Account: tier={}, declared_sqft={}",
                    account.tier, account.declared_sqft
                );
                self.set_account(account);
            }
            None => warn!("No users returned; keeping tier {}", self.engine.tier()),
        }
        Ok(())
    }

    pub fn apply(&mut self, snapshot: MappingSnapshot) -> Result<()> {
        info!(
            "Applying floor {}: {} room(s), {} device(s), {} wall(s)",
            snapshot.floor,
            snapshot.rooms.len(),
            snapshot.devices.len(),
            snapshot.walls.len()
        );
        self.engine.apply_snapshot(snapshot)
    }
}

impl Default for MappingSession {
    fn default() -> Self {
        MappingSession::new(Account::default(), "user")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockMappingGateway;
    use crate::compression::{self, CompressedMapping};
    use crate::models::account::{Tier, UserRecord};
    use crate::models::mapping::{AnnotationTarget, DeviceEntry, DeviceType, Room};
    use std::cell::RefCell;

    /// Backend double that keeps the last save in its compressed form.
    #[derive(Default)]
    struct InMemoryBackend {
        stored: RefCell<Option<CompressedMapping>>,
        devices: RefCell<Vec<DeviceEntry>>,
    }

    impl MappingGateway for InMemoryBackend {
        fn fetch_devices(&self) -> std::result::Result<Vec<DeviceEntry>, MappingClientError> {
            Ok(self.devices.borrow().clone())
        }

        fn store_devices(&self, devices: &[DeviceEntry]) -> std::result::Result<(), MappingClientError> {
            *self.devices.borrow_mut() = devices.to_vec();
            Ok(())
        }

        fn load_snapshot(&self) -> std::result::Result<MappingSnapshot, MappingClientError> {
            match self.stored.borrow().as_ref() {
                Some(envelope) => Ok(compression::decode_envelope(envelope)?),
                None => Ok(MappingSnapshot::default()),
            }
        }

        fn save_snapshot(&self, snapshot: &MappingSnapshot) -> std::result::Result<(), MappingClientError> {
            *self.stored.borrow_mut() = Some(compression::encode_snapshot(snapshot)?);
            Ok(())
        }

        fn fetch_users(&self) -> std::result::Result<Vec<UserRecord>, MappingClientError> {
            Ok(Vec::new())
        }
    }

    fn session(tier: Tier, sqft: f64) -> MappingSession {
        MappingSession::new(Account::new(tier, sqft), "tester")
    }

    #[test]
    fn initial_account_blocks_save_without_calling_backend() {
        let mut s = MappingSession::default();
        let mut gateway = MockMappingGateway::new();
        gateway.expect_save_snapshot().never();

        let err = s.save(&gateway).expect_err("2000 sqft is over the free limit");
        assert!(matches!(err, MappingError::DeclaredAreaOverTier { .. }));
        assert_eq!(
            s.status(),
            Some(
                "Your declared square footage (2000) exceeds the limit for your subscription tier (free: 800 sqft). Please upgrade your plan."
            )
        );
    }

    #[test]
    fn too_many_loaded_devices_block_save() {
        let mut s = session(Tier::Free, 800.0);
        s.engine_mut().set_devices(vec![DeviceEntry::default(); 11]);
        let mut gateway = MockMappingGateway::new();
        gateway.expect_save_snapshot().never();
        gateway.expect_store_devices().never();

        assert!(matches!(s.save(&gateway), Err(MappingError::DeviceCountOverTier { .. })));
        assert!(s.save_devices(&gateway).is_err());
        assert!(s.status().is_some_and(|m| m.contains("free: 10 devices")));
    }

    #[test]
    fn save_checks_the_total_the_engine_budgets_against() {
        let mut s = session(Tier::Free, 800.0);
        s.engine_mut().set_total_sqft(5000.0);
        s.engine_mut()
            .add_room("Hall", 4000.0, 0, 0, 10, 10)
            .expect("fits the raised total");
        let mut gateway = MockMappingGateway::new();
        gateway.expect_save_snapshot().never();

        let err = s.save(&gateway).expect_err("5000 sqft is over the free limit");
        assert!(
            matches!(err, MappingError::DeclaredAreaOverTier { declared_sqft, .. } if declared_sqft == 5000.0),
            "{}",
            err
        );
        assert_eq!(s.account(), Account::new(Tier::Free, 5000.0));

        s.engine_mut().set_tier(Tier::Premium);
        s.engine_mut().set_total_sqft(2400.0);
        assert_eq!(s.account(), Account::new(Tier::Premium, 2400.0));
        assert!(s.check_quotas().is_ok());
    }

    #[test]
    fn passing_check_sends_exactly_once() {
        let mut s = session(Tier::Basic, 1200.0);
        s.engine_mut().add_room("Den", 200.0, 0, 0, 4, 4).expect("den");
        let mut gateway = MockMappingGateway::new();
        gateway
            .expect_save_snapshot()
            .times(1)
            .withf(|snapshot: &MappingSnapshot| snapshot.rooms.len() == 1 && snapshot.floor == 1)
            .returning(|_| Ok(()));

        s.save(&gateway).expect("saved");
        assert_eq!(s.status(), Some(STATUS_SAVED));
    }

    #[test]
    fn server_error_message_reaches_status() {
        let mut s = session(Tier::Free, 800.0);
        let mut gateway = MockMappingGateway::new();
        gateway.expect_save_snapshot().times(1).returning(|_| {
            Err(MappingClientError::Http {
                status: 400,
                message: "Mapping rejected".into(),
            })
        });
        gateway
            .expect_store_devices()
            .times(1)
            .returning(|_| Err(MappingClientError::Transport("connection refused".into())));

        assert!(s.save(&gateway).is_err());
        assert_eq!(s.status(), Some("Mapping rejected"));
        assert!(s.save_devices(&gateway).is_err());
        assert_eq!(s.status(), Some(STATUS_SAVE_FAILED));
    }

    #[test]
    fn failed_load_falls_back_to_empty_mapping() {
        let mut s = session(Tier::Free, 800.0);
        s.engine_mut().add_room("Den", 100.0, 0, 0, 4, 4).expect("den");
        s.engine_mut().add_floor().expect("floor");
        let mut gateway = MockMappingGateway::new();
        gateway
            .expect_load_snapshot()
            .times(1)
            .returning(|| Err(MappingClientError::Transport("timeout".into())));

        assert!(s.load(&gateway).is_err());
        assert_eq!(s.status(), Some(STATUS_LOAD_FAILED));
        assert_eq!(s.engine().floors().len(), 1);
        assert!(s.engine().floor().rooms.is_empty());
    }

    #[test]
    fn out_of_range_floor_is_a_failed_load() {
        let mut s = session(Tier::Free, 800.0);
        s.engine_mut().add_room("Den", 100.0, 0, 0, 4, 4).expect("den");
        let mut gateway = MockMappingGateway::new();
        gateway.expect_load_snapshot().times(1).returning(|| {
            Ok(crate::compression::decode_load_body(r#"{"rooms":[],"floor":4294967295}"#)?)
        });

        let err = s.load(&gateway).expect_err("floor out of range");
        assert!(matches!(err, MappingError::FloorOutOfRange { floor: u32::MAX, .. }));
        assert_eq!(s.status(), Some(STATUS_LOAD_FAILED));
        assert_eq!(s.engine().floors().len(), 1);
        assert!(s.engine().floor().rooms.is_empty());
    }

    #[test]
    fn failed_device_fetch_empties_floor_devices() {
        let mut s = session(Tier::Free, 800.0);
        s.engine_mut().add_device().expect("device");
        let mut gateway = MockMappingGateway::new();
        gateway
            .expect_fetch_devices()
            .times(1)
            .returning(|| Err(MappingClientError::Transport("timeout".into())));
        assert!(s.load_devices(&gateway).is_err());
        assert_eq!(s.engine().device_count(), 0);
    }

    #[test]
    fn save_then_load_reproduces_the_floor() {
        let backend = InMemoryBackend::default();
        let mut s = session(Tier::Premium, 2000.0);
        {
            let e = s.engine_mut();
            e.add_floor().expect("floor");
            e.add_room_entry(Room::new("Den", 300.0, 1, 1, 6, 4)).expect("den");
            let d = e.add_device().expect("device");
            e.move_device(d, 120.0, 40.0).expect("move");
            e.add_wall(0.0, 0.0, 200.0, 0.0);
            e.add_annotation(AnnotationTarget::Room, "Den", "new carpet", "tester")
                .expect("annotation");
        }
        let saved = s.engine().snapshot();
        s.save(&backend).expect("save");

        let mut fresh = session(Tier::Premium, 2000.0);
        fresh.load(&backend).expect("load");
        assert_eq!(fresh.engine().current_floor_number(), 2);
        assert_eq!(fresh.engine().snapshot(), saved);
        assert_eq!(fresh.engine().floors()[0].rooms.len(), 0);
    }

    #[test]
    fn device_list_round_trip() {
        let backend = InMemoryBackend::default();
        let mut s = session(Tier::Free, 800.0);
        let mut rng = <rand::rngs::SmallRng as rand::SeedableRng>::seed_from_u64(3);
        s.engine_mut().place_device(DeviceType::Door, &mut rng).expect("door");
        s.save_devices(&backend).expect("save devices");

        let mut fresh = session(Tier::Free, 800.0);
        fresh.load_devices(&backend).expect("load devices");
        assert_eq!(fresh.engine().all_devices(), s.engine().all_devices());
    }

    #[test]
    fn device_list_round_trip_leaves_other_floors_alone() {
        let backend = InMemoryBackend::default();
        let mut s = session(Tier::Free, 800.0);
        for floor in 0..2 {
            if floor > 0 {
                s.engine_mut().add_floor().expect("floor");
            }
            for _ in 0..3 {
                s.engine_mut().add_device().expect("device");
            }
        }

        s.save_devices(&backend).expect("save devices");
        assert_eq!(backend.devices.borrow().len(), 3);
        s.load_devices(&backend).expect("load devices");
        assert_eq!(s.engine().device_count(), 6);
        assert_eq!(s.engine().floors()[0].devices.len(), 3);
        assert_eq!(s.engine().floor().devices.len(), 3);

        // a second round trip neither grows the list nor trips the quota
        s.save_devices(&backend).expect("save devices again");
        s.load_devices(&backend).expect("load devices again");
        assert_eq!(s.engine().device_count(), 6);
    }

    #[test]
    fn refresh_account_adopts_admin_tier() {
        let mut s = MappingSession::default();
        let mut gateway = MockMappingGateway::new();
        gateway.expect_fetch_users().times(1).returning(|| {
            Ok(vec![
                UserRecord {
                    username: Some("guest".into()),
                    role: Some("user".into()),
                    subscription_tier: Some("free".into()),
                    declared_sqft: Some(100.0),
                },
                UserRecord {
                    username: Some("owner".into()),
                    role: Some("admin".into()),
                    subscription_tier: Some("premium".into()),
                    declared_sqft: Some(2200.0),
                },
            ])
        });
        gateway.expect_save_snapshot().times(1).returning(|_| Ok(()));

        s.refresh_account(&gateway).expect("refresh");
        assert_eq!(s.account(), Account::new(Tier::Premium, 2200.0));
        assert_eq!(s.engine().total_sqft(), 2200.0);
        assert!(s.engine().audit_trail().is_ok());
        s.save(&gateway).expect("premium allows 2200 sqft");
    }

    #[test]
    fn empty_user_list_keeps_account() {
        let mut s = session(Tier::Basic, 900.0);
        let backend = InMemoryBackend::default();
        s.refresh_account(&backend).expect("refresh");
        assert_eq!(s.account(), Account::new(Tier::Basic, 900.0));
    }

    #[test]
    fn rule_checks_see_every_floor() {
        use crate::models::automation::AutomationRule;
        use crate::models::mapping::DeviceField;

        let mut s = session(Tier::Free, 800.0);
        let d = s.engine_mut().add_device().expect("device");
        s.engine_mut().update_device(d, DeviceField::Id("m1".into())).expect("id");
        s.engine_mut().add_floor().expect("floor");
        s.rules_mut().add(AutomationRule {
            trigger_id: "m1".into(),
            action_id: "b9".into(),
            ..AutomationRule::default()
        });
        let checks = s.rule_checks();
        assert!(!checks[0].missing_trigger);
        assert!(checks[0].missing_action);
    }
}
