//! Device placements of one floor and the tier device quota.

use crate::engine::error::{MappingError, Result};
use crate::engine::geometry::{DEVICE_HIT_PX, Point};
use crate::models::account::Tier;
use crate::models::mapping::{DeviceEntry, DeviceField};
use std::collections::BTreeMap;

/// Whether one more device fits under `tier` when `count` already exist.
pub fn check_device_quota(count: usize, tier: Tier) -> Result<()> {
    let max_devices = tier.quota().max_devices;
    if count >= max_devices {
        return Err(MappingError::DeviceLimitReached { tier, max_devices });
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceMapModel {
    devices: Vec<DeviceEntry>,
}

impl DeviceMapModel {
    pub fn from_devices(devices: Vec<DeviceEntry>) -> Self {
        DeviceMapModel { devices }
    }

    pub fn devices(&self) -> &[DeviceEntry] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// First entry with this id. Ids are soft keys, so later duplicates are shadowed.
    pub fn find(&self, id: &str) -> Option<&DeviceEntry> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// Append `entry` unless `total_devices` (across every floor) has already
    /// reached the tier quota. Returns the new index.
    pub fn add(&mut self, entry: DeviceEntry, total_devices: usize, tier: Tier) -> Result<usize> {
        check_device_quota(total_devices, tier)?;
        self.devices.push(entry);
        Ok(self.devices.len() - 1)
    }

    pub fn update_field(&mut self, index: usize, field: DeviceField) -> Result<()> {
        self.get_mut(index)?.apply(field);
        Ok(())
    }

    pub fn move_to(&mut self, index: usize, x: f64, y: f64) -> Result<()> {
        let device = self.get_mut(index)?;
        device.x = x;
        device.y = y;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<DeviceEntry> {
        (index < self.devices.len()).then(|| self.devices.remove(index))
    }

    /// Index of the topmost device whose marker covers `p`.
    pub fn hit_test(&self, p: Point) -> Option<usize> {
        self.devices
            .iter()
            .rposition(|d| Point::new(d.x, d.y).distance(p) < DEVICE_HIT_PX)
    }

    /// Non-empty ids used by more than one entry, with their counts.
    pub fn duplicate_ids(&self) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for d in self.devices.iter().filter(|d| !d.id.is_empty()) {
            *counts.entry(d.id.clone()).or_default() += 1;
        }
        counts.retain(|_, n| *n > 1);
        counts
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut DeviceEntry> {
        let len = self.devices.len();
        self.devices.get_mut(index).ok_or(MappingError::IndexOutOfRange {
            kind: "device",
            index,
            len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mapping::DeviceType;

    fn device(id: &str, x: f64, y: f64) -> DeviceEntry {
        DeviceEntry {
            id: id.to_string(),
            x,
            y,
            ..DeviceEntry::default()
        }
    }

    #[test]
    fn free_tier_stops_at_ten_devices() {
        let mut model = DeviceMapModel::default();
        for _ in 0..10 {
            model
                .add(DeviceEntry::default(), model.len(), Tier::Free)
                .expect("under quota");
        }
        let err = model
            .add(DeviceEntry::default(), model.len(), Tier::Free)
            .expect_err("quota reached");
        assert_eq!(model.len(), 10);
        assert!(err.to_string().contains("free: 10 devices"));
    }

    #[test]
    fn quota_holds_for_every_tier() {
        for tier in [Tier::Free, Tier::Basic, Tier::Premium] {
            let mut model = DeviceMapModel::default();
            for _ in 0..60 {
                let _ = model.add(DeviceEntry::default(), model.len(), tier);
                assert!(model.len() <= tier.quota().max_devices);
            }
            assert_eq!(model.len(), tier.quota().max_devices);
        }
    }

    #[test]
    fn update_and_move_are_unconditional() {
        let mut model = DeviceMapModel::from_devices(vec![device("", 0.0, 0.0)]);
        model.update_field(0, DeviceField::Id("door-1".into())).expect("id");
        model.update_field(0, DeviceField::Type(DeviceType::Door)).expect("type");
        model.move_to(0, -40.0, 1e6).expect("move");
        let d = &model.devices()[0];
        assert_eq!(d.id, "door-1");
        assert_eq!(d.device_type, DeviceType::Door);
        assert_eq!((d.x, d.y), (-40.0, 1e6));
        assert!(model.move_to(1, 0.0, 0.0).is_err());
    }

    #[test]
    fn hit_test_uses_marker_radius() {
        let model = DeviceMapModel::from_devices(vec![device("a", 100.0, 100.0), device("b", 110.0, 100.0)]);
        assert_eq!(model.hit_test(Point::new(104.0, 100.0)), Some(1));
        assert_eq!(model.hit_test(Point::new(90.0, 100.0)), Some(0));
        assert_eq!(model.hit_test(Point::new(100.0, 130.0)), None);
    }

    #[test]
    fn duplicate_ids_ignore_blank_entries() {
        let model = DeviceMapModel::from_devices(vec![
            device("m1", 0.0, 0.0),
            device("m1", 0.0, 0.0),
            device("", 0.0, 0.0),
            device("", 0.0, 0.0),
            device("b1", 0.0, 0.0),
        ]);
        let dups = model.duplicate_ids();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups.get("m1"), Some(&2));
        assert_eq!(model.find("b1").map(|d| d.id.as_str()), Some("b1"));
    }
}
