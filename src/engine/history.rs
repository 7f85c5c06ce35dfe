//! Audit trail and version history of map edits.
//!
//! Recording is switched off entirely for tiers without the feature, so
//! lower tiers pay nothing for it.

use crate::models::mapping::{DeviceEntry, Room, WallSegment};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    AddRoom,
    EditRoom,
    MoveRoom,
    RemoveRoom,
    AddDevice,
    MoveDevice,
    RemoveDevice,
    AddWall,
    RemoveWall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub action: ChangeAction,
    /// The affected item as it looked after the change (before, for removals).
    pub detail: serde_json::Value,
    /// 1-based.
    pub floor: u32,
}

/// Copy of one floor's rooms, devices and walls taken after a change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub rooms: Vec<Room>,
    pub devices: Vec<DeviceEntry>,
    pub walls: Vec<WallSegment>,
    pub floor: u32,
    pub timestamp: DateTime<Utc>,
}

/// Borrowed view of a floor handed to [`ChangeHistory::record`].
pub struct FloorState<'a> {
    pub rooms: &'a [Room],
    pub devices: &'a [DeviceEntry],
    pub walls: &'a [WallSegment],
}

#[derive(Debug, Clone, Default)]
pub struct ChangeHistory {
    enabled: bool,
    user: String,
    entries: Vec<AuditEntry>,
    versions: Vec<Version>,
}

impl ChangeHistory {
    pub fn new(enabled: bool, user: impl Into<String>) -> Self {
        ChangeHistory {
            enabled,
            user: user.into(),
            entries: Vec::new(),
            versions: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn version(&self, index: usize) -> Option<&Version> {
        self.versions.get(index)
    }

    pub fn record<T: Serialize>(&mut self, action: ChangeAction, detail: &T, floor: u32, state: FloorState<'_>) {
        if !self.enabled {
            return;
        }
        let timestamp = Utc::now();
        let detail = serde_json::to_value(detail).unwrap_or(serde_json::Value::Null);
        debug!("History: {:?} on floor {} by {}", action, floor, self.user);
        self.entries.push(AuditEntry {
            timestamp,
            user: self.user.clone(),
            action,
            detail,
            floor,
        });
        self.versions.push(Version {
            rooms: state.rooms.to_vec(),
            devices: state.devices.to_vec(),
            walls: state.walls.to_vec(),
            floor,
            timestamp,
        });
    }
}
