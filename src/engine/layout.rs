//! Floorplan layout engine: floors, placement rules, pointer gestures and the
//! wall tool.
//!
//! Composes the per-floor room, device and wall models. Area budget and device
//! quota are account-wide, so they are computed here across every floor before
//! a model is asked to accept a new item.

use crate::engine::devices::DeviceMapModel;
use crate::engine::error::{MappingError, Result};
use crate::engine::geometry::{EDGE_SNAP_PX, GRID_PX, Point, snap_point_to_grid, snap_to_grid, snap_to_room_edges};
use crate::engine::history::{AuditEntry, ChangeAction, ChangeHistory, FloorState, Version};
use crate::engine::rooms::{RoomModel, remaining_sqft, room_rect};
use crate::engine::walls::WallModel;
use crate::models::account::{Account, Feature, Tier};
use crate::models::mapping::{
    Annotation, AnnotationTarget, DeviceEntry, DeviceField, DeviceType, MappingSnapshot, Room, RoomType, WallSegment,
};
use crate::utils::capitalize;
use chrono::Utc;
use log::{debug, info};
use rand::Rng;
use serde::Serialize;

const ZOOM_STEP: f64 = 1.2;
/// Highest floor number a mapping may have.
pub const MAX_FLOORS: u32 = 100;
/// Footprint of a room dropped from the palette, in cells.
const PALETTE_ROOM_CELLS: (u32, u32) = (6, 4);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Floor {
    pub rooms: RoomModel,
    pub devices: DeviceMapModel,
    pub walls: WallModel,
    pub annotations: Vec<Annotation>,
}

impl Floor {
    pub fn from_snapshot(snapshot: MappingSnapshot) -> Self {
        Floor {
            rooms: RoomModel::from_rooms(snapshot.rooms),
            devices: DeviceMapModel::from_devices(snapshot.devices),
            walls: WallModel::from_walls(snapshot.walls),
            annotations: snapshot.annotations,
        }
    }

    pub fn to_snapshot(&self, floor: u32) -> MappingSnapshot {
        MappingSnapshot {
            rooms: self.rooms.rooms().to_vec(),
            devices: self.devices.devices().to_vec(),
            walls: self.walls.walls().to_vec(),
            annotations: self.annotations.clone(),
            floor,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub scale: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            scale: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

impl Viewport {
    pub fn to_world(&self, screen: Point) -> Point {
        Point::new((screen.x - self.pan_x) / self.scale, (screen.y - self.pan_y) / self.scale)
    }

    pub fn zoom_in(&mut self) {
        self.scale *= ZOOM_STEP;
    }

    pub fn zoom_out(&mut self) {
        self.scale /= ZOOM_STEP;
    }

    pub fn reset(&mut self) {
        *self = Viewport::default();
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum WallTool {
    #[default]
    Idle,
    /// Two clicks make a wall; `start` holds the first one.
    Draw { start: Option<Point> },
    Erase,
}

/// What a pointer press picked up.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PointerTarget {
    Device(usize),
    Room(usize),
    Canvas,
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Gesture {
    Device { index: usize, offset: Point },
    Room { index: usize, offset: Point },
    Pan { last: Point },
}

#[derive(Debug, Clone)]
pub struct FloorplanLayoutEngine {
    floors: Vec<Floor>,
    current: usize,
    tier: Tier,
    total_sqft: f64,
    viewport: Viewport,
    wall_tool: WallTool,
    gesture: Option<Gesture>,
    history: ChangeHistory,
}

impl FloorplanLayoutEngine {
    pub fn new(account: &Account, actor: impl Into<String>) -> Self {
        FloorplanLayoutEngine {
            floors: vec![Floor::default()],
            current: 0,
            tier: account.tier,
            total_sqft: account.declared_sqft,
            viewport: Viewport::default(),
            wall_tool: WallTool::default(),
            gesture: None,
            history: ChangeHistory::new(history_allowed(account.tier), actor),
        }
    }

    // =====================
    // Account limits
    // =====================

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn set_tier(&mut self, tier: Tier) {
        self.tier = tier;
        self.history.set_enabled(history_allowed(tier));
    }

    pub fn total_sqft(&self) -> f64 {
        self.total_sqft
    }

    /// Never invalidates rooms that no longer fit; see [`Self::is_over_budget`].
    pub fn set_total_sqft(&mut self, total_sqft: f64) {
        self.total_sqft = total_sqft;
    }

    /// Declared room area across every floor.
    pub fn used_sqft(&self) -> f64 {
        self.floors.iter().map(|f| f.rooms.used_sqft()).sum()
    }

    pub fn remaining_sqft(&self) -> f64 {
        remaining_sqft(self.total_sqft, self.used_sqft())
    }

    pub fn is_over_budget(&self) -> bool {
        self.used_sqft() > self.total_sqft
    }

    pub fn device_count(&self) -> usize {
        self.floors.iter().map(|f| f.devices.len()).sum()
    }

    /// Every device on every floor, floor by floor.
    pub fn all_devices(&self) -> Vec<DeviceEntry> {
        self.floors
            .iter()
            .flat_map(|f| f.devices.devices().iter().cloned())
            .collect()
    }

    /// Canvas warning when the drawn rooms of this floor cover more than the
    /// declared total. Silent while no total is declared.
    pub fn mapped_area_warning(&self) -> Option<String> {
        let mapped = self.floor().rooms.mapped_sqft(GRID_PX);
        if self.total_sqft > 0.0 && mapped > self.total_sqft {
            Some(format!(
                "Warning: Mapped area ({:.1} sqft) exceeds allowed ({} sqft)!",
                mapped, self.total_sqft
            ))
        } else {
            None
        }
    }

    // =====================
    // Floors
    // =====================

    pub fn floors(&self) -> &[Floor] {
        &self.floors
    }

    pub fn floor(&self) -> &Floor {
        &self.floors[self.current]
    }

    pub fn current_floor_index(&self) -> usize {
        self.current
    }

    /// 1-based, as shown in the floor selector and sent to the backend.
    pub fn current_floor_number(&self) -> u32 {
        floor_number(self.current)
    }

    /// Append an empty floor and switch to it.
    pub fn add_floor(&mut self) -> Result<usize> {
        let number = floor_number(self.floors.len());
        if number > MAX_FLOORS {
            return Err(MappingError::FloorOutOfRange {
                floor: number,
                max: MAX_FLOORS,
            });
        }
        self.floors.push(Floor::default());
        self.switch_to(self.floors.len() - 1);
        Ok(self.current)
    }

    /// Remove the current floor unless it is the last one left.
    pub fn remove_floor(&mut self) -> Option<Floor> {
        if self.floors.len() <= 1 {
            return None;
        }
        let removed = self.floors.remove(self.current);
        self.switch_to(self.current.saturating_sub(1));
        Some(removed)
    }

    pub fn switch_floor(&mut self, index: usize) -> Result<()> {
        if index >= self.floors.len() {
            return Err(MappingError::IndexOutOfRange {
                kind: "floor",
                index,
                len: self.floors.len(),
            });
        }
        self.switch_to(index);
        Ok(())
    }

    fn switch_to(&mut self, index: usize) {
        self.current = index;
        self.gesture = None;
        if let WallTool::Draw { start } = &mut self.wall_tool {
            *start = None;
        }
        debug!("Layout: switched to floor {}", floor_number(index));
    }

    fn floor_mut(&mut self) -> &mut Floor {
        &mut self.floors[self.current]
    }

    // =====================
    // Rooms
    // =====================

    pub fn add_room(&mut self, name: &str, area_sqft: f64, x: i32, y: i32, w: u32, h: u32) -> Result<()> {
        self.add_room_entry(Room::new(name, area_sqft, x, y, w, h)).map(|_| ())
    }

    /// Returns the index of the new room on the current floor.
    pub fn add_room_entry(&mut self, room: Room) -> Result<usize> {
        let remaining = self.remaining_sqft();
        self.floor_mut().rooms.add(room.clone(), remaining)?;
        self.record(ChangeAction::AddRoom, &room);
        Ok(self.floor().rooms.len() - 1)
    }

    pub fn edit_room(&mut self, index: usize, room: Room) -> Result<()> {
        let remaining = self.remaining_sqft();
        self.floor_mut().rooms.replace(index, room.clone(), remaining)?;
        self.record(ChangeAction::EditRoom, &room);
        Ok(())
    }

    pub fn move_room(&mut self, index: usize, x: i32, y: i32) -> Result<()> {
        self.floor_mut().rooms.move_to(index, x, y)?;
        let room = self.floor().rooms.rooms()[index].clone();
        self.record(ChangeAction::MoveRoom, &room);
        Ok(())
    }

    pub fn remove_room(&mut self, index: usize) -> Option<Room> {
        let room = self.floor_mut().rooms.remove(index)?;
        self.record(ChangeAction::RemoveRoom, &room);
        Some(room)
    }

    // =====================
    // Devices
    // =====================

    /// Blank entry, subject to the tier quota. Returns its index.
    pub fn add_device(&mut self) -> Result<usize> {
        self.add_device_entry(DeviceEntry::default())
    }

    pub fn add_device_entry(&mut self, entry: DeviceEntry) -> Result<usize> {
        let total = self.device_count();
        let tier = self.tier;
        let index = self.floor_mut().devices.add(entry.clone(), total, tier)?;
        self.record(ChangeAction::AddDevice, &entry);
        Ok(index)
    }

    pub fn update_device(&mut self, index: usize, field: DeviceField) -> Result<()> {
        self.floor_mut().devices.update_field(index, field)
    }

    pub fn move_device(&mut self, index: usize, x: f64, y: f64) -> Result<()> {
        self.floor_mut().devices.move_to(index, x, y)?;
        let device = self.floor().devices.devices()[index].clone();
        self.record(ChangeAction::MoveDevice, &device);
        Ok(())
    }

    pub fn remove_device(&mut self, index: usize) -> Option<DeviceEntry> {
        let device = self.floor_mut().devices.remove(index)?;
        self.record(ChangeAction::RemoveDevice, &device);
        Some(device)
    }

    /// Replace this floor's devices with a list fetched from the backend. The
    /// backend enforces its own quota, so nothing is re-checked here.
    pub fn set_devices(&mut self, devices: Vec<DeviceEntry>) {
        self.floor_mut().devices = DeviceMapModel::from_devices(devices);
    }

    /// Where a device dropped at `p` ends up: grid first, then room edges.
    pub fn snap_device_position(&self, p: Point) -> Point {
        let gridded = snap_point_to_grid(p, GRID_PX);
        snap_to_room_edges(gridded, &self.floor().rooms.pixel_rects(GRID_PX), EDGE_SNAP_PX)
    }

    // =====================
    // Walls
    // =====================

    pub fn add_wall(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let wall = WallSegment::new(x1, y1, x2, y2);
        self.floor_mut().walls.add(wall);
        self.record(ChangeAction::AddWall, &wall);
    }

    pub fn remove_wall_near(&mut self, mx: f64, my: f64) -> Option<WallSegment> {
        let wall = self.floor_mut().walls.remove_nearest(mx, my)?;
        self.record(ChangeAction::RemoveWall, &wall);
        Some(wall)
    }

    pub fn wall_tool(&self) -> WallTool {
        self.wall_tool
    }

    pub fn set_wall_tool(&mut self, tool: WallTool) {
        self.wall_tool = tool;
    }

    /// Canvas click: feeds the wall tool. Returns true when the floor changed.
    pub fn click(&mut self, screen: Point) -> bool {
        let p = self.viewport.to_world(screen);
        match self.wall_tool {
            WallTool::Idle => false,
            WallTool::Draw { start: None } => {
                self.wall_tool = WallTool::Draw { start: Some(p) };
                false
            }
            WallTool::Draw { start: Some(s) } => {
                self.wall_tool = WallTool::Draw { start: None };
                self.add_wall(s.x, s.y, p.x, p.y);
                true
            }
            WallTool::Erase => self.remove_wall_near(p.x, p.y).is_some(),
        }
    }

    /// Double click abandons a half-drawn wall.
    pub fn double_click(&mut self) {
        if let WallTool::Draw { start } = &mut self.wall_tool {
            *start = None;
        }
    }

    // =====================
    // Viewport & gestures
    // =====================

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Press: devices are picked before rooms, topmost first; empty canvas pans.
    pub fn pointer_down(&mut self, screen: Point) -> PointerTarget {
        let p = self.viewport.to_world(screen);
        let floor = self.floor();
        if let Some(index) = floor.devices.hit_test(p) {
            let d = &floor.devices.devices()[index];
            let offset = Point::new(p.x - d.x, p.y - d.y);
            self.gesture = Some(Gesture::Device { index, offset });
            return PointerTarget::Device(index);
        }
        if let Some(index) = floor.rooms.hit_test(p, GRID_PX) {
            let r = room_rect(&floor.rooms.rooms()[index], GRID_PX);
            let offset = Point::new(p.x - r.x, p.y - r.y);
            self.gesture = Some(Gesture::Room { index, offset });
            return PointerTarget::Room(index);
        }
        self.gesture = Some(Gesture::Pan { last: screen });
        PointerTarget::Canvas
    }

    pub fn pointer_move(&mut self, screen: Point) -> Result<()> {
        let Some(gesture) = self.gesture else {
            return Ok(());
        };
        let p = self.viewport.to_world(screen);
        match gesture {
            Gesture::Pan { last } => {
                self.viewport.pan_x += screen.x - last.x;
                self.viewport.pan_y += screen.y - last.y;
                self.gesture = Some(Gesture::Pan { last: screen });
                Ok(())
            }
            Gesture::Room { index, offset } => {
                let x = snap_to_grid(p.x - offset.x, GRID_PX) / GRID_PX;
                let y = snap_to_grid(p.y - offset.y, GRID_PX) / GRID_PX;
                self.move_room(index, x as i32, y as i32)
            }
            Gesture::Device { index, offset } => {
                let target = self.snap_device_position(Point::new(p.x - offset.x, p.y - offset.y));
                self.move_device(index, target.x, target.y)
            }
        }
    }

    pub fn pointer_up(&mut self) {
        self.gesture = None;
    }

    // =====================
    // Palette
    // =====================

    /// Drop a room of `room_type` at a random spot. The name is made unique on
    /// this floor and the declared area is the drawn footprint.
    pub fn place_room<R: Rng>(&mut self, room_type: RoomType, rng: &mut R) -> Result<usize> {
        let (w, h) = PALETTE_ROOM_CELLS;
        let x = rng.random_range(5..15);
        let y = rng.random_range(5..15);
        let base = capitalize(room_type.as_str());
        let mut name = base.clone();
        let mut n = 2;
        while self.floor().rooms.find(&name).is_some() {
            name = format!("{base} {n}");
            n += 1;
        }
        let footprint = RoomModel::from_rooms(vec![Room::new(name.as_str(), 1.0, x, y, w, h)]);
        let area = footprint.mapped_sqft(GRID_PX);
        self.add_room_entry(Room::new(name, area, x, y, w, h).with_type(room_type))
    }

    pub fn place_device<R: Rng>(&mut self, device_type: DeviceType, rng: &mut R) -> Result<usize> {
        let entry = DeviceEntry {
            location: device_type.label().to_string(),
            device_type,
            x: rng.random_range(200.0..400.0),
            y: rng.random_range(200.0..400.0),
            ..DeviceEntry::default()
        };
        self.add_device_entry(entry)
    }

    // =====================
    // Annotations
    // =====================

    pub fn annotations(&self) -> &[Annotation] {
        &self.floor().annotations
    }

    /// Returns the new annotation's id.
    pub fn add_annotation(
        &mut self,
        target: AnnotationTarget,
        target_id: &str,
        text: &str,
        author: &str,
    ) -> Result<String> {
        self.require(Feature::Annotations)?;
        let mut millis = Utc::now().timestamp_millis();
        while self.floor().annotations.iter().any(|a| a.id == format!("a_{millis}")) {
            millis += 1;
        }
        let id = format!("a_{millis}");
        self.floor_mut().annotations.push(Annotation {
            id: id.clone(),
            target,
            target_id: target_id.to_string(),
            text: text.to_string(),
            timestamp: millis,
            author: author.to_string(),
        });
        Ok(id)
    }

    pub fn update_annotation(
        &mut self,
        index: usize,
        target: AnnotationTarget,
        target_id: &str,
        text: &str,
    ) -> Result<()> {
        self.require(Feature::Annotations)?;
        let annotations = &mut self.floor_mut().annotations;
        let len = annotations.len();
        let a = annotations.get_mut(index).ok_or(MappingError::IndexOutOfRange {
            kind: "annotation",
            index,
            len,
        })?;
        a.target = target;
        a.target_id = target_id.to_string();
        a.text = text.to_string();
        Ok(())
    }

    pub fn delete_annotation(&mut self, index: usize) -> Result<Option<Annotation>> {
        self.require(Feature::Annotations)?;
        let annotations = &mut self.floor_mut().annotations;
        Ok((index < annotations.len()).then(|| annotations.remove(index)))
    }

    // =====================
    // History
    // =====================

    pub fn audit_trail(&self) -> Result<&[AuditEntry]> {
        self.require(Feature::AuditTrail)?;
        Ok(self.history.entries())
    }

    pub fn version_history(&self) -> Result<&[Version]> {
        self.require(Feature::VersionHistory)?;
        Ok(self.history.versions())
    }

    /// Put a recorded version's rooms, devices and walls onto the current floor.
    pub fn restore_version(&mut self, index: usize) -> Result<()> {
        self.require(Feature::VersionHistory)?;
        let len = self.history.versions().len();
        let version = self
            .history
            .version(index)
            .cloned()
            .ok_or(MappingError::IndexOutOfRange {
                kind: "version",
                index,
                len,
            })?;
        let floor = self.floor_mut();
        floor.rooms = RoomModel::from_rooms(version.rooms);
        floor.devices = DeviceMapModel::from_devices(version.devices);
        floor.walls = WallModel::from_walls(version.walls);
        info!("Restored version from {}", version.timestamp);
        Ok(())
    }

    fn require(&self, feature: Feature) -> Result<()> {
        if self.tier.allows(feature) {
            Ok(())
        } else {
            Err(MappingError::FeatureLocked(feature))
        }
    }

    fn record<T: Serialize>(&mut self, action: ChangeAction, detail: &T) {
        let floor = &self.floors[self.current];
        let state = FloorState {
            rooms: floor.rooms.rooms(),
            devices: floor.devices.devices(),
            walls: floor.walls.walls(),
        };
        self.history.record(action, detail, floor_number(self.current), state);
    }

    // =====================
    // Snapshots
    // =====================

    /// The current floor as sent to `/mapping/save`.
    pub fn snapshot(&self) -> MappingSnapshot {
        self.floor().to_snapshot(self.current_floor_number())
    }

    /// Replace the snapshot's floor, adding empty floors up to it, and switch
    /// to it. Loaded data is not re-checked against the budget. Floor numbers
    /// above [`MAX_FLOORS`] are rejected and leave the engine untouched.
    pub fn apply_snapshot(&mut self, snapshot: MappingSnapshot) -> Result<()> {
        if snapshot.floor > MAX_FLOORS {
            return Err(MappingError::FloorOutOfRange {
                floor: snapshot.floor,
                max: MAX_FLOORS,
            });
        }
        let number = snapshot.floor.max(1) as usize;
        while self.floors.len() < number {
            self.floors.push(Floor::default());
        }
        self.floors[number - 1] = Floor::from_snapshot(snapshot);
        self.switch_to(number - 1);
        Ok(())
    }

    /// Back to a single empty floor.
    pub fn clear(&mut self) {
        self.floors = vec![Floor::default()];
        self.switch_to(0);
    }
}

fn history_allowed(tier: Tier) -> bool {
    tier.allows(Feature::AuditTrail) || tier.allows(Feature::VersionHistory)
}

fn floor_number(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}
