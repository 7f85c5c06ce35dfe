//! Rooms of one floor and the square-footage accounting behind "Add Room".
//!
//! The budget spans every floor, so callers pass in what is left of it; this
//! model only knows its own rooms.

use crate::engine::error::{MappingError, Result};
use crate::engine::geometry::{PIXELS_PER_FOOT, Point, Rect};
use crate::models::mapping::Room;

/// `max(0, total - used)`.
pub fn remaining_sqft(total_sqft: f64, used_sqft: f64) -> f64 {
    (total_sqft - used_sqft).max(0.0)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomModel {
    rooms: Vec<Room>,
}

impl RoomModel {
    pub fn from_rooms(rooms: Vec<Room>) -> Self {
        RoomModel { rooms }
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.name == name)
    }

    /// Declared area of every room on this floor.
    pub fn used_sqft(&self) -> f64 {
        self.rooms.iter().map(|r| r.area_sqft).sum()
    }

    /// Append `room` if it has a name unique on this floor and a positive area
    /// that fits in `remaining_sqft`. Nothing changes on rejection.
    pub fn add(&mut self, room: Room, remaining_sqft: f64) -> Result<()> {
        self.check(&room, remaining_sqft, None)?;
        self.rooms.push(room);
        Ok(())
    }

    /// Replace the room at `index` from the edit form. The room's own area is
    /// given back to the budget before the new one is checked.
    pub fn replace(&mut self, index: usize, room: Room, remaining_sqft: f64) -> Result<()> {
        let current = self.get(index)?;
        let available = remaining_sqft + current.area_sqft;
        self.check(&room, available, Some(index))?;
        self.rooms[index] = room;
        Ok(())
    }

    /// Dragging only changes the position.
    pub fn move_to(&mut self, index: usize, x: i32, y: i32) -> Result<()> {
        let len = self.rooms.len();
        let room = self.rooms.get_mut(index).ok_or(MappingError::IndexOutOfRange {
            kind: "room",
            index,
            len,
        })?;
        room.x = x;
        room.y = y;
        Ok(())
    }

    /// Devices keep their `room` string; the reference simply dangles.
    pub fn remove(&mut self, index: usize) -> Option<Room> {
        (index < self.rooms.len()).then(|| self.rooms.remove(index))
    }

    /// Pixel rectangles in list order.
    pub fn pixel_rects(&self, cell_px: f64) -> Vec<Rect> {
        self.rooms.iter().map(|r| room_rect(r, cell_px)).collect()
    }

    /// Index of the topmost room containing `p`; later rooms are drawn on top.
    pub fn hit_test(&self, p: Point, cell_px: f64) -> Option<usize> {
        self.rooms.iter().rposition(|r| room_rect(r, cell_px).contains(p))
    }

    /// Area covered by the room rectangles on the canvas, in square feet.
    pub fn mapped_sqft(&self, cell_px: f64) -> f64 {
        self.pixel_rects(cell_px)
            .iter()
            .map(|r| r.area() / (PIXELS_PER_FOOT * PIXELS_PER_FOOT))
            .sum()
    }

    fn get(&self, index: usize) -> Result<&Room> {
        self.rooms.get(index).ok_or(MappingError::IndexOutOfRange {
            kind: "room",
            index,
            len: self.rooms.len(),
        })
    }

    fn check(&self, room: &Room, available_sqft: f64, skip: Option<usize>) -> Result<()> {
        if room.name.trim().is_empty() {
            return Err(MappingError::EmptyRoomName);
        }
        if !room.area_sqft.is_finite() || room.area_sqft <= 0.0 {
            return Err(MappingError::InvalidRoomArea(room.area_sqft));
        }
        let duplicate = self
            .rooms
            .iter()
            .enumerate()
            .any(|(i, r)| Some(i) != skip && r.name == room.name);
        if duplicate {
            return Err(MappingError::DuplicateRoomName(room.name.clone()));
        }
        if room.area_sqft > available_sqft {
            return Err(MappingError::AreaBudgetExceeded {
                requested: room.area_sqft,
                remaining: available_sqft,
            });
        }
        Ok(())
    }
}

pub fn room_rect(room: &Room, cell_px: f64) -> Rect {
    Rect {
        x: f64::from(room.x) * cell_px,
        y: f64::from(room.y) * cell_px,
        w: f64::from(room.w) * cell_px,
        h: f64::from(room.h) * cell_px,
    }
}
