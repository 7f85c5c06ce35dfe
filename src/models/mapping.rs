//! Wire models for the floorplan mapping: rooms, device placements, walls,
//! annotations and the per-floor snapshot exchanged with `/mapping/load` and
//! `/mapping/save`.
//!
//! Notes
//! - Field names follow the dashboard's JSON (`areaSqft`, `customType`, `targetId`).
//! - Legacy spellings written by older editors are accepted as aliases.
//! - Room positions are grid cells; device and wall coordinates are pixels.

use serde::{Deserialize, Serialize};

// =====================
// Rooms
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    Bedroom,
    Bathroom,
    Kitchen,
    Living,
    Dining,
    Closet,
    Pantry,
    Balcony,
    Service,
    /// Any type this editor does not know; not offered in the palette.
    #[serde(other)]
    Other,
}

impl RoomType {
    pub const FALLBACK_COLOR: &'static str = "#cce6ff";

    pub const ALL: [RoomType; 9] = [
        RoomType::Bedroom,
        RoomType::Bathroom,
        RoomType::Kitchen,
        RoomType::Living,
        RoomType::Dining,
        RoomType::Closet,
        RoomType::Pantry,
        RoomType::Balcony,
        RoomType::Service,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RoomType::Bedroom => "bedroom",
            RoomType::Bathroom => "bathroom",
            RoomType::Kitchen => "kitchen",
            RoomType::Living => "living",
            RoomType::Dining => "dining",
            RoomType::Closet => "closet",
            RoomType::Pantry => "pantry",
            RoomType::Balcony => "balcony",
            RoomType::Service => "service",
            RoomType::Other => "other",
        }
    }

    /// Palette color used when a room of this type is placed.
    pub fn default_color(self) -> &'static str {
        match self {
            RoomType::Bedroom => "#cce6ff",
            RoomType::Bathroom => "#e6ccff",
            RoomType::Kitchen => "#ffe6cc",
            RoomType::Living => "#ccffe6",
            RoomType::Dining => "#fffacc",
            RoomType::Closet => "#e6e6e6",
            RoomType::Pantry => "#f5e6cc",
            RoomType::Balcony => "#ccf5ff",
            RoomType::Service => "#ffd6cc",
            RoomType::Other => Self::FALLBACK_COLOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(alias = "label")]
    pub name: String,
    #[serde(alias = "area")]
    pub area_sqft: f64,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(alias = "width")]
    pub w: u32,
    #[serde(alias = "height")]
    pub h: u32,
    #[serde(default)]
    pub color: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<RoomType>,
}

impl Room {
    pub fn new(name: impl Into<String>, area_sqft: f64, x: i32, y: i32, w: u32, h: u32) -> Self {
        Room {
            name: name.into(),
            area_sqft,
            x,
            y,
            w,
            h,
            color: RoomType::FALLBACK_COLOR.to_string(),
            room_type: None,
        }
    }

    pub fn with_type(mut self, room_type: RoomType) -> Self {
        self.color = room_type.default_color().to_string();
        self.room_type = Some(room_type);
        self
    }
}

// =====================
// Devices
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    #[default]
    Pressure,
    Motion,
    Door,
    Bulb,
    Router,
    Hub,
    Smoke,
    Co,
    Alarm,
    SecurityHardwired,
    SecurityWifi,
    Appliance,
    /// User-defined; `customType` carries the name. Unrecognised wire values land here too.
    #[serde(other)]
    Other,
}

impl DeviceType {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::Pressure => "pressure",
            DeviceType::Motion => "motion",
            DeviceType::Door => "door",
            DeviceType::Bulb => "bulb",
            DeviceType::Router => "router",
            DeviceType::Hub => "hub",
            DeviceType::Smoke => "smoke",
            DeviceType::Co => "co",
            DeviceType::Alarm => "alarm",
            DeviceType::SecurityHardwired => "security_hardwired",
            DeviceType::SecurityWifi => "security_wifi",
            DeviceType::Appliance => "appliance",
            DeviceType::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DeviceType::Pressure => "Pressure Sensor",
            DeviceType::Motion => "Motion Sensor",
            DeviceType::Door => "Door Sensor",
            DeviceType::Bulb => "Smart Bulb",
            DeviceType::Router => "Router",
            DeviceType::Hub => "Hub",
            DeviceType::Smoke => "Smoke Detector",
            DeviceType::Co => "CO Detector",
            DeviceType::Alarm => "Alarm",
            DeviceType::SecurityHardwired => "Security (Hardwired)",
            DeviceType::SecurityWifi => "Security (Wi-Fi)",
            DeviceType::Appliance => "Appliance",
            DeviceType::Other => "Other (user-defined)",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// User assigned; not guaranteed unique.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub location: String,
    #[serde(rename = "type", default)]
    pub device_type: DeviceType,
    #[serde(rename = "customType", default, skip_serializing_if = "String::is_empty")]
    pub custom_type: String,
    #[serde(default)]
    pub function: String,
    /// Soft reference to `Room::name`.
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl DeviceEntry {
    /// Type name shown to users: the custom name for `other`, the enum name otherwise.
    pub fn type_name(&self) -> &str {
        if self.device_type == DeviceType::Other && !self.custom_type.is_empty() {
            &self.custom_type
        } else {
            self.device_type.as_str()
        }
    }

    pub fn apply(&mut self, field: DeviceField) {
        match field {
            DeviceField::Id(v) => self.id = v,
            DeviceField::Location(v) => self.location = v,
            DeviceField::Type(v) => self.device_type = v,
            DeviceField::CustomType(v) => self.custom_type = v,
            DeviceField::Function(v) => self.function = v,
            DeviceField::Room(v) => self.room = v,
            DeviceField::X(v) => self.x = v,
            DeviceField::Y(v) => self.y = v,
        }
    }
}

/// A single edit from the device form.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceField {
    Id(String),
    Location(String),
    Type(DeviceType),
    CustomType(String),
    Function(String),
    Room(String),
    X(f64),
    Y(f64),
}

// =====================
// Walls & annotations
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallSegment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl WallSegment {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        WallSegment { x1, y1, x2, y2 }
    }

    pub fn is_degenerate(&self) -> bool {
        self.x1 == self.x2 && self.y1 == self.y2
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationTarget {
    Room,
    Device,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    #[serde(rename = "type")]
    pub target: AnnotationTarget,
    pub target_id: String,
    pub text: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub author: String,
}

// =====================
// Snapshot
// =====================

fn default_floor() -> u32 {
    1
}

/// One floor's mapping as exchanged with the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSnapshot {
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
    #[serde(default)]
    pub walls: Vec<WallSegment>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// 1-based floor number.
    #[serde(default = "default_floor")]
    pub floor: u32,
}

impl Default for MappingSnapshot {
    fn default() -> Self {
        MappingSnapshot {
            rooms: Vec::new(),
            devices: Vec::new(),
            walls: Vec::new(),
            annotations: Vec::new(),
            floor: default_floor(),
        }
    }
}
