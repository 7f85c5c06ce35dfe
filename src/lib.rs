//! Floorplan mapping core for the smart-home dashboard.
//!
//! Rooms, device placements, walls and automation rules for each floor, the
//! rules that keep them inside the account's tier quotas, and a blocking
//! client for the mapping backend.

pub mod models {
    pub mod account;
    pub mod automation;
    pub mod mapping;
}

pub mod engine {
    pub mod automation;
    pub mod devices;
    pub mod error;
    pub mod geometry;
    pub mod history;
    pub mod layout;
    pub mod rooms;
    pub mod session;
    pub mod walls;
}

pub mod client;
pub mod compression;
pub mod config;
pub mod utils;
pub mod services {
    pub mod report;
    pub mod sync;
}
