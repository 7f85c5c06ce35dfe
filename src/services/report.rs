//! Read-only health report of a session's mapping: quota state, area budget,
//! and every advisory warning the editor shows inline.

use crate::engine::devices::DeviceMapModel;
use crate::engine::session::MappingSession;
use crate::models::account::Tier;
use crate::models::mapping::AnnotationTarget;
use crate::utils::serde_enum_name;
use log::{info, warn};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct DanglingRoom {
    /// 1-based.
    pub floor: u32,
    pub device_id: String,
    pub room: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub tier: Tier,
    /// Message of the pre-save quota check, if it fails.
    pub quota_violation: Option<String>,
    pub used_sqft: f64,
    pub total_sqft: f64,
    pub over_budget: bool,
    pub mapped_area_warning: Option<String>,
    pub device_count: usize,
    pub duplicate_ids: BTreeMap<String, usize>,
    pub dangling_rooms: Vec<DanglingRoom>,
    /// `(annotation id, "<type>:<target id>")` for annotations whose target is gone.
    pub dangling_annotations: Vec<(String, String)>,
    /// `(rule index, warning)`.
    pub rule_warnings: Vec<(usize, String)>,
}

impl ValidationReport {
    pub fn build(session: &MappingSession) -> Self {
        let engine = session.engine();
        let all_devices = engine.all_devices();

        let mut dangling_rooms = Vec::new();
        let mut dangling_annotations = Vec::new();
        for (index, floor) in engine.floors().iter().enumerate() {
            let number = u32::try_from(index + 1).unwrap_or(u32::MAX);
            for d in floor.devices.devices() {
                if !d.room.is_empty() && floor.rooms.find(&d.room).is_none() {
                    dangling_rooms.push(DanglingRoom {
                        floor: number,
                        device_id: d.id.clone(),
                        room: d.room.clone(),
                    });
                }
            }
            for a in &floor.annotations {
                let exists = match a.target {
                    AnnotationTarget::Room => floor.rooms.find(&a.target_id).is_some(),
                    AnnotationTarget::Device => floor.devices.find(&a.target_id).is_some(),
                };
                if !exists {
                    let kind = serde_enum_name(&a.target).unwrap_or_default();
                    dangling_annotations.push((a.id.clone(), format!("{}:{}", kind, a.target_id)));
                }
            }
        }

        let rule_warnings = session
            .rule_checks()
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.warning().map(|w| (i, w)))
            .collect();

        ValidationReport {
            tier: session.account().tier,
            quota_violation: session.check_quotas().err().map(|e| e.to_string()),
            used_sqft: engine.used_sqft(),
            total_sqft: engine.total_sqft(),
            over_budget: engine.is_over_budget(),
            mapped_area_warning: engine.mapped_area_warning(),
            device_count: all_devices.len(),
            duplicate_ids: DeviceMapModel::from_devices(all_devices).duplicate_ids(),
            dangling_rooms,
            dangling_annotations,
            rule_warnings,
        }
    }

    /// Only quota violations stop a save; everything else is advisory.
    pub fn blocks_save(&self) -> bool {
        self.quota_violation.is_some()
    }

    pub fn is_clean(&self) -> bool {
        !self.blocks_save()
            && !self.over_budget
            && self.mapped_area_warning.is_none()
            && self.duplicate_ids.is_empty()
            && self.dangling_rooms.is_empty()
            && self.dangling_annotations.is_empty()
            && self.rule_warnings.is_empty()
    }

    pub fn log(&self) {
        info!(
            "Mapping report: tier={}, devices={}/{}, rooms={}/{} sqft",
            self.tier,
            self.device_count,
            self.tier.quota().max_devices,
            self.used_sqft,
            self.total_sqft
        );
        if let Some(msg) = &self.quota_violation {
            warn!("{}", msg);
        }
        if self.over_budget {
            warn!(
                "Room areas ({} sqft) exceed the declared total ({} sqft)",
                self.used_sqft, self.total_sqft
            );
        }
        if let Some(msg) = &self.mapped_area_warning {
            warn!("{}", msg);
        }
        for (id, count) in &self.duplicate_ids {
            warn!("Device id {:?} is used {} times", id, count);
        }
        for d in &self.dangling_rooms {
            warn!("Device {:?} on floor {} refers to missing room {:?}", d.device_id, d.floor, d.room);
        }
        for (id, target) in &self.dangling_annotations {
            warn!("Annotation {} points at missing {}", id, target);
        }
        for (i, w) in &self.rule_warnings {
            warn!("Rule #{}: {}", i + 1, w);
        }
        if self.is_clean() {
            info!("No mapping issues found");
        }
    }
}
