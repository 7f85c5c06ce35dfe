//! Ordered automation rule list and its advisory reference checks.
//!
//! Rules are only edited here; evaluating them against live sensor events is
//! the backend's job.

use crate::engine::error::{MappingError, Result};
use crate::models::automation::AutomationRule;
use crate::models::mapping::{DeviceEntry, DeviceType};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ReferenceCheck {
    pub missing_trigger: bool,
    pub missing_action: bool,
}

impl ReferenceCheck {
    pub fn is_clean(&self) -> bool {
        !self.missing_trigger && !self.missing_action
    }

    /// Inline warning shown under the rule, if anything is missing.
    pub fn warning(&self) -> Option<String> {
        if self.is_clean() {
            return None;
        }
        let mut parts = Vec::new();
        if self.missing_trigger {
            parts.push("Trigger device missing.");
        }
        if self.missing_action {
            parts.push("Action device missing.");
        }
        Some(format!("Warning: {}", parts.join(" ")))
    }
}

/// Check the rule's device ids against `devices`. An empty id means nothing
/// was selected yet and is not reported. Never blocks saving.
pub fn validate_references(rule: &AutomationRule, devices: &[DeviceEntry]) -> ReferenceCheck {
    let missing = |id: &str| !id.is_empty() && !devices.iter().any(|d| d.id == id);
    ReferenceCheck {
        missing_trigger: missing(&rule.trigger_id),
        missing_action: missing(&rule.action_id),
    }
}

/// Devices offered in the rule editor's picker for a trigger or action kind.
pub fn candidate_devices(kind: DeviceType, devices: &[DeviceEntry]) -> Vec<&DeviceEntry> {
    devices.iter().filter(|d| d.device_type == kind).collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutomationRuleModel {
    rules: Vec<AutomationRule>,
}

impl AutomationRuleModel {
    pub fn from_rules(rules: Vec<AutomationRule>) -> Self {
        AutomationRuleModel { rules }
    }

    pub fn rules(&self) -> &[AutomationRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Duplicate and conflicting rules are allowed.
    pub fn add(&mut self, rule: AutomationRule) {
        self.rules.push(rule);
    }

    pub fn update(&mut self, index: usize, rule: AutomationRule) -> Result<()> {
        let len = self.rules.len();
        let slot = self.rules.get_mut(index).ok_or(MappingError::IndexOutOfRange {
            kind: "rule",
            index,
            len,
        })?;
        *slot = rule;
        Ok(())
    }

    pub fn delete(&mut self, index: usize) -> Option<AutomationRule> {
        (index < self.rules.len()).then(|| self.rules.remove(index))
    }

    /// Reference check for every rule, in display order.
    pub fn check_all(&self, devices: &[DeviceEntry]) -> Vec<ReferenceCheck> {
        self.rules.iter().map(|r| validate_references(r, devices)).collect()
    }
}
