use crate::models::mapping::DeviceType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    #[default]
    Motion,
    Pressure,
    Door,
    Smoke,
    Co,
    Other,
}

impl TriggerType {
    /// Device type a trigger of this kind is picked from.
    pub fn device_type(self) -> DeviceType {
        match self {
            TriggerType::Motion => DeviceType::Motion,
            TriggerType::Pressure => DeviceType::Pressure,
            TriggerType::Door => DeviceType::Door,
            TriggerType::Smoke => DeviceType::Smoke,
            TriggerType::Co => DeviceType::Co,
            TriggerType::Other => DeviceType::Other,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    #[default]
    Bulb,
    Alarm,
    Other,
}

impl ActionType {
    pub fn device_type(self) -> DeviceType {
        match self {
            ActionType::Bulb => DeviceType::Bulb,
            ActionType::Alarm => DeviceType::Alarm,
            ActionType::Other => DeviceType::Other,
        }
    }
}

/// Trigger → condition → action. Device ids are soft references into the
/// device map and are never validated on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRule {
    #[serde(default)]
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub trigger_id: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub action_type: ActionType,
    #[serde(default)]
    pub action_id: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub ignore: bool,
    #[serde(default)]
    pub description: String,
}

impl Default for AutomationRule {
    fn default() -> Self {
        AutomationRule {
            trigger_type: TriggerType::Motion,
            trigger_id: String::new(),
            condition: String::new(),
            action_type: ActionType::Bulb,
            action_id: String::new(),
            action: "on".to_string(),
            ignore: false,
            description: String::new(),
        }
    }
}
