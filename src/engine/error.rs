use crate::client::MappingClientError;
use crate::models::account::{Feature, Tier};
use core::fmt;
use std::error::Error;

/// Rejections raised by the mapping models. Every variant renders the inline
/// message the editor shows next to the control that caused it; none of them
/// leave partially applied state behind.
#[derive(Debug)]
pub enum MappingError {
    EmptyRoomName,
    InvalidRoomArea(f64),
    DuplicateRoomName(String),
    /// The requested area does not fit in what is left of the declared total.
    AreaBudgetExceeded { requested: f64, remaining: f64 },
    DeviceLimitReached { tier: Tier, max_devices: usize },
    DeclaredAreaOverTier { tier: Tier, declared_sqft: f64, max_sqft: f64 },
    DeviceCountOverTier { tier: Tier, max_devices: usize },
    FeatureLocked(Feature),
    IndexOutOfRange { kind: &'static str, index: usize, len: usize },
    /// 1-based floor number past the supported maximum.
    FloorOutOfRange { floor: u32, max: u32 },
    Gateway(MappingClientError),
}

impl MappingError {
    /// Quota violations block saving until items are removed or the plan upgraded.
    pub fn is_quota_violation(&self) -> bool {
        matches!(
            self,
            MappingError::AreaBudgetExceeded { .. }
                | MappingError::DeviceLimitReached { .. }
                | MappingError::DeclaredAreaOverTier { .. }
                | MappingError::DeviceCountOverTier { .. }
        )
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingError::EmptyRoomName => write!(f, "Room name is required."),
            MappingError::InvalidRoomArea(a) => write!(f, "Room area must be greater than 0 sqft (got {}).", a),
            MappingError::DuplicateRoomName(n) => write!(f, "A room named \"{}\" already exists on this floor.", n),
            MappingError::AreaBudgetExceeded { requested, remaining } => write!(
                f,
                "Room area ({} sqft) exceeds the remaining square footage ({} sqft).",
                requested, remaining
            ),
            MappingError::DeviceLimitReached { tier, max_devices } => {
                write!(f, "Device limit reached for your tier ({}: {} devices).", tier, max_devices)
            }
            MappingError::DeclaredAreaOverTier {
                tier,
                declared_sqft,
                max_sqft,
            } => write!(
                f,
                "Your declared square footage ({}) exceeds the limit for your subscription tier ({}: {} sqft). Please upgrade your plan.",
                declared_sqft, tier, max_sqft
            ),
            MappingError::DeviceCountOverTier { tier, max_devices } => write!(
                f,
                "Device mapping exceeds allowed devices for your tier ({}: {} devices). Please upgrade your plan or remove devices.",
                tier, max_devices
            ),
            MappingError::FeatureLocked(feature) => write!(
                f,
                "The feature \"{}\" requires a higher membership tier ({}).",
                feature.name(),
                feature.required_tier()
            ),
            MappingError::IndexOutOfRange { kind, index, len } => {
                write!(f, "no {} at index {} (have {})", kind, index, len)
            }
            MappingError::FloorOutOfRange { floor, max } => {
                write!(f, "Floor {} is out of range (at most {} floors).", floor, max)
            }
            MappingError::Gateway(e) => write!(f, "{}", e),
        }
    }
}

impl Error for MappingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MappingError::Gateway(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MappingClientError> for MappingError {
    fn from(value: MappingClientError) -> Self {
        MappingError::Gateway(value)
    }
}

pub type Result<T> = std::result::Result<T, MappingError>;
