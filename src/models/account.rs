//! Subscription tiers, their quotas, and the account record read from `/users`.
//!
//! The quota table is duplicated from the backend and must stay identical to it.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Basic,
    Premium,
}

impl Tier {
    /// Parse a tier name as stored by the backend. Unknown names fall back to
    /// free, the same way the editor looks up its quota table.
    pub fn parse_or_free(name: &str) -> Tier {
        match name.trim().to_ascii_lowercase().as_str() {
            "basic" => Tier::Basic,
            "premium" => Tier::Premium,
            _ => Tier::Free,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Basic => "basic",
            Tier::Premium => "premium",
        }
    }

    pub fn quota(self) -> TierQuota {
        match self {
            Tier::Free => TierQuota {
                max_devices: 10,
                max_sqft: 800.0,
            },
            Tier::Basic => TierQuota {
                max_devices: 25,
                max_sqft: 1600.0,
            },
            Tier::Premium => TierQuota {
                max_devices: 50,
                max_sqft: 2400.0,
            },
        }
    }

    pub fn allows(self, feature: Feature) -> bool {
        self >= feature.required_tier()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TierQuota {
    pub max_devices: usize,
    pub max_sqft: f64,
}

/// Editor features gated behind a subscription tier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Feature {
    AuditTrail,
    VersionHistory,
    Annotations,
}

impl Feature {
    pub const ALL: [Feature; 3] = [Feature::AuditTrail, Feature::VersionHistory, Feature::Annotations];

    pub fn name(self) -> &'static str {
        match self {
            Feature::AuditTrail => "Audit Trail",
            Feature::VersionHistory => "Version History",
            Feature::Annotations => "Annotations",
        }
    }

    pub fn required_tier(self) -> Tier {
        match self {
            Feature::AuditTrail | Feature::VersionHistory | Feature::Annotations => Tier::Premium,
        }
    }
}

/// One row of the admin-scoped `GET /users` response. Only the fields the
/// mapping editor reads are modeled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub subscription_tier: Option<String>,
    #[serde(default)]
    pub declared_sqft: Option<f64>,
}

/// Tier and declared square footage of the account whose floorplan is edited.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub tier: Tier,
    pub declared_sqft: f64,
}

impl Account {
    /// Values the editor shows before `/users` has answered.
    pub const INITIAL_DECLARED_SQFT: f64 = 2000.0;

    pub fn new(tier: Tier, declared_sqft: f64) -> Self {
        Account { tier, declared_sqft }
    }

    /// Pick the acting account: the first admin, otherwise the first user.
    pub fn from_users(users: &[UserRecord]) -> Option<Account> {
        let user = users
            .iter()
            .find(|u| u.role.as_deref() == Some("admin"))
            .or_else(|| users.first())?;
        let tier = user
            .subscription_tier
            .as_deref()
            .map(Tier::parse_or_free)
            .unwrap_or(Tier::Free);
        Some(Account {
            tier,
            declared_sqft: user.declared_sqft.unwrap_or(0.0),
        })
    }

    pub fn quota(&self) -> TierQuota {
        self.tier.quota()
    }
}

impl Default for Account {
    fn default() -> Self {
        Account {
            tier: Tier::Free,
            declared_sqft: Self::INITIAL_DECLARED_SQFT,
        }
    }
}
