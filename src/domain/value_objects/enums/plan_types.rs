use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Monthly,
    Yearly,
}

impl Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let plan_type = match self {
            PlanType::Monthly => "monthly",
            PlanType::Yearly => "yearly",
        };
        write!(f, "{}", plan_type)
    }
}

impl PlanType {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "monthly" => Some(PlanType::Monthly),
            "yearly" => Some(PlanType::Yearly),
            _ => None,
        }
    }

    /// Maps a Stripe recurring price interval onto a plan tier.
    pub fn from_billing_interval(interval: &str) -> Option<Self> {
        match interval {
            "month" => Some(PlanType::Monthly),
            "year" => Some(PlanType::Yearly),
            _ => None,
        }
    }
}
