use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommissionType {
    Percentage,
    Fixed,
}

impl Display for CommissionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let commission_type = match self {
            CommissionType::Percentage => "percentage",
            CommissionType::Fixed => "fixed",
        };
        write!(f, "{}", commission_type)
    }
}

/// Document in `userProfiles`, keyed by user id. Commission settings
/// plus the identity and goal fields the settings page edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub start_of_commission_year: Option<DateTime<Utc>>,
    #[serde(default)]
    pub commission_type: Option<CommissionType>,
    #[serde(default)]
    pub company_split_percent: Option<f64>,
    #[serde(default)]
    pub company_split_cap: Option<f64>,
    #[serde(default)]
    pub royalty_percent: Option<f64>,
    #[serde(default)]
    pub royalty_cap: Option<f64>,
    #[serde(default)]
    pub fixed_commission_amount: Option<f64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub monthly_goal: Option<f64>,
    #[serde(default)]
    pub annual_goal: Option<f64>,
    #[serde(default)]
    pub emergency_fund: Option<f64>,
    #[serde(default)]
    pub retirement_contribution: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Document in `commissionSchedules`, keyed by schedule id. One per
/// commission year so past deals keep the split that applied then.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionSchedule {
    pub id: String,
    pub user_id: String,
    pub year_start: DateTime<Utc>,
    pub commission_type: CommissionType,
    #[serde(default)]
    pub company_split_percent: Option<f64>,
    #[serde(default)]
    pub company_split_cap: Option<f64>,
    #[serde(default)]
    pub royalty_percent: Option<f64>,
    #[serde(default)]
    pub royalty_cap: Option<f64>,
    #[serde(default)]
    pub estimated_tax_percent: Option<f64>,
    #[serde(default)]
    pub fixed_commission_amount: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertCommissionScheduleModel {
    pub user_id: Option<String>,
    pub year_start: Option<DateTime<Utc>>,
    pub commission_type: Option<CommissionType>,
    #[serde(default)]
    pub company_split_percent: Option<f64>,
    #[serde(default)]
    pub company_split_cap: Option<f64>,
    #[serde(default)]
    pub royalty_percent: Option<f64>,
    #[serde(default)]
    pub royalty_cap: Option<f64>,
    #[serde(default)]
    pub estimated_tax_percent: Option<f64>,
    #[serde(default)]
    pub fixed_commission_amount: Option<f64>,
}
