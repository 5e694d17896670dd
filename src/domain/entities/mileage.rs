use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Document in the `mileage` collection, keyed by entry id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MileageEntity {
    pub id: String,
    pub user_id: String,
    pub date: String,
    #[serde(default)]
    pub begin_address: String,
    #[serde(default)]
    pub end_address: String,
    #[serde(default)]
    pub round_trip: bool,
    pub miles: f64,
    pub cost_per_mile: f64,
    /// Derived at creation time; round trips count the distance twice.
    pub total_cost: f64,
    #[serde(default)]
    pub deal: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertMileageModel {
    pub user_id: Option<String>,
    pub date: Option<String>,
    #[serde(default)]
    pub begin_address: Option<String>,
    #[serde(default)]
    pub end_address: Option<String>,
    #[serde(default)]
    pub round_trip: bool,
    pub miles: Option<f64>,
    pub cost_per_mile: Option<f64>,
    #[serde(default)]
    pub deal: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}
