use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Document in the `expenses` collection, keyed by entry id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseEntity {
    pub id: String,
    pub user_id: String,
    /// Calendar date in `YYYY-MM-DD` form, as entered by the agent.
    pub date: String,
    pub category: String,
    pub amount: f64,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub deal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertExpenseModel {
    pub user_id: Option<String>,
    pub date: Option<String>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub deal: Option<String>,
    #[serde(default)]
    pub receipt_url: Option<String>,
}

/// Partial update applied over an existing expense. Serializes to a
/// merge patch, so untouched fields stay out of the document write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpenseModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
}
