use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Checkout request body. Presence is validated in the use case so that
/// missing fields map to the caller-facing invalid-request error instead
/// of a deserialization rejection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionRequest {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub plan_type: Option<String>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalSessionRequest {
    pub user_id: Option<String>,
}

/// A merge-set against one user's subscription record. The reconciler
/// emits these as pure data; the repository applies them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionPatch {
    pub user_id: String,
    pub fields: Map<String, Value>,
}

impl SubscriptionPatch {
    pub fn new(user_id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            user_id: user_id.into(),
            fields,
        }
    }
}
