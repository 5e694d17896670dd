use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use serde_json::{Map, Value};

use crate::domain::entities::subscriptions::SubscriptionRecord;

#[automock]
#[async_trait]
pub trait SubscriptionRecordRepository {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<SubscriptionRecord>>;

    /// Merge-sets the given fields into the user's subscription document,
    /// creating it when absent. Explicit nulls overwrite stored values.
    async fn merge(&self, user_id: &str, fields: Map<String, Value>) -> Result<()>;
}
