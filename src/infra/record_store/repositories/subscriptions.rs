use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::{
    domain::{
        entities::subscriptions::SubscriptionRecord,
        repositories::subscriptions::SubscriptionRecordRepository,
    },
    infra::record_store::{collections, http::HttpRecordStore},
};

pub struct SubscriptionRecordStore {
    store: Arc<HttpRecordStore>,
}

impl SubscriptionRecordStore {
    pub fn new(store: Arc<HttpRecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SubscriptionRecordRepository for SubscriptionRecordStore {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<SubscriptionRecord>> {
        let doc = self
            .store
            .get(collections::USER_SUBSCRIPTIONS, user_id)
            .await?;

        doc.map(|doc| {
            serde_json::from_value(doc).context("subscription record did not deserialize")
        })
        .transpose()
    }

    async fn merge(&self, user_id: &str, fields: Map<String, Value>) -> Result<()> {
        self.store
            .merge(
                collections::USER_SUBSCRIPTIONS,
                user_id,
                &Value::Object(fields),
            )
            .await
    }
}
