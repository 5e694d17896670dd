use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    domain::{entities::mileage::MileageEntity, repositories::mileage::MileageRepository},
    infra::record_store::{collections, http::HttpRecordStore},
};

pub struct MileageStore {
    store: Arc<HttpRecordStore>,
}

impl MileageStore {
    pub fn new(store: Arc<HttpRecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MileageRepository for MileageStore {
    async fn list_by_user_id(&self, user_id: &str) -> Result<Vec<MileageEntity>> {
        let docs = self
            .store
            .list_by_user(collections::MILEAGE, user_id)
            .await?;

        docs.into_iter()
            .map(|doc| serde_json::from_value(doc).context("mileage entry did not deserialize"))
            .collect()
    }

    async fn create(&self, entry: MileageEntity) -> Result<()> {
        let id = entry.id.clone();
        let doc = serde_json::to_value(entry)?;
        self.store.set(collections::MILEAGE, &id, &doc).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(collections::MILEAGE, id).await
    }
}
