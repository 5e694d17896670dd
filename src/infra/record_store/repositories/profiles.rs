use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    domain::{
        entities::profiles::{CommissionSchedule, UserProfile},
        repositories::profiles::{CommissionScheduleRepository, ProfileRepository},
    },
    infra::record_store::{collections, http::HttpRecordStore},
};

pub struct ProfileStore {
    store: Arc<HttpRecordStore>,
}

impl ProfileStore {
    pub fn new(store: Arc<HttpRecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ProfileRepository for ProfileStore {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let doc = self.store.get(collections::USER_PROFILES, user_id).await?;
        doc.map(|doc| serde_json::from_value(doc).context("profile did not deserialize"))
            .transpose()
    }

    async fn upsert(&self, profile: UserProfile) -> Result<()> {
        let user_id = profile.user_id.clone();
        let doc = serde_json::to_value(profile)?;
        self.store
            .merge(collections::USER_PROFILES, &user_id, &doc)
            .await
    }
}

pub struct CommissionScheduleStore {
    store: Arc<HttpRecordStore>,
}

impl CommissionScheduleStore {
    pub fn new(store: Arc<HttpRecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CommissionScheduleRepository for CommissionScheduleStore {
    async fn list_by_user_id(&self, user_id: &str) -> Result<Vec<CommissionSchedule>> {
        let docs = self
            .store
            .list_by_user(collections::COMMISSION_SCHEDULES, user_id)
            .await?;

        docs.into_iter()
            .map(|doc| {
                serde_json::from_value(doc).context("commission schedule did not deserialize")
            })
            .collect()
    }

    async fn create(&self, schedule: CommissionSchedule) -> Result<()> {
        let id = schedule.id.clone();
        let doc = serde_json::to_value(schedule)?;
        self.store
            .set(collections::COMMISSION_SCHEDULES, &id, &doc)
            .await
    }
}
