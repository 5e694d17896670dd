use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::profiles::{CommissionSchedule, UserProfile};

#[automock]
#[async_trait]
pub trait ProfileRepository {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// Merge-upserts the profile document so partial saves keep fields
    /// the settings form did not touch.
    async fn upsert(&self, profile: UserProfile) -> Result<()>;
}

#[automock]
#[async_trait]
pub trait CommissionScheduleRepository {
    async fn list_by_user_id(&self, user_id: &str) -> Result<Vec<CommissionSchedule>>;

    async fn create(&self, schedule: CommissionSchedule) -> Result<()>;
}
