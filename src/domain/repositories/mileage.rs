use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::mileage::MileageEntity;

#[automock]
#[async_trait]
pub trait MileageRepository {
    async fn list_by_user_id(&self, user_id: &str) -> Result<Vec<MileageEntity>>;

    async fn create(&self, entry: MileageEntity) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;
}
