use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::expenses::{ExpenseEntity, UpdateExpenseModel};

#[automock]
#[async_trait]
pub trait ExpenseRepository {
    async fn list_by_user_id(&self, user_id: &str) -> Result<Vec<ExpenseEntity>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<ExpenseEntity>>;

    async fn create(&self, expense: ExpenseEntity) -> Result<()>;

    async fn update(&self, id: &str, changes: UpdateExpenseModel) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;
}
