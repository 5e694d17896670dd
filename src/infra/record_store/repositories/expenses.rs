use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    domain::{
        entities::expenses::{ExpenseEntity, UpdateExpenseModel},
        repositories::expenses::ExpenseRepository,
    },
    infra::record_store::{collections, http::HttpRecordStore},
};

pub struct ExpenseStore {
    store: Arc<HttpRecordStore>,
}

impl ExpenseStore {
    pub fn new(store: Arc<HttpRecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ExpenseRepository for ExpenseStore {
    async fn list_by_user_id(&self, user_id: &str) -> Result<Vec<ExpenseEntity>> {
        let docs = self
            .store
            .list_by_user(collections::EXPENSES, user_id)
            .await?;

        docs.into_iter()
            .map(|doc| serde_json::from_value(doc).context("expense did not deserialize"))
            .collect()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ExpenseEntity>> {
        let doc = self.store.get(collections::EXPENSES, id).await?;
        doc.map(|doc| serde_json::from_value(doc).context("expense did not deserialize"))
            .transpose()
    }

    async fn create(&self, expense: ExpenseEntity) -> Result<()> {
        let id = expense.id.clone();
        let doc = serde_json::to_value(expense)?;
        self.store.set(collections::EXPENSES, &id, &doc).await
    }

    async fn update(&self, id: &str, changes: UpdateExpenseModel) -> Result<()> {
        let fields = serde_json::to_value(changes)?;
        self.store.merge(collections::EXPENSES, id, &fields).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(collections::EXPENSES, id).await
    }
}
