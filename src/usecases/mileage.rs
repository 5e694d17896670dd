use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{
    entities::mileage::{InsertMileageModel, MileageEntity},
    repositories::mileage::MileageRepository,
};

#[derive(Debug, Error)]
pub enum MileageError {
    #[error("invalid mileage entry: {0}")]
    Invalid(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl MileageError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            MileageError::Invalid(_) => StatusCode::BAD_REQUEST,
            MileageError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type MileageResult<T> = std::result::Result<T, MileageError>;

pub struct MileageUseCase<M>
where
    M: MileageRepository + Send + Sync + 'static,
{
    mileage_repo: Arc<M>,
}

impl<M> MileageUseCase<M>
where
    M: MileageRepository + Send + Sync + 'static,
{
    pub fn new(mileage_repo: Arc<M>) -> Self {
        Self { mileage_repo }
    }

    pub async fn list(&self, user_id: &str) -> MileageResult<Vec<MileageEntity>> {
        let mut entries = self
            .mileage_repo
            .list_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "mileage: failed to list entries");
                MileageError::Internal(err)
            })?;
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(entries)
    }

    pub async fn create(&self, model: InsertMileageModel) -> MileageResult<MileageEntity> {
        let user_id = model
            .user_id
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| MileageError::Invalid("userId is required".to_string()))?;
        let date = model
            .date
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| MileageError::Invalid("date is required".to_string()))?;
        let miles = model
            .miles
            .filter(|miles| *miles > 0.0)
            .ok_or_else(|| MileageError::Invalid("miles must be positive".to_string()))?;
        let cost_per_mile = model
            .cost_per_mile
            .filter(|cost| *cost >= 0.0)
            .ok_or_else(|| MileageError::Invalid("costPerMile must not be negative".to_string()))?;

        let trip_factor = if model.round_trip { 2.0 } else { 1.0 };
        let entry = MileageEntity {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.clone(),
            date,
            begin_address: model.begin_address.unwrap_or_default(),
            end_address: model.end_address.unwrap_or_default(),
            round_trip: model.round_trip,
            miles,
            cost_per_mile,
            total_cost: miles * cost_per_mile * trip_factor,
            deal: model.deal.unwrap_or_default(),
            notes: model.notes.unwrap_or_default(),
            created_at: Some(Utc::now()),
        };

        self.mileage_repo.create(entry.clone()).await.map_err(|err| {
            error!(%user_id, db_error = ?err, "mileage: failed to create entry");
            MileageError::Internal(err)
        })?;

        info!(%user_id, entry_id = %entry.id, total_cost = entry.total_cost, "mileage: entry created");
        Ok(entry)
    }

    pub async fn delete(&self, id: &str) -> MileageResult<()> {
        self.mileage_repo.delete(id).await.map_err(|err| {
            error!(entry_id = %id, db_error = ?err, "mileage: failed to delete entry");
            MileageError::Internal(err)
        })?;

        info!(entry_id = %id, "mileage: entry deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::mileage::MockMileageRepository;

    fn model(miles: f64, cost_per_mile: f64, round_trip: bool) -> InsertMileageModel {
        InsertMileageModel {
            user_id: Some("u1".to_string()),
            date: Some("2026-02-01".to_string()),
            begin_address: None,
            end_address: None,
            round_trip,
            miles: Some(miles),
            cost_per_mile: Some(cost_per_mile),
            deal: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn create_computes_round_trip_total() {
        let mut repo = MockMileageRepository::new();
        repo.expect_create().returning(|_| Ok(()));

        let usecase = MileageUseCase::new(Arc::new(repo));
        let entry = usecase.create(model(12.5, 0.67, true)).await.unwrap();
        assert!((entry.total_cost - 16.75).abs() < 1e-9);

        let mut repo = MockMileageRepository::new();
        repo.expect_create().returning(|_| Ok(()));
        let usecase = MileageUseCase::new(Arc::new(repo));
        let entry = usecase.create(model(12.5, 0.67, false)).await.unwrap();
        assert!((entry.total_cost - 8.375).abs() < 1e-9);
    }

    #[tokio::test]
    async fn create_rejects_non_positive_miles() {
        let usecase = MileageUseCase::new(Arc::new(MockMileageRepository::new()));
        let result = usecase.create(model(0.0, 0.67, false)).await;
        assert!(matches!(result, Err(MileageError::Invalid(_))));
    }
}
