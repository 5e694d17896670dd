use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    entities::profiles::{CommissionSchedule, InsertCommissionScheduleModel, UserProfile},
    repositories::profiles::{CommissionScheduleRepository, ProfileRepository},
};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings payload: {0}")]
    Invalid(String),
    #[error("profile not found")]
    ProfileNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SettingsError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            SettingsError::Invalid(_) => StatusCode::BAD_REQUEST,
            SettingsError::ProfileNotFound => StatusCode::NOT_FOUND,
            SettingsError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type SettingsResult<T> = std::result::Result<T, SettingsError>;

pub struct SettingsUseCase<P, C>
where
    P: ProfileRepository + Send + Sync + 'static,
    C: CommissionScheduleRepository + Send + Sync + 'static,
{
    profile_repo: Arc<P>,
    schedule_repo: Arc<C>,
}

impl<P, C> SettingsUseCase<P, C>
where
    P: ProfileRepository + Send + Sync + 'static,
    C: CommissionScheduleRepository + Send + Sync + 'static,
{
    pub fn new(profile_repo: Arc<P>, schedule_repo: Arc<C>) -> Self {
        Self {
            profile_repo,
            schedule_repo,
        }
    }

    pub async fn get_profile(&self, user_id: &str) -> SettingsResult<UserProfile> {
        self.profile_repo
            .find_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "settings: failed to load profile");
                SettingsError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%user_id, "settings: profile not found");
                SettingsError::ProfileNotFound
            })
    }

    pub async fn save_profile(&self, user_id: &str, mut profile: UserProfile) -> SettingsResult<()> {
        if user_id.trim().is_empty() {
            return Err(SettingsError::Invalid("userId is required".to_string()));
        }

        // The path parameter owns identity; the body cannot re-key the doc.
        profile.user_id = user_id.to_string();
        profile.updated_at = Some(Utc::now());

        self.profile_repo.upsert(profile).await.map_err(|err| {
            error!(%user_id, db_error = ?err, "settings: failed to save profile");
            SettingsError::Internal(err)
        })?;

        info!(%user_id, "settings: profile saved");
        Ok(())
    }

    pub async fn list_commission_schedules(
        &self,
        user_id: &str,
    ) -> SettingsResult<Vec<CommissionSchedule>> {
        let mut schedules = self
            .schedule_repo
            .list_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "settings: failed to list schedules");
                SettingsError::Internal(err)
            })?;
        schedules.sort_by(|a, b| b.year_start.cmp(&a.year_start));
        Ok(schedules)
    }

    pub async fn create_commission_schedule(
        &self,
        model: InsertCommissionScheduleModel,
    ) -> SettingsResult<CommissionSchedule> {
        let user_id = model
            .user_id
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| SettingsError::Invalid("userId is required".to_string()))?;
        let year_start = model
            .year_start
            .ok_or_else(|| SettingsError::Invalid("yearStart is required".to_string()))?;
        let commission_type = model
            .commission_type
            .ok_or_else(|| SettingsError::Invalid("commissionType is required".to_string()))?;

        let schedule = CommissionSchedule {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.clone(),
            year_start,
            commission_type,
            company_split_percent: model.company_split_percent,
            company_split_cap: model.company_split_cap,
            royalty_percent: model.royalty_percent,
            royalty_cap: model.royalty_cap,
            estimated_tax_percent: model.estimated_tax_percent,
            fixed_commission_amount: model.fixed_commission_amount,
            created_at: Some(Utc::now()),
        };

        self.schedule_repo
            .create(schedule.clone())
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "settings: failed to create schedule");
                SettingsError::Internal(err)
            })?;

        info!(%user_id, schedule_id = %schedule.id, "settings: commission schedule created");
        Ok(schedule)
    }
}
