use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    axum_http::{error_responses::error_response, routers::expenses::UserQuery},
    domain::{
        entities::profiles::{InsertCommissionScheduleModel, UserProfile},
        repositories::profiles::{CommissionScheduleRepository, ProfileRepository},
    },
    infra::record_store::{
        http::HttpRecordStore,
        repositories::profiles::{CommissionScheduleStore, ProfileStore},
    },
    usecases::settings::{SettingsError, SettingsUseCase},
};

pub fn routes(record_store: Arc<HttpRecordStore>) -> Router {
    let profile_repo = ProfileStore::new(Arc::clone(&record_store));
    let schedule_repo = CommissionScheduleStore::new(Arc::clone(&record_store));
    let usecase = SettingsUseCase::new(Arc::new(profile_repo), Arc::new(schedule_repo));

    Router::new()
        .route("/profile/:user_id", get(get_profile).put(save_profile))
        .route(
            "/commission-schedules",
            get(list_schedules).post(create_schedule),
        )
        .with_state(Arc::new(usecase))
}

fn settings_error_response(err: SettingsError, request_id: &str) -> Response {
    warn!(
        %request_id,
        status = err.status_code().as_u16(),
        error = %err,
        "settings: request failed"
    );
    error_response(err.status_code(), err.to_string(), request_id, None)
}

pub async fn get_profile<P, C>(
    State(usecase): State<Arc<SettingsUseCase<P, C>>>,
    Path(user_id): Path<String>,
) -> impl IntoResponse
where
    P: ProfileRepository + Send + Sync,
    C: CommissionScheduleRepository + Send + Sync,
{
    let request_id = Uuid::new_v4().to_string();
    let response = match usecase.get_profile(&user_id).await {
        Ok(profile) => Json(profile).into_response(),
        Err(err) => settings_error_response(err, &request_id),
    };
    super::with_request_id(response, &request_id)
}

pub async fn save_profile<P, C>(
    State(usecase): State<Arc<SettingsUseCase<P, C>>>,
    Path(user_id): Path<String>,
    Json(profile): Json<UserProfile>,
) -> impl IntoResponse
where
    P: ProfileRepository + Send + Sync,
    C: CommissionScheduleRepository + Send + Sync,
{
    let request_id = Uuid::new_v4().to_string();
    let response = match usecase.save_profile(&user_id, profile).await {
        Ok(()) => axum::http::StatusCode::NO_CONTENT.into_response(),
        Err(err) => settings_error_response(err, &request_id),
    };
    super::with_request_id(response, &request_id)
}

pub async fn list_schedules<P, C>(
    State(usecase): State<Arc<SettingsUseCase<P, C>>>,
    Query(query): Query<UserQuery>,
) -> impl IntoResponse
where
    P: ProfileRepository + Send + Sync,
    C: CommissionScheduleRepository + Send + Sync,
{
    let request_id = Uuid::new_v4().to_string();
    let response = match usecase.list_commission_schedules(&query.user_id).await {
        Ok(schedules) => Json(schedules).into_response(),
        Err(err) => settings_error_response(err, &request_id),
    };
    super::with_request_id(response, &request_id)
}

pub async fn create_schedule<P, C>(
    State(usecase): State<Arc<SettingsUseCase<P, C>>>,
    Json(model): Json<InsertCommissionScheduleModel>,
) -> impl IntoResponse
where
    P: ProfileRepository + Send + Sync,
    C: CommissionScheduleRepository + Send + Sync,
{
    let request_id = Uuid::new_v4().to_string();
    let response = match usecase.create_commission_schedule(model).await {
        Ok(schedule) => (axum::http::StatusCode::CREATED, Json(schedule)).into_response(),
        Err(err) => settings_error_response(err, &request_id),
    };
    super::with_request_id(response, &request_id)
}
