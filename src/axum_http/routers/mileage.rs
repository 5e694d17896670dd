use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    axum_http::{error_responses::error_response, routers::expenses::UserQuery},
    domain::{entities::mileage::InsertMileageModel, repositories::mileage::MileageRepository},
    infra::record_store::{http::HttpRecordStore, repositories::mileage::MileageStore},
    usecases::mileage::{MileageError, MileageUseCase},
};

pub fn routes(record_store: Arc<HttpRecordStore>) -> Router {
    let mileage_repo = MileageStore::new(Arc::clone(&record_store));
    let usecase = MileageUseCase::new(Arc::new(mileage_repo));

    Router::new()
        .route("/", get(list_mileage).post(create_mileage))
        .route("/:id", delete(delete_mileage))
        .with_state(Arc::new(usecase))
}

fn mileage_error_response(err: MileageError, request_id: &str) -> Response {
    warn!(
        %request_id,
        status = err.status_code().as_u16(),
        error = %err,
        "mileage: request failed"
    );
    error_response(err.status_code(), err.to_string(), request_id, None)
}

pub async fn list_mileage<M>(
    State(usecase): State<Arc<MileageUseCase<M>>>,
    Query(query): Query<UserQuery>,
) -> impl IntoResponse
where
    M: MileageRepository + Send + Sync,
{
    let request_id = Uuid::new_v4().to_string();
    let response = match usecase.list(&query.user_id).await {
        Ok(entries) => Json(entries).into_response(),
        Err(err) => mileage_error_response(err, &request_id),
    };
    super::with_request_id(response, &request_id)
}

pub async fn create_mileage<M>(
    State(usecase): State<Arc<MileageUseCase<M>>>,
    Json(model): Json<InsertMileageModel>,
) -> impl IntoResponse
where
    M: MileageRepository + Send + Sync,
{
    let request_id = Uuid::new_v4().to_string();
    let response = match usecase.create(model).await {
        Ok(entry) => (axum::http::StatusCode::CREATED, Json(entry)).into_response(),
        Err(err) => mileage_error_response(err, &request_id),
    };
    super::with_request_id(response, &request_id)
}

pub async fn delete_mileage<M>(
    State(usecase): State<Arc<MileageUseCase<M>>>,
    Path(id): Path<String>,
) -> impl IntoResponse
where
    M: MileageRepository + Send + Sync,
{
    let request_id = Uuid::new_v4().to_string();
    let response = match usecase.delete(&id).await {
        Ok(()) => axum::http::StatusCode::NO_CONTENT.into_response(),
        Err(err) => mileage_error_response(err, &request_id),
    };
    super::with_request_id(response, &request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::mileage::MockMileageRepository;

    #[tokio::test]
    async fn list_response_carries_correlation_id_header() {
        let mut repo = MockMileageRepository::new();
        repo.expect_list_by_user_id().returning(|_| Ok(vec![]));
        let usecase = MileageUseCase::new(Arc::new(repo));

        let response = list_mileage(
            State(Arc::new(usecase)),
            Query(UserQuery {
                user_id: "u1".to_string(),
            }),
        )
        .await
        .into_response();

        assert!(response.status().is_success());
        assert!(response.headers().contains_key(super::super::REQUEST_ID_HEADER));
    }
}
