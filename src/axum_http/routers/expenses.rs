use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    axum_http::error_responses::error_response,
    domain::{
        entities::expenses::{InsertExpenseModel, UpdateExpenseModel},
        repositories::{expenses::ExpenseRepository, mileage::MileageRepository},
    },
    infra::record_store::{
        http::HttpRecordStore,
        repositories::{expenses::ExpenseStore, mileage::MileageStore},
    },
    usecases::expenses::{ExpenseError, ExpenseUseCase},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: String,
}

pub fn routes(record_store: Arc<HttpRecordStore>) -> Router {
    let expense_repo = ExpenseStore::new(Arc::clone(&record_store));
    let mileage_repo = MileageStore::new(Arc::clone(&record_store));
    let usecase = ExpenseUseCase::new(Arc::new(expense_repo), Arc::new(mileage_repo));

    Router::new()
        .route("/", get(list_expenses).post(create_expense))
        .route("/export", get(export_csv))
        .route("/:id", put(update_expense).delete(delete_expense))
        .with_state(Arc::new(usecase))
}

fn expense_error_response(err: ExpenseError, request_id: &str) -> Response {
    warn!(
        %request_id,
        status = err.status_code().as_u16(),
        error = %err,
        "expenses: request failed"
    );
    error_response(err.status_code(), err.to_string(), request_id, None)
}

pub async fn list_expenses<E, M>(
    State(usecase): State<Arc<ExpenseUseCase<E, M>>>,
    Query(query): Query<UserQuery>,
) -> impl IntoResponse
where
    E: ExpenseRepository + Send + Sync,
    M: MileageRepository + Send + Sync,
{
    let request_id = Uuid::new_v4().to_string();
    let response = match usecase.list(&query.user_id).await {
        Ok(expenses) => Json(expenses).into_response(),
        Err(err) => expense_error_response(err, &request_id),
    };
    super::with_request_id(response, &request_id)
}

pub async fn create_expense<E, M>(
    State(usecase): State<Arc<ExpenseUseCase<E, M>>>,
    Json(model): Json<InsertExpenseModel>,
) -> impl IntoResponse
where
    E: ExpenseRepository + Send + Sync,
    M: MileageRepository + Send + Sync,
{
    let request_id = Uuid::new_v4().to_string();
    let response = match usecase.create(model).await {
        Ok(expense) => (axum::http::StatusCode::CREATED, Json(expense)).into_response(),
        Err(err) => expense_error_response(err, &request_id),
    };
    super::with_request_id(response, &request_id)
}

pub async fn update_expense<E, M>(
    State(usecase): State<Arc<ExpenseUseCase<E, M>>>,
    Path(id): Path<String>,
    Json(changes): Json<UpdateExpenseModel>,
) -> impl IntoResponse
where
    E: ExpenseRepository + Send + Sync,
    M: MileageRepository + Send + Sync,
{
    let request_id = Uuid::new_v4().to_string();
    let response = match usecase.update(&id, changes).await {
        Ok(()) => axum::http::StatusCode::NO_CONTENT.into_response(),
        Err(err) => expense_error_response(err, &request_id),
    };
    super::with_request_id(response, &request_id)
}

pub async fn delete_expense<E, M>(
    State(usecase): State<Arc<ExpenseUseCase<E, M>>>,
    Path(id): Path<String>,
) -> impl IntoResponse
where
    E: ExpenseRepository + Send + Sync,
    M: MileageRepository + Send + Sync,
{
    let request_id = Uuid::new_v4().to_string();
    let response = match usecase.delete(&id).await {
        Ok(()) => axum::http::StatusCode::NO_CONTENT.into_response(),
        Err(err) => expense_error_response(err, &request_id),
    };
    super::with_request_id(response, &request_id)
}

pub async fn export_csv<E, M>(
    State(usecase): State<Arc<ExpenseUseCase<E, M>>>,
    Query(query): Query<UserQuery>,
) -> impl IntoResponse
where
    E: ExpenseRepository + Send + Sync,
    M: MileageRepository + Send + Sync,
{
    let request_id = Uuid::new_v4().to_string();
    let response = match usecase.export_csv(&query.user_id).await {
        Ok(csv) => (
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"expenses.csv\"",
                ),
            ],
            csv,
        )
            .into_response(),
        Err(err) => expense_error_response(err, &request_id),
    };
    super::with_request_id(response, &request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::{
        expenses::MockExpenseRepository, mileage::MockMileageRepository,
    };

    #[tokio::test]
    async fn list_response_carries_correlation_id_header() {
        let mut repo = MockExpenseRepository::new();
        repo.expect_list_by_user_id().returning(|_| Ok(vec![]));
        let usecase = ExpenseUseCase::new(Arc::new(repo), Arc::new(MockMileageRepository::new()));

        let response = list_expenses(
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

    #[tokio::test]
    async fn error_response_carries_correlation_id_header() {
        let mut repo = MockExpenseRepository::new();
        repo.expect_list_by_user_id()
            .returning(|_| Err(anyhow::anyhow!("store unavailable")));
        let usecase = ExpenseUseCase::new(Arc::new(repo), Arc::new(MockMileageRepository::new()));

        let response = list_expenses(
            State(Arc::new(usecase)),
            Query(UserQuery {
                user_id: "u1".to_string(),
            }),
        )
        .await
        .into_response();

        assert_eq!(
            response.status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(response.headers().contains_key(super::super::REQUEST_ID_HEADER));
    }
}
