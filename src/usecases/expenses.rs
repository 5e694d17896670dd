use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    entities::{
        expenses::{ExpenseEntity, InsertExpenseModel, UpdateExpenseModel},
        mileage::MileageEntity,
    },
    repositories::{expenses::ExpenseRepository, mileage::MileageRepository},
};

#[derive(Debug, Error)]
pub enum ExpenseError {
    #[error("invalid expense: {0}")]
    Invalid(String),
    #[error("expense not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ExpenseError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            ExpenseError::Invalid(_) => StatusCode::BAD_REQUEST,
            ExpenseError::NotFound => StatusCode::NOT_FOUND,
            ExpenseError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type ExpenseResult<T> = std::result::Result<T, ExpenseError>;

pub struct ExpenseUseCase<E, M>
where
    E: ExpenseRepository + Send + Sync + 'static,
    M: MileageRepository + Send + Sync + 'static,
{
    expense_repo: Arc<E>,
    mileage_repo: Arc<M>,
}

impl<E, M> ExpenseUseCase<E, M>
where
    E: ExpenseRepository + Send + Sync + 'static,
    M: MileageRepository + Send + Sync + 'static,
{
    pub fn new(expense_repo: Arc<E>, mileage_repo: Arc<M>) -> Self {
        Self {
            expense_repo,
            mileage_repo,
        }
    }

    pub async fn list(&self, user_id: &str) -> ExpenseResult<Vec<ExpenseEntity>> {
        let mut expenses = self
            .expense_repo
            .list_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "expenses: failed to list expenses");
                ExpenseError::Internal(err)
            })?;
        expenses.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(expenses)
    }

    pub async fn create(&self, model: InsertExpenseModel) -> ExpenseResult<ExpenseEntity> {
        let user_id = required(model.user_id, "userId")?;
        let date = required(model.date, "date")?;
        let category = required(model.category, "category")?;
        let amount = model
            .amount
            .filter(|amount| *amount > 0.0)
            .ok_or_else(|| ExpenseError::Invalid("amount must be positive".to_string()))?;

        let expense = ExpenseEntity {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.clone(),
            date,
            category,
            amount,
            notes: model.notes.unwrap_or_default(),
            deal: model.deal.unwrap_or_default(),
            receipt_url: model.receipt_url,
            created_at: Some(Utc::now()),
        };

        self.expense_repo.create(expense.clone()).await.map_err(|err| {
            error!(%user_id, db_error = ?err, "expenses: failed to create expense");
            ExpenseError::Internal(err)
        })?;

        info!(%user_id, expense_id = %expense.id, "expenses: expense created");
        Ok(expense)
    }

    pub async fn update(&self, id: &str, changes: UpdateExpenseModel) -> ExpenseResult<()> {
        if changes.amount.is_some_and(|amount| amount <= 0.0) {
            return Err(ExpenseError::Invalid("amount must be positive".to_string()));
        }

        let existing = self.expense_repo.find_by_id(id).await.map_err(|err| {
            error!(expense_id = %id, db_error = ?err, "expenses: failed to load expense");
            ExpenseError::Internal(err)
        })?;
        if existing.is_none() {
            warn!(expense_id = %id, "expenses: update target not found");
            return Err(ExpenseError::NotFound);
        }

        self.expense_repo.update(id, changes).await.map_err(|err| {
            error!(expense_id = %id, db_error = ?err, "expenses: failed to update expense");
            ExpenseError::Internal(err)
        })?;

        info!(expense_id = %id, "expenses: expense updated");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> ExpenseResult<()> {
        self.expense_repo.delete(id).await.map_err(|err| {
            error!(expense_id = %id, db_error = ?err, "expenses: failed to delete expense");
            ExpenseError::Internal(err)
        })?;

        info!(expense_id = %id, "expenses: expense deleted");
        Ok(())
    }

    /// Combined expense + mileage export, newest first. Mileage entries
    /// appear as `Mileage` category rows at their computed total cost.
    pub async fn export_csv(&self, user_id: &str) -> ExpenseResult<String> {
        let expenses = self
            .expense_repo
            .list_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "expenses: failed to list expenses for export");
                ExpenseError::Internal(err)
            })?;
        let mileage = self
            .mileage_repo
            .list_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "expenses: failed to list mileage for export");
                ExpenseError::Internal(err)
            })?;

        let mut rows: Vec<CsvRow> = expenses.into_iter().map(CsvRow::from).collect();
        rows.extend(mileage.into_iter().map(CsvRow::from));
        rows.sort_by(|a, b| b.date.cmp(&a.date));

        let mut csv = String::new();
        csv.push_str("Date,Category,Amount,Deal,Notes\n");
        for row in rows {
            csv.push_str(&format!(
                "{},{},{:.2},{},{}\n",
                escape_csv_field(&row.date),
                escape_csv_field(&row.category),
                row.amount,
                escape_csv_field(&row.deal),
                escape_csv_field(&row.notes),
            ));
        }

        info!(%user_id, "expenses: csv export generated");
        Ok(csv)
    }
}

struct CsvRow {
    date: String,
    category: String,
    amount: f64,
    deal: String,
    notes: String,
}

impl From<ExpenseEntity> for CsvRow {
    fn from(expense: ExpenseEntity) -> Self {
        Self {
            date: expense.date,
            category: expense.category,
            amount: expense.amount,
            deal: expense.deal,
            notes: expense.notes,
        }
    }
}

impl From<MileageEntity> for CsvRow {
    fn from(entry: MileageEntity) -> Self {
        let notes = if entry.begin_address.is_empty() && entry.end_address.is_empty() {
            entry.notes
        } else {
            format!(
                "{} to {} ({} mi){}",
                entry.begin_address,
                entry.end_address,
                entry.miles,
                if entry.notes.is_empty() {
                    String::new()
                } else {
                    format!(": {}", entry.notes)
                }
            )
        };

        Self {
            date: entry.date,
            category: "Mileage".to_string(),
            amount: entry.total_cost,
            deal: entry.deal,
            notes,
        }
    }
}

fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn required(value: Option<String>, name: &str) -> ExpenseResult<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ExpenseError::Invalid(format!("{name} is required")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::{
        expenses::MockExpenseRepository, mileage::MockMileageRepository,
    };

    fn expense(date: &str, category: &str, amount: f64, notes: &str) -> ExpenseEntity {
        ExpenseEntity {
            id: Uuid::new_v4().to_string(),
            user_id: "u1".to_string(),
            date: date.to_string(),
            category: category.to_string(),
            amount,
            notes: notes.to_string(),
            deal: String::new(),
            receipt_url: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn create_rejects_non_positive_amount() {
        let usecase = ExpenseUseCase::new(
            Arc::new(MockExpenseRepository::new()),
            Arc::new(MockMileageRepository::new()),
        );
        let result = usecase
            .create(InsertExpenseModel {
                user_id: Some("u1".to_string()),
                date: Some("2026-01-15".to_string()),
                category: Some("Marketing".to_string()),
                amount: Some(0.0),
                notes: None,
                deal: None,
                receipt_url: None,
            })
            .await;
        assert!(matches!(result, Err(ExpenseError::Invalid(_))));
    }

    #[tokio::test]
    async fn update_of_missing_expense_is_not_found() {
        let mut repo = MockExpenseRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));
        let usecase = ExpenseUseCase::new(Arc::new(repo), Arc::new(MockMileageRepository::new()));
        let result = usecase.update("missing", UpdateExpenseModel::default()).await;
        assert!(matches!(result, Err(ExpenseError::NotFound)));
    }

    #[tokio::test]
    async fn export_surfaces_store_failure() {
        let mut expense_repo = MockExpenseRepository::new();
        expense_repo
            .expect_list_by_user_id()
            .returning(|_| Err(anyhow::anyhow!("store unavailable")));

        let usecase = ExpenseUseCase::new(
            Arc::new(expense_repo),
            Arc::new(MockMileageRepository::new()),
        );
        let result = usecase.export_csv("u1").await;
        assert!(matches!(result, Err(ExpenseError::Internal(_))));
    }

    #[tokio::test]
    async fn export_merges_mileage_rows_and_escapes_fields() {
        let mut expense_repo = MockExpenseRepository::new();
        expense_repo.expect_list_by_user_id().returning(|_| {
            Ok(vec![expense(
                "2026-01-10",
                "Signs, Flyers",
                42.5,
                "lockbox \"spare\"",
            )])
        });

        let mut mileage_repo = MockMileageRepository::new();
        mileage_repo.expect_list_by_user_id().returning(|_| {
            Ok(vec![MileageEntity {
                id: "m1".to_string(),
                user_id: "u1".to_string(),
                date: "2026-01-12".to_string(),
                begin_address: "Office".to_string(),
                end_address: "12 Oak St".to_string(),
                round_trip: true,
                miles: 10.0,
                cost_per_mile: 0.67,
                total_cost: 13.4,
                deal: "12 Oak St".to_string(),
                notes: String::new(),
                created_at: None,
            }])
        });

        let usecase = ExpenseUseCase::new(Arc::new(expense_repo), Arc::new(mileage_repo));
        let csv = usecase.export_csv("u1").await.unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Date,Category,Amount,Deal,Notes");
        // Mileage entry is newer, so it sorts first.
        assert!(lines[1].starts_with("2026-01-12,Mileage,13.40"));
        assert!(lines[2].contains("\"Signs, Flyers\""));
        assert!(lines[2].contains("\"lockbox \"\"spare\"\"\""));
    }
}
