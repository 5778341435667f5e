use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::db::DbPool;
use crate::entities::financial_transaction::{self, Entity as FinancialTransaction, TransactionType};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::workflow::payload::lenient;
use crate::workflow::Actor;

pub(crate) fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("amount_must_be_positive"))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub transaction_type: TransactionType,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[validate(custom = "validate_positive_amount")]
    pub amount: Decimal,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub transaction_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 100))]
    pub reference: Option<String>,
    #[serde(default)]
    pub batch_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    pub transaction_type: Option<TransactionType>,
    pub category: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl TransactionFilter {
    fn condition(&self) -> Condition {
        use financial_transaction::Column;

        let mut cond = Condition::all();
        if let Some(kind) = self.transaction_type {
            cond = cond.add(Column::TransactionType.eq(kind));
        }
        if let Some(category) = &self.category {
            cond = cond.add(Column::Category.eq(category.clone()));
        }
        if let Some(from) = self.from {
            cond = cond.add(Column::TransactionDate.gte(from));
        }
        if let Some(to) = self.to {
            cond = cond.add(Column::TransactionDate.lte(to));
        }
        cond
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: String,
    pub transaction_type: TransactionType,
    pub total: Decimal,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSummary {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net: Decimal,
    pub transaction_count: u64,
    pub by_category: Vec<CategoryTotal>,
}

/// Folds transactions into income, expense and per-category totals.
pub fn summarize(transactions: &[financial_transaction::Model]) -> FinanceSummary {
    let mut total_income = Decimal::ZERO;
    let mut total_expense = Decimal::ZERO;
    let mut categories: BTreeMap<(String, bool), (Decimal, u64)> = BTreeMap::new();

    for t in transactions {
        let is_income = t.transaction_type == TransactionType::Income;
        if is_income {
            total_income += t.amount;
        } else {
            total_expense += t.amount;
        }
        let entry = categories
            .entry((t.category.clone(), is_income))
            .or_insert((Decimal::ZERO, 0));
        entry.0 += t.amount;
        entry.1 += 1;
    }

    FinanceSummary {
        total_income,
        total_expense,
        net: total_income - total_expense,
        transaction_count: transactions.len() as u64,
        by_category: categories
            .into_iter()
            .map(|((category, is_income), (total, count))| CategoryTotal {
                category,
                transaction_type: if is_income {
                    TransactionType::Income
                } else {
                    TransactionType::Expense
                },
                total,
                count,
            })
            .collect(),
    }
}

#[derive(Clone)]
pub struct FinanceService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl FinanceService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request, actor))]
    pub async fn record(
        &self,
        request: CreateTransactionRequest,
        actor: &Actor,
    ) -> Result<financial_transaction::Model, ServiceError> {
        request.validate()?;

        let model = financial_transaction::ActiveModel {
            transaction_type: Set(request.transaction_type),
            category: Set(request.category.trim().to_string()),
            amount: Set(request.amount.round_dp(2)),
            transaction_date: Set(request
                .transaction_date
                .unwrap_or_else(|| Utc::now().date_naive())),
            description: Set(request.description),
            reference: Set(request.reference),
            batch_id: Set(request.batch_id),
            recorded_by: Set(Some(actor.display_id())),
            ..Default::default()
        };
        let created = model.insert(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::TransactionRecorded(created.id))
            .await;
        info!(transaction_id = %created.id, amount = %created.amount, "transaction recorded");
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<financial_transaction::Model, ServiceError> {
        FinancialTransaction::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Transaction {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: TransactionFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<financial_transaction::Model>, u64), ServiceError> {
        let paginator = FinancialTransaction::find()
            .filter(filter.condition())
            .order_by_desc(financial_transaction::Column::TransactionDate)
            .order_by_desc(financial_transaction::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    #[instrument(skip(self))]
    pub async fn summary(&self, filter: TransactionFilter) -> Result<FinanceSummary, ServiceError> {
        let rows = FinancialTransaction::find()
            .filter(filter.condition())
            .all(&*self.db_pool)
            .await?;
        Ok(summarize(&rows))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = FinancialTransaction::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Transaction {} not found", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tx(kind: TransactionType, category: &str, amount: Decimal) -> financial_transaction::Model {
        financial_transaction::Model {
            id: Uuid::new_v4(),
            transaction_type: kind,
            category: category.into(),
            amount,
            transaction_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            description: None,
            reference: None,
            batch_id: None,
            recorded_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn summary_nets_income_against_expense() {
        let rows = vec![
            tx(TransactionType::Income, "sales", dec!(120.50)),
            tx(TransactionType::Income, "sales", dec!(79.50)),
            tx(TransactionType::Expense, "substrate", dec!(45.00)),
            tx(TransactionType::Expense, "labour", dec!(30.25)),
        ];
        let s = summarize(&rows);
        assert_eq!(s.total_income, dec!(200.00));
        assert_eq!(s.total_expense, dec!(75.25));
        assert_eq!(s.net, dec!(124.75));
        assert_eq!(s.transaction_count, 4);

        let sales = s.by_category.iter().find(|c| c.category == "sales").unwrap();
        assert_eq!(sales.count, 2);
        assert_eq!(sales.total, dec!(200.00));
    }

    #[test]
    fn empty_summary_is_zero() {
        let s = summarize(&[]);
        assert_eq!(s.net, Decimal::ZERO);
        assert!(s.by_category.is_empty());
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert!(validate_positive_amount(&dec!(0)).is_err());
        assert!(validate_positive_amount(&dec!(-5)).is_err());
        assert!(validate_positive_amount(&dec!(0.01)).is_ok());
    }
}
