use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::with_transaction;
use crate::entities::contamination_log;
use crate::entities::production_batch::{
    self, BatchStatus, Column, Entity as ProductionBatch, Model as BatchModel,
};
use crate::errors::ServiceError;
use crate::repositories::{BaseRepository, Repository};
use crate::workflow::ProductionStage;

/// Optional list filters; `None` means "any".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchFilter {
    pub stage: Option<ProductionStage>,
    pub status: Option<BatchStatus>,
    pub requires_approval: Option<bool>,
    /// Matched against batch number and product type.
    pub search: Option<String>,
}

#[async_trait]
pub trait ProductionBatchRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<BatchModel>, ServiceError>;

    async fn find_by_number(&self, batch_number: &str) -> Result<Option<BatchModel>, ServiceError>;

    /// Newest first. Returns the page and the total number of matches.
    async fn list(
        &self,
        filter: &BatchFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<BatchModel>, u64), ServiceError>;

    /// Every match, unpaged.
    async fn list_all(&self, filter: &BatchFilter) -> Result<Vec<BatchModel>, ServiceError>;

    async fn insert(&self, batch: BatchModel) -> Result<BatchModel, ServiceError>;

    /// Writes every column of `batch`, provided the stored row is still at
    /// `read_version`. Otherwise fails with `ConcurrentModification`.
    async fn update(&self, batch: BatchModel, read_version: i32) -> Result<BatchModel, ServiceError>;

    /// Returns false when no row was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError>;
}

/// Repository for production batches
#[derive(Debug, Clone)]
pub struct SeaOrmProductionBatchRepository {
    base: BaseRepository,
}

impl SeaOrmProductionBatchRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    fn condition(filter: &BatchFilter) -> Condition {
        let mut cond = Condition::all();
        if let Some(stage) = filter.stage {
            cond = cond.add(Column::CurrentStage.eq(stage));
        }
        if let Some(status) = filter.status {
            cond = cond.add(Column::Status.eq(status));
        }
        if let Some(flag) = filter.requires_approval {
            cond = cond.add(Column::RequiresApproval.eq(flag));
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            cond = cond.add(
                Condition::any()
                    .add(Column::BatchNumber.contains(term))
                    .add(Column::ProductType.contains(term)),
            );
        }
        cond
    }
}

#[async_trait]
impl ProductionBatchRepository for SeaOrmProductionBatchRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<BatchModel>, ServiceError> {
        Ok(ProductionBatch::find_by_id(id).one(self.get_db()).await?)
    }

    async fn find_by_number(&self, batch_number: &str) -> Result<Option<BatchModel>, ServiceError> {
        Ok(ProductionBatch::find()
            .filter(Column::BatchNumber.eq(batch_number))
            .one(self.get_db())
            .await?)
    }

    async fn list(
        &self,
        filter: &BatchFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<BatchModel>, u64), ServiceError> {
        let paginator = ProductionBatch::find()
            .filter(Self::condition(filter))
            .order_by_desc(Column::CreatedAt)
            .paginate(self.get_db(), page_size);

        let total = paginator.num_items().await?;
        let batches = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((batches, total))
    }

    async fn list_all(&self, filter: &BatchFilter) -> Result<Vec<BatchModel>, ServiceError> {
        Ok(ProductionBatch::find()
            .filter(Self::condition(filter))
            .order_by_desc(Column::CreatedAt)
            .all(self.get_db())
            .await?)
    }

    async fn insert(&self, batch: BatchModel) -> Result<BatchModel, ServiceError> {
        let active: production_batch::ActiveModel = batch.into_active_model().reset_all();
        active
            .insert(self.get_db())
            .await
            .map_err(|e| ServiceError::from_db_write(e, "batch number"))
    }

    async fn update(&self, mut batch: BatchModel, read_version: i32) -> Result<BatchModel, ServiceError> {
        let id = batch.id;
        batch.updated_at = Utc::now();

        let mut active: production_batch::ActiveModel = batch.clone().into_active_model().reset_all();
        active.not_set(Column::Id);
        active.not_set(Column::CreatedAt);

        let result = ProductionBatch::update_many()
            .set(active)
            .filter(Column::Id.eq(id))
            .filter(Column::Version.eq(read_version))
            .exec(self.get_db())
            .await
            .map_err(|e| ServiceError::from_db_write(e, "batch number"))?;

        if result.rows_affected == 0 {
            return match self.find_by_id(id).await? {
                Some(_) => Err(ServiceError::ConcurrentModification(id)),
                None => Err(ServiceError::NotFound(format!("Production batch {} not found", id))),
            };
        }

        Ok(batch)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        with_transaction(self.get_db(), |txn| {
            Box::pin(async move {
                contamination_log::Entity::delete_many()
                    .filter(contamination_log::Column::BatchId.eq(id))
                    .exec(txn)
                    .await?;
                let result = ProductionBatch::delete_many()
                    .filter(Column::Id.eq(id))
                    .exec(txn)
                    .await?;
                Ok(result.rows_affected > 0)
            })
        })
        .await
    }
}

impl Repository for SeaOrmProductionBatchRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}

