use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::contamination_log::{self, Column, Entity as ContaminationLog, Model as LogModel};
use crate::errors::ServiceError;
use crate::repositories::{BaseRepository, Repository};

#[async_trait]
pub trait ContaminationLogRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<LogModel>, ServiceError>;

    /// Most recently detected first.
    async fn list(
        &self,
        batch_id: Option<Uuid>,
        verified: Option<bool>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<LogModel>, u64), ServiceError>;

    async fn insert(&self, log: LogModel) -> Result<LogModel, ServiceError>;

    async fn update(&self, log: LogModel) -> Result<LogModel, ServiceError>;

    /// Number of logs per batch. Batches without logs are absent from the map.
    async fn count_by_batch(&self, batch_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, ServiceError>;

    async fn count_unverified(&self) -> Result<u64, ServiceError>;
}

#[derive(Debug, FromQueryResult)]
struct BatchLogCount {
    batch_id: Uuid,
    log_count: i64,
}

#[derive(Debug, Clone)]
pub struct SeaOrmContaminationLogRepository {
    base: BaseRepository,
}

impl SeaOrmContaminationLogRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl ContaminationLogRepository for SeaOrmContaminationLogRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<LogModel>, ServiceError> {
        Ok(ContaminationLog::find_by_id(id).one(self.get_db()).await?)
    }

    async fn list(
        &self,
        batch_id: Option<Uuid>,
        verified: Option<bool>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<LogModel>, u64), ServiceError> {
        let mut cond = Condition::all();
        if let Some(batch_id) = batch_id {
            cond = cond.add(Column::BatchId.eq(batch_id));
        }
        if let Some(verified) = verified {
            cond = cond.add(Column::IsVerified.eq(verified));
        }

        let paginator = ContaminationLog::find()
            .filter(cond)
            .order_by_desc(Column::DetectedDate)
            .order_by_desc(Column::CreatedAt)
            .paginate(self.get_db(), page_size);

        let total = paginator.num_items().await?;
        let logs = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((logs, total))
    }

    async fn insert(&self, log: LogModel) -> Result<LogModel, ServiceError> {
        let active: contamination_log::ActiveModel = log.into_active_model().reset_all();
        Ok(active.insert(self.get_db()).await?)
    }

    async fn update(&self, log: LogModel) -> Result<LogModel, ServiceError> {
        let active: contamination_log::ActiveModel = log.into_active_model().reset_all();
        Ok(active.update(self.get_db()).await?)
    }

    async fn count_by_batch(&self, batch_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, ServiceError> {
        if batch_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = ContaminationLog::find()
            .select_only()
            .column(Column::BatchId)
            .column_as(Column::Id.count(), "log_count")
            .filter(Column::BatchId.is_in(batch_ids.to_vec()))
            .group_by(Column::BatchId)
            .into_model::<BatchLogCount>()
            .all(self.get_db())
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.batch_id, row.log_count.max(0) as u64))
            .collect())
    }

    async fn count_unverified(&self) -> Result<u64, ServiceError> {
        Ok(ContaminationLog::find()
            .filter(Column::IsVerified.eq(false))
            .count(self.get_db())
            .await?)
    }
}

impl Repository for SeaOrmContaminationLogRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
