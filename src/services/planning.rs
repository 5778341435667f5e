use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::milestone::{self, Entity as Milestone, MilestoneStatus};
use crate::entities::production_batch::Entity as ProductionBatch;
use crate::entities::task::{self, Entity as Task, TaskPriority, TaskStatus};
use crate::errors::ServiceError;
use crate::workflow::payload::lenient;
use crate::workflow::Actor;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMilestoneRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    pub batch_id: Option<Uuid>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<MilestoneStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMilestoneRequest {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<MilestoneStatus>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    pub milestone_id: Option<Uuid>,
    #[serde(default)]
    pub batch_id: Option<Uuid>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 50))]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 50))]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<String>,
    pub milestone_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
}

/// Milestones and the tasks that hang off them.
#[derive(Clone)]
pub struct PlanningService {
    db_pool: Arc<DbPool>,
}

impl PlanningService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    async fn ensure_batch(&self, batch_id: Option<Uuid>) -> Result<(), ServiceError> {
        if let Some(id) = batch_id {
            if ProductionBatch::find_by_id(id).one(&*self.db_pool).await?.is_none() {
                return Err(ServiceError::NotFound(format!("Production batch {} not found", id)));
            }
        }
        Ok(())
    }

    #[instrument(skip(self, request, actor))]
    pub async fn create_milestone(
        &self,
        request: CreateMilestoneRequest,
        actor: &Actor,
    ) -> Result<milestone::Model, ServiceError> {
        request.validate()?;
        self.ensure_batch(request.batch_id).await?;

        let status = request.status.unwrap_or(MilestoneStatus::Planned);
        let model = milestone::ActiveModel {
            title: Set(request.title.trim().to_string()),
            description: Set(request.description),
            batch_id: Set(request.batch_id),
            due_date: Set(request.due_date),
            status: Set(status),
            completed_at: Set((status == MilestoneStatus::Achieved).then(Utc::now)),
            created_by: Set(Some(actor.display_id())),
            ..Default::default()
        };
        let created = model.insert(&*self.db_pool).await?;
        info!(milestone_id = %created.id, "milestone created");
        Ok(created)
    }

    pub async fn get_milestone(&self, id: Uuid) -> Result<milestone::Model, ServiceError> {
        Milestone::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Milestone {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list_milestones(
        &self,
        status: Option<MilestoneStatus>,
        batch_id: Option<Uuid>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<milestone::Model>, u64), ServiceError> {
        let mut cond = Condition::all();
        if let Some(status) = status {
            cond = cond.add(milestone::Column::Status.eq(status));
        }
        if let Some(batch_id) = batch_id {
            cond = cond.add(milestone::Column::BatchId.eq(batch_id));
        }

        let paginator = Milestone::find()
            .filter(cond)
            .order_by_asc(milestone::Column::DueDate)
            .order_by_desc(milestone::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    #[instrument(skip(self, request))]
    pub async fn update_milestone(
        &self,
        id: Uuid,
        request: UpdateMilestoneRequest,
    ) -> Result<milestone::Model, ServiceError> {
        request.validate()?;
        let existing = self.get_milestone(id).await?;
        let previous_status = existing.status;
        let mut active = existing.into_active_model();

        if let Some(title) = request.title {
            active.title = Set(title);
        }
        if request.description.is_some() {
            active.description = Set(request.description);
        }
        if request.due_date.is_some() {
            active.due_date = Set(request.due_date);
        }
        if let Some(status) = request.status {
            active.status = Set(status);
            if status == MilestoneStatus::Achieved && previous_status != MilestoneStatus::Achieved {
                active.completed_at = Set(Some(Utc::now()));
            } else if status != MilestoneStatus::Achieved {
                active.completed_at = Set(None);
            }
        }

        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_milestone(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Milestone::delete_by_id(id).exec(&*self.db_pool).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Milestone {} not found", id)));
        }
        Ok(())
    }

    #[instrument(skip(self, request))]
    pub async fn create_task(&self, request: CreateTaskRequest) -> Result<task::Model, ServiceError> {
        request.validate()?;
        if let Some(milestone_id) = request.milestone_id {
            self.get_milestone(milestone_id).await?;
        }
        self.ensure_batch(request.batch_id).await?;

        let model = task::ActiveModel {
            title: Set(request.title.trim().to_string()),
            description: Set(request.description),
            milestone_id: Set(request.milestone_id),
            batch_id: Set(request.batch_id),
            assigned_to: Set(request.assigned_to),
            priority: Set(request.priority.unwrap_or(TaskPriority::Medium)),
            status: Set(TaskStatus::Todo),
            due_date: Set(request.due_date),
            completed_at: Set(None),
            ..Default::default()
        };
        Ok(model.insert(&*self.db_pool).await?)
    }

    pub async fn get_task(&self, id: Uuid) -> Result<task::Model, ServiceError> {
        Task::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Task {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list_tasks(
        &self,
        filter: TaskFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<task::Model>, u64), ServiceError> {
        let mut cond = Condition::all();
        if let Some(status) = filter.status {
            cond = cond.add(task::Column::Status.eq(status));
        }
        if let Some(assignee) = filter.assigned_to {
            cond = cond.add(task::Column::AssignedTo.eq(assignee));
        }
        if let Some(milestone_id) = filter.milestone_id {
            cond = cond.add(task::Column::MilestoneId.eq(milestone_id));
        }
        if let Some(batch_id) = filter.batch_id {
            cond = cond.add(task::Column::BatchId.eq(batch_id));
        }

        let paginator = Task::find()
            .filter(cond)
            .order_by_asc(task::Column::DueDate)
            .order_by_desc(task::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    #[instrument(skip(self, request))]
    pub async fn update_task(
        &self,
        id: Uuid,
        request: UpdateTaskRequest,
    ) -> Result<task::Model, ServiceError> {
        request.validate()?;
        let existing = self.get_task(id).await?;
        let previous_status = existing.status;
        let mut active = existing.into_active_model();

        if let Some(title) = request.title {
            active.title = Set(title);
        }
        if request.description.is_some() {
            active.description = Set(request.description);
        }
        if request.assigned_to.is_some() {
            active.assigned_to = Set(request.assigned_to);
        }
        if let Some(priority) = request.priority {
            active.priority = Set(priority);
        }
        if request.due_date.is_some() {
            active.due_date = Set(request.due_date);
        }
        if let Some(status) = request.status {
            active.status = Set(status);
            match status {
                TaskStatus::Done if previous_status != TaskStatus::Done => {
                    active.completed_at = Set(Some(Utc::now()));
                }
                TaskStatus::Done => {}
                _ => active.completed_at = Set(None),
            }
        }

        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_task(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Task::delete_by_id(id).exec(&*self.db_pool).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Task {} not found", id)));
        }
        Ok(())
    }
}
