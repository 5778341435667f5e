use chrono::{NaiveDate, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::production_batch::{BatchStatus, Model as BatchModel};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::repositories::{BatchFilter, ContaminationLogRepository, ProductionBatchRepository};
use crate::tracing::with_metrics;
use crate::workflow::approval::{self, review_priority, GatedChanges};
use crate::workflow::payload::{lenient, validate_rate, BlankFields};
use crate::workflow::{
    apply_stage_payload, plan_transition, Actor, ProductionStage, StagePayload, SupplyChainStage,
    TransitionPlan,
};

/// Request to register a new batch at `batch_creation`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchRequest {
    #[validate(length(min = 1, max = 50))]
    pub batch_number: String,
    #[validate(length(min = 1, max = 100))]
    pub product_type: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 100))]
    pub substrate_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    #[validate(range(min = 0.0))]
    pub substrate_weight_kg: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub creation_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[serde(default)]
    pub supply_chain_stage: Option<SupplyChainStage>,
}

/// General edit of a batch outside the stage forms.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBatchRequest {
    #[serde(default)]
    pub status: Option<BatchStatus>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    #[validate(custom = "validate_rate")]
    pub contamination_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    #[validate(range(min = 0.0))]
    pub harvested_weight_kg: Option<f64>,
    #[serde(default)]
    pub supply_chain_stage: Option<SupplyChainStage>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[serde(default)]
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectBatchRequest {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceSupplyChainRequest {
    #[serde(default)]
    pub expected_version: Option<i32>,
}

/// A batch as returned by the API: the stored row plus read-time values.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchView {
    #[serde(flatten)]
    pub batch: BatchModel,
    pub progress: f64,
    pub supply_chain_progress: f64,
    pub next_stage: Option<ProductionStage>,
    pub contamination_count: u64,
    /// `contaminated` once any contamination log exists, else the stored status.
    pub display_status: String,
}

impl BatchView {
    pub fn new(batch: BatchModel, contamination_count: u64) -> Self {
        let display_status = if contamination_count > 0 {
            BatchStatus::Contaminated.to_string()
        } else {
            batch.status.to_string()
        };
        Self {
            progress: batch.current_stage.progress(),
            supply_chain_progress: batch.supply_chain_stage.progress(),
            next_stage: batch.current_stage.next(),
            contamination_count,
            display_status,
            batch,
        }
    }
}

/// Service for the production batch workflow
#[derive(Clone)]
pub struct ProductionBatchService {
    batches: Arc<dyn ProductionBatchRepository>,
    logs: Arc<dyn ContaminationLogRepository>,
    event_sender: Arc<EventSender>,
}

fn parse_stage_field(body: &Value, key: &str) -> Result<Option<ProductionStage>, ServiceError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => ProductionStage::from_str(s)
            .map(Some)
            .map_err(|_| ServiceError::InvalidInput(format!("unknown stage '{}'", s))),
        Some(other) => Err(ServiceError::InvalidInput(format!(
            "{} must be a stage name, got {}",
            key, other
        ))),
    }
}

fn parse_expected_version(body: &Value) -> Result<Option<i32>, ServiceError> {
    match body.get("expectedVersion") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| ServiceError::InvalidInput("expectedVersion must be an integer".into())),
    }
}

/// General edits may not fill in fields of stages the batch has not reached.
/// Completion happens through the post_harvest stage submission.
fn ensure_stage_reached(batch: &BatchModel, request: &UpdateBatchRequest) -> Result<(), ServiceError> {
    if request.harvested_weight_kg.is_some() && batch.current_stage < ProductionStage::Harvesting {
        return Err(ServiceError::InvalidOperation(format!(
            "harvestedWeightKg cannot be set while the batch is at {}",
            batch.current_stage
        )));
    }
    if request.status == Some(BatchStatus::Completed)
        && batch.status != BatchStatus::Completed
        && batch.current_stage != ProductionStage::Completed
    {
        return Err(ServiceError::InvalidOperation(
            "a batch is completed by submitting its post_harvest stage".into(),
        ));
    }
    Ok(())
}

fn check_version(batch: &BatchModel, expected: Option<i32>) -> Result<(), ServiceError> {
    match expected {
        Some(v) if v != batch.version => Err(ServiceError::ConcurrentModification(batch.id)),
        _ => Ok(()),
    }
}

impl ProductionBatchService {
    pub fn new(
        batches: Arc<dyn ProductionBatchRepository>,
        logs: Arc<dyn ContaminationLogRepository>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            batches,
            logs,
            event_sender,
        }
    }

    async fn load(&self, id: Uuid) -> Result<BatchModel, ServiceError> {
        self.batches
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Production batch {} not found", id)))
    }

    async fn view(&self, batch: BatchModel) -> Result<BatchView, ServiceError> {
        let counts = self.logs.count_by_batch(&[batch.id]).await?;
        let count = counts.get(&batch.id).copied().unwrap_or(0);
        Ok(BatchView::new(batch, count))
    }

    async fn views(&self, batches: Vec<BatchModel>) -> Result<Vec<BatchView>, ServiceError> {
        let ids: Vec<Uuid> = batches.iter().map(|b| b.id).collect();
        let counts = self.logs.count_by_batch(&ids).await?;
        Ok(batches
            .into_iter()
            .map(|b| {
                let count = counts.get(&b.id).copied().unwrap_or(0);
                BatchView::new(b, count)
            })
            .collect())
    }

    /// Bumps the version, stamps the editor and persists.
    async fn save(&self, mut batch: BatchModel, actor: &Actor) -> Result<BatchModel, ServiceError> {
        let read_version = batch.version;
        batch.version = read_version + 1;
        batch.last_modified_by = Some(actor.display_id());
        self.batches.update(batch, read_version).await
    }

    async fn publish_gate(&self, batch: &BatchModel, flagged: bool, actor: &Actor) {
        if flagged {
            counter!("farmops_batches_flagged_total", 1);
            self.event_sender
                .send_or_log(Event::BatchFlaggedForReview {
                    batch_id: batch.id,
                    risk_level: batch.risk_level,
                    modified_by: actor.display_id(),
                })
                .await;
        }
    }

    #[instrument(skip(self, request), fields(batch_number = %request.batch_number))]
    pub async fn create(
        &self,
        request: CreateBatchRequest,
        actor: &Actor,
    ) -> Result<BatchView, ServiceError> {
        request.validate()?;

        let batch_number = request.batch_number.trim().to_string();
        if self.batches.find_by_number(&batch_number).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "batch number {} already exists",
                batch_number
            )));
        }

        let creation_date = request
            .creation_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let mut batch = BatchModel::new(batch_number, request.product_type.trim().to_string(), creation_date);
        batch.substrate_type = request.substrate_type;
        batch.substrate_weight_kg = request.substrate_weight_kg;
        batch.location = request.location;
        batch.notes = request.notes;
        if let Some(stage) = request.supply_chain_stage {
            batch.supply_chain_stage = stage;
        }
        batch.created_by = Some(actor.display_id());
        batch.last_modified_by = Some(actor.display_id());

        let batch = self.batches.insert(batch).await?;

        counter!("farmops_batches_created_total", 1);
        self.event_sender
            .send_or_log(Event::BatchCreated {
                batch_id: batch.id,
                batch_number: batch.batch_number.clone(),
            })
            .await;
        info!(batch_id = %batch.id, "production batch created");

        Ok(BatchView::new(batch, 0))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<BatchView, ServiceError> {
        let batch = self.load(id).await?;
        self.view(batch).await
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: BatchFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<BatchView>, u64), ServiceError> {
        let (batches, total) = self.batches.list(&filter, page, limit).await?;
        Ok((self.views(batches).await?, total))
    }

    /// PATCH entry point. Bodies carrying `currentStage` are stage-completion
    /// submissions; anything else is a general edit.
    #[instrument(skip(self, body, actor), fields(actor = %actor.display_id()))]
    pub async fn patch(&self, id: Uuid, body: Value, actor: &Actor) -> Result<BatchView, ServiceError> {
        if !body.is_object() {
            return Err(ServiceError::InvalidInput("request body must be a JSON object".into()));
        }
        if body.get("currentStage").map_or(false, |v| !v.is_null()) {
            with_metrics("batch_stage_submission", || self.submit_stage(id, body, actor)).await
        } else {
            let request: UpdateBatchRequest = serde_json::from_value(body)?;
            with_metrics("batch_update", || self.update(id, request, actor)).await
        }
    }

    /// Merges the payload of the stage being completed and moves the batch
    /// to the `currentStage` named in `body`.
    #[instrument(skip(self, body, actor))]
    pub async fn submit_stage(
        &self,
        id: Uuid,
        body: Value,
        actor: &Actor,
    ) -> Result<BatchView, ServiceError> {
        let target = parse_stage_field(&body, "currentStage")?
            .ok_or_else(|| ServiceError::InvalidInput("currentStage is required".into()))?;
        let declared = parse_stage_field(&body, "stage")?;
        let expected_version = parse_expected_version(&body)?;

        let mut batch = self.load(id).await?;
        let from = batch.current_stage;

        let completed = match plan_transition(from, target, declared)? {
            TransitionPlan::Unchanged => {
                info!(batch_id = %id, "batch already completed; submission ignored");
                return self.view(batch).await;
            }
            TransitionPlan::Advance { completed, .. } => completed,
        };
        check_version(&batch, expected_version)?;

        let blanks = BlankFields::from_body(&body);
        let payload = StagePayload::parse(completed, body)?;
        let today = Utc::now().date_naive();
        let changes = apply_stage_payload(&mut batch, payload, &blanks, target, actor, today);
        let flagged = approval::apply_gate(&mut batch, actor, &changes);

        let batch = self.save(batch, actor).await?;

        counter!("farmops_stage_transitions_total", 1, "stage" => target.to_string());
        self.event_sender
            .send_or_log(Event::BatchStageAdvanced {
                batch_id: batch.id,
                from,
                to: target,
            })
            .await;
        self.publish_gate(&batch, flagged, actor).await;
        info!(batch_id = %batch.id, %from, to = %target, flagged, "batch stage advanced");

        self.view(batch).await
    }

    #[instrument(skip(self, request, actor))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateBatchRequest,
        actor: &Actor,
    ) -> Result<BatchView, ServiceError> {
        request.validate()?;

        let mut batch = self.load(id).await?;
        check_version(&batch, request.expected_version)?;
        ensure_stage_reached(&batch, &request)?;

        let status_changed = match request.status {
            Some(status) if status != batch.status => {
                batch.status = status;
                true
            }
            _ => false,
        };

        if let Some(stage) = request.supply_chain_stage {
            if stage < batch.supply_chain_stage {
                return Err(ServiceError::InvalidOperation(format!(
                    "supply chain cannot move back from {} to {}",
                    batch.supply_chain_stage, stage
                )));
            }
            batch.supply_chain_stage = stage;
        }

        if let Some(rate) = request.contamination_rate {
            batch.contamination_rate = Some(rate);
        }
        if let Some(weight) = request.harvested_weight_kg {
            batch.harvested_weight_kg = Some(weight);
        }
        if request.location.is_some() {
            batch.location = request.location;
        }
        if request.notes.is_some() {
            batch.notes = request.notes;
        }

        let changes = GatedChanges {
            status_changed,
            harvested_weight_kg: request.harvested_weight_kg,
            contamination_rate: request.contamination_rate,
        };
        let flagged = approval::apply_gate(&mut batch, actor, &changes);

        let batch = self.save(batch, actor).await?;

        self.event_sender.send_or_log(Event::BatchUpdated(batch.id)).await;
        self.publish_gate(&batch, flagged, actor).await;

        self.view(batch).await
    }

    /// Moves the supply-chain pointer one step forward. A completed chain is
    /// returned unchanged.
    #[instrument(skip(self, actor))]
    pub async fn advance_supply_chain(
        &self,
        id: Uuid,
        expected_version: Option<i32>,
        actor: &Actor,
    ) -> Result<BatchView, ServiceError> {
        let mut batch = self.load(id).await?;
        let Some(next) = batch.supply_chain_stage.next() else {
            return self.view(batch).await;
        };
        check_version(&batch, expected_version)?;

        batch.supply_chain_stage = next;
        let batch = self.save(batch, actor).await?;

        self.event_sender
            .send_or_log(Event::SupplyChainAdvanced {
                batch_id: batch.id,
                stage: next,
            })
            .await;

        self.view(batch).await
    }

    fn ensure_reviewer(actor: &Actor) -> Result<(), ServiceError> {
        if actor.role.can_review() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "only managers can review production batches".into(),
            ))
        }
    }

    #[instrument(skip(self, actor))]
    pub async fn approve(&self, id: Uuid, actor: &Actor) -> Result<BatchView, ServiceError> {
        Self::ensure_reviewer(actor)?;
        let mut batch = self.load(id).await?;
        approval::approve(&mut batch, actor, Utc::now());
        let batch = self.save(batch, actor).await?;

        counter!("farmops_batch_reviews_total", 1, "outcome" => "approved");
        self.event_sender
            .send_or_log(Event::BatchApproved {
                batch_id: batch.id,
                approved_by: actor.display_id(),
            })
            .await;

        self.view(batch).await
    }

    #[instrument(skip(self, request, actor))]
    pub async fn reject(
        &self,
        id: Uuid,
        request: RejectBatchRequest,
        actor: &Actor,
    ) -> Result<BatchView, ServiceError> {
        Self::ensure_reviewer(actor)?;
        request.validate()?;

        let mut batch = self.load(id).await?;
        approval::reject(&mut batch, actor, request.reason.clone(), Utc::now());
        let batch = self.save(batch, actor).await?;

        counter!("farmops_batch_reviews_total", 1, "outcome" => "rejected");
        warn!(batch_id = %batch.id, "batch rejected as contaminated");
        self.event_sender
            .send_or_log(Event::BatchRejected {
                batch_id: batch.id,
                rejected_by: actor.display_id(),
                reason: request.reason,
            })
            .await;

        self.view(batch).await
    }

    /// Batches awaiting review, highest priority first.
    #[instrument(skip(self))]
    pub async fn pending_approval(&self) -> Result<Vec<BatchView>, ServiceError> {
        let filter = BatchFilter {
            requires_approval: Some(true),
            ..Default::default()
        };
        let batches = self.batches.list_all(&filter).await?;
        let mut views = self.views(batches).await?;
        views.sort_by(|a, b| {
            let ka = review_priority(a.contamination_count, a.batch.risk_level, a.batch.updated_at);
            let kb = review_priority(b.contamination_count, b.batch.risk_level, b.batch.updated_at);
            kb.cmp(&ka)
        });
        Ok(views)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        if !self.batches.delete(id).await? {
            return Err(ServiceError::NotFound(format!("Production batch {} not found", id)));
        }
        self.event_sender.send_or_log(Event::BatchDeleted(id)).await;
        Ok(())
    }

    /// Every batch with its contamination count, for aggregate views.
    pub async fn all_views(&self) -> Result<Vec<BatchView>, ServiceError> {
        let batches = self.batches.list_all(&BatchFilter::default()).await?;
        self.views(batches).await
    }
}
