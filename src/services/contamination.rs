use chrono::{NaiveDate, Utc};
use metrics::counter;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::contamination_log::{Model as LogModel, Severity};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::repositories::{ContaminationLogRepository, ProductionBatchRepository};
use crate::workflow::payload::lenient;
use crate::workflow::Actor;

fn default_severity() -> Severity {
    Severity::Medium
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateContaminationLogRequest {
    pub batch_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub contamination_type: String,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub detected_date: Option<NaiveDate>,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    #[validate(range(min = 0))]
    pub affected_units: Option<i32>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 2000))]
    pub action_taken: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 50))]
    pub reported_by: Option<String>,
}

/// Records contamination incidents against batches. Reporting never edits
/// the batch itself; the link is surfaced when batches are read.
#[derive(Clone)]
pub struct ContaminationService {
    logs: Arc<dyn ContaminationLogRepository>,
    batches: Arc<dyn ProductionBatchRepository>,
    event_sender: Arc<EventSender>,
}

impl ContaminationService {
    pub fn new(
        logs: Arc<dyn ContaminationLogRepository>,
        batches: Arc<dyn ProductionBatchRepository>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            logs,
            batches,
            event_sender,
        }
    }

    #[instrument(skip(self, request, actor), fields(batch_id = %request.batch_id))]
    pub async fn report(
        &self,
        request: CreateContaminationLogRequest,
        actor: &Actor,
    ) -> Result<LogModel, ServiceError> {
        request.validate()?;

        if self.batches.find_by_id(request.batch_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!(
                "Production batch {} not found",
                request.batch_id
            )));
        }

        let log = LogModel {
            id: Uuid::new_v4(),
            batch_id: request.batch_id,
            contamination_type: request.contamination_type.trim().to_string(),
            detected_date: request
                .detected_date
                .unwrap_or_else(|| Utc::now().date_naive()),
            severity: request.severity,
            affected_units: request.affected_units,
            description: request.description,
            action_taken: request.action_taken,
            reported_by: request.reported_by.or_else(|| Some(actor.display_id())),
            is_verified: false,
            verified_by: None,
            verified_at: None,
            created_at: Utc::now(),
        };
        let log = self.logs.insert(log).await?;

        counter!("farmops_contamination_reports_total", 1, "severity" => log.severity.to_string());
        self.event_sender
            .send_or_log(Event::ContaminationReported {
                log_id: log.id,
                batch_id: log.batch_id,
                severity: log.severity,
            })
            .await;
        info!(log_id = %log.id, "contamination reported");

        Ok(log)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<LogModel, ServiceError> {
        self.logs
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Contamination log {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        batch_id: Option<Uuid>,
        verified: Option<bool>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<LogModel>, u64), ServiceError> {
        self.logs.list(batch_id, verified, page, limit).await
    }

    /// Marks a log as checked by a manager. Verifying twice keeps the first
    /// verifier.
    #[instrument(skip(self, actor))]
    pub async fn verify(&self, id: Uuid, actor: &Actor) -> Result<LogModel, ServiceError> {
        if !actor.role.can_review() {
            return Err(ServiceError::Forbidden(
                "only managers can verify contamination logs".into(),
            ));
        }

        let mut log = self.get(id).await?;
        if log.is_verified {
            return Ok(log);
        }

        log.is_verified = true;
        log.verified_by = Some(actor.display_id());
        log.verified_at = Some(Utc::now());
        let log = self.logs.update(log).await?;

        self.event_sender
            .send_or_log(Event::ContaminationVerified {
                log_id: log.id,
                verified_by: actor.display_id(),
            })
            .await;

        Ok(log)
    }

    pub async fn count_unverified(&self) -> Result<u64, ServiceError> {
        self.logs.count_unverified().await
    }
}
