use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::entities::contamination_log::Severity;
use crate::entities::production_batch::RiskLevel;
use crate::entities::user::UserRole;
use crate::workflow::{ProductionStage, SupplyChainStage};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event after the write it describes has committed. A closed
    /// channel is logged rather than failing the request.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!(error = %e, "dropping domain event");
        }
    }
}

/// Domain events emitted after successful writes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    BatchCreated {
        batch_id: Uuid,
        batch_number: String,
    },
    BatchStageAdvanced {
        batch_id: Uuid,
        from: ProductionStage,
        to: ProductionStage,
    },
    BatchUpdated(Uuid),
    BatchFlaggedForReview {
        batch_id: Uuid,
        risk_level: RiskLevel,
        modified_by: String,
    },
    BatchApproved {
        batch_id: Uuid,
        approved_by: String,
    },
    BatchRejected {
        batch_id: Uuid,
        rejected_by: String,
        reason: Option<String>,
    },
    BatchDeleted(Uuid),
    SupplyChainAdvanced {
        batch_id: Uuid,
        stage: SupplyChainStage,
    },

    ContaminationReported {
        log_id: Uuid,
        batch_id: Uuid,
        severity: Severity,
    },
    ContaminationVerified {
        log_id: Uuid,
        verified_by: String,
    },

    OrderCreated {
        order_id: Uuid,
        customer_id: Uuid,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    PayrollPaid(Uuid),
    TransactionRecorded(Uuid),

    UserRegistered(Uuid),
    UserRoleChanged {
        user_id: Uuid,
        role: UserRole,
    },
}

/// Drains the event channel, logging each event. Runs until every sender
/// has been dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::BatchFlaggedForReview {
                batch_id,
                risk_level,
                modified_by,
            } => {
                warn!(%batch_id, %risk_level, %modified_by, "batch awaiting manager review");
            }
            Event::BatchRejected {
                batch_id,
                rejected_by,
                reason,
            } => {
                warn!(%batch_id, %rejected_by, reason = reason.as_deref().unwrap_or(""), "batch rejected");
            }
            Event::ContaminationReported {
                log_id,
                batch_id,
                severity,
            } if *severity >= Severity::High => {
                warn!(%log_id, %batch_id, %severity, "severe contamination reported");
            }
            other => {
                info!(event = ?other, "domain event");
            }
        }
    }

    warn!("Event processing loop has ended");
}
