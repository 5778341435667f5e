//! Production batch workflow: the fixed stage order, stage-completion
//! payloads, the transition rules between stages and the approval gate.

pub mod approval;
pub mod payload;
pub mod stages;
pub mod transition;

pub use approval::{risk_level, GatedChanges};
pub use payload::StagePayload;
pub use stages::{stage_progress, supply_chain_progress, ProductionStage, SupplyChainStage};
pub use transition::{apply_stage_payload, plan_transition, TransitionPlan};

use uuid::Uuid;

use crate::entities::user::UserRole;

/// The user on whose behalf a batch edit is made.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub user_id: Uuid,
    pub employee_id: Option<String>,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: Uuid, employee_id: Option<String>, role: UserRole) -> Self {
        Self {
            user_id,
            employee_id,
            role,
        }
    }

    /// Employee id when known, otherwise the account id.
    pub fn display_id(&self) -> String {
        self.employee_id
            .clone()
            .unwrap_or_else(|| self.user_id.to_string())
    }

    #[cfg(test)]
    pub(crate) fn test(role: UserRole) -> Self {
        Self::new(Uuid::new_v4(), Some(format!("EMP-{}", role)), role)
    }
}
