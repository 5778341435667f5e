use serde::Serialize;
use std::collections::BTreeMap;
use tracing::instrument;
use utoipa::ToSchema;

use crate::entities::production_batch::{BatchStatus, ProductionStage, RiskLevel};
use crate::errors::ServiceError;
use crate::services::contamination::ContaminationService;
use crate::services::production_batches::{BatchView, ProductionBatchService};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_batches: u64,
    pub active_batches: u64,
    pub completed_batches: u64,
    pub contaminated_batches: u64,
    pub pending_approvals: u64,
    pub high_risk_batches: u64,
    /// Every production stage, including those with no batches.
    pub batches_by_stage: BTreeMap<String, u64>,
    /// Mean over batches that have a recorded rate.
    pub average_contamination_rate: f64,
    pub total_harvested_kg: f64,
    pub unverified_contamination_logs: u64,
}

pub fn compute_stats(views: &[BatchView], unverified_logs: u64) -> DashboardStats {
    let mut batches_by_stage: BTreeMap<String, u64> = ProductionStage::ORDER
        .iter()
        .map(|s| (s.to_string(), 0))
        .collect();
    let mut stats = DashboardStats {
        total_batches: views.len() as u64,
        active_batches: 0,
        completed_batches: 0,
        contaminated_batches: 0,
        pending_approvals: 0,
        high_risk_batches: 0,
        batches_by_stage: BTreeMap::new(),
        average_contamination_rate: 0.0,
        total_harvested_kg: 0.0,
        unverified_contamination_logs: unverified_logs,
    };

    let mut rate_sum = 0.0;
    let mut rate_count = 0u32;
    for view in views {
        let batch = &view.batch;
        *batches_by_stage
            .entry(batch.current_stage.to_string())
            .or_insert(0) += 1;

        if view.display_status == BatchStatus::Contaminated.to_string() {
            stats.contaminated_batches += 1;
        } else {
            match batch.status {
                BatchStatus::Active => stats.active_batches += 1,
                BatchStatus::Completed => stats.completed_batches += 1,
                _ => {}
            }
        }
        if batch.requires_approval {
            stats.pending_approvals += 1;
        }
        if batch.risk_level == RiskLevel::High {
            stats.high_risk_batches += 1;
        }
        if let Some(rate) = batch.contamination_rate {
            rate_sum += rate;
            rate_count += 1;
        }
        stats.total_harvested_kg += batch.harvested_weight_kg.unwrap_or(0.0);
    }

    if rate_count > 0 {
        stats.average_contamination_rate = (rate_sum / f64::from(rate_count) * 100.0).round() / 100.0;
    }
    stats.total_harvested_kg = (stats.total_harvested_kg * 100.0).round() / 100.0;
    stats.batches_by_stage = batches_by_stage;
    stats
}

#[derive(Clone)]
pub struct DashboardService {
    batches: ProductionBatchService,
    contamination: ContaminationService,
}

impl DashboardService {
    pub fn new(batches: ProductionBatchService, contamination: ContaminationService) -> Self {
        Self {
            batches,
            contamination,
        }
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<DashboardStats, ServiceError> {
        let views = self.batches.all_views().await?;
        let unverified = self.contamination.count_unverified().await?;
        Ok(compute_stats(&views, unverified))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::production_batch::Model as BatchModel;
    use chrono::NaiveDate;

    fn batch(number: &str) -> BatchModel {
        BatchModel::new(
            number.into(),
            "oyster".into(),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        )
    }

    #[test]
    fn stats_fold_batches_and_logs() {
        let mut fruiting = batch("B-1");
        fruiting.current_stage = ProductionStage::Fruiting;
        fruiting.contamination_rate = Some(12.0);
        fruiting.risk_level = RiskLevel::High;
        fruiting.requires_approval = true;

        let mut done = batch("B-2");
        done.current_stage = ProductionStage::Completed;
        done.status = BatchStatus::Completed;
        done.harvested_weight_kg = Some(2.5);
        done.contamination_rate = Some(4.0);

        let fresh = batch("B-3");

        let views = vec![
            BatchView::new(fruiting, 1),
            BatchView::new(done, 0),
            BatchView::new(fresh, 0),
        ];
        let stats = compute_stats(&views, 2);

        assert_eq!(stats.total_batches, 3);
        assert_eq!(stats.contaminated_batches, 1);
        assert_eq!(stats.active_batches, 1);
        assert_eq!(stats.completed_batches, 1);
        assert_eq!(stats.pending_approvals, 1);
        assert_eq!(stats.high_risk_batches, 1);
        assert_eq!(stats.average_contamination_rate, 8.0);
        assert_eq!(stats.total_harvested_kg, 2.5);
        assert_eq!(stats.unverified_contamination_logs, 2);
        assert_eq!(stats.batches_by_stage.get("fruiting"), Some(&1));
        assert_eq!(stats.batches_by_stage.get("incubation"), Some(&0));
        assert_eq!(stats.batches_by_stage.len(), 7);
    }

    #[test]
    fn empty_farm_has_zeroed_stats() {
        let stats = compute_stats(&[], 0);
        assert_eq!(stats.total_batches, 0);
        assert_eq!(stats.average_contamination_rate, 0.0);
    }
}
