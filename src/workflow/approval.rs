use chrono::{DateTime, Utc};

use crate::entities::production_batch::{self, BatchStatus, QualityCheckStatus, RiskLevel};
use crate::entities::user::UserRole;
use crate::workflow::Actor;

/// Contamination rate (percent) above which a batch is high risk.
pub const HIGH_RISK_THRESHOLD: f64 = 10.0;
/// Contamination rate (percent) above which a batch is medium risk.
pub const MEDIUM_RISK_THRESHOLD: f64 = 5.0;

/// Classifies a contamination rate. Missing rates are low risk.
pub fn risk_level(contamination_rate: Option<f64>) -> RiskLevel {
    match contamination_rate {
        Some(rate) if rate > HIGH_RISK_THRESHOLD => RiskLevel::High,
        Some(rate) if rate > MEDIUM_RISK_THRESHOLD => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

/// What a single edit touched, as far as the gate cares.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GatedChanges {
    pub status_changed: bool,
    pub harvested_weight_kg: Option<f64>,
    pub contamination_rate: Option<f64>,
}

impl GatedChanges {
    fn is_sensitive(&self) -> bool {
        let nonzero = |v: Option<f64>| v.map_or(false, |x| x != 0.0);
        self.status_changed || nonzero(self.harvested_weight_kg) || nonzero(self.contamination_rate)
    }
}

/// Whether an edit by `role` must wait for manager review.
pub fn requires_review(role: UserRole, changes: &GatedChanges) -> bool {
    role == UserRole::Worker && changes.is_sensitive()
}

/// Applies the gate to a batch after an edit has been merged into it.
/// Returns true when the batch was flagged.
pub fn apply_gate(batch: &mut production_batch::Model, actor: &Actor, changes: &GatedChanges) -> bool {
    if changes.contamination_rate.is_some() {
        batch.risk_level = risk_level(batch.contamination_rate);
    }

    if requires_review(actor.role, changes) {
        batch.requires_approval = true;
        batch.is_approved = false;
        batch.quality_check_status = QualityCheckStatus::Pending;
        true
    } else {
        false
    }
}

pub fn approve(batch: &mut production_batch::Model, approver: &Actor, at: DateTime<Utc>) {
    batch.is_approved = true;
    batch.requires_approval = false;
    batch.quality_check_status = QualityCheckStatus::Passed;
    batch.approved_by = Some(approver.display_id());
    batch.approved_at = Some(at);
    batch.rejection_reason = None;
}

pub fn reject(
    batch: &mut production_batch::Model,
    approver: &Actor,
    reason: Option<String>,
    at: DateTime<Utc>,
) {
    batch.status = BatchStatus::Contaminated;
    batch.is_approved = false;
    batch.requires_approval = false;
    batch.quality_check_status = QualityCheckStatus::Failed;
    batch.approved_by = Some(approver.display_id());
    batch.approved_at = Some(at);
    batch.rejection_reason = reason;
}

/// Sort key for the review queue: batches with contamination reports first,
/// then higher risk, then older edits.
pub fn review_priority(
    contamination_count: u64,
    risk: RiskLevel,
    updated_at: DateTime<Utc>,
) -> (bool, RiskLevel, std::cmp::Reverse<DateTime<Utc>>) {
    (contamination_count > 0, risk, std::cmp::Reverse(updated_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rstest::rstest;

    fn batch() -> production_batch::Model {
        production_batch::Model::new(
            "B-001".into(),
            "oyster".into(),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        )
    }

    #[rstest]
    #[case(Some(11.0), RiskLevel::High)]
    #[case(Some(10.0), RiskLevel::Medium)]
    #[case(Some(6.0), RiskLevel::Medium)]
    #[case(Some(5.0), RiskLevel::Low)]
    #[case(Some(3.0), RiskLevel::Low)]
    #[case(Some(0.0), RiskLevel::Low)]
    #[case(None, RiskLevel::Low)]
    fn risk_thresholds(#[case] rate: Option<f64>, #[case] expected: RiskLevel) {
        assert_eq!(risk_level(rate), expected);
    }

    #[rstest]
    #[case(UserRole::Worker, true)]
    #[case(UserRole::Manager, false)]
    #[case(UserRole::Admin, false)]
    fn status_change_is_gated_for_workers_only(#[case] role: UserRole, #[case] flagged: bool) {
        let changes = GatedChanges {
            status_changed: true,
            ..Default::default()
        };
        let mut b = batch();
        assert_eq!(apply_gate(&mut b, &Actor::test(role), &changes), flagged);
        assert_eq!(b.requires_approval, flagged);
    }

    #[test]
    fn zero_values_do_not_trigger_review() {
        let changes = GatedChanges {
            status_changed: false,
            harvested_weight_kg: Some(0.0),
            contamination_rate: Some(0.0),
        };
        assert!(!requires_review(UserRole::Worker, &changes));
        assert!(!requires_review(UserRole::Worker, &GatedChanges::default()));
    }

    #[test]
    fn worker_harvest_weight_flags_and_clears_approval() {
        let mut b = batch();
        b.is_approved = true;
        let changes = GatedChanges {
            harvested_weight_kg: Some(2.5),
            ..Default::default()
        };
        assert!(apply_gate(&mut b, &Actor::test(UserRole::Worker), &changes));
        assert!(b.requires_approval);
        assert!(!b.is_approved);
    }

    #[test]
    fn contamination_rate_recomputes_risk_even_for_managers() {
        let mut b = batch();
        b.contamination_rate = Some(12.0);
        let changes = GatedChanges {
            contamination_rate: Some(12.0),
            ..Default::default()
        };
        assert!(!apply_gate(&mut b, &Actor::test(UserRole::Manager), &changes));
        assert_eq!(b.risk_level, RiskLevel::High);
    }

    #[test]
    fn approve_and_reject_set_terminal_review_state() {
        let manager = Actor::test(UserRole::Manager);
        let now = Utc::now();

        let mut approved = batch();
        approved.requires_approval = true;
        approve(&mut approved, &manager, now);
        assert!(approved.is_approved && !approved.requires_approval);
        assert_eq!(approved.quality_check_status, QualityCheckStatus::Passed);
        assert_eq!(approved.approved_at, Some(now));

        let mut rejected = batch();
        rejected.requires_approval = true;
        reject(&mut rejected, &manager, Some("mold".into()), now);
        assert_eq!(rejected.status, BatchStatus::Contaminated);
        assert!(!rejected.is_approved && !rejected.requires_approval);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("mold"));
    }

    #[test]
    fn review_priority_puts_contaminated_batches_first() {
        let now = Utc::now();
        let earlier = now - chrono::Duration::hours(1);
        let mut keys = vec![
            ("clean-high", review_priority(0, RiskLevel::High, now)),
            ("logged-low", review_priority(2, RiskLevel::Low, now)),
            ("clean-low-old", review_priority(0, RiskLevel::Low, earlier)),
            ("clean-low-new", review_priority(0, RiskLevel::Low, now)),
        ];
        keys.sort_by(|a, b| b.1.cmp(&a.1));
        let order: Vec<_> = keys.into_iter().map(|(name, _)| name).collect();
        assert_eq!(order, ["logged-low", "clean-high", "clean-low-old", "clean-low-new"]);
    }

    proptest! {
        #[test]
        fn risk_is_monotonic_in_rate(a in 0.0f64..100.0, b in 0.0f64..100.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(risk_level(Some(lo)) <= risk_level(Some(hi)));
        }

        #[test]
        fn managers_are_never_gated(status in any::<bool>(), w in 0.0f64..50.0, r in 0.0f64..50.0) {
            let changes = GatedChanges {
                status_changed: status,
                harvested_weight_kg: Some(w),
                contamination_rate: Some(r),
            };
            prop_assert!(!requires_review(UserRole::Manager, &changes));
            prop_assert!(!requires_review(UserRole::Admin, &changes));
        }
    }
}
