use chrono::NaiveDate;

use crate::entities::production_batch::{self, BatchStatus};
use crate::errors::ServiceError;
use crate::workflow::approval::GatedChanges;
use crate::workflow::payload::{BlankFields, StagePayload};
use crate::workflow::stages::ProductionStage;
use crate::workflow::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    /// Merge the payload of `completed` and move the pointer to `target`.
    Advance {
        completed: ProductionStage,
        target: ProductionStage,
    },
    /// The batch is already completed; nothing changes.
    Unchanged,
}

/// Decides what a submission targeting `target` does to a batch at `current`.
///
/// The submitted payload always belongs to the stage just before `target`.
/// That stage must be the batch's current stage or the one after it, so the
/// pointer only moves forward and never past a stage the UI would not offer.
pub fn plan_transition(
    current: ProductionStage,
    target: ProductionStage,
    declared: Option<ProductionStage>,
) -> Result<TransitionPlan, ServiceError> {
    if current.is_terminal() {
        return Ok(TransitionPlan::Unchanged);
    }

    let completed = target.previous().ok_or_else(|| {
        ServiceError::InvalidInput(format!("cannot transition a batch to {}", target))
    })?;

    if let Some(declared) = declared {
        if declared != completed {
            return Err(ServiceError::InvalidInput(format!(
                "a {} payload cannot move a batch to {}",
                declared, target
            )));
        }
    }

    if completed < current {
        return Err(ServiceError::Conflict(format!(
            "stage {} is already complete; batch is at {}",
            completed, current
        )));
    }

    if completed.index() > current.index() + 1 {
        return Err(ServiceError::InvalidOperation(format!(
            "batch at {} cannot skip to {}",
            current, target
        )));
    }

    Ok(TransitionPlan::Advance { completed, target })
}

fn fill<T>(slot: &mut Option<T>, submitted: Option<T>, blank: bool) {
    if submitted.is_some() || blank {
        *slot = submitted;
    }
}

fn fill_or_default<T>(slot: &mut Option<T>, submitted: Option<T>, default: T) {
    match submitted {
        Some(v) => *slot = Some(v),
        None if slot.is_none() => *slot = Some(default),
        None => {}
    }
}

/// Merges a stage payload into `batch`, applies defaults and advances
/// `current_stage` to `target`. Returns what the approval gate needs to see.
pub fn apply_stage_payload(
    batch: &mut production_batch::Model,
    payload: StagePayload,
    blanks: &BlankFields,
    target: ProductionStage,
    actor: &Actor,
    today: NaiveDate,
) -> GatedChanges {
    let mut changes = GatedChanges {
        status_changed: false,
        harvested_weight_kg: payload.harvested_weight_kg(),
        contamination_rate: payload.contamination_rate(),
    };
    let actor_id = actor.display_id();
    let blank = |key: &str| blanks.contains(key);

    match payload {
        StagePayload::BatchCreation(p) => {
            if let Some(product_type) = p.product_type {
                batch.product_type = product_type;
            }
            fill(&mut batch.substrate_type, p.substrate_type, blank("substrateType"));
            fill(&mut batch.substrate_weight_kg, p.substrate_weight_kg, blank("substrateWeightKg"));
            fill(&mut batch.location, p.location, blank("location"));
            fill(&mut batch.notes, p.notes, blank("notes"));
            if batch.created_by.is_none() {
                batch.created_by = Some(actor_id.clone());
            }
        }
        StagePayload::Inoculation(p) => {
            fill_or_default(&mut batch.inoculation_date, p.inoculation_date, today);
            fill(&mut batch.spawn_type, p.spawn_type, blank("spawnType"));
            fill(&mut batch.spawn_quantity_kg, p.spawn_quantity_kg, blank("spawnQuantityKg"));
            fill_or_default(&mut batch.inoculated_by, p.inoculated_by, actor_id.clone());
            fill(&mut batch.inoculation_notes, p.inoculation_notes, blank("inoculationNotes"));
        }
        StagePayload::Incubation(p) => {
            fill_or_default(&mut batch.incubation_start_date, p.incubation_start_date, today);
            fill(&mut batch.incubation_end_date, p.incubation_end_date, blank("incubationEndDate"));
            fill(
                &mut batch.incubation_temperature_c,
                p.incubation_temperature_c,
                blank("incubationTemperatureC"),
            );
            fill(
                &mut batch.incubation_humidity,
                p.incubation_humidity,
                blank("incubationHumidity"),
            );
            fill(&mut batch.contamination_rate, p.contamination_rate, blank("contaminationRate"));
            fill(&mut batch.incubation_notes, p.incubation_notes, blank("incubationNotes"));
        }
        StagePayload::Fruiting(p) => {
            fill_or_default(&mut batch.fruiting_start_date, p.fruiting_start_date, today);
            fill(
                &mut batch.fruiting_temperature_c,
                p.fruiting_temperature_c,
                blank("fruitingTemperatureC"),
            );
            fill(&mut batch.fruiting_humidity, p.fruiting_humidity, blank("fruitingHumidity"));
            fill(&mut batch.contamination_rate, p.contamination_rate, blank("contaminationRate"));
            fill(&mut batch.fruiting_notes, p.fruiting_notes, blank("fruitingNotes"));
        }
        StagePayload::Harvesting(p) => {
            fill_or_default(&mut batch.harvest_date, p.harvest_date, today);
            fill(&mut batch.harvested_weight_kg, p.harvested_weight_kg, blank("harvestedWeightKg"));
            fill_or_default(&mut batch.harvested_by, p.harvested_by, actor_id.clone());
            fill(&mut batch.harvest_notes, p.harvest_notes, blank("harvestNotes"));
        }
        StagePayload::PostHarvest(p) => {
            fill_or_default(&mut batch.processing_date, p.processing_date, today);
            fill(&mut batch.packaged_weight_kg, p.packaged_weight_kg, blank("packagedWeightKg"));
            fill(&mut batch.storage_location, p.storage_location, blank("storageLocation"));
            fill(&mut batch.quality_grade, p.quality_grade, blank("qualityGrade"));
            fill(&mut batch.post_harvest_notes, p.post_harvest_notes, blank("postHarvestNotes"));
        }
    }

    batch.current_stage = target;

    if target.is_terminal() {
        fill_or_default(&mut batch.completion_date, None, today);
        // contaminated batches keep their status
        if matches!(batch.status, BatchStatus::Active | BatchStatus::OnHold) {
            batch.status = BatchStatus::Completed;
            changes.status_changed = true;
        }
    }

    batch.last_modified_by = Some(actor_id);
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::user::UserRole;
    use crate::workflow::payload::{BlankFields, HarvestingStage, PostHarvestStage};
    use crate::workflow::stage_progress;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn batch_at(stage: ProductionStage) -> production_batch::Model {
        let mut b = production_batch::Model::new(
            "B-100".into(),
            "oyster".into(),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        );
        b.current_stage = stage;
        b
    }

    #[rstest]
    #[case(ProductionStage::Fruiting, ProductionStage::Harvesting, ProductionStage::Fruiting)]
    #[case(ProductionStage::Fruiting, ProductionStage::PostHarvest, ProductionStage::Harvesting)]
    #[case(ProductionStage::BatchCreation, ProductionStage::Inoculation, ProductionStage::BatchCreation)]
    #[case(ProductionStage::PostHarvest, ProductionStage::Completed, ProductionStage::PostHarvest)]
    fn forward_targets_are_planned(
        #[case] current: ProductionStage,
        #[case] target: ProductionStage,
        #[case] completed: ProductionStage,
    ) {
        assert_eq!(
            plan_transition(current, target, None).unwrap(),
            TransitionPlan::Advance { completed, target }
        );
    }

    #[test]
    fn stale_payloads_conflict() {
        assert_matches!(
            plan_transition(ProductionStage::Harvesting, ProductionStage::Fruiting, None),
            Err(ServiceError::Conflict(_))
        );
    }

    #[test]
    fn skipping_ahead_is_rejected() {
        assert_matches!(
            plan_transition(ProductionStage::Inoculation, ProductionStage::Harvesting, None),
            Err(ServiceError::InvalidOperation(_))
        );
    }

    #[test]
    fn batch_creation_is_never_a_target() {
        assert_matches!(
            plan_transition(ProductionStage::BatchCreation, ProductionStage::BatchCreation, None),
            Err(ServiceError::InvalidInput(_))
        );
    }

    #[test]
    fn declared_stage_must_match_target() {
        assert_matches!(
            plan_transition(
                ProductionStage::Fruiting,
                ProductionStage::PostHarvest,
                Some(ProductionStage::Fruiting)
            ),
            Err(ServiceError::InvalidInput(_))
        );
    }

    #[rstest]
    #[case(ProductionStage::Inoculation)]
    #[case(ProductionStage::PostHarvest)]
    #[case(ProductionStage::Completed)]
    fn completed_batches_are_unchanged(#[case] target: ProductionStage) {
        assert_eq!(
            plan_transition(ProductionStage::Completed, target, None).unwrap(),
            TransitionPlan::Unchanged
        );
    }

    #[test]
    fn harvesting_payload_from_fruiting_lands_on_post_harvest() {
        let mut b = batch_at(ProductionStage::Fruiting);
        let payload = StagePayload::parse(
            ProductionStage::Harvesting,
            json!({
                "harvestDate": "2024-06-01",
                "harvestedWeightKg": 2.5,
                "harvestedBy": "EMP1",
                "currentStage": "post_harvest",
            }),
        )
        .unwrap();

        let actor = Actor::test(UserRole::Worker);
        let changes = apply_stage_payload(
            &mut b,
            payload,
            &BlankFields::default(),
            ProductionStage::PostHarvest,
            &actor,
            today(),
        );

        assert_eq!(b.current_stage, ProductionStage::PostHarvest);
        assert_eq!(b.harvest_date, Some(today()));
        assert_eq!(b.harvested_weight_kg, Some(2.5));
        assert_eq!(b.harvested_by.as_deref(), Some("EMP1"));
        assert_eq!(changes.harvested_weight_kg, Some(2.5));
        assert!(!changes.status_changed);
        assert!((stage_progress(&b.current_stage.to_string()) - 600.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn missing_dates_and_actors_are_defaulted() {
        let mut b = batch_at(ProductionStage::Harvesting);
        let actor = Actor::test(UserRole::Worker);
        let payload = StagePayload::Harvesting(HarvestingStage {
            harvested_weight_kg: Some(1.0),
            ..Default::default()
        });

        apply_stage_payload(
            &mut b,
            payload,
            &BlankFields::default(),
            ProductionStage::PostHarvest,
            &actor,
            today(),
        );

        assert_eq!(b.harvest_date, Some(today()));
        assert_eq!(b.harvested_by, actor.employee_id);
        assert_eq!(b.last_modified_by, actor.employee_id);
    }

    #[test]
    fn finishing_post_harvest_completes_the_batch() {
        let mut b = batch_at(ProductionStage::PostHarvest);
        let payload = StagePayload::PostHarvest(PostHarvestStage {
            packaged_weight_kg: Some(2.1),
            ..Default::default()
        });

        let changes = apply_stage_payload(
            &mut b,
            payload,
            &BlankFields::default(),
            ProductionStage::Completed,
            &Actor::test(UserRole::Manager),
            today(),
        );

        assert_eq!(b.current_stage, ProductionStage::Completed);
        assert_eq!(b.status, BatchStatus::Completed);
        assert_eq!(b.completion_date, Some(today()));
        assert_eq!(b.processing_date, Some(today()));
        assert!(changes.status_changed);
    }

    #[test]
    fn contaminated_batches_keep_their_status_on_completion() {
        let mut b = batch_at(ProductionStage::PostHarvest);
        b.status = BatchStatus::Contaminated;
        let changes = apply_stage_payload(
            &mut b,
            StagePayload::PostHarvest(PostHarvestStage::default()),
            &BlankFields::default(),
            ProductionStage::Completed,
            &Actor::test(UserRole::Worker),
            today(),
        );
        assert_eq!(b.status, BatchStatus::Contaminated);
        assert!(!changes.status_changed);
    }

    #[test]
    fn merge_keeps_existing_values_when_field_is_omitted() {
        let mut b = batch_at(ProductionStage::Fruiting);
        b.fruiting_humidity = Some(88.0);
        let payload =
            StagePayload::parse(ProductionStage::Fruiting, json!({ "fruitingTemperatureC": "18" }))
                .unwrap();
        apply_stage_payload(
            &mut b,
            payload,
            &BlankFields::default(),
            ProductionStage::Harvesting,
            &Actor::test(UserRole::Manager),
            today(),
        );
        assert_eq!(b.fruiting_humidity, Some(88.0));
        assert_eq!(b.fruiting_temperature_c, Some(18.0));
    }

    #[test]
    fn blank_fields_clear_stored_values_on_resubmission() {
        let mut b = batch_at(ProductionStage::BatchCreation);
        b.location = Some("Room 3".into());
        b.notes = Some("bagged".into());
        b.substrate_type = Some("straw".into());
        let body = json!({ "location": "", "notes": null, "currentStage": "inoculation" });
        let blanks = BlankFields::from_body(&body);
        let payload = StagePayload::parse(ProductionStage::BatchCreation, body).unwrap();

        apply_stage_payload(
            &mut b,
            payload,
            &blanks,
            ProductionStage::Inoculation,
            &Actor::test(UserRole::Manager),
            today(),
        );

        assert_eq!(b.location, None);
        assert_eq!(b.notes, None);
        assert_eq!(b.substrate_type.as_deref(), Some("straw"));
    }
}
