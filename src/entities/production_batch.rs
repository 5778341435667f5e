use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

pub use crate::workflow::stages::{ProductionStage, SupplyChainStage};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BatchStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "on_hold")]
    OnHold,
    #[sea_orm(string_value = "contaminated")]
    Contaminated,
    #[sea_orm(string_value = "completed")]
    Completed,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskLevel {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum QualityCheckStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "passed")]
    Passed,
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// One physical cultivation batch and everything recorded about it per stage.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "production_batches")]
#[serde(rename_all = "camelCase")]
#[schema(as = ProductionBatch)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub batch_number: String,

    // batch_creation
    pub product_type: String,
    pub substrate_type: Option<String>,
    pub substrate_weight_kg: Option<f64>,
    pub location: Option<String>,
    pub creation_date: NaiveDate,
    pub created_by: Option<String>,
    pub notes: Option<String>,

    pub current_stage: ProductionStage,
    pub supply_chain_stage: SupplyChainStage,
    pub status: BatchStatus,

    // inoculation
    pub inoculation_date: Option<NaiveDate>,
    pub spawn_type: Option<String>,
    pub spawn_quantity_kg: Option<f64>,
    pub inoculated_by: Option<String>,
    pub inoculation_notes: Option<String>,

    // incubation
    pub incubation_start_date: Option<NaiveDate>,
    pub incubation_end_date: Option<NaiveDate>,
    pub incubation_temperature_c: Option<f64>,
    pub incubation_humidity: Option<f64>,
    pub incubation_notes: Option<String>,

    // fruiting
    pub fruiting_start_date: Option<NaiveDate>,
    pub fruiting_temperature_c: Option<f64>,
    pub fruiting_humidity: Option<f64>,
    pub fruiting_notes: Option<String>,

    // harvesting
    pub harvest_date: Option<NaiveDate>,
    pub harvested_weight_kg: Option<f64>,
    pub harvested_by: Option<String>,
    pub harvest_notes: Option<String>,

    // post_harvest
    pub processing_date: Option<NaiveDate>,
    pub packaged_weight_kg: Option<f64>,
    pub storage_location: Option<String>,
    pub quality_grade: Option<String>,
    pub post_harvest_notes: Option<String>,

    pub completion_date: Option<NaiveDate>,

    // approval gate
    pub contamination_rate: Option<f64>,
    pub risk_level: RiskLevel,
    pub requires_approval: bool,
    pub is_approved: bool,
    pub quality_check_status: QualityCheckStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub last_modified_by: Option<String>,

    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::contamination_log::Entity")]
    ContaminationLogs,
}

impl Related<super::contamination_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ContaminationLogs.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = self.id {
                self.id = ActiveValue::Set(Uuid::new_v4());
            }
            if let ActiveValue::NotSet = self.created_at {
                self.created_at = ActiveValue::Set(now);
            }
            if let ActiveValue::NotSet = self.version {
                self.version = ActiveValue::Set(1);
            }
        }

        self.updated_at = ActiveValue::Set(now);

        Ok(self)
    }
}

impl Model {
    /// A fresh batch at `batch_creation` with every later-stage field empty.
    pub fn new(batch_number: String, product_type: String, creation_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            batch_number,
            product_type,
            substrate_type: None,
            substrate_weight_kg: None,
            location: None,
            creation_date,
            created_by: None,
            notes: None,
            current_stage: ProductionStage::BatchCreation,
            supply_chain_stage: SupplyChainStage::FarmerDelivery,
            status: BatchStatus::Active,
            inoculation_date: None,
            spawn_type: None,
            spawn_quantity_kg: None,
            inoculated_by: None,
            inoculation_notes: None,
            incubation_start_date: None,
            incubation_end_date: None,
            incubation_temperature_c: None,
            incubation_humidity: None,
            incubation_notes: None,
            fruiting_start_date: None,
            fruiting_temperature_c: None,
            fruiting_humidity: None,
            fruiting_notes: None,
            harvest_date: None,
            harvested_weight_kg: None,
            harvested_by: None,
            harvest_notes: None,
            processing_date: None,
            packaged_weight_kg: None,
            storage_location: None,
            quality_grade: None,
            post_harvest_notes: None,
            completion_date: None,
            contamination_rate: None,
            risk_level: RiskLevel::Low,
            requires_approval: false,
            is_approved: false,
            quality_check_status: QualityCheckStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            last_modified_by: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}
