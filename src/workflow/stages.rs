use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Production workflow stage of a batch, in cultivation order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProductionStage {
    #[sea_orm(string_value = "batch_creation")]
    BatchCreation,
    #[sea_orm(string_value = "inoculation")]
    Inoculation,
    #[sea_orm(string_value = "incubation")]
    Incubation,
    #[sea_orm(string_value = "fruiting")]
    Fruiting,
    #[sea_orm(string_value = "harvesting")]
    Harvesting,
    #[sea_orm(string_value = "post_harvest")]
    PostHarvest,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl ProductionStage {
    pub const ORDER: [ProductionStage; 7] = [
        ProductionStage::BatchCreation,
        ProductionStage::Inoculation,
        ProductionStage::Incubation,
        ProductionStage::Fruiting,
        ProductionStage::Harvesting,
        ProductionStage::PostHarvest,
        ProductionStage::Completed,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Stage the UI offers after this one; `None` once completed.
    pub fn next(self) -> Option<Self> {
        Self::ORDER.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ORDER[i])
    }

    pub fn is_terminal(self) -> bool {
        self == ProductionStage::Completed
    }

    pub fn progress(self) -> f64 {
        position_progress(self.index(), Self::ORDER.len())
    }
}

/// Supply-chain view of a batch. Independent of [`ProductionStage`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SupplyChainStage {
    #[sea_orm(string_value = "farmer_delivery")]
    FarmerDelivery,
    #[sea_orm(string_value = "hub_processing")]
    HubProcessing,
    #[sea_orm(string_value = "harvesting")]
    Harvesting,
    #[sea_orm(string_value = "packaging")]
    Packaging,
    #[sea_orm(string_value = "substrate_collection")]
    SubstrateCollection,
    #[sea_orm(string_value = "mycelium_production")]
    MyceliumProduction,
    #[sea_orm(string_value = "product_manufacturing")]
    ProductManufacturing,
    #[sea_orm(string_value = "sales")]
    Sales,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl SupplyChainStage {
    pub const ORDER: [SupplyChainStage; 9] = [
        SupplyChainStage::FarmerDelivery,
        SupplyChainStage::HubProcessing,
        SupplyChainStage::Harvesting,
        SupplyChainStage::Packaging,
        SupplyChainStage::SubstrateCollection,
        SupplyChainStage::MyceliumProduction,
        SupplyChainStage::ProductManufacturing,
        SupplyChainStage::Sales,
        SupplyChainStage::Completed,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Self> {
        Self::ORDER.get(self.index() + 1).copied()
    }

    pub fn progress(self) -> f64 {
        position_progress(self.index(), Self::ORDER.len())
    }
}

fn position_progress(index: usize, len: usize) -> f64 {
    (index as f64 + 1.0) / len as f64 * 100.0
}

/// Progress percentage for a raw production stage literal. Unknown stages yield 0.
pub fn stage_progress(stage: &str) -> f64 {
    stage
        .parse::<ProductionStage>()
        .map(ProductionStage::progress)
        .unwrap_or(0.0)
}

/// Progress percentage for a raw supply-chain stage literal. Unknown stages yield 0.
pub fn supply_chain_progress(stage: &str) -> f64 {
    stage
        .parse::<SupplyChainStage>()
        .map(SupplyChainStage::progress)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("batch_creation", 1.0 / 7.0 * 100.0)]
    #[case("inoculation", 2.0 / 7.0 * 100.0)]
    #[case("incubation", 3.0 / 7.0 * 100.0)]
    #[case("fruiting", 4.0 / 7.0 * 100.0)]
    #[case("harvesting", 5.0 / 7.0 * 100.0)]
    #[case("post_harvest", 6.0 / 7.0 * 100.0)]
    #[case("completed", 100.0)]
    #[case("mystery", 0.0)]
    #[case("", 0.0)]
    #[case("Fruiting", 0.0)]
    fn progress_follows_position(#[case] stage: &str, #[case] expected: f64) {
        assert!((stage_progress(stage) - expected).abs() < 1e-9);
    }

    #[test]
    fn harvesting_is_about_seventy_one_percent() {
        assert_eq!(format!("{:.1}", stage_progress("harvesting")), "71.4");
    }

    #[test]
    fn next_walks_the_fixed_order() {
        let mut stage = ProductionStage::BatchCreation;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            seen.push(next);
            stage = next;
        }
        assert_eq!(seen, ProductionStage::ORDER.to_vec());
        assert_eq!(ProductionStage::Completed.next(), None);
        assert_eq!(ProductionStage::BatchCreation.previous(), None);
        assert_eq!(
            ProductionStage::PostHarvest.previous(),
            Some(ProductionStage::Harvesting)
        );
    }

    #[test]
    fn supply_chain_is_its_own_sequence() {
        assert_eq!(SupplyChainStage::ORDER.len(), 9);
        assert_eq!(supply_chain_progress("completed"), 100.0);
        assert_eq!(supply_chain_progress("inoculation"), 0.0);
        assert_eq!(
            SupplyChainStage::Packaging.next(),
            Some(SupplyChainStage::SubstrateCollection)
        );
    }

    #[test]
    fn literals_round_trip_through_display() {
        for stage in ProductionStage::ORDER {
            assert_eq!(stage.to_string().parse::<ProductionStage>().unwrap(), stage);
        }
        assert_eq!(ProductionStage::PostHarvest.to_string(), "post_harvest");
    }

    proptest! {
        #[test]
        fn progress_is_bounded_and_monotonic(a in 0usize..7, b in 0usize..7) {
            let (pa, pb) = (ProductionStage::ORDER[a].progress(), ProductionStage::ORDER[b].progress());
            prop_assert!(pa > 0.0 && pa <= 100.0);
            prop_assert_eq!(a < b, pa < pb);
        }

        #[test]
        fn unknown_literals_have_zero_progress(s in "[A-Z0-9 ]{1,12}") {
            prop_assert_eq!(stage_progress(&s), 0.0);
        }
    }
}
