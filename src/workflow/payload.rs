//! Stage-completion payloads as submitted by the batch forms.
//!
//! Form fields arrive loosely typed: numbers may be sent as strings and
//! untouched inputs as `""`. The [`lenient`] helpers normalise both before
//! `validator` sees the values.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeSet;
use serde_json::Value;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::errors::ServiceError;
use crate::workflow::stages::ProductionStage;

pub mod lenient {
    use chrono::{DateTime, NaiveDate, NaiveTime};
    use serde::{de::Error, Deserialize, Deserializer};
    use serde_json::Value;

    /// Number, numeric string, `""` or null.
    pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| D::Error::custom("number out of range")),
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("'{}' is not a number", trimmed)))
            }
            Some(other) => Err(D::Error::custom(format!("expected a number, got {}", other))),
        }
    }

    /// Integer, integer string, `""` or null.
    pub fn opt_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match opt_f64(deserializer)? {
            None => Ok(None),
            Some(v) if v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64 => {
                Ok(Some(v as i32))
            }
            Some(v) => Err(D::Error::custom(format!("{} is not a whole number", v))),
        }
    }

    /// Trims text and maps blank input to `None`.
    pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }

    /// `YYYY-MM-DD` or an RFC 3339 timestamp (date part kept); blank is `None`.
    pub fn opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = opt_string(deserializer)? else {
            return Ok(None);
        };
        if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            return Ok(Some(date));
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.date_naive()))
            .map_err(|_| D::Error::custom(format!("'{}' is not a valid date", raw)))
    }

    /// `HH:MM` or `HH:MM:SS`; blank is `None`.
    pub fn opt_time<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = opt_string(deserializer)? else {
            return Ok(None);
        };
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map(Some)
            .map_err(|_| D::Error::custom(format!("'{}' is not a valid time", raw)))
    }
}

pub(crate) fn validate_rate(rate: f64) -> Result<(), ValidationError> {
    if (0.0..=100.0).contains(&rate) {
        Ok(())
    } else {
        Err(ValidationError::new("contamination_rate_out_of_range"))
    }
}

fn validate_temperature(celsius: f64) -> Result<(), ValidationError> {
    if (-10.0..=60.0).contains(&celsius) {
        Ok(())
    } else {
        Err(ValidationError::new("temperature_out_of_range"))
    }
}

/// Fields recorded when the batch is set up.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreationStage {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 100))]
    pub product_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 100))]
    pub substrate_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    #[validate(range(min = 0.0))]
    pub substrate_weight_kg: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InoculationStage {
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub inoculation_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 100))]
    pub spawn_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    #[validate(range(min = 0.0))]
    pub spawn_quantity_kg: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 50))]
    pub inoculated_by: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 2000))]
    pub inoculation_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_incubation_window"))]
pub struct IncubationStage {
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub incubation_start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub incubation_end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    #[validate(custom = "validate_temperature")]
    pub incubation_temperature_c: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub incubation_humidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    #[validate(custom = "validate_rate")]
    pub contamination_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 2000))]
    pub incubation_notes: Option<String>,
}

fn validate_incubation_window(stage: &IncubationStage) -> Result<(), ValidationError> {
    match (stage.incubation_start_date, stage.incubation_end_date) {
        (Some(start), Some(end)) if end < start => {
            Err(ValidationError::new("incubation_end_before_start"))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FruitingStage {
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub fruiting_start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    #[validate(custom = "validate_temperature")]
    pub fruiting_temperature_c: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub fruiting_humidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    #[validate(custom = "validate_rate")]
    pub contamination_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 2000))]
    pub fruiting_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HarvestingStage {
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub harvest_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    #[validate(required, range(min = 0.0))]
    pub harvested_weight_kg: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 50))]
    pub harvested_by: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 2000))]
    pub harvest_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostHarvestStage {
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub processing_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    #[validate(range(min = 0.0))]
    pub packaged_weight_kg: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 200))]
    pub storage_location: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 20))]
    pub quality_grade: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 2000))]
    pub post_harvest_notes: Option<String>,
}

/// Keys a submission sent as null or as a blank string. Those clear the
/// stored value on merge instead of leaving it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlankFields(BTreeSet<String>);

impl BlankFields {
    pub fn from_body(body: &Value) -> Self {
        let keys = body
            .as_object()
            .map(|fields| {
                fields
                    .iter()
                    .filter(|(_, value)| match value {
                        Value::Null => true,
                        Value::String(s) => s.trim().is_empty(),
                        _ => false,
                    })
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default();
        Self(keys)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }
}

/// Payload for completing one production stage, keyed by that stage.
#[derive(Debug, Clone)]
pub enum StagePayload {
    BatchCreation(BatchCreationStage),
    Inoculation(InoculationStage),
    Incubation(IncubationStage),
    Fruiting(FruitingStage),
    Harvesting(HarvestingStage),
    PostHarvest(PostHarvestStage),
}

fn parse_validated<T>(body: Value) -> Result<T, ServiceError>
where
    T: for<'de> Deserialize<'de> + Validate,
{
    let payload: T = serde_json::from_value(body)?;
    payload.validate()?;
    Ok(payload)
}

impl StagePayload {
    /// Parses and validates `body` against the schema of `completed`.
    pub fn parse(completed: ProductionStage, body: Value) -> Result<Self, ServiceError> {
        Ok(match completed {
            ProductionStage::BatchCreation => StagePayload::BatchCreation(parse_validated(body)?),
            ProductionStage::Inoculation => StagePayload::Inoculation(parse_validated(body)?),
            ProductionStage::Incubation => StagePayload::Incubation(parse_validated(body)?),
            ProductionStage::Fruiting => StagePayload::Fruiting(parse_validated(body)?),
            ProductionStage::Harvesting => StagePayload::Harvesting(parse_validated(body)?),
            ProductionStage::PostHarvest => StagePayload::PostHarvest(parse_validated(body)?),
            ProductionStage::Completed => {
                return Err(ServiceError::InvalidOperation(
                    "the completed stage has no payload".to_string(),
                ))
            }
        })
    }

    pub fn stage(&self) -> ProductionStage {
        match self {
            StagePayload::BatchCreation(_) => ProductionStage::BatchCreation,
            StagePayload::Inoculation(_) => ProductionStage::Inoculation,
            StagePayload::Incubation(_) => ProductionStage::Incubation,
            StagePayload::Fruiting(_) => ProductionStage::Fruiting,
            StagePayload::Harvesting(_) => ProductionStage::Harvesting,
            StagePayload::PostHarvest(_) => ProductionStage::PostHarvest,
        }
    }

    /// Contamination rate written by this payload, if any.
    pub fn contamination_rate(&self) -> Option<f64> {
        match self {
            StagePayload::Incubation(p) => p.contamination_rate,
            StagePayload::Fruiting(p) => p.contamination_rate,
            _ => None,
        }
    }

    /// Harvested weight written by this payload, if any.
    pub fn harvested_weight_kg(&self) -> Option<f64> {
        match self {
            StagePayload::Harvesting(p) => p.harvested_weight_kg,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn numeric_strings_are_parsed_and_blanks_become_none() {
        let stage: IncubationStage = serde_json::from_value(json!({
            "incubationTemperatureC": "24.5",
            "incubationHumidity": "",
            "contaminationRate": 3,
            "incubationNotes": "   ",
        }))
        .unwrap();

        assert_eq!(stage.incubation_temperature_c, Some(24.5));
        assert_eq!(stage.incubation_humidity, None);
        assert_eq!(stage.contamination_rate, Some(3.0));
        assert_eq!(stage.incubation_notes, None);
    }

    #[test]
    fn non_numeric_strings_are_rejected() {
        let result = StagePayload::parse(
            ProductionStage::Harvesting,
            json!({ "harvestedWeightKg": "a lot" }),
        );
        assert_matches!(result, Err(ServiceError::InvalidInput(_)));
    }

    #[test]
    fn harvest_requires_weight() {
        let result = StagePayload::parse(ProductionStage::Harvesting, json!({ "harvestedBy": "EMP1" }));
        assert_matches!(result, Err(ServiceError::Validation(errors)) => {
            assert!(errors.field_errors().contains_key("harvested_weight_kg"));
        });
    }

    #[test]
    fn humidity_above_hundred_fails_validation() {
        let result = StagePayload::parse(
            ProductionStage::Fruiting,
            json!({ "fruitingHumidity": "140" }),
        );
        assert_matches!(result, Err(ServiceError::Validation(_)));
    }

    #[test]
    fn custom_range_checks_apply_to_rate_and_temperature() {
        assert!(validate_rate(0.0).is_ok());
        assert!(validate_rate(100.0).is_ok());
        assert!(validate_rate(100.5).is_err());
        assert!(validate_temperature(-12.0).is_err());

        let result = StagePayload::parse(
            ProductionStage::Incubation,
            json!({ "incubationTemperatureC": 75, "contaminationRate": "4" }),
        );
        assert_matches!(result, Err(ServiceError::Validation(errors)) => {
            let fields = errors.field_errors();
            assert!(fields.contains_key("incubation_temperature_c"));
            assert!(!fields.contains_key("contamination_rate"));
        });
    }

    #[test]
    fn incubation_window_must_not_run_backwards() {
        let result = StagePayload::parse(
            ProductionStage::Incubation,
            json!({
                "incubationStartDate": "2024-05-10",
                "incubationEndDate": "2024-05-01",
            }),
        );
        assert_matches!(result, Err(ServiceError::Validation(_)));
    }

    #[test]
    fn dates_accept_plain_and_rfc3339_forms() {
        let stage: HarvestingStage = serde_json::from_value(json!({
            "harvestDate": "2024-06-01T08:30:00Z",
            "harvestedWeightKg": 2.5,
        }))
        .unwrap();
        assert_eq!(stage.harvest_date, NaiveDate::from_ymd_opt(2024, 6, 1));

        let stage: InoculationStage =
            serde_json::from_value(json!({ "inoculationDate": "2024-06-02" })).unwrap();
        assert_eq!(stage.inoculation_date, NaiveDate::from_ymd_opt(2024, 6, 2));
    }

    #[test]
    fn unknown_keys_such_as_current_stage_are_ignored() {
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
        assert_eq!(payload.stage(), ProductionStage::Harvesting);
        assert_eq!(payload.harvested_weight_kg(), Some(2.5));
    }

    #[test]
    fn completed_stage_has_no_schema() {
        assert_matches!(
            StagePayload::parse(ProductionStage::Completed, json!({})),
            Err(ServiceError::InvalidOperation(_))
        );
    }
}
