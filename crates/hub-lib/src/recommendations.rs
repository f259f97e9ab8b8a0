//! Vendor recommendation payloads and their normalization
//!
//! Payloads follow the recommender JSON shape (camelCase, nested
//! operation groups, money as `units` + `nanos`).

use crate::models::{CostSavings, Operation, Recommendation};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Impact category carrying a cost projection
pub const COST_CATEGORY: &str = "COST";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecommendation {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub last_refresh_time: DateTime<Utc>,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub recommender_subtype: String,
    #[serde(default)]
    pub content: RecommendationContent,
    #[serde(default)]
    pub primary_impact: Option<Impact>,
}

fn default_priority() -> String {
    "PRIORITY_UNSPECIFIED".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationContent {
    #[serde(default)]
    pub operation_groups: Vec<OperationGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationGroup {
    #[serde(default)]
    pub operations: Vec<RawOperation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOperation {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Impact {
    pub category: String,
    #[serde(default)]
    pub cost_projection: Option<CostProjection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostProjection {
    pub cost: Money,
}

/// Money as `units` plus `nanos` (10^-9 units), both carrying the sign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    #[serde(default = "default_currency_code")]
    pub currency_code: String,
    #[serde(default, deserialize_with = "deserialize_units")]
    pub units: i64,
    #[serde(default)]
    pub nanos: i32,
}

fn default_currency_code() -> String {
    "USD".to_string()
}

/// int64 fields arrive as JSON strings from the REST surface
fn deserialize_units<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Units {
        Number(i64),
        Text(String),
    }

    match Units::deserialize(deserializer)? {
        Units::Number(n) => Ok(n),
        Units::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl Money {
    pub fn amount(&self) -> Decimal {
        Decimal::from(self.units) + Decimal::new(i64::from(self.nanos), 9)
    }
}

/// Maps vendor payloads to [`Recommendation`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationNormalizer;

impl RecommendationNormalizer {
    pub fn normalize(&self, raw: &RawRecommendation) -> Recommendation {
        let operations = raw
            .content
            .operation_groups
            .iter()
            .flat_map(|group| group.operations.iter())
            .map(|op| Operation {
                action: op.action.clone(),
                resource: op.resource.clone(),
                resource_type: op.resource_type.clone(),
                path: op.path.clone(),
                value_summary: op.value.as_ref().and_then(summarize_value),
            })
            .collect();

        Recommendation {
            recommendation_id: raw.name.clone(),
            description: raw.description.clone(),
            last_refresh_time: raw.last_refresh_time,
            priority: raw.priority.clone(),
            subtype: raw.recommender_subtype.clone(),
            operations,
            cost_savings: raw.primary_impact.as_ref().and_then(cost_savings),
        }
    }

    pub fn normalize_all(&self, raw: &[RawRecommendation]) -> Vec<Recommendation> {
        raw.iter().map(|r| self.normalize(r)).collect()
    }
}

/// Cost projections are negative for reductions; savings store the negation
fn cost_savings(impact: &Impact) -> Option<CostSavings> {
    if !impact.category.eq_ignore_ascii_case(COST_CATEGORY) {
        return None;
    }
    let cost = &impact.cost_projection.as_ref()?.cost;
    Some(CostSavings {
        currency: cost.currency_code.clone(),
        amount_per_month: -cost.amount(),
    })
}

/// Opaque rendering of an operation value; empty values yield no summary
fn summarize_value(value: &serde_json::Value) -> Option<String> {
    use serde_json::Value;

    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(a) if a.is_empty() => None,
        Value::Object(o) if o.is_empty() => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(payload: serde_json::Value) -> RawRecommendation {
        serde_json::from_value(payload).unwrap()
    }

    fn cost_recommendation(units: serde_json::Value, nanos: i32) -> RawRecommendation {
        raw(json!({
            "name": "projects/p/locations/us-central1-a/recommenders/r/recommendations/1",
            "description": "Stop idle VM",
            "lastRefreshTime": "2024-05-01T06:00:00Z",
            "priority": "P2",
            "recommenderSubtype": "STOP_VM",
            "primaryImpact": {
                "category": "COST",
                "costProjection": {
                    "cost": {"currencyCode": "USD", "units": units, "nanos": nanos},
                    "duration": "2592000s"
                }
            }
        }))
    }

    #[test]
    fn test_cost_projection_is_negated() {
        let rec =
            RecommendationNormalizer.normalize(&cost_recommendation(json!("-12"), -500_000_000));
        let savings = rec.cost_savings.unwrap();

        assert_eq!(savings.currency, "USD");
        assert_eq!(savings.amount_per_month, Decimal::new(1250, 2));
        assert_eq!(rec.priority, "P2");
        assert_eq!(rec.subtype, "STOP_VM");
    }

    #[test]
    fn test_numeric_units_accepted() {
        let rec = RecommendationNormalizer.normalize(&cost_recommendation(json!(-7), 0));
        assert_eq!(
            rec.cost_savings.unwrap().amount_per_month,
            Decimal::new(7, 0)
        );
    }

    #[test]
    fn test_non_cost_impact_has_no_savings() {
        let rec = RecommendationNormalizer.normalize(&raw(json!({
            "name": "rec-2",
            "lastRefreshTime": "2024-05-01T06:00:00Z",
            "primaryImpact": {"category": "PERFORMANCE"}
        })));

        assert!(rec.cost_savings.is_none());
        assert_eq!(rec.priority, "PRIORITY_UNSPECIFIED");
        assert!(rec.operations.is_empty());
    }

    #[test]
    fn test_operations_flattened_in_order() {
        let rec = RecommendationNormalizer.normalize(&raw(json!({
            "name": "rec-3",
            "lastRefreshTime": "2024-05-01T06:00:00Z",
            "content": {
                "operationGroups": [
                    {"operations": [
                        {"action": "test", "resource": "//compute/vm-1", "resourceType": "compute.googleapis.com/Instance", "path": "/machineType", "value": "zones/us-central1-a/machineTypes/e2-medium"},
                        {"action": "replace", "resource": "//compute/vm-1", "resourceType": "compute.googleapis.com/Instance", "path": "/machineType", "value": {"name": "e2-small"}}
                    ]},
                    {"operations": [
                        {"action": "remove", "resource": "//compute/vm-1", "resourceType": "compute.googleapis.com/Instance", "path": "/", "value": null}
                    ]}
                ]
            }
        })));

        let actions: Vec<&str> = rec.operations.iter().map(|o| o.action.as_str()).collect();
        assert_eq!(actions, vec!["test", "replace", "remove"]);
        assert_eq!(
            rec.operations[0].value_summary.as_deref(),
            Some("zones/us-central1-a/machineTypes/e2-medium")
        );
        assert_eq!(
            rec.operations[1].value_summary.as_deref(),
            Some(r#"{"name":"e2-small"}"#)
        );
        assert_eq!(rec.operations[2].value_summary, None);
    }

    #[test]
    fn test_money_amount() {
        let money = Money {
            currency_code: "USD".to_string(),
            units: 3,
            nanos: 250_000_000,
        };
        assert_eq!(money.amount(), Decimal::new(325, 2));
    }

    #[test]
    fn test_malformed_units_rejected() {
        let result: Result<RawRecommendation, _> = serde_json::from_value(json!({
            "name": "rec-4",
            "lastRefreshTime": "2024-05-01T06:00:00Z",
            "primaryImpact": {"category": "COST", "costProjection": {"cost": {"units": "twelve"}}}
        }));
        assert!(result.is_err());
    }
}
