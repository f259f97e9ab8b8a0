//! Core data models for the FinOps hub

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single utilization sample (unix seconds, fraction of capacity)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: i64,
    pub value: f64,
}

/// Utilization samples for one resource from one raw source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub resource_id: String,
    pub points: Vec<MetricPoint>,
}

/// Lookback window ending at `end` (unix seconds) and spanning `days` days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilizationWindow {
    pub end: i64,
    pub days: u32,
}

impl UtilizationWindow {
    pub const SECONDS_PER_DAY: i64 = 86_400;

    pub fn ending_at(end: i64, days: u32) -> Self {
        Self { end, days }
    }

    pub fn start(&self) -> i64 {
        self.end - i64::from(self.days) * Self::SECONDS_PER_DAY
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start() && timestamp <= self.end
    }
}

/// Kind of wasted resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    ComputeInstance,
    Disk,
    StaticAddress,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::ComputeInstance => "compute_instance",
            ResourceType::Disk => "disk",
            ResourceType::StaticAddress => "static_address",
        }
    }
}

/// A resource classified as waste ("zombie")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteRecord {
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub name: String,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub waste_reason: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub estimated_monthly_waste: Decimal,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Monthly savings projected by a recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSavings {
    pub currency: String,
    /// Positive means "you save this much"; aggregation uses the magnitude
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_per_month: Decimal,
}

/// One suggested mutation from a vendor recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub action: String,
    pub resource: String,
    pub resource_type: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_summary: Option<String>,
}

/// A normalized vendor recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommendation_id: String,
    pub description: String,
    pub last_refresh_time: chrono::DateTime<chrono::Utc>,
    pub priority: String,
    pub subtype: String,
    pub operations: Vec<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_savings: Option<CostSavings>,
}

/// Which unit of work a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureScope {
    Recommendations,
    IdleInstances,
    UnattachedDisks,
    UnusedAddresses,
    /// The whole zone (deadline exceeded or every scope failed)
    Zone,
}

impl FailureScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureScope::Recommendations => "recommendations",
            FailureScope::IdleInstances => "idle_instances",
            FailureScope::UnattachedDisks => "unattached_disks",
            FailureScope::UnusedAddresses => "unused_addresses",
            FailureScope::Zone => "zone",
        }
    }
}

/// A contained collaborator failure, reported alongside results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub zone: String,
    pub scope: FailureScope,
    pub message: String,
}

/// Sparse per-zone savings; zones with zero savings are absent
pub type ZoneSavings = BTreeMap<String, Decimal>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_potential_savings: Decimal,
    pub currency: String,
    pub recommendation_count: usize,
    pub waste_record_count: usize,
    #[serde(serialize_with = "serialize_zone_savings")]
    pub savings_by_zone: ZoneSavings,
    /// Zones that contributed nothing because their scan failed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_zones: Vec<String>,
}

fn serialize_zone_savings<S>(savings: &ZoneSavings, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use rust_decimal::prelude::ToPrimitive;
    use serde::ser::SerializeMap;

    let mut map = serializer.serialize_map(Some(savings.len()))?;
    for (zone, amount) in savings {
        map.serialize_entry(zone, &amount.to_f64().unwrap_or_default())?;
    }
    map.end()
}

/// Aggregated savings report for a project across zones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub project_id: String,
    pub zones: Vec<String>,
    pub summary: ReportSummary,
    pub recommendations: Vec<Recommendation>,
    pub waste_records: Vec<WasteRecord>,
    #[serde(default)]
    pub diagnostics: Vec<ScanFailure>,
}

/// Compute instance as returned by the instance-listing collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDescriptor {
    pub id: String,
    pub name: String,
    pub machine_type: String,
    #[serde(default = "default_instance_status")]
    pub status: String,
}

fn default_instance_status() -> String {
    "RUNNING".to_string()
}

/// Persistent volume as returned by the disk-listing collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskDescriptor {
    pub id: String,
    pub name: String,
    pub size_gb: u64,
    #[serde(default)]
    pub users: Vec<String>,
}

/// Static address as returned by the address-listing collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressDescriptor {
    pub id: String,
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub users: Vec<String>,
}

/// Entry of the flat resource inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub name: String,
    pub asset_type: String,
    pub location: String,
    pub project: String,
    pub state: String,
    #[serde(default = "default_create_time")]
    pub create_time: String,
}

fn default_create_time() -> String {
    "N/A".to_string()
}

/// Project visible to the service account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub project_id: String,
    pub display_name: String,
    #[serde(default = "default_project_state")]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

fn default_project_state() -> String {
    "ACTIVE".to_string()
}
