//! Zombie resource detection
//!
//! Runs three independent sub-detections for a zone (idle instances,
//! unattached disks, unused static addresses). A collaborator failure in one
//! category is logged, counted and returned as a [`ScanFailure`]; the other
//! categories still contribute their records.

use crate::classifier::{
    MissingTelemetryPolicy, TimeSeriesClassifier, DEFAULT_IDLE_THRESHOLD, DEFAULT_LOOKBACK_DAYS,
};
use crate::error::HubResult;
use crate::location::Zone;
use crate::models::{
    FailureScope, MetricSeries, ResourceType, ScanFailure, UtilizationWindow, WasteRecord,
};
use crate::observability::{HubMetrics, StructuredLogger};
use crate::pricing::{machine_type_name, WasteCostEstimator};
use crate::sources::{ComputeSource, MetricsSource};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

const RUNNING: &str = "RUNNING";
const RESERVED: &str = "RESERVED";

/// Detection tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Daily utilization at or below this fraction counts as idle
    pub idle_threshold: f64,
    /// Lookback window in days
    pub lookback_days: u32,
    pub missing_telemetry: MissingTelemetryPolicy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            missing_telemetry: MissingTelemetryPolicy::default(),
        }
    }
}

/// Waste records for one zone plus the categories that failed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneDetection {
    pub records: Vec<WasteRecord>,
    pub failures: Vec<ScanFailure>,
}

pub struct ZombieDetector {
    compute: Arc<dyn ComputeSource>,
    utilization: Arc<dyn MetricsSource>,
    classifier: TimeSeriesClassifier,
    estimator: WasteCostEstimator,
    lookback_days: u32,
    logger: StructuredLogger,
    metrics: HubMetrics,
}

impl ZombieDetector {
    pub fn new(
        compute: Arc<dyn ComputeSource>,
        utilization: Arc<dyn MetricsSource>,
        estimator: WasteCostEstimator,
        config: DetectorConfig,
    ) -> Self {
        Self {
            compute,
            utilization,
            classifier: TimeSeriesClassifier::new(config.idle_threshold)
                .with_missing_telemetry(config.missing_telemetry),
            estimator,
            lookback_days: config.lookback_days,
            logger: StructuredLogger::new("zombie-detector"),
            metrics: HubMetrics::new(),
        }
    }

    pub fn estimator(&self) -> &WasteCostEstimator {
        &self.estimator
    }

    /// Window ending at `end` (unix seconds) with the configured lookback
    pub fn window_ending_at(&self, end: i64) -> UtilizationWindow {
        UtilizationWindow::ending_at(end, self.lookback_days)
    }

    /// Detect waste in a zone over the window ending now. Fails only when
    /// `location` is not a well-formed zone identifier.
    pub async fn detect(&self, project_id: &str, location: &str) -> HubResult<ZoneDetection> {
        let zone = Zone::parse(location)?;
        let window = self.window_ending_at(chrono::Utc::now().timestamp());
        Ok(self.detect_zone(project_id, &zone, window).await)
    }

    /// Detect waste in an already validated zone
    pub async fn detect_zone(
        &self,
        project_id: &str,
        zone: &Zone,
        window: UtilizationWindow,
    ) -> ZoneDetection {
        let (idle, disks, addresses) = tokio::join!(
            self.idle_instances(project_id, zone, window),
            self.unattached_disks(project_id, zone),
            self.unused_addresses(project_id, zone),
        );

        let mut detection = ZoneDetection::default();
        for (scope, result) in [
            (FailureScope::IdleInstances, idle),
            (FailureScope::UnattachedDisks, disks),
            (FailureScope::UnusedAddresses, addresses),
        ] {
            match result {
                Ok(records) => detection.records.extend(records),
                Err(e) => {
                    let message = format!("{:#}", e);
                    self.logger
                        .log_source_failure(project_id, zone.as_str(), scope, &message);
                    self.metrics.inc_source_errors(scope);
                    detection.failures.push(ScanFailure {
                        zone: zone.to_string(),
                        scope,
                        message,
                    });
                }
            }
        }

        for record in &detection.records {
            self.logger.log_waste_detected(record);
            self.metrics
                .inc_waste_records(record.resource_type.as_str());
        }

        debug!(
            zone = %zone,
            records = detection.records.len(),
            failures = detection.failures.len(),
            "Zone detection complete"
        );

        detection
    }

    async fn idle_instances(
        &self,
        project_id: &str,
        zone: &Zone,
        window: UtilizationWindow,
    ) -> Result<Vec<WasteRecord>> {
        let instances = self
            .compute
            .list_instances(project_id, zone.as_str())
            .await
            .with_context(|| format!("Failed to list instances in {}", zone))?;

        let running: Vec<_> = instances
            .into_iter()
            .filter(|i| i.status.eq_ignore_ascii_case(RUNNING))
            .collect();
        if running.is_empty() {
            return Ok(Vec::new());
        }

        let series = self
            .utilization
            .query_utilization(project_id, zone.as_str(), window)
            .await
            .with_context(|| format!("Failed to query utilization in {}", zone))?;

        let mut by_resource: HashMap<&str, Vec<&MetricSeries>> = HashMap::new();
        for s in &series {
            by_resource
                .entry(s.resource_id.as_str())
                .or_default()
                .push(s);
        }

        let reason = idle_reason(self.classifier.threshold);
        let mut records = Vec::new();
        for instance in running {
            let resource_series = by_resource
                .get(instance.id.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let classification = self.classifier.classify(resource_series, &window);
            if !classification.idle {
                continue;
            }

            let machine_type = machine_type_name(&instance.machine_type).to_string();
            let mut metadata = BTreeMap::new();
            metadata.insert(
                "machine_type".to_string(),
                serde_json::Value::from(machine_type.clone()),
            );
            metadata.insert(
                "days_observed".to_string(),
                serde_json::Value::from(classification.days_observed),
            );
            if let Some(peak) = classification.peak_daily {
                metadata.insert(
                    "peak_daily_utilization".to_string(),
                    serde_json::Value::from(peak),
                );
            }

            records.push(WasteRecord {
                resource_id: instance.id,
                resource_type: ResourceType::ComputeInstance,
                name: instance.name,
                project_id: project_id.to_string(),
                zone: Some(zone.to_string()),
                region: None,
                waste_reason: reason.clone(),
                estimated_monthly_waste: self.estimator.instance_monthly(&machine_type),
                metadata,
            });
        }

        Ok(records)
    }

    async fn unattached_disks(&self, project_id: &str, zone: &Zone) -> Result<Vec<WasteRecord>> {
        let disks = self
            .compute
            .list_disks(project_id, zone.as_str())
            .await
            .with_context(|| format!("Failed to list disks in {}", zone))?;

        Ok(disks
            .into_iter()
            .filter(|d| d.users.is_empty())
            .map(|d| WasteRecord {
                estimated_monthly_waste: self.estimator.disk_monthly(d.size_gb),
                metadata: BTreeMap::from([(
                    "size_gb".to_string(),
                    serde_json::Value::from(d.size_gb),
                )]),
                resource_id: d.id,
                resource_type: ResourceType::Disk,
                name: d.name,
                project_id: project_id.to_string(),
                zone: Some(zone.to_string()),
                region: None,
                waste_reason: "Unattached Disk".to_string(),
            })
            .collect())
    }

    async fn unused_addresses(&self, project_id: &str, zone: &Zone) -> Result<Vec<WasteRecord>> {
        let region = zone.region();
        let addresses = self
            .compute
            .list_addresses(project_id, region)
            .await
            .with_context(|| format!("Failed to list addresses in {}", region))?;

        Ok(addresses
            .into_iter()
            .filter(|a| a.status.eq_ignore_ascii_case(RESERVED) && a.users.is_empty())
            .map(|a| {
                let mut metadata = BTreeMap::new();
                if let Some(address) = a.address {
                    metadata.insert("address".to_string(), serde_json::Value::from(address));
                }
                WasteRecord {
                    resource_id: a.id,
                    resource_type: ResourceType::StaticAddress,
                    name: a.name,
                    project_id: project_id.to_string(),
                    zone: None,
                    region: Some(region.to_string()),
                    waste_reason: "Unused Static IP".to_string(),
                    estimated_monthly_waste: self.estimator.static_address_monthly(),
                    metadata,
                }
            })
            .collect())
    }
}

/// `0.05` -> `Idle VM (< 5% CPU)`
fn idle_reason(threshold: f64) -> String {
    let percent = (threshold * 10_000.0).round() / 100.0;
    format!("Idle VM (< {}% CPU)", percent)
}
