//! Report aggregation across zones
//!
//! Each zone is an independent unit of work: recommendations are fetched and
//! zombie detection runs concurrently, bounded by `max_concurrent_zones` and
//! by an overall deadline. Zone outcomes are folded in request order, so the
//! report does not depend on completion order.


use crate::detector::{ZombieDetector, ZoneDetection};
use crate::error::{HubError, HubResult};
use crate::location::Zone;
use crate::models::{
    FailureScope, OptimizationReport, Recommendation, ReportSummary, ResourceType, ScanFailure,
    UtilizationWindow, WasteRecord, ZoneSavings,
};
use crate::observability::{duration_millis, HubMetrics, StructuredLogger};
use crate::recommendations::RecommendationNormalizer;
use crate::sources::RecommendationSource;
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Scopes a zone can fail in; a zone with every scope failed counts as failed
const ZONE_SCOPES: usize = 4;

/// Aggregation tuning
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Zones scanned concurrently (external rate limits)
    pub max_concurrent_zones: usize,
    /// Deadline for a whole report, applied when the caller gives none
    pub timeout: Option<Duration>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_zones: 4,
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Per-request options
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// End of the utilization window (unix seconds)
    pub window_end: i64,
    /// Every zone still running at this instant is reported as failed
    pub deadline: Option<Instant>,
}

/// Everything one zone contributed, before deduplication
#[derive(Debug, Default)]
struct ZoneOutcome {
    recommendations: Vec<Recommendation>,
    detection: ZoneDetection,
    failures: Vec<ScanFailure>,
    failed: bool,
}

pub struct ReportAggregator {
    recommendations: Arc<dyn RecommendationSource>,
    detector: Arc<ZombieDetector>,
    normalizer: RecommendationNormalizer,
    config: AggregatorConfig,
    logger: StructuredLogger,
    metrics: HubMetrics,
}

impl ReportAggregator {
    pub fn new(
        recommendations: Arc<dyn RecommendationSource>,
        detector: Arc<ZombieDetector>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            recommendations,
            detector,
            normalizer: RecommendationNormalizer,
            config,
            logger: StructuredLogger::new("report-aggregator"),
            metrics: HubMetrics::new(),
        }
    }

    /// Build a report over the window ending now, bounded by the configured
    /// timeout
    pub async fn build(&self, project_id: &str, zones: &[String]) -> HubResult<OptimizationReport> {
        let options = BuildOptions {
            window_end: chrono::Utc::now().timestamp(),
            deadline: self.config.timeout.map(|t| Instant::now() + t),
        };
        self.build_with(project_id, zones, options).await
    }

    pub async fn build_with(
        &self,
        project_id: &str,
        zones: &[String],
        options: BuildOptions,
    ) -> HubResult<OptimizationReport> {
        let start = Instant::now();
        let project_id = project_id.trim();
        let zones = validate(project_id, zones)?;
        let window = self.detector.window_ending_at(options.window_end);

        let scans: Vec<_> = zones
            .iter()
            .map(|zone| self.scan_zone(project_id, zone, window, options.deadline))
            .collect();
        let outcomes: Vec<ZoneOutcome> = stream::iter(scans)
            .buffered(self.config.max_concurrent_zones.max(1))
            .collect()
            .await;

        let report = self.fold(project_id, &zones, outcomes)?;

        let elapsed = start.elapsed();
        self.metrics.observe_report_duration(elapsed.as_secs_f64());
        self.metrics
            .set_last_report_savings(report.summary.total_potential_savings);
        self.logger.log_report_built(
            project_id,
            zones.len(),
            report.summary.total_potential_savings,
            &report.summary.currency,
            report.diagnostics.len(),
            duration_millis(elapsed),
        );

        Ok(report)
    }

    async fn scan_zone(
        &self,
        project_id: &str,
        zone: &Zone,
        window: UtilizationWindow,
        deadline: Option<Instant>,
    ) -> ZoneOutcome {
        let start = Instant::now();
        let work = async {
            tokio::join!(
                self.fetch_recommendations(project_id, zone),
                self.detector.detect_zone(project_id, zone, window),
            )
        };

        let result = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, work).await.ok(),
            None => Some(work.await),
        };
        self.metrics
            .observe_zone_scan_duration(start.elapsed().as_secs_f64());

        let Some((recommendations, detection)) = result else {
            warn!(zone = %zone, "Zone scan exceeded the report deadline");
            return self.failed_zone(project_id, zone, "deadline exceeded", Vec::new());
        };

        let mut failures = Vec::new();
        let recommendations = match recommendations {
            Ok(recommendations) => recommendations,
            Err(e) => {
                let message = format!("{:#}", e);
                self.logger.log_source_failure(
                    project_id,
                    zone.as_str(),
                    FailureScope::Recommendations,
                    &message,
                );
                self.metrics
                    .inc_source_errors(FailureScope::Recommendations);
                failures.push(ScanFailure {
                    zone: zone.to_string(),
                    scope: FailureScope::Recommendations,
                    message,
                });
                Vec::new()
            }
        };
        failures.extend(detection.failures.iter().cloned());

        if failures.len() >= ZONE_SCOPES {
            return self.failed_zone(project_id, zone, "every scope failed", failures);
        }

        ZoneOutcome {
            recommendations,
            detection,
            failures,
            failed: false,
        }
    }

    fn failed_zone(
        &self,
        project_id: &str,
        zone: &Zone,
        reason: &str,
        mut failures: Vec<ScanFailure>,
    ) -> ZoneOutcome {
        self.logger
            .log_source_failure(project_id, zone.as_str(), FailureScope::Zone, reason);
        self.metrics.inc_source_errors(FailureScope::Zone);
        self.metrics.inc_failed_zones();
        failures.push(ScanFailure {
            zone: zone.to_string(),
            scope: FailureScope::Zone,
            message: reason.to_string(),
        });
        ZoneOutcome {
            failures,
            failed: true,
            ..Default::default()
        }
    }

    async fn fetch_recommendations(
        &self,
        project_id: &str,
        zone: &Zone,
    ) -> Result<Vec<Recommendation>> {
        let raw = self
            .recommendations
            .list_recommendations(project_id, zone.as_str())
            .await
            .with_context(|| format!("Failed to list recommendations in {}", zone))?;
        self.metrics.add_recommendations(raw.len());
        Ok(self.normalizer.normalize_all(&raw))
    }

    /// Fold zone outcomes in request order. A regional record or
    /// recommendation seen under several zones counts for the first one only.
    fn fold(
        &self,
        project_id: &str,
        zones: &[Zone],
        outcomes: Vec<ZoneOutcome>,
    ) -> HubResult<OptimizationReport> {
        let mut seen_recommendations: HashSet<String> = HashSet::new();
        let mut seen_records: HashSet<(ResourceType, String, String)> = HashSet::new();

        let mut recommendations = Vec::new();
        let mut waste_records: Vec<WasteRecord> = Vec::new();
        let mut diagnostics = Vec::new();
        let mut failed_zones = Vec::new();
        let mut savings_by_zone = ZoneSavings::new();
        let mut total = Decimal::ZERO;

        for (zone, outcome) in zones.iter().zip(outcomes) {
            let mut zone_savings = Decimal::ZERO;

            for recommendation in outcome.recommendations {
                if !seen_recommendations.insert(recommendation.recommendation_id.clone()) {
                    continue;
                }
                if let Some(savings) = &recommendation.cost_savings {
                    zone_savings += savings.amount_per_month.abs();
                }
                recommendations.push(recommendation);
            }

            for record in outcome.detection.records {
                let location = record
                    .zone
                    .clone()
                    .or_else(|| record.region.clone())
                    .unwrap_or_default();
                if !seen_records.insert((
                    record.resource_type,
                    record.resource_id.clone(),
                    location,
                )) {
                    debug!(
                        zone = %zone,
                        resource_id = %record.resource_id,
                        "Record already attributed to an earlier zone"
                    );
                    continue;
                }
                zone_savings += record.estimated_monthly_waste;
                waste_records.push(record);
            }

            if zone_savings > Decimal::ZERO {
                savings_by_zone.insert(zone.to_string(), zone_savings);
            }
            total += zone_savings;

            if outcome.failed {
                failed_zones.push(zone.to_string());
            }
            diagnostics.extend(outcome.failures);
        }

        if failed_zones.len() == zones.len() {
            let reasons: Vec<String> = diagnostics
                .iter()
                .map(|f| format!("{} {}: {}", f.zone, f.scope.as_str(), f.message))
                .collect();
            return Err(HubError::AllZonesFailed(reasons.join("; ")));
        }

        Ok(OptimizationReport {
            project_id: project_id.to_string(),
            zones: zones.iter().map(Zone::to_string).collect(),
            summary: ReportSummary {
                total_potential_savings: total,
                currency: self.detector.estimator().currency().to_string(),
                recommendation_count: recommendations.len(),
                waste_record_count: waste_records.len(),
                savings_by_zone,
                failed_zones,
            },
            recommendations,
            waste_records,
            diagnostics,
        })
    }
}

/// Reject malformed requests before any collaborator call; duplicate zones
/// are dropped keeping first occurrence
fn validate(project_id: &str, zones: &[String]) -> HubResult<Vec<Zone>> {
    if project_id.is_empty() {
        return Err(HubError::EmptyProjectId);
    }

    let mut parsed: Vec<Zone> = Vec::with_capacity(zones.len());
    for raw in zones {
        let zone = Zone::parse(raw)?;
        if !parsed.contains(&zone) {
            parsed.push(zone);
        }
    }

    if parsed.is_empty() {
        return Err(HubError::NoZones);
    }
    Ok(parsed)
}
