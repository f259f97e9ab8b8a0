//! Observability infrastructure for the FinOps hub
//!
//! Provides:
//! - Prometheus metrics (report/zone latency, detections, source errors)
//! - Structured JSON logging with tracing; this is where contained
//!   collaborator failures are reported

use crate::models::{FailureScope, WasteRecord};
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_counter_vec, Encoder,
    Gauge, Histogram, IntCounter, IntCounterVec, TextEncoder,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<HubMetricsInner> = OnceLock::new();

struct HubMetricsInner {
    report_duration_seconds: Histogram,
    zone_scan_duration_seconds: Histogram,
    waste_records: IntCounterVec,
    recommendations: IntCounter,
    source_errors: IntCounterVec,
    failed_zones: IntCounter,
    last_report_savings: Gauge,
}

impl HubMetricsInner {
    fn new() -> Self {
        Self {
            report_duration_seconds: register_histogram!(
                "finops_hub_report_duration_seconds",
                "Time spent building an optimization report",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register report_duration_seconds"),

            zone_scan_duration_seconds: register_histogram!(
                "finops_hub_zone_scan_duration_seconds",
                "Time spent scanning a single zone",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register zone_scan_duration_seconds"),

            waste_records: register_int_counter_vec!(
                "finops_hub_waste_records_total",
                "Waste records detected, by resource type",
                &["resource_type"]
            )
            .expect("Failed to register waste_records_total"),

            recommendations: register_int_counter!(
                "finops_hub_recommendations_total",
                "Vendor recommendations normalized"
            )
            .expect("Failed to register recommendations_total"),

            source_errors: register_int_counter_vec!(
                "finops_hub_source_errors_total",
                "Contained collaborator failures, by scope",
                &["scope"]
            )
            .expect("Failed to register source_errors_total"),

            failed_zones: register_int_counter!(
                "finops_hub_failed_zones_total",
                "Zones that contributed nothing because their scan failed"
            )
            .expect("Failed to register failed_zones_total"),

            last_report_savings: register_gauge!(
                "finops_hub_last_report_savings",
                "Total potential monthly savings of the last report"
            )
            .expect("Failed to register last_report_savings"),
        }
    }
}

/// Hub metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct HubMetrics {
    _private: (),
}

impl Default for HubMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl HubMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(HubMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &HubMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_report_duration(&self, duration_secs: f64) {
        self.inner().report_duration_seconds.observe(duration_secs);
    }

    pub fn observe_zone_scan_duration(&self, duration_secs: f64) {
        self.inner()
            .zone_scan_duration_seconds
            .observe(duration_secs);
    }

    pub fn inc_waste_records(&self, resource_type: &str) {
        self.inner()
            .waste_records
            .with_label_values(&[resource_type])
            .inc();
    }

    pub fn add_recommendations(&self, count: usize) {
        self.inner().recommendations.inc_by(count as u64);
    }

    pub fn inc_source_errors(&self, scope: FailureScope) {
        self.inner()
            .source_errors
            .with_label_values(&[scope.as_str()])
            .inc();
    }

    pub fn inc_failed_zones(&self) {
        self.inner().failed_zones.inc();
    }

    pub fn set_last_report_savings(&self, total: Decimal) {
        self.inner()
            .last_report_savings
            .set(total.to_f64().unwrap_or_default());
    }

    /// Render every registered metric in the Prometheus text format
    pub fn encode(&self) -> prometheus::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(buffer)
    }
}

/// Whole milliseconds in `elapsed`, saturating at `u64::MAX`
pub fn duration_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Structured logger for hub events
///
/// Provides consistent JSON-formatted logging for detections, contained
/// failures and reports.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log a resource classified as waste
    pub fn log_waste_detected(&self, record: &WasteRecord) {
        info!(
            event = "waste_detected",
            service = %self.service,
            project_id = %record.project_id,
            resource_id = %record.resource_id,
            resource_type = record.resource_type.as_str(),
            name = %record.name,
            zone = ?record.zone,
            region = ?record.region,
            waste_reason = %record.waste_reason,
            estimated_monthly_waste = %record.estimated_monthly_waste,
            "Waste resource detected"
        );
    }

    /// Log a collaborator failure that was contained to one scope
    pub fn log_source_failure(
        &self,
        project_id: &str,
        zone: &str,
        scope: FailureScope,
        error: &str,
    ) {
        warn!(
            event = "source_failure",
            service = %self.service,
            project_id = %project_id,
            zone = %zone,
            scope = scope.as_str(),
            error = %error,
            "Collaborator failure contained, scope contributes no results"
        );
    }

    /// Log a completed report
    pub fn log_report_built(
        &self,
        project_id: &str,
        zones: usize,
        total_savings: Decimal,
        currency: &str,
        failures: usize,
        duration_ms: u64,
    ) {
        if failures == 0 {
            info!(
                event = "report_built",
                service = %self.service,
                project_id = %project_id,
                zones = zones,
                total_potential_savings = %total_savings,
                currency = %currency,
                duration_ms = duration_ms,
                "Optimization report built"
            );
        } else {
            warn!(
                event = "report_built",
                service = %self.service,
                project_id = %project_id,
                zones = zones,
                total_potential_savings = %total_savings,
                currency = %currency,
                failures = failures,
                duration_ms = duration_ms,
                "Optimization report built with contained failures, savings may be under-reported"
            );
        }
    }

    pub fn log_startup(&self, version: &str, pricing_source: &str) {
        info!(
            event = "hub_started",
            service = %self.service,
            version = %version,
            pricing_source = %pricing_source,
            "FinOps hub started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "hub_shutdown",
            service = %self.service,
            reason = %reason,
            "FinOps hub shutting down"
        );
    }
}
