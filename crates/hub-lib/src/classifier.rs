//! Idle classification over a utilization window
//!
//! Raw samples are reduced to one value per day: each source series is
//! averaged per day, then the maximum across sources is taken for that day.
//! A resource is idle only if every daily value is at or below the threshold.

use crate::models::{MetricSeries, UtilizationWindow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default utilization threshold (5% CPU)
pub const DEFAULT_IDLE_THRESHOLD: f64 = 0.05;

/// Default lookback window in days
pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;

/// How to classify a resource with no samples in the window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingTelemetryPolicy {
    /// No data means not idle (new instances, telemetry gaps)
    #[default]
    AssumeActive,
    /// No data means idle
    AssumeIdle,
}

/// Outcome of classifying one resource
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub idle: bool,
    /// Number of days with at least one sample
    pub days_observed: usize,
    /// Highest daily value across the window
    pub peak_daily: Option<f64>,
}

/// Decides idle/non-idle for a resource's utilization series
#[derive(Debug, Clone)]
pub struct TimeSeriesClassifier {
    /// Daily values at or below this count as idle
    pub threshold: f64,
    pub missing_telemetry: MissingTelemetryPolicy,
}

impl TimeSeriesClassifier {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            missing_telemetry: MissingTelemetryPolicy::default(),
        }
    }

    pub fn with_missing_telemetry(mut self, policy: MissingTelemetryPolicy) -> Self {
        self.missing_telemetry = policy;
        self
    }

    /// Classify a resource from every series reported for it
    pub fn classify(&self, series: &[&MetricSeries], window: &UtilizationWindow) -> Classification {
        let daily = daily_profile(series, window);
        let peak_daily = daily
            .values()
            .copied()
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let idle = match peak_daily {
            Some(peak) => peak <= self.threshold,
            None => self.missing_telemetry == MissingTelemetryPolicy::AssumeIdle,
        };

        Classification {
            idle,
            days_observed: daily.len(),
            peak_daily,
        }
    }

    pub fn is_idle(&self, series: &[&MetricSeries], window: &UtilizationWindow) -> bool {
        self.classify(series, window).idle
    }
}

impl Default for TimeSeriesClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_THRESHOLD)
    }
}

/// Day bucket of a timestamp inside the window, aligned to the window end
fn day_bucket(timestamp: i64, window: &UtilizationWindow) -> Option<u32> {
    if window.days == 0 || !window.contains(timestamp) {
        return None;
    }
    let offset = (timestamp - window.start()) / UtilizationWindow::SECONDS_PER_DAY;
    Some((offset as u32).min(window.days - 1))
}

/// Reduce raw series to one value per day bucket: per-series daily mean,
/// then the maximum across series. Non-finite samples are ignored.
pub fn daily_profile(series: &[&MetricSeries], window: &UtilizationWindow) -> BTreeMap<u32, f64> {
    let mut profile: BTreeMap<u32, f64> = BTreeMap::new();

    for s in series {
        let mut sums: BTreeMap<u32, (f64, u32)> = BTreeMap::new();
        for point in s.points.iter().filter(|p| p.value.is_finite()) {
            if let Some(day) = day_bucket(point.timestamp, window) {
                let entry = sums.entry(day).or_insert((0.0, 0));
                entry.0 += point.value;
                entry.1 += 1;
            }
        }

        for (day, (sum, count)) in sums {
            let mean = sum / f64::from(count);
            profile
                .entry(day)
                .and_modify(|v| *v = v.max(mean))
                .or_insert(mean);
        }
    }

    profile
}
