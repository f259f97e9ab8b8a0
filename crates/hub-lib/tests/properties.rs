//! Property tests for classification and report folding

use hub_lib::classifier::TimeSeriesClassifier;
use hub_lib::detector::{DetectorConfig, ZombieDetector};
use hub_lib::models::{
    AddressDescriptor, DiskDescriptor, InstanceDescriptor, MetricPoint, MetricSeries, ResourceType,
    UtilizationWindow,
};
use hub_lib::pricing::WasteCostEstimator;
use hub_lib::recommendations::RawRecommendation;
use hub_lib::report::{AggregatorConfig, BuildOptions, ReportAggregator};
use hub_lib::sources::{Scoped, Snapshot, SnapshotSource};
use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;

const END: i64 = 1_700_000_000;
const DAY: i64 = UtilizationWindow::SECONDS_PER_DAY;
const PROJECT: &str = "proj";
const ZONES: &[&str] = &["us-central1-a", "us-central1-b", "europe-west1-b"];
/// Regions of `ZONES`; the first is shared by two zones
const REGIONS: &[&str] = &["us-central1", "europe-west1"];
const MACHINE_TYPES: &[&str] = &["e2-micro", "e2-medium", "n2-standard-2", "custom-4-8192"];

/// One series with the given samples per day, day 0 being the oldest
fn daily_series(days: &[Vec<f64>]) -> MetricSeries {
    let start = END - days.len() as i64 * DAY;
    let points = days
        .iter()
        .enumerate()
        .flat_map(|(d, samples)| {
            samples
                .iter()
                .enumerate()
                .map(move |(i, value)| MetricPoint {
                    timestamp: start + d as i64 * DAY + 60 * (i as i64 + 1),
                    value: *value,
                })
        })
        .collect();
    MetricSeries {
        resource_id: "vm".to_string(),
        points,
    }
}

/// Cost recommendation projecting `units + nanos` per month, both with the
/// same sign
fn cost_recommendation(name: &str, units: i64, nanos: i32) -> RawRecommendation {
    serde_json::from_value(json!({
        "name": name,
        "description": "Resize VM",
        "lastRefreshTime": "2024-05-01T06:00:00Z",
        "priority": "P2",
        "recommenderSubtype": "CHANGE_MACHINE_TYPE",
        "primaryImpact": {
            "category": "COST",
            "costProjection": {"cost": {"currencyCode": "USD", "units": units.to_string(), "nanos": nanos}}
        }
    }))
    .unwrap()
}

fn build_report(snapshot: Snapshot) -> hub_lib::OptimizationReport {
    let source = Arc::new(SnapshotSource::new(snapshot));
    let detector = ZombieDetector::new(
        source.clone(),
        source.clone(),
        WasteCostEstimator::default(),
        DetectorConfig::default(),
    );
    let aggregator = ReportAggregator::new(source, Arc::new(detector), AggregatorConfig::default());
    let zones: Vec<String> = ZONES.iter().map(|z| z.to_string()).collect();

    tokio_test::block_on(aggregator.build_with(
        PROJECT,
        &zones,
        BuildOptions {
            window_end: END,
            deadline: None,
        },
    ))
    .unwrap()
}

proptest! {
    #[test]
    fn prop_all_samples_below_threshold_is_idle(
        days in prop::collection::vec(prop::collection::vec(0.0f64..=0.05, 1..5), 1..30)
    ) {
        let classifier = TimeSeriesClassifier::new(0.05);
        let window = UtilizationWindow::ending_at(END, days.len() as u32);
        let series = daily_series(&days);

        prop_assert!(classifier.is_idle(&[&series], &window));
    }

    #[test]
    fn prop_one_busy_day_is_not_idle(
        mut days in prop::collection::vec(prop::collection::vec(0.0f64..0.05, 1..5), 1..30),
        busy in prop::collection::vec(0.0501f64..1.0, 1..5),
        at in any::<prop::sample::Index>(),
    ) {
        let classifier = TimeSeriesClassifier::new(0.05);
        let window = UtilizationWindow::ending_at(END, days.len() as u32);
        let i = at.index(days.len());
        days[i] = busy;
        let series = daily_series(&days);

        let classification = classifier.classify(&[&series], &window);
        prop_assert!(!classification.idle);
        prop_assert_eq!(classification.days_observed, days.len());
    }

    #[test]
    fn prop_zone_savings_sum_to_total(
        disks in prop::collection::vec((0..ZONES.len(), 0u64..2000, prop::bool::ANY), 0..12),
        instances in prop::collection::vec((0..ZONES.len(), 0..MACHINE_TYPES.len(), 0.0f64..0.2), 0..8),
        recommendations in prop::collection::vec((0..ZONES.len(), -500i64..500, 0i32..1_000_000_000), 0..8),
        addresses in prop::collection::vec((0..REGIONS.len(), prop::bool::ANY), 0..6),
    ) {
        let mut snapshot = Snapshot::default();
        let mut expected_recommendations = Decimal::ZERO;
        for (n, (zone, units, nanos)) in recommendations.iter().enumerate() {
            let nanos = if *units < 0 { -*nanos } else { *nanos };
            expected_recommendations += (Decimal::from(*units) + Decimal::new(i64::from(nanos), 9)).abs();
            snapshot.recommendations.push(Scoped::new(
                PROJECT,
                ZONES[*zone],
                cost_recommendation(&format!("rec-{}", n), *units, nanos),
            ));
        }
        for (n, (region, reserved)) in addresses.iter().enumerate() {
            snapshot.addresses.push(Scoped::new(PROJECT, REGIONS[*region], AddressDescriptor {
                id: format!("ip-{}", n),
                name: format!("ip-{}", n),
                status: if *reserved { "RESERVED" } else { "IN_USE" }.to_string(),
                address: None,
                users: vec![],
            }));
        }
        for (n, (zone, size_gb, attached)) in disks.iter().enumerate() {
            snapshot.disks.push(Scoped::new(PROJECT, ZONES[*zone], DiskDescriptor {
                id: format!("disk-{}", n),
                name: format!("disk-{}", n),
                size_gb: *size_gb,
                users: if *attached { vec!["vm".to_string()] } else { vec![] },
            }));
        }
        for (n, (zone, machine_type, utilization)) in instances.iter().enumerate() {
            let id = format!("vm-{}", n);
            snapshot.instances.push(Scoped::new(PROJECT, ZONES[*zone], InstanceDescriptor {
                id: id.clone(),
                name: id.clone(),
                machine_type: MACHINE_TYPES[*machine_type].to_string(),
                status: "RUNNING".to_string(),
            }));
            let mut series = daily_series(&vec![vec![*utilization]; 30]);
            series.resource_id = id;
            snapshot.utilization.push(Scoped::new(PROJECT, ZONES[*zone], series));
        }

        let report = build_report(snapshot);
        let summary = &report.summary;

        let by_zone: Decimal = summary.savings_by_zone.values().copied().sum();
        let by_record: Decimal = report
            .waste_records
            .iter()
            .map(|r| r.estimated_monthly_waste)
            .sum();
        let by_recommendation: Decimal = report
            .recommendations
            .iter()
            .filter_map(|r| r.cost_savings.as_ref())
            .map(|s| s.amount_per_month.abs())
            .sum();
        prop_assert_eq!(by_recommendation, expected_recommendations);
        prop_assert_eq!(summary.recommendation_count, recommendations.len());
        prop_assert_eq!(summary.total_potential_savings, by_zone);
        prop_assert_eq!(summary.total_potential_savings, by_recommendation + by_record);

        let reserved = addresses.iter().filter(|(_, r)| *r).count();
        let address_records = report
            .waste_records
            .iter()
            .filter(|r| r.resource_type == ResourceType::StaticAddress)
            .count();
        prop_assert_eq!(address_records, reserved);
        prop_assert!(summary.savings_by_zone.values().all(|v| *v > Decimal::ZERO));
        prop_assert!(summary.savings_by_zone.keys().all(|z| ZONES.contains(&z.as_str())));

        // A zone-scoped record or any recommendation in a zone puts it on the map
        for zone in ZONES {
            let zone_waste: Decimal = report
                .waste_records
                .iter()
                .filter(|r| r.zone.as_deref() == Some(*zone))
                .map(|r| r.estimated_monthly_waste)
                .sum();
            if zone_waste > Decimal::ZERO {
                prop_assert!(summary.savings_by_zone[*zone] >= zone_waste);
            }
        }

        let idle_expected = instances.iter().filter(|(_, _, u)| *u <= 0.05).count();
        let idle_found = report
            .waste_records
            .iter()
            .filter(|r| r.resource_type == ResourceType::ComputeInstance)
            .count();
        prop_assert_eq!(idle_found, idle_expected);
        prop_assert!(report.diagnostics.is_empty());
    }
}
