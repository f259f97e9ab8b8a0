//! In-memory collaborator for unit tests, with per-location failure and
//! latency injection

use super::{async_trait, ComputeSource, MetricsSource, RecommendationSource};
use crate::models::{
    AddressDescriptor, DiskDescriptor, FailureScope, InstanceDescriptor, MetricPoint, MetricSeries,
    UtilizationWindow,
};
use crate::recommendations::RawRecommendation;
use anyhow::{bail, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct State {
    instances: HashMap<String, Vec<InstanceDescriptor>>,
    disks: HashMap<String, Vec<DiskDescriptor>>,
    addresses: HashMap<String, Vec<AddressDescriptor>>,
    series: HashMap<String, Vec<MetricSeries>>,
    recommendations: HashMap<String, Vec<RawRecommendation>>,
    failing: HashSet<(FailureScope, String)>,
    failing_metrics: HashSet<String>,
    delays: HashMap<String, Duration>,
}

#[derive(Default)]
pub(crate) struct MockCloud {
    state: Mutex<State>,
    calls: AtomicUsize,
}

/// One reading per day at `value`, covering the whole window
pub(crate) fn idle_series(resource_id: &str, end: i64, days: u32, value: f64) -> MetricSeries {
    MetricSeries {
        resource_id: resource_id.to_string(),
        points: (0..i64::from(days))
            .map(|d| MetricPoint {
                timestamp: end - d * UtilizationWindow::SECONDS_PER_DAY - 60,
                value,
            })
            .collect(),
    }
}

impl MockCloud {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_instance(&self, zone: &str, id: &str, name: &str, machine_type: &str) {
        self.add_instance_with_status(zone, id, name, machine_type, "RUNNING");
    }

    pub(crate) fn add_instance_with_status(
        &self,
        zone: &str,
        id: &str,
        name: &str,
        machine_type: &str,
        status: &str,
    ) {
        self.add_instance_descriptor(
            zone,
            InstanceDescriptor {
                id: id.to_string(),
                name: name.to_string(),
                machine_type: machine_type.to_string(),
                status: status.to_string(),
            },
        );
    }

    pub(crate) fn add_instance_descriptor(&self, zone: &str, instance: InstanceDescriptor) {
        let mut state = self.state.lock().unwrap();
        state
            .instances
            .entry(zone.to_string())
            .or_default()
            .push(instance);
    }

    pub(crate) fn add_series(&self, zone: &str, series: MetricSeries) {
        let mut state = self.state.lock().unwrap();
        state
            .series
            .entry(zone.to_string())
            .or_default()
            .push(series);
    }

    pub(crate) fn add_disk(&self, zone: &str, disk: DiskDescriptor) {
        let mut state = self.state.lock().unwrap();
        state.disks.entry(zone.to_string()).or_default().push(disk);
    }

    pub(crate) fn add_address(&self, region: &str, address: AddressDescriptor) {
        let mut state = self.state.lock().unwrap();
        state
            .addresses
            .entry(region.to_string())
            .or_default()
            .push(address);
    }

    pub(crate) fn add_recommendation(&self, zone: &str, recommendation: RawRecommendation) {
        let mut state = self.state.lock().unwrap();
        state
            .recommendations
            .entry(zone.to_string())
            .or_default()
            .push(recommendation);
    }

    /// Make the listing behind `scope` fail for `location` (zone, or region
    /// for addresses)
    pub(crate) fn fail(&self, scope: FailureScope, location: &str) {
        let mut state = self.state.lock().unwrap();
        state.failing.insert((scope, location.to_string()));
    }

    pub(crate) fn fail_metrics(&self, zone: &str) {
        let mut state = self.state.lock().unwrap();
        state.failing_metrics.insert(zone.to_string());
    }

    /// Delay every call touching `location`
    pub(crate) fn delay(&self, location: &str, delay: Duration) {
        let mut state = self.state.lock().unwrap();
        state.delays.insert(location.to_string(), delay);
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, scope: FailureScope, location: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay, failing) = {
            let state = self.state.lock().unwrap();
            (
                state.delays.get(location).copied(),
                state.failing.contains(&(scope, location.to_string())),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            bail!("permission denied for {} in {}", scope.as_str(), location);
        }
        Ok(())
    }
}

#[async_trait]
impl RecommendationSource for MockCloud {
    async fn list_recommendations(
        &self,
        _project_id: &str,
        zone: &str,
    ) -> Result<Vec<RawRecommendation>> {
        self.enter(FailureScope::Recommendations, zone).await?;
        let state = self.state.lock().unwrap();
        Ok(state.recommendations.get(zone).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ComputeSource for MockCloud {
    async fn list_instances(
        &self,
        _project_id: &str,
        zone: &str,
    ) -> Result<Vec<InstanceDescriptor>> {
        self.enter(FailureScope::IdleInstances, zone).await?;
        let state = self.state.lock().unwrap();
        Ok(state.instances.get(zone).cloned().unwrap_or_default())
    }

    async fn list_disks(&self, _project_id: &str, zone: &str) -> Result<Vec<DiskDescriptor>> {
        self.enter(FailureScope::UnattachedDisks, zone).await?;
        let state = self.state.lock().unwrap();
        Ok(state.disks.get(zone).cloned().unwrap_or_default())
    }

    async fn list_addresses(
        &self,
        _project_id: &str,
        region: &str,
    ) -> Result<Vec<AddressDescriptor>> {
        self.enter(FailureScope::UnusedAddresses, region).await?;
        let state = self.state.lock().unwrap();
        Ok(state.addresses.get(region).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl MetricsSource for MockCloud {
    async fn query_utilization(
        &self,
        _project_id: &str,
        zone: &str,
        _window: UtilizationWindow,
    ) -> Result<Vec<MetricSeries>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.failing_metrics.contains(zone) {
            bail!("monitoring unavailable in {}", zone);
        }
        Ok(state.series.get(zone).cloned().unwrap_or_default())
    }
}
