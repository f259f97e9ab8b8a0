//! File-backed collaborator
//!
//! A snapshot is a JSON document holding previously exported listings,
//! utilization series and recommendation payloads. It lets the hub run
//! offline and gives tests controlled collaborator responses.

use super::{
    async_trait, ComputeSource, InventorySource, MetricsSource, ProjectSource, RecommendationSource,
};
use crate::models::{
    AddressDescriptor, DiskDescriptor, InstanceDescriptor, MetricSeries, ProjectInfo,
    ResourceSummary, UtilizationWindow,
};
use crate::recommendations::RawRecommendation;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// An item tagged with the project and location it was listed under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scoped<T> {
    pub project_id: String,
    /// Zone for zonal listings, region for addresses
    pub location: String,
    #[serde(flatten)]
    pub item: T,
}

impl<T> Scoped<T> {
    pub fn new(project_id: impl Into<String>, location: impl Into<String>, item: T) -> Self {
        Self {
            project_id: project_id.into(),
            location: location.into(),
            item,
        }
    }

    fn matches(&self, project_id: &str, location: &str) -> bool {
        self.project_id == project_id && self.location == location
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub projects: Vec<ProjectInfo>,
    #[serde(default)]
    pub instances: Vec<Scoped<InstanceDescriptor>>,
    #[serde(default)]
    pub disks: Vec<Scoped<DiskDescriptor>>,
    #[serde(default)]
    pub addresses: Vec<Scoped<AddressDescriptor>>,
    #[serde(default)]
    pub utilization: Vec<Scoped<MetricSeries>>,
    #[serde(default)]
    pub recommendations: Vec<Scoped<RawRecommendation>>,
    #[serde(default)]
    pub resources: Vec<ResourceSummary>,
}

fn select<T: Clone>(items: &[Scoped<T>], project_id: &str, location: &str) -> Vec<T> {
    items
        .iter()
        .filter(|s| s.matches(project_id, location))
        .map(|s| s.item.clone())
        .collect()
}

/// Serves every collaborator trait from an immutable [`Snapshot`]
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    snapshot: Arc<Snapshot>,
}

impl SnapshotSource {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
        }
    }

    /// Load a snapshot document from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;

        info!(
            path = %path.display(),
            projects = snapshot.projects.len(),
            instances = snapshot.instances.len(),
            disks = snapshot.disks.len(),
            addresses = snapshot.addresses.len(),
            recommendations = snapshot.recommendations.len(),
            "Loaded collaborator snapshot"
        );

        Ok(Self::new(snapshot))
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

#[async_trait]
impl RecommendationSource for SnapshotSource {
    async fn list_recommendations(
        &self,
        project_id: &str,
        zone: &str,
    ) -> Result<Vec<RawRecommendation>> {
        Ok(select(&self.snapshot.recommendations, project_id, zone))
    }
}

#[async_trait]
impl ComputeSource for SnapshotSource {
    async fn list_instances(
        &self,
        project_id: &str,
        zone: &str,
    ) -> Result<Vec<InstanceDescriptor>> {
        Ok(select(&self.snapshot.instances, project_id, zone))
    }

    async fn list_disks(&self, project_id: &str, zone: &str) -> Result<Vec<DiskDescriptor>> {
        Ok(select(&self.snapshot.disks, project_id, zone))
    }

    async fn list_addresses(
        &self,
        project_id: &str,
        region: &str,
    ) -> Result<Vec<AddressDescriptor>> {
        Ok(select(&self.snapshot.addresses, project_id, region))
    }
}

#[async_trait]
impl MetricsSource for SnapshotSource {
    async fn query_utilization(
        &self,
        project_id: &str,
        zone: &str,
        window: UtilizationWindow,
    ) -> Result<Vec<MetricSeries>> {
        Ok(select(&self.snapshot.utilization, project_id, zone)
            .into_iter()
            .map(|mut series| {
                series.points.retain(|p| window.contains(p.timestamp));
                series
            })
            .collect())
    }
}

#[async_trait]
impl InventorySource for SnapshotSource {
    async fn list_resources(&self, project_id: &str) -> Result<Vec<ResourceSummary>> {
        Ok(self
            .snapshot
            .resources
            .iter()
            .filter(|r| r.project == project_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProjectSource for SnapshotSource {
    async fn list_projects(&self) -> Result<Vec<ProjectInfo>> {
        Ok(self.snapshot.projects.clone())
    }
}
