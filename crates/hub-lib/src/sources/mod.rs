//! Collaborator interfaces consumed by the engine
//!
//! Every external data source (vendor recommender, compute listings,
//! monitoring, asset inventory, project listing) sits behind one of these
//! traits and is injected at construction. `SnapshotSource` implements all
//! of them from a JSON document.

mod snapshot;

#[cfg(test)]
pub(crate) mod mock;

pub use snapshot::{Scoped, Snapshot, SnapshotSource};

use crate::models::{
    AddressDescriptor, DiskDescriptor, InstanceDescriptor, MetricSeries, ProjectInfo,
    ResourceSummary, UtilizationWindow,
};
use crate::recommendations::RawRecommendation;
use anyhow::Result;

pub use async_trait::async_trait;

/// Vendor recommendation listing
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    async fn list_recommendations(
        &self,
        project_id: &str,
        zone: &str,
    ) -> Result<Vec<RawRecommendation>>;
}

/// Compute resource listings
#[async_trait]
pub trait ComputeSource: Send + Sync {
    async fn list_instances(&self, project_id: &str, zone: &str)
        -> Result<Vec<InstanceDescriptor>>;

    async fn list_disks(&self, project_id: &str, zone: &str) -> Result<Vec<DiskDescriptor>>;

    /// Static addresses are regional
    async fn list_addresses(
        &self,
        project_id: &str,
        region: &str,
    ) -> Result<Vec<AddressDescriptor>>;
}

/// Utilization time series
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// CPU utilization series for every instance in the zone
    async fn query_utilization(
        &self,
        project_id: &str,
        zone: &str,
        window: UtilizationWindow,
    ) -> Result<Vec<MetricSeries>>;
}

/// Asset inventory
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn list_resources(&self, project_id: &str) -> Result<Vec<ResourceSummary>>;
}

/// Project listing
#[async_trait]
pub trait ProjectSource: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<ProjectInfo>>;
}
