//! Resource inventory and project listing
//!
//! Thin filters over the inventory and project collaborators. Unlike report
//! building there is nothing partial to return, so a collaborator failure
//! becomes [`HubError::SourceUnavailable`].

use crate::error::{HubError, HubResult};
use crate::location::{is_scoped_location, Zone};
use crate::models::{ProjectInfo, ResourceSummary};
use crate::sources::{InventorySource, ProjectSource};
use std::sync::Arc;
use tracing::{info, warn};

const EXCLUDED_STATES: &[&str] = &["TERMINATED", "DELETED"];
const ACTIVE: &str = "ACTIVE";

/// Whether an asset at `location` belongs to the requested zones. Assets in
/// a requested zone or its region match; multi-region labels always match.
pub fn location_matches(location: &str, zones: &[Zone]) -> bool {
    if !is_scoped_location(location) {
        return true;
    }
    zones
        .iter()
        .any(|z| z.as_str() == location || z.region() == location)
}

/// Drop terminated/deleted assets and, when zones are given, assets outside
/// them. Input order is preserved.
pub fn filter_resources(
    resources: Vec<ResourceSummary>,
    zones: Option<&[Zone]>,
) -> Vec<ResourceSummary> {
    resources
        .into_iter()
        .filter(|r| {
            !EXCLUDED_STATES
                .iter()
                .any(|s| r.state.eq_ignore_ascii_case(s))
        })
        .filter(|r| zones.map_or(true, |zones| location_matches(&r.location, zones)))
        .collect()
}

pub fn active_projects(projects: Vec<ProjectInfo>) -> Vec<ProjectInfo> {
    projects
        .into_iter()
        .filter(|p| p.state.eq_ignore_ascii_case(ACTIVE))
        .collect()
}

pub struct InventoryService {
    inventory: Arc<dyn InventorySource>,
    projects: Arc<dyn ProjectSource>,
}

impl InventoryService {
    pub fn new(inventory: Arc<dyn InventorySource>, projects: Arc<dyn ProjectSource>) -> Self {
        Self {
            inventory,
            projects,
        }
    }

    /// List a project's live assets. `zones` is the raw comma-separated
    /// filter; empty or absent means no filter.
    pub async fn resources(
        &self,
        project_id: &str,
        zones: Option<&str>,
    ) -> HubResult<Vec<ResourceSummary>> {
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Err(HubError::EmptyProjectId);
        }
        let zones = match zones.map(str::trim).filter(|z| !z.is_empty()) {
            Some(raw) => Some(Zone::parse_list(raw)?),
            None => None,
        };

        let resources = self.inventory.list_resources(project_id).await.map_err(|e| {
            warn!(project_id = %project_id, error = %format!("{:#}", e), "Inventory listing failed");
            HubError::SourceUnavailable(format!("{:#}", e))
        })?;

        let total = resources.len();
        let filtered = filter_resources(resources, zones.as_deref());
        info!(
            project_id = %project_id,
            total = total,
            returned = filtered.len(),
            "Listed project resources"
        );
        Ok(filtered)
    }

    pub async fn projects(&self) -> HubResult<Vec<ProjectInfo>> {
        let projects = self.projects.list_projects().await.map_err(|e| {
            warn!(error = %format!("{:#}", e), "Project listing failed");
            HubError::SourceUnavailable(format!("{:#}", e))
        })?;
        Ok(active_projects(projects))
    }
}
