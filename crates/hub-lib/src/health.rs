//! Component health for the hub
//!
//! One component per collaborator family. Report diagnostics degrade the
//! components they blame, and a report that failed in every zone marks all
//! report components unhealthy. The next successful report restores them.

use crate::models::{FailureScope, ScanFailure};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Component status, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Some zones or scopes failed in the last report
    Degraded,
    /// The last report failed in every zone
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// `/healthz` body; `status` is the worst component status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub mod components {
    pub const RECOMMENDER: &str = "recommender";
    pub const COMPUTE: &str = "compute";
    pub const MONITORING: &str = "monitoring";
    pub const INVENTORY: &str = "inventory";

    /// Components touched by report building
    pub const REPORT: &[&str] = &[RECOMMENDER, COMPUTE, MONITORING];
}

/// Component blamed for a failure in `scope`
pub fn component_for(scope: FailureScope) -> &'static str {
    match scope {
        FailureScope::Recommendations => components::RECOMMENDER,
        FailureScope::IdleInstances => components::MONITORING,
        FailureScope::UnattachedDisks | FailureScope::UnusedAddresses | FailureScope::Zone => {
            components::COMPUTE
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<AtomicBool>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `name` as healthy
    pub async fn register(&self, name: &str) {
        self.set(name, ComponentStatus::Healthy, None).await;
    }

    pub async fn set_healthy(&self, name: &str) {
        self.set(name, ComponentStatus::Healthy, None).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.set(name, ComponentStatus::Degraded, Some(message.into()))
            .await;
    }

    async fn set(&self, name: &str, status: ComponentStatus, message: Option<String>) {
        self.components
            .write()
            .await
            .insert(name.to_string(), ComponentHealth::new(status, message));
    }

    /// Refresh report components from a successful report: components with
    /// failures are degraded, the rest are healthy again
    pub async fn apply_diagnostics(&self, diagnostics: &[ScanFailure]) {
        let mut failing: HashMap<&str, Vec<String>> = HashMap::new();
        for failure in diagnostics {
            failing
                .entry(component_for(failure.scope))
                .or_default()
                .push(format!("{} {}", failure.zone, failure.scope.as_str()));
        }

        let mut registered = self.components.write().await;
        for name in components::REPORT {
            let health = match failing.get(name) {
                Some(scopes) => ComponentHealth::new(
                    ComponentStatus::Degraded,
                    Some(format!("Failures in {}", scopes.join(", "))),
                ),
                None => ComponentHealth::new(ComponentStatus::Healthy, None),
            };
            registered.insert(name.to_string(), health);
        }
    }

    /// A report failed in every zone: no report component produced anything
    pub async fn record_outage(&self, reason: &str) {
        let mut registered = self.components.write().await;
        for name in components::REPORT {
            registered.insert(
                name.to_string(),
                ComponentHealth::new(ComponentStatus::Unhealthy, Some(reason.to_string())),
            );
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        HealthResponse { status, components }
    }

    /// Ready once startup finished. Collaborator outages show on `/healthz`
    /// only, so an unhealthy hub keeps taking the requests that let it recover.
    pub fn readiness(&self) -> ReadinessResponse {
        if self.ready.load(Ordering::SeqCst) {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        } else {
            ReadinessResponse {
                ready: false,
                reason: Some("Hub not yet initialized".to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(zone: &str, scope: FailureScope) -> ScanFailure {
        ScanFailure {
            zone: zone.to_string(),
            scope,
            message: "permission denied".to_string(),
        }
    }

    async fn registry_with_report_components() -> HealthRegistry {
        let registry = HealthRegistry::new();
        for name in components::REPORT {
            registry.register(name).await;
        }
        registry
    }

    #[tokio::test]
    async fn test_empty_registry_is_healthy() {
        let health = HealthRegistry::new().health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_overall_status_is_worst_component() {
        let registry = registry_with_report_components().await;
        registry.register(components::INVENTORY).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);

        registry
            .set_degraded(components::INVENTORY, "Asset API disabled")
            .await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);

        registry.record_outage("every zone failed").await;
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Unhealthy);
        assert_eq!(
            health.components[components::INVENTORY].status,
            ComponentStatus::Degraded
        );

        registry.set_healthy(components::INVENTORY).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_outage_marks_report_components_unhealthy() {
        let registry = registry_with_report_components().await;

        registry
            .record_outage("us-central1-a zone: deadline exceeded")
            .await;

        let health = registry.health().await;
        for name in components::REPORT {
            assert_eq!(health.components[*name].status, ComponentStatus::Unhealthy);
            assert_eq!(
                health.components[*name].message.as_deref(),
                Some("us-central1-a zone: deadline exceeded")
            );
        }
    }

    #[tokio::test]
    async fn test_successful_report_recovers_from_outage() {
        let registry = registry_with_report_components().await;
        registry.record_outage("every zone failed").await;

        registry
            .apply_diagnostics(&[failure("us-central1-b", FailureScope::UnattachedDisks)])
            .await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(
            health.components[components::COMPUTE].message.as_deref(),
            Some("Failures in us-central1-b unattached_disks")
        );
        assert_eq!(
            health.components[components::RECOMMENDER].status,
            ComponentStatus::Healthy
        );

        registry.apply_diagnostics(&[]).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_apply_diagnostics_degrades_failing_components() {
        let registry = HealthRegistry::new();
        let failures = vec![
            failure("us-central1-a", FailureScope::Recommendations),
            failure("us-central1-b", FailureScope::Recommendations),
        ];

        registry.apply_diagnostics(&failures).await;

        let health = registry.health().await;
        assert_eq!(
            health.components[components::RECOMMENDER]
                .message
                .as_deref(),
            Some("Failures in us-central1-a recommendations, us-central1-b recommendations")
        );
        assert_eq!(
            health.components[components::MONITORING].status,
            ComponentStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_readiness_follows_startup_only() {
        let registry = registry_with_report_components().await;
        assert!(!registry.readiness().ready);

        registry.set_ready(true);
        registry.record_outage("every zone failed").await;

        let readiness = registry.readiness();
        assert!(readiness.ready);
        assert!(readiness.reason.is_none());
    }

    #[test]
    fn test_component_for_scope() {
        assert_eq!(
            component_for(FailureScope::IdleInstances),
            components::MONITORING
        );
        assert_eq!(component_for(FailureScope::Zone), components::COMPUTE);
        assert_eq!(
            component_for(FailureScope::Recommendations),
            components::RECOMMENDER
        );
    }
}
