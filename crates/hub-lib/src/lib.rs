//! FinOps hub engine
//!
//! This crate provides the core functionality for:
//! - Idle classification over daily utilization profiles
//! - Zombie resource detection (idle VMs, unattached disks, unused static IPs)
//! - Monthly waste estimation from an injectable price table
//! - Normalization of vendor recommendations
//! - Multi-zone report aggregation with contained partial failures
//! - Health checks and observability

pub mod classifier;
pub mod detector;
pub mod error;
pub mod health;
pub mod inventory;
pub mod location;
pub mod models;
pub mod observability;
pub mod pricing;
pub mod recommendations;
pub mod report;
pub mod sources;

pub use classifier::{MissingTelemetryPolicy, TimeSeriesClassifier};
pub use detector::{DetectorConfig, ZombieDetector, ZoneDetection};
pub use error::{HubError, HubResult};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use inventory::InventoryService;
pub use location::Zone;
pub use models::*;
pub use observability::{HubMetrics, StructuredLogger};
pub use pricing::{PricingConfig, WasteCostEstimator};
pub use recommendations::{RawRecommendation, RecommendationNormalizer};
pub use report::{AggregatorConfig, BuildOptions, ReportAggregator};
pub use sources::{Snapshot, SnapshotSource};
