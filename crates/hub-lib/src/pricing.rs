//! Static price table and waste cost estimation
//!
//! Figures are monthly approximations, not billing-grade prices. The table
//! is loaded once and shared read-only; swapping pricing snapshots is a
//! configuration change.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Monthly prices used by the waste estimators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Currency code for every figure in this table
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Monthly on-demand price per machine type
    #[serde(default = "default_machine_types")]
    pub machine_types: BTreeMap<String, Decimal>,
    /// Estimate for machine types missing from the table
    #[serde(default = "default_unknown_instance")]
    pub unknown_instance_monthly: Decimal,
    /// Persistent disk price per GB-month
    #[serde(default = "default_disk_per_gb")]
    pub disk_per_gb_monthly: Decimal,
    /// Fee for a reserved but unassigned static address
    #[serde(default = "default_static_address")]
    pub static_address_monthly: Decimal,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_machine_types() -> BTreeMap<String, Decimal> {
    [
        ("e2-micro", Decimal::new(611, 2)),
        ("e2-small", Decimal::new(1223, 2)),
        ("e2-medium", Decimal::new(2446, 2)),
        ("e2-standard-2", Decimal::new(4892, 2)),
        ("n1-standard-1", Decimal::new(2427, 2)),
        ("n2-standard-2", Decimal::new(4854, 2)),
        ("c2-standard-4", Decimal::new(12663, 2)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn default_unknown_instance() -> Decimal {
    Decimal::new(20, 0)
}

fn default_disk_per_gb() -> Decimal {
    Decimal::new(4, 2)
}

fn default_static_address() -> Decimal {
    Decimal::new(250, 2)
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            machine_types: default_machine_types(),
            unknown_instance_monthly: default_unknown_instance(),
            disk_per_gb_monthly: default_disk_per_gb(),
            static_address_monthly: default_static_address(),
        }
    }
}

impl PricingConfig {
    /// Load a pricing snapshot from a TOML, YAML or JSON file; fields absent
    /// from the file keep their built-in defaults
    pub fn load(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .with_context(|| format!("Failed to read pricing file {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("Invalid pricing file {}", path.display()))
    }
}

/// Maps classified waste to an estimated monthly cost
#[derive(Debug, Clone)]
pub struct WasteCostEstimator {
    pricing: Arc<PricingConfig>,
}

impl WasteCostEstimator {
    pub fn new(pricing: Arc<PricingConfig>) -> Self {
        Self { pricing }
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    pub fn currency(&self) -> &str {
        &self.pricing.currency
    }

    /// Monthly cost of an idle instance; `machine_type` may be a bare name
    /// (`e2-medium`) or a resource path ending in one
    pub fn instance_monthly(&self, machine_type: &str) -> Decimal {
        self.pricing
            .machine_types
            .get(machine_type_name(machine_type))
            .copied()
            .unwrap_or(self.pricing.unknown_instance_monthly)
    }

    pub fn disk_monthly(&self, size_gb: u64) -> Decimal {
        Decimal::from(size_gb) * self.pricing.disk_per_gb_monthly
    }

    pub fn static_address_monthly(&self) -> Decimal {
        self.pricing.static_address_monthly
    }
}

impl Default for WasteCostEstimator {
    fn default() -> Self {
        Self::new(Arc::new(PricingConfig::default()))
    }
}

/// `zones/us-central1-a/machineTypes/e2-medium` -> `e2-medium`
pub fn machine_type_name(machine_type: &str) -> &str {
    machine_type
        .rsplit('/')
        .next()
        .unwrap_or(machine_type)
        .trim()
}
