//! Zone and region identifiers
//!
//! Zones look like `us-central1-a`; the enclosing region is everything
//! before the last hyphen (`us-central1`).

use crate::error::{HubError, HubResult};
use std::fmt;

/// A validated zone identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Zone {
    name: String,
    region_len: usize,
}

impl Zone {
    /// Parse a zone identifier, trimming surrounding whitespace
    pub fn parse(raw: &str) -> HubResult<Self> {
        let name = raw.trim();
        let Some((region, suffix)) = name.rsplit_once('-') else {
            return Err(HubError::InvalidLocation(raw.to_string()));
        };

        let well_formed = !region.is_empty()
            && !suffix.is_empty()
            && !region.starts_with('-')
            && !region.ends_with('-')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');

        if !well_formed {
            return Err(HubError::InvalidLocation(raw.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            region_len: region.len(),
        })
    }

    /// Parse a comma-separated zone list as sent by the HTTP surface
    pub fn parse_list(raw: &str) -> HubResult<Vec<Self>> {
        let zones: Vec<Zone> = raw
            .split(',')
            .map(str::trim)
            .filter(|z| !z.is_empty())
            .map(Zone::parse)
            .collect::<HubResult<_>>()?;

        if zones.is_empty() {
            return Err(HubError::NoZones);
        }
        Ok(zones)
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The region enclosing this zone
    pub fn region(&self) -> &str {
        &self.name[..self.region_len]
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Whether a location string names a zone or region (as opposed to
/// `global`, `US`, `EU` and other multi-region labels)
pub fn is_scoped_location(location: &str) -> bool {
    location.contains('-')
}
