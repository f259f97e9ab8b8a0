//! Caller-visible errors
//!
//! Collaborator failures never surface here: they are folded into
//! [`ScanFailure`](crate::models::ScanFailure) diagnostics. Only request
//! validation, the every-zone-failed condition and failed inventory or
//! project listings reach the caller.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("project_id must not be empty")]
    EmptyProjectId,

    #[error("at least one zone is required")]
    NoZones,

    #[error("malformed zone identifier '{0}'")]
    InvalidLocation(String),

    #[error("every requested zone failed: {0}")]
    AllZonesFailed(String),

    /// A listing with no partial result to fall back on (inventory, projects)
    #[error("collaborator unavailable: {0}")]
    SourceUnavailable(String),
}

impl HubError {
    /// True for errors caused by the request itself rather than by collaborators
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            HubError::EmptyProjectId | HubError::NoZones | HubError::InvalidLocation(_)
        )
    }
}

pub type HubResult<T> = std::result::Result<T, HubError>;
