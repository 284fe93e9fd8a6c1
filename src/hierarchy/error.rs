use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use super::Level;

/// Failures reported by a [`HierarchyStore`](super::HierarchyStore) implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// A uniqueness or referential constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("request cancelled")]
    Cancelled,
}

/// Outcomes of the resolution, scoping and deletion-guard engine.
///
/// Every variant maps to one stable, machine-readable reason code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("{level} {id} not found")]
    NotFound { level: Level, id: Uuid },

    #[error("{0} is in use and cannot be deleted")]
    InUse(Level),

    #[error("target is outside the actor's scope")]
    ScopeMismatch,

    #[error("role cannot act at this level")]
    InsufficientRole,

    #[error("a department_id or branch_id is required to place a user")]
    PlacementRequired,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl HierarchyError {
    /// Map a store failure observed while looking up `level`/`id`.
    pub fn from_store(err: StoreError, level: Level, id: Uuid) -> Self {
        match err {
            StoreError::NotFound => HierarchyError::NotFound { level, id },
            other => HierarchyError::StoreUnavailable(other.to_string()),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            HierarchyError::NotFound { .. } => "not_found",
            HierarchyError::InUse(Level::Shop) => "shop_in_use",
            HierarchyError::InUse(Level::Region) => "region_in_use",
            HierarchyError::InUse(Level::Branch) => "branch_in_use",
            HierarchyError::InUse(Level::Department) => "department_in_use",
            HierarchyError::InUse(Level::User) => "user_in_use",
            HierarchyError::ScopeMismatch => "scope_mismatch",
            HierarchyError::InsufficientRole => "insufficient_role",
            HierarchyError::PlacementRequired => "placement_required",
            HierarchyError::StoreUnavailable(_) => "store_unavailable",
        }
    }

    /// Only infrastructure failures are worth retrying; everything else is a
    /// terminal answer about the request itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HierarchyError::StoreUnavailable(_))
    }
}

impl From<StoreError> for HierarchyError {
    fn from(err: StoreError) -> Self {
        match err {
            // Callers that know the level use `from_store`; a bare NotFound here
            // came from a lookup with no node identity attached.
            StoreError::NotFound => HierarchyError::StoreUnavailable("unexpected missing record".to_string()),
            other => HierarchyError::StoreUnavailable(other.to_string()),
        }
    }
}
