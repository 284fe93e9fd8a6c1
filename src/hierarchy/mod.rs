//! Hierarchy resolution and authorization scoping.
//!
//! Shop → Region → Branch → Department → User. Everything in this module is
//! request-scoped and holds no mutable state; the store handle is the only
//! thing shared between requests.

pub mod cascade;
pub mod context;
pub mod error;
pub mod guard;
pub mod policy;
pub mod scope;
pub mod store;

pub use cascade::{CascadeResolver, PlacementRequest};
pub use context::RequestContext;
pub use error::{HierarchyError, StoreError};
pub use guard::DeletionGuard;
pub use policy::{authorize, Action, Decision, DenyReason, Target};
pub use scope::{Role, Scope, ScopeClaims};
pub use store::HierarchyStore;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Levels of the hierarchy, ordered root first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Shop,
    Region,
    Branch,
    Department,
    User,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Shop => "shop",
            Level::Region => "region",
            Level::Branch => "branch",
            Level::Department => "department",
            Level::User => "user",
        }
    }

    /// Child levels whose rows hold a direct reference to a node of this level.
    pub fn dependents(&self) -> &'static [Level] {
        match self {
            Level::Shop => &[Level::Region],
            Level::Region => &[Level::Branch],
            Level::Branch => &[Level::Department, Level::User],
            Level::Department => &[Level::User],
            Level::User => &[],
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved ancestor chain of a node.
///
/// Produced by the [`CascadeResolver`]; never assembled from caller input
/// once a Branch or Department is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ancestry {
    pub shop_id: Uuid,
    pub region_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

impl Ancestry {
    pub fn shop(shop_id: Uuid) -> Self {
        Self {
            shop_id,
            region_id: None,
            branch_id: None,
            department_id: None,
        }
    }

    pub fn region(shop_id: Uuid, region_id: Uuid) -> Self {
        Self {
            region_id: Some(region_id),
            ..Self::shop(shop_id)
        }
    }

    pub fn branch(shop_id: Uuid, region_id: Uuid, branch_id: Uuid) -> Self {
        Self {
            branch_id: Some(branch_id),
            ..Self::region(shop_id, region_id)
        }
    }

    pub fn department(shop_id: Uuid, region_id: Uuid, branch_id: Uuid, department_id: Uuid) -> Self {
        Self {
            department_id: Some(department_id),
            ..Self::branch(shop_id, region_id, branch_id)
        }
    }
}

/// Placement of a user: always Shop, Region and Branch, optionally a Department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub shop_id: Uuid,
    pub region_id: Uuid,
    pub branch_id: Uuid,
    pub department_id: Option<Uuid>,
}

impl From<Placement> for Ancestry {
    fn from(p: Placement) -> Self {
        Self {
            shop_id: p.shop_id,
            region_id: Some(p.region_id),
            branch_id: Some(p.branch_id),
            department_id: p.department_id,
        }
    }
}
