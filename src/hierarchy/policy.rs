use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::HierarchyError;
use super::scope::{Role, Scope};
use super::{Ancestry, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

/// What a request acts on: a level plus the resolved ancestor chain.
///
/// For Read/Update/Delete the chain ends at the node itself; for Create it is
/// the chain of the parent the new node will hang under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub level: Level,
    pub ancestry: Ancestry,
}

impl Target {
    pub fn new(level: Level, ancestry: Ancestry) -> Self {
        Self { level, ancestry }
    }

    fn id_at(&self, level: Level) -> Option<Uuid> {
        match level {
            Level::Shop => Some(self.ancestry.shop_id),
            Level::Region => self.ancestry.region_id,
            Level::Branch => self.ancestry.branch_id,
            Level::Department => self.ancestry.department_id,
            Level::User => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    ScopeMismatch,
    InsufficientRole,
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::ScopeMismatch => "scope_mismatch",
            DenyReason::InsufficientRole => "insufficient_role",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), HierarchyError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::ScopeMismatch) => Err(HierarchyError::ScopeMismatch),
            Decision::Deny(DenyReason::InsufficientRole) => Err(HierarchyError::InsufficientRole),
        }
    }
}

/// Decide whether `scope` may perform `action` on `target`.
///
/// Pure: the answer depends only on the three arguments. Rules are checked in
/// order and the first that fires wins:
///
/// 1. Creating a Shop is a Manager's alone; there is no shop yet to match.
/// 2. A target above the role's binding level is `insufficient_role`.
/// 3. Employees may only read.
/// 4. The target's ancestor at the binding level must equal the scope's bound
///    ID, otherwise `scope_mismatch`. A Manager is bound to its Shop.
pub fn authorize(scope: &Scope, action: Action, target: &Target) -> Decision {
    let binding = match scope.role() {
        Role::Manager if action == Action::Create && target.level == Level::Shop => return Decision::Allow,
        Role::Manager => Level::Shop,
        Role::RegionManager => Level::Region,
        Role::BranchManager => Level::Branch,
        Role::HeadOfDepartment => Level::Department,
        Role::Employee => {
            if target.level != Level::User || action != Action::Read {
                return Decision::Deny(DenyReason::InsufficientRole);
            }
            Level::Branch
        }
    };

    if target.level < binding {
        return Decision::Deny(DenyReason::InsufficientRole);
    }

    match (scope.binding_id(), target.id_at(binding)) {
        (Some(bound), Some(actual)) if bound == actual => Decision::Allow,
        _ => Decision::Deny(DenyReason::ScopeMismatch),
    }
}
