use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Level;

/// Roles an actor can hold. Closed set; the policy table matches on it
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Manager,
    RegionManager,
    BranchManager,
    HeadOfDepartment,
    Employee,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Manager,
        Role::RegionManager,
        Role::BranchManager,
        Role::HeadOfDepartment,
        Role::Employee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::RegionManager => "region_manager",
            Role::BranchManager => "branch_manager",
            Role::HeadOfDepartment => "head_of_department",
            Role::Employee => "employee",
        }
    }

    /// Level the role's authority is anchored at.
    pub fn binding_level(&self) -> Level {
        match self {
            Role::Manager => Level::Shop,
            Role::RegionManager => Level::Region,
            Role::BranchManager | Role::Employee => Level::Branch,
            Role::HeadOfDepartment => Level::Department,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Accepts the snake_case wire form and the legacy upper-case form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manager" => Ok(Role::Manager),
            "region_manager" => Ok(Role::RegionManager),
            "branch_manager" => Ok(Role::BranchManager),
            "head_of_department" => Ok(Role::HeadOfDepartment),
            "employee" => Ok(Role::Employee),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Decoded token claims as far as scoping is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeClaims {
    pub actor_id: Uuid,
    pub role: Role,
    pub shop_id: Option<Uuid>,
    pub region_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

/// The subtree of the hierarchy an authenticated actor may see or act on.
///
/// Built once per request by [`Scope::derive`] and never refreshed. Only the
/// fields the role implies are populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scope {
    actor_id: Uuid,
    role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    shop_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    department_id: Option<Uuid>,
}

impl Scope {
    pub fn derive(claims: &ScopeClaims) -> Self {
        let (region_id, branch_id, department_id) = match claims.role {
            Role::Manager => (None, None, None),
            Role::RegionManager => (claims.region_id, None, None),
            Role::BranchManager | Role::Employee => (claims.region_id, claims.branch_id, None),
            Role::HeadOfDepartment => (claims.region_id, claims.branch_id, claims.department_id),
        };

        Self {
            actor_id: claims.actor_id,
            role: claims.role,
            shop_id: claims.shop_id,
            region_id,
            branch_id,
            department_id,
        }
    }

    #[inline]
    pub fn actor_id(&self) -> Uuid {
        self.actor_id
    }
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }
    #[inline]
    pub fn shop_id(&self) -> Option<Uuid> {
        self.shop_id
    }
    #[inline]
    pub fn region_id(&self) -> Option<Uuid> {
        self.region_id
    }
    #[inline]
    pub fn branch_id(&self) -> Option<Uuid> {
        self.branch_id
    }
    #[inline]
    pub fn department_id(&self) -> Option<Uuid> {
        self.department_id
    }

    pub fn binding_level(&self) -> Level {
        self.role.binding_level()
    }

    /// ID at the binding level, if the token carried one.
    pub fn binding_id(&self) -> Option<Uuid> {
        match self.binding_level() {
            Level::Shop => self.shop_id,
            Level::Region => self.region_id,
            Level::Branch => self.branch_id,
            Level::Department => self.department_id,
            Level::User => None,
        }
    }

    /// True when the token carried the ID the role needs to be anchored.
    pub fn is_bound(&self) -> bool {
        self.binding_id().is_some()
    }
}
