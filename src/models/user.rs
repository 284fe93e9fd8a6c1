use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::hierarchy::{Ancestry, Placement, Role};

/// A user bound to exactly one Shop, Region and Branch, and at most one
/// Department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub shop_id: Uuid,
    pub region_id: Uuid,
    pub branch_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn placement(&self) -> Placement {
        Placement {
            shop_id: self.shop_id,
            region_id: self.region_id,
            branch_id: self.branch_id,
            department_id: self.department_id,
        }
    }

    pub fn ancestry(&self) -> Ancestry {
        self.placement().into()
    }
}
