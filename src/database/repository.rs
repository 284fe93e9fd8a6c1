use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::hierarchy::{HierarchyStore, Placement, RequestContext, Role, StoreError};
use crate::models::{Branch, Department, Region, Shop, User};

#[derive(Debug, Clone, Deserialize)]
pub struct NewShop {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShopChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub alias: Option<String>,
}

/// A user row ready to insert. The placement has already been resolved and
/// the password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub placement: Placement,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    /// Replaces all four placement columns at once, including clearing the
    /// department when `department_id` is `None`.
    pub placement: Option<Placement>,
}

/// Which subtree a user listing is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFilter {
    Shop(Uuid),
    Region(Uuid),
    Branch(Uuid),
    Department(Uuid),
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        match *self {
            UserFilter::Shop(id) => user.shop_id == id,
            UserFilter::Region(id) => user.region_id == id,
            UserFilter::Branch(id) => user.branch_id == id,
            UserFilter::Department(id) => user.department_id == Some(id),
        }
    }

    pub(crate) fn column(&self) -> (&'static str, Uuid) {
        match *self {
            UserFilter::Shop(id) => ("shop_id", id),
            UserFilter::Region(id) => ("region_id", id),
            UserFilter::Branch(id) => ("branch_id", id),
            UserFilter::Department(id) => ("department_id", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub const MAX_LIMIT: i64 = 500;

    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(100).clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Full persistence surface for the hierarchy. The read-side
/// [`HierarchyStore`] methods are inherited so a single handle serves the
/// resolver, the deletion guard and the CRUD services.
///
/// Writes that violate a parent reference or a unique column fail with
/// `StoreError::Conflict`; updates and deletes of a missing id fail with
/// `StoreError::NotFound`.
#[async_trait]
pub trait HierarchyRepository: HierarchyStore {
    async fn create_shop(&self, ctx: &RequestContext, input: NewShop) -> Result<Shop, StoreError>;
    async fn get_shop(&self, ctx: &RequestContext, id: Uuid) -> Result<Shop, StoreError>;
    async fn update_shop(&self, ctx: &RequestContext, id: Uuid, changes: ShopChanges) -> Result<Shop, StoreError>;
    async fn delete_shop(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError>;

    async fn create_region(&self, ctx: &RequestContext, shop_id: Uuid, name: String) -> Result<Region, StoreError>;
    async fn rename_region(&self, ctx: &RequestContext, id: Uuid, name: String) -> Result<Region, StoreError>;
    async fn delete_region(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError>;

    async fn create_branch(&self, ctx: &RequestContext, region_id: Uuid, name: String) -> Result<Branch, StoreError>;
    async fn rename_branch(&self, ctx: &RequestContext, id: Uuid, name: String) -> Result<Branch, StoreError>;
    async fn delete_branch(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError>;

    async fn create_department(
        &self,
        ctx: &RequestContext,
        branch_id: Uuid,
        name: String,
    ) -> Result<Department, StoreError>;
    async fn rename_department(&self, ctx: &RequestContext, id: Uuid, name: String) -> Result<Department, StoreError>;
    async fn delete_department(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError>;

    async fn create_user(&self, ctx: &RequestContext, input: NewUser) -> Result<User, StoreError>;
    async fn get_user(&self, ctx: &RequestContext, id: Uuid) -> Result<User, StoreError>;
    async fn find_user_by_username(&self, ctx: &RequestContext, username: &str) -> Result<Option<User>, StoreError>;
    async fn update_user(&self, ctx: &RequestContext, id: Uuid, changes: UserChanges) -> Result<User, StoreError>;
    async fn delete_user(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError>;
    async fn list_users(&self, ctx: &RequestContext, filter: UserFilter, page: Page) -> Result<Vec<User>, StoreError>;

    /// Cheap liveness probe used by `/health`.
    async fn ping(&self, ctx: &RequestContext) -> Result<(), StoreError>;
}
