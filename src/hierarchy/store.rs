use async_trait::async_trait;
use uuid::Uuid;

use super::context::RequestContext;
use super::error::StoreError;
use super::Level;
use crate::models::{Branch, Department, Region};

/// Read side of the hierarchy the resolver and the deletion guard depend on.
///
/// Implementations bound each call with [`RequestContext::run`] so that a
/// cancelled request or a slow backend surfaces as a `StoreError` rather than
/// hanging the caller.
#[async_trait]
pub trait HierarchyStore: Send + Sync {
    async fn get_region(&self, ctx: &RequestContext, id: Uuid) -> Result<Region, StoreError>;

    async fn get_branch(&self, ctx: &RequestContext, id: Uuid) -> Result<Branch, StoreError>;

    async fn get_department(&self, ctx: &RequestContext, id: Uuid) -> Result<Department, StoreError>;

    /// Number of `child_level` rows whose parent reference at `parent_level`
    /// equals `parent_id`.
    async fn count_children(
        &self,
        ctx: &RequestContext,
        parent_level: Level,
        child_level: Level,
        parent_id: Uuid,
    ) -> Result<i64, StoreError>;
}
