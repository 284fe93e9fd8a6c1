use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use super::context::RequestContext;
use super::error::HierarchyError;
use super::scope::Scope;
use super::store::HierarchyStore;
use super::{Ancestry, Level, Placement};
use crate::models::{Branch, Department, Region};

/// IDs a caller supplied when placing a user. Only `department_id` and
/// `branch_id` are ever used to resolve; the rest are accepted on the wire
/// and ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PlacementRequest {
    pub shop_id: Option<Uuid>,
    pub region_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

impl PlacementRequest {
    pub fn is_empty(&self) -> bool {
        self.branch_id.is_none() && self.department_id.is_none()
    }
}

/// Walks from a Department or Branch up to its Shop.
///
/// Each hop is one point lookup; the first failing hop aborts the walk and
/// nothing partial is returned.
pub struct CascadeResolver<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for CascadeResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> CascadeResolver<S>
where
    S: HierarchyStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Department → Branch → Region → Shop.
    pub async fn resolve_from_department(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        department_id: Uuid,
    ) -> Result<Placement, HierarchyError> {
        let department = self.department(ctx, scope, department_id).await?;
        let branch = self.branch(ctx, scope, department.branch_id).await?;
        let region = self.region(ctx, scope, branch.region_id).await?;

        Ok(Placement {
            shop_id: region.shop_id,
            region_id: region.id,
            branch_id: branch.id,
            department_id: Some(department.id),
        })
    }

    /// Branch → Region → Shop.
    pub async fn resolve_from_branch(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        branch_id: Uuid,
    ) -> Result<Placement, HierarchyError> {
        let branch = self.branch(ctx, scope, branch_id).await?;
        let region = self.region(ctx, scope, branch.region_id).await?;

        Ok(Placement {
            shop_id: region.shop_id,
            region_id: region.id,
            branch_id: branch.id,
            department_id: None,
        })
    }

    /// Region → Shop.
    pub async fn resolve_from_region(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        region_id: Uuid,
    ) -> Result<Ancestry, HierarchyError> {
        let region = self.region(ctx, scope, region_id).await?;
        Ok(Ancestry::region(region.shop_id, region.id))
    }

    /// Ancestor chain of an existing node, ending at the node itself.
    ///
    /// A Shop is its own chain and costs no lookup. Users are not hierarchy
    /// nodes here; they carry their placement on the row.
    pub async fn ancestry_of(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        level: Level,
        id: Uuid,
    ) -> Result<Ancestry, HierarchyError> {
        match level {
            Level::Shop => Ok(Ancestry::shop(id)),
            Level::Region => self.resolve_from_region(ctx, scope, id).await,
            Level::Branch => Ok(self.resolve_from_branch(ctx, scope, id).await?.into()),
            Level::Department => Ok(self.resolve_from_department(ctx, scope, id).await?.into()),
            Level::User => Err(HierarchyError::NotFound { level, id }),
        }
    }

    /// Resolve where a user should be placed.
    ///
    /// A department wins over a branch: the branch (and everything above it)
    /// is recomputed from the department, so a caller cannot put a user in a
    /// department of a branch other than the one it belongs to. With neither
    /// supplied the request is rejected instead of trusting caller-supplied
    /// shop/region IDs.
    pub async fn resolve_placement(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        request: PlacementRequest,
    ) -> Result<Placement, HierarchyError> {
        if let Some(department_id) = request.department_id {
            if request.branch_id.is_some() {
                tracing::debug!(
                    "placement: department {} takes precedence over supplied branch",
                    department_id
                );
            }
            return self.resolve_from_department(ctx, scope, department_id).await;
        }

        if let Some(branch_id) = request.branch_id {
            return self.resolve_from_branch(ctx, scope, branch_id).await;
        }

        tracing::warn!(
            "placement rejected for actor {}: no department_id or branch_id supplied",
            scope.actor_id()
        );
        Err(HierarchyError::PlacementRequired)
    }

    async fn department(&self, ctx: &RequestContext, scope: &Scope, id: Uuid) -> Result<Department, HierarchyError> {
        ctx.check()?;
        self.store.get_department(ctx, id).await.map_err(|e| {
            tracing::warn!("cascade: department {} lookup failed for actor {}: {}", id, scope.actor_id(), e);
            HierarchyError::from_store(e, Level::Department, id)
        })
    }

    async fn branch(&self, ctx: &RequestContext, scope: &Scope, id: Uuid) -> Result<Branch, HierarchyError> {
        ctx.check()?;
        self.store.get_branch(ctx, id).await.map_err(|e| {
            tracing::warn!("cascade: branch {} lookup failed for actor {}: {}", id, scope.actor_id(), e);
            HierarchyError::from_store(e, Level::Branch, id)
        })
    }

    async fn region(&self, ctx: &RequestContext, scope: &Scope, id: Uuid) -> Result<Region, HierarchyError> {
        ctx.check()?;
        self.store.get_region(ctx, id).await.map_err(|e| {
            tracing::warn!("cascade: region {} lookup failed for actor {}: {}", id, scope.actor_id(), e);
            HierarchyError::from_store(e, Level::Region, id)
        })
    }
}
