use std::sync::Arc;

use uuid::Uuid;

use super::context::RequestContext;
use super::error::HierarchyError;
use super::store::HierarchyStore;
use super::Level;

/// Blocks deletion of a node that still has direct children.
///
/// The check and the delete that follows are two separate store calls with no
/// transaction between them; a child created in that window is not seen. A
/// store that needs strict guarantees has to make its delete conditional.
pub struct DeletionGuard<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for DeletionGuard<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> DeletionGuard<S>
where
    S: HierarchyStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// `Ok(())` when nothing references the node, `InUse(level)` otherwise.
    pub async fn can_delete(&self, ctx: &RequestContext, level: Level, id: Uuid) -> Result<(), HierarchyError> {
        for &child in level.dependents() {
            ctx.check()?;
            let count = self.store.count_children(ctx, level, child, id).await.map_err(|e| {
                tracing::error!("guard: counting {} children of {} {} failed: {}", child, level, id, e);
                HierarchyError::from(e)
            })?;

            if count > 0 {
                tracing::warn!("guard: {} {} is referenced by {} {} row(s)", level, id, count, child);
                return Err(HierarchyError::InUse(level));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeStore;

    #[tokio::test]
    async fn branch_with_department_is_in_use() {
        let store = Arc::new(FakeStore::new());
        let tree = store.seed_tree();
        let guard = DeletionGuard::new(Arc::clone(&store));
        let ctx = RequestContext::default();

        assert_eq!(
            guard.can_delete(&ctx, Level::Branch, tree.branch).await,
            Err(HierarchyError::InUse(Level::Branch))
        );

        store.remove_department(tree.department);
        assert_eq!(guard.can_delete(&ctx, Level::Branch, tree.branch).await, Ok(()));
    }

    #[tokio::test]
    async fn branch_with_direct_user_is_in_use() {
        let store = Arc::new(FakeStore::new());
        let tree = store.seed_tree();
        store.remove_department(tree.department);
        store.add_user(tree.branch, None);
        let guard = DeletionGuard::new(Arc::clone(&store));

        assert_eq!(
            guard.can_delete(&RequestContext::default(), Level::Branch, tree.branch).await,
            Err(HierarchyError::InUse(Level::Branch))
        );
    }

    #[tokio::test]
    async fn each_level_reports_its_own_reason() {
        let store = Arc::new(FakeStore::new());
        let tree = store.seed_tree();
        store.add_user(tree.branch, Some(tree.department));
        let guard = DeletionGuard::new(Arc::clone(&store));
        let ctx = RequestContext::default();

        let shop = guard.can_delete(&ctx, Level::Shop, tree.shop).await.unwrap_err();
        assert_eq!(shop.code(), "shop_in_use");
        let region = guard.can_delete(&ctx, Level::Region, tree.region).await.unwrap_err();
        assert_eq!(region.code(), "region_in_use");
        let department = guard.can_delete(&ctx, Level::Department, tree.department).await.unwrap_err();
        assert_eq!(department.code(), "department_in_use");
    }

    #[tokio::test]
    async fn leaf_nodes_pass() {
        let store = Arc::new(FakeStore::new());
        let tree = store.seed_tree();
        let guard = DeletionGuard::new(Arc::clone(&store));
        let ctx = RequestContext::default();

        assert_eq!(guard.can_delete(&ctx, Level::Department, tree.department).await, Ok(()));
        assert_eq!(guard.can_delete(&ctx, Level::User, Uuid::new_v4()).await, Ok(()));
    }

    #[tokio::test]
    async fn count_failure_is_unavailable_not_in_use() {
        let store = Arc::new(FakeStore::new());
        let tree = store.seed_tree();
        store.fail_with_outage();
        let guard = DeletionGuard::new(Arc::clone(&store));

        let err = guard
            .can_delete(&RequestContext::default(), Level::Region, tree.region)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
