use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use super::{require_email, require_password, require_text, ServiceError};
use crate::auth::password::hash_password;
use crate::database::repository::{HierarchyRepository, NewShop, NewUser, Page, ShopChanges, UserChanges, UserFilter};
use crate::hierarchy::{
    authorize, Action, Ancestry, CascadeResolver, Decision, DeletionGuard, HierarchyError, Level, Placement,
    PlacementRequest, RequestContext, Role, Scope, Target,
};
use crate::models::{Branch, Department, Region, Shop, User};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRegion {
    pub shop_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBranch {
    pub region_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDepartment {
    pub branch_id: Uuid,
    pub name: String,
}

/// Region, Branch and Department only ever change their name.
#[derive(Debug, Clone, Deserialize)]
pub struct Rename {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(flatten)]
    pub placement: PlacementRequest,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub branch_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

/// CRUD over the hierarchy. Every operation follows the same order:
/// resolve the target's ancestry, authorize, run the deletion guard for
/// deletes, then touch the repository.
pub struct HierarchyService<S: ?Sized> {
    repo: Arc<S>,
    resolver: CascadeResolver<S>,
    guard: DeletionGuard<S>,
}

impl<S: ?Sized> Clone for HierarchyService<S> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            resolver: self.resolver.clone(),
            guard: self.guard.clone(),
        }
    }
}

impl<S> HierarchyService<S>
where
    S: HierarchyRepository + ?Sized,
{
    pub fn new(repo: Arc<S>) -> Self {
        Self {
            resolver: CascadeResolver::new(Arc::clone(&repo)),
            guard: DeletionGuard::new(Arc::clone(&repo)),
            repo,
        }
    }

    pub fn resolver(&self) -> &CascadeResolver<S> {
        &self.resolver
    }

    // Shops

    pub async fn create_shop(&self, ctx: &RequestContext, scope: &Scope, input: NewShop) -> Result<Shop, ServiceError> {
        require_text("name", &input.name)?;
        require_text("code", &input.code)?;
        // A new shop has no ancestors to match against.
        permit(scope, Action::Create, Target::new(Level::Shop, Ancestry::shop(Uuid::nil())))?;

        let shop = self
            .repo
            .create_shop(ctx, input)
            .await
            .map_err(|e| ServiceError::from_store(e, Level::Shop, Uuid::nil()))?;
        tracing::info!("shop {} created by {}", shop.id, scope.actor_id());
        Ok(shop)
    }

    pub async fn get_shop(&self, ctx: &RequestContext, scope: &Scope, id: Uuid) -> Result<Shop, ServiceError> {
        permit(scope, Action::Read, Target::new(Level::Shop, Ancestry::shop(id)))?;
        self.repo
            .get_shop(ctx, id)
            .await
            .map_err(|e| ServiceError::from_store(e, Level::Shop, id))
    }

    pub async fn update_shop(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        id: Uuid,
        changes: ShopChanges,
    ) -> Result<Shop, ServiceError> {
        if let Some(name) = &changes.name {
            require_text("name", name)?;
        }
        if let Some(code) = &changes.code {
            require_text("code", code)?;
        }
        permit(scope, Action::Update, Target::new(Level::Shop, Ancestry::shop(id)))?;
        self.repo
            .update_shop(ctx, id, changes)
            .await
            .map_err(|e| ServiceError::from_store(e, Level::Shop, id))
    }

    pub async fn delete_shop(&self, ctx: &RequestContext, scope: &Scope, id: Uuid) -> Result<(), ServiceError> {
        permit(scope, Action::Delete, Target::new(Level::Shop, Ancestry::shop(id)))?;
        self.guard.can_delete(ctx, Level::Shop, id).await?;
        self.repo
            .delete_shop(ctx, id)
            .await
            .map_err(|e| ServiceError::from_delete(e, Level::Shop, id))?;
        tracing::info!("shop {} deleted by {}", id, scope.actor_id());
        Ok(())
    }

    // Regions

    pub async fn create_region(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        input: CreateRegion,
    ) -> Result<Region, ServiceError> {
        require_text("name", &input.name)?;
        self.repo
            .get_shop(ctx, input.shop_id)
            .await
            .map_err(|e| ServiceError::from_store(e, Level::Shop, input.shop_id))?;
        permit(scope, Action::Create, Target::new(Level::Region, Ancestry::shop(input.shop_id)))?;

        let region = self
            .repo
            .create_region(ctx, input.shop_id, input.name)
            .await
            .map_err(|e| ServiceError::from_store(e, Level::Shop, input.shop_id))?;
        tracing::info!("region {} created under shop {}", region.id, region.shop_id);
        Ok(region)
    }

    pub async fn get_region(&self, ctx: &RequestContext, scope: &Scope, id: Uuid) -> Result<Region, ServiceError> {
        self.authorize_existing(ctx, scope, Action::Read, Level::Region, id).await?;
        self.repo
            .get_region(ctx, id)
            .await
            .map_err(|e| ServiceError::from_store(e, Level::Region, id))
    }

    pub async fn rename_region(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        id: Uuid,
        input: Rename,
    ) -> Result<Region, ServiceError> {
        require_text("name", &input.name)?;
        self.authorize_existing(ctx, scope, Action::Update, Level::Region, id).await?;
        self.repo
            .rename_region(ctx, id, input.name)
            .await
            .map_err(|e| ServiceError::from_store(e, Level::Region, id))
    }

    pub async fn delete_region(&self, ctx: &RequestContext, scope: &Scope, id: Uuid) -> Result<(), ServiceError> {
        self.authorize_existing(ctx, scope, Action::Delete, Level::Region, id).await?;
        self.guard.can_delete(ctx, Level::Region, id).await?;
        self.repo
            .delete_region(ctx, id)
            .await
            .map_err(|e| ServiceError::from_delete(e, Level::Region, id))?;
        tracing::info!("region {} deleted by {}", id, scope.actor_id());
        Ok(())
    }

    // Branches

    pub async fn create_branch(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        input: CreateBranch,
    ) -> Result<Branch, ServiceError> {
        require_text("name", &input.name)?;
        let parent = self.resolver.ancestry_of(ctx, scope, Level::Region, input.region_id).await?;
        permit(scope, Action::Create, Target::new(Level::Branch, parent))?;

        let branch = self
            .repo
            .create_branch(ctx, input.region_id, input.name)
            .await
            .map_err(|e| ServiceError::from_store(e, Level::Region, input.region_id))?;
        tracing::info!("branch {} created under region {}", branch.id, branch.region_id);
        Ok(branch)
    }

    pub async fn get_branch(&self, ctx: &RequestContext, scope: &Scope, id: Uuid) -> Result<Branch, ServiceError> {
        self.authorize_existing(ctx, scope, Action::Read, Level::Branch, id).await?;
        self.repo
            .get_branch(ctx, id)
            .await
            .map_err(|e| ServiceError::from_store(e, Level::Branch, id))
    }

    pub async fn rename_branch(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        id: Uuid,
        input: Rename,
    ) -> Result<Branch, ServiceError> {
        require_text("name", &input.name)?;
        self.authorize_existing(ctx, scope, Action::Update, Level::Branch, id).await?;
        self.repo
            .rename_branch(ctx, id, input.name)
            .await
            .map_err(|e| ServiceError::from_store(e, Level::Branch, id))
    }

    pub async fn delete_branch(&self, ctx: &RequestContext, scope: &Scope, id: Uuid) -> Result<(), ServiceError> {
        self.authorize_existing(ctx, scope, Action::Delete, Level::Branch, id).await?;
        self.guard.can_delete(ctx, Level::Branch, id).await?;
        self.repo
            .delete_branch(ctx, id)
            .await
            .map_err(|e| ServiceError::from_delete(e, Level::Branch, id))?;
        tracing::info!("branch {} deleted by {}", id, scope.actor_id());
        Ok(())
    }

    // Departments

    pub async fn create_department(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        input: CreateDepartment,
    ) -> Result<Department, ServiceError> {
        require_text("name", &input.name)?;
        let parent = self.resolver.ancestry_of(ctx, scope, Level::Branch, input.branch_id).await?;
        permit(scope, Action::Create, Target::new(Level::Department, parent))?;

        let department = self
            .repo
            .create_department(ctx, input.branch_id, input.name)
            .await
            .map_err(|e| ServiceError::from_store(e, Level::Branch, input.branch_id))?;
        tracing::info!("department {} created under branch {}", department.id, department.branch_id);
        Ok(department)
    }

    pub async fn get_department(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        id: Uuid,
    ) -> Result<Department, ServiceError> {
        self.authorize_existing(ctx, scope, Action::Read, Level::Department, id).await?;
        self.repo
            .get_department(ctx, id)
            .await
            .map_err(|e| ServiceError::from_store(e, Level::Department, id))
    }

    pub async fn rename_department(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        id: Uuid,
        input: Rename,
    ) -> Result<Department, ServiceError> {
        require_text("name", &input.name)?;
        self.authorize_existing(ctx, scope, Action::Update, Level::Department, id).await?;
        self.repo
            .rename_department(ctx, id, input.name)
            .await
            .map_err(|e| ServiceError::from_store(e, Level::Department, id))
    }

    pub async fn delete_department(&self, ctx: &RequestContext, scope: &Scope, id: Uuid) -> Result<(), ServiceError> {
        self.authorize_existing(ctx, scope, Action::Delete, Level::Department, id).await?;
        self.guard.can_delete(ctx, Level::Department, id).await?;
        self.repo
            .delete_department(ctx, id)
            .await
            .map_err(|e| ServiceError::from_delete(e, Level::Department, id))?;
        tracing::info!("department {} deleted by {}", id, scope.actor_id());
        Ok(())
    }

    // Users

    pub async fn create_user(&self, ctx: &RequestContext, scope: &Scope, input: CreateUser) -> Result<User, ServiceError> {
        require_text("username", &input.username)?;
        require_email(&input.email)?;
        require_password(&input.password)?;

        let placement = self.resolver.resolve_placement(ctx, scope, input.placement).await?;
        permit(scope, Action::Create, Target::new(Level::User, placement.into()))?;
        ensure_can_grant(scope, input.role)?;
        ensure_role_fits(input.role, &placement)?;

        let user = self
            .repo
            .create_user(
                ctx,
                NewUser {
                    username: input.username.trim().to_string(),
                    email: input.email.trim().to_string(),
                    password_hash: hash_password(&input.password)?,
                    role: input.role,
                    placement,
                },
            )
            .await
            .map_err(|e| ServiceError::from_store(e, Level::Branch, placement.branch_id))?;
        tracing::info!(
            "user {} ({}) created in branch {} by {}",
            user.id,
            user.role,
            user.branch_id,
            scope.actor_id()
        );
        Ok(user)
    }

    pub async fn get_user(&self, ctx: &RequestContext, scope: &Scope, id: Uuid) -> Result<User, ServiceError> {
        let user = self.load_user(ctx, id).await?;
        permit(scope, Action::Read, Target::new(Level::User, user.ancestry()))?;
        Ok(user)
    }

    /// Apply field changes and, when a branch or department is supplied,
    /// move the user. The actor must be allowed to update the user both where
    /// it is and where it is going.
    pub async fn update_user(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        id: Uuid,
        input: UpdateUser,
    ) -> Result<User, ServiceError> {
        if let Some(username) = &input.username {
            require_text("username", username)?;
        }
        if let Some(email) = &input.email {
            require_email(email)?;
        }
        if let Some(password) = &input.password {
            require_password(password)?;
        }

        let user = self.load_user(ctx, id).await?;
        permit(scope, Action::Update, Target::new(Level::User, user.ancestry()))?;
        ensure_outranks_or_equals(scope, &user)?;

        let placement = if input.department_id.is_some() || input.branch_id.is_some() {
            let request = PlacementRequest {
                branch_id: input.branch_id,
                department_id: input.department_id,
                ..Default::default()
            };
            let moved = self.resolver.resolve_placement(ctx, scope, request).await?;
            permit(scope, Action::Update, Target::new(Level::User, moved.into()))?;
            Some(moved)
        } else {
            None
        };

        if let Some(role) = input.role {
            ensure_can_grant(scope, role)?;
        }
        ensure_role_fits(
            input.role.unwrap_or(user.role),
            &placement.unwrap_or_else(|| user.placement()),
        )?;

        let password_hash = match &input.password {
            Some(p) => Some(hash_password(p)?),
            None => None,
        };

        let updated = self
            .repo
            .update_user(
                ctx,
                id,
                UserChanges {
                    username: input.username.map(|s| s.trim().to_string()),
                    email: input.email.map(|s| s.trim().to_string()),
                    password_hash,
                    role: input.role,
                    placement,
                },
            )
            .await
            .map_err(|e| ServiceError::from_store(e, Level::User, id))?;

        if placement.is_some() {
            tracing::info!("user {} moved to branch {} by {}", id, updated.branch_id, scope.actor_id());
        }
        Ok(updated)
    }

    pub async fn delete_user(&self, ctx: &RequestContext, scope: &Scope, id: Uuid) -> Result<(), ServiceError> {
        let user = self.load_user(ctx, id).await?;
        permit(scope, Action::Delete, Target::new(Level::User, user.ancestry()))?;
        ensure_outranks_or_equals(scope, &user)?;
        self.guard.can_delete(ctx, Level::User, id).await?;
        self.repo
            .delete_user(ctx, id)
            .await
            .map_err(|e| ServiceError::from_delete(e, Level::User, id))?;
        tracing::info!("user {} deleted by {}", id, scope.actor_id());
        Ok(())
    }

    /// Users inside the actor's own subtree.
    pub async fn list_users(&self, ctx: &RequestContext, scope: &Scope, page: Page) -> Result<Vec<User>, ServiceError> {
        let filter = scope_filter(scope).ok_or_else(|| {
            tracing::warn!("user listing refused: {} holds an unbound {} scope", scope.actor_id(), scope.role());
            HierarchyError::ScopeMismatch
        })?;
        self.repo
            .list_users(ctx, filter, page)
            .await
            .map_err(|e| ServiceError::Hierarchy(e.into()))
    }

    async fn load_user(&self, ctx: &RequestContext, id: Uuid) -> Result<User, ServiceError> {
        self.repo
            .get_user(ctx, id)
            .await
            .map_err(|e| ServiceError::from_store(e, Level::User, id))
    }

    async fn authorize_existing(
        &self,
        ctx: &RequestContext,
        scope: &Scope,
        action: Action,
        level: Level,
        id: Uuid,
    ) -> Result<(), ServiceError> {
        let ancestry = self.resolver.ancestry_of(ctx, scope, level, id).await?;
        permit(scope, action, Target::new(level, ancestry))
    }
}

fn permit(scope: &Scope, action: Action, target: Target) -> Result<(), ServiceError> {
    let decision = authorize(scope, action, &target);
    if let Decision::Deny(reason) = decision {
        tracing::warn!(
            "denied {:?} on {} for {} ({}): {}",
            action,
            target.level,
            scope.actor_id(),
            scope.role(),
            reason.code()
        );
    }
    decision.into_result().map_err(ServiceError::from)
}

/// Position in the chain of command; lower outranks higher.
fn rank(role: Role) -> u8 {
    match role {
        Role::Manager => 0,
        Role::RegionManager => 1,
        Role::BranchManager => 2,
        Role::HeadOfDepartment => 3,
        Role::Employee => 4,
    }
}

/// An actor can hand out its own role or any role below it.
fn ensure_can_grant(scope: &Scope, role: Role) -> Result<(), ServiceError> {
    if rank(role) < rank(scope.role()) {
        tracing::warn!("{} ({}) may not grant {}", scope.actor_id(), scope.role(), role);
        return Err(HierarchyError::InsufficientRole.into());
    }
    Ok(())
}

/// An actor can only change or remove users at or below its own rank.
fn ensure_outranks_or_equals(scope: &Scope, user: &User) -> Result<(), ServiceError> {
    if rank(user.role) < rank(scope.role()) {
        tracing::warn!(
            "{} ({}) may not modify user {} ({})",
            scope.actor_id(),
            scope.role(),
            user.id,
            user.role
        );
        return Err(HierarchyError::InsufficientRole.into());
    }
    Ok(())
}

/// A head of department without a department would hold an unbound scope.
pub(crate) fn ensure_role_fits(role: Role, placement: &Placement) -> Result<(), ServiceError> {
    if role == Role::HeadOfDepartment && placement.department_id.is_none() {
        return Err(ServiceError::Invalid(
            "head_of_department must be placed in a department".to_string(),
        ));
    }
    Ok(())
}

fn scope_filter(scope: &Scope) -> Option<UserFilter> {
    let id = scope.binding_id()?;
    Some(match scope.binding_level() {
        Level::Shop => UserFilter::Shop(id),
        Level::Region => UserFilter::Region(id),
        Level::Branch => UserFilter::Branch(id),
        Level::Department | Level::User => UserFilter::Department(id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::hierarchy::ScopeClaims;

    struct Fixture {
        svc: HierarchyService<MemoryStore>,
        ctx: RequestContext,
        shop: Shop,
        region: Region,
        branch: Branch,
        department: Department,
    }

    impl Fixture {
        async fn new() -> Self {
            let svc = HierarchyService::new(Arc::new(MemoryStore::new()));
            let ctx = RequestContext::default();
            let boss = root_manager();
            let shop = svc
                .create_shop(
                    &ctx,
                    &boss,
                    NewShop {
                        name: "Acme".into(),
                        code: "ACME".into(),
                        alias: None,
                    },
                )
                .await
                .unwrap();
            let boss = manager_of(shop.id);
            let region = svc
                .create_region(
                    &ctx,
                    &boss,
                    CreateRegion {
                        shop_id: shop.id,
                        name: "R1".into(),
                    },
                )
                .await
                .unwrap();
            let branch = svc
                .create_branch(
                    &ctx,
                    &boss,
                    CreateBranch {
                        region_id: region.id,
                        name: "B1".into(),
                    },
                )
                .await
                .unwrap();
            let department = svc
                .create_department(
                    &ctx,
                    &boss,
                    CreateDepartment {
                        branch_id: branch.id,
                        name: "D1".into(),
                    },
                )
                .await
                .unwrap();
            Self {
                svc,
                ctx,
                shop,
                region,
                branch,
                department,
            }
        }

        fn scope(&self, role: Role) -> Scope {
            Scope::derive(&ScopeClaims {
                actor_id: Uuid::new_v4(),
                role,
                shop_id: Some(self.shop.id),
                region_id: Some(self.region.id),
                branch_id: Some(self.branch.id),
                department_id: Some(self.department.id),
            })
        }

        fn new_user(&self, username: &str, role: Role, placement: PlacementRequest) -> CreateUser {
            CreateUser {
                username: username.into(),
                email: format!("{username}@example.com"),
                password: "password123".into(),
                role,
                placement,
            }
        }
    }

    fn root_manager() -> Scope {
        Scope::derive(&ScopeClaims {
            actor_id: Uuid::new_v4(),
            role: Role::Manager,
            shop_id: None,
            region_id: None,
            branch_id: None,
            department_id: None,
        })
    }

    fn manager_of(shop_id: Uuid) -> Scope {
        Scope::derive(&ScopeClaims {
            actor_id: Uuid::new_v4(),
            role: Role::Manager,
            shop_id: Some(shop_id),
            region_id: None,
            branch_id: None,
            department_id: None,
        })
    }

    #[tokio::test]
    async fn user_created_from_department_gets_full_chain() {
        let f = Fixture::new().await;
        let user = f
            .svc
            .create_user(
                &f.ctx,
                &f.scope(Role::Manager),
                f.new_user(
                    "ana",
                    Role::Employee,
                    PlacementRequest {
                        department_id: Some(f.department.id),
                        ..Default::default()
                    },
                ),
            )
            .await
            .unwrap();

        assert_eq!(user.shop_id, f.shop.id);
        assert_eq!(user.region_id, f.region.id);
        assert_eq!(user.branch_id, f.branch.id);
        assert_eq!(user.department_id, Some(f.department.id));
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn region_manager_of_other_region_is_denied() {
        let f = Fixture::new().await;
        let outsider = Scope::derive(&ScopeClaims {
            actor_id: Uuid::new_v4(),
            role: Role::RegionManager,
            shop_id: Some(f.shop.id),
            region_id: Some(Uuid::new_v4()),
            branch_id: None,
            department_id: None,
        });

        let err = f
            .svc
            .create_user(
                &f.ctx,
                &outsider,
                f.new_user(
                    "bob",
                    Role::Employee,
                    PlacementRequest {
                        department_id: Some(f.department.id),
                        ..Default::default()
                    },
                ),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Hierarchy(HierarchyError::ScopeMismatch)));
    }

    #[tokio::test]
    async fn branch_with_department_cannot_be_deleted() {
        let f = Fixture::new().await;
        let scope = f.scope(Role::BranchManager);

        let err = f.svc.delete_branch(&f.ctx, &scope, f.branch.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Hierarchy(HierarchyError::InUse(Level::Branch))));

        f.svc.delete_department(&f.ctx, &scope, f.department.id).await.unwrap();
        f.svc.delete_branch(&f.ctx, &scope, f.branch.id).await.unwrap();
    }

    #[tokio::test]
    async fn head_of_department_needs_a_department() {
        let f = Fixture::new().await;
        let err = f
            .svc
            .create_user(
                &f.ctx,
                &f.scope(Role::Manager),
                f.new_user(
                    "hod",
                    Role::HeadOfDepartment,
                    PlacementRequest {
                        branch_id: Some(f.branch.id),
                        ..Default::default()
                    },
                ),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
    }

    #[tokio::test]
    async fn cannot_grant_a_higher_role() {
        let f = Fixture::new().await;
        let err = f
            .svc
            .create_user(
                &f.ctx,
                &f.scope(Role::BranchManager),
                f.new_user(
                    "climber",
                    Role::RegionManager,
                    PlacementRequest {
                        branch_id: Some(f.branch.id),
                        ..Default::default()
                    },
                ),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Hierarchy(HierarchyError::InsufficientRole)));
    }

    #[tokio::test]
    async fn moving_to_a_branch_clears_the_department() {
        let f = Fixture::new().await;
        let manager = f.scope(Role::Manager);
        let user = f
            .svc
            .create_user(
                &f.ctx,
                &manager,
                f.new_user(
                    "ana",
                    Role::Employee,
                    PlacementRequest {
                        department_id: Some(f.department.id),
                        ..Default::default()
                    },
                ),
            )
            .await
            .unwrap();
        let b2 = f
            .svc
            .create_branch(
                &f.ctx,
                &manager,
                CreateBranch {
                    region_id: f.region.id,
                    name: "B2".into(),
                },
            )
            .await
            .unwrap();

        let moved = f
            .svc
            .update_user(
                &f.ctx,
                &manager,
                user.id,
                UpdateUser {
                    branch_id: Some(b2.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.branch_id, b2.id);
        assert_eq!(moved.department_id, None);
    }

    #[tokio::test]
    async fn branch_manager_cannot_move_user_out_of_branch() {
        let f = Fixture::new().await;
        let manager = f.scope(Role::Manager);
        let user = f
            .svc
            .create_user(
                &f.ctx,
                &manager,
                f.new_user(
                    "ana",
                    Role::Employee,
                    PlacementRequest {
                        branch_id: Some(f.branch.id),
                        ..Default::default()
                    },
                ),
            )
            .await
            .unwrap();
        let b2 = f
            .svc
            .create_branch(
                &f.ctx,
                &manager,
                CreateBranch {
                    region_id: f.region.id,
                    name: "B2".into(),
                },
            )
            .await
            .unwrap();

        let err = f
            .svc
            .update_user(
                &f.ctx,
                &f.scope(Role::BranchManager),
                user.id,
                UpdateUser {
                    branch_id: Some(b2.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Hierarchy(HierarchyError::ScopeMismatch)));
    }

    #[tokio::test]
    async fn list_is_limited_to_the_actor_subtree() {
        let f = Fixture::new().await;
        let manager = f.scope(Role::Manager);
        let b2 = f
            .svc
            .create_branch(
                &f.ctx,
                &manager,
                CreateBranch {
                    region_id: f.region.id,
                    name: "B2".into(),
                },
            )
            .await
            .unwrap();
        for (name, branch) in [("a", f.branch.id), ("b", f.branch.id), ("c", b2.id)] {
            f.svc
                .create_user(
                    &f.ctx,
                    &manager,
                    f.new_user(
                        name,
                        Role::Employee,
                        PlacementRequest {
                            branch_id: Some(branch),
                            ..Default::default()
                        },
                    ),
                )
                .await
                .unwrap();
        }

        let all = f.svc.list_users(&f.ctx, &manager, Page::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        let own = f
            .svc
            .list_users(&f.ctx, &f.scope(Role::Employee), Page::default())
            .await
            .unwrap();
        assert_eq!(own.iter().map(|u| u.username.as_str()).collect::<Vec<_>>(), ["a", "b"]);
    }

    #[tokio::test]
    async fn employee_cannot_touch_structure() {
        let f = Fixture::new().await;
        let err = f
            .svc
            .rename_department(
                &f.ctx,
                &f.scope(Role::Employee),
                f.department.id,
                Rename { name: "X".into() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Hierarchy(HierarchyError::InsufficientRole)));
    }

    #[tokio::test]
    async fn region_under_missing_shop_is_not_found() {
        let f = Fixture::new().await;
        let ghost = Uuid::new_v4();
        let err = f
            .svc
            .create_region(
                &f.ctx,
                &f.scope(Role::Manager),
                CreateRegion {
                    shop_id: ghost,
                    name: "R9".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Hierarchy(HierarchyError::NotFound { level: Level::Shop, id }) if id == ghost
        ));
    }

    #[tokio::test]
    async fn lower_role_cannot_modify_or_delete_a_higher_one() {
        let f = Fixture::new().await;
        let boss = f
            .svc
            .create_user(
                &f.ctx,
                &f.scope(Role::Manager),
                f.new_user(
                    "boss",
                    Role::Manager,
                    PlacementRequest {
                        branch_id: Some(f.branch.id),
                        ..Default::default()
                    },
                ),
            )
            .await
            .unwrap();
        let branch_manager = f.scope(Role::BranchManager);

        let err = f
            .svc
            .update_user(
                &f.ctx,
                &branch_manager,
                boss.id,
                UpdateUser {
                    password: Some("hijacked-pw".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Hierarchy(HierarchyError::InsufficientRole)));

        let err = f.svc.delete_user(&f.ctx, &branch_manager, boss.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Hierarchy(HierarchyError::InsufficientRole)));

        let unchanged = f.svc.get_user(&f.ctx, &f.scope(Role::Manager), boss.id).await.unwrap();
        assert_eq!(unchanged.password_hash, boss.password_hash);
    }

    #[tokio::test]
    async fn peer_and_lower_roles_can_be_managed() {
        let f = Fixture::new().await;
        let peer = f
            .svc
            .create_user(
                &f.ctx,
                &f.scope(Role::Manager),
                f.new_user(
                    "peer",
                    Role::BranchManager,
                    PlacementRequest {
                        branch_id: Some(f.branch.id),
                        ..Default::default()
                    },
                ),
            )
            .await
            .unwrap();
        let branch_manager = f.scope(Role::BranchManager);

        f.svc
            .update_user(
                &f.ctx,
                &branch_manager,
                peer.id,
                UpdateUser {
                    email: Some("peer2@example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        f.svc.delete_user(&f.ctx, &branch_manager, peer.id).await.unwrap();
    }

    #[tokio::test]
    async fn manager_cannot_reach_another_shop() {
        let f = Fixture::new().await;
        let outsider = manager_of(Uuid::new_v4());

        let err = f.svc.get_region(&f.ctx, &outsider, f.region.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Hierarchy(HierarchyError::ScopeMismatch)));

        let err = f.svc.delete_department(&f.ctx, &outsider, f.department.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Hierarchy(HierarchyError::ScopeMismatch)));

        let err = f.svc.get_shop(&f.ctx, &outsider, f.shop.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Hierarchy(HierarchyError::ScopeMismatch)));
    }
}
