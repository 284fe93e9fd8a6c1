use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repository::{HierarchyRepository, NewShop, NewUser, Page, ShopChanges, UserChanges, UserFilter};
use crate::hierarchy::{HierarchyStore, Level, RequestContext, StoreError};
use crate::models::{Branch, Department, Region, Shop, User};

#[derive(Default)]
struct Tables {
    shops: HashMap<Uuid, Shop>,
    regions: HashMap<Uuid, Region>,
    branches: HashMap<Uuid, Branch>,
    departments: HashMap<Uuid, Department>,
    users: HashMap<Uuid, User>,
}

impl Tables {
    fn count_children(&self, parent: Level, child: Level, id: Uuid) -> usize {
        match (parent, child) {
            (Level::Shop, Level::Region) => self.regions.values().filter(|r| r.shop_id == id).count(),
            (Level::Region, Level::Branch) => self.branches.values().filter(|b| b.region_id == id).count(),
            (Level::Branch, Level::Department) => self.departments.values().filter(|d| d.branch_id == id).count(),
            (Level::Branch, Level::User) => self.users.values().filter(|u| u.branch_id == id).count(),
            (Level::Department, Level::User) => self.users.values().filter(|u| u.department_id == Some(id)).count(),
            _ => 0,
        }
    }

    /// Mirrors the foreign keys of the SQL schema: a row still referenced by
    /// a child cannot go away.
    fn ensure_unreferenced(&self, level: Level, id: Uuid) -> Result<(), StoreError> {
        for &child in level.dependents() {
            if self.count_children(level, child, id) > 0 {
                return Err(StoreError::Conflict(format!("{level} {id} is referenced by a {child}")));
            }
        }
        Ok(())
    }

    fn username_taken(&self, username: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }
}

/// In-process repository used by `serve --in-memory` and the test suites.
///
/// All tables sit behind one lock so every call observes a consistent
/// snapshot.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the backend were down.
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    fn up(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store marked unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl HierarchyStore for MemoryStore {
    async fn get_region(&self, ctx: &RequestContext, id: Uuid) -> Result<Region, StoreError> {
        ctx.run(async {
            self.up()?;
            self.tables.read().await.regions.get(&id).cloned().ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn get_branch(&self, ctx: &RequestContext, id: Uuid) -> Result<Branch, StoreError> {
        ctx.run(async {
            self.up()?;
            self.tables.read().await.branches.get(&id).cloned().ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn get_department(&self, ctx: &RequestContext, id: Uuid) -> Result<Department, StoreError> {
        ctx.run(async {
            self.up()?;
            self.tables.read().await.departments.get(&id).cloned().ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn count_children(
        &self,
        ctx: &RequestContext,
        parent_level: Level,
        child_level: Level,
        parent_id: Uuid,
    ) -> Result<i64, StoreError> {
        ctx.run(async {
            self.up()?;
            let n = self.tables.read().await.count_children(parent_level, child_level, parent_id);
            Ok(n as i64)
        })
        .await
    }
}

#[async_trait]
impl HierarchyRepository for MemoryStore {
    async fn create_shop(&self, ctx: &RequestContext, input: NewShop) -> Result<Shop, StoreError> {
        ctx.run(async {
            self.up()?;
            let mut t = self.tables.write().await;
            if t.shops.values().any(|s| s.code == input.code) {
                return Err(StoreError::Conflict(format!("shop code {} already exists", input.code)));
            }
            let now = Utc::now();
            let shop = Shop {
                id: Uuid::new_v4(),
                name: input.name,
                code: input.code,
                alias: input.alias,
                created_at: now,
                updated_at: now,
            };
            t.shops.insert(shop.id, shop.clone());
            Ok(shop)
        })
        .await
    }

    async fn get_shop(&self, ctx: &RequestContext, id: Uuid) -> Result<Shop, StoreError> {
        ctx.run(async {
            self.up()?;
            self.tables.read().await.shops.get(&id).cloned().ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn update_shop(&self, ctx: &RequestContext, id: Uuid, changes: ShopChanges) -> Result<Shop, StoreError> {
        ctx.run(async {
            self.up()?;
            let mut t = self.tables.write().await;
            if let Some(code) = &changes.code {
                if t.shops.values().any(|s| &s.code == code && s.id != id) {
                    return Err(StoreError::Conflict(format!("shop code {code} already exists")));
                }
            }
            let shop = t.shops.get_mut(&id).ok_or(StoreError::NotFound)?;
            if let Some(name) = changes.name {
                shop.name = name;
            }
            if let Some(code) = changes.code {
                shop.code = code;
            }
            if let Some(alias) = changes.alias {
                shop.alias = Some(alias);
            }
            shop.updated_at = Utc::now();
            Ok(shop.clone())
        })
        .await
    }

    async fn delete_shop(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError> {
        ctx.run(async {
            self.up()?;
            let mut t = self.tables.write().await;
            if !t.shops.contains_key(&id) {
                return Err(StoreError::NotFound);
            }
            t.ensure_unreferenced(Level::Shop, id)?;
            t.shops.remove(&id);
            Ok(())
        })
        .await
    }

    async fn create_region(&self, ctx: &RequestContext, shop_id: Uuid, name: String) -> Result<Region, StoreError> {
        ctx.run(async {
            self.up()?;
            let mut t = self.tables.write().await;
            if !t.shops.contains_key(&shop_id) {
                return Err(StoreError::Conflict(format!("shop {shop_id} does not exist")));
            }
            let region = Region {
                id: Uuid::new_v4(),
                shop_id,
                name,
            };
            t.regions.insert(region.id, region.clone());
            Ok(region)
        })
        .await
    }

    async fn rename_region(&self, ctx: &RequestContext, id: Uuid, name: String) -> Result<Region, StoreError> {
        ctx.run(async {
            self.up()?;
            let mut t = self.tables.write().await;
            let region = t.regions.get_mut(&id).ok_or(StoreError::NotFound)?;
            region.name = name;
            Ok(region.clone())
        })
        .await
    }

    async fn delete_region(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError> {
        ctx.run(async {
            self.up()?;
            let mut t = self.tables.write().await;
            if !t.regions.contains_key(&id) {
                return Err(StoreError::NotFound);
            }
            t.ensure_unreferenced(Level::Region, id)?;
            t.regions.remove(&id);
            Ok(())
        })
        .await
    }

    async fn create_branch(&self, ctx: &RequestContext, region_id: Uuid, name: String) -> Result<Branch, StoreError> {
        ctx.run(async {
            self.up()?;
            let mut t = self.tables.write().await;
            if !t.regions.contains_key(&region_id) {
                return Err(StoreError::Conflict(format!("region {region_id} does not exist")));
            }
            let branch = Branch {
                id: Uuid::new_v4(),
                region_id,
                name,
            };
            t.branches.insert(branch.id, branch.clone());
            Ok(branch)
        })
        .await
    }

    async fn rename_branch(&self, ctx: &RequestContext, id: Uuid, name: String) -> Result<Branch, StoreError> {
        ctx.run(async {
            self.up()?;
            let mut t = self.tables.write().await;
            let branch = t.branches.get_mut(&id).ok_or(StoreError::NotFound)?;
            branch.name = name;
            Ok(branch.clone())
        })
        .await
    }

    async fn delete_branch(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError> {
        ctx.run(async {
            self.up()?;
            let mut t = self.tables.write().await;
            if !t.branches.contains_key(&id) {
                return Err(StoreError::NotFound);
            }
            t.ensure_unreferenced(Level::Branch, id)?;
            t.branches.remove(&id);
            Ok(())
        })
        .await
    }

    async fn create_department(
        &self,
        ctx: &RequestContext,
        branch_id: Uuid,
        name: String,
    ) -> Result<Department, StoreError> {
        ctx.run(async {
            self.up()?;
            let mut t = self.tables.write().await;
            if !t.branches.contains_key(&branch_id) {
                return Err(StoreError::Conflict(format!("branch {branch_id} does not exist")));
            }
            let department = Department {
                id: Uuid::new_v4(),
                branch_id,
                name,
            };
            t.departments.insert(department.id, department.clone());
            Ok(department)
        })
        .await
    }

    async fn rename_department(&self, ctx: &RequestContext, id: Uuid, name: String) -> Result<Department, StoreError> {
        ctx.run(async {
            self.up()?;
            let mut t = self.tables.write().await;
            let department = t.departments.get_mut(&id).ok_or(StoreError::NotFound)?;
            department.name = name;
            Ok(department.clone())
        })
        .await
    }

    async fn delete_department(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError> {
        ctx.run(async {
            self.up()?;
            let mut t = self.tables.write().await;
            if !t.departments.contains_key(&id) {
                return Err(StoreError::NotFound);
            }
            t.ensure_unreferenced(Level::Department, id)?;
            t.departments.remove(&id);
            Ok(())
        })
        .await
    }

    async fn create_user(&self, ctx: &RequestContext, input: NewUser) -> Result<User, StoreError> {
        ctx.run(async {
            self.up()?;
            let mut t = self.tables.write().await;
            if t.username_taken(&input.username, None) {
                return Err(StoreError::Conflict(format!("username {} already exists", input.username)));
            }
            if !t.branches.contains_key(&input.placement.branch_id) {
                return Err(StoreError::Conflict(format!("branch {} does not exist", input.placement.branch_id)));
            }
            let now = Utc::now();
            let p = input.placement;
            let user = User {
                id: Uuid::new_v4(),
                username: input.username,
                email: input.email,
                password_hash: input.password_hash,
                role: input.role,
                shop_id: p.shop_id,
                region_id: p.region_id,
                branch_id: p.branch_id,
                department_id: p.department_id,
                created_at: now,
                updated_at: now,
            };
            t.users.insert(user.id, user.clone());
            Ok(user)
        })
        .await
    }

    async fn get_user(&self, ctx: &RequestContext, id: Uuid) -> Result<User, StoreError> {
        ctx.run(async {
            self.up()?;
            self.tables.read().await.users.get(&id).cloned().ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn find_user_by_username(&self, ctx: &RequestContext, username: &str) -> Result<Option<User>, StoreError> {
        ctx.run(async {
            self.up()?;
            Ok(self
                .tables
                .read()
                .await
                .users
                .values()
                .find(|u| u.username == username)
                .cloned())
        })
        .await
    }

    async fn update_user(&self, ctx: &RequestContext, id: Uuid, changes: UserChanges) -> Result<User, StoreError> {
        ctx.run(async {
            self.up()?;
            let mut t = self.tables.write().await;
            if let Some(username) = &changes.username {
                if t.username_taken(username, Some(id)) {
                    return Err(StoreError::Conflict(format!("username {username} already exists")));
                }
            }
            let user = t.users.get_mut(&id).ok_or(StoreError::NotFound)?;
            if let Some(username) = changes.username {
                user.username = username;
            }
            if let Some(email) = changes.email {
                user.email = email;
            }
            if let Some(hash) = changes.password_hash {
                user.password_hash = hash;
            }
            if let Some(role) = changes.role {
                user.role = role;
            }
            if let Some(p) = changes.placement {
                user.shop_id = p.shop_id;
                user.region_id = p.region_id;
                user.branch_id = p.branch_id;
                user.department_id = p.department_id;
            }
            user.updated_at = Utc::now();
            Ok(user.clone())
        })
        .await
    }

    async fn delete_user(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError> {
        ctx.run(async {
            self.up()?;
            self.tables.write().await.users.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn list_users(&self, ctx: &RequestContext, filter: UserFilter, page: Page) -> Result<Vec<User>, StoreError> {
        ctx.run(async {
            self.up()?;
            let t = self.tables.read().await;
            let mut users: Vec<User> = t.users.values().filter(|u| filter.matches(u)).cloned().collect();
            users.sort_by(|a, b| a.username.cmp(&b.username));
            Ok(users
                .into_iter()
                .skip(page.offset as usize)
                .take(page.limit as usize)
                .collect())
        })
        .await
    }

    async fn ping(&self, ctx: &RequestContext) -> Result<(), StoreError> {
        ctx.run(async { self.up() }).await
    }
}
