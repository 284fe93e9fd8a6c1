//! In-crate test doubles.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::hierarchy::{HierarchyStore, Level, RequestContext, StoreError};
use crate::models::{Branch, Department, Region};

/// IDs of a single Shop → Region → Branch → Department chain.
#[derive(Debug, Clone, Copy)]
pub struct SeedTree {
    pub shop: Uuid,
    pub region: Uuid,
    pub branch: Uuid,
    pub department: Uuid,
}

/// Hierarchy store backed by plain maps, with lookup counting and an outage
/// switch.
#[derive(Default)]
pub struct FakeStore {
    regions: Mutex<HashMap<Uuid, Region>>,
    branches: Mutex<HashMap<Uuid, Branch>>,
    departments: Mutex<HashMap<Uuid, Department>>,
    // (branch_id, department_id)
    users: Mutex<Vec<(Uuid, Option<Uuid>)>>,
    lookups: AtomicUsize,
    outage: AtomicBool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_tree(&self) -> SeedTree {
        let shop = Uuid::new_v4();
        let region = self.add_region(shop);
        let branch = self.add_branch(region);
        let department = self.add_department(branch);
        SeedTree {
            shop,
            region,
            branch,
            department,
        }
    }

    pub fn add_region(&self, shop_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.regions.lock().unwrap().insert(
            id,
            Region {
                id,
                shop_id,
                name: format!("region-{id}"),
            },
        );
        id
    }

    pub fn add_branch(&self, region_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.branches.lock().unwrap().insert(
            id,
            Branch {
                id,
                region_id,
                name: format!("branch-{id}"),
            },
        );
        id
    }

    pub fn add_department(&self, branch_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.departments.lock().unwrap().insert(
            id,
            Department {
                id,
                branch_id,
                name: format!("department-{id}"),
            },
        );
        id
    }

    pub fn add_user(&self, branch_id: Uuid, department_id: Option<Uuid>) {
        self.users.lock().unwrap().push((branch_id, department_id));
    }

    pub fn remove_region(&self, id: Uuid) {
        self.regions.lock().unwrap().remove(&id);
    }

    pub fn remove_department(&self, id: Uuid) {
        self.departments.lock().unwrap().remove(&id);
    }

    pub fn fail_with_outage(&self) {
        self.outage.store(true, Ordering::SeqCst);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.outage.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl HierarchyStore for FakeStore {
    async fn get_region(&self, ctx: &RequestContext, id: Uuid) -> Result<Region, StoreError> {
        ctx.run(async {
            self.enter()?;
            self.regions.lock().unwrap().get(&id).cloned().ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn get_branch(&self, ctx: &RequestContext, id: Uuid) -> Result<Branch, StoreError> {
        ctx.run(async {
            self.enter()?;
            self.branches.lock().unwrap().get(&id).cloned().ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn get_department(&self, ctx: &RequestContext, id: Uuid) -> Result<Department, StoreError> {
        ctx.run(async {
            self.enter()?;
            self.departments.lock().unwrap().get(&id).cloned().ok_or(StoreError::NotFound)
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
            self.enter()?;
            let n = match (parent_level, child_level) {
                (Level::Shop, Level::Region) => self
                    .regions
                    .lock()
                    .unwrap()
                    .values()
                    .filter(|r| r.shop_id == parent_id)
                    .count(),
                (Level::Region, Level::Branch) => self
                    .branches
                    .lock()
                    .unwrap()
                    .values()
                    .filter(|b| b.region_id == parent_id)
                    .count(),
                (Level::Branch, Level::Department) => self
                    .departments
                    .lock()
                    .unwrap()
                    .values()
                    .filter(|d| d.branch_id == parent_id)
                    .count(),
                (Level::Branch, Level::User) => self
                    .users
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|(b, _)| *b == parent_id)
                    .count(),
                (Level::Department, Level::User) => self
                    .users
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|(_, d)| *d == Some(parent_id))
                    .count(),
                _ => 0,
            };
            Ok(n as i64)
        })
        .await
    }
}
