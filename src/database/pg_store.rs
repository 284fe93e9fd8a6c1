use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::repository::{HierarchyRepository, NewShop, NewUser, Page, ShopChanges, UserChanges, UserFilter};
use crate::hierarchy::{HierarchyStore, Level, RequestContext, Role, StoreError};
use crate::models::{Branch, Department, Region, Shop, User};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, shop_id, region_id, branch_id, department_id, created_at, updated_at";

/// Postgres-backed repository. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    shop_id: Uuid,
    region_id: Uuid,
    branch_id: Uuid,
    department_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e| StoreError::Unavailable(format!("user {} has a corrupt role: {}", row.id, e)))?;
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role,
            shop_id: row.shop_id,
            region_id: row.region_id,
            branch_id: row.branch_id,
            department_id: row.department_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Translate driver errors into the store vocabulary. Constraint violations
/// (unique 23505, foreign key 23503) become conflicts.
fn map_sqlx(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") | Some("23503") => StoreError::Conflict(db.message().to_string()),
            _ => StoreError::Unavailable(db.message().to_string()),
        },
        other => StoreError::Unavailable(other.to_string()),
    }
}

/// Table and parent column holding the `(parent, child)` edge.
fn edge(parent: Level, child: Level) -> Option<(&'static str, &'static str)> {
    match (parent, child) {
        (Level::Shop, Level::Region) => Some(("regions", "shop_id")),
        (Level::Region, Level::Branch) => Some(("branches", "region_id")),
        (Level::Branch, Level::Department) => Some(("departments", "branch_id")),
        (Level::Branch, Level::User) => Some(("users", "branch_id")),
        (Level::Department, Level::User) => Some(("users", "department_id")),
        _ => None,
    }
}

fn affected(rows: u64) -> Result<(), StoreError> {
    if rows == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

#[async_trait]
impl HierarchyStore for PgStore {
    async fn get_region(&self, ctx: &RequestContext, id: Uuid) -> Result<Region, StoreError> {
        ctx.run(async {
            sqlx::query_as::<_, Region>("SELECT id, shop_id, name FROM regions WHERE id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx)
        })
        .await
    }

    async fn get_branch(&self, ctx: &RequestContext, id: Uuid) -> Result<Branch, StoreError> {
        ctx.run(async {
            sqlx::query_as::<_, Branch>("SELECT id, region_id, name FROM branches WHERE id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx)
        })
        .await
    }

    async fn get_department(&self, ctx: &RequestContext, id: Uuid) -> Result<Department, StoreError> {
        ctx.run(async {
            sqlx::query_as::<_, Department>("SELECT id, branch_id, name FROM departments WHERE id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx)
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
        let Some((table, column)) = edge(parent_level, child_level) else {
            return Ok(0);
        };
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE {column} = $1");
        ctx.run(async {
            let (n,): (i64,) = sqlx::query_as(&sql)
                .bind(parent_id)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx)?;
            Ok(n)
        })
        .await
    }
}

#[async_trait]
impl HierarchyRepository for PgStore {
    async fn create_shop(&self, ctx: &RequestContext, input: NewShop) -> Result<Shop, StoreError> {
        ctx.run(async {
            sqlx::query_as::<_, Shop>(
                "INSERT INTO shops (id, name, code, alias) VALUES ($1, $2, $3, $4) \
                 RETURNING id, name, code, alias, created_at, updated_at",
            )
            .bind(Uuid::new_v4())
            .bind(&input.name)
            .bind(&input.code)
            .bind(&input.alias)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)
        })
        .await
    }

    async fn get_shop(&self, ctx: &RequestContext, id: Uuid) -> Result<Shop, StoreError> {
        ctx.run(async {
            sqlx::query_as::<_, Shop>("SELECT id, name, code, alias, created_at, updated_at FROM shops WHERE id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx)
        })
        .await
    }

    async fn update_shop(&self, ctx: &RequestContext, id: Uuid, changes: ShopChanges) -> Result<Shop, StoreError> {
        ctx.run(async {
            sqlx::query_as::<_, Shop>(
                "UPDATE shops SET name = COALESCE($2, name), code = COALESCE($3, code), \
                 alias = COALESCE($4, alias), updated_at = now() WHERE id = $1 \
                 RETURNING id, name, code, alias, created_at, updated_at",
            )
            .bind(id)
            .bind(&changes.name)
            .bind(&changes.code)
            .bind(&changes.alias)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)
        })
        .await
    }

    async fn delete_shop(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError> {
        ctx.run(async {
            let res = sqlx::query("DELETE FROM shops WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx)?;
            affected(res.rows_affected())
        })
        .await
    }

    async fn create_region(&self, ctx: &RequestContext, shop_id: Uuid, name: String) -> Result<Region, StoreError> {
        ctx.run(async {
            sqlx::query_as::<_, Region>(
                "INSERT INTO regions (id, shop_id, name) VALUES ($1, $2, $3) RETURNING id, shop_id, name",
            )
            .bind(Uuid::new_v4())
            .bind(shop_id)
            .bind(&name)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)
        })
        .await
    }

    async fn rename_region(&self, ctx: &RequestContext, id: Uuid, name: String) -> Result<Region, StoreError> {
        ctx.run(async {
            sqlx::query_as::<_, Region>("UPDATE regions SET name = $2 WHERE id = $1 RETURNING id, shop_id, name")
                .bind(id)
                .bind(&name)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx)
        })
        .await
    }

    async fn delete_region(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError> {
        ctx.run(async {
            let res = sqlx::query("DELETE FROM regions WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx)?;
            affected(res.rows_affected())
        })
        .await
    }

    async fn create_branch(&self, ctx: &RequestContext, region_id: Uuid, name: String) -> Result<Branch, StoreError> {
        ctx.run(async {
            sqlx::query_as::<_, Branch>(
                "INSERT INTO branches (id, region_id, name) VALUES ($1, $2, $3) RETURNING id, region_id, name",
            )
            .bind(Uuid::new_v4())
            .bind(region_id)
            .bind(&name)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)
        })
        .await
    }

    async fn rename_branch(&self, ctx: &RequestContext, id: Uuid, name: String) -> Result<Branch, StoreError> {
        ctx.run(async {
            sqlx::query_as::<_, Branch>("UPDATE branches SET name = $2 WHERE id = $1 RETURNING id, region_id, name")
                .bind(id)
                .bind(&name)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx)
        })
        .await
    }

    async fn delete_branch(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError> {
        ctx.run(async {
            let res = sqlx::query("DELETE FROM branches WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx)?;
            affected(res.rows_affected())
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
            sqlx::query_as::<_, Department>(
                "INSERT INTO departments (id, branch_id, name) VALUES ($1, $2, $3) RETURNING id, branch_id, name",
            )
            .bind(Uuid::new_v4())
            .bind(branch_id)
            .bind(&name)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)
        })
        .await
    }

    async fn rename_department(&self, ctx: &RequestContext, id: Uuid, name: String) -> Result<Department, StoreError> {
        ctx.run(async {
            sqlx::query_as::<_, Department>(
                "UPDATE departments SET name = $2 WHERE id = $1 RETURNING id, branch_id, name",
            )
            .bind(id)
            .bind(&name)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)
        })
        .await
    }

    async fn delete_department(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError> {
        ctx.run(async {
            let res = sqlx::query("DELETE FROM departments WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx)?;
            affected(res.rows_affected())
        })
        .await
    }

    async fn create_user(&self, ctx: &RequestContext, input: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (id, username, email, password_hash, role, shop_id, region_id, branch_id, department_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {USER_COLUMNS}"
        );
        ctx.run(async {
            let p = input.placement;
            let row = sqlx::query_as::<_, UserRow>(&sql)
                .bind(Uuid::new_v4())
                .bind(&input.username)
                .bind(&input.email)
                .bind(&input.password_hash)
                .bind(input.role.as_str())
                .bind(p.shop_id)
                .bind(p.region_id)
                .bind(p.branch_id)
                .bind(p.department_id)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx)?;
            User::try_from(row)
        })
        .await
    }

    async fn get_user(&self, ctx: &RequestContext, id: Uuid) -> Result<User, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        ctx.run(async {
            let row = sqlx::query_as::<_, UserRow>(&sql)
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx)?;
            User::try_from(row)
        })
        .await
    }

    async fn find_user_by_username(&self, ctx: &RequestContext, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        ctx.run(async {
            let row = sqlx::query_as::<_, UserRow>(&sql)
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;
            row.map(User::try_from).transpose()
        })
        .await
    }

    async fn update_user(&self, ctx: &RequestContext, id: Uuid, changes: UserChanges) -> Result<User, StoreError> {
        let sql = format!(
            "UPDATE users SET \
               username = COALESCE($2, username), \
               email = COALESCE($3, email), \
               password_hash = COALESCE($4, password_hash), \
               role = COALESCE($5, role), \
               shop_id = COALESCE($6, shop_id), \
               region_id = COALESCE($7, region_id), \
               branch_id = COALESCE($8, branch_id), \
               department_id = CASE WHEN $9 THEN $10 ELSE department_id END, \
               updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        ctx.run(async {
            let placement = changes.placement;
            let row = sqlx::query_as::<_, UserRow>(&sql)
                .bind(id)
                .bind(&changes.username)
                .bind(&changes.email)
                .bind(&changes.password_hash)
                .bind(changes.role.map(|r| r.as_str()))
                .bind(placement.map(|p| p.shop_id))
                .bind(placement.map(|p| p.region_id))
                .bind(placement.map(|p| p.branch_id))
                .bind(placement.is_some())
                .bind(placement.and_then(|p| p.department_id))
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx)?;
            User::try_from(row)
        })
        .await
    }

    async fn delete_user(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError> {
        ctx.run(async {
            let res = sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx)?;
            affected(res.rows_affected())
        })
        .await
    }

    async fn list_users(&self, ctx: &RequestContext, filter: UserFilter, page: Page) -> Result<Vec<User>, StoreError> {
        let (column, id) = filter.column();
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1 ORDER BY username LIMIT $2 OFFSET $3");
        ctx.run(async {
            let rows = sqlx::query_as::<_, UserRow>(&sql)
                .bind(id)
                .bind(page.limit)
                .bind(page.offset)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx)?;
            rows.into_iter().map(User::try_from).collect()
        })
        .await
    }

    async fn ping(&self, ctx: &RequestContext) -> Result<(), StoreError> {
        ctx.run(async {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(map_sqlx)?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_dependent_edge_has_a_column() {
        for parent in [Level::Shop, Level::Region, Level::Branch, Level::Department] {
            for &child in parent.dependents() {
                assert!(edge(parent, child).is_some(), "{parent} -> {child}");
            }
        }
        assert_eq!(edge(Level::Shop, Level::User), None);
    }

    #[test]
    fn missing_row_maps_to_not_found() {
        assert_eq!(map_sqlx(sqlx::Error::RowNotFound), StoreError::NotFound);
        assert!(matches!(map_sqlx(sqlx::Error::PoolTimedOut), StoreError::Unavailable(_)));
    }

    #[test]
    fn corrupt_role_is_reported() {
        let now = Utc::now();
        let row = UserRow {
            id: Uuid::new_v4(),
            username: "x".into(),
            email: "x@example.com".into(),
            password_hash: "h".into(),
            role: "OWNER".into(),
            shop_id: Uuid::new_v4(),
            region_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            department_id: None,
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(User::try_from(row), Err(StoreError::Unavailable(_))));
    }
}
