#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use org_hierarchy_api::app::{router, AppState};
use org_hierarchy_api::auth::Claims;
use org_hierarchy_api::config::AppConfig;
use org_hierarchy_api::database::MemoryStore;
use org_hierarchy_api::hierarchy::Role;

/// The full router over an in-memory store; no network, no database.
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    router: Router,
}

/// IDs of one Shop → Region → Branch → Department chain.
#[derive(Debug, Clone, Copy)]
pub struct Tree {
    pub shop: Uuid,
    pub region: Uuid,
    pub branch: Uuid,
    pub department: Uuid,
}

pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn id(&self) -> Result<Uuid> {
        let raw = self.body["data"]["id"].as_str().context("response has no data.id")?;
        Ok(raw.parse()?)
    }

    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub fn new() -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(AppConfig::development(), store.clone())?;
        let router = router(state.clone());
        Ok(Self { state, store, router })
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<Reply> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok(Reply { status, body })
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<Reply> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<Reply> {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Result<Reply> {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<Reply> {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Sign a token directly, bypassing login.
    pub fn token(&self, role: Role, shop: Uuid, region: Option<Uuid>, branch: Option<Uuid>, department: Option<Uuid>) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            username: format!("{}-test", role),
            role,
            shop_id: Some(shop),
            region_id: region,
            branch_id: branch,
            department_id: department,
            exp: now + 3600,
            iat: now,
        };
        Ok(self.state.jwt.sign(&claims)?)
    }

    pub fn manager_token(&self, shop: Uuid) -> Result<String> {
        self.token(Role::Manager, shop, None, None, None)
    }

    /// Build one full chain through the API. The shop is created by a
    /// Manager of some other shop; everything under it by its own Manager.
    pub async fn seed_tree(&self, code: &str) -> Result<Tree> {
        let founder = self.manager_token(Uuid::new_v4())?;

        let shop = self
            .post("/api/v1/shops", &founder, json!({ "name": format!("Shop {}", code), "code": code }))
            .await?;
        anyhow::ensure!(shop.status == StatusCode::CREATED, "shop create: {:?}", shop.body);
        let shop = shop.id()?;
        let token = self.manager_token(shop)?;

        let region = self
            .post("/api/v1/regions", &token, json!({ "shop_id": shop, "name": "North" }))
            .await?
            .id()?;
        let branch = self
            .post("/api/v1/branches", &token, json!({ "region_id": region, "name": "Downtown" }))
            .await?
            .id()?;
        let department = self
            .post("/api/v1/departments", &token, json!({ "branch_id": branch, "name": "Sales" }))
            .await?
            .id()?;

        Ok(Tree {
            shop,
            region,
            branch,
            department,
        })
    }

    /// Add a second region with its own branch under an existing shop.
    pub async fn add_region(&self, shop: Uuid, name: &str) -> Result<(Uuid, Uuid)> {
        let token = self.manager_token(shop)?;
        let region = self
            .post("/api/v1/regions", &token, json!({ "shop_id": shop, "name": name }))
            .await?
            .id()?;
        let branch = self
            .post("/api/v1/branches", &token, json!({ "region_id": region, "name": format!("{} main", name) }))
            .await?
            .id()?;
        Ok((region, branch))
    }
}
