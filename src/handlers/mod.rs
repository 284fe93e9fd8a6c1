// handlers/mod.rs - Handler tiers
//
// Public (no auth) → Protected (JWT auth, scope-checked per operation)
pub mod public; // /api/v1/auth/*
pub mod protected; // /api/v1/{shops,regions,branches,departments,users,me}

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - service description
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Org Hierarchy API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Shop → Region → Branch → Department → User with scoped access control",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/api/v1/auth/register, /api/v1/auth/login (public - token acquisition)",
                "shops": "/api/v1/shops[/:id] (protected)",
                "regions": "/api/v1/regions[/:id] (protected)",
                "branches": "/api/v1/branches[/:id] (protected)",
                "departments": "/api/v1/departments[/:id] (protected)",
                "users": "/api/v1/users[/:id] (protected)",
                "me": "/api/v1/me (protected)",
            }
        }
    }))
}

/// GET /health - store connectivity
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now();
    let ctx = state.request_context();

    match state.repo.ping(&ctx).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "store unavailable",
                    "code": "store_unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
