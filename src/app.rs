use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{JwtError, JwtManager};
use crate::config::AppConfig;
use crate::database::HierarchyRepository;
use crate::handlers;
use crate::hierarchy::RequestContext;
use crate::middleware::{jwt_auth_middleware, request_context_middleware};
use crate::services::{AuthService, HierarchyService};

pub type Repository = dyn HierarchyRepository;

/// Everything a handler needs, built once at startup and shared by clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Arc<Repository>,
    pub hierarchy: HierarchyService<Repository>,
    pub auth: AuthService<Repository>,
    pub jwt: JwtManager,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: AppConfig, repo: Arc<Repository>) -> Result<Self, JwtError> {
        let jwt = JwtManager::from_config(&config.security)?;
        Ok(Self {
            hierarchy: HierarchyService::new(Arc::clone(&repo)),
            auth: AuthService::new(Arc::clone(&repo), jwt.clone()),
            config: Arc::new(config),
            repo,
            jwt,
            shutdown: CancellationToken::new(),
        })
    }

    /// Per-request context: cancelled on shutdown or when the request is
    /// dropped, store calls bounded by the configured timeout.
    pub fn request_context(&self) -> RequestContext {
        RequestContext::child_of(&self.shutdown, self.config.database.store_timeout())
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth_public_routes())
        .merge(protected_routes(state.clone()))
        .layer(from_fn_with_state(state.clone(), request_context_middleware));

    let mut app = Router::new()
        // Public
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .nest("/api/v1", api)
        .layer(cors_layer(&state.config));

    if state.config.server.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    app.with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{branches, departments, me, regions, shops, users};

    Router::new()
        .route("/shops", post(shops::shop_create))
        .route(
            "/shops/:id",
            get(shops::shop_get).put(shops::shop_update).delete(shops::shop_delete),
        )
        .route("/regions", post(regions::region_create))
        .route(
            "/regions/:id",
            get(regions::region_get)
                .put(regions::region_update)
                .delete(regions::region_delete),
        )
        .route("/branches", post(branches::branch_create))
        .route(
            "/branches/:id",
            get(branches::branch_get)
                .put(branches::branch_update)
                .delete(branches::branch_delete),
        )
        .route("/departments", post(departments::department_create))
        .route(
            "/departments/:id",
            get(departments::department_get)
                .put(departments::department_update)
                .delete(departments::department_delete),
        )
        .route("/users", get(users::user_list).post(users::user_create))
        .route(
            "/users/:id",
            get(users::user_get).put(users::user_update).delete(users::user_delete),
        )
        .route("/me", get(me::me_get))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }
    if config.security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}
