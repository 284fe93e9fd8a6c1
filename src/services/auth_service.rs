use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::hierarchy_service::ensure_role_fits;
use super::{require_email, require_password, require_text, ServiceError};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{IssuedToken, JwtManager};
use crate::database::repository::{HierarchyRepository, NewUser};
use crate::hierarchy::{CascadeResolver, Level, PlacementRequest, RequestContext, Role, Scope, ScopeClaims};
use crate::models::User;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub role: Role,
    pub shop_id: Uuid,
    #[serde(default)]
    pub region_id: Option<Uuid>,
    #[serde(default)]
    pub branch_id: Option<Uuid>,
    #[serde(default)]
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl AuthResponse {
    fn new(user: User, issued: IssuedToken) -> Self {
        Self {
            user,
            token: issued.token,
            expires_at: issued.expires_at,
        }
    }
}

/// Self-service registration and password login.
pub struct AuthService<S: ?Sized> {
    repo: Arc<S>,
    resolver: CascadeResolver<S>,
    jwt: JwtManager,
}

impl<S: ?Sized> Clone for AuthService<S> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            resolver: self.resolver.clone(),
            jwt: self.jwt.clone(),
        }
    }
}

impl<S> AuthService<S>
where
    S: HierarchyRepository + ?Sized,
{
    pub fn new(repo: Arc<S>, jwt: JwtManager) -> Self {
        Self {
            resolver: CascadeResolver::new(Arc::clone(&repo)),
            repo,
            jwt,
        }
    }

    /// Create a user in an existing shop and hand back a token.
    ///
    /// The branch (or department) decides the placement; the supplied
    /// `shop_id` must agree with what it resolves to.
    pub async fn register(&self, ctx: &RequestContext, input: RegisterRequest) -> Result<AuthResponse, ServiceError> {
        require_text("username", &input.username)?;
        require_email(&input.email)?;
        require_password(&input.password)?;

        self.repo
            .get_shop(ctx, input.shop_id)
            .await
            .map_err(|e| ServiceError::from_store(e, Level::Shop, input.shop_id))?;

        // Not yet a user: scope only labels the resolver's diagnostics.
        let registrant = Scope::derive(&ScopeClaims {
            actor_id: Uuid::nil(),
            role: input.role,
            shop_id: Some(input.shop_id),
            region_id: input.region_id,
            branch_id: input.branch_id,
            department_id: input.department_id,
        });
        let placement = self
            .resolver
            .resolve_placement(
                ctx,
                &registrant,
                PlacementRequest {
                    shop_id: Some(input.shop_id),
                    region_id: input.region_id,
                    branch_id: input.branch_id,
                    department_id: input.department_id,
                },
            )
            .await?;

        if placement.shop_id != input.shop_id {
            return Err(ServiceError::Invalid(format!(
                "placement does not belong to shop {}",
                input.shop_id
            )));
        }
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

        tracing::info!("registered user {} as {} in shop {}", user.id, user.role, user.shop_id);
        let issued = self.jwt.issue(&user)?;
        Ok(AuthResponse::new(user, issued))
    }

    /// Unknown user and wrong password fail the same way.
    pub async fn login(&self, ctx: &RequestContext, input: LoginRequest) -> Result<AuthResponse, ServiceError> {
        let user = self
            .repo
            .find_user_by_username(ctx, input.username.trim())
            .await
            .map_err(|e| ServiceError::Hierarchy(e.into()))?;

        let user = match user {
            Some(u) if verify_password(&input.password, &u.password_hash) => u,
            _ => {
                tracing::warn!("failed login for username {:?}", input.username);
                return Err(ServiceError::InvalidCredentials);
            }
        };

        let issued = self.jwt.issue(&user)?;
        tracing::debug!("user {} logged in", user.id);
        Ok(AuthResponse::new(user, issued))
    }
}
