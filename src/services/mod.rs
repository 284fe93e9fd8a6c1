pub mod auth_service;
pub mod hierarchy_service;

pub use auth_service::{AuthResponse, AuthService, LoginRequest, RegisterRequest};
pub use hierarchy_service::{
    CreateBranch, CreateDepartment, CreateRegion, CreateUser, HierarchyService, Rename, UpdateUser,
};

use uuid::Uuid;

use crate::auth::{password::PasswordError, JwtError};
use crate::hierarchy::{HierarchyError, Level, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Jwt(#[from] JwtError),
}

impl ServiceError {
    /// Map a store failure while touching `level`/`id`. Constraint
    /// violations stay conflicts; everything else goes through the
    /// hierarchy vocabulary.
    pub fn from_store(err: StoreError, level: Level, id: Uuid) -> Self {
        match err {
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            other => HierarchyError::from_store(other, level, id).into(),
        }
    }

    /// Like [`from_store`](Self::from_store) for deletes: a constraint
    /// violation means a child appeared after the guard ran.
    pub fn from_delete(err: StoreError, level: Level, id: Uuid) -> Self {
        match err {
            StoreError::Conflict(msg) => {
                tracing::warn!("delete of {} {} lost a race with a new child: {}", level, id, msg);
                HierarchyError::InUse(level).into()
            }
            other => Self::from_store(other, level, id),
        }
    }
}

const MAX_FIELD_LEN: usize = 255;

pub(crate) fn require_text(field: &str, value: &str) -> Result<(), ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Invalid(format!("{field} is required")));
    }
    if trimmed.len() > MAX_FIELD_LEN {
        return Err(ServiceError::Invalid(format!("{field} must be at most {MAX_FIELD_LEN} characters")));
    }
    Ok(())
}

pub(crate) fn require_email(value: &str) -> Result<(), ServiceError> {
    require_text("email", value)?;
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ServiceError::Invalid("email is not a valid address".to_string())),
    }
}

pub(crate) fn require_password(value: &str) -> Result<(), ServiceError> {
    if value.chars().count() < 8 {
        return Err(ServiceError::Invalid("password must be at least 8 characters".to_string()));
    }
    Ok(())
}
