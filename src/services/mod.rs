//! Business operations invoked by the HTTP routes and the sweep worker.
//!
//! Services are plain functions generic over the repository traits they
//! need, so they can run against [`crate::repository::DieselRepository`] or a
//! mock in tests.

use thiserror::Error;

use crate::SERVICE_ADMIN_ROLE;
use crate::domain::auth::AuthenticatedUser;
use crate::domain::lead::LeadStateError;
use crate::domain::opportunity::StageTransitionError;
use crate::domain::process::ProcessError;
use crate::domain::types::TypeConstraintError;
use crate::forms::FormError;
use crate::repository::errors::RepositoryError;

pub mod companies;
pub mod extensions;
pub mod hooks;
pub mod leads;
pub mod members;
pub mod opportunities;
pub mod processes;
pub mod support_cases;
pub mod territories;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Form(String),

    #[error("{0}")]
    TypeConstraint(String),

    /// The record exists but is in a state that forbids the operation.
    #[error("{0}")]
    InvalidState(String),

    #[error(transparent)]
    Repository(RepositoryError),

    #[error("{0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ServiceError::NotFound,
            RepositoryError::Conflict(message) => ServiceError::InvalidState(message),
            other => ServiceError::Repository(other),
        }
    }
}

impl From<TypeConstraintError> for ServiceError {
    fn from(err: TypeConstraintError) -> Self {
        ServiceError::TypeConstraint(err.to_string())
    }
}

impl From<FormError> for ServiceError {
    fn from(err: FormError) -> Self {
        ServiceError::Form(err.to_string())
    }
}

impl From<ProcessError> for ServiceError {
    fn from(err: ProcessError) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

impl From<StageTransitionError> for ServiceError {
    fn from(err: StageTransitionError) -> Self {
        match err {
            StageTransitionError::Deleted => ServiceError::NotFound,
            other => ServiceError::InvalidState(other.to_string()),
        }
    }
}

impl From<LeadStateError> for ServiceError {
    fn from(err: LeadStateError) -> Self {
        match err {
            LeadStateError::Deleted => ServiceError::NotFound,
            other => ServiceError::InvalidState(other.to_string()),
        }
    }
}

/// Admins implicitly hold every role of the service.
pub fn check_role(role: &str, roles: &[String]) -> bool {
    roles.iter().any(|r| r == role || r == SERVICE_ADMIN_ROLE)
}

pub fn ensure_role(user: &AuthenticatedUser, role: &str) -> ServiceResult<()> {
    if check_role(role, &user.roles) {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{SERVICE_ACCESS_ROLE, SERVICE_APPROVER_ROLE};

    pub(crate) fn user_with_roles(roles: &[&str]) -> AuthenticatedUser {
        AuthenticatedUser {
            sub: "1".to_string(),
            email: "user@example.com".to_string(),
            hub_id: 1,
            name: "User".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: 0,
        }
    }

    pub(crate) fn admin_user() -> AuthenticatedUser {
        user_with_roles(&[SERVICE_ACCESS_ROLE, SERVICE_ADMIN_ROLE])
    }

    pub(crate) fn viewer_user() -> AuthenticatedUser {
        user_with_roles(&[SERVICE_ACCESS_ROLE])
    }

    #[test]
    fn admin_passes_every_role_check() {
        let admin = user_with_roles(&[SERVICE_ADMIN_ROLE]);
        assert!(ensure_role(&admin, SERVICE_ACCESS_ROLE).is_ok());
        assert!(ensure_role(&admin, SERVICE_APPROVER_ROLE).is_ok());
    }

    #[test]
    fn viewer_is_not_an_approver() {
        assert!(matches!(
            ensure_role(&viewer_user(), SERVICE_APPROVER_ROLE),
            Err(ServiceError::Unauthorized)
        ));
        assert!(matches!(
            ensure_role(&user_with_roles(&[]), SERVICE_ACCESS_ROLE),
            Err(ServiceError::Unauthorized)
        ));
    }

    #[test]
    fn repository_conflicts_become_invalid_state() {
        let err = ServiceError::from(RepositoryError::Conflict("lead already converted".into()));
        assert!(matches!(err, ServiceError::InvalidState(msg) if msg == "lead already converted"));
        assert!(matches!(
            ServiceError::from(RepositoryError::NotFound),
            ServiceError::NotFound
        ));
    }
}
