use service_core::error::AppError;
use thiserror::Error;

use super::identity::IdentityError;
use super::profiles::StoreError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{0}")]
    InvalidInput(String),

    #[error("El email ya está registrado")]
    EmailAlreadyRegistered,

    #[error("{0}")]
    Identity(IdentityError),

    /// Profile insert failed after the identity account was created; the
    /// account has already been compensated (or the attempt logged).
    #[error("{0}")]
    ProfileInsert(StoreError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("Usuario no encontrado")]
    UserNotFound,

    #[error("{0}")]
    NotConfigured(String),
}

impl From<IdentityError> for ServiceError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::EmailTaken => ServiceError::EmailAlreadyRegistered,
            other => ServiceError::Identity(other),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => AppError::ValidationError(e),
            ServiceError::InvalidInput(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::EmailAlreadyRegistered => {
                AppError::Conflict(anyhow::anyhow!("El email ya está registrado"))
            }
            ServiceError::Identity(e) => AppError::UpstreamError(anyhow::Error::new(e)),
            ServiceError::ProfileInsert(e) | ServiceError::Store(e) => {
                AppError::DatabaseError(anyhow::Error::new(e))
            }
            ServiceError::UserNotFound => {
                AppError::NotFound(anyhow::anyhow!("Usuario no encontrado"))
            }
            ServiceError::NotConfigured(msg) => AppError::ConfigError(anyhow::anyhow!(msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn email_taken_becomes_conflict() {
        let err: ServiceError = IdentityError::EmailTaken.into();
        assert!(matches!(err, ServiceError::EmailAlreadyRegistered));
        assert_eq!(AppError::from(err).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn profile_insert_failure_keeps_database_message() {
        let err = ServiceError::ProfileInsert(StoreError::Rejected(
            "duplicate key value violates unique constraint".to_string(),
        ));
        let app: AppError = err.into();
        assert_eq!(app.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            app.public_message(),
            "duplicate key value violates unique constraint"
        );
    }

    #[test]
    fn missing_admin_client_is_a_configuration_error() {
        let app: AppError = ServiceError::NotConfigured("no key".to_string()).into();
        assert!(matches!(app, AppError::ConfigError(_)));
        assert_eq!(app.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
