use thiserror::Error;

use crate::error::AppError;
use crate::provider::ProviderError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(anyhow::Error),

    #[error("invalid identity token")]
    InvalidIdentityToken,

    #[error("identity token expired")]
    ExpiredIdentityToken,

    #[error("no pending registration for subject")]
    NoPendingRecord,

    #[error("profile not found")]
    ProfileNotFound,

    #[error("operation may not target the acting owner's own account")]
    SelfTarget,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ProviderError> for ServiceError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidToken => ServiceError::InvalidIdentityToken,
            ProviderError::ExpiredToken => ServiceError::ExpiredIdentityToken,
            ProviderError::Unavailable(e) => ServiceError::ProviderUnavailable(e),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            // Store failures on mutation paths fail closed.
            ServiceError::Store(e) => {
                tracing::error!(error = %e, "Profile store unavailable");
                AppError::ServiceUnavailable
            }
            ServiceError::ProviderUnavailable(e) => AppError::BadGateway(e.to_string()),
            ServiceError::InvalidIdentityToken => {
                AppError::AuthError(anyhow::anyhow!("Invalid identity token"))
            }
            ServiceError::ExpiredIdentityToken => {
                AppError::AuthError(anyhow::anyhow!("Identity token expired"))
            }
            ServiceError::NoPendingRecord => {
                AppError::NotFound(anyhow::anyhow!("No pending registration for subject"))
            }
            ServiceError::ProfileNotFound => {
                AppError::NotFound(anyhow::anyhow!("Profile not found"))
            }
            ServiceError::SelfTarget => AppError::Conflict(anyhow::anyhow!(
                "Operation may not target your own account"
            )),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
