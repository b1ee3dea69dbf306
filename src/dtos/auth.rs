use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Role;
use crate::services::SessionAccess;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignInRequest {
    /// Identity token obtained from the external provider.
    #[schema(example = "eyJhbGciOiJSUzI1NiIs...")]
    pub identity_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    #[schema(example = "p8A3kqLzXc")]
    pub subject_id: String,
    #[schema(example = "operator@example.com")]
    pub email: String,
    pub role: Option<Role>,
    pub approved: bool,
    pub admin_bypass: bool,
}

impl From<&SessionAccess> for SessionResponse {
    fn from(access: &SessionAccess) -> Self {
        Self {
            subject_id: access.subject_id.clone(),
            email: access.email.clone(),
            role: access.role,
            approved: access.approved,
            admin_bypass: access.admin_bypass,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignInResponse {
    #[serde(flatten)]
    pub session: SessionResponse,
    /// False for a returning subject whose profile already existed.
    pub newly_registered: bool,
    /// True when this sign-in lost the first-owner bootstrap race and was
    /// queued for approval instead.
    pub bootstrap_conflict: bool,
    /// True when the provider claims mirror could not be updated. The profile
    /// store is authoritative; the mirror heals on the next sync.
    pub claims_sync_degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Signed out")]
    pub message: String,
}
