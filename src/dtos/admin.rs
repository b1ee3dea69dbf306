use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::{ApprovedProfile, AuditEntry, CustomClaims, PendingProfile, Role};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApproveRequest {
    #[schema(example = "staff")]
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRoleRequest {
    #[schema(example = "owner")]
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetDisabledRequest {
    pub disabled: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetLockdownRequest {
    pub enabled: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetMaintenanceRequest {
    pub enabled: bool,
    #[schema(example = "Back at 09:00 UTC")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AuditQuery {
    /// Maximum number of entries to return, newest first.
    #[param(example = 50)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingListResponse {
    pub users: Vec<PendingProfile>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApprovedListResponse {
    pub users: Vec<ApprovedProfile>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MutationResponse {
    pub profile: ApprovedProfile,
    /// True when the provider claims mirror could not be updated.
    pub claims_sync_degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClaimsRefreshResponse {
    pub claims: CustomClaims,
    pub claims_sync_degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ForceLogoutResponse {
    /// Sessions issued before this moment are invalid.
    #[schema(value_type = String, format = "date-time")]
    pub since: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditListResponse {
    pub entries: Vec<AuditEntry>,
}
