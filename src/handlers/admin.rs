//! Owner-guarded administration surface. Every handler here runs behind the
//! owner guard, so the acting user is always an approved Owner.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::dtos::admin::{
    ApproveRequest, ApprovedListResponse, ClaimsRefreshResponse, ForceLogoutResponse,
    MutationResponse, PendingListResponse, SetDisabledRequest, SetLockdownRequest,
    SetMaintenanceRequest, SetRoleRequest,
};
use crate::dtos::auth::MessageResponse;
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::MaintenanceMarker;
use crate::services::ServiceError;
use crate::AppState;

/// List approved users
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "Approved users", body = ApprovedListResponse),
        (status = 403, description = "Caller is not an owner")
    ),
    tag = "Administration"
)]
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users = state.approval.list_approved().await.map_err(AppError::from)?;
    Ok(Json(ApprovedListResponse { users }))
}

/// List users awaiting approval
#[utoipa::path(
    get,
    path = "/admin/users/pending",
    responses(
        (status = 200, description = "Pending registrations", body = PendingListResponse),
        (status = 403, description = "Caller is not an owner")
    ),
    tag = "Administration"
)]
pub async fn list_pending(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users = state.approval.list_pending().await.map_err(AppError::from)?;
    Ok(Json(PendingListResponse { users }))
}

/// Approve a pending registration
#[utoipa::path(
    post,
    path = "/admin/users/{subject_id}/approve",
    params(("subject_id" = String, Path, description = "Subject to approve")),
    request_body = ApproveRequest,
    responses(
        (status = 200, description = "Registration approved", body = MutationResponse),
        (status = 404, description = "No pending registration for subject")
    ),
    tag = "Administration"
)]
pub async fn approve_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(subject_id): Path<String>,
    Json(req): Json<ApproveRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mutation = state
        .approval
        .approve(&actor.subject_id, &subject_id, req.role)
        .await
        .map_err(AppError::from)?;
    Ok(Json(MutationResponse {
        claims_sync_degraded: mutation.sync.is_degraded(),
        profile: mutation.profile,
    }))
}

/// Reject a pending registration, permanently blocking the subject
#[utoipa::path(
    post,
    path = "/admin/users/{subject_id}/reject",
    params(("subject_id" = String, Path, description = "Subject to reject")),
    responses(
        (status = 200, description = "Registration rejected", body = MutationResponse),
        (status = 404, description = "No pending registration for subject")
    ),
    tag = "Administration"
)]
pub async fn reject_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(subject_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mutation = state
        .approval
        .reject(&actor.subject_id, &subject_id)
        .await
        .map_err(AppError::from)?;
    Ok(Json(MutationResponse {
        claims_sync_degraded: mutation.sync.is_degraded(),
        profile: mutation.profile,
    }))
}

/// Change an approved user's role
#[utoipa::path(
    patch,
    path = "/admin/users/{subject_id}/role",
    params(("subject_id" = String, Path, description = "Subject whose role changes")),
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = MutationResponse),
        (status = 404, description = "No approved profile for subject"),
        (status = 409, description = "Owners may not change their own role")
    ),
    tag = "Administration"
)]
pub async fn set_role(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(subject_id): Path<String>,
    Json(req): Json<SetRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mutation = state
        .approval
        .change_role(&actor.subject_id, &subject_id, req.role)
        .await
        .map_err(AppError::from)?;
    Ok(Json(MutationResponse {
        claims_sync_degraded: mutation.sync.is_degraded(),
        profile: mutation.profile,
    }))
}

/// Disable or re-enable an approved user
#[utoipa::path(
    patch,
    path = "/admin/users/{subject_id}/disabled",
    params(("subject_id" = String, Path, description = "Subject to toggle")),
    request_body = SetDisabledRequest,
    responses(
        (status = 200, description = "Disabled flag updated", body = MutationResponse),
        (status = 404, description = "No approved profile for subject"),
        (status = 409, description = "Owners may not disable themselves")
    ),
    tag = "Administration"
)]
pub async fn set_disabled(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(subject_id): Path<String>,
    Json(req): Json<SetDisabledRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mutation = state
        .approval
        .set_disabled(&actor.subject_id, &subject_id, req.disabled)
        .await
        .map_err(AppError::from)?;
    Ok(Json(MutationResponse {
        claims_sync_degraded: mutation.sync.is_degraded(),
        profile: mutation.profile,
    }))
}

/// Delete a user from the portal, the provider, and the claims mirror
#[utoipa::path(
    delete,
    path = "/admin/users/{subject_id}",
    params(("subject_id" = String, Path, description = "Subject to delete")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "Subject has no profile"),
        (status = 409, description = "Owners may not delete themselves")
    ),
    tag = "Administration"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(subject_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let sync = state
        .approval
        .delete(&actor.subject_id, &subject_id)
        .await
        .map_err(AppError::from)?;
    let message = if sync.is_degraded() {
        "User deleted; provider cleanup incomplete".to_string()
    } else {
        "User deleted".to_string()
    };
    Ok(Json(MessageResponse { message }))
}

/// Re-push a subject's claims mirror from the authoritative profile
#[utoipa::path(
    post,
    path = "/admin/users/{subject_id}/claims/refresh",
    params(("subject_id" = String, Path, description = "Subject to reconcile")),
    responses(
        (status = 200, description = "Claims reconciled", body = ClaimsRefreshResponse),
        (status = 404, description = "Subject has no profile")
    ),
    tag = "Administration"
)]
pub async fn refresh_claims(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let profile = crate::store::find_profile(state.store.as_ref(), &subject_id)
        .await
        .map_err(|e| AppError::from(ServiceError::from(e)))?
        .ok_or(ServiceError::ProfileNotFound)
        .map_err(AppError::from)?;

    let (claims, sync) = state.claims.reconcile(&profile).await;

    Ok(Json(ClaimsRefreshResponse {
        claims,
        claims_sync_degraded: sync.is_degraded(),
    }))
}

/// Invalidate every session issued before now
#[utoipa::path(
    post,
    path = "/admin/force-logout",
    responses(
        (status = 200, description = "Force-logout watermark advanced", body = ForceLogoutResponse),
        (status = 503, description = "Profile store unavailable")
    ),
    tag = "Administration"
)]
pub async fn force_logout(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let since = state
        .markers
        .set_force_logout(&actor.subject_id)
        .await
        .map_err(AppError::from)?;
    Ok(Json(ForceLogoutResponse { since }))
}

/// Toggle the lockdown marker
#[utoipa::path(
    put,
    path = "/admin/lockdown",
    request_body = SetLockdownRequest,
    responses(
        (status = 200, description = "Lockdown updated", body = MessageResponse),
        (status = 503, description = "Profile store unavailable")
    ),
    tag = "Administration"
)]
pub async fn set_lockdown(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<SetLockdownRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .markers
        .set_lockdown(&actor.subject_id, req.enabled)
        .await
        .map_err(AppError::from)?;
    Ok(Json(MessageResponse {
        message: format!("Lockdown {}", if req.enabled { "enabled" } else { "disabled" }),
    }))
}

/// Toggle the maintenance marker
#[utoipa::path(
    put,
    path = "/admin/maintenance",
    request_body = SetMaintenanceRequest,
    responses(
        (status = 200, description = "Maintenance mode updated", body = MessageResponse),
        (status = 503, description = "Profile store unavailable")
    ),
    tag = "Administration"
)]
pub async fn set_maintenance(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<SetMaintenanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .markers
        .set_maintenance(
            &actor.subject_id,
            MaintenanceMarker {
                enabled: req.enabled,
                message: req.message,
            },
        )
        .await
        .map_err(AppError::from)?;
    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: format!(
                "Maintenance mode {}",
                if req.enabled { "enabled" } else { "disabled" }
            ),
        }),
    ))
}
