use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};

use crate::dtos::admin::{AuditListResponse, AuditQuery};
use crate::error::AppError;
use crate::models::AuditAction;
use crate::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Role and approval change history
#[utoipa::path(
    get,
    path = "/admin/logs/roles",
    params(AuditQuery),
    responses(
        (status = 200, description = "Role mutation audit entries, newest first", body = AuditListResponse),
        (status = 403, description = "Caller is not an owner")
    ),
    tag = "Audit"
)]
pub async fn role_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, AppError> {
    let entries = state
        .store
        .list_audit(
            &[
                AuditAction::Approve,
                AuditAction::Reject,
                AuditAction::RoleChange,
                AuditAction::SetDisabled,
                AuditAction::Delete,
                AuditAction::ForceLogout,
                AuditAction::Lockdown,
                AuditAction::Maintenance,
            ],
            clamp_limit(query.limit),
        )
        .await
        .map_err(|e| AppError::InternalError(e.0))?;
    Ok(Json(AuditListResponse { entries }))
}

/// Sign-in history, including admin-bypass sign-ins
#[utoipa::path(
    get,
    path = "/admin/logs/signins",
    params(AuditQuery),
    responses(
        (status = 200, description = "Sign-in audit entries, newest first", body = AuditListResponse),
        (status = 403, description = "Caller is not an owner")
    ),
    tag = "Audit"
)]
pub async fn signin_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, AppError> {
    let entries = state
        .store
        .list_audit(
            &[AuditAction::Signin, AuditAction::AdminBypass],
            clamp_limit(query.limit),
        )
        .await
        .map_err(|e| AppError::InternalError(e.0))?;
    Ok(Json(AuditListResponse { entries }))
}
