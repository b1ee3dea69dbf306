//! Role Gate.
//!
//! Pure per-request decision function. Marker checks run first so an owner
//! can still reach the portal during maintenance or lockdown, then session
//! validity, then approval, then role sufficiency. Keeping this free of I/O
//! lets every route's policy be tested as a table.

use serde::Serialize;
use utoipa::ToSchema;

use super::session::SessionAccess;
use crate::models::{MarkerState, Role};

/// What a route demands of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    pub required_role: Option<Role>,
    pub require_approved: bool,
}

impl AccessPolicy {
    /// Any valid session, approved or not. Used by the pending-approval and
    /// session-info surfaces.
    pub const SESSION_ONLY: AccessPolicy = AccessPolicy {
        required_role: None,
        require_approved: false,
    };

    pub const STAFF: AccessPolicy = AccessPolicy {
        required_role: Some(Role::Staff),
        require_approved: true,
    };

    pub const OWNER: AccessPolicy = AccessPolicy {
        required_role: Some(Role::Owner),
        require_approved: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    Allow,
    RedirectLogin,
    RedirectPendingApproval,
    RedirectMaintenance,
    RedirectLockdown,
    Forbidden,
}

impl GateDecision {
    /// Browser redirect target, `None` for Allow and Forbidden.
    pub fn redirect_path(&self) -> Option<&'static str> {
        match self {
            GateDecision::Allow | GateDecision::Forbidden => None,
            GateDecision::RedirectLogin => Some("/login"),
            GateDecision::RedirectPendingApproval => Some("/pending"),
            GateDecision::RedirectMaintenance => Some("/maintenance"),
            GateDecision::RedirectLockdown => Some("/lockdown"),
        }
    }
}

/// Evaluate a route policy for a request.
///
/// `session` is `None` when no credential was presented or the credential
/// failed validation for any reason.
pub fn evaluate(
    policy: AccessPolicy,
    markers: &MarkerState,
    session: Option<&SessionAccess>,
) -> GateDecision {
    let is_owner = session.is_some_and(|access| access.has_role(Role::Owner));

    if markers.maintenance.enabled && !is_owner {
        return GateDecision::RedirectMaintenance;
    }
    if markers.lockdown_enabled && !is_owner {
        return GateDecision::RedirectLockdown;
    }

    let access = match session {
        Some(access) => access,
        None => return GateDecision::RedirectLogin,
    };

    if policy.require_approved && !access.approved {
        return GateDecision::RedirectPendingApproval;
    }

    if let Some(required) = policy.required_role {
        if !access.has_role(required) {
            return GateDecision::Forbidden;
        }
    }

    GateDecision::Allow
}
