use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Administrative and sign-in actions recorded in the append-only audit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Signin,
    Approve,
    Reject,
    RoleChange,
    SetDisabled,
    Delete,
    AdminBypass,
    ForceLogout,
    Lockdown,
    Maintenance,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Signin => "signin",
            AuditAction::Approve => "approve",
            AuditAction::Reject => "reject",
            AuditAction::RoleChange => "role_change",
            AuditAction::SetDisabled => "set_disabled",
            AuditAction::Delete => "delete",
            AuditAction::AdminBypass => "admin_bypass",
            AuditAction::ForceLogout => "force_logout",
            AuditAction::Lockdown => "lockdown",
            AuditAction::Maintenance => "maintenance",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEntry {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<mongodb::bson::oid::ObjectId>,
    pub action: AuditAction,
    pub actor_id: String,
    pub target_id: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    #[schema(value_type = String, format = "date-time")]
    pub timestamp: DateTime<Utc>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, actor_id: &str, target_id: Option<&str>) -> Self {
        Self {
            id: None,
            action,
            actor_id: actor_id.to_string(),
            target_id: target_id.map(str::to_string),
            timestamp: Utc::now(),
            details: None,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_request_context(
        mut self,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}
