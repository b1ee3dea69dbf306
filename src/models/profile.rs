//! Profile records - the authoritative role/approval state for a subject.
//!
//! A subject occupies exactly one of the pending or approved sets at any time
//! after first sign-in. The approved set also holds rejected subjects as
//! permanently disabled records, so a rejection blocks rather than erases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identity attributes extracted from a verified identity token.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub subject_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: bool,
}

/// Portal roles. Owner strictly outranks Staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Staff,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::Owner => "owner",
        }
    }

    /// Whether this role meets a required level.
    pub fn satisfies(&self, required: Role) -> bool {
        match required {
            Role::Staff => true,
            Role::Owner => *self == Role::Owner,
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "staff" => Ok(Role::Staff),
            "owner" => Ok(Role::Owner),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// A subject awaiting owner approval. Role and approval are implicitly absent.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PendingProfile {
    #[serde(rename = "_id")]
    pub subject_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    #[schema(value_type = String, format = "date-time")]
    pub created_utc: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    #[schema(value_type = String, format = "date-time")]
    pub last_login_utc: DateTime<Utc>,
}

impl PendingProfile {
    pub fn new(identity: &VerifiedIdentity) -> Self {
        let now = Utc::now();
        Self {
            subject_id: identity.subject_id.clone(),
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
            photo_url: identity.photo_url.clone(),
            created_utc: now,
            last_login_utc: now,
        }
    }
}

/// An approved (or permanently disabled) subject.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApprovedProfile {
    #[serde(rename = "_id")]
    pub subject_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub role: Role,
    pub approved: bool,
    pub disabled: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    #[schema(value_type = String, format = "date-time")]
    pub created_utc: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    #[schema(value_type = String, format = "date-time")]
    pub approved_utc: DateTime<Utc>,
    pub approved_by: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    #[schema(value_type = String, format = "date-time")]
    pub updated_utc: DateTime<Utc>,
    pub updated_by: String,
}

impl ApprovedProfile {
    pub fn new(identity: &VerifiedIdentity, role: Role, approved_by: &str) -> Self {
        let now = Utc::now();
        Self {
            subject_id: identity.subject_id.clone(),
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
            photo_url: identity.photo_url.clone(),
            role,
            approved: true,
            disabled: false,
            created_utc: now,
            approved_utc: now,
            approved_by: approved_by.to_string(),
            updated_utc: now,
            updated_by: approved_by.to_string(),
        }
    }

    /// Promote a pending record, preserving its creation time.
    pub fn from_pending(pending: &PendingProfile, role: Role, approved_by: &str) -> Self {
        let now = Utc::now();
        Self {
            subject_id: pending.subject_id.clone(),
            email: pending.email.clone(),
            display_name: pending.display_name.clone(),
            photo_url: pending.photo_url.clone(),
            role,
            approved: true,
            disabled: false,
            created_utc: pending.created_utc,
            approved_utc: now,
            approved_by: approved_by.to_string(),
            updated_utc: now,
            updated_by: approved_by.to_string(),
        }
    }

    /// Effective access for gating: a disabled record never counts as
    /// approved, whatever the stored flag says.
    pub fn effective_approved(&self) -> bool {
        self.approved && !self.disabled
    }
}

/// A profile as found in whichever set currently holds the subject.
#[derive(Debug, Clone)]
pub enum Profile {
    Pending(PendingProfile),
    Approved(ApprovedProfile),
}

impl Profile {
    pub fn subject_id(&self) -> &str {
        match self {
            Profile::Pending(p) => &p.subject_id,
            Profile::Approved(a) => &a.subject_id,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Profile::Pending(p) => &p.email,
            Profile::Approved(a) => &a.email,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Profile::Pending(_) => None,
            Profile::Approved(a) => Some(a.role),
        }
    }

    pub fn is_approved(&self) -> bool {
        match self {
            Profile::Pending(_) => false,
            Profile::Approved(a) => a.effective_approved(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> VerifiedIdentity {
        VerifiedIdentity {
            subject_id: "sub-1".to_string(),
            email: "user@example.com".to_string(),
            display_name: Some("User".to_string()),
            photo_url: None,
            email_verified: true,
        }
    }

    #[test]
    fn owner_satisfies_staff_requirement() {
        assert!(Role::Owner.satisfies(Role::Staff));
        assert!(Role::Owner.satisfies(Role::Owner));
        assert!(Role::Staff.satisfies(Role::Staff));
        assert!(!Role::Staff.satisfies(Role::Owner));
    }

    #[test]
    fn promotion_preserves_creation_time() {
        let pending = PendingProfile::new(&identity());
        let approved = ApprovedProfile::from_pending(&pending, Role::Staff, "owner-1");
        assert_eq!(approved.created_utc, pending.created_utc);
        assert!(approved.approved);
        assert!(!approved.disabled);
        assert_eq!(approved.approved_by, "owner-1");
    }

    #[test]
    fn disabled_record_is_not_effectively_approved() {
        let mut approved = ApprovedProfile::new(&identity(), Role::Staff, "owner-1");
        assert!(approved.effective_approved());
        approved.disabled = true;
        assert!(!approved.effective_approved());
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Owner".parse::<Role>().unwrap(), Role::Owner);
        assert_eq!("staff".parse::<Role>().unwrap(), Role::Staff);
        assert!("admin".parse::<Role>().is_err());
    }
}
