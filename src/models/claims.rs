use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ApprovedProfile, Role};

/// The role/approval mirror pushed to the identity provider's custom-claims
/// cache. The Profile Store is authoritative; this is a cache that may lag by
/// up to one token-refresh interval and is re-pushed after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CustomClaims {
    pub role: Option<Role>,
    pub approved: bool,
    pub admin_bypass: bool,
}

impl CustomClaims {
    /// Claims for a subject with no approved record (pending or unknown).
    pub fn unapproved() -> Self {
        Self {
            role: None,
            approved: false,
            admin_bypass: false,
        }
    }

    /// The emergency-override claims forced for the designated bypass email.
    pub fn admin_bypass() -> Self {
        Self {
            role: Some(Role::Owner),
            approved: true,
            admin_bypass: true,
        }
    }
}

impl From<&ApprovedProfile> for CustomClaims {
    fn from(profile: &ApprovedProfile) -> Self {
        Self {
            role: Some(profile.role),
            approved: profile.effective_approved(),
            admin_bypass: false,
        }
    }
}
