//! Claims Synchronizer.
//!
//! Mirrors the authoritative profile state into the identity provider's
//! custom claims so browser-side code can read role and approval without a
//! round trip. The mirror is best effort: a failed push degrades the result
//! instead of failing the mutation, because the profile store remains the
//! source of truth and the next successful sync heals the drift.

use std::sync::Arc;

use crate::config::AdminBypassConfig;
use crate::models::{ApprovedProfile, CustomClaims, Profile};
use crate::provider::IdentityProvider;

/// Outcome of a mutation whose claims mirror may have lagged behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced,
    /// The store write landed but the provider push failed. Callers surface
    /// this to the operator so they know the browser view may be stale.
    Degraded,
}

impl SyncOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, SyncOutcome::Degraded)
    }
}

#[derive(Clone)]
pub struct ClaimsSync {
    provider: Arc<dyn IdentityProvider>,
    bypass: AdminBypassConfig,
}

impl ClaimsSync {
    pub fn new(provider: Arc<dyn IdentityProvider>, bypass: AdminBypassConfig) -> Self {
        Self { provider, bypass }
    }

    fn bypass_applies(&self, email: &str) -> bool {
        self.bypass.enabled
            && self
                .bypass
                .email
                .as_deref()
                .is_some_and(|configured| configured.eq_ignore_ascii_case(email))
    }

    /// Push the claims derived from an approved profile. The configured
    /// bypass account always mirrors as an approved owner, whatever its
    /// stored state says.
    pub async fn push(&self, profile: &ApprovedProfile) -> SyncOutcome {
        let claims = if self.bypass_applies(&profile.email) {
            CustomClaims::admin_bypass()
        } else {
            CustomClaims::from(profile)
        };
        self.write(&profile.subject_id, &claims).await
    }

    /// Push the unapproved shape for an account with no approved profile.
    pub async fn push_unapproved(&self, subject_id: &str, email: &str) -> SyncOutcome {
        let claims = if self.bypass_applies(email) {
            CustomClaims::admin_bypass()
        } else {
            CustomClaims::unapproved()
        };
        self.write(subject_id, &claims).await
    }

    /// Remove the mirror entirely, used when an account is deleted.
    pub async fn clear(&self, subject_id: &str) -> SyncOutcome {
        match self.provider.clear_claims(subject_id).await {
            Ok(()) => SyncOutcome::Synced,
            Err(e) => {
                tracing::warn!(subject = %subject_id, error = %e, "Claims clear failed, mirror is stale");
                SyncOutcome::Degraded
            }
        }
    }

    /// Re-push the mirror from the authoritative profile and report the
    /// effective claims. Used by the admin refresh operation to heal a
    /// drifted mirror.
    pub async fn reconcile(&self, profile: &Profile) -> (CustomClaims, SyncOutcome) {
        match profile {
            Profile::Approved(approved) => {
                let sync = self.push(approved).await;
                let claims = self
                    .resolve(&approved.subject_id, &approved.email, Some(approved))
                    .await;
                (claims, sync)
            }
            Profile::Pending(pending) => {
                let sync = self.push_unapproved(&pending.subject_id, &pending.email).await;
                let claims = self.resolve(&pending.subject_id, &pending.email, None).await;
                (claims, sync)
            }
        }
    }

    /// Resolve the effective role and approval for a live session.
    ///
    /// The provider mirror is consulted first because it is cheap and usually
    /// current; `fallback` carries the authoritative store state for when the
    /// mirror is unreadable. Bypass overrides both.
    pub async fn resolve(
        &self,
        subject_id: &str,
        email: &str,
        fallback: Option<&ApprovedProfile>,
    ) -> CustomClaims {
        if self.bypass_applies(email) {
            tracing::warn!(subject = %subject_id, "Admin bypass claims in effect");
            return CustomClaims::admin_bypass();
        }

        match self.provider.read_claims(subject_id).await {
            Ok(Some(claims)) => claims,
            Ok(None) => fallback.map(CustomClaims::from).unwrap_or_else(CustomClaims::unapproved),
            Err(e) => {
                tracing::warn!(subject = %subject_id, error = %e, "Claims read failed, using stored profile");
                fallback.map(CustomClaims::from).unwrap_or_else(CustomClaims::unapproved)
            }
        }
    }

    async fn write(&self, subject_id: &str, claims: &CustomClaims) -> SyncOutcome {
        match self.provider.write_claims(subject_id, claims).await {
            Ok(()) => SyncOutcome::Synced,
            Err(e) => {
                tracing::warn!(subject = %subject_id, error = %e, "Claims push failed, mirror is stale");
                SyncOutcome::Degraded
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, VerifiedIdentity};
    use crate::provider::MockProvider;

    fn approved(subject_id: &str, email: &str, role: Role) -> ApprovedProfile {
        let identity = VerifiedIdentity {
            subject_id: subject_id.to_string(),
            email: email.to_string(),
            display_name: Some("Test".to_string()),
            photo_url: None,
            email_verified: true,
        };
        ApprovedProfile::new(&identity, role, "system")
    }

    fn no_bypass() -> AdminBypassConfig {
        AdminBypassConfig {
            enabled: false,
            email: None,
        }
    }

    fn bypass_for(email: &str) -> AdminBypassConfig {
        AdminBypassConfig {
            enabled: true,
            email: Some(email.to_string()),
        }
    }

    #[tokio::test]
    async fn push_mirrors_profile_into_provider() {
        let provider = Arc::new(MockProvider::new());
        let sync = ClaimsSync::new(provider.clone(), no_bypass());

        let profile = approved("u1", "staff@example.com", Role::Staff);
        assert_eq!(sync.push(&profile).await, SyncOutcome::Synced);

        let claims = provider.claims_for("u1").unwrap();
        assert_eq!(claims.role, Some(Role::Staff));
        assert!(claims.approved);
        assert!(!claims.admin_bypass);
    }

    #[tokio::test]
    async fn reconcile_overwrites_a_drifted_mirror() {
        let provider = Arc::new(MockProvider::new());
        let sync = ClaimsSync::new(provider.clone(), no_bypass());

        // Mirror says unapproved; the store profile is an approved owner.
        provider.write_claims("u1", &CustomClaims::unapproved()).await.unwrap();

        let profile = Profile::Approved(approved("u1", "owner@example.com", Role::Owner));
        let (claims, outcome) = sync.reconcile(&profile).await;
        assert_eq!(outcome, SyncOutcome::Synced);
        assert_eq!(claims.role, Some(Role::Owner));
        assert_eq!(provider.claims_for("u1").unwrap().role, Some(Role::Owner));
    }

    #[tokio::test]
    async fn reconcile_pushes_the_unapproved_shape_for_pending_profiles() {
        let provider = Arc::new(MockProvider::new());
        let sync = ClaimsSync::new(provider.clone(), no_bypass());

        let identity = VerifiedIdentity {
            subject_id: "u2".to_string(),
            email: "pending@example.com".to_string(),
            display_name: None,
            photo_url: None,
            email_verified: true,
        };
        let profile = Profile::Pending(crate::models::PendingProfile::new(&identity));
        let (claims, outcome) = sync.reconcile(&profile).await;
        assert_eq!(outcome, SyncOutcome::Synced);
        assert_eq!(claims.role, None);
        assert!(!claims.approved);
    }

    #[tokio::test]
    async fn push_failure_is_degraded_not_fatal() {
        let provider = Arc::new(MockProvider::new());
        provider.set_unavailable(true);
        let sync = ClaimsSync::new(provider.clone(), no_bypass());

        let profile = approved("u1", "staff@example.com", Role::Staff);
        assert_eq!(sync.push(&profile).await, SyncOutcome::Degraded);
    }

    #[tokio::test]
    async fn bypass_email_always_mirrors_as_owner() {
        let provider = Arc::new(MockProvider::new());
        let sync = ClaimsSync::new(provider.clone(), bypass_for("break-glass@example.com"));

        // Stored as disabled staff, mirrored as approved owner.
        let mut profile = approved("u1", "break-glass@example.com", Role::Staff);
        profile.disabled = true;
        sync.push(&profile).await;

        let claims = provider.claims_for("u1").unwrap();
        assert_eq!(claims.role, Some(Role::Owner));
        assert!(claims.approved);
        assert!(claims.admin_bypass);
    }

    #[tokio::test]
    async fn resolve_prefers_provider_mirror() {
        let provider = Arc::new(MockProvider::new());
        let sync = ClaimsSync::new(provider.clone(), no_bypass());

        let profile = approved("u1", "staff@example.com", Role::Owner);
        sync.push(&profile).await;

        let stale = approved("u1", "staff@example.com", Role::Staff);
        let claims = sync.resolve("u1", "staff@example.com", Some(&stale)).await;
        assert_eq!(claims.role, Some(Role::Owner));
    }

    #[tokio::test]
    async fn resolve_falls_back_to_stored_profile_on_outage() {
        let provider = Arc::new(MockProvider::new());
        let sync = ClaimsSync::new(provider.clone(), no_bypass());
        provider.set_unavailable(true);

        let profile = approved("u1", "staff@example.com", Role::Staff);
        let claims = sync.resolve("u1", "staff@example.com", Some(&profile)).await;
        assert_eq!(claims.role, Some(Role::Staff));
        assert!(claims.approved);
    }

    #[tokio::test]
    async fn resolve_without_profile_or_mirror_is_unapproved() {
        let provider = Arc::new(MockProvider::new());
        let sync = ClaimsSync::new(provider, no_bypass());

        let claims = sync.resolve("u1", "nobody@example.com", None).await;
        assert_eq!(claims.role, None);
        assert!(!claims.approved);
    }
}
