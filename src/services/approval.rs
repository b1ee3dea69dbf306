//! Approval state machine.
//!
//! Every subject moves through `unknown -> pending -> approved`, with
//! rejection parking the subject as a permanently disabled approved record so
//! the block survives re-registration. All transitions are owner actions
//! except first sign-in, which may self-approve through the one-time owner
//! bootstrap, the bootstrap allowlists, or auto-approve mode.

use std::sync::Arc;

use super::claims::{ClaimsSync, SyncOutcome};
use super::ServiceError;
use crate::config::ApprovalConfig;
use crate::models::{
    ApprovedProfile, AuditAction, AuditEntry, PendingProfile, Profile, Role, VerifiedIdentity,
};
use crate::provider::IdentityProvider;
use crate::store::{self, ProfileStore};

/// How a sign-in registration resolved.
#[derive(Debug, Clone)]
pub struct Registration {
    pub profile: Profile,
    /// False when the subject already had a record and this was a plain
    /// returning sign-in.
    pub newly_created: bool,
    /// True when this subject raced another first sign-in for the owner
    /// bootstrap and lost. Surfaced so the UI can explain the pending state.
    pub bootstrap_conflict: bool,
    pub sync: SyncOutcome,
}

/// An admin mutation plus the state of its claims mirror afterwards.
#[derive(Debug, Clone)]
pub struct Mutation {
    pub profile: ApprovedProfile,
    pub sync: SyncOutcome,
}

#[derive(Clone)]
pub struct ApprovalService {
    store: Arc<dyn ProfileStore>,
    provider: Arc<dyn IdentityProvider>,
    claims: ClaimsSync,
    config: ApprovalConfig,
}

impl ApprovalService {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        provider: Arc<dyn IdentityProvider>,
        claims: ClaimsSync,
        config: ApprovalConfig,
    ) -> Self {
        Self {
            store,
            provider,
            claims,
            config,
        }
    }

    /// Register a verified identity at sign-in.
    ///
    /// Returning subjects only get their last-login touched. New subjects are
    /// placed by, in order: the owner bootstrap (armed whenever no active
    /// owner exists), the bootstrap allowlists, auto-approve mode, and
    /// otherwise the pending queue.
    pub async fn register(
        &self,
        identity: &VerifiedIdentity,
    ) -> Result<Registration, ServiceError> {
        if let Some(existing) = store::find_profile(self.store.as_ref(), identity.subject_id.as_str()).await? {
            self.store
                .touch_last_login(identity.subject_id.as_str(), chrono::Utc::now())
                .await?;
            return Ok(Registration {
                profile: existing,
                newly_created: false,
                bootstrap_conflict: false,
                sync: SyncOutcome::Synced,
            });
        }

        let mut bootstrap_conflict = false;
        if self.store.count_owners().await? == 0 {
            // The count check is racy; the claim document is the arbiter.
            if self.store.try_claim_owner_bootstrap().await? {
                tracing::info!(subject = %identity.subject_id, email = %identity.email, "First sign-in claimed owner bootstrap");
                return self
                    .create_approved(identity, Role::Owner, "bootstrap", false)
                    .await;
            }
            bootstrap_conflict = true;
            tracing::warn!(subject = %identity.subject_id, "Lost owner-bootstrap race, falling through");
        }

        if self.on_allowlist(&self.config.owner_emails, &identity.email) {
            return self
                .create_approved(identity, Role::Owner, "allowlist", bootstrap_conflict)
                .await;
        }
        if self.on_allowlist(&self.config.staff_emails, &identity.email) {
            return self
                .create_approved(identity, Role::Staff, "allowlist", bootstrap_conflict)
                .await;
        }
        if self.config.auto_approve {
            return self
                .create_approved(identity, Role::Staff, "auto_approve", bootstrap_conflict)
                .await;
        }

        let pending = PendingProfile::new(identity);
        self.store.insert_pending(&pending).await?;
        let sync = self
            .claims
            .push_unapproved(&identity.subject_id, &identity.email)
            .await;
        tracing::info!(subject = %identity.subject_id, email = %identity.email, "New registration queued for approval");
        Ok(Registration {
            profile: Profile::Pending(pending),
            newly_created: true,
            bootstrap_conflict,
            sync,
        })
    }

    /// Promote a pending subject to the approved set with the given role.
    pub async fn approve(
        &self,
        actor_id: &str,
        subject_id: &str,
        role: Role,
    ) -> Result<Mutation, ServiceError> {
        let pending = self
            .store
            .find_pending(subject_id)
            .await?
            .ok_or(ServiceError::NoPendingRecord)?;

        let approved = ApprovedProfile::from_pending(&pending, role, actor_id);
        self.store.upsert_approved(&approved).await?;
        self.store.delete_pending(subject_id).await?;
        let sync = self.claims.push(&approved).await;

        self.audit(
            AuditEntry::new(AuditAction::Approve, actor_id, Some(subject_id))
                .with_details(format!("approved as {}", role.as_str())),
        )
        .await;
        tracing::info!(actor = %actor_id, subject = %subject_id, role = %role.as_str(), "Registration approved");
        Ok(Mutation {
            profile: approved,
            sync,
        })
    }

    /// Reject a pending subject. The record moves to the approved set as a
    /// permanently disabled entry, so a rejected account stays blocked if it
    /// signs in again.
    pub async fn reject(&self, actor_id: &str, subject_id: &str) -> Result<Mutation, ServiceError> {
        let pending = self
            .store
            .find_pending(subject_id)
            .await?
            .ok_or(ServiceError::NoPendingRecord)?;

        let mut rejected = ApprovedProfile::from_pending(&pending, Role::Staff, actor_id);
        rejected.approved = false;
        rejected.disabled = true;
        self.store.upsert_approved(&rejected).await?;
        self.store.delete_pending(subject_id).await?;

        let mut sync = self
            .claims
            .push_unapproved(subject_id, &rejected.email)
            .await;
        if let Err(e) = self.provider.set_account_disabled(subject_id, true).await {
            tracing::warn!(subject = %subject_id, error = %e, "Provider-side disable failed after rejection");
            sync = SyncOutcome::Degraded;
        }

        self.audit(AuditEntry::new(AuditAction::Reject, actor_id, Some(subject_id)))
            .await;
        tracing::info!(actor = %actor_id, subject = %subject_id, "Registration rejected");
        Ok(Mutation {
            profile: rejected,
            sync,
        })
    }

    /// Change an approved subject's role. Owners cannot retarget themselves.
    pub async fn change_role(
        &self,
        actor_id: &str,
        subject_id: &str,
        role: Role,
    ) -> Result<Mutation, ServiceError> {
        self.guard_self_target(actor_id, subject_id)?;
        let mut profile = self
            .store
            .find_approved(subject_id)
            .await?
            .ok_or(ServiceError::ProfileNotFound)?;

        let previous = profile.role;
        profile.role = role;
        profile.updated_utc = chrono::Utc::now();
        profile.updated_by = actor_id.to_string();
        self.store.upsert_approved(&profile).await?;
        let sync = self.claims.push(&profile).await;

        self.audit(
            AuditEntry::new(AuditAction::RoleChange, actor_id, Some(subject_id))
                .with_details(format!("{} -> {}", previous.as_str(), role.as_str())),
        )
        .await;
        tracing::info!(actor = %actor_id, subject = %subject_id, role = %role.as_str(), "Role changed");
        self.rearm_bootstrap_if_unowned().await;
        Ok(Mutation { profile, sync })
    }

    /// Disable or re-enable an approved subject, mirrored to the provider so
    /// the account cannot mint fresh identity tokens while disabled.
    pub async fn set_disabled(
        &self,
        actor_id: &str,
        subject_id: &str,
        disabled: bool,
    ) -> Result<Mutation, ServiceError> {
        self.guard_self_target(actor_id, subject_id)?;
        let mut profile = self
            .store
            .find_approved(subject_id)
            .await?
            .ok_or(ServiceError::ProfileNotFound)?;

        profile.disabled = disabled;
        profile.updated_utc = chrono::Utc::now();
        profile.updated_by = actor_id.to_string();
        self.store.upsert_approved(&profile).await?;

        let mut sync = self.claims.push(&profile).await;
        if let Err(e) = self.provider.set_account_disabled(subject_id, disabled).await {
            tracing::warn!(subject = %subject_id, error = %e, "Provider-side disable toggle failed");
            sync = SyncOutcome::Degraded;
        }

        self.audit(
            AuditEntry::new(AuditAction::SetDisabled, actor_id, Some(subject_id))
                .with_details(if disabled { "disabled" } else { "enabled" }),
        )
        .await;
        tracing::info!(actor = %actor_id, subject = %subject_id, disabled, "Disabled flag set");
        self.rearm_bootstrap_if_unowned().await;
        Ok(Mutation { profile, sync })
    }

    /// Remove a subject from both sets, the provider, and the claims mirror.
    pub async fn delete(
        &self,
        actor_id: &str,
        subject_id: &str,
    ) -> Result<SyncOutcome, ServiceError> {
        self.guard_self_target(actor_id, subject_id)?;

        let removed_approved = self.store.delete_approved(subject_id).await?;
        let removed_pending = self.store.delete_pending(subject_id).await?;
        if !removed_approved && !removed_pending {
            return Err(ServiceError::ProfileNotFound);
        }

        let mut sync = self.claims.clear(subject_id).await;
        if let Err(e) = self.provider.delete_account(subject_id).await {
            tracing::warn!(subject = %subject_id, error = %e, "Provider-side account deletion failed");
            sync = SyncOutcome::Degraded;
        }

        self.audit(AuditEntry::new(AuditAction::Delete, actor_id, Some(subject_id)))
            .await;
        tracing::info!(actor = %actor_id, subject = %subject_id, "Profile deleted");
        self.rearm_bootstrap_if_unowned().await;
        Ok(sync)
    }

    pub async fn list_pending(&self) -> Result<Vec<PendingProfile>, ServiceError> {
        Ok(self.store.list_pending().await?)
    }

    pub async fn list_approved(&self) -> Result<Vec<ApprovedProfile>, ServiceError> {
        Ok(self.store.list_approved().await?)
    }

    async fn create_approved(
        &self,
        identity: &VerifiedIdentity,
        role: Role,
        approved_by: &str,
        bootstrap_conflict: bool,
    ) -> Result<Registration, ServiceError> {
        let profile = ApprovedProfile::new(identity, role, approved_by);
        self.store.upsert_approved(&profile).await?;
        let sync = self.claims.push(&profile).await;

        self.audit(
            AuditEntry::new(AuditAction::Approve, approved_by, Some(&identity.subject_id))
                .with_details(format!("self-approved as {} via {}", role.as_str(), approved_by)),
        )
        .await;
        Ok(Registration {
            profile: Profile::Approved(profile),
            newly_created: true,
            bootstrap_conflict,
            sync,
        })
    }

    /// Re-arm the bootstrap slot when no active owner remains, so the next
    /// registration becomes Owner again. The mutation has already committed,
    /// so a store hiccup here only delays re-arming until the next mutation.
    async fn rearm_bootstrap_if_unowned(&self) {
        match self.store.count_owners().await {
            Ok(0) => {
                if let Err(e) = self.store.release_owner_bootstrap().await {
                    tracing::warn!(error = %e, "Failed to re-arm owner bootstrap");
                } else {
                    tracing::warn!("No active owner remains, owner bootstrap re-armed");
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Owner count unavailable after mutation");
            }
        }
    }

    fn on_allowlist(&self, list: &[String], email: &str) -> bool {
        list.iter().any(|entry| entry.eq_ignore_ascii_case(email))
    }

    fn guard_self_target(&self, actor_id: &str, subject_id: &str) -> Result<(), ServiceError> {
        if actor_id == subject_id {
            return Err(ServiceError::SelfTarget);
        }
        Ok(())
    }

    /// Audit appends never fail the mutation they describe.
    async fn audit(&self, entry: AuditEntry) {
        if let Err(e) = self.store.append_audit(&entry).await {
            tracing::error!(error = %e, action = entry.action.as_str(), "Failed to append audit entry");
        }
    }
}
