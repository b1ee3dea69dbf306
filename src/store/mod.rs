//! Profile Store adapter.
//!
//! The portal's hosted document store is external; this module wraps the
//! three logical sets the auth subsystem owns (`pending`, `approved`,
//! `audit`, all keyed by subject id) plus the singleton invalidation-marker
//! documents. `MongoStore` is the production implementation; `MemoryStore`
//! backs the test suites.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    ApprovedProfile, AuditAction, AuditEntry, MaintenanceMarker, MarkerState, PendingProfile,
    Profile,
};

/// The store is a remote dependency; every failure is an availability
/// failure from this subsystem's point of view. Callers decide fail-open
/// versus fail-closed per operation.
#[derive(Debug, Error)]
#[error("document store unavailable: {0}")]
pub struct StoreError(#[from] pub anyhow::Error);

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError(anyhow::Error::new(err))
    }
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    // Pending set
    async fn find_pending(&self, subject_id: &str) -> Result<Option<PendingProfile>, StoreError>;
    async fn list_pending(&self) -> Result<Vec<PendingProfile>, StoreError>;
    async fn insert_pending(&self, profile: &PendingProfile) -> Result<(), StoreError>;
    async fn delete_pending(&self, subject_id: &str) -> Result<bool, StoreError>;

    // Approved set
    async fn find_approved(&self, subject_id: &str) -> Result<Option<ApprovedProfile>, StoreError>;
    async fn list_approved(&self) -> Result<Vec<ApprovedProfile>, StoreError>;
    async fn upsert_approved(&self, profile: &ApprovedProfile) -> Result<(), StoreError>;
    async fn delete_approved(&self, subject_id: &str) -> Result<bool, StoreError>;

    /// Number of non-disabled Owner records, the precondition for first-user
    /// bootstrap.
    async fn count_owners(&self) -> Result<u64, StoreError>;

    /// Atomically claim the owner-bootstrap slot. Exactly one caller receives
    /// `true` per armed slot, however many race.
    async fn try_claim_owner_bootstrap(&self) -> Result<bool, StoreError>;

    /// Re-arm the owner-bootstrap slot. Called when a mutation leaves zero
    /// active owners, so the next registration can bootstrap again.
    async fn release_owner_bootstrap(&self) -> Result<(), StoreError>;

    async fn touch_last_login(
        &self,
        subject_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    // Invalidation markers (singleton documents)
    async fn read_markers(&self) -> Result<MarkerState, StoreError>;
    async fn set_force_logout_since(&self, since: DateTime<Utc>) -> Result<(), StoreError>;
    async fn set_lockdown(&self, enabled: bool) -> Result<(), StoreError>;
    async fn set_maintenance(&self, marker: &MaintenanceMarker) -> Result<(), StoreError>;

    // Audit (append-only)
    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), StoreError>;
    async fn list_audit(
        &self,
        actions: &[AuditAction],
        limit: i64,
    ) -> Result<Vec<AuditEntry>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Find a profile in whichever set currently holds it. The exactly-one-set
/// invariant makes the lookup order irrelevant for correct data; pending is
/// checked second so an approved record wins if the invariant was ever
/// violated by hand-edited data.
pub async fn find_profile(
    store: &dyn ProfileStore,
    subject_id: &str,
) -> Result<Option<Profile>, StoreError> {
    if let Some(approved) = store.find_approved(subject_id).await? {
        return Ok(Some(Profile::Approved(approved)));
    }
    Ok(store.find_pending(subject_id).await?.map(Profile::Pending))
}
