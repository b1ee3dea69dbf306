//! In-memory Profile Store used by the test suites.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{ProfileStore, StoreError};
use crate::models::{
    ApprovedProfile, AuditAction, AuditEntry, MaintenanceMarker, MarkerState, PendingProfile,
    Role,
};

#[derive(Default)]
pub struct MemoryStore {
    pending: Mutex<HashMap<String, PendingProfile>>,
    approved: Mutex<HashMap<String, ApprovedProfile>>,
    audit: Mutex<Vec<AuditEntry>>,
    markers: Mutex<MarkerState>,
    bootstrap_claimed: AtomicBool,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the store into an erroring state to exercise fail-open and
    /// fail-closed paths.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError(anyhow::anyhow!("memory store offline")))
        } else {
            Ok(())
        }
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_pending(&self, subject_id: &str) -> Result<Option<PendingProfile>, StoreError> {
        self.check_available()?;
        Ok(self.lock(&self.pending).get(subject_id).cloned())
    }

    async fn list_pending(&self) -> Result<Vec<PendingProfile>, StoreError> {
        self.check_available()?;
        let mut all: Vec<_> = self.lock(&self.pending).values().cloned().collect();
        all.sort_by_key(|p| p.created_utc);
        Ok(all)
    }

    async fn insert_pending(&self, profile: &PendingProfile) -> Result<(), StoreError> {
        self.check_available()?;
        self.lock(&self.pending)
            .insert(profile.subject_id.clone(), profile.clone());
        Ok(())
    }

    async fn delete_pending(&self, subject_id: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.lock(&self.pending).remove(subject_id).is_some())
    }

    async fn find_approved(&self, subject_id: &str) -> Result<Option<ApprovedProfile>, StoreError> {
        self.check_available()?;
        Ok(self.lock(&self.approved).get(subject_id).cloned())
    }

    async fn list_approved(&self) -> Result<Vec<ApprovedProfile>, StoreError> {
        self.check_available()?;
        let mut all: Vec<_> = self.lock(&self.approved).values().cloned().collect();
        all.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(all)
    }

    async fn upsert_approved(&self, profile: &ApprovedProfile) -> Result<(), StoreError> {
        self.check_available()?;
        self.lock(&self.approved)
            .insert(profile.subject_id.clone(), profile.clone());
        Ok(())
    }

    async fn delete_approved(&self, subject_id: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.lock(&self.approved).remove(subject_id).is_some())
    }

    async fn count_owners(&self) -> Result<u64, StoreError> {
        self.check_available()?;
        Ok(self
            .lock(&self.approved)
            .values()
            .filter(|p| p.role == Role::Owner && !p.disabled)
            .count() as u64)
    }

    async fn try_claim_owner_bootstrap(&self) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(!self.bootstrap_claimed.swap(true, Ordering::SeqCst))
    }

    async fn release_owner_bootstrap(&self) -> Result<(), StoreError> {
        self.check_available()?;
        self.bootstrap_claimed.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn touch_last_login(
        &self,
        subject_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        if let Some(pending) = self.lock(&self.pending).get_mut(subject_id) {
            pending.last_login_utc = at;
        }
        Ok(())
    }

    async fn read_markers(&self) -> Result<MarkerState, StoreError> {
        self.check_available()?;
        Ok(self.lock(&self.markers).clone())
    }

    async fn set_force_logout_since(&self, since: DateTime<Utc>) -> Result<(), StoreError> {
        self.check_available()?;
        self.lock(&self.markers).force_logout_since = since;
        Ok(())
    }

    async fn set_lockdown(&self, enabled: bool) -> Result<(), StoreError> {
        self.check_available()?;
        self.lock(&self.markers).lockdown_enabled = enabled;
        Ok(())
    }

    async fn set_maintenance(&self, marker: &MaintenanceMarker) -> Result<(), StoreError> {
        self.check_available()?;
        self.lock(&self.markers).maintenance = marker.clone();
        Ok(())
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        self.check_available()?;
        self.lock(&self.audit).push(entry.clone());
        Ok(())
    }

    async fn list_audit(
        &self,
        actions: &[AuditAction],
        limit: i64,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        self.check_available()?;
        let entries = self.lock(&self.audit);
        let mut selected: Vec<_> = entries
            .iter()
            .filter(|e| actions.is_empty() || actions.contains(&e.action))
            .cloned()
            .collect();
        selected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        selected.truncate(limit.max(0) as usize);
        Ok(selected)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VerifiedIdentity;

    fn identity(subject_id: &str) -> VerifiedIdentity {
        VerifiedIdentity {
            subject_id: subject_id.to_string(),
            email: format!("{}@example.com", subject_id),
            display_name: None,
            photo_url: None,
            email_verified: true,
        }
    }

    #[tokio::test]
    async fn touch_last_login_updates_pending_records_only() {
        let store = MemoryStore::new();
        let pending = PendingProfile::new(&identity("p1"));
        store.insert_pending(&pending).await.unwrap();
        let approved = ApprovedProfile::new(&identity("a1"), Role::Staff, "admin");
        store.upsert_approved(&approved).await.unwrap();

        let later = Utc::now() + chrono::Duration::hours(1);
        store.touch_last_login("p1", later).await.unwrap();
        store.touch_last_login("a1", later).await.unwrap();

        let touched = store.find_pending("p1").await.unwrap().unwrap();
        assert_eq!(touched.last_login_utc, later);
        // Approved records carry no last-login field; the touch is a no-op.
        let untouched = store.find_approved("a1").await.unwrap().unwrap();
        assert_eq!(untouched.updated_utc, approved.updated_utc);
    }

    #[tokio::test]
    async fn released_bootstrap_slot_can_be_claimed_again() {
        let store = MemoryStore::new();
        assert!(store.try_claim_owner_bootstrap().await.unwrap());
        assert!(!store.try_claim_owner_bootstrap().await.unwrap());

        store.release_owner_bootstrap().await.unwrap();
        assert!(store.try_claim_owner_bootstrap().await.unwrap());
    }
}
