//! In-process identity provider used by the test suites.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{IdentityProvider, ProviderError};
use crate::models::{CustomClaims, VerifiedIdentity};

#[derive(Default)]
pub struct MockProvider {
    tokens: Mutex<HashMap<String, VerifiedIdentity>>,
    expired_tokens: Mutex<HashSet<String>>,
    claims: Mutex<HashMap<String, CustomClaims>>,
    disabled: Mutex<HashSet<String>>,
    deleted: Mutex<HashSet<String>>,
    unavailable: AtomicBool,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an identity token the mock will verify successfully.
    pub fn issue_token(&self, token: &str, identity: VerifiedIdentity) {
        self.lock(&self.tokens).insert(token.to_string(), identity);
    }

    /// Register a token that verifies as expired.
    pub fn issue_expired_token(&self, token: &str) {
        self.lock(&self.expired_tokens).insert(token.to_string());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn claims_for(&self, subject_id: &str) -> Option<CustomClaims> {
        self.lock(&self.claims).get(subject_id).cloned()
    }

    pub fn is_disabled(&self, subject_id: &str) -> bool {
        self.lock(&self.disabled).contains(subject_id)
    }

    pub fn is_deleted(&self, subject_id: &str) -> bool {
        self.lock(&self.deleted).contains(subject_id)
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(ProviderError::Unavailable(anyhow::anyhow!(
                "mock provider offline"
            )))
        } else {
            Ok(())
        }
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    async fn verify_identity_token(
        &self,
        token: &str,
    ) -> Result<VerifiedIdentity, ProviderError> {
        self.check_available()?;
        if self.lock(&self.expired_tokens).contains(token) {
            return Err(ProviderError::ExpiredToken);
        }
        self.lock(&self.tokens)
            .get(token)
            .cloned()
            .ok_or(ProviderError::InvalidToken)
    }

    async fn read_claims(&self, subject_id: &str) -> Result<Option<CustomClaims>, ProviderError> {
        self.check_available()?;
        Ok(self.lock(&self.claims).get(subject_id).cloned())
    }

    async fn write_claims(
        &self,
        subject_id: &str,
        claims: &CustomClaims,
    ) -> Result<(), ProviderError> {
        self.check_available()?;
        self.lock(&self.claims)
            .insert(subject_id.to_string(), claims.clone());
        Ok(())
    }

    async fn clear_claims(&self, subject_id: &str) -> Result<(), ProviderError> {
        self.check_available()?;
        self.lock(&self.claims).remove(subject_id);
        Ok(())
    }

    async fn set_account_disabled(
        &self,
        subject_id: &str,
        disabled: bool,
    ) -> Result<(), ProviderError> {
        self.check_available()?;
        if disabled {
            self.lock(&self.disabled).insert(subject_id.to_string());
        } else {
            self.lock(&self.disabled).remove(subject_id);
        }
        Ok(())
    }

    async fn delete_account(&self, subject_id: &str) -> Result<(), ProviderError> {
        self.check_available()?;
        self.lock(&self.deleted).insert(subject_id.to_string());
        self.lock(&self.claims).remove(subject_id);
        Ok(())
    }
}
