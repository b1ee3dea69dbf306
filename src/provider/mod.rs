//! External identity provider boundary.
//!
//! The provider issues the short-lived identity tokens users sign in with and
//! hosts the custom-claims cache. This system only consumes it: token
//! verification is an oracle call, claims writes are full overwrites.

mod http;
mod mock;

pub use http::HttpProvider;
pub use mock::MockProvider;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CustomClaims, VerifiedIdentity};

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Malformed token or bad signature/issuer/audience.
    #[error("invalid identity token")]
    InvalidToken,

    /// Structurally valid token past its expiry.
    #[error("identity token expired")]
    ExpiredToken,

    /// The verification or admin endpoint could not be reached. Never treated
    /// as valid; callers may retry.
    #[error("identity provider unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify an identity token's signature, issuer, audience, and expiry.
    async fn verify_identity_token(
        &self,
        token: &str,
    ) -> Result<VerifiedIdentity, ProviderError>;

    /// Read the cached custom claims for a subject. `None` means the cache
    /// holds nothing for this subject.
    async fn read_claims(&self, subject_id: &str) -> Result<Option<CustomClaims>, ProviderError>;

    /// Overwrite the custom claims for a subject. Last write wins, no merge.
    async fn write_claims(
        &self,
        subject_id: &str,
        claims: &CustomClaims,
    ) -> Result<(), ProviderError>;

    /// Remove all custom claims for a subject.
    async fn clear_claims(&self, subject_id: &str) -> Result<(), ProviderError>;

    /// Enable or disable the account at the provider itself.
    async fn set_account_disabled(
        &self,
        subject_id: &str,
        disabled: bool,
    ) -> Result<(), ProviderError>;

    /// Delete the account at the provider.
    async fn delete_account(&self, subject_id: &str) -> Result<(), ProviderError>;
}
