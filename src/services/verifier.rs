//! Credential Verifier - thin wrapper over the provider's verification
//! oracle.

use std::sync::Arc;

use crate::models::VerifiedIdentity;
use crate::provider::{IdentityProvider, ProviderError};

/// Fixed identity returned when the development-only auth bypass is active.
const DEV_SUBJECT_ID: &str = "dev-user";
const DEV_EMAIL: &str = "dev@localhost";

#[derive(Clone)]
pub struct CredentialVerifier {
    provider: Arc<dyn IdentityProvider>,
    skip_auth: bool,
}

impl CredentialVerifier {
    pub fn new(provider: Arc<dyn IdentityProvider>, skip_auth: bool) -> Self {
        if skip_auth {
            tracing::warn!("SKIP_AUTH enabled: identity tokens will not be verified");
        }
        Self {
            provider,
            skip_auth,
        }
    }

    /// Validate an identity token and extract the subject's identity.
    ///
    /// `ProviderError::Unavailable` must be surfaced to the caller for retry;
    /// it is never downgraded to a successful verification.
    pub async fn verify(&self, identity_token: &str) -> Result<VerifiedIdentity, ProviderError> {
        if self.skip_auth {
            return Ok(VerifiedIdentity {
                subject_id: DEV_SUBJECT_ID.to_string(),
                email: DEV_EMAIL.to_string(),
                display_name: Some("Dev User".to_string()),
                photo_url: None,
                email_verified: true,
            });
        }

        let identity = self.provider.verify_identity_token(identity_token).await?;

        if !identity.email_verified {
            tracing::warn!(subject_id = %identity.subject_id, "Rejected sign-in with unverified email");
            return Err(ProviderError::InvalidToken);
        }

        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockProvider;

    fn identity(verified: bool) -> VerifiedIdentity {
        VerifiedIdentity {
            subject_id: "sub-1".to_string(),
            email: "user@example.com".to_string(),
            display_name: None,
            photo_url: None,
            email_verified: verified,
        }
    }

    #[tokio::test]
    async fn verifies_known_token() {
        let provider = Arc::new(MockProvider::new());
        provider.issue_token("tok", identity(true));
        let verifier = CredentialVerifier::new(provider, false);

        let verified = verifier.verify("tok").await.unwrap();
        assert_eq!(verified.subject_id, "sub-1");
    }

    #[tokio::test]
    async fn rejects_unknown_token() {
        let provider = Arc::new(MockProvider::new());
        let verifier = CredentialVerifier::new(provider, false);

        assert!(matches!(
            verifier.verify("junk").await,
            Err(ProviderError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let provider = Arc::new(MockProvider::new());
        provider.issue_expired_token("old");
        let verifier = CredentialVerifier::new(provider, false);

        assert!(matches!(
            verifier.verify("old").await,
            Err(ProviderError::ExpiredToken)
        ));
    }

    #[tokio::test]
    async fn rejects_unverified_email() {
        let provider = Arc::new(MockProvider::new());
        provider.issue_token("tok", identity(false));
        let verifier = CredentialVerifier::new(provider, false);

        assert!(matches!(
            verifier.verify("tok").await,
            Err(ProviderError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn provider_outage_is_never_valid() {
        let provider = Arc::new(MockProvider::new());
        provider.issue_token("tok", identity(true));
        provider.set_unavailable(true);
        let verifier = CredentialVerifier::new(provider, false);

        assert!(matches!(
            verifier.verify("tok").await,
            Err(ProviderError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn skip_auth_returns_dev_identity() {
        let provider = Arc::new(MockProvider::new());
        provider.set_unavailable(true);
        let verifier = CredentialVerifier::new(provider, true);

        let verified = verifier.verify("anything").await.unwrap();
        assert_eq!(verified.subject_id, DEV_SUBJECT_ID);
    }
}
