//! HTTP client for the hosted identity provider's verify and admin APIs.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{IdentityProvider, ProviderError};
use crate::config::ProviderConfig;
use crate::models::{CustomClaims, VerifiedIdentity};

#[derive(Clone)]
pub struct HttpProvider {
    client: reqwest::Client,
    verify_url: String,
    admin_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    sub: String,
    email: String,
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifyErrorResponse {
    #[serde(default)]
    error: String,
}

impl HttpProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::Unavailable(anyhow::Error::new(e)))?;

        Ok(Self {
            client,
            verify_url: config.verify_url.clone(),
            admin_url: config.admin_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn admin_endpoint(&self, subject_id: &str, suffix: &str) -> String {
        format!(
            "{}/accounts/{}{}",
            self.admin_url.trim_end_matches('/'),
            subject_id,
            suffix
        )
    }

    fn unavailable(e: reqwest::Error) -> ProviderError {
        ProviderError::Unavailable(anyhow::Error::new(e))
    }

    async fn admin_call(
        &self,
        method: reqwest::Method,
        url: String,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, ProviderError> {
        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.api_key);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(Self::unavailable)?;
        if response.status().is_server_error() {
            return Err(ProviderError::Unavailable(anyhow::anyhow!(
                "provider admin API returned {} for {}",
                response.status(),
                url
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl IdentityProvider for HttpProvider {
    async fn verify_identity_token(
        &self,
        token: &str,
    ) -> Result<VerifiedIdentity, ProviderError> {
        let response = self
            .client
            .post(&self.verify_url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "token": token }))
            .send()
            .await
            .map_err(Self::unavailable)?;

        match response.status() {
            StatusCode::OK => {
                let verified: VerifyResponse =
                    response.json().await.map_err(Self::unavailable)?;
                Ok(VerifiedIdentity {
                    subject_id: verified.sub,
                    email: verified.email.to_lowercase(),
                    display_name: verified.name,
                    photo_url: verified.picture,
                    email_verified: verified.email_verified,
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN => {
                let err: VerifyErrorResponse = response.json().await.unwrap_or(
                    VerifyErrorResponse {
                        error: String::new(),
                    },
                );
                if err.error.to_lowercase().contains("expired") {
                    Err(ProviderError::ExpiredToken)
                } else {
                    Err(ProviderError::InvalidToken)
                }
            }
            status => Err(ProviderError::Unavailable(anyhow::anyhow!(
                "provider verify endpoint returned {}",
                status
            ))),
        }
    }

    async fn read_claims(&self, subject_id: &str) -> Result<Option<CustomClaims>, ProviderError> {
        let response = self
            .admin_call(
                reqwest::Method::GET,
                self.admin_endpoint(subject_id, "/claims"),
                None,
            )
            .await?;

        match response.status() {
            StatusCode::OK => {
                let claims: CustomClaims = response.json().await.map_err(Self::unavailable)?;
                Ok(Some(claims))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(ProviderError::Unavailable(anyhow::anyhow!(
                "provider claims read returned {}",
                status
            ))),
        }
    }

    async fn write_claims(
        &self,
        subject_id: &str,
        claims: &CustomClaims,
    ) -> Result<(), ProviderError> {
        let body = serde_json::to_value(claims)
            .map_err(|e| ProviderError::Unavailable(anyhow::Error::new(e)))?;
        self.admin_call(
            reqwest::Method::PUT,
            self.admin_endpoint(subject_id, "/claims"),
            Some(body),
        )
        .await?;
        Ok(())
    }

    async fn clear_claims(&self, subject_id: &str) -> Result<(), ProviderError> {
        self.admin_call(
            reqwest::Method::DELETE,
            self.admin_endpoint(subject_id, "/claims"),
            None,
        )
        .await?;
        Ok(())
    }

    async fn set_account_disabled(
        &self,
        subject_id: &str,
        disabled: bool,
    ) -> Result<(), ProviderError> {
        self.admin_call(
            reqwest::Method::PATCH,
            self.admin_endpoint(subject_id, ""),
            Some(json!({ "disabled": disabled })),
        )
        .await?;
        Ok(())
    }

    async fn delete_account(&self, subject_id: &str) -> Result<(), ProviderError> {
        self.admin_call(
            reqwest::Method::DELETE,
            self.admin_endpoint(subject_id, ""),
            None,
        )
        .await?;
        Ok(())
    }
}
