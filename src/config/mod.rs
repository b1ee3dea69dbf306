use crate::error::AppError;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    pub environment: Environment,
    pub port: u16,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub mongodb: MongoConfig,
    pub session: SessionConfig,
    pub provider: ProviderConfig,
    pub approval: ApprovalConfig,
    pub bypass: AdminBypassConfig,
    pub markers: MarkerCacheConfig,
    pub security: SecurityConfig,
    pub swagger: SwaggerConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub private_key_path: String,
    pub public_key_path: String,
    /// Session credential lifetime in days. The portal uses long-lived
    /// sessions (5-7 days); revocation is global-only via the force-logout
    /// marker, so the TTL is capped at 7.
    pub ttl_days: i64,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSitePolicy,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    Lax,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Token verification endpoint of the external identity provider.
    pub verify_url: String,
    /// Admin API base for custom claims and account management.
    pub admin_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalConfig {
    /// When enabled, new registrations skip the pending queue and land as
    /// approved Staff.
    pub auto_approve: bool,
    /// Legacy bootstrap allowlists, consulted only at first registration.
    pub owner_emails: Vec<String>,
    pub staff_emails: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminBypassConfig {
    pub enabled: bool,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkerCacheConfig {
    /// Staleness bound for the invalidation-marker cache. A force-logout or
    /// lockdown flip may remain unenforced for up to this long on other
    /// instances.
    pub cache_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    /// Development-only bypass of the credential verifier.
    pub skip_auth: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwaggerConfig {
    pub enabled: SwaggerMode,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SwaggerMode {
    Public,
    Disabled,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = PortalConfig {
            environment: environment.clone(),
            port: get_env("PORT", Some("8080"), is_prod)?
                .parse()
                .map_err(|e: std::num::ParseIntError| {
                    AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                })?,
            service_name: get_env("SERVICE_NAME", Some("portal-auth"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("portal"), is_prod)?,
            },
            session: SessionConfig {
                private_key_path: get_env("SESSION_PRIVATE_KEY_PATH", None, is_prod)?,
                public_key_path: get_env("SESSION_PUBLIC_KEY_PATH", None, is_prod)?,
                ttl_days: get_env("SESSION_TTL_DAYS", Some("5"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
                cookie_secure: get_env("COOKIE_SECURE", Some(if is_prod { "true" } else { "false" }), is_prod)?
                    .parse()
                    .unwrap_or(is_prod),
                cookie_same_site: get_env("COOKIE_SAME_SITE", Some("lax"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            },
            provider: ProviderConfig {
                verify_url: get_env(
                    "PROVIDER_VERIFY_URL",
                    Some("http://localhost:9099/verify"),
                    is_prod,
                )?,
                admin_url: get_env(
                    "PROVIDER_ADMIN_URL",
                    Some("http://localhost:9099/admin"),
                    is_prod,
                )?,
                api_key: get_env("PROVIDER_API_KEY", Some("dev-key"), is_prod)?,
            },
            approval: ApprovalConfig {
                auto_approve: get_env("AUTO_APPROVE", Some("false"), is_prod)?
                    .parse()
                    .unwrap_or(false),
                owner_emails: parse_email_list(&get_env("OWNER_EMAILS", Some(""), is_prod)?),
                staff_emails: parse_email_list(&get_env("STAFF_EMAILS", Some(""), is_prod)?),
            },
            bypass: AdminBypassConfig {
                enabled: get_env("ENABLE_ADMIN_BYPASS", Some("false"), is_prod)?
                    .parse()
                    .unwrap_or(false),
                email: env::var("ADMIN_BYPASS_EMAIL")
                    .ok()
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty()),
            },
            markers: MarkerCacheConfig {
                cache_ttl_seconds: get_env("MARKER_CACHE_TTL_SECONDS", Some("60"), is_prod)?
                    .parse()
                    .unwrap_or(60),
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
                skip_auth: get_env("SKIP_AUTH", Some("false"), is_prod)?
                    .parse()
                    .unwrap_or(false),
            },
            swagger: SwaggerConfig {
                enabled: get_env("ENABLE_SWAGGER", Some("public"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if !(1..=7).contains(&self.session.ttl_days) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SESSION_TTL_DAYS must be between 1 and 7"
            )));
        }

        if !(1..=300).contains(&self.markers.cache_ttl_seconds) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "MARKER_CACHE_TTL_SECONDS must be between 1 and 300"
            )));
        }

        if self.bypass.enabled && self.bypass.email.is_none() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ENABLE_ADMIN_BYPASS requires ADMIN_BYPASS_EMAIL"
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.skip_auth {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "SKIP_AUTH is not allowed in production"
                )));
            }

            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if !self.session.cookie_secure {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "COOKIE_SECURE must be enabled in production"
                )));
            }
        }

        Ok(())
    }
}

fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for SameSitePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(SameSitePolicy::Strict),
            "lax" => Ok(SameSitePolicy::Lax),
            _ => Err(format!("Invalid SameSite policy: {}", s)),
        }
    }
}

impl std::str::FromStr for SwaggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(SwaggerMode::Public),
            "disabled" => Ok(SwaggerMode::Disabled),
            _ => Err(format!("Invalid swagger mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> PortalConfig {
        PortalConfig {
            environment: Environment::Dev,
            port: 8080,
            service_name: "portal-auth".to_string(),
            service_version: "test".to_string(),
            log_level: "debug".to_string(),
            mongodb: MongoConfig {
                uri: "mongodb://localhost:27017".to_string(),
                database: "portal_test".to_string(),
            },
            session: SessionConfig {
                private_key_path: "/tmp/key.pem".to_string(),
                public_key_path: "/tmp/key.pub.pem".to_string(),
                ttl_days: 5,
                cookie_secure: false,
                cookie_same_site: SameSitePolicy::Lax,
            },
            provider: ProviderConfig {
                verify_url: "http://localhost:9099/verify".to_string(),
                admin_url: "http://localhost:9099/admin".to_string(),
                api_key: "dev-key".to_string(),
            },
            approval: ApprovalConfig {
                auto_approve: false,
                owner_emails: vec![],
                staff_emails: vec![],
            },
            bypass: AdminBypassConfig {
                enabled: false,
                email: None,
            },
            markers: MarkerCacheConfig {
                cache_ttl_seconds: 60,
            },
            security: SecurityConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
                skip_auth: false,
            },
            swagger: SwaggerConfig {
                enabled: SwaggerMode::Disabled,
            },
        }
    }

    #[test]
    fn accepts_valid_dev_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_session_ttl_out_of_range() {
        let mut config = base_config();
        config.session.ttl_days = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_skip_auth_in_prod() {
        let mut config = base_config();
        config.environment = Environment::Prod;
        config.session.cookie_secure = true;
        config.security.skip_auth = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bypass_without_email() {
        let mut config = base_config();
        config.bypass.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_marker_ttl_out_of_bounds() {
        let mut config = base_config();
        config.markers.cache_ttl_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_email_lists() {
        let list = parse_email_list(" Owner@Example.com, staff@example.com ,");
        assert_eq!(list, vec!["owner@example.com", "staff@example.com"]);
    }
}
