/// Configuration management for the API server
///
/// This module loads configuration from environment variables once at
/// startup. The resulting `Config` is immutable and shared through `Arc`.
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: bind address (default: 0.0.0.0:8080)
/// - `API_CORS_ORIGINS`: comma-separated origins (default: `*`)
/// - `API_PRODUCTION`: production mode (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `IDENTITY_JWT_SECRET`: identity-service token secret, at least 32 characters
/// - `IDENTITY_JWT_AUDIENCE`: expected token audience (default: authenticated)
/// - `IDENTITY_SERVICE_URL` / `IDENTITY_SERVICE_KEY`: remote verification
/// - `SESSION_COOKIE_NAME`: session cookie (default: rd-access-token)
/// - `ACCOUNT_GRACE_PERIOD_SECS`: creator grace window, `0` or `unbounded` (default: 600)
/// - `CRON_SECRET_TOKEN`: scheduled-job secret, required in production
/// - `WEBHOOK_SIGNING_SECRET`: HMAC-SHA256 webhook secret
/// - `WEBHOOK_SIGNATURE_HEADER`: signature header (default: x-webhook-signature)
/// - `AUDIT_RETENTION_DAYS`: audit retention (default: 90)
///
/// Exactly one of `IDENTITY_JWT_SECRET` and `IDENTITY_SERVICE_URL` must be set.
///
/// # Example
///
/// ```no_run
/// use reviewdesk_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;

use reviewdesk_shared::auth::{
    resolver::DEFAULT_SESSION_COOKIE,
    side_channel::DEFAULT_SIGNATURE_HEADER,
    tenant::GracePeriod,
};

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub tenancy: TenancyConfig,
    pub cron: CronConfig,
    pub webhooks: WebhookConfig,
    pub audit: AuditConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins, `*` for any
    pub cors_origins: Vec<String>,

    /// Enables HSTS and makes the cron secret mandatory
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// How user credentials are verified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityProvider {
    /// Local HS256 verification
    Jwt { secret: String, audience: String },

    /// Ask the identity service
    Remote { url: String, service_key: String },
}

/// Identity configuration
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub provider: IdentityProvider,
    pub session_cookie: String,
}

/// Tenant resolution configuration
#[derive(Debug, Clone)]
pub struct TenancyConfig {
    pub grace_period: GracePeriod,
}

/// Scheduled-job configuration
#[derive(Debug, Clone)]
pub struct CronConfig {
    pub secret: Option<String>,
}

/// Inbound webhook configuration
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub signing_secret: Option<String>,
    pub signature_header: String,
}

/// Audit configuration
#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub retention_days: i64,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    /// - Both or neither identity providers are configured
    /// - Production mode is enabled without `CRON_SECRET_TOKEN`
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()?;

        let cors_origins = var("API_CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let production = match var("API_PRODUCTION") {
            Some(v) => parse_bool("API_PRODUCTION", &v)?,
            None => false,
        };

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()?;

        let provider = match (var("IDENTITY_JWT_SECRET"), var("IDENTITY_SERVICE_URL")) {
            (Some(secret), None) => {
                if secret.len() < 32 {
                    anyhow::bail!("IDENTITY_JWT_SECRET must be at least 32 characters long");
                }
                IdentityProvider::Jwt {
                    secret,
                    audience: var("IDENTITY_JWT_AUDIENCE")
                        .unwrap_or_else(|| "authenticated".to_string()),
                }
            }
            (None, Some(url)) => IdentityProvider::Remote {
                url,
                service_key: var("IDENTITY_SERVICE_KEY").ok_or_else(|| {
                    anyhow::anyhow!("IDENTITY_SERVICE_KEY is required with IDENTITY_SERVICE_URL")
                })?,
            },
            (Some(_), Some(_)) => {
                anyhow::bail!("Set only one of IDENTITY_JWT_SECRET and IDENTITY_SERVICE_URL")
            }
            (None, None) => {
                anyhow::bail!("One of IDENTITY_JWT_SECRET or IDENTITY_SERVICE_URL is required")
            }
        };

        let grace_period = match var("ACCOUNT_GRACE_PERIOD_SECS") {
            Some(raw) => GracePeriod::parse(&raw).ok_or_else(|| {
                anyhow::anyhow!(
                    "ACCOUNT_GRACE_PERIOD_SECS must be a non-negative number of seconds or 'unbounded'"
                )
            })?,
            None => GracePeriod::default(),
        };

        let cron_secret = var("CRON_SECRET_TOKEN");
        if production && cron_secret.is_none() {
            anyhow::bail!("CRON_SECRET_TOKEN is required when API_PRODUCTION=true");
        }

        let retention_days = var("AUDIT_RETENTION_DAYS")
            .unwrap_or_else(|| "90".to_string())
            .parse::<i64>()?;
        if retention_days < 1 {
            anyhow::bail!("AUDIT_RETENTION_DAYS must be at least 1");
        }

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            identity: IdentityConfig {
                provider,
                session_cookie: var("SESSION_COOKIE_NAME")
                    .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string()),
            },
            tenancy: TenancyConfig { grace_period },
            cron: CronConfig {
                secret: cron_secret,
            },
            webhooks: WebhookConfig {
                signing_secret: var("WEBHOOK_SIGNING_SECRET"),
                signature_header: var("WEBHOOK_SIGNATURE_HEADER")
                    .unwrap_or_else(|| DEFAULT_SIGNATURE_HEADER.to_string()),
            },
            audit: AuditConfig { retention_days },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse_bool(key: &str, value: &str) -> anyhow::Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => anyhow::bail!("{} must be true or false", key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/reviewdesk"),
            ("IDENTITY_JWT_SECRET", SECRET),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert!(!config.api.production);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(
            config.identity.provider,
            IdentityProvider::Jwt {
                secret: SECRET.to_string(),
                audience: "authenticated".to_string()
            }
        );
        assert_eq!(config.identity.session_cookie, "rd-access-token");
        assert_eq!(
            config.tenancy.grace_period,
            GracePeriod::Within(Duration::seconds(600))
        );
        assert!(config.cron.secret.is_none());
        assert_eq!(config.webhooks.signature_header, "x-webhook-signature");
        assert_eq!(config.audit.retention_days, 90);
    }

    #[test]
    fn test_database_url_required() {
        assert!(load(&[("IDENTITY_JWT_SECRET", SECRET)]).is_err());
    }

    #[test]
    fn test_exactly_one_identity_provider() {
        let base = ("DATABASE_URL", "postgresql://localhost/reviewdesk");

        assert!(load(&[base]).is_err());
        assert!(load(&[
            base,
            ("IDENTITY_JWT_SECRET", SECRET),
            ("IDENTITY_SERVICE_URL", "https://id.example"),
            ("IDENTITY_SERVICE_KEY", "key"),
        ])
        .is_err());
        assert!(load(&[base, ("IDENTITY_SERVICE_URL", "https://id.example")]).is_err());
        assert!(load(&[base, ("IDENTITY_JWT_SECRET", "short")]).is_err());

        let config = load(&[
            base,
            ("IDENTITY_SERVICE_URL", "https://id.example"),
            ("IDENTITY_SERVICE_KEY", "key"),
        ])
        .unwrap();
        assert!(matches!(config.identity.provider, IdentityProvider::Remote { .. }));
    }

    #[test]
    fn test_production_requires_cron_secret() {
        let base = [
            ("DATABASE_URL", "postgresql://localhost/reviewdesk"),
            ("IDENTITY_JWT_SECRET", SECRET),
            ("API_PRODUCTION", "true"),
        ];
        assert!(load(&base).is_err());

        let mut with_secret = base.to_vec();
        with_secret.push(("CRON_SECRET_TOKEN", "cron-secret"));
        let config = load(&with_secret).unwrap();
        assert!(config.api.production);
        assert_eq!(config.cron.secret.as_deref(), Some("cron-secret"));
    }

    #[test]
    fn test_grace_period_settings() {
        let base = [
            ("DATABASE_URL", "postgresql://localhost/reviewdesk"),
            ("IDENTITY_JWT_SECRET", SECRET),
        ];

        let mut vars = base.to_vec();
        vars.push(("ACCOUNT_GRACE_PERIOD_SECS", "0"));
        assert_eq!(load(&vars).unwrap().tenancy.grace_period, GracePeriod::Disabled);

        let mut vars = base.to_vec();
        vars.push(("ACCOUNT_GRACE_PERIOD_SECS", "unbounded"));
        assert_eq!(load(&vars).unwrap().tenancy.grace_period, GracePeriod::Unbounded);

        let mut vars = base.to_vec();
        vars.push(("ACCOUNT_GRACE_PERIOD_SECS", "soon"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_cors_origins_list() {
        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/reviewdesk"),
            ("IDENTITY_JWT_SECRET", SECRET),
            ("API_CORS_ORIGINS", "https://app.reviewdesk.example, https://admin.reviewdesk.example"),
        ])
        .unwrap();
        assert_eq!(config.api.cors_origins.len(), 2);
        assert_eq!(config.api.cors_origins[1], "https://admin.reviewdesk.example");
    }
}
