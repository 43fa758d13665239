//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `CALISOUND_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `CALISOUND_` override YAML values
//! 3. **DATABASE_URL** - Special case: overrides `database.url` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `CALISOUND_SESSION__COOKIE_NAME=session` sets the `session.cookie_name` field.

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "CALISOUND_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Base URL where the site is publicly reachable (used in emails and redirects)
    pub public_url: String,
    /// Overrides `database.url` when the DATABASE_URL environment variable is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// PostgreSQL connection settings
    pub database: DatabaseConfig,
    /// Email address for the initial admin user (created on first startup)
    pub admin_email: String,
    /// Password for the initial admin user (optional, can be set via environment)
    pub admin_password: Option<String>,
    /// Secret key for JWT signing (required outside of tests)
    pub secret_key: Option<String>,
    /// Session cookie configuration
    pub session: SessionConfig,
    /// TOTP two-factor configuration
    pub totp: TotpConfig,
    /// CORS settings
    pub cors: CorsConfig,
    /// Fixed-window rate limits for public submission endpoints
    pub limits: LimitsConfig,
    /// AI copy generation settings
    pub ai: AiConfig,
    /// Email configuration for contact notifications
    pub email: EmailConfig,
    /// YouTube/Spotify search proxy settings
    pub search: SearchConfig,
    /// Virtual club settings
    pub club: ClubConfig,
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection string for the database
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/calisound".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
        }
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Name of the session cookie
    pub cookie_name: String,
    /// How long a session token stays valid
    #[serde(with = "humantime_serde")]
    pub expiry: Duration,
    /// How long the intermediate token issued between password and TOTP steps stays valid
    #[serde(with = "humantime_serde")]
    pub pending_expiry: Duration,
    /// Mark the cookie Secure (disable only for local development over http)
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "calisound_session".to_string(),
            expiry: Duration::from_secs(60 * 60 * 12),
            pending_expiry: Duration::from_secs(5 * 60),
            secure: true,
        }
    }
}

/// TOTP two-factor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TotpConfig {
    /// Issuer name shown in authenticator apps
    pub issuer: String,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            issuer: "CALI Sound".to_string(),
        }
    }
}

/// One fixed rate-limit window.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    /// Maximum requests allowed per window. 0 disables the limit.
    pub max_requests: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
        }
    }
}

/// Fixed-window rate limits keyed by client IP, applied per route class.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Login attempts
    pub login: WindowConfig,
    /// Public comment submission
    pub comments: WindowConfig,
    /// Contact form submission
    pub contact: WindowConfig,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            login: WindowConfig {
                max_requests: 10,
                window_secs: 60,
            },
            comments: WindowConfig {
                max_requests: 5,
                window_secs: 60,
            },
            contact: WindowConfig {
                max_requests: 3,
                window_secs: 300,
            },
        }
    }
}

/// AI copy generation settings.
///
/// Points at any OpenAI-compatible chat-completion endpoint. Copy generation is
/// skipped with a failed status when no API key is configured.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AiConfig {
    /// Base URL of the completion API (defaults to the OpenAI public endpoint)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// API key for the completion endpoint
    pub api_key: Option<String>,
    /// Model name to request
    pub model: String,
    /// Upper bound on generated tokens per copy request
    pub max_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 400,
        }
    }
}

/// Email configuration for contact notifications.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
// Note: Cannot use deny_unknown_fields here due to #[serde(flatten)] on transport
pub struct EmailConfig {
    /// Email transport method
    #[serde(flatten)]
    pub transport: EmailTransportConfig,
    /// Sender email address
    pub from_email: String,
    /// Sender display name
    pub from_name: String,
    /// Where contact notifications are addressed
    pub notify_email: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            transport: EmailTransportConfig::default(),
            from_email: "noreply@calisound.example".to_string(),
            from_name: "CALI Sound".to_string(),
            notify_email: "team@calisound.example".to_string(),
        }
    }
}

/// Email transport configuration - either SMTP or file-based.
///
/// File transport is the default: contact notifications are written to disk
/// rather than dispatched.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum EmailTransportConfig {
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: String,
        use_tls: bool,
    },
    File {
        path: String,
    },
}

impl Default for EmailTransportConfig {
    fn default() -> Self {
        EmailTransportConfig::File {
            path: ".calisound_data/emails".to_string(),
        }
    }
}

/// YouTube/Spotify search proxy settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Base URL of the YouTube Data API
    pub youtube_api_base: String,
    /// YouTube Data API key (search disabled when unset)
    pub youtube_api_key: Option<String>,
    /// Base URL of the Spotify Web API
    pub spotify_api_base: String,
    /// Spotify bearer token (search disabled when unset)
    pub spotify_token: Option<String>,
    /// How long proxied results stay cached
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,
    /// Maximum cached queries
    pub cache_capacity: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            youtube_api_base: "https://www.googleapis.com/youtube/v3".to_string(),
            youtube_api_key: None,
            spotify_api_base: "https://api.spotify.com".to_string(),
            spotify_token: None,
            cache_ttl: Duration::from_secs(300),
            cache_capacity: 1024,
        }
    }
}

/// Virtual club settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClubConfig {
    /// Broadcast channel capacity per room
    pub room_buffer: usize,
    /// Maximum chat message length
    pub max_chat_len: usize,
}

impl Default for ClubConfig {
    fn default() -> Self {
        Self {
            room_buffer: 256,
            max_chat_len: 500,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            allow_credentials: true,
            max_age: Some(3600),
        }
    }
}

/// A single allowed CORS origin.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://calisound.example`)
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            public_url: "http://localhost:3000".to_string(),
            database_url: None,
            database: DatabaseConfig::default(),
            admin_email: "admin@calisound.example".to_string(),
            admin_password: None,
            secret_key: None,
            session: SessionConfig::default(),
            totp: TotpConfig::default(),
            cors: CorsConfig::default(),
            limits: LimitsConfig::default(),
            ai: AiConfig::default(),
            email: EmailConfig::default(),
            search: SearchConfig::default(),
            club: ClubConfig::default(),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        // DATABASE_URL wins over the YAML value when set
        if let Some(url) = config.database_url.take() {
            config.database.url = url;
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("CALISOUND_").split("__"))
            // Common DATABASE_URL pattern
            .merge(Env::raw().only(&["DATABASE_URL"]))
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.secret_key.is_none() {
            return Err(Error::Internal {
                operation: "Config validation: secret_key is not configured. \
                 Set CALISOUND_SECRET_KEY or add secret_key to the config file."
                    .to_string(),
            });
        }

        for (name, window) in [
            ("limits.login", &self.limits.login),
            ("limits.comments", &self.limits.comments),
            ("limits.contact", &self.limits.contact),
        ] {
            if window.window_secs == 0 {
                return Err(Error::Internal {
                    operation: format!("Config validation: {name}.window_secs must be greater than zero"),
                });
            }
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_are_valid_except_secret_key() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let config = Config {
            secret_key: Some("test-secret".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "port: 4000\nsecret_key: from-yaml\n")?;
            jail.set_env("CALISOUND_PORT", "5000");
            jail.set_env("CALISOUND_SESSION__COOKIE_NAME", "cali");

            let args = Args {
                config: "config.yaml".to_string(),
                validate: false,
            };
            let config = Config::load(&args).expect("config should load");
            assert_eq!(config.port, 5000);
            assert_eq!(config.session.cookie_name, "cali");
            assert_eq!(config.secret_key.as_deref(), Some("from-yaml"));
            Ok(())
        });
    }

    #[test]
    fn test_database_url_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "secret_key: s\n")?;
            jail.set_env("DATABASE_URL", "postgresql://db.internal/cali");

            let args = Args {
                config: "config.yaml".to_string(),
                validate: false,
            };
            let config = Config::load(&args).expect("config should load");
            assert_eq!(config.database.url, "postgresql://db.internal/cali");
            Ok(())
        });
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = Config {
            secret_key: Some("s".to_string()),
            limits: LimitsConfig {
                login: WindowConfig {
                    max_requests: 5,
                    window_secs: 0,
                },
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
