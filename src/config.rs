use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;

/// Main configuration structure for the tracker service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PblConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Database settings
    pub database: DatabaseConfig,
    /// Identity provider settings
    pub identity: IdentityConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Largest request body accepted, in bytes
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityProviderKind {
    /// Fixed token table from configuration, for development and tests
    Static,
    /// Hosted auth service queried per token
    Http,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityConfig {
    pub provider: IdentityProviderKind,
    /// Base URL of the hosted auth service
    pub auth_url: Option<String>,
    /// Public API key sent alongside user tokens
    pub api_key: Option<String>,
    /// Bearer token -> user id, used by the static provider
    #[serde(default)]
    pub static_tokens: BTreeMap<String, String>,
    /// How long a resolved token stays cached
    pub cache_ttl_seconds: u64,
    /// Timeout for a single auth service call
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
    /// Emit JSON lines instead of human readable logs
    pub json_logs: bool,
    /// Enable metrics collection
    pub metrics_enabled: bool,
}

impl Default for PblConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "0.0.0.0:3000".to_string(),
                max_body_bytes: crate::http::DEFAULT_MAX_BODY_BYTES,
            },
            database: DatabaseConfig {
                url: "sqlite://pbl-tracker.db".to_string(),
                max_connections: 10,
                auto_migrate: true,
            },
            identity: IdentityConfig {
                provider: IdentityProviderKind::Static,
                auth_url: None,
                api_key: None,
                static_tokens: BTreeMap::new(),
                cache_ttl_seconds: 60,
                request_timeout_seconds: 10,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: true,
                metrics_enabled: true,
            },
        }
    }
}

impl PblConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (pbl-tracker.toml, .pbl-tracker-rc)
    /// 3. Environment variables (prefixed with PBL_TRACKER, `__` between sections)
    /// 4. `PORT`, which replaces the port of `server.bind_addr`
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Same as [`PblConfig::load`], looking for configuration files in `dir`
    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&PblConfig::default())?);

        let toml_path = dir.join("pbl-tracker.toml");
        if toml_path.exists() {
            builder = builder.add_source(File::from(toml_path));
        }

        let rc_path = dir.join(".pbl-tracker-rc");
        if rc_path.exists() {
            builder = builder.add_source(File::from(rc_path).format(config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("PBL_TRACKER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let mut pbl_config: PblConfig = config.try_deserialize()?;

        if let Ok(port) = std::env::var("PORT") {
            pbl_config.server.bind_addr = with_port(&pbl_config.server.bind_addr, &port)?;
        }

        Ok(pbl_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind_addr
            .parse()
            .with_context(|| format!("invalid bind address {}", self.server.bind_addr))
    }
}

fn with_port(bind_addr: &str, port: &str) -> Result<String> {
    let port: u16 = port
        .trim()
        .parse()
        .with_context(|| format!("PORT must be a port number, got {port:?}"))?;
    let mut addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid bind address {bind_addr}"))?;
    addr.set_port(port);
    Ok(addr.to_string())
}

/// One line of the startup environment check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentItem {
    pub name: &'static str,
    pub value: Option<String>,
    pub required: bool,
}

impl EnvironmentItem {
    pub fn is_set(&self) -> bool {
        self.value.as_deref().is_some_and(|v| !v.is_empty())
    }
}

/// Which settings the service will run with, and which are missing
#[derive(Debug, Clone)]
pub struct EnvironmentReport {
    pub items: Vec<EnvironmentItem>,
}

impl EnvironmentReport {
    pub fn from_config(config: &PblConfig) -> Self {
        let http = config.identity.provider == IdentityProviderKind::Http;
        let provider = match config.identity.provider {
            IdentityProviderKind::Static => "static",
            IdentityProviderKind::Http => "http",
        };

        let items = vec![
            EnvironmentItem {
                name: "database.url",
                value: Some(config.database.url.clone()),
                required: true,
            },
            EnvironmentItem {
                name: "identity.provider",
                value: Some(provider.to_string()),
                required: true,
            },
            EnvironmentItem {
                name: "identity.auth_url",
                value: config.identity.auth_url.clone(),
                required: http,
            },
            EnvironmentItem {
                name: "identity.api_key",
                // Never echo the key itself.
                value: config.identity.api_key.as_ref().map(|_| "<redacted>".to_string()),
                required: http,
            },
            EnvironmentItem {
                name: "server.bind_addr",
                value: Some(config.server.bind_addr.clone()),
                required: true,
            },
            EnvironmentItem {
                name: "environment",
                value: Some(
                    std::env::var("PBL_TRACKER_ENV").unwrap_or_else(|_| "development".to_string()),
                ),
                required: false,
            },
        ];

        Self { items }
    }

    pub fn missing_required(&self) -> Vec<&'static str> {
        self.items
            .iter()
            .filter(|item| item.required && !item.is_set())
            .map(|item| item.name)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    pub fn log(&self) {
        for item in &self.items {
            match (&item.value, item.is_set()) {
                (Some(value), true) => tracing::info!(setting = item.name, value = %value, "set"),
                _ if item.required => tracing::warn!(setting = item.name, "missing"),
                _ => tracing::info!(setting = item.name, "not set"),
            }
        }
    }

    /// Human readable form for the `check-env` command
    pub fn render(&self) -> String {
        let mut out = String::from("Environment check:\n");
        for item in &self.items {
            let mark = if item.is_set() {
                "set"
            } else if item.required {
                "MISSING"
            } else {
                "not set"
            };
            out.push_str(&format!("- {}: {}", item.name, mark));
            if let (true, Some(value)) = (item.is_set(), &item.value) {
                out.push_str(&format!(" ({value})"));
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_deserialize_without_any_files() {
        let dir = tempdir().unwrap();
        let config = PblConfig::load_from(dir.path()).unwrap();

        assert_eq!(config.identity.provider, IdentityProviderKind::Static);
        assert_eq!(config.database.max_connections, 10);
        assert!(config.database.auto_migrate);
        assert_eq!(config.server.max_body_bytes, 1024 * 1024);
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("pbl-tracker.toml"),
            r#"
            [database]
            url = "sqlite://custom.db"
            max_connections = 2
            auto_migrate = false

            [identity]
            provider = "http"
            auth_url = "https://auth.example.test"
            cache_ttl_seconds = 5
            request_timeout_seconds = 3

            [identity.static_tokens]
            "dev-token" = "user-1"
            "#,
        )
        .unwrap();

        let config = PblConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.database.url, "sqlite://custom.db");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.identity.provider, IdentityProviderKind::Http);
        assert_eq!(
            config.identity.static_tokens.get("dev-token").map(String::as_str),
            Some("user-1")
        );
        // Untouched sections keep their defaults.
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_saved_config_loads_back() {
        let dir = tempdir().unwrap();
        let mut config = PblConfig::default();
        config.server.bind_addr = "127.0.0.1:8088".to_string();
        config
            .identity
            .static_tokens
            .insert("t".to_string(), "u".to_string());
        config.save_to_file(dir.path().join("pbl-tracker.toml")).unwrap();

        let loaded = PblConfig::load_from(dir.path()).unwrap();
        assert_eq!(loaded.server.bind_addr, "127.0.0.1:8088");
        assert_eq!(loaded.identity.static_tokens.len(), 1);
    }

    #[test]
    fn test_port_replaces_bind_port() {
        assert_eq!(with_port("0.0.0.0:3000", "8080").unwrap(), "0.0.0.0:8080");
        assert!(with_port("0.0.0.0:3000", "eighty").is_err());
    }

    #[test]
    fn test_http_provider_requires_auth_settings() {
        let mut config = PblConfig::default();
        assert!(EnvironmentReport::from_config(&config).is_complete());

        config.identity.provider = IdentityProviderKind::Http;
        let report = EnvironmentReport::from_config(&config);
        assert_eq!(
            report.missing_required(),
            vec!["identity.auth_url", "identity.api_key"]
        );

        config.identity.auth_url = Some("https://auth.example.test".to_string());
        config.identity.api_key = Some("anon".to_string());
        let report = EnvironmentReport::from_config(&config);
        assert!(report.is_complete());
        assert!(!report.render().contains("anon"));
    }
}
