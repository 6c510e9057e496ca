//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening settings.
    pub server: ServerSettings,
    /// Token issuance settings.
    pub auth: AuthSettings,
    /// Image persistence settings.
    pub storage: StorageSettings,
}

/// Server listening settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Hostname or IP address to bind to.
    pub host: String,
    /// Port number to listen on.
    pub port: u16,
}

impl ServerSettings {
    /// Converts host and port into a socket address.
    ///
    /// # Panics
    /// Panics if the host and port cannot be parsed into a valid socket
    /// address. This should only happen if the configuration is malformed.
    pub fn addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .unwrap_or_else(|e| {
                panic!(
                    "Invalid server address configuration (host: {}, port: {}): {}",
                    self.host, self.port, e
                )
            })
    }
}

/// Token issuance settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Symmetric signing secret; must be at least 32 bytes.
    pub token_secret: String,
    /// Token lifetime in seconds.
    pub token_ttl_secs: u64,
}

impl AuthSettings {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

/// Image persistence settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory where uploaded images are written.
    pub image_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 50051,
            },
            auth: AuthSettings {
                token_secret: String::new(),
                token_ttl_secs: 900,
            },
            storage: StorageSettings {
                image_dir: "img".to_string(),
            },
        }
    }
}

impl ServerConfig {
    /// Loads configuration from `.env` file, TOML file, and environment
    /// variables.
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables with `CATALOG_` prefix, `__` as the section
    ///    separator (e.g., `CATALOG_SERVER__PORT=8080`,
    ///    `CATALOG_AUTH__TOKEN_SECRET=...`)
    /// 2. TOML configuration file (path from `CATALOG_CONFIG_PATH`, default
    ///    `config/server.toml`; silently skipped if absent)
    /// 3. `.env` file (if exists)
    /// 4. Built-in defaults
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> figment::error::Result<Self> {
        use figment::providers::{Env, Format, Serialized, Toml};
        use figment::Figment;

        // Attempt to load .env file (silently ignore if it doesn't exist)
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("CATALOG_CONFIG_PATH")
            .unwrap_or_else(|_| "config/server.toml".to_string());

        Figment::from(Serialized::defaults(ServerConfig::default()))
            .merge(Toml::file(&config_path).nested())
            .merge(Env::prefixed("CATALOG_").split("__"))
            .extract()
    }

    /// Validates the configuration for production readiness.
    ///
    /// # Errors
    /// Returns an error message if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.auth.token_secret.len() < 32 {
            return Err("auth token_secret must be at least 32 bytes".to_string());
        }

        if self.auth.token_ttl_secs == 0 {
            return Err("auth token_ttl_secs cannot be zero".to_string());
        }

        if self.storage.image_dir.is_empty() {
            return Err("storage image_dir cannot be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.auth.token_secret = "a-development-secret-of-32-bytes".to_string();
        config
    }

    #[test]
    fn default_config_fails_validation_without_secret() {
        assert!(ServerConfig::default().validate().is_err());
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let mut config = valid_config();
        config.auth.token_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_image_dir_is_rejected() {
        let mut config = valid_config();
        config.storage.image_dir.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn addr_parses_host_and_port() {
        let config = valid_config();
        assert_eq!(config.server.addr().port(), 50051);
    }
}
