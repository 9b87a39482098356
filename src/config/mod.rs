//! Configuration module
//!
//! Loads relay configuration from a TOML file with sensible defaults for
//! every section, so the server starts with no file present at all.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file name, resolved against the working directory
pub const CONFIG_FILE: &str = "relay.toml";

/// Errors that can occur during config operations
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Listener addresses and ports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Address both listeners bind to
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port for the WebSocket signaling relay
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,
    /// Port for the HTTP API
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

/// Browser origins allowed to call the HTTP API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsSection {
    /// Exact origins allowed by the CORS layer
    #[serde(default = "default_origins")]
    pub allowed_origins: Vec<String>,
}

/// Session token settings for the identity service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSection {
    /// HMAC secret for signing session tokens
    #[serde(default = "default_token_secret")]
    pub token_secret: String,
    /// Session token lifetime in days
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,
}

/// Media provider credentials for join-token issuance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSection {
    /// Application id registered with the media provider
    #[serde(default = "default_app_id")]
    pub app_id: String,
    /// Application certificate used to sign join credentials
    #[serde(default = "default_app_certificate")]
    pub app_certificate: String,
    /// Join credential lifetime in seconds
    #[serde(default = "default_credential_ttl")]
    pub credential_ttl_secs: i64,
}

/// User directory persistence
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DirectorySection {
    /// JSON file the directory is loaded from and saved to; in-memory only
    /// when unset
    pub path: Option<PathBuf>,
}

/// Complete relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub cors: CorsSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub media: MediaSection,
    #[serde(default)]
    pub directory: DirectorySection,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_ws_port() -> u16 {
    9000
}

fn default_http_port() -> u16 {
    5000
}

fn default_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_token_secret() -> String {
    "insecure-dev-secret".to_string()
}

fn default_token_ttl_days() -> i64 {
    7
}

fn default_app_id() -> String {
    "dev-app".to_string()
}

fn default_app_certificate() -> String {
    "dev-certificate".to_string()
}

fn default_credential_ttl() -> i64 {
    3600
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            ws_port: default_ws_port(),
            http_port: default_http_port(),
        }
    }
}

impl Default for CorsSection {
    fn default() -> Self {
        Self {
            allowed_origins: default_origins(),
        }
    }
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            token_secret: default_token_secret(),
            token_ttl_days: default_token_ttl_days(),
        }
    }
}

impl Default for MediaSection {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            app_certificate: default_app_certificate(),
            credential_ttl_secs: default_credential_ttl(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server: ServerSection::default(),
            cors: CorsSection::default(),
            auth: AuthSection::default(),
            media: MediaSection::default(),
            directory: DirectorySection::default(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from a file, falling back to defaults when the
    /// file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: RelayConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Whether the signing secrets are still the built-in development ones
    pub fn uses_default_secrets(&self) -> bool {
        self.auth.token_secret == default_token_secret()
            || self.media.app_certificate == default_app_certificate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.ws_port, 9000);
        assert_eq!(config.server.http_port, 5000);
        assert_eq!(config.auth.token_ttl_days, 7);
        assert_eq!(config.media.credential_ttl_secs, 3600);
        assert!(config.directory.path.is_none());
        assert!(config.uses_default_secrets());
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let dir = tempdir().unwrap();
        let config = RelayConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.server.ws_port, 9000);
    }

    #[test]
    fn test_load_full_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
[server]
bind = "0.0.0.0"
ws_port = 9100
http_port = 8080

[cors]
allowed_origins = ["https://calls.example.com"]

[auth]
token_secret = "s3cret"
token_ttl_days = 1

[media]
app_id = "prod-app"
app_certificate = "prod-cert"
credential_ttl_secs = 600

[directory]
path = "users.json"
"#,
        )
        .unwrap();

        let config = RelayConfig::load(&path).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.ws_port, 9100);
        assert_eq!(config.server.http_port, 8080);
        assert_eq!(
            config.cors.allowed_origins,
            vec!["https://calls.example.com".to_string()]
        );
        assert_eq!(config.auth.token_secret, "s3cret");
        assert_eq!(config.auth.token_ttl_days, 1);
        assert_eq!(config.media.app_id, "prod-app");
        assert_eq!(config.media.credential_ttl_secs, 600);
        assert_eq!(config.directory.path, Some(PathBuf::from("users.json")));
        assert!(!config.uses_default_secrets());
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[server]\nws_port = 9999\n").unwrap();

        let config = RelayConfig::load(&path).unwrap();
        assert_eq!(config.server.ws_port, 9999);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.auth.token_ttl_days, 7);
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "not toml {{{").unwrap();

        let result = RelayConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
